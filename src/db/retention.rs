//! Row-budget retention: whole runs are evicted once the table grows past
//! the configured number of rows.

use super::entry_store::{EntryFilter, EntryStore};
use crate::error::Result;
use crate::models::entry::log_entry::RunId;
use chrono::Utc;
use tracing::{debug, info};

/// Retention progress within one execution context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RetentionState {
    #[default]
    Idle,
    Optimized,
}

/// State scoped to one processing pass (a request, a scheduled job, a CLI
/// invocation). A new context starts with retention pending.
#[derive(Debug, Clone)]
pub struct ExecutionContext {
    run_id: RunId,
    retention: RetentionState,
}

impl ExecutionContext {
    /// Fresh context with a run id derived from the current time.
    pub fn new() -> Self {
        Self::with_run_id(RunId::generate(Utc::now()))
    }

    pub fn with_run_id(run_id: RunId) -> Self {
        Self {
            run_id,
            retention: RetentionState::Idle,
        }
    }

    pub fn run_id(&self) -> &RunId {
        &self.run_id
    }

    pub fn retention(&self) -> RetentionState {
        self.retention
    }
}

impl Default for ExecutionContext {
    fn default() -> Self {
        Self::new()
    }
}

/// What a call to [`RetentionOptimizer::optimize`] did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OptimizeOutcome {
    /// This context already ran retention.
    AlreadyOptimized,
    /// No row budget configured.
    Disabled,
    WithinBudget { rows: i64 },
    /// Over budget, but no run id at the boundary rank.
    NoBoundary { rows: i64 },
    Pruned { boundary: String, deleted: u64 },
}

#[derive(Debug, Clone)]
pub struct RetentionOptimizer {
    store: EntryStore,
    max_rows: u64,
}

impl RetentionOptimizer {
    pub fn new(store: EntryStore, max_rows: u64) -> Self {
        Self { store, max_rows }
    }

    /// Enforce the row budget once per execution context.
    ///
    /// The run at rank `max_rows` (run id descending) is the boundary; every
    /// entry of an older run goes in one delete. Rows inserted between the
    /// count and the delete are picked up by the next pass.
    pub async fn optimize(&self, ctx: &mut ExecutionContext) -> Result<OptimizeOutcome> {
        if ctx.retention == RetentionState::Optimized {
            return Ok(OptimizeOutcome::AlreadyOptimized);
        }
        ctx.retention = RetentionState::Optimized;

        if self.max_rows == 0 {
            return Ok(OptimizeOutcome::Disabled);
        }

        let rows = self.store.count(&EntryFilter::default()).await?;
        if u64::try_from(rows).unwrap_or(0) <= self.max_rows {
            debug!("retention: {rows} rows within budget of {}", self.max_rows);
            return Ok(OptimizeOutcome::WithinBudget { rows });
        }

        let boundary = match self.store.run_id_at_rank(self.max_rows).await? {
            Some(boundary) if !boundary.is_empty() => boundary,
            _ => return Ok(OptimizeOutcome::NoBoundary { rows }),
        };

        let deleted = self.store.delete_runs_before(&boundary).await?;
        info!(
            "retention: {rows} rows over budget of {}, deleted {deleted} entries of runs before {boundary}",
            self.max_rows
        );
        Ok(OptimizeOutcome::Pruned { boundary, deleted })
    }
}
