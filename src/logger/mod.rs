//! Producer-facing logger: filters, runs retention once per context, stores.

use crate::app::config::Config;
use crate::codec::{self, ExtraData};
use crate::db::entry_store::EntryStore;
use crate::db::retention::{ExecutionContext, RetentionOptimizer};
use crate::error::Result;
use crate::models::entry::log_entry::LogEntry;
use crate::models::severity::level::Severity;
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;
use tracing::debug;

/// A log line as handed in by a producer.
#[derive(Debug, Clone, Deserialize)]
pub struct NewEntry {
  pub severity: Severity,
  #[serde(alias = "ext_key")]
  pub facility: String,
  pub message: String,
  #[serde(default)]
  pub host: Option<String>,
  #[serde(default)]
  pub extra_data: ExtraData,
}

impl NewEntry {
  pub fn new(severity: Severity, facility: impl Into<String>, message: impl Into<String>) -> Self {
    Self {
      severity,
      facility: facility.into(),
      message: message.into(),
      host: None,
      extra_data: ExtraData::new(),
    }
  }

  pub fn with_extra(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
    self.extra_data.insert(key.into(), value.into());
    self
  }

  /// Attach a value to the internal namespace.
  pub fn with_internal(self, key: &str, value: impl Into<Value>) -> Self {
    self.with_extra(format!("{}{key}", codec::INTERNAL_MARKER), value)
  }

  pub fn with_host(mut self, host: impl Into<String>) -> Self {
    self.host = Some(host.into());
    self
  }
}

/// Entry point for log producers.
#[derive(Debug, Clone)]
pub struct Devlog {
  store: EntryStore,
  optimizer: RetentionOptimizer,
  config: Arc<Config>,
}

impl Devlog {
  pub fn new(store: EntryStore, config: Arc<Config>) -> Self {
    let optimizer = RetentionOptimizer::new(store.clone(), config.max_rows);
    Self {
      store,
      optimizer,
      config,
    }
  }

  pub fn store(&self) -> &EntryStore {
    &self.store
  }

  pub fn optimizer(&self) -> &RetentionOptimizer {
    &self.optimizer
  }

  /// Whether an entry passes the level and facility filters.
  pub fn accepts(&self, severity: Severity, facility: &str) -> bool {
    severity >= self.config.min_log_level
      && !self.config.exclude_facilities.iter().any(|f| f == facility)
  }

  /// Store one entry. Returns `None` when the filters drop it.
  /// The host is resolved at write time.
  pub async fn log(&self, ctx: &mut ExecutionContext, entry: NewEntry) -> Result<Option<i64>> {
    if !self.accepts(entry.severity, &entry.facility) {
      debug!("devlog: dropped {} entry of {}", entry.severity, entry.facility);
      return Ok(None);
    }

    self.optimizer.optimize(ctx).await?;

    let mut record = LogEntry::new(ctx.run_id(), entry.severity, entry.facility, entry.message);
    record.host = entry.host;
    record.host = Some(record.resolved_host(self.config.default_host.as_deref()));
    record.set_extra_data(&entry.extra_data)?;

    let id = self.store.insert(&record).await?;
    Ok(Some(id))
  }
}
