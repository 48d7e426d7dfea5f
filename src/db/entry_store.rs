//! Persistence of devlog entries.
//!
//! Every operation maps store failures to
//! [`StoreUnavailable`](crate::error::DevlogError::StoreUnavailable)
//! and leaves retrying to the caller.

use crate::codec;
use crate::error::Result;
use crate::models::digest::{digest_row::DigestRow, severity_count::SeverityCount};
use crate::models::entry::db_entry::DbEntry;
use crate::models::entry::log_entry::{
    ColumnValue, FIELD_COLUMNS, LogEntry, TABLE_NAME, column_for, is_valid_transport_id,
};
use sqlx::{QueryBuilder, Sqlite, SqlitePool};
use tracing::{debug, warn};

const DIGEST_COLUMNS: &str = "uid, severity, ext_key, message, host, extra_data";

/// Optional restrictions shared by the select, count and update statements.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EntryFilter {
    /// Inclusive lower bound on `created_at`.
    pub since: Option<i64>,
    /// Exact severity code.
    pub severity: Option<i64>,
    pub facility: Option<String>,
    pub run_id: Option<String>,
    /// Inclusive upper bound on the entry id.
    pub max_id: Option<i64>,
    /// Skip entries this transport already delivered.
    pub undelivered_by: Option<String>,
}

impl EntryFilter {
    pub fn since(since: i64) -> Self {
        Self {
            since: Some(since),
            ..Self::default()
        }
    }

    fn push_where(&self, qb: &mut QueryBuilder<'_, Sqlite>) {
        qb.push(" WHERE 1 = 1");
        if let Some(since) = self.since {
            qb.push(" AND crdate >= ").push_bind(since);
        }
        if let Some(severity) = self.severity {
            qb.push(" AND severity = ").push_bind(severity);
        }
        if let Some(facility) = &self.facility {
            qb.push(" AND ext_key = ").push_bind(facility.clone());
        }
        if let Some(run_id) = &self.run_id {
            qb.push(" AND run_id = ").push_bind(run_id.clone());
        }
        if let Some(max_id) = self.max_id {
            qb.push(" AND uid <= ").push_bind(max_id);
        }
        if let Some(transport_id) = &self.undelivered_by {
            qb.push(" AND instr(',' || transport_ids || ',', ")
                .push_bind(format!(",{transport_id},"))
                .push(") = 0");
        }
    }
}

/// Store of devlog entries backed by SQLite.
#[derive(Debug, Clone)]
pub struct EntryStore {
    pool: SqlitePool,
    max_extra_data_size: usize,
}

impl EntryStore {
    pub fn new(pool: SqlitePool, max_extra_data_size: usize) -> Self {
        Self {
            pool,
            max_extra_data_size,
        }
    }

    /// Persist a new entry and return its id.
    ///
    /// The extra data is bounded to the configured column size here and
    /// nowhere else.
    pub async fn insert(&self, entry: &LogEntry) -> Result<i64> {
        let extra_column = column_for("extra_data_raw");
        let mut record = entry.record();
        for (column, value) in record.iter_mut() {
            if Some(*column) != extra_column {
                continue;
            }
            if let ColumnValue::Blob(raw) = value {
                let bounded = codec::shorten(raw, self.max_extra_data_size);
                if bounded.len() < raw.len() {
                    debug!(
                        "shortened extra data of {:?} from {} to {} bytes",
                        entry.message,
                        raw.len(),
                        bounded.len()
                    );
                }
                *raw = bounded;
            }
        }

        let mut qb = QueryBuilder::<Sqlite>::new(format!("INSERT INTO {TABLE_NAME} ("));
        let mut columns = qb.separated(", ");
        for (column, _) in &record {
            columns.push(*column);
        }
        qb.push(") VALUES (");
        let mut values = qb.separated(", ");
        for (_, value) in record {
            match value {
                ColumnValue::Int(v) => values.push_bind(v),
                ColumnValue::Text(v) => values.push_bind(v),
                ColumnValue::Blob(v) => values.push_bind(v),
            };
        }
        qb.push(")");

        let result = qb.build().execute(&self.pool).await?;
        Ok(result.last_insert_rowid())
    }

    pub async fn find(&self, id: i64) -> Result<Option<LogEntry>> {
        let row = sqlx::query_as::<_, DbEntry>(&format!(
            "SELECT {} FROM {TABLE_NAME} WHERE uid = ?",
            entry_columns()
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(LogEntry::from))
    }

    /// Newest entries first.
    pub async fn list(&self, filter: &EntryFilter, limit: i64) -> Result<Vec<LogEntry>> {
        let mut qb = QueryBuilder::<Sqlite>::new(format!(
            "SELECT {} FROM {TABLE_NAME}",
            entry_columns()
        ));
        filter.push_where(&mut qb);
        qb.push(" ORDER BY uid DESC LIMIT ").push_bind(limit);
        let rows = qb.build_query_as::<DbEntry>().fetch_all(&self.pool).await?;
        Ok(rows.into_iter().map(LogEntry::from).collect())
    }

    pub async fn count(&self, filter: &EntryFilter) -> Result<i64> {
        let mut qb = QueryBuilder::<Sqlite>::new(format!("SELECT COUNT(*) FROM {TABLE_NAME}"));
        filter.push_where(&mut qb);
        Ok(qb.build_query_scalar::<i64>().fetch_one(&self.pool).await?)
    }

    /// Highest entry id matching the filter.
    pub async fn max_id(&self, filter: &EntryFilter) -> Result<Option<i64>> {
        let mut qb = QueryBuilder::<Sqlite>::new(format!("SELECT MAX(uid) FROM {TABLE_NAME}"));
        filter.push_where(&mut qb);
        Ok(qb
            .build_query_scalar::<Option<i64>>()
            .fetch_one(&self.pool)
            .await?)
    }

    /// Distinct run ids, most recent first.
    pub async fn select_grouped_run_ids(&self, limit: i64) -> Result<Vec<String>> {
        Ok(sqlx::query_scalar::<_, String>(&format!(
            "SELECT run_id FROM {TABLE_NAME} GROUP BY run_id ORDER BY run_id DESC LIMIT ?"
        ))
        .bind(limit)
        .fetch_all(&self.pool)
        .await?)
    }

    /// Every facility that has logged at least once.
    pub async fn select_distinct_facilities(&self) -> Result<Vec<String>> {
        Ok(sqlx::query_scalar::<_, String>(&format!(
            "SELECT ext_key FROM {TABLE_NAME} GROUP BY ext_key ORDER BY ext_key DESC"
        ))
        .fetch_all(&self.pool)
        .await?)
    }

    /// Entries of one severity created at or after `since`, newest first.
    ///
    /// With `group` set, repeats of the same (message, facility) collapse into
    /// their latest entry and `msg_count` carries the group size.
    pub async fn select_since(
        &self,
        since: i64,
        severity: i64,
        limit: i64,
        filter: &EntryFilter,
        group: bool,
    ) -> Result<Vec<DigestRow>> {
        let filter = EntryFilter {
            since: Some(since),
            severity: Some(severity),
            ..filter.clone()
        };
        let select = if group {
            // SQLite takes the bare columns from the row holding MAX(crdate).
            format!("SELECT {DIGEST_COLUMNS}, MAX(crdate) AS latest_crdate, COUNT(uid) AS msg_count FROM {TABLE_NAME}")
        } else {
            format!("SELECT {DIGEST_COLUMNS}, crdate AS latest_crdate, 1 AS msg_count FROM {TABLE_NAME}")
        };
        let mut qb = QueryBuilder::<Sqlite>::new(select);
        filter.push_where(&mut qb);
        if group {
            qb.push(" GROUP BY message, ext_key");
        }
        qb.push(" ORDER BY latest_crdate DESC, uid DESC LIMIT ")
            .push_bind(limit);
        Ok(qb
            .build_query_as::<DigestRow>()
            .fetch_all(&self.pool)
            .await?)
    }

    /// Number of entries per severity, ascending by severity.
    pub async fn select_severity_summary(&self, filter: &EntryFilter) -> Result<Vec<SeverityCount>> {
        let mut qb = QueryBuilder::<Sqlite>::new(format!(
            "SELECT severity, COUNT(uid) AS cnt FROM {TABLE_NAME}"
        ));
        filter.push_where(&mut qb);
        qb.push(" GROUP BY severity ORDER BY severity");
        Ok(qb
            .build_query_as::<SeverityCount>()
            .fetch_all(&self.pool)
            .await?)
    }

    /// Run id of the row at `rank` (0-indexed) when ordered by run id descending.
    pub async fn run_id_at_rank(&self, rank: u64) -> Result<Option<String>> {
        let rank = i64::try_from(rank).unwrap_or(i64::MAX);
        Ok(sqlx::query_scalar::<_, String>(&format!(
            "SELECT run_id FROM {TABLE_NAME} ORDER BY run_id DESC LIMIT 1 OFFSET ?"
        ))
        .bind(rank)
        .fetch_optional(&self.pool)
        .await?)
    }

    /// Delete every entry of runs older than `boundary`.
    pub async fn delete_runs_before(&self, boundary: &str) -> Result<u64> {
        let result = sqlx::query(&format!("DELETE FROM {TABLE_NAME} WHERE run_id < ?"))
            .bind(boundary)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    /// Record that `transport_id` delivered entry `id`.
    ///
    /// Returns `false` when the entry is gone or already carries the id.
    pub async fn add_transport_id(&self, id: i64, transport_id: &str) -> Result<bool> {
        let Some(mut entry) = self.find(id).await? else {
            return Ok(false);
        };
        if !entry.add_transport_id(transport_id) {
            return Ok(false);
        }
        sqlx::query(&format!(
            "UPDATE {TABLE_NAME} SET transport_ids = ? WHERE uid = ?"
        ))
        .bind(&entry.delivered_transport_ids)
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(true)
    }

    /// Append `transport_id` to every matching entry of the given severities
    /// that does not carry it yet. Returns the number of updated entries.
    pub async fn mark_delivered(
        &self,
        filter: &EntryFilter,
        severities: &[i64],
        transport_id: &str,
    ) -> Result<u64> {
        if !is_valid_transport_id(transport_id) {
            warn!("refusing to record transport id {transport_id:?}");
            return Ok(0);
        }
        if severities.is_empty() {
            return Ok(0);
        }
        let filter = EntryFilter {
            undelivered_by: Some(transport_id.to_string()),
            ..filter.clone()
        };

        let mut qb = QueryBuilder::<Sqlite>::new(format!(
            "UPDATE {TABLE_NAME} SET transport_ids = CASE WHEN transport_ids = '' THEN "
        ));
        qb.push_bind(transport_id.to_string())
            .push(" ELSE transport_ids || ',' || ")
            .push_bind(transport_id.to_string())
            .push(" END");
        filter.push_where(&mut qb);
        qb.push(" AND severity IN (");
        let mut list = qb.separated(", ");
        for severity in severities {
            list.push_bind(*severity);
        }
        qb.push(")");

        let result = qb.build().execute(&self.pool).await?;
        Ok(result.rows_affected())
    }
}

fn entry_columns() -> String {
    FIELD_COLUMNS
        .iter()
        .map(|(_, column)| *column)
        .collect::<Vec<_>>()
        .join(", ")
}
