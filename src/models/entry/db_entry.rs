//! Database row for a devlog entry.

use super::log_entry::LogEntry;
use sqlx::FromRow;

#[derive(Debug, FromRow)]
pub struct DbEntry {
    pub uid: i64,
    pub pid: i64,
    pub crdate: i64,
    pub run_id: String,
    pub severity: i64,
    pub ext_key: String,
    pub host: Option<String>,
    pub message: String,
    pub extra_data: Option<Vec<u8>>,
    pub cruser_id: i64,
    pub transport_ids: Option<String>,
}

impl From<DbEntry> for LogEntry {
    fn from(d: DbEntry) -> Self {
        LogEntry {
            id: Some(d.uid),
            pid: d.pid,
            created_at: d.crdate,
            run_id: d.run_id,
            severity: d.severity,
            facility: d.ext_key,
            host: d.host.filter(|h| !h.is_empty()),
            message: d.message,
            extra_data_raw: d.extra_data.unwrap_or_default(),
            creator_user_id: d.cruser_id,
            delivered_transport_ids: d.transport_ids.unwrap_or_default(),
        }
    }
}
