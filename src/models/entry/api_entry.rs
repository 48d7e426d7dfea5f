//! API representation of a devlog entry.

use super::log_entry::LogEntry;
use crate::codec::ExtraData;
use chrono::{DateTime, Utc};
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct ApiEntry {
  pub id: Option<i64>,
  pub created_at: DateTime<Utc>,
  pub run_id: String,
  pub severity: i64,
  pub level: &'static str,
  pub psr_level: &'static str,
  pub facility: String,
  pub host: Option<String>,
  pub message: String,
  /// Only the external namespace is exposed.
  pub extra_data: ExtraData,
  pub transport_ids: Vec<String>,
}

impl From<LogEntry> for ApiEntry {
  fn from(e: LogEntry) -> Self {
    let level = e.level();
    ApiEntry {
      id: e.id,
      created_at: e.timestamp(),
      extra_data: e.external_extra_data(),
      transport_ids: e.transport_ids().into_iter().map(str::to_string).collect(),
      run_id: e.run_id,
      severity: e.severity,
      level: level.name(),
      psr_level: level.psr_level(),
      facility: e.facility,
      host: e.host,
      message: e.message,
    }
  }
}
