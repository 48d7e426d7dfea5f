//! The devlog entry: one structured log line as stored in `devlog_entry`.

use crate::codec::{self, ExtraData};
use crate::error::CodecError;
use crate::models::severity::level::Severity;
use crate::util::resolve_host;
use chrono::{DateTime, Utc};

/// Table holding the entries.
pub const TABLE_NAME: &str = "devlog_entry";

/// Entry field to table column. Insert statements and row mapping both read
/// from this table; `id` is assigned by the store and never inserted.
pub const FIELD_COLUMNS: &[(&str, &str)] = &[
  ("id", "uid"),
  ("pid", "pid"),
  ("created_at", "crdate"),
  ("run_id", "run_id"),
  ("severity", "severity"),
  ("facility", "ext_key"),
  ("host", "host"),
  ("message", "message"),
  ("extra_data_raw", "extra_data"),
  ("creator_user_id", "cruser_id"),
  ("delivered_transport_ids", "transport_ids"),
];

/// Column name for an entry field.
pub fn column_for(field: &str) -> Option<&'static str> {
  FIELD_COLUMNS
    .iter()
    .find(|(name, _)| *name == field)
    .map(|(_, column)| *column)
}

/// A value bound to one column of an insert.
#[derive(Debug, Clone, PartialEq)]
pub enum ColumnValue {
  Int(i64),
  Text(String),
  Blob(Vec<u8>),
}

/// Transport ids are stored comma-joined, so they must be non-empty and
/// comma-free.
pub fn is_valid_transport_id(transport_id: &str) -> bool {
  !transport_id.is_empty() && !transport_id.contains(',')
}

/// Identifier of one run. Canonical ids are zero-padded microsecond
/// timestamps so that text order equals chronological order.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RunId(String);

impl RunId {
  pub const WIDTH: usize = 20;

  pub fn generate(now: DateTime<Utc>) -> RunId {
    RunId::from_micros(now.timestamp_micros())
  }

  pub fn from_micros(micros: i64) -> RunId {
    RunId(format!("{:0width$}", micros.max(0), width = Self::WIDTH))
  }

  pub fn as_str(&self) -> &str {
    &self.0
  }
}

impl From<String> for RunId {
  fn from(value: String) -> Self {
    RunId(value)
  }
}

impl std::fmt::Display for RunId {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.write_str(&self.0)
  }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct LogEntry {
  pub id: Option<i64>,
  pub pid: i64,
  /// Epoch seconds.
  pub created_at: i64,
  pub run_id: String,
  pub severity: i64,
  pub facility: String,
  pub host: Option<String>,
  pub message: String,
  pub extra_data_raw: Vec<u8>,
  pub creator_user_id: i64,
  pub delivered_transport_ids: String,
}

impl LogEntry {
  pub fn new(
    run_id: &RunId,
    severity: Severity,
    facility: impl Into<String>,
    message: impl Into<String>,
  ) -> Self {
    Self {
      run_id: run_id.to_string(),
      created_at: Utc::now().timestamp(),
      severity: severity.code(),
      facility: facility.into(),
      message: message.into(),
      ..Self::default()
    }
  }

  pub fn level(&self) -> Severity {
    Severity::from_code(self.severity)
  }

  pub fn timestamp(&self) -> DateTime<Utc> {
    DateTime::from_timestamp(self.created_at, 0).unwrap_or_default()
  }

  /// Host of the entry, falling back through configuration, environment and
  /// the OS hostname.
  pub fn resolved_host(&self, configured: Option<&str>) -> String {
    resolve_host(self.host.as_deref(), configured)
  }

  /// Transport ids that already delivered this entry.
  pub fn transport_ids(&self) -> Vec<&str> {
    self
      .delivered_transport_ids
      .split(',')
      .filter(|id| !id.is_empty())
      .collect()
  }

  pub fn has_transport_id(&self, transport_id: &str) -> bool {
    self.transport_ids().contains(&transport_id)
  }

  /// Record a delivering transport. Returns `false` when the id was already
  /// present or cannot be stored (empty, or containing a comma).
  pub fn add_transport_id(&mut self, transport_id: &str) -> bool {
    if !is_valid_transport_id(transport_id) || self.has_transport_id(transport_id) {
      return false;
    }
    if !self.delivered_transport_ids.is_empty() {
      self.delivered_transport_ids.push(',');
    }
    self.delivered_transport_ids.push_str(transport_id);
    true
  }

  /// Decoded extra data; a corrupt blob reads as empty.
  pub fn extra_data(&self) -> ExtraData {
    codec::decode_lossy(&self.extra_data_raw)
  }

  pub fn set_extra_data(&mut self, data: &ExtraData) -> Result<(), CodecError> {
    self.extra_data_raw = codec::encode(data)?;
    Ok(())
  }

  pub fn external_extra_data(&self) -> ExtraData {
    codec::partition_external(&self.extra_data())
  }

  pub fn internal_extra_data(&self) -> ExtraData {
    codec::partition_internal(&self.extra_data())
  }

  /// Column values for an insert, in [`FIELD_COLUMNS`] order. The id and an
  /// unset host are left out so the store fills them.
  pub fn record(&self) -> Vec<(&'static str, ColumnValue)> {
    FIELD_COLUMNS
      .iter()
      .filter_map(|(field, column)| {
        let value = match *field {
          "pid" => ColumnValue::Int(self.pid),
          "created_at" => ColumnValue::Int(self.created_at),
          "run_id" => ColumnValue::Text(self.run_id.clone()),
          "severity" => ColumnValue::Int(self.severity),
          "facility" => ColumnValue::Text(self.facility.clone()),
          "host" => ColumnValue::Text(self.host.clone()?),
          "message" => ColumnValue::Text(self.message.clone()),
          "extra_data_raw" => ColumnValue::Blob(self.extra_data_raw.clone()),
          "creator_user_id" => ColumnValue::Int(self.creator_user_id),
          "delivered_transport_ids" => ColumnValue::Text(self.delivered_transport_ids.clone()),
          _ => return None,
        };
        Some((*column, value))
      })
      .collect()
  }
}
