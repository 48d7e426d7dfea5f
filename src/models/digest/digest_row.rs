//! One grouped row of a watchdog bucket.

use crate::codec::{self, ExtraData};
use sqlx::FromRow;

/// Latest entry of a (message, facility) group plus the group's size.
#[derive(Debug, Clone, FromRow)]
pub struct DigestRow {
  pub uid: i64,
  #[sqlx(rename = "latest_crdate")]
  pub crdate: i64,
  pub severity: i64,
  pub ext_key: String,
  pub message: String,
  pub host: Option<String>,
  pub extra_data: Option<Vec<u8>>,
  pub msg_count: i64,
}

impl DigestRow {
  /// Internal extra data of the latest entry, marker stripped.
  pub fn internal_extra_data(&self) -> ExtraData {
    let raw = self.extra_data.as_deref().unwrap_or_default();
    codec::partition_internal(&codec::decode_lossy(raw))
  }
}
