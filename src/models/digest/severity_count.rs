//! Per-severity entry count.

use sqlx::FromRow;

#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct SeverityCount {
  pub severity: i64,
  pub cnt: i64,
}
