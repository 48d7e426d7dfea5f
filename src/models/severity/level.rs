//! Severity levels and their names.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Ordinal importance of a log entry. Larger codes are more severe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum Severity {
  Debug = -1,
  #[default]
  Info = 0,
  Notice = 1,
  Warn = 2,
  Fatal = 3,
}

impl Severity {
  pub const ALL: [Severity; 5] = [
    Severity::Debug,
    Severity::Info,
    Severity::Notice,
    Severity::Warn,
    Severity::Fatal,
  ];
  pub const MIN: Severity = Severity::Debug;
  /// Upper bound of the watchdog's per-severity scan.
  pub const MAX: Severity = Severity::Fatal;

  pub fn code(self) -> i64 {
    self as i64
  }

  /// Map a stored code to a level. Codes outside the table clamp to the
  /// nearest defined level.
  pub fn from_code(code: i64) -> Severity {
    match code {
      i64::MIN..=-1 => Severity::Debug,
      0 => Severity::Info,
      1 => Severity::Notice,
      2 => Severity::Warn,
      _ => Severity::Fatal,
    }
  }

  pub fn name(self) -> &'static str {
    match self {
      Severity::Debug => "DEBUG",
      Severity::Info => "INFO",
      Severity::Notice => "NOTICE",
      Severity::Warn => "WARN",
      Severity::Fatal => "FATAL",
    }
  }

  /// Case-insensitive lookup by name.
  pub fn from_name(name: &str) -> Option<Severity> {
    match name.trim().to_ascii_uppercase().as_str() {
      "DEBUG" => Some(Severity::Debug),
      "INFO" => Some(Severity::Info),
      "NOTICE" => Some(Severity::Notice),
      "WARN" | "WARNING" => Some(Severity::Warn),
      "FATAL" => Some(Severity::Fatal),
      _ => None,
    }
  }

  /// PSR-3 level name.
  pub fn psr_level(self) -> &'static str {
    match self {
      Severity::Debug => "debug",
      Severity::Info => "info",
      Severity::Notice => "notice",
      Severity::Warn => "warning",
      Severity::Fatal => "critical",
    }
  }

  /// Codes from `min` up to and including [`Severity::MAX`], ascending.
  pub fn codes_from(min: i64) -> std::ops::RangeInclusive<i64> {
    min.max(Severity::MIN.code())..=Severity::MAX.code()
  }
}

/// Name for a raw severity code.
pub fn level_name(code: i64) -> &'static str {
  Severity::from_code(code).name()
}

impl fmt::Display for Severity {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.name())
  }
}

impl FromStr for Severity {
  type Err = String;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    if let Some(level) = Severity::from_name(s) {
      return Ok(level);
    }
    s.trim()
      .parse::<i64>()
      .map(Severity::from_code)
      .map_err(|_| format!("unknown severity: {s}"))
  }
}

impl From<i64> for Severity {
  fn from(code: i64) -> Self {
    Severity::from_code(code)
  }
}

impl Serialize for Severity {
  fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(self.name())
  }
}

/// Accepts either a level name or a numeric code.
impl<'de> Deserialize<'de> for Severity {
  fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
      Code(i64),
      Name(String),
    }
    match Raw::deserialize(deserializer)? {
      Raw::Code(code) => Ok(Severity::from_code(code)),
      Raw::Name(name) => Severity::from_name(&name)
        .ok_or_else(|| serde::de::Error::custom(format!("unknown severity: {name}"))),
    }
  }
}
