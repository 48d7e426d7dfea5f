//! Environment-driven configuration.

use crate::error::DevlogError;
use crate::models::severity::level::Severity;

/// 2 x 8 MiB, the size of a MEDIUMBLOB column.
pub const DEFAULT_MAX_EXTRA_DATA_SIZE: usize = 16 * 1024 * 1024;

pub const DEFAULT_MAIL_SUBJECT: &str = "DevLog WatchDog on site %s";

/// Runtime configuration.
#[derive(Debug, Clone)]
pub struct Config {
  /// sqlx SQLite URL
  pub database_url: String,
  /// HTTP listen address
  pub http_addr: String,
  /// Row budget of the entry table; 0 disables retention
  pub max_rows: u64,
  /// Host written to entries that do not name one
  pub default_host: Option<String>,
  pub site_name: String,
  /// Subject template; `%s` is replaced by the site name
  pub mail_subject: String,
  /// Entries below this level are not stored
  pub min_log_level: Severity,
  /// Facilities that are never stored
  pub exclude_facilities: Vec<String>,
  pub max_extra_data_size: usize,
  pub smtp_host: String,
  pub smtp_port: u16,
  pub smtp_user: Option<String>,
  pub smtp_pass: Option<String>,
  pub mail_from: String,
  pub watchdog: WatchdogConfig,
}

/// Defaults for a watchdog run started from the command line.
#[derive(Debug, Clone)]
pub struct WatchdogConfig {
  pub recipients: Vec<String>,
  pub min_level: Severity,
  pub limit: i64,
  pub force_summary: bool,
  pub data_var: bool,
  pub transport_id: Option<String>,
}

impl Default for WatchdogConfig {
  fn default() -> Self {
    Self {
      recipients: Vec::new(),
      min_level: Severity::Warn,
      limit: 30,
      force_summary: false,
      data_var: false,
      transport_id: None,
    }
  }
}

impl Default for Config {
  fn default() -> Self {
    Self {
      database_url: "sqlite://devlog.db".to_string(),
      http_addr: "127.0.0.1:8026".to_string(),
      max_rows: 10_000,
      default_host: None,
      site_name: "devlog".to_string(),
      mail_subject: DEFAULT_MAIL_SUBJECT.to_string(),
      min_log_level: Severity::Debug,
      exclude_facilities: Vec::new(),
      max_extra_data_size: DEFAULT_MAX_EXTRA_DATA_SIZE,
      smtp_host: "127.0.0.1".to_string(),
      smtp_port: 25,
      smtp_user: None,
      smtp_pass: None,
      mail_from: "devlog@localhost".to_string(),
      watchdog: WatchdogConfig::default(),
    }
  }
}

impl Config {
  /// Create configuration from `DEVLOG_*` environment variables.
  pub fn from_env() -> Result<Self, DevlogError> {
    Self::from_lookup(|key| std::env::var(key).ok())
  }

  /// Create configuration from an arbitrary key lookup.
  pub fn from_lookup<F>(lookup: F) -> Result<Self, DevlogError>
  where
    F: Fn(&str) -> Option<String>,
  {
    let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
    let defaults = Config::default();

    let config = Config {
      database_url: get("DEVLOG_DATABASE").unwrap_or(defaults.database_url),
      http_addr: get("DEVLOG_ADDR").unwrap_or(defaults.http_addr),
      max_rows: parse_or("DEVLOG_MAX_ROWS", get("DEVLOG_MAX_ROWS"), defaults.max_rows)?,
      default_host: get("DEVLOG_HOST"),
      site_name: get("DEVLOG_SITE_NAME").unwrap_or(defaults.site_name),
      mail_subject: get("DEVLOG_MAIL_SUBJECT").unwrap_or(defaults.mail_subject),
      min_log_level: parse_or(
        "DEVLOG_MIN_LOG_LEVEL",
        get("DEVLOG_MIN_LOG_LEVEL"),
        defaults.min_log_level,
      )?,
      exclude_facilities: get("DEVLOG_EXCLUDE_FACILITIES")
        .map(|v| split_list(&v))
        .unwrap_or_default(),
      max_extra_data_size: parse_or(
        "DEVLOG_MAX_EXTRA_DATA_SIZE",
        get("DEVLOG_MAX_EXTRA_DATA_SIZE"),
        defaults.max_extra_data_size,
      )?,
      smtp_host: get("DEVLOG_SMTP_HOST").unwrap_or(defaults.smtp_host),
      smtp_port: parse_or("DEVLOG_SMTP_PORT", get("DEVLOG_SMTP_PORT"), defaults.smtp_port)?,
      smtp_user: get("DEVLOG_SMTP_USER"),
      smtp_pass: get("DEVLOG_SMTP_PASS"),
      mail_from: get("DEVLOG_MAIL_FROM").unwrap_or(defaults.mail_from),
      watchdog: WatchdogConfig {
        recipients: get("DEVLOG_WATCHDOG_RECIPIENTS")
          .map(|v| split_list(&v))
          .unwrap_or_default(),
        min_level: parse_or(
          "DEVLOG_WATCHDOG_MIN_LEVEL",
          get("DEVLOG_WATCHDOG_MIN_LEVEL"),
          defaults.watchdog.min_level,
        )?,
        limit: parse_or(
          "DEVLOG_WATCHDOG_LIMIT",
          get("DEVLOG_WATCHDOG_LIMIT"),
          defaults.watchdog.limit,
        )?,
        force_summary: get("DEVLOG_WATCHDOG_FORCE_SUMMARY")
          .map(|v| parse_flag(&v))
          .unwrap_or(defaults.watchdog.force_summary),
        data_var: get("DEVLOG_WATCHDOG_DATA_VAR")
          .map(|v| parse_flag(&v))
          .unwrap_or(defaults.watchdog.data_var),
        transport_id: get("DEVLOG_WATCHDOG_TRANSPORT_ID"),
      },
    };

    config.validate()?;
    Ok(config)
  }

  /// Validate the configuration
  pub fn validate(&self) -> Result<(), DevlogError> {
    if self.watchdog.limit <= 0 {
      return Err(DevlogError::Config(
        "DEVLOG_WATCHDOG_LIMIT must be positive".to_string(),
      ));
    }
    if self.smtp_user.is_some() != self.smtp_pass.is_some() {
      return Err(DevlogError::Config(
        "DEVLOG_SMTP_USER and DEVLOG_SMTP_PASS must be set together".to_string(),
      ));
    }
    if let Some(id) = &self.watchdog.transport_id {
      if id.contains(',') {
        return Err(DevlogError::Config(
          "DEVLOG_WATCHDOG_TRANSPORT_ID must not contain a comma".to_string(),
        ));
      }
    }
    Ok(())
  }

  /// Mail subject with the site name filled in.
  pub fn render_subject(&self) -> String {
    self.mail_subject.replace("%s", &self.site_name)
  }
}

fn parse_or<T: std::str::FromStr>(key: &str, raw: Option<String>, default: T) -> Result<T, DevlogError> {
  match raw {
    None => Ok(default),
    Some(value) => value
      .parse()
      .map_err(|_| DevlogError::Config(format!("{key} has an invalid value: {value}"))),
  }
}

fn parse_flag(value: &str) -> bool {
  matches!(value.to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on")
}

fn split_list(value: &str) -> Vec<String> {
  value
    .split(',')
    .map(str::trim)
    .filter(|s| !s.is_empty())
    .map(str::to_string)
    .collect()
}
