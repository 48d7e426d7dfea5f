//! Watchdog: mails a digest of recent problems to operators.
//!
//! A run builds a [`Digest`](digest::Digest) of everything logged since the
//! last run and sends it when something at or above the minimum level turned
//! up, or when a summary is forced.

use crate::db::entry_store::{EntryFilter, EntryStore};
use crate::error::Result;
use crate::models::severity::level::Severity;
use chrono::{DateTime, Utc};
use digest::{Digest, DigestBuilder, DigestOptions};
use report::render;
use tracing::{error, info, warn};
use transport::MailTransport;

pub mod digest;
pub mod report;
pub mod transport;

#[derive(Debug, Clone)]
pub struct WatchdogOptions {
  /// Send the overview even when no bucket has entries.
  pub force_summary: bool,
  pub min_level: i64,
  /// Rows per severity bucket.
  pub limit: i64,
  /// Include the internal extra data of each row.
  pub data_var: bool,
  /// Deliver each entry at most once for this transport id.
  pub transport_id: Option<String>,
}

impl Default for WatchdogOptions {
  fn default() -> Self {
    Self {
      force_summary: false,
      min_level: Severity::Warn.code(),
      limit: 30,
      data_var: false,
      transport_id: None,
    }
  }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WatchdogOutcome {
  /// No recipients configured; nothing was queried or sent.
  NoRecipients,
  NothingToReport,
  /// The transport accepted the mail; `marked` entries were recorded as
  /// delivered for the run's transport id.
  Delivered { marked: u64 },
  DeliveryFailed { reason: String },
}

/// Whether a digest warrants a mail.
pub fn should_send(digest: &Digest, force_summary: bool) -> bool {
  force_summary || digest.data_found
}

pub struct Watchdog<T> {
  store: EntryStore,
  transport: T,
  subject: String,
}

impl<T: MailTransport> Watchdog<T> {
  pub fn new(store: EntryStore, transport: T, subject: impl Into<String>) -> Self {
    Self {
      store,
      transport,
      subject: subject.into(),
    }
  }

  /// One watchdog pass over the entries created at or after `last_run`.
  ///
  /// Store failures propagate; a failed delivery is reported in the outcome
  /// and never retried.
  pub async fn run(
    &self,
    recipients: &[String],
    last_run: DateTime<Utc>,
    filter: &EntryFilter,
    options: &WatchdogOptions,
  ) -> Result<WatchdogOutcome> {
    let recipients: Vec<String> = recipients
      .iter()
      .map(|r| r.trim())
      .filter(|r| !r.is_empty())
      .map(str::to_string)
      .collect();
    if recipients.is_empty() {
      warn!("watchdog: no recipients configured, skipping");
      return Ok(WatchdogOutcome::NoRecipients);
    }

    let digest_options = DigestOptions {
      min_level: options.min_level,
      limit: options.limit,
      filter: EntryFilter {
        undelivered_by: options.transport_id.clone(),
        ..filter.clone()
      },
    };
    let digest = DigestBuilder::new(self.store.clone())
      .build_since(last_run.timestamp(), &digest_options)
      .await?;

    self
      .maybe_send(&digest, &recipients, &digest_options.filter, options)
      .await
  }

  /// Send the digest when [`should_send`] says so.
  pub async fn maybe_send(
    &self,
    digest: &Digest,
    recipients: &[String],
    filter: &EntryFilter,
    options: &WatchdogOptions,
  ) -> Result<WatchdogOutcome> {
    if !should_send(digest, options.force_summary) {
      info!("watchdog: nothing to report since {}", digest.since);
      return Ok(WatchdogOutcome::NothingToReport);
    }

    let report = render(digest, &self.subject, options.data_var);
    if let Err(e) = self.transport.send(&report, recipients).await {
      error!("watchdog: mail delivery failed: {e}");
      return Ok(WatchdogOutcome::DeliveryFailed {
        reason: e.to_string(),
      });
    }
    info!("watchdog: report sent to {} recipient(s)", recipients.len());

    let marked = match (&options.transport_id, digest.high_water_id) {
      (Some(transport_id), Some(_)) => {
        self
          .store
          .mark_delivered(&digest.window(filter), &digest.severity_codes(), transport_id)
          .await?
      }
      _ => 0,
    };
    Ok(WatchdogOutcome::Delivered { marked })
  }
}
