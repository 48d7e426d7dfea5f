//! Digest of the entries logged since a checkpoint.

use crate::db::entry_store::{EntryFilter, EntryStore};
use crate::error::Result;
use crate::models::digest::{digest_row::DigestRow, severity_count::SeverityCount};
use crate::models::severity::level::Severity;
use tracing::debug;

#[derive(Debug, Clone)]
pub struct DigestOptions {
  /// Lowest severity code that gets a detail bucket.
  pub min_level: i64,
  /// Rows per bucket.
  pub limit: i64,
  pub filter: EntryFilter,
}

impl Default for DigestOptions {
  fn default() -> Self {
    Self {
      min_level: Severity::Warn.code(),
      limit: 30,
      filter: EntryFilter::default(),
    }
  }
}

/// Deduplicated entries of one severity.
#[derive(Debug, Clone)]
pub struct SeverityBucket {
  pub severity: Severity,
  pub rows: Vec<DigestRow>,
}

#[derive(Debug, Clone)]
pub struct Digest {
  /// Inclusive checkpoint, epoch seconds.
  pub since: i64,
  /// Entry count per severity, every level.
  pub summary: Vec<SeverityCount>,
  /// One bucket per scanned severity, ascending; empty buckets are kept.
  pub buckets: Vec<SeverityBucket>,
  pub data_found: bool,
  /// Highest entry id inside the window when the digest was taken.
  pub high_water_id: Option<i64>,
}

impl Digest {
  pub fn bucket(&self, severity: Severity) -> Option<&SeverityBucket> {
    self.buckets.iter().find(|b| b.severity == severity)
  }

  pub fn severity_codes(&self) -> Vec<i64> {
    self.buckets.iter().map(|b| b.severity.code()).collect()
  }

  /// The filter covering exactly the entries this digest examined.
  pub fn window(&self, filter: &EntryFilter) -> EntryFilter {
    EntryFilter {
      since: Some(self.since),
      max_id: self.high_water_id,
      ..filter.clone()
    }
  }
}

#[derive(Debug, Clone)]
pub struct DigestBuilder {
  store: EntryStore,
}

impl DigestBuilder {
  pub fn new(store: EntryStore) -> Self {
    Self { store }
  }

  /// Build the digest of everything created at or after `since`.
  pub async fn build_since(&self, since: i64, options: &DigestOptions) -> Result<Digest> {
    let window = EntryFilter {
      since: Some(since),
      ..options.filter.clone()
    };
    let high_water_id = self.store.max_id(&window).await?;
    let codes = Severity::codes_from(options.min_level);

    let Some(high_water) = high_water_id else {
      debug!("watchdog: no entries since {since}");
      return Ok(Digest {
        since,
        summary: Vec::new(),
        buckets: codes
          .map(|code| SeverityBucket {
            severity: Severity::from_code(code),
            rows: Vec::new(),
          })
          .collect(),
        data_found: false,
        high_water_id: None,
      });
    };

    let window = EntryFilter {
      max_id: Some(high_water),
      ..window
    };
    let summary = self.store.select_severity_summary(&window).await?;

    let mut buckets = Vec::new();
    for code in codes {
      let rows = self
        .store
        .select_since(since, code, options.limit, &window, true)
        .await?;
      buckets.push(SeverityBucket {
        severity: Severity::from_code(code),
        rows,
      });
    }
    let data_found = buckets.iter().any(|b| !b.rows.is_empty());
    debug!(
      "watchdog: digest since {since} up to entry {high_water}, data found: {data_found}"
    );

    Ok(Digest {
      since,
      summary,
      buckets,
      data_found,
      high_water_id,
    })
  }
}
