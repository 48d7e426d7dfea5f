//! Plain-text and HTML rendering of a digest.

use super::digest::Digest;
use crate::models::digest::digest_row::DigestRow;
use crate::models::severity::level::{Severity, level_name};
use crate::util::html_escape;
use chrono::DateTime;
use std::fmt::Write;

const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// A rendered watchdog mail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Report {
  pub subject: String,
  pub text: String,
  pub html: String,
}

fn format_time(epoch: i64) -> String {
  DateTime::from_timestamp(epoch, 0)
    .unwrap_or_default()
    .format(TIME_FORMAT)
    .to_string()
}

fn anchor(severity: Severity) -> String {
  severity.name().to_ascii_lowercase()
}

fn data_dump(row: &DigestRow) -> String {
  let internal = row.internal_extra_data();
  if internal.is_empty() {
    return String::new();
  }
  serde_json::to_string_pretty(&internal).unwrap_or_default()
}

/// Render the overview and, when the digest found data, one detail section
/// per non-empty bucket. `data_var` adds the internal extra data of each row.
pub fn render(digest: &Digest, subject: &str, data_var: bool) -> Report {
  let since = format_time(digest.since);
  let mut text = String::new();
  let mut html = String::new();

  text.push_str("This is an automatic email from devlog. Don't answer!\n\n");
  html.push_str("<strong>This is an automatic email from devlog. Don't answer!</strong>\n");
  let _ = write!(text, "== Developer Log summary since {since} ==\n\n");
  let _ = writeln!(html, "<h2>Developer Log summary since {since}</h2>");

  html.push_str("<ul>\n");
  for count in &digest.summary {
    let level = Severity::from_code(count.severity);
    let _ = writeln!(
      text,
      "Level {} ({}): {} items found",
      level_name(count.severity),
      count.severity,
      count.cnt
    );
    let _ = writeln!(
      html,
      "<li><a href=\"#{}\">Level {} (Severity Number: {})</a>: {} items found</li>",
      anchor(level),
      level.name(),
      count.severity,
      count.cnt
    );
  }
  html.push_str("</ul>\n");

  if digest.data_found {
    text.push_str("\n== Latest entries by log level ==\n");
    html.push_str("<h2>Latest entries by log level</h2>\n");

    for bucket in digest.buckets.iter().filter(|b| !b.rows.is_empty()) {
      let level = bucket.severity;
      let _ = write!(text, "\nLevel {} ({}):\n", level.name(), level.code());
      let _ = writeln!(
        html,
        "<h3><a name=\"{}\">Level {} (Severity Number: {})</a></h3>",
        anchor(level),
        level.name(),
        level.code()
      );

      for row in &bucket.rows {
        let time = format_time(row.crdate);
        let host = row.host.as_deref().unwrap_or_default();
        let _ = write!(
          text,
          "Time: {time} Extension: {}\nHost: {host}\nMessage: {}\nCount: {}\n",
          row.ext_key, row.message, row.msg_count
        );
        let _ = write!(
          html,
          "<p>Time: {time}<br />Extension: {}<br />Host: {}<br />Message: {}<br />Count: {}</p>\n",
          html_escape(&row.ext_key),
          html_escape(host),
          html_escape(&row.message),
          row.msg_count
        );
        if data_var {
          let dump = data_dump(row);
          let _ = writeln!(text, "DataVar: {dump}");
          let _ = writeln!(html, "<pre>{}</pre>", html_escape(&dump));
        }
      }
    }
  }

  Report {
    subject: subject.to_string(),
    text,
    html,
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::models::digest::severity_count::SeverityCount;
  use crate::watchdog::digest::SeverityBucket;

  fn row(message: &str, count: i64, extra: Option<&str>) -> DigestRow {
    DigestRow {
      uid: 1,
      crdate: 86_400,
      severity: Severity::Warn.code(),
      ext_key: "shop".into(),
      message: message.into(),
      host: Some("web-1".into()),
      extra_data: extra.map(|e| e.as_bytes().to_vec()),
      msg_count: count,
    }
  }

  fn digest(rows: Vec<DigestRow>) -> Digest {
    let data_found = !rows.is_empty();
    Digest {
      since: 0,
      summary: vec![
        SeverityCount { severity: 0, cnt: 5 },
        SeverityCount { severity: 2, cnt: 2 },
      ],
      buckets: vec![
        SeverityBucket { severity: Severity::Warn, rows },
        SeverityBucket { severity: Severity::Fatal, rows: Vec::new() },
      ],
      data_found,
      high_water_id: Some(7),
    }
  }

  #[test]
  fn overview_lists_every_severity_with_anchor() {
    let report = render(&digest(Vec::new()), "subject", false);
    assert!(report.text.contains("since 1970-01-01 00:00:00"));
    assert!(report.text.contains("Level INFO (0): 5 items found"));
    assert!(report.text.contains("Level WARN (2): 2 items found"));
    assert!(
      report
        .html
        .contains("<a href=\"#warn\">Level WARN (Severity Number: 2)</a>: 2 items found")
    );
    assert!(!report.text.contains("Latest entries"));
  }

  #[test]
  fn details_cover_only_non_empty_buckets() {
    let report = render(&digest(vec![row("stock <low>", 2, None)]), "subject", false);
    assert!(report.text.contains("Level WARN (2):\nTime: 1970-01-02 00:00:00 Extension: shop"));
    assert!(report.text.contains("Message: stock <low>\nCount: 2"));
    assert!(!report.text.contains("Level FATAL (3):"));
    assert!(report.html.contains("<a name=\"warn\">"));
    assert!(report.html.contains("Message: stock &lt;low&gt;"));
    assert!(!report.text.contains("DataVar"));
  }

  #[test]
  fn data_var_dumps_internal_data_only() {
    let extra = r#"{"__request":"r-1","public":"p"}"#;
    let report = render(&digest(vec![row("boom", 1, Some(extra))]), "subject", true);
    assert!(report.text.contains("DataVar: {"));
    assert!(report.text.contains("\"request\": \"r-1\""));
    assert!(!report.text.contains("public"));
    assert!(report.html.contains("<pre>{"));
  }
}
