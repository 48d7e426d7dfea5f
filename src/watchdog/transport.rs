//! Mail delivery of watchdog reports.

use super::report::Report;
use crate::app::config::Config;
use crate::error::TransportError;
use lettre::message::{Mailbox, MultiPart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use std::future::Future;
use tracing::debug;

/// Delivers a rendered report to a list of recipients.
pub trait MailTransport {
  fn send(
    &self,
    report: &Report,
    recipients: &[String],
  ) -> impl Future<Output = Result<(), TransportError>> + Send;
}

/// Build the multipart (plain text + HTML) message for a report.
pub fn build_message(
  from: &Mailbox,
  report: &Report,
  recipients: &[String],
) -> Result<Message, TransportError> {
  let mut builder = Message::builder()
    .from(from.clone())
    .subject(report.subject.as_str());
  for recipient in recipients {
    let mailbox: Mailbox = recipient.parse().map_err(|e| TransportError::Address {
      address: recipient.clone(),
      reason: format!("{e}"),
    })?;
    builder = builder.to(mailbox);
  }
  builder
    .multipart(MultiPart::alternative_plain_html(
      report.text.clone(),
      report.html.clone(),
    ))
    .map_err(|e| TransportError::Build(e.to_string()))
}

/// SMTP delivery through lettre.
#[derive(Clone)]
pub struct SmtpMailTransport {
  mailer: AsyncSmtpTransport<Tokio1Executor>,
  from: Mailbox,
}

impl SmtpMailTransport {
  pub fn from_config(config: &Config) -> Result<Self, TransportError> {
    let from = config
      .mail_from
      .parse::<Mailbox>()
      .map_err(|e| TransportError::Address {
        address: config.mail_from.clone(),
        reason: format!("{e}"),
      })?;
    let mut builder = AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(config.smtp_host.as_str())
      .port(config.smtp_port);
    if let (Some(user), Some(pass)) = (&config.smtp_user, &config.smtp_pass) {
      builder = builder.credentials(Credentials::new(user.clone(), pass.clone()));
    }
    Ok(Self {
      mailer: builder.build(),
      from,
    })
  }
}

impl MailTransport for SmtpMailTransport {
  async fn send(&self, report: &Report, recipients: &[String]) -> Result<(), TransportError> {
    let message = build_message(&self.from, report, recipients)?;
    let response = self
      .mailer
      .send(message)
      .await
      .map_err(|e| TransportError::Delivery(e.to_string()))?;
    debug!("smtp accepted watchdog mail: {}", response.code());
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn report() -> Report {
    Report {
      subject: "DevLog WatchDog on site test".into(),
      text: "plain".into(),
      html: "<b>html</b>".into(),
    }
  }

  #[test]
  fn message_carries_subject_and_recipients() {
    let from: Mailbox = "devlog@example.test".parse().unwrap();
    let recipients = vec!["ops@example.test".to_string(), "dev@example.test".to_string()];
    let message = build_message(&from, &report(), &recipients).unwrap();
    let raw = String::from_utf8(message.formatted()).unwrap();
    assert!(raw.contains("Subject: DevLog WatchDog on site test"));
    assert!(raw.contains("ops@example.test"));
    assert!(raw.contains("dev@example.test"));
  }

  #[test]
  fn bad_recipient_is_reported() {
    let from: Mailbox = "devlog@example.test".parse().unwrap();
    let err = build_message(&from, &report(), &["not an address".to_string()]).unwrap_err();
    assert!(matches!(err, TransportError::Address { .. }));
  }

  #[test]
  fn transport_builds_from_config() {
    let config = Config {
      mail_from: "Devlog <devlog@example.test>".into(),
      ..Config::default()
    };
    assert!(SmtpMailTransport::from_config(&config).is_ok());
    let config = Config {
      mail_from: "nope".into(),
      ..Config::default()
    };
    assert!(SmtpMailTransport::from_config(&config).is_err());
  }
}
