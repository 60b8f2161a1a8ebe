//! Alert email composition and delivery

use crate::check::CheckResult;
use crate::config::Config;
use crate::errors::{describe_error, MonitorError, Result};
use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use std::io::Write;
use std::time::Duration;
use tokio::time::timeout;
use tracing::{error, info};

const BODY_TRAILER: &str = "This is an automated message from your uptime checker.";

/// What happened when an alert was requested.
#[derive(Debug, Clone, PartialEq)]
pub enum NotifyOutcome {
    Sent,
    /// Dry run: the alert was printed, not sent.
    Previewed,
    /// Delivery failed; the run carries on.
    Failed(String),
}

/// Delivers a down alert for a failed check.
///
/// Delivery problems are reported as `NotifyOutcome::Failed`; only a
/// failure to write to `console` is returned as an error.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(
        &self,
        result: &CheckResult,
        console: &mut (dyn Write + Send),
    ) -> Result<NotifyOutcome>;
}

/// Plain-text alert for a down check.
#[derive(Debug, Clone, PartialEq)]
pub struct AlertEmail {
    pub subject: String,
    pub body: String,
}

impl AlertEmail {
    pub fn compose(url: &str, result: &CheckResult) -> Self {
        let mut body = format!(
            "Your website appears to be down!\n\nURL: {}\nTime of check: {}\n\n",
            url, result.timestamp
        );

        if let Some(status_code) = result.status_code {
            body.push_str(&format!("Status code: {}\n", status_code));
        }

        if let Some(error_message) = &result.error_message {
            body.push_str(&format!("Error message: {}\n", error_message));
        }

        body.push('\n');
        body.push_str(BODY_TRAILER);

        Self {
            subject: subject_for(url),
            body,
        }
    }
}

pub fn subject_for(url: &str) -> String {
    format!("⚠️ ALERT: Website {} is DOWN!", url)
}

/// Sends alerts through an authenticated STARTTLS submission relay.
/// The configured mailbox is login, sender and recipient.
#[derive(Debug, Clone)]
pub struct SmtpNotifier {
    url: String,
    smtp_host: String,
    smtp_port: u16,
    smtp_timeout: Duration,
    username: Option<String>,
    password: Option<String>,
}

impl SmtpNotifier {
    pub fn new(config: &Config) -> Self {
        Self {
            url: config.url.clone(),
            smtp_host: config.smtp_host.clone(),
            smtp_port: config.smtp_port,
            smtp_timeout: config.smtp_timeout,
            username: config.email_username.clone(),
            password: config.email_password.clone(),
        }
    }

    async fn deliver(&self, result: &CheckResult) -> Result<()> {
        let username = self
            .username
            .as_deref()
            .ok_or_else(|| MonitorError::Config("EMAIL_USERNAME is not set".to_string()))?;
        let password = self
            .password
            .as_deref()
            .ok_or_else(|| MonitorError::Config("EMAIL_PASSWORD is not set".to_string()))?;

        let alert = AlertEmail::compose(&self.url, result);
        let mailbox: Mailbox = username.parse()?;

        let message = Message::builder()
            .from(mailbox.clone())
            .to(mailbox)
            .subject(alert.subject)
            .header(ContentType::TEXT_PLAIN)
            .body(alert.body)?;

        let mailer = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&self.smtp_host)?
            .port(self.smtp_port)
            .credentials(Credentials::new(username.to_string(), password.to_string()))
            .timeout(Some(self.smtp_timeout))
            .build();

        // Bounds the whole session, including a relay that never greets.
        let response = timeout(self.smtp_timeout, mailer.send(message))
            .await
            .map_err(|_| {
                MonitorError::Email(format!(
                    "SMTP session with {}:{} timed out after {:?}",
                    self.smtp_host, self.smtp_port, self.smtp_timeout
                ))
            })??;
        info!(
            "Alert accepted by {}:{} ({})",
            self.smtp_host,
            self.smtp_port,
            response.code()
        );
        Ok(())
    }
}

#[async_trait]
impl Notifier for SmtpNotifier {
    async fn notify(
        &self,
        result: &CheckResult,
        console: &mut (dyn Write + Send),
    ) -> Result<NotifyOutcome> {
        match self.deliver(result).await {
            Ok(()) => {
                writeln!(console, "Alert email sent successfully!")?;
                Ok(NotifyOutcome::Sent)
            }
            Err(e) => {
                let message = describe_error(&e);
                error!("Failed to send alert email: {}", message);
                writeln!(console, "Failed to send email: {}", message)?;
                Ok(NotifyOutcome::Failed(message))
            }
        }
    }
}

/// Prints the subject and recipient instead of contacting the relay.
#[derive(Debug, Clone)]
pub struct DryRunNotifier {
    url: String,
    recipient: Option<String>,
}

impl DryRunNotifier {
    pub fn new(config: &Config) -> Self {
        Self {
            url: config.url.clone(),
            recipient: config.email_username.clone(),
        }
    }
}

#[async_trait]
impl Notifier for DryRunNotifier {
    async fn notify(
        &self,
        _result: &CheckResult,
        console: &mut (dyn Write + Send),
    ) -> Result<NotifyOutcome> {
        writeln!(console, "[TEST MODE] Would send email alert with the following content:")?;
        writeln!(console, "Subject: {}", subject_for(&self.url))?;
        writeln!(
            console,
            "To: {}",
            self.recipient.as_deref().unwrap_or("<EMAIL_USERNAME not set>")
        )?;
        writeln!(console, "\nEmail body would contain check details")?;
        Ok(NotifyOutcome::Previewed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::check::FORCED_DOWN_MESSAGE;
    use std::net::TcpListener;
    use std::time::Instant;

    fn down_result() -> CheckResult {
        CheckResult::from_transport_failure(
            "2024-05-01T09:30:00.000000".to_string(),
            "operation timed out".to_string(),
        )
    }

    /// Accepts TCP connections via the backlog but never greets.
    fn silent_relay() -> TcpListener {
        let relay = TcpListener::bind("127.0.0.1:0").unwrap();
        relay.set_nonblocking(true).unwrap();
        relay
    }

    fn relay_config(relay: &TcpListener) -> Config {
        let mut config = Config::default();
        config.smtp_host = "127.0.0.1".to_string();
        config.smtp_port = relay.local_addr().unwrap().port();
        config.smtp_timeout = Duration::from_millis(500);
        config.email_username = Some("ops@example.com".to_string());
        config.email_password = Some("secret".to_string());
        config
    }

    #[test]
    fn test_compose_transport_failure() {
        let alert = AlertEmail::compose("https://example.com", &down_result());

        assert_eq!(alert.subject, "⚠️ ALERT: Website https://example.com is DOWN!");
        assert!(alert.body.contains("URL: https://example.com\n"));
        assert!(alert.body.contains("Time of check: 2024-05-01T09:30:00.000000\n"));
        assert!(alert.body.contains("Error message: operation timed out\n"));
        assert!(!alert.body.contains("Status code:"));
        assert!(alert.body.ends_with(BODY_TRAILER));
    }

    #[test]
    fn test_compose_http_failure_has_status() {
        let result = CheckResult::from_response("2024-05-01T09:30:00.000000".to_string(), 502, 0.4);
        let alert = AlertEmail::compose("https://example.com", &result);

        assert!(alert.body.contains("Status code: 502\n"));
        assert!(!alert.body.contains("Error message:"));
    }

    #[test]
    fn test_compose_forced_down_has_both() {
        let result = down_result().force_down();
        let alert = AlertEmail::compose("https://example.com", &result);

        assert!(alert.body.contains("Status code: 500\n"));
        assert!(alert.body.contains(FORCED_DOWN_MESSAGE));
    }

    #[tokio::test]
    async fn test_missing_credentials_is_non_fatal() {
        let notifier = SmtpNotifier::new(&Config::default());
        let mut console = Vec::new();

        match notifier.notify(&down_result(), &mut console).await.unwrap() {
            NotifyOutcome::Failed(message) => assert!(message.contains("EMAIL_USERNAME")),
            other => panic!("expected failure, got {:?}", other),
        }
        assert!(String::from_utf8(console).unwrap().starts_with("Failed to send email: "));
    }

    #[tokio::test]
    async fn test_silent_relay_times_out() {
        let relay = silent_relay();
        let notifier = SmtpNotifier::new(&relay_config(&relay));

        let started = Instant::now();
        let outcome = notifier.notify(&down_result(), &mut std::io::sink()).await.unwrap();

        assert!(started.elapsed() < Duration::from_secs(5));
        assert!(matches!(outcome, NotifyOutcome::Failed(_)));
        assert!(relay.accept().is_ok(), "notifier should have connected to the relay");
    }

    #[tokio::test]
    async fn test_dry_run_prints_subject_and_recipient() {
        let relay = silent_relay();
        let mut config = relay_config(&relay);
        config.url = "https://status.example.org".to_string();

        let mut console = Vec::new();
        let outcome = DryRunNotifier::new(&config)
            .notify(&down_result(), &mut console)
            .await
            .unwrap();

        assert_eq!(outcome, NotifyOutcome::Previewed);
        assert_eq!(
            String::from_utf8(console).unwrap(),
            "[TEST MODE] Would send email alert with the following content:\n\
             Subject: ⚠️ ALERT: Website https://status.example.org is DOWN!\n\
             To: ops@example.com\n\
             \n\
             Email body would contain check details\n"
        );
        assert!(relay.accept().is_err());
    }
}
