//! Configuration management for the uptime checker

use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// URL of the monitored website
    pub url: String,

    /// Hard timeout for the health check request
    pub check_timeout: Duration,

    /// Path to the JSON history file
    pub log_file: PathBuf,

    /// Mail relay used for alert submission (STARTTLS)
    pub smtp_host: String,

    /// Submission port on the mail relay
    pub smtp_port: u16,

    /// Timeout for each SMTP command
    pub smtp_timeout: Duration,

    /// Mailbox used as SMTP login and as both sender and recipient
    pub email_username: Option<String>,

    /// SMTP password for `email_username`
    #[serde(skip_serializing)]
    pub email_password: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            url: "https://example.com".to_string(),
            check_timeout: Duration::from_secs(30),
            log_file: PathBuf::from("uptime_log.json"),
            smtp_host: "smtp.gmail.com".to_string(),
            smtp_port: 587,
            smtp_timeout: Duration::from_secs(30),
            email_username: None,
            email_password: None,
        }
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Overlay values returned by `lookup` on top of the defaults
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Config::default();

        if let Some(url) = lookup("UPTIME_URL") {
            config.url = url.trim().to_string();
        }

        if let Some(timeout) = lookup("CHECK_TIMEOUT_SECONDS") {
            if let Ok(seconds) = timeout.parse::<u64>() {
                config.check_timeout = Duration::from_secs(seconds);
            }
        }

        if let Some(log_file) = lookup("UPTIME_LOG_FILE") {
            config.log_file = PathBuf::from(log_file);
        }

        if let Some(smtp_host) = lookup("SMTP_HOST") {
            config.smtp_host = smtp_host.trim().to_string();
        }

        if let Some(smtp_port) = lookup("SMTP_PORT") {
            if let Ok(port) = smtp_port.parse() {
                config.smtp_port = port;
            }
        }

        if let Some(timeout) = lookup("SMTP_TIMEOUT_SECONDS") {
            if let Ok(seconds) = timeout.parse::<u64>() {
                config.smtp_timeout = Duration::from_secs(seconds);
            }
        }

        config.email_username = lookup("EMAIL_USERNAME").filter(|v| !v.trim().is_empty());
        config.email_password = lookup("EMAIL_PASSWORD").filter(|v| !v.is_empty());

        config
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.url.is_empty() {
            return Err("url cannot be empty".to_string());
        }

        match reqwest::Url::parse(&self.url) {
            Ok(parsed) if matches!(parsed.scheme(), "http" | "https") => {}
            Ok(parsed) => {
                return Err(format!("url scheme must be http or https, got {}", parsed.scheme()));
            }
            Err(e) => return Err(format!("url is not valid: {}", e)),
        }

        if self.check_timeout.is_zero() {
            return Err("check_timeout must be greater than 0".to_string());
        }

        if self.log_file.as_os_str().is_empty() {
            return Err("log_file cannot be empty".to_string());
        }

        if self.smtp_host.is_empty() {
            return Err("smtp_host cannot be empty".to_string());
        }

        if self.smtp_port == 0 {
            return Err("smtp_port must be greater than 0".to_string());
        }

        Ok(())
    }
}
