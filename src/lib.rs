//! Website Uptime Checker Library
//!
//! Performs a single HTTP health check against a configured URL, appends the
//! outcome to a JSON history file, and emails an alert when the site is down.

pub mod config;
pub mod check;
pub mod prober;
pub mod recorder;
pub mod notifier;
pub mod runner;
pub mod errors;

pub use config::Config;
pub use check::{CheckResult, HistoryLog};
pub use prober::HttpProber;
pub use recorder::{Recorder, JsonFileRecorder, DryRunRecorder};
pub use notifier::{Notifier, NotifyOutcome, SmtpNotifier, DryRunNotifier, AlertEmail};
pub use runner::{UptimeRunner, RunOptions, RunOutcome, ExecutionMode};
pub use errors::{MonitorError, Result};
