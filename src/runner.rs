//! Check, record, and alert pipeline for one invocation

use crate::check::{display_or_none, CheckResult};
use crate::config::Config;
use crate::errors::{MonitorError, Result};
use crate::notifier::{DryRunNotifier, Notifier, NotifyOutcome, SmtpNotifier};
use crate::prober::HttpProber;
use crate::recorder::{DryRunRecorder, JsonFileRecorder, Recorder};
use std::io::Write;
use std::path::PathBuf;
use tracing::{info, instrument};

/// Whether durable and external side effects are performed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionMode {
    Live,
    DryRun,
}

impl ExecutionMode {
    pub fn from_test_flag(test_mode: bool) -> Self {
        if test_mode {
            ExecutionMode::DryRun
        } else {
            ExecutionMode::Live
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct RunOptions {
    /// Suppress history writes and email delivery
    pub test_mode: bool,
    /// Treat the check as a server failure regardless of the real outcome
    pub force_down: bool,
}

/// Summary of what one invocation did.
#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub result: CheckResult,
    pub log_location: Option<PathBuf>,
    pub notification: Option<NotifyOutcome>,
}

/// Runs prober, recorder and notifier once, in that order.
pub struct UptimeRunner {
    config: Config,
    options: RunOptions,
    prober: HttpProber,
    recorder: Box<dyn Recorder>,
    notifier: Box<dyn Notifier>,
}

impl UptimeRunner {
    pub fn new(config: Config, options: RunOptions) -> Result<Self> {
        config.validate().map_err(MonitorError::Config)?;

        let prober = HttpProber::new(config.check_timeout)?;
        let mode = ExecutionMode::from_test_flag(options.test_mode);
        let (recorder, notifier) = side_effects_for(mode, &config);

        Ok(Self {
            config,
            options,
            prober,
            recorder,
            notifier,
        })
    }

    /// Run once, printing the console report to stdout.
    pub async fn run(&self) -> Result<RunOutcome> {
        let mut stdout = std::io::stdout();
        self.run_with_console(&mut stdout).await
    }

    #[instrument(skip(self, console), fields(url = %self.config.url))]
    pub async fn run_with_console(&self, console: &mut (dyn Write + Send)) -> Result<RunOutcome> {
        let mut result = self.prober.check(&self.config.url).await;

        if self.options.force_down {
            result = result.force_down();
            writeln!(console, "[TEST MODE] Forcing website down state")?;
        }

        for line in summary_lines(&result) {
            writeln!(console, "{}", line)?;
        }

        let log_location = self.recorder.record(&result, console).await?;

        let notification = if result.is_up {
            None
        } else {
            writeln!(console, "Website is DOWN! Sending alert email...")?;
            Some(self.notifier.notify(&result, console).await?)
        };

        info!(
            "Run complete - up: {}, status: {:?}, notified: {:?}",
            result.is_up, result.status_code, notification
        );

        Ok(RunOutcome {
            result,
            log_location,
            notification,
        })
    }
}

/// Human-readable summary of a check, one line each.
pub fn summary_lines(result: &CheckResult) -> Vec<String> {
    vec![
        format!("Website check result: {}", result.status_label()),
        format!("Status code: {}", display_or_none(result.status_code)),
        format!("Response time: {} seconds", display_or_none(result.response_time)),
    ]
}

/// Pick the recorder and notifier implementations for `mode`.
fn side_effects_for(mode: ExecutionMode, config: &Config) -> (Box<dyn Recorder>, Box<dyn Notifier>) {
    match mode {
        ExecutionMode::Live => (
            Box::new(JsonFileRecorder::new(config.log_file.clone())),
            Box::new(SmtpNotifier::new(config)),
        ),
        ExecutionMode::DryRun => (
            Box::new(DryRunRecorder),
            Box::new(DryRunNotifier::new(config)),
        ),
    }
}
