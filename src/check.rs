//! Check result and history data structures

use chrono::Local;
use serde::{Deserialize, Serialize};

/// Error message recorded when `--force-down` overrides a real check.
pub const FORCED_DOWN_MESSAGE: &str = "Forced down state for testing";

/// Outcome of a single check against the monitored URL.
///
/// A successful response always carries `status_code` and `response_time`.
/// A transport failure carries only `error_message`.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct CheckResult {
    pub timestamp: String,
    pub is_up: bool,
    pub status_code: Option<u16>,
    pub response_time: Option<f64>,
    pub error_message: Option<String>,
}

impl CheckResult {
    /// Classify a received response.
    pub fn from_response(timestamp: String, status_code: u16, response_time: f64) -> Self {
        Self {
            timestamp,
            is_up: (200..300).contains(&status_code),
            status_code: Some(status_code),
            response_time: Some(response_time),
            error_message: None,
        }
    }

    /// Record a request that never produced a response.
    pub fn from_transport_failure(timestamp: String, error_message: String) -> Self {
        Self {
            timestamp,
            is_up: false,
            status_code: None,
            response_time: None,
            error_message: Some(error_message),
        }
    }

    /// Overwrite the outcome with a synthetic server failure.
    pub fn force_down(mut self) -> Self {
        self.is_up = false;
        self.status_code = Some(500);
        self.error_message = Some(FORCED_DOWN_MESSAGE.to_string());
        self
    }

    pub fn status_label(&self) -> &'static str {
        if self.is_up { "UP" } else { "DOWN" }
    }
}

/// On-disk history document: `{"checks": [...]}`.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct HistoryLog {
    pub checks: Vec<CheckResult>,
}

impl HistoryLog {
    pub fn append(&mut self, result: CheckResult) {
        self.checks.push(result);
    }

    pub fn len(&self) -> usize {
        self.checks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.checks.is_empty()
    }
}

/// Local wall-clock time in ISO-8601 form without offset,
/// e.g. `2024-05-01T09:30:00.123456`.
pub fn local_timestamp() -> String {
    Local::now()
        .naive_local()
        .format("%Y-%m-%dT%H:%M:%S%.6f")
        .to_string()
}

/// Render an optional value the way the console transcript shows it.
pub fn display_or_none<T: std::fmt::Display>(value: Option<T>) -> String {
    match value {
        Some(v) => v.to_string(),
        None => "None".to_string(),
    }
}
