//! HTTP health check against the monitored URL

use crate::check::{local_timestamp, CheckResult};
use crate::errors::{describe_error, MonitorError, Result};
use reqwest::Client;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Issues one bounded GET per call and classifies the outcome.
#[derive(Debug, Clone)]
pub struct HttpProber {
    client: Client,
    timeout: Duration,
}

impl HttpProber {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(format!("uptime_checker/{}", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(MonitorError::Http)?;

        Ok(Self { client, timeout })
    }

    /// Check `url` once. Transport failures are folded into the result.
    pub async fn check(&self, url: &str) -> CheckResult {
        let timestamp = local_timestamp();
        debug!("Checking {} (timeout {:?})", url, self.timeout);

        let started = Instant::now();
        match self.client.get(url).send().await {
            Ok(response) => {
                let elapsed = started.elapsed().as_secs_f64();
                let status = response.status().as_u16();
                debug!("{} answered {} in {:.3}s", url, status, elapsed);
                CheckResult::from_response(timestamp, status, elapsed)
            }
            Err(e) => {
                let message = describe_error(&e);
                warn!("Request to {} failed: {}", url, message);
                CheckResult::from_transport_failure(timestamp, message)
            }
        }
    }
}
