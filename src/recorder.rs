//! Append-only JSON history of check results

use crate::check::{CheckResult, HistoryLog};
use crate::errors::Result;
use async_trait::async_trait;
use std::ffi::OsString;
use std::io::{ErrorKind, Write};
use std::path::PathBuf;
use tokio::fs;
use tracing::{debug, info, warn};

/// Persists one check result per invocation.
#[async_trait]
pub trait Recorder: Send + Sync {
    /// Record `result`, returning where it was written (if anywhere).
    /// Human-readable output goes to `console`.
    async fn record(
        &self,
        result: &CheckResult,
        console: &mut (dyn Write + Send),
    ) -> Result<Option<PathBuf>>;
}

/// Read-modify-write recorder backed by a single JSON document.
///
/// No locking is performed: two invocations racing on the same file can
/// lose an update.
#[derive(Debug, Clone)]
pub struct JsonFileRecorder {
    path: PathBuf,
}

impl JsonFileRecorder {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Load the current history. A missing file yields an empty history;
    /// an unparseable one is moved aside and also yields an empty history.
    pub async fn load(&self) -> Result<HistoryLog> {
        let raw = match fs::read(&self.path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("No history at {}, starting fresh", self.path.display());
                return Ok(HistoryLog::default());
            }
            Err(e) => return Err(e.into()),
        };

        match serde_json::from_slice::<HistoryLog>(&raw) {
            Ok(history) => Ok(history),
            Err(e) => {
                self.quarantine(&e).await;
                Ok(HistoryLog::default())
            }
        }
    }

    /// Move a corrupt history aside. If that fails the file is simply
    /// overwritten by the next write.
    async fn quarantine(&self, cause: &serde_json::Error) {
        let mut name = OsString::from(self.path.as_os_str());
        name.push(".corrupt");
        let quarantine = PathBuf::from(name);

        match fs::rename(&self.path, &quarantine).await {
            Ok(()) => warn!(
                "History file {} is corrupt ({}), moved it to {} and starting fresh",
                self.path.display(),
                cause,
                quarantine.display()
            ),
            Err(e) => warn!(
                "History file {} is corrupt ({}) and could not be moved aside ({}), starting fresh",
                self.path.display(),
                cause,
                e
            ),
        }
    }
}

#[async_trait]
impl Recorder for JsonFileRecorder {
    async fn record(
        &self,
        result: &CheckResult,
        console: &mut (dyn Write + Send),
    ) -> Result<Option<PathBuf>> {
        let mut history = self.load().await?;
        history.append(result.clone());

        let serialized = serde_json::to_vec_pretty(&history)?;
        fs::write(&self.path, serialized).await?;

        info!(
            "Recorded check in {} ({} entries)",
            self.path.display(),
            history.len()
        );
        writeln!(console, "Check logged to {}", self.path.display())?;
        Ok(Some(self.path.clone()))
    }
}

/// Prints the would-be record instead of touching the filesystem.
#[derive(Debug, Clone, Default)]
pub struct DryRunRecorder;

#[async_trait]
impl Recorder for DryRunRecorder {
    async fn record(
        &self,
        result: &CheckResult,
        console: &mut (dyn Write + Send),
    ) -> Result<Option<PathBuf>> {
        writeln!(console, "[TEST MODE] Would log the following:")?;
        writeln!(console, "{}", serde_json::to_string_pretty(result)?)?;
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs as std_fs;
    use tempfile::TempDir;

    fn sample(code: u16) -> CheckResult {
        CheckResult::from_response("2024-05-01T09:30:00.000000".to_string(), code, 0.1)
    }

    async fn record_quietly(recorder: &dyn Recorder, result: &CheckResult) -> Result<Option<PathBuf>> {
        recorder.record(result, &mut std::io::sink()).await
    }

    #[tokio::test]
    async fn test_creates_file_on_first_record() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("uptime_log.json");
        let recorder = JsonFileRecorder::new(&path);

        let mut console = Vec::new();
        let location = recorder.record(&sample(200), &mut console).await.unwrap();

        assert_eq!(location, Some(path.clone()));
        assert_eq!(
            String::from_utf8(console).unwrap(),
            format!("Check logged to {}\n", path.display())
        );
        let history = recorder.load().await.unwrap();
        assert_eq!(history.checks, vec![sample(200)]);
    }

    #[tokio::test]
    async fn test_appends_in_order() {
        let dir = TempDir::new().unwrap();
        let recorder = JsonFileRecorder::new(dir.path().join("uptime_log.json"));

        let results = vec![
            sample(200),
            sample(503),
            CheckResult::from_transport_failure("2024-05-01T09:35:00.000000".to_string(), "timed out".to_string()),
        ];
        for result in &results {
            record_quietly(&recorder, result).await.unwrap();
        }

        assert_eq!(recorder.load().await.unwrap().checks, results);
    }

    #[tokio::test]
    async fn test_written_document_has_checks_field() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("uptime_log.json");
        record_quietly(&JsonFileRecorder::new(&path), &sample(200)).await.unwrap();

        let raw: serde_json::Value = serde_json::from_str(&std_fs::read_to_string(&path).unwrap()).unwrap();
        let checks = raw["checks"].as_array().unwrap();
        assert_eq!(checks.len(), 1);
        assert_eq!(checks[0]["status_code"], 200);
        assert!(checks[0]["error_message"].is_null());
    }

    #[tokio::test]
    async fn test_corrupt_file_is_reset_and_quarantined() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("uptime_log.json");
        std_fs::write(&path, "{not json").unwrap();

        let recorder = JsonFileRecorder::new(&path);
        record_quietly(&recorder, &sample(200)).await.unwrap();

        assert_eq!(recorder.load().await.unwrap().checks, vec![sample(200)]);
        let quarantined = dir.path().join("uptime_log.json.corrupt");
        assert_eq!(std_fs::read_to_string(quarantined).unwrap(), "{not json");
    }

    #[tokio::test]
    async fn test_non_utf8_file_is_reset() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("uptime_log.json");
        std_fs::write(&path, [0xff, 0xfe, b'{', 0x80]).unwrap();

        let recorder = JsonFileRecorder::new(&path);
        let location = record_quietly(&recorder, &sample(503)).await.unwrap();

        assert_eq!(location, Some(path.clone()));
        assert_eq!(recorder.load().await.unwrap().checks, vec![sample(503)]);
    }

    #[tokio::test]
    async fn test_wrong_shape_is_treated_as_corrupt() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("uptime_log.json");
        std_fs::write(&path, "[1, 2, 3]").unwrap();

        let recorder = JsonFileRecorder::new(&path);
        record_quietly(&recorder, &sample(500)).await.unwrap();

        assert_eq!(recorder.load().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_failed_quarantine_still_resets() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("uptime_log.json");
        std_fs::write(&path, "garbage").unwrap();
        // A directory at the quarantine path makes the rename fail.
        std_fs::create_dir(dir.path().join("uptime_log.json.corrupt")).unwrap();
        std_fs::write(dir.path().join("uptime_log.json.corrupt").join("keep"), "x").unwrap();

        let recorder = JsonFileRecorder::new(&path);
        record_quietly(&recorder, &sample(200)).await.unwrap();

        assert_eq!(recorder.load().await.unwrap().checks, vec![sample(200)]);
    }

    #[tokio::test]
    async fn test_unwritable_location_propagates() {
        let dir = TempDir::new().unwrap();
        let recorder = JsonFileRecorder::new(dir.path().join("missing").join("uptime_log.json"));

        assert!(record_quietly(&recorder, &sample(200)).await.is_err());
    }

    #[tokio::test]
    async fn test_dry_run_prints_record_and_writes_nothing() {
        let dir = TempDir::new().unwrap();
        let mut console = Vec::new();
        let location = DryRunRecorder.record(&sample(200), &mut console).await.unwrap();

        assert!(location.is_none());
        assert_eq!(std_fs::read_dir(dir.path()).unwrap().count(), 0);

        let printed = String::from_utf8(console).unwrap();
        assert!(printed.starts_with("[TEST MODE] Would log the following:\n"));
        assert!(printed.contains("\"status_code\": 200"));
    }
}
