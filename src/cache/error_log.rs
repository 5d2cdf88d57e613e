//! Error Log Module
//!
//! Daily-rotated plain-text log of swallowed failures, kept under the cache
//! root. One tab-separated line per failure: timestamp, operation, detail.

use std::io::Write;
use std::path::Path;
use std::sync::Mutex;

use chrono::Local;
use tracing::{error, warn};
use tracing_appender::rolling::{RollingFileAppender, Rotation};

use crate::error::{CacheError, Result};

const LOG_PREFIX: &str = "errors";
const LOG_SUFFIX: &str = "log";

// == Error Log ==
pub struct ErrorLog {
    writer: Mutex<RollingFileAppender>,
}

impl std::fmt::Debug for ErrorLog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ErrorLog").finish_non_exhaustive()
    }
}

impl ErrorLog {
    /// Opens the rolling log in `dir`.
    pub fn open(dir: &Path) -> Result<Self> {
        let writer = RollingFileAppender::builder()
            .rotation(Rotation::DAILY)
            .filename_prefix(LOG_PREFIX)
            .filename_suffix(LOG_SUFFIX)
            .build(dir)
            .map_err(|e| CacheError::ErrorLog(e.to_string()))?;

        Ok(Self {
            writer: Mutex::new(writer),
        })
    }

    // == Record ==
    /// Appends one failure line. Never fails: if the file cannot be written
    /// the failure only goes to tracing.
    pub fn record(&self, operation: &str, key: Option<&str>, err: &CacheError) {
        warn!(operation, key, error = %err, "cache operation failed");

        let detail = match key {
            Some(key) => format!("[{key}] {err}"),
            None => err.to_string(),
        };
        if let Err(log_err) = self.append(operation, &detail) {
            error!(operation, error = %log_err, "failed to write cache error log");
        }
    }

    fn append(&self, operation: &str, detail: &str) -> std::io::Result<()> {
        let line = format!(
            "{}\t{}\t{}\n",
            Local::now().format("%Y-%m-%d %H:%M:%S%.3f"),
            operation,
            single_line(detail)
        );

        let mut writer = self.writer.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        writer.write_all(line.as_bytes())?;
        writer.flush()
    }
}

fn single_line(detail: &str) -> String {
    detail.replace(['\r', '\n'], " ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn log_contents(dir: &Path) -> String {
        std::fs::read_dir(dir)
            .unwrap()
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.file_name().to_string_lossy().starts_with(LOG_PREFIX))
            .map(|entry| std::fs::read_to_string(entry.path()).unwrap())
            .collect()
    }

    #[test]
    fn test_record_appends_line() {
        let dir = TempDir::new().unwrap();
        let log = ErrorLog::open(dir.path()).unwrap();

        log.record("get", Some("a"), &CacheError::MissingPayload("a".to_string()));
        log.record("set", None, &CacheError::InvalidKey("bad\nkey".to_string()));

        let contents = log_contents(dir.path());
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 2);

        let fields: Vec<&str> = lines[0].split('\t').collect();
        assert_eq!(fields.len(), 3);
        assert_eq!(fields[1], "get");
        assert_eq!(fields[2], "[a] Payload missing for key: a");
        assert!(lines[1].contains("bad key"));
    }

    #[test]
    fn test_log_file_is_dated() {
        let dir = TempDir::new().unwrap();
        let log = ErrorLog::open(dir.path()).unwrap();
        log.record("remove", Some("x"), &CacheError::InvalidKey("x".to_string()));

        // The appender dates its files in UTC
        let today = chrono::Utc::now().format("%Y-%m-%d").to_string();
        let names: Vec<String> = std::fs::read_dir(dir.path())
            .unwrap()
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.file_name().to_string_lossy().into_owned())
            .collect();
        assert!(names
            .iter()
            .any(|name| name.starts_with(LOG_PREFIX) && name.ends_with(LOG_SUFFIX) && name.contains(&today)));
    }
}
