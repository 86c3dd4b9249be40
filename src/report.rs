//! Host-facing reporting and the per-run log file
//!
//! The host engine owns the user-visible message surface; this module
//! couples it with a durable append-only log file created fresh for every
//! run. Everything surfaced as info or error is mirrored into the log and
//! emitted as a `tracing` event for embedders that subscribe.

use chrono::Local;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{error, info, warn};

/// Log filename inside the timestamped run directory
pub const LOG_FILENAME: &str = "snowflake_connector.log";

/// Errors that can occur while setting up the run log.
#[derive(Debug, Error)]
pub enum ReportError {
    /// Creating the run directory or log file failed
    #[error("Failed to set up the run log: {0}")]
    LogSetup(#[from] std::io::Error),
}

/// Handle into the host ETL engine, implemented by the embedder.
///
/// Models the message surface the connector reaches through: user-visible
/// info and error messages, the file-output channel (used once at startup to
/// note a fallback temp directory), upstream-driven progress, and the
/// host-provided default temp path.
pub trait HostEngine {
    /// Surface an informational message.
    fn info(&self, message: &str);

    /// Surface an error message.
    fn error(&self, message: &str);

    /// Surface a file-output notice.
    fn file_output(&self, message: &str);

    /// Report fractional progress (0.0–1.0) of the upstream record push.
    fn progress(&self, fraction: f64);

    /// Platform default temp directory, used when settings carry none.
    fn default_temp_dir(&self) -> PathBuf;
}

/// Append-only log file for one run.
///
/// Lives in a subdirectory of the temp directory named by the run's
/// Unix-epoch-seconds timestamp. Lines are `<timestamp> - <message>`.
pub struct RunLog {
    dir: PathBuf,
    file: File,
}

impl RunLog {
    /// Create the timestamped run directory and open the log inside it.
    pub fn create(temp_dir: &Path) -> Result<Self, ReportError> {
        let dir = temp_dir.join(chrono::Utc::now().timestamp().to_string());
        std::fs::create_dir_all(&dir)?;
        let file = OpenOptions::new()
            .append(true)
            .create(true)
            .open(dir.join(LOG_FILENAME))?;
        Ok(Self { dir, file })
    }

    /// The run directory holding the log.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Full path of the log file.
    pub fn path(&self) -> PathBuf {
        self.dir.join(LOG_FILENAME)
    }

    /// Append one message line.
    pub fn append(&mut self, message: &str) -> std::io::Result<()> {
        let line = format!(
            "{} - {}\n",
            Local::now().format("%Y-%m-%d %H:%M:%S,%3f"),
            message
        );
        self.file.write_all(line.as_bytes())
    }
}

/// Couples the host message surface with the run log.
///
/// Info and error messages go to the host, to `tracing`, and into the run
/// log once it is open. Log-append failures are not fatal to the run.
pub struct Reporter<H: HostEngine> {
    host: H,
    log: Option<RunLog>,
}

impl<H: HostEngine> Reporter<H> {
    /// Create a reporter with no log open yet.
    pub fn new(host: H) -> Self {
        Self { host, log: None }
    }

    /// The wrapped host handle.
    pub fn host(&self) -> &H {
        &self.host
    }

    /// The open run directory, if any.
    pub fn log_dir(&self) -> Option<&Path> {
        self.log.as_ref().map(RunLog::dir)
    }

    /// Create the run directory and open this run's log.
    pub fn open_log(&mut self, temp_dir: &Path) -> Result<(), ReportError> {
        self.log = Some(RunLog::create(temp_dir)?);
        Ok(())
    }

    /// Surface an informational message, mirrored into the run log.
    pub fn info(&mut self, message: &str) {
        info!("{message}");
        self.host.info(message);
        self.log_line(message);
    }

    /// Surface an error message, mirrored into the run log.
    pub fn error(&mut self, message: &str) {
        error!("{message}");
        self.host.error(message);
        self.log_line(message);
    }

    /// Surface a file-output notice (host only).
    pub fn file_output(&self, message: &str) {
        self.host.file_output(message);
    }

    /// Pass upstream progress through to the host.
    pub fn progress(&self, fraction: f64) {
        self.host.progress(fraction);
    }

    fn log_line(&mut self, message: &str) {
        if let Some(log) = self.log.as_mut()
            && log.append(message).is_err()
        {
            warn!("Failed to append to the run log");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use tempfile::TempDir;

    struct StubHost {
        infos: RefCell<Vec<String>>,
        errors: RefCell<Vec<String>>,
    }

    impl StubHost {
        fn new() -> Self {
            Self {
                infos: RefCell::new(Vec::new()),
                errors: RefCell::new(Vec::new()),
            }
        }
    }

    impl HostEngine for StubHost {
        fn info(&self, message: &str) {
            self.infos.borrow_mut().push(message.to_string());
        }
        fn error(&self, message: &str) {
            self.errors.borrow_mut().push(message.to_string());
        }
        fn file_output(&self, _message: &str) {}
        fn progress(&self, _fraction: f64) {}
        fn default_temp_dir(&self) -> PathBuf {
            std::env::temp_dir()
        }
    }

    #[test]
    fn test_run_log_creates_timestamped_dir() {
        let temp = TempDir::new().unwrap();
        let log = RunLog::create(temp.path()).unwrap();
        let dir_name = log.dir().file_name().unwrap().to_string_lossy().to_string();
        assert!(dir_name.chars().all(|c| c.is_ascii_digit()));
        assert!(log.path().exists());
    }

    #[test]
    fn test_run_log_line_format() {
        let temp = TempDir::new().unwrap();
        let mut log = RunLog::create(temp.path()).unwrap();
        log.append("Authenticated via Snowflake").unwrap();
        log.append("Processed 3 records").unwrap();

        let content = std::fs::read_to_string(log.path()).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 2);
        for line in &lines {
            let (timestamp, message) = line.split_once(" - ").unwrap();
            // %Y-%m-%d %H:%M:%S,%3f
            assert_eq!(timestamp.len(), 23);
            assert!(timestamp.contains(','));
            assert!(!message.is_empty());
        }
        assert!(lines[0].ends_with("Authenticated via Snowflake"));
    }

    #[test]
    fn test_reporter_mirrors_into_log() {
        let temp = TempDir::new().unwrap();
        let mut reporter = Reporter::new(StubHost::new());
        reporter.open_log(temp.path()).unwrap();
        reporter.info("hello");
        reporter.error("goodbye");

        assert_eq!(reporter.host().infos.borrow().as_slice(), ["hello"]);
        assert_eq!(reporter.host().errors.borrow().as_slice(), ["goodbye"]);

        let log_path = reporter.log_dir().unwrap().join(LOG_FILENAME);
        let content = std::fs::read_to_string(log_path).unwrap();
        assert!(content.contains(" - hello"));
        assert!(content.contains(" - goodbye"));
    }

    #[test]
    fn test_reporter_without_log_still_reaches_host() {
        let mut reporter = Reporter::new(StubHost::new());
        reporter.info("early message");
        assert_eq!(
            reporter.host().infos.borrow().as_slice(),
            ["early message"]
        );
    }
}
