//! Host-facing pipeline facade
//!
//! Reframes the host's callback lifecycle (initialize, stream open, record
//! push, stream close) as an explicit object so the connector logic is
//! testable outside the host:
//!
//! ```text
//! accept(settings) -> on_stream_open() -> on_record(value)* -> on_stream_close()
//! ```
//!
//! A failed `accept` leaves the pipeline refusing records until a later
//! `accept` succeeds, and `on_stream_close` consumes the run, so one
//! accepted configuration drives at most one load. `on_stream_close` is
//! async; hosts without a runtime can enable the `host-runtime` feature for
//! a blocking adapter.

use thiserror::Error;
use tracing::info;

use crate::batch::{Batch, BatchError};
use crate::config::{Config, ConfigError, RawSettings};
use crate::loader::{LoadError, LoadOrchestrator, LoadReport};
use crate::report::{HostEngine, ReportError, Reporter};
use crate::warehouse::WarehouseDriver;

/// Crate version reported in the run banner
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Umbrella error for the pipeline surface.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// No valid configuration was accepted
    #[error("Pipeline is not initialized")]
    NotInitialized,

    /// Settings validation failed
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Batch validation failed at stream close
    #[error(transparent)]
    Batch(#[from] BatchError),

    /// The load protocol failed
    #[error(transparent)]
    Load(#[from] LoadError),

    /// Run-log setup failed
    #[error(transparent)]
    Report(#[from] ReportError),

    /// The blocking adapter could not start its runtime
    #[cfg(feature = "host-runtime")]
    #[error("Failed to start the blocking runtime: {0}")]
    Runtime(std::io::Error),
}

/// Outcome of one run, returned from `on_stream_close`.
#[derive(Debug)]
pub enum FinalStatus {
    /// The load protocol completed; data reached the target table
    Loaded(LoadReport),
    /// Zero records arrived; the run terminated without any warehouse call
    NoRecords,
    /// The run aborted before or during the load protocol
    Failed(PipelineError),
}

impl FinalStatus {
    /// Whether the run ended without failure.
    pub fn is_success(&self) -> bool {
        matches!(self, FinalStatus::Loaded(_) | FinalStatus::NoRecords)
    }

    /// The load report, when the protocol completed.
    pub fn report(&self) -> Option<&LoadReport> {
        match self {
            FinalStatus::Loaded(report) => Some(report),
            _ => None,
        }
    }
}

/// One run of the connector: configuration, batch, and load protocol.
///
/// Owns the driver and the host handle for the duration of the run; no two
/// runs share state.
pub struct Pipeline<D: WarehouseDriver, H: HostEngine> {
    driver: D,
    reporter: Reporter<H>,
    config: Option<Config>,
    batch: Batch,
    stream_open: bool,
}

impl<D: WarehouseDriver, H: HostEngine> Pipeline<D, H> {
    /// Create a pipeline around a driver and a host handle.
    pub fn new(driver: D, host: H) -> Self {
        Self {
            driver,
            reporter: Reporter::new(host),
            config: None,
            batch: Batch::new(),
            stream_open: false,
        }
    }

    /// The validated configuration, from `accept` until the run is consumed
    /// at stream close.
    pub fn config(&self) -> Option<&Config> {
        self.config.as_ref()
    }

    /// Validate host-supplied settings and arm the pipeline.
    ///
    /// On failure the error is surfaced to the host and the pipeline keeps
    /// refusing records.
    pub fn accept(&mut self, raw: RawSettings) -> Result<(), PipelineError> {
        match Config::validate(raw, self.reporter.host()) {
            Ok(config) => {
                self.config = Some(config);
                self.batch = Batch::new();
                self.stream_open = false;
                Ok(())
            }
            Err(e) => {
                self.config = None;
                self.reporter.error(&e.to_string());
                Err(e.into())
            }
        }
    }

    /// Start the run: open the run log and announce the connector version.
    pub fn on_stream_open(&mut self) -> Result<(), PipelineError> {
        let Some(config) = self.config.as_ref() else {
            return Err(PipelineError::NotInitialized);
        };

        let temp_dir = config.temp_dir.clone();
        if let Err(e) = self.reporter.open_log(&temp_dir) {
            self.reporter.error(&e.to_string());
            self.config = None;
            return Err(e.into());
        }

        self.reporter.info(&format!(
            "Running Snowflake JSON + XML Output version {VERSION}"
        ));
        self.stream_open = true;
        Ok(())
    }

    /// Collect one incoming value of the mapped data field.
    ///
    /// Ignored unless a configuration was accepted and the stream is open.
    pub fn on_record(&mut self, value: Option<&str>) {
        if self.config.is_some() && self.stream_open {
            self.batch.push(value);
        }
    }

    /// Pass upstream progress (0.0–1.0) through to the host.
    pub fn on_progress(&self, fraction: f64) {
        self.reporter.progress(fraction);
    }

    /// Freeze the batch, validate it, and run the load protocol.
    ///
    /// Consumes the run: the batch is taken here, records arriving after
    /// close are dropped, and a repeated close refuses rather than replaying
    /// the protocol. A new `accept` starts the next run.
    pub async fn on_stream_close(&mut self) -> FinalStatus {
        let Some(config) = self.config.take() else {
            return FinalStatus::Failed(PipelineError::NotInitialized);
        };
        self.stream_open = false;
        let batch = std::mem::take(&mut self.batch);

        let file_type = match batch.validate() {
            Ok(ext) => ext,
            Err(BatchError::EmptyBatch) => {
                self.reporter.info("No records to process");
                return FinalStatus::NoRecords;
            }
            Err(e) => {
                self.reporter.error(&e.to_string());
                return FinalStatus::Failed(e.into());
            }
        };
        info!(files = batch.len(), file_type = %file_type, "Batch validated");

        let mut orchestrator = LoadOrchestrator::new(&self.driver, &config, &mut self.reporter);
        let result = orchestrator.run(&batch, &file_type).await;

        match result {
            Ok(report) => {
                self.reporter.info("Snowflake transaction complete");
                FinalStatus::Loaded(report)
            }
            Err(e) => {
                self.reporter.error(&e.to_string());
                self.reporter.info("Snowflake transaction complete");
                FinalStatus::Failed(e.into())
            }
        }
    }
}

#[cfg(feature = "host-runtime")]
impl<D: WarehouseDriver, H: HostEngine> Pipeline<D, H> {
    /// Blocking `on_stream_close` for hosts without an async runtime.
    ///
    /// Drives the protocol on a current-thread tokio runtime.
    pub fn on_stream_close_blocking(&mut self) -> FinalStatus {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build();
        match runtime {
            Ok(rt) => rt.block_on(self.on_stream_close()),
            Err(e) => FinalStatus::Failed(PipelineError::Runtime(e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_final_status_success() {
        assert!(FinalStatus::NoRecords.is_success());
        assert!(!FinalStatus::Failed(PipelineError::NotInitialized).is_success());
    }

    #[test]
    fn test_final_status_report() {
        let report = LoadReport {
            records_processed: 3,
            files_staged: 3,
            schema_ddl_ran: false,
            suspend_degraded: false,
            duration_ms: 1,
        };
        let status = FinalStatus::Loaded(report);
        assert_eq!(status.report().map(|r| r.records_processed), Some(3));
        assert!(FinalStatus::NoRecords.report().is_none());
    }
}
