//! Load orchestration state machine
//!
//! Drives the close-phase protocol against the warehouse driver:
//! authenticate, select execution context, prepare the target table, stage
//! every file, issue the COPY, optionally suspend the warehouse, and release
//! the session. The session is released on every path that opened one; no
//! phase is retried. A failure partway through staging leaves a partially
//! staged set behind.

use serde::{Deserialize, Serialize};
use std::time::Instant;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::batch::Batch;
use crate::config::{AuthMode, Config, SqlType};
use crate::report::{HostEngine, Reporter};
use crate::warehouse::{ConnectRequest, DriverError, WarehouseDriver, sql};

/// Phase of the load protocol, observable for logging and tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LoadPhase {
    /// Nothing has run yet
    #[default]
    Idle,
    /// Opening the warehouse session
    Authenticating,
    /// Selecting context and preparing the target table
    SchemaPrepared,
    /// Uploading files into the table stage
    Staging,
    /// Issuing the load command
    Loading,
    /// Suspending the warehouse after a successful load
    Suspending,
    /// Session released; terminal
    Closed,
}

impl std::fmt::Display for LoadPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LoadPhase::Idle => write!(f, "idle"),
            LoadPhase::Authenticating => write!(f, "authenticating"),
            LoadPhase::SchemaPrepared => write!(f, "schema-prepared"),
            LoadPhase::Staging => write!(f, "staging"),
            LoadPhase::Loading => write!(f, "loading"),
            LoadPhase::Suspending => write!(f, "suspending"),
            LoadPhase::Closed => write!(f, "closed"),
        }
    }
}

/// Errors raised by the load protocol, by phase.
///
/// Each carries the structured driver cause; the `Display` rendering is the
/// cause's own rendering, which is what the host sees. Every variant is
/// fatal and is followed by session release.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum LoadError {
    /// Opening the session failed
    #[error("{0}")]
    Auth(DriverError),

    /// Context selection or table preparation failed
    #[error("{0}")]
    Schema(DriverError),

    /// Staging a file failed, leaving a partially staged set
    #[error("{cause}")]
    Staging { cause: DriverError, path: String },

    /// The load command failed
    #[error("{0}")]
    Load(DriverError),
}

impl LoadError {
    /// The structured driver cause, whichever phase raised it.
    pub fn cause(&self) -> &DriverError {
        match self {
            LoadError::Auth(cause)
            | LoadError::Schema(cause)
            | LoadError::Load(cause) => cause,
            LoadError::Staging { cause, .. } => cause,
        }
    }
}

/// Result type for load operations
pub type LoadResult<T> = Result<T, LoadError>;

/// Summary of one completed load.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoadReport {
    /// Input records counted during collection (not warehouse row count)
    pub records_processed: usize,
    /// Files uploaded into the table stage
    pub files_staged: usize,
    /// Whether a CREATE or TRUNCATE statement ran
    pub schema_ddl_ran: bool,
    /// Whether the post-load suspend was requested but failed
    pub suspend_degraded: bool,
    /// Wall-clock duration of the protocol in milliseconds
    pub duration_ms: u64,
}

/// The state machine driving one load against one driver session.
pub struct LoadOrchestrator<'a, D: WarehouseDriver, H: HostEngine> {
    driver: &'a D,
    config: &'a Config,
    reporter: &'a mut Reporter<H>,
    phase: LoadPhase,
}

impl<'a, D: WarehouseDriver, H: HostEngine> LoadOrchestrator<'a, D, H> {
    /// Create an orchestrator in the idle phase.
    pub fn new(driver: &'a D, config: &'a Config, reporter: &'a mut Reporter<H>) -> Self {
        Self {
            driver,
            config,
            reporter,
            phase: LoadPhase::Idle,
        }
    }

    /// Current phase of the protocol.
    pub fn phase(&self) -> LoadPhase {
        self.phase
    }

    /// Run the whole protocol for a validated batch.
    ///
    /// `file_type` is the lowercased extension the batch validator returned.
    /// If the session was opened, it is released before this returns,
    /// whatever the outcome.
    pub async fn run(&mut self, batch: &Batch, file_type: &str) -> LoadResult<LoadReport> {
        let started = Instant::now();

        self.phase = LoadPhase::Authenticating;
        info!(
            driver = self.driver.driver_name(),
            account = %self.config.account,
            auth_mode = %self.config.auth_mode,
            "Opening warehouse session"
        );
        let request = ConnectRequest::new(self.config);
        if let Err(cause) = self.driver.connect(&request).await {
            self.phase = LoadPhase::Closed;
            return Err(LoadError::Auth(cause));
        }
        match self.config.auth_mode {
            AuthMode::Snowflake => self.reporter.info("Authenticated via Snowflake"),
            AuthMode::Okta => self.reporter.info("Authenticated via Okta"),
        }

        let result = self.protocol(batch, file_type).await;

        // The one step guaranteed to run for every opened session
        self.phase = LoadPhase::Closed;
        if let Err(cause) = self.driver.close().await {
            warn!("Failed to close the warehouse session: {cause}");
        }

        let mut report = result?;
        report.duration_ms = started.elapsed().as_millis() as u64;
        Ok(report)
    }

    async fn protocol(&mut self, batch: &Batch, file_type: &str) -> LoadResult<LoadReport> {
        self.phase = LoadPhase::SchemaPrepared;
        self.execute(&sql::use_warehouse(&self.config.warehouse))
            .await
            .map_err(LoadError::Schema)?;
        self.execute(&sql::use_schema(&self.config.database, &self.config.schema))
            .await
            .map_err(LoadError::Schema)?;

        let table = sql::normalize_identifier(&self.config.table, self.config.case_sensitive);
        let field = sql::normalize_identifier(&self.config.data_field, self.config.case_sensitive);

        let schema_ddl_ran = match self.config.sql_type {
            SqlType::Create => {
                self.execute(&sql::create_table(&table, &field))
                    .await
                    .map_err(LoadError::Schema)?;
                true
            }
            SqlType::Truncate => {
                self.execute(&sql::truncate_table(&table))
                    .await
                    .map_err(LoadError::Schema)?;
                true
            }
            SqlType::Append => false,
        };

        self.phase = LoadPhase::Staging;
        for path in batch.paths() {
            info!(phase = %self.phase, path = %path, "Staging file");
            self.execute(&sql::put_file(path, &table))
                .await
                .map_err(|cause| LoadError::Staging {
                    cause,
                    path: path.clone(),
                })?;
        }

        self.phase = LoadPhase::Loading;
        self.execute(&sql::copy_into(&table, file_type))
            .await
            .map_err(LoadError::Load)?;
        self.reporter
            .info(&format!("Processed {} records", format_count(batch.records())));

        let mut suspend_degraded = false;
        if self.config.suspend_warehouse_after_load {
            self.phase = LoadPhase::Suspending;
            match self
                .execute(&sql::suspend_warehouse(&self.config.warehouse))
                .await
            {
                Ok(()) => self.reporter.info("Suspended the warehouse"),
                // Loaded data stands; the degradation is reported only
                Err(cause) => {
                    warn!(phase = %self.phase, "Warehouse suspend failed: {cause}");
                    self.reporter.error(&cause.to_string());
                    suspend_degraded = true;
                }
            }
        }

        Ok(LoadReport {
            records_processed: batch.records(),
            files_staged: batch.len(),
            schema_ddl_ran,
            suspend_degraded,
            duration_ms: 0,
        })
    }

    async fn execute(&self, statement: &str) -> Result<(), DriverError> {
        debug!(phase = %self.phase, sql = %statement, "Executing statement");
        self.driver.execute(statement).await
    }
}

/// Format a count with thousands separators, e.g. `1,234,567`.
fn format_count(n: usize) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}
