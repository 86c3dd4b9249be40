//! Snowflake Loader SDK - embeddable connector for bulk-loading semi-structured files
//!
//! Loads batches of JSON, XML, Parquet, Avro and ORC files, whose paths
//! arrive as records on a host-driven input stream, into a Snowflake table
//! via staged upload and a COPY operation. The crate provides:
//! - Settings validation into an immutable configuration (`config`)
//! - Batch collection and homogeneity validation (`batch`)
//! - The load orchestration state machine (`loader`)
//! - Host reporting plus a per-run append-only log file (`report`)
//! - The warehouse driver seam, SQL builders, and a scripted mock (`warehouse`)
//! - A host-facing lifecycle facade (`pipeline`)
//!
//! The host ETL engine owns record scheduling and lifecycle callbacks and is
//! reached through the [`HostEngine`] trait; the warehouse wire client is an
//! external collaborator supplied as a [`WarehouseDriver`] implementation.
//! Enable the `host-runtime` feature for a blocking `on_stream_close`
//! adapter on hosts without an async runtime.

pub mod batch;
pub mod config;
pub mod loader;
pub mod pipeline;
pub mod report;
pub mod warehouse;

// Re-export commonly used types
pub use batch::{Batch, BatchError, SUPPORTED_FILE_TYPES};
pub use config::{AuthMode, Config, ConfigError, RawSettings, SqlType};
pub use loader::{LoadError, LoadOrchestrator, LoadPhase, LoadReport};
pub use pipeline::{FinalStatus, Pipeline, PipelineError, VERSION};
pub use report::{HostEngine, ReportError, Reporter, RunLog};
pub use warehouse::{
    ConnectRequest, DriverCall, DriverError, DriverResult, MockDriver, WarehouseDriver,
};
