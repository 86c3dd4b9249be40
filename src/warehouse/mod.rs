//! Warehouse driver abstraction for the load protocol
//!
//! The wire driver itself is an external collaborator: the embedder supplies
//! an implementation of [`WarehouseDriver`] wrapping whatever Snowflake
//! client it links against. This module defines that seam, the structured
//! error the driver reports, and the connection request the orchestrator
//! builds from a validated configuration.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::config::{AuthMode, Config};

pub mod mock;
pub mod sql;

pub use mock::{DriverCall, MockDriver};

/// Structured error reported by the warehouse driver.
///
/// Carries the four vendor fields (error code, state code, message, request
/// id); each is optional where the driver lacks it. The `Display` rendering
/// is the user-visible form, with `-` standing in for absent fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[error(
    "Error {} ({}): {message} ({})",
    code_or_dash(.error_code),
    field_or_dash(.state_code),
    field_or_dash(.request_id)
)]
pub struct DriverError {
    /// Vendor error code
    pub error_code: Option<i32>,
    /// SQL state code
    pub state_code: Option<String>,
    /// Human-readable message
    pub message: String,
    /// Warehouse-side request id, where available
    pub request_id: Option<String>,
}

fn code_or_dash(code: &Option<i32>) -> String {
    code.as_ref().map_or_else(|| "-".to_string(), i32::to_string)
}

fn field_or_dash(value: &Option<String>) -> &str {
    value.as_deref().unwrap_or("-")
}

impl DriverError {
    /// Create an error carrying only a message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            error_code: None,
            state_code: None,
            message: message.into(),
            request_id: None,
        }
    }

    /// Attach the vendor error code.
    pub fn with_error_code(mut self, code: i32) -> Self {
        self.error_code = Some(code);
        self
    }

    /// Attach the SQL state code.
    pub fn with_state_code(mut self, state: impl Into<String>) -> Self {
        self.state_code = Some(state.into());
        self
    }

    /// Attach the warehouse request id.
    pub fn with_request_id(mut self, id: impl Into<String>) -> Self {
        self.request_id = Some(id.into());
        self
    }
}

/// Result type for driver operations
pub type DriverResult<T> = Result<T, DriverError>;

/// Connection request built from a validated configuration.
///
/// `ocsp_fail_open` is always set: availability is favored over strict
/// certificate-revocation enforcement. `authenticator` carries the Okta URL
/// in Okta mode and is absent otherwise.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectRequest {
    pub user: String,
    /// Password as stored in the configuration (already reversed)
    pub password: String,
    pub account: String,
    pub warehouse: String,
    pub database: String,
    pub schema: String,
    pub ocsp_fail_open: bool,
    pub authenticator: Option<String>,
}

impl ConnectRequest {
    /// Build the request for one session from the configuration.
    pub fn new(config: &Config) -> Self {
        Self {
            user: config.user.clone(),
            password: config.password.clone(),
            account: config.account.clone(),
            warehouse: config.warehouse.clone(),
            database: config.database.clone(),
            schema: config.schema.clone(),
            ocsp_fail_open: true,
            authenticator: match config.auth_mode {
                AuthMode::Okta => config.okta_url.clone(),
                AuthMode::Snowflake => None,
            },
        }
    }
}

/// Black-box warehouse client: connect, execute, close.
///
/// One implementation handles one session at a time; the orchestrator calls
/// `connect` once, `execute` sequentially, and `close` exactly once for
/// every session it opened. Implementations use interior mutability where
/// they hold connection state.
#[async_trait(?Send)]
pub trait WarehouseDriver {
    /// Open an authenticated session.
    async fn connect(&self, request: &ConnectRequest) -> DriverResult<()>;

    /// Execute one SQL statement on the open session.
    async fn execute(&self, statement: &str) -> DriverResult<()>;

    /// Release the session.
    async fn close(&self) -> DriverResult<()>;

    /// Driver name for logging ("snowflake", "mock", ...).
    fn driver_name(&self) -> &'static str;
}
