//! Connection and target configuration
//!
//! Handles the untyped settings document the host delivers ([`RawSettings`])
//! and its validation into the immutable [`Config`] the rest of the crate
//! consumes. Validation order follows the legacy connector: Okta checks,
//! then the required-field sweep, then account/password normalization, then
//! the temp-directory checks.
//!
//! # Legacy quirks preserved
//!
//! - The stored password is the byte-for-byte REVERSE of the input, applied
//!   exactly once. This is legacy-compatible credential obfuscation, not a
//!   security control.
//! - An `account` value carrying a protocol separator (`//`) is stripped to
//!   the bare host form.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;
use uuid::Uuid;

use crate::report::HostEngine;

/// Maximum length for a user-supplied temp directory path
pub const MAX_TEMP_DIR_LENGTH: usize = 259;

/// Characters rejected in a user-supplied temp directory path
pub const TEMP_DIR_FORBIDDEN_CHARS: &[char] = &['/', ';', '?', '*', '"', '<', '>', '|'];

/// Errors that can occur during settings validation.
///
/// All of these are fatal at initialization: the pipeline refuses to accept
/// records until a later `accept` succeeds.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// A required field is absent or empty after sanitization
    #[error("Enter a valid {0}")]
    MissingField(&'static str),

    /// The record field holding file paths is not mapped
    #[error("Map a valid filepath to the data files")]
    MissingDataField,

    /// Okta authentication selected without a usable Okta URL
    #[error("{0}")]
    InvalidOktaUrl(&'static str),

    /// The user-supplied temp directory failed validation
    #[error("{0}")]
    InvalidTempDir(&'static str),

    /// An enumerated field carries an unknown token
    #[error("Unknown {field}: {value}")]
    InvalidValue { field: &'static str, value: String },

    /// The settings document is not valid JSON
    #[error("Invalid settings document: {0}")]
    Settings(String),
}

/// Result type for configuration operations
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Authentication mode for the warehouse session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthMode {
    /// Direct username/password authentication (default)
    #[default]
    Snowflake,
    /// External authentication via an Okta URL
    Okta,
}

impl std::str::FromStr for AuthMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "snowflake" => Ok(AuthMode::Snowflake),
            "okta" => Ok(AuthMode::Okta),
            _ => Err(format!(
                "Unknown auth mode: {}. Use 'snowflake' or 'okta'.",
                s
            )),
        }
    }
}

impl std::fmt::Display for AuthMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AuthMode::Snowflake => write!(f, "snowflake"),
            AuthMode::Okta => write!(f, "okta"),
        }
    }
}

/// Target-table preparation mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SqlType {
    /// Recreate the target table with a single VARIANT column
    Create,
    /// Remove all rows from the existing table, preserving schema
    Truncate,
    /// Load onto the existing table as-is (default)
    #[default]
    Append,
}

impl std::str::FromStr for SqlType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "create" => Ok(SqlType::Create),
            "truncate" => Ok(SqlType::Truncate),
            "append" => Ok(SqlType::Append),
            _ => Err(format!(
                "Unknown sql type: {}. Use 'create', 'truncate' or 'append'.",
                s
            )),
        }
    }
}

impl std::fmt::Display for SqlType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SqlType::Create => write!(f, "create"),
            SqlType::Truncate => write!(f, "truncate"),
            SqlType::Append => write!(f, "append"),
        }
    }
}

/// Untyped settings as the host delivers them.
///
/// All string fields are optional at this layer; booleans default to false.
/// Field names are camelCase in the JSON settings document.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RawSettings {
    pub account: Option<String>,
    pub user: Option<String>,
    pub password: Option<String>,
    pub warehouse: Option<String>,
    pub database: Option<String>,
    pub schema: Option<String>,
    pub table: Option<String>,
    pub auth_mode: Option<String>,
    pub okta_url: Option<String>,
    pub sql_type: Option<String>,
    pub temp_dir: Option<String>,
    pub data_field: Option<String>,
    pub case_sensitive: bool,
    pub suspend_warehouse_after_load: bool,
}

impl RawSettings {
    /// Parse a JSON settings document.
    pub fn from_json(document: &str) -> ConfigResult<Self> {
        serde_json::from_str(document).map_err(|e| ConfigError::Settings(e.to_string()))
    }
}

/// Validated, immutable connection and target parameters.
///
/// Constructed once per run via [`Config::validate`] and passed by reference
/// to collaborators.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Warehouse account in bare host form (protocol stripped)
    pub account: String,
    pub user: String,
    /// Stored REVERSED relative to the input (legacy obfuscation)
    pub password: String,
    pub warehouse: String,
    pub database: String,
    pub schema: String,
    pub table: String,
    pub auth_mode: AuthMode,
    /// Present iff `auth_mode` is Okta
    pub okta_url: Option<String>,
    pub sql_type: SqlType,
    /// Validated user directory, or the host default
    pub temp_dir: PathBuf,
    /// Name of the record field holding file paths
    pub data_field: String,
    pub case_sensitive: bool,
    pub suspend_warehouse_after_load: bool,
}

impl Config {
    /// Validate raw settings into a usable configuration.
    ///
    /// The host is consulted for the default temp directory when none was
    /// supplied; that fallback is announced through `file_output`. Returns
    /// the first applicable error; on any error the configuration must be
    /// treated as absent.
    pub fn validate(raw: RawSettings, host: &dyn HostEngine) -> ConfigResult<Config> {
        // listrunner-style hosts inject line feeds and spaces
        let account = sanitise(raw.account);
        let user = sanitise(raw.user);
        let password = sanitise(raw.password);
        let warehouse = sanitise(raw.warehouse);
        let database = sanitise(raw.database);
        let schema = sanitise(raw.schema);
        let table = sanitise(raw.table);
        let okta_url = sanitise(raw.okta_url);
        let temp_dir = sanitise(raw.temp_dir);
        let data_field = sanitise(raw.data_field);

        let auth_mode = parse_enum::<AuthMode>(sanitise(raw.auth_mode), "authMode")?;
        let sql_type = parse_enum::<SqlType>(sanitise(raw.sql_type), "sqlType")?;

        if auth_mode == AuthMode::Okta {
            match okta_url.as_deref() {
                None => {
                    return Err(ConfigError::InvalidOktaUrl(
                        "Enter a valid Okta URL when authenticating using Okta",
                    ));
                }
                Some(url) if !url.contains("http") => {
                    return Err(ConfigError::InvalidOktaUrl("Supplied Okta URL is not valid"));
                }
                Some(_) => {}
            }
        }

        let account = account.ok_or(ConfigError::MissingField("account"))?;
        let user = user.ok_or(ConfigError::MissingField("user"))?;
        let password = password.ok_or(ConfigError::MissingField("password"))?;
        let warehouse = warehouse.ok_or(ConfigError::MissingField("warehouse"))?;
        let database = database.ok_or(ConfigError::MissingField("database"))?;
        let schema = schema.ok_or(ConfigError::MissingField("schema"))?;
        let table = table.ok_or(ConfigError::MissingField("table"))?;
        let data_field = data_field.ok_or(ConfigError::MissingDataField)?;

        // Normalize to bare host form
        let account = match account.find("//") {
            Some(idx) => account[idx + 2..].to_string(),
            None => account,
        };

        // Legacy obfuscation, applied exactly once
        let password: String = password.chars().rev().collect();

        let temp_dir = match temp_dir {
            None => {
                let dir = host.default_temp_dir();
                host.file_output(&format!(
                    "{}| Using system temp dir {}",
                    dir.display(),
                    dir.display()
                ));
                dir
            }
            Some(dir) => {
                validate_temp_dir(&dir)?;
                PathBuf::from(dir)
            }
        };

        Ok(Config {
            account,
            user,
            password,
            warehouse,
            database,
            schema,
            table,
            auth_mode,
            okta_url,
            sql_type,
            temp_dir,
            data_field,
            case_sensitive: raw.case_sensitive,
            suspend_warehouse_after_load: raw.suspend_warehouse_after_load,
        })
    }
}

/// Trim whitespace and control characters; empty-after-trim counts as absent.
fn sanitise(value: Option<String>) -> Option<String> {
    let trimmed = value?
        .trim_matches(|c: char| c.is_whitespace() || c.is_control())
        .to_string();
    if trimmed.is_empty() { None } else { Some(trimmed) }
}

fn parse_enum<T>(value: Option<String>, field: &'static str) -> ConfigResult<T>
where
    T: std::str::FromStr + Default,
{
    match value {
        None => Ok(T::default()),
        Some(token) => token
            .parse()
            .map_err(|_| ConfigError::InvalidValue {
                field,
                value: token,
            }),
    }
}

/// Validate a user-supplied temp directory path.
///
/// Checks run in order: length, forbidden characters, writability. The
/// writability probe creates and removes a uniquely named file inside the
/// directory.
fn validate_temp_dir(dir: &str) -> ConfigResult<()> {
    if dir.len() > MAX_TEMP_DIR_LENGTH {
        return Err(ConfigError::InvalidTempDir("Maximum path length is 259"));
    }
    if dir.chars().any(|c| TEMP_DIR_FORBIDDEN_CHARS.contains(&c)) {
        return Err(ConfigError::InvalidTempDir(
            "These characters are not allowed in the file path: /;?*\"<>|",
        ));
    }

    let probe = PathBuf::from(dir).join(format!("{}.probe", Uuid::new_v4()));
    match std::fs::write(&probe, b"") {
        Ok(()) => {
            let _ = std::fs::remove_file(&probe);
            Ok(())
        }
        Err(_) => Err(ConfigError::InvalidTempDir(
            "Unable to write to supplied temp path",
        )),
    }
}

/// A minimal valid configuration for unit tests in sibling modules.
#[cfg(test)]
pub(crate) fn test_config() -> Config {
    Config {
        account: "xy12345.snowflakecomputing.com".to_string(),
        user: "loader".to_string(),
        password: "drowssap".to_string(),
        warehouse: "compute_wh".to_string(),
        database: "analytics".to_string(),
        schema: "raw".to_string(),
        table: "events".to_string(),
        auth_mode: AuthMode::Snowflake,
        okta_url: None,
        sql_type: SqlType::Append,
        temp_dir: std::env::temp_dir(),
        data_field: "payload".to_string(),
        case_sensitive: false,
        suspend_warehouse_after_load: false,
    }
}
