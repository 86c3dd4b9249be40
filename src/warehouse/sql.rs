//! SQL statement builders and identifier normalization for the load protocol.
//!
//! Every statement the orchestrator sends to the warehouse is produced here,
//! so the exact SQL surface is testable in one place. Identifier quoting
//! follows Snowflake rules: a quoted identifier preserves case, an unquoted
//! one is folded, so table and field names are quoted whenever the user asked
//! for case sensitivity or the name would not survive as a plain identifier.

use once_cell::sync::Lazy;
use regex::Regex;

static RE_UNQUOTED_IDENT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_$]*$").expect("Invalid regex"));

/// Check if a word is reserved in the warehouse SQL dialect.
///
/// Reserved words must be double-quoted even when the user did not ask for
/// case-sensitive identifiers.
pub fn is_reserved_word(word: &str) -> bool {
    const RESERVED_WORDS: &[&str] = &[
        "all",
        "alter",
        "and",
        "any",
        "as",
        "between",
        "by",
        "case",
        "cast",
        "check",
        "column",
        "connect",
        "constraint",
        "create",
        "cross",
        "current",
        "current_date",
        "current_time",
        "current_timestamp",
        "current_user",
        "database",
        "default",
        "delete",
        "distinct",
        "drop",
        "else",
        "exists",
        "false",
        "following",
        "for",
        "from",
        "full",
        "grant",
        "group",
        "having",
        "ilike",
        "in",
        "increment",
        "inner",
        "insert",
        "intersect",
        "into",
        "is",
        "join",
        "lateral",
        "left",
        "like",
        "limit",
        "localtime",
        "localtimestamp",
        "minus",
        "natural",
        "not",
        "null",
        "of",
        "on",
        "or",
        "order",
        "qualify",
        "regexp",
        "revoke",
        "right",
        "rlike",
        "row",
        "rows",
        "sample",
        "schema",
        "select",
        "set",
        "some",
        "start",
        "table",
        "tablesample",
        "then",
        "to",
        "trigger",
        "true",
        "try_cast",
        "union",
        "unique",
        "update",
        "using",
        "values",
        "view",
        "when",
        "whenever",
        "where",
        "with",
    ];

    let lower = word.to_lowercase();
    RESERVED_WORDS.contains(&lower.as_str())
}

/// Normalize a table or column identifier for use in a statement.
///
/// Always double-quotes when `case_sensitive` is set; otherwise quotes only
/// reserved words and names that are not plain unquoted identifiers.
/// Embedded double quotes are doubled.
pub fn normalize_identifier(name: &str, case_sensitive: bool) -> String {
    if case_sensitive || is_reserved_word(name) || !RE_UNQUOTED_IDENT.is_match(name) {
        format!("\"{}\"", name.replace('"', "\"\""))
    } else {
        name.to_string()
    }
}

/// Select the active warehouse.
pub fn use_warehouse(warehouse: &str) -> String {
    format!("USE WAREHOUSE {warehouse}")
}

/// Select the active database and schema.
pub fn use_schema(database: &str, schema: &str) -> String {
    format!("USE SCHEMA {database}.{schema}")
}

/// Recreate the target table with a single VARIANT column.
///
/// `table` and `field` must already be normalized.
pub fn create_table(table: &str, field: &str) -> String {
    format!("CREATE OR REPLACE TABLE {table} ({field} VARIANT)")
}

/// Remove all rows from the target table, preserving its schema.
pub fn truncate_table(table: &str) -> String {
    format!("TRUNCATE TABLE {table}")
}

/// Upload one local file into the table's implicit stage.
///
/// Path separators are normalized to forward slashes; `PARALLEL=64` is an
/// instruction to the warehouse client's transfer layer, not app-level
/// concurrency.
pub fn put_file(path: &str, table: &str) -> String {
    let path = path.replace('\\', "/");
    format!("PUT 'file://{path}' @%{table} PARALLEL=64 OVERWRITE=TRUE")
}

/// Load all staged files of the given format into the table.
///
/// Staged files are purged after a successful load.
pub fn copy_into(table: &str, file_type: &str) -> String {
    format!("COPY INTO {table} FILE_FORMAT = (TYPE={file_type} COMPRESSION=GZIP) PURGE = TRUE")
}

/// Suspend the warehouse's compute.
pub fn suspend_warehouse(warehouse: &str) -> String {
    format!("ALTER WAREHOUSE {warehouse} SUSPEND")
}
