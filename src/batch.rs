//! Batch collection and validation
//!
//! Collects the file paths arriving on the record stream and, at stream
//! close, checks that they form a homogeneous batch of a supported
//! semi-structured format. The batch is append-only while the stream is
//! open and consumed exactly once at close.

use std::collections::BTreeSet;
use thiserror::Error;

/// File formats the load command accepts (membership is case-insensitive)
pub const SUPPORTED_FILE_TYPES: &[&str] = &["json", "xml", "parquet", "avro", "orc"];

/// Errors raised when validating a frozen batch.
///
/// All are fatal at stream close; no warehouse interaction is attempted.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum BatchError {
    /// No non-empty record values arrived
    #[error("No records to process")]
    EmptyBatch,

    /// The batch carries more than one distinct file extension
    #[error("You may only upload one file type into a table")]
    MixedFileTypes,

    /// The batch's sole extension is not a supported format
    #[error("{0} is not a supported file type")]
    UnsupportedFileType(String),
}

/// Result type for batch operations
pub type BatchResult<T> = Result<T, BatchError>;

/// Ordered collection of file paths from one run's record stream.
#[derive(Debug, Clone, Default)]
pub struct Batch {
    paths: Vec<String>,
}

impl Batch {
    /// Create an empty batch.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one incoming value of the mapped data field.
    ///
    /// Absent or empty values are ignored: they neither append nor count.
    pub fn push(&mut self, value: Option<&str>) {
        if let Some(path) = value
            && !path.is_empty()
        {
            self.paths.push(path.to_string());
        }
    }

    /// Number of records counted, one per collected path.
    pub fn records(&self) -> usize {
        self.paths.len()
    }

    /// Collected paths, in arrival order.
    pub fn paths(&self) -> &[String] {
        &self.paths
    }

    /// Number of collected paths.
    pub fn len(&self) -> usize {
        self.paths.len()
    }

    /// Check if nothing was collected.
    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    /// Validate the frozen batch and return its file type.
    ///
    /// The extension set is built case-preserved (so `a.json` and `b.JSON`
    /// count as mixed); the returned value is the lowercased form, which is
    /// the only one the load command uses.
    pub fn validate(&self) -> BatchResult<String> {
        if self.paths.is_empty() {
            return Err(BatchError::EmptyBatch);
        }

        let extensions: BTreeSet<&str> = self.paths.iter().map(|p| extension_of(p)).collect();
        if extensions.len() != 1 {
            return Err(BatchError::MixedFileTypes);
        }

        let ext = extensions.into_iter().next().unwrap_or_default();
        let lowered = ext.to_lowercase();
        if !SUPPORTED_FILE_TYPES.contains(&lowered.as_str()) {
            return Err(BatchError::UnsupportedFileType(ext.to_string()));
        }

        Ok(lowered)
    }
}

/// Extension of a path: the text after the last `.` of the final component,
/// case preserved. A component without an extension (including dotfiles)
/// contributes the empty string.
fn extension_of(path: &str) -> &str {
    let base = path.rsplit(['/', '\\']).next().unwrap_or(path);
    let trimmed = base.trim_start_matches('.');
    match trimmed.rfind('.') {
        Some(idx) => &trimmed[idx + 1..],
        None => "",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_skips_absent_and_empty_values() {
        let mut batch = Batch::new();
        batch.push(None);
        batch.push(Some(""));
        batch.push(Some("/data/a.json"));
        assert_eq!(batch.records(), 1);
        assert_eq!(batch.paths(), &["/data/a.json".to_string()]);
        assert_eq!(batch.records(), batch.paths().len());
    }

    #[test]
    fn test_push_preserves_arrival_order() {
        let mut batch = Batch::new();
        batch.push(Some("b.json"));
        batch.push(Some("a.json"));
        assert_eq!(batch.paths(), &["b.json".to_string(), "a.json".to_string()]);
    }

    #[test]
    fn test_empty_batch() {
        let batch = Batch::new();
        assert_eq!(batch.validate(), Err(BatchError::EmptyBatch));
    }

    #[test]
    fn test_single_supported_extension() {
        let mut batch = Batch::new();
        batch.push(Some("/data/a.json"));
        batch.push(Some("C:\\data\\b.json"));
        assert_eq!(batch.validate().unwrap(), "json");
    }

    #[test]
    fn test_extension_lowercased_on_success() {
        let mut batch = Batch::new();
        batch.push(Some("a.JSON"));
        assert_eq!(batch.validate().unwrap(), "json");
    }

    #[test]
    fn test_mixed_extensions() {
        let mut batch = Batch::new();
        batch.push(Some("a.json"));
        batch.push(Some("b.xml"));
        assert_eq!(batch.validate(), Err(BatchError::MixedFileTypes));
    }

    #[test]
    fn test_same_extension_differing_case_counts_as_mixed() {
        let mut batch = Batch::new();
        batch.push(Some("a.json"));
        batch.push(Some("b.JSON"));
        assert_eq!(batch.validate(), Err(BatchError::MixedFileTypes));
    }

    #[test]
    fn test_unsupported_extension_keeps_original_case() {
        let mut batch = Batch::new();
        batch.push(Some("a.CSV"));
        let err = batch.validate().unwrap_err();
        assert_eq!(err, BatchError::UnsupportedFileType("CSV".to_string()));
        assert_eq!(err.to_string(), "CSV is not a supported file type");
    }

    #[test]
    fn test_path_without_extension_is_unsupported() {
        let mut batch = Batch::new();
        batch.push(Some("/data/readme"));
        assert_eq!(
            batch.validate(),
            Err(BatchError::UnsupportedFileType(String::new()))
        );
    }

    #[test]
    fn test_extension_of_edge_cases() {
        assert_eq!(extension_of("/data/a.json"), "json");
        assert_eq!(extension_of("C:\\data\\b.parquet"), "parquet");
        assert_eq!(extension_of("archive.tar.gz"), "gz");
        assert_eq!(extension_of("/data/readme"), "");
        assert_eq!(extension_of("/data/.bashrc"), "");
        assert_eq!(extension_of("/dotted.dir/readme"), "");
    }
}
