use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for the library
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for the library
///
/// Per-entity defects (missing identity, unparseable dates, unrecognized
/// fields) are not errors; they degrade to empty values and are counted in
/// [`crate::processor::DocumentStats`].
#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Source not found: {}", .0.display())]
    SourceNotFound(PathBuf),

    #[error("Malformed document {source_name} at byte {position}: {reason}")]
    MalformedDocument {
        source_name: String,
        position: u64,
        reason: String,
    },

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Batch produced no records ({failed} of {documents} documents failed)")]
    EmptyBatch { documents: usize, failed: usize },
}
