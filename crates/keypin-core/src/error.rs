//! Error types for keypin

use thiserror::Error;

/// Result type alias for keypin operations
pub type Result<T> = std::result::Result<T, KeypinError>;

/// Errors surfaced to the wiring layer
///
/// Wrong-length PINs, short entries and failed attempts are not errors; they
/// are reported through [`crate::KeypadEvent::Message`] and the pulse events.
#[derive(Debug, Error)]
pub enum KeypinError {
    /// Stored PIN data is not blank and does not parse as a record list
    #[error("PIN data is not a valid record list: {0}")]
    Configuration(#[source] serde_json::Error),

    /// Comma-separated import could not be read
    #[error("CSV import failed: {0}")]
    CsvImport(#[from] csv::Error),

    /// Persistence backend failure
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Store could not be serialized
    #[error("Serialization error: {0}")]
    Serialization(#[source] serde_json::Error),

    /// Keypad configuration rejected
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}
