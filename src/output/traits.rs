//! Output writer trait and errors

use crate::lead::AnalyzedLead;
use thiserror::Error;

/// Errors that can occur during output operations
#[derive(Debug, Error)]
pub enum OutputError {
    #[error("Failed to write output: {0}")]
    Write(String),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for output operations
pub type OutputResult<T> = Result<T, OutputError>;

/// Destination for the analyzed leads of a run
///
/// Called once at the end of a run with the full result set, which may be
/// empty.
pub trait LeadWriter: Send + Sync {
    /// Writes every lead, replacing any previous output
    fn write(&self, leads: &[AnalyzedLead]) -> OutputResult<()>;

    /// Human-readable destination, e.g. the file path
    fn describe(&self) -> String;
}
