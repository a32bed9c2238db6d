//! Error types for the guest import pipeline.
//!
//! - [`ParseError`] - File and paste parsing errors
//! - [`PreviewError`] - Preview edits addressing unknown guests or fields
//! - [`ImportError`] - Failures of the injected guest importer
//! - [`SessionError`] - Import session state machine errors (top-level)
//! - [`ConfigError`] - Invalid environment configuration
//! - [`ServerError`] - HTTP layer errors
//!
//! Lower-level errors convert into [`SessionError`] via `From`, so `?`
//! works across the pipeline.

use thiserror::Error;

use crate::import::Step;
use crate::models::{GuestId, UnknownField};
use crate::validation::ValidationError;

// =============================================================================
// Parsing Errors
// =============================================================================

/// Errors while turning a file or pasted text into rows.
#[derive(Debug, Error)]
pub enum ParseError {
    /// Pasted text has no header row or no data row.
    #[error("Please include a header row and at least one data row")]
    PasteTooShort,

    /// Every pasted data row was empty.
    #[error("No data rows found after header")]
    PasteNoRows,

    /// File extension is not csv, xlsx or xls.
    #[error("Unsupported file type: {0}. Use .csv, .xlsx or .xls")]
    UnsupportedFile(String),

    /// File has no header or no data rows.
    #[error("No data rows found in file")]
    EmptyFile,

    /// File exceeds the configured upload limit.
    #[error("File is too large ({size} bytes, limit is {limit} bytes)")]
    TooLarge { size: usize, limit: usize },

    /// Malformed CSV.
    #[error("Invalid CSV format: {0}")]
    Csv(#[from] csv::Error),

    /// Unreadable workbook.
    #[error("Failed to read spreadsheet: {0}")]
    Workbook(String),

    /// Failed to read file.
    #[error("Failed to read file: {0}")]
    Io(#[from] std::io::Error),
}

impl ParseError {
    /// Field name reported for this error in the session error list.
    pub fn field(&self) -> &'static str {
        match self {
            ParseError::PasteTooShort | ParseError::PasteNoRows => "paste",
            _ => "file",
        }
    }

    /// Batch-level entry (`row: 0`) for the session error list.
    pub fn to_validation_error(&self) -> ValidationError {
        ValidationError::batch(self.field(), self.to_string())
    }
}

// =============================================================================
// Preview Errors
// =============================================================================

/// Errors from preview edits.
#[derive(Debug, Error)]
pub enum PreviewError {
    /// No guest with this id in the preview.
    #[error("Guest not found: {0}")]
    UnknownGuest(GuestId),

    /// Field name does not exist.
    #[error(transparent)]
    UnknownField(#[from] UnknownField),
}

// =============================================================================
// Import Errors
// =============================================================================

/// Errors from a [`crate::import::GuestImporter`].
#[derive(Debug, Error)]
pub enum ImportError {
    /// Request could not be sent or the response not read.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Guest API answered with a non-success status.
    #[error("Guest API returned {status}: {body}")]
    Status { status: u16, body: String },

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

// =============================================================================
// Session Errors (top-level)
// =============================================================================

/// Import session errors.
///
/// This is the error type returned by [`crate::import::ImportSession`]
/// operations. Every failure is also recorded in the session's error
/// list where the user should see it.
#[derive(Debug, Error)]
pub enum SessionError {
    /// Operation not allowed at the current step.
    #[error("Cannot {action} at the {step} step")]
    WrongStep { action: &'static str, step: Step },

    /// An import is already in flight.
    #[error("An import is already in progress")]
    Busy,

    /// Preview list is empty.
    #[error("There are no guests to import")]
    NothingToImport,

    /// Rows failed validation.
    #[error("{0} validation error(s) must be fixed before previewing")]
    Invalid(usize),

    /// Parsing error.
    #[error(transparent)]
    Parse(#[from] ParseError),

    /// Preview edit error.
    #[error(transparent)]
    Preview(#[from] PreviewError),

    /// Importer error.
    #[error("Import failed: {0}")]
    Import(#[from] ImportError),
}

// =============================================================================
// Config Errors
// =============================================================================

/// Invalid configuration values.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A variable is set but cannot be used.
    #[error("Invalid value for {key}: {value} ({reason})")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },
}

// =============================================================================
// Server Errors
// =============================================================================

/// HTTP server errors.
#[derive(Debug, Error)]
pub enum ServerError {
    /// Unknown or expired session.
    #[error("Session not found: {0}")]
    SessionNotFound(uuid::Uuid),

    /// Invalid request.
    #[error("Invalid request: {0}")]
    BadRequest(String),

    /// Session operation failed; carries the session's error list.
    #[error("{source}")]
    Session {
        source: SessionError,
        errors: Vec<ValidationError>,
    },
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Result type for server operations.
pub type ServerResult<T> = Result<T, ServerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_conversion_chain() {
        // ParseError -> SessionError
        let parse_err = ParseError::PasteNoRows;
        let session_err: SessionError = parse_err.into();
        assert!(session_err.to_string().contains("No data rows"));

        // ImportError -> SessionError
        let import_err = ImportError::Status { status: 503, body: "down".into() };
        let session_err: SessionError = import_err.into();
        assert!(session_err.to_string().contains("503"));
    }

    #[test]
    fn test_parse_error_field() {
        assert_eq!(ParseError::PasteTooShort.field(), "paste");
        assert_eq!(ParseError::EmptyFile.field(), "file");

        let entry = ParseError::UnsupportedFile("pdf".into()).to_validation_error();
        assert_eq!(entry.row, 0);
        assert_eq!(entry.field, "file");
        assert_eq!(entry.message, "Unsupported file type: pdf. Use .csv, .xlsx or .xls");
    }

    #[test]
    fn test_wrong_step_format() {
        let err = SessionError::WrongStep { action: "edit guests", step: Step::Mapping };
        assert_eq!(err.to_string(), "Cannot edit guests at the mapping step");
    }
}
