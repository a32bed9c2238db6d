//! # Guestlist - guest list import for wedding planning
//!
//! Turns a spreadsheet of guests (CSV/XLSX/XLS upload or pasted text) into
//! validated guest records and hands them in one batch to the guest API.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐     ┌─────────────┐     ┌─────────────┐     ┌─────────────┐     ┌─────────────┐
//! │ File/Paste  │────▶│   Parser    │────▶│  Auto-map   │────▶│  Validate + │────▶│   Preview   │──▶ GuestImporter
//! │ (CSV/XLSX)  │     │  (auto-enc) │     │  (headers)  │     │  Transform  │     │   (edits)   │
//! └─────────────┘     └─────────────┘     └─────────────┘     └─────────────┘     └─────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use guestlist::{HttpImporter, ImportSession, SessionOptions};
//!
//! #[tokio::main]
//! async fn main() {
//!     let mut session = ImportSession::new(SessionOptions::default());
//!     session.set_paste_text("Name\tEmail\nAsha\tasha@example.com");
//!     session.load_paste().unwrap();
//!     session.advance_to_preview().unwrap();
//!
//!     let importer = HttpImporter::new("http://localhost:8080");
//!     let imported = session.submit(&importer).await.unwrap();
//!     println!("Imported {} guests", imported);
//! }
//! ```
//!
//! ## Modules
//!
//! - [`error`] - Hierarchical error types
//! - [`models`] - Guest domain types (ParsedGuest, Side, Cell)
//! - [`parser`] - CSV/XLSX/paste parsing with auto-detection
//! - [`mapping`] - Column auto-mapping
//! - [`transform`] - Rows to guests
//! - [`validation`] - Row validation
//! - [`preview`] - Editable guest preview
//! - [`import`] - Import session and importers
//! - [`ports`] - Clipboard/file capabilities and the guest template
//! - [`config`] - Environment configuration
//! - [`api`] - HTTP API server

// Core modules
pub mod config;
pub mod error;
pub mod models;

// Pipeline
pub mod mapping;
pub mod parser;
pub mod preview;
pub mod transform;
pub mod validation;

// Session and injected capabilities
pub mod import;
pub mod ports;

// HTTP API
pub mod api;

// =============================================================================
// Re-exports - Errors
// =============================================================================

pub use error::{ConfigError, ImportError, ParseError, PreviewError, ServerError, SessionError};

// =============================================================================
// Re-exports - Models
// =============================================================================

pub use models::{Cell, GuestField, GuestId, ParsedGuest, RawRow, RsvpStatus, Side};

// =============================================================================
// Re-exports - Pipeline
// =============================================================================

pub use mapping::{auto_map, ColumnMapping, NO_COLUMN};
pub use parser::{
    decode_content, detect_delimiter, detect_encoding, parse_csv_bytes, parse_file, parse_pasted, parse_workbook,
    ParseResult,
};
pub use preview::PreviewEditor;
pub use transform::{coerce_bool, transform, TransformDefaults};
pub use validation::{summarize_errors, validate, ValidationError};

// =============================================================================
// Re-exports - Session
// =============================================================================

pub use config::ImportConfig;
pub use import::{
    GuestImporter, HttpImporter, ImportMethod, ImportSession, JsonFileImporter, SessionOptions, SessionSnapshot, Step,
};
pub use ports::{copy_template, ClipboardPort, FileReaderPort, FsFileReader, WriterClipboard, GUEST_TEMPLATE};

// Server
pub mod server {
    pub use crate::api::server::start_server;
}
