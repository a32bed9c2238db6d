//! Import sessions and guest importers.
//!
//! An [`ImportSession`] owns the state of one import from upload to
//! submission; a [`GuestImporter`] receives the final batch.

pub mod importer;
pub mod session;

pub use importer::{BulkImportRequest, GuestImporter, HttpImporter, JsonFileImporter, BULK_IMPORT_PATH};
pub use session::{ImportMethod, ImportSession, SessionOptions, SessionSnapshot, Step, IMPORT_FAILED_MESSAGE};
