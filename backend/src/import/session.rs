//! The import session: every piece of state of one import dialog and the
//! step machine driving it.
//!
//! ```text
//!  ┌────────┐ load_file / load_paste ┌─────────┐ advance_to_preview ┌─────────┐
//!  │ upload │───────────────────────▶│ mapping │───────────────────▶│ preview │
//!  └────────┘                        └─────────┘◀───────────────────└─────────┘
//!       ▲                                 │                back          │
//!       └────────── reset / successful import ◀────────────────────────┘
//! ```
//!
//! Failures never move the session backwards: parse errors keep it at
//! `upload`, validation errors at `mapping`, import errors at `preview`.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use uuid::Uuid;

use super::importer::GuestImporter;
use crate::api::logs::{LogEntry, LOG_BROADCASTER};
use crate::config::ImportConfig;
use crate::error::{ImportError, ParseError, SessionError};
use crate::mapping::{auto_map, ColumnMapping};
use crate::models::{Cell, GuestField, GuestId, ParsedGuest, RawRow, Side};
use crate::parser::{parse_file, parse_pasted, ParseResult};
use crate::ports::FileReaderPort;
use crate::preview::PreviewEditor;
use crate::transform::{transform, TransformDefaults};
use crate::validation::{summarize_errors, validate, ValidationError};

/// Message shown when the importer fails.
pub const IMPORT_FAILED_MESSAGE: &str = "Failed to import guests. Please try again.";

/// Dialog step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Step {
    #[default]
    Upload,
    Mapping,
    Preview,
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Step::Upload => "upload",
            Step::Mapping => "mapping",
            Step::Preview => "preview",
        })
    }
}

/// How the guest data is supplied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImportMethod {
    #[default]
    File,
    Paste,
}

/// Per-session settings.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionOptions {
    pub default_side: Side,
    pub max_file_size: usize,
    pub error_display_limit: usize,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self::from(&ImportConfig::default())
    }
}

impl From<&ImportConfig> for SessionOptions {
    fn from(config: &ImportConfig) -> Self {
        Self {
            default_side: config.default_side.clone(),
            max_file_size: config.max_file_size,
            error_display_limit: config.error_display_limit,
        }
    }
}

/// Serializable view of a session.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    pub id: Uuid,
    pub step: Step,
    pub method: ImportMethod,
    pub file_name: Option<String>,
    pub headers: Vec<String>,
    pub row_count: usize,
    pub mapping: ColumnMapping,
    pub default_side: Side,
    pub event_ids: Vec<String>,
    pub errors: Vec<ValidationError>,
    pub error_summary: Vec<String>,
    pub guests: Vec<ParsedGuest>,
    pub importing: bool,
    pub created_at: DateTime<Utc>,
    pub last_activity: DateTime<Utc>,
}

/// State of one import dialog.
#[derive(Debug, Clone)]
pub struct ImportSession {
    id: Uuid,
    created_at: DateTime<Utc>,
    options: SessionOptions,
    step: Step,
    method: ImportMethod,
    file_name: Option<String>,
    paste_text: String,
    headers: Vec<String>,
    rows: Vec<RawRow>,
    mapping: ColumnMapping,
    default_side: Side,
    event_ids: Vec<String>,
    errors: Vec<ValidationError>,
    preview: PreviewEditor,
    importing: bool,
    /// Size of the batch handed out by `begin_import`
    in_flight: usize,
    last_activity: DateTime<Utc>,
}

impl ImportSession {
    pub fn new(options: SessionOptions) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            created_at: now,
            last_activity: now,
            default_side: options.default_side.clone(),
            options,
            step: Step::Upload,
            method: ImportMethod::File,
            file_name: None,
            paste_text: String::new(),
            headers: Vec::new(),
            rows: Vec::new(),
            mapping: ColumnMapping::new(),
            event_ids: Vec::new(),
            errors: Vec::new(),
            preview: PreviewEditor::default(),
            importing: false,
            in_flight: 0,
        }
    }

    // -------------------------------------------------------------------------
    // Accessors
    // -------------------------------------------------------------------------

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn step(&self) -> Step {
        self.step
    }

    pub fn method(&self) -> ImportMethod {
        self.method
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn rows(&self) -> &[RawRow] {
        &self.rows
    }

    pub fn mapping(&self) -> &ColumnMapping {
        &self.mapping
    }

    pub fn errors(&self) -> &[ValidationError] {
        &self.errors
    }

    pub fn guests(&self) -> &[ParsedGuest] {
        self.preview.guests()
    }

    pub fn is_importing(&self) -> bool {
        self.importing
    }

    /// Capped, display-ready error lines.
    pub fn error_summary(&self) -> Vec<String> {
        summarize_errors(&self.errors, self.options.error_display_limit)
    }

    /// Record client activity at `now`.
    pub fn touch(&mut self, now: DateTime<Utc>) {
        self.last_activity = self.last_activity.max(now);
    }

    /// Idle for longer than `ttl` and not importing.
    pub fn is_expired(&self, now: DateTime<Utc>, ttl: Duration) -> bool {
        !self.importing && now - self.last_activity > ttl
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            id: self.id,
            step: self.step,
            method: self.method,
            file_name: self.file_name.clone(),
            headers: self.headers.clone(),
            row_count: self.rows.len(),
            mapping: self.mapping.clone(),
            default_side: self.default_side.clone(),
            event_ids: self.event_ids.clone(),
            errors: self.errors.clone(),
            error_summary: self.error_summary(),
            guests: self.preview.guests().to_vec(),
            importing: self.importing,
            created_at: self.created_at,
            last_activity: self.last_activity,
        }
    }

    fn log(&self, entry: LogEntry) {
        LOG_BROADCASTER.log(entry.for_session(self.id));
    }

    fn require_idle(&self) -> Result<(), SessionError> {
        if self.importing {
            Err(SessionError::Busy)
        } else {
            Ok(())
        }
    }

    fn require_step(&self, step: Step, action: &'static str) -> Result<(), SessionError> {
        if self.step == step {
            Ok(())
        } else {
            Err(SessionError::WrongStep { action, step: self.step })
        }
    }

    // -------------------------------------------------------------------------
    // Upload step
    // -------------------------------------------------------------------------

    pub fn set_method(&mut self, method: ImportMethod) {
        self.method = method;
        self.errors.clear();
    }

    pub fn set_paste_text(&mut self, text: impl Into<String>) {
        self.paste_text = text.into();
    }

    /// Parse an uploaded file and move to the mapping step.
    pub fn load_file(&mut self, name: &str, bytes: &[u8]) -> Result<(), SessionError> {
        self.require_step(Step::Upload, "load a file")?;
        self.method = ImportMethod::File;
        self.log(LogEntry::info(format!("Reading {} ({} bytes)", name, bytes.len())));

        let parsed = if bytes.len() > self.options.max_file_size {
            Err(ParseError::TooLarge {
                size: bytes.len(),
                limit: self.options.max_file_size,
            })
        } else {
            parse_file(name, bytes)
        };

        let result = self.accept_parsed(parsed);
        if result.is_ok() {
            self.file_name = Some(name.to_string());
        }
        result
    }

    /// Read a file through `reader` and load it.
    pub async fn load_from<R: FileReaderPort>(&mut self, reader: &R, path: &Path) -> Result<(), SessionError> {
        self.require_step(Step::Upload, "load a file")?;
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or_default()
            .to_string();

        match reader.read(path).await {
            Ok(bytes) => self.load_file(&name, &bytes),
            Err(e) => self.accept_parsed(Err(ParseError::Io(e))),
        }
    }

    /// Parse the paste buffer and move to the mapping step.
    pub fn load_paste(&mut self) -> Result<(), SessionError> {
        self.require_step(Step::Upload, "parse pasted data")?;
        self.method = ImportMethod::Paste;
        let parsed = parse_pasted(&self.paste_text);
        self.accept_parsed(parsed)
    }

    fn accept_parsed(&mut self, parsed: Result<ParseResult, ParseError>) -> Result<(), SessionError> {
        match parsed {
            Ok(result) => {
                self.mapping = auto_map(&result.headers);
                self.log(LogEntry::success(format!(
                    "Parsed {} rows, {} columns, {} auto-mapped",
                    result.rows.len(),
                    result.headers.len(),
                    self.mapping.len()
                )));
                self.headers = result.headers;
                self.rows = result.rows;
                self.errors.clear();
                self.step = Step::Mapping;
                Ok(())
            }
            Err(e) => {
                self.log(LogEntry::error(e.to_string()));
                self.errors = vec![e.to_validation_error()];
                Err(e.into())
            }
        }
    }

    // -------------------------------------------------------------------------
    // Mapping step
    // -------------------------------------------------------------------------

    /// Point a field at a column, or unset it.
    pub fn set_column(&mut self, field: GuestField, column: Option<String>) -> Result<(), SessionError> {
        self.require_step(Step::Mapping, "change the column mapping")?;
        self.mapping.set(field, column);
        Ok(())
    }

    pub fn set_mapping(&mut self, mapping: ColumnMapping) -> Result<(), SessionError> {
        self.require_step(Step::Mapping, "change the column mapping")?;
        self.mapping = mapping;
        Ok(())
    }

    pub fn set_default_side(&mut self, side: Side) {
        self.default_side = side;
    }

    pub fn set_event_ids(&mut self, event_ids: Vec<String>) {
        self.event_ids = event_ids;
    }

    /// Re-run validation and store the result.
    pub fn validate(&mut self) -> &[ValidationError] {
        self.errors = validate(&self.rows, &self.mapping);
        &self.errors
    }

    /// Validate, transform and move to the preview step.
    ///
    /// Returns the number of guests in the preview.
    pub fn advance_to_preview(&mut self) -> Result<usize, SessionError> {
        self.require_step(Step::Mapping, "preview guests")?;

        let error_count = self.validate().len();
        if error_count > 0 {
            self.log(LogEntry::warning(format!("{} validation errors", error_count)));
            return Err(SessionError::Invalid(error_count));
        }

        let defaults = TransformDefaults {
            default_side: self.default_side.clone(),
            event_ids: self.event_ids.clone(),
        };
        let guests = transform(&self.rows, &self.mapping, &defaults);
        let skipped = self.rows.len() - guests.len();
        if skipped > 0 {
            self.log(LogEntry::warning(format!("{} rows without a name skipped", skipped)).with_indent(1));
        }

        self.preview = PreviewEditor::new(guests);
        self.step = Step::Preview;
        self.log(LogEntry::success(format!("{} guests ready for review", self.preview.len())));
        Ok(self.preview.len())
    }

    // -------------------------------------------------------------------------
    // Preview step
    // -------------------------------------------------------------------------

    /// Return to the mapping step.
    pub fn back(&mut self) -> Result<(), SessionError> {
        self.require_step(Step::Preview, "go back")?;
        self.require_idle()?;
        self.errors.clear();
        self.step = Step::Mapping;
        Ok(())
    }

    pub fn update_guest(&mut self, id: GuestId, field: GuestField, value: Cell) -> Result<(), SessionError> {
        self.require_step(Step::Preview, "edit guests")?;
        self.require_idle()?;
        self.preview.update_field(id, field, value)?;
        Ok(())
    }

    pub fn remove_guest(&mut self, id: GuestId) -> Result<ParsedGuest, SessionError> {
        self.require_step(Step::Preview, "remove guests")?;
        self.require_idle()?;
        Ok(self.preview.remove_row(id)?)
    }

    // -------------------------------------------------------------------------
    // Submission
    // -------------------------------------------------------------------------

    /// Mark the session busy and hand out the batch to import.
    pub fn begin_import(&mut self) -> Result<Vec<ParsedGuest>, SessionError> {
        self.require_step(Step::Preview, "import guests")?;
        self.require_idle()?;
        if self.preview.is_empty() {
            return Err(SessionError::NothingToImport);
        }

        // A retry replaces the previous failure message
        self.errors.retain(|e| e.field != "import");
        self.importing = true;
        self.in_flight = self.preview.len();
        self.log(LogEntry::info(format!("Importing {} guests...", self.preview.len())));
        Ok(self.preview.guests().to_vec())
    }

    /// Apply the importer's result.
    ///
    /// Success resets the session and returns the number of imported
    /// guests. Failure adds a single `import` error, keeps everything else
    /// for a retry and hands the importer error back.
    pub fn finish_import(&mut self, result: Result<(), ImportError>) -> Result<usize, ImportError> {
        self.importing = false;
        let count = std::mem::take(&mut self.in_flight);

        match result {
            Ok(()) => {
                self.log(LogEntry::success(format!("Imported {} guests", count)));
                self.reset();
                Ok(count)
            }
            Err(e) => {
                self.log(LogEntry::error(format!("Import failed: {}", e)));
                self.errors.push(ValidationError::batch("import", IMPORT_FAILED_MESSAGE));
                Err(e)
            }
        }
    }

    /// Run the whole submission against `importer`.
    pub async fn submit<I: GuestImporter>(&mut self, importer: &I) -> Result<usize, SessionError> {
        let guests = self.begin_import()?;
        let result = importer.import(&guests).await;
        Ok(self.finish_import(result)?)
    }

    /// Back to a fresh upload step. Default side and options are kept.
    pub fn reset(&mut self) {
        self.step = Step::Upload;
        self.method = ImportMethod::File;
        self.file_name = None;
        self.paste_text.clear();
        self.headers.clear();
        self.rows.clear();
        self.mapping = ColumnMapping::new();
        self.event_ids.clear();
        self.errors.clear();
        self.preview.clear();
        self.importing = false;
        self.in_flight = 0;
    }
}

impl Default for ImportSession {
    fn default() -> Self {
        Self::new(SessionOptions::default())
    }
}
