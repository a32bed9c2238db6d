//! Injected capabilities: clipboard and file access.
//!
//! The pipeline never touches the clipboard or the file system directly,
//! so it can be driven from the CLI, the HTTP server or tests alike.

use std::future::Future;
use std::io::{self, Write};
use std::path::Path;

/// Spreadsheet template users can paste into Excel or Google Sheets.
///
/// Headers match the auto-mapper keywords, so a filled-in copy maps every
/// column without manual adjustment.
pub const GUEST_TEMPLATE: &str = "Name\tEmail\tPhone\tAddress\tSide\tPlus One\tDietary Restrictions\tHousehold Name\tMain Household Contact
Priya Sharma\tpriya@example.com\t+91 98765 43210\t12 MG Road, Mumbai\tbride\tyes\tVegetarian\tSharma Family\tyes
Rahul Sharma\trahul@example.com\t\t12 MG Road, Mumbai\tbride\tno\t\tSharma Family\tno
Arjun Mehta\tarjun@example.com\t+1 555 0100\t\tgroom\tno\tNut allergy\tMehta Family\tyes";

/// Somewhere text can be copied to.
pub trait ClipboardPort {
    fn write_text(&mut self, text: &str) -> io::Result<()>;
}

/// Source of uploaded file bytes.
pub trait FileReaderPort {
    fn read(&self, path: &Path) -> impl Future<Output = io::Result<Vec<u8>>> + Send;
}

/// "Clipboard" for terminals: the text goes to any writer, stdout by default.
pub struct WriterClipboard<W: Write> {
    writer: W,
}

impl WriterClipboard<io::Stdout> {
    pub fn stdout() -> Self {
        Self { writer: io::stdout() }
    }
}

impl<W: Write> WriterClipboard<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> ClipboardPort for WriterClipboard<W> {
    fn write_text(&mut self, text: &str) -> io::Result<()> {
        writeln!(self.writer, "{}", text)?;
        self.writer.flush()
    }
}

/// Reads files from the local file system.
#[derive(Debug, Clone, Copy, Default)]
pub struct FsFileReader;

impl FileReaderPort for FsFileReader {
    async fn read(&self, path: &Path) -> io::Result<Vec<u8>> {
        tokio::fs::read(path).await
    }
}

/// Copy the guest template to `clipboard`.
pub fn copy_template<C: ClipboardPort>(clipboard: &mut C) -> io::Result<()> {
    clipboard.write_text(GUEST_TEMPLATE)
}
