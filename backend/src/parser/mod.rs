//! Tabular parsing for guest imports.
//!
//! Three inputs end up in the same [`ParseResult`]:
//!
//! - `.csv` files: encoding and delimiter auto-detection, header row
//! - `.xlsx` / `.xls` workbooks: first sheet only, header row
//! - pasted spreadsheet text: tab- or comma-delimited, header row
//!
//! No guest-specific logic here; rows are keyed by their raw headers.

use calamine::{open_workbook_auto_from_rs, Data, Reader};
use std::io::Cursor;
use std::path::Path;

use crate::error::ParseError;
use crate::models::{Cell, RawRow};

/// Result of parsing with metadata
#[derive(Debug, Clone)]
pub struct ParseResult {
    /// Column headers, in source order
    pub headers: Vec<String>,
    /// Data rows keyed by header
    pub rows: Vec<RawRow>,
    /// Detected encoding (`"utf-8"` for workbooks and pasted text)
    pub encoding: String,
    /// Delimiter used, `None` for workbooks
    pub delimiter: Option<char>,
}

/// Supported upload formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    Csv,
    Xlsx,
    Xls,
}

impl FileKind {
    /// Pick the format from a file name's extension.
    pub fn from_file_name(name: &str) -> Result<Self, ParseError> {
        let ext = Path::new(name)
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase())
            .unwrap_or_default();

        match ext.as_str() {
            "csv" => Ok(FileKind::Csv),
            "xlsx" => Ok(FileKind::Xlsx),
            "xls" => Ok(FileKind::Xls),
            _ => Err(ParseError::UnsupportedFile(if ext.is_empty() {
                name.to_string()
            } else {
                ext
            })),
        }
    }
}

/// Parse an uploaded file, dispatching on its extension.
pub fn parse_file(name: &str, bytes: &[u8]) -> Result<ParseResult, ParseError> {
    match FileKind::from_file_name(name)? {
        FileKind::Csv => parse_csv_bytes(bytes),
        FileKind::Xlsx | FileKind::Xls => parse_workbook(bytes),
    }
}

// =============================================================================
// CSV files
// =============================================================================

/// Detect the encoding of raw bytes using chardet
pub fn detect_encoding(bytes: &[u8]) -> String {
    let result = chardet::detect(bytes);
    let charset = result.0;

    match charset.to_lowercase().as_str() {
        "ascii" | "utf-8" | "utf8" | "" => "utf-8".to_string(),
        "iso-8859-1" | "iso-8859-15" | "latin-1" | "latin1" => "iso-8859-1".to_string(),
        "windows-1252" | "cp1252" => "windows-1252".to_string(),
        _ => charset,
    }
}

/// Decode bytes using the given encoding; unknown encodings fall back to lossy UTF-8.
pub fn decode_content(bytes: &[u8], encoding: &str) -> String {
    let decoded = match encoding.to_lowercase().as_str() {
        "iso-8859-1" | "latin-1" | "latin1" => encoding_rs::WINDOWS_1252.decode(bytes).0.into_owned(),
        "windows-1252" | "cp1252" => encoding_rs::WINDOWS_1252.decode(bytes).0.into_owned(),
        _ => String::from_utf8_lossy(bytes).into_owned(),
    };

    decoded.trim_start_matches('\u{feff}').to_string()
}

/// Detect the delimiter by counting occurrences in the first line
pub fn detect_delimiter(content: &str) -> char {
    let first_line = content.lines().next().unwrap_or("");

    let separators = [',', ';', '\t', '|'];
    let mut best_sep = ',';
    let mut best_count = 0;

    for &sep in &separators {
        let count = first_line.matches(sep).count();
        if count > best_count {
            best_count = count;
            best_sep = sep;
        }
    }

    best_sep
}

/// Parse CSV bytes with auto-detection of encoding and delimiter.
pub fn parse_csv_bytes(bytes: &[u8]) -> Result<ParseResult, ParseError> {
    let encoding = detect_encoding(bytes);
    let content = decode_content(bytes, &encoding);
    let delimiter = detect_delimiter(&content);

    let mut result = parse_csv_str(&content, delimiter)?;
    result.encoding = encoding;
    Ok(result)
}

/// Parse CSV text with a header row and explicit delimiter.
///
/// Blank lines are skipped, short records are padded with empty cells and
/// cells beyond the header are ignored.
pub fn parse_csv_str(content: &str, delimiter: char) -> Result<ParseResult, ParseError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .delimiter(delimiter as u8)
        .from_reader(content.as_bytes());

    let headers: Vec<String> = reader
        .headers()?
        .iter()
        .enumerate()
        .map(|(i, h)| normalize_header(h, i))
        .collect();

    if headers.is_empty() {
        return Err(ParseError::EmptyFile);
    }

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        if record.iter().all(|cell| cell.trim().is_empty()) {
            continue;
        }

        let cells: Vec<Cell> = record.iter().map(Cell::from).collect();
        rows.push(zip_row(&headers, cells));
    }

    if rows.is_empty() {
        return Err(ParseError::EmptyFile);
    }

    Ok(ParseResult {
        headers,
        rows,
        encoding: "utf-8".to_string(),
        delimiter: Some(delimiter),
    })
}

// =============================================================================
// Workbooks
// =============================================================================

/// Parse the first sheet of an `.xlsx` / `.xls` workbook.
pub fn parse_workbook(bytes: &[u8]) -> Result<ParseResult, ParseError> {
    let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes.to_vec()))
        .map_err(|e| ParseError::Workbook(e.to_string()))?;

    let range = workbook
        .worksheet_range_at(0)
        .ok_or(ParseError::EmptyFile)?
        .map_err(|e| ParseError::Workbook(e.to_string()))?;

    let mut sheet_rows = range.rows();
    let header_row = sheet_rows.next().ok_or(ParseError::EmptyFile)?;
    let headers: Vec<String> = header_row
        .iter()
        .enumerate()
        .map(|(i, data)| normalize_header(&cell_from_data(data).as_text(), i))
        .collect();

    let rows: Vec<RawRow> = sheet_rows
        .filter(|row| row.iter().any(|data| !matches!(data, Data::Empty)))
        .map(|row| zip_row(&headers, row.iter().map(cell_from_data).collect()))
        .collect();

    if rows.is_empty() {
        return Err(ParseError::EmptyFile);
    }

    Ok(ParseResult {
        headers,
        rows,
        encoding: "utf-8".to_string(),
        delimiter: None,
    })
}

/// Native booleans survive; every other value is stringified.
fn cell_from_data(data: &Data) -> Cell {
    match data {
        Data::Bool(b) => Cell::Bool(*b),
        Data::Empty => Cell::default(),
        Data::String(s) => Cell::Text(s.clone()),
        other => Cell::Text(other.to_string()),
    }
}

// =============================================================================
// Pasted text
// =============================================================================

/// Delimiter for pasted text: tab if the header line has one, else comma.
pub fn detect_paste_delimiter(first_line: &str) -> char {
    if first_line.contains('\t') {
        '\t'
    } else {
        ','
    }
}

/// Split one comma-delimited line, keeping commas inside double quotes.
///
/// A `"` only toggles the in-quotes state and is dropped; escaped quotes
/// (`""`) are not recognised. Every field is trimmed.
pub fn split_quoted(line: &str) -> Vec<String> {
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;

    for c in line.chars() {
        match c {
            '"' => in_quotes = !in_quotes,
            ',' if !in_quotes => {
                fields.push(current.trim().to_string());
                current.clear();
            }
            _ => current.push(c),
        }
    }
    fields.push(current.trim().to_string());

    fields
}

/// Split a line with the given paste delimiter.
pub fn split_pasted_line(line: &str, delimiter: char) -> Vec<String> {
    if delimiter == ',' {
        split_quoted(line)
    } else {
        line.split(delimiter).map(|s| s.trim().to_string()).collect()
    }
}

/// Parse spreadsheet content pasted from the clipboard.
///
/// # Example
/// ```ignore
/// use guestlist::parser::parse_pasted;
///
/// let result = parse_pasted("Name\tEmail\nJohn Doe\tjohn@x.com").unwrap();
/// assert_eq!(result.headers, vec!["Name", "Email"]);
/// assert_eq!(result.rows.len(), 1);
/// ```
pub fn parse_pasted(text: &str) -> Result<ParseResult, ParseError> {
    let lines: Vec<&str> = text
        .lines()
        .filter(|line| !line.trim().is_empty())
        .collect();

    if lines.len() < 2 {
        return Err(ParseError::PasteTooShort);
    }

    let delimiter = detect_paste_delimiter(lines[0]);
    let headers: Vec<String> = split_pasted_line(lines[0], delimiter)
        .iter()
        .enumerate()
        .map(|(i, h)| normalize_header(h, i))
        .collect();

    let rows: Vec<RawRow> = lines[1..]
        .iter()
        .map(|line| split_pasted_line(line, delimiter))
        .filter(|cells| cells.iter().any(|c| !c.is_empty()))
        .map(|cells| zip_row(&headers, cells.into_iter().map(Cell::Text).collect()))
        .collect();

    if rows.is_empty() {
        return Err(ParseError::PasteNoRows);
    }

    Ok(ParseResult {
        headers,
        rows,
        encoding: "utf-8".to_string(),
        delimiter: Some(delimiter),
    })
}

// =============================================================================
// Helpers
// =============================================================================

/// Trim a header; blank headers get a positional name.
fn normalize_header(value: &str, index: usize) -> String {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        format!("Column {}", index + 1)
    } else {
        trimmed.to_string()
    }
}

/// `header[i] → cells[i]`, missing cells become empty text.
fn zip_row(headers: &[String], cells: Vec<Cell>) -> RawRow {
    let mut cells = cells.into_iter();
    headers
        .iter()
        .map(|h| (h.clone(), cells.next().unwrap_or_default()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(row: &RawRow, key: &str) -> String {
        row.get(key).map(|c| c.as_text().into_owned()).unwrap_or_default()
    }

    #[test]
    fn test_simple_csv() {
        let result = parse_csv_str("Name,Email\nAlice,alice@x.com\nBob,bob@x.com", ',').unwrap();

        assert_eq!(result.headers, vec!["Name", "Email"]);
        assert_eq!(result.rows.len(), 2);
        assert_eq!(text(&result.rows[0], "Name"), "Alice");
        assert_eq!(text(&result.rows[1], "Email"), "bob@x.com");
    }

    #[test]
    fn test_csv_quoted_values() {
        let result = parse_csv_str("Name,Address\n\"Doe, John\",\"12 MG Road, Pune\"", ',').unwrap();

        assert_eq!(text(&result.rows[0], "Name"), "Doe, John");
        assert_eq!(text(&result.rows[0], "Address"), "12 MG Road, Pune");
    }

    #[test]
    fn test_csv_blank_lines_skipped() {
        let result = parse_csv_str("a,b\n1,2\n\n,\n3,4\n", ',').unwrap();
        assert_eq!(result.rows.len(), 2);
    }

    #[test]
    fn test_csv_short_and_long_records() {
        let result = parse_csv_str("a,b,c\n1\n1,2,3,4", ',').unwrap();

        assert_eq!(text(&result.rows[0], "a"), "1");
        assert_eq!(text(&result.rows[0], "c"), "");
        assert_eq!(result.rows[1].len(), 3);
    }

    #[test]
    fn test_csv_header_only_is_empty() {
        let err = parse_csv_str("Name,Email\n", ',').unwrap_err();
        assert!(matches!(err, ParseError::EmptyFile));
    }

    #[test]
    fn test_csv_bytes_auto() {
        let result = parse_csv_bytes("Name;Side\nAsha;bride\n".as_bytes()).unwrap();

        assert_eq!(result.delimiter, Some(';'));
        assert_eq!(result.encoding, "utf-8");
        assert_eq!(text(&result.rows[0], "Side"), "bride");
    }

    #[test]
    fn test_csv_bom_stripped() {
        let mut bytes = vec![0xEF, 0xBB, 0xBF];
        bytes.extend_from_slice(b"Name,Email\nAsha,a@b.co\n");
        let result = parse_csv_bytes(&bytes).unwrap();

        assert_eq!(result.headers[0], "Name");
    }

    #[test]
    fn test_latin1_decoding() {
        // "Zoë" in ISO-8859-1
        let bytes: &[u8] = &[0x5A, 0x6F, 0xEB];
        assert_eq!(decode_content(bytes, "iso-8859-1"), "Zoë");
    }

    #[test]
    fn test_detect_delimiter() {
        assert_eq!(detect_delimiter("a;b;c\n1;2;3"), ';');
        assert_eq!(detect_delimiter("a,b,c"), ',');
        assert_eq!(detect_delimiter("a\tb\tc"), '\t');
        assert_eq!(detect_delimiter("single"), ',');
    }

    #[test]
    fn test_file_kind() {
        assert_eq!(FileKind::from_file_name("guests.CSV").unwrap(), FileKind::Csv);
        assert_eq!(FileKind::from_file_name("guests.xlsx").unwrap(), FileKind::Xlsx);
        assert_eq!(FileKind::from_file_name("old.xls").unwrap(), FileKind::Xls);

        let err = FileKind::from_file_name("guests.pdf").unwrap_err();
        assert_eq!(err.to_string(), "Unsupported file type: pdf. Use .csv, .xlsx or .xls");
    }

    /// Two-sheet workbook: guests first, with a blank row and a blank
    /// header cell, then an unrelated sheet.
    fn guest_workbook() -> Vec<u8> {
        let mut workbook = rust_xlsxwriter::Workbook::new();

        let guests = workbook.add_worksheet();
        guests.set_name("Guests").unwrap();
        guests.write_string(0, 0, "Name").unwrap();
        guests.write_string(0, 1, "Plus One").unwrap();
        guests.write_string(0, 2, "Table").unwrap();
        guests.write_string(1, 0, "Asha").unwrap();
        guests.write_boolean(1, 1, true).unwrap();
        guests.write_number(1, 2, 3.5).unwrap();
        guests.write_string(1, 3, "VIP").unwrap();
        guests.write_string(3, 0, "Ravi").unwrap();
        guests.write_boolean(3, 1, false).unwrap();
        guests.write_number(3, 2, 12).unwrap();

        let vendors = workbook.add_worksheet();
        vendors.set_name("Vendors").unwrap();
        vendors.write_string(0, 0, "Vendor").unwrap();
        vendors.write_string(1, 0, "Caterer").unwrap();

        workbook.save_to_buffer().unwrap()
    }

    #[test]
    fn test_workbook_first_sheet() {
        let result = parse_file("guests.xlsx", &guest_workbook()).unwrap();

        assert_eq!(result.headers, vec!["Name", "Plus One", "Table", "Column 4"]);
        assert_eq!(result.delimiter, None);
        // blank row 3 is skipped
        assert_eq!(result.rows.len(), 2);
        assert_eq!(result.rows[0]["Name"], Cell::from("Asha"));
        assert_eq!(result.rows[1]["Name"], Cell::from("Ravi"));
        assert!(result.rows.iter().all(|r| !r.contains_key("Vendor")));
    }

    #[test]
    fn test_workbook_cell_types() {
        let result = parse_workbook(&guest_workbook()).unwrap();
        let (asha, ravi) = (&result.rows[0], &result.rows[1]);

        assert_eq!(asha["Plus One"], Cell::Bool(true));
        assert_eq!(ravi["Plus One"], Cell::Bool(false));
        assert_eq!(asha["Table"], Cell::from("3.5"));
        assert_eq!(ravi["Table"], Cell::from("12"));
        assert_eq!(asha["Column 4"], Cell::from("VIP"));
        assert_eq!(ravi["Column 4"], Cell::from(""));
    }

    #[test]
    fn test_invalid_workbook() {
        let err = parse_file("guests.xlsx", b"not a workbook").unwrap_err();
        assert!(matches!(err, ParseError::Workbook(_)));
    }

    #[test]
    fn test_split_quoted() {
        assert_eq!(split_quoted("a,\"b,c\",d"), vec!["a", "b,c", "d"]);
        assert_eq!(split_quoted(" a , b ,"), vec!["a", "b", ""]);
    }

    #[test]
    fn test_split_quoted_escaped_quotes_not_supported() {
        // `""` toggles twice and vanishes
        assert_eq!(split_quoted("\"say \"\"hi\"\"\",x"), vec!["say hi", "x"]);
    }

    #[test]
    fn test_paste_blank_header_named() {
        let result = parse_pasted("Name,\nAsha,x").unwrap();

        assert_eq!(result.headers, vec!["Name", "Column 2"]);
        assert_eq!(result.rows[0]["Column 2"], Cell::from("x"));
    }

    #[test]
    fn test_paste_requires_two_lines() {
        for input in ["", "Name\tEmail", "Name\n\n   \n"] {
            let err = parse_pasted(input).unwrap_err();
            assert!(matches!(err, ParseError::PasteTooShort));
            assert_eq!(err.to_string(), "Please include a header row and at least one data row");
        }
    }

    #[test]
    fn test_paste_tab_delimiter_wins() {
        let result = parse_pasted("Name\tAddress\nAsha\t12 Park St, Kolkata").unwrap();

        assert_eq!(result.delimiter, Some('\t'));
        assert_eq!(text(&result.rows[0], "Address"), "12 Park St, Kolkata");
    }

    #[test]
    fn test_paste_comma_quotes() {
        let result = parse_pasted("Name,Address,Side\nAsha,\"12 Park St, Kolkata\",bride").unwrap();

        assert_eq!(result.delimiter, Some(','));
        assert_eq!(text(&result.rows[0], "Address"), "12 Park St, Kolkata");
        assert_eq!(text(&result.rows[0], "Side"), "bride");
    }

    #[test]
    fn test_paste_empty_rows_dropped() {
        let err = parse_pasted("Name,Email\n,\n , ").unwrap_err();
        assert!(matches!(err, ParseError::PasteNoRows));
        assert_eq!(err.to_string(), "No data rows found after header");
    }

    #[test]
    fn test_paste_end_to_end_example() {
        let result = parse_pasted("Name\tEmail\nJohn Doe\tjohn@x.com\nJane Doe\t").unwrap();

        assert_eq!(result.headers, vec!["Name", "Email"]);
        assert_eq!(result.rows.len(), 2);
        assert_eq!(text(&result.rows[1], "Name"), "Jane Doe");
        assert_eq!(text(&result.rows[1], "Email"), "");
    }
}
