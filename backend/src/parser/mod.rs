//! Spreadsheet input.
//!
//! Reads CSV exports (with encoding auto-detection) and pre-parsed
//! array-of-arrays payloads into a [`Sheet`]: one header row plus data rows
//! aligned to it by index.

use crate::error::{CsvError, CsvResult};

/// Separator between logical values inside one cell.
pub const VALUE_SEPARATOR: &str = " ; ";

/// A header row plus the data rows beneath it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Sheet {
    pub header: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl Sheet {
    /// Build a sheet from rows where row 0 is the header.
    ///
    /// An empty input yields an empty header and no rows.
    pub fn from_rows(mut rows: Vec<Vec<String>>) -> Self {
        if rows.is_empty() {
            return Self::default();
        }
        let header = rows.remove(0);
        Self { header, rows }
    }

    /// Cell text at `column` in `row`; short rows read as empty.
    pub fn cell<'a>(&self, row: &'a [String], column: usize) -> &'a str {
        row.get(column).map(String::as_str).unwrap_or("")
    }

    /// Value of the first column named `name` in `row`, or `""` when absent.
    pub fn column_value<'a>(&self, name: &str, row: &'a [String]) -> &'a str {
        match self.header.iter().position(|h| h == name) {
            Some(i) => self.cell(row, i),
            None => "",
        }
    }
}

/// Split a cell into trimmed, non-empty logical values.
pub fn split_values(cell: &str) -> impl Iterator<Item = &str> {
    cell.split(VALUE_SEPARATOR).map(str::trim).filter(|v| !v.is_empty())
}

/// Detect the encoding of raw bytes using chardet
pub fn detect_encoding(bytes: &[u8]) -> String {
    if bytes.starts_with(&[0xEF, 0xBB, 0xBF]) {
        return "utf-8".to_string();
    }

    let result = chardet::detect(bytes);
    let charset = result.0;

    match charset.to_lowercase().as_str() {
        "ascii" | "utf-8" | "utf8" | "" => "utf-8".to_string(),
        "iso-8859-1" | "latin-1" | "latin1" => "iso-8859-1".to_string(),
        "iso-8859-15" | "latin-9" => "iso-8859-15".to_string(),
        "windows-1252" | "cp1252" => "windows-1252".to_string(),
        _ => charset,
    }
}

/// Decode bytes to string using the specified encoding
pub fn decode_content(bytes: &[u8], encoding: &str) -> String {
    let bytes = bytes.strip_prefix(&[0xEF, 0xBB, 0xBF]).unwrap_or(bytes);
    match encoding.to_lowercase().as_str() {
        // windows-1252 agrees with latin-1 on every printable byte.
        "iso-8859-1" | "latin-1" | "latin1" | "windows-1252" | "cp1252" => {
            encoding_rs::WINDOWS_1252.decode(bytes).0.into_owned()
        }
        "iso-8859-15" | "latin-9" => encoding_rs::ISO_8859_15.decode(bytes).0.into_owned(),
        _ => String::from_utf8_lossy(bytes).into_owned(),
    }
}

/// Parse a CSV export, auto-detecting its encoding.
pub fn parse_bytes_auto(bytes: &[u8]) -> CsvResult<Sheet> {
    let encoding = detect_encoding(bytes);
    let content = decode_content(bytes, &encoding);
    parse_csv(&content)
}

/// Parse CSV text. The first record is the header.
pub fn parse_csv(content: &str) -> CsvResult<Sheet> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(content.as_bytes());

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        rows.push(record.iter().map(str::to_string).collect::<Vec<_>>());
    }

    if rows.is_empty() {
        return Err(CsvError::EmptyFile);
    }

    Ok(Sheet::from_rows(rows))
}

/// Parse a CSV file from disk.
pub fn parse_csv_file(path: &std::path::Path) -> CsvResult<Sheet> {
    let bytes = std::fs::read(path)?;
    parse_bytes_auto(&bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simple_csv() {
        let sheet = parse_csv("Title,Object Model,Full Title\nfoo,bar,Full Test Title").unwrap();
        assert_eq!(sheet.header, vec!["Title", "Object Model", "Full Title"]);
        assert_eq!(sheet.rows.len(), 1);
        assert_eq!(sheet.rows[0][2], "Full Test Title");
    }

    #[test]
    fn test_quoted_json_cell() {
        let csv = "Contributor\n\"{\"\"name\"\":\"\"relators:cre:corporate_body:The Valley Voice\"\"}\"";
        let sheet = parse_csv(csv).unwrap();
        assert_eq!(sheet.rows[0][0], r#"{"name":"relators:cre:corporate_body:The Valley Voice"}"#);
    }

    #[test]
    fn test_short_rows_read_as_empty() {
        let sheet = parse_csv("a,b,c\n1").unwrap();
        let row = &sheet.rows[0];
        assert_eq!(sheet.cell(row, 0), "1");
        assert_eq!(sheet.cell(row, 2), "");
        assert_eq!(sheet.column_value("c", row), "");
        assert_eq!(sheet.column_value("missing", row), "");
    }

    #[test]
    fn test_empty_csv_error() {
        assert!(matches!(parse_csv(""), Err(CsvError::EmptyFile)));
    }

    #[test]
    fn test_from_rows_header_only() {
        let sheet = Sheet::from_rows(vec![vec!["Title".to_string()]]);
        assert_eq!(sheet.header, vec!["Title"]);
        assert!(sheet.rows.is_empty());
    }

    #[test]
    fn test_split_values() {
        let values: Vec<&str> = split_values("a ; b ;  ; c ").collect();
        assert_eq!(values, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_utf8_bom_stripped() {
        let mut bytes = vec![0xEF, 0xBB, 0xBF];
        bytes.extend_from_slice(b"Title\nfoo");
        let sheet = parse_bytes_auto(&bytes).unwrap();
        assert_eq!(sheet.header, vec!["Title"]);
    }

    #[test]
    fn test_latin1_decoding() {
        // "Société" in ISO-8859-1
        let bytes: &[u8] = &[0x53, 0x6F, 0x63, 0x69, 0xE9, 0x74, 0xE9];
        let decoded = decode_content(bytes, "iso-8859-1");
        assert_eq!(decoded, "Société");
    }

    #[test]
    fn test_latin1_symbols_not_read_as_latin9() {
        // Currency sign and one half; latin-9 would give the euro sign and "œ".
        assert_eq!(decode_content(&[0xA4, 0xBD], "iso-8859-1"), "¤½");
        assert_eq!(decode_content(&[0xA4, 0xBD], "iso-8859-15"), "€œ");
    }
}
