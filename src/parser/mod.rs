//! Wide-CSV parser with encoding and delimiter auto-detection.
//!
//! Upstream feeds arrive as wide time-series CSVs: identifying columns
//! followed by one column per date. This module stops at the raw frame:
//! it knows nothing about metrics or region keys; reshaping happens in
//! [`crate::transform::melt`].
//!
//! Region names contain quoted delimiters (`"Korea, South"`), so parsing
//! goes through the `csv` crate rather than line splitting.

use std::path::Path;

use crate::error::{CsvError, CsvResult};

/// A parsed wide table: headers plus string cells.
///
/// Every row is padded or truncated to header width, so `rows[i][j]`
/// is always addressable for `j < headers.len()`.
#[derive(Debug, Clone)]
pub struct WideFrame {
    /// Column headers, in source order.
    pub headers: Vec<String>,
    /// Data rows, one `Vec<String>` per source row.
    pub rows: Vec<Vec<String>>,
}

impl WideFrame {
    /// Number of data rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Index of a column by exact header name.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }
}

/// Detect the encoding of raw bytes using chardet.
pub fn detect_encoding(bytes: &[u8]) -> String {
    let (charset, _, _) = chardet::detect(bytes);

    // Normalize charset names
    match charset.to_lowercase().as_str() {
        "ascii" | "utf-8" | "utf8" => "utf-8".to_string(),
        "iso-8859-1" | "iso-8859-15" | "latin-1" | "latin1" => "iso-8859-1".to_string(),
        "windows-1252" | "cp1252" => "windows-1252".to_string(),
        other => other.to_string(),
    }
}

/// Decode bytes to text using the detected encoding.
///
/// Unknown encodings fall back to lossy UTF-8; feed content must survive
/// decoding even when detection is wrong (fill-over-fail policy).
pub fn decode_content(bytes: &[u8], encoding: &str) -> CsvResult<String> {
    let decoded = match encoding.to_lowercase().as_str() {
        "utf-8" | "utf8" | "ascii" => String::from_utf8_lossy(bytes).to_string(),
        "iso-8859-1" | "latin-1" | "latin1" => encoding_rs::ISO_8859_15.decode(bytes).0.to_string(),
        "windows-1252" | "cp1252" => encoding_rs::WINDOWS_1252.decode(bytes).0.to_string(),
        _ => String::from_utf8_lossy(bytes).to_string(),
    };

    if decoded.is_empty() {
        return Err(CsvError::EmptyInput);
    }
    Ok(decoded)
}

/// Detect the delimiter by counting occurrences in the first line.
pub fn detect_delimiter(content: &str) -> char {
    let first_line = content.lines().next().unwrap_or("");

    let separators = [',', ';', '\t', '|'];
    let mut best_sep = ',';
    let mut best_count = 0;

    for &sep in &separators {
        // naive count is fine here: headers of the feeds we care about
        // do not contain quoted delimiters
        let count = first_line.matches(sep).count();
        if count > best_count {
            best_count = count;
            best_sep = sep;
        }
    }

    best_sep
}

/// Parse raw bytes into a [`WideFrame`], auto-detecting encoding and delimiter.
pub fn parse_wide_bytes(bytes: &[u8]) -> CsvResult<WideFrame> {
    if bytes.is_empty() {
        return Err(CsvError::EmptyInput);
    }
    let encoding = detect_encoding(bytes);
    let content = decode_content(bytes, &encoding)?;
    let delimiter = detect_delimiter(&content);
    parse_wide_str(&content, delimiter)
}

/// Parse decoded text into a [`WideFrame`] with an explicit delimiter.
pub fn parse_wide_str(content: &str, delimiter: char) -> CsvResult<WideFrame> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter as u8)
        .flexible(true)
        .from_reader(content.as_bytes());

    let headers: Vec<String> = reader
        .headers()?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();

    if headers.is_empty() || headers.iter().all(|h| h.is_empty()) {
        return Err(CsvError::NoHeaders);
    }

    let width = headers.len();
    let mut rows = Vec::new();

    for record in reader.records() {
        let record = record?;
        let mut row: Vec<String> = record
            .iter()
            .take(width)
            .map(|cell| cell.trim().to_string())
            .collect();
        if row.iter().all(|cell| cell.is_empty()) {
            continue;
        }
        row.resize(width, String::new());
        rows.push(row);
    }

    Ok(WideFrame { headers, rows })
}

/// Parse a local CSV file, auto-detecting encoding and delimiter.
///
/// Used by the `inspect` debug command and file-based tests; the serving
/// path goes through [`crate::fetch`] and [`parse_wide_bytes`].
pub fn parse_wide_file<P: AsRef<Path>>(path: P) -> CsvResult<WideFrame> {
    let bytes = std::fs::read(path.as_ref())?;
    parse_wide_bytes(&bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_simple_frame() {
        let csv = "Province/State,Country/Region,1/22/20\n,Italy,3\nHubei,China,444";
        let frame = parse_wide_bytes(csv.as_bytes()).unwrap();

        assert_eq!(
            frame.headers,
            vec!["Province/State", "Country/Region", "1/22/20"]
        );
        assert_eq!(frame.len(), 2);
        assert_eq!(frame.rows[0], vec!["", "Italy", "3"]);
        assert_eq!(frame.rows[1], vec!["Hubei", "China", "444"]);
    }

    #[test]
    fn test_quoted_delimiter_in_region_name() {
        let csv = "Province/State,Country/Region,1/22/20\n,\"Korea, South\",1";
        let frame = parse_wide_bytes(csv.as_bytes()).unwrap();

        assert_eq!(frame.rows[0][1], "Korea, South");
        assert_eq!(frame.rows[0][2], "1");
    }

    #[test]
    fn test_short_rows_padded() {
        let frame = parse_wide_str("a,b,c\n1,2", ',').unwrap();
        assert_eq!(frame.rows[0], vec!["1", "2", ""]);
    }

    #[test]
    fn test_long_rows_truncated() {
        let frame = parse_wide_str("a,b\n1,2,3,4", ',').unwrap();
        assert_eq!(frame.rows[0], vec!["1", "2"]);
    }

    #[test]
    fn test_blank_rows_skipped() {
        let frame = parse_wide_str("a,b\n1,2\n,\n3,4\n", ',').unwrap();
        assert_eq!(frame.len(), 2);
    }

    #[test]
    fn test_column_index() {
        let frame = parse_wide_str("Admin2,Province_State,1/22/20\nCook,Illinois,0", ',').unwrap();
        assert_eq!(frame.column_index("Admin2"), Some(0));
        assert_eq!(frame.column_index("Lat"), None);
    }

    #[test]
    fn test_empty_input_error() {
        assert!(matches!(
            parse_wide_bytes(b""),
            Err(CsvError::EmptyInput)
        ));
    }

    #[test]
    fn test_detect_delimiter() {
        assert_eq!(detect_delimiter("a,b,c\n1,2,3"), ',');
        assert_eq!(detect_delimiter("a;b;c\n1;2;3"), ';');
        assert_eq!(detect_delimiter("a\tb\tc"), '\t');
    }

    #[test]
    fn test_latin1_decoding() {
        // "Curaçao" with ISO-8859-1 ç
        let bytes: &[u8] = &[0x43, 0x75, 0x72, 0x61, 0xE7, 0x61, 0x6F];
        let decoded = decode_content(bytes, "iso-8859-1").unwrap();
        assert!(decoded.starts_with("Cura"));
    }

    #[test]
    fn test_parse_wide_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "Province/State,Country/Region,1/22/20\n,Italy,0").unwrap();

        let frame = parse_wide_file(file.path()).unwrap();
        assert_eq!(frame.len(), 1);
        assert_eq!(frame.rows[0][1], "Italy");
    }
}
