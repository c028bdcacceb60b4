//! Delimited file parsing
//!
//! Exports in the wild use either `,` or `;` (occasionally tabs) and quote
//! only the fields that need it, such as timestamps containing a comma in a
//! comma-separated file. The delimiter is sniffed from the first line; the
//! first two records become the header and every further record a raw row.

use thiserror::Error;

use crate::normalizer::HeaderColumn;

/// Delimiters considered by [`detect_delimiter`], in tie-break order.
pub const DELIMITER_CANDIDATES: [u8; 3] = [b',', b';', b'\t'];

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("source is empty")]
    Empty,

    #[error("source has a name header row but no unit header row")]
    MissingUnitRow,

    #[error("malformed delimited data: {0}")]
    Csv(#[from] csv::Error),
}

/// A data row as decoded text, with its 1-based line number in the source
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawRow {
    pub line: u64,
    pub fields: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct ParsedTable {
    pub delimiter: u8,
    pub headers: Vec<HeaderColumn>,
    pub rows: Vec<RawRow>,
}

/// Pick the candidate delimiter occurring most often outside quotes on the
/// first line. Falls back to `,` when none occurs.
pub fn detect_delimiter(data: &[u8]) -> u8 {
    let first_line = data.split(|b| *b == b'\n').next().unwrap_or_default();

    let mut counts = [0usize; DELIMITER_CANDIDATES.len()];
    let mut in_quotes = false;
    for &byte in first_line {
        if byte == b'"' {
            in_quotes = !in_quotes;
        } else if !in_quotes {
            if let Some(idx) = DELIMITER_CANDIDATES.iter().position(|c| *c == byte) {
                counts[idx] += 1;
            }
        }
    }

    let mut best = 0;
    for idx in 1..counts.len() {
        if counts[idx] > counts[best] {
            best = idx;
        }
    }
    DELIMITER_CANDIDATES[best]
}

/// UTF-8 when valid, otherwise Latin-1, which is what older German exports use.
pub fn decode_field(bytes: &[u8]) -> String {
    match std::str::from_utf8(bytes) {
        Ok(text) => text.to_string(),
        Err(_) => bytes.iter().map(|&b| char::from(b)).collect(),
    }
}

/// Parse a whole source into header columns and raw rows.
pub fn parse_table(data: &[u8]) -> Result<ParsedTable, ParseError> {
    let data = data.strip_prefix(UTF8_BOM).unwrap_or(data);
    if data.iter().all(u8::is_ascii_whitespace) {
        return Err(ParseError::Empty);
    }

    let delimiter = detect_delimiter(data);
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .delimiter(delimiter)
        .quote(b'"')
        .from_reader(data);

    let mut records = reader.byte_records();
    let names = records.next().ok_or(ParseError::Empty)??;
    let units = records.next().ok_or(ParseError::MissingUnitRow)??;

    let headers = names
        .iter()
        .enumerate()
        .map(|(idx, name)| {
            let unit = units.get(idx).map(decode_field).unwrap_or_default();
            HeaderColumn::new(decode_field(name), unit)
        })
        .collect();

    let mut rows = Vec::new();
    for record in records {
        let record = record?;
        let line = record.position().map(|p| p.line()).unwrap_or_default();
        rows.push(RawRow {
            line,
            fields: record.iter().map(decode_field).collect(),
        });
    }

    Ok(ParsedTable {
        delimiter,
        headers,
        rows,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_semicolon() {
        let data = b"Dat/Zeit;Wind;Leistung\n;m/s;kW\n05.03.2021, 13:40;5,3;100\n";
        assert_eq!(detect_delimiter(data), b';');
    }

    #[test]
    fn test_detect_comma_ignores_quoted_commas() {
        let data = b"\"Dat/Zeit, lokal\",Wind,Leistung\n,m/s,kW\n";
        assert_eq!(detect_delimiter(data), b',');
    }

    #[test]
    fn test_detect_defaults_to_comma() {
        assert_eq!(detect_delimiter(b"single column\n"), b',');
    }

    #[test]
    fn test_parse_semicolon_with_quotes() {
        let data = "Dat/Zeit;Wind;Leistung\n;m/s;kW\n\"05.03.2021, 13:40\";\"5,3\";\"100,0\"\n05.03.2021, 13:50;6,1;140,2\n";
        let table = parse_table(data.as_bytes()).unwrap();

        assert_eq!(table.delimiter, b';');
        assert_eq!(
            table.headers,
            vec![
                HeaderColumn::new("Dat/Zeit", ""),
                HeaderColumn::new("Wind", "m/s"),
                HeaderColumn::new("Leistung", "kW"),
            ]
        );
        assert_eq!(table.rows.len(), 2);
        assert_eq!(table.rows[0].fields, vec!["05.03.2021, 13:40", "5,3", "100,0"]);
        assert_eq!(table.rows[1].fields, vec!["05.03.2021, 13:50", "6,1", "140,2"]);
        assert_eq!(table.rows[0].line, 3);
    }

    #[test]
    fn test_parse_comma_with_quoted_timestamp() {
        let data = "Dat/Zeit,Wind,Leistung\n,m/s,kW\n\"05.03.2021, 13:40\",5.3,100\n";
        let table = parse_table(data.as_bytes()).unwrap();

        assert_eq!(table.delimiter, b',');
        assert_eq!(table.rows[0].fields, vec!["05.03.2021, 13:40", "5.3", "100"]);
    }

    #[test]
    fn test_short_unit_row_yields_blank_units() {
        let data = "Dat/Zeit;Wind;Leistung\n;m/s\n";
        let table = parse_table(data.as_bytes()).unwrap();
        assert_eq!(table.headers[2], HeaderColumn::new("Leistung", ""));
        assert!(table.rows.is_empty());
    }

    #[test]
    fn test_bom_and_latin1_are_decoded() {
        let mut data = UTF8_BOM.to_vec();
        data.extend_from_slice(b"Dat/Zeit;Temp\n;\xB0C\n");
        let table = parse_table(&data).unwrap();
        assert_eq!(table.headers[0].name, "Dat/Zeit");
        assert_eq!(table.headers[1].unit, "\u{00B0}C");
    }

    #[test]
    fn test_empty_and_header_only_sources() {
        assert!(matches!(parse_table(b""), Err(ParseError::Empty)));
        assert!(matches!(parse_table(b"  \n"), Err(ParseError::Empty)));
        assert!(matches!(
            parse_table(b"Dat/Zeit;Wind;Leistung\n"),
            Err(ParseError::MissingUnitRow)
        ));
    }
}
