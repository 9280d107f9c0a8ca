//! CSV text <-> record conversion.
//!
//! Deliberately naive: no quoting rules, no escaping beyond what JSON encoding
//! of each cell provides, no streaming. Values containing the delimiter, a
//! double quote or a line break do not survive a round trip.
//!
//! Encoding rules for [`records_to_csv`]:
//! - the header is the key set of the first record, ordered by UTF-16 code
//!   units;
//! - a text cell is JSON-encoded (`B` becomes `"B"`);
//! - any other value is JSON-encoded and the result is JSON-encoded again as
//!   text (`5` becomes `"5"`, `{"a":1}` becomes `"{\"a\":1}"`);
//! - numbers render the way JavaScript prints them, so `1.0` is `1` and
//!   `1e21` is `1e+21`;
//! - a field absent from a record gives an empty cell;
//! - cells are joined by `,`, rows by CRLF.

use serde_json::Value;
use tracing::{debug, error};

use crate::error::UtilitiesError;
use crate::record::Record;

pub const DEFAULT_DELIMITER: &str = ",";
pub const ROW_SEPARATOR: &str = "\r\n";
pub const CSV_CONTENT_TYPE: &str = "text/csv";

/// UTF-8 byte-order mark read back as Latin-1.
const MISDECODED_BOM: &str = "\u{00ef}\u{00bb}\u{00bf}";

/// Render `items` as CSV text.
pub fn records_to_csv(items: &[Record]) -> Result<String, UtilitiesError> {
    let first = items.first().ok_or_else(|| {
        error!("No records given, cannot derive CSV header");
        UtilitiesError::EmptyInput
    })?;

    let mut header: Vec<&str> = first.keys().map(String::as_str).collect();
    header.sort_unstable_by(|a, b| a.encode_utf16().cmp(b.encode_utf16()));

    let mut lines = Vec::with_capacity(items.len() + 1);
    lines.push(header.join(","));
    for row in items {
        let cells = header
            .iter()
            .map(|field| encode_cell(row.get(*field)))
            .collect::<Result<Vec<_>, _>>()?;
        lines.push(cells.join(","));
    }

    debug!(columns = header.len(), rows = items.len(), "Encoded records as CSV");
    Ok(lines.join(ROW_SEPARATOR))
}

fn encode_cell(value: Option<&Value>) -> Result<String, serde_json::Error> {
    match value {
        None => Ok(String::new()),
        Some(Value::String(text)) => serde_json::to_string(text),
        Some(other) => serde_json::to_string(&js_json(other)?),
    }
}

/// Compact JSON text with numbers in JavaScript's `Number#toString` form.
fn js_json(value: &Value) -> Result<String, serde_json::Error> {
    Ok(match value {
        Value::Number(n) => match n.as_f64() {
            Some(f) if n.is_f64() => js_number(f),
            _ => n.to_string(),
        },
        Value::Array(items) => {
            let items = items.iter().map(js_json).collect::<Result<Vec<_>, _>>()?;
            format!("[{}]", items.join(","))
        }
        Value::Object(map) => {
            let fields = map
                .iter()
                .map(|(key, value)| -> Result<String, serde_json::Error> {
                    Ok(format!("{}:{}", serde_json::to_string(key)?, js_json(value)?))
                })
                .collect::<Result<Vec<_>, _>>()?;
            format!("{{{}}}", fields.join(","))
        }
        other => serde_json::to_string(other)?,
    })
}

fn js_number(f: f64) -> String {
    if f == 0.0 {
        return "0".to_string();
    }
    if f.fract() == 0.0 && f.abs() < 1e21 {
        // f64 Display is shortest round-trip and never uses an exponent.
        return format!("{f}");
    }
    let rendered = Value::from(f).to_string();
    match rendered.split_once('e') {
        Some((mantissa, exponent)) if !exponent.starts_with('-') => {
            format!("{mantissa}e+{exponent}")
        }
        _ => rendered,
    }
}

/// Parse CSV text into records of text values.
///
/// The header is everything before the first `\n`. Input without a line
/// break is a header only and yields no records. Rows are not guarded: a
/// trailing blank line comes back as a record holding one empty value.
pub fn csv_to_records(data: &str, delimiter: &str) -> Vec<Record> {
    let Some((header_line, body)) = data.split_once('\n') else {
        debug!("CSV input has a header only");
        return Vec::new();
    };

    let titles: Vec<String> = split_fields(header_line, delimiter)
        .into_iter()
        .map(clean_title)
        .collect();

    let records: Vec<Record> = body
        .split('\n')
        .map(|line| {
            let line = line.strip_suffix('\r').unwrap_or(line);
            let values = split_fields(line, delimiter);
            let mut record = Record::new();
            for (title, value) in titles.iter().zip(values) {
                record.insert(title.clone(), Value::String(value.replace('"', "")));
            }
            record
        })
        .collect();

    debug!(columns = titles.len(), rows = records.len(), "Decoded CSV into records");
    records
}

fn clean_title(title: &str) -> String {
    title
        .trim_matches(|c: char| c.is_whitespace() || c == '\u{feff}')
        .replacen(MISDECODED_BOM, "", 1)
}

/// Split on `delimiter`; an empty delimiter splits into single characters.
fn split_fields<'a>(line: &'a str, delimiter: &str) -> Vec<&'a str> {
    if delimiter.is_empty() {
        return line
            .char_indices()
            .map(|(i, c)| &line[i..i + c.len_utf8()])
            .collect();
    }
    line.split(delimiter).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(value: Value) -> Record {
        match value {
            Value::Object(map) => map,
            other => panic!("expected object, got {other}"),
        }
    }

    #[test]
    fn text_cells_are_json_quoted() {
        let items = vec![record(json!({"name": "B"})), record(json!({"name": "A"}))];
        assert_eq!(records_to_csv(&items).unwrap(), "name\r\n\"B\"\r\n\"A\"");
    }

    #[test]
    fn header_is_sorted_keys_of_first_record_only() {
        let items = vec![
            record(json!({"zeta": "z", "alpha": "a"})),
            record(json!({"alpha": "b", "extra": "dropped", "zeta": "y"})),
        ];
        assert_eq!(
            records_to_csv(&items).unwrap(),
            "alpha,zeta\r\n\"a\",\"z\"\r\n\"b\",\"y\""
        );
    }

    #[test]
    fn non_text_values_are_encoded_twice() {
        let items = vec![record(json!({
            "a": 5,
            "b": null,
            "c": true,
            "d": {"k": 1},
            "e": [1, "x"]
        }))];
        assert_eq!(
            records_to_csv(&items).unwrap(),
            "a,b,c,d,e\r\n\"5\",\"null\",\"true\",\"{\\\"k\\\":1}\",\"[1,\\\"x\\\"]\""
        );
    }

    #[test]
    fn integral_floats_render_like_javascript() {
        let items = vec![record(json!({
            "a": 1.0,
            "b": 1e3,
            "c": -0.0,
            "d": [2.0, 2.5],
            "e": {"k": 1e21}
        }))];
        assert_eq!(
            records_to_csv(&items).unwrap(),
            "a,b,c,d,e\r\n\"1\",\"1000\",\"0\",\"[2,2.5]\",\"{\\\"k\\\":1e+21}\""
        );
    }

    #[test]
    fn header_orders_by_utf16_code_units() {
        // U+1F600 is a surrogate pair (0xD83D..), below U+FF21 in UTF-16 but above it in UTF-8.
        let items = vec![record(json!({"\u{ff21}": "x", "\u{1f600}": "y", "b": "z"}))];
        let csv = records_to_csv(&items).unwrap();
        let header = csv.split(ROW_SEPARATOR).next().unwrap();
        assert_eq!(header, "b,\u{1f600},\u{ff21}");
    }

    #[test]
    fn missing_field_gives_empty_cell() {
        let items = vec![record(json!({"a": "1", "b": "2"})), record(json!({"b": "3"}))];
        assert_eq!(
            records_to_csv(&items).unwrap(),
            "a,b\r\n\"1\",\"2\"\r\n,\"3\""
        );
    }

    #[test]
    fn empty_input_is_an_error() {
        assert!(matches!(records_to_csv(&[]), Err(UtilitiesError::EmptyInput)));
    }

    #[test]
    fn parses_rows_positionally() {
        let records = csv_to_records("a,b\n1,2\n3,4", ",");
        assert_eq!(
            records,
            vec![record(json!({"a": "1", "b": "2"})), record(json!({"a": "3", "b": "4"}))]
        );
    }

    #[test]
    fn strips_bom_artifacts_and_whitespace_from_titles() {
        let records = csv_to_records("\u{00ef}\u{00bb}\u{00bf}id , name\n1,x", ",");
        assert_eq!(records, vec![record(json!({"id": "1", "name": "x"}))]);

        let records = csv_to_records("\u{feff}id,name\n2,y", ",");
        assert_eq!(records, vec![record(json!({"id": "2", "name": "y"}))]);
    }

    #[test]
    fn removes_every_double_quote_from_values() {
        let records = csv_to_records("q\n\"he said \"\"hi\"\"\"", ",");
        assert_eq!(records, vec![record(json!({"q": "he said hi"}))]);
    }

    #[test]
    fn quoted_delimiter_is_split_anyway() {
        let records = csv_to_records("a,b\n\"x,y\",z", ",");
        assert_eq!(records, vec![record(json!({"a": "x", "b": "y"}))]);
    }

    #[test]
    fn trailing_blank_line_yields_malformed_record() {
        let records = csv_to_records("a,b\n1,2\n", ",");
        assert_eq!(records.len(), 2);
        assert_eq!(records[1], record(json!({"a": ""})));
    }

    #[test]
    fn header_only_input_has_no_records() {
        assert!(csv_to_records("a,b", ",").is_empty());
    }

    #[test]
    fn custom_delimiter() {
        let records = csv_to_records("a;b\n1;2", ";");
        assert_eq!(records, vec![record(json!({"a": "1", "b": "2"}))]);
    }

    #[test]
    fn crlf_rows_round_trip() {
        let items = vec![
            record(json!({"name": "Zed", "age": 41, "admin": false})),
            record(json!({"name": "amy", "age": 7.5, "admin": true})),
        ];
        let csv = records_to_csv(&items).unwrap();
        let back = csv_to_records(&csv, DEFAULT_DELIMITER);
        assert_eq!(
            back,
            vec![
                record(json!({"admin": "false", "age": "41", "name": "Zed"})),
                record(json!({"admin": "true", "age": "7.5", "name": "amy"})),
            ]
        );
    }
}
