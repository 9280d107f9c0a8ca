use cloud_utilities::csv::{csv_to_records, records_to_csv, DEFAULT_DELIMITER};
use cloud_utilities::{Record, Utilities, UtilitiesError};
use serde_json::{json, Value};

fn record(value: Value) -> Record {
    match value {
        Value::Object(map) => map,
        other => panic!("expected object, got {other}"),
    }
}

fn as_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[tokio::test]
async fn json_to_csv_matches_documented_example() {
    let utilities = Utilities::new();
    let items = vec![record(json!({"name": "B"})), record(json!({"name": "A"}))];
    let csv = utilities.json_to_csv(&items, "f.csv", false).await.unwrap();

    let lines: Vec<&str> = csv.split("\r\n").collect();
    assert_eq!(lines, vec!["name", "\"B\"", "\"A\""]);
}

#[tokio::test]
async fn json_to_csv_rejects_empty_input() {
    let utilities = Utilities::new();
    let err = utilities.json_to_csv(&[], "f.csv", false).await.unwrap_err();
    assert!(matches!(err, UtilitiesError::EmptyInput));
}

#[test]
fn csv_to_json_matches_documented_example() {
    let utilities = Utilities::new();
    let records = utilities.csv_to_json("a,b\n1,2\n3,4", DEFAULT_DELIMITER);
    assert_eq!(
        records,
        vec![record(json!({"a": "1", "b": "2"})), record(json!({"a": "3", "b": "4"}))]
    );
}

#[test]
fn csv_to_json_keeps_header_order() {
    let records = csv_to_records("zeta,alpha\n1,2", ",");
    let keys: Vec<&str> = records[0].keys().map(String::as_str).collect();
    assert_eq!(keys, vec!["zeta", "alpha"]);
}

#[test]
fn round_trip_preserves_values_as_text() {
    let items = vec![
        record(json!({"name": "Ada Lovelace", "born": 1815, "active": false, "score": 9.5})),
        record(json!({"name": "grace", "born": 1906, "active": true, "score": null})),
        record(json!({"name": "Linus", "born": 1969, "active": true, "score": 0})),
    ];

    let csv = records_to_csv(&items).unwrap();
    let back = csv_to_records(&csv, DEFAULT_DELIMITER);

    assert_eq!(back.len(), items.len());
    for (original, parsed) in items.iter().zip(&back) {
        assert_eq!(original.len(), parsed.len());
        for (key, value) in original {
            assert_eq!(
                parsed.get(key).map(as_text),
                Some(as_text(value)),
                "field {key} did not survive the round trip"
            );
        }
    }
}

#[test]
fn round_trip_with_semicolon_data_and_default_delimiter() {
    let items = vec![record(json!({"k": "a;b"}))];
    let csv = records_to_csv(&items).unwrap();
    assert_eq!(csv_to_records(&csv, ","), vec![record(json!({"k": "a;b"}))]);
}

#[test]
fn embedded_comma_breaks_round_trip() {
    let items = vec![record(json!({"a": "x,y", "b": "z"}))];
    let csv = records_to_csv(&items).unwrap();
    let back = csv_to_records(&csv, ",");
    assert_ne!(back[0], items[0]);
}
