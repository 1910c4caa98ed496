use serde_json::Value;

use super::{strip_bom, TranscodeError};
use crate::record::{Batch, Record};

/// Pretty-prints a batch as a JSON array with two-space indentation.
pub fn to_json(batch: &[Record]) -> Result<String, TranscodeError> {
    Ok(serde_json::to_string_pretty(batch)?)
}

/// Parses a JSON array of objects. A lone top-level object is accepted as a
/// single-record batch.
pub fn parse_json(text: &str) -> Result<Batch, TranscodeError> {
    let value: Value = serde_json::from_str(strip_bom(text))?;
    match value {
        Value::Object(record) => Ok(vec![record]),
        Value::Array(items) => items
            .into_iter()
            .enumerate()
            .map(|(index, item)| match item {
                Value::Object(record) => Ok(record),
                other => Err(TranscodeError::NotRecords(format!(
                    "{} at index {index}",
                    describe(&other)
                ))),
            })
            .collect(),
        other => Err(TranscodeError::NotRecords(describe(&other).to_string())),
    }
}

fn describe(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn pretty_prints_with_two_space_indent() {
        let rows = vec![json!({"date": "2024-01-01", "revenue": 100})
            .as_object()
            .cloned()
            .unwrap()];
        assert_eq!(
            to_json(&rows).unwrap(),
            "[\n  {\n    \"date\": \"2024-01-01\",\n    \"revenue\": 100\n  }\n]"
        );
    }

    #[test]
    fn empty_batch_is_empty_array() {
        assert_eq!(to_json(&[]).unwrap(), "[]");
    }

    #[test]
    fn keeps_key_order_and_types() {
        let text = r#"[{"z": 1, "a": null, "m": "x", "b": 2.5, "t": false}]"#;
        let parsed = parse_json(text).unwrap();
        let keys: Vec<_> = parsed[0].keys().cloned().collect();
        assert_eq!(keys, vec!["z", "a", "m", "b", "t"]);
        assert_eq!(parsed[0].get("b"), Some(&json!(2.5)));
        assert_eq!(parsed[0].get("a"), Some(&Value::Null));
    }

    #[test]
    fn single_object_is_one_record() {
        let parsed = parse_json(r#"{"date": "2024-01-01"}"#).unwrap();
        assert_eq!(parsed.len(), 1);
    }

    #[test]
    fn malformed_json_is_a_json_error() {
        assert!(matches!(
            parse_json("[{\"a\": }]"),
            Err(TranscodeError::Json(_))
        ));
    }

    #[test]
    fn non_record_values_are_rejected() {
        assert!(matches!(
            parse_json("42"),
            Err(TranscodeError::NotRecords(found)) if found == "number"
        ));
        assert!(matches!(
            parse_json(r#"[{"a": 1}, "b"]"#),
            Err(TranscodeError::NotRecords(found)) if found == "string at index 1"
        ));
    }
}
