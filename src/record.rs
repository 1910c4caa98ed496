use serde_json::{Map, Value};

/// One flat row: field name to scalar value, in insertion order.
pub type Record = Map<String, Value>;

/// An ordered list of records taken from (or headed to) one table.
pub type Batch = Vec<Record>;

/// Columns assigned by the row store. Import strips them so the store can
/// regenerate them.
pub const BACKEND_OWNED_FIELDS: [&str; 3] = ["id", "created_at", "updated_at"];

/// Field names of a batch, in the first record's key order.
pub fn field_names(batch: &[Record]) -> Vec<&str> {
    batch
        .first()
        .map(|record| record.keys().map(String::as_str).collect())
        .unwrap_or_default()
}

/// Text form of a value as it appears in a CSV cell.
pub fn render_scalar(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        nested @ (Value::Array(_) | Value::Object(_)) => nested.to_string(),
    }
}

/// Reads a numeric field, accepting numbers and numeric strings.
pub fn number_field(record: &Record, field: &str) -> Option<f64> {
    match record.get(field)? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
}

/// Removes backend-owned fields from a single record.
pub fn strip_backend_owned(mut record: Record) -> Record {
    for field in BACKEND_OWNED_FIELDS {
        // `shift_remove` keeps the remaining keys in their original order.
        record.shift_remove(field);
    }
    record
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(value: Value) -> Record {
        value.as_object().cloned().expect("object literal")
    }

    #[test]
    fn field_names_follow_first_record() {
        let batch = vec![
            record(json!({"date": "2024-01-01", "revenue": 10})),
            record(json!({"revenue": 11, "date": "2024-01-02", "orders": 3})),
        ];
        assert_eq!(field_names(&batch), vec!["date", "revenue"]);
        assert!(field_names(&[]).is_empty());
    }

    #[test]
    fn renders_scalars() {
        assert_eq!(render_scalar(&Value::Null), "");
        assert_eq!(render_scalar(&json!("a b")), "a b");
        assert_eq!(render_scalar(&json!(100)), "100");
        assert_eq!(render_scalar(&json!(2.5)), "2.5");
        assert_eq!(render_scalar(&json!(true)), "true");
        assert_eq!(render_scalar(&json!([1, 2])), "[1,2]");
    }

    #[test]
    fn number_field_accepts_numeric_strings() {
        let row = record(json!({"revenue": "1200.5", "orders": 4, "note": "n/a"}));
        assert_eq!(number_field(&row, "revenue"), Some(1200.5));
        assert_eq!(number_field(&row, "orders"), Some(4.0));
        assert_eq!(number_field(&row, "note"), None);
        assert_eq!(number_field(&row, "missing"), None);
    }

    #[test]
    fn strip_keeps_remaining_order() {
        let row = record(json!({
            "id": "r1",
            "date": "2024-01-01",
            "created_at": 1,
            "revenue": 5,
            "updated_at": 2
        }));
        let stripped = strip_backend_owned(row);
        let keys: Vec<_> = stripped.keys().cloned().collect();
        assert_eq!(keys, vec!["date", "revenue"]);
    }
}
