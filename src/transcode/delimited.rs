use csv::{QuoteStyle, ReaderBuilder, StringRecord, Terminator, Trim, WriterBuilder};
use serde_json::Value;

use super::{strip_bom, TranscodeError};
use crate::record::{field_names, render_scalar, Batch, Record};

/// Encodes a batch as CSV.
///
/// The header row is the first record's keys; every row is rendered in that
/// column order. Cells holding a comma, double quote or line break are
/// quoted with inner quotes doubled. Rows are joined with `\n` and the text
/// has no trailing newline.
pub fn to_csv(batch: &[Record]) -> Result<String, TranscodeError> {
    let headers = field_names(batch);
    if headers.is_empty() {
        return Err(TranscodeError::NoData);
    }

    let mut writer = WriterBuilder::new()
        .terminator(Terminator::Any(b'\n'))
        .quote_style(QuoteStyle::Necessary)
        .from_writer(Vec::new());

    writer.write_record(&headers)?;
    for record in batch {
        writer.write_record(headers.iter().map(|header| {
            record
                .get(*header)
                .map(render_scalar)
                .unwrap_or_default()
        }))?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|err| TranscodeError::Csv(err.into_error().into()))?;
    let mut text = String::from_utf8(bytes).map_err(|err| {
        TranscodeError::Csv(std::io::Error::new(std::io::ErrorKind::InvalidData, err).into())
    })?;
    if text.ends_with('\n') {
        text.pop();
    }
    Ok(text)
}

/// Decodes CSV text into a batch of string-valued records.
///
/// The first non-blank row names the fields. Later rows map onto those names
/// by position; short rows leave their trailing fields out and surplus cells
/// are dropped. Cells and names are trimmed. Whitespace-only lines are
/// skipped, while a row of empty cells (`,` or a quoted `""`) is a record.
pub fn parse_csv(text: &str) -> Result<Batch, TranscodeError> {
    let body = strip_bom(text);
    let mut reader = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(Trim::All)
        .from_reader(body.as_bytes());

    let mut rows = reader
        .records()
        .filter(|row| !matches!(row, Ok(record) if is_blank_line(record, body)));

    let headers: Vec<String> = match rows.next() {
        Some(row) => row?.iter().map(|name| name.replace('"', "")).collect(),
        None => return Err(TranscodeError::Empty),
    };

    let mut batch = Vec::new();
    for row in rows {
        let row = row?;
        let mut record = Record::new();
        for (header, cell) in headers.iter().zip(row.iter()) {
            if header.is_empty() {
                continue;
            }
            record.insert(header.clone(), Value::String(cell.to_string()));
        }
        batch.push(record);
    }
    Ok(batch)
}

/// A lone empty cell that was not written as `""` in the source text.
fn is_blank_line(record: &StringRecord, body: &str) -> bool {
    if record.len() != 1 || !record[0].is_empty() {
        return false;
    }
    let start = record.position().map_or(0, |pos| pos.byte() as usize);
    !body
        .get(start..)
        .unwrap_or_default()
        .trim_start_matches(['\r', '\n'])
        .trim_start_matches([' ', '\t'])
        .starts_with('"')
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn batch(value: Value) -> Batch {
        value
            .as_array()
            .expect("array literal")
            .iter()
            .map(|row| row.as_object().cloned().expect("object literal"))
            .collect()
    }

    #[test]
    fn empty_batch_is_no_data() {
        assert!(matches!(to_csv(&[]), Err(TranscodeError::NoData)));
    }

    #[test]
    fn exports_every_stored_field() {
        let rows = batch(json!([
            {"id": 1, "created_at": "t", "revenue": 100, "orders": 5}
        ]));
        assert_eq!(
            to_csv(&rows).unwrap(),
            "id,created_at,revenue,orders\n1,t,100,5"
        );
    }

    #[test]
    fn quotes_commas_and_quotes() {
        let rows = batch(json!([
            {"metric_name": "Response Time, p95", "note": "say \"hi\"", "plain": "x"}
        ]));
        assert_eq!(
            to_csv(&rows).unwrap(),
            "metric_name,note,plain\n\"Response Time, p95\",\"say \"\"hi\"\"\",x"
        );
    }

    #[test]
    fn column_order_comes_from_first_record() {
        let rows = batch(json!([
            {"date": "2024-01-01", "revenue": 10},
            {"revenue": 20, "date": "2024-01-02", "extra": "dropped"},
            {"date": "2024-01-03"}
        ]));
        assert_eq!(
            to_csv(&rows).unwrap(),
            "date,revenue\n2024-01-01,10\n2024-01-02,20\n2024-01-03,"
        );
    }

    #[test]
    fn null_renders_empty_cell() {
        let rows = batch(json!([{"a": null, "b": 1.5, "c": true}]));
        assert_eq!(to_csv(&rows).unwrap(), "a,b,c\n,1.5,true");
    }

    #[test]
    fn parses_headers_and_rows() {
        let parsed = parse_csv("date, revenue ,orders\n2024-01-01,100,5\n2024-01-02,200,7\n")
            .unwrap();
        assert_eq!(
            parsed,
            batch(json!([
                {"date": "2024-01-01", "revenue": "100", "orders": "5"},
                {"date": "2024-01-02", "revenue": "200", "orders": "7"}
            ]))
        );
    }

    #[test]
    fn skips_blank_lines_and_handles_crlf() {
        let parsed = parse_csv("\r\n\"date\",\"visitors\"\r\n\r\n2024-01-01,1200\r\n   \r\n").unwrap();
        assert_eq!(
            parsed,
            batch(json!([{"date": "2024-01-01", "visitors": "1200"}]))
        );
    }

    #[test]
    fn short_rows_omit_trailing_fields_and_long_rows_are_truncated() {
        let parsed = parse_csv("a,b,c\n1,2\n1,2,3,4").unwrap();
        assert_eq!(
            parsed,
            batch(json!([
                {"a": "1", "b": "2"},
                {"a": "1", "b": "2", "c": "3"}
            ]))
        );
    }

    #[test]
    fn quoted_cells_keep_commas_and_quotes() {
        let parsed = parse_csv("name,note\n\"Response Time, p95\",\"say \"\"hi\"\"\"").unwrap();
        assert_eq!(
            parsed,
            batch(json!([{"name": "Response Time, p95", "note": "say \"hi\""}]))
        );
    }

    #[test]
    fn header_only_input_is_an_empty_batch() {
        assert!(parse_csv("date,revenue\n").unwrap().is_empty());
    }

    #[test]
    fn blank_input_has_no_header() {
        assert!(matches!(parse_csv(""), Err(TranscodeError::Empty)));
        assert!(matches!(parse_csv("\n  \n"), Err(TranscodeError::Empty)));
    }

    #[test]
    fn leading_bom_is_ignored() {
        let parsed = parse_csv("\u{feff}date,orders\n2024-01-01,3").unwrap();
        assert_eq!(parsed[0].get("date"), Some(&json!("2024-01-01")));
    }

    #[test]
    fn rows_of_empty_cells_are_kept() {
        let parsed = parse_csv("a,b\n,\n1,2").unwrap();
        assert_eq!(
            parsed,
            batch(json!([
                {"a": "", "b": ""},
                {"a": "1", "b": "2"}
            ]))
        );
    }

    #[test]
    fn quoted_empty_cell_after_blank_lines_is_kept() {
        let parsed = parse_csv("note\r\n\r\n  \r\n\"\"\r\n").unwrap();
        assert_eq!(parsed, batch(json!([{"note": ""}])));
    }

    #[test]
    fn single_empty_column_round_trips() {
        let rows = batch(json!([{"note": ""}, {"note": "x"}]));
        let text = to_csv(&rows).unwrap();
        assert_eq!(text, "note\n\"\"\nx");
        assert_eq!(parse_csv(&text).unwrap(), rows);
    }

    #[test]
    fn round_trips_quoted_line_breaks() {
        let rows = batch(json!([{"note": "line one\nline two", "n": "1"}]));
        let text = to_csv(&rows).unwrap();
        assert_eq!(parse_csv(&text).unwrap(), rows);
    }
}
