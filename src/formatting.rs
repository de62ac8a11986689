//! Rendering of GCN circulars into Slack message text.

use serde_json::Value;
use thiserror::Error;

use crate::core::Circular;

/// Errors raised while formatting a record as a circular.
#[derive(Debug, Error)]
pub enum FormatError {
    /// A required header field is absent or not a scalar.
    #[error("circular header is missing required field `{0}`")]
    MissingField(&'static str),

    /// The record could not be read as a circular at all.
    #[error("record is not a GCN circular: {0}")]
    InvalidRecord(#[from] serde_json::Error),
}

/// Deserializes a raw stream record and formats it as a circular.
pub fn format_record(record: &Value) -> Result<String, FormatError> {
    let circular: Circular = serde_json::from_value(record.clone())?;
    format_circular(&circular)
}

/// Formats a circular into the fixed multi-line Slack text block.
///
/// The output layout is an external contract and is reproduced
/// byte-for-byte, including the `*Date*:` punctuation of the original
/// deployment. Exactly one blank line separates the header lines from the
/// body, and no trailing newline is added beyond what the body carries.
pub fn format_circular(circular: &Circular) -> Result<String, FormatError> {
    Ok(format!(
        "*Title:* {title}\n\
         *Number:* {number}\n\
         *Subject:* {subject}\n\
         *Date*: {date}\n\
         *From:* {from}\n\n\
         {body}",
        title = header_field(circular, "title")?,
        number = header_field(circular, "number")?,
        subject = header_field(circular, "subject")?,
        date = header_field(circular, "date")?,
        from = header_field(circular, "from")?,
        body = circular.body,
    ))
}

fn header_field(circular: &Circular, name: &'static str) -> Result<String, FormatError> {
    circular
        .header
        .get(name)
        .and_then(scalar_text)
        .ok_or(FormatError::MissingField(name))
}

/// Natural textual representation of a scalar header value: strings are
/// taken verbatim, numbers and booleans use their plain rendering.
fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn circular(header: Value, body: &str) -> Circular {
        let Value::Object(header) = header else {
            panic!("test header must be an object");
        };
        Circular {
            header,
            body: body.to_string(),
        }
    }

    #[test]
    fn formats_byte_exact_output() {
        let circular = circular(
            json!({
                "title": "T",
                "number": 26936,
                "subject": "S",
                "date": "2020-01-01",
                "from": "F",
            }),
            "B",
        );
        let text = format_circular(&circular).unwrap();
        assert_eq!(
            text,
            "*Title:* T\n*Number:* 26936\n*Subject:* S\n*Date*: 2020-01-01\n*From:* F\n\nB"
        );
    }

    #[test]
    fn formatting_is_deterministic() {
        let circular = circular(
            json!({
                "title": "GCN/LVC NOTICE",
                "number": 27000,
                "subject": "S200224ca update",
                "date": "20/02/24 05:04:05 GMT",
                "from": "someone@example.org",
            }),
            "Multi\nline\nbody\n",
        );
        let first = format_circular(&circular).unwrap();
        let second = format_circular(&circular).unwrap();
        assert_eq!(first, second);
        // The body keeps its own trailing newline; nothing more is appended.
        assert!(first.ends_with("Multi\nline\nbody\n"));
    }

    #[test]
    fn missing_header_field_is_an_error() {
        let circular = circular(
            json!({
                "title": "T",
                "subject": "S",
                "date": "D",
                "from": "F",
            }),
            "B",
        );
        let err = format_circular(&circular).unwrap_err();
        assert!(matches!(err, FormatError::MissingField("number")), "{err:?}");
    }

    #[test]
    fn non_scalar_header_field_is_an_error() {
        let circular = circular(
            json!({
                "title": ["not", "scalar"],
                "number": 1,
                "subject": "S",
                "date": "D",
                "from": "F",
            }),
            "B",
        );
        let err = format_circular(&circular).unwrap_err();
        assert!(matches!(err, FormatError::MissingField("title")), "{err:?}");
    }

    #[test]
    fn format_record_rejects_non_circulars() {
        let err = format_record(&json!("just a string")).unwrap_err();
        assert!(matches!(err, FormatError::InvalidRecord(_)), "{err:?}");
    }

    #[test]
    fn format_record_accepts_raw_mappings() {
        let record = json!({
            "header": {
                "title": "T",
                "number": "26936",
                "subject": "S",
                "date": "2020-01-01",
                "from": "F",
            },
            "body": "B",
        });
        let text = format_record(&record).unwrap();
        assert_eq!(
            text,
            "*Title:* T\n*Number:* 26936\n*Subject:* S\n*Date*: 2020-01-01\n*From:* F\n\nB"
        );
    }
}
