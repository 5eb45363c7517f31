//! Extraction of the seven-field protocol record from formalize output.

use serde_json::{Map, Value};

use crate::util::braced_span;

/// Fields the formalize phase is asked to emit, in prompt order.
pub const RECORD_FIELDS: [&str; 7] = [
    "Purpose",
    "Methodology",
    "Objectives",
    "Monitoring",
    "FailureModes",
    "Recovery",
    "Ethics",
];

/// Value every field takes in the placeholder record.
pub const PLACEHOLDER_VALUE: &str = "(mock)";

/// Structured record decoded from the model. Keys are whatever the model
/// emitted; nothing enforces the seven fields.
pub type ProtocolRecord = Map<String, Value>;

/// Result of parsing formalize output.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedRecord {
    pub record: ProtocolRecord,
    /// True when decoding failed and the placeholder was substituted.
    pub placeholder: bool,
}

/// Record with all seven fields set to `(mock)`.
pub fn placeholder_record() -> ProtocolRecord {
    RECORD_FIELDS
        .iter()
        .map(|field| (field.to_string(), Value::from(PLACEHOLDER_VALUE)))
        .collect()
}

/// Decode the span from the first `{` to the last `}` of `output`,
/// substituting [`placeholder_record`] when that fails.
pub fn parse_protocol_record(output: &str) -> ParsedRecord {
    let decoded = braced_span(output).and_then(|span| serde_json::from_str::<ProtocolRecord>(span).ok());
    match decoded {
        Some(record) => ParsedRecord {
            record,
            placeholder: false,
        },
        None => {
            tracing::debug!(
                output_chars = output.len(),
                "Formalize output did not decode, substituting placeholder record"
            );
            ParsedRecord {
                record: placeholder_record(),
                placeholder: true,
            }
        }
    }
}

/// Fields from [`RECORD_FIELDS`] absent from `record`.
pub fn missing_fields(record: &ProtocolRecord) -> Vec<&'static str> {
    RECORD_FIELDS
        .iter()
        .copied()
        .filter(|field| !record.contains_key(*field))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_embedded_json() {
        let output = r#"Sure! Here you go:
{"Purpose": "test the burn", "Ethics": "do no harm"}
Let me know if you need more."#;
        let parsed = parse_protocol_record(output);
        assert!(!parsed.placeholder);
        assert_eq!(parsed.record["Purpose"], "test the burn");
        assert_eq!(parsed.record.len(), 2);
    }

    #[test]
    fn test_parse_keeps_nested_values() {
        let parsed = parse_protocol_record(r#"{"Monitoring": {"hooks": ["a", "b"]}}"#);
        assert!(!parsed.placeholder);
        assert_eq!(parsed.record["Monitoring"]["hooks"][1], "b");
    }

    #[test]
    fn test_plain_text_gets_placeholder() {
        let parsed = parse_protocol_record("[MOCK RESPONSE] FORMALIZE: no json here");
        assert!(parsed.placeholder);
        assert_eq!(parsed.record, placeholder_record());
    }

    #[test]
    fn test_two_objects_span_is_invalid_and_gets_placeholder() {
        let parsed = parse_protocol_record(r#"{"a": 1} then {"b": 2}"#);
        assert!(parsed.placeholder);
    }

    #[test]
    fn test_placeholder_is_idempotent() {
        let malformed = "{ not json at all }";
        let first = parse_protocol_record(malformed);
        let second = parse_protocol_record(malformed);
        assert!(first.placeholder && second.placeholder);
        assert_eq!(first.record, second.record);
        assert_eq!(
            serde_json::to_string(&first.record).unwrap(),
            serde_json::to_string(&second.record).unwrap()
        );
    }

    #[test]
    fn test_placeholder_has_all_fields_as_sentinel() {
        let record = placeholder_record();
        assert_eq!(record.len(), 7);
        for field in RECORD_FIELDS {
            assert_eq!(record[field], PLACEHOLDER_VALUE);
        }
        assert!(missing_fields(&record).is_empty());
    }

    #[test]
    fn test_missing_fields_lists_absent_keys() {
        let parsed = parse_protocol_record(r#"{"Purpose": "x", "Ethics": "y"}"#);
        let missing = missing_fields(&parsed.record);
        assert_eq!(
            missing,
            vec!["Methodology", "Objectives", "Monitoring", "FailureModes", "Recovery"]
        );
    }
}
