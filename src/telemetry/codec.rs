//! Strict JSON decoding of telemetry payloads.
//!
//! The payload is parsed with `serde_json`, never evaluated or interpreted in
//! any other way. A field that is absent falls back to 0; a field that is
//! present but not a number is a hard error naming the field, so a publisher
//! bug shows up in the logs instead of silently zeroing a sensor.

use serde_json::Value;

use super::reading::Reading;

/// Errors produced while decoding a single payload.
///
/// All variants are recovered locally: the message is dropped and the
/// subscription stays up.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DecodeError {
    /// The payload is not a valid JSON object
    #[error("malformed payload: {0}")]
    Malformed(String),

    /// A known field is present but not a number
    #[error("field `{field}` has wrong type: expected number, found {found}")]
    TypeMismatch {
        field: &'static str,
        found: &'static str,
    },
}

/// Decodes a raw payload into a [`Reading`].
///
/// Missing fields default to 0. Pure function, no side effects.
pub fn decode(payload: &[u8]) -> Result<Reading, DecodeError> {
    let value: Value =
        serde_json::from_slice(payload).map_err(|e| DecodeError::Malformed(e.to_string()))?;

    let object = value
        .as_object()
        .ok_or_else(|| DecodeError::Malformed(format!("expected object, got {}", kind(&value))))?;

    Ok(Reading {
        soil: numeric_field(object, "soil")?,
        temperature: numeric_field(object, "temperature")?,
        humidity: numeric_field(object, "humidity")?,
    })
}

// Extract an optional numeric field, defaulting to 0 when absent.
fn numeric_field(
    object: &serde_json::Map<String, Value>,
    field: &'static str,
) -> Result<f64, DecodeError> {
    match object.get(field) {
        None => Ok(0.0),
        Some(Value::Number(n)) => exact_f64(n).ok_or(DecodeError::TypeMismatch {
            field,
            found: "number out of range",
        }),
        Some(other) => Err(DecodeError::TypeMismatch {
            field,
            found: kind(other),
        }),
    }
}

// Integers whose value changes when converted to f64 are rejected rather than
// stored with silently rounded values.
fn exact_f64(n: &serde_json::Number) -> Option<f64> {
    if let Some(u) = n.as_u64() {
        let f = u as f64;
        return (f as i128 == i128::from(u)).then_some(f);
    }
    if let Some(i) = n.as_i64() {
        let f = i as f64;
        return (f as i128 == i128::from(i)).then_some(f);
    }
    n.as_f64()
}

fn kind(value: &Value) -> &'static str {
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

    #[test]
    fn full_payload_decodes_to_given_values() {
        let reading = decode(br#"{"soil": 42, "temperature": 21.5, "humidity": 60}"#).unwrap();
        assert_eq!(reading, Reading::new(42.0, 21.5, 60.0));
    }

    #[test]
    fn missing_fields_default_to_zero() {
        let reading = decode(br#"{"soil": 10}"#).unwrap();
        assert_eq!(reading, Reading::new(10.0, 0.0, 0.0));

        let reading = decode(b"{}").unwrap();
        assert_eq!(reading, Reading::default());
    }

    #[test]
    fn unknown_fields_are_ignored() {
        let reading = decode(br#"{"soil": 1, "battery": 88}"#).unwrap();
        assert_eq!(reading, Reading::new(1.0, 0.0, 0.0));
    }

    #[test]
    fn invalid_json_is_malformed() {
        assert!(matches!(
            decode(b"not json at all"),
            Err(DecodeError::Malformed(_))
        ));
        assert!(matches!(decode(b""), Err(DecodeError::Malformed(_))));
        assert!(matches!(
            decode(br#"{"soil": 1"#),
            Err(DecodeError::Malformed(_))
        ));
    }

    #[test]
    fn non_object_json_is_malformed() {
        assert!(matches!(decode(b"[1, 2, 3]"), Err(DecodeError::Malformed(_))));
        assert!(matches!(decode(b"42"), Err(DecodeError::Malformed(_))));
    }

    #[test]
    fn wrong_type_names_the_field() {
        let err = decode(br#"{"temperature": "warm"}"#).unwrap_err();
        assert_eq!(
            err,
            DecodeError::TypeMismatch {
                field: "temperature",
                found: "string"
            }
        );

        let err = decode(br#"{"humidity": null}"#).unwrap_err();
        assert_eq!(
            err,
            DecodeError::TypeMismatch {
                field: "humidity",
                found: "null"
            }
        );
    }

    #[test]
    fn oversized_integers_are_rejected_not_rounded() {
        // 2^53 + 1 has no exact f64 representation
        let err = decode(br#"{"soil": 9007199254740993}"#).unwrap_err();
        assert_eq!(
            err,
            DecodeError::TypeMismatch {
                field: "soil",
                found: "number out of range"
            }
        );

        let err = decode(br#"{"temperature": -9007199254740993}"#).unwrap_err();
        assert_eq!(
            err,
            DecodeError::TypeMismatch {
                field: "temperature",
                found: "number out of range"
            }
        );

        // u64::MAX rounds up to 2^64 as f64
        let err = decode(br#"{"humidity": 18446744073709551615}"#).unwrap_err();
        assert_eq!(
            err,
            DecodeError::TypeMismatch {
                field: "humidity",
                found: "number out of range"
            }
        );
    }

    #[test]
    fn exactly_representable_large_integers_decode() {
        // 2^53 itself is exact
        let reading = decode(br#"{"soil": 9007199254740992}"#).unwrap();
        assert_eq!(reading.soil, 9007199254740992.0);

        let reading = decode(br#"{"soil": -9007199254740992}"#).unwrap();
        assert_eq!(reading.soil, -9007199254740992.0);
    }

    #[test]
    fn invalid_utf8_is_malformed() {
        assert!(matches!(
            decode(&[0xff, 0xfe, 0x7b]),
            Err(DecodeError::Malformed(_))
        ));
    }
}
