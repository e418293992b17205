//! superjson envelope codec.
//!
//! A superjson document is plain JSON of the form
//! `{"json": <value>, "meta": {"values": <tree>, "referentialEqualities": <tree>}}`
//! where `meta` describes which parts of `json` must be turned back into
//! richer types (dates, sets, maps, bigints, `undefined`, ...).

mod annotations;
pub mod path;
mod value;

pub use value::{format_iso_date, parse_iso_date, StructuredValue};

use crate::Result;
use serde_json::{Map, Value};

/// Parse a superjson document.
///
/// Anything that is not an object with a `json` member decodes to
/// `Undefined`, mirroring how superjson destructures its payload.
pub fn parse(text: &str) -> Result<StructuredValue> {
    let envelope: Value = serde_json::from_str(text)?;
    from_envelope(envelope)
}

/// Decode an already parsed superjson envelope.
pub fn from_envelope(envelope: Value) -> Result<StructuredValue> {
    let Value::Object(mut envelope) = envelope else {
        return Ok(StructuredValue::Undefined);
    };
    let Some(json) = envelope.remove("json") else {
        return Ok(StructuredValue::Undefined);
    };

    let mut value = StructuredValue::from_json(json);
    if let Some(Value::Object(meta)) = envelope.get("meta") {
        if let Some(values) = meta.get("values") {
            annotations::apply_value_annotations(&mut value, values)?;
        }
        if let Some(equalities) = meta.get("referentialEqualities") {
            annotations::apply_referential_equalities(&mut value, equalities)?;
        }
    }
    Ok(value)
}

/// Encode a value as a superjson envelope.
pub fn to_envelope(value: &StructuredValue) -> Value {
    let (json, values) = annotations::walk(value);
    let mut envelope = Map::new();
    envelope.insert("json".into(), json);
    if let Some(values) = values {
        let mut meta = Map::new();
        meta.insert("values".into(), values);
        envelope.insert("meta".into(), Value::Object(meta));
    }
    Value::Object(envelope)
}

/// Encode a value as superjson text.
pub fn stringify(value: &StructuredValue) -> String {
    to_envelope(value).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn plain_payload_decodes_without_meta() {
        let value = parse(r#"{"json":{"color":"red","size":3}}"#).unwrap();
        assert_eq!(value.to_json(), json!({"color": "red", "size": 3}));
    }

    #[test]
    fn missing_json_member_is_undefined() {
        assert_eq!(parse(r#"{"meta":{}}"#).unwrap(), StructuredValue::Undefined);
        assert_eq!(parse(r#""json""#).unwrap(), StructuredValue::Undefined);
    }

    #[test]
    fn invalid_text_is_an_error() {
        assert!(parse("{json").is_err());
    }

    #[test]
    fn root_date_is_restored() {
        let value = parse(r#"{"json":"2023-10-01T12:00:00.000Z","meta":{"values":["Date"]}}"#)
            .unwrap();
        match value {
            StructuredValue::Date(date) => {
                assert_eq!(format_iso_date(date), "2023-10-01T12:00:00.000Z")
            }
            other => panic!("expected date, got {:?}", other),
        }
    }

    #[test]
    fn stringify_then_parse_keeps_rich_types() {
        let value = StructuredValue::Object(vec![
            ("n".into(), StructuredValue::Number(f64::NEG_INFINITY)),
            ("big".into(), StructuredValue::BigInt("123456789012345678901234".into())),
            (
                "tags".into(),
                StructuredValue::Set(vec![StructuredValue::String("a".into())]),
            ),
            ("dot.key".into(), StructuredValue::Undefined),
            (
                "re".into(),
                StructuredValue::RegExp {
                    source: "a/b".into(),
                    flags: "gi".into(),
                },
            ),
        ]);
        assert_eq!(parse(&stringify(&value)).unwrap(), value);
    }

    #[test]
    fn plain_values_have_no_meta() {
        let envelope = to_envelope(&StructuredValue::from_json(json!({"a": [1, "b"]})));
        assert!(envelope.get("meta").is_none());
    }
}
