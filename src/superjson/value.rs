//! In-memory representation of superjson values.

use serde::{Serialize, Serializer};
use serde_json::{Map, Number, Value};
use time::format_description::well_known::{Iso8601, Rfc3339};
use time::{OffsetDateTime, UtcOffset};

/// A value decoded from superjson.
///
/// Objects keep the order their keys appeared in. Types that plain JSON
/// cannot carry (dates, sets, bigints, `undefined`, ...) have their own
/// variants so nothing is lost between decoding and rendering.
#[derive(Debug, Clone, PartialEq)]
pub enum StructuredValue {
    Undefined,
    Null,
    Bool(bool),
    Number(f64),
    /// Arbitrary precision integer kept in its decimal form
    BigInt(String),
    String(String),
    Date(OffsetDateTime),
    RegExp {
        source: String,
        flags: String,
    },
    Url(url::Url),
    Error {
        name: String,
        message: String,
    },
    Array(Vec<StructuredValue>),
    Object(Vec<(String, StructuredValue)>),
    Set(Vec<StructuredValue>),
    Map(Vec<(StructuredValue, StructuredValue)>),
    TypedArray {
        kind: String,
        values: Vec<f64>,
    },
    /// Instance of a registered class; only the name survives the trip
    Class {
        name: String,
        fields: Vec<(String, StructuredValue)>,
    },
}

impl StructuredValue {
    /// Convert a plain JSON value without applying any annotations.
    pub fn from_json(value: Value) -> Self {
        match value {
            Value::Null => StructuredValue::Null,
            Value::Bool(b) => StructuredValue::Bool(b),
            Value::Number(n) => StructuredValue::Number(n.as_f64().unwrap_or(f64::NAN)),
            Value::String(s) => StructuredValue::String(s),
            Value::Array(items) => {
                StructuredValue::Array(items.into_iter().map(Self::from_json).collect())
            }
            Value::Object(map) => StructuredValue::Object(
                map.into_iter()
                    .map(|(k, v)| (k, Self::from_json(v)))
                    .collect(),
            ),
        }
    }

    /// Render the value the way `JSON.stringify` would hand it to a page,
    /// with collections flattened to arrays instead of dropped.
    ///
    /// `undefined` object members are omitted; elsewhere they become `null`.
    pub fn to_json(&self) -> Value {
        match self {
            StructuredValue::Undefined | StructuredValue::Null => Value::Null,
            StructuredValue::Bool(b) => Value::Bool(*b),
            StructuredValue::Number(n) => number_to_json(*n),
            StructuredValue::BigInt(digits) => Value::String(digits.clone()),
            StructuredValue::String(s) => Value::String(s.clone()),
            StructuredValue::Date(date) => Value::String(format_iso_date(*date)),
            StructuredValue::RegExp { source, flags } => {
                Value::String(format!("/{}/{}", source, flags))
            }
            StructuredValue::Url(url) => Value::String(url.to_string()),
            StructuredValue::Error { name, message } => {
                let mut map = Map::new();
                map.insert("name".into(), Value::String(name.clone()));
                map.insert("message".into(), Value::String(message.clone()));
                Value::Object(map)
            }
            StructuredValue::Array(items) | StructuredValue::Set(items) => {
                Value::Array(items.iter().map(Self::to_json).collect())
            }
            StructuredValue::Object(entries) | StructuredValue::Class { fields: entries, .. } => {
                entries_to_json(entries)
            }
            StructuredValue::Map(rows) => Value::Array(
                rows.iter()
                    .map(|(k, v)| Value::Array(vec![k.to_json(), v.to_json()]))
                    .collect(),
            ),
            StructuredValue::TypedArray { values, .. } => {
                Value::Array(values.iter().copied().map(number_to_json).collect())
            }
        }
    }

    /// Member lookup on objects and class instances.
    pub fn get(&self, key: &str) -> Option<&StructuredValue> {
        match self {
            StructuredValue::Object(entries) | StructuredValue::Class { fields: entries, .. } => {
                entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
            }
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            StructuredValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn is_object(&self) -> bool {
        matches!(self, StructuredValue::Object(_))
    }

    /// Follow a superjson path (already split into segments).
    ///
    /// Sets are indexed by position and maps by `row` then `0` (key) or
    /// anything else (value), the same walk superjson performs.
    pub fn lookup_mut(&mut self, path: &[String]) -> Option<&mut StructuredValue> {
        let mut current = self;
        let mut i = 0;
        while i < path.len() {
            let segment = &path[i];
            current = match current {
                StructuredValue::Array(items) | StructuredValue::Set(items) => {
                    items.get_mut(segment.parse::<usize>().ok()?)?
                }
                StructuredValue::Object(entries)
                | StructuredValue::Class {
                    fields: entries, ..
                } => entries
                    .iter_mut()
                    .find(|(k, _)| k == segment)
                    .map(|(_, v)| v)?,
                StructuredValue::Map(rows) => {
                    let row = rows.get_mut(segment.parse::<usize>().ok()?)?;
                    i += 1;
                    match path.get(i).map(String::as_str) {
                        Some("0") => &mut row.0,
                        _ => &mut row.1,
                    }
                }
                _ => return None,
            };
            i += 1;
        }
        Some(current)
    }
}

impl Serialize for StructuredValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}

fn entries_to_json(entries: &[(String, StructuredValue)]) -> Value {
    let mut map = Map::new();
    for (k, v) in entries {
        if matches!(v, StructuredValue::Undefined) {
            continue;
        }
        map.insert(k.clone(), v.to_json());
    }
    Value::Object(map)
}

fn number_to_json(n: f64) -> Value {
    if n == 0.0 {
        // JSON has no negative zero
        return Value::Number(Number::from(0));
    }
    if n.fract() == 0.0 && n.abs() < 9_007_199_254_740_992.0 {
        return Value::Number(Number::from(n as i64));
    }
    Number::from_f64(n).map(Value::Number).unwrap_or(Value::Null)
}

/// Format a date the way `Date.prototype.toISOString` does.
pub fn format_iso_date(date: OffsetDateTime) -> String {
    let utc = date.to_offset(UtcOffset::UTC);
    format!(
        "{:04}-{:02}-{:02}T{:02}:{:02}:{:02}.{:03}Z",
        utc.year(),
        u8::from(utc.month()),
        utc.day(),
        utc.hour(),
        utc.minute(),
        utc.second(),
        utc.millisecond()
    )
}

/// Parse an ISO-8601 timestamp as produced by `toISOString`.
pub fn parse_iso_date(text: &str) -> Option<OffsetDateTime> {
    OffsetDateTime::parse(text, &Rfc3339)
        .or_else(|_| OffsetDateTime::parse(text, &Iso8601::DEFAULT))
        .ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn plain_json_round_trips_through_structured() {
        let input = json!({"b": [1, 2.5, null], "a": {"x": true, "y": "s"}});
        let value = StructuredValue::from_json(input.clone());
        assert_eq!(value.to_json(), input);
    }

    #[test]
    fn object_order_is_preserved() {
        let value = StructuredValue::from_json(json!({"z": 1, "a": 2}));
        let keys: Vec<_> = value
            .to_json()
            .as_object()
            .unwrap()
            .keys()
            .cloned()
            .collect();
        assert_eq!(keys, vec!["z", "a"]);
    }

    #[test]
    fn undefined_members_are_dropped_from_objects() {
        let value = StructuredValue::Object(vec![
            ("keep".into(), StructuredValue::Number(1.0)),
            ("gone".into(), StructuredValue::Undefined),
        ]);
        assert_eq!(value.to_json(), json!({"keep": 1}));

        let arr = StructuredValue::Array(vec![StructuredValue::Undefined]);
        assert_eq!(arr.to_json(), json!([null]));
    }

    #[test]
    fn non_finite_numbers_render_as_null() {
        assert_eq!(StructuredValue::Number(f64::NAN).to_json(), Value::Null);
        assert_eq!(StructuredValue::Number(f64::INFINITY).to_json(), Value::Null);
        assert_eq!(StructuredValue::Number(-0.0).to_json(), json!(0));
    }

    #[test]
    fn dates_format_like_to_iso_string() {
        let date = parse_iso_date("2024-03-05T07:08:09.120+02:00").unwrap();
        assert_eq!(format_iso_date(date), "2024-03-05T05:08:09.120Z");
    }

    #[test]
    fn lookup_walks_maps_and_sets() {
        let mut value = StructuredValue::Object(vec![(
            "m".into(),
            StructuredValue::Map(vec![(
                StructuredValue::String("k".into()),
                StructuredValue::Set(vec![StructuredValue::Bool(true)]),
            )]),
        )]);
        let path: Vec<String> = ["m", "0", "1", "0"].iter().map(|s| s.to_string()).collect();
        assert_eq!(
            value.lookup_mut(&path),
            Some(&mut StructuredValue::Bool(true))
        );
        let key_path: Vec<String> = ["m", "0", "0"].iter().map(|s| s.to_string()).collect();
        assert_eq!(
            value.lookup_mut(&key_path).and_then(|v| v.as_str().map(String::from)),
            Some("k".to_string())
        );
    }
}
