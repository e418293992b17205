//! Query parameter decoding.
//!
//! Every parameter of the request URL lands in a [`QueryParams`] map. Values
//! that look like superjson (non-empty and containing `json`) are decoded
//! into [`StructuredValue`]s; everything else is kept verbatim.

use crate::superjson::{self, StructuredValue};
use crate::{Error, Result};
use indexmap::IndexMap;
use log::debug;
use serde::{Serialize, Serializer};
use url::Url;

/// Decoded query parameters keyed by name, in request order. A later
/// duplicate overwrites the value but keeps the first position.
pub type QueryParams = IndexMap<String, ParamValue>;

/// A single decoded query parameter value
#[derive(Debug, Clone, PartialEq)]
pub enum ParamValue {
    /// The raw (form-decoded) string, untouched
    Raw(String),
    /// A superjson payload decoded into a structured value
    Structured(StructuredValue),
}

impl ParamValue {
    pub fn as_raw(&self) -> Option<&str> {
        match self {
            ParamValue::Raw(s) => Some(s),
            ParamValue::Structured(_) => None,
        }
    }

    pub fn as_structured(&self) -> Option<&StructuredValue> {
        match self {
            ParamValue::Structured(v) => Some(v),
            ParamValue::Raw(_) => None,
        }
    }

    pub fn to_json(&self) -> serde_json::Value {
        match self {
            ParamValue::Raw(s) => serde_json::Value::String(s.clone()),
            ParamValue::Structured(v) => v.to_json(),
        }
    }
}

impl Serialize for ParamValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            ParamValue::Raw(s) => serializer.serialize_str(s),
            ParamValue::Structured(v) => v.serialize(serializer),
        }
    }
}

/// Whether a raw parameter value should be treated as superjson.
pub fn looks_structured(raw: &str) -> bool {
    !raw.is_empty() && raw.contains("json")
}

/// Decode a single raw value.
pub fn decode_value(key: &str, raw: &str) -> Result<ParamValue> {
    if !looks_structured(raw) {
        return Ok(ParamValue::Raw(raw.to_string()));
    }
    superjson::parse(raw)
        .map(ParamValue::Structured)
        .map_err(|e| match e {
            Error::Superjson(msg) => Error::Superjson(format!("parameter `{}`: {}", key, msg)),
            other => other,
        })
}

/// Decode an ordered sequence of `(key, value)` pairs.
///
/// The first value that fails to decode aborts the whole operation.
pub fn decode_pairs<I, K, V>(pairs: I) -> Result<QueryParams>
where
    I: IntoIterator<Item = (K, V)>,
    K: Into<String>,
    V: AsRef<str>,
{
    let mut params = QueryParams::new();
    for (key, value) in pairs {
        let key = key.into();
        let value = value.as_ref();
        debug!("query parameter {}={}", key, value);
        let decoded = decode_value(&key, value)?;
        params.insert(key, decoded);
    }
    Ok(params)
}

/// Decode the query string of a request URL.
pub fn decode_query(url: &Url) -> Result<QueryParams> {
    decode_pairs(url.query_pairs())
}
