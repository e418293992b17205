//! Page data handed to the renderer.

use crate::query::{ParamValue, QueryParams};
use crate::superjson::StructuredValue;
use serde::{Serialize, Serializer};
use serde_json::{Map, Value};

/// Query parameter holding the background options object
pub const OPTIONS_KEY: &str = "options";
/// Member of the options object carrying the encoded icon archive
pub const CONFIGS_KEY: &str = "configs";
/// Output member holding the extracted icon configs
pub const UNZIPPED_ICON_CONFIGS_KEY: &str = "unzippedIconConfigs";

/// One placed icon. The shape belongs to the renderer and is not
/// interpreted here.
pub type IconConfig = Value;

/// The `options` parameter, lifted out of the generic map.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BackgroundOptions {
    /// Every option member except `configs`, in their original order
    pub fields: Vec<(String, StructuredValue)>,
    /// Encoded icon archive, present only while not yet extracted
    pub configs: Option<String>,
}

impl BackgroundOptions {
    /// Lift a decoded `options` value. Only objects qualify; anything else
    /// is handed back untouched.
    pub fn from_structured(value: StructuredValue) -> Result<Self, StructuredValue> {
        let mut fields = match value {
            StructuredValue::Object(fields) => fields,
            other => return Err(other),
        };

        // An empty or non-string configs member is not an archive.
        let configs = fields
            .iter()
            .position(|(k, v)| k == CONFIGS_KEY && v.as_str().is_some_and(|s| !s.is_empty()))
            .and_then(|index| match fields.remove(index).1 {
                StructuredValue::String(s) => Some(s),
                _ => None,
            });

        Ok(Self { fields, configs })
    }

    pub fn get(&self, key: &str) -> Option<&StructuredValue> {
        self.fields.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    /// Remove and return the encoded archive.
    pub fn take_configs(&mut self) -> Option<String> {
        self.configs.take()
    }

    pub fn to_json(&self) -> Value {
        let mut map = Map::new();
        for (k, v) in &self.fields {
            if matches!(v, StructuredValue::Undefined) {
                continue;
            }
            map.insert(k.clone(), v.to_json());
        }
        if let Some(configs) = &self.configs {
            map.insert(CONFIGS_KEY.into(), Value::String(configs.clone()));
        }
        Value::Object(map)
    }
}

/// Everything the loader produces for one request.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PageData {
    /// All parameters other than a lifted `options` object
    pub fields: QueryParams,
    pub options: Option<BackgroundOptions>,
    // Position `options` had among the query parameters
    options_index: usize,
    /// Absent unless `options.configs` was present
    pub unzipped_icon_configs: Option<Vec<IconConfig>>,
}

impl PageData {
    /// Split decoded parameters into the page record. A structured object
    /// under `options` becomes [`BackgroundOptions`]; any other `options`
    /// value stays an ordinary field.
    pub fn from_params(mut fields: QueryParams) -> Self {
        let Some((index, key, value)) = fields.shift_remove_full(OPTIONS_KEY) else {
            return Self {
                fields,
                ..Default::default()
            };
        };
        let options = match value {
            ParamValue::Structured(value) => match BackgroundOptions::from_structured(value) {
                Ok(options) => Some(options),
                Err(value) => {
                    fields.shift_insert(index, key, ParamValue::Structured(value));
                    None
                }
            },
            raw => {
                fields.shift_insert(index, key, raw);
                None
            }
        };

        Self {
            fields,
            options,
            options_index: index,
            unzipped_icon_configs: None,
        }
    }

    /// Remove the encoded archive from the options, if any.
    pub fn take_configs(&mut self) -> Option<String> {
        self.options.as_mut().and_then(BackgroundOptions::take_configs)
    }

    pub fn get(&self, key: &str) -> Option<&ParamValue> {
        self.fields.get(key)
    }

    /// Flat JSON object as the renderer expects it. Keys follow the
    /// request's parameter order; `unzippedIconConfigs` comes last.
    pub fn to_json(&self) -> Value {
        let mut map = Map::new();
        let mut options = self.options.as_ref();
        for (i, (k, v)) in self.fields.iter().enumerate() {
            if i == self.options_index {
                if let Some(options) = options.take() {
                    map.insert(OPTIONS_KEY.into(), options.to_json());
                }
            }
            if matches!(v, ParamValue::Structured(StructuredValue::Undefined)) {
                continue;
            }
            map.insert(k.clone(), v.to_json());
        }
        if let Some(options) = options {
            map.insert(OPTIONS_KEY.into(), options.to_json());
        }
        if let Some(configs) = &self.unzipped_icon_configs {
            map.insert(
                UNZIPPED_ICON_CONFIGS_KEY.into(),
                Value::Array(configs.clone()),
            );
        }
        Value::Object(map)
    }
}

impl Serialize for PageData {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::decode_pairs;
    use serde_json::json;

    #[test]
    fn options_object_is_lifted() {
        let params = decode_pairs([
            ("options", r#"{"json":{"bg":"blue","configs":"abc"}}"#),
            ("name", "x"),
        ])
        .unwrap();
        let page = PageData::from_params(params);
        let options = page.options.as_ref().unwrap();
        assert_eq!(options.configs.as_deref(), Some("abc"));
        assert_eq!(options.get("bg").and_then(|v| v.as_str()), Some("blue"));
        assert!(page.get(OPTIONS_KEY).is_none());
        assert_eq!(page.get("name").and_then(|v| v.as_raw()), Some("x"));
    }

    #[test]
    fn empty_configs_is_not_an_archive() {
        let options = BackgroundOptions::from_structured(StructuredValue::from_json(
            json!({"configs": ""}),
        ))
        .unwrap();
        assert!(options.configs.is_none());
        assert_eq!(options.to_json(), json!({"configs": ""}));
    }

    #[test]
    fn non_object_options_stay_in_fields() {
        let params = decode_pairs([("options", "plain")]).unwrap();
        let page = PageData::from_params(params);
        assert!(page.options.is_none());
        assert_eq!(page.to_json(), json!({"options": "plain"}));
    }

    #[test]
    fn output_follows_request_order() {
        let params = decode_pairs([
            ("title", "board"),
            ("options", r#"{"json":{"bg":"red"}}"#),
            ("z", "last"),
        ])
        .unwrap();
        let page = PageData::from_params(params);
        let out = page.to_json();
        let keys: Vec<_> = out.as_object().unwrap().keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["title", "options", "z"]);
    }

    #[test]
    fn kept_options_field_stays_in_place() {
        let page = PageData::from_params(
            decode_pairs([("a", "1"), ("options", "plain"), ("b", "2")]).unwrap(),
        );
        let keys: Vec<_> = page.fields.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["a", "options", "b"]);
    }

    #[test]
    fn serializes_flat() {
        let mut page = PageData::from_params(
            decode_pairs([("options", r#"{"json":{"bg":"red","configs":"zzz"}}"#)]).unwrap(),
        );
        page.take_configs();
        page.unzipped_icon_configs = Some(vec![json!({"icon": "star"})]);
        assert_eq!(
            serde_json::to_value(&page).unwrap(),
            json!({"options": {"bg": "red"}, "unzippedIconConfigs": [{"icon": "star"}]})
        );
    }
}
