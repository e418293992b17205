//! Inline style serialization.

use serde_json::{Map, Value};
use std::fmt::Display;

/// Join declarations as `name: value` pairs separated by `;`.
pub fn css_stringify<I, K, V>(declarations: I) -> String
where
    I: IntoIterator<Item = (K, V)>,
    K: Display,
    V: Display,
{
    declarations
        .into_iter()
        .map(|(k, v)| format!("{}: {}", k, v))
        .collect::<Vec<_>>()
        .join(";")
}

/// Same as [`css_stringify`] for a JSON object, as found in decoded options.
/// Strings are written without quotes.
pub fn css_stringify_json(declarations: &Map<String, Value>) -> String {
    css_stringify(declarations.iter().map(|(k, v)| (k, css_value(v))))
}

fn css_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Array(items) => items.iter().map(css_value).collect::<Vec<_>>().join(","),
        Value::Object(_) => "[object Object]".to_string(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn joins_in_insertion_order() {
        let css = css_stringify([("color", "red"), ("font-size", "2rem")]);
        assert_eq!(css, "color: red;font-size: 2rem");
    }

    #[test]
    fn empty_declarations_give_empty_string() {
        assert_eq!(css_stringify(Vec::<(&str, &str)>::new()), "");
    }

    #[test]
    fn json_values_render_unquoted() {
        let decl = json!({"opacity": 0.5, "fontFamily": "Sheila Crayon"});
        let css = css_stringify_json(decl.as_object().unwrap());
        assert_eq!(css, "opacity: 0.5;fontFamily: Sheila Crayon");
    }
}
