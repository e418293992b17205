//! Query decoding behaviour as seen through the loader

use iconbg::{PageLoader, ParamValue, StructuredValue};
use serde_json::json;
use url::Url;

fn with_params(pairs: &[(&str, &str)]) -> Url {
    let mut url = Url::parse("https://bg.example/").unwrap();
    {
        let mut query = url.query_pairs_mut();
        for (k, v) in pairs {
            query.append_pair(k, v);
        }
    }
    url
}

#[test]
fn non_json_values_are_stored_verbatim() {
    let raw = ["", "plain", "a b+c", "{\"not\":\"structured\"}", "JSON"];
    for value in raw {
        let page = PageLoader::default()
            .load_parsed(&with_params(&[("v", value)]))
            .unwrap();
        assert_eq!(page.get("v"), Some(&ParamValue::Raw(value.to_string())));
    }
}

#[test]
fn superjson_values_decode_to_their_value() {
    let payload = r#"{"json":{"when":"2024-02-29T10:00:00.000Z","n":null,"ids":[1,2]},"meta":{"values":{"when":["Date"],"ids":["set"],"n":["undefined"]}}}"#;
    let page = PageLoader::default()
        .load_parsed(&with_params(&[("state", payload)]))
        .unwrap();

    let state = page.get("state").and_then(ParamValue::as_structured).unwrap();
    assert!(matches!(state.get("when"), Some(StructuredValue::Date(_))));
    assert_eq!(state.get("n"), Some(&StructuredValue::Undefined));
    assert_eq!(
        state.get("ids"),
        Some(&StructuredValue::Set(vec![
            StructuredValue::Number(1.0),
            StructuredValue::Number(2.0)
        ]))
    );

    let out = serde_json::to_value(&page).unwrap();
    assert_eq!(
        out["state"],
        json!({"when": "2024-02-29T10:00:00.000Z", "ids": [1, 2]})
    );
}

#[test]
fn duplicate_keys_keep_the_last_value() {
    let url = with_params(&[("k", "one"), ("other", "x"), ("k", "two")]);
    let page = PageLoader::default().load_parsed(&url).unwrap();
    assert_eq!(page.get("k").and_then(ParamValue::as_raw), Some("two"));
    assert_eq!(page.fields.len(), 2);
}

#[test]
fn invalid_superjson_fails_the_whole_load() {
    let url = with_params(&[("fine", "x"), ("broken", "{\"json\": ")]);
    assert!(PageLoader::default().load_parsed(&url).is_err());
}

#[test]
fn load_query_accepts_raw_pairs() {
    let page = PageLoader::default()
        .load_query(vec![("options", r#"{"json":{"speed":2}}"#)])
        .unwrap();
    let options = page.options.unwrap();
    assert_eq!(options.get("speed"), Some(&StructuredValue::Number(2.0)));
    assert!(page.unzipped_icon_configs.is_none());
}
