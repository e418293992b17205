//! `meta.values` and `meta.referentialEqualities` handling.
//!
//! Value annotations form a tree: a leaf is `[type]`, an inner node that is
//! itself transformed is `[type, {path: subtree}]`, and an untransformed
//! inner node is just `{path: subtree}`. Children are restored before their
//! parent so every path walks through plain arrays and objects.

use super::path::{escape_key, parse_path};
use super::value::{format_iso_date, parse_iso_date, StructuredValue};
use crate::{Error, Result};
use log::debug;
use serde_json::{Map, Value};

/// Apply a `meta.values` tree to a freshly converted value.
pub fn apply_value_annotations(root: &mut StructuredValue, tree: &Value) -> Result<()> {
    let mut origin = Vec::new();
    traverse(tree, &mut origin, &mut |annotation, path| {
        apply_at(root, path, annotation)
    })
}

fn traverse<F>(tree: &Value, origin: &mut Vec<String>, visit: &mut F) -> Result<()>
where
    F: FnMut(&Value, &[String]) -> Result<()>,
{
    match tree {
        Value::Null => Ok(()),
        Value::Object(children) => traverse_children(children, origin, visit),
        Value::Array(node) => {
            let annotation = node
                .first()
                .ok_or_else(|| Error::Superjson("empty annotation node".into()))?;
            match node.get(1) {
                Some(Value::Object(children)) => traverse_children(children, origin, visit)?,
                Some(Value::Null) | None => {}
                Some(other) => {
                    return Err(Error::Superjson(format!(
                        "annotation children must be an object, got {}",
                        other
                    )))
                }
            }
            visit(annotation, origin)
        }
        other => Err(Error::Superjson(format!(
            "unexpected annotation tree node {}",
            other
        ))),
    }
}

fn traverse_children<F>(
    children: &Map<String, Value>,
    origin: &mut Vec<String>,
    visit: &mut F,
) -> Result<()>
where
    F: FnMut(&Value, &[String]) -> Result<()>,
{
    for (key, subtree) in children {
        let depth = origin.len();
        origin.extend(parse_path(key));
        traverse(subtree, origin, visit)?;
        origin.truncate(depth);
    }
    Ok(())
}

fn apply_at(root: &mut StructuredValue, path: &[String], annotation: &Value) -> Result<()> {
    if let Some(slot) = root.lookup_mut(path) {
        let plain = std::mem::replace(slot, StructuredValue::Undefined);
        *slot = untransform(plain, annotation)?;
        return Ok(());
    }

    // JSON.stringify drops undefined members, so the annotation may point
    // at a key that is not there any more.
    if annotation.as_str() == Some("undefined") {
        if let Some((last, parent)) = path.split_last() {
            if let Some(StructuredValue::Object(entries)) = root.lookup_mut(parent) {
                entries.push((last.clone(), StructuredValue::Undefined));
                return Ok(());
            }
        }
    }

    Err(Error::Superjson(format!(
        "annotation path `{}` does not exist",
        path.join(".")
    )))
}

fn untransform(plain: StructuredValue, annotation: &Value) -> Result<StructuredValue> {
    match annotation {
        Value::String(kind) => untransform_simple(plain, kind),
        Value::Array(parts) => {
            let kind = parts.first().and_then(Value::as_str).unwrap_or_default();
            let name = parts.get(1).and_then(Value::as_str).unwrap_or_default();
            untransform_composite(plain, kind, name)
        }
        other => Err(Error::Superjson(format!("invalid annotation {}", other))),
    }
}

fn untransform_simple(plain: StructuredValue, kind: &str) -> Result<StructuredValue> {
    let mismatch = |plain: &StructuredValue| {
        Error::Superjson(format!("cannot restore {} from {:?}", kind, plain))
    };

    match (kind, plain) {
        ("undefined", _) => Ok(StructuredValue::Undefined),
        ("bigint", StructuredValue::String(digits)) => {
            let body = digits.strip_prefix('-').unwrap_or(&digits);
            if body.is_empty() || !body.bytes().all(|b| b.is_ascii_digit()) {
                return Err(Error::Superjson(format!("invalid bigint `{}`", digits)));
            }
            Ok(StructuredValue::BigInt(digits))
        }
        // `new Date(v)` never throws; an unreadable date keeps its text.
        ("Date", StructuredValue::String(text)) => Ok(match parse_iso_date(&text) {
            Some(date) => StructuredValue::Date(date),
            None => {
                debug!("keeping unparseable date `{}` as a string", text);
                StructuredValue::String(text)
            }
        }),
        ("regexp", StructuredValue::String(raw)) => {
            let end = raw
                .rfind('/')
                .filter(|&end| end > 0 && raw.starts_with('/'))
                .ok_or_else(|| Error::Superjson(format!("invalid regexp `{}`", raw)))?;
            Ok(StructuredValue::RegExp {
                source: raw[1..end].to_string(),
                flags: raw[end + 1..].to_string(),
            })
        }
        ("set", StructuredValue::Array(items)) => Ok(StructuredValue::Set(items)),
        ("map", StructuredValue::Array(rows)) => rows
            .into_iter()
            .map(|row| match row {
                StructuredValue::Array(pair) if pair.len() == 2 => {
                    let mut pair = pair.into_iter();
                    match (pair.next(), pair.next()) {
                        (Some(k), Some(v)) => Ok((k, v)),
                        _ => Err(Error::Superjson("map entry must be a pair".into())),
                    }
                }
                _ => Err(Error::Superjson("map entry must be a pair".into())),
            })
            .collect::<Result<Vec<_>>>()
            .map(StructuredValue::Map),
        ("Error", StructuredValue::Object(entries)) => {
            let field = |name: &str| {
                entries
                    .iter()
                    .find(|(k, _)| k == name)
                    .and_then(|(_, v)| v.as_str())
                    .map(str::to_string)
            };
            Ok(StructuredValue::Error {
                name: field("name").unwrap_or_else(|| "Error".to_string()),
                message: field("message").unwrap_or_default(),
            })
        }
        ("URL", StructuredValue::String(href)) => url::Url::parse(&href)
            .map(StructuredValue::Url)
            .map_err(|e| Error::Superjson(format!("invalid URL `{}`: {}", href, e))),
        ("number", StructuredValue::String(text)) => match text.as_str() {
            "NaN" => Ok(StructuredValue::Number(f64::NAN)),
            "Infinity" => Ok(StructuredValue::Number(f64::INFINITY)),
            "-Infinity" => Ok(StructuredValue::Number(f64::NEG_INFINITY)),
            "-0" => Ok(StructuredValue::Number(-0.0)),
            other => other
                .parse::<f64>()
                .map(StructuredValue::Number)
                .map_err(|_| Error::Superjson(format!("invalid number `{}`", other))),
        },
        ("bigint" | "Date" | "regexp" | "set" | "map" | "Error" | "URL" | "number", plain) => {
            Err(mismatch(&plain))
        }
        (other, _) => Err(Error::Superjson(format!(
            "unsupported annotation `{}`",
            other
        ))),
    }
}

fn untransform_composite(plain: StructuredValue, kind: &str, name: &str) -> Result<StructuredValue> {
    match (kind, plain) {
        ("class", StructuredValue::Object(fields)) => Ok(StructuredValue::Class {
            name: name.to_string(),
            fields,
        }),
        ("typed-array", StructuredValue::Array(items)) => {
            let values = items
                .into_iter()
                .map(|item| match item {
                    StructuredValue::Number(n) => Ok(n),
                    other => Err(Error::Superjson(format!(
                        "typed array element must be a number, got {:?}",
                        other
                    ))),
                })
                .collect::<Result<Vec<_>>>()?;
            Ok(StructuredValue::TypedArray {
                kind: name.to_string(),
                values,
            })
        }
        ("symbol" | "custom", _) => Err(Error::Superjson(format!(
            "{} `{}` is not registered",
            kind, name
        ))),
        (kind, plain) => Err(Error::Superjson(format!(
            "cannot restore [{}, {}] from {:?}",
            kind, name, plain
        ))),
    }
}

/// Apply `meta.referentialEqualities`: copy the value found at each source
/// path into every path listed as identical to it.
pub fn apply_referential_equalities(root: &mut StructuredValue, tree: &Value) -> Result<()> {
    match tree {
        Value::Null => Ok(()),
        Value::Array(parts) => {
            if let Some(targets) = parts.first() {
                let source = root.clone();
                for target in string_list(targets)? {
                    assign(root, &parse_path(target), source.clone())?;
                }
            }
            match parts.get(1) {
                Some(Value::Object(rest)) => apply_equality_map(root, rest),
                _ => Ok(()),
            }
        }
        Value::Object(map) => apply_equality_map(root, map),
        other => Err(Error::Superjson(format!(
            "unexpected referential equality node {}",
            other
        ))),
    }
}

fn apply_equality_map(root: &mut StructuredValue, map: &Map<String, Value>) -> Result<()> {
    for (source_path, targets) in map {
        let source = root
            .lookup_mut(&parse_path(source_path))
            .map(|v| v.clone())
            .ok_or_else(|| {
                Error::Superjson(format!("equality source `{}` does not exist", source_path))
            })?;
        for target in string_list(targets)? {
            assign(root, &parse_path(target), source.clone())?;
        }
    }
    Ok(())
}

fn assign(root: &mut StructuredValue, path: &[String], value: StructuredValue) -> Result<()> {
    let slot = root.lookup_mut(path).ok_or_else(|| {
        Error::Superjson(format!("equality target `{}` does not exist", path.join(".")))
    })?;
    *slot = value;
    Ok(())
}

fn string_list(value: &Value) -> Result<Vec<&str>> {
    value
        .as_array()
        .ok_or_else(|| Error::Superjson("expected a list of paths".into()))?
        .iter()
        .map(|v| {
            v.as_str()
                .ok_or_else(|| Error::Superjson("paths must be strings".into()))
        })
        .collect()
}

/// Turn a value into its plain JSON form plus the annotation tree needed to
/// restore it. The tree is `None` when the value is plain JSON already.
pub fn walk(value: &StructuredValue) -> (Value, Option<Value>) {
    match value {
        StructuredValue::Undefined => (Value::Null, leaf("undefined")),
        StructuredValue::Null => (Value::Null, None),
        StructuredValue::Bool(b) => (Value::Bool(*b), None),
        StructuredValue::Number(n) => {
            if n.is_nan() {
                (Value::String("NaN".into()), leaf("number"))
            } else if n.is_infinite() {
                let text = if *n > 0.0 { "Infinity" } else { "-Infinity" };
                (Value::String(text.into()), leaf("number"))
            } else if *n == 0.0 && n.is_sign_negative() {
                (Value::String("-0".into()), leaf("number"))
            } else {
                (value.to_json(), None)
            }
        }
        StructuredValue::BigInt(digits) => (Value::String(digits.clone()), leaf("bigint")),
        StructuredValue::String(s) => (Value::String(s.clone()), None),
        StructuredValue::Date(date) => (Value::String(format_iso_date(*date)), leaf("Date")),
        StructuredValue::RegExp { .. } => (value.to_json(), leaf("regexp")),
        StructuredValue::Url(url) => (Value::String(url.to_string()), leaf("URL")),
        StructuredValue::Error { .. } => (value.to_json(), leaf("Error")),
        StructuredValue::TypedArray { kind, .. } => (
            value.to_json(),
            Some(Value::Array(vec![Value::Array(vec![
                Value::String("typed-array".into()),
                Value::String(kind.clone()),
            ])])),
        ),
        StructuredValue::Array(items) => {
            let (json, children) = walk_items(items);
            (json, children.map(Value::Object))
        }
        StructuredValue::Object(entries) => {
            let (json, children) = walk_entries(entries);
            (json, children.map(Value::Object))
        }
        StructuredValue::Set(items) => {
            let (json, children) = walk_items(items);
            (json, Some(node(Value::String("set".into()), children)))
        }
        StructuredValue::Map(rows) => {
            let mut json = Vec::with_capacity(rows.len());
            let mut children = Map::new();
            for (index, (k, v)) in rows.iter().enumerate() {
                let (row_json, row_children) = walk_items(&[k.clone(), v.clone()]);
                json.push(row_json);
                if let Some(row_children) = row_children {
                    merge_child(&mut children, &index.to_string(), Value::Object(row_children));
                }
            }
            let children = (!children.is_empty()).then_some(children);
            (
                Value::Array(json),
                Some(node(Value::String("map".into()), children)),
            )
        }
        StructuredValue::Class { name, fields } => {
            let (json, children) = walk_entries(fields);
            let kind = Value::Array(vec![
                Value::String("class".into()),
                Value::String(name.clone()),
            ]);
            (json, Some(node(kind, children)))
        }
    }
}

fn leaf(kind: &str) -> Option<Value> {
    Some(Value::Array(vec![Value::String(kind.into())]))
}

fn node(kind: Value, children: Option<Map<String, Value>>) -> Value {
    match children {
        Some(children) => Value::Array(vec![kind, Value::Object(children)]),
        None => Value::Array(vec![kind]),
    }
}

fn walk_items(items: &[StructuredValue]) -> (Value, Option<Map<String, Value>>) {
    let mut json = Vec::with_capacity(items.len());
    let mut children = Map::new();
    for (index, item) in items.iter().enumerate() {
        let (item_json, annotation) = walk(item);
        json.push(item_json);
        if let Some(annotation) = annotation {
            merge_child(&mut children, &index.to_string(), annotation);
        }
    }
    (Value::Array(json), (!children.is_empty()).then_some(children))
}

fn walk_entries(entries: &[(String, StructuredValue)]) -> (Value, Option<Map<String, Value>>) {
    let mut json = Map::new();
    let mut children = Map::new();
    for (key, item) in entries {
        let (item_json, annotation) = walk(item);
        json.insert(key.clone(), item_json);
        if let Some(annotation) = annotation {
            merge_child(&mut children, &escape_key(key), annotation);
        }
    }
    (Value::Object(json), (!children.is_empty()).then_some(children))
}

// Untransformed subtrees are flattened into their parent with dotted keys.
fn merge_child(children: &mut Map<String, Value>, key: &str, annotation: Value) {
    match annotation {
        Value::Object(grandchildren) => {
            for (sub, tree) in grandchildren {
                children.insert(format!("{}.{}", key, sub), tree);
            }
        }
        other => {
            children.insert(key.to_string(), other);
        }
    }
}
