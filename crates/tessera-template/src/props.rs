//! Prop values: default merging, truthiness and text conversion.

use serde_json::{Map, Value};

/// Props and configuration objects, keyed in insertion order.
pub type Props = Map<String, Value>;

/// Merge caller props over fragment defaults.
///
/// Keys keep the defaults' order, followed by props-only keys in caller
/// order. Where both sides hold an object the two are merged recursively;
/// otherwise the caller's value wins, including `null` and arrays.
#[must_use]
pub fn merge(defaults: &Props, props: &Props) -> Props {
    let mut merged = Props::with_capacity(defaults.len() + props.len());

    for (key, default) in defaults {
        let value = match (default, props.get(key)) {
            (Value::Object(base), Some(Value::Object(over))) => Value::Object(merge(base, over)),
            (_, Some(over)) => over.clone(),
            (base, None) => base.clone(),
        };
        merged.insert(key.clone(), value);
    }

    for (key, value) in props {
        if !defaults.contains_key(key) {
            merged.insert(key.clone(), value.clone());
        }
    }

    merged
}

/// Falsy values are `null`, `false`, `0`, `""`, `[]` and `{}`.
#[must_use]
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
    }
}

/// Short type description used in error messages.
#[must_use]
pub fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "list",
        Value::Object(_) => "map",
    }
}

/// Text form of a scalar; `None` for lists and maps.
#[must_use]
pub fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => Some(String::new()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Number(n) => Some(n.to_string()),
        Value::String(s) => Some(s.clone()),
        Value::Array(_) | Value::Object(_) => None,
    }
}

/// Escape text for HTML element content and quoted attribute values.
#[must_use]
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
    out
}
