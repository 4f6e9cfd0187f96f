//! Accessibility and free-form attribute assembly.

use std::fmt;

use serde_json::Value;
use tracing::debug;

use crate::props::{Props, escape_html};

/// Recognized `a11y` keys and the attribute each one emits, in output order.
pub const A11Y_ATTRIBUTES: &[(&str, &str)] = &[
    ("role", "role"),
    ("ariaLabel", "aria-label"),
    ("ariaDescribedBy", "aria-describedby"),
    ("ariaLabelledBy", "aria-labelledby"),
    ("ariaLive", "aria-live"),
    ("ariaHidden", "aria-hidden"),
    ("ariaExpanded", "aria-expanded"),
    ("ariaControls", "aria-controls"),
    ("ariaCurrent", "aria-current"),
    ("ariaPressed", "aria-pressed"),
    ("ariaDisabled", "aria-disabled"),
    ("ariaModal", "aria-modal"),
    ("ariaHasPopup", "aria-haspopup"),
    ("tabIndex", "tabindex"),
];

/// Rendered attributes; each one is written with a leading space.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Attributes {
    entries: Vec<(String, Option<String>)>,
}

impl Attributes {
    /// Attribute names in order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(name, _)| name.as_str())
    }

    /// Value of an attribute; `Some(None)` for a bare boolean attribute.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<Option<&str>> {
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_deref())
    }

    /// Whether no attribute was emitted.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl fmt::Display for Attributes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (name, value) in &self.entries {
            match value {
                Some(value) => write!(f, " {name}=\"{}\"", escape_html(value))?,
                None => write!(f, " {name}")?,
            }
        }
        Ok(())
    }
}

/// Accessibility attributes from the merged `a11y` group.
///
/// Absent, `null` and blank values emit nothing; booleans are written as
/// `"true"`/`"false"` since `aria-hidden="false"` is meaningful.
#[must_use]
pub fn a11y_attributes(config: &Props) -> Attributes {
    let mut attrs = Attributes::default();
    let Some(Value::Object(a11y)) = config.get("a11y") else {
        return attrs;
    };

    for (key, attribute) in A11Y_ATTRIBUTES {
        let value = match a11y.get(*key) {
            Some(Value::String(s)) if !s.trim().is_empty() => s.clone(),
            Some(Value::Bool(b)) => b.to_string(),
            Some(Value::Number(n)) => n.to_string(),
            _ => continue,
        };
        attrs.entries.push(((*attribute).to_string(), Some(value)));
    }

    attrs
}

/// Free-form attributes from the `attrs` map, in insertion order.
///
/// `true` emits a bare attribute and `false`/`null`/blank emit nothing.
/// Keys that are not valid attribute names are skipped.
#[must_use]
pub fn extra_attributes(config: &Props) -> Attributes {
    let mut attrs = Attributes::default();
    let Some(Value::Object(map)) = config.get("attrs") else {
        return attrs;
    };

    for (name, value) in map {
        if !is_attribute_name(name) {
            debug!(attribute = %name, "skipping invalid attribute name");
            continue;
        }
        let value = match value {
            Value::Bool(true) => None,
            Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            _ => continue,
        };
        attrs.entries.push((name.clone(), value));
    }

    attrs
}

fn is_attribute_name(name: &str) -> bool {
    let mut chars = name.chars();
    chars.next().is_some_and(|c| c.is_ascii_alphabetic() || c == '_' || c == '@' || c == ':')
        && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | ':' | '.' | '@'))
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn config(value: Value) -> Props {
        value.as_object().cloned().unwrap_or_default()
    }

    #[test]
    fn test_absent_label_emits_nothing() {
        let attrs = a11y_attributes(&config(json!({"a11y": {"role": "button"}})));
        assert_eq!(attrs.to_string(), r#" role="button""#);
        assert!(attrs.get("aria-label").is_none());
        assert!(!attrs.to_string().contains("aria-label"));
    }

    #[test]
    fn test_empty_values_emit_nothing() {
        let attrs = a11y_attributes(&config(json!({
            "a11y": {"ariaLabel": "", "ariaLive": "   ", "ariaControls": null, "role": []}
        })));
        assert!(attrs.is_empty());
        assert_eq!(attrs.to_string(), "");
    }

    #[test]
    fn test_fixed_output_order() {
        let attrs = a11y_attributes(&config(json!({
            "a11y": {"tabIndex": 0, "ariaHidden": false, "ariaLabel": "Close", "role": "dialog"}
        })));
        let names: Vec<_> = attrs.names().collect();
        assert_eq!(names, vec!["role", "aria-label", "aria-hidden", "tabindex"]);
        assert_eq!(
            attrs.to_string(),
            r#" role="dialog" aria-label="Close" aria-hidden="false" tabindex="0""#
        );

        let attrs = a11y_attributes(&config(json!({
            "a11y": {"ariaLabelledBy": "title", "ariaDescribedBy": "hint", "ariaLabel": "Close"}
        })));
        let names: Vec<_> = attrs.names().collect();
        assert_eq!(names, vec!["aria-label", "aria-describedby", "aria-labelledby"]);
    }

    #[test]
    fn test_values_are_escaped() {
        let attrs = a11y_attributes(&config(json!({"a11y": {"ariaLabel": "Say \"hi\""}})));
        assert_eq!(attrs.to_string(), r#" aria-label="Say &quot;hi&quot;""#);
    }

    #[test]
    fn test_missing_group() {
        assert!(a11y_attributes(&Props::new()).is_empty());
        assert!(a11y_attributes(&config(json!({"a11y": "nope"}))).is_empty());
    }

    #[test]
    fn test_extra_attributes_keep_insertion_order() {
        let attrs = extra_attributes(&config(json!({
            "attrs": {"type": "submit", "data-id": 7, "disabled": true, "hidden": false, "bad name": "x"}
        })));
        assert_eq!(
            attrs.to_string(),
            r#" type="submit" data-id="7" disabled"#
        );
        assert_eq!(attrs.get("disabled"), Some(None));
    }
}
