//! CSS class list assembly.
//!
//! The class list is built in a fixed order: the base class, modifier
//! classes (`variant`, `size`, `style`, `shape`, `state`, then any other
//! declared modifier), flag classes, and finally the caller's `className`.
//! Later classes win cascade-layer tie-breaks, so the order is part of the
//! output contract.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tessera_core::tokens::kebab;

use crate::props::{Props, is_truthy};

/// Modifier keys with a fixed position in the class list.
const CANONICAL_MODIFIERS: [&str; 5] = ["variant", "size", "style", "shape", "state"];

/// Per-fragment class rules, declared in fragment frontmatter.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ClassRules {
    /// Base class; defaults to the fragment name.
    #[serde(default)]
    pub base: Option<String>,

    /// Keys whose string value becomes `<base>-<value>`.
    #[serde(default)]
    pub modifiers: Vec<String>,

    /// Keys whose truthy value becomes `<base>--<key>`.
    #[serde(default)]
    pub flags: Vec<String>,
}

impl ClassRules {
    /// Rules that emit only the base class and `className`.
    #[must_use]
    pub fn base(base: impl Into<String>) -> Self {
        Self {
            base: Some(base.into()),
            ..Self::default()
        }
    }

    /// Add modifier keys.
    #[must_use]
    pub fn with_modifiers<I, S>(mut self, keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.modifiers.extend(keys.into_iter().map(Into::into));
        self
    }

    /// Add flag keys.
    #[must_use]
    pub fn with_flags<I, S>(mut self, keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.flags.extend(keys.into_iter().map(Into::into));
        self
    }

    /// Modifier keys in application order.
    fn ordered_modifiers(&self) -> impl Iterator<Item = &str> {
        let canonical = CANONICAL_MODIFIERS.iter().filter_map(|key| {
            self.modifiers
                .iter()
                .find(|m| m.as_str() == *key)
                .map(String::as_str)
        });
        let rest = self
            .modifiers
            .iter()
            .map(String::as_str)
            .filter(|m| !CANONICAL_MODIFIERS.iter().any(|c| c == m));
        canonical.chain(rest)
    }

    /// Build the class list for an effective configuration.
    #[must_use]
    pub fn build(&self, fragment: &str, defaults: &Props, config: &Props) -> ClassList {
        let base = self.base.as_deref().unwrap_or(fragment);
        let mut list = ClassList::default();
        list.push(base);

        for key in self.ordered_modifiers() {
            let Some(value) = config.get(key).and_then(modifier_value) else {
                continue;
            };
            let default = defaults.get(key).and_then(modifier_value);
            if default.as_deref() == Some(value.as_str()) {
                continue;
            }
            if key == "state" {
                list.push(&format!("is-{value}"));
            } else {
                list.push(&format!("{base}-{value}"));
            }
        }

        for flag in &self.flags {
            if config.get(flag).is_some_and(is_truthy) {
                list.push(&format!("{base}--{}", kebab(flag)));
            }
        }

        match config.get("className") {
            Some(Value::String(extra)) => {
                for class in extra.split_whitespace() {
                    list.push(class);
                }
            }
            Some(Value::Array(items)) => {
                for class in items.iter().filter_map(Value::as_str) {
                    for class in class.split_whitespace() {
                        list.push(class);
                    }
                }
            }
            _ => {}
        }

        list
    }
}

fn modifier_value(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Ordered, de-duplicated class tokens.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClassList {
    classes: Vec<String>,
}

impl ClassList {
    /// Append a class unless it is already present.
    pub fn push(&mut self, class: &str) {
        if !class.is_empty() && !self.contains(class) {
            self.classes.push(class.to_string());
        }
    }

    /// Whether the list contains a class.
    #[must_use]
    pub fn contains(&self, class: &str) -> bool {
        self.classes.iter().any(|c| c == class)
    }

    /// Classes in order.
    #[must_use]
    pub fn as_slice(&self) -> &[String] {
        &self.classes
    }

    /// Number of classes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.classes.len()
    }

    /// Whether the list is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }
}

impl fmt::Display for ClassList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.classes.join(" "))
    }
}
