//! Design token definitions.
//!
//! A token file is a mapping of categories to (possibly nested) groups of
//! named values:
//!
//! ```toml
//! [color]
//! primary = "#3b82f6"
//! neutral = { 100 = "#f1f5f9", 900 = "#0f172a" }
//!
//! [spacing]
//! sm = "0.5rem"
//! ```
//!
//! Nested group names are joined with `-`, so the example yields
//! `color/neutral-100`. A table with a `value` (or `$value`) key is a single
//! token rather than a group.

use std::{collections::HashMap, path::Path};

use serde_json::Value;

use crate::{
    decl::{DeclFormat, read_value},
    error::{CoreError, Result},
};

/// A single design token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub category: String,
    pub name: String,
    pub value: String,
}

/// Tokens of one category, in file order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenCategory {
    pub name: String,
    pub tokens: Vec<Token>,
}

/// All tokens of a definition file, grouped by category in file order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TokenSet {
    categories: Vec<TokenCategory>,
}

impl TokenSet {
    /// Load a token file; the format is chosen by extension.
    pub fn load(path: &Path) -> Result<Self> {
        let format = DeclFormat::from_path(path)?;
        let content = std::fs::read_to_string(path)?;
        Self::parse(&content, format, path)
    }

    /// Parse token definitions from a string.
    pub fn parse(content: &str, format: DeclFormat, path: &Path) -> Result<Self> {
        let root = read_value(content, format, path)?;
        Self::from_value(&root, path)
    }

    /// Build a token set from an already-deserialized value.
    pub fn from_value(root: &Value, path: &Path) -> Result<Self> {
        let Value::Object(categories) = root else {
            return Err(CoreError::parse(path, "token file must be a table of categories"));
        };

        let mut set = TokenSet::default();
        // Flattened `category/name` to the key it came from.
        let mut seen: HashMap<String, String> = HashMap::new();
        for (category, group) in categories {
            let Value::Object(group) = group else {
                return Err(CoreError::parse(
                    path,
                    format!("token category `{category}` must be a table"),
                ));
            };

            let mut leaves = Vec::new();
            for (name, value) in group {
                flatten(&kebab(name), &format!("{category}.{name}"), value, &mut leaves, path)?;
            }

            let category_name = kebab(category);
            let mut tokens = Vec::with_capacity(leaves.len());
            for (name, key, value) in leaves {
                let flat = format!("{category_name}/{name}");
                if let Some(first) = seen.insert(flat.clone(), key.clone()) {
                    return Err(CoreError::parse(
                        path,
                        format!("token keys `{first}` and `{key}` both become `{flat}`"),
                    ));
                }
                tokens.push(Token {
                    category: category_name.clone(),
                    name,
                    value,
                });
            }

            // Categories that kebab to the same name share one group.
            match set.categories.iter_mut().find(|c| c.name == category_name) {
                Some(existing) => existing.tokens.extend(tokens),
                None => set.categories.push(TokenCategory {
                    name: category_name,
                    tokens,
                }),
            }
        }

        Ok(set)
    }

    /// Categories in file order.
    #[must_use]
    pub fn categories(&self) -> &[TokenCategory] {
        &self.categories
    }

    /// Iterate every token in file order.
    pub fn iter(&self) -> impl Iterator<Item = &Token> {
        self.categories.iter().flat_map(|c| c.tokens.iter())
    }

    /// Total number of tokens.
    #[must_use]
    pub fn len(&self) -> usize {
        self.categories.iter().map(|c| c.tokens.len()).sum()
    }

    /// Whether the set holds no tokens.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Look up a token value by category and flattened name.
    #[must_use]
    pub fn get(&self, category: &str, name: &str) -> Option<&str> {
        self.iter()
            .find(|t| t.category == category && t.name == name)
            .map(|t| t.value.as_str())
    }
}

/// Collect `(flattened name, source key, value)` leaves.
fn flatten(
    name: &str,
    key: &str,
    value: &Value,
    out: &mut Vec<(String, String, String)>,
    path: &Path,
) -> Result<()> {
    match value {
        Value::Object(map) => {
            if let Some(leaf) = map.get("value").or_else(|| map.get("$value")) {
                return flatten(name, key, leaf, out, path);
            }
            for (inner_key, inner) in map {
                flatten(
                    &format!("{name}-{}", kebab(inner_key)),
                    &format!("{key}.{inner_key}"),
                    inner,
                    out,
                    path,
                )?;
            }
            Ok(())
        }
        Value::Null => Err(CoreError::parse(path, format!("token `{key}` has no value"))),
        other => {
            out.push((name.to_string(), key.to_string(), scalar(other)));
            Ok(())
        }
    }
}

fn scalar(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        // Font stacks and shadow lists.
        Value::Array(items) => items.iter().map(scalar).collect::<Vec<_>>().join(", "),
        other => other.to_string(),
    }
}

/// Convert `camelCase`, `snake_case` and spaced names to kebab-case.
#[must_use]
pub fn kebab(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 4);
    let mut prev_lower = false;
    for ch in name.chars() {
        if ch == '_' || ch == ' ' {
            out.push('-');
            prev_lower = false;
        } else if ch.is_ascii_uppercase() {
            if prev_lower {
                out.push('-');
            }
            out.push(ch.to_ascii_lowercase());
            prev_lower = false;
        } else {
            out.push(ch);
            prev_lower = ch.is_ascii_lowercase() || ch.is_ascii_digit();
        }
    }
    out
}
