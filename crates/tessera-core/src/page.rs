//! Page content declarations.
//!
//! A page declaration names a document title and a root content node. Every
//! node either invokes a fragment with props and ordered children, or is a
//! plain text leaf.

use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::{
    decl::{DeclFormat, read_value},
    error::{CoreError, Result},
};

/// One declared page; maps 1:1 to an output document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PageDecl {
    /// Document title.
    pub title: String,

    /// Document language; falls back to `project.lang`.
    #[serde(default)]
    pub lang: Option<String>,

    /// Meta description.
    #[serde(default)]
    pub description: Option<String>,

    /// Root of the content tree.
    pub root: ContentNode,
}

/// A node of a page content tree.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ContentNode {
    /// Fragment to invoke.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fragment: Option<String>,

    /// Text content, HTML-escaped on output.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,

    /// Props passed to the fragment.
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub props: Map<String, Value>,

    /// Child nodes, rendered in order as the fragment's child content.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<ContentNode>,
}

/// What a validated node does.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind<'a> {
    Fragment(&'a str),
    Text(&'a str),
}

impl ContentNode {
    /// Create a fragment node.
    #[must_use]
    pub fn fragment(name: impl Into<String>) -> Self {
        Self {
            fragment: Some(name.into()),
            ..Self::default()
        }
    }

    /// Create a text node.
    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            ..Self::default()
        }
    }

    /// Add a prop.
    #[must_use]
    pub fn with_prop(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.props.insert(key.into(), value.into());
        self
    }

    /// Append a child node.
    #[must_use]
    pub fn with_child(mut self, child: ContentNode) -> Self {
        self.children.push(child);
        self
    }

    /// The node kind. Only meaningful after `validate`.
    #[must_use]
    pub fn kind(&self) -> NodeKind<'_> {
        match (&self.fragment, &self.text) {
            (Some(name), _) => NodeKind::Fragment(name),
            (None, Some(text)) => NodeKind::Text(text),
            (None, None) => NodeKind::Text(""),
        }
    }

    fn validate(&self, at: &str, path: &Path) -> Result<()> {
        match (&self.fragment, &self.text) {
            (Some(_), Some(_)) => {
                return Err(CoreError::parse(
                    path,
                    format!("{at}: a node sets either `fragment` or `text`, not both"),
                ));
            }
            (None, None) => {
                return Err(CoreError::parse(
                    path,
                    format!("{at}: node needs a `fragment` or `text`"),
                ));
            }
            (Some(name), None) if name.trim().is_empty() => {
                return Err(CoreError::parse(path, format!("{at}: empty fragment name")));
            }
            (None, Some(_)) if !self.props.is_empty() || !self.children.is_empty() => {
                return Err(CoreError::parse(
                    path,
                    format!("{at}: text nodes take no props or children"),
                ));
            }
            _ => {}
        }

        for (i, child) in self.children.iter().enumerate() {
            child.validate(&format!("{at}.children[{i}]"), path)?;
        }
        Ok(())
    }
}

impl PageDecl {
    /// Load a page declaration; the format is chosen by extension.
    pub fn load(path: &Path) -> Result<Self> {
        let format = DeclFormat::from_path(path)?;
        let content = std::fs::read_to_string(path)?;
        Self::parse(&content, format, path)
    }

    /// Parse and validate a page declaration.
    pub fn parse(content: &str, format: DeclFormat, path: &Path) -> Result<Self> {
        let page: PageDecl = read_value(content, format, path)?;
        page.validate(path)?;
        Ok(page)
    }

    /// Validate structure: a non-empty title and a fragment root.
    pub fn validate(&self, path: &Path) -> Result<()> {
        if self.title.trim().is_empty() {
            return Err(CoreError::parse(path, "title is required"));
        }
        if self.root.fragment.is_none() {
            return Err(CoreError::parse(path, "root: the root node must invoke a fragment"));
        }
        self.root.validate("root", path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const HOME: &str = r#"
title: Home
description: Landing page
root:
  fragment: page-shell
  props:
    heading: Welcome
  children:
    - fragment: button
      props: { label: Go, size: lg }
    - text: "Fish & chips"
"#;

    #[test]
    fn test_parse_yaml_page() {
        let page = PageDecl::parse(HOME, DeclFormat::Yaml, Path::new("home.yaml")).expect("parse");

        assert_eq!(page.title, "Home");
        assert_eq!(page.description.as_deref(), Some("Landing page"));
        assert!(page.lang.is_none());
        assert_eq!(page.root.kind(), NodeKind::Fragment("page-shell"));
        assert_eq!(page.root.children.len(), 2);
        assert_eq!(page.root.children[1].kind(), NodeKind::Text("Fish & chips"));
    }

    #[test]
    fn test_props_keep_declaration_order() {
        let json = r#"{"title": "T", "root": {"fragment": "x", "props": {"z": 1, "a": 2, "m": 3}}}"#;
        let page = PageDecl::parse(json, DeclFormat::Json, Path::new("t.json")).expect("parse");
        let keys: Vec<_> = page.root.props.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["z", "a", "m"]);
    }

    #[test]
    fn test_toml_page() {
        let toml = r#"
title = "About"
lang = "fr"

[root]
fragment = "article"

[[root.children]]
text = "Bonjour"
"#;
        let page = PageDecl::parse(toml, DeclFormat::Toml, Path::new("about.toml")).expect("parse");
        assert_eq!(page.lang.as_deref(), Some("fr"));
        assert_eq!(page.root.children[0].kind(), NodeKind::Text("Bonjour"));
    }

    #[test]
    fn test_node_with_fragment_and_text_rejected() {
        let yaml = "title: T\nroot:\n  fragment: a\n  children:\n    - fragment: b\n      text: c\n";
        let err = PageDecl::parse(yaml, DeclFormat::Yaml, Path::new("t.yaml")).unwrap_err();
        assert!(err.to_string().contains("root.children[0]"));
    }

    #[test]
    fn test_text_root_rejected() {
        let yaml = "title: T\nroot:\n  text: hello\n";
        let err = PageDecl::parse(yaml, DeclFormat::Yaml, Path::new("t.yaml")).unwrap_err();
        assert!(err.to_string().contains("must invoke a fragment"));
    }

    #[test]
    fn test_unknown_field_rejected() {
        let yaml = "title: T\nroot:\n  fragmnet: a\n";
        assert!(PageDecl::parse(yaml, DeclFormat::Yaml, Path::new("t.yaml")).is_err());
    }

    #[test]
    fn test_missing_title_rejected() {
        let yaml = "title: ''\nroot:\n  fragment: a\n";
        let err = PageDecl::parse(yaml, DeclFormat::Yaml, Path::new("t.yaml")).unwrap_err();
        assert!(err.to_string().contains("title is required"));
    }

    #[test]
    fn test_builder_helpers() {
        let node = ContentNode::fragment("card")
            .with_prop("title", "Hi")
            .with_child(ContentNode::text("body"));
        assert_eq!(node.props["title"], Value::from("Hi"));
        assert_eq!(node.children.len(), 1);
    }
}
