//! Loading fragment templates from disk.

use std::{
    fs,
    path::{Path, PathBuf},
};

use serde::Deserialize;
use tessera_core::frontmatter::parse_frontmatter;
use tracing::{debug, info};

use crate::{
    classes::ClassRules,
    error::Result,
    fragment::{FragmentDef, Tier},
    props::Props,
    registry::FragmentRegistry,
    syntax::Template,
};

/// Template file extension.
pub const FRAGMENT_EXTENSION: &str = "html";

/// Front matter of a fragment file.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FragmentMeta {
    /// Overrides the name derived from the file path.
    #[serde(default)]
    pub name: Option<String>,

    #[serde(default)]
    pub tier: Tier,

    /// Dependencies in addition to the ones invoked in the body.
    #[serde(default)]
    pub depends: Vec<String>,

    #[serde(default)]
    pub classes: ClassRules,

    #[serde(default)]
    pub defaults: Props,

    /// Documentation only; never rendered.
    #[serde(default)]
    pub description: Option<String>,
}

/// Parse a fragment file's content.
///
/// `name` is used unless the front matter sets one.
pub fn parse_fragment(content: &str, name: &str, path: &Path) -> Result<FragmentDef> {
    let (meta, body, body_line) = parse_frontmatter::<FragmentMeta>(content, path)?;
    let meta = meta.unwrap_or_default();

    let template = Template::parse(&body, path.display().to_string(), body_line)?;
    let invoked = template.invocations();
    let name = meta.name.unwrap_or_else(|| name.to_string());

    let def = FragmentDef::new(name, template)
        .with_tier(meta.tier)
        .with_defaults(meta.defaults)
        .with_classes(meta.classes)
        .with_dependencies(meta.depends)
        .with_dependencies(invoked);
    Ok(def)
}

/// Load one fragment file.
pub fn load_fragment(path: &Path, name: &str) -> Result<FragmentDef> {
    let content = fs::read_to_string(path)?;
    parse_fragment(&content, name, path)
}

/// Name derived from a path relative to its fragment directory.
///
/// `forms/input.html` becomes `forms/input`.
#[must_use]
pub fn fragment_name(relative: &Path) -> String {
    relative
        .with_extension("")
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

/// Register every fragment file under `dir`, in sorted path order.
///
/// Returns the number of fragments registered.
pub fn load_dir(registry: &mut FragmentRegistry, dir: &Path) -> Result<usize> {
    let mut count = 0;

    for entry in walkdir::WalkDir::new(dir).sort_by_file_name() {
        let entry = entry.map_err(std::io::Error::from)?;
        if !entry.file_type().is_file() {
            continue;
        }
        let path = entry.path();
        if path.extension().and_then(|e| e.to_str()) != Some(FRAGMENT_EXTENSION) {
            continue;
        }

        let relative = path.strip_prefix(dir).unwrap_or(path);
        let def = load_fragment(path, &fragment_name(relative))?;
        debug!(fragment = %def.name, path = %path.display(), "loaded fragment");
        registry.register(def)?;
        count += 1;
    }

    Ok(count)
}

/// Register fragments from several directories; missing ones are skipped.
pub fn load_dirs(registry: &mut FragmentRegistry, dirs: &[PathBuf]) -> Result<usize> {
    let mut count = 0;
    for dir in dirs {
        if !dir.is_dir() {
            debug!(dir = %dir.display(), "fragment directory not found, skipping");
            continue;
        }
        count += load_dir(registry, dir)?;
    }
    info!("loaded {count} fragments");
    Ok(count)
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use tempfile::TempDir;

    use super::*;
    use crate::error::TemplateError;

    fn write(root: &Path, rel: &str, content: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().expect("parent")).expect("mkdir");
        fs::write(path, content).expect("write");
    }

    const BUTTON: &str = r#"+++
tier = "atom"
description = "Clickable button"

[classes]
base = "btn"
modifiers = ["variant", "size"]

[defaults]
variant = "default"
size = "md"
label = ""
a11y = {}
+++
<button class="{{ @classes }}"{{ @a11y }}>{{ label }}</button>
"#;

    #[test]
    fn test_parse_fragment_with_toml_frontmatter() {
        let def = parse_fragment(BUTTON, "button", Path::new("elements/button.html")).expect("parse");
        assert_eq!(def.name, "button");
        assert_eq!(def.tier, Tier::Atom);
        assert_eq!(def.classes.base.as_deref(), Some("btn"));
        assert_eq!(def.defaults["size"], json!("md"));
        assert!(def.dependencies.is_empty());
    }

    #[test]
    fn test_yaml_frontmatter_and_invoked_dependencies() {
        let content = "---\nname: site-card\ntier: molecule\ndepends: [badge]\n---\n<div>{{> button }}{{> badge }}</div>\n";
        let def = parse_fragment(content, "card", Path::new("partials/card.html")).expect("parse");
        assert_eq!(def.name, "site-card");
        assert_eq!(def.tier, Tier::Molecule);
        assert_eq!(def.dependencies, vec!["badge", "button"]);
    }

    #[test]
    fn test_syntax_error_reports_file_line() {
        let content = "---\ntier: atom\n---\n<p>\n{{#if x}}\n</p>\n";
        let err = parse_fragment(content, "broken", Path::new("elements/broken.html")).unwrap_err();
        let TemplateError::Syntax { location, .. } = err else {
            panic!("expected syntax error");
        };
        assert!(location.source.ends_with("broken.html"));
        assert_eq!(location.line, 5);
    }

    #[test]
    fn test_unknown_frontmatter_key_rejected() {
        let content = "---\ncolour: red\n---\n<p></p>\n";
        assert!(matches!(
            parse_fragment(content, "p", Path::new("p.html")),
            Err(TemplateError::Core(_))
        ));
    }

    #[test]
    fn test_fragment_name_from_nested_path() {
        assert_eq!(fragment_name(Path::new("forms/input.html")), "forms/input");
        assert_eq!(fragment_name(Path::new("button.html")), "button");
    }

    #[test]
    fn test_load_dirs_registers_and_renders() {
        let dir = TempDir::new().expect("tempdir");
        write(dir.path(), "elements/button.html", BUTTON);
        write(dir.path(), "elements/button.css", ".btn { color: red; }");
        write(dir.path(), "elements/notes.txt", "ignored");
        write(
            dir.path(),
            "partials/toolbar.html",
            "---\ntier: molecule\n---\n<nav>{{> button label=\"Go\" size=\"lg\" }}</nav>",
        );

        let mut registry = FragmentRegistry::new();
        let dirs = vec![
            dir.path().join("elements"),
            dir.path().join("partials"),
            dir.path().join("missing"),
        ];
        let count = load_dirs(&mut registry, &dirs).expect("load");
        assert_eq!(count, 2);
        registry.validate().expect("valid");

        assert!(registry.lookup("button").is_some());

        let html = registry.render("toolbar", &Props::new(), None).expect("render");
        assert_eq!(html, "<nav><button class=\"btn btn-lg\">Go</button>\n</nav>");
    }
}
