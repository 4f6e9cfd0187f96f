//! Frontmatter splitting and parsing for fragment source files.

use std::path::Path;

use serde::de::DeserializeOwned;

use crate::error::{CoreError, Result};

/// Delimiter types for frontmatter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrontmatterFormat {
    /// YAML frontmatter delimited by `---`.
    Yaml,
    /// TOML frontmatter delimited by `+++`.
    Toml,
}

impl FrontmatterFormat {
    /// Get the delimiter string for this format.
    pub fn delimiter(&self) -> &'static str {
        match self {
            Self::Yaml => "---",
            Self::Toml => "+++",
        }
    }
}

/// A source file split into its frontmatter block and body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Split<'a> {
    pub format: FrontmatterFormat,
    pub frontmatter: &'a str,
    pub body: &'a str,
    /// 1-based line of the first body character in the original source.
    pub body_line: usize,
}

/// Split content into frontmatter and body.
pub fn split_frontmatter(content: &str) -> Option<Split<'_>> {
    let leading = content.len() - content.trim_start().len();
    let trimmed = &content[leading..];

    let format = if trimmed.starts_with("---") {
        FrontmatterFormat::Yaml
    } else if trimmed.starts_with("+++") {
        FrontmatterFormat::Toml
    } else {
        return None;
    };

    let delimiter = format.delimiter();
    let after_first = &trimmed[delimiter.len()..];

    // The closing delimiter must stand alone on its line.
    let mut offset = after_first.find('\n')? + 1;
    let mut closing = None;
    for line in after_first[offset..].split_inclusive('\n') {
        if line.trim_end() == delimiter {
            closing = Some((offset, line.len()));
            break;
        }
        offset += line.len();
    }
    let (closing_pos, closing_len) = closing?;

    let frontmatter = after_first[..closing_pos].trim();
    let rest = &after_first[closing_pos + closing_len..];

    let body_offset = content.len() - rest.len();
    let body_line = content[..body_offset].matches('\n').count() + 1;

    Some(Split {
        format,
        frontmatter,
        body: rest,
        body_line,
    })
}

/// Parse frontmatter into `T`, returning it with the body and body line.
///
/// Content without a frontmatter block yields `None` and the whole content
/// as body starting at line 1.
pub fn parse_frontmatter<T: DeserializeOwned>(
    content: &str,
    path: &Path,
) -> Result<(Option<T>, String, usize)> {
    let Some(split) = split_frontmatter(content) else {
        return Ok((None, content.to_string(), 1));
    };

    let meta: T = match split.format {
        FrontmatterFormat::Yaml => serde_yaml::from_str(split.frontmatter)
            .map_err(|e| CoreError::frontmatter(path, e.to_string()))?,
        FrontmatterFormat::Toml => toml::from_str(split.frontmatter)
            .map_err(|e| CoreError::frontmatter(path, e.to_string()))?,
    };

    Ok((Some(meta), split.body.to_string(), split.body_line))
}

#[cfg(test)]
mod tests {
    use serde::Deserialize;

    use super::*;

    #[derive(Debug, Deserialize)]
    struct Meta {
        name: String,
        #[serde(default)]
        depends: Vec<String>,
    }

    #[test]
    fn test_split_yaml_frontmatter() {
        let content = "---\nname: card\n---\n<div class=\"card\"></div>";

        let split = split_frontmatter(content).expect("split");
        assert_eq!(split.format, FrontmatterFormat::Yaml);
        assert_eq!(split.frontmatter, "name: card");
        assert_eq!(split.body, "<div class=\"card\"></div>");
        assert_eq!(split.body_line, 4);
    }

    #[test]
    fn test_split_toml_frontmatter() {
        let content = "+++\nname = \"card\"\ndepends = [\"button\"]\n+++\n\n<div></div>";

        let split = split_frontmatter(content).expect("split");
        assert_eq!(split.format, FrontmatterFormat::Toml);
        assert!(split.frontmatter.contains("name ="));
        assert_eq!(split.body, "\n<div></div>");
        assert_eq!(split.body_line, 5);
    }

    #[test]
    fn test_delimiter_inside_value_is_not_closing() {
        let content = "---\ndescription: a---b\nname: rule\n---  \n<hr>";

        let split = split_frontmatter(content).expect("split");
        assert_eq!(split.frontmatter, "description: a---b\nname: rule");
        assert_eq!(split.body, "<hr>");
        assert_eq!(split.body_line, 5);
    }

    #[test]
    fn test_closing_delimiter_at_end_of_file() {
        let split = split_frontmatter("+++\nname = \"x\"\n+++").expect("split");
        assert_eq!(split.frontmatter, "name = \"x\"");
        assert_eq!(split.body, "");
    }

    #[test]
    fn test_no_frontmatter() {
        assert!(split_frontmatter("<span>{{ label }}</span>").is_none());
    }

    #[test]
    fn test_unclosed_frontmatter_is_body() {
        assert!(split_frontmatter("+++\nname = \"x\"\n<div>").is_none());
    }

    #[test]
    fn test_parse_toml_frontmatter() {
        let content = "+++\nname = \"card\"\ndepends = [\"button\"]\n+++\n<div></div>";
        let (meta, body, line) =
            parse_frontmatter::<Meta>(content, Path::new("card.html")).expect("parse");

        let meta = meta.expect("meta present");
        assert_eq!(meta.name, "card");
        assert_eq!(meta.depends, vec!["button"]);
        assert_eq!(body, "<div></div>");
        assert_eq!(line, 5);
    }

    #[test]
    fn test_parse_without_frontmatter() {
        let (meta, body, line) =
            parse_frontmatter::<Meta>("<hr>", Path::new("rule.html")).expect("parse");
        assert!(meta.is_none());
        assert_eq!(body, "<hr>");
        assert_eq!(line, 1);
    }

    #[test]
    fn test_parse_invalid_frontmatter() {
        let content = "+++\nname = \n+++\n<div></div>";
        let err = parse_frontmatter::<Meta>(content, Path::new("card.html")).unwrap_err();
        assert!(err.to_string().contains("card.html"));
    }
}
