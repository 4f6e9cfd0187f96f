//! Layered stylesheet assembly.
//!
//! The output stylesheet declares the cascade layers up front, then the
//! token block, then each layer's sources wrapped in `@layer <name> { … }`.
//! Sources within a layer are concatenated in sorted path order.

use std::{
    fs,
    path::{Path, PathBuf},
};

use tessera_core::Config;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Cascade layers, lowest precedence first.
pub const LAYERS: [&str; 5] = ["reset", "base", "components", "utilities", "overrides"];

/// Stylesheet assembly errors.
#[derive(Debug, Error)]
pub enum StyleError {
    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Directory traversal failed.
    #[error("failed to read {}: {message}", .path.display())]
    Walk { path: PathBuf, message: String },
}

/// Result type for stylesheet operations.
pub type Result<T> = std::result::Result<T, StyleError>;

/// A CSS source of one layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayerSource {
    /// Label written above the source, relative to its directory.
    pub label: String,
    pub path: PathBuf,
}

/// Collects layer sources from the project directories.
#[derive(Debug, Clone)]
pub struct StylesheetAssembler {
    styles_dir: PathBuf,
    utilities_dir: PathBuf,
    fragment_dirs: Vec<PathBuf>,
}

impl StylesheetAssembler {
    #[must_use]
    pub fn new(
        styles_dir: impl Into<PathBuf>,
        utilities_dir: impl Into<PathBuf>,
        fragment_dirs: Vec<PathBuf>,
    ) -> Self {
        Self {
            styles_dir: styles_dir.into(),
            utilities_dir: utilities_dir.into(),
            fragment_dirs,
        }
    }

    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        Self::new(config.styles_dir(), config.utilities_dir(), config.fragment_dirs())
    }

    /// Sources of one layer.
    ///
    /// The `components` layer also takes stylesheets that sit next to a
    /// fragment template, after the ones in `styles/components`.
    pub fn layer_sources(&self, layer: &str) -> Result<Vec<LayerSource>> {
        match layer {
            "utilities" => css_files(&self.utilities_dir, |_| true),
            "components" => {
                let mut sources = css_files(&self.styles_dir.join(layer), |_| true)?;
                for dir in &self.fragment_dirs {
                    sources.extend(css_files(dir, |path| path.with_extension("html").is_file())?);
                }
                Ok(sources)
            }
            _ => css_files(&self.styles_dir.join(layer), |_| true),
        }
    }

    /// Assemble the full stylesheet around compiled token CSS.
    pub fn assemble(&self, tokens_css: &str) -> Result<String> {
        let mut css = format!("@layer {};\n\n", LAYERS.join(", "));
        css.push_str(tokens_css);

        for layer in LAYERS {
            let sources = self.layer_sources(layer)?;
            if sources.is_empty() {
                debug!(layer, "no sources for layer");
                continue;
            }

            css.push_str(&format!("\n@layer {layer} {{\n"));
            for source in &sources {
                let content = fs::read_to_string(&source.path)?;
                css.push_str(&format!("/* {} */\n", source.label));
                css.push_str(content.trim_end());
                css.push('\n');
            }
            css.push_str("}\n");
            debug!(layer, count = sources.len(), "assembled layer");
        }

        Ok(css)
    }

    /// Assemble and write to `stylesheet` under `output_dir`.
    pub fn emit(&self, tokens_css: &str, output_dir: &Path, stylesheet: &str) -> Result<usize> {
        let css = self.assemble(tokens_css)?;
        let path = output_dir.join(stylesheet);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, &css)?;
        info!(path = %path.display(), bytes = css.len(), "wrote stylesheet");
        Ok(css.len())
    }
}

/// `.css` files under `dir` accepted by `keep`, sorted by path.
fn css_files(dir: &Path, keep: impl Fn(&Path) -> bool) -> Result<Vec<LayerSource>> {
    if !dir.is_dir() {
        if dir.exists() {
            warn!(path = %dir.display(), "stylesheet source is not a directory, skipping");
        }
        return Ok(Vec::new());
    }

    let mut sources = Vec::new();
    for entry in walkdir::WalkDir::new(dir).sort_by_file_name() {
        let entry = entry.map_err(|e| StyleError::Walk {
            path: dir.to_path_buf(),
            message: e.to_string(),
        })?;
        let path = entry.path();
        if !entry.file_type().is_file() || path.extension().and_then(|e| e.to_str()) != Some("css") {
            continue;
        }
        if !keep(path) {
            continue;
        }
        let label = path
            .strip_prefix(dir)
            .unwrap_or(path)
            .to_string_lossy()
            .replace('\\', "/");
        sources.push(LayerSource {
            label,
            path: path.to_path_buf(),
        });
    }
    Ok(sources)
}
