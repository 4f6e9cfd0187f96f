//! Project configuration management.

use std::path::{Component, Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, Result};

/// Main configuration structure for Tessera.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Project-wide settings.
    pub project: ProjectConfig,

    /// Input and output locations.
    #[serde(default)]
    pub paths: PathsConfig,

    /// Build settings.
    #[serde(default)]
    pub build: BuildConfig,

    /// Watch mode settings.
    #[serde(default)]
    pub watch: WatchConfig,

    /// Directory relative paths are resolved against.
    #[serde(skip)]
    root: PathBuf,
}

/// Project-wide configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectConfig {
    /// Project name, used as the document title suffix.
    pub name: String,

    /// Default document language.
    #[serde(default = "default_lang")]
    pub lang: String,

    /// Default meta description for documents that do not set one.
    #[serde(default)]
    pub description: Option<String>,
}

/// Input and output locations, relative to the project root.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathsConfig {
    /// Design token definition file.
    #[serde(default = "default_tokens")]
    pub tokens: PathBuf,

    /// Page declaration directory.
    #[serde(default = "default_pages")]
    pub pages: PathBuf,

    /// Fragment template directories, loaded in order.
    #[serde(default = "default_fragments")]
    pub fragments: Vec<PathBuf>,

    /// Stylesheet layer directory (`reset/`, `base/`, `components/`, `overrides/`).
    #[serde(default = "default_styles")]
    pub styles: PathBuf,

    /// Utility stylesheet directory.
    #[serde(default = "default_utilities")]
    pub utilities: PathBuf,

    /// Font directory.
    #[serde(default = "default_fonts")]
    pub fonts: PathBuf,

    /// Opaque static asset directory.
    #[serde(default = "default_assets")]
    pub assets: PathBuf,

    /// Output directory, fully regenerated on every build.
    #[serde(default = "default_output")]
    pub output: PathBuf,
}

/// Build configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildConfig {
    /// Stylesheet path inside the output directory.
    #[serde(default = "default_stylesheet")]
    pub stylesheet: String,

    /// Optional prefix for emitted custom properties (`--<prefix>-color-primary`).
    #[serde(default)]
    pub token_prefix: Option<String>,
}

/// Watch mode configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WatchConfig {
    /// Quiet period after a change event before rebuilding, in milliseconds.
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,
}

// Default value functions
fn default_lang() -> String {
    "en".to_string()
}

fn default_tokens() -> PathBuf {
    PathBuf::from("tokens.toml")
}

fn default_pages() -> PathBuf {
    PathBuf::from("pages")
}

fn default_fragments() -> Vec<PathBuf> {
    vec![PathBuf::from("elements"), PathBuf::from("partials")]
}

fn default_styles() -> PathBuf {
    PathBuf::from("styles")
}

fn default_utilities() -> PathBuf {
    PathBuf::from("utilities")
}

fn default_fonts() -> PathBuf {
    PathBuf::from("fonts")
}

fn default_assets() -> PathBuf {
    PathBuf::from("assets")
}

fn default_output() -> PathBuf {
    PathBuf::from("dist")
}

fn default_stylesheet() -> String {
    "css/main.css".to_string()
}

fn default_debounce_ms() -> u64 {
    100
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            tokens: default_tokens(),
            pages: default_pages(),
            fragments: default_fragments(),
            styles: default_styles(),
            utilities: default_utilities(),
            fonts: default_fonts(),
            assets: default_assets(),
            output: default_output(),
        }
    }
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            stylesheet: default_stylesheet(),
            token_prefix: None,
        }
    }
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            debounce_ms: default_debounce_ms(),
        }
    }
}

impl Config {
    /// Create a configuration with default paths rooted at `root`.
    #[must_use]
    pub fn with_root(name: impl Into<String>, root: impl Into<PathBuf>) -> Self {
        Self {
            project: ProjectConfig {
                name: name.into(),
                lang: default_lang(),
                description: None,
            },
            paths: PathsConfig::default(),
            build: BuildConfig::default(),
            watch: WatchConfig::default(),
            root: root.into(),
        }
    }

    /// Load configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(CoreError::config(format!(
                "Configuration file not found: {}",
                path.display()
            )));
        }

        let content = std::fs::read_to_string(path)?;
        let mut config: Config = toml::from_str(&content).map_err(|e| {
            CoreError::config_with_source(
                format!("Failed to parse config file: {}", path.display()),
                e,
            )
        })?;

        config.root = root_of(path);
        config.validate()?;
        Ok(config)
    }

    /// Load configuration with `TESSERA__SECTION__KEY` environment overrides.
    pub fn load_with_env(path: &Path) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::from(path))
            .add_source(config::Environment::with_prefix("TESSERA").separator("__"))
            .build()?;

        let mut config: Config = settings.try_deserialize()?;
        config.root = root_of(path);
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        if self.project.name.trim().is_empty() {
            return Err(CoreError::config("project.name cannot be empty"));
        }

        let stylesheet = Path::new(&self.build.stylesheet);
        if stylesheet.is_absolute() || !self.build.stylesheet.ends_with(".css") {
            return Err(CoreError::config(
                "build.stylesheet must be a relative path ending in .css",
            ));
        }

        // The output directory is wiped on every build.
        let root = normalize_path(&self.root)?;
        let output = normalize_path(&self.output_dir())?;
        if output == root || root.starts_with(&output) {
            return Err(CoreError::config(
                "paths.output must not be the project root or one of its parents",
            ));
        }
        let tokens = normalize_path(&self.tokens_path())?;
        if tokens.starts_with(&output) {
            return Err(CoreError::config(format!(
                "paths.output contains the token file {}",
                tokens.display()
            )));
        }
        for source in self.source_dirs() {
            let source = normalize_path(&source)?;
            if source.starts_with(&output) || output.starts_with(&source) {
                return Err(CoreError::config(format!(
                    "paths.output overlaps source directory {}",
                    source.display()
                )));
            }
        }

        if self.paths.fragments.is_empty() {
            tracing::warn!("paths.fragments is empty, no fragments will be loaded");
        }

        Ok(())
    }

    /// Project root directory.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve a configured path against the project root.
    #[must_use]
    pub fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.root.join(path)
        }
    }

    /// Token definition file.
    #[must_use]
    pub fn tokens_path(&self) -> PathBuf {
        self.resolve(&self.paths.tokens)
    }

    /// Page declaration directory.
    #[must_use]
    pub fn pages_dir(&self) -> PathBuf {
        self.resolve(&self.paths.pages)
    }

    /// Fragment template directories.
    #[must_use]
    pub fn fragment_dirs(&self) -> Vec<PathBuf> {
        self.paths.fragments.iter().map(|p| self.resolve(p)).collect()
    }

    /// Stylesheet layer directory.
    #[must_use]
    pub fn styles_dir(&self) -> PathBuf {
        self.resolve(&self.paths.styles)
    }

    /// Utility stylesheet directory.
    #[must_use]
    pub fn utilities_dir(&self) -> PathBuf {
        self.resolve(&self.paths.utilities)
    }

    /// Font directory.
    #[must_use]
    pub fn fonts_dir(&self) -> PathBuf {
        self.resolve(&self.paths.fonts)
    }

    /// Static asset directory.
    #[must_use]
    pub fn assets_dir(&self) -> PathBuf {
        self.resolve(&self.paths.assets)
    }

    /// Output directory.
    #[must_use]
    pub fn output_dir(&self) -> PathBuf {
        self.resolve(&self.paths.output)
    }

    /// Every input directory, in the order they are watched.
    #[must_use]
    pub fn source_dirs(&self) -> Vec<PathBuf> {
        let mut dirs = vec![self.fonts_dir()];
        dirs.extend(self.fragment_dirs());
        dirs.push(self.pages_dir());
        dirs.push(self.styles_dir());
        dirs.push(self.utilities_dir());
        dirs.push(self.assets_dir());
        dirs
    }
}

fn root_of(config_path: &Path) -> PathBuf {
    match config_path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

/// Make `path` absolute and fold `.` and `..` components lexically.
///
/// Symlinks are not resolved.
pub fn normalize_path(path: &Path) -> Result<PathBuf> {
    let absolute = std::path::absolute(path)?;
    let mut out = PathBuf::new();
    for component in absolute.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => match out.components().next_back() {
                Some(Component::Normal(_)) => {
                    out.pop();
                }
                Some(Component::RootDir | Component::Prefix(_)) => {}
                _ => out.push(component.as_os_str()),
            },
            other => out.push(other.as_os_str()),
        }
    }
    Ok(out)
}
