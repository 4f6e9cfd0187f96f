//! Build orchestration.
//!
//! A build walks a fixed sequence of states:
//! `idle → cleaning → tokens → styles → pages → assets → done`.
//! A failing stage moves the builder to `error` and reports the stage with
//! the failure; the caller decides between exiting and waiting for the next
//! change.

use std::{fmt, fs, path::PathBuf, time::Instant};

use tessera_core::{Config, CoreError, TokenSet};
use tessera_template::{FragmentRegistry, TemplateError, load_dirs};
use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::{
    assets::{AssetCopier, AssetError},
    pages::{PageError, PageRenderer, check_outputs, discover_pages, resolve},
    styles::{StyleError, StylesheetAssembler},
    tokens::{TokenCompiler, TokenError},
};

/// Build errors.
#[derive(Debug, Error)]
pub enum BuildError {
    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration or declaration error.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// Fragment loading or registration error.
    #[error(transparent)]
    Template(#[from] TemplateError),

    /// Token compilation error.
    #[error("token error: {0}")]
    Tokens(#[from] TokenError),

    /// Stylesheet assembly error.
    #[error("stylesheet error: {0}")]
    Styles(#[from] StyleError),

    /// Page rendering error.
    #[error("page error: {0}")]
    Pages(#[from] PageError),

    /// Asset error.
    #[error("asset error: {0}")]
    Asset(#[from] AssetError),
}

/// Result type for build operations.
pub type Result<T> = std::result::Result<T, BuildError>;

/// Position of a build in its pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BuildState {
    Idle,
    Cleaning,
    Tokens,
    Styles,
    Pages,
    Assets,
    Done,
    Error,
}

impl BuildState {
    /// Stage names as used in logs and errors.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Cleaning => "cleaning",
            Self::Tokens => "tokens",
            Self::Styles => "styles",
            Self::Pages => "pages",
            Self::Assets => "assets",
            Self::Done => "done",
            Self::Error => "error",
        }
    }

    /// The state a successful stage advances to.
    #[must_use]
    pub fn next(self) -> Option<Self> {
        match self {
            Self::Idle => Some(Self::Cleaning),
            Self::Cleaning => Some(Self::Tokens),
            Self::Tokens => Some(Self::Styles),
            Self::Styles => Some(Self::Pages),
            Self::Pages => Some(Self::Assets),
            Self::Assets => Some(Self::Done),
            Self::Done | Self::Error => None,
        }
    }
}

impl fmt::Display for BuildState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A stage failure, tagged with the stage it happened in.
#[derive(Debug, Error)]
#[error("{stage} stage failed: {source}")]
pub struct StageError {
    pub stage: BuildState,
    #[source]
    pub source: BuildError,
}

/// Build statistics.
#[derive(Debug, Clone, Default)]
pub struct BuildReport {
    /// Number of design tokens compiled.
    pub tokens: usize,

    /// Size of the assembled stylesheet.
    pub stylesheet_bytes: usize,

    /// Number of fragments registered.
    pub fragments: usize,

    /// Number of documents written.
    pub pages: usize,

    /// Number of assets copied.
    pub assets: usize,

    /// Number of font files copied.
    pub fonts: usize,

    /// Build duration in milliseconds.
    pub duration_ms: u64,

    /// States entered, in order.
    pub states: Vec<BuildState>,
}

/// Result of a validation-only pass.
#[derive(Debug, Clone, Default)]
pub struct CheckReport {
    pub tokens: usize,
    pub fragments: usize,
    pub pages: usize,
    /// Non-fatal findings such as tier inversions.
    pub warnings: Vec<String>,
}

/// Runs the build pipeline for one project.
#[derive(Debug)]
pub struct Builder {
    config: Config,
    state: BuildState,
}

impl Builder {
    /// Create a new builder.
    #[must_use]
    pub fn new(config: Config) -> Self {
        Self {
            config,
            state: BuildState::Idle,
        }
    }

    /// Override the output directory.
    #[must_use]
    pub fn with_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.paths.output = dir.into();
        self
    }

    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Current state.
    #[must_use]
    pub fn state(&self) -> BuildState {
        self.state
    }

    /// Return to `idle` after a finished or failed build.
    pub fn reset(&mut self) {
        self.state = BuildState::Idle;
    }

    /// Execute the full build process.
    pub fn build(&mut self) -> std::result::Result<BuildReport, StageError> {
        let start = Instant::now();
        self.state = BuildState::Idle;
        let mut report = BuildReport {
            states: vec![BuildState::Idle],
            ..BuildReport::default()
        };

        info!(
            root = %self.config.root().display(),
            output = %self.config.output_dir().display(),
            "starting build"
        );

        self.stage(BuildState::Cleaning, &mut report, |b| b.clean())?;
        let (tokens, tokens_css) = self.stage(BuildState::Tokens, &mut report, |b| b.build_tokens())?;
        report.tokens = tokens.len();
        report.stylesheet_bytes = self.stage(BuildState::Styles, &mut report, |b| {
            b.build_styles(&tokens_css)
        })?;
        let (fragments, pages) = self.stage(BuildState::Pages, &mut report, |b| b.build_pages())?;
        report.fragments = fragments;
        report.pages = pages;
        let (assets, fonts) = self.stage(BuildState::Assets, &mut report, |b| b.copy_assets())?;
        report.assets = assets;
        report.fonts = fonts;

        self.state = BuildState::Done;
        report.states.push(BuildState::Done);
        report.duration_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX);

        info!(
            tokens = report.tokens,
            fragments = report.fragments,
            pages = report.pages,
            assets = report.assets,
            fonts = report.fonts,
            duration_ms = report.duration_ms,
            "build complete"
        );

        Ok(report)
    }

    /// Enter `stage` and run it, moving to `error` on failure.
    fn stage<T>(
        &mut self,
        stage: BuildState,
        report: &mut BuildReport,
        run: impl FnOnce(&Self) -> Result<T>,
    ) -> std::result::Result<T, StageError> {
        self.state = stage;
        report.states.push(stage);
        debug!(%stage, "entering stage");

        match run(self) {
            Ok(value) => Ok(value),
            Err(source) => {
                self.state = BuildState::Error;
                report.states.push(BuildState::Error);
                error!(%stage, error = %source, "build failed");
                Err(StageError { stage, source })
            }
        }
    }

    /// Remove and recreate the output directory.
    ///
    /// The configuration is validated first, so an output directory that
    /// contains the project or its inputs is never removed.
    pub fn clean(&self) -> Result<()> {
        self.config.validate()?;
        let output = self.config.output_dir();
        if output.exists() {
            debug!(dir = %output.display(), "cleaning output directory");
            fs::remove_dir_all(&output)?;
        }
        fs::create_dir_all(&output)?;
        Ok(())
    }

    /// Load tokens and write `css/tokens.css`.
    pub fn build_tokens(&self) -> Result<(TokenSet, String)> {
        let tokens = TokenSet::load(&self.config.tokens_path())?;
        let css = self.token_compiler().emit(&tokens, &self.config.output_dir())?;
        Ok((tokens, css))
    }

    /// Assemble the layered stylesheet; returns its size.
    pub fn build_styles(&self, tokens_css: &str) -> Result<usize> {
        Ok(StylesheetAssembler::from_config(&self.config).emit(
            tokens_css,
            &self.config.output_dir(),
            &self.config.build.stylesheet,
        )?)
    }

    /// Load every fragment into a fresh registry and check dependencies.
    pub fn load_registry(&self) -> Result<FragmentRegistry> {
        let mut registry = FragmentRegistry::new();
        load_dirs(&mut registry, &self.config.fragment_dirs())?;
        registry.validate()?;
        Ok(registry)
    }

    /// Render and write all pages; returns fragment and page counts.
    pub fn build_pages(&self) -> Result<(usize, usize)> {
        let registry = self.load_registry()?;
        let pages = discover_pages(&self.config.pages_dir())?;
        let written = PageRenderer::from_config(&self.config).emit(
            &registry,
            &pages,
            &self.config.output_dir(),
        )?;
        Ok((registry.len(), written))
    }

    /// Copy assets and fonts; returns both counts.
    pub fn copy_assets(&self) -> Result<(usize, usize)> {
        let output = self.config.output_dir();
        let assets = AssetCopier::new(self.config.assets_dir(), output.join("assets")).copy()?;
        let fonts = AssetCopier::new(self.config.fonts_dir(), output.join("fonts")).copy()?;
        Ok((assets, fonts))
    }

    /// Load and validate every input without writing output.
    pub fn check(&self) -> Result<CheckReport> {
        let tokens = TokenSet::load(&self.config.tokens_path())?;
        self.token_compiler().compile(&tokens)?;

        let registry = self.load_registry()?;
        let pages = discover_pages(&self.config.pages_dir())?;
        check_outputs(&pages)?;
        for page in &pages {
            resolve(&registry, &page.decl.root, "root").map_err(|(at, source)| {
                PageError::Resolve {
                    page: page.relative.clone(),
                    at,
                    source,
                }
            })?;
        }

        let warnings = registry.tier_warnings();
        for warning in &warnings {
            warn!("{warning}");
        }

        Ok(CheckReport {
            tokens: tokens.len(),
            fragments: registry.len(),
            pages: pages.len(),
            warnings,
        })
    }

    fn token_compiler(&self) -> TokenCompiler {
        TokenCompiler::new(self.config.build.token_prefix.clone())
    }
}
