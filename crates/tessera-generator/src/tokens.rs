//! Design token compilation to CSS custom properties.

use std::{
    fs,
    path::{Path, PathBuf},
};

use tessera_core::{Token, TokenSet};
use thiserror::Error;
use tracing::{debug, info};

/// Token output path inside the output directory.
pub const TOKENS_CSS: &str = "css/tokens.css";

/// Token compilation errors.
#[derive(Debug, Error)]
pub enum TokenError {
    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A value that would break out of its declaration.
    #[error("token `{name}` has an invalid value `{value}`")]
    InvalidValue { name: String, value: String },
}

/// Result type for token operations.
pub type Result<T> = std::result::Result<T, TokenError>;

/// Emits a token set as one `:root` block of custom properties.
#[derive(Debug, Clone, Default)]
pub struct TokenCompiler {
    prefix: Option<String>,
}

impl TokenCompiler {
    /// Create a compiler; `prefix` is prepended to every variable name.
    #[must_use]
    pub fn new(prefix: Option<String>) -> Self {
        Self {
            prefix: prefix.filter(|p| !p.trim().is_empty()),
        }
    }

    /// Custom property name for a token, e.g. `--color-primary`.
    #[must_use]
    pub fn variable_name(&self, token: &Token) -> String {
        match &self.prefix {
            Some(prefix) => format!("--{prefix}-{}-{}", token.category, token.name),
            None => format!("--{}-{}", token.category, token.name),
        }
    }

    /// Compile tokens to CSS, in file order.
    pub fn compile(&self, tokens: &TokenSet) -> Result<String> {
        let mut css = String::from(":root {\n");
        for token in tokens.iter() {
            let name = self.variable_name(token);
            if token.value.contains([';', '{', '}', '\n']) {
                return Err(TokenError::InvalidValue {
                    name,
                    value: token.value.clone(),
                });
            }
            css.push_str(&format!("  {name}: {};\n", token.value));
        }
        css.push_str("}\n");
        Ok(css)
    }

    /// Write compiled tokens to `css/tokens.css` under `output_dir`.
    pub fn write(&self, css: &str, output_dir: &Path) -> Result<PathBuf> {
        let path = output_dir.join(TOKENS_CSS);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, css)?;
        debug!(path = %path.display(), "wrote tokens");
        Ok(path)
    }

    /// Compile and write in one step, returning the CSS.
    pub fn emit(&self, tokens: &TokenSet, output_dir: &Path) -> Result<String> {
        let css = self.compile(tokens)?;
        self.write(&css, output_dir)?;
        info!(count = tokens.len(), "compiled design tokens");
        Ok(css)
    }
}
