//! Error types for fragment registration and rendering.

use std::{fmt, sync::Arc};

use tessera_core::CoreError;
use thiserror::Error;

/// Result type for registry operations.
pub type Result<T> = std::result::Result<T, TemplateError>;

/// A position inside a fragment template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceLocation {
    /// Source file, or the fragment name for inline templates.
    pub source: Arc<str>,
    /// 1-based line.
    pub line: usize,
    /// 1-based column, in characters.
    pub column: usize,
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.source, self.line, self.column)
    }
}

/// Registration, lookup and template loading errors.
#[derive(Debug, Error)]
pub enum TemplateError {
    /// A fragment with this name is already registered.
    #[error("fragment `{0}` is already registered")]
    DuplicateFragment(String),

    /// A fragment name did not resolve.
    #[error("unknown fragment `{name}`{}", referenced_by_suffix(.referenced_by))]
    UnknownFragment {
        name: String,
        referenced_by: Option<String>,
    },

    /// Registering would close a cycle in the dependency graph.
    #[error("cyclic fragment dependency: {}", .cycle.join(" -> "))]
    CyclicDependency { cycle: Vec<String> },

    /// Fragment names are non-empty and limited to `[A-Za-z0-9_./-]`.
    #[error("invalid fragment name `{0}`")]
    InvalidName(String),

    /// Malformed template source.
    #[error("syntax error at {location}: {message}")]
    Syntax {
        location: SourceLocation,
        message: String,
    },

    /// Rendering failed.
    #[error(transparent)]
    Render(#[from] RenderError),

    /// Loading a fragment file failed.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// Walking a fragment directory failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

fn referenced_by_suffix(referenced_by: &Option<String>) -> String {
    referenced_by
        .as_ref()
        .map(|r| format!(" (referenced by `{r}`)"))
        .unwrap_or_default()
}

impl TemplateError {
    pub(crate) fn unknown(name: impl Into<String>) -> Self {
        Self::UnknownFragment {
            name: name.into(),
            referenced_by: None,
        }
    }
}

/// What went wrong while rendering a fragment.
#[derive(Debug, Clone, Error)]
pub enum RenderErrorKind {
    /// A fragment invoked by this one failed.
    #[error("{0}")]
    Child(Box<RenderError>),

    /// An invoked fragment is not registered.
    #[error("unknown fragment `{0}`")]
    UnknownFragment(String),

    /// An invoked fragment is not among the declared dependencies.
    #[error("`{0}` is not a declared dependency")]
    UndeclaredDependency(String),

    /// `each` over a value that is neither a list nor a map.
    #[error("cannot iterate over `{path}`: found {found}")]
    NotIterable { path: String, found: &'static str },

    /// A value cannot be written as text.
    #[error("cannot render `{path}` as text: found {found}")]
    NotText { path: String, found: &'static str },

    /// Free-form failure raised by a native fragment.
    #[error("{0}")]
    Message(String),
}

/// A render failure, tagged with the fragment it happened in.
///
/// Failures inside nested fragments are kept as a chain of `Child` kinds so
/// the innermost fragment stays recoverable.
#[derive(Debug, Clone, Error)]
#[error("failed to render `{fragment}`{}: {kind}", location_suffix(.location))]
pub struct RenderError {
    fragment: String,
    location: Option<SourceLocation>,
    kind: RenderErrorKind,
}

fn location_suffix(location: &Option<SourceLocation>) -> String {
    location
        .as_ref()
        .map(|l| format!(" at {l}"))
        .unwrap_or_default()
}

impl RenderError {
    pub(crate) fn new(
        fragment: impl Into<String>,
        location: Option<SourceLocation>,
        kind: RenderErrorKind,
    ) -> Self {
        Self {
            fragment: fragment.into(),
            location,
            kind,
        }
    }

    /// Fragment this error was raised in.
    #[must_use]
    pub fn fragment(&self) -> &str {
        &self.fragment
    }

    /// Template location, when the fragment came from a template.
    #[must_use]
    pub fn location(&self) -> Option<&SourceLocation> {
        self.location.as_ref()
    }

    /// The failure itself.
    #[must_use]
    pub fn kind(&self) -> &RenderErrorKind {
        &self.kind
    }

    /// The deepest error in the chain of nested invocations.
    #[must_use]
    pub fn innermost(&self) -> &RenderError {
        let mut current = self;
        while let RenderErrorKind::Child(child) = &current.kind {
            current = child;
        }
        current
    }

    /// Fragment names from the outermost invocation to the failing one.
    #[must_use]
    pub fn fragment_chain(&self) -> Vec<&str> {
        let mut chain = vec![self.fragment.as_str()];
        let mut current = self;
        while let RenderErrorKind::Child(child) = &current.kind {
            chain.push(child.fragment.as_str());
            current = child;
        }
        chain
    }
}

/// A failure reported by a render capability before it is tagged with the
/// fragment name.
#[derive(Debug)]
pub struct FragmentFault {
    pub location: Option<SourceLocation>,
    pub kind: RenderErrorKind,
}

impl FragmentFault {
    /// Create a fault at an optional location.
    #[must_use]
    pub fn new(kind: RenderErrorKind, location: Option<SourceLocation>) -> Self {
        Self { location, kind }
    }

    /// Free-form fault for native fragments.
    #[must_use]
    pub fn message(message: impl Into<String>) -> Self {
        Self::new(RenderErrorKind::Message(message.into()), None)
    }
}

impl From<RenderError> for FragmentFault {
    fn from(err: RenderError) -> Self {
        Self::new(RenderErrorKind::Child(Box::new(err)), None)
    }
}
