//! Fragment definitions and the render capability seam.

use std::{fmt, sync::Arc};

use serde::{Deserialize, Serialize};

use crate::{
    classes::ClassRules,
    error::{FragmentFault, RenderError},
    props::Props,
    registry::RenderScope,
};

/// Caller-supplied child content, produced on demand.
pub type ChildContent<'a> = &'a dyn Fn() -> std::result::Result<String, RenderError>;

/// Something that turns a render scope into markup.
///
/// Implemented by parsed templates and by closures, so hosts can register
/// native fragments next to template-sourced ones.
pub trait Render: Send + Sync {
    /// Render markup for the scope's effective configuration.
    fn render(&self, scope: &RenderScope<'_>) -> std::result::Result<String, FragmentFault>;
}

impl<F> Render for F
where
    F: Fn(&RenderScope<'_>) -> std::result::Result<String, FragmentFault> + Send + Sync,
{
    fn render(&self, scope: &RenderScope<'_>) -> std::result::Result<String, FragmentFault> {
        self(scope)
    }
}

/// Composition tier of a fragment.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    #[default]
    Atom,
    Molecule,
    Organism,
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Atom => "atom",
            Self::Molecule => "molecule",
            Self::Organism => "organism",
        })
    }
}

/// A named fragment: defaults, class rules, dependencies and renderer.
#[derive(Clone)]
pub struct FragmentDef {
    pub name: String,
    pub tier: Tier,
    pub defaults: Props,
    pub classes: ClassRules,
    pub dependencies: Vec<String>,
    pub renderer: Arc<dyn Render>,
}

impl FragmentDef {
    /// Create a fragment with empty defaults and no dependencies.
    pub fn new(name: impl Into<String>, renderer: impl Render + 'static) -> Self {
        Self {
            name: name.into(),
            tier: Tier::default(),
            defaults: Props::new(),
            classes: ClassRules::default(),
            dependencies: Vec::new(),
            renderer: Arc::new(renderer),
        }
    }

    /// Create a fragment rendered by a closure.
    pub fn from_fn<F>(name: impl Into<String>, render: F) -> Self
    where
        F: Fn(&RenderScope<'_>) -> std::result::Result<String, FragmentFault>
            + Send
            + Sync
            + 'static,
    {
        Self::new(name, render)
    }

    #[must_use]
    pub fn with_defaults(mut self, defaults: Props) -> Self {
        self.defaults = defaults;
        self
    }

    #[must_use]
    pub fn with_classes(mut self, classes: ClassRules) -> Self {
        self.classes = classes;
        self
    }

    #[must_use]
    pub fn with_tier(mut self, tier: Tier) -> Self {
        self.tier = tier;
        self
    }

    /// Add dependencies, skipping ones already declared.
    #[must_use]
    pub fn with_dependencies<I, S>(mut self, dependencies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for dependency in dependencies {
            let dependency = dependency.into();
            if !self.dependencies.contains(&dependency) {
                self.dependencies.push(dependency);
            }
        }
        self
    }

    /// Whether `name` is a declared dependency.
    #[must_use]
    pub fn depends_on(&self, name: &str) -> bool {
        self.dependencies.iter().any(|d| d == name)
    }
}

impl fmt::Debug for FragmentDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FragmentDef")
            .field("name", &self.name)
            .field("tier", &self.tier)
            .field("defaults", &self.defaults)
            .field("classes", &self.classes)
            .field("dependencies", &self.dependencies)
            .finish_non_exhaustive()
    }
}
