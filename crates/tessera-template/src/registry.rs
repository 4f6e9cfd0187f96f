//! Fragment registry and render scope.

use std::{
    cell::{Cell, OnceCell},
    collections::HashMap,
    fmt,
};

use serde_json::Value;
use tracing::{debug, trace, warn};

use crate::{
    a11y::{Attributes, a11y_attributes, extra_attributes},
    classes::ClassList,
    error::{FragmentFault, RenderError, RenderErrorKind, Result, TemplateError},
    fragment::{ChildContent, FragmentDef, Tier},
    props::{Props, merge},
    syntax::is_fragment_name,
};

/// Handle to a registered fragment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FragmentId(usize);

impl FragmentId {
    /// Registration index.
    #[must_use]
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for FragmentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// All known fragments, indexed by name.
///
/// The dependency graph is kept acyclic: a registration that would close a
/// cycle is rejected and leaves the registry unchanged. Dependencies on
/// names that are not registered yet are allowed until [`validate`] runs.
///
/// [`validate`]: FragmentRegistry::validate
#[derive(Debug, Default)]
pub struct FragmentRegistry {
    fragments: Vec<FragmentDef>,
    index: HashMap<String, FragmentId>,
}

impl FragmentRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a fragment.
    pub fn register(&mut self, def: FragmentDef) -> Result<FragmentId> {
        if !is_fragment_name(&def.name) {
            return Err(TemplateError::InvalidName(def.name));
        }
        if self.index.contains_key(&def.name) {
            return Err(TemplateError::DuplicateFragment(def.name));
        }
        if let Some(dependency) = def.dependencies.iter().find(|d| !is_fragment_name(d)) {
            return Err(TemplateError::InvalidName(dependency.clone()));
        }
        if let Some(cycle) = self.find_cycle(&def) {
            return Err(TemplateError::CyclicDependency { cycle });
        }

        for dependency in &def.dependencies {
            if let Some(dep) = self.lookup(dependency) {
                if dep.tier > def.tier {
                    warn!(
                        fragment = %def.name,
                        dependency = %dep.name,
                        "{} `{}` depends on {} `{}`",
                        def.tier, def.name, dep.tier, dep.name
                    );
                }
            }
        }

        let id = FragmentId(self.fragments.len());
        debug!(fragment = %def.name, tier = %def.tier, %id, "registered fragment");
        self.index.insert(def.name.clone(), id);
        self.fragments.push(def);
        Ok(id)
    }

    /// Look a fragment up by name.
    pub fn resolve(&self, name: &str) -> Result<FragmentId> {
        self.index
            .get(name)
            .copied()
            .ok_or_else(|| TemplateError::unknown(name))
    }

    /// Fragment definition by name, if registered.
    #[must_use]
    pub fn lookup(&self, name: &str) -> Option<&FragmentDef> {
        self.index.get(name).map(|id| &self.fragments[id.0])
    }

    /// Fragment definition by id.
    ///
    /// Ids only come from this registry, so they are always in range.
    #[must_use]
    pub fn get(&self, id: FragmentId) -> &FragmentDef {
        &self.fragments[id.0]
    }

    /// Whether a fragment is registered.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// Number of registered fragments.
    #[must_use]
    pub fn len(&self) -> usize {
        self.fragments.len()
    }

    /// Whether nothing is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fragments.is_empty()
    }

    /// Fragments in registration order.
    pub fn iter(&self) -> impl Iterator<Item = (FragmentId, &FragmentDef)> {
        self.fragments
            .iter()
            .enumerate()
            .map(|(i, def)| (FragmentId(i), def))
    }

    /// Check that every declared dependency is registered.
    pub fn validate(&self) -> Result<()> {
        for def in &self.fragments {
            if let Some(missing) = def.dependencies.iter().find(|d| !self.contains(d)) {
                return Err(TemplateError::UnknownFragment {
                    name: missing.clone(),
                    referenced_by: Some(def.name.clone()),
                });
            }
        }
        Ok(())
    }

    /// Fragments ordered so each comes after its dependencies.
    ///
    /// Ties keep registration order. Unregistered dependencies are ignored.
    #[must_use]
    pub fn render_order(&self) -> Vec<FragmentId> {
        let mut visited = vec![false; self.fragments.len()];
        let mut order = Vec::with_capacity(self.fragments.len());
        for i in 0..self.fragments.len() {
            self.post_order(FragmentId(i), &mut visited, &mut order);
        }
        order
    }

    fn post_order(&self, id: FragmentId, visited: &mut [bool], order: &mut Vec<FragmentId>) {
        if visited[id.0] {
            return;
        }
        visited[id.0] = true;
        for dependency in &self.fragments[id.0].dependencies {
            if let Some(dep) = self.index.get(dependency) {
                self.post_order(*dep, visited, order);
            }
        }
        order.push(id);
    }

    /// Dependencies on a higher tier, e.g. an atom that uses a molecule.
    #[must_use]
    pub fn tier_warnings(&self) -> Vec<String> {
        let mut warnings = Vec::new();
        for def in &self.fragments {
            for dep in def.dependencies.iter().filter_map(|d| self.lookup(d)) {
                if dep.tier > def.tier {
                    warnings.push(format!(
                        "{} `{}` depends on {} `{}`",
                        def.tier, def.name, dep.tier, dep.name
                    ));
                }
            }
        }
        warnings
    }

    /// Number of fragments on a tier.
    #[must_use]
    pub fn count_tier(&self, tier: Tier) -> usize {
        self.fragments.iter().filter(|def| def.tier == tier).count()
    }

    /// Defaults merged with caller props.
    pub fn effective_config(&self, name: &str, props: &Props) -> Result<Props> {
        let id = self.resolve(name)?;
        Ok(merge(&self.get(id).defaults, props))
    }

    /// Class list for caller props.
    pub fn class_list(&self, name: &str, props: &Props) -> Result<ClassList> {
        let id = self.resolve(name)?;
        let def = self.get(id);
        let config = merge(&def.defaults, props);
        Ok(def.classes.build(&def.name, &def.defaults, &config))
    }

    /// Render a fragment by name.
    pub fn render(
        &self,
        name: &str,
        props: &Props,
        children: Option<ChildContent<'_>>,
    ) -> Result<String> {
        let id = self.resolve(name)?;
        Ok(self.render_id(id, props, children)?)
    }

    /// Render a resolved fragment.
    pub fn render_id(
        &self,
        id: FragmentId,
        props: &Props,
        children: Option<ChildContent<'_>>,
    ) -> std::result::Result<String, RenderError> {
        let def = self.get(id);
        let config = merge(&def.defaults, props);
        let classes = def.classes.build(&def.name, &def.defaults, &config);
        trace!(fragment = %def.name, classes = %classes, "rendering fragment");

        let scope = RenderScope {
            registry: self,
            fragment: def,
            config: &config,
            classes: &classes,
            slot: Slot::new(children),
        };
        def.renderer.render(&scope).map_err(|fault| scope.tag(fault))
    }

    /// First dependency cycle that registering `candidate` would create.
    fn find_cycle(&self, candidate: &FragmentDef) -> Option<Vec<String>> {
        let mut graph: HashMap<&str, &[String]> = self
            .fragments
            .iter()
            .map(|def| (def.name.as_str(), def.dependencies.as_slice()))
            .collect();
        graph.insert(candidate.name.as_str(), candidate.dependencies.as_slice());

        let mut marks: HashMap<&str, Mark> = HashMap::with_capacity(graph.len());
        let mut path = Vec::new();
        let roots = std::iter::once(candidate.name.as_str())
            .chain(self.fragments.iter().map(|def| def.name.as_str()));
        for root in roots {
            if let Some(cycle) = visit(root, &graph, &mut marks, &mut path) {
                return Some(cycle);
            }
        }
        None
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Mark {
    Open,
    Done,
}

fn visit<'g>(
    name: &'g str,
    graph: &HashMap<&'g str, &'g [String]>,
    marks: &mut HashMap<&'g str, Mark>,
    path: &mut Vec<&'g str>,
) -> Option<Vec<String>> {
    match marks.get(name) {
        Some(Mark::Done) => return None,
        Some(Mark::Open) => {
            let start = path.iter().position(|n| *n == name).unwrap_or(0);
            let mut cycle: Vec<String> = path[start..].iter().map(|n| (*n).to_string()).collect();
            cycle.push(name.to_string());
            return Some(cycle);
        }
        None => {}
    }

    // Unregistered names are leaves.
    let dependencies = graph.get(name)?;

    marks.insert(name, Mark::Open);
    path.push(name);
    for dependency in *dependencies {
        if let Some(cycle) = visit(dependency.as_str(), graph, marks, path) {
            return Some(cycle);
        }
    }
    path.pop();
    marks.insert(name, Mark::Done);
    None
}

/// Child content, produced at most once per render.
struct Slot<'a> {
    producer: Option<ChildContent<'a>>,
    invoked: Cell<bool>,
    cache: OnceCell<std::result::Result<String, RenderError>>,
}

impl<'a> Slot<'a> {
    fn new(producer: Option<ChildContent<'a>>) -> Self {
        Self {
            producer,
            invoked: Cell::new(false),
            cache: OnceCell::new(),
        }
    }
}

/// What a render capability sees while rendering one fragment.
pub struct RenderScope<'a> {
    registry: &'a FragmentRegistry,
    fragment: &'a FragmentDef,
    config: &'a Props,
    classes: &'a ClassList,
    slot: Slot<'a>,
}

impl<'a> RenderScope<'a> {
    /// Name of the fragment being rendered.
    #[must_use]
    pub fn name(&self) -> &'a str {
        &self.fragment.name
    }

    #[must_use]
    pub fn fragment(&self) -> &'a FragmentDef {
        self.fragment
    }

    /// Effective configuration: defaults merged with caller props.
    #[must_use]
    pub fn config(&self) -> &'a Props {
        self.config
    }

    /// A top-level configuration value.
    #[must_use]
    pub fn prop(&self, key: &str) -> Option<&'a Value> {
        self.config.get(key)
    }

    /// The assembled class list.
    #[must_use]
    pub fn classes(&self) -> &'a ClassList {
        self.classes
    }

    /// Attributes from the `a11y` group.
    #[must_use]
    pub fn a11y(&self) -> Attributes {
        a11y_attributes(self.config)
    }

    /// Attributes from the `attrs` map.
    #[must_use]
    pub fn attrs(&self) -> Attributes {
        extra_attributes(self.config)
    }

    /// Whether the caller supplied child content.
    #[must_use]
    pub fn has_children(&self) -> bool {
        self.slot.producer.is_some()
    }

    /// Caller child content; empty when none was supplied.
    ///
    /// The producer runs on first use only. Later calls return the cached
    /// markup, or the same error if it failed.
    pub fn children(&self) -> std::result::Result<String, RenderError> {
        if let Some(result) = self.slot.cache.get() {
            return result.clone();
        }
        let Some(producer) = self.slot.producer else {
            return Ok(String::new());
        };
        if self.slot.invoked.replace(true) {
            return Ok(String::new());
        }
        let result = producer();
        self.slot.cache.get_or_init(|| result).clone()
    }

    /// Render a declared dependency.
    pub fn invoke(
        &self,
        name: &str,
        props: &Props,
        children: Option<ChildContent<'_>>,
    ) -> std::result::Result<String, FragmentFault> {
        if !self.fragment.depends_on(name) {
            return Err(FragmentFault::new(
                RenderErrorKind::UndeclaredDependency(name.to_string()),
                None,
            ));
        }
        let Ok(id) = self.registry.resolve(name) else {
            return Err(FragmentFault::new(
                RenderErrorKind::UnknownFragment(name.to_string()),
                None,
            ));
        };
        Ok(self.registry.render_id(id, props, children)?)
    }

    /// Attach this fragment's name to a fault.
    pub(crate) fn tag(&self, fault: FragmentFault) -> RenderError {
        RenderError::new(self.fragment.name.clone(), fault.location, fault.kind)
    }
}
