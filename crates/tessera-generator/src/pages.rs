//! Page rendering.
//!
//! Page declarations are discovered, resolved against the fragment registry
//! in one validation pass, rendered in parallel and wrapped in a document
//! shell. Nothing is written until every page has rendered.

use std::{
    collections::HashMap,
    fs,
    path::{Component, Path, PathBuf},
};

use rayon::prelude::*;
use tessera_core::{Config, ContentNode, CoreError, DeclFormat, NodeKind, PageDecl};
use tessera_template::{
    FragmentId, FragmentRegistry, Props, RenderError, TemplateError, props::escape_html,
};
use thiserror::Error;
use tracing::{debug, info, warn};

/// Page rendering errors.
#[derive(Debug, Error)]
pub enum PageError {
    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Declaration could not be loaded.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// A page references a fragment that is not registered.
    #[error("{}: {at}: {source}", .page.display())]
    Resolve {
        page: PathBuf,
        at: String,
        #[source]
        source: TemplateError,
    },

    /// A fragment failed while rendering a page.
    #[error("{}: {source}", .page.display())]
    Render {
        page: PathBuf,
        #[source]
        source: RenderError,
    },

    /// Two declarations map to the same document.
    #[error(
        "{} and {} both render to {}",
        .first.display(),
        .second.display(),
        .output.display()
    )]
    Collision {
        first: PathBuf,
        second: PathBuf,
        output: PathBuf,
    },

    /// Directory traversal failed.
    #[error("failed to read {}: {message}", .path.display())]
    Walk { path: PathBuf, message: String },
}

/// Result type for page operations.
pub type Result<T> = std::result::Result<T, PageError>;

/// A loaded page declaration.
#[derive(Debug, Clone)]
pub struct PageSource {
    /// Path relative to the pages directory.
    pub relative: PathBuf,
    pub decl: PageDecl,
}

impl PageSource {
    /// Output path relative to the output directory.
    #[must_use]
    pub fn output_path(&self) -> PathBuf {
        self.relative.with_extension("html")
    }
}

/// A content node whose fragment names are resolved to ids.
#[derive(Debug)]
pub enum ResolvedNode<'p> {
    Fragment {
        id: FragmentId,
        props: &'p Props,
        children: Vec<ResolvedNode<'p>>,
    },
    Text(&'p str),
}

/// Load every page declaration under `dir`, sorted by path.
///
/// A missing directory yields no pages.
pub fn discover_pages(dir: &Path) -> Result<Vec<PageSource>> {
    if !dir.is_dir() {
        warn!(path = %dir.display(), "pages directory not found");
        return Ok(Vec::new());
    }

    let mut pages = Vec::new();
    for entry in walkdir::WalkDir::new(dir).sort_by_file_name() {
        let entry = entry.map_err(|e| PageError::Walk {
            path: dir.to_path_buf(),
            message: e.to_string(),
        })?;
        let path = entry.path();
        if !entry.file_type().is_file() || !DeclFormat::is_supported(path) {
            continue;
        }

        let decl = PageDecl::load(path)?;
        let relative = path.strip_prefix(dir).unwrap_or(path).to_path_buf();
        debug!(page = %relative.display(), "loaded page declaration");
        pages.push(PageSource { relative, decl });
    }
    Ok(pages)
}

/// Resolve a content tree against the registry.
pub fn resolve<'p>(
    registry: &FragmentRegistry,
    node: &'p ContentNode,
    at: &str,
) -> std::result::Result<ResolvedNode<'p>, (String, TemplateError)> {
    match node.kind() {
        NodeKind::Text(text) => Ok(ResolvedNode::Text(text)),
        NodeKind::Fragment(name) => {
            let id = registry.resolve(name).map_err(|e| (at.to_string(), e))?;
            let children = node
                .children
                .iter()
                .enumerate()
                .map(|(i, child)| resolve(registry, child, &format!("{at}.children[{i}]")))
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(ResolvedNode::Fragment {
                id,
                props: &node.props,
                children,
            })
        }
    }
}

/// Reject declarations that would write the same document.
pub fn check_outputs(pages: &[PageSource]) -> Result<()> {
    let mut outputs: HashMap<PathBuf, &Path> = HashMap::with_capacity(pages.len());
    for page in pages {
        let output = page.output_path();
        if let Some(first) = outputs.insert(output.clone(), &page.relative) {
            return Err(PageError::Collision {
                first: first.to_path_buf(),
                second: page.relative.clone(),
                output,
            });
        }
    }
    Ok(())
}

/// Render a resolved tree; children become the fragment's child content.
pub fn render_node(
    registry: &FragmentRegistry,
    node: &ResolvedNode<'_>,
) -> std::result::Result<String, RenderError> {
    match node {
        ResolvedNode::Text(text) => Ok(escape_html(text)),
        ResolvedNode::Fragment {
            id,
            props,
            children,
        } => {
            if children.is_empty() {
                return registry.render_id(*id, props, None);
            }
            let produce = || -> std::result::Result<String, RenderError> {
                let mut html = String::new();
                for child in children {
                    html.push_str(&render_node(registry, child)?);
                }
                Ok(html)
            };
            registry.render_id(*id, props, Some(&produce))
        }
    }
}

/// Document shell settings.
#[derive(Debug, Clone)]
pub struct PageRenderer {
    project: String,
    lang: String,
    description: Option<String>,
    stylesheet: String,
}

impl PageRenderer {
    #[must_use]
    pub fn new(project: impl Into<String>, lang: impl Into<String>, stylesheet: impl Into<String>) -> Self {
        Self {
            project: project.into(),
            lang: lang.into(),
            description: None,
            stylesheet: stylesheet.into(),
        }
    }

    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        Self {
            project: config.project.name.clone(),
            lang: config.project.lang.clone(),
            description: config.project.description.clone(),
            stylesheet: config.build.stylesheet.clone(),
        }
    }

    /// Stylesheet href relative to a page at `output` (relative path).
    #[must_use]
    pub fn stylesheet_href(&self, output: &Path) -> String {
        let depth = output
            .parent()
            .map(|p| p.components().filter(|c| matches!(c, Component::Normal(_))).count())
            .unwrap_or(0);
        format!("{}{}", "../".repeat(depth), self.stylesheet)
    }

    /// Wrap rendered body markup in a full document.
    #[must_use]
    pub fn document(&self, page: &PageSource, body: &str) -> String {
        let decl = &page.decl;
        let lang = decl.lang.as_deref().unwrap_or(&self.lang);
        let title = if decl.title == self.project || self.project.is_empty() {
            decl.title.clone()
        } else {
            format!("{} | {}", decl.title, self.project)
        };

        let mut html = String::with_capacity(body.len() + 512);
        html.push_str("<!DOCTYPE html>\n");
        html.push_str(&format!("<html lang=\"{}\">\n", escape_html(lang)));
        html.push_str("<head>\n<meta charset=\"utf-8\">\n");
        html.push_str("<meta name=\"viewport\" content=\"width=device-width, initial-scale=1\">\n");
        html.push_str(&format!("<title>{}</title>\n", escape_html(&title)));
        if let Some(description) = decl.description.as_ref().or(self.description.as_ref()) {
            html.push_str(&format!(
                "<meta name=\"description\" content=\"{}\">\n",
                escape_html(description)
            ));
        }
        html.push_str(&format!(
            "<link rel=\"stylesheet\" href=\"{}\">\n",
            escape_html(&self.stylesheet_href(&page.output_path()))
        ));
        html.push_str("</head>\n<body>\n");
        html.push_str(body);
        if !body.ends_with('\n') {
            html.push('\n');
        }
        html.push_str("</body>\n</html>\n");
        html
    }

    /// Render every page to a document, without writing anything.
    ///
    /// All trees are resolved first, so an unknown fragment fails before
    /// any page renders. Results keep the input order.
    pub fn render_all(
        &self,
        registry: &FragmentRegistry,
        pages: &[PageSource],
    ) -> Result<Vec<(PathBuf, String)>> {
        check_outputs(pages)?;
        let resolved = pages
            .iter()
            .map(|page| {
                resolve(registry, &page.decl.root, "root").map_err(|(at, source)| PageError::Resolve {
                    page: page.relative.clone(),
                    at,
                    source,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        pages
            .par_iter()
            .zip(resolved.par_iter())
            .map(|(page, root)| {
                let body = render_node(registry, root).map_err(|source| PageError::Render {
                    page: page.relative.clone(),
                    source,
                })?;
                Ok((page.output_path(), self.document(page, &body)))
            })
            .collect()
    }

    /// Render and write every page under `output_dir`.
    pub fn emit(
        &self,
        registry: &FragmentRegistry,
        pages: &[PageSource],
        output_dir: &Path,
    ) -> Result<usize> {
        let documents = self.render_all(registry, pages)?;
        for (relative, html) in &documents {
            let path = output_dir.join(relative);
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::write(&path, html)?;
            debug!(path = %path.display(), "wrote page");
        }
        info!(count = documents.len(), "rendered pages");
        Ok(documents.len())
    }
}
