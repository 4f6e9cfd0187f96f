//! Tessera fragment engine.
//!
//! Fragments are named units of markup with default configuration, class
//! rules and declared dependencies. Caller props are merged over the
//! defaults and rendered through a [`Render`] capability, usually a parsed
//! [`Template`].

pub mod a11y;
pub mod classes;
pub mod error;
pub mod fragment;
pub mod loader;
pub mod props;
pub mod registry;
pub mod render;
pub mod syntax;

pub use a11y::{Attributes, a11y_attributes, extra_attributes};
pub use classes::{ClassList, ClassRules};
pub use error::{FragmentFault, RenderError, RenderErrorKind, Result, SourceLocation, TemplateError};
pub use fragment::{ChildContent, FragmentDef, Render, Tier};
pub use loader::{FragmentMeta, load_dir, load_dirs, load_fragment, parse_fragment};
pub use props::{Props, merge};
pub use registry::{FragmentId, FragmentRegistry, RenderScope};
pub use syntax::Template;
