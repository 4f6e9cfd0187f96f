//! Tessera Core Library
//!
//! Configuration, error handling and declaration loaders shared by the
//! Tessera template engine and build pipeline.

pub mod config;
pub mod decl;
pub mod error;
pub mod frontmatter;
pub mod page;
pub mod tokens;

pub use crate::config::{Config, normalize_path};
pub use decl::DeclFormat;
pub use error::{CoreError, Result};
pub use page::{ContentNode, NodeKind, PageDecl};
pub use tokens::{Token, TokenCategory, TokenSet};
