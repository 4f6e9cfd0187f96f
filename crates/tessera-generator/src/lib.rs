//! Tessera Generator Library
//!
//! Build pipeline for Tessera projects.
//!
//! # Modules
//!
//! - [`tokens`] - Design token compilation to CSS custom properties
//! - [`styles`] - Cascade-layered stylesheet assembly
//! - [`pages`] - Page declaration resolution and document rendering
//! - [`assets`] - Static asset and font placement
//! - [`build`] - Build orchestration
//! - [`watch`] - Debounced rebuild loop for watch mode

pub mod assets;
pub mod build;
pub mod pages;
pub mod styles;
pub mod tokens;
pub mod watch;

pub use assets::AssetCopier;
pub use build::{BuildError, BuildReport, BuildState, Builder, CheckReport, StageError};
pub use pages::{PageRenderer, PageSource, discover_pages};
pub use styles::{LAYERS, StylesheetAssembler};
pub use tokens::TokenCompiler;
pub use watch::{ChangeEvent, Rebuild, RebuildLoop, WatchSummary};
