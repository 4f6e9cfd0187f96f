//! Tessera CLI Library
//!
//! Command implementations for the `tessera` binary, exposed as a library so
//! they can be driven from integration code.
//!
//! # Modules
//!
//! - [`cmd`] - Command implementations (build, watch, check)
//!
//! # Example
//!
//! ```no_run
//! use std::path::Path;
//!
//! use tessera::cmd;
//!
//! cmd::build::run(Path::new("tessera.toml"), None).unwrap();
//! ```

pub mod cmd;

// Re-export core types for convenience
pub use tessera_core::Config;
pub use tessera_generator::{BuildReport, Builder, CheckReport};

/// Initialize tracing with the specified verbosity level.
///
/// # Arguments
///
/// * `verbose` - Verbosity level (0 = WARN, 1 = INFO, 2 = DEBUG, 3+ = TRACE)
///
/// # Example
///
/// ```no_run
/// tessera::init_tracing(2); // Enable DEBUG level logging
/// ```
pub fn init_tracing(verbose: u8) {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(tracing_subscriber::EnvFilter::from_default_env().add_directive(level(verbose).into()))
        .init();
}

fn level(verbose: u8) -> tracing::Level {
    match verbose {
        0 => tracing::Level::WARN,
        1 => tracing::Level::INFO,
        2 => tracing::Level::DEBUG,
        _ => tracing::Level::TRACE,
    }
}
