//! Tessera CLI
//!
//! Compiles design tokens, fragment templates and page declarations into a
//! static site.
//!
//! This is the binary entry point. The library functionality is in `lib.rs`.

use std::path::PathBuf;

use clap::Parser;
use color_eyre::eyre::Result;

/// Command-line interface for Tessera.
#[derive(Parser)]
#[command(
    name = "tessera",
    version,
    about = "A design-system driven static site builder"
)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "tessera.toml")]
    config: PathBuf,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

/// Available CLI commands.
#[derive(clap::Subcommand)]
enum Commands {
    /// Run one full build
    Build {
        /// Output directory, overriding `paths.output`
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Build, then rebuild on every source change
    Watch,
    /// Load and validate the project without writing output
    Check {
        /// Treat warnings as errors
        #[arg(long)]
        strict: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;

    let cli = Cli::parse();
    tessera::init_tracing(cli.verbose);

    match cli.command {
        Commands::Build { output } => {
            tessera::cmd::build::run(&cli.config, output.as_deref())?;
        }
        Commands::Watch => {
            tessera::cmd::watch::run(&cli.config).await?;
        }
        Commands::Check { strict } => {
            tessera::cmd::check::run(&cli.config, strict)?;
        }
    }

    Ok(())
}
