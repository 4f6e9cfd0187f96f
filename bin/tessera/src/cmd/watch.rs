//! Watch command - rebuild on source changes

use std::{
    path::{Path, PathBuf},
    time::Duration,
};

use color_eyre::eyre::{Result, WrapErr};
use notify::{EventKind, RecommendedWatcher, RecursiveMode, Watcher, event::ModifyKind};
use tessera_core::{Config, normalize_path};
use tessera_generator::{Builder, ChangeEvent, Rebuild, RebuildLoop};
use tokio::sync::mpsc;

use super::{build::print_report, load_config};

/// Run the watch command.
///
/// Builds once, then rebuilds the whole project after every change until
/// interrupted. Failed builds are reported and never end the session.
pub async fn run(config_path: &Path) -> Result<()> {
    tracing::info!(?config_path, "Starting watch mode");

    let config = load_config(config_path)?;
    let output_dir = config.output_dir();
    let debounce = Duration::from_millis(config.watch.debounce_ms);
    let inputs = WatchInputs::new(&config).wrap_err("Failed to resolve watch paths")?;
    let targets = watch_targets(&config, &inputs);

    // Initial build
    tracing::info!("Running initial build...");
    let mut builder = Builder::new(config);
    match builder.rebuild() {
        Ok(report) => print_report(&report, &output_dir),
        Err(e) => eprintln!("  ✗ Initial build failed: {e}"),
    }

    // Setup file watcher
    let (tx, rx) = mpsc::channel::<ChangeEvent>(64);
    let mut watcher = RecommendedWatcher::new(
        move |res: Result<notify::Event, notify::Error>| match res {
            Ok(event) if is_relevant(&event.kind) => {
                let paths: Vec<_> =
                    event.paths.into_iter().filter(|p| inputs.matches(p)).collect();
                if !paths.is_empty() {
                    let _ = tx.blocking_send(ChangeEvent::new(paths));
                }
            }
            Ok(_) => {}
            Err(e) => tracing::warn!(error = %e, "file watcher error"),
        },
        notify::Config::default(),
    )
    .wrap_err("Failed to create file watcher")?;

    for (path, mode) in &targets {
        watcher
            .watch(path, *mode)
            .wrap_err_with(|| format!("Failed to watch {}", path.display()))?;
        tracing::debug!(path = %path.display(), "watching");
    }

    println!();
    println!("  Watching {} location(s)", targets.len());
    println!("  Press Ctrl+C to stop");
    println!();

    // The watcher owns the sender, so the loop runs until interrupted.
    let rebuilds = RebuildLoop::new(builder, debounce).run(rx);
    tokio::select! {
        summary = rebuilds => {
            tracing::info!(builds = summary.builds, failures = summary.failures, "watch loop ended");
        }
        signal = tokio::signal::ctrl_c() => {
            signal.wrap_err("Failed to listen for Ctrl+C")?;
            println!();
            println!("  Stopped watching");
        }
    }

    drop(watcher);
    Ok(())
}

/// Input locations a change must touch to trigger a rebuild.
#[derive(Debug, Clone, PartialEq, Eq)]
struct WatchInputs {
    tokens: PathBuf,
    dirs: Vec<PathBuf>,
}

impl WatchInputs {
    fn new(config: &Config) -> Result<Self> {
        let tokens = normalize_path(&config.tokens_path())?;
        let dirs = config
            .source_dirs()
            .iter()
            .map(|dir| normalize_path(dir))
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(Self { tokens, dirs })
    }

    /// Whether `path` is the token file or lies inside a source directory,
    /// including files that did not exist when watching started.
    fn matches(&self, path: &Path) -> bool {
        let path = normalize_path(path).unwrap_or_else(|_| path.to_path_buf());
        path == self.tokens || self.dirs.iter().any(|dir| path.starts_with(dir))
    }
}

/// Directories to watch: the project root, then the parent of the token file
/// and any source directory that lives outside it. Watching directories
/// rather than files picks up inputs created or replaced after startup.
fn watch_targets(config: &Config, inputs: &WatchInputs) -> Vec<(PathBuf, RecursiveMode)> {
    let root = normalize_path(config.root()).unwrap_or_else(|_| config.root().to_path_buf());
    let mut targets = Vec::new();
    if root.is_dir() {
        targets.push((root.clone(), RecursiveMode::Recursive));
    }

    let covered = |targets: &[(PathBuf, RecursiveMode)], path: &Path| {
        targets.iter().any(|(p, mode)| {
            p == path || (*mode == RecursiveMode::Recursive && path.starts_with(p))
        })
    };

    match inputs.tokens.parent() {
        Some(parent) if parent.is_dir() && !covered(&targets, parent) => {
            targets.push((parent.to_path_buf(), RecursiveMode::NonRecursive));
        }
        Some(parent) if !parent.is_dir() => {
            tracing::warn!(path = %inputs.tokens.display(), "token directory not found, not watching it");
        }
        _ => {}
    }

    for dir in &inputs.dirs {
        if covered(&targets, dir) {
            continue;
        }
        if dir.is_dir() {
            targets.push((dir.clone(), RecursiveMode::Recursive));
        } else {
            tracing::warn!(path = %dir.display(), "source directory outside the project not found, not watching it");
        }
    }
    targets
}

/// Additions, content changes, renames and removals; metadata and access
/// events are ignored.
fn is_relevant(kind: &EventKind) -> bool {
    match kind {
        EventKind::Create(_) | EventKind::Remove(_) => true,
        EventKind::Modify(ModifyKind::Metadata(_)) => false,
        EventKind::Modify(_) => true,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use notify::event::{AccessKind, CreateKind, DataChange, MetadataKind, RemoveKind, RenameMode};
    use tempfile::TempDir;

    use super::*;

    #[test]
    fn test_relevant_events() {
        assert!(is_relevant(&EventKind::Create(CreateKind::File)));
        assert!(is_relevant(&EventKind::Remove(RemoveKind::File)));
        assert!(is_relevant(&EventKind::Modify(ModifyKind::Data(DataChange::Content))));
        assert!(is_relevant(&EventKind::Modify(ModifyKind::Name(RenameMode::Both))));
        assert!(!is_relevant(&EventKind::Modify(ModifyKind::Metadata(
            MetadataKind::Permissions
        ))));
        assert!(!is_relevant(&EventKind::Access(AccessKind::Read)));
    }

    fn inputs(config: &Config) -> WatchInputs {
        WatchInputs::new(config).expect("inputs")
    }

    #[test]
    fn test_watch_targets_with_missing_inputs() {
        let dir = TempDir::new().expect("tempdir");
        let root = normalize_path(dir.path()).expect("normalize");

        let config = Config::with_root("Demo", &root);
        let targets = watch_targets(&config, &inputs(&config));
        assert_eq!(targets, vec![(root, RecursiveMode::Recursive)]);
    }

    #[test]
    fn test_watch_targets_cover_outside_inputs() {
        let dir = TempDir::new().expect("tempdir");
        let base = normalize_path(dir.path()).expect("normalize");
        let root = base.join("site");
        fs::create_dir_all(&root).expect("mkdir");
        fs::create_dir_all(base.join("shared/tokens")).expect("mkdir");
        fs::create_dir_all(base.join("shared/ui")).expect("mkdir");

        let mut config = Config::with_root("Demo", &root);
        config.paths.tokens = PathBuf::from("../shared/tokens/tokens.toml");
        config.paths.fragments = vec![PathBuf::from("../shared/ui"), PathBuf::from("../missing")];

        let targets = watch_targets(&config, &inputs(&config));
        assert_eq!(
            targets,
            vec![
                (root, RecursiveMode::Recursive),
                (base.join("shared/tokens"), RecursiveMode::NonRecursive),
                (base.join("shared/ui"), RecursiveMode::Recursive),
            ]
        );
    }

    #[test]
    fn test_inputs_match_files_created_later() {
        let dir = TempDir::new().expect("tempdir");
        let root = normalize_path(dir.path()).expect("normalize");
        let config = Config::with_root("Demo", &root);
        let inputs = inputs(&config);

        assert!(inputs.matches(&root.join("tokens.toml")));
        assert!(inputs.matches(&root.join("pages/new/page.yaml")));
        assert!(inputs.matches(&root.join("elements/button.html")));
        assert!(!inputs.matches(&root.join("dist/index.html")));
        assert!(!inputs.matches(&root.join("README.md")));
        assert!(!inputs.matches(&root.join("tokens.toml.swp")));
    }
}
