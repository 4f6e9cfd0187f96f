//! Build command - runs one full build

use std::path::{Path, PathBuf};

use color_eyre::eyre::{Result, WrapErr};
use tessera_generator::{BuildReport, Builder};

use super::load_config;

/// Run the build command.
///
/// Exits with an error naming the failed stage when any stage fails.
pub fn run(config_path: &Path, output: Option<&Path>) -> Result<()> {
    tracing::info!(?config_path, ?output, "Building project");

    let mut config = load_config(config_path)?;
    if let Some(output) = output {
        config.paths.output = absolute(output)?;
        config.validate().wrap_err("Invalid output directory")?;
    }
    let output_dir = config.output_dir();

    tracing::debug!(?config, "Loaded configuration");

    let mut builder = Builder::new(config);
    let report = builder.build().wrap_err("Build failed")?;

    print_report(&report, &output_dir);
    tracing::info!(duration_ms = report.duration_ms, "Build completed successfully");

    Ok(())
}

/// Resolve a command-line path against the working directory.
fn absolute(path: &Path) -> Result<PathBuf> {
    if path.is_absolute() {
        return Ok(path.to_path_buf());
    }
    let cwd = std::env::current_dir().wrap_err("Failed to read working directory")?;
    Ok(cwd.join(path))
}

/// Print build statistics in a user-friendly format.
pub(crate) fn print_report(report: &BuildReport, output_dir: &Path) {
    println!();
    println!("  Build completed successfully!");
    println!();
    println!("  Tokens:     {}", report.tokens);
    println!("  Stylesheet: {} bytes", report.stylesheet_bytes);
    println!("  Fragments:  {}", report.fragments);
    println!("  Pages:      {}", report.pages);
    println!("  Assets:     {}", report.assets);
    println!("  Fonts:      {}", report.fonts);
    println!();
    println!("  Duration:   {}ms", report.duration_ms);
    println!("  Output:     {}", output_dir.display());
    println!();
}

#[cfg(test)]
mod tests {
    use std::fs;

    use tempfile::TempDir;

    use super::*;

    fn project() -> TempDir {
        let dir = TempDir::new().expect("tempdir");
        let root = dir.path();
        fs::write(root.join("tessera.toml"), "[project]\nname = \"Demo\"\n").expect("write");
        fs::write(root.join("tokens.toml"), "[color]\nink = \"#111\"\n").expect("write");
        fs::create_dir_all(root.join("elements")).expect("mkdir");
        fs::write(root.join("elements/note.html"), "<p>{{ text }}</p>").expect("write");
        fs::create_dir_all(root.join("pages")).expect("mkdir");
        fs::write(
            root.join("pages/index.json"),
            r#"{"title": "Home", "root": {"fragment": "note", "props": {"text": "hi"}}}"#,
        )
        .expect("write");
        dir
    }

    #[test]
    fn test_build_writes_output() {
        let dir = project();
        run(&dir.path().join("tessera.toml"), None).expect("build");
        let html = fs::read_to_string(dir.path().join("dist/index.html")).expect("read");
        assert!(html.contains("<p>hi</p>"));
    }

    #[test]
    fn test_output_override() {
        let dir = project();
        let out = dir.path().join("site");
        run(&dir.path().join("tessera.toml"), Some(&out)).expect("build");
        assert!(out.join("index.html").is_file());
        assert!(!dir.path().join("dist").exists());
    }

    #[test]
    fn test_output_override_cannot_be_root() {
        let dir = project();
        let err = run(&dir.path().join("tessera.toml"), Some(dir.path())).unwrap_err();
        assert!(format!("{err:?}").contains("paths.output"));
        assert!(dir.path().join("tokens.toml").is_file());
    }

    #[test]
    fn test_output_override_above_root_rejected() {
        let dir = project();
        let out = dir.path().join("site/../..");
        let err = run(&dir.path().join("tessera.toml"), Some(&out)).unwrap_err();
        assert!(format!("{err:?}").contains("paths.output"));
        assert!(dir.path().join("tokens.toml").is_file());
    }

    #[test]
    fn test_failed_build_is_an_error() {
        let dir = project();
        fs::remove_file(dir.path().join("tokens.toml")).expect("remove");
        let err = run(&dir.path().join("tessera.toml"), None).unwrap_err();
        assert!(format!("{err:?}").contains("tokens stage failed"));
    }

    #[test]
    fn test_missing_config() {
        let dir = TempDir::new().expect("tempdir");
        assert!(run(&dir.path().join("tessera.toml"), None).is_err());
    }
}
