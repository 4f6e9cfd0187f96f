//! Check command - validate configuration and content

use std::path::Path;

use color_eyre::eyre::{Result, WrapErr, bail};
use tessera_generator::Builder;

use super::load_config;

/// Run the check command.
///
/// Loads tokens, fragments and pages and resolves every page tree without
/// writing output.
pub fn run(config_path: &Path, strict: bool) -> Result<()> {
    tracing::info!(?config_path, strict, "Checking project");

    println!("Checking configuration...");
    let config = load_config(config_path)?;
    println!("  ✓ Configuration valid");

    println!("\nChecking tokens, fragments and pages...");
    let report = Builder::new(config).check().wrap_err("Validation failed")?;
    println!("  ✓ {} tokens", report.tokens);
    println!("  ✓ {} fragments", report.fragments);
    println!("  ✓ {} pages", report.pages);

    if !report.warnings.is_empty() {
        println!();
        println!("Warnings:");
        for warn in &report.warnings {
            println!("  ⚠ {warn}");
        }
    }

    if strict && !report.warnings.is_empty() {
        bail!(
            "Validation failed with {} warning(s) (strict mode)",
            report.warnings.len()
        );
    }

    println!();
    println!("✓ All checks passed");

    Ok(())
}

#[cfg(test)]
mod tests {
    use std::fs;

    use tempfile::TempDir;

    use super::*;

    fn project(link: &str) -> TempDir {
        let dir = TempDir::new().expect("tempdir");
        let root = dir.path();
        fs::write(root.join("tessera.toml"), "[project]\nname = \"Demo\"\n").expect("write");
        fs::write(root.join("tokens.toml"), "[space]\nsm = \"4px\"\n").expect("write");
        fs::create_dir_all(root.join("elements")).expect("mkdir");
        fs::create_dir_all(root.join("partials")).expect("mkdir");
        fs::write(
            root.join("partials/menu.html"),
            "---\ntier: organism\n---\n<ul></ul>",
        )
        .expect("write");
        fs::write(root.join("elements/link.html"), link).expect("write");
        dir
    }

    #[test]
    fn test_check_passes() {
        let dir = project("<a></a>");
        run(&dir.path().join("tessera.toml"), true).expect("check");
        assert!(!dir.path().join("dist").exists());
    }

    #[test]
    fn test_strict_fails_on_tier_warning() {
        let dir = project("<a>{{> menu }}</a>");
        let config = dir.path().join("tessera.toml");
        run(&config, false).expect("lenient check");
        let err = run(&config, true).unwrap_err();
        assert!(err.to_string().contains("strict mode"));
    }

    #[test]
    fn test_unknown_fragment_in_page() {
        let dir = project("<a></a>");
        fs::create_dir_all(dir.path().join("pages")).expect("mkdir");
        fs::write(
            dir.path().join("pages/index.yaml"),
            "title: Home\nroot:\n  fragment: ghost\n",
        )
        .expect("write");
        let err = run(&dir.path().join("tessera.toml"), false).unwrap_err();
        assert!(format!("{err:?}").contains("ghost"));
    }
}
