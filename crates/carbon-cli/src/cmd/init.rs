use anyhow::Context;
use carbon_core::{action::ActionCatalog, config::Config, io, paths};
use std::path::Path;

pub fn run(root: &Path) -> anyhow::Result<()> {
    let project_name = root
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "project".to_string());

    println!("Initializing carbon optimizer in: {}", root.display());

    // 1. Create directory structure
    for dir in [paths::CARBON_DIR, paths::RAW_DIR, paths::PROCESSED_DIR] {
        let p = root.join(dir);
        io::ensure_dir(&p).with_context(|| format!("failed to create {}", p.display()))?;
    }

    // 2. Write config.yaml if missing
    if !paths::config_path(root).exists() {
        Config::new(&project_name)
            .save(root)
            .context("failed to write config.yaml")?;
        println!("  created: {}", paths::CONFIG_FILE);
    } else {
        println!("  exists:  {}", paths::CONFIG_FILE);
    }

    // 3. Seed the action catalog if missing
    if !paths::catalog_path(root).exists() {
        ActionCatalog::seed()
            .save(root)
            .context("failed to write actions.yaml")?;
        println!("  created: {}", paths::CATALOG_FILE);
    } else {
        println!("  exists:  {}", paths::CATALOG_FILE);
    }

    tracing::info!(root = %root.display(), "project initialized");
    Ok(())
}
