use crate::output::print_json;
use anyhow::Context;
use carbon_core::{config::Config, dataset, paths};
use std::path::{Path, PathBuf};

pub fn run(
    root: &Path,
    input: Option<&Path>,
    output: Option<&Path>,
    json: bool,
) -> anyhow::Result<()> {
    let input = match input {
        Some(p) => p.to_path_buf(),
        None => configured_input(root)?,
    };
    let output = output
        .map(Path::to_path_buf)
        .unwrap_or_else(|| paths::cleaned_data_path(root));

    tracing::info!(input = %input.display(), "loading raw emission factors");
    let report = dataset::clean_file(&input)
        .with_context(|| format!("failed to clean {}", input.display()))?;
    dataset::write_records(&output, &report.records)
        .with_context(|| format!("failed to write {}", output.display()))?;

    if json {
        return print_json(&serde_json::json!({
            "input": input,
            "output": output,
            "rows_read": report.rows_read,
            "rows_kept": report.records.len(),
            "duplicates_dropped": report.duplicates_dropped,
            "negatives_dropped": report.negatives_dropped,
        }));
    }

    println!("Loaded {} rows from {}", report.rows_read, input.display());
    println!(
        "Kept {} rows ({} duplicates, {} negative factors dropped)",
        report.records.len(),
        report.duplicates_dropped,
        report.negatives_dropped
    );
    println!("Cleaned data saved to {}", output.display());
    Ok(())
}

fn configured_input(root: &Path) -> anyhow::Result<PathBuf> {
    let config = Config::load(root).context("failed to load config")?;
    let raw = config
        .data
        .raw_input
        .ok_or_else(|| anyhow::anyhow!("no --input given and data.raw_input is not configured"))?;
    let path = PathBuf::from(raw);
    Ok(if path.is_absolute() {
        path
    } else {
        root.join(path)
    })
}
