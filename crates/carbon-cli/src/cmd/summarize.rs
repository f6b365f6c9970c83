use crate::output::{print_json, print_table};
use anyhow::Context;
use carbon_core::{config::Config, dataset, paths, summary::EmissionsSummary};
use std::path::Path;

pub fn run(root: &Path, input: Option<&Path>, top: usize, json: bool) -> anyhow::Result<()> {
    let config = Config::load(root).context("failed to load config")?;
    let input = input
        .map(Path::to_path_buf)
        .unwrap_or_else(|| paths::cleaned_data_path(root));

    if !input.exists() {
        anyhow::bail!("{} not found; run 'carbon etl' first", input.display());
    }
    let records = dataset::load_records(&input)
        .with_context(|| format!("failed to read {}", input.display()))?;
    tracing::info!(rows = records.len(), "loaded cleaned dataset");

    let summary = EmissionsSummary::from_records(&records, &config.scopes);
    summary
        .write_csv(&paths::summary_csv_path(root))
        .context("failed to write summary csv")?;
    summary
        .write_json(&paths::summary_json_path(root))
        .context("failed to write summary json")?;

    if json {
        return print_json(&summary);
    }

    println!("Total emissions: {:.2} kg CO2e\n", summary.total_emissions);
    print_table(
        &["SCOPE", "EMISSIONS"],
        summary
            .emissions_by_scope
            .iter()
            .map(|(scope, value)| vec![scope.clone(), format!("{value:.2}")])
            .collect(),
    );
    println!();
    print_table(
        &["INDUSTRY", "EMISSIONS"],
        summary
            .emissions_by_industry
            .iter()
            .take(top)
            .map(|t| vec![t.industry.clone(), format!("{:.2}", t.emissions)])
            .collect(),
    );
    println!(
        "\nSummary saved to {} and {}",
        paths::SUMMARY_CSV_FILE,
        paths::SUMMARY_JSON_FILE
    );
    Ok(())
}
