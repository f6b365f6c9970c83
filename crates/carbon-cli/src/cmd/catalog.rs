use crate::output::{money, percent, print_json, print_table};
use anyhow::Context;
use carbon_core::action::{Action, ActionCatalog};
use clap::Subcommand;
use std::path::Path;

// ---------------------------------------------------------------------------
// Subcommand types
// ---------------------------------------------------------------------------

#[derive(Subcommand)]
pub enum CatalogSubcommand {
    /// List all mitigation actions
    List,

    /// Add a mitigation action
    Add {
        /// Unique action id (letters, digits, '_', '-', '.')
        id: String,
        /// One-off cost of the action
        #[arg(long)]
        cost: f64,
        /// Emissions reduction as a fraction of the baseline (0-1)
        #[arg(long)]
        reduction: f64,
        #[arg(long)]
        description: Option<String>,
    },

    /// Remove a mitigation action
    Remove { id: String },

    /// Check the catalog for invalid or duplicate actions
    Validate,
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

pub fn run(root: &Path, subcmd: CatalogSubcommand, json: bool) -> anyhow::Result<()> {
    match subcmd {
        CatalogSubcommand::List => list(root, json),
        CatalogSubcommand::Add {
            id,
            cost,
            reduction,
            description,
        } => add(root, id, cost, reduction, description),
        CatalogSubcommand::Remove { id } => remove(root, &id),
        CatalogSubcommand::Validate => validate(root, json),
    }
}

// ---------------------------------------------------------------------------
// list
// ---------------------------------------------------------------------------

fn list(root: &Path, json: bool) -> anyhow::Result<()> {
    let catalog = ActionCatalog::load(root).context("failed to load action catalog")?;

    if json {
        return print_json(&catalog.actions);
    }

    if catalog.is_empty() {
        println!("No actions in catalog.");
        return Ok(());
    }

    let rows = catalog
        .actions
        .iter()
        .map(|a| {
            vec![
                a.id.clone(),
                money(a.cost),
                percent(a.reduction_fraction),
                a.description.clone().unwrap_or_default(),
            ]
        })
        .collect();
    print_table(&["ID", "COST", "REDUCTION", "DESCRIPTION"], rows);
    Ok(())
}

// ---------------------------------------------------------------------------
// add / remove
// ---------------------------------------------------------------------------

fn add(
    root: &Path,
    id: String,
    cost: f64,
    reduction: f64,
    description: Option<String>,
) -> anyhow::Result<()> {
    let mut catalog = ActionCatalog::load(root).context("failed to load action catalog")?;
    let mut action = Action::new(id, cost, reduction);
    action.description = description;
    let id = action.id.clone();
    catalog.add(action)?;
    catalog.save(root).context("failed to save action catalog")?;
    println!("Added action: {id}");
    Ok(())
}

fn remove(root: &Path, id: &str) -> anyhow::Result<()> {
    let mut catalog = ActionCatalog::load(root).context("failed to load action catalog")?;
    catalog.remove(id)?;
    catalog.save(root).context("failed to save action catalog")?;
    println!("Removed action: {id}");
    Ok(())
}

// ---------------------------------------------------------------------------
// validate
// ---------------------------------------------------------------------------

fn validate(root: &Path, json: bool) -> anyhow::Result<()> {
    let catalog = ActionCatalog::load(root).context("failed to load action catalog")?;
    let outcome = catalog.validate();

    if json {
        print_json(&serde_json::json!({
            "valid": outcome.is_ok(),
            "actions": catalog.len(),
            "total_reduction": catalog.total_reduction(),
            "error": outcome.as_ref().err().map(|e| e.to_string()),
        }))?;
    } else if outcome.is_ok() {
        println!(
            "Catalog is valid: {} actions, {} combined reduction.",
            catalog.len(),
            percent(catalog.total_reduction())
        );
    }

    outcome.context("catalog validation failed")
}
