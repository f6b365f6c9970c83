use crate::output::{money, percent, print_json, print_table};
use anyhow::Context;
use carbon_core::{
    action::ActionCatalog,
    baseline,
    config::Config,
    optimizer::{self, BudgetPolicy, Infeasibility, OptimizationRequest, OptimizationResult},
    paths, report,
    summary::EmissionsSummary,
};
use clap::Args;
use std::fmt;
use std::path::{Path, PathBuf};

// ---------------------------------------------------------------------------
// Arguments
// ---------------------------------------------------------------------------

#[derive(Args)]
pub struct OptimizeArgs {
    /// Target reduction as a fraction of the baseline (default: optimizer.target_reduction)
    #[arg(long)]
    pub target: Option<f64>,

    /// Maximum total cost of the chosen actions (default: optimizer.budget_cap)
    #[arg(long, conflicts_with = "no_budget_cap")]
    pub budget_cap: Option<f64>,

    /// Ignore any configured budget cap
    #[arg(long)]
    pub no_budget_cap: bool,

    /// Baseline emissions in kg CO2e (default: last forecast yhat, then summary total)
    #[arg(long, conflicts_with = "forecast")]
    pub baseline: Option<f64>,

    /// Forecast CSV with a `yhat` column (default: data/processed/emissions_forecast.csv)
    #[arg(long)]
    pub forecast: Option<PathBuf>,

    /// Maximum number of search nodes (default: optimizer.node_budget)
    #[arg(long)]
    pub node_budget: Option<u64>,

    /// Accept the best plan found so far when the node budget runs out
    #[arg(long)]
    pub best_effort: bool,

    /// Do not write data/processed/optimization_results.{csv,json}
    #[arg(long)]
    pub no_save: bool,

    /// Exit with status 2 when no plan meets the target
    #[arg(long)]
    pub fail_on_infeasible: bool,
}

/// Raised only with `--fail-on-infeasible`; `main` maps it to exit status 2.
#[derive(Debug)]
pub struct Infeasible(pub Infeasibility);

impl fmt::Display for Infeasible {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "no feasible plan: {} ({})", self.0.describe(), self.0)
    }
}

impl std::error::Error for Infeasible {}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

pub fn run(root: &Path, args: OptimizeArgs, json: bool) -> anyhow::Result<()> {
    let config = Config::load(root).context("failed to load config")?;
    let catalog = ActionCatalog::load(root).context("failed to load action catalog")?;

    let (baseline_emissions, source) = resolve_baseline(root, &args)?;
    let target_reduction = args.target.unwrap_or(config.optimizer.target_reduction);
    let budget_cap = if args.no_budget_cap {
        None
    } else {
        args.budget_cap.or(config.optimizer.budget_cap)
    };

    let mut options = config.optimizer.search_options();
    if args.node_budget.is_some() {
        options.node_budget = args.node_budget;
    }
    if args.best_effort {
        options.on_budget_exhausted = BudgetPolicy::BestEffort;
    }

    tracing::info!(
        baseline = baseline_emissions,
        target = target_reduction,
        budget_cap = ?budget_cap,
        actions = catalog.len(),
        "optimizing action plan"
    );

    let request = OptimizationRequest::new(baseline_emissions, target_reduction, catalog.actions.clone())
        .with_budget_cap(budget_cap);
    let result = optimizer::solve_with(&request, &options).context("optimization failed")?;

    if !result.proven_optimal {
        tracing::warn!(
            nodes = result.nodes_explored,
            "node budget exhausted; plan is the best found, not proven optimal"
        );
    }

    if !args.no_save {
        report::write_result(
            &result,
            &paths::results_csv_path(root),
            &paths::results_json_path(root),
        )
        .context("failed to save optimization results")?;
    }

    if json {
        print_json(&serde_json::json!({
            "baseline_emissions": baseline_emissions,
            "baseline_source": source,
            "target_reduction": target_reduction,
            "budget_cap": budget_cap,
            "result": result,
        }))?;
    } else {
        print_plan(&catalog, &request, &result, &source);
    }

    match result.infeasibility {
        Some(reason) if args.fail_on_infeasible => Err(Infeasible(reason).into()),
        _ => Ok(()),
    }
}

// ---------------------------------------------------------------------------
// Baseline resolution
// ---------------------------------------------------------------------------

/// Explicit value, then forecast CSV, then the default forecast, then the summary total.
fn resolve_baseline(root: &Path, args: &OptimizeArgs) -> anyhow::Result<(f64, String)> {
    if let Some(value) = args.baseline {
        return Ok((value, "--baseline".to_string()));
    }

    if let Some(path) = &args.forecast {
        let value = baseline::load_forecast_baseline(path)
            .with_context(|| format!("failed to read forecast {}", path.display()))?;
        return Ok((value, path.display().to_string()));
    }

    let forecast = paths::forecast_path(root);
    if forecast.exists() {
        let value = baseline::load_forecast_baseline(&forecast)
            .with_context(|| format!("failed to read forecast {}", forecast.display()))?;
        return Ok((value, paths::FORECAST_FILE.to_string()));
    }

    let summary = paths::summary_json_path(root);
    if summary.exists() {
        let value = EmissionsSummary::load_json(&summary)
            .context("failed to read emissions summary")?
            .total_emissions;
        return Ok((value, paths::SUMMARY_JSON_FILE.to_string()));
    }

    anyhow::bail!(
        "no baseline available: pass --baseline or --forecast, or run 'carbon summarize' first"
    )
}

// ---------------------------------------------------------------------------
// Human output
// ---------------------------------------------------------------------------

fn print_plan(
    catalog: &ActionCatalog,
    request: &OptimizationRequest,
    result: &OptimizationResult,
    source: &str,
) {
    println!(
        "Baseline emissions: {} kg CO2e ({source})",
        money(request.baseline_emissions)
    );
    println!("Target reduction:   {}", percent(request.target_reduction));
    if let Some(cap) = request.budget_cap {
        println!("Budget cap:         {}", money(cap));
    }
    println!();

    if let Some(reason) = result.infeasibility {
        println!("No feasible plan: {} ({reason})", reason.describe());
        return;
    }

    if result.chosen_action_ids.is_empty() {
        println!("No actions needed.");
    } else {
        println!("Recommended actions:");
        let rows = result
            .chosen_action_ids
            .iter()
            .filter_map(|id| catalog.get(id))
            .map(|a| {
                vec![
                    a.id.clone(),
                    money(a.cost),
                    percent(a.reduction_fraction),
                ]
            })
            .collect();
        print_table(&["ACTION", "COST", "REDUCTION"], rows);
        println!();
    }

    println!("Total cost:          {}", money(result.total_cost));
    println!("Achieved reduction:  {}", percent(result.achieved_reduction));
    println!(
        "Projected emissions: {} kg CO2e",
        money(result.projected_emissions)
    );
    if result.reduction_clamped {
        println!("(summed reductions exceeded 100% and were capped)");
    }
    if !result.proven_optimal {
        println!("(node budget exhausted: best plan found, not proven optimal)");
    }
}
