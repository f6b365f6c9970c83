use crate::error::Result;
use crate::optimizer::{Infeasibility, OptimizationResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Flat rendering of an [`OptimizationResult`] for dashboards and CSV export.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultRecord {
    /// Chosen ids joined with ", ".
    pub chosen_actions: String,
    pub total_cost: f64,
    /// Achieved reduction as a percentage of the baseline.
    pub achieved_reduction_pct: f64,
    pub projected_emissions: f64,
    pub feasible: bool,
    /// Empty when feasible.
    #[serde(default)]
    pub infeasibility: String,
    pub generated_at: DateTime<Utc>,
}

impl ResultRecord {
    pub fn from_result(result: &OptimizationResult, generated_at: DateTime<Utc>) -> Self {
        Self {
            chosen_actions: result.chosen_action_ids.join(", "),
            total_cost: result.total_cost,
            achieved_reduction_pct: result.achieved_reduction * 100.0,
            projected_emissions: result.projected_emissions,
            feasible: result.feasible,
            infeasibility: result
                .infeasibility
                .map(Infeasibility::as_str)
                .unwrap_or_default()
                .to_string(),
            generated_at,
        }
    }

    pub fn write_csv(&self, path: &Path) -> Result<()> {
        crate::io::write_csv(path, [self])
    }
}

/// Persist both the flat CSV record and the full result as JSON.
pub fn write_result(
    result: &OptimizationResult,
    csv_path: &Path,
    json_path: &Path,
) -> Result<ResultRecord> {
    let record = ResultRecord::from_result(result, Utc::now());
    record.write_csv(csv_path)?;
    crate::io::write_json(json_path, result)?;
    tracing::info!(
        csv = %csv_path.display(),
        json = %json_path.display(),
        "optimization result saved"
    );
    Ok(record)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::Action;
    use crate::optimizer::{solve, OptimizationRequest};
    use tempfile::TempDir;

    fn scenario(budget_cap: Option<f64>) -> OptimizationResult {
        let actions = vec![
            Action::new("Renewable_Energy", 50000.0, 0.20),
            Action::new("EV_Fleet", 30000.0, 0.15),
            Action::new("Waste_Recycling", 15000.0, 0.10),
            Action::new("Carbon_Offsets", 10000.0, 0.05),
        ];
        solve(&OptimizationRequest::new(1_000_000.0, 0.25, actions).with_budget_cap(budget_cap))
            .unwrap()
    }

    #[test]
    fn record_joins_ids_and_converts_percentage() {
        let record = ResultRecord::from_result(&scenario(None), Utc::now());
        assert_eq!(record.chosen_actions, "EV_Fleet, Waste_Recycling");
        assert!((record.achieved_reduction_pct - 25.0).abs() < 1e-9);
        assert!(record.feasible);
        assert!(record.infeasibility.is_empty());
    }

    #[test]
    fn infeasible_record_carries_reason() {
        let record = ResultRecord::from_result(&scenario(Some(40000.0)), Utc::now());
        assert!(!record.feasible);
        assert_eq!(record.infeasibility, "budget_exceeded");
        assert_eq!(record.chosen_actions, "");
    }

    #[test]
    fn write_result_persists_csv_and_json() {
        let dir = TempDir::new().unwrap();
        let csv_path = dir.path().join("out/results.csv");
        let json_path = dir.path().join("out/results.json");
        let result = scenario(None);
        let record = write_result(&result, &csv_path, &json_path).unwrap();

        let mut rdr = csv::Reader::from_path(&csv_path).unwrap();
        let rows: Vec<ResultRecord> = rdr.deserialize::<ResultRecord>().map(|r| r.unwrap()).collect();
        assert_eq!(rows, vec![record]);

        let json: OptimizationResult =
            serde_json::from_str(&std::fs::read_to_string(&json_path).unwrap()).unwrap();
        assert_eq!(json, result);
    }
}
