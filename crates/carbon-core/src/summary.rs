use crate::config::ScopeConfig;
use crate::dataset::EmissionRecord;
use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

// ---------------------------------------------------------------------------
// EmissionsSummary
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndustryTotal {
    pub industry: String,
    pub emissions: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmissionsSummary {
    /// kg CO2e across every record.
    pub total_emissions: f64,
    pub emissions_by_scope: BTreeMap<String, f64>,
    /// Highest-emitting industry first.
    pub emissions_by_industry: Vec<IndustryTotal>,
}

#[derive(Debug, Serialize)]
struct MetricRow {
    #[serde(rename = "Metric")]
    metric: String,
    #[serde(rename = "Value")]
    value: f64,
}

impl EmissionsSummary {
    pub fn from_records(records: &[EmissionRecord], scopes: &ScopeConfig) -> Self {
        let mut total_emissions = 0.0;
        let mut emissions_by_scope: BTreeMap<String, f64> = BTreeMap::new();
        let mut by_industry: BTreeMap<&str, f64> = BTreeMap::new();

        for record in records {
            total_emissions += record.emission_factor;
            *emissions_by_scope
                .entry(scopes.scope_for(&record.naics_code).to_string())
                .or_default() += record.emission_factor;
            *by_industry.entry(record.industry.as_str()).or_default() += record.emission_factor;
        }

        let mut emissions_by_industry: Vec<IndustryTotal> = by_industry
            .into_iter()
            .map(|(industry, emissions)| IndustryTotal {
                industry: industry.to_string(),
                emissions,
            })
            .collect();
        // Stable sort keeps the BTreeMap's name order for equal totals.
        emissions_by_industry.sort_by(|a, b| b.emissions.total_cmp(&a.emissions));

        Self {
            total_emissions,
            emissions_by_scope,
            emissions_by_industry,
        }
    }

    // ---------------------------------------------------------------------------
    // Persistence
    // ---------------------------------------------------------------------------

    /// Write the `Metric,Value` table: the overall total, then one row per scope.
    pub fn write_csv(&self, path: &Path) -> Result<()> {
        let total = std::iter::once(MetricRow {
            metric: "Total Emissions (kg CO2e)".to_string(),
            value: self.total_emissions,
        });
        let scopes = self.emissions_by_scope.iter().map(|(scope, value)| MetricRow {
            metric: format!("{scope} Emissions"),
            value: *value,
        });
        crate::io::write_csv(path, total.chain(scopes))
    }

    pub fn write_json(&self, path: &Path) -> Result<()> {
        crate::io::write_json(path, self)
    }

    pub fn load_json(path: &Path) -> Result<Self> {
        let data = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&data)?)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
