use crate::error::{CarbonError, Result};
use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

// ---------------------------------------------------------------------------
// Directory constants
// ---------------------------------------------------------------------------

pub const CARBON_DIR: &str = ".carbon";
pub const CONFIG_FILE: &str = ".carbon/config.yaml";
pub const CATALOG_FILE: &str = ".carbon/actions.yaml";

pub const RAW_DIR: &str = "data/raw";
pub const PROCESSED_DIR: &str = "data/processed";

pub const CLEANED_DATA_FILE: &str = "data/processed/cleaned_co2e_data.csv";
pub const SUMMARY_CSV_FILE: &str = "data/processed/emissions_summary.csv";
pub const SUMMARY_JSON_FILE: &str = "data/processed/emissions_summary.json";
pub const FORECAST_FILE: &str = "data/processed/emissions_forecast.csv";
pub const RESULTS_CSV_FILE: &str = "data/processed/optimization_results.csv";
pub const RESULTS_JSON_FILE: &str = "data/processed/optimization_results.json";

// ---------------------------------------------------------------------------
// Path helpers
// ---------------------------------------------------------------------------

pub fn carbon_dir(root: &Path) -> PathBuf {
    root.join(CARBON_DIR)
}

pub fn config_path(root: &Path) -> PathBuf {
    root.join(CONFIG_FILE)
}

pub fn catalog_path(root: &Path) -> PathBuf {
    root.join(CATALOG_FILE)
}

pub fn cleaned_data_path(root: &Path) -> PathBuf {
    root.join(CLEANED_DATA_FILE)
}

pub fn summary_csv_path(root: &Path) -> PathBuf {
    root.join(SUMMARY_CSV_FILE)
}

pub fn summary_json_path(root: &Path) -> PathBuf {
    root.join(SUMMARY_JSON_FILE)
}

pub fn forecast_path(root: &Path) -> PathBuf {
    root.join(FORECAST_FILE)
}

pub fn results_csv_path(root: &Path) -> PathBuf {
    root.join(RESULTS_CSV_FILE)
}

pub fn results_json_path(root: &Path) -> PathBuf {
    root.join(RESULTS_JSON_FILE)
}

// ---------------------------------------------------------------------------
// Action id validation
// ---------------------------------------------------------------------------

static ACTION_ID_RE: OnceLock<Regex> = OnceLock::new();

fn action_id_re() -> &'static Regex {
    ACTION_ID_RE.get_or_init(|| Regex::new(r"^[A-Za-z0-9][A-Za-z0-9_.\-]*$").unwrap())
}

/// Ids are joined with ", " for display, so commas and whitespace are rejected.
pub fn validate_action_id(id: &str) -> Result<()> {
    if id.is_empty() || id.len() > 64 || !action_id_re().is_match(id) {
        return Err(CarbonError::invalid_action(
            id,
            "id must be 1-64 characters of letters, digits, '_', '-' or '.'",
        ));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_action_ids() {
        for id in ["EV_Fleet", "a", "solar-2030", "phase2.retrofit", "X1"] {
            validate_action_id(id).unwrap_or_else(|_| panic!("expected valid: {id}"));
        }
    }

    #[test]
    fn invalid_action_ids() {
        let too_long = "a".repeat(65);
        for id in ["", "_leading", "has space", "a,b", "tab\there", too_long.as_str()] {
            assert!(validate_action_id(id).is_err(), "expected invalid: {id}");
        }
    }

    #[test]
    fn path_helpers() {
        let root = Path::new("/tmp/proj");
        assert_eq!(
            config_path(root),
            PathBuf::from("/tmp/proj/.carbon/config.yaml")
        );
        assert_eq!(
            catalog_path(root),
            PathBuf::from("/tmp/proj/.carbon/actions.yaml")
        );
        assert_eq!(
            results_csv_path(root),
            PathBuf::from("/tmp/proj/data/processed/optimization_results.csv")
        );
    }
}
