use crate::error::{CarbonError, Result};
use crate::optimizer::{BudgetPolicy, SearchOptions};
use crate::paths;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

// ---------------------------------------------------------------------------
// ConfigWarning / WarnLevel
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigWarning {
    pub level: WarnLevel,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WarnLevel {
    Warning,
    Error,
}

// ---------------------------------------------------------------------------
// OptimizerConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OptimizerConfig {
    #[serde(default = "default_target_reduction")]
    pub target_reduction: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub budget_cap: Option<f64>,
    #[serde(default = "default_node_budget")]
    pub node_budget: Option<u64>,
    #[serde(default)]
    pub on_budget_exhausted: BudgetPolicy,
}

fn default_target_reduction() -> f64 {
    0.25
}

fn default_node_budget() -> Option<u64> {
    Some(5_000_000)
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        Self {
            target_reduction: default_target_reduction(),
            budget_cap: None,
            node_budget: default_node_budget(),
            on_budget_exhausted: BudgetPolicy::default(),
        }
    }
}

impl OptimizerConfig {
    pub fn search_options(&self) -> SearchOptions {
        SearchOptions {
            node_budget: self.node_budget,
            on_budget_exhausted: self.on_budget_exhausted,
        }
    }
}

// ---------------------------------------------------------------------------
// ScopeConfig
// ---------------------------------------------------------------------------

/// NAICS code to GHG scope mapping used by the emissions summary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScopeConfig {
    #[serde(default = "default_scope")]
    pub default_scope: String,
    #[serde(default = "default_naics_scopes")]
    pub naics: BTreeMap<String, String>,
}

fn default_scope() -> String {
    "Scope 3".to_string()
}

fn default_naics_scopes() -> BTreeMap<String, String> {
    let mut m = BTreeMap::new();
    // Soybean farming
    m.insert("111110".to_string(), "Scope 3".to_string());
    // Electric power generation
    m.insert("221100".to_string(), "Scope 2".to_string());
    m
}

impl Default for ScopeConfig {
    fn default() -> Self {
        Self {
            default_scope: default_scope(),
            naics: default_naics_scopes(),
        }
    }
}

impl ScopeConfig {
    pub fn scope_for(&self, naics_code: &str) -> &str {
        self.naics
            .get(naics_code)
            .map(String::as_str)
            .unwrap_or(&self.default_scope)
    }
}

// ---------------------------------------------------------------------------
// DataConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DataConfig {
    /// Raw emission-factor CSV used by `carbon etl` when `--input` is omitted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw_input: Option<String>,
}

// ---------------------------------------------------------------------------
// Config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectConfig {
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_version")]
    pub version: u32,
    pub project: ProjectConfig,
    #[serde(default)]
    pub optimizer: OptimizerConfig,
    #[serde(default)]
    pub scopes: ScopeConfig,
    #[serde(default)]
    pub data: DataConfig,
}

fn default_version() -> u32 {
    1
}

impl Config {
    pub fn new(project_name: impl Into<String>) -> Self {
        Self {
            version: default_version(),
            project: ProjectConfig {
                name: project_name.into(),
            },
            optimizer: OptimizerConfig::default(),
            scopes: ScopeConfig::default(),
            data: DataConfig::default(),
        }
    }

    pub fn load(root: &Path) -> Result<Self> {
        let path = paths::config_path(root);
        if !path.exists() {
            return Err(CarbonError::NotInitialized);
        }
        let data = std::fs::read_to_string(&path)?;
        let cfg: Config = serde_yaml::from_str(&data)?;
        Ok(cfg)
    }

    pub fn save(&self, root: &Path) -> Result<()> {
        let path = paths::config_path(root);
        crate::io::atomic_write(&path, self.to_yaml()?.as_bytes())
    }

    pub fn to_yaml(&self) -> Result<String> {
        Ok(serde_yaml::to_string(self)?)
    }

    pub fn validate(&self) -> Vec<ConfigWarning> {
        let mut warnings = Vec::new();
        let opt = &self.optimizer;

        if !opt.target_reduction.is_finite() || !(0.0..=1.0).contains(&opt.target_reduction) {
            warnings.push(ConfigWarning {
                level: WarnLevel::Error,
                message: format!(
                    "optimizer.target_reduction must be within [0, 1], got {}",
                    opt.target_reduction
                ),
            });
        } else if opt.target_reduction == 0.0 {
            warnings.push(ConfigWarning {
                level: WarnLevel::Warning,
                message: "optimizer.target_reduction is 0; no action will ever be selected"
                    .to_string(),
            });
        }

        if let Some(cap) = opt.budget_cap {
            if !cap.is_finite() || cap < 0.0 {
                warnings.push(ConfigWarning {
                    level: WarnLevel::Error,
                    message: format!("optimizer.budget_cap must be non-negative, got {cap}"),
                });
            }
        }

        match opt.node_budget {
            Some(0) => warnings.push(ConfigWarning {
                level: WarnLevel::Error,
                message: "optimizer.node_budget of 0 aborts every search".to_string(),
            }),
            None => warnings.push(ConfigWarning {
                level: WarnLevel::Warning,
                message: "optimizer.node_budget is unset; large catalogs may search unbounded"
                    .to_string(),
            }),
            Some(_) => {}
        }

        if self.scopes.default_scope.trim().is_empty() {
            warnings.push(ConfigWarning {
                level: WarnLevel::Error,
                message: "scopes.default_scope is empty".to_string(),
            });
        }
        for (code, scope) in &self.scopes.naics {
            if !code.chars().all(|c| c.is_ascii_digit()) {
                warnings.push(ConfigWarning {
                    level: WarnLevel::Warning,
                    message: format!("scopes.naics key '{code}' is not a numeric NAICS code"),
                });
            }
            if scope.trim().is_empty() {
                warnings.push(ConfigWarning {
                    level: WarnLevel::Error,
                    message: format!("scopes.naics '{code}' maps to an empty scope"),
                });
            }
        }

        warnings
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn default_config_roundtrip() {
        let cfg = Config::new("plant-a");
        let yaml = serde_yaml::to_string(&cfg).unwrap();
        let parsed: Config = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(parsed.project.name, "plant-a");
        assert_eq!(parsed.version, 1);
        assert_eq!(parsed.optimizer.target_reduction, 0.25);
        assert_eq!(parsed.optimizer.node_budget, Some(5_000_000));
    }

    #[test]
    fn minimal_yaml_uses_defaults() {
        let yaml = "project:\n  name: minimal\n";
        let cfg: Config = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(cfg.version, 1);
        assert_eq!(cfg.optimizer.target_reduction, 0.25);
        assert!(cfg.optimizer.budget_cap.is_none());
        assert_eq!(cfg.optimizer.on_budget_exhausted, BudgetPolicy::Fail);
        assert_eq!(cfg.scopes.scope_for("221100"), "Scope 2");
        assert!(cfg.data.raw_input.is_none());
    }

    #[test]
    fn budget_cap_not_serialized_when_unset() {
        let out = serde_yaml::to_string(&Config::new("p")).unwrap();
        assert!(!out.contains("budget_cap"));
    }

    #[test]
    fn best_effort_policy_parses() {
        let yaml = "project:\n  name: p\noptimizer:\n  on_budget_exhausted: best_effort\n  budget_cap: 40000\n";
        let cfg: Config = serde_yaml::from_str(yaml).unwrap();
        let options = cfg.optimizer.search_options();
        assert_eq!(options.on_budget_exhausted, BudgetPolicy::BestEffort);
        assert_eq!(cfg.optimizer.budget_cap, Some(40000.0));
    }

    #[test]
    fn unknown_naics_code_uses_default_scope() {
        let scopes = ScopeConfig::default();
        assert_eq!(scopes.scope_for("999999"), "Scope 3");
        assert_eq!(scopes.scope_for("111110"), "Scope 3");
    }

    #[test]
    fn validate_default_config_no_warnings() {
        assert!(Config::new("p").validate().is_empty());
    }

    #[test]
    fn validate_out_of_range_target_is_error() {
        let mut cfg = Config::new("p");
        cfg.optimizer.target_reduction = 1.5;
        let warnings = cfg.validate();
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].level, WarnLevel::Error);
        assert!(warnings[0].message.contains("target_reduction"));
    }

    #[test]
    fn validate_zero_node_budget_is_error() {
        let mut cfg = Config::new("p");
        cfg.optimizer.node_budget = Some(0);
        assert!(cfg.validate().iter().any(|w| w.level == WarnLevel::Error));
    }

    #[test]
    fn validate_unbounded_search_is_warning() {
        let mut cfg = Config::new("p");
        cfg.optimizer.node_budget = None;
        let warnings = cfg.validate();
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].level, WarnLevel::Warning);
    }

    #[test]
    fn validate_non_numeric_naics_key() {
        let mut cfg = Config::new("p");
        cfg.scopes
            .naics
            .insert("abc".to_string(), "Scope 1".to_string());
        assert!(cfg
            .validate()
            .iter()
            .any(|w| w.message.contains("'abc'")));
    }

    #[test]
    fn load_missing_config_is_not_initialized() {
        let dir = TempDir::new().unwrap();
        assert!(matches!(
            Config::load(dir.path()),
            Err(CarbonError::NotInitialized)
        ));
    }

    #[test]
    fn save_then_load() {
        let dir = TempDir::new().unwrap();
        let mut cfg = Config::new("p");
        cfg.optimizer.budget_cap = Some(1000.0);
        cfg.save(dir.path()).unwrap();
        let loaded = Config::load(dir.path()).unwrap();
        assert_eq!(loaded.optimizer.budget_cap, Some(1000.0));
    }
}
