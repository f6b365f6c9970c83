use crate::error::{CarbonError, Result};
use crate::paths;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

// ---------------------------------------------------------------------------
// Action
// ---------------------------------------------------------------------------

/// A discrete mitigation measure. `reduction_fraction` is relative to the
/// baseline emissions and is summed with the other chosen actions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Action {
    pub id: String,
    pub cost: f64,
    pub reduction_fraction: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl Action {
    pub fn new(id: impl Into<String>, cost: f64, reduction_fraction: f64) -> Self {
        Self {
            id: id.into(),
            cost,
            reduction_fraction,
            description: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Check the id format, cost and reduction bounds of a single action.
    pub fn validate(&self) -> Result<()> {
        paths::validate_action_id(&self.id)?;
        if !self.cost.is_finite() || self.cost < 0.0 {
            return Err(CarbonError::invalid_action(
                &self.id,
                format!("cost must be a non-negative number, got {}", self.cost),
            ));
        }
        if !self.reduction_fraction.is_finite()
            || !(0.0..=1.0).contains(&self.reduction_fraction)
        {
            return Err(CarbonError::invalid_action(
                &self.id,
                format!(
                    "reduction_fraction must be within [0, 1], got {}",
                    self.reduction_fraction
                ),
            ));
        }
        Ok(())
    }
}

/// Validate every action and reject duplicate ids.
pub fn validate_actions(actions: &[Action]) -> Result<()> {
    let mut seen = HashSet::with_capacity(actions.len());
    for action in actions {
        action.validate()?;
        if !seen.insert(action.id.as_str()) {
            return Err(CarbonError::invalid_action(&action.id, "duplicate id"));
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// ActionCatalog
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ActionCatalog {
    #[serde(default)]
    pub actions: Vec<Action>,
}

impl ActionCatalog {
    pub fn new(actions: Vec<Action>) -> Self {
        Self { actions }
    }

    /// Starter catalog written by `carbon init`.
    pub fn seed() -> Self {
        Self::new(vec![
            Action::new("Renewable_Energy", 50000.0, 0.20)
                .with_description("Switch purchased electricity to renewable supply"),
            Action::new("EV_Fleet", 30000.0, 0.15)
                .with_description("Replace the combustion vehicle fleet with EVs"),
            Action::new("Waste_Recycling", 15000.0, 0.10)
                .with_description("Divert operational waste to recycling"),
            Action::new("Carbon_Offsets", 10000.0, 0.05)
                .with_description("Purchase verified carbon offsets"),
        ])
    }

    // ---------------------------------------------------------------------------
    // Persistence
    // ---------------------------------------------------------------------------

    pub fn load(root: &Path) -> Result<Self> {
        let path = paths::catalog_path(root);
        if !path.exists() {
            return Err(CarbonError::NotInitialized);
        }
        let data = std::fs::read_to_string(&path)?;
        let catalog: ActionCatalog = serde_yaml::from_str(&data)?;
        Ok(catalog)
    }

    pub fn save(&self, root: &Path) -> Result<()> {
        let path = paths::catalog_path(root);
        let data = serde_yaml::to_string(self)?;
        crate::io::atomic_write(&path, data.as_bytes())
    }

    // ---------------------------------------------------------------------------
    // Queries
    // ---------------------------------------------------------------------------

    pub fn validate(&self) -> Result<()> {
        validate_actions(&self.actions)
    }

    pub fn get(&self, id: &str) -> Option<&Action> {
        self.actions.iter().find(|a| a.id == id)
    }

    pub fn total_reduction(&self) -> f64 {
        self.actions.iter().map(|a| a.reduction_fraction).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    // ---------------------------------------------------------------------------
    // Mutations
    // ---------------------------------------------------------------------------

    pub fn add(&mut self, action: Action) -> Result<()> {
        action.validate()?;
        if self.get(&action.id).is_some() {
            return Err(CarbonError::ActionExists(action.id));
        }
        self.actions.push(action);
        Ok(())
    }

    pub fn remove(&mut self, id: &str) -> Result<Action> {
        let idx = self
            .actions
            .iter()
            .position(|a| a.id == id)
            .ok_or_else(|| CarbonError::ActionNotFound(id.to_string()))?;
        Ok(self.actions.remove(idx))
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
    fn seed_catalog_is_valid() {
        let catalog = ActionCatalog::seed();
        catalog.validate().unwrap();
        assert_eq!(catalog.len(), 4);
        assert!((catalog.total_reduction() - 0.50).abs() < 1e-12);
    }

    #[test]
    fn negative_cost_rejected() {
        let err = Action::new("Bad", -1.0, 0.1).validate().unwrap_err();
        assert!(matches!(err, CarbonError::InvalidAction { ref id, .. } if id == "Bad"));
    }

    #[test]
    fn reduction_out_of_range_rejected() {
        assert!(Action::new("Over", 1.0, 1.5).validate().is_err());
        assert!(Action::new("Under", 1.0, -0.1).validate().is_err());
        assert!(Action::new("Nan", 1.0, f64::NAN).validate().is_err());
        assert!(Action::new("Inf", f64::INFINITY, 0.1).validate().is_err());
    }

    #[test]
    fn boundary_reductions_accepted() {
        Action::new("Zero", 0.0, 0.0).validate().unwrap();
        Action::new("Full", 10.0, 1.0).validate().unwrap();
    }

    #[test]
    fn duplicate_ids_rejected() {
        let actions = vec![Action::new("A", 1.0, 0.1), Action::new("A", 2.0, 0.2)];
        let err = validate_actions(&actions).unwrap_err();
        assert!(err.to_string().contains("duplicate"));
    }

    #[test]
    fn add_and_remove() {
        let mut catalog = ActionCatalog::default();
        catalog.add(Action::new("Solar", 100.0, 0.3)).unwrap();
        assert!(matches!(
            catalog.add(Action::new("Solar", 5.0, 0.1)),
            Err(CarbonError::ActionExists(_))
        ));
        let removed = catalog.remove("Solar").unwrap();
        assert_eq!(removed.cost, 100.0);
        assert!(matches!(
            catalog.remove("Solar"),
            Err(CarbonError::ActionNotFound(_))
        ));
    }

    #[test]
    fn load_missing_catalog_is_not_initialized() {
        let dir = TempDir::new().unwrap();
        assert!(matches!(
            ActionCatalog::load(dir.path()),
            Err(CarbonError::NotInitialized)
        ));
    }

    #[test]
    fn save_then_load() {
        let dir = TempDir::new().unwrap();
        let catalog = ActionCatalog::seed();
        catalog.save(dir.path()).unwrap();
        let loaded = ActionCatalog::load(dir.path()).unwrap();
        assert_eq!(loaded, catalog);
    }

    #[test]
    fn yaml_without_description() {
        let yaml = "actions:\n  - id: Heat_Pumps\n    cost: 12000\n    reduction_fraction: 0.07\n";
        let catalog: ActionCatalog = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(catalog.actions[0].id, "Heat_Pumps");
        assert_eq!(catalog.actions[0].cost, 12000.0);
        assert!(catalog.actions[0].description.is_none());
    }
}
