use thiserror::Error;

#[derive(Debug, Error)]
pub enum CarbonError {
    #[error("not initialized: run 'carbon init'")]
    NotInitialized,

    #[error("invalid action '{id}': {reason}")]
    InvalidAction { id: String, reason: String },

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("search aborted after visiting {budget} nodes without proving optimality")]
    SearchBudgetExceeded { budget: u64 },

    #[error("action not found: {0}")]
    ActionNotFound(String),

    #[error("action already exists: {0}")]
    ActionExists(String),

    #[error("missing required column: {0}")]
    MissingColumn(String),

    #[error("row {row}: column '{column}' has invalid value '{value}'")]
    InvalidField {
        row: usize,
        column: String,
        value: String,
    },

    #[error("forecast contains no rows")]
    EmptyForecast,

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Csv(#[from] csv::Error),
}

impl CarbonError {
    pub(crate) fn invalid_action(id: &str, reason: impl Into<String>) -> Self {
        CarbonError::InvalidAction {
            id: id.to_string(),
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, CarbonError>;
