//! Error types for the roll layer.

/// Errors that can occur while managing saved formulas.
#[derive(Debug, thiserror::Error)]
pub enum RollError {
    /// No saved formula has this name.
    #[error("no saved formula named {0}")]
    UnknownFormula(String),

    /// A library export could not be serialized.
    #[error("formula library JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
