use thiserror::Error;

#[derive(Debug, Error)]
pub enum CostingError {
    #[error("Invalid input: {field} — {reason}")]
    InvalidInput { field: String, reason: String },

    #[error("Failed to fetch from data source: {0}")]
    DataAccess(String),

    #[error("Date error: {0}")]
    DateError(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl From<serde_json::Error> for CostingError {
    fn from(e: serde_json::Error) -> Self {
        CostingError::SerializationError(e.to_string())
    }
}
