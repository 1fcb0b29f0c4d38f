pub mod aggregation;
pub mod allocation;
pub mod error;
pub mod pricing;
pub mod rates;
pub mod types;

pub use error::CostingError;
pub use types::*;

/// Standard result type for all costing operations
pub type CostingResult<T> = Result<T, CostingError>;
