pub mod config;
pub mod error;
pub mod time_value;
pub mod types;

#[cfg(feature = "financing")]
pub mod financing;

#[cfg(feature = "savings")]
pub mod savings;

#[cfg(feature = "sizing")]
pub mod sizing;

pub use config::EngineConfig;
pub use error::SolarFinanceError;
pub use types::*;

/// Standard result type for all solar-finance operations
pub type SolarFinanceResult<T> = Result<T, SolarFinanceError>;
