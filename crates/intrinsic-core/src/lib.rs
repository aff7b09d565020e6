pub mod error;
pub mod financials;
pub mod time_value;
pub mod types;

#[cfg(feature = "valuation")]
pub mod valuation;

#[cfg(feature = "valuation")]
pub mod scenarios;

pub use error::IntrinsicError;
pub use types::*;

/// Standard result type for all valuation operations
pub type IntrinsicResult<T> = Result<T, IntrinsicError>;
