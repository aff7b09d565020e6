use rust_decimal::Decimal;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum IntrinsicError {
    #[error("Invalid input: {field} — {reason}")]
    InvalidInput { field: String, reason: String },

    /// Valuation cannot proceed: no usable history or no shares outstanding.
    #[error("Insufficient data to value: {0}")]
    InsufficientData(String),

    /// Perpetuity growth requires the discount rate to exceed terminal growth.
    #[error("Terminal value undefined: discount rate ({discount_rate}) must exceed terminal growth ({terminal_growth})")]
    TerminalValueUndefined {
        discount_rate: Decimal,
        terminal_growth: Decimal,
    },

    /// A result left the representable decimal range (overflow, or a
    /// compounding factor that collapsed to zero).
    #[error("Value out of decimal range in {context}")]
    OutOfRange { context: String },

    #[error("Division by zero in {context}")]
    DivisionByZero { context: String },

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl IntrinsicError {
    pub(crate) fn out_of_range(context: impl Into<String>) -> Self {
        IntrinsicError::OutOfRange {
            context: context.into(),
        }
    }
}

impl From<serde_json::Error> for IntrinsicError {
    fn from(e: serde_json::Error) -> Self {
        IntrinsicError::SerializationError(e.to_string())
    }
}
