use thiserror::Error;

#[derive(Error, Debug)]
pub enum AnalyticsError {
    #[error("Invalid reference instant '{0}': expected an RFC 3339 timestamp or a YYYY-MM-DD date")]
    InvalidReferenceInstant(String),

    #[error("Fiscal year start month must be between 1 and 12, got {0}")]
    InvalidStartMonth(u32),

    #[error("Date out of the supported calendar range while computing {0}")]
    DateOutOfRange(String),

    #[error("Unknown transaction type '{0}'")]
    InvalidTransactionType(String),

    #[error("Arithmetic overflow while computing {0}")]
    Overflow(String),
}
