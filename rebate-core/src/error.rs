//! Caller-facing input validation errors.
//!
//! Catalog problems are not errors; see [`crate::validate::CatalogIssue`].

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum EngineError {
    #[error("query must name a merchant or category")]
    EmptyQuery,

    #[error("amount must be a finite number >= 0, got {0}")]
    InvalidAmount(f64),

    #[error("max cards must be at least 1, got {0}")]
    InvalidMaxCards(usize),

    #[error("result limit must be at least 1")]
    InvalidLimit,

    #[error("spend profile has no category with spend > 0")]
    EmptySpendProfile,

    #[error("unknown reward preference '{0}', expected cash or miles")]
    InvalidPreference(String),

    #[error("invalid timezone: {0}")]
    InvalidTimezone(String),

    #[error("invalid date '{0}', expected YYYY-MM-DD")]
    InvalidDate(String),
}

pub type EngineResult<T> = std::result::Result<T, EngineError>;
