// ❗ Core errors - everything the aggregation engine can refuse to do
// I/O edges (parser, config, task) wrap these in anyhow with context.

use thiserror::Error;

/// Result type for the in-memory engine
pub type CoreResult<T> = std::result::Result<T, CoreError>;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CoreError {
    /// Lookup key could not be interpreted as a taxon id
    #[error("invalid taxon key: {0:?}")]
    InvalidKey(String),

    /// Tried to merge an observation or taxon into a taxon with another id
    #[error("taxon mismatch: expected taxon {expected}, found {found}")]
    TaxonMismatch { expected: i64, found: i64 },

    /// Modern window leaves no older seasons to compare against
    #[error("modern window of {window} season(s) needs more than {available} season(s) of data")]
    InsufficientSeasons { window: usize, available: usize },

    /// An input row carries a date we cannot read
    #[error("malformed date {value:?} on observation {external_id}")]
    MalformedDate { external_id: u64, value: String },

    /// Period months outside 1..=12
    #[error("invalid period: months must be 1-12, got {first}..{last}")]
    InvalidPeriod { first: u32, last: u32 },

    /// Configuration file is well-formed YAML but semantically wrong
    #[error("configuration error: {0}")]
    Config(String),
}
