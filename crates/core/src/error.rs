use thiserror::Error;

/// Conditions a caller of the normalization pipeline needs to tell apart.
#[derive(Debug, Error)]
pub enum NormalizeError {
    #[error("no market snapshot for {0}")]
    NoDataForDate(String),

    #[error("malformed snapshot: {0}")]
    MalformedSnapshot(String),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// A single cross-rate that could not be derived. Never aborts the report;
/// the pair is dropped and the rest continue.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DerivationError {
    #[error("{pair}: no {leg} quote in snapshot")]
    MissingLeg { pair: String, leg: String },

    #[error("{pair}: unusable {leg} price {price:?}")]
    BadDenominator {
        pair: String,
        leg: String,
        price: Option<f64>,
    },
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("unknown report kind: {0}")]
    UnknownKind(String),

    #[error("exchange-rate pair must be quoted as XXX/KRW (got {0})")]
    UnsupportedPair(String),

    #[error("importance threshold must be 1..=3 (got {0})")]
    ImportanceOutOfRange(u8),

    #[error("duplicate section key: {0}")]
    DuplicateSection(String),
}
