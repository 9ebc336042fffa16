use thiserror::Error;

/// Errors raised while configuring the aggregator or folding a feature into it.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum StatsError {
    #[error("invalid geometry: {0}")]
    InvalidGeometry(String),

    #[error("cannot compute a bounding box from zero coordinates")]
    EmptyInput,

    #[error("invalid configuration: {0}")]
    Configuration(String),
}

pub type Result<T> = std::result::Result<T, StatsError>;
