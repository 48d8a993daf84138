use thiserror::Error;

use crate::parse::ParseError;
use crate::types::ConfigError;

/// Unified error type covering parsing, validation, I/O, and output.
///
/// Returned by convenience methods like
/// [`Config::from_source()`](crate::Config::from_source) and
/// [`Config::from_file()`](crate::Config::from_file).
#[derive(Debug, Error)]
pub enum CondcheckError {
    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[cfg(feature = "plan-file")]
    #[error(transparent)]
    Serialize(#[from] crate::serial::SerializeError),

    #[cfg(feature = "plan-file")]
    #[error(transparent)]
    Deserialize(#[from] crate::serial::DeserializeError),
}
