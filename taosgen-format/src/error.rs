//! Typed errors for the formatter crate.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum FormatError {
    #[error("unknown format type '{0}'")]
    UnknownFormatType(String),
    #[error("statement formatter requires target '{expected}', got '{actual}'")]
    UnsupportedTarget { expected: &'static str, actual: String },
    #[error(transparent)]
    Core(#[from] taosgen_core::error::PoolError),
}
