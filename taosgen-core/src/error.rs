//! Typed errors for the core crate.
//!
//! Mirrors the error-kind table in the design: configuration mistakes are
//! fatal and reported up through the CLI as `anyhow` chains, while pool and
//! generator errors are recoverable at a narrower scope (a single row, a
//! single batch) and so get their own small enums.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum PoolError {
    #[error("memory pool exhausted: no free block became available within the acquire timeout")]
    AcquireTimeout,
    #[error("memory pool is shutting down")]
    Terminated,
    #[error("table block '{table}' is full: used_rows={used_rows} max_rows={max_rows}")]
    TableBlockFull {
        table: String,
        used_rows: usize,
        max_rows: usize,
    },
    #[error("unknown table '{0}' requested from memory pool")]
    UnknownTable(String),
}

#[derive(Debug, Error)]
pub enum GeneratorError {
    #[error("order generator requires an integer column type, got {0:?}")]
    NonIntegerOrderTarget(crate::cell::ColumnTypeTag),
    #[error("expression '{expr}' failed to evaluate: {source}")]
    ExpressionEval {
        expr: String,
        source: evalexpr::EvalexprError,
    },
    #[error("expression result cannot be coerced into {target:?} without silent truncation")]
    LossyCoercion { target: crate::cell::ColumnTypeTag },
    #[error("invalid timestamp literal '{0}'")]
    InvalidTimestamp(String),
    #[error("unknown timestamp precision '{0}'")]
    UnknownPrecision(String),
}

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("pipeline has been terminated")]
    Terminated,
}
