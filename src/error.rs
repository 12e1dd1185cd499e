//! # Error Types
//!
//! Every failure is terminal for a packing session.

use std::collections::TryReserveError;

/// Errors raised while configuring or running a packing session
#[derive(Debug, thiserror::Error)]
pub enum PackError {
    /// Missing, malformed or out-of-range configuration input
    #[error("configuration error: {0}")]
    Config(String),

    /// Requested packing fraction exceeds the feasibility cap
    #[error("requested packing fraction {requested:.4} exceeds the limit {limit:.2}")]
    Infeasible { requested: f64, limit: f64 },

    /// Broken internal invariant (derivation bug, not bad input)
    #[error("internal consistency error: {0}")]
    Internal(String),

    /// Grid or registry storage could not be grown
    #[error("allocation failure: {0}")]
    Allocation(#[from] TryReserveError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl PackError {
    pub fn config(msg: impl Into<String>) -> Self {
        PackError::Config(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        PackError::Internal(msg.into())
    }
}

pub type PackResult<T> = Result<T, PackError>;
