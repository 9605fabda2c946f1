//! Error type shared by every analysis in the crate.

use thiserror::Error;

/// Errors raised while loading, validating or analysing skeletons and volumes.
#[derive(Debug, Error)]
pub enum PnError {
    /// None of the candidate leaves of the longest neurites ended in a known volume.
    #[error("skeleton {skeleton_id}: no terminal volume found after {attempts} candidate leaves")]
    NoTerminalVolume { skeleton_id: i64, attempts: usize },

    #[error("skeleton {skeleton_id} has no soma to root at")]
    MissingSoma { skeleton_id: i64 },

    #[error("skeleton {skeleton_id} is not a valid tree: {reason}")]
    InvalidSkeleton { skeleton_id: i64, reason: String },

    #[error("skeleton {skeleton_id} has no node {node_id}")]
    UnknownNode { skeleton_id: i64, node_id: i64 },

    #[error("skeleton {0} not found")]
    SkeletonNotFound(i64),

    #[error("volume '{0}' not found")]
    VolumeNotFound(String),

    #[error("volume '{name}' is invalid: {reason}")]
    InvalidVolume { name: String, reason: String },

    #[error("shape mismatch: expected {expected:?}, got {actual:?}")]
    ShapeMismatch {
        expected: (usize, usize),
        actual: (usize, usize),
    },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("parse error on line {line}: {message}")]
    Parse { line: usize, message: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl PnError {
    /// Whether a batch may log this error and carry on with the next skeleton.
    pub fn is_skippable(&self) -> bool {
        matches!(self, PnError::NoTerminalVolume { .. })
    }
}

pub type Result<T> = std::result::Result<T, PnError>;
