//! Error types for the boxclust clustering library.

use thiserror::Error;

/// Primary error type for loading input and running the clustering engine.
#[derive(Error, Debug)]
pub enum ClusterError {
    #[error("invalid box {id}: {reason}")]
    InvalidBox { id: String, reason: String },

    #[error("invalid page dimensions {width}x{height}")]
    InvalidPage { width: f64, height: f64 },

    #[error("invalid color: {0}")]
    InvalidColor(String),

    #[error("invalid clustering parameter {name}: {reason}")]
    InvalidParams { name: &'static str, reason: String },

    #[error("spatial index out of sync: {0}")]
    IndexDesync(String),

    #[error("thread pool error: {0}")]
    ThreadPool(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Convenience Result type alias for ClusterError.
pub type Result<T> = std::result::Result<T, ClusterError>;
