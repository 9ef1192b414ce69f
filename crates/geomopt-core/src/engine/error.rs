use thiserror::Error;

use super::config::ConfigError;
use crate::core::models::geometry::GeometryError;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Initialization failed: {0}")]
    Initialization(String),

    #[error("Configuration error: {source}")]
    Config {
        #[from]
        source: ConfigError,
    },

    #[error("Dispatcher stepped before allocate()")]
    NotAllocated,

    #[error("Dimension mismatch: run was allocated for {expected} components, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Geometry error: {source}")]
    Geometry {
        #[from]
        source: GeometryError,
    },

    #[error("Force evaluation failed: {message}")]
    ForceEvaluation { message: String },
}
