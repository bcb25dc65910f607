//! Errors surfaced by the terrain engines.
//!
//! Malformed hole requests are not errors; they are skipped and reported as
//! [`HoleUpdate::Ignored`](crate::trigger::HoleUpdate::Ignored).
//! What remains are bad construction parameters and failures of the geometry machinery itself.

use thiserror::Error;

/// Errors that can occur while building or deforming a terrain.
#[derive(Error, Debug)]
pub enum TerrainError {
    /// The terrain was constructed with parameters that can not describe a surface.
    #[error("invalid terrain configuration: {0}")]
    Config(String),

    /// A boolean operation, triangulation or mesh check failed.
    /// The terrain keeps its previous state when this is returned.
    #[error("geometry operation '{operation}' failed: {message}")]
    Geometry {
        /// Which step failed, ex: `"triangulate"`.
        operation: &'static str,
        /// What went wrong.
        message: String,
    },
}

impl TerrainError {
    pub(crate) fn geometry(operation: &'static str, message: impl Into<String>) -> Self {
        Self::Geometry {
            operation,
            message: message.into(),
        }
    }
}

/// Result type alias for terrain operations.
pub type TerrainResult<T> = Result<T, TerrainError>;
