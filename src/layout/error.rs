//! Error types for footprint geometry

use thiserror::Error;

/// Errors raised while turning an asset outline into a usable polygon
#[derive(Debug, Error, PartialEq)]
pub enum GeometryError {
    /// A vertex had a NaN or infinite coordinate
    #[error("footprint has a non-finite vertex at index {index}")]
    NonFinite { index: usize },

    /// Fewer than three distinct vertices
    #[error("footprint needs at least 3 distinct vertices, got {count}")]
    TooFewVertices { count: usize },

    /// Zero-width repair produced no area
    #[error("footprint is degenerate: {reason}")]
    Degenerate { reason: String },
}

impl GeometryError {
    /// Create a degenerate-geometry error
    pub fn degenerate(reason: impl Into<String>) -> Self {
        Self::Degenerate {
            reason: reason.into(),
        }
    }
}
