//! Errors raised when an edit would produce invalid geometry.

use thiserror::Error;

/// A rejected geometry edit.
///
/// These never reach the user; the edit is dropped or clamped and the reason
/// is logged at debug level.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GeometryError {
    #[error("Polygon needs at least 3 vertices, got {count}")]
    PolygonTooSmall { count: usize },

    #[error("Box is too small: {width}x{height}")]
    BoxTooSmall { width: f64, height: f64 },

    #[error("Unknown shape")]
    UnknownShape,

    #[error("Vertex {index} out of range for polygon with {len} vertices")]
    VertexOutOfRange { index: usize, len: usize },

    #[error("Shape is not a polygon")]
    NotAPolygon,

    #[error("Shape name must not be empty")]
    EmptyName,

    #[error("No new shape is waiting for a label")]
    NoPendingLabel,
}
