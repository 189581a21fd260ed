//! Data models for the QC canvas.

mod attributes;
mod error;
mod image;
mod shape;

pub use attributes::{AttributeDef, AttributeKind, AttributeSchema, Attributes, ResolvedAttribute};
pub use error::GeometryError;
pub use image::{ImageRef, QcMode};
pub use shape::{
    DisplayRect, DisplayShape, LatLng, NaturalBox, Shape, ShapeData, ShapeGeometry, ShapeKey,
    points_bounds, polygon_contains,
};
