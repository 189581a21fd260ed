//! Unit tests for the annotation codecs.
//!
//! These tests cover parsing, rewriting on top of a baseline document, and
//! preservation of fields the editor does not interpret.

mod labelme_json_tests;

use crate::model::{Shape, ShapeData, ShapeKey};

/// Assign keys the way the store does after a load.
pub(super) fn keyed(shapes: Vec<ShapeData>) -> Vec<Shape> {
    shapes
        .into_iter()
        .enumerate()
        .map(|(i, data)| Shape {
            key: ShapeKey(i as u64),
            data,
        })
        .collect()
}
