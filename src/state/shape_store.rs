//! Ordered shape storage for the current image.

use std::collections::HashMap;

use crate::constants::MIN_POLYGON_VERTICES;
use crate::model::{GeometryError, Shape, ShapeData, ShapeGeometry, ShapeKey};

/// Shapes of the active image, in persisted order, plus the dirty set.
///
/// Positions are the dense ids the persisted formats understand; they shift
/// when a shape is removed. [`ShapeKey`] stays fixed for the lifetime of a
/// load and is what selection and drag sessions hold on to.
///
/// Every committed change bumps a revision counter. The dirty set remembers
/// the revision of each shape's latest change, so a save that finishes after
/// further edits only clears what it actually wrote.
#[derive(Debug, Clone, Default)]
pub struct ShapeStore {
    shapes: Vec<Shape>,
    next_key: u64,
    /// Shape key -> revision of its latest uncommitted change
    dirty: HashMap<ShapeKey, u64>,
    revision: u64,
    saved_revision: u64,
    /// Bumped on every load/clear so late save completions can tell images apart
    generation: u64,
}

impl ShapeStore {
    pub fn new() -> Self {
        Self::default()
    }

    // ========================================================================
    // Lifecycle
    // ========================================================================

    /// Replace the contents with freshly parsed shapes. The result is clean.
    pub fn load(&mut self, shapes: Vec<ShapeData>) {
        self.shapes.clear();
        self.dirty.clear();
        self.generation += 1;
        for data in shapes {
            let key = self.next_key();
            self.shapes.push(Shape { key, data });
        }
        self.saved_revision = self.revision;
        log::debug!(
            "Shape store loaded {} shapes (generation {})",
            self.shapes.len(),
            self.generation
        );
    }

    /// Empty the store, e.g. when switching images.
    pub fn clear(&mut self) {
        self.load(Vec::new());
    }

    fn next_key(&mut self) -> ShapeKey {
        let key = ShapeKey(self.next_key);
        self.next_key += 1;
        key
    }

    fn touch(&mut self, key: ShapeKey) {
        self.revision += 1;
        self.dirty.insert(key, self.revision);
    }

    // ========================================================================
    // Mutation
    // ========================================================================

    /// Append a shape. Returns its position, which is always the previous length.
    pub fn add(&mut self, data: ShapeData) -> Result<usize, GeometryError> {
        validate(&data.geometry)?;
        let key = self.next_key();
        let index = self.shapes.len();
        self.shapes.push(Shape { key, data });
        self.touch(key);
        log::debug!("Added shape {} at index {}", key, index);
        Ok(index)
    }

    /// Commit new geometry and mark the shape dirty.
    pub fn update(&mut self, key: ShapeKey, geometry: ShapeGeometry) -> Result<(), GeometryError> {
        self.replace_geometry(key, geometry)?;
        self.touch(key);
        log::trace!("Committed geometry for {}", key);
        Ok(())
    }

    /// Replace geometry for a live preview without marking anything dirty.
    pub fn update_visual(
        &mut self,
        key: ShapeKey,
        geometry: ShapeGeometry,
    ) -> Result<(), GeometryError> {
        self.replace_geometry(key, geometry)
    }

    fn replace_geometry(
        &mut self,
        key: ShapeKey,
        geometry: ShapeGeometry,
    ) -> Result<(), GeometryError> {
        validate(&geometry)?;
        let shape = self.get_mut(key).ok_or(GeometryError::UnknownShape)?;
        if shape.data.geometry.is_polygon() != geometry.is_polygon() {
            return Err(GeometryError::NotAPolygon);
        }
        shape.data.geometry = geometry;
        Ok(())
    }

    /// Remove a shape. Later shapes move up one position.
    pub fn remove(&mut self, key: ShapeKey) -> Result<ShapeData, GeometryError> {
        let index = self.index_of(key).ok_or(GeometryError::UnknownShape)?;
        let removed = self.shapes.remove(index);
        self.dirty.remove(&key);
        self.revision += 1;
        log::debug!("Removed shape {} from index {}", key, index);
        Ok(removed.data)
    }

    /// Change a shape's label. Empty names are rejected.
    pub fn rename(&mut self, key: ShapeKey, name: &str) -> Result<(), GeometryError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(GeometryError::EmptyName);
        }
        let shape = self.get_mut(key).ok_or(GeometryError::UnknownShape)?;
        if shape.data.name == name {
            return Ok(());
        }
        shape.data.name = name.to_string();
        self.touch(key);
        Ok(())
    }

    /// Set a custom attribute value. Marks the shape dirty only if the value changed.
    pub fn set_attribute(
        &mut self,
        key: ShapeKey,
        attribute: &str,
        value: &str,
    ) -> Result<bool, GeometryError> {
        let shape = self.get_mut(key).ok_or(GeometryError::UnknownShape)?;
        let changed = shape.data.attributes.set(attribute, value);
        if changed {
            self.touch(key);
        }
        Ok(changed)
    }

    /// Point every shape's origin at its position in a freshly written document.
    ///
    /// `written` is the key order of the save snapshot; shapes added after the
    /// snapshot are not in the document yet and lose any origin.
    pub fn rebase_origins(&mut self, written: &[ShapeKey]) {
        let positions: HashMap<ShapeKey, usize> =
            written.iter().enumerate().map(|(i, k)| (*k, i)).collect();
        for shape in &mut self.shapes {
            shape.data.origin = positions.get(&shape.key).copied();
        }
    }

    // ========================================================================
    // Dirty tracking
    // ========================================================================

    /// Positions of dirty shapes, ascending.
    pub fn dirty_ids(&self) -> Vec<usize> {
        self.shapes
            .iter()
            .enumerate()
            .filter(|(_, s)| self.dirty.contains_key(&s.key))
            .map(|(i, _)| i)
            .collect()
    }

    pub fn is_dirty(&self, key: ShapeKey) -> bool {
        self.dirty.contains_key(&key)
    }

    /// Forget every pending change.
    pub fn clear_dirty(&mut self) {
        self.dirty.clear();
        self.saved_revision = self.revision;
    }

    /// Record that everything up to `revision` is on disk.
    pub fn mark_saved(&mut self, revision: u64) {
        self.dirty.retain(|_, changed| *changed > revision);
        self.saved_revision = self.saved_revision.max(revision);
    }

    /// True if anything (including a removal) changed since the last save or load.
    pub fn has_unsaved_changes(&self) -> bool {
        self.revision > self.saved_revision
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    // ========================================================================
    // Access
    // ========================================================================

    pub fn shapes(&self) -> &[Shape] {
        &self.shapes
    }

    pub fn len(&self) -> usize {
        self.shapes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.shapes.is_empty()
    }

    pub fn get(&self, key: ShapeKey) -> Option<&Shape> {
        self.shapes.iter().find(|s| s.key == key)
    }

    fn get_mut(&mut self, key: ShapeKey) -> Option<&mut Shape> {
        self.shapes.iter_mut().find(|s| s.key == key)
    }

    pub fn at(&self, index: usize) -> Option<&Shape> {
        self.shapes.get(index)
    }

    pub fn index_of(&self, key: ShapeKey) -> Option<usize> {
        self.shapes.iter().position(|s| s.key == key)
    }

    pub fn key_at(&self, index: usize) -> Option<ShapeKey> {
        self.shapes.get(index).map(|s| s.key)
    }

    pub fn keys(&self) -> Vec<ShapeKey> {
        self.shapes.iter().map(|s| s.key).collect()
    }
}

fn validate(geometry: &ShapeGeometry) -> Result<(), GeometryError> {
    match geometry {
        ShapeGeometry::Polygon(points) if points.len() < MIN_POLYGON_VERTICES => {
            Err(GeometryError::PolygonTooSmall {
                count: points.len(),
            })
        }
        ShapeGeometry::Box(b) if b.width() <= 0.0 || b.height() <= 0.0 => {
            Err(GeometryError::BoxTooSmall {
                width: b.width(),
                height: b.height(),
            })
        }
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coords::Point;
    use crate::model::NaturalBox;

    fn boxed(name: &str, x: f64) -> ShapeData {
        ShapeData::new(
            name,
            ShapeGeometry::Box(NaturalBox::new(x, 0.0, x + 10.0, 10.0)),
        )
    }

    fn store_with(names: &[&str]) -> ShapeStore {
        let mut store = ShapeStore::new();
        store.load(
            names
                .iter()
                .enumerate()
                .map(|(i, n)| boxed(n, i as f64 * 20.0))
                .collect(),
        );
        store
    }

    #[test]
    fn test_load_is_clean() {
        let store = store_with(&["a", "b"]);
        assert_eq!(store.len(), 2);
        assert!(store.dirty_ids().is_empty());
        assert!(!store.has_unsaved_changes());
    }

    #[test]
    fn test_add_appends_at_current_length() {
        let mut store = store_with(&["a", "b"]);
        let index = store.add(boxed("c", 100.0)).unwrap();
        assert_eq!(index, 2);
        assert_eq!(store.dirty_ids(), vec![2]);
        assert!(store.has_unsaved_changes());
    }

    #[test]
    fn test_update_marks_dirty_but_update_visual_does_not() {
        let mut store = store_with(&["a", "b"]);
        let a = store.key_at(0).unwrap();
        let b = store.key_at(1).unwrap();

        store
            .update_visual(b, ShapeGeometry::Box(NaturalBox::new(1.0, 1.0, 9.0, 9.0)))
            .unwrap();
        assert!(!store.is_dirty(b));
        assert!(!store.has_unsaved_changes());

        store
            .update(a, ShapeGeometry::Box(NaturalBox::new(2.0, 2.0, 8.0, 8.0)))
            .unwrap();
        assert!(store.is_dirty(a));
        assert_eq!(store.dirty_ids(), vec![0]);
    }

    #[test]
    fn test_update_rejects_degenerate_geometry() {
        let mut store = store_with(&["a"]);
        let a = store.key_at(0).unwrap();
        let before = store.get(a).unwrap().data.clone();

        let err = store
            .update(a, ShapeGeometry::Box(NaturalBox::new(5.0, 5.0, 5.0, 9.0)))
            .unwrap_err();
        assert!(matches!(err, GeometryError::BoxTooSmall { .. }));
        assert_eq!(store.get(a).unwrap().data, before);
        assert!(!store.is_dirty(a));

        let err = store
            .update(
                a,
                ShapeGeometry::Polygon(vec![Point::new(0.0, 0.0), Point::new(1.0, 1.0)]),
            )
            .unwrap_err();
        assert_eq!(err, GeometryError::PolygonTooSmall { count: 2 });
    }

    #[test]
    fn test_remove_shifts_positions_but_not_keys() {
        let mut store = store_with(&["a", "b", "c"]);
        let b = store.key_at(1).unwrap();
        let c = store.key_at(2).unwrap();

        let removed = store.remove(b).unwrap();
        assert_eq!(removed.name, "b");
        assert_eq!(store.index_of(c), Some(1));
        assert!(store.has_unsaved_changes(), "removal is an unsaved change");
        assert!(store.dirty_ids().is_empty());
        assert_eq!(store.remove(b).unwrap_err(), GeometryError::UnknownShape);
    }

    #[test]
    fn test_mark_saved_keeps_later_changes() {
        let mut store = store_with(&["a", "b"]);
        let a = store.key_at(0).unwrap();
        let b = store.key_at(1).unwrap();

        store.rename(a, "car").unwrap();
        let snapshot = store.revision();
        store.rename(b, "tree").unwrap();

        store.mark_saved(snapshot);
        assert!(!store.is_dirty(a));
        assert!(store.is_dirty(b));
        assert!(store.has_unsaved_changes());

        store.mark_saved(store.revision());
        assert!(!store.has_unsaved_changes());
    }

    #[test]
    fn test_rename_and_attributes() {
        let mut store = store_with(&["a"]);
        let a = store.key_at(0).unwrap();
        assert_eq!(store.rename(a, "  "), Err(GeometryError::EmptyName));
        store.rename(a, "a").unwrap();
        assert!(!store.is_dirty(a), "same name is not a change");

        assert!(store.set_attribute(a, "color", "red").unwrap());
        assert!(!store.set_attribute(a, "color", "red").unwrap());
        assert!(store.is_dirty(a));
    }

    #[test]
    fn test_rebase_origins() {
        let mut store = store_with(&["a", "b", "c"]);
        let a = store.key_at(0).unwrap();
        let c = store.key_at(2).unwrap();
        store.remove(a).unwrap();
        let written = store.keys();
        store.add(boxed("d", 200.0)).unwrap();

        store.rebase_origins(&written);
        assert_eq!(store.at(0).unwrap().data.origin, Some(0));
        assert_eq!(store.get(c).unwrap().data.origin, Some(1));
        assert_eq!(store.at(2).unwrap().data.origin, None);
    }

    #[test]
    fn test_generation_changes_on_load_and_clear() {
        let mut store = store_with(&["a"]);
        let g = store.generation();
        store.clear();
        assert!(store.is_empty());
        assert!(store.generation() > g);
    }
}
