//! Shape types and their geometry.
//!
//! Shapes store natural-image coordinates only. Display-space geometry is
//! derived on demand through the coordinate mapper and never persisted.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::coords::{
    DisplayGeometry, NaturalSize, Point, display_to_natural, display_to_natural_exact,
    natural_to_display,
};
use crate::model::attributes::Attributes;

/// Stable identity of a shape for the lifetime of a loaded image.
///
/// Persisted identity is the shape's position in the object list, which
/// shifts on delete. Selection and drag sessions track this key instead and
/// translate to a position only when talking to the outside world.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ShapeKey(pub u64);

impl fmt::Display for ShapeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Axis-aligned box in natural image pixels.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct NaturalBox {
    pub xmin: f64,
    pub ymin: f64,
    pub xmax: f64,
    pub ymax: f64,
}

impl NaturalBox {
    pub fn new(xmin: f64, ymin: f64, xmax: f64, ymax: f64) -> Self {
        Self {
            xmin,
            ymin,
            xmax,
            ymax,
        }
    }

    pub fn width(&self) -> f64 {
        self.xmax - self.xmin
    }

    pub fn height(&self) -> f64 {
        self.ymax - self.ymin
    }

    /// Snap every edge to the integer pixel grid.
    pub fn rounded(&self) -> Self {
        Self::new(
            self.xmin.round(),
            self.ymin.round(),
            self.xmax.round(),
            self.ymax.round(),
        )
    }
}

/// Axis-aligned rectangle in display pixels.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct DisplayRect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl DisplayRect {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Normalized rectangle spanning two corners.
    pub fn from_corners(a: Point, b: Point) -> Self {
        Self::new(
            a.x.min(b.x),
            a.y.min(b.y),
            (a.x - b.x).abs(),
            (a.y - b.y).abs(),
        )
    }

    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }

    pub fn contains(&self, p: Point) -> bool {
        p.x >= self.x && p.x <= self.right() && p.y >= self.y && p.y <= self.bottom()
    }

    pub fn top_left(&self) -> Point {
        Point::new(self.x, self.y)
    }

    pub fn bottom_right(&self) -> Point {
        Point::new(self.right(), self.bottom())
    }

    /// Convert to natural coordinates, snapped to the integer grid.
    pub fn to_natural(&self, natural: NaturalSize, geometry: &DisplayGeometry) -> NaturalBox {
        let tl = display_to_natural(self.top_left(), natural, geometry);
        let br = display_to_natural(self.bottom_right(), natural, geometry);
        NaturalBox::new(tl.x, tl.y, br.x, br.y)
    }

    /// Convert to natural coordinates without rounding (live previews).
    pub fn to_natural_exact(&self, natural: NaturalSize, geometry: &DisplayGeometry) -> NaturalBox {
        let tl = display_to_natural_exact(self.top_left(), natural, geometry);
        let br = display_to_natural_exact(self.bottom_right(), natural, geometry);
        NaturalBox::new(tl.x, tl.y, br.x, br.y)
    }
}

/// Geographic position attached to a shape, written as `(lat, lng)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LatLng {
    pub lat: f64,
    pub lng: f64,
}

impl LatLng {
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    /// Parse `(lat, lng)`; parentheses and surrounding whitespace are optional.
    pub fn parse(text: &str) -> Option<Self> {
        let inner = text.trim();
        let inner = inner.strip_prefix('(').unwrap_or(inner);
        let inner = inner.strip_suffix(')').unwrap_or(inner);
        let (lat, lng) = inner.split_once(',')?;
        let lat = lat.trim().parse::<f64>().ok()?;
        let lng = lng.trim().parse::<f64>().ok()?;
        if !lat.is_finite() || !lng.is_finite() {
            return None;
        }
        Some(Self::new(lat, lng))
    }
}

impl fmt::Display for LatLng {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.lat, self.lng)
    }
}

/// Shape geometry in natural image coordinates.
#[derive(Debug, Clone, PartialEq)]
pub enum ShapeGeometry {
    Box(NaturalBox),
    Polygon(Vec<Point>),
}

impl ShapeGeometry {
    pub fn kind_name(&self) -> &'static str {
        match self {
            ShapeGeometry::Box(_) => "box",
            ShapeGeometry::Polygon(_) => "polygon",
        }
    }

    pub fn is_polygon(&self) -> bool {
        matches!(self, ShapeGeometry::Polygon(_))
    }

    /// Derive display-space geometry.
    pub fn to_display(&self, natural: NaturalSize, geometry: &DisplayGeometry) -> DisplayShape {
        match self {
            ShapeGeometry::Box(b) => {
                let tl = natural_to_display(Point::new(b.xmin, b.ymin), natural, geometry);
                let br = natural_to_display(Point::new(b.xmax, b.ymax), natural, geometry);
                DisplayShape::Box(DisplayRect::new(tl.x, tl.y, br.x - tl.x, br.y - tl.y))
            }
            ShapeGeometry::Polygon(points) => DisplayShape::Polygon(
                points
                    .iter()
                    .map(|p| natural_to_display(*p, natural, geometry))
                    .collect(),
            ),
        }
    }
}

/// Shape geometry in display coordinates, derived per frame.
#[derive(Debug, Clone, PartialEq)]
pub enum DisplayShape {
    Box(DisplayRect),
    Polygon(Vec<Point>),
}

impl DisplayShape {
    /// Check if a display point is inside this shape.
    pub fn contains(&self, p: Point) -> bool {
        match self {
            DisplayShape::Box(rect) => rect.contains(p),
            DisplayShape::Polygon(vertices) => polygon_contains(vertices, p),
        }
    }

    /// Convert back to natural coordinates. Boxes snap to integers, polygon points do not.
    pub fn to_natural(&self, natural: NaturalSize, geometry: &DisplayGeometry) -> ShapeGeometry {
        match self {
            DisplayShape::Box(rect) => ShapeGeometry::Box(rect.to_natural(natural, geometry)),
            DisplayShape::Polygon(points) => ShapeGeometry::Polygon(
                points
                    .iter()
                    .map(|p| display_to_natural_exact(*p, natural, geometry))
                    .collect(),
            ),
        }
    }

    /// Like [`DisplayShape::to_natural`] but never rounds, for previews.
    pub fn to_natural_exact(&self, natural: NaturalSize, geometry: &DisplayGeometry) -> ShapeGeometry {
        match self {
            DisplayShape::Box(rect) => ShapeGeometry::Box(rect.to_natural_exact(natural, geometry)),
            DisplayShape::Polygon(_) => self.to_natural(natural, geometry),
        }
    }
}

/// Point-in-polygon test using ray casting.
pub fn polygon_contains(vertices: &[Point], p: Point) -> bool {
    if vertices.len() < 3 {
        return false;
    }
    let mut inside = false;
    let mut j = vertices.len() - 1;
    for i in 0..vertices.len() {
        let vi = vertices[i];
        let vj = vertices[j];
        if ((vi.y > p.y) != (vj.y > p.y)) && (p.x < (vj.x - vi.x) * (p.y - vi.y) / (vj.y - vi.y) + vi.x)
        {
            inside = !inside;
        }
        j = i;
    }
    inside
}

/// Bounding box of a point list as `(min, max)`.
pub fn points_bounds(points: &[Point]) -> Option<(Point, Point)> {
    let first = points.first()?;
    let mut min = *first;
    let mut max = *first;
    for p in &points[1..] {
        min.x = min.x.min(p.x);
        min.y = min.y.min(p.y);
        max.x = max.x.max(p.x);
        max.y = max.y.max(p.y);
    }
    Some((min, max))
}

/// A shape as produced by a codec, before the store assigns it a key.
#[derive(Debug, Clone, PartialEq)]
pub struct ShapeData {
    pub name: String,
    pub geometry: ShapeGeometry,
    pub lat_lng: Option<LatLng>,
    pub attributes: Attributes,
    /// Position of the record this shape came from in the loaded document
    pub origin: Option<usize>,
}

impl ShapeData {
    pub fn new(name: impl Into<String>, geometry: ShapeGeometry) -> Self {
        Self {
            name: name.into(),
            geometry,
            lat_lng: None,
            attributes: Attributes::new(),
            origin: None,
        }
    }

    pub fn with_origin(mut self, origin: usize) -> Self {
        self.origin = Some(origin);
        self
    }

    pub fn with_lat_lng(mut self, lat_lng: Option<LatLng>) -> Self {
        self.lat_lng = lat_lng;
        self
    }

    pub fn with_attributes(mut self, attributes: Attributes) -> Self {
        self.attributes = attributes;
        self
    }
}

/// A shape held by the store.
#[derive(Debug, Clone, PartialEq)]
pub struct Shape {
    pub key: ShapeKey,
    pub data: ShapeData,
}

impl Shape {
    pub fn name(&self) -> &str {
        &self.data.name
    }

    pub fn geometry(&self) -> &ShapeGeometry {
        &self.data.geometry
    }

    pub fn display(&self, natural: NaturalSize, geometry: &DisplayGeometry) -> DisplayShape {
        self.data.geometry.to_display(natural, geometry)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coords::ElementRect;

    fn scale_two() -> (NaturalSize, DisplayGeometry) {
        let natural = NaturalSize::new(100.0, 100.0);
        let g = DisplayGeometry::fit(ElementRect::new(0.0, 0.0, 200.0, 200.0), natural).unwrap();
        (natural, g)
    }

    #[test]
    fn test_box_to_display() {
        let (natural, g) = scale_two();
        let geom = ShapeGeometry::Box(NaturalBox::new(10.0, 10.0, 50.0, 50.0));
        assert_eq!(
            geom.to_display(natural, &g),
            DisplayShape::Box(DisplayRect::new(20.0, 20.0, 80.0, 80.0))
        );
    }

    #[test]
    fn test_display_rect_to_natural_rounds() {
        let (natural, g) = scale_two();
        let rect = DisplayRect::new(30.0, 31.0, 80.0, 80.0);
        assert_eq!(
            rect.to_natural(natural, &g),
            NaturalBox::new(15.0, 16.0, 55.0, 56.0)
        );
    }

    #[test]
    fn test_rect_from_corners_normalizes() {
        let a = DisplayRect::from_corners(Point::new(50.0, 80.0), Point::new(10.0, 20.0));
        assert_eq!(a, DisplayRect::new(10.0, 20.0, 40.0, 60.0));
    }

    #[test]
    fn test_polygon_contains() {
        let square = vec![
            Point::new(0.0, 0.0),
            Point::new(100.0, 0.0),
            Point::new(100.0, 100.0),
            Point::new(0.0, 100.0),
        ];
        assert!(polygon_contains(&square, Point::new(50.0, 50.0)));
        assert!(!polygon_contains(&square, Point::new(150.0, 50.0)));
        assert!(!polygon_contains(&square[..2], Point::new(50.0, 0.0)));
    }

    #[test]
    fn test_lat_lng_parse() {
        assert_eq!(
            LatLng::parse("(12.5, -7.25)"),
            Some(LatLng::new(12.5, -7.25))
        );
        assert_eq!(LatLng::parse(" 1,2 "), Some(LatLng::new(1.0, 2.0)));
        assert_eq!(LatLng::parse("(north, east)"), None);
        assert_eq!(LatLng::parse("42"), None);
        assert_eq!(LatLng::new(12.5, -7.25).to_string(), "(12.5, -7.25)");
    }

    #[test]
    fn test_points_bounds() {
        let (min, max) = points_bounds(&[
            Point::new(3.0, 9.0),
            Point::new(-1.0, 4.0),
            Point::new(7.0, 5.0),
        ])
        .unwrap();
        assert_eq!(min, Point::new(-1.0, 4.0));
        assert_eq!(max, Point::new(7.0, 9.0));
        assert!(points_bounds(&[]).is_none());
    }
}
