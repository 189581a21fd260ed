//! Conversions between natural image pixels and unscaled display pixels.
//!
//! Natural space is the source image's pixel grid. Display space is the
//! on-screen footprint of the image content before zoom and pan, with the
//! origin at the top-left corner of the visible content (letterbox padding
//! excluded). Zoom and pan live in [`crate::zoom_math`].

use serde::{Deserialize, Serialize};

use crate::constants::{COVER_RATIO_HIGH, COVER_RATIO_LOW};

/// A 2D point. The coordinate space is implied by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn distance_to(&self, other: &Point) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        (dx * dx + dy * dy).sqrt()
    }

    pub fn offset(&self, dx: f64, dy: f64) -> Point {
        Point::new(self.x + dx, self.y + dy)
    }
}

/// True pixel dimensions of the source image.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct NaturalSize {
    pub width: f64,
    pub height: f64,
}

impl NaturalSize {
    pub const fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    /// Both dimensions are positive; conversions are only meaningful when this holds.
    pub fn is_valid(&self) -> bool {
        self.width > 0.0 && self.height > 0.0
    }

    pub fn aspect_ratio(&self) -> f64 {
        self.width / self.height
    }
}

/// Placement of the image element inside its container, as measured by the host.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ElementRect {
    /// Left edge relative to the container
    pub x: f64,
    /// Top edge relative to the container
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl ElementRect {
    pub const fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }
}

/// How the natural image is placed inside the element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FitMode {
    /// Whole image visible, letterboxed along one axis
    #[default]
    Contain,
    /// Image fills the element, excess cropped
    Cover,
}

/// Mapping of the natural image onto the on-screen element.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct DisplayGeometry {
    pub element_width: f64,
    pub element_height: f64,
    pub offset_x: f64,
    pub offset_y: f64,
    /// Width of the image content actually drawn inside the element
    pub visible_width: f64,
    /// Height of the image content actually drawn inside the element
    pub visible_height: f64,
    pub padding_x: f64,
    pub padding_y: f64,
    pub fit_mode: FitMode,
}

impl DisplayGeometry {
    /// Compute the geometry for an element showing an image of the given natural size.
    ///
    /// The fit mode switches to `cover` when the image aspect ratio is more than
    /// 20% away from the element's in either direction.
    pub fn fit(element: ElementRect, natural: NaturalSize) -> Option<Self> {
        if !natural.is_valid() || element.width <= 0.0 || element.height <= 0.0 {
            return None;
        }

        let element_ratio = element.width / element.height;
        let image_ratio = natural.aspect_ratio();

        let fit_mode = if image_ratio > element_ratio * COVER_RATIO_HIGH
            || image_ratio < element_ratio * COVER_RATIO_LOW
        {
            FitMode::Cover
        } else {
            FitMode::Contain
        };

        let (visible_width, visible_height, padding_x, padding_y) = match fit_mode {
            FitMode::Contain if image_ratio > element_ratio => {
                let visible_height = element.width / image_ratio;
                (
                    element.width,
                    visible_height,
                    0.0,
                    (element.height - visible_height) / 2.0,
                )
            }
            FitMode::Contain => {
                let visible_width = element.height * image_ratio;
                (
                    visible_width,
                    element.height,
                    (element.width - visible_width) / 2.0,
                    0.0,
                )
            }
            FitMode::Cover => (element.width, element.height, 0.0, 0.0),
        };

        let geometry = Self {
            element_width: element.width,
            element_height: element.height,
            offset_x: element.x,
            offset_y: element.y,
            visible_width,
            visible_height,
            padding_x,
            padding_y,
            fit_mode,
        };
        log::debug!(
            "Display fit: {:?}, visible {:.1}x{:.1}, padding ({:.1}, {:.1})",
            geometry.fit_mode,
            geometry.visible_width,
            geometry.visible_height,
            geometry.padding_x,
            geometry.padding_y
        );
        Some(geometry)
    }

    /// Clamp a display point into the visible content area.
    pub fn clamp_point(&self, p: Point) -> Point {
        Point::new(
            p.x.clamp(0.0, self.visible_width.max(0.0)),
            p.y.clamp(0.0, self.visible_height.max(0.0)),
        )
    }

    /// Whether a display point lies on the visible image content.
    pub fn contains(&self, p: Point) -> bool {
        p.x >= 0.0 && p.y >= 0.0 && p.x <= self.visible_width && p.y <= self.visible_height
    }

    /// Display pixels per natural pixel on each axis.
    pub fn scale(&self, natural: NaturalSize) -> (f64, f64) {
        (
            self.visible_width / natural.width,
            self.visible_height / natural.height,
        )
    }
}

/// Natural image pixels to display pixels.
pub fn natural_to_display(p: Point, natural: NaturalSize, geometry: &DisplayGeometry) -> Point {
    let (sx, sy) = geometry.scale(natural);
    Point::new(p.x * sx, p.y * sy)
}

/// Display pixels to natural image pixels, rounded to the integer grid persisted in box files.
pub fn display_to_natural(p: Point, natural: NaturalSize, geometry: &DisplayGeometry) -> Point {
    let exact = display_to_natural_exact(p, natural, geometry);
    Point::new(exact.x.round(), exact.y.round())
}

/// Display pixels to natural image pixels without rounding.
pub fn display_to_natural_exact(
    p: Point,
    natural: NaturalSize,
    geometry: &DisplayGeometry,
) -> Point {
    let (sx, sy) = geometry.scale(natural);
    Point::new(p.x / sx, p.y / sy)
}
