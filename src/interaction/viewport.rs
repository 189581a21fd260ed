//! Everything needed to move between screen, display and natural space.

use crate::constants::HANDLE_HIT_RADIUS;
use crate::coords::{
    DisplayGeometry, NaturalSize, Point, display_to_natural_exact, natural_to_display,
};
use crate::model::{DisplayShape, Shape};
use crate::zoom_math::ZoomPan;

/// Current image size, its fit in the element and the zoom/pan state.
///
/// Only exists once both the natural size and the element layout are known;
/// before that nothing is rendered or hit-tested.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub natural: NaturalSize,
    pub geometry: DisplayGeometry,
    pub zoom_pan: ZoomPan,
}

impl Viewport {
    pub fn new(natural: NaturalSize, geometry: DisplayGeometry, zoom_pan: ZoomPan) -> Self {
        Self {
            natural,
            geometry,
            zoom_pan,
        }
    }

    pub fn to_display(&self, screen: Point) -> Point {
        self.zoom_pan.screen_to_display(screen, &self.geometry)
    }

    pub fn to_screen(&self, display: Point) -> Point {
        self.zoom_pan.display_to_screen(display, &self.geometry)
    }

    /// Pointer position in display space, clamped onto the visible content.
    pub fn to_display_clamped(&self, screen: Point) -> Point {
        self.geometry.clamp_point(self.to_display(screen))
    }

    pub fn to_natural_exact(&self, display: Point) -> Point {
        display_to_natural_exact(display, self.natural, &self.geometry)
    }

    pub fn from_natural(&self, natural: Point) -> Point {
        natural_to_display(natural, self.natural, &self.geometry)
    }

    pub fn shape_display(&self, shape: &Shape) -> DisplayShape {
        shape.display(self.natural, &self.geometry)
    }

    /// Handle grab radius in display space at the current zoom.
    pub fn handle_radius(&self) -> f64 {
        self.zoom_pan.screen_len_to_display(HANDLE_HIT_RADIUS)
    }

    pub fn max_x(&self) -> f64 {
        self.geometry.visible_width
    }

    pub fn max_y(&self) -> f64 {
        self.geometry.visible_height
    }
}
