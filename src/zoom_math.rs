//! Zoom/pan mathematics between display space and screen space.
//!
//! The image element is scaled about its own center (like a CSS `scale`
//! transform), so a display point moves away from the element center as the
//! zoom grows. [`ZoomPan::centering_offset`] is the amount the top-left corner
//! shifts because of that, and is subtracted so overlays stay pinned to image
//! content. Screen coordinates are relative to the container.

use crate::constants::{MAX_ZOOM, MIN_ZOOM};
use crate::coords::{DisplayGeometry, Point};

/// Zoom level and pan offset of the canvas.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ZoomPan {
    /// Scale factor about the element center, within `MIN_ZOOM..=MAX_ZOOM`
    pub zoom: f64,
    /// Horizontal translation in screen pixels
    pub pan_x: f64,
    /// Vertical translation in screen pixels
    pub pan_y: f64,
}

impl ZoomPan {
    pub fn new(zoom: f64, pan_x: f64, pan_y: f64) -> Self {
        Self { zoom, pan_x, pan_y }
    }

    /// Zoom 1.0 and no pan, the state after every image change.
    pub fn identity() -> Self {
        Self::new(MIN_ZOOM, 0.0, 0.0)
    }

    pub fn reset(&mut self) {
        *self = Self::identity();
    }

    pub fn is_zoomed(&self) -> bool {
        self.zoom > MIN_ZOOM
    }

    /// Shift of the element's top-left corner caused by scaling about its center.
    pub fn centering_offset(&self, geometry: &DisplayGeometry) -> (f64, f64) {
        (
            (geometry.element_width * self.zoom - geometry.element_width) / 2.0,
            (geometry.element_height * self.zoom - geometry.element_height) / 2.0,
        )
    }

    /// Display point to screen point: padding, zoom about the element center, then pan.
    pub fn display_to_screen(&self, p: Point, geometry: &DisplayGeometry) -> Point {
        let (cx, cy) = self.centering_offset(geometry);
        Point::new(
            geometry.offset_x + (geometry.padding_x + p.x) * self.zoom - cx + self.pan_x,
            geometry.offset_y + (geometry.padding_y + p.y) * self.zoom - cy + self.pan_y,
        )
    }

    /// Exact inverse of [`ZoomPan::display_to_screen`].
    pub fn screen_to_display(&self, s: Point, geometry: &DisplayGeometry) -> Point {
        let (cx, cy) = self.centering_offset(geometry);
        Point::new(
            (s.x - geometry.offset_x - self.pan_x + cx) / self.zoom - geometry.padding_x,
            (s.y - geometry.offset_y - self.pan_y + cy) / self.zoom - geometry.padding_y,
        )
    }

    /// Convert a screen-space length (handle radius, etc.) to display space.
    pub fn screen_len_to_display(&self, len: f64) -> f64 {
        len / self.zoom.max(f64::EPSILON)
    }

    /// Change the zoom level keeping the content under the cursor fixed.
    ///
    /// The new zoom is clamped to `[MIN_ZOOM, MAX_ZOOM]`; returning to
    /// `MIN_ZOOM` drops any pan. The resulting pan is clamped, which can move
    /// the anchored point when the cursor sits near the content edge.
    pub fn zoom_to_cursor(&self, new_zoom: f64, cursor: Point, geometry: &DisplayGeometry) -> ZoomPan {
        let new_zoom = new_zoom.clamp(MIN_ZOOM, MAX_ZOOM);
        if new_zoom <= MIN_ZOOM {
            return ZoomPan::identity();
        }

        // Display point under the cursor before zooming
        let anchor = self.screen_to_display(cursor, geometry);

        let mut next = ZoomPan::new(new_zoom, 0.0, 0.0);
        let (cx, cy) = next.centering_offset(geometry);
        next.pan_x = cursor.x - geometry.offset_x - (geometry.padding_x + anchor.x) * new_zoom + cx;
        next.pan_y = cursor.y - geometry.offset_y - (geometry.padding_y + anchor.y) * new_zoom + cy;
        next.clamp_pan(geometry)
    }

    /// Apply a pan delta; panning is ignored unless zoomed in.
    pub fn pan_by(&self, dx: f64, dy: f64, geometry: &DisplayGeometry) -> ZoomPan {
        if !self.is_zoomed() {
            return *self;
        }
        ZoomPan::new(self.zoom, self.pan_x + dx, self.pan_y + dy).clamp_pan(geometry)
    }

    /// Limit the pan so the scaled content can reach, but never leave, the element bounds.
    pub fn clamp_pan(&self, geometry: &DisplayGeometry) -> ZoomPan {
        let (max_x, max_y) = self.max_pan(geometry);
        ZoomPan::new(
            self.zoom,
            self.pan_x.clamp(-max_x, max_x),
            self.pan_y.clamp(-max_y, max_y),
        )
    }

    fn max_pan(&self, geometry: &DisplayGeometry) -> (f64, f64) {
        (
            ((geometry.visible_width * self.zoom - geometry.element_width) / 2.0).max(0.0),
            ((geometry.visible_height * self.zoom - geometry.element_height) / 2.0).max(0.0),
        )
    }
}

impl Default for ZoomPan {
    fn default() -> Self {
        Self::identity()
    }
}
