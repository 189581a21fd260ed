//! Resize handles of a selected box and the edge arithmetic behind them.

use crate::constants::MIN_BOX_SIZE;
use crate::coords::{DisplayGeometry, NaturalSize, Point};
use crate::model::{DisplayRect, NaturalBox};

/// One of the eight compass handles drawn on a selected box.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResizeHandle {
    N,
    S,
    E,
    W,
    NE,
    NW,
    SE,
    SW,
}

impl ResizeHandle {
    pub const ALL: [ResizeHandle; 8] = [
        ResizeHandle::NW,
        ResizeHandle::N,
        ResizeHandle::NE,
        ResizeHandle::E,
        ResizeHandle::SE,
        ResizeHandle::S,
        ResizeHandle::SW,
        ResizeHandle::W,
    ];

    /// Cursor-style name (`"nw"`, `"e"`, ...).
    pub fn name(&self) -> &'static str {
        match self {
            ResizeHandle::N => "n",
            ResizeHandle::S => "s",
            ResizeHandle::E => "e",
            ResizeHandle::W => "w",
            ResizeHandle::NE => "ne",
            ResizeHandle::NW => "nw",
            ResizeHandle::SE => "se",
            ResizeHandle::SW => "sw",
        }
    }

    pub fn moves_left(&self) -> bool {
        matches!(self, ResizeHandle::W | ResizeHandle::NW | ResizeHandle::SW)
    }

    pub fn moves_right(&self) -> bool {
        matches!(self, ResizeHandle::E | ResizeHandle::NE | ResizeHandle::SE)
    }

    pub fn moves_top(&self) -> bool {
        matches!(self, ResizeHandle::N | ResizeHandle::NE | ResizeHandle::NW)
    }

    pub fn moves_bottom(&self) -> bool {
        matches!(self, ResizeHandle::S | ResizeHandle::SE | ResizeHandle::SW)
    }

    /// Where the handle sits on a rectangle.
    pub fn position(&self, rect: &DisplayRect) -> Point {
        let x = if self.moves_left() {
            rect.x
        } else if self.moves_right() {
            rect.right()
        } else {
            rect.x + rect.width / 2.0
        };
        let y = if self.moves_top() {
            rect.y
        } else if self.moves_bottom() {
            rect.bottom()
        } else {
            rect.y + rect.height / 2.0
        };
        Point::new(x, y)
    }

    /// Resize `rect` by a pointer delta, moving only the edges this handle names.
    ///
    /// The result lies inside `[0, max_x] x [0, max_y]` and is at least
    /// [`MIN_BOX_SIZE`] on both axes (as long as the bounds allow it). When the
    /// minimum is hit, the dragged edge stops and the opposite edge stays put.
    pub fn apply(&self, rect: &DisplayRect, dx: f64, dy: f64, max_x: f64, max_y: f64) -> DisplayRect {
        let (left, right) = resize_axis(
            rect.x,
            rect.right(),
            dx,
            self.moves_left(),
            self.moves_right(),
            max_x,
        );
        let (top, bottom) = resize_axis(
            rect.y,
            rect.bottom(),
            dy,
            self.moves_top(),
            self.moves_bottom(),
            max_y,
        );
        DisplayRect::new(left, top, right - left, bottom - top)
    }

    /// Round a resized rectangle to natural pixels for the commit.
    ///
    /// Edges this handle drags are pushed outward when rounding would leave
    /// the box under [`MIN_BOX_SIZE`] display pixels.
    pub fn to_natural(
        &self,
        rect: &DisplayRect,
        natural: NaturalSize,
        geometry: &DisplayGeometry,
    ) -> NaturalBox {
        let rounded = rect.to_natural(natural, geometry);
        let (sx, sy) = geometry.scale(natural);
        let (xmin, xmax) = keep_min_axis(
            rounded.xmin,
            rounded.xmax,
            sx,
            self.moves_left(),
            self.moves_right(),
            natural.width.floor(),
        );
        let (ymin, ymax) = keep_min_axis(
            rounded.ymin,
            rounded.ymax,
            sy,
            self.moves_top(),
            self.moves_bottom(),
            natural.height.floor(),
        );
        NaturalBox::new(xmin, ymin, xmax, ymax)
    }
}

fn resize_axis(lo: f64, hi: f64, delta: f64, moves_lo: bool, moves_hi: bool, limit: f64) -> (f64, f64) {
    let mut lo = lo.max(0.0).min(limit);
    let mut hi = hi.max(0.0).min(limit);
    if moves_lo {
        lo = (lo + delta).min(hi - MIN_BOX_SIZE).max(0.0);
    }
    if moves_hi {
        hi = (hi + delta).max(lo + MIN_BOX_SIZE).min(limit);
    }
    if hi - lo < MIN_BOX_SIZE {
        if moves_lo {
            lo = (hi - MIN_BOX_SIZE).max(0.0);
            hi = (lo + MIN_BOX_SIZE).min(limit).max(hi);
        } else {
            hi = (lo + MIN_BOX_SIZE).min(limit);
            lo = (hi - MIN_BOX_SIZE).max(0.0).min(lo);
        }
    }
    (lo, hi)
}

/// Widen a rounded natural span to the display minimum, moving only dragged edges.
fn keep_min_axis(lo: f64, hi: f64, scale: f64, moves_lo: bool, moves_hi: bool, limit: f64) -> (f64, f64) {
    const EPSILON: f64 = 1e-9;
    if !(moves_lo || moves_hi) || scale <= 0.0 || (hi - lo) * scale >= MIN_BOX_SIZE - EPSILON {
        return (lo, hi);
    }
    let need = (MIN_BOX_SIZE / scale - EPSILON).ceil();
    if moves_lo {
        let lo = (hi - need).max(0.0);
        (lo, (lo + need).min(limit).max(hi))
    } else {
        let hi = (lo + need).min(limit);
        ((hi - need).max(0.0).min(lo), hi)
    }
}

/// Translate a rectangle, keeping it inside `[0, max_x] x [0, max_y]`.
pub fn move_rect(rect: &DisplayRect, dx: f64, dy: f64, max_x: f64, max_y: f64) -> DisplayRect {
    DisplayRect::new(
        (rect.x + dx).min(max_x - rect.width).max(0.0),
        (rect.y + dy).min(max_y - rect.height).max(0.0),
        rect.width,
        rect.height,
    )
}

/// Translate every point by the same delta, limited so the whole polygon stays in bounds.
pub fn move_points(points: &[Point], dx: f64, dy: f64, max_x: f64, max_y: f64) -> Vec<Point> {
    let Some((min, max)) = crate::model::points_bounds(points) else {
        return Vec::new();
    };
    let dx = dx.min(max_x - max.x).max(-min.x);
    let dy = dy.min(max_y - max.y).max(-min.y);
    points.iter().map(|p| p.offset(dx, dy)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const W: f64 = 400.0;
    const H: f64 = 300.0;

    #[test]
    fn test_handle_positions() {
        let rect = DisplayRect::new(10.0, 20.0, 100.0, 50.0);
        assert_eq!(ResizeHandle::NW.position(&rect), Point::new(10.0, 20.0));
        assert_eq!(ResizeHandle::S.position(&rect), Point::new(60.0, 70.0));
        assert_eq!(ResizeHandle::E.position(&rect), Point::new(110.0, 45.0));
    }

    #[test]
    fn test_nw_keeps_bottom_right_fixed() {
        let rect = DisplayRect::new(100.0, 100.0, 80.0, 60.0);
        let out = ResizeHandle::NW.apply(&rect, -10.0, 15.0, W, H);
        assert_eq!(out, DisplayRect::new(90.0, 115.0, 90.0, 45.0));
        assert_eq!(out.bottom_right(), rect.bottom_right());
    }

    #[test]
    fn test_edge_handles_move_one_edge() {
        let rect = DisplayRect::new(100.0, 100.0, 80.0, 60.0);
        let out = ResizeHandle::E.apply(&rect, 30.0, 500.0, W, H);
        assert_eq!(out, DisplayRect::new(100.0, 100.0, 110.0, 60.0));
        let out = ResizeHandle::N.apply(&rect, 30.0, -20.0, W, H);
        assert_eq!(out, DisplayRect::new(100.0, 80.0, 80.0, 80.0));
    }

    #[test]
    fn test_minimum_size_stops_dragged_edge() {
        let rect = DisplayRect::new(100.0, 100.0, 80.0, 60.0);
        let out = ResizeHandle::NW.apply(&rect, 500.0, 500.0, W, H);
        assert_eq!(out.width, MIN_BOX_SIZE);
        assert_eq!(out.height, MIN_BOX_SIZE);
        assert_eq!(out.bottom_right(), rect.bottom_right());
    }

    #[test]
    fn test_resize_never_below_minimum_or_out_of_bounds() {
        let rects = [
            DisplayRect::new(0.0, 0.0, 30.0, 30.0),
            DisplayRect::new(100.0, 100.0, 80.0, 60.0),
            DisplayRect::new(370.0, 280.0, 30.0, 20.0),
            DisplayRect::new(5.0, 5.0, 8.0, 8.0),
        ];
        let deltas = [-1000.0, -55.5, -3.0, 0.0, 7.25, 42.0, 1000.0];
        for rect in &rects {
            for handle in ResizeHandle::ALL {
                for &dx in &deltas {
                    for &dy in &deltas {
                        let out = handle.apply(rect, dx, dy, W, H);
                        assert!(out.width >= MIN_BOX_SIZE - 1e-9, "{:?} {:?} {}", handle, rect, dx);
                        assert!(out.height >= MIN_BOX_SIZE - 1e-9, "{:?} {:?} {}", handle, rect, dy);
                        assert!(out.x >= 0.0 && out.y >= 0.0);
                        assert!(out.right() <= W + 1e-9 && out.bottom() <= H + 1e-9);
                    }
                }
            }
        }
    }

    #[test]
    fn test_move_rect_is_clamped() {
        let rect = DisplayRect::new(10.0, 10.0, 50.0, 50.0);
        assert_eq!(
            move_rect(&rect, -100.0, 1000.0, W, H),
            DisplayRect::new(0.0, 250.0, 50.0, 50.0)
        );
    }

    #[test]
    fn test_move_points_keeps_shape() {
        let points = vec![
            Point::new(10.0, 10.0),
            Point::new(50.0, 10.0),
            Point::new(30.0, 40.0),
        ];
        let moved = move_points(&points, 1000.0, -5.0, W, H);
        assert_eq!(moved[1], Point::new(W, 5.0));
        assert_eq!(moved[0], Point::new(W - 40.0, 5.0));
    }

    fn geometry(element: f64) -> (NaturalSize, DisplayGeometry) {
        let natural = NaturalSize::new(100.0, 100.0);
        let element = crate::coords::ElementRect::new(0.0, 0.0, element, element);
        (natural, DisplayGeometry::fit(element, natural).unwrap())
    }

    #[test]
    fn test_commit_rounding_keeps_minimum_at_fractional_scale() {
        // 2.2 display px per natural px: the 20 px minimum is 9.09 natural px
        let (natural, geometry) = geometry(220.0);
        let rect = DisplayRect::new(22.0, 22.0, 88.0, 88.0);
        let shrunk = ResizeHandle::SE.apply(&rect, -200.0, -200.0, 220.0, 220.0);
        assert_eq!(shrunk, DisplayRect::new(22.0, 22.0, 20.0, 20.0));

        // Plain rounding lands on 9 natural px, 19.8 display px
        assert_eq!(shrunk.to_natural(natural, &geometry), NaturalBox::new(10.0, 10.0, 19.0, 19.0));

        let committed = ResizeHandle::SE.to_natural(&shrunk, natural, &geometry);
        assert_eq!(committed, NaturalBox::new(10.0, 10.0, 20.0, 20.0));
    }

    #[test]
    fn test_commit_rounding_moves_only_dragged_edges() {
        let (natural, geometry) = geometry(220.0);
        let rect = DisplayRect::new(110.0, 110.0, 88.0, 44.0);

        let shrunk = ResizeHandle::W.apply(&rect, 500.0, 0.0, 220.0, 220.0);
        let committed = ResizeHandle::W.to_natural(&shrunk, natural, &geometry);
        assert_eq!(committed.xmax, 90.0);
        assert_eq!(committed.xmin, 80.0);
        assert_eq!((committed.ymin, committed.ymax), (50.0, 70.0));

        // Against the far border the fixed edge has to give way
        let corner = DisplayRect::new(198.0, 199.5, 22.0, 20.5);
        let shrunk = ResizeHandle::SE.apply(&corner, 0.0, -0.2, 220.0, 220.0);
        let committed = ResizeHandle::SE.to_natural(&shrunk, natural, &geometry);
        assert_eq!((committed.ymin, committed.ymax), (90.0, 100.0));
        assert_eq!((committed.xmin, committed.xmax), (90.0, 100.0));
    }

    #[test]
    fn test_committed_resize_never_below_minimum() {
        let handles = [
            ResizeHandle::N,
            ResizeHandle::S,
            ResizeHandle::E,
            ResizeHandle::W,
            ResizeHandle::NE,
            ResizeHandle::NW,
            ResizeHandle::SE,
            ResizeHandle::SW,
        ];
        for element in [130.0, 170.0, 220.0, 333.0] {
            let (natural, geometry) = geometry(element);
            let (sx, sy) = geometry.scale(natural);
            let rect = DisplayRect::new(element * 0.3, element * 0.3, element * 0.4, element * 0.4);
            for handle in handles {
                for delta in [-400.0, -37.3, 0.7, 41.9, 400.0] {
                    let shrunk = handle.apply(&rect, delta, delta, element, element);
                    let b = handle.to_natural(&shrunk, natural, &geometry);
                    assert!(
                        (b.xmax - b.xmin) * sx >= MIN_BOX_SIZE - 1e-9
                            && (b.ymax - b.ymin) * sy >= MIN_BOX_SIZE - 1e-9,
                        "{:?} by {} at {} px gave {:?}",
                        handle,
                        delta,
                        element,
                        b
                    );
                    assert!(b.xmin >= 0.0 && b.ymin >= 0.0);
                    assert!(b.xmax <= natural.width && b.ymax <= natural.height);
                }
            }
        }
    }
}
