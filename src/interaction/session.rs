//! Pointer-drag sessions.
//!
//! A drag spans many pointer events. While it lasts the host has to route
//! pointer moves and releases to the canvas even when the pointer leaves the
//! shape (document-level listeners in a browser, mouse capture on desktop).
//! [`DragSession`] owns that capture: it is attached when the session is
//! created and released when the session is dropped, so every exit path
//! (release, Escape, image switch, teardown) detaches exactly once.

use std::rc::Rc;
use std::time::Duration;

use web_time::Instant;

use crate::constants::DEFAULT_DRAG_THROTTLE_MS;
use crate::coords::Point;
use crate::interaction::handles::ResizeHandle;
use crate::model::{ShapeGeometry, ShapeKey};
use crate::zoom_math::ZoomPan;

/// Host hook for routing pointer events to the canvas during a drag.
pub trait PointerCapture {
    fn attach(&self);
    fn detach(&self);
}

/// Capture for hosts that already deliver every pointer event to the canvas.
#[derive(Debug, Default)]
pub struct NoCapture;

impl PointerCapture for NoCapture {
    fn attach(&self) {}
    fn detach(&self) {}
}

struct CaptureGuard(Rc<dyn PointerCapture>);

impl CaptureGuard {
    fn new(capture: Rc<dyn PointerCapture>) -> Self {
        capture.attach();
        Self(capture)
    }
}

impl Drop for CaptureGuard {
    fn drop(&mut self) {
        self.0.detach();
    }
}

/// Rate limiter for drag previews.
#[derive(Debug, Clone, Copy)]
pub struct Throttle {
    interval: Duration,
    last: Option<Instant>,
}

impl Throttle {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last: None,
        }
    }

    /// Whether an update may run at `now`. A successful check starts a new interval.
    pub fn ready(&mut self, now: Instant) -> bool {
        let due = self
            .last
            .is_none_or(|last| now.saturating_duration_since(last) >= self.interval);
        if due {
            self.last = Some(now);
        }
        due
    }

    pub fn reset(&mut self) {
        self.last = None;
    }
}

impl Default for Throttle {
    fn default() -> Self {
        Self::new(Duration::from_millis(DEFAULT_DRAG_THROTTLE_MS))
    }
}

/// What a drag session manipulates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DragKind {
    /// Whole box
    Move,
    Resize(ResizeHandle),
    /// One polygon vertex
    Vertex(usize),
    /// Whole polygon
    PolygonMove,
    /// Rubber band of a new box
    CreateBox,
    /// Canvas pan while zoomed in
    Pan,
}

/// One pointer drag, from pointer-down to release or cancel.
pub struct DragSession {
    pub kind: DragKind,
    pub target: Option<ShapeKey>,
    /// Geometry of the target when the drag started
    pub origin: Option<ShapeGeometry>,
    /// Pointer position (screen) at pointer-down
    pub pointer_start: Point,
    /// Last geometry written as a preview
    pub preview: Option<ShapeGeometry>,
    /// Zoom/pan when a pan drag started
    pub pan_start: ZoomPan,
    throttle: Throttle,
    _capture: CaptureGuard,
}

impl DragSession {
    pub fn start(
        kind: DragKind,
        pointer_start: Point,
        pan_start: ZoomPan,
        capture: Rc<dyn PointerCapture>,
        throttle_interval: Duration,
    ) -> Self {
        log::debug!("Drag session {:?} started", kind);
        Self {
            kind,
            target: None,
            origin: None,
            pointer_start,
            preview: None,
            pan_start,
            throttle: Throttle::new(throttle_interval),
            _capture: CaptureGuard::new(capture),
        }
    }

    /// Attach the shape being edited and its geometry at drag start.
    pub fn with_target(mut self, key: ShapeKey, origin: ShapeGeometry) -> Self {
        self.target = Some(key);
        self.origin = Some(origin);
        self
    }

    /// Whether a pointer move at `now` should refresh the preview.
    pub fn should_update(&mut self, now: Instant) -> bool {
        self.throttle.ready(now)
    }

    pub fn edits_shape(&self) -> bool {
        self.target.is_some()
    }
}

impl std::fmt::Debug for DragSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DragSession")
            .field("kind", &self.kind)
            .field("target", &self.target)
            .field("pointer_start", &self.pointer_start)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::cell::Cell;

    /// Capture that counts attach/detach calls.
    #[derive(Default)]
    pub(crate) struct CountingCapture {
        pub attached: Cell<usize>,
        pub detached: Cell<usize>,
    }

    impl CountingCapture {
        pub(crate) fn active(&self) -> usize {
            self.attached.get() - self.detached.get()
        }
    }

    impl PointerCapture for CountingCapture {
        fn attach(&self) {
            self.attached.set(self.attached.get() + 1);
        }

        fn detach(&self) {
            self.detached.set(self.detached.get() + 1);
        }
    }

    #[test]
    fn test_throttle_limits_rate() {
        let start = Instant::now();
        let mut throttle = Throttle::new(Duration::from_millis(16));
        assert!(throttle.ready(start));
        assert!(!throttle.ready(start + Duration::from_millis(5)));
        assert!(!throttle.ready(start + Duration::from_millis(15)));
        assert!(throttle.ready(start + Duration::from_millis(16)));
        assert!(!throttle.ready(start + Duration::from_millis(20)));
    }

    #[test]
    fn test_throttle_reset() {
        let start = Instant::now();
        let mut throttle = Throttle::default();
        assert!(throttle.ready(start));
        throttle.reset();
        assert!(throttle.ready(start));
    }

    #[test]
    fn test_session_detaches_exactly_once() {
        let capture = Rc::new(CountingCapture::default());
        for _ in 0..5 {
            let session = DragSession::start(
                DragKind::Pan,
                Point::default(),
                ZoomPan::identity(),
                capture.clone(),
                Duration::from_millis(16),
            );
            assert_eq!(capture.active(), 1);
            drop(session);
            assert_eq!(capture.active(), 0);
        }
        assert_eq!(capture.attached.get(), 5);
        assert_eq!(capture.detached.get(), 5);
    }
}
