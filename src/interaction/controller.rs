//! Pointer-driven editing state machine.
//!
//! The controller turns pointer events (screen space) into shape store
//! mutations. Drags write previews through [`ShapeStore::update_visual`] and
//! commit once on release through [`ShapeStore::update`], so only finished
//! edits mark a shape dirty.

use std::rc::Rc;
use std::time::Duration;

use web_time::Instant;

use crate::constants::{
    DEFAULT_DRAG_THROTTLE_MS, DUPLICATE_POINT_DISTANCE, MIN_CREATE_SIZE, MIN_POLYGON_VERTICES,
};
use crate::coords::Point;
use crate::interaction::handles::{ResizeHandle, move_points, move_rect};
use crate::interaction::session::{DragKind, DragSession, NoCapture, PointerCapture};
use crate::interaction::viewport::Viewport;
use crate::model::{
    DisplayRect, DisplayShape, GeometryError, NaturalBox, QcMode, ShapeData, ShapeGeometry,
    ShapeKey,
};
use crate::state::ShapeStore;
use crate::zoom_math::ZoomPan;

/// Externally visible state of the controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InteractionState {
    Idle,
    Moving,
    Resizing,
    VertexDragging,
    PolygonDragging,
    Panning,
    CreatingBox,
    CollectingPolygonPoints,
    /// A new shape is complete and waits for its label
    AwaitingLabel,
}

/// What lies under a pointer position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HitTarget {
    /// Resize handle of the selected box
    Handle(ShapeKey, ResizeHandle),
    /// Vertex handle of the selected polygon
    Vertex(ShapeKey, usize),
    Body(ShapeKey),
    /// Image content not covered by a shape
    Image,
    /// Canvas outside the image content
    Empty,
}

/// Geometry of a new shape waiting for its label, in natural coordinates.
#[derive(Debug, Clone, PartialEq)]
pub enum PendingLabel {
    Box(NaturalBox),
    Polygon(Vec<Point>),
}

impl PendingLabel {
    pub fn geometry(&self) -> ShapeGeometry {
        match self {
            PendingLabel::Box(bounds) => ShapeGeometry::Box(*bounds),
            PendingLabel::Polygon(points) => ShapeGeometry::Polygon(points.clone()),
        }
    }
}

/// Notifications produced while handling input. Drained with
/// [`InteractionController::take_events`].
#[derive(Debug, Clone, PartialEq)]
pub enum InteractionEvent {
    SelectionChanged(Option<ShapeKey>),
    /// A finished edit was written to the store
    Committed(ShapeKey),
    Created(ShapeKey),
    Removed(ShapeKey),
    LabelRequested,
    CreationCancelled,
}

enum Mode {
    Idle,
    Drag(DragSession),
    CreatingBox {
        /// Natural coordinates of the first corner, once pressed
        anchor: Option<Point>,
        current: Point,
        session: Option<DragSession>,
    },
    CollectingPolygon {
        /// Natural coordinates
        points: Vec<Point>,
        hover: Option<Point>,
    },
    AwaitingLabel(PendingLabel),
}

pub struct InteractionController {
    mode: Mode,
    selected: Option<ShapeKey>,
    selected_vertex: Option<usize>,
    capture: Rc<dyn PointerCapture>,
    throttle: Duration,
    events: Vec<InteractionEvent>,
}

impl Default for InteractionController {
    fn default() -> Self {
        Self::new()
    }
}

impl InteractionController {
    pub fn new() -> Self {
        Self {
            mode: Mode::Idle,
            selected: None,
            selected_vertex: None,
            capture: Rc::new(NoCapture),
            throttle: Duration::from_millis(DEFAULT_DRAG_THROTTLE_MS),
            events: Vec::new(),
        }
    }

    pub fn with_capture(mut self, capture: Rc<dyn PointerCapture>) -> Self {
        self.capture = capture;
        self
    }

    pub fn with_throttle(mut self, interval: Duration) -> Self {
        self.throttle = interval;
        self
    }

    // ========================================================================
    // Queries
    // ========================================================================

    pub fn state(&self) -> InteractionState {
        match &self.mode {
            Mode::Idle => InteractionState::Idle,
            Mode::Drag(session) => match session.kind {
                DragKind::Move => InteractionState::Moving,
                DragKind::Resize(_) => InteractionState::Resizing,
                DragKind::Vertex(_) => InteractionState::VertexDragging,
                DragKind::PolygonMove => InteractionState::PolygonDragging,
                DragKind::Pan => InteractionState::Panning,
                DragKind::CreateBox => InteractionState::CreatingBox,
            },
            Mode::CreatingBox { .. } => InteractionState::CreatingBox,
            Mode::CollectingPolygon { .. } => InteractionState::CollectingPolygonPoints,
            Mode::AwaitingLabel(_) => InteractionState::AwaitingLabel,
        }
    }

    pub fn is_idle(&self) -> bool {
        matches!(self.mode, Mode::Idle)
    }

    /// Whether a drag that edits a shape is in progress.
    pub fn is_editing_shape(&self) -> bool {
        matches!(&self.mode, Mode::Drag(session) if session.edits_shape())
    }

    pub fn selected(&self) -> Option<ShapeKey> {
        self.selected
    }

    pub fn selected_vertex(&self) -> Option<usize> {
        self.selected_vertex
    }

    pub fn pending_label(&self) -> Option<&PendingLabel> {
        match &self.mode {
            Mode::AwaitingLabel(pending) => Some(pending),
            _ => None,
        }
    }

    /// Rubber band of a box being created, in display space.
    pub fn rubber_band(&self, view: &Viewport) -> Option<DisplayRect> {
        match &self.mode {
            Mode::CreatingBox {
                anchor: Some(anchor),
                current,
                ..
            } => Some(DisplayRect::from_corners(
                view.from_natural(*anchor),
                view.from_natural(*current),
            )),
            _ => None,
        }
    }

    /// Points collected for a new polygon (natural) and the hover position.
    pub fn pending_points(&self) -> (&[Point], Option<Point>) {
        match &self.mode {
            Mode::CollectingPolygon { points, hover } => (points, *hover),
            Mode::AwaitingLabel(PendingLabel::Polygon(points)) => (points, None),
            _ => (&[], None),
        }
    }

    pub fn take_events(&mut self) -> Vec<InteractionEvent> {
        std::mem::take(&mut self.events)
    }

    /// Resolve what lies under a screen position.
    pub fn hit_test(&self, screen: Point, store: &ShapeStore, view: &Viewport) -> HitTarget {
        let p = view.to_display(screen);
        let radius = view.handle_radius();

        if let Some(shape) = self.selected.and_then(|key| store.get(key)) {
            match view.shape_display(shape) {
                DisplayShape::Box(rect) => {
                    let handle = ResizeHandle::ALL
                        .into_iter()
                        .find(|h| h.position(&rect).distance_to(&p) <= radius);
                    if let Some(handle) = handle {
                        return HitTarget::Handle(shape.key, handle);
                    }
                }
                DisplayShape::Polygon(points) => {
                    let closest = points
                        .iter()
                        .enumerate()
                        .map(|(i, v)| (i, v.distance_to(&p)))
                        .filter(|(_, d)| *d <= radius)
                        .min_by(|a, b| a.1.total_cmp(&b.1));
                    if let Some((index, _)) = closest {
                        return HitTarget::Vertex(shape.key, index);
                    }
                }
            }
        }

        // Later shapes are drawn on top
        for shape in store.shapes().iter().rev() {
            if view.shape_display(shape).contains(p) {
                return HitTarget::Body(shape.key);
            }
        }

        if view.geometry.contains(p) {
            HitTarget::Image
        } else {
            HitTarget::Empty
        }
    }

    // ========================================================================
    // Selection
    // ========================================================================

    /// Select a shape (or nothing). Selecting always replaces the previous selection.
    pub fn select(&mut self, key: Option<ShapeKey>) {
        if self.selected == key {
            return;
        }
        self.selected = key;
        self.selected_vertex = None;
        log::debug!("Canvas selection -> {:?}", key);
        self.events.push(InteractionEvent::SelectionChanged(key));
    }

    /// Drop all session state for an image switch.
    ///
    /// An active drag preview is rolled back first so the outgoing image is
    /// saved with committed geometry only. Selection is cleared silently.
    pub fn reset(&mut self, store: &mut ShapeStore) {
        self.abort(store);
        self.selected = None;
        self.selected_vertex = None;
        self.events.clear();
    }

    // ========================================================================
    // Pointer input
    // ========================================================================

    pub fn pointer_down(
        &mut self,
        screen: Point,
        store: &ShapeStore,
        view: &Viewport,
        now: Instant,
    ) {
        match &mut self.mode {
            Mode::Idle => {}
            Mode::CreatingBox {
                anchor,
                current,
                session,
            } => {
                let corner = view.to_natural_exact(view.to_display_clamped(screen));
                *anchor = Some(corner);
                *current = corner;
                let mut drag = DragSession::start(
                    DragKind::CreateBox,
                    screen,
                    view.zoom_pan,
                    self.capture.clone(),
                    self.throttle,
                );
                drag.should_update(now);
                *session = Some(drag);
                log::trace!("Box anchor at {:?}", corner);
                return;
            }
            Mode::CollectingPolygon { points, .. } => {
                push_polygon_point(points, screen, view);
                return;
            }
            Mode::Drag(_) | Mode::AwaitingLabel(_) => return,
        }

        match self.hit_test(screen, store, view) {
            HitTarget::Handle(key, handle) => {
                self.begin_shape_drag(DragKind::Resize(handle), key, screen, store, view, now);
            }
            HitTarget::Vertex(key, index) => {
                // Picking a vertex keeps the polygon selected
                self.selected_vertex = Some(index);
                self.begin_shape_drag(DragKind::Vertex(index), key, screen, store, view, now);
            }
            HitTarget::Body(key) => {
                let is_polygon = store
                    .get(key)
                    .is_some_and(|shape| shape.geometry().is_polygon());
                if !is_polygon {
                    self.select(Some(key));
                    self.begin_shape_drag(DragKind::Move, key, screen, store, view, now);
                } else if self.selected == Some(key) {
                    self.selected_vertex = None;
                    self.begin_shape_drag(DragKind::PolygonMove, key, screen, store, view, now);
                } else {
                    // First click on a polygon only selects it
                    self.select(Some(key));
                }
            }
            HitTarget::Image | HitTarget::Empty => {
                self.select(None);
                if view.zoom_pan.is_zoomed() {
                    let mut session = DragSession::start(
                        DragKind::Pan,
                        screen,
                        view.zoom_pan,
                        self.capture.clone(),
                        self.throttle,
                    );
                    session.should_update(now);
                    self.mode = Mode::Drag(session);
                }
            }
        }
    }

    fn begin_shape_drag(
        &mut self,
        kind: DragKind,
        key: ShapeKey,
        screen: Point,
        store: &ShapeStore,
        view: &Viewport,
        now: Instant,
    ) {
        let Some(shape) = store.get(key) else {
            log::debug!("Drag target {} vanished", key);
            return;
        };
        let mut session = DragSession::start(
            kind,
            screen,
            view.zoom_pan,
            self.capture.clone(),
            self.throttle,
        )
        .with_target(key, shape.geometry().clone());
        session.should_update(now);
        self.mode = Mode::Drag(session);
    }

    pub fn pointer_move(
        &mut self,
        screen: Point,
        store: &mut ShapeStore,
        view: &mut Viewport,
        now: Instant,
    ) {
        match &mut self.mode {
            Mode::Drag(session) => {
                if !session.should_update(now) {
                    return;
                }
                if session.kind == DragKind::Pan {
                    view.zoom_pan = panned(session, screen, view);
                    return;
                }
                let (Some(key), Some(edited)) = (session.target, drag_result(session, screen, view))
                else {
                    return;
                };
                let preview = edited.to_natural_exact(view.natural, &view.geometry);
                match store.update_visual(key, preview.clone()) {
                    Ok(()) => session.preview = Some(preview),
                    Err(e) => log::debug!("Preview for {} rejected: {}", key, e),
                }
            }
            Mode::CreatingBox {
                anchor: Some(_),
                current,
                session,
            } => {
                if session.as_mut().is_none_or(|s| s.should_update(now)) {
                    *current = view.to_natural_exact(view.to_display_clamped(screen));
                }
            }
            Mode::CollectingPolygon { hover, .. } => {
                *hover = Some(view.to_natural_exact(view.to_display_clamped(screen)));
            }
            _ => {}
        }
    }

    /// Finish the current drag. The final geometry uses this position, whatever the throttle skipped.
    pub fn pointer_up(&mut self, screen: Point, store: &mut ShapeStore, view: &mut Viewport) {
        match std::mem::replace(&mut self.mode, Mode::Idle) {
            Mode::Drag(session) => self.finish_drag(session, screen, store, view),
            Mode::CreatingBox {
                anchor: Some(anchor),
                ..
            } => {
                let rect =
                    DisplayRect::from_corners(view.from_natural(anchor), view.to_display_clamped(screen));
                if rect.width >= MIN_CREATE_SIZE && rect.height >= MIN_CREATE_SIZE {
                    let bounds = rect.to_natural(view.natural, &view.geometry);
                    log::debug!("Box drawn at {:?}, waiting for label", bounds);
                    self.mode = Mode::AwaitingLabel(PendingLabel::Box(bounds));
                    self.events.push(InteractionEvent::LabelRequested);
                } else {
                    log::debug!(
                        "Rubber band {:.1}x{:.1} too small, ignored",
                        rect.width,
                        rect.height
                    );
                    self.mode = Mode::CreatingBox {
                        anchor: None,
                        current: anchor,
                        session: None,
                    };
                }
            }
            other => self.mode = other,
        }
    }

    fn finish_drag(
        &mut self,
        session: DragSession,
        screen: Point,
        store: &mut ShapeStore,
        view: &mut Viewport,
    ) {
        if session.kind == DragKind::Pan {
            view.zoom_pan = panned(&session, screen, view);
            log::debug!(
                "Pan drag ended at ({:.0}, {:.0})",
                view.zoom_pan.pan_x,
                view.zoom_pan.pan_y
            );
            return;
        }

        let (Some(key), Some(origin)) = (session.target, session.origin.as_ref()) else {
            return;
        };
        let Some(edited) = drag_result(&session, screen, view) else {
            return;
        };

        if edited == origin.to_display(view.natural, &view.geometry) {
            if session.preview.is_some() {
                restore(store, key, origin);
            }
            log::trace!("Drag on {} ended without change", key);
            return;
        }

        let committed = match (session.kind, &edited) {
            (DragKind::Resize(handle), DisplayShape::Box(rect)) => {
                ShapeGeometry::Box(handle.to_natural(rect, view.natural, &view.geometry))
            }
            _ => edited.to_natural(view.natural, &view.geometry),
        };
        match store.update(key, committed) {
            Ok(()) => {
                log::debug!("Committed {:?} on {}", session.kind, key);
                self.events.push(InteractionEvent::Committed(key));
            }
            Err(e) => {
                log::debug!("Drag result for {} rejected: {}", key, e);
                restore(store, key, origin);
            }
        }
    }

    pub fn double_click(&mut self, screen: Point, view: &Viewport) {
        let Mode::CollectingPolygon { points, .. } = &mut self.mode else {
            return;
        };
        push_polygon_point(points, screen, view);
        if points.len() < MIN_POLYGON_VERTICES {
            log::debug!("Polygon needs {} points, have {}", MIN_POLYGON_VERTICES, points.len());
            return;
        }
        let points = std::mem::take(points);
        log::debug!("Polygon with {} points waiting for label", points.len());
        self.mode = Mode::AwaitingLabel(PendingLabel::Polygon(points));
        self.events.push(InteractionEvent::LabelRequested);
    }

    // ========================================================================
    // Creation
    // ========================================================================

    /// Enter the creation mode of the QC mode: boxes for detection, polygons for segmentation.
    pub fn start_creation(&mut self, qc_mode: QcMode) -> bool {
        if !self.is_idle() {
            log::debug!("Cannot start creation while {:?}", self.state());
            return false;
        }
        self.mode = match qc_mode {
            QcMode::Detection => Mode::CreatingBox {
                anchor: None,
                current: Point::default(),
                session: None,
            },
            QcMode::Segmentation => Mode::CollectingPolygon {
                points: Vec::new(),
                hover: None,
            },
        };
        log::debug!("Creation started ({})", qc_mode.name());
        true
    }

    /// Commit the pending shape under `name`. Returns its index in the store.
    ///
    /// An empty name leaves the shape pending.
    pub fn submit_label(&mut self, name: &str, store: &mut ShapeStore) -> Result<usize, GeometryError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(GeometryError::EmptyName);
        }
        let pending = match std::mem::replace(&mut self.mode, Mode::Idle) {
            Mode::AwaitingLabel(pending) => pending,
            other => {
                self.mode = other;
                return Err(GeometryError::NoPendingLabel);
            }
        };

        let index = match store.add(ShapeData::new(name, pending.geometry())) {
            Ok(index) => index,
            Err(e) => {
                self.mode = Mode::AwaitingLabel(pending);
                return Err(e);
            }
        };
        let key = store.key_at(index).ok_or(GeometryError::UnknownShape)?;
        log::info!("✅ Created {} '{}' at index {}", pending.geometry().kind_name(), name, index);
        self.events.push(InteractionEvent::Created(key));
        self.select(Some(key));
        Ok(index)
    }

    /// Escape: abort a creation or roll back a drag preview.
    pub fn cancel(&mut self, store: &mut ShapeStore, view: &mut Viewport) {
        if let Some(zoom_pan) = self.abort(store) {
            view.zoom_pan = zoom_pan;
        }
    }

    /// Returns the zoom/pan to restore when a pan drag was aborted.
    fn abort(&mut self, store: &mut ShapeStore) -> Option<ZoomPan> {
        match std::mem::replace(&mut self.mode, Mode::Idle) {
            Mode::Idle => None,
            Mode::Drag(session) => {
                log::debug!("❌ Drag {:?} cancelled", session.kind);
                if session.kind == DragKind::Pan {
                    return Some(session.pan_start);
                }
                if let (Some(key), Some(origin), Some(_)) =
                    (session.target, session.origin.as_ref(), session.preview.as_ref())
                {
                    restore(store, key, origin);
                }
                None
            }
            Mode::CreatingBox { .. } | Mode::CollectingPolygon { .. } | Mode::AwaitingLabel(_) => {
                log::debug!("❌ Creation cancelled");
                self.events.push(InteractionEvent::CreationCancelled);
                None
            }
        }
    }

    // ========================================================================
    // Editing commands
    // ========================================================================

    /// Delete key: remove the selected vertex if there is one, otherwise the selected shape.
    pub fn delete_selected(&mut self, store: &mut ShapeStore) -> Result<(), GeometryError> {
        if !self.is_idle() {
            return Ok(());
        }
        let key = self.selected.ok_or(GeometryError::UnknownShape)?;
        if let Some(index) = self.selected_vertex {
            return self.delete_vertex(index, store);
        }

        store.remove(key)?;
        log::info!("🗑️ Deleted shape {}", key);
        self.events.push(InteractionEvent::Removed(key));
        self.select(None);
        Ok(())
    }

    /// Insert a vertex after `after_index` on the selected polygon. Returns the new vertex index.
    pub fn insert_vertex(
        &mut self,
        after_index: usize,
        screen: Point,
        store: &mut ShapeStore,
        view: &Viewport,
    ) -> Result<usize, GeometryError> {
        let key = self.selected.ok_or(GeometryError::UnknownShape)?;
        let mut points = selected_polygon(store, key)?;
        if after_index >= points.len() {
            return Err(GeometryError::VertexOutOfRange {
                index: after_index,
                len: points.len(),
            });
        }
        let index = after_index + 1;
        points.insert(index, view.to_natural_exact(view.to_display_clamped(screen)));
        store.update(key, ShapeGeometry::Polygon(points))?;
        self.selected_vertex = Some(index);
        self.events.push(InteractionEvent::Committed(key));
        Ok(index)
    }

    /// Remove a vertex of the selected polygon, keeping at least three.
    pub fn delete_vertex(&mut self, index: usize, store: &mut ShapeStore) -> Result<(), GeometryError> {
        let key = self.selected.ok_or(GeometryError::UnknownShape)?;
        let mut points = selected_polygon(store, key)?;
        if index >= points.len() {
            return Err(GeometryError::VertexOutOfRange {
                index,
                len: points.len(),
            });
        }
        if points.len() <= MIN_POLYGON_VERTICES {
            return Err(GeometryError::PolygonTooSmall {
                count: points.len() - 1,
            });
        }
        points.remove(index);
        store.update(key, ShapeGeometry::Polygon(points))?;
        self.selected_vertex = None;
        self.events.push(InteractionEvent::Committed(key));
        Ok(())
    }

    /// Forget a shape removed from outside the controller.
    pub fn forget(&mut self, key: ShapeKey) {
        if self.selected == Some(key) {
            self.select(None);
        }
    }
}

fn selected_polygon(store: &ShapeStore, key: ShapeKey) -> Result<Vec<Point>, GeometryError> {
    match store.get(key).map(|shape| shape.geometry()) {
        Some(ShapeGeometry::Polygon(points)) => Ok(points.clone()),
        Some(ShapeGeometry::Box(_)) => Err(GeometryError::NotAPolygon),
        None => Err(GeometryError::UnknownShape),
    }
}

/// Append a clicked point unless it repeats the previous one.
fn push_polygon_point(points: &mut Vec<Point>, screen: Point, view: &Viewport) -> bool {
    let display = view.to_display_clamped(screen);
    let repeated = points
        .last()
        .is_some_and(|last| view.from_natural(*last).distance_to(&display) <= DUPLICATE_POINT_DISTANCE);
    if repeated {
        log::trace!("Ignoring repeated polygon point");
        return false;
    }
    points.push(view.to_natural_exact(display));
    log::trace!("Polygon point {} at {:?}", points.len(), display);
    true
}

fn panned(session: &DragSession, screen: Point, view: &Viewport) -> ZoomPan {
    session.pan_start.pan_by(
        screen.x - session.pointer_start.x,
        screen.y - session.pointer_start.y,
        &view.geometry,
    )
}

/// Display geometry of the drag target for the pointer at `screen`.
fn drag_result(session: &DragSession, screen: Point, view: &Viewport) -> Option<DisplayShape> {
    let origin = session.origin.as_ref()?;
    let start = view.to_display(session.pointer_start);
    let current = view.to_display(screen);
    let (dx, dy) = (current.x - start.x, current.y - start.y);
    let (max_x, max_y) = (view.max_x(), view.max_y());

    let edited = match (session.kind, origin.to_display(view.natural, &view.geometry)) {
        (DragKind::Move, DisplayShape::Box(rect)) => {
            DisplayShape::Box(move_rect(&rect, dx, dy, max_x, max_y))
        }
        (DragKind::Resize(handle), DisplayShape::Box(rect)) => {
            DisplayShape::Box(handle.apply(&rect, dx, dy, max_x, max_y))
        }
        (DragKind::PolygonMove, DisplayShape::Polygon(points)) => {
            DisplayShape::Polygon(move_points(&points, dx, dy, max_x, max_y))
        }
        (DragKind::Vertex(index), DisplayShape::Polygon(mut points)) => {
            let vertex = points.get_mut(index)?;
            *vertex = view.geometry.clamp_point(vertex.offset(dx, dy));
            DisplayShape::Polygon(points)
        }
        _ => return None,
    };
    Some(edited)
}

fn restore(store: &mut ShapeStore, key: ShapeKey, origin: &ShapeGeometry) {
    if let Err(e) = store.update_visual(key, origin.clone()) {
        log::debug!("Could not restore {}: {}", key, e);
    }
}
