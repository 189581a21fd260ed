//! Screen-space render model of the canvas overlay.
//!
//! Built fresh for every frame from natural coordinates. Nothing here is
//! stored back into the shape store.

use crate::coords::Point;
use crate::interaction::{InteractionController, ResizeHandle, Viewport};
use crate::model::{DisplayShape, ShapeKey};
use crate::state::ShapeStore;
use crate::zoom_math::ZoomPan;

/// Outline of a shape in screen coordinates.
#[derive(Debug, Clone, PartialEq)]
pub enum Outline {
    Rect { top_left: Point, bottom_right: Point },
    Polygon(Vec<Point>),
}

/// One shape ready to draw.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedShape {
    pub key: ShapeKey,
    /// Position in the persisted list
    pub index: usize,
    pub name: String,
    pub outline: Outline,
    pub selected: bool,
    pub dirty: bool,
    /// Resize handles, only for the selected box
    pub handles: Vec<(ResizeHandle, Point)>,
    /// Vertex handles, only for the selected polygon
    pub vertices: Vec<Point>,
    pub selected_vertex: Option<usize>,
}

/// Shape under construction.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CreationPreview {
    /// Rubber band corners while drawing a box
    pub rubber_band: Option<(Point, Point)>,
    /// Collected polygon points
    pub points: Vec<Point>,
    /// Pointer position the next polygon edge is drawn to
    pub hover: Option<Point>,
}

impl CreationPreview {
    pub fn is_empty(&self) -> bool {
        self.rubber_band.is_none() && self.points.is_empty()
    }
}

/// Everything the host draws over the image for one frame.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RenderFrame {
    pub zoom_pan: ZoomPan,
    pub shapes: Vec<RenderedShape>,
    pub preview: Option<CreationPreview>,
}

pub(crate) fn build_frame(
    store: &ShapeStore,
    controller: &InteractionController,
    view: &Viewport,
) -> RenderFrame {
    let selected = controller.selected();
    let shapes = store
        .shapes()
        .iter()
        .enumerate()
        .map(|(index, shape)| {
            let is_selected = selected == Some(shape.key);
            let (outline, handles, vertices) = match view.shape_display(shape) {
                DisplayShape::Box(rect) => {
                    let handles = if is_selected {
                        ResizeHandle::ALL
                            .into_iter()
                            .map(|h| (h, view.to_screen(h.position(&rect))))
                            .collect()
                    } else {
                        Vec::new()
                    };
                    let outline = Outline::Rect {
                        top_left: view.to_screen(rect.top_left()),
                        bottom_right: view.to_screen(rect.bottom_right()),
                    };
                    (outline, handles, Vec::new())
                }
                DisplayShape::Polygon(points) => {
                    let screen: Vec<Point> = points.iter().map(|p| view.to_screen(*p)).collect();
                    let vertices = if is_selected { screen.clone() } else { Vec::new() };
                    (Outline::Polygon(screen), Vec::new(), vertices)
                }
            };
            RenderedShape {
                key: shape.key,
                index,
                name: shape.name().to_string(),
                outline,
                selected: is_selected,
                dirty: store.is_dirty(shape.key),
                handles,
                vertices,
                selected_vertex: controller.selected_vertex().filter(|_| is_selected),
            }
        })
        .collect();

    let (points, hover) = controller.pending_points();
    let preview = CreationPreview {
        rubber_band: controller.rubber_band(view).map(|rect| {
            (
                view.to_screen(rect.top_left()),
                view.to_screen(rect.bottom_right()),
            )
        }),
        points: points
            .iter()
            .map(|p| view.to_screen(view.from_natural(*p)))
            .collect(),
        hover: hover.map(|p| view.to_screen(view.from_natural(p))),
    };

    RenderFrame {
        zoom_pan: view.zoom_pan,
        shapes,
        preview: (!preview.is_empty()).then_some(preview),
    }
}
