//! Pointer interaction: hit testing, drag sessions and the editing state machine.

mod controller;
mod handles;
mod session;
mod viewport;

pub use controller::{HitTarget, InteractionController, InteractionEvent, InteractionState, PendingLabel};
pub use handles::{ResizeHandle, move_points, move_rect};
pub use session::{DragKind, DragSession, NoCapture, PointerCapture, Throttle};
pub use viewport::Viewport;
