//! qcedit - annotation quality-control canvas engine
//!
//! Loads bounding-box XML or polygon JSON annotations for one image, lets a
//! reviewer move, resize, reshape, create and delete shapes over the
//! displayed image, and writes the corrected document back without losing
//! the fields it does not edit.
//!
//! The engine has no UI of its own. A host feeds [`QcEditor`] pointer and key
//! input in screen coordinates and draws the [`RenderFrame`] it returns;
//! storage is reached through the [`AnnotationPersistence`] and
//! [`ClassNameSource`] traits.

pub mod config;
pub mod constants;
pub mod coords;
pub mod editor;
pub mod format;
pub mod interaction;
pub mod keybindings;
pub mod model;
pub mod persistence;
pub mod state;
pub mod zoom_math;

#[cfg(not(target_arch = "wasm32"))]
pub mod native;

pub use config::{AppConfig, ConfigError, LogLevel, UserPreferences};
pub use coords::{DisplayGeometry, ElementRect, NaturalSize, Point};
pub use editor::{
    CreationPreview, EditorEvent, Outline, PanelShape, PanelView, QcEditor, RenderFrame,
    RenderedShape,
};
pub use format::{AnnotationCodec, FormatError, codec_for};
pub use interaction::{InteractionState, PointerCapture};
pub use keybindings::{EditorAction, KeyBindings};
pub use model::{GeometryError, ImageRef, QcMode, Shape, ShapeData, ShapeGeometry, ShapeKey};
pub use persistence::{AnnotationPersistence, ClassNameSource, PersistenceError};
pub use state::{SaveRequest, SaveStatus, SaveTicket, SaveTrigger};
pub use zoom_math::ZoomPan;
