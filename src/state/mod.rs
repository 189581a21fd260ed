//! Editing state: the shape store, selection and save coordination.

mod save;
mod selection;
mod shape_store;

pub use save::{
    SaveCompletion, SaveCoordinator, SaveOutcome, SaveRequest, SaveSource, SaveStatus,
    SaveTicket, SaveTrigger,
};
pub use selection::{Provenance, SelectionBridge, SelectionNotice};
pub use shape_store::ShapeStore;
