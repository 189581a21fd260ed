//! Collaborator interfaces for reading and writing annotation files.
//!
//! The engine never touches storage directly. A host hands it an
//! [`AnnotationPersistence`] for blocking use, or drives
//! [`crate::state::SaveCoordinator`] itself when writes are asynchronous.

use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::format::FormatError;
use crate::model::QcMode;

/// Errors reported by persistence collaborators.
#[derive(Error, Debug)]
pub enum PersistenceError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Image {image:?} has no annotation path")]
    NoAnnotationPath { image: String },

    #[error("Write rejected for {path:?}")]
    WriteRejected { path: PathBuf },

    #[error("Serialization failed: {0}")]
    Serialize(#[from] FormatError),

    #[error("{0}")]
    Other(String),
}

/// Reads and writes raw annotation documents.
pub trait AnnotationPersistence {
    /// Raw file content, or `None` when there is nothing stored yet.
    fn read_annotation(&self, path: &Path) -> Result<Option<String>, PersistenceError>;

    fn write_annotation(&self, path: &Path, content: &str) -> Result<(), PersistenceError>;
}

/// Optional source of previously used labels for autocompletion.
pub trait ClassNameSource {
    fn class_names(&self, mode: QcMode) -> Result<Vec<String>, PersistenceError>;
}
