//! The active image and the QC mode it is reviewed in.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Which annotation dialect is being reviewed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QcMode {
    /// Bounding boxes in the XML dialect
    #[default]
    Detection,
    /// Polygons in the JSON dialect
    Segmentation,
}

impl QcMode {
    /// Map the external configuration's QC type key.
    pub fn from_qc_type_key(key: &str) -> Self {
        if key == "seg_qc" {
            QcMode::Segmentation
        } else {
            QcMode::Detection
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            QcMode::Detection => "Detection",
            QcMode::Segmentation => "Segmentation",
        }
    }
}

/// Identifies the image under review, as supplied by the image navigator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageRef {
    pub name: String,
    pub full_path: PathBuf,
    pub annotation_path: Option<PathBuf>,
    pub has_annotation: bool,
}

impl ImageRef {
    pub fn new(name: impl Into<String>, full_path: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            full_path: full_path.into(),
            annotation_path: None,
            has_annotation: false,
        }
    }

    pub fn with_annotation(mut self, path: impl Into<PathBuf>, exists: bool) -> Self {
        self.annotation_path = Some(path.into());
        self.has_annotation = exists;
        self
    }
}
