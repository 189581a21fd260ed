//! Trait definitions for annotation codec implementations.

use crate::coords::NaturalSize;
use crate::format::error::FormatError;
use crate::format::formats::{BoxDocument, PolygonDocument};
use crate::model::{QcMode, Shape, ShapeData};

/// Trait for the per-mode annotation codecs.
///
/// A codec converts between one persisted dialect and the in-memory shape
/// model. It keeps the parsed document as a baseline so fields the editor does
/// not understand survive a save.
pub trait AnnotationCodec: Send + Sync {
    /// Unique identifier for this codec (e.g., "voc-xml").
    fn id(&self) -> &'static str;

    /// Human-readable name for UI display.
    fn display_name(&self) -> &'static str;

    /// File extensions this codec reads and writes.
    fn extensions(&self) -> &[&'static str];

    /// The QC mode this codec serves.
    fn mode(&self) -> QcMode;

    /// Parse raw file content into shapes plus the baseline document.
    fn parse(&self, raw: &str) -> Result<ParsedAnnotation, FormatError>;

    /// Serialize the full shape list, in order, on top of the baseline document.
    ///
    /// Without a baseline a fresh document is created from `meta`.
    fn serialize(
        &self,
        shapes: &[Shape],
        baseline: Option<&AnnotationDocument>,
        meta: &ImageMeta,
    ) -> Result<String, FormatError>;
}

/// Result of parsing an annotation file.
#[derive(Debug, Clone)]
pub struct ParsedAnnotation {
    pub document: AnnotationDocument,
    pub shapes: Vec<ShapeData>,
}

/// A parsed document kept as the baseline for the next save.
#[derive(Debug, Clone, PartialEq)]
pub enum AnnotationDocument {
    Boxes(BoxDocument),
    Polygons(PolygonDocument),
}

impl AnnotationDocument {
    pub fn mode(&self) -> QcMode {
        match self {
            AnnotationDocument::Boxes(_) => QcMode::Detection,
            AnnotationDocument::Polygons(_) => QcMode::Segmentation,
        }
    }
}

/// Image facts a codec needs when it has to create a document from scratch.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ImageMeta {
    pub image_name: String,
    pub folder: String,
    pub natural: Option<NaturalSize>,
}

impl ImageMeta {
    pub fn new(image_name: impl Into<String>) -> Self {
        Self {
            image_name: image_name.into(),
            ..Default::default()
        }
    }

    pub fn with_natural(mut self, natural: Option<NaturalSize>) -> Self {
        self.natural = natural.filter(NaturalSize::is_valid);
        self
    }

    /// Natural size rounded to whole pixels, or zeros when unknown.
    pub fn pixel_size(&self) -> (u32, u32) {
        self.natural
            .map(|n| (n.width.round() as u32, n.height.round() as u32))
            .unwrap_or((0, 0))
    }
}
