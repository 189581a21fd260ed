//! Annotation codecs.
//!
//! Two independent dialects are supported, selected by the active QC mode:
//!
//! - **Box XML** (detection): repeated `object{name, bndbox, latLng?, ...}` records
//! - **Polygon JSON** (segmentation): a `shapes` list of `polygon` entries
//!
//! Both parse into [`crate::model::ShapeData`] in natural image coordinates
//! and serialize the full current shape list back on top of the parsed
//! baseline document.

mod error;
pub mod formats;
mod registry;
mod traits;

pub use error::FormatError;
pub use formats::{BoxDocument, BoxXmlCodec, PolygonDocument, PolygonJsonCodec, XmlNode};
pub use registry::{all_codecs, codec_by_extension, codec_by_id, codec_for};
pub use traits::{AnnotationCodec, AnnotationDocument, ImageMeta, ParsedAnnotation};
