//! Codec lookup by QC mode, id or file extension.

use crate::format::formats::{BoxXmlCodec, PolygonJsonCodec};
use crate::format::traits::AnnotationCodec;
use crate::model::QcMode;

static BOX_XML: BoxXmlCodec = BoxXmlCodec;
static POLYGON_JSON: PolygonJsonCodec = PolygonJsonCodec;

/// The codec used for a QC mode: box XML for detection, polygon JSON for segmentation.
pub fn codec_for(mode: QcMode) -> &'static dyn AnnotationCodec {
    match mode {
        QcMode::Detection => &BOX_XML,
        QcMode::Segmentation => &POLYGON_JSON,
    }
}

/// All built-in codecs.
pub fn all_codecs() -> [&'static dyn AnnotationCodec; 2] {
    [&BOX_XML, &POLYGON_JSON]
}

/// Get a codec by its ID.
pub fn codec_by_id(id: &str) -> Option<&'static dyn AnnotationCodec> {
    all_codecs().into_iter().find(|c| c.id() == id)
}

/// Find the codec handling a file extension (case-insensitive, without the dot).
pub fn codec_by_extension(ext: &str) -> Option<&'static dyn AnnotationCodec> {
    let ext = ext.to_ascii_lowercase();
    all_codecs()
        .into_iter()
        .find(|c| c.extensions().iter().any(|e| *e == ext))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codec_for_mode() {
        assert_eq!(codec_for(QcMode::Detection).id(), "voc-xml");
        assert_eq!(codec_for(QcMode::Segmentation).id(), "labelme-json");
        assert_eq!(codec_for(QcMode::Segmentation).mode(), QcMode::Segmentation);
    }

    #[test]
    fn test_codec_lookup() {
        assert!(codec_by_id("voc-xml").is_some());
        assert!(codec_by_id("coco").is_none());
        assert_eq!(codec_by_extension("XML").map(|c| c.id()), Some("voc-xml"));
        assert_eq!(codec_by_extension("json").map(|c| c.id()), Some("labelme-json"));
        assert!(codec_by_extension("txt").is_none());
    }
}
