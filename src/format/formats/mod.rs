//! Annotation codec implementations.

mod labelme_json;
mod voc_xml;
mod xml_tree;

#[cfg(test)]
mod tests;

pub use labelme_json::{LabelMeFile, LabelMeShape, PolygonDocument, PolygonJsonCodec};
pub use voc_xml::{BoxDocument, BoxXmlCodec};
pub use xml_tree::XmlNode;
