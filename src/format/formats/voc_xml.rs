//! Box annotations in the Pascal VOC style XML dialect.
//!
//! Each `object` element carries a `name`, a `bndbox{xmin,ymin,xmax,ymax}`
//! in integer natural pixels and an optional `latLng` text in `(lat, lng)`
//! form. Any other simple child element is a custom attribute. Objects are
//! rewritten in place on save so the surrounding document is preserved.

use crate::format::error::FormatError;
use crate::format::formats::xml_tree::XmlNode;
use crate::format::traits::{AnnotationCodec, AnnotationDocument, ImageMeta, ParsedAnnotation};
use crate::model::{Attributes, LatLng, NaturalBox, QcMode, Shape, ShapeData, ShapeGeometry};

const OBJECT: &str = "object";
const NAME: &str = "name";
const BNDBOX: &str = "bndbox";
const LAT_LNG: &str = "latLng";

/// Parsed box document, kept as the baseline for the next save.
#[derive(Debug, Clone, PartialEq)]
pub struct BoxDocument {
    pub root: XmlNode,
}

impl BoxDocument {
    /// Object elements in document order.
    pub fn objects(&self) -> impl Iterator<Item = &XmlNode> {
        self.root.children_named(OBJECT)
    }
}

/// Box XML codec used in detection mode.
///
/// Objects without a `name` or a readable `bndbox` cannot be edited; they are
/// kept verbatim and written after the editable objects.
pub struct BoxXmlCodec;

impl AnnotationCodec for BoxXmlCodec {
    fn id(&self) -> &'static str {
        "voc-xml"
    }

    fn display_name(&self) -> &'static str {
        "Bounding boxes (XML)"
    }

    fn extensions(&self) -> &[&'static str] {
        &["xml"]
    }

    fn mode(&self) -> QcMode {
        QcMode::Detection
    }

    fn parse(&self, raw: &str) -> Result<ParsedAnnotation, FormatError> {
        let root = XmlNode::parse(raw)?;
        let document = BoxDocument { root };

        let mut shapes = Vec::new();
        for (index, object) in document.objects().enumerate() {
            match parse_object(object) {
                Ok(data) => shapes.push(data.with_origin(index)),
                Err(e) => log::warn!("Keeping object {} unedited: {}", index, e),
            }
        }

        log::debug!("Parsed {} editable boxes", shapes.len());
        Ok(ParsedAnnotation {
            document: AnnotationDocument::Boxes(document),
            shapes,
        })
    }

    fn serialize(
        &self,
        shapes: &[Shape],
        baseline: Option<&AnnotationDocument>,
        meta: &ImageMeta,
    ) -> Result<String, FormatError> {
        let baseline = match baseline {
            Some(AnnotationDocument::Boxes(doc)) => Some(doc),
            Some(AnnotationDocument::Polygons(_)) => {
                return Err(FormatError::DocumentMismatch {
                    codec: self.id(),
                    found: "polygon",
                });
            }
            None => None,
        };

        let mut root = match baseline {
            Some(doc) => doc.root.clone(),
            None => skeleton(meta),
        };
        let original: Vec<XmlNode> = root
            .children
            .iter()
            .filter(|c| c.name == OBJECT)
            .cloned()
            .collect();

        // Objects are written where the first one used to be
        let insert_at = root
            .children
            .iter()
            .position(|c| c.name == OBJECT)
            .unwrap_or(root.children.len());
        root.children.retain(|c| c.name != OBJECT);

        let mut objects = Vec::with_capacity(shapes.len());
        for shape in shapes {
            let ShapeGeometry::Box(bounds) = shape.geometry() else {
                log::warn!("Skipping non-box shape {} in box document", shape.key);
                continue;
            };
            let base = shape.data.origin.and_then(|i| original.get(i));
            objects.push(write_object(&shape.data, bounds, base));
        }
        objects.extend(
            original
                .iter()
                .filter(|o| parse_object(o).is_err())
                .cloned(),
        );

        let count = objects.len();
        let tail = root.children.split_off(insert_at);
        root.children.extend(objects);
        root.children.extend(tail);
        log::debug!("Serialized {} objects", count);
        root.to_xml_string()
    }
}

fn parse_object(object: &XmlNode) -> Result<ShapeData, FormatError> {
    let name = object
        .child_text(NAME)
        .ok_or_else(|| FormatError::missing_field(NAME))?;
    let bndbox = object
        .child(BNDBOX)
        .ok_or_else(|| FormatError::missing_field(BNDBOX))?;

    let coord = |field: &str| -> Result<f64, FormatError> {
        match bndbox.child_text(field) {
            None | Some("") => Ok(0.0),
            Some(text) => text
                .parse::<f64>()
                .ok()
                .filter(|v| v.is_finite())
                .ok_or_else(|| {
                    FormatError::invalid_coordinates(format!("{} is not a number: {:?}", field, text))
                }),
        }
    };
    let (x1, y1, x2, y2) = (coord("xmin")?, coord("ymin")?, coord("xmax")?, coord("ymax")?);
    let bounds = NaturalBox::new(x1.min(x2), y1.min(y2), x1.max(x2), y1.max(y2));

    let mut lat_lng = None;
    let mut attributes = Attributes::new();
    for child in object.children.iter().filter(|c| c.is_leaf()) {
        match child.name.as_str() {
            NAME => {}
            LAT_LNG => match LatLng::parse(&child.text) {
                Some(parsed) => lat_lng = Some(parsed),
                None => {
                    log::warn!("Unparseable latLng {:?} kept as attribute", child.text);
                    attributes.set(LAT_LNG, child.text.trim());
                }
            },
            other => {
                attributes.set(other, child.text.trim());
            }
        }
    }

    Ok(ShapeData::new(name, ShapeGeometry::Box(bounds))
        .with_lat_lng(lat_lng)
        .with_attributes(attributes))
}

fn write_object(data: &ShapeData, bounds: &NaturalBox, base: Option<&XmlNode>) -> XmlNode {
    let mut object = base.cloned().unwrap_or_else(|| XmlNode::new(OBJECT));
    object.set_child_text(NAME, data.name.as_str());

    let rounded = bounds.rounded();
    if object.child(BNDBOX).is_none() {
        object.children.push(XmlNode::new(BNDBOX));
    }
    if let Some(bndbox) = object.child_mut(BNDBOX) {
        bndbox.set_child_text("xmin", int_text(rounded.xmin));
        bndbox.set_child_text("ymin", int_text(rounded.ymin));
        bndbox.set_child_text("xmax", int_text(rounded.xmax));
        bndbox.set_child_text("ymax", int_text(rounded.ymax));
    }

    if let Some(lat_lng) = data.lat_lng {
        object.set_child_text(LAT_LNG, lat_lng.to_string());
    }
    for (key, value) in data.attributes.iter() {
        object.set_child_text(key, value);
    }
    object
}

fn int_text(v: f64) -> String {
    format!("{}", v as i64)
}

/// Fresh document for an image that has no annotation file yet.
fn skeleton(meta: &ImageMeta) -> XmlNode {
    let (width, height) = meta.pixel_size();
    let mut size = XmlNode::new("size");
    size.children.push(XmlNode::with_text("width", width.to_string()));
    size.children.push(XmlNode::with_text("height", height.to_string()));
    size.children.push(XmlNode::with_text("depth", "3"));

    let mut root = XmlNode::new("annotation");
    root.children.push(XmlNode::with_text("folder", meta.folder.as_str()));
    root.children
        .push(XmlNode::with_text("filename", meta.image_name.as_str()));
    root.children.push(size);
    root.children.push(XmlNode::with_text("segmented", "0"));
    root
}
