//! Polygon annotations in the LabelMe style JSON dialect.
//!
//! A top-level record holds a `shapes` list. Entries with
//! `shape_type == "polygon"` and at least three points are editable; every
//! other entry is carried through untouched.
//!
//! Opaque per-entry fields (`flags`, `group_id`, `description`, `mask` and
//! unknown keys) are restored on save from the first pre-edit polygon with the
//! same label. Two polygons sharing a label therefore share those fields after
//! a save. `attributes` always come from the shape itself.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::constants::MIN_POLYGON_VERTICES;
use crate::coords::Point;
use crate::format::error::FormatError;
use crate::format::traits::{AnnotationCodec, AnnotationDocument, ImageMeta, ParsedAnnotation};
use crate::model::{Attributes, LatLng, QcMode, Shape, ShapeData, ShapeGeometry};

const POLYGON: &str = "polygon";

/// Top-level polygon annotation file.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct LabelMeFile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default)]
    pub flags: Value,
    #[serde(default)]
    pub shapes: Vec<LabelMeShape>,
    #[serde(rename = "imagePath", default)]
    pub image_path: String,
    #[serde(rename = "imageData", default)]
    pub image_data: Value,
    #[serde(rename = "imageHeight", default)]
    pub image_height: u32,
    #[serde(rename = "imageWidth", default)]
    pub image_width: u32,
    #[serde(rename = "image_latLng", default, skip_serializing_if = "Option::is_none")]
    pub image_lat_lng: Option<Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// One entry of the `shapes` list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabelMeShape {
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub points: Vec<[f64; 2]>,
    #[serde(default)]
    pub group_id: Value,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default = "default_shape_type")]
    pub shape_type: String,
    #[serde(default)]
    pub flags: Value,
    #[serde(rename = "LatLng", default, skip_serializing_if = "Option::is_none")]
    pub lat_lng: Option<Value>,
    #[serde(default)]
    pub mask: Value,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub attributes: Map<String, Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

fn default_shape_type() -> String {
    POLYGON.to_string()
}

impl LabelMeShape {
    fn polygon(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            points: Vec::new(),
            group_id: Value::Null,
            description: Some(String::new()),
            shape_type: default_shape_type(),
            flags: Value::Object(Map::new()),
            lat_lng: None,
            mask: Value::Null,
            attributes: Map::new(),
            extra: Map::new(),
        }
    }

    /// Polygon entry the editor can manipulate.
    pub fn is_editable(&self) -> bool {
        self.shape_type == POLYGON && self.points.len() >= MIN_POLYGON_VERTICES
    }
}

/// Parsed polygon document, kept as the baseline for the next save.
#[derive(Debug, Clone, PartialEq)]
pub struct PolygonDocument {
    pub file: LabelMeFile,
}

/// Polygon JSON codec used in segmentation mode.
pub struct PolygonJsonCodec;

impl AnnotationCodec for PolygonJsonCodec {
    fn id(&self) -> &'static str {
        "labelme-json"
    }

    fn display_name(&self) -> &'static str {
        "Polygons (JSON)"
    }

    fn extensions(&self) -> &[&'static str] {
        &["json"]
    }

    fn mode(&self) -> QcMode {
        QcMode::Segmentation
    }

    fn parse(&self, raw: &str) -> Result<ParsedAnnotation, FormatError> {
        let file: LabelMeFile = serde_json::from_str(raw)?;

        let shapes: Vec<ShapeData> = file
            .shapes
            .iter()
            .enumerate()
            .filter(|(_, entry)| entry.is_editable())
            .map(|(index, entry)| {
                let points = entry.points.iter().map(|[x, y]| Point::new(*x, *y)).collect();
                let attributes: Attributes = entry
                    .attributes
                    .iter()
                    .map(|(k, v)| (k.clone(), value_text(v)))
                    .collect();
                ShapeData::new(entry.label.clone(), ShapeGeometry::Polygon(points))
                    .with_lat_lng(entry.lat_lng.as_ref().and_then(parse_lat_lng))
                    .with_attributes(attributes)
                    .with_origin(index)
            })
            .collect();

        let skipped = file.shapes.len() - shapes.len();
        if skipped > 0 {
            log::debug!("{} non-polygon entries will be kept unedited", skipped);
        }
        log::debug!("Parsed {} editable polygons", shapes.len());

        Ok(ParsedAnnotation {
            document: AnnotationDocument::Polygons(PolygonDocument { file }),
            shapes,
        })
    }

    fn serialize(
        &self,
        shapes: &[Shape],
        baseline: Option<&AnnotationDocument>,
        meta: &ImageMeta,
    ) -> Result<String, FormatError> {
        let mut file = match baseline {
            Some(AnnotationDocument::Polygons(doc)) => doc.file.clone(),
            Some(AnnotationDocument::Boxes(_)) => {
                return Err(FormatError::DocumentMismatch {
                    codec: self.id(),
                    found: "box",
                });
            }
            None => {
                let (width, height) = meta.pixel_size();
                LabelMeFile {
                    flags: Value::Object(Map::new()),
                    image_path: meta.image_name.clone(),
                    image_width: width,
                    image_height: height,
                    ..Default::default()
                }
            }
        };

        let original = std::mem::take(&mut file.shapes);
        let mut entries = Vec::with_capacity(original.len().max(shapes.len()));
        for shape in shapes {
            let ShapeGeometry::Polygon(points) = shape.geometry() else {
                log::warn!("Skipping non-polygon shape {} in polygon document", shape.key);
                continue;
            };
            // Name-based correlation; duplicate labels all resolve to the first match
            let base = original
                .iter()
                .find(|e| e.is_editable() && e.label == shape.data.name);
            entries.push(write_entry(&shape.data, points, base));
        }
        entries.extend(original.iter().filter(|e| !e.is_editable()).cloned());
        file.shapes = entries;

        log::debug!("Serialized {} shape entries", file.shapes.len());
        Ok(serde_json::to_string_pretty(&file)?)
    }
}

fn write_entry(data: &ShapeData, points: &[Point], base: Option<&LabelMeShape>) -> LabelMeShape {
    let mut entry = base
        .cloned()
        .unwrap_or_else(|| LabelMeShape::polygon(data.name.as_str()));
    entry.label = data.name.clone();
    entry.shape_type = default_shape_type();
    entry.points = points.iter().map(|p| [p.x, p.y]).collect();

    // Keep the stored representation when the value did not change
    let unchanged = entry.lat_lng.as_ref().and_then(parse_lat_lng) == data.lat_lng;
    if !unchanged {
        entry.lat_lng = data.lat_lng.map(|ll| Value::String(ll.to_string()));
    }

    // Attributes belong to the shape; the matched entry only lends its value types
    let stored = std::mem::take(&mut entry.attributes);
    for (key, value) in data.attributes.iter() {
        let kept = stored
            .get(key)
            .filter(|existing| value_text(existing) == value)
            .cloned()
            .unwrap_or_else(|| Value::String(value.to_string()));
        entry.attributes.insert(key.to_string(), kept);
    }
    entry
}

/// `LatLng` may be stored as `"(lat, lng)"`, `[lat, lng]` or `{"lat": .., "lng": ..}`.
fn parse_lat_lng(value: &Value) -> Option<LatLng> {
    match value {
        Value::String(text) => LatLng::parse(text),
        Value::Array(pair) if pair.len() == 2 => {
            Some(LatLng::new(pair[0].as_f64()?, pair[1].as_f64()?))
        }
        Value::Object(map) => Some(LatLng::new(
            map.get("lat")?.as_f64()?,
            map.get("lng")?.as_f64()?,
        )),
        _ => None,
    }
}

/// Display text of an attribute value; strings lose their JSON quotes.
fn value_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}
