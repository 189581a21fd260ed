//! Tests for the polygon JSON codec.

use serde_json::Value;

use super::keyed;
use crate::coords::{NaturalSize, Point};
use crate::format::formats::PolygonJsonCodec;
use crate::format::traits::{AnnotationCodec, ImageMeta};
use crate::model::{LatLng, ShapeData, ShapeGeometry};

const SAMPLE: &str = r#"{
  "version": "5.2.1",
  "flags": {},
  "shapes": [
    {
      "label": "tree",
      "points": [[10, 10], [40, 12.5], [25, 40]],
      "group_id": 3,
      "description": "old oak",
      "shape_type": "polygon",
      "flags": {"verified": true},
      "LatLng": "(55.5, 12.25)",
      "mask": null,
      "attributes": {"species": "oak", "height_m": 12}
    },
    {
      "label": "sign",
      "points": [[1, 1], [9, 9]],
      "group_id": null,
      "shape_type": "rectangle",
      "flags": {}
    },
    {
      "label": "pond",
      "points": [[50, 50], [80, 50], [80, 80], [50, 80]],
      "shape_type": "polygon",
      "flags": {},
      "score": 0.93
    }
  ],
  "imagePath": "IMG_0002.jpg",
  "imageData": null,
  "imageHeight": 100,
  "imageWidth": 120,
  "image_latLng": "(55.0, 12.0)",
  "reviewer": "qa-team"
}"#;

fn meta() -> ImageMeta {
    ImageMeta::new("IMG_0002.jpg").with_natural(Some(NaturalSize::new(120.0, 100.0)))
}

fn points(data: &ShapeData) -> &[Point] {
    match &data.geometry {
        ShapeGeometry::Polygon(points) => points,
        ShapeGeometry::Box(_) => panic!("expected a polygon"),
    }
}

fn entries(json: &str) -> Vec<Value> {
    let value: Value = serde_json::from_str(json).unwrap();
    value["shapes"].as_array().unwrap().clone()
}

#[test]
fn test_labelme_codec_metadata() {
    let codec = PolygonJsonCodec;
    assert_eq!(codec.id(), "labelme-json");
    assert!(codec.extensions().contains(&"json"));
}

#[test]
fn test_parse_polygons_only() {
    let parsed = PolygonJsonCodec.parse(SAMPLE).unwrap();
    assert_eq!(parsed.shapes.len(), 2);

    let tree = &parsed.shapes[0];
    assert_eq!(tree.name, "tree");
    assert_eq!(points(tree).len(), 3);
    assert_eq!(points(tree)[1], Point::new(40.0, 12.5));
    assert_eq!(tree.lat_lng, Some(LatLng::new(55.5, 12.25)));
    assert_eq!(tree.attributes.get("species"), Some("oak"));
    assert_eq!(tree.attributes.get("height_m"), Some("12"));
    assert_eq!(tree.origin, Some(0));

    assert_eq!(parsed.shapes[1].name, "pond");
    assert_eq!(parsed.shapes[1].origin, Some(2));
}

#[test]
fn test_parse_defaults_shape_type_to_polygon() {
    let json = r#"{"shapes": [{"label": "a", "points": [[0, 0], [5, 0], [5, 5]]}]}"#;
    let parsed = PolygonJsonCodec.parse(json).unwrap();
    assert_eq!(parsed.shapes.len(), 1);
}

#[test]
fn test_parse_malformed_is_error() {
    assert!(PolygonJsonCodec.parse("{\"shapes\": [").is_err());
    assert!(PolygonJsonCodec.parse("[]").is_err());
}

#[test]
fn test_serialize_preserves_opaque_fields() {
    let parsed = PolygonJsonCodec.parse(SAMPLE).unwrap();
    let mut shapes = parsed.shapes.clone();
    if let ShapeGeometry::Polygon(points) = &mut shapes[0].geometry {
        points[0] = Point::new(12.0, 14.0);
    }

    let out = PolygonJsonCodec
        .serialize(&keyed(shapes), Some(&parsed.document), &meta())
        .unwrap();
    let value: Value = serde_json::from_str(&out).unwrap();
    assert_eq!(value["version"], "5.2.1");
    assert_eq!(value["reviewer"], "qa-team");
    assert_eq!(value["image_latLng"], "(55.0, 12.0)");
    assert_eq!(value["imageWidth"], 120);

    let shapes = entries(&out);
    assert_eq!(shapes.len(), 3);

    let tree = &shapes[0];
    assert_eq!(tree["points"][0][0], 12.0);
    assert_eq!(tree["points"][0][1], 14.0);
    assert_eq!(tree["group_id"], 3);
    assert_eq!(tree["description"], "old oak");
    assert_eq!(tree["flags"]["verified"], true);
    assert_eq!(tree["LatLng"], "(55.5, 12.25)");
    assert_eq!(tree["attributes"]["height_m"], 12, "unchanged values keep their JSON type");

    assert_eq!(shapes[1]["label"], "pond");
    assert_eq!(shapes[1]["score"], 0.93);

    // Non-polygon entries follow the polygons
    assert_eq!(shapes[2]["shape_type"], "rectangle");
    assert_eq!(shapes[2]["points"].as_array().unwrap().len(), 2);
}

#[test]
fn test_serialize_writes_edited_attributes_and_lat_lng() {
    let parsed = PolygonJsonCodec.parse(SAMPLE).unwrap();
    let mut shapes = parsed.shapes.clone();
    shapes[0].attributes.set("species", "elm");
    shapes[0].lat_lng = Some(LatLng::new(1.5, 2.5));

    let out = PolygonJsonCodec
        .serialize(&keyed(shapes), Some(&parsed.document), &meta())
        .unwrap();
    let tree = &entries(&out)[0];
    assert_eq!(tree["attributes"]["species"], "elm");
    assert_eq!(tree["LatLng"], "(1.5, 2.5)");
}

#[test]
fn test_serialize_new_polygon_gets_defaults() {
    let parsed = PolygonJsonCodec.parse(SAMPLE).unwrap();
    let mut shapes = parsed.shapes.clone();
    shapes.push(ShapeData::new(
        "bush",
        ShapeGeometry::Polygon(vec![
            Point::new(1.0, 1.0),
            Point::new(4.0, 1.0),
            Point::new(2.5, 3.0),
        ]),
    ));

    let out = PolygonJsonCodec
        .serialize(&keyed(shapes), Some(&parsed.document), &meta())
        .unwrap();
    let bush = &entries(&out)[2];
    assert_eq!(bush["label"], "bush");
    assert_eq!(bush["shape_type"], "polygon");
    assert_eq!(bush["group_id"], Value::Null);
    assert_eq!(bush["flags"], serde_json::json!({}));
    assert!(bush.get("attributes").is_none());
}

#[test]
fn test_opaque_fields_follow_label_not_position() {
    // Renaming loses the correlation, a duplicate label picks up the first entry's fields
    let parsed = PolygonJsonCodec.parse(SAMPLE).unwrap();
    let mut shapes = parsed.shapes.clone();
    shapes[0].name = "oak".to_string();
    shapes[1].name = "tree".to_string();

    let out = PolygonJsonCodec
        .serialize(&keyed(shapes), Some(&parsed.document), &meta())
        .unwrap();
    let written = entries(&out);
    assert_eq!(written[0]["label"], "oak");
    assert_eq!(written[0]["group_id"], Value::Null);
    assert_eq!(written[1]["label"], "tree");
    assert_eq!(written[1]["group_id"], 3);
}

#[test]
fn test_serialize_without_baseline_creates_document() {
    let shapes = vec![ShapeData::new(
        "tree",
        ShapeGeometry::Polygon(vec![
            Point::new(0.0, 0.0),
            Point::new(10.0, 0.0),
            Point::new(5.0, 8.0),
        ]),
    )];
    let out = PolygonJsonCodec.serialize(&keyed(shapes), None, &meta()).unwrap();
    let value: Value = serde_json::from_str(&out).unwrap();
    assert_eq!(value["imagePath"], "IMG_0002.jpg");
    assert_eq!(value["imageWidth"], 120);
    assert_eq!(value["imageHeight"], 100);
    assert_eq!(value["imageData"], Value::Null);

    let reparsed = PolygonJsonCodec.parse(&out).unwrap();
    assert_eq!(reparsed.shapes.len(), 1);
    assert_eq!(points(&reparsed.shapes[0])[2], Point::new(5.0, 8.0));
}

#[test]
fn test_output_is_pretty_printed() {
    let parsed = PolygonJsonCodec.parse(SAMPLE).unwrap();
    let out = PolygonJsonCodec
        .serialize(&keyed(parsed.shapes.clone()), Some(&parsed.document), &meta())
        .unwrap();
    assert!(out.contains("\n  \"shapes\": ["));
}

#[test]
fn test_duplicate_labels_keep_their_own_attributes() {
    let json = r#"{
  "shapes": [
    {"label": "car", "points": [[0, 0], [10, 0], [5, 8]], "shape_type": "polygon",
     "attributes": {"color": "red", "doors": 4}},
    {"label": "car", "points": [[20, 20], [30, 20], [25, 28]], "shape_type": "polygon"}
  ]
}"#;
    let parsed = PolygonJsonCodec.parse(json).unwrap();
    let out = PolygonJsonCodec
        .serialize(&keyed(parsed.shapes.clone()), Some(&parsed.document), &meta())
        .unwrap();

    let reparsed = PolygonJsonCodec.parse(&out).unwrap();
    assert_eq!(reparsed.shapes[0].attributes.get("color"), Some("red"));
    assert!(reparsed.shapes[1].attributes.is_empty());

    let written = entries(&out);
    assert_eq!(written[0]["attributes"]["doors"], 4);
    assert!(written[1].get("attributes").is_none());
}

#[test]
fn test_removed_attribute_is_not_written_back() {
    let parsed = PolygonJsonCodec.parse(SAMPLE).unwrap();
    let mut shapes = parsed.shapes.clone();
    shapes[0].attributes = [("species", "oak")].into_iter().collect();

    let out = PolygonJsonCodec
        .serialize(&keyed(shapes), Some(&parsed.document), &meta())
        .unwrap();
    let tree = &entries(&out)[0];
    assert_eq!(tree["attributes"]["species"], "oak");
    assert!(tree["attributes"].get("height_m").is_none());
}
