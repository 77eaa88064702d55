// src/loader/tmx_loader.rs
//! TMX / TSX / TX traversal.
//!
//! Each element is turned into a raw JSON object using Tiled JSON field names.
//! The raw tree is either returned as-is (lenient) or handed to the validation
//! pass which produces the typed document.

use log::{debug, info, warn};
use roxmltree::{Document, Node};
use serde_json::{Map as JsonMap, Value as JsonValue};

use crate::config::ParseOptions;
use crate::document::{Parsed, TemplateDocument, TiledMap, TilesetDocument};
use crate::error::MapError;
use crate::loader::attributes::{attributes_to_json, coerce_attribute, coerce_bool, coerce_number};
use crate::validate;

type Object = JsonMap<String, JsonValue>;

/// Parse a `<map>` document and validate it.
pub fn parse_map(xml: &str) -> Result<TiledMap, MapError> {
    validate::validate_map(map_to_raw(xml)?)
}

/// Parse a `<map>` document; `options.strict` selects validation.
pub fn parse_map_with(xml: &str, options: &ParseOptions) -> Result<Parsed<TiledMap>, MapError> {
    let raw = map_to_raw(xml)?;
    if options.strict {
        validate::validate_map(raw).map(Parsed::Strict)
    } else {
        Ok(Parsed::Lenient(raw))
    }
}

/// Parse a standalone `<tileset>` (TSX) document and validate it.
pub fn parse_external_tileset(xml: &str) -> Result<TilesetDocument, MapError> {
    validate::validate_tileset_document(tileset_to_raw(xml)?)
}

/// Parse a standalone `<tileset>` (TSX) document; `options.strict` selects validation.
pub fn parse_external_tileset_with(
    xml: &str,
    options: &ParseOptions,
) -> Result<Parsed<TilesetDocument>, MapError> {
    let raw = tileset_to_raw(xml)?;
    if options.strict {
        validate::validate_tileset_document(raw).map(Parsed::Strict)
    } else {
        Ok(Parsed::Lenient(raw))
    }
}

/// Parse a `<template>` (TX) document and validate it.
pub fn parse_external_template(xml: &str) -> Result<TemplateDocument, MapError> {
    validate::validate_template(template_to_raw(xml)?)
}

/// Parse a `<template>` (TX) document; `options.strict` selects validation.
pub fn parse_external_template_with(
    xml: &str,
    options: &ParseOptions,
) -> Result<Parsed<TemplateDocument>, MapError> {
    let raw = template_to_raw(xml)?;
    if options.strict {
        validate::validate_template(raw).map(Parsed::Strict)
    } else {
        Ok(Parsed::Lenient(raw))
    }
}

// ---------------------------------------------------------------------------
// Roots
// ---------------------------------------------------------------------------

fn root_element<'a, 'i>(document: &'a Document<'i>, expected: &str) -> Result<Node<'a, 'i>, MapError> {
    let root = document.root_element();
    let found = root.tag_name().name();
    if found != expected {
        return Err(MapError::structural(
            expected,
            format!("expected <{expected}> at root level, got <{found}>"),
        ));
    }
    Ok(root)
}

fn map_to_raw(xml: &str) -> Result<JsonValue, MapError> {
    let document = Document::parse(xml)?;
    let node = root_element(&document, "map")?;

    let mut obj = tagged("map");
    obj.extend(attributes_to_json(node));
    let infinite = obj.get("infinite").and_then(JsonValue::as_bool).unwrap_or(false);

    let mut layers = Vec::new();
    let mut tilesets = Vec::new();
    for child in elements(node) {
        match child.tag_name().name() {
            "properties" => {
                obj.insert("properties".into(), properties_to_json(child)?);
            }
            "tileset" => tilesets.push(JsonValue::Object(tileset_to_json(child)?)),
            "layer" | "objectgroup" | "imagelayer" | "group" => {
                collect_layers(child, infinite, &mut layers)?
            }
            other => debug!("skipping <{other}> in <map>"),
        }
    }
    info!(
        "parsed map: {} layers, {} tilesets, infinite={infinite}",
        layers.len(),
        tilesets.len()
    );
    obj.insert("layers".into(), JsonValue::Array(layers));
    obj.insert("tilesets".into(), JsonValue::Array(tilesets));
    Ok(JsonValue::Object(obj))
}

fn tileset_to_raw(xml: &str) -> Result<JsonValue, MapError> {
    let document = Document::parse(xml)?;
    let node = root_element(&document, "tileset")?;
    let mut obj = tagged("tileset");
    obj.extend(tileset_to_json(node)?);
    Ok(JsonValue::Object(obj))
}

fn template_to_raw(xml: &str) -> Result<JsonValue, MapError> {
    let document = Document::parse(xml)?;
    let node = root_element(&document, "template")?;

    let mut obj = tagged("template");
    for child in elements(node) {
        match child.tag_name().name() {
            "tileset" => {
                obj.insert("tileset".into(), JsonValue::Object(tileset_to_json(child)?));
            }
            "object" => {
                obj.insert("object".into(), JsonValue::Object(object_to_json(child)?));
            }
            other => debug!("skipping <{other}> in <template>"),
        }
    }
    if !obj.contains_key("object") {
        return Err(MapError::structural("template", "template has no <object>"));
    }
    Ok(JsonValue::Object(obj))
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn elements<'a, 'i>(node: Node<'a, 'i>) -> impl Iterator<Item = Node<'a, 'i>> {
    node.children().filter(|n| n.is_element())
}

fn tagged(kind: &str) -> Object {
    let mut obj = Object::new();
    obj.insert("type".into(), JsonValue::from(kind));
    obj
}

/// All text below `node`, concatenated.
fn text_content(node: Node) -> String {
    node.descendants()
        .filter(|n| n.is_text())
        .filter_map(|n| n.text())
        .collect()
}

fn required_int(node: Node, name: &str) -> Result<i64, MapError> {
    let tag = node.tag_name().name();
    let text = node
        .attribute(name)
        .ok_or_else(|| MapError::structural(tag, format!("required attribute '{name}' missing")))?;
    text.trim()
        .parse()
        .map_err(|_| MapError::structural(tag, format!("attribute '{name}' is not an integer: '{text}'")))
}

// ---------------------------------------------------------------------------
// Properties
// ---------------------------------------------------------------------------

fn properties_to_json(node: Node) -> Result<JsonValue, MapError> {
    let mut out = Vec::new();
    for prop in elements(node).filter(|n| n.has_tag_name("property")) {
        let name = prop
            .attribute("name")
            .ok_or_else(|| MapError::structural("property", "required attribute 'name' missing"))?;
        let kind = prop.attribute("type").unwrap_or("string");

        let mut entry = Object::new();
        entry.insert("name".into(), JsonValue::from(name));
        entry.insert("type".into(), JsonValue::from(kind));
        if let Some(propertytype) = prop.attribute("propertytype") {
            entry.insert("propertytype".into(), JsonValue::from(propertytype));
        }
        entry.insert("value".into(), property_value(prop, kind)?);
        out.push(JsonValue::Object(entry));
    }
    Ok(JsonValue::Array(out))
}

fn property_value(prop: Node, kind: &str) -> Result<JsonValue, MapError> {
    if kind == "class" {
        return Ok(JsonValue::Object(class_members(prop)?));
    }
    let text = match prop.attribute("value") {
        Some(v) => v.to_owned(),
        None => text_content(prop),
    };
    Ok(coerce_property(kind, &text))
}

/// Members of a `class` property live in a nested `<properties>` block.
fn class_members(prop: Node) -> Result<Object, MapError> {
    let mut members = Object::new();
    let Some(nested) = elements(prop).find(|n| n.has_tag_name("properties")) else {
        return Ok(members);
    };
    for member in elements(nested).filter(|n| n.has_tag_name("property")) {
        let name = member
            .attribute("name")
            .ok_or_else(|| MapError::structural("property", "required attribute 'name' missing"))?;
        let kind = member.attribute("type").unwrap_or("string");
        members.insert(name.to_owned(), property_value(member, kind)?);
    }
    Ok(members)
}

fn coerce_property(kind: &str, text: &str) -> JsonValue {
    match kind {
        "bool" => JsonValue::Bool(coerce_bool(text)),
        "int" | "float" | "object" => coerce_number(text),
        _ => JsonValue::from(text),
    }
}

// ---------------------------------------------------------------------------
// Layers
// ---------------------------------------------------------------------------

/// Push the layers produced by `node` onto `out`. Groups are flattened: their
/// children are spliced in place and the group itself is dropped.
fn collect_layers(node: Node, infinite: bool, out: &mut Vec<JsonValue>) -> Result<(), MapError> {
    match node.tag_name().name() {
        "layer" => out.push(JsonValue::Object(tile_layer_to_json(node, infinite)?)),
        "objectgroup" => out.push(JsonValue::Object(object_layer_to_json(node)?)),
        "imagelayer" => out.push(JsonValue::Object(image_layer_to_json(node)?)),
        "group" => {
            debug!(
                "flattening group '{}'",
                node.attribute("name").unwrap_or_default()
            );
            for child in elements(node) {
                collect_layers(child, infinite, out)?;
            }
        }
        _ => {}
    }
    Ok(())
}

fn tile_layer_to_json(node: Node, infinite: bool) -> Result<Object, MapError> {
    let mut obj = tagged("tilelayer");
    obj.extend(attributes_to_json(node));
    for child in elements(node) {
        match child.tag_name().name() {
            "properties" => {
                obj.insert("properties".into(), properties_to_json(child)?);
            }
            "data" => decode_data(child, infinite, &mut obj)?,
            other => debug!("skipping <{other}> in <layer>"),
        }
    }
    Ok(obj)
}

fn decode_data(node: Node, infinite: bool, layer: &mut Object) -> Result<(), MapError> {
    let encoding = node.attribute("encoding");
    let compression = node.attribute("compression").filter(|c| !c.is_empty());
    if let Some(encoding) = encoding {
        layer.insert("encoding".into(), JsonValue::from(encoding));
    }
    if let Some(compression) = compression {
        layer.insert("compression".into(), JsonValue::from(compression));
    }

    if !infinite {
        layer.insert("data".into(), tile_data(node, encoding)?);
        return Ok(());
    }

    let mut chunks = Vec::new();
    let mut bounds: Option<(i64, i64, i64, i64)> = None;
    for chunk in elements(node).filter(|n| n.has_tag_name("chunk")) {
        let (x, y) = (required_int(chunk, "x")?, required_int(chunk, "y")?);
        let (w, h) = (required_int(chunk, "width")?, required_int(chunk, "height")?);
        bounds = Some(match bounds {
            None => (x, y, x + w, y + h),
            Some((min_x, min_y, max_x, max_y)) => {
                (min_x.min(x), min_y.min(y), max_x.max(x + w), max_y.max(y + h))
            }
        });

        let mut obj = attributes_to_json(chunk);
        obj.insert("data".into(), tile_data(chunk, encoding)?);
        chunks.push(JsonValue::Object(obj));
    }

    if let Some((min_x, min_y, max_x, max_y)) = bounds {
        layer.insert("startx".into(), JsonValue::from(min_x));
        layer.insert("starty".into(), JsonValue::from(min_y));
        layer.insert("width".into(), JsonValue::from(max_x - min_x));
        layer.insert("height".into(), JsonValue::from(max_y - min_y));
    }
    layer.insert("chunks".into(), JsonValue::Array(chunks));
    Ok(())
}

/// Decode the contents of a `<data>` or `<chunk>` element.
fn tile_data(node: Node, encoding: Option<&str>) -> Result<JsonValue, MapError> {
    let tag = node.tag_name().name();
    match encoding {
        Some("csv") => {
            let text = text_content(node);
            let mut gids = Vec::new();
            for token in text.split(',').map(str::trim).filter(|t| !t.is_empty()) {
                let gid: u32 = token.parse().map_err(|_| {
                    MapError::structural(tag, format!("invalid CSV tile gid '{token}'"))
                })?;
                gids.push(JsonValue::from(gid));
            }
            Ok(JsonValue::Array(gids))
        }
        Some("base64") => {
            let payload: String = text_content(node).split_whitespace().collect();
            Ok(JsonValue::String(payload))
        }
        None => {
            let mut gids = Vec::new();
            for tile in elements(node).filter(|n| n.has_tag_name("tile")) {
                let gid = match tile.attribute("gid") {
                    Some(text) => text.trim().parse::<u32>().map_err(|_| {
                        MapError::structural("tile", format!("invalid tile gid '{text}'"))
                    })?,
                    None => 0,
                };
                gids.push(JsonValue::from(gid));
            }
            Ok(JsonValue::Array(gids))
        }
        Some(other) => Err(MapError::structural(
            tag,
            format!("unsupported data encoding '{other}'"),
        )),
    }
}

fn object_layer_to_json(node: Node) -> Result<Object, MapError> {
    let mut obj = tagged("objectgroup");
    obj.extend(attributes_to_json(node));
    let mut objects = Vec::new();
    for child in elements(node) {
        match child.tag_name().name() {
            "properties" => {
                obj.insert("properties".into(), properties_to_json(child)?);
            }
            "object" => objects.push(JsonValue::Object(object_to_json(child)?)),
            other => debug!("skipping <{other}> in <objectgroup>"),
        }
    }
    obj.insert("objects".into(), JsonValue::Array(objects));
    Ok(obj)
}

fn image_layer_to_json(node: Node) -> Result<Object, MapError> {
    let mut obj = tagged("imagelayer");
    obj.extend(attributes_to_json(node));
    for child in elements(node) {
        match child.tag_name().name() {
            "properties" => {
                obj.insert("properties".into(), properties_to_json(child)?);
            }
            "image" => apply_image(child, &mut obj),
            other => debug!("skipping <{other}> in <imagelayer>"),
        }
    }
    Ok(obj)
}

/// Fold an `<image>` element into its owner as `image`/`imagewidth`/`imageheight`.
fn apply_image(node: Node, owner: &mut Object) {
    for attr in node.attributes() {
        let (key, value) = match attr.name() {
            "source" => ("image", JsonValue::from(attr.value())),
            "width" => ("imagewidth", coerce_number(attr.value())),
            "height" => ("imageheight", coerce_number(attr.value())),
            "trans" => {
                let color = attr.value().trim_start_matches('#');
                ("transparentcolor", JsonValue::from(format!("#{color}")))
            }
            other => {
                debug!("skipping image attribute '{other}'");
                continue;
            }
        };
        owner.insert(key.into(), value);
    }
}

// ---------------------------------------------------------------------------
// Objects
// ---------------------------------------------------------------------------

fn object_to_json(node: Node) -> Result<Object, MapError> {
    let mut obj = Object::new();
    for attr in node.attributes() {
        match attr.name() {
            // Tiled 1.9 renamed the object's `type` to `class` in XML only.
            "type" | "class" => {
                obj.insert("type".into(), JsonValue::from(attr.value()));
            }
            name => {
                obj.insert(name.to_owned(), coerce_attribute(name, attr.value()));
            }
        }
    }

    for child in elements(node) {
        match child.tag_name().name() {
            "properties" => {
                obj.insert("properties".into(), properties_to_json(child)?);
            }
            "point" => {
                obj.insert("point".into(), JsonValue::Bool(true));
            }
            "ellipse" => {
                obj.insert("ellipse".into(), JsonValue::Bool(true));
            }
            shape @ ("polygon" | "polyline") => {
                let points = child.attribute("points").ok_or_else(|| {
                    MapError::structural(shape, "required attribute 'points' missing")
                })?;
                obj.insert(shape.to_owned(), points_to_json(points));
            }
            "text" => {
                let mut text = attributes_to_json(child);
                text.insert("text".into(), JsonValue::from(text_content(child)));
                obj.insert("text".into(), JsonValue::Object(text));
            }
            other => debug!("skipping <{other}> in <object>"),
        }
    }
    Ok(obj)
}

/// `"0,0 16,0 16,16"` into `[{x,y}, ...]`. Unparseable lists stay strings so the
/// validation pass can report them.
fn points_to_json(text: &str) -> JsonValue {
    parse_points(text)
        .map(|points| {
            JsonValue::Array(
                points
                    .into_iter()
                    .map(|(x, y)| serde_json::json!({ "x": x, "y": y }))
                    .collect(),
            )
        })
        .unwrap_or_else(|| JsonValue::from(text))
}

fn parse_points(text: &str) -> Option<Vec<(f64, f64)>> {
    let coords = text
        .split(|c: char| c.is_whitespace() || c == ',')
        .filter(|t| !t.is_empty())
        .map(|t| t.parse::<f64>().ok())
        .collect::<Option<Vec<_>>>()?;
    if coords.len() % 2 != 0 {
        return None;
    }
    Some(coords.chunks_exact(2).map(|p| (p[0], p[1])).collect())
}

// ---------------------------------------------------------------------------
// Tilesets
// ---------------------------------------------------------------------------

fn tileset_to_json(node: Node) -> Result<Object, MapError> {
    // External reference: nothing below it belongs to this document.
    if let Some(source) = node.attribute("source") {
        let mut obj = Object::new();
        if let Some(firstgid) = node.attribute("firstgid") {
            obj.insert("firstgid".into(), coerce_attribute("firstgid", firstgid));
        }
        obj.insert("source".into(), JsonValue::from(source));
        return Ok(obj);
    }

    let mut obj = attributes_to_json(node);
    let mut tiles = Vec::new();
    for child in elements(node) {
        match child.tag_name().name() {
            "properties" => {
                obj.insert("properties".into(), properties_to_json(child)?);
            }
            name @ ("tileoffset" | "grid" | "transformations") => {
                obj.insert(name.to_owned(), JsonValue::Object(attributes_to_json(child)));
            }
            "image" => apply_image(child, &mut obj),
            "tile" => tiles.push(JsonValue::Object(tile_to_json(child)?)),
            other => debug!("skipping <{other}> in <tileset>"),
        }
    }

    let name = obj.get("name").and_then(JsonValue::as_str).unwrap_or_default();
    let tilecount = obj.get("tilecount").and_then(JsonValue::as_u64).unwrap_or(0);
    if tilecount == 0 && tiles.is_empty() && !obj.contains_key("image") {
        warn!("tileset '{name}' has no tiles");
    }
    if !tiles.is_empty() {
        obj.insert("tiles".into(), JsonValue::Array(tiles));
    }
    Ok(obj)
}

fn tile_to_json(node: Node) -> Result<Object, MapError> {
    let mut obj = Object::new();
    for attr in node.attributes() {
        match attr.name() {
            "type" | "class" => {
                obj.insert("type".into(), JsonValue::from(attr.value()));
            }
            name => {
                obj.insert(name.to_owned(), coerce_attribute(name, attr.value()));
            }
        }
    }

    for child in elements(node) {
        match child.tag_name().name() {
            "properties" => {
                obj.insert("properties".into(), properties_to_json(child)?);
            }
            "image" => apply_image(child, &mut obj),
            "objectgroup" => {
                obj.insert("objectgroup".into(), JsonValue::Object(object_layer_to_json(child)?));
            }
            "animation" => {
                let frames = elements(child)
                    .filter(|n| n.has_tag_name("frame"))
                    .map(|f| JsonValue::Object(attributes_to_json(f)))
                    .collect();
                obj.insert("animation".into(), JsonValue::Array(frames));
            }
            other => debug!("skipping <{other}> in <tile>"),
        }
    }
    Ok(obj)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{Layer, ObjectShape, PropertyValue, TileData, TilesetRef};

    const SMALL_CSV_MAP: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<map version="1.10" tiledversion="1.10.2" orientation="orthogonal" renderorder="right-down"
     width="2" height="2" tilewidth="16" tileheight="16" infinite="0" nextlayerid="2" nextobjectid="1">
 <tileset firstgid="1" name="tiles" tilewidth="16" tileheight="16" tilecount="2" columns="2">
  <image source="tiles.png" width="32" height="16"/>
 </tileset>
 <layer id="1" name="ground" width="2" height="2">
  <data encoding="csv">
1,0,
2,0
</data>
 </layer>
</map>"#;

    #[test]
    fn csv_layer_and_embedded_tileset() {
        let map = parse_map(SMALL_CSV_MAP).expect("valid map");
        match &map.layers[0] {
            Layer::Tile(layer) => assert_eq!(layer.data, Some(TileData::Gids(vec![1, 0, 2, 0]))),
            other => panic!("expected tile layer, got {other:?}"),
        }
        assert_eq!(map.tilesets[0].firstgid(), Some(1));
        match &map.tilesets[0] {
            TilesetRef::Embedded(ts) => {
                assert_eq!(ts.image.as_deref(), Some("tiles.png"));
                assert_eq!(ts.imagewidth, Some(32));
            }
            other => panic!("expected embedded tileset, got {other:?}"),
        }
    }

    #[test]
    fn parsing_twice_is_byte_identical() {
        let a = serde_json::to_string(&parse_map(SMALL_CSV_MAP).expect("valid")).expect("json");
        let b = serde_json::to_string(&parse_map(SMALL_CSV_MAP).expect("valid")).expect("json");
        assert_eq!(a, b);
    }

    #[test]
    fn bool_property_quirk_is_preserved() {
        let xml = r#"<map orientation="orthogonal" width="1" height="1" tilewidth="8" tileheight="8">
          <properties>
            <property name="zero" type="bool" value="0"/>
            <property name="f" type="bool" value="false"/>
            <property name="no" type="bool" value="no"/>
            <property name="yes" type="bool" value="true"/>
          </properties>
        </map>"#;
        let map = parse_map(xml).expect("valid map");
        assert_eq!(map.properties.get_bool("zero"), Some(false));
        assert_eq!(map.properties.get_bool("f"), Some(false));
        assert_eq!(map.properties.get_bool("no"), Some(true));
        assert_eq!(map.properties.get_bool("yes"), Some(true));
    }

    #[test]
    fn property_value_falls_back_to_text_content() {
        let xml = r#"<map orientation="orthogonal" width="1" height="1" tilewidth="8" tileheight="8">
          <properties>
            <property name="notes">line one
line two</property>
            <property name="count" type="int" value="7"/>
          </properties>
        </map>"#;
        let map = parse_map(xml).expect("valid map");
        assert_eq!(map.properties.get_str("notes"), Some("line one\nline two"));
        assert_eq!(map.properties.get_i64("count"), Some(7));
    }

    #[test]
    fn class_property_collects_members() {
        let xml = r#"<map orientation="orthogonal" width="1" height="1" tilewidth="8" tileheight="8">
          <properties>
            <property name="spawn" type="class" propertytype="Spawn">
              <properties>
                <property name="count" type="int" value="3"/>
                <property name="boss" type="bool" value="1"/>
              </properties>
            </property>
          </properties>
        </map>"#;
        let map = parse_map(xml).expect("valid map");
        match map.properties.get("spawn") {
            Some(PropertyValue::Class(members)) => {
                assert_eq!(members["count"], 3);
                assert_eq!(members["boss"], true);
            }
            other => panic!("expected class property, got {other:?}"),
        }
    }

    #[test]
    fn object_shapes_are_selected_by_child_element() {
        let xml = r#"<map orientation="orthogonal" width="1" height="1" tilewidth="8" tileheight="8">
          <objectgroup id="2" name="things">
            <object id="1" x="0" y="0" width="8" height="8"/>
            <object id="2" x="1" y="2"><point/></object>
            <object id="3" x="0" y="0" width="4" height="4"><ellipse/></object>
            <object id="4" x="0" y="0"><polygon points="0,0 8,0 8,8"/></object>
            <object id="5" x="0" y="0"><polyline points="0,0 4,4"/></object>
            <object id="6" gid="1" x="0" y="8" width="8" height="8"/>
            <object id="7" x="0" y="0" width="32" height="8">
              <text fontfamily="mono" pixelsize="12" wrap="1" halign="center">Hi there</text>
            </object>
          </objectgroup>
        </map>"#;
        let map = parse_map(xml).expect("valid map");
        let layer = map.object_layers().next().expect("object layer");
        let shapes: Vec<&ObjectShape> = layer.objects.iter().map(|o| &o.shape).collect();
        assert!(matches!(shapes[0], ObjectShape::Rectangle));
        assert!(matches!(shapes[1], ObjectShape::Point));
        assert!(matches!(shapes[2], ObjectShape::Ellipse));
        assert!(matches!(shapes[3], ObjectShape::Polygon(p) if p.len() == 3 && p[1].x == 8.0));
        assert!(matches!(shapes[4], ObjectShape::Polyline(p) if p.len() == 2));
        assert!(matches!(shapes[5], ObjectShape::Tile { gid: 1 }));
        match shapes[6] {
            ObjectShape::Text(text) => {
                assert_eq!(text.text, "Hi there");
                assert_eq!(text.pixelsize, 12);
                assert!(text.wrap);
                assert_eq!(text.halign.as_deref(), Some("center"));
            }
            other => panic!("expected text, got {other:?}"),
        }
    }

    #[test]
    fn group_layers_are_flattened_in_place() {
        let xml = r#"<map orientation="orthogonal" width="1" height="1" tilewidth="8" tileheight="8">
          <layer id="1" name="a" width="1" height="1"><data encoding="csv">0</data></layer>
          <group id="2" name="g" opacity="0.5">
            <objectgroup id="3" name="b"/>
            <group id="4" name="inner">
              <imagelayer id="5" name="c"><image source="sky.png" width="64" height="32"/></imagelayer>
            </group>
          </group>
          <layer id="6" name="d" width="1" height="1"><data encoding="csv">0</data></layer>
        </map>"#;
        let map = parse_map(xml).expect("valid map");
        let names: Vec<&str> = map.layers.iter().map(Layer::name).collect();
        assert_eq!(names, ["a", "b", "c", "d"]);
        match &map.layers[2] {
            Layer::Image(img) => {
                assert_eq!(img.image, "sky.png");
                assert_eq!(img.imagewidth, Some(64));
                assert_eq!(img.common.opacity, 1.0);
            }
            other => panic!("expected image layer, got {other:?}"),
        }
    }

    #[test]
    fn infinite_layer_bounding_box_is_chunk_union() {
        let xml = r#"<map orientation="orthogonal" width="10" height="10" tilewidth="8" tileheight="8" infinite="1">
          <layer id="1" name="world" width="10" height="10">
            <data encoding="csv">
              <chunk x="-16" y="0" width="2" height="1">1,0</chunk>
              <chunk x="32" y="-48" width="2" height="2">0,0,0,1</chunk>
              <chunk x="0" y="16" width="1" height="1">1</chunk>
            </data>
          </layer>
        </map>"#;
        let map = parse_map(xml).expect("valid map");
        let layer = map.tile_layers().next().expect("tile layer");
        assert_eq!(layer.startx, Some(-16));
        assert_eq!(layer.starty, Some(-48));
        assert_eq!(layer.width, 34 + 16);
        assert_eq!(layer.height, 17 + 48);
        assert!(layer.data.is_none());
        assert_eq!(layer.chunks.as_ref().map(Vec::len), Some(3));
    }

    #[test]
    fn base64_payload_is_kept_opaque() {
        let xml = r#"<map orientation="orthogonal" width="2" height="1" tilewidth="8" tileheight="8">
          <layer id="1" name="l" width="2" height="1">
            <data encoding="base64" compression="zlib">
              eJxjZGBgAAAACAAC
            </data>
          </layer>
        </map>"#;
        let map = parse_map(xml).expect("valid map");
        let layer = map.tile_layers().next().expect("tile layer");
        assert_eq!(layer.data, Some(TileData::Base64("eJxjZGBgAAAACAAC".into())));
        assert_eq!(layer.compression, Some(crate::document::Compression::Zlib));
    }

    #[test]
    fn xml_tile_elements_become_gids() {
        let xml = r#"<map orientation="orthogonal" width="2" height="1" tilewidth="8" tileheight="8">
          <layer id="1" name="l" width="2" height="1"><data><tile gid="3"/><tile/></data></layer>
        </map>"#;
        let map = parse_map(xml).expect("valid map");
        let layer = map.tile_layers().next().expect("tile layer");
        assert_eq!(layer.data, Some(TileData::Gids(vec![3, 0])));
    }

    #[test]
    fn external_tileset_short_circuits() {
        let xml = r#"<map orientation="orthogonal" width="1" height="1" tilewidth="8" tileheight="8">
          <tileset firstgid="5" source="terrain.tsx"><image source="ignored.png"/></tileset>
        </map>"#;
        let map = parse_map(xml).expect("valid map");
        match &map.tilesets[0] {
            TilesetRef::External(ext) => {
                assert_eq!(ext.firstgid, 5);
                assert_eq!(ext.source, "terrain.tsx");
            }
            other => panic!("expected external tileset, got {other:?}"),
        }
    }

    #[test]
    fn wrong_root_is_structural_error() {
        let err = parse_map("<tileset name='x' tilewidth='8' tileheight='8'/>").unwrap_err();
        assert!(matches!(err, MapError::Structural { ref element, .. } if element == "map"));
    }

    #[test]
    fn malformed_xml_is_syntax_error() {
        let err = parse_map("<map orientation='orthogonal'").unwrap_err();
        assert!(matches!(err, MapError::XmlSyntax(_)));
    }
}
