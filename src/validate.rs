// src/validate.rs
//! Strict validation pass: raw JSON tree in, typed document out.
//!
//! Elements are checked bottom-up so a failure names the innermost offending
//! element (`layers[2] 'ground' objects[0]`) and carries its raw form.

use log::debug;
use serde::de::DeserializeOwned;
use serde_json::Value as JsonValue;

use crate::document::{
    ExternalTilesetRef, Layer, TemplateDocument, Tile, TiledMap, TiledObject, Tileset,
    TilesetDocument,
};
use crate::error::MapError;

pub(crate) fn validate_map(raw: JsonValue) -> Result<TiledMap, MapError> {
    let infinite = raw.get("infinite").and_then(JsonValue::as_bool).unwrap_or(false);

    for (i, layer) in array(&raw, "layers").iter().enumerate() {
        let context = format!("layers[{i}] '{}'", name_of(layer));
        validate_layer(layer, infinite, &context)?;
    }
    for (k, tileset) in array(&raw, "tilesets").iter().enumerate() {
        let context = format!("tilesets[{k}] '{}'", name_of(tileset));
        if tileset.get("source").is_some() {
            typed::<ExternalTilesetRef>(tileset, &context)?;
            continue;
        }
        if tileset.get("firstgid").is_none() {
            return Err(MapError::schema(context, "embedded tileset requires 'firstgid'", tileset));
        }
        validate_tileset(tileset, &context)?;
        typed::<Tileset>(tileset, &context)?;
    }

    let map: TiledMap = typed(&raw, "map")?;
    debug!("validated map with {} layers", map.layers.len());
    Ok(map)
}

pub(crate) fn validate_tileset_document(raw: JsonValue) -> Result<TilesetDocument, MapError> {
    let context = format!("tileset '{}'", name_of(&raw));
    validate_tileset(&raw, &context)?;
    typed(&raw, &context)
}

pub(crate) fn validate_template(raw: JsonValue) -> Result<TemplateDocument, MapError> {
    if let Some(tileset) = raw.get("tileset") {
        typed::<ExternalTilesetRef>(tileset, "template tileset")?;
    }
    if let Some(object) = raw.get("object") {
        typed::<TiledObject>(object, "template object")?;
    }
    typed(&raw, "template")
}

fn validate_layer(layer: &JsonValue, infinite: bool, context: &str) -> Result<(), MapError> {
    match layer.get("type").and_then(JsonValue::as_str) {
        Some("tilelayer") => validate_tile_layer(layer, infinite, context)?,
        Some("objectgroup") => validate_objects(layer, context)?,
        _ => {}
    }
    typed::<Layer>(layer, context).map(drop)
}

fn validate_tile_layer(layer: &JsonValue, infinite: bool, context: &str) -> Result<(), MapError> {
    let name = name_of(layer);
    let (data, chunks) = (layer.get("data"), layer.get("chunks"));
    match (data, chunks) {
        (Some(_), Some(_)) => {
            return Err(MapError::structural(
                "layer",
                format!("tile layer '{name}' has both data and chunks"),
            ))
        }
        (None, None) => {
            return Err(MapError::structural(
                "layer",
                format!("tile layer '{name}' has neither data nor chunks"),
            ))
        }
        (Some(_), None) if infinite => {
            return Err(MapError::structural(
                "layer",
                format!("tile layer '{name}' has data on an infinite map"),
            ))
        }
        (None, Some(_)) if !infinite => {
            return Err(MapError::structural(
                "layer",
                format!("tile layer '{name}' has chunks on a finite map"),
            ))
        }
        _ => {}
    }

    if data.is_some() {
        check_gid_count(layer, context)?;
    }
    for (c, chunk) in array(layer, "chunks").iter().enumerate() {
        check_gid_count(chunk, &format!("{context} chunks[{c}]"))?;
    }
    Ok(())
}

/// GID arrays must fill `width * height` exactly. Base64 payloads are opaque
/// here and checked when decoded.
fn check_gid_count(owner: &JsonValue, context: &str) -> Result<(), MapError> {
    let Some(gids) = owner.get("data").and_then(JsonValue::as_array) else {
        return Ok(());
    };
    let width = owner.get("width").and_then(JsonValue::as_u64).unwrap_or(0);
    let height = owner.get("height").and_then(JsonValue::as_u64).unwrap_or(0);
    let expected = width * height;
    if gids.len() as u64 != expected {
        return Err(MapError::schema(
            context,
            format!("expected {expected} gids for {width}x{height}, found {}", gids.len()),
            owner,
        ));
    }
    Ok(())
}

fn validate_objects(layer: &JsonValue, context: &str) -> Result<(), MapError> {
    for (j, object) in array(layer, "objects").iter().enumerate() {
        typed::<TiledObject>(object, &format!("{context} objects[{j}]"))?;
    }
    Ok(())
}

fn validate_tileset(tileset: &JsonValue, context: &str) -> Result<(), MapError> {
    let tiles = array(tileset, "tiles");
    let has_image = tileset.get("image").is_some();
    let per_tile_image = tiles.iter().any(|t| t.get("image").is_some());
    if has_image && per_tile_image {
        return Err(MapError::schema(
            context,
            "tileset has both a single image and per-tile images",
            tileset,
        ));
    }

    for (t, tile) in tiles.iter().enumerate() {
        let tile_context = format!("{context} tiles[{t}]");
        if let Some(group) = tile.get("objectgroup") {
            validate_objects(group, &format!("{tile_context} objectgroup"))?;
        }
        typed::<Tile>(tile, &tile_context)?;
    }
    Ok(())
}

fn typed<T: DeserializeOwned>(raw: &JsonValue, context: &str) -> Result<T, MapError> {
    T::deserialize(raw).map_err(|e| MapError::schema(context, e.to_string(), raw))
}

fn array<'a>(owner: &'a JsonValue, key: &str) -> &'a [JsonValue] {
    owner
        .get(key)
        .and_then(JsonValue::as_array)
        .map(Vec::as_slice)
        .unwrap_or_default()
}

fn name_of(value: &JsonValue) -> &str {
    value.get("name").and_then(JsonValue::as_str).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn map_with(layer: JsonValue, infinite: bool) -> JsonValue {
        json!({
            "type": "map",
            "orientation": "orthogonal",
            "width": 2, "height": 1, "tilewidth": 8, "tileheight": 8,
            "infinite": infinite,
            "layers": [layer],
            "tilesets": []
        })
    }

    #[test]
    fn both_data_and_chunks_is_structural() {
        let layer = json!({
            "type": "tilelayer", "name": "l", "width": 2, "height": 1,
            "data": [0, 0],
            "chunks": []
        });
        let err = validate_map(map_with(layer, false)).unwrap_err();
        assert!(matches!(err, MapError::Structural { ref message, .. } if message.contains("both")));
    }

    #[test]
    fn neither_data_nor_chunks_is_structural() {
        let layer = json!({"type": "tilelayer", "name": "l", "width": 2, "height": 1});
        let err = validate_map(map_with(layer, false)).unwrap_err();
        assert!(matches!(err, MapError::Structural { ref message, .. } if message.contains("neither")));
    }

    #[test]
    fn chunks_on_finite_map_is_structural() {
        let layer = json!({"type": "tilelayer", "name": "l", "width": 2, "height": 1, "chunks": []});
        let err = validate_map(map_with(layer, false)).unwrap_err();
        assert!(matches!(err, MapError::Structural { .. }));
    }

    #[test]
    fn short_gid_array_names_the_layer() {
        let layer = json!({"type": "tilelayer", "name": "ground", "width": 2, "height": 1, "data": [1]});
        match validate_map(map_with(layer, false)).unwrap_err() {
            MapError::SchemaValidation { context, raw, .. } => {
                assert_eq!(context, "layers[0] 'ground'");
                assert_eq!(raw["name"], "ground");
            }
            other => panic!("expected schema error, got {other:?}"),
        }
    }

    #[test]
    fn bad_object_reports_its_index() {
        let layer = json!({
            "type": "objectgroup", "name": "things",
            "objects": [{"id": 1}, {"id": 2, "polygon": "0,0 nope"}]
        });
        match validate_map(map_with(layer, false)).unwrap_err() {
            MapError::SchemaValidation { context, .. } => {
                assert_eq!(context, "layers[0] 'things' objects[1]")
            }
            other => panic!("expected schema error, got {other:?}"),
        }
    }

    #[test]
    fn uncoerced_number_fails_validation() {
        let mut raw = map_with(json!({"type": "imagelayer", "name": "bg", "image": "a.png"}), false);
        raw["tilewidth"] = json!("wide");
        match validate_map(raw).unwrap_err() {
            MapError::SchemaValidation { context, .. } => assert_eq!(context, "map"),
            other => panic!("expected schema error, got {other:?}"),
        }
    }

    #[test]
    fn embedded_tileset_needs_firstgid() {
        let mut raw = map_with(json!({"type": "imagelayer", "name": "bg", "image": "a.png"}), false);
        raw["tilesets"] = json!([{"name": "t", "tilewidth": 8, "tileheight": 8}]);
        let err = validate_map(raw).unwrap_err();
        assert!(matches!(err, MapError::SchemaValidation { ref message, .. } if message.contains("firstgid")));
    }

    #[test]
    fn bad_embedded_tileset_field_names_the_tileset() {
        let mut raw = map_with(json!({"type": "imagelayer", "name": "bg", "image": "a.png"}), false);
        raw["tilesets"] = json!([{"firstgid": 1, "name": "a", "tilewidth": "eight", "tileheight": 8}]);
        match validate_map(raw).unwrap_err() {
            MapError::SchemaValidation { context, raw, .. } => {
                assert_eq!(context, "tilesets[0] 'a'");
                assert_eq!(raw["tilewidth"], "eight");
                assert!(raw.get("layers").is_none());
            }
            other => panic!("expected schema error, got {other:?}"),
        }
    }

    #[test]
    fn tileset_image_and_tile_images_are_exclusive() {
        let raw = json!({
            "type": "tileset", "name": "mixed", "tilewidth": 8, "tileheight": 8,
            "image": "sheet.png",
            "tiles": [{"id": 0, "image": "one.png"}]
        });
        let err = validate_tileset_document(raw).unwrap_err();
        assert!(matches!(err, MapError::SchemaValidation { ref message, .. } if message.contains("per-tile")));
    }

    #[test]
    fn template_object_is_validated() {
        let raw = json!({"type": "template", "object": {"id": 1, "point": true, "ellipse": true}});
        match validate_template(raw).unwrap_err() {
            MapError::SchemaValidation { context, .. } => assert_eq!(context, "template object"),
            other => panic!("expected schema error, got {other:?}"),
        }
    }
}
