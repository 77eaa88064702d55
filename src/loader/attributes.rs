// src/loader/attributes.rs
//! Name-based attribute coercion.
//!
//! Tiled XML carries every value as text. Which JSON type an attribute becomes
//! is decided by its name alone: an attribute missing from both tables stays a
//! string even when it looks numeric (`version="1.10"`, `name="42"`).

use roxmltree::Node;
use serde_json::{Map as JsonMap, Number, Value as JsonValue};

pub(crate) const NUMERIC_ATTRIBUTES: &[&str] = &[
    "width",
    "height",
    "x",
    "y",
    "id",
    "firstgid",
    "tilewidth",
    "tileheight",
    "tilecount",
    "columns",
    "spacing",
    "margin",
    "nextlayerid",
    "nextobjectid",
    "hexsidelength",
    "offsetx",
    "offsety",
    "parallaxx",
    "parallaxy",
    "parallaxoriginx",
    "parallaxoriginy",
    "opacity",
    "rotation",
    "gid",
    "tileid",
    "duration",
    "startx",
    "starty",
    "pixelsize",
    "probability",
    "compressionlevel",
];

pub(crate) const BOOLEAN_ATTRIBUTES: &[&str] = &[
    "visible",
    "infinite",
    "locked",
    "wrap",
    "bold",
    "italic",
    "underline",
    "strikeout",
    "kerning",
    "repeatx",
    "repeaty",
    "hflip",
    "vflip",
    "rotate",
    "preferuntransformed",
];

/// `"0"`, `"false"` and the empty string are false; any other text is true,
/// so `"no"` and `"off"` coerce to `true`.
pub(crate) fn coerce_bool(text: &str) -> bool {
    !matches!(text, "" | "0" | "false")
}

/// Integers stay integers, everything else numeric becomes a float. Text that
/// is not a finite number is kept as a string so strict validation reports it.
pub(crate) fn coerce_number(text: &str) -> JsonValue {
    let trimmed = text.trim();
    if let Ok(v) = trimmed.parse::<i64>() {
        return JsonValue::from(v);
    }
    if let Ok(v) = trimmed.parse::<u64>() {
        return JsonValue::from(v);
    }
    trimmed
        .parse::<f64>()
        .ok()
        .and_then(Number::from_f64)
        .map(JsonValue::Number)
        .unwrap_or_else(|| JsonValue::String(text.to_owned()))
}

pub(crate) fn coerce_attribute(name: &str, text: &str) -> JsonValue {
    if NUMERIC_ATTRIBUTES.contains(&name) {
        coerce_number(text)
    } else if BOOLEAN_ATTRIBUTES.contains(&name) {
        JsonValue::Bool(coerce_bool(text))
    } else {
        JsonValue::String(text.to_owned())
    }
}

/// Coerce every attribute of `node` into a JSON object, in document order.
pub(crate) fn attributes_to_json(node: Node) -> JsonMap<String, JsonValue> {
    let mut out = JsonMap::new();
    for attr in node.attributes() {
        out.insert(attr.name().to_owned(), coerce_attribute(attr.name(), attr.value()));
    }
    out
}
