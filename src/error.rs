use std::path::PathBuf;

use serde_json::Value as JsonValue;
use thiserror::Error;

/// Errors produced while parsing Tiled XML documents and resolving GIDs.
#[derive(Debug, Error)]
pub enum MapError {
    /// The input text is not well-formed XML.
    #[error("malformed XML: {0}")]
    XmlSyntax(#[from] roxmltree::Error),

    /// A required element or attribute is absent, or two are contradictory.
    #[error("<{element}>: {message}")]
    Structural {
        /// Tag name of the element the problem was found on.
        element: String,
        /// What is missing or contradictory.
        message: String,
    },

    /// A value is present but does not fit the target schema after coercion.
    #[error("schema validation failed for {context}: {message}")]
    SchemaValidation {
        /// Path-like description of the offending element, e.g. `layers[2] 'ground'`.
        context: String,
        /// Validator message.
        message: String,
        /// The raw, coerced element that failed validation.
        raw: Box<JsonValue>,
    },

    /// A tile layer references a GID no tileset owns.
    #[error("tile gid {gid} in layer '{layer}' is not covered by any tileset")]
    InvalidTileGid {
        /// Layer name.
        layer: String,
        /// GID with flip flags masked off.
        gid: u32,
    },

    /// A tile object references a GID no tileset owns.
    #[error("object {object_id:?} in layer '{layer}' uses gid {gid} which is not covered by any tileset")]
    InvalidObjectGid {
        /// Layer name.
        layer: String,
        /// Object id, if the object has one.
        object_id: Option<u32>,
        /// GID with flip flags masked off.
        gid: u32,
    },

    /// Base64 tile data could not be decoded or decompressed.
    #[error("tile data: {0}")]
    TileData(String),

    /// File I/O error.
    #[error("I/O error on {path}: {source}")]
    Io {
        /// File that failed.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// JSON (de)serialization error outside the validation pass.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl MapError {
    pub(crate) fn structural(element: &str, message: impl Into<String>) -> Self {
        MapError::Structural {
            element: element.to_owned(),
            message: message.into(),
        }
    }

    pub(crate) fn schema(context: impl Into<String>, message: impl Into<String>, raw: &JsonValue) -> Self {
        MapError::SchemaValidation {
            context: context.into(),
            message: message.into(),
            raw: Box::new(raw.clone()),
        }
    }
}

/// Errors produced by the atlas packer.
#[derive(Debug, Error)]
pub enum AtlasError {
    /// No content sprites were added before packing.
    #[error("no sprites to pack")]
    EmptyInput,

    /// A slice companion does not decompose into a 3x3 grid.
    #[error("slice sprite '{sprite}' must form a 3x3 grid, found {columns}x{rows}")]
    UnsupportedSliceGrid {
        /// Frame key of the slice sprite.
        sprite: String,
        /// Distinct column edges found.
        columns: usize,
        /// Distinct row edges found.
        rows: usize,
    },

    /// PNG encoding failed.
    #[error("image error: {0}")]
    Image(#[from] image::ImageError),

    /// Metadata serialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
