#![warn(missing_docs)]

//! Build-time Tiled toolchain: TMX/TSX/TX to Tiled JSON, plus a texture atlas
//! packer with trim, bleed, 9-slice borders and animation groups.

mod config;
pub mod document;
mod error;
mod loader {
    pub mod attributes;
    pub mod tmx_loader;
}
mod validate;

pub mod atlas;
pub mod gid;
pub mod pipeline;
pub mod pixels;

pub use atlas::{pack, AtlasMetadata, ExtractedSprite, PackedAtlas, SpriteSet};
pub use config::{PackerConfig, ParseOptions, SpriteFilter, SpriteRole};
pub use document::{
    Layer, ObjectShape, Parsed, Properties, PropertyValue, TemplateDocument, TiledMap, TiledObject,
    Tileset, TilesetDocument, TilesetRef,
};
pub use error::{AtlasError, MapError};
pub use gid::{Gid, TilesetIndex};
pub use loader::tmx_loader::{
    parse_external_template, parse_external_template_with, parse_external_tileset,
    parse_external_tileset_with, parse_map, parse_map_with,
};
