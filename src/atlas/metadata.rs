// src/atlas/metadata.rs
//! Sprite-atlas JSON (`frames` / `animations` / `meta`).

use std::collections::BTreeMap;
use std::io::Cursor;

use image::ImageFormat;
use serde::{Deserialize, Serialize};

use super::{Borders, PackedAtlas, Rect, Size};
use crate::error::AtlasError;

/// One entry of the `frames` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FrameEntry {
    /// Content rectangle on the page.
    pub frame: Rect,
    /// Always false; the packer never rotates.
    pub rotated: bool,
    /// Whether transparent edges were cut away.
    pub trimmed: bool,
    /// Trimmed content within the original sprite.
    pub sprite_source_size: Rect,
    /// Untrimmed sprite size.
    pub source_size: Size,
    /// 9-slice borders, when the sprite has a slice companion.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub borders: Option<Borders>,
}

/// The `meta` block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AtlasMeta {
    /// Producer name.
    pub app: String,
    /// Producer version.
    pub version: String,
    /// Page image path as given to `build_metadata`.
    pub image: String,
    /// Always `RGBA8888`.
    pub format: String,
    /// Page size in pixels.
    pub size: Size,
    /// Always `"1"`.
    pub scale: String,
}

/// Atlas metadata document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AtlasMetadata {
    /// Frames by key.
    pub frames: BTreeMap<String, FrameEntry>,
    /// Animation name to frame keys.
    pub animations: BTreeMap<String, Vec<String>>,
    /// Producer and page information.
    pub meta: AtlasMeta,
}

impl AtlasMetadata {
    /// Pretty-printed JSON.
    pub fn to_json_string(&self) -> Result<String, AtlasError> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

impl PackedAtlas {
    /// Frame lookup document for this page, referring to it as `image_path`.
    pub fn build_metadata(&self, image_path: &str) -> AtlasMetadata {
        let frames = self
            .frames
            .iter()
            .map(|f| {
                let entry = FrameEntry {
                    frame: f.frame,
                    rotated: false,
                    trimmed: f.trimmed(),
                    sprite_source_size: f.source_rect,
                    source_size: Size { w: f.source_width, h: f.source_height },
                    borders: f.borders,
                };
                (f.key.clone(), entry)
            })
            .collect();

        AtlasMetadata {
            frames,
            animations: self.animations.clone(),
            meta: AtlasMeta {
                app: self.app.clone(),
                version: env!("CARGO_PKG_VERSION").to_owned(),
                image: image_path.to_owned(),
                format: "RGBA8888".to_owned(),
                size: Size { w: self.image.width(), h: self.image.height() },
                scale: "1".to_owned(),
            },
        }
    }

    /// The page as PNG bytes.
    pub fn encode_png(&self) -> Result<Vec<u8>, AtlasError> {
        let mut out = Cursor::new(Vec::new());
        self.image.write_to(&mut out, ImageFormat::Png)?;
        Ok(out.into_inner())
    }
}
