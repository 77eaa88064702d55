// src/config.rs
//! Parser and packer options. Every field has a default, so an empty JSON
//! object is a complete config.

use serde::{Deserialize, Serialize};

/// Options for the `parse_*_with` entry points.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParseOptions {
    /// Run the validation pass. When false the raw coerced tree is returned.
    pub strict: bool,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self { strict: true }
    }
}

impl ParseOptions {
    /// Skip validation and return the raw tree.
    pub fn lenient() -> Self {
        Self { strict: false }
    }
}

/// What a sprite name means to the packer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpriteRole {
    /// Packed and emitted as a frame.
    Content,
    /// 9-slice companion; metadata only, never packed.
    Slice,
    /// Hidden layer (reserved prefix).
    Ignored,
    /// Editor default name such as `Layer 1`.
    DefaultLayer,
}

/// Naming rules that decide which extracted layers become frames.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpriteFilter {
    /// Names starting with this are dropped.
    pub ignored_prefix: String,
    /// Names made of this prefix plus optional digits/spaces are dropped.
    pub default_layer_prefix: String,
    /// Names ending with this are slice companions.
    pub slice_suffix: String,
}

impl Default for SpriteFilter {
    fn default() -> Self {
        Self {
            ignored_prefix: "_".to_owned(),
            default_layer_prefix: "Layer".to_owned(),
            slice_suffix: "-slices".to_owned(),
        }
    }
}

impl SpriteFilter {
    /// Role of a sprite called `name` under these rules.
    pub fn classify(&self, name: &str) -> SpriteRole {
        if !self.ignored_prefix.is_empty() && name.starts_with(&self.ignored_prefix) {
            return SpriteRole::Ignored;
        }
        if self.is_default_layer(name) {
            return SpriteRole::DefaultLayer;
        }
        if !self.slice_suffix.is_empty() && name.ends_with(&self.slice_suffix) {
            return SpriteRole::Slice;
        }
        SpriteRole::Content
    }

    fn is_default_layer(&self, name: &str) -> bool {
        if self.default_layer_prefix.is_empty() {
            return false;
        }
        name.strip_prefix(&self.default_layer_prefix)
            .is_some_and(|rest| rest.chars().all(|c| c.is_ascii_digit() || c == ' '))
    }
}

/// Atlas packer settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PackerConfig {
    /// Sprite naming rules.
    pub filter: SpriteFilter,
    /// Written to `meta.app` in the atlas metadata.
    pub app: String,
}

impl Default for PackerConfig {
    fn default() -> Self {
        Self {
            filter: SpriteFilter::default(),
            app: env!("CARGO_PKG_NAME").to_owned(),
        }
    }
}

impl PackerConfig {
    /// Parse a config from JSON; missing fields take their defaults.
    pub fn from_json_str(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }
}
