// src/atlas/sprite.rs
use std::collections::BTreeMap;
use std::fmt;

use log::{debug, warn};

use crate::config::{PackerConfig, SpriteFilter, SpriteRole};

/// One named RGBA8888 layer, the packer's input unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedSprite {
    /// Layer name; frames of one animation share it.
    pub name: String,
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// Row-major RGBA, `width * height * 4` bytes once added to a [`SpriteSet`].
    pub pixels: Vec<u8>,
    /// Animation frame index, rendered as `name#frame`.
    pub frame: Option<u32>,
    /// Key of the slice sprite that defines this sprite's 9-slice borders.
    pub slices: Option<String>,
}

impl ExtractedSprite {
    /// Sprite without frame index or slice reference.
    pub fn new(name: impl Into<String>, width: u32, height: u32, pixels: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            width,
            height,
            pixels,
            frame: None,
            slices: None,
        }
    }

    /// Mark as animation frame `frame`.
    pub fn with_frame(mut self, frame: u32) -> Self {
        self.frame = Some(frame);
        self
    }

    /// Take 9-slice borders from the slice sprite with key `key`.
    pub fn with_slices(mut self, key: impl Into<String>) -> Self {
        self.slices = Some(key.into());
        self
    }

    /// `name`, or `name#frame` for animation frames.
    pub fn key(&self) -> String {
        match self.frame {
            Some(frame) => format!("{}#{frame}", self.name),
            None => self.name.clone(),
        }
    }

    #[inline]
    pub(crate) fn pixel(&self, x: u32, y: u32) -> [u8; 4] {
        let i = ((y * self.width + x) * 4) as usize;
        [self.pixels[i], self.pixels[i + 1], self.pixels[i + 2], self.pixels[i + 3]]
    }

    fn expected_len(&self) -> usize {
        self.width as usize * self.height as usize * 4
    }
}

/// Recoverable problems found while adding or packing sprites.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PackWarning {
    /// Pixel buffer length did not match `width * height * 4` and was
    /// zero-padded or truncated.
    BufferSize {
        /// Sprite key.
        sprite: String,
        /// `width * height * 4`.
        expected: usize,
        /// Length supplied.
        actual: usize,
    },
    /// Fully transparent sprite, not packed.
    EmptySprite {
        /// Sprite key.
        sprite: String,
    },
    /// A second sprite with an already used key, not packed.
    DuplicateKey {
        /// Sprite key.
        sprite: String,
    },
    /// Explicit slice reference that names no slice sprite.
    MissingSlices {
        /// Sprite key.
        sprite: String,
        /// The unresolved slice key.
        slices: String,
    },
}

impl fmt::Display for PackWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PackWarning::BufferSize { sprite, expected, actual } => write!(
                f,
                "sprite '{sprite}' has {actual} pixel bytes, expected {expected}; resized"
            ),
            PackWarning::EmptySprite { sprite } => {
                write!(f, "sprite '{sprite}' is fully transparent; skipped")
            }
            PackWarning::DuplicateKey { sprite } => {
                write!(f, "sprite key '{sprite}' already added; skipped")
            }
            PackWarning::MissingSlices { sprite, slices } => {
                write!(f, "sprite '{sprite}' references missing slice sprite '{slices}'")
            }
        }
    }
}

/// Sprites accepted for packing, split into content and slice companions.
#[derive(Debug, Clone, Default)]
pub struct SpriteSet {
    pub(crate) filter: SpriteFilter,
    pub(crate) app: String,
    pub(crate) content: Vec<ExtractedSprite>,
    pub(crate) slices: BTreeMap<String, ExtractedSprite>,
    pub(crate) warnings: Vec<PackWarning>,
}

impl SpriteSet {
    /// Empty set using `filter`.
    pub fn new(filter: SpriteFilter) -> Self {
        Self {
            filter,
            app: env!("CARGO_PKG_NAME").to_owned(),
            ..Self::default()
        }
    }

    /// Empty set using the filter and app name from `config`.
    pub fn from_config(config: &PackerConfig) -> Self {
        Self {
            filter: config.filter.clone(),
            app: config.app.clone(),
            ..Self::default()
        }
    }

    /// Filter and store `sprites`. Names are classified by the set's
    /// [`SpriteFilter`]; ignored and default-layer sprites are dropped.
    pub fn add_sprites<I>(mut self, sprites: I) -> Self
    where
        I: IntoIterator<Item = ExtractedSprite>,
    {
        for mut sprite in sprites {
            let key = sprite.key();
            match self.filter.classify(&sprite.name) {
                SpriteRole::Ignored | SpriteRole::DefaultLayer => {
                    debug!("dropping non-content sprite '{key}'");
                    continue;
                }
                SpriteRole::Slice => {
                    self.normalize(&mut sprite);
                    debug!("slice sprite '{key}'");
                    self.slices.insert(key, sprite);
                }
                SpriteRole::Content => {
                    if self.content.iter().any(|s| s.key() == key) {
                        self.warn(PackWarning::DuplicateKey { sprite: key });
                        continue;
                    }
                    self.normalize(&mut sprite);
                    self.content.push(sprite);
                }
            }
        }
        self
    }

    /// Accepted content sprites, in input order.
    pub fn content(&self) -> &[ExtractedSprite] {
        &self.content
    }

    /// Slice companions, by key.
    pub fn slices(&self) -> impl Iterator<Item = &ExtractedSprite> {
        self.slices.values()
    }

    /// Warnings raised so far.
    pub fn warnings(&self) -> &[PackWarning] {
        &self.warnings
    }

    /// Companion slice sprite: the explicit reference if set, otherwise
    /// `name-slices#frame` falling back to `name-slices`.
    pub fn slice_for(&self, sprite: &ExtractedSprite) -> Option<&ExtractedSprite> {
        if let Some(key) = &sprite.slices {
            return self.slices.get(key);
        }
        let base = format!("{}{}", sprite.name, self.filter.slice_suffix);
        sprite
            .frame
            .and_then(|frame| self.slices.get(&format!("{base}#{frame}")))
            .or_else(|| self.slices.get(&base))
    }

    fn normalize(&mut self, sprite: &mut ExtractedSprite) {
        let expected = sprite.expected_len();
        let actual = sprite.pixels.len();
        if actual != expected {
            sprite.pixels.resize(expected, 0);
            self.warn(PackWarning::BufferSize {
                sprite: sprite.key(),
                expected,
                actual,
            });
        }
    }

    pub(crate) fn warn(&mut self, warning: PackWarning) {
        warn!("{warning}");
        self.warnings.push(warning);
    }
}
