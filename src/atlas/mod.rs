// src/atlas/mod.rs
//! Texture atlas packing: trimmed, bled sprites on one page plus frame metadata.

mod metadata;
mod packer;
mod slices;
mod sprite;

use serde::{Deserialize, Serialize};

pub use metadata::{AtlasMeta, AtlasMetadata, FrameEntry};
pub use packer::{pack, PackState, PackedAtlas, PackedFrame, BLEED};
pub use slices::{slice_borders, slice_regions};
pub use sprite::{ExtractedSprite, PackWarning, SpriteSet};

/// Pixel rectangle. Also the `frame` / `spriteSourceSize` shape in atlas JSON.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Rect {
    /// Left edge.
    pub x: u32,
    /// Top edge.
    pub y: u32,
    /// Width.
    pub w: u32,
    /// Height.
    pub h: u32,
}

impl Rect {
    /// Rectangle at `(x, y)` of size `w` x `h`.
    pub fn new(x: u32, y: u32, w: u32, h: u32) -> Self {
        Self { x, y, w, h }
    }

    /// Exclusive right edge.
    #[inline]
    pub fn right(&self) -> u32 {
        self.x + self.w
    }

    /// Exclusive bottom edge.
    #[inline]
    pub fn bottom(&self) -> u32 {
        self.y + self.h
    }

    /// True when the two rectangles share at least one pixel.
    pub fn intersects(&self, other: &Rect) -> bool {
        self.x < other.right() && other.x < self.right() && self.y < other.bottom() && other.y < self.bottom()
    }
}

/// Width and height in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Size {
    /// Width.
    pub w: u32,
    /// Height.
    pub h: u32,
}

/// 9-slice border widths, relative to the trimmed frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Borders {
    /// Left border width.
    pub left: u32,
    /// Top border height.
    pub top: u32,
    /// Right border width.
    pub right: u32,
    /// Bottom border height.
    pub bottom: u32,
}
