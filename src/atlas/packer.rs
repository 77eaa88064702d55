// src/atlas/packer.rs
use std::collections::BTreeMap;

use image::{Rgba, RgbaImage};
use log::{debug, info, warn};

use super::{slice_borders, Borders, ExtractedSprite, PackWarning, Rect, SpriteSet};
use crate::error::AtlasError;

/// Duplicated edge pixels around every packed sprite, per side.
pub const BLEED: u32 = 1;

/// Target fill ratio used to pick the starting page width.
const FILL_RATIO: f64 = 0.95;

/// A free region of the page. `h == u32::MAX` is the open-ended column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Space {
    x: u32,
    y: u32,
    w: u32,
    h: u32,
}

/// Free-space list plus the page extent used so far.
///
/// Each placement consumes the state and returns the next one, so a packing
/// run is a fold over the sorted boxes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackState {
    spaces: Vec<Space>,
    width: u32,
    height: u32,
}

impl PackState {
    /// One open-ended column `start_width` wide.
    pub fn new(start_width: u32) -> Self {
        Self {
            spaces: vec![Space { x: 0, y: 0, w: start_width, h: u32::MAX }],
            width: 0,
            height: 0,
        }
    }

    /// Tight page size covering every placed box.
    pub fn extent(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Place a `w` x `h` box in the last space that fits, scanning from the end.
    pub fn place(mut self, w: u32, h: u32) -> (Self, (u32, u32)) {
        let found = (0..self.spaces.len())
            .rev()
            .find(|&i| w <= self.spaces[i].w && h <= self.spaces[i].h);

        let pos = match found {
            Some(i) => {
                let space = self.spaces[i];
                if w == space.w && h == space.h {
                    // Exact fit: swap-remove with the last space.
                    let last = self.spaces.pop();
                    if let (Some(last), true) = (last, i < self.spaces.len()) {
                        self.spaces[i] = last;
                    }
                } else if h == space.h {
                    self.spaces[i].x += w;
                    self.spaces[i].w -= w;
                } else if w == space.w {
                    self.spaces[i].y += h;
                    self.spaces[i].h -= h;
                } else {
                    self.spaces.push(Space {
                        x: space.x + w,
                        y: space.y,
                        w: space.w - w,
                        h,
                    });
                    self.spaces[i].y += h;
                    self.spaces[i].h -= h;
                }
                (space.x, space.y)
            }
            // The open column always fits boxes no wider than the start width.
            None => (0, self.height),
        };

        self.width = self.width.max(pos.0 + w);
        self.height = self.height.max(pos.1 + h);
        (self, pos)
    }
}

/// One packed content sprite.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackedFrame {
    /// `name` or `name#frame`.
    pub key: String,
    /// Sprite name without the frame suffix.
    pub name: String,
    /// Animation frame index, if any.
    pub frame_index: Option<u32>,
    /// Content rectangle on the page, bleed excluded.
    pub frame: Rect,
    /// Trimmed content inside the original sprite.
    pub source_rect: Rect,
    /// Untrimmed sprite width.
    pub source_width: u32,
    /// Untrimmed sprite height.
    pub source_height: u32,
    /// 9-slice borders from the slice companion.
    pub borders: Option<Borders>,
}

impl PackedFrame {
    /// Whether the trim removed anything.
    pub fn trimmed(&self) -> bool {
        self.source_rect != Rect::new(0, 0, self.source_width, self.source_height)
    }

    /// Frame rectangle grown by the bleed border.
    pub fn padded(&self) -> Rect {
        Rect::new(
            self.frame.x - BLEED,
            self.frame.y - BLEED,
            self.frame.w + 2 * BLEED,
            self.frame.h + 2 * BLEED,
        )
    }
}

/// Atlas page and its frames, in sprite input order.
#[derive(Debug, Clone)]
pub struct PackedAtlas {
    /// The page.
    pub image: RgbaImage,
    /// Packed frames.
    pub frames: Vec<PackedFrame>,
    /// Base name to frame keys ordered by frame index; only groups of two or more.
    pub animations: BTreeMap<String, Vec<String>>,
    /// Problems found while adding or packing sprites.
    pub warnings: Vec<PackWarning>,
    /// Producer name for `meta.app`.
    pub app: String,
}

/// Tight bounding box of pixels with non-zero alpha.
pub(crate) fn trim(sprite: &ExtractedSprite) -> Option<Rect> {
    let mut bounds: Option<(u32, u32, u32, u32)> = None;
    for y in 0..sprite.height {
        for x in 0..sprite.width {
            if sprite.pixel(x, y)[3] == 0 {
                continue;
            }
            bounds = Some(match bounds {
                None => (x, y, x, y),
                Some((x0, y0, x1, y1)) => (x0.min(x), y0.min(y), x1.max(x), y1.max(y)),
            });
        }
    }
    bounds.map(|(x0, y0, x1, y1)| Rect::new(x0, y0, x1 - x0 + 1, y1 - y0 + 1))
}

struct PackBox<'a> {
    sprite: &'a ExtractedSprite,
    trim: Rect,
}

impl PackBox<'_> {
    fn w(&self) -> u32 {
        self.trim.w + 2 * BLEED
    }
    fn h(&self) -> u32 {
        self.trim.h + 2 * BLEED
    }
}

/// Trim, pack and bleed every content sprite of `set` onto one page.
pub fn pack(set: &SpriteSet) -> Result<PackedAtlas, AtlasError> {
    if set.content.is_empty() {
        return Err(AtlasError::EmptyInput);
    }
    let mut warnings = set.warnings.clone();

    let mut boxes = Vec::with_capacity(set.content.len());
    for sprite in &set.content {
        match trim(sprite) {
            Some(trim) => boxes.push(PackBox { sprite, trim }),
            None => {
                let warning = PackWarning::EmptySprite { sprite: sprite.key() };
                warn!("{warning}");
                warnings.push(warning);
            }
        }
    }
    if boxes.is_empty() {
        return Err(AtlasError::EmptyInput);
    }

    let area: u64 = boxes.iter().map(|b| u64::from(b.w()) * u64::from(b.h())).sum();
    let widest = boxes.iter().map(PackBox::w).max().unwrap_or(0);
    let start_width = ((area as f64 / FILL_RATIO).sqrt().ceil() as u32).max(widest);

    let mut order: Vec<usize> = (0..boxes.len()).collect();
    order.sort_by(|&a, &b| boxes[b].h().cmp(&boxes[a].h()));

    let mut positions = vec![(0, 0); boxes.len()];
    let state = order.iter().fold(PackState::new(start_width), |state, &i| {
        let (state, pos) = state.place(boxes[i].w(), boxes[i].h());
        positions[i] = pos;
        state
    });
    let (page_w, page_h) = state.extent();

    let mut image = RgbaImage::new(page_w, page_h);
    let mut frames = Vec::with_capacity(boxes.len());
    for (b, &(px, py)) in boxes.iter().zip(&positions) {
        blit_with_bleed(&mut image, b, px, py);

        let key = b.sprite.key();
        let borders = match set.slice_for(b.sprite) {
            Some(slices) => Some(slice_borders(slices, b.trim)?),
            None => {
                if let Some(missing) = &b.sprite.slices {
                    let warning = PackWarning::MissingSlices {
                        sprite: key.clone(),
                        slices: missing.clone(),
                    };
                    warn!("{warning}");
                    warnings.push(warning);
                }
                None
            }
        };
        debug!("packed '{key}' at ({px}, {py}) trim {:?}", b.trim);

        frames.push(PackedFrame {
            key,
            name: b.sprite.name.clone(),
            frame_index: b.sprite.frame,
            frame: Rect::new(px + BLEED, py + BLEED, b.trim.w, b.trim.h),
            source_rect: b.trim,
            source_width: b.sprite.width,
            source_height: b.sprite.height,
            borders,
        });
    }

    let animations = group_animations(&frames);
    info!(
        "packed {} sprites into {page_w}x{page_h} atlas ({} animations, {} warnings)",
        frames.len(),
        animations.len(),
        warnings.len()
    );

    Ok(PackedAtlas {
        image,
        frames,
        animations,
        warnings,
        app: set.app.clone(),
    })
}

/// Copy the trimmed content to `(px, py)` plus the bleed border. Bleed pixels
/// sample the source clamped to the trimmed rectangle.
fn blit_with_bleed(image: &mut RgbaImage, b: &PackBox<'_>, px: u32, py: u32) {
    let trim = b.trim;
    for dy in 0..b.h() {
        let sy = trim.y + dy.saturating_sub(BLEED).min(trim.h - 1);
        for dx in 0..b.w() {
            let sx = trim.x + dx.saturating_sub(BLEED).min(trim.w - 1);
            image.put_pixel(px + dx, py + dy, Rgba(b.sprite.pixel(sx, sy)));
        }
    }
}

fn group_animations(frames: &[PackedFrame]) -> BTreeMap<String, Vec<String>> {
    let mut groups: BTreeMap<&str, Vec<(u32, &str)>> = BTreeMap::new();
    for frame in frames {
        if let Some(index) = frame.frame_index {
            groups
                .entry(frame.name.as_str())
                .or_default()
                .push((index, frame.key.as_str()));
        }
    }
    groups
        .into_iter()
        .filter(|(_, members)| members.len() > 1)
        .map(|(name, mut members)| {
            members.sort_by_key(|&(index, _)| index);
            let keys = members.into_iter().map(|(_, key)| key.to_owned()).collect();
            (name.to_owned(), keys)
        })
        .collect()
}
