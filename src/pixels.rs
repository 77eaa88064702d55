// src/pixels.rs
//! Pixel helpers that turn tilesets and layered frames into packer sprites.

use image::{imageops, Pixel, Rgba, RgbaImage};
use log::warn;

use crate::atlas::ExtractedSprite;
use crate::document::Tileset;
use crate::gid::Gid;

/// Straight-alpha "over": `src`, faded by `opacity`, drawn onto `dst`.
pub fn blend_over(dst: &mut Rgba<u8>, src: Rgba<u8>, opacity: f32) {
    let alpha = (f32::from(src[3]) * opacity.clamp(0.0, 1.0)).round() as u8;
    if alpha == 0 {
        return;
    }
    let mut faded = src;
    faded[3] = alpha;
    dst.blend(&faded);
}

/// Grid layout of a tileset image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TileGeometry {
    /// Tile width in pixels.
    pub tile_width: u32,
    /// Tile height in pixels.
    pub tile_height: u32,
    /// Tiles per row.
    pub columns: u32,
    /// Pixels between tiles.
    pub spacing: u32,
    /// Pixels around the tiles.
    pub margin: u32,
}

impl TileGeometry {
    /// Geometry of `tileset`'s image grid.
    pub fn from_tileset(tileset: &Tileset) -> Self {
        Self {
            tile_width: tileset.tilewidth,
            tile_height: tileset.tileheight,
            columns: tileset.columns,
            spacing: tileset.spacing,
            margin: tileset.margin,
        }
    }

    /// Top-left pixel of `local_id` in the tileset image. `None` without
    /// columns or when the position does not fit in `u32`.
    pub fn source_origin(&self, local_id: u32) -> Option<(u32, u32)> {
        if self.columns == 0 {
            return None;
        }
        let (col, row) = (local_id % self.columns, local_id / self.columns);
        let step_x = self.tile_width.checked_add(self.spacing)?;
        let step_y = self.tile_height.checked_add(self.spacing)?;
        Some((
            col.checked_mul(step_x)?.checked_add(self.margin)?,
            row.checked_mul(step_y)?.checked_add(self.margin)?,
        ))
    }
}

/// Copy one tile out of a tileset image. `None` when the tile lies outside it.
pub fn extract_tile(image: &RgbaImage, geometry: &TileGeometry, local_id: u32) -> Option<RgbaImage> {
    let (sx, sy) = geometry.source_origin(local_id)?;
    let (w, h) = (geometry.tile_width, geometry.tile_height);
    let inside = |start: u32, len: u32, limit: u32| start.checked_add(len).is_some_and(|end| end <= limit);
    if !inside(sx, w, image.width()) || !inside(sy, h, image.height()) {
        return None;
    }
    Some(imageops::crop_imm(image, sx, sy, w, h).to_image())
}

/// Apply the GID's flip flags: diagonal first, then horizontal, then vertical.
pub fn transform_tile(tile: &RgbaImage, gid: Gid) -> RgbaImage {
    let mut out = if gid.flip_d() {
        // Transpose.
        imageops::flip_horizontal(&imageops::rotate90(tile))
    } else {
        tile.clone()
    };
    if gid.flip_h() {
        imageops::flip_horizontal_in_place(&mut out);
    }
    if gid.flip_v() {
        imageops::flip_vertical_in_place(&mut out);
    }
    out
}

/// One layer's image within a frame, placed at `(x, y)`.
#[derive(Debug, Clone, Copy)]
pub struct Cel<'a> {
    /// Left edge on the canvas, may be negative.
    pub x: i32,
    /// Top edge on the canvas, may be negative.
    pub y: i32,
    /// 0.0 to 1.0.
    pub opacity: f32,
    /// Layer pixels.
    pub image: &'a RgbaImage,
}

/// Flatten `cels`, bottom first, onto a transparent canvas. Pixels falling
/// outside the canvas are clipped.
pub fn composite_cels(width: u32, height: u32, cels: &[Cel<'_>]) -> RgbaImage {
    let mut canvas = RgbaImage::new(width, height);
    for cel in cels {
        for (px, py, src) in cel.image.enumerate_pixels() {
            let (Ok(x), Ok(y)) = (
                u32::try_from(cel.x + px as i32),
                u32::try_from(cel.y + py as i32),
            ) else {
                continue;
            };
            if x < width && y < height {
                blend_over(canvas.get_pixel_mut(x, y), *src, cel.opacity);
            }
        }
    }
    canvas
}

/// Draw a tilemap cel: `gids` is row-major, `columns` wide. GID 0 is empty and
/// other GIDs are 1-based indices into `tileset`, flip flags included.
pub fn render_tilemap_cel(
    tileset: &RgbaImage,
    geometry: &TileGeometry,
    gids: &[u32],
    columns: u32,
) -> RgbaImage {
    if columns == 0 {
        return RgbaImage::new(0, 0);
    }
    let rows = (gids.len() as u32).div_ceil(columns);
    let (tw, th) = (geometry.tile_width, geometry.tile_height);
    let (Some(width), Some(height)) = (columns.checked_mul(tw), rows.checked_mul(th)) else {
        warn!("tilemap cel of {columns}x{rows} tiles is too large");
        return RgbaImage::new(0, 0);
    };
    let mut canvas = RgbaImage::new(width, height);

    for (i, &raw) in gids.iter().enumerate() {
        let gid = Gid(raw);
        if gid.is_empty() {
            continue;
        }
        let Some(tile) = extract_tile(tileset, geometry, gid.id() - 1) else {
            warn!("tilemap tile {} is outside the tileset image", gid.id());
            continue;
        };
        let tile = transform_tile(&tile, gid);
        let (col, row) = (i as u32 % columns, i as u32 / columns);
        imageops::overlay(&mut canvas, &tile, i64::from(col) * i64::from(tw), i64::from(row) * i64::from(th));
    }
    canvas
}

/// Wrap a flattened frame as packer input.
pub fn sprite_from_image(name: &str, frame: Option<u32>, image: RgbaImage) -> ExtractedSprite {
    let (w, h) = image.dimensions();
    let sprite = ExtractedSprite::new(name, w, h, image.into_raw());
    match frame {
        Some(frame) => sprite.with_frame(frame),
        None => sprite,
    }
}
