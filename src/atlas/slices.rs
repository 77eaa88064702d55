// src/atlas/slices.rs
//! 9-slice borders from a slice companion sprite.
//!
//! The companion paints each of the nine regions in its own flat colour. The
//! regions are recovered by flood fill and their left/top edges give the cut
//! lines.

use super::{Borders, ExtractedSprite, Rect};
use crate::error::AtlasError;

/// Bounding boxes of the 4-connected regions of identical, non-transparent
/// colour, in scan order of their first pixel.
pub fn slice_regions(sprite: &ExtractedSprite) -> Vec<Rect> {
    let (w, h) = (sprite.width, sprite.height);
    let mut seen = vec![false; w as usize * h as usize];
    let mut regions = Vec::new();
    let mut stack = Vec::new();

    for y in 0..h {
        for x in 0..w {
            let start = (y * w + x) as usize;
            if seen[start] {
                continue;
            }
            seen[start] = true;
            let colour = sprite.pixel(x, y);
            if colour[3] == 0 {
                continue;
            }

            let (mut min_x, mut min_y, mut max_x, mut max_y) = (x, y, x, y);
            stack.push((x, y));
            while let Some((cx, cy)) = stack.pop() {
                min_x = min_x.min(cx);
                min_y = min_y.min(cy);
                max_x = max_x.max(cx);
                max_y = max_y.max(cy);

                let neighbours = [
                    (cx.checked_sub(1), Some(cy)),
                    (Some(cx + 1).filter(|&nx| nx < w), Some(cy)),
                    (Some(cx), cy.checked_sub(1)),
                    (Some(cx), Some(cy + 1).filter(|&ny| ny < h)),
                ];
                for (nx, ny) in neighbours {
                    let (Some(nx), Some(ny)) = (nx, ny) else {
                        continue;
                    };
                    let i = (ny * w + nx) as usize;
                    if !seen[i] && sprite.pixel(nx, ny) == colour {
                        seen[i] = true;
                        stack.push((nx, ny));
                    }
                }
            }
            regions.push(Rect::new(min_x, min_y, max_x - min_x + 1, max_y - min_y + 1));
        }
    }
    regions
}

/// Border widths for a content sprite trimmed to `trim`. Only the 3x3 grid is
/// supported.
pub fn slice_borders(slices: &ExtractedSprite, trim: Rect) -> Result<Borders, AtlasError> {
    let regions = slice_regions(slices);
    let mut xs: Vec<u32> = regions.iter().map(|r| r.x).collect();
    let mut ys: Vec<u32> = regions.iter().map(|r| r.y).collect();
    xs.sort_unstable();
    xs.dedup();
    ys.sort_unstable();
    ys.dedup();

    if xs.len() != 3 || ys.len() != 3 {
        return Err(AtlasError::UnsupportedSliceGrid {
            sprite: slices.key(),
            columns: xs.len(),
            rows: ys.len(),
        });
    }

    Ok(Borders {
        left: xs[1].saturating_sub(trim.x),
        top: ys[1].saturating_sub(trim.y),
        right: trim.right().saturating_sub(xs[2]),
        bottom: trim.bottom().saturating_sub(ys[2]),
    })
}
