// src/gid.rs
//! Global tile ids: flag bits, tile data decoding and tileset range lookup.

use std::io::Read;

use base64::{engine::general_purpose::STANDARD, Engine as _};
use log::{debug, warn};

use crate::document::{Compression, Layer, ObjectShape, TileData, TileLayer, TiledMap, Tileset, TilesetRef};
use crate::error::MapError;

/// Horizontal flip flag.
pub const FLIP_H: u32 = 0x8000_0000;
/// Vertical flip flag.
pub const FLIP_V: u32 = 0x4000_0000;
/// Diagonal (anti-transpose) flip flag.
pub const FLIP_D: u32 = 0x2000_0000;
/// Hexagonal 120 degree rotation flag.
pub const ROTATE_HEX_120: u32 = 0x1000_0000;
/// Bits left for the tile id.
pub const GID_MASK: u32 = 0x0FFF_FFFF;

/// A GID as stored in tile data, flags included.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Gid(pub u32);

impl Gid {
    /// Stored value, flags included.
    #[inline] pub fn raw(self) -> u32 { self.0 }
    /// Tile id with flags masked off.
    #[inline] pub fn id(self) -> u32 { self.0 & GID_MASK }
    /// Flipped horizontally.
    #[inline] pub fn flip_h(self) -> bool { (self.0 & FLIP_H) != 0 }
    /// Flipped vertically.
    #[inline] pub fn flip_v(self) -> bool { (self.0 & FLIP_V) != 0 }
    /// Flipped diagonally.
    #[inline] pub fn flip_d(self) -> bool { (self.0 & FLIP_D) != 0 }
    /// Rotated 120 degrees (hexagonal maps).
    #[inline] pub fn rotate_hex_120(self) -> bool { (self.0 & ROTATE_HEX_120) != 0 }
    /// No tile.
    #[inline] pub fn is_empty(self) -> bool { self.id() == 0 }
}

impl TileData {
    /// Decode into raw GIDs (flags kept). `compression` only applies to base64.
    pub fn gids(&self, compression: Option<Compression>) -> Result<Vec<u32>, MapError> {
        let payload = match self {
            TileData::Gids(gids) => return Ok(gids.clone()),
            TileData::Base64(payload) => payload,
        };

        let bytes = STANDARD
            .decode(payload.trim())
            .map_err(|e| MapError::TileData(format!("invalid base64: {e}")))?;
        let bytes = match compression {
            None => bytes,
            Some(Compression::Zlib) => inflate(libflate::zlib::Decoder::new(&bytes[..]), "zlib")?,
            Some(Compression::Gzip) => inflate(libflate::gzip::Decoder::new(&bytes[..]), "gzip")?,
            Some(Compression::Zstandard) => zstd::decode_all(&bytes[..])
                .map_err(|e| MapError::TileData(format!("zstd stream: {e}")))?,
        };

        if bytes.len() % 4 != 0 {
            return Err(MapError::TileData(format!(
                "decoded tile data is {} bytes, not a multiple of 4",
                bytes.len()
            )));
        }
        Ok(bytes
            .chunks_exact(4)
            .map(|b| u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
            .collect())
    }
}

fn inflate<R: Read>(decoder: std::io::Result<R>, name: &str) -> Result<Vec<u8>, MapError> {
    let mut out = Vec::new();
    decoder
        .and_then(|mut d| d.read_to_end(&mut out))
        .map_err(|e| MapError::TileData(format!("{name} stream: {e}")))?;
    Ok(out)
}

impl TileLayer {
    /// Every GID of the layer: `data`, or all chunks in order.
    pub fn all_gids(&self) -> Result<Vec<u32>, MapError> {
        if let Some(data) = &self.data {
            return data.gids(self.compression);
        }
        let mut out = Vec::new();
        for chunk in self.chunks.iter().flatten() {
            out.extend(chunk.data.gids(self.compression)?);
        }
        Ok(out)
    }
}

/// One tileset with its GID range `[firstgid, firstgid + tilecount)`.
#[derive(Debug, Clone)]
pub struct TilesetEntry {
    /// First owned GID.
    pub firstgid: u32,
    /// The resolved tileset.
    pub tileset: Tileset,
}

impl TilesetEntry {
    /// One past the last owned GID. Saturates; [`TilesetIndex::build`]
    /// rejects ranges that would overflow.
    #[inline]
    pub fn end(&self) -> u32 {
        self.firstgid.saturating_add(self.tileset.tilecount)
    }
}

/// Range-containment lookup from GID to owning tileset.
#[derive(Debug, Clone, Default)]
pub struct TilesetIndex {
    entries: Vec<TilesetEntry>, // sorted by firstgid, non-overlapping
}

impl TilesetIndex {
    /// External tilesets go through `resolve(source)`; embedded ones are used
    /// as-is. Tilesets with no tiles own no GIDs and are left out.
    pub fn build<F>(map: &TiledMap, mut resolve: F) -> Result<Self, MapError>
    where
        F: FnMut(&str) -> Result<Tileset, MapError>,
    {
        let mut entries = Vec::with_capacity(map.tilesets.len());
        for tileset in &map.tilesets {
            let entry = match tileset {
                TilesetRef::External(ext) => TilesetEntry {
                    firstgid: ext.firstgid,
                    tileset: resolve(&ext.source)?,
                },
                TilesetRef::Embedded(ts) => TilesetEntry {
                    firstgid: ts.firstgid.unwrap_or(1),
                    tileset: ts.clone(),
                },
            };
            if entry.tileset.tilecount == 0 {
                warn!("tileset '{}' has no tiles, it owns no gids", entry.tileset.name);
                continue;
            }
            if entry.firstgid.checked_add(entry.tileset.tilecount).is_none() {
                return Err(MapError::structural(
                    "tileset",
                    format!(
                        "tileset '{}' range {} + {} overflows the gid space",
                        entry.tileset.name, entry.firstgid, entry.tileset.tilecount
                    ),
                ));
            }
            entries.push(entry);
        }

        entries.sort_by_key(|e| e.firstgid);
        for pair in entries.windows(2) {
            if pair[0].end() > pair[1].firstgid {
                return Err(MapError::structural(
                    "tileset",
                    format!(
                        "tileset '{}' [{}, {}) overlaps '{}' starting at {}",
                        pair[0].tileset.name,
                        pair[0].firstgid,
                        pair[0].end(),
                        pair[1].tileset.name,
                        pair[1].firstgid
                    ),
                ));
            }
        }
        debug!("tileset index built with {} ranges", entries.len());
        Ok(Self { entries })
    }

    /// Ranges sorted by first GID.
    pub fn entries(&self) -> &[TilesetEntry] {
        &self.entries
    }

    /// Owning tileset and local tile id. Flags are ignored; GID 0 is never owned.
    pub fn lookup(&self, gid: Gid) -> Option<(&TilesetEntry, u32)> {
        let id = gid.id();
        if id == 0 {
            return None;
        }
        let idx = self.entries.partition_point(|e| e.firstgid <= id);
        let entry = self.entries.get(idx.checked_sub(1)?)?;
        (id < entry.end()).then(|| (entry, id - entry.firstgid))
    }

    /// Every non-empty GID in tile layers and tile objects must be owned.
    pub fn check_map(&self, map: &TiledMap) -> Result<(), MapError> {
        for layer in &map.layers {
            match layer {
                Layer::Tile(tiles) => {
                    for raw in tiles.all_gids()? {
                        let gid = Gid(raw);
                        if !gid.is_empty() && self.lookup(gid).is_none() {
                            return Err(MapError::InvalidTileGid {
                                layer: tiles.common.name.clone(),
                                gid: gid.id(),
                            });
                        }
                    }
                }
                Layer::Object(objects) => {
                    for object in &objects.objects {
                        let ObjectShape::Tile { gid } = &object.shape else {
                            continue;
                        };
                        let gid = Gid(*gid);
                        if self.lookup(gid).is_none() {
                            return Err(MapError::InvalidObjectGid {
                                layer: objects.common.name.clone(),
                                object_id: object.id,
                                gid: gid.id(),
                            });
                        }
                    }
                }
                Layer::Image(_) => {}
            }
        }
        Ok(())
    }
}
