// src/pipeline.rs
//! File-level glue for build scripts: read sources, run the pure parse/pack
//! steps, write JSON and PNG artifacts.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context};
use log::info;

use crate::atlas::{pack, ExtractedSprite, PackWarning, SpriteSet};
use crate::config::PackerConfig;
use crate::document::{TiledMap, Tileset, TilesetDocument};
use crate::error::MapError;
use crate::gid::TilesetIndex;
use crate::loader::tmx_loader::{parse_external_template, parse_external_tileset, parse_map};

/// Convert one `.tmx` / `.tsx` / `.tx` file into `.tmj` / `.tsj` / `.tj` in
/// `output_dir`. Returns the written path.
pub fn convert_tiled_file(input: &Path, output_dir: &Path) -> anyhow::Result<PathBuf> {
    let ext = input
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();
    let xml = fs::read_to_string(input)
        .with_context(|| format!("Reading Tiled file {}", input.display()))?;

    let parsed = || format!("Parsing {}", input.display());
    let (json, out_ext) = match ext.as_str() {
        "tmx" => (serde_json::to_string_pretty(&parse_map(&xml).with_context(parsed)?)?, "tmj"),
        "tsx" => (
            serde_json::to_string_pretty(&parse_external_tileset(&xml).with_context(parsed)?)?,
            "tsj",
        ),
        "tx" => (
            serde_json::to_string_pretty(&parse_external_template(&xml).with_context(parsed)?)?,
            "tj",
        ),
        _ => bail!("Unsupported Tiled file extension: {}", input.display()),
    };

    let stem = input
        .file_stem()
        .with_context(|| format!("No file name in {}", input.display()))?;
    fs::create_dir_all(output_dir)
        .with_context(|| format!("Creating output directory {}", output_dir.display()))?;
    let mut file_name = stem.to_os_string();
    file_name.push(".");
    file_name.push(out_ext);
    let out = output_dir.join(file_name);
    fs::write(&out, json).with_context(|| format!("Writing {}", out.display()))?;
    info!("converted {} -> {}", input.display(), out.display());
    Ok(out)
}

/// Read a standalone tileset from TSX (XML) or TSJ / JSON.
pub fn read_tileset_file(path: &Path) -> Result<Tileset, MapError> {
    let text = fs::read_to_string(path).map_err(|source| MapError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();
    let document = match ext.as_str() {
        "tsx" => parse_external_tileset(&text)?,
        "tsj" | "json" => serde_json::from_str::<TilesetDocument>(&text)?,
        other => {
            return Err(MapError::structural(
                "tileset",
                format!("unsupported tileset file extension '{other}' for {}", path.display()),
            ))
        }
    };
    Ok(document.tileset)
}

/// Tileset index for `map`, resolving external tilesets relative to `map_dir`.
pub fn load_tileset_index(map: &TiledMap, map_dir: &Path) -> anyhow::Result<TilesetIndex> {
    TilesetIndex::build(map, |source| read_tileset_file(&map_dir.join(source)))
        .with_context(|| format!("Resolving tilesets from {}", map_dir.display()))
}

/// Artifacts written by [`write_atlas`].
#[derive(Debug, Clone)]
pub struct AtlasOutput {
    /// Written PNG.
    pub image_path: PathBuf,
    /// Written metadata JSON.
    pub metadata_path: PathBuf,
    /// Packing warnings.
    pub warnings: Vec<PackWarning>,
}

/// Pack `sprites` and write `<name>.png` plus `<name>.json` into `output_dir`.
pub fn write_atlas<I>(
    sprites: I,
    config: &PackerConfig,
    output_dir: &Path,
    name: &str,
) -> anyhow::Result<AtlasOutput>
where
    I: IntoIterator<Item = ExtractedSprite>,
{
    let set = SpriteSet::from_config(config).add_sprites(sprites);
    let atlas = pack(&set).with_context(|| format!("Packing atlas '{name}'"))?;

    fs::create_dir_all(output_dir)
        .with_context(|| format!("Creating output directory {}", output_dir.display()))?;
    let image_file = format!("{name}.png");
    let image_path = output_dir.join(&image_file);
    let metadata_path = output_dir.join(format!("{name}.json"));

    let png = atlas.encode_png().context("Encoding atlas PNG")?;
    fs::write(&image_path, png).with_context(|| format!("Writing {}", image_path.display()))?;
    let json = atlas.build_metadata(&image_file).to_json_string()?;
    fs::write(&metadata_path, json)
        .with_context(|| format!("Writing {}", metadata_path.display()))?;

    info!(
        "wrote atlas '{name}' ({} frames, {} warnings) to {}",
        atlas.frames.len(),
        atlas.warnings.len(),
        output_dir.display()
    );
    Ok(AtlasOutput {
        image_path,
        metadata_path,
        warnings: atlas.warnings,
    })
}
