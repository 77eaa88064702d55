// tests/pipeline_tests.rs

use std::fs;

use tiled_atlas_toolchain::pipeline::{convert_tiled_file, load_tileset_index, read_tileset_file, write_atlas};
use tiled_atlas_toolchain::{parse_map, ExtractedSprite, Gid, MapError, PackerConfig};

const MAP: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<map version="1.10" orientation="orthogonal" renderorder="right-down" width="2" height="1" tilewidth="16" tileheight="16" infinite="0">
 <tileset firstgid="1" source="terrain.tsx"/>
 <layer id="1" name="ground" width="2" height="1">
  <data encoding="csv">1,4</data>
 </layer>
</map>"#;

const TERRAIN: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<tileset version="1.10" name="terrain" tilewidth="16" tileheight="16" tilecount="4" columns="2">
 <image source="terrain.png" width="32" height="32"/>
</tileset>"#;

#[test]
fn converts_tmx_and_tsx_to_json_siblings() -> anyhow::Result<()> {
    let src = tempfile::tempdir()?;
    let out = tempfile::tempdir()?;
    let map_path = src.path().join("level.1.tmx");
    let tsx_path = src.path().join("terrain.tsx");
    fs::write(&map_path, MAP)?;
    fs::write(&tsx_path, TERRAIN)?;

    let tmj = convert_tiled_file(&map_path, out.path())?;
    assert_eq!(tmj, out.path().join("level.1.tmj"));
    let json: serde_json::Value = serde_json::from_str(&fs::read_to_string(&tmj)?)?;
    assert_eq!(json["tilesets"][0]["source"], "terrain.tsx");
    assert_eq!(json["layers"][0]["data"], serde_json::json!([1, 4]));

    let tsj = convert_tiled_file(&tsx_path, out.path())?;
    assert_eq!(tsj.extension().and_then(|e| e.to_str()), Some("tsj"));
    let converted = read_tileset_file(&tsj)?;
    assert_eq!(converted.tilecount, 4);
    Ok(())
}

#[test]
fn resolves_external_tilesets_relative_to_map() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    fs::write(dir.path().join("terrain.tsx"), TERRAIN)?;

    let map = parse_map(MAP)?;
    let index = load_tileset_index(&map, dir.path())?;
    let (entry, local) = index.lookup(Gid(4)).expect("gid 4 owned");
    assert_eq!((entry.tileset.name.as_str(), local), ("terrain", 3));
    index.check_map(&map)?;
    Ok(())
}

#[test]
fn missing_tileset_file_is_io_error() {
    let dir = tempfile::tempdir().expect("tempdir");
    let err = read_tileset_file(&dir.path().join("nope.tsx")).unwrap_err();
    assert!(matches!(err, MapError::Io { .. }));

    let map = parse_map(MAP).expect("valid map");
    let err = load_tileset_index(&map, dir.path()).unwrap_err();
    assert!(err.to_string().starts_with("Resolving tilesets"));
    assert!(matches!(err.downcast_ref::<MapError>(), Some(MapError::Io { .. })));
}

#[test]
fn unsupported_extension_is_rejected() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("level.json");
    fs::write(&path, "{}").expect("write");
    let err = convert_tiled_file(&path, dir.path()).unwrap_err();
    assert!(err.to_string().contains("Unsupported Tiled file extension"));
}

#[test]
fn parse_errors_carry_file_context() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("broken.tmx");
    fs::write(&path, "<map").expect("write");
    let err = convert_tiled_file(&path, dir.path()).unwrap_err();
    assert!(err.to_string().starts_with("Parsing"));
    assert!(matches!(err.downcast_ref::<MapError>(), Some(MapError::XmlSyntax(_))));
}

#[test]
fn writes_atlas_png_and_metadata() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let sprites = vec![
        ExtractedSprite::new("coin", 4, 4, vec![200; 64]).with_frame(0),
        ExtractedSprite::new("coin", 4, 4, vec![210; 64]).with_frame(1),
        ExtractedSprite::new("empty", 2, 2, vec![0; 16]),
    ];
    let output = write_atlas(sprites, &PackerConfig::default(), dir.path(), "items")?;

    assert_eq!(output.image_path, dir.path().join("items.png"));
    assert_eq!(output.warnings.len(), 1);

    let page = image::open(&output.image_path)?.to_rgba8();
    assert!(page.width() >= 6 && page.height() >= 6);

    let meta: serde_json::Value = serde_json::from_str(&fs::read_to_string(&output.metadata_path)?)?;
    assert_eq!(meta["meta"]["image"], "items.png");
    assert_eq!(meta["animations"]["coin"], serde_json::json!(["coin#0", "coin#1"]));
    assert_eq!(meta["meta"]["size"]["w"], page.width());
    Ok(())
}

#[test]
fn uppercase_extensions_convert_and_resolve() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let tsx_path = dir.path().join("Terrain.TSX");
    fs::write(&tsx_path, TERRAIN)?;

    let tsj = convert_tiled_file(&tsx_path, dir.path())?;
    assert_eq!(tsj, dir.path().join("Terrain.tsj"));
    assert_eq!(read_tileset_file(&tsx_path)?.name, "terrain");

    let map = parse_map(&MAP.replace("terrain.tsx", "Terrain.TSX"))?;
    let index = load_tileset_index(&map, dir.path())?;
    assert!(index.lookup(Gid(1)).is_some());
    Ok(())
}
