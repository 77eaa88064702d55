// tests/atlas_tests.rs

use serde_json::json;
use tiled_atlas_toolchain::atlas::{Borders, PackWarning, Rect};
use tiled_atlas_toolchain::{pack, AtlasError, ExtractedSprite, PackerConfig, SpriteFilter, SpriteSet};

fn solid(name: &str, w: u32, h: u32) -> ExtractedSprite {
    ExtractedSprite::new(name, w, h, vec![255; (w * h * 4) as usize])
}

/// 3x3 grid of 4px cells, every cell its own colour.
fn nine_slice(name: &str) -> ExtractedSprite {
    let mut pixels = Vec::with_capacity(12 * 12 * 4);
    for y in 0..12u32 {
        for x in 0..12u32 {
            let cell = (y / 4) * 3 + x / 4;
            pixels.extend_from_slice(&[cell as u8 * 25, 100, 200 - cell as u8 * 10, 255]);
        }
    }
    ExtractedSprite::new(name, 12, 12, pixels)
}

#[test]
fn two_sprites_do_not_overlap() {
    let set = SpriteSet::new(SpriteFilter::default()).add_sprites([solid("a", 10, 10), solid("b", 10, 10)]);
    let atlas = pack(&set).expect("packed");

    let (w, h) = atlas.image.dimensions();
    assert!(w.max(h) >= 22 && w.min(h) >= 12, "page {w}x{h}");

    let a = atlas.frames.iter().find(|f| f.key == "a").expect("a");
    let b = atlas.frames.iter().find(|f| f.key == "b").expect("b");
    assert_eq!((a.frame.w, a.frame.h), (10, 10));
    assert!(!a.padded().intersects(&b.padded()));

    let meta = serde_json::to_value(atlas.build_metadata("atlas.png")).expect("json");
    assert_eq!(meta["frames"]["a"]["trimmed"], false);
    assert_eq!(meta["meta"]["size"], json!({"w": w, "h": h}));
}

#[test]
fn nine_slice_borders_from_companion() {
    let set = SpriteSet::new(SpriteFilter::default())
        .add_sprites([solid("icon", 12, 12).with_frame(0), nine_slice("icon-slices")]);
    let atlas = pack(&set).expect("packed");
    let meta = serde_json::to_value(atlas.build_metadata("ui.png")).expect("json");

    assert_eq!(
        meta["frames"]["icon#0"]["borders"],
        json!({"left": 4, "top": 4, "right": 4, "bottom": 4})
    );
    assert_eq!(meta["frames"]["icon#0"]["frame"]["w"], 12);
    // Slice companions are metadata only.
    assert!(meta["frames"].get("icon-slices").is_none());
    assert_eq!(atlas.frames.len(), 1);
}

#[test]
fn explicit_slice_reference_wins() {
    let set = SpriteSet::new(SpriteFilter::default()).add_sprites([
        solid("panel", 12, 12).with_slices("frame-slices"),
        nine_slice("frame-slices"),
    ]);
    let atlas = pack(&set).expect("packed");
    assert_eq!(
        atlas.frames[0].borders,
        Some(Borders { left: 4, top: 4, right: 4, bottom: 4 })
    );
}

#[test]
fn missing_explicit_slices_is_a_warning() {
    let set = SpriteSet::new(SpriteFilter::default())
        .add_sprites([solid("panel", 4, 4).with_slices("gone-slices")]);
    let atlas = pack(&set).expect("packed");
    assert_eq!(atlas.frames[0].borders, None);
    assert!(matches!(atlas.warnings[0], PackWarning::MissingSlices { .. }));
}

#[test]
fn two_by_two_slices_are_unsupported() {
    let mut slices = solid("btn-slices", 8, 8);
    for y in 0..8usize {
        for x in 4..8usize {
            slices.pixels[(y * 8 + x) * 4] = 0;
        }
    }
    for y in 4..8usize {
        for x in 0..8usize {
            slices.pixels[(y * 8 + x) * 4 + 1] = 0;
        }
    }
    let set = SpriteSet::new(SpriteFilter::default()).add_sprites([solid("btn", 8, 8), slices]);
    assert!(matches!(
        pack(&set),
        Err(AtlasError::UnsupportedSliceGrid { columns: 2, rows: 2, .. })
    ));
}

#[test]
fn trim_reports_offset_and_source_size() {
    let mut pixels = vec![0u8; 8 * 8 * 4];
    for y in 2..6 {
        for x in 2..6 {
            pixels[(y * 8 + x) * 4..(y * 8 + x) * 4 + 4].copy_from_slice(&[1, 2, 3, 255]);
        }
    }
    let set = SpriteSet::new(SpriteFilter::default()).add_sprites([ExtractedSprite::new("core", 8, 8, pixels)]);
    let atlas = pack(&set).expect("packed");
    let meta = serde_json::to_value(atlas.build_metadata("a.png")).expect("json");

    let core = &meta["frames"]["core"];
    assert_eq!(core["trimmed"], true);
    assert_eq!(core["spriteSourceSize"], json!({"x": 2, "y": 2, "w": 4, "h": 4}));
    assert_eq!(core["sourceSize"], json!({"w": 8, "h": 8}));
    assert_eq!(core["frame"]["w"], 4);
    assert_eq!(core["frame"]["h"], 4);
    assert_eq!(atlas.image.dimensions(), (6, 6));
}

#[test]
fn packed_rects_stay_in_bounds_and_apart() {
    let sprites: Vec<ExtractedSprite> = (0..24u32)
        .map(|i| solid(&format!("s{i}"), 1 + (i * 7) % 13, 1 + (i * 5) % 11))
        .collect();
    let set = SpriteSet::new(SpriteFilter::default()).add_sprites(sprites);
    let atlas = pack(&set).expect("packed");
    let (w, h) = atlas.image.dimensions();

    let rects: Vec<Rect> = atlas.frames.iter().map(|f| f.padded()).collect();
    assert_eq!(rects.len(), 24);
    for (i, r) in rects.iter().enumerate() {
        assert!(r.right() <= w && r.bottom() <= h, "{r:?} outside {w}x{h}");
        for other in &rects[i + 1..] {
            assert!(!r.intersects(other), "{r:?} overlaps {other:?}");
        }
    }
    // Page is tight: some rectangle touches each far edge.
    assert!(rects.iter().any(|r| r.right() == w));
    assert!(rects.iter().any(|r| r.bottom() == h));
}

#[test]
fn packing_is_deterministic() {
    let build = || {
        let set = SpriteSet::new(SpriteFilter::default())
            .add_sprites((0..10u32).map(|i| solid(&format!("s{i}"), 2 + i % 4, 3 + i % 3)));
        let atlas = pack(&set).expect("packed");
        atlas.build_metadata("x.png").to_json_string().expect("json")
    };
    assert_eq!(build(), build());
}

#[test]
fn filtered_and_empty_sprites() {
    let set = SpriteSet::new(SpriteFilter::default()).add_sprites([
        solid("_reference", 4, 4),
        solid("Layer 2", 4, 4),
        ExtractedSprite::new("ghost", 3, 3, vec![0; 36]),
        solid("hero", 4, 4),
    ]);
    let atlas = pack(&set).expect("packed");
    let keys: Vec<&str> = atlas.frames.iter().map(|f| f.key.as_str()).collect();
    assert_eq!(keys, ["hero"]);
    assert_eq!(atlas.warnings, [PackWarning::EmptySprite { sprite: "ghost".into() }]);
}

#[test]
fn nothing_to_pack_is_an_error() {
    let set = SpriteSet::new(SpriteFilter::default()).add_sprites([solid("_only_hidden", 2, 2)]);
    assert!(matches!(pack(&set), Err(AtlasError::EmptyInput)));
}

#[test]
fn short_buffer_is_padded_and_packed() {
    // 2x2 sprite with only its first pixel supplied.
    let set = SpriteSet::new(SpriteFilter::default())
        .add_sprites([ExtractedSprite::new("torn", 2, 2, vec![9, 9, 9, 255])]);
    let atlas = pack(&set).expect("packed");
    assert_eq!(atlas.frames[0].source_rect, Rect::new(0, 0, 1, 1));
    assert!(matches!(
        atlas.warnings[0],
        PackWarning::BufferSize { expected: 16, actual: 4, .. }
    ));
}

#[test]
fn config_controls_filter_and_app_name() {
    let config = PackerConfig::from_json_str(
        r#"{"app": "my-build", "filter": {"ignored_prefix": "~", "default_layer_prefix": ""}}"#,
    )
    .expect("config");
    let set = SpriteSet::from_config(&config).add_sprites([
        solid("~skip", 2, 2),
        solid("_kept", 2, 2),
        solid("Layer 1", 2, 2),
    ]);
    let atlas = pack(&set).expect("packed");
    assert_eq!(atlas.frames.len(), 2);
    assert_eq!(atlas.build_metadata("a.png").meta.app, "my-build");
}
