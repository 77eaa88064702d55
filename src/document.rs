// src/document.rs
//! Strictly typed Tiled documents.
//!
//! Every type here serializes field-for-field as Tiled JSON (TMJ/TSJ/TJ), so a
//! validated document can be written out with `serde_json` and consumed by any
//! Tiled-ecosystem loader.

use serde::{Deserialize, Serialize};
use serde_json::{Map as JsonMap, Value as JsonValue};

fn default_true() -> bool {
    true
}
fn one() -> f64 {
    1.0
}
fn is_false(v: &bool) -> bool {
    !*v
}
fn is_true(v: &bool) -> bool {
    *v
}
fn is_zero(v: &f64) -> bool {
    *v == 0.0
}
fn is_one(v: &f64) -> bool {
    *v == 1.0
}
fn map_type() -> String {
    "map".to_owned()
}
fn tileset_type() -> String {
    "tileset".to_owned()
}
fn template_type() -> String {
    "template".to_owned()
}

/// Map projection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Orientation {
    /// Square grid.
    Orthogonal,
    /// Diamond grid.
    Isometric,
    /// Staggered isometric.
    Staggered,
    /// Hexagonal.
    Hexagonal,
}

/// Order in which tiles are drawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RenderOrder {
    /// Right, then down.
    #[default]
    RightDown,
    /// Right, then up.
    RightUp,
    /// Left, then down.
    LeftDown,
    /// Left, then up.
    LeftUp,
}

/// Staggered axis of staggered and hexagonal maps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StaggerAxis {
    /// Columns are staggered.
    X,
    /// Rows are staggered.
    Y,
}

/// Which rows or columns are shifted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StaggerIndex {
    /// Odd ones.
    Odd,
    /// Even ones.
    Even,
}

/// A `<map>` document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TiledMap {
    /// Always `map`.
    #[serde(rename = "type", default = "map_type")]
    pub kind: String,
    /// Format version.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    /// Editor version that saved the file.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tiledversion: Option<String>,
    /// Custom class.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub class: Option<String>,
    /// Projection.
    pub orientation: Orientation,
    /// Tile draw order.
    #[serde(default)]
    pub renderorder: RenderOrder,
    /// Width in tiles.
    pub width: u32,
    /// Height in tiles.
    pub height: u32,
    /// Tile width in pixels.
    pub tilewidth: u32,
    /// Tile height in pixels.
    pub tileheight: u32,
    /// Chunked, unbounded map.
    #[serde(default)]
    pub infinite: bool,
    /// Hex side length in pixels.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hexsidelength: Option<u32>,
    /// Stagger axis.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub staggeraxis: Option<StaggerAxis>,
    /// Stagger index.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub staggerindex: Option<StaggerIndex>,
    /// Parallax origin x.
    #[serde(default, skip_serializing_if = "is_zero")]
    pub parallaxoriginx: f64,
    /// Parallax origin y.
    #[serde(default, skip_serializing_if = "is_zero")]
    pub parallaxoriginy: f64,
    /// `#AARRGGBB` or `#RRGGBB`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub backgroundcolor: Option<String>,
    /// Next free layer id.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nextlayerid: Option<u32>,
    /// Next free object id.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nextobjectid: Option<u32>,
    /// Compression level for tile data, -1 for the default.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub compressionlevel: Option<i32>,
    /// Layers in document order; groups are already flattened.
    #[serde(default)]
    pub layers: Vec<Layer>,
    /// Tilesets in document order.
    #[serde(default)]
    pub tilesets: Vec<TilesetRef>,
    /// Custom properties.
    #[serde(default, skip_serializing_if = "Properties::is_empty")]
    pub properties: Properties,
}

impl TiledMap {
    /// All tile layers, in draw order.
    pub fn tile_layers(&self) -> impl Iterator<Item = &TileLayer> {
        self.layers.iter().filter_map(|l| match l {
            Layer::Tile(t) => Some(t),
            _ => None,
        })
    }

    /// All object layers, in draw order.
    pub fn object_layers(&self) -> impl Iterator<Item = &ObjectLayer> {
        self.layers.iter().filter_map(|l| match l {
            Layer::Object(o) => Some(o),
            _ => None,
        })
    }
}

// ---------------------------------------------------------------------------
// Layers
// ---------------------------------------------------------------------------

/// A layer, tagged by the Tiled JSON `type` field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Layer {
    /// Tile grid.
    #[serde(rename = "tilelayer")]
    Tile(TileLayer),
    /// Object group.
    #[serde(rename = "objectgroup")]
    Object(ObjectLayer),
    /// Single image.
    #[serde(rename = "imagelayer")]
    Image(ImageLayer),
}

impl Layer {
    /// Fields shared by all kinds.
    pub fn common(&self) -> &LayerCommon {
        match self {
            Layer::Tile(l) => &l.common,
            Layer::Object(l) => &l.common,
            Layer::Image(l) => &l.common,
        }
    }

    /// Layer name.
    pub fn name(&self) -> &str {
        &self.common().name
    }
}

/// Fields shared by every layer kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayerCommon {
    /// Unique layer id.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<u32>,
    /// Layer name.
    #[serde(default)]
    pub name: String,
    /// Custom class.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub class: Option<String>,
    /// 0.0 to 1.0.
    #[serde(default = "one")]
    pub opacity: f64,
    /// Shown in the editor.
    #[serde(default = "default_true")]
    pub visible: bool,
    /// Locked in the editor.
    #[serde(default, skip_serializing_if = "is_false")]
    pub locked: bool,
    /// Horizontal offset in pixels.
    #[serde(default, skip_serializing_if = "is_zero")]
    pub offsetx: f64,
    /// Vertical offset in pixels.
    #[serde(default, skip_serializing_if = "is_zero")]
    pub offsety: f64,
    /// Horizontal parallax factor.
    #[serde(default = "one", skip_serializing_if = "is_one")]
    pub parallaxx: f64,
    /// Vertical parallax factor.
    #[serde(default = "one", skip_serializing_if = "is_one")]
    pub parallaxy: f64,
    /// Tint multiplied into the layer.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tintcolor: Option<String>,
    /// Custom properties.
    #[serde(default, skip_serializing_if = "Properties::is_empty")]
    pub properties: Properties,
}

/// How `data` is stored in the source XML.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Encoding {
    /// Comma separated GIDs.
    Csv,
    /// Little-endian `u32` GIDs, base64 encoded.
    Base64,
}

/// Compression of a base64 payload. Absent means uncompressed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Compression {
    /// gzip stream.
    Gzip,
    /// zlib stream.
    Zlib,
    /// Zstandard frame.
    #[serde(rename = "zstd")]
    Zstandard,
}

/// Tile data as stored in the document: plain GIDs or an opaque base64 payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TileData {
    /// Decoded GIDs, row-major.
    Gids(Vec<u32>),
    /// Encoded payload, whitespace stripped.
    Base64(String),
}

/// A rectangular piece of an infinite tile layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    /// Left edge in tiles.
    pub x: i32,
    /// Top edge in tiles.
    pub y: i32,
    /// Width in tiles.
    pub width: u32,
    /// Height in tiles.
    pub height: u32,
    /// Chunk GIDs.
    pub data: TileData,
}

/// A grid of tile GIDs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TileLayer {
    /// Shared layer fields.
    #[serde(flatten)]
    pub common: LayerCommon,
    /// Width in tiles; the chunk union on infinite maps.
    pub width: u32,
    /// Height in tiles; the chunk union on infinite maps.
    pub height: u32,
    /// Left edge of the chunk union.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub startx: Option<i32>,
    /// Top edge of the chunk union.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub starty: Option<i32>,
    /// Source encoding.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub encoding: Option<Encoding>,
    /// Compression of base64 data.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub compression: Option<Compression>,
    /// Present on finite maps.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<TileData>,
    /// Present on infinite maps.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chunks: Option<Vec<Chunk>>,
}

/// Draw order of objects in a group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DrawOrder {
    /// By y coordinate.
    Topdown,
    /// In document order.
    Index,
}

/// A group of objects.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectLayer {
    /// Shared layer fields.
    #[serde(flatten)]
    pub common: LayerCommon,
    /// Object draw order.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub draworder: Option<DrawOrder>,
    /// Display colour in the editor.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    /// Objects in document order.
    #[serde(default)]
    pub objects: Vec<TiledObject>,
}

/// A layer showing one image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageLayer {
    /// Shared layer fields.
    #[serde(flatten)]
    pub common: LayerCommon,
    /// Image path.
    #[serde(default)]
    pub image: String,
    /// Image width in pixels.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub imagewidth: Option<u32>,
    /// Image height in pixels.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub imageheight: Option<u32>,
    /// Colour treated as transparent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transparentcolor: Option<String>,
    /// Tile the image horizontally.
    #[serde(default, skip_serializing_if = "is_false")]
    pub repeatx: bool,
    /// Tile the image vertically.
    #[serde(default, skip_serializing_if = "is_false")]
    pub repeaty: bool,
}

// ---------------------------------------------------------------------------
// Objects
// ---------------------------------------------------------------------------

/// Polygon or polyline vertex, relative to the object.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    /// Horizontal offset.
    pub x: f64,
    /// Vertical offset.
    pub y: f64,
}

fn default_pixelsize() -> u32 {
    16
}

/// Payload of a text object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Text {
    /// Text to draw.
    #[serde(default)]
    pub text: String,
    /// Font family.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fontfamily: Option<String>,
    /// Font size in pixels.
    #[serde(default = "default_pixelsize")]
    pub pixelsize: u32,
    /// Word wrap.
    #[serde(default, skip_serializing_if = "is_false")]
    pub wrap: bool,
    /// Text colour.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    /// Bold.
    #[serde(default, skip_serializing_if = "is_false")]
    pub bold: bool,
    /// Italic.
    #[serde(default, skip_serializing_if = "is_false")]
    pub italic: bool,
    /// Underlined.
    #[serde(default, skip_serializing_if = "is_false")]
    pub underline: bool,
    /// Struck out.
    #[serde(default, skip_serializing_if = "is_false")]
    pub strikeout: bool,
    /// Use kerning.
    #[serde(default = "default_true", skip_serializing_if = "is_true")]
    pub kerning: bool,
    /// `left`, `center`, `right` or `justify`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub halign: Option<String>,
    /// `top`, `center` or `bottom`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub valign: Option<String>,
}

/// The geometry of an object. Exactly one applies per object.
#[derive(Debug, Clone, PartialEq)]
pub enum ObjectShape {
    /// Plain rectangle.
    Rectangle,
    /// Single point.
    Point,
    /// Ellipse inside the bounds.
    Ellipse,
    /// Closed shape.
    Polygon(Vec<Point>),
    /// Open path.
    Polyline(Vec<Point>),
    /// Text box.
    Text(Text),
    /// Tile object.
    Tile {
        /// GID, flip flags included.
        gid: u32,
    },
}

/// An object of an object layer, a tile collision group or a template.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "ObjectRecord", into = "ObjectRecord")]
pub struct TiledObject {
    /// Unique object id.
    pub id: Option<u32>,
    /// Object name.
    pub name: String,
    /// Tiled's object class (`type` in JSON, `class` in newer TMX).
    pub kind: String,
    /// X in pixels.
    pub x: f64,
    /// Y in pixels.
    pub y: f64,
    /// Width in pixels.
    pub width: f64,
    /// Height in pixels.
    pub height: f64,
    /// Rotation in degrees, clockwise.
    pub rotation: f64,
    /// Shown in the editor.
    pub visible: bool,
    /// Template file this object instantiates.
    pub template: Option<String>,
    /// Geometry.
    pub shape: ObjectShape,
    /// Custom properties.
    pub properties: Properties,
}

/// Wire shape of an object: one optional field per shape flag.
#[derive(Clone, Serialize, Deserialize)]
struct ObjectRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    id: Option<u32>,
    #[serde(default)]
    name: String,
    #[serde(rename = "type", default)]
    kind: String,
    #[serde(default)]
    x: f64,
    #[serde(default)]
    y: f64,
    #[serde(default)]
    width: f64,
    #[serde(default)]
    height: f64,
    #[serde(default)]
    rotation: f64,
    #[serde(default = "default_true")]
    visible: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    gid: Option<u32>,
    #[serde(default, skip_serializing_if = "is_false")]
    point: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    ellipse: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    polygon: Option<Vec<Point>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    polyline: Option<Vec<Point>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    text: Option<Text>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    template: Option<String>,
    #[serde(default, skip_serializing_if = "Properties::is_empty")]
    properties: Properties,
}

impl TryFrom<ObjectRecord> for TiledObject {
    type Error = String;

    fn try_from(r: ObjectRecord) -> Result<Self, Self::Error> {
        let mut shapes = Vec::new();
        if let Some(gid) = r.gid {
            shapes.push(ObjectShape::Tile { gid });
        }
        if r.point {
            shapes.push(ObjectShape::Point);
        }
        if r.ellipse {
            shapes.push(ObjectShape::Ellipse);
        }
        if let Some(points) = r.polygon {
            shapes.push(ObjectShape::Polygon(points));
        }
        if let Some(points) = r.polyline {
            shapes.push(ObjectShape::Polyline(points));
        }
        if let Some(text) = r.text {
            shapes.push(ObjectShape::Text(text));
        }
        if shapes.len() > 1 {
            return Err(format!(
                "object {:?} has {} conflicting shapes, expected at most one",
                r.id,
                shapes.len()
            ));
        }

        Ok(TiledObject {
            id: r.id,
            name: r.name,
            kind: r.kind,
            x: r.x,
            y: r.y,
            width: r.width,
            height: r.height,
            rotation: r.rotation,
            visible: r.visible,
            template: r.template,
            shape: shapes.pop().unwrap_or(ObjectShape::Rectangle),
            properties: r.properties,
        })
    }
}

impl From<TiledObject> for ObjectRecord {
    fn from(o: TiledObject) -> Self {
        let mut r = ObjectRecord {
            id: o.id,
            name: o.name,
            kind: o.kind,
            x: o.x,
            y: o.y,
            width: o.width,
            height: o.height,
            rotation: o.rotation,
            visible: o.visible,
            gid: None,
            point: false,
            ellipse: false,
            polygon: None,
            polyline: None,
            text: None,
            template: o.template,
            properties: o.properties,
        };
        match o.shape {
            ObjectShape::Rectangle => {}
            ObjectShape::Point => r.point = true,
            ObjectShape::Ellipse => r.ellipse = true,
            ObjectShape::Polygon(p) => r.polygon = Some(p),
            ObjectShape::Polyline(p) => r.polyline = Some(p),
            ObjectShape::Text(t) => r.text = Some(t),
            ObjectShape::Tile { gid } => r.gid = Some(gid),
        }
        r
    }
}

// ---------------------------------------------------------------------------
// Tilesets
// ---------------------------------------------------------------------------

/// A map's reference to a tileset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TilesetRef {
    /// TSX/TSJ file reference.
    External(ExternalTilesetRef),
    /// Tileset stored inside the map.
    Embedded(Tileset),
}

impl TilesetRef {
    /// First GID, if set (always set inside maps).
    pub fn firstgid(&self) -> Option<u32> {
        match self {
            TilesetRef::External(e) => Some(e.firstgid),
            TilesetRef::Embedded(t) => t.firstgid,
        }
    }
}

/// `{firstgid, source}` pointing at a TSX/TSJ file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExternalTilesetRef {
    /// First GID owned by the tileset.
    pub firstgid: u32,
    /// Path relative to the referring file.
    pub source: String,
}

/// Pixel offset applied when drawing tiles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TileOffset {
    /// Horizontal offset.
    pub x: i32,
    /// Vertical offset.
    pub y: i32,
}

/// Orientation of a tileset's tile grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GridOrientation {
    /// Square cells.
    Orthogonal,
    /// Diamond cells.
    Isometric,
}

/// Tile grid used for tile objects and terrain overlays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Grid {
    /// Cell shape.
    pub orientation: GridOrientation,
    /// Cell width.
    pub width: u32,
    /// Cell height.
    pub height: u32,
}

/// Allowed tile transformations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Transformations {
    /// Horizontal flips allowed.
    #[serde(default)]
    pub hflip: bool,
    /// Vertical flips allowed.
    #[serde(default)]
    pub vflip: bool,
    /// Rotations allowed.
    #[serde(default)]
    pub rotate: bool,
    /// Prefer untransformed tiles when painting.
    #[serde(default)]
    pub preferuntransformed: bool,
}

/// Tileset image layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TilesetKind<'a> {
    /// One image cut into a uniform grid.
    Grid {
        /// Tileset image path.
        image: &'a str,
    },
    /// Every tile brings its own image.
    Collection,
}

/// An embedded or standalone tileset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tileset {
    /// First GID; set for tilesets inside maps.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub firstgid: Option<u32>,
    /// Tileset name.
    #[serde(default)]
    pub name: String,
    /// Custom class.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub class: Option<String>,
    /// Tile width in pixels.
    pub tilewidth: u32,
    /// Tile height in pixels.
    pub tileheight: u32,
    /// Number of tiles.
    #[serde(default)]
    pub tilecount: u32,
    /// Columns in the tileset image.
    #[serde(default)]
    pub columns: u32,
    /// Pixels between tiles.
    #[serde(default)]
    pub spacing: u32,
    /// Pixels around the tiles.
    #[serde(default)]
    pub margin: u32,
    /// Single tileset image.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    /// Image width in pixels.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub imagewidth: Option<u32>,
    /// Image height in pixels.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub imageheight: Option<u32>,
    /// Colour treated as transparent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transparentcolor: Option<String>,
    /// Editor background colour.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub backgroundcolor: Option<String>,
    /// Drawing offset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tileoffset: Option<TileOffset>,
    /// Tile grid.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub grid: Option<Grid>,
    /// Alignment of tile objects.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub objectalignment: Option<String>,
    /// `tile` or `grid`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tilerendersize: Option<String>,
    /// `stretch` or `preserve-aspect-fit`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fillmode: Option<String>,
    /// Allowed transformations.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transformations: Option<Transformations>,
    /// Per-tile metadata, only for tiles that have any.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tiles: Vec<Tile>,
    /// Custom properties.
    #[serde(default, skip_serializing_if = "Properties::is_empty")]
    pub properties: Properties,
}

impl Tileset {
    /// Single image or image collection.
    pub fn kind(&self) -> TilesetKind<'_> {
        match &self.image {
            Some(image) => TilesetKind::Grid { image },
            None => TilesetKind::Collection,
        }
    }

    /// Per-tile metadata for a local tile id.
    pub fn tile(&self, id: u32) -> Option<&Tile> {
        self.tiles.iter().find(|t| t.id == id)
    }
}

/// One `{tileid, duration}` animation step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Frame {
    /// Local tile id shown during this step.
    pub tileid: u32,
    /// Milliseconds.
    pub duration: u32,
}

/// Per-tile metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tile {
    /// Local tile id.
    pub id: u32,
    /// Custom class.
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    /// Terrain painting probability.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub probability: Option<f64>,
    /// Image of a collection tile.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    /// Image width in pixels.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub imagewidth: Option<u32>,
    /// Image height in pixels.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub imageheight: Option<u32>,
    /// Sub-rectangle x within the image.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub x: Option<u32>,
    /// Sub-rectangle y within the image.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub y: Option<u32>,
    /// Sub-rectangle width.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    /// Sub-rectangle height.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
    /// Animation steps.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub animation: Option<Vec<Frame>>,
    /// Collision shapes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub objectgroup: Option<CollisionGroup>,
    /// Custom properties.
    #[serde(default, skip_serializing_if = "Properties::is_empty")]
    pub properties: Properties,
}

/// A tile's collision shapes. Serialized as a full `objectgroup` layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Layer", into = "Layer")]
pub struct CollisionGroup(pub ObjectLayer);

impl TryFrom<Layer> for CollisionGroup {
    type Error = String;

    fn try_from(layer: Layer) -> Result<Self, Self::Error> {
        match layer {
            Layer::Object(group) => Ok(CollisionGroup(group)),
            other => Err(format!(
                "tile collision group '{}' must be an objectgroup",
                other.name()
            )),
        }
    }
}

impl From<CollisionGroup> for Layer {
    fn from(group: CollisionGroup) -> Self {
        Layer::Object(group.0)
    }
}

/// A standalone `<tileset>` (TSX) document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TilesetDocument {
    /// Always `tileset`.
    #[serde(rename = "type", default = "tileset_type")]
    pub kind: String,
    /// Format version.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    /// Editor version that saved the file.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tiledversion: Option<String>,
    /// The tileset itself.
    #[serde(flatten)]
    pub tileset: Tileset,
}

/// A standalone `<template>` (TX) document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemplateDocument {
    /// Always `template`.
    #[serde(rename = "type", default = "template_type")]
    pub kind: String,
    /// Tileset of a tile object template.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tileset: Option<ExternalTilesetRef>,
    /// The template object.
    pub object: TiledObject,
}

// ---------------------------------------------------------------------------
// Properties
// ---------------------------------------------------------------------------

/// A custom property value, discriminated by its declared type.
#[derive(Debug, Clone, PartialEq)]
pub enum PropertyValue {
    /// Integer.
    Int(i64),
    /// Boolean.
    Bool(bool),
    /// Float.
    Float(f64),
    /// Plain string.
    String(String),
    /// File path.
    File(String),
    /// `#AARRGGBB` colour.
    Color(String),
    /// Object reference by id; 0 means none.
    Object(u32),
    /// Nested members of a custom class.
    Class(JsonMap<String, JsonValue>),
}

impl PropertyValue {
    fn type_name(&self) -> &'static str {
        match self {
            PropertyValue::Int(_) => "int",
            PropertyValue::Bool(_) => "bool",
            PropertyValue::Float(_) => "float",
            PropertyValue::String(_) => "string",
            PropertyValue::File(_) => "file",
            PropertyValue::Color(_) => "color",
            PropertyValue::Object(_) => "object",
            PropertyValue::Class(_) => "class",
        }
    }
}

/// A named, typed custom property.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "PropertyRecord", into = "PropertyRecord")]
pub struct Property {
    /// Property name.
    pub name: String,
    /// Typed value.
    pub value: PropertyValue,
    /// Name of the custom class for `class` properties.
    pub propertytype: Option<String>,
}

fn string_type() -> String {
    "string".to_owned()
}

#[derive(Clone, Serialize, Deserialize)]
struct PropertyRecord {
    name: String,
    #[serde(rename = "type", default = "string_type")]
    kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    propertytype: Option<String>,
    #[serde(default)]
    value: JsonValue,
}

impl TryFrom<PropertyRecord> for Property {
    type Error = String;

    fn try_from(r: PropertyRecord) -> Result<Self, Self::Error> {
        let value = match r.kind.as_str() {
            "int" => r.value.as_i64().map(PropertyValue::Int),
            "bool" => r.value.as_bool().map(PropertyValue::Bool),
            "float" => r.value.as_f64().map(PropertyValue::Float),
            "string" => r.value.as_str().map(|s| PropertyValue::String(s.to_owned())),
            "file" => r.value.as_str().map(|s| PropertyValue::File(s.to_owned())),
            "color" => r.value.as_str().map(|s| PropertyValue::Color(s.to_owned())),
            "object" => r
                .value
                .as_u64()
                .and_then(|v| u32::try_from(v).ok())
                .map(PropertyValue::Object),
            "class" => r.value.as_object().cloned().map(PropertyValue::Class),
            other => {
                return Err(format!(
                    "property '{}' has unsupported type '{other}'",
                    r.name
                ))
            }
        };
        let value = value.ok_or_else(|| {
            format!(
                "property '{}' declared as {} has incompatible value {}",
                r.name, r.kind, r.value
            )
        })?;
        Ok(Property {
            name: r.name,
            value,
            propertytype: r.propertytype,
        })
    }
}

impl From<Property> for PropertyRecord {
    fn from(p: Property) -> Self {
        let kind = p.value.type_name().to_owned();
        let value = match p.value {
            PropertyValue::Int(v) => JsonValue::from(v),
            PropertyValue::Bool(v) => JsonValue::from(v),
            PropertyValue::Float(v) => JsonValue::from(v),
            PropertyValue::String(v) | PropertyValue::File(v) | PropertyValue::Color(v) => {
                JsonValue::from(v)
            }
            PropertyValue::Object(v) => JsonValue::from(v),
            PropertyValue::Class(members) => JsonValue::Object(members),
        };
        PropertyRecord {
            name: p.name,
            kind,
            propertytype: p.propertytype,
            value,
        }
    }
}

/// Ordered custom properties with name lookup.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Properties(pub Vec<Property>);

impl Properties {
    /// No properties.
    pub fn new() -> Self {
        Self::default()
    }

    /// True when there are no properties.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Number of properties.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Properties in document order.
    pub fn iter(&self) -> impl Iterator<Item = &Property> {
        self.0.iter()
    }

    /// Last property with this name wins, matching Tiled's override order.
    pub fn get(&self, name: &str) -> Option<&PropertyValue> {
        self.0.iter().rev().find(|p| p.name == name).map(|p| &p.value)
    }

    /// Boolean value of `name`.
    pub fn get_bool(&self, name: &str) -> Option<bool> {
        match self.get(name)? {
            PropertyValue::Bool(v) => Some(*v),
            _ => None,
        }
    }

    /// Integer value of `name`; object references count.
    pub fn get_i64(&self, name: &str) -> Option<i64> {
        match self.get(name)? {
            PropertyValue::Int(v) => Some(*v),
            PropertyValue::Object(v) => Some(i64::from(*v)),
            _ => None,
        }
    }

    /// [`Properties::get_i64`] narrowed to `i32`.
    pub fn get_i32(&self, name: &str) -> Option<i32> {
        self.get_i64(name).and_then(|v| i32::try_from(v).ok())
    }

    /// Float value of `name`; integers widen.
    pub fn get_f64(&self, name: &str) -> Option<f64> {
        match self.get(name)? {
            PropertyValue::Float(v) => Some(*v),
            PropertyValue::Int(v) => Some(*v as f64),
            _ => None,
        }
    }

    /// String-like values: `string`, `file` and `color`.
    pub fn get_str(&self, name: &str) -> Option<&str> {
        match self.get(name)? {
            PropertyValue::String(v) | PropertyValue::File(v) | PropertyValue::Color(v) => {
                Some(v.as_str())
            }
            _ => None,
        }
    }
}

/// Result of a parse: a validated document, or the raw tree in lenient mode.
#[derive(Debug, Clone, PartialEq)]
pub enum Parsed<T> {
    /// Validated document.
    Strict(T),
    /// Raw coerced tree.
    Lenient(JsonValue),
}

impl<T: Serialize> Parsed<T> {
    /// The validated document, if this is one.
    pub fn into_strict(self) -> Option<T> {
        match self {
            Parsed::Strict(doc) => Some(doc),
            Parsed::Lenient(_) => None,
        }
    }

    /// JSON value of either form.
    pub fn to_json_value(&self) -> Result<JsonValue, serde_json::Error> {
        match self {
            Parsed::Strict(doc) => serde_json::to_value(doc),
            Parsed::Lenient(raw) => Ok(raw.clone()),
        }
    }

    /// Pretty-printed JSON of either form.
    pub fn to_json_string(&self) -> Result<String, serde_json::Error> {
        match self {
            Parsed::Strict(doc) => serde_json::to_string_pretty(doc),
            Parsed::Lenient(raw) => serde_json::to_string_pretty(raw),
        }
    }
}
