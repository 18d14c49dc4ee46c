//! Entity data model for company maps.
//!
//! Companies are the nodes of the map, arrows are directed relations between
//! two companies, and groups are free-floating labeled regions drawn behind
//! them. All coordinates are canvas-space; the view `Transform` maps them to
//! the screen.

use crate::id::EntityId;
use crate::metrics::Metrics;
use kurbo::{Point, Size, Vec2};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use smallvec::SmallVec;
use std::fmt;
use std::str::FromStr;

// ─── Colors ──────────────────────────────────────────────────────────────

/// RGBA color, 8 bits per channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

/// Helper to parse a single hex digit.
fn hex_val(c: u8) -> Option<u8> {
    match c {
        b'0'..=b'9' => Some(c - b'0'),
        b'a'..=b'f' => Some(c - b'a' + 10),
        b'A'..=b'F' => Some(c - b'A' + 10),
        _ => None,
    }
}

impl Color {
    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self::rgba(r, g, b, 255)
    }

    /// Default group color (`#3b82f6`).
    pub const BLUE: Color = Color::rgb(0x3b, 0x82, 0xf6);

    /// Parse a hex color string: `#RGB`, `#RGBA`, `#RRGGBB`, `#RRGGBBAA`.
    /// The string may optionally start with `#`.
    pub fn from_hex(hex: &str) -> Option<Self> {
        let hex = hex.strip_prefix('#').unwrap_or(hex);
        let bytes = hex.as_bytes();

        let short = |i: usize| hex_val(bytes[i]).map(|v| v * 17);
        let long = |i: usize| Some(hex_val(bytes[i])? << 4 | hex_val(bytes[i + 1])?);

        match bytes.len() {
            3 => Some(Self::rgb(short(0)?, short(1)?, short(2)?)),
            4 => Some(Self::rgba(short(0)?, short(1)?, short(2)?, short(3)?)),
            6 => Some(Self::rgb(long(0)?, long(2)?, long(4)?)),
            8 => Some(Self::rgba(long(0)?, long(2)?, long(4)?, long(6)?)),
            _ => None,
        }
    }

    /// Emit as `#rrggbb`, or `#rrggbbaa` when not fully opaque.
    pub fn to_hex(&self) -> String {
        if self.a == 255 {
            format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
        } else {
            format!("#{:02x}{:02x}{:02x}{:02x}", self.r, self.g, self.b, self.a)
        }
    }

    /// Same color with a different alpha channel.
    pub const fn with_alpha(self, a: u8) -> Self {
        Self { a, ..self }
    }
}

impl Default for Color {
    fn default() -> Self {
        Self::BLUE
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl FromStr for Color {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Color::from_hex(s.trim()).ok_or_else(|| format!("invalid color: {s:?}"))
    }
}

impl Serialize for Color {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Color {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

// ─── Companies ───────────────────────────────────────────────────────────

/// Which free-form feature list an operation targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeatureKind {
    Quantitative,
    Qualitative,
}

impl FeatureKind {
    pub fn as_str(self) -> &'static str {
        match self {
            FeatureKind::Quantitative => "quantitative",
            FeatureKind::Qualitative => "qualitative",
        }
    }
}

impl FromStr for FeatureKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "quantitative" => Ok(FeatureKind::Quantitative),
            "qualitative" => Ok(FeatureKind::Qualitative),
            other => Err(format!("unknown feature kind: {other:?}")),
        }
    }
}

/// A named free-form note attached to a company.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Feature {
    pub id: EntityId,
    pub name: String,
    pub value: String,
}

/// Feature lists are short; keep the first few inline.
pub type FeatureList = SmallVec<[Feature; 4]>;

/// A company node. `(x, y)` is the node's visual center.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Company {
    pub id: EntityId,
    pub name: String,
    pub x: f64,
    pub y: f64,
    #[serde(default = "Metrics::from_catalog")]
    pub metrics: Metrics,
    #[serde(default)]
    pub quantitative: FeatureList,
    #[serde(default)]
    pub qualitative: FeatureList,
}

impl Company {
    pub fn new(id: EntityId, name: impl Into<String>, x: f64, y: f64) -> Self {
        Self {
            id,
            name: name.into(),
            x,
            y,
            metrics: Metrics::from_catalog(),
            quantitative: FeatureList::new(),
            qualitative: FeatureList::new(),
        }
    }

    pub fn position(&self) -> Point {
        Point::new(self.x, self.y)
    }

    pub fn features_mut(&mut self, kind: FeatureKind) -> &mut FeatureList {
        match kind {
            FeatureKind::Quantitative => &mut self.quantitative,
            FeatureKind::Qualitative => &mut self.qualitative,
        }
    }
}

// ─── Groups ──────────────────────────────────────────────────────────────

/// Outline of a group region.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GroupShape {
    #[serde(rename = "rect", alias = "rectangle")]
    Rect,
    #[serde(rename = "circle", alias = "ellipse")]
    Ellipse,
}

impl FromStr for GroupShape {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "rect" | "rectangle" => Ok(GroupShape::Rect),
            "circle" | "ellipse" => Ok(GroupShape::Ellipse),
            other => Err(format!("unknown group shape: {other:?}")),
        }
    }
}

/// A labeled region annotation. `(x, y)` is the top-left corner.
///
/// Groups have no structural link to the companies drawn inside them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Group {
    pub id: EntityId,
    pub name: String,
    pub shape: GroupShape,
    pub color: Color,
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Group {
    pub fn position(&self) -> Point {
        Point::new(self.x, self.y)
    }

    pub fn size(&self) -> Size {
        Size::new(self.width, self.height)
    }
}

// ─── Arrows ──────────────────────────────────────────────────────────────

/// A directed relation between two companies.
///
/// Arrows carry no geometry; their path is derived from the endpoints each
/// time they are drawn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Arrow {
    pub id: EntityId,
    #[serde(rename = "fromId")]
    pub from: EntityId,
    #[serde(rename = "toId")]
    pub to: EntityId,
    /// Empty when the arrow is unlabeled.
    #[serde(default)]
    pub label: String,
}

impl Arrow {
    pub fn label(&self) -> Option<&str> {
        Some(self.label.as_str()).filter(|l| !l.is_empty())
    }

    pub fn touches(&self, id: EntityId) -> bool {
        self.from == id || self.to == id
    }
}

// ─── View transform ──────────────────────────────────────────────────────

/// Pan offset and zoom applied uniformly to every visual layer.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Transform {
    pub x: f64,
    pub y: f64,
    pub scale: f64,
}

impl Transform {
    pub const IDENTITY: Transform = Transform {
        x: 0.0,
        y: 0.0,
        scale: 1.0,
    };

    pub fn offset(&self) -> Vec2 {
        Vec2::new(self.x, self.y)
    }

    pub fn screen_to_canvas(&self, p: Point) -> Point {
        ((p - self.offset()).to_vec2() / self.scale).to_point()
    }

    pub fn canvas_to_screen(&self, p: Point) -> Point {
        (p.to_vec2() * self.scale + self.offset()).to_point()
    }

    /// A screen-space distance expressed in canvas units.
    pub fn screen_delta_to_canvas(&self, d: Vec2) -> Vec2 {
        d / self.scale
    }

    pub fn is_valid(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.scale.is_finite() && self.scale > 0.0
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

// ─── Persisted snapshot ──────────────────────────────────────────────────

/// The full persisted state, stored as one unit.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Snapshot {
    #[serde(default)]
    pub companies: Vec<Company>,
    #[serde(default)]
    pub groups: Vec<Group>,
    #[serde(default)]
    pub arrows: Vec<Arrow>,
    #[serde(default)]
    pub transform: Transform,
}
