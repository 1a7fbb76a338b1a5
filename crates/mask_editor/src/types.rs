use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString, IntoStaticStr, VariantNames};

/// A position in raster pixel space of the working canvas.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize, JsonSchema)]
pub struct CanvasPoint {
    pub x: f32,
    pub y: f32,
}

impl CanvasPoint {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn distance(&self, other: &CanvasPoint) -> f32 {
        let dx = other.x - self.x;
        let dy = other.y - self.y;
        (dx * dx + dy * dy).sqrt()
    }

    /// Linear interpolation towards `other`, `t` in `[0, 1]`.
    pub fn lerp(&self, other: &CanvasPoint, t: f32) -> CanvasPoint {
        CanvasPoint {
            x: self.x + (other.x - self.x) * t,
            y: self.y + (other.y - self.y) * t,
        }
    }

    /// Index of the pixel containing this point.
    pub fn pixel(&self) -> (i64, i64) {
        (self.x.floor() as i64, self.y.floor() as i64)
    }
}

/// A position in screen (rendered element) pixels.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize, JsonSchema)]
pub struct ScreenPoint {
    pub x: f32,
    pub y: f32,
}

impl ScreenPoint {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn midpoint(&self, other: &ScreenPoint) -> ScreenPoint {
        ScreenPoint {
            x: (self.x + other.x) / 2.0,
            y: (self.y + other.y) / 2.0,
        }
    }

    pub fn distance(&self, other: &ScreenPoint) -> f32 {
        let dx = other.x - self.x;
        let dy = other.y - self.y;
        (dx * dx + dy * dy).sqrt()
    }
}

/// Axis-aligned rectangle in canvas space.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct CanvasRect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl CanvasRect {
    /// Bounding rectangle of two opposite corners, in any order.
    pub fn from_corners(a: CanvasPoint, b: CanvasPoint) -> Self {
        Self {
            x: a.x.min(b.x),
            y: a.y.min(b.y),
            width: (a.x - b.x).abs(),
            height: (a.y - b.y).abs(),
        }
    }

    pub fn is_empty(&self) -> bool {
        !(self.width > 0.0 && self.height > 0.0)
    }

    pub fn right(&self) -> f32 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f32 {
        self.y + self.height
    }
}

/// Operation polarity: paint back from the original, or make transparent.
#[derive(
    Debug, Clone, Copy, Default,
    Serialize, Deserialize, JsonSchema,
    Display, EnumString, EnumIter, VariantNames, IntoStaticStr,
    PartialEq, Eq
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum BrushMode {
    #[default]
    Restore,
    Erase,
}

#[derive(
    Debug, Clone, Copy, Default,
    Serialize, Deserialize, JsonSchema,
    Display, EnumString, EnumIter, VariantNames, IntoStaticStr,
    PartialEq, Eq, Hash
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ToolKind {
    /// Circular brush, optionally color-constrained
    #[default]
    Brush,
    /// Flood fill from a single click
    Wand,
    /// Click-to-click polygon selection
    Lasso,
    /// Drag-out rectangle selection
    Rectangle,
    /// Viewport panning, never touches pixels
    Pan,
}

impl ToolKind {
    /// Whether this tool mutates the working canvas.
    pub fn is_raster_tool(&self) -> bool {
        !matches!(self, ToolKind::Pan)
    }
}

/// Cosmetic backdrop behind transparent pixels. Never affects raster data.
#[derive(
    Debug, Clone, Copy, Default,
    Serialize, Deserialize, JsonSchema,
    Display, EnumString, EnumIter, VariantNames, IntoStaticStr,
    PartialEq, Eq
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum BackgroundStyle {
    #[default]
    Checkerboard,
    Light,
    Dark,
}

/// Keyboard modifiers held during a pointer, wheel or key event.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct Modifiers {
    /// Ctrl on Linux/Windows, Cmd on macOS
    pub command: bool,
    pub shift: bool,
    pub alt: bool,
    /// Space bar held, switches any tool to temporary panning
    pub space: bool,
}

impl Modifiers {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn command() -> Self {
        Self { command: true, ..Self::default() }
    }

    pub fn space() -> Self {
        Self { space: true, ..Self::default() }
    }
}

/// The item whose image is being edited; handed to the save callback.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EditSubject {
    /// An item in a user's wardrobe
    Wardrobe { item_id: String },
    /// An image attached to a catalog SKU
    Catalog { sku_id: String, image_id: String },
}

impl EditSubject {
    pub fn id(&self) -> &str {
        match self {
            EditSubject::Wardrobe { item_id } => item_id,
            EditSubject::Catalog { image_id, .. } => image_id,
        }
    }
}
