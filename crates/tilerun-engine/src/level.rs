//! Level descriptor: spawn geometry and object properties, in pixels.
//!
//! Parsing a map file into this shape is the frontend's job; the engine only
//! consumes the descriptor. Layers are keyed by name so a descriptor can be
//! written by hand:
//!
//! ```
//! use tilerun_engine::level::LevelDescriptor;
//!
//! let json = r#"{
//!     "layers": {
//!         "ground": [{ "shape": { "type": "rectangle", "x": 0, "y": 0, "width": 320, "height": 16 } }],
//!         "objects": [], "bricks": [], "coins": [], "walkers": [], "shelled": []
//!     }
//! }"#;
//! let level = LevelDescriptor::from_json(json).unwrap();
//! assert_eq!(level.layer("ground").unwrap().len(), 1);
//! ```

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::physics::{px, Position};

/// Layer holding static ground rectangles.
pub const GROUND_LAYER: &str = "ground";
/// Layer holding solid objects (pipes).
pub const OBJECTS_LAYER: &str = "objects";
pub const BRICKS_LAYER: &str = "bricks";
pub const COINS_LAYER: &str = "coins";
/// Layer holding walker spawn rectangles.
pub const WALKERS_LAYER: &str = "walkers";
/// Layer holding shelled-enemy spawn rectangles.
pub const SHELLED_LAYER: &str = "shelled";

/// Every layer a descriptor must define (possibly empty).
pub const REQUIRED_LAYERS: [&str; 6] = [
    GROUND_LAYER,
    OBJECTS_LAYER,
    BRICKS_LAYER,
    COINS_LAYER,
    WALKERS_LAYER,
    SHELLED_LAYER,
];

/// Player spawn used when the descriptor names none, in pixels.
pub const DEFAULT_PLAYER_SPAWN: PixelPoint = PixelPoint { x: 120.0, y: 32.0 };

/// Errors reading a level descriptor.
#[derive(Debug, thiserror::Error)]
pub enum LevelError {
    #[error("malformed level JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// A point in level pixels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PixelPoint {
    pub x: f32,
    pub y: f32,
}

impl PixelPoint {
    pub fn to_metres(self) -> Position {
        Position::new(px(self.x), px(self.y))
    }
}

/// Geometry of a map object. Only rectangles are buildable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum MapShape {
    /// Axis-aligned rectangle; `(x, y)` is the bottom-left corner.
    Rectangle {
        x: f32,
        y: f32,
        width: f32,
        height: f32,
    },
    Ellipse {
        x: f32,
        y: f32,
        width: f32,
        height: f32,
    },
    Polyline { points: Vec<PixelPoint> },
}

impl MapShape {
    /// Short name used in diagnostics.
    pub fn kind_name(&self) -> &'static str {
        match self {
            MapShape::Rectangle { .. } => "rectangle",
            MapShape::Ellipse { .. } => "ellipse",
            MapShape::Polyline { .. } => "polyline",
        }
    }
}

/// One object on a layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MapObject {
    pub shape: MapShape,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub properties: BTreeMap<String, String>,
}

impl MapObject {
    /// A rectangle object without properties.
    pub fn rect(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            shape: MapShape::Rectangle {
                x,
                y,
                width,
                height,
            },
            properties: BTreeMap::new(),
        }
    }

    pub fn with_property(mut self, key: &str, value: &str) -> Self {
        self.properties.insert(key.to_owned(), value.to_owned());
        self
    }

    pub fn property(&self, key: &str) -> Option<&str> {
        self.properties.get(key).map(String::as_str)
    }
}

/// A graphic tile placed on the map.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TilePlacement {
    pub column: i32,
    pub row: i32,
    pub id: u32,
}

/// Everything the world builder needs to populate a level.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LevelDescriptor {
    #[serde(default)]
    pub player_spawn: Option<PixelPoint>,
    pub layers: BTreeMap<String, Vec<MapObject>>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tiles: Vec<TilePlacement>,
}

impl LevelDescriptor {
    /// A descriptor with every required layer present and empty.
    pub fn empty() -> Self {
        Self {
            player_spawn: None,
            layers: REQUIRED_LAYERS
                .iter()
                .map(|name| ((*name).to_owned(), Vec::new()))
                .collect(),
            tiles: Vec::new(),
        }
    }

    pub fn from_json(json: &str) -> Result<Self, LevelError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json(&self) -> Result<String, LevelError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn layer(&self, name: &str) -> Option<&[MapObject]> {
        self.layers.get(name).map(Vec::as_slice)
    }

    /// Append an object to a layer, creating the layer if needed.
    pub fn push(&mut self, layer: &str, object: MapObject) -> &mut Self {
        self.layers.entry(layer.to_owned()).or_default().push(object);
        self
    }

    pub fn player_spawn(&self) -> PixelPoint {
        self.player_spawn.unwrap_or(DEFAULT_PLAYER_SPAWN)
    }
}
