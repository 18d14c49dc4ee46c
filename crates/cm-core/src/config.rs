//! Store configuration.
//!
//! Every field has a default matching the shipped application, so hosts can
//! deserialize a partial JSON object and get sensible values for the rest.

use crate::persist::Codec;
use kurbo::{Point, Rect, Size};
use serde::{Deserialize, Serialize};

/// Rectangular region inside which new entities are placed at random.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SpawnZone {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl SpawnZone {
    pub const fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn rect(&self) -> Rect {
        Rect::from_origin_size(Point::new(self.x, self.y), Size::new(self.width, self.height))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Key under which the snapshot blob is stored.
    pub storage_key: String,
    pub codec: Codec,
    /// Where `add_company` drops new company centers.
    pub company_spawn: SpawnZone,
    /// Where `add_group` drops new group top-left corners.
    pub group_spawn: SpawnZone,
    pub group_size: (f64, f64),
    /// Lower bound enforced on every group resize.
    pub group_min_size: (f64, f64),
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            storage_key: "companyMapState".to_string(),
            codec: Codec::Json,
            company_spawn: SpawnZone::new(300.0, 200.0, 300.0, 300.0),
            group_spawn: SpawnZone::new(250.0, 150.0, 200.0, 200.0),
            group_size: (300.0, 250.0),
            group_min_size: (100.0, 80.0),
        }
    }
}

impl StoreConfig {
    pub fn group_min(&self) -> Size {
        Size::new(self.group_min_size.0, self.group_min_size.1)
    }

    /// Clamp a requested group size to the configured minimum.
    ///
    /// NaN requests collapse to the minimum as well.
    pub fn clamp_group_size(&self, width: f64, height: f64) -> Size {
        let min = self.group_min();
        Size::new(width.max(min.width), height.max(min.height))
    }
}
