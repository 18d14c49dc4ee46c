//! Size estimates for things the host draws but the core must reason about.
//!
//! Label text is never laid out by the core. Widths are approximated from
//! the character count, which matches what the browser renders at the
//! default label font closely enough for placing the delete control.

use cm_core::id::EntityId;
use kurbo::Size;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Half extents assumed for a company node the host has not measured yet.
pub const DEFAULT_NODE_HALF: Size = Size::new(40.0, 16.0);

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LabelMetrics {
    /// Average advance of one character.
    pub char_width: f64,
    /// Horizontal padding added around the text.
    pub padding: f64,
    pub height: f64,
    /// Space between the label's edge and the arrow's delete control.
    pub delete_gap: f64,
    pub delete_radius: f64,
}

impl Default for LabelMetrics {
    fn default() -> Self {
        Self {
            char_width: 6.5,
            padding: 16.0,
            height: 22.0,
            delete_gap: 14.0,
            delete_radius: 9.0,
        }
    }
}

impl LabelMetrics {
    /// Box size of a label, or `None` for an empty label.
    pub fn label_size(&self, text: &str) -> Option<Size> {
        if text.is_empty() {
            return None;
        }
        let chars = text.chars().count() as f64;
        Some(Size::new(chars * self.char_width + self.padding, self.height))
    }
}

/// Host-measured node sizes, keyed by company id.
///
/// Stores half extents. Nodes without an entry fall back to
/// [`DEFAULT_NODE_HALF`].
#[derive(Debug, Clone, Default)]
pub struct NodeSizes {
    half: HashMap<EntityId, Size>,
}

impl NodeSizes {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a node's full rendered size. Non-positive or non-finite sizes
    /// are ignored.
    pub fn set(&mut self, id: EntityId, width: f64, height: f64) {
        let valid = |v: f64| v.is_finite() && v > 0.0;
        if valid(width) && valid(height) {
            self.half.insert(id, Size::new(width / 2.0, height / 2.0));
        }
    }

    pub fn remove(&mut self, id: EntityId) {
        self.half.remove(&id);
    }

    pub fn half_extents(&self, id: EntityId) -> Size {
        self.half.get(&id).copied().unwrap_or(DEFAULT_NODE_HALF)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn label_width_tracks_character_count() {
        let m = LabelMetrics::default();
        assert_eq!(m.label_size(""), None);
        assert_eq!(m.label_size("supplier"), Some(Size::new(8.0 * 6.5 + 16.0, 22.0)));
        // Counted in chars, not bytes.
        assert_eq!(m.label_size("über"), Some(Size::new(4.0 * 6.5 + 16.0, 22.0)));
    }

    #[test]
    fn unmeasured_nodes_use_default_half_extents() {
        let mut sizes = NodeSizes::new();
        let id = EntityId::intern("comp-1");
        assert_eq!(sizes.half_extents(id), DEFAULT_NODE_HALF);

        sizes.set(id, 120.0, 40.0);
        assert_eq!(sizes.half_extents(id), Size::new(60.0, 20.0));

        sizes.set(id, 0.0, f64::NAN);
        assert_eq!(sizes.half_extents(id), Size::new(60.0, 20.0));

        sizes.remove(id);
        assert_eq!(sizes.half_extents(id), DEFAULT_NODE_HALF);
    }
}
