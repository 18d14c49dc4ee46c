//! Render packet: everything the host needs to draw one frame.
//!
//! The scene is derived from the store on demand and owns no state of its
//! own. Nodes, group shapes and arrows share a single layer transform so
//! the three layers stay coincident under pan and zoom.

use crate::measure::{LabelMetrics, NodeSizes};
use cm_core::geometry::{ArrowMargins, NodeBox, label_placement, project_arrow};
use cm_core::id::EntityId;
use cm_core::model::{Color, GroupShape, Transform};
use cm_core::store::GraphStore;
use kurbo::{Ellipse, Point, Rect, Shape, Size};
use log::trace;
use serde::{Deserialize, Serialize};

/// Side of the square resize grip in a group's bottom-right corner.
pub const RESIZE_HANDLE: f64 = 16.0;
/// Side of the square delete button in a group's top-right corner.
pub const GROUP_DELETE_SIZE: f64 = 20.0;
/// Distance from the group's top and right edges to the delete button.
pub const GROUP_DELETE_INSET: f64 = 6.0;

/// Alpha applied to a group's color for its border (`80`) and fill (`0F`).
const GROUP_BORDER_ALPHA: u8 = 0x80;
const GROUP_FILL_ALPHA: u8 = 0x0f;

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    pub arrows: ArrowMargins,
    pub labels: LabelMetrics,
}

/// Controller state that changes how nodes are drawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Overlay {
    /// Picked arrow source while linking.
    pub arrow_source: Option<EntityId>,
    /// Node lifted above the others while it is dragged.
    pub raised: Option<EntityId>,
}

// ─── Views ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LayerTransform {
    pub x: f64,
    pub y: f64,
    pub scale: f64,
    /// CSS `transform` value applied to every layer.
    pub css: String,
}

impl From<Transform> for LayerTransform {
    fn from(t: Transform) -> Self {
        Self {
            x: t.x,
            y: t.y,
            scale: t.scale,
            css: format!("translate({}px, {}px) scale({})", t.x, t.y, t.scale),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupView {
    pub id: EntityId,
    pub name: String,
    pub shape: GroupShape,
    pub color: Color,
    pub border_color: Color,
    pub fill_color: Color,
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl GroupView {
    pub fn rect(&self) -> Rect {
        Rect::new(self.x, self.y, self.x + self.width, self.y + self.height)
    }

    pub fn resize_handle(&self) -> Rect {
        let r = self.rect();
        Rect::new(r.x1 - RESIZE_HANDLE, r.y1 - RESIZE_HANDLE, r.x1, r.y1)
    }

    pub fn delete_button(&self) -> Rect {
        let r = self.rect();
        let x1 = r.x1 - GROUP_DELETE_INSET;
        let y0 = r.y0 + GROUP_DELETE_INSET;
        Rect::new(x1 - GROUP_DELETE_SIZE, y0, x1, y0 + GROUP_DELETE_SIZE)
    }

    /// Whether `p` falls inside the drawn outline.
    pub fn body_contains(&self, p: Point) -> bool {
        match self.shape {
            GroupShape::Rect => self.rect().contains(p),
            GroupShape::Ellipse => Ellipse::from_rect(self.rect()).contains(p),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeView {
    pub id: EntityId,
    pub name: String,
    /// Center in canvas space.
    pub x: f64,
    pub y: f64,
    pub half_width: f64,
    pub half_height: f64,
    pub selected: bool,
    pub arrow_source: bool,
    pub raised: bool,
}

impl NodeView {
    pub fn rect(&self) -> Rect {
        Rect::from_center_size(
            Point::new(self.x, self.y),
            Size::new(self.half_width * 2.0, self.half_height * 2.0),
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LabelBox {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl From<Rect> for LabelBox {
    fn from(r: Rect) -> Self {
        Self {
            x: r.x0,
            y: r.y0,
            width: r.width(),
            height: r.height(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ArrowView {
    pub id: EntityId,
    pub from: EntityId,
    pub to: EntityId,
    pub x1: f64,
    pub y1: f64,
    pub x2: f64,
    pub y2: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label_box: Option<LabelBox>,
    pub delete_x: f64,
    pub delete_y: f64,
    pub delete_radius: f64,
}

impl ArrowView {
    pub fn delete_center(&self) -> Point {
        Point::new(self.delete_x, self.delete_y)
    }
}

/// One frame's worth of derived visuals, in paint order (back to front).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Scene {
    pub transform: LayerTransform,
    pub groups: Vec<GroupView>,
    pub nodes: Vec<NodeView>,
    pub arrows: Vec<ArrowView>,
}

impl Scene {
    pub fn node(&self, id: EntityId) -> Option<&NodeView> {
        self.nodes.iter().find(|n| n.id == id)
    }

    pub fn group(&self, id: EntityId) -> Option<&GroupView> {
        self.groups.iter().find(|g| g.id == id)
    }

    pub fn arrow(&self, id: EntityId) -> Option<&ArrowView> {
        self.arrows.iter().find(|a| a.id == id)
    }
}

// ─── Derivation ──────────────────────────────────────────────────────────

pub fn build_scene(
    store: &GraphStore,
    sizes: &NodeSizes,
    overlay: &Overlay,
    config: &RenderConfig,
) -> Scene {
    let selected = store.selected();

    let groups = store
        .groups()
        .iter()
        .map(|g| GroupView {
            id: g.id,
            name: g.name.clone(),
            shape: g.shape,
            color: g.color,
            border_color: g.color.with_alpha(GROUP_BORDER_ALPHA),
            fill_color: g.color.with_alpha(GROUP_FILL_ALPHA),
            x: g.x,
            y: g.y,
            width: g.width,
            height: g.height,
        })
        .collect();

    let nodes = store
        .companies()
        .map(|c| {
            let half = sizes.half_extents(c.id);
            NodeView {
                id: c.id,
                name: c.name.clone(),
                x: c.x,
                y: c.y,
                half_width: half.width,
                half_height: half.height,
                selected: selected == Some(c.id),
                arrow_source: overlay.arrow_source == Some(c.id),
                raised: overlay.raised == Some(c.id),
            }
        })
        .collect();

    let mut arrows = Vec::with_capacity(store.arrow_count());
    for arrow in store.arrows() {
        let (Some(from), Some(to)) = (store.company(arrow.from), store.company(arrow.to)) else {
            trace!("arrow {} has a missing endpoint, skipped", arrow.id);
            continue;
        };
        let from_box = NodeBox::new(from.position(), sizes.half_extents(from.id));
        let to_box = NodeBox::new(to.position(), sizes.half_extents(to.id));
        let Some(segment) = project_arrow(&from_box, &to_box, config.arrows) else {
            trace!("arrow {} is degenerate, skipped", arrow.id);
            continue;
        };
        let label = arrow.label();
        let placement = label_placement(
            &segment,
            label.and_then(|l| config.labels.label_size(l)),
            config.labels.delete_gap,
        );
        arrows.push(ArrowView {
            id: arrow.id,
            from: arrow.from,
            to: arrow.to,
            x1: segment.start.x,
            y1: segment.start.y,
            x2: segment.end.x,
            y2: segment.end.y,
            label: label.map(str::to_string),
            label_box: placement.label_box.map(LabelBox::from),
            delete_x: placement.delete_at.x,
            delete_y: placement.delete_at.y,
            delete_radius: config.labels.delete_radius,
        });
    }

    Scene {
        transform: store.transform().into(),
        groups,
        nodes,
        arrows,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cm_core::config::StoreConfig;
    use cm_core::id::SequentialIds;
    use cm_core::persist::MemoryStore;
    use pretty_assertions::assert_eq;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn seeded() -> GraphStore {
        GraphStore::open_with(
            Box::new(MemoryStore::new()),
            StoreConfig::default(),
            Box::new(SequentialIds::new()),
            StdRng::seed_from_u64(1),
        )
    }

    fn id(s: &str) -> EntityId {
        EntityId::intern(s)
    }

    #[test]
    fn nodes_follow_store_order_and_flags() {
        let mut store = seeded();
        store.select(id("comp-2"));
        let overlay = Overlay {
            arrow_source: Some(id("comp-3")),
            raised: Some(id("comp-2")),
        };
        let scene = build_scene(&store, &NodeSizes::new(), &overlay, &RenderConfig::default());

        let names: Vec<&str> = scene.nodes.iter().map(|n| n.name.as_str()).collect();
        assert_eq!(names, vec!["DeepMind", "OpenAI", "Anthropic"]);
        let openai = scene.node(id("comp-2")).unwrap();
        assert!(openai.selected && openai.raised && !openai.arrow_source);
        assert!(scene.node(id("comp-3")).unwrap().arrow_source);
        assert_eq!(openai.half_width, 40.0);
    }

    #[test]
    fn arrows_are_trimmed_and_labeled() {
        let mut store = seeded();
        let arrow = store.add_arrow(id("comp-1"), id("comp-2"), "supplier").unwrap();
        let scene = build_scene(
            &store,
            &NodeSizes::new(),
            &Overlay::default(),
            &RenderConfig::default(),
        );
        let view = scene.arrow(arrow.id).unwrap();
        assert!(view.x1 > 300.0 && view.x2 < 600.0);
        let label = view.label_box.unwrap();
        assert_eq!(label.width, 8.0 * 6.5 + 16.0);
        assert_eq!(label.height, 22.0);
        let mid = Point::new((view.x1 + view.x2) / 2.0, (view.y1 + view.y2) / 2.0);
        let gap = view.delete_center().distance(mid);
        assert!((gap - (label.width / 2.0 + 14.0)).abs() < 1e-9);
    }

    #[test]
    fn coincident_endpoints_drop_the_arrow() {
        let mut store = seeded();
        store.add_arrow(id("comp-1"), id("comp-2"), "").unwrap();
        store.update_company_position(id("comp-2"), 300.0, 200.0);
        let scene = build_scene(
            &store,
            &NodeSizes::new(),
            &Overlay::default(),
            &RenderConfig::default(),
        );
        assert!(scene.arrows.is_empty());
    }

    #[test]
    fn measured_sizes_change_the_trim() {
        let mut store = seeded();
        store.update_company_position(id("comp-2"), 600.0, 200.0);
        let arrow = store.add_arrow(id("comp-1"), id("comp-2"), "").unwrap();
        let mut sizes = NodeSizes::new();
        sizes.set(id("comp-1"), 200.0, 40.0);
        let scene = build_scene(&store, &sizes, &Overlay::default(), &RenderConfig::default());
        let view = scene.arrow(arrow.id).unwrap();
        assert_eq!(view.x1, 300.0 + 100.0 + 4.0);
        assert_eq!(view.x2, 600.0 - 40.0 - 6.0);
        assert_eq!(view.label, None);
    }

    #[test]
    fn transform_is_shared_css() {
        let mut store = seeded();
        store.set_transform(Transform {
            x: 12.0,
            y: -4.5,
            scale: 2.0,
        });
        let scene = build_scene(
            &store,
            &NodeSizes::new(),
            &Overlay::default(),
            &RenderConfig::default(),
        );
        assert_eq!(scene.transform.css, "translate(12px, -4.5px) scale(2)");
    }

    #[test]
    fn group_chrome_positions() {
        let mut store = seeded();
        let g = store.add_group("EU", GroupShape::Rect, Color::BLUE);
        store.update_group_position(g.id, 0.0, 0.0);
        let scene = build_scene(
            &store,
            &NodeSizes::new(),
            &Overlay::default(),
            &RenderConfig::default(),
        );
        let view = scene.group(g.id).unwrap();
        assert_eq!(view.resize_handle(), Rect::new(284.0, 234.0, 300.0, 250.0));
        assert_eq!(view.delete_button(), Rect::new(274.0, 6.0, 294.0, 26.0));
        assert_eq!(view.border_color.to_hex(), "#3b82f680");
        assert_eq!(view.fill_color.to_hex(), "#3b82f60f");
    }

    #[test]
    fn scene_serializes_camel_case() {
        let mut store = seeded();
        store.add_arrow(id("comp-1"), id("comp-3"), "").unwrap();
        let scene = build_scene(
            &store,
            &NodeSizes::new(),
            &Overlay::default(),
            &RenderConfig::default(),
        );
        let json = serde_json::to_value(&scene).unwrap();
        assert_eq!(json["nodes"][0]["halfWidth"], 40.0);
        assert_eq!(json["arrows"][0]["from"], "comp-1");
        assert!(json["arrows"][0].get("labelBox").is_none());
    }
}
