//! Hit testing: canvas point → scene element.
//!
//! Walks the scene front-to-back. Arrow controls sit above the nodes, nodes
//! sit above the group layer, and within the group layer each group's
//! buttons win over its body.

use crate::scene::Scene;
use cm_core::id::EntityId;
use kurbo::Point;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HitTarget {
    Background,
    Company(EntityId),
    Group(EntityId),
    GroupResize(EntityId),
    GroupDelete(EntityId),
    ArrowDelete(EntityId),
}

/// Find the topmost element at canvas-space point `p`.
pub fn hit_test(scene: &Scene, p: Point) -> HitTarget {
    // Arrows painted later are on top.
    for arrow in scene.arrows.iter().rev() {
        if arrow.delete_center().distance(p) <= arrow.delete_radius {
            return HitTarget::ArrowDelete(arrow.id);
        }
    }

    // The raised node is drawn above everything else in its layer.
    if let Some(node) = scene.nodes.iter().find(|n| n.raised)
        && node.rect().contains(p)
    {
        return HitTarget::Company(node.id);
    }
    if let Some(node) = scene.nodes.iter().rev().find(|n| n.rect().contains(p)) {
        return HitTarget::Company(node.id);
    }

    for group in scene.groups.iter().rev() {
        if group.delete_button().contains(p) {
            return HitTarget::GroupDelete(group.id);
        }
        if group.resize_handle().contains(p) {
            return HitTarget::GroupResize(group.id);
        }
        if group.body_contains(p) {
            return HitTarget::Group(group.id);
        }
    }

    HitTarget::Background
}
