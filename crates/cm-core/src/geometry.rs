//! Arrow endpoint projection.
//!
//! Arrows are drawn between node centers but trimmed so they start and end
//! on each node's visual boundary. Nodes are pill-shaped; their boundary is
//! approximated by the ellipse whose semi-axes are the node's half extents.
//! That is exact for ellipses and close enough for rounded rectangles.

use kurbo::{Point, Rect, Size, Vec2};
use serde::{Deserialize, Serialize};

/// Gap left between a node boundary and the arrow ends. The end margin is
/// larger to leave room for the arrowhead.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArrowMargins {
    pub start: f64,
    pub end: f64,
}

impl Default for ArrowMargins {
    fn default() -> Self {
        Self {
            start: 4.0,
            end: 6.0,
        }
    }
}

/// How a box's boundary is measured along a direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BoundaryShape {
    /// Ellipse inscribed in the box (used for company nodes).
    #[default]
    Ellipse,
    /// The box itself. Exact for rectangular outlines such as group shapes.
    Rect,
}

/// A node as seen by the arrow router: its center and half extents.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NodeBox {
    pub center: Point,
    pub half: Size,
    pub shape: BoundaryShape,
}

impl NodeBox {
    pub fn new(center: Point, half: Size) -> Self {
        Self {
            center,
            half,
            shape: BoundaryShape::Ellipse,
        }
    }

    pub fn with_shape(mut self, shape: BoundaryShape) -> Self {
        self.shape = shape;
        self
    }

    pub fn rect(&self) -> Rect {
        Rect::from_center_size(self.center, self.half * 2.0)
    }

    /// Distance from the center to the boundary along unit vector `u`.
    pub fn boundary_offset(&self, u: Vec2) -> f64 {
        match self.shape {
            BoundaryShape::Ellipse => ellipse_offset(self.half, u),
            BoundaryShape::Rect => rect_offset(self.half, u),
        }
    }
}

/// `sqrt((hw·ux)² + (hh·uy)²)`.
pub fn ellipse_offset(half: Size, u: Vec2) -> f64 {
    (half.width * u.x).hypot(half.height * u.y)
}

/// Exact distance from a rectangle's center to its edge along `u`.
pub fn rect_offset(half: Size, u: Vec2) -> f64 {
    let tx = if u.x.abs() > f64::EPSILON {
        half.width / u.x.abs()
    } else {
        f64::INFINITY
    };
    let ty = if u.y.abs() > f64::EPSILON {
        half.height / u.y.abs()
    } else {
        f64::INFINITY
    };
    let t = tx.min(ty);
    if t.is_finite() { t } else { 0.0 }
}

/// A trimmed, drawable arrow segment.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ArrowSegment {
    pub start: Point,
    pub end: Point,
    /// Unit direction from source to target.
    pub direction: Vec2,
}

impl ArrowSegment {
    pub fn midpoint(&self) -> Point {
        self.start.midpoint(self.end)
    }
}

/// Trim the center-to-center segment between two nodes to their boundaries.
///
/// Returns `None` when the centers coincide (or are not finite), in which
/// case the arrow must not be drawn.
pub fn project_arrow(from: &NodeBox, to: &NodeBox, margins: ArrowMargins) -> Option<ArrowSegment> {
    let d = to.center - from.center;
    let dist = d.hypot();
    if dist == 0.0 || !dist.is_finite() {
        return None;
    }
    let u = d / dist;

    let start_offset = from.boundary_offset(u) + margins.start;
    let end_offset = to.boundary_offset(u) + margins.end;

    Some(ArrowSegment {
        start: from.center + u * start_offset,
        end: to.center - u * end_offset,
        direction: u,
    })
}

/// Where the label and the delete control of an arrow sit.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LabelPlacement {
    pub midpoint: Point,
    /// Background box of the label, centered on the midpoint.
    pub label_box: Option<Rect>,
    pub delete_at: Point,
}

/// Place an arrow's label box and delete control.
///
/// Without a label the delete control sits on the midpoint; with one it is
/// pushed along the arrow past the label's half width plus `gap`.
pub fn label_placement(segment: &ArrowSegment, label_size: Option<Size>, gap: f64) -> LabelPlacement {
    let midpoint = segment.midpoint();
    match label_size {
        Some(size) => LabelPlacement {
            midpoint,
            label_box: Some(Rect::from_center_size(midpoint, size)),
            delete_at: midpoint + segment.direction * (size.width / 2.0 + gap),
        },
        None => LabelPlacement {
            midpoint,
            label_box: None,
            delete_at: midpoint,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-9;

    fn node(x: f64, y: f64) -> NodeBox {
        NodeBox::new(Point::new(x, y), Size::new(40.0, 16.0))
    }

    #[test]
    fn horizontal_arrow_is_trimmed_on_both_ends() {
        let seg = project_arrow(&node(0.0, 0.0), &node(100.0, 0.0), ArrowMargins::default())
            .expect("segment");
        assert_eq!(seg.start.y, seg.end.y);
        assert!(seg.start.x > 0.0);
        assert!(seg.start.x < seg.end.x);
        assert!(seg.end.x < 100.0);
        assert!((seg.start.x - 44.0).abs() < EPS);
        assert!((seg.end.x - 54.0).abs() < EPS);
    }

    #[test]
    fn coincident_nodes_produce_no_segment() {
        assert!(project_arrow(&node(5.0, 5.0), &node(5.0, 5.0), ArrowMargins::default()).is_none());
    }

    #[test]
    fn vertical_arrow_uses_half_height() {
        let seg = project_arrow(&node(0.0, 0.0), &node(0.0, 200.0), ArrowMargins::default())
            .unwrap();
        assert!((seg.start.y - 20.0).abs() < EPS);
        assert!((seg.end.y - 178.0).abs() < EPS);
        assert!(seg.start.x.abs() < EPS);
    }

    #[test]
    fn diagonal_offset_matches_ellipse_formula() {
        let u = Vec2::new(3.0, 4.0) / 5.0;
        let expected = ((40.0_f64 * 0.6).powi(2) + (16.0_f64 * 0.8).powi(2)).sqrt();
        assert!((ellipse_offset(Size::new(40.0, 16.0), u) - expected).abs() < EPS);
    }

    #[test]
    fn rect_offset_hits_the_nearest_edge() {
        let half = Size::new(40.0, 16.0);
        assert!((rect_offset(half, Vec2::new(1.0, 0.0)) - 40.0).abs() < EPS);
        assert!((rect_offset(half, Vec2::new(0.0, -1.0)) - 16.0).abs() < EPS);
        let diag = Vec2::new(1.0, 1.0) / 2.0_f64.sqrt();
        assert!((rect_offset(half, diag) - 16.0 * 2.0_f64.sqrt()).abs() < EPS);
    }

    #[test]
    fn delete_control_follows_the_arrow_direction() {
        let seg = project_arrow(&node(0.0, 0.0), &node(0.0, 300.0), ArrowMargins::default())
            .unwrap();
        let plain = label_placement(&seg, None, 14.0);
        assert_eq!(plain.delete_at, plain.midpoint);

        let labeled = label_placement(&seg, Some(Size::new(60.0, 22.0)), 14.0);
        let offset = labeled.delete_at - labeled.midpoint;
        assert!(offset.x.abs() < EPS);
        assert!((offset.y - 44.0).abs() < EPS);
        assert_eq!(labeled.label_box.unwrap().center(), labeled.midpoint);
    }
}
