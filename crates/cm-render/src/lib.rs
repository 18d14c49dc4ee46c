pub mod hit;
pub mod measure;
pub mod scene;

pub use hit::{HitTarget, hit_test};
pub use measure::{DEFAULT_NODE_HALF, LabelMetrics, NodeSizes};
pub use scene::{Overlay, RenderConfig, Scene, build_scene};
