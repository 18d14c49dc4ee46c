pub mod config;
pub mod geometry;
pub mod graph;
pub mod id;
pub mod metrics;
pub mod model;
pub mod persist;
pub mod store;

pub use config::{SpawnZone, StoreConfig};
pub use geometry::{ArrowMargins, ArrowSegment, NodeBox, project_arrow};
pub use id::{EntityId, IdSource, SequentialIds, UuidIds};
pub use metrics::{METRIC_CATALOG, MetricField, Metrics};
pub use model::*;
pub use persist::{BlobStore, Codec, FileStore, MemoryStore, PersistError};
pub use store::GraphStore;

// Re-export kurbo geometry types so downstream crates share one version
pub use kurbo::{Point, Rect, Size, Vec2};
