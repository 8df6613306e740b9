pub mod camera;
pub mod hierarchy;
pub mod light;
pub mod probe;
pub mod transform;
pub mod visual;

pub use camera::{Camera, ClearPolicy, PostEffect};
pub use hierarchy::{FlatHierarchy, Hierarchy, NodeId, SceneTree};
pub use light::{Light, LightKind};
pub use probe::{CubeFace, ReflectionProbe};
pub use transform::Transform;
pub use visual::{Visual, VisualFlags};
