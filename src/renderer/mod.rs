pub mod bounds;
pub mod buckets;
pub mod cascades;
pub mod context;
pub mod culling;
pub mod error;
pub mod frustum;
pub mod gpu;
pub mod lights;
pub mod material;
pub mod pool;
pub mod probes;
pub mod recording;
#[allow(clippy::module_inception)]
pub mod renderer;
pub mod skinning;
mod submit;

pub use bounds::Aabb;
pub use buckets::{BucketPools, DrawKey, Insertion, RenderPassDefinition, SkipReason};
pub use cascades::{compute_cascade_transform, fit_cascade, CascadeTransform};
pub use context::RenderContext;
pub use culling::test_visible;
pub use error::RenderError;
pub use frustum::{Containment, Frustum};
pub use gpu::{
    GpuBackend, GpuCapabilities, ReflectionSource, RenderTargetDesc, RenderTargetId,
    RenderTargetKind, TextureId, UniformValue,
};
pub use material::{
    BlendMode, CullMode, Material, ParamValue, PipelineState, RenderPassKind, ShadingVariant,
    StateBucketId,
};
pub use probes::{resolve_reflection, select_probe, traverse_cameras};
pub use recording::{GpuCommand, RecordedUniform, RecordingBackend};
pub use renderer::{
    FrameHooks, FrameInput, FrameReport, FrameState, NoHooks, Renderer, RendererStats,
};
