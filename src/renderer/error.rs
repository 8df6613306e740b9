use thiserror::Error;

use crate::asset::{Handle, Shader};
use crate::renderer::gpu::RenderTargetId;

/// Conditions that abort a draw submission. They point at a setup bug rather
/// than missing data, so the frame driver surfaces them instead of skipping.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RenderError {
    #[error("render target {target:?} is not ready to be bound")]
    TargetNotReady { target: RenderTargetId },

    #[error("render target {target:?} was never allocated")]
    InvalidTarget { target: RenderTargetId },

    #[error("shader program {shader:?} failed to link: {reason}")]
    ProgramLink {
        shader: Handle<Shader>,
        reason: String,
    },
}
