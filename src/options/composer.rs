use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::gpu::texture::PixelType;

/// How a [`Composer`](crate::renderer::composer::Composer) allocates its
/// buffers and wires its passes.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, JsonSchema)]
#[schemars(title = "Composer", inline)]
#[serde(default)]
pub struct ComposerOptions {
    /// Storage type of the ping-pong buffers.
    #[schemars(title = "Frame Buffer Type")]
    pub frame_buffer_type: PixelType,
    /// Whether the frame carries meaningful alpha. Passed to every pass on
    /// initialization.
    #[schemars(title = "Alpha")]
    pub alpha: bool,
    /// Give the buffers a depth attachment.
    #[schemars(title = "Depth Buffer")]
    pub depth_buffer: bool,
    /// Give the buffers a stencil attachment.
    #[schemars(title = "Stencil Buffer")]
    pub stencil_buffer: bool,
    /// Keep the last pass in the list drawing to the screen.
    #[schemars(title = "Auto Render To Screen")]
    pub auto_render_to_screen: bool,
}

impl Default for ComposerOptions {
    fn default() -> Self {
        Self {
            frame_buffer_type: PixelType::UnsignedByte,
            alpha: true,
            depth_buffer: true,
            stencil_buffer: false,
            auto_render_to_screen: true,
        }
    }
}
