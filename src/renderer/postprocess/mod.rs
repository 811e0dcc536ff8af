//! Post-processing passes.
//!
//! Every pass implements [`Pass`]. The composer stores them as [`AnyPass`],
//! a closed set of the passes this crate ships.

pub mod copy;
pub mod pixelation;
pub mod screen_pass;
pub mod shader_pass;

use crate::error::PostFxError;
use crate::gpu::render_context::RendererCaps;
use crate::gpu::renderer::Renderer;
use crate::gpu::texture::{PixelType, RenderTarget};

pub use copy::CopyPass;
pub use pixelation::PixelationPass;
pub use screen_pass::{Pass, PassBase};
pub use shader_pass::ShaderPass;

/// Any pass a composer can run.
pub enum AnyPass {
    /// A generic fullscreen material.
    Shader(ShaderPass),
    /// A snapshot into an owned target.
    Copy(CopyPass),
    /// Pixelation.
    Pixelation(PixelationPass),
}

impl AnyPass {
    fn inner(&self) -> &dyn Pass {
        match self {
            Self::Shader(pass) => pass,
            Self::Copy(pass) => pass,
            Self::Pixelation(pass) => pass,
        }
    }

    fn inner_mut(&mut self) -> &mut dyn Pass {
        match self {
            Self::Shader(pass) => pass,
            Self::Copy(pass) => pass,
            Self::Pixelation(pass) => pass,
        }
    }

    /// The copy pass, if this is one.
    pub fn as_copy(&self) -> Option<&CopyPass> {
        match self {
            Self::Copy(pass) => Some(pass),
            _ => None,
        }
    }

    /// The pixelation pass, if this is one.
    pub fn as_pixelation_mut(&mut self) -> Option<&mut PixelationPass> {
        match self {
            Self::Pixelation(pass) => Some(pass),
            _ => None,
        }
    }
}

impl From<ShaderPass> for AnyPass {
    fn from(pass: ShaderPass) -> Self {
        Self::Shader(pass)
    }
}

impl From<CopyPass> for AnyPass {
    fn from(pass: CopyPass) -> Self {
        Self::Copy(pass)
    }
}

impl From<PixelationPass> for AnyPass {
    fn from(pass: PixelationPass) -> Self {
        Self::Pixelation(pass)
    }
}

impl Pass for AnyPass {
    fn base(&self) -> &PassBase {
        self.inner().base()
    }

    fn base_mut(&mut self) -> &mut PassBase {
        self.inner_mut().base_mut()
    }

    fn initialize(
        &mut self,
        caps: &RendererCaps,
        alpha: bool,
        frame_buffer_type: PixelType,
    ) {
        self.inner_mut().initialize(caps, alpha, frame_buffer_type);
    }

    fn set_size(&mut self, width: u32, height: u32) {
        self.inner_mut().set_size(width, height);
    }

    fn render(
        &mut self,
        renderer: &mut Renderer<'_>,
        input: &RenderTarget,
        output: &mut RenderTarget,
        delta_time: f32,
        stencil_test: bool,
    ) -> Result<(), PostFxError> {
        self.inner_mut()
            .render(renderer, input, output, delta_time, stencil_test)
    }

    fn dispose(&mut self) {
        self.inner_mut().dispose();
    }
}
