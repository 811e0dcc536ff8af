//! Generic pass: draws any fullscreen material from the input buffer into
//! the output buffer.

use crate::error::PostFxError;
use crate::gpu::renderer::{RenderDestination, Renderer};
use crate::gpu::texture::RenderTarget;
use crate::renderer::material::FullscreenMaterial;
use crate::renderer::postprocess::screen_pass::{Pass, PassBase};

/// Runs one fullscreen material as a pipeline-advancing stage.
pub struct ShaderPass {
    base: PassBase,
}

impl ShaderPass {
    /// Wrap a material. The pass swaps buffers by default.
    #[must_use]
    pub fn new(material: FullscreenMaterial) -> Self {
        let mut base = PassBase::new("ShaderPass", true);
        base.set_material(material);
        Self { base }
    }

    /// Rename the pass.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.base.set_name(name);
        self
    }

    /// Whether the composer flips its buffers after this pass.
    pub fn set_needs_swap(&mut self, needs_swap: bool) {
        self.base.set_needs_swap(needs_swap);
    }
}

impl Pass for ShaderPass {
    fn base(&self) -> &PassBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut PassBase {
        &mut self.base
    }

    fn render(
        &mut self,
        renderer: &mut Renderer<'_>,
        input: &RenderTarget,
        output: &mut RenderTarget,
        _delta_time: f32,
        _stencil_test: bool,
    ) -> Result<(), PostFxError> {
        let destination = if self.base.render_to_screen() {
            RenderDestination::Screen
        } else {
            RenderDestination::Target(output)
        };
        let Some(material) = self.base.material_mut() else {
            return Ok(());
        };
        renderer.render(material, input.texture(), destination)
    }
}
