//! The contract every pass implements and the state all passes share.

use crate::error::PostFxError;
use crate::gpu::render_context::RendererCaps;
use crate::gpu::renderer::Renderer;
use crate::gpu::texture::{PixelType, RenderTarget};
use crate::renderer::material::{FullscreenMaterial, HIGH_PRECISION_DEFINE};

/// State shared by every pass.
pub struct PassBase {
    name: String,
    material: Option<FullscreenMaterial>,
    needs_swap: bool,
    render_to_screen: bool,
    enabled: bool,
}

impl PassBase {
    /// Enabled, offscreen, no material yet.
    pub fn new(name: impl Into<String>, needs_swap: bool) -> Self {
        Self {
            name: name.into(),
            material: None,
            needs_swap,
            render_to_screen: false,
            enabled: true,
        }
    }

    /// Pass name, used for lookups and debug labels.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    /// Whether the composer flips its buffers after this pass.
    pub fn needs_swap(&self) -> bool {
        self.needs_swap
    }

    pub(crate) fn set_needs_swap(&mut self, needs_swap: bool) {
        self.needs_swap = needs_swap;
    }

    /// Whether this pass draws to the frame's screen target.
    pub fn render_to_screen(&self) -> bool {
        self.render_to_screen
    }

    /// Route this pass's output to the screen target.
    pub fn set_render_to_screen(&mut self, render_to_screen: bool) {
        self.render_to_screen = render_to_screen;
    }

    /// Whether the composer runs this pass.
    pub fn enabled(&self) -> bool {
        self.enabled
    }

    /// Enable or disable the pass.
    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    /// The fullscreen material, if installed.
    pub fn material(&self) -> Option<&FullscreenMaterial> {
        self.material.as_ref()
    }

    /// Mutable fullscreen material, if installed.
    pub fn material_mut(&mut self) -> Option<&mut FullscreenMaterial> {
        self.material.as_mut()
    }

    /// Install a material, releasing the GPU objects of the previous one.
    pub fn set_material(&mut self, material: FullscreenMaterial) {
        if let Some(mut old) = self.material.replace(material) {
            old.release();
        }
    }
}

/// One stage of a post-processing chain.
///
/// The composer calls `initialize` once when the pass is attached,
/// `set_size` on every viewport change and `render` once per frame, in list
/// order. A pass reads `input`, never writes it, and writes exactly one
/// target: `output`, a target it owns, or the screen when
/// [`Self::render_to_screen`] is set.
pub trait Pass {
    /// Shared pass state.
    fn base(&self) -> &PassBase;

    /// Mutable shared pass state.
    fn base_mut(&mut self) -> &mut PassBase;

    /// Pass name.
    fn name(&self) -> &str {
        self.base().name()
    }

    /// Whether `output` holds this pass's result afterwards, so the
    /// composer should flip its buffers.
    fn needs_swap(&self) -> bool {
        self.base().needs_swap()
    }

    /// Whether this pass draws to the screen target.
    fn render_to_screen(&self) -> bool {
        self.base().render_to_screen()
    }

    /// Route this pass's output to the screen target.
    fn set_render_to_screen(&mut self, render_to_screen: bool) {
        self.base_mut().set_render_to_screen(render_to_screen);
    }

    /// Whether the composer runs this pass.
    fn enabled(&self) -> bool {
        self.base().enabled()
    }

    /// Enable or disable the pass.
    fn set_enabled(&mut self, enabled: bool) {
        self.base_mut().set_enabled(enabled);
    }

    /// The fullscreen material, if any.
    fn fullscreen_material(&self) -> Option<&FullscreenMaterial> {
        self.base().material()
    }

    /// Mutable fullscreen material, if any.
    fn fullscreen_material_mut(&mut self) -> Option<&mut FullscreenMaterial> {
        self.base_mut().material_mut()
    }

    /// Install the material used for fullscreen rendering. The pass owns it
    /// from now on.
    fn set_fullscreen_material(&mut self, material: FullscreenMaterial) {
        self.base_mut().set_material(material);
    }

    /// One-time setup once the chain's frame buffer type is known.
    ///
    /// Frame buffers wider than 8 bits per channel enable
    /// [`HIGH_PRECISION_DEFINE`] on the material.
    fn initialize(
        &mut self,
        _caps: &RendererCaps,
        _alpha: bool,
        frame_buffer_type: PixelType,
    ) {
        if frame_buffer_type.is_high_precision() {
            if let Some(material) = self.fullscreen_material_mut() {
                material.set_define(HIGH_PRECISION_DEFINE, "1");
            }
        }
    }

    /// Viewport changed. Safe to call every frame.
    fn set_size(&mut self, _width: u32, _height: u32) {}

    /// Record this pass for the current frame.
    ///
    /// # Errors
    ///
    /// Returns [`PostFxError::ShaderCompose`] if the material's shader fails
    /// to compile.
    fn render(
        &mut self,
        renderer: &mut Renderer<'_>,
        input: &RenderTarget,
        output: &mut RenderTarget,
        delta_time: f32,
        stencil_test: bool,
    ) -> Result<(), PostFxError>;

    /// Release GPU objects owned by this pass. They are recreated on demand
    /// if the pass renders again.
    fn dispose(&mut self) {
        if let Some(material) = self.fullscreen_material_mut() {
            material.release();
        }
    }
}
