//! Snapshot pass: copies the input buffer into a target the pass owns.
//!
//! The copy never advances the chain (`needs_swap` is always false), so it
//! can be dropped anywhere in a pass list to capture the intermediate image
//! for later use through [`CopyPass::texture`].

use crate::error::PostFxError;
use crate::gpu::render_context::RendererCaps;
use crate::gpu::renderer::{RenderDestination, Renderer};
use crate::gpu::texture::{
    PixelType, RenderTarget, RenderTargetOptions, Texture,
};
use crate::renderer::material::{FullscreenMaterial, HIGH_PRECISION_DEFINE};
use crate::renderer::postprocess::screen_pass::{Pass, PassBase};

/// Name given to the target a [`CopyPass`] creates for itself.
pub const DEFAULT_TARGET_NAME: &str = "CopyPass.Target";

/// Copies its input into an owned render target.
pub struct CopyPass {
    base: PassBase,
    render_target: RenderTarget,
    auto_resize: bool,
}

impl CopyPass {
    /// Create a copy pass.
    ///
    /// Without a `render_target` the pass creates a 1×1 target named
    /// [`DEFAULT_TARGET_NAME`] with linear filtering and no depth or stencil
    /// attachments. With `auto_resize` the target follows the composer's
    /// size; otherwise it keeps whatever size it has.
    #[must_use]
    pub fn new(render_target: Option<RenderTarget>, auto_resize: bool) -> Self {
        let render_target = render_target.unwrap_or_else(|| {
            let mut target = RenderTarget::with_options(
                1,
                1,
                RenderTargetOptions {
                    depth_buffer: false,
                    stencil_buffer: false,
                    ..RenderTargetOptions::default()
                },
            );
            target.texture_mut().set_name(DEFAULT_TARGET_NAME);
            target
        });

        let mut base = PassBase::new("CopyPass", false);
        base.set_material(FullscreenMaterial::copy());
        Self {
            base,
            render_target,
            auto_resize,
        }
    }

    /// The texture holding the last copied frame. Its handle stays valid
    /// across resizes.
    pub fn texture(&self) -> &Texture {
        self.render_target.texture()
    }

    /// The owned render target.
    pub fn render_target(&self) -> &RenderTarget {
        &self.render_target
    }

    /// Whether the target follows viewport resizes.
    pub fn auto_resize_enabled(&self) -> bool {
        self.auto_resize
    }

    /// Enable or disable following viewport resizes.
    pub fn set_auto_resize_enabled(&mut self, enabled: bool) {
        self.auto_resize = enabled;
    }
}

impl Default for CopyPass {
    fn default() -> Self {
        Self::new(None, true)
    }
}

impl Pass for CopyPass {
    fn base(&self) -> &PassBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut PassBase {
        &mut self.base
    }

    /// The owned target takes on the chain's pixel type.
    fn initialize(
        &mut self,
        _caps: &RendererCaps,
        _alpha: bool,
        frame_buffer_type: PixelType,
    ) {
        self.render_target.set_pixel_type(frame_buffer_type);
        if frame_buffer_type.is_high_precision() {
            if let Some(material) = self.base.material_mut() {
                material.set_define(HIGH_PRECISION_DEFINE, "1");
            }
        }
    }

    fn set_size(&mut self, width: u32, height: u32) {
        if self.auto_resize {
            self.render_target.set_size(width, height);
        }
    }

    fn render(
        &mut self,
        renderer: &mut Renderer<'_>,
        input: &RenderTarget,
        _output: &mut RenderTarget,
        _delta_time: f32,
        _stencil_test: bool,
    ) -> Result<(), PostFxError> {
        let destination = if self.base.render_to_screen() {
            RenderDestination::Screen
        } else {
            RenderDestination::Target(&mut self.render_target)
        };
        let Some(material) = self.base.material_mut() else {
            return Ok(());
        };
        renderer.render(material, input.texture(), destination)
    }

    fn dispose(&mut self) {
        if let Some(material) = self.base.material_mut() {
            material.release();
        }
        self.render_target.dispose();
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;
    use crate::gpu::render_context::RenderContext;
    use crate::gpu::renderer::ScreenTarget;
    use crate::gpu::shader_composer::ShaderComposer;
    use crate::gpu::texture::TextureFilter;

    #[test]
    fn default_target_is_one_pixel() {
        let pass = CopyPass::default();
        assert_eq!(pass.render_target().size(), (1, 1));
        assert_eq!(pass.texture().name(), DEFAULT_TARGET_NAME);
        assert!(!pass.render_target().has_depth());
        assert!(pass.auto_resize_enabled());
    }

    #[test]
    fn auto_resize_follows_viewport() {
        let mut pass = CopyPass::default();
        pass.set_size(800, 600);
        assert_eq!(pass.render_target().size(), (800, 600));
    }

    proptest! {
        #[test]
        fn fixed_size_target_ignores_any_viewport(
            w in 0u32..8192,
            h in 0u32..8192,
        ) {
            let mut pass =
                CopyPass::new(Some(RenderTarget::new(256, 256)), false);
            pass.set_size(w, h);
            prop_assert_eq!(pass.render_target().size(), (256, 256));
        }

        #[test]
        fn auto_resize_reports_any_viewport(w in 1u32..8192, h in 1u32..8192) {
            let mut pass = CopyPass::default();
            pass.set_size(w, h);
            pass.set_size(w, h);
            prop_assert_eq!(pass.render_target().size(), (w, h));
        }
    }

    #[test]
    fn fixed_size_target_ignores_viewport() {
        let mut pass = CopyPass::new(Some(RenderTarget::new(256, 256)), false);
        pass.set_size(800, 600);
        assert_eq!(pass.render_target().size(), (256, 256));

        pass.set_auto_resize_enabled(true);
        pass.set_size(800, 600);
        assert_eq!(pass.render_target().size(), (800, 600));
    }

    #[test]
    fn never_needs_swap() {
        for pass in [
            CopyPass::default(),
            CopyPass::new(None, false),
            CopyPass::new(Some(RenderTarget::new(8, 8)), true),
            CopyPass::new(Some(RenderTarget::new(8, 8)), false),
        ] {
            assert!(!pass.needs_swap());
        }
    }

    #[test]
    fn texture_handle_is_stable() {
        let mut pass = CopyPass::default();
        let handle = pass.texture().handle();
        pass.set_size(64, 32);
        assert_eq!(pass.texture().handle(), handle);
    }

    #[test]
    fn wide_frame_buffers_enable_precision_define() {
        let caps = RendererCaps::default();
        for pixel_type in [PixelType::HalfFloat, PixelType::Float] {
            let mut pass = CopyPass::default();
            pass.initialize(&caps, true, pixel_type);
            assert_eq!(pass.texture().pixel_type(), pixel_type);
            assert_eq!(
                pass.fullscreen_material()
                    .and_then(|m| m.define(HIGH_PRECISION_DEFINE)),
                Some("1")
            );
        }
    }

    #[test]
    fn byte_frame_buffers_leave_define_unset() {
        let mut pass = CopyPass::default();
        pass.initialize(&RendererCaps::default(), false, PixelType::UnsignedByte);
        assert_eq!(pass.texture().pixel_type(), PixelType::UnsignedByte);
        assert_eq!(
            pass.fullscreen_material()
                .and_then(|m| m.define(HIGH_PRECISION_DEFINE)),
            None
        );
    }

    #[test]
    fn dispose_drops_storage_but_keeps_size() {
        let mut pass = CopyPass::default();
        pass.set_size(10, 10);
        pass.dispose();
        assert!(!pass.render_target().is_realized());
        assert_eq!(pass.render_target().size(), (10, 10));
    }

    #[test]
    fn copies_input_exactly() {
        let Ok(context) = pollster::block_on(RenderContext::new_headless())
        else {
            return;
        };
        let (width, height) = (800, 600);
        let mut input = RenderTarget::with_options(
            width,
            height,
            RenderTargetOptions {
                filter: TextureFilter::NEAREST,
                depth_buffer: false,
                ..RenderTargetOptions::default()
            },
        );
        let pattern: Vec<u8> = (0..width * height)
            .flat_map(|i| {
                let (x, y) = (i % width, i / width);
                [(x % 256) as u8, (y % 256) as u8, ((x ^ y) % 256) as u8, 255]
            })
            .collect();
        input.write_pixels(&context, &pattern).unwrap();

        let mut pass = CopyPass::default();
        assert_eq!(pass.render_target().size(), (1, 1));
        pass.set_size(width, height);
        assert_eq!(pass.render_target().size(), (width, height));

        let mut shaders = ShaderComposer::new().unwrap();
        let mut screen = RenderTarget::new(1, 1);
        screen.prepare(&context.device);
        let mut unused_output = RenderTarget::new(width, height);
        let mut encoder = context.create_encoder();
        {
            let screen = ScreenTarget::from_render_target(&screen).unwrap();
            let mut renderer =
                Renderer::new(&context, &mut encoder, &mut shaders, screen);
            pass.render(&mut renderer, &input, &mut unused_output, 0.0, false)
                .unwrap();
        }
        context.submit(encoder);

        let copied = pass.render_target().read_pixels(&context).unwrap();
        assert_eq!(copied, pattern);
        assert!(!unused_output.is_realized());
    }

    #[test]
    fn resize_and_dispose_before_submit() {
        let Ok(context) = pollster::block_on(RenderContext::new_headless())
        else {
            return;
        };
        let mut input = RenderTarget::with_options(
            8,
            8,
            RenderTargetOptions {
                depth_buffer: false,
                ..RenderTargetOptions::default()
            },
        );
        input.write_pixels(&context, &vec![128; input.byte_len()]).unwrap();

        let mut pass = CopyPass::default();
        pass.set_size(8, 8);
        let mut shaders = ShaderComposer::new().unwrap();
        let mut screen = RenderTarget::new(1, 1);
        screen.prepare(&context.device);
        let mut unused_output = RenderTarget::new(8, 8);

        let mut encoder = context.create_encoder();
        {
            let view = ScreenTarget::from_render_target(&screen).unwrap();
            let mut renderer =
                Renderer::new(&context, &mut encoder, &mut shaders, view);
            pass.render(&mut renderer, &input, &mut unused_output, 0.0, false)
                .unwrap();
        }
        // Everything the recorded draw touched is released before submit.
        pass.set_size(16, 16);
        pass.set_fullscreen_material(FullscreenMaterial::copy());
        pass.dispose();
        input.set_size(4, 4);
        context.submit(encoder);

        assert!(!pass.render_target().is_realized());
        assert_eq!(pass.render_target().size(), (16, 16));

        // The pass keeps working on fresh storage.
        input.write_pixels(&context, &vec![64; input.byte_len()]).unwrap();
        pass.set_size(4, 4);
        let mut encoder = context.create_encoder();
        {
            let view = ScreenTarget::from_render_target(&screen).unwrap();
            let mut renderer =
                Renderer::new(&context, &mut encoder, &mut shaders, view);
            pass.render(&mut renderer, &input, &mut unused_output, 0.0, false)
                .unwrap();
        }
        context.submit(encoder);
        assert_eq!(
            pass.render_target().read_pixels(&context).unwrap(),
            vec![64; input.byte_len()]
        );
    }
}
