//! Blocky low-resolution look: every fragment samples the center of the
//! granularity-sized block it falls in.

use glam::Vec2;

use crate::error::PostFxError;
use crate::gpu::renderer::{RenderDestination, Renderer};
use crate::gpu::texture::RenderTarget;
use crate::renderer::material::{FullscreenMaterial, GRANULARITY, RESOLUTION};
use crate::renderer::postprocess::screen_pass::{Pass, PassBase};

/// Pixelates the input buffer into the output buffer.
pub struct PixelationPass {
    base: PassBase,
    granularity: f32,
}

impl PixelationPass {
    /// Create a pass with the given block size in pixels. See
    /// [`Self::set_granularity`].
    #[must_use]
    pub fn new(granularity: f32) -> Self {
        let mut base = PassBase::new("PixelationPass", true);
        base.set_material(FullscreenMaterial::pixelation());
        let mut pass = Self {
            base,
            granularity: 0.0,
        };
        pass.set_granularity(granularity);
        pass
    }

    /// Block size in pixels. Zero disables the effect.
    pub fn granularity(&self) -> f32 {
        self.granularity
    }

    /// Set the block size. The value is floored and then rounded up to
    /// the next even number so blocks stay centered on texel corners;
    /// negative values become zero.
    pub fn set_granularity(&mut self, granularity: f32) {
        let mut value = granularity.floor().max(0.0);
        if value % 2.0 > 0.0 {
            value += 1.0;
        }
        self.granularity = value;
        if let Some(material) = self.base.material_mut() {
            material.set_uniform(GRANULARITY, value);
        }
    }
}

impl Default for PixelationPass {
    fn default() -> Self {
        Self::new(30.0)
    }
}

impl Pass for PixelationPass {
    fn base(&self) -> &PassBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut PassBase {
        &mut self.base
    }

    fn set_size(&mut self, width: u32, height: u32) {
        if let Some(material) = self.base.material_mut() {
            material.set_uniform(
                RESOLUTION,
                Vec2::new(width.max(1) as f32, height.max(1) as f32),
            );
        }
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gpu::render_context::RenderContext;
    use crate::gpu::renderer::ScreenTarget;
    use crate::gpu::shader_composer::ShaderComposer;
    use crate::gpu::texture::{RenderTargetOptions, TextureFilter};
    use crate::renderer::material::UniformValue;

    fn uniform(pass: &PixelationPass, name: &str) -> Option<UniformValue> {
        pass.fullscreen_material().and_then(|m| m.uniform(name))
    }

    #[test]
    fn granularity_rounds_up_to_even() {
        for (requested, expected) in
            [(0.0, 0.0), (1.0, 2.0), (2.0, 2.0), (3.7, 4.0), (8.2, 8.0), (-3.0, 0.0)]
        {
            let pass = PixelationPass::new(requested);
            assert_eq!(pass.granularity(), expected, "requested {requested}");
            assert_eq!(
                uniform(&pass, GRANULARITY).and_then(UniformValue::as_float),
                Some(expected)
            );
        }
    }

    #[test]
    fn set_size_updates_resolution() {
        let mut pass = PixelationPass::default();
        pass.set_size(640, 480);
        assert_eq!(
            uniform(&pass, RESOLUTION).and_then(UniformValue::as_vec2),
            Some(Vec2::new(640.0, 480.0))
        );
        assert_eq!(uniform(&pass, RESOLUTION).and_then(UniformValue::as_float), None);
    }

    #[test]
    fn swaps_and_renders_offscreen() {
        let pass = PixelationPass::new(4.0);
        assert!(pass.needs_swap());
        assert!(!pass.render_to_screen());
    }

    #[test]
    fn blocks_are_uniform() {
        let Ok(context) = pollster::block_on(RenderContext::new_headless())
        else {
            return;
        };
        let (width, height) = (8_u32, 8_u32);
        let options = RenderTargetOptions {
            filter: TextureFilter::NEAREST,
            depth_buffer: false,
            ..RenderTargetOptions::default()
        };
        let mut input = RenderTarget::with_options(width, height, options);
        let pattern: Vec<u8> = (0..width * height)
            .flat_map(|i| [(i * 3) as u8, (i * 7) as u8, (i * 11) as u8, 255])
            .collect();
        input.write_pixels(&context, &pattern).unwrap();
        let mut output = RenderTarget::with_options(width, height, options);

        let mut pass = PixelationPass::new(2.0);
        pass.set_size(width, height);

        let mut shaders = ShaderComposer::new().unwrap();
        let mut screen = RenderTarget::new(1, 1);
        screen.prepare(&context.device);
        let mut encoder = context.create_encoder();
        {
            let screen = ScreenTarget::from_render_target(&screen).unwrap();
            let mut renderer =
                Renderer::new(&context, &mut encoder, &mut shaders, screen);
            pass.render(&mut renderer, &input, &mut output, 0.0, false)
                .unwrap();
        }
        context.submit(encoder);

        let pixels = output.read_pixels(&context).unwrap();
        let texel = |x: u32, y: u32| {
            let i = ((y * width + x) * 4) as usize;
            &pixels[i..i + 4]
        };
        for by in (0..height).step_by(2) {
            for bx in (0..width).step_by(2) {
                let first = texel(bx, by);
                assert_eq!(texel(bx + 1, by), first);
                assert_eq!(texel(bx, by + 1), first);
                assert_eq!(texel(bx + 1, by + 1), first);
            }
        }
    }
}
