//! Ping-pong pass composer.
//!
//! The composer owns two equally sized render targets. The host draws the
//! scene into [`Composer::input_target_mut`]; every enabled pass then reads
//! the read buffer and writes the write buffer, a target it owns, or the
//! screen. Passes that report `needs_swap` flip the pair afterwards so the
//! next pass sees their output.

use crate::error::PostFxError;
use crate::gpu::render_context::{RenderContext, RendererCaps};
use crate::gpu::renderer::{Renderer, ScreenTarget};
use crate::gpu::shader_composer::ShaderComposer;
use crate::gpu::texture::{RenderTarget, RenderTargetOptions};
use crate::options::ComposerOptions;
use crate::renderer::postprocess::{AnyPass, Pass};

/// Two render targets whose read/write roles alternate.
pub struct BufferPair {
    targets: [RenderTarget; 2],
    read: usize,
}

impl BufferPair {
    /// Two 1×1 targets created with `options`.
    #[must_use]
    pub fn new(options: RenderTargetOptions) -> Self {
        let mut targets = [
            RenderTarget::with_options(1, 1, options),
            RenderTarget::with_options(1, 1, options),
        ];
        for (i, target) in targets.iter_mut().enumerate() {
            target.texture_mut().set_name(format!("Composer.Buffer{i}"));
        }
        Self { targets, read: 0 }
    }

    /// The buffer the next pass reads.
    pub fn read(&self) -> &RenderTarget {
        &self.targets[self.read]
    }

    /// Mutable read buffer.
    pub fn read_mut(&mut self) -> &mut RenderTarget {
        &mut self.targets[self.read]
    }

    /// The buffer the next pass writes.
    pub fn write(&self) -> &RenderTarget {
        &self.targets[1 - self.read]
    }

    /// Exchange read and write roles.
    pub fn swap(&mut self) {
        self.read = 1 - self.read;
    }

    /// Borrow the read buffer and the write buffer at once.
    pub fn split(&mut self) -> (&RenderTarget, &mut RenderTarget) {
        let [first, second] = &mut self.targets;
        if self.read == 0 {
            (first, second)
        } else {
            (second, first)
        }
    }

    /// Resize both buffers.
    pub fn set_size(&mut self, width: u32, height: u32) {
        for target in &mut self.targets {
            target.set_size(width, height);
        }
    }

    /// Allocate missing GPU storage for both buffers.
    pub fn prepare(&mut self, device: &wgpu::Device) {
        for target in &mut self.targets {
            target.prepare(device);
        }
    }

    /// Release both buffers' GPU storage.
    pub fn dispose(&mut self) {
        for target in &mut self.targets {
            target.dispose();
        }
    }
}

/// Runs an ordered list of passes over a pair of ping-pong buffers.
pub struct Composer {
    options: ComposerOptions,
    caps: RendererCaps,
    shaders: ShaderComposer,
    buffers: BufferPair,
    passes: Vec<AnyPass>,
    width: u32,
    height: u32,
    stencil_test: bool,
}

impl Composer {
    /// Create an empty composer with 1×1 buffers.
    ///
    /// # Errors
    ///
    /// Returns [`PostFxError::ShaderModule`] if the shared shader modules
    /// fail to register.
    pub fn new(
        caps: RendererCaps,
        options: &ComposerOptions,
    ) -> Result<Self, PostFxError> {
        let buffers = BufferPair::new(RenderTargetOptions {
            pixel_type: options.frame_buffer_type,
            depth_buffer: options.depth_buffer,
            stencil_buffer: options.stencil_buffer,
            ..RenderTargetOptions::default()
        });
        Ok(Self {
            options: *options,
            caps,
            shaders: ShaderComposer::new()?,
            buffers,
            passes: Vec::new(),
            width: 1,
            height: 1,
            stencil_test: false,
        })
    }

    /// Options this composer was created with.
    pub fn options(&self) -> &ComposerOptions {
        &self.options
    }

    /// Current buffer size.
    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// The passes, in render order.
    pub fn passes(&self) -> &[AnyPass] {
        &self.passes
    }

    /// Mutable access to one pass.
    pub fn pass_mut(&mut self, index: usize) -> Option<&mut AnyPass> {
        self.passes.get_mut(index)
    }

    /// Index of the first pass named `name`.
    pub fn pass_index(&self, name: &str) -> Option<usize> {
        self.passes.iter().position(|pass| pass.name() == name)
    }

    /// Append a pass to the end of the chain.
    pub fn add_pass(&mut self, pass: impl Into<AnyPass>) {
        self.insert_pass(self.passes.len(), pass);
    }

    /// Insert a pass at `index` (clamped to the list length).
    ///
    /// The pass is sized to the composer and initialized with its frame
    /// buffer type. With `auto_render_to_screen`, a pass appended at the
    /// end takes over the screen from the previous last pass.
    pub fn insert_pass(&mut self, index: usize, pass: impl Into<AnyPass>) {
        let mut pass = pass.into();
        pass.set_size(self.width, self.height);
        pass.initialize(
            &self.caps,
            self.options.alpha,
            self.options.frame_buffer_type,
        );

        let index = index.min(self.passes.len());
        if self.options.auto_render_to_screen && index == self.passes.len() {
            if let Some(last) = self.passes.last_mut() {
                last.set_render_to_screen(false);
            }
            pass.set_render_to_screen(true);
        }
        log::debug!("added pass '{}' at {index}", pass.name());
        self.passes.insert(index, pass);
    }

    /// Remove the pass at `index`, release its GPU objects and hand it
    /// back. With `auto_render_to_screen`, the new last pass takes over the
    /// screen if the removed one had it.
    pub fn remove_pass(&mut self, index: usize) -> Option<AnyPass> {
        if index >= self.passes.len() {
            return None;
        }
        let mut pass = self.passes.remove(index);
        pass.dispose();
        if self.options.auto_render_to_screen && pass.render_to_screen() {
            pass.set_render_to_screen(false);
            if let Some(last) = self.passes.last_mut() {
                last.set_render_to_screen(true);
            }
        }
        log::debug!("removed pass '{}'", pass.name());
        Some(pass)
    }

    /// Resize the buffers and every pass. Dimensions are clamped to
    /// `[1, max_texture_dimension]`.
    pub fn set_size(&mut self, width: u32, height: u32) {
        let max = self.caps.max_texture_dimension.max(1);
        let (width, height) = (width.clamp(1, max), height.clamp(1, max));
        self.width = width;
        self.height = height;
        self.buffers.set_size(width, height);
        for pass in &mut self.passes {
            pass.set_size(width, height);
        }
    }

    /// The buffer the host renders the scene into before
    /// [`Self::render`].
    pub fn input_target(&self) -> &RenderTarget {
        self.buffers.read()
    }

    /// Mutable input buffer.
    pub fn input_target_mut(&mut self) -> &mut RenderTarget {
        self.buffers.read_mut()
    }

    /// The ping-pong buffers.
    pub fn buffers(&self) -> &BufferPair {
        &self.buffers
    }

    /// Whether passes are asked to honor the stencil buffer.
    pub fn stencil_test(&self) -> bool {
        self.stencil_test
    }

    /// Forwarded to every pass on render.
    pub fn set_stencil_test(&mut self, enabled: bool) {
        self.stencil_test = enabled;
    }

    /// Record every enabled pass, in order.
    ///
    /// # Errors
    ///
    /// Stops at the first pass that fails and returns its error.
    pub fn render(
        &mut self,
        context: &RenderContext,
        encoder: &mut wgpu::CommandEncoder,
        screen: ScreenTarget<'_>,
        delta_time: f32,
    ) -> Result<(), PostFxError> {
        let Self {
            shaders,
            buffers,
            passes,
            stencil_test,
            ..
        } = self;
        buffers.prepare(&context.device);
        let mut renderer = Renderer::new(context, encoder, shaders, screen);

        for pass in passes.iter_mut().filter(|pass| pass.enabled()) {
            let (input, output) = buffers.split();
            pass.render(&mut renderer, input, output, delta_time, *stencil_test)?;
            if pass.needs_swap() {
                buffers.swap();
            }
        }
        Ok(())
    }

    /// Release the GPU objects of every pass and both buffers.
    pub fn dispose(&mut self) {
        for pass in &mut self.passes {
            pass.dispose();
        }
        self.buffers.dispose();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gpu::texture::{PixelType, TextureFilter};
    use crate::renderer::material::{FullscreenMaterial, HIGH_PRECISION_DEFINE};
    use crate::renderer::postprocess::{CopyPass, PixelationPass, ShaderPass};

    fn composer(options: ComposerOptions) -> Composer {
        Composer::new(RendererCaps::default(), &options).unwrap()
    }

    fn screen_flags(composer: &Composer) -> Vec<bool> {
        composer
            .passes()
            .iter()
            .map(Pass::render_to_screen)
            .collect()
    }

    #[test]
    fn split_follows_swap() {
        let mut pair = BufferPair::new(RenderTargetOptions::default());
        let first = pair.read().texture().handle();
        let second = pair.write().texture().handle();
        assert_ne!(first, second);

        pair.swap();
        let (input, output) = pair.split();
        assert_eq!(input.texture().handle(), second);
        assert_eq!(output.texture().handle(), first);
    }

    #[test]
    fn last_pass_renders_to_screen() {
        let mut c = composer(ComposerOptions::default());
        c.add_pass(PixelationPass::new(4.0));
        assert_eq!(screen_flags(&c), [true]);
        c.add_pass(CopyPass::default());
        assert_eq!(screen_flags(&c), [false, true]);
        c.insert_pass(0, ShaderPass::new(FullscreenMaterial::copy()));
        assert_eq!(screen_flags(&c), [false, false, true]);
    }

    #[test]
    fn manual_screen_routing_is_left_alone() {
        let mut c = composer(ComposerOptions {
            auto_render_to_screen: false,
            ..ComposerOptions::default()
        });
        c.add_pass(PixelationPass::new(4.0));
        c.add_pass(CopyPass::default());
        assert_eq!(screen_flags(&c), [false, false]);
    }

    #[test]
    fn removing_last_pass_hands_screen_back() {
        let mut c = composer(ComposerOptions::default());
        c.add_pass(PixelationPass::new(4.0));
        c.add_pass(CopyPass::default());

        let removed = c.remove_pass(1).unwrap();
        assert!(removed.as_copy().is_some());
        assert!(!removed.render_to_screen());
        assert_eq!(screen_flags(&c), [true]);
        assert!(c.remove_pass(5).is_none());
    }

    #[test]
    fn added_passes_are_sized_and_initialized() {
        let mut c = composer(ComposerOptions {
            frame_buffer_type: PixelType::HalfFloat,
            ..ComposerOptions::default()
        });
        c.set_size(640, 480);
        c.add_pass(CopyPass::default());

        let copy = c.passes()[0].as_copy().unwrap();
        assert_eq!(copy.render_target().size(), (640, 480));
        assert_eq!(copy.texture().pixel_type(), PixelType::HalfFloat);
        assert_eq!(
            copy.fullscreen_material()
                .and_then(|m| m.define(HIGH_PRECISION_DEFINE)),
            Some("1")
        );
    }

    #[test]
    fn set_size_clamps_and_propagates() {
        let mut c = composer(ComposerOptions::default());
        c.add_pass(CopyPass::default());
        c.set_size(0, 0);
        assert_eq!(c.size(), (1, 1));
        assert_eq!(c.input_target().size(), (1, 1));

        let max = RendererCaps::default().max_texture_dimension;
        c.set_size(max + 100, 32);
        assert_eq!(c.size(), (max, 32));
        assert_eq!(c.buffers().write().size(), (max, 32));
        assert_eq!(
            c.passes()[0].as_copy().unwrap().render_target().size(),
            (max, 32)
        );
    }

    #[test]
    fn buffers_follow_options() {
        let c = composer(ComposerOptions {
            frame_buffer_type: PixelType::Float,
            depth_buffer: false,
            stencil_buffer: true,
            ..ComposerOptions::default()
        });
        let input = c.input_target();
        assert_eq!(input.texture().pixel_type(), PixelType::Float);
        assert!(!input.has_depth());
        assert!(input.has_stencil());
    }

    #[test]
    fn pass_lookup_by_name() {
        let mut c = composer(ComposerOptions::default());
        c.add_pass(PixelationPass::new(2.0));
        c.add_pass(CopyPass::default());
        assert_eq!(c.pass_index("CopyPass"), Some(1));
        assert_eq!(c.pass_index("Bloom"), None);

        c.pass_mut(0)
            .and_then(AnyPass::as_pixelation_mut)
            .unwrap()
            .set_granularity(5.0);
        assert_eq!(
            c.passes()[0]
                .fullscreen_material()
                .and_then(|m| m.uniform(crate::renderer::material::GRANULARITY)),
            Some(crate::renderer::material::UniformValue::Float(6.0))
        );
    }

    #[test]
    fn chain_ends_with_snapshot_of_input() {
        let Ok(context) = pollster::block_on(RenderContext::new_headless())
        else {
            return;
        };
        let mut c = composer(ComposerOptions {
            auto_render_to_screen: false,
            ..ComposerOptions::default()
        });
        let (width, height) = (32_u32, 16_u32);
        c.set_size(width, height);
        c.add_pass(ShaderPass::new(FullscreenMaterial::copy()));
        c.add_pass(CopyPass::default());

        let pattern: Vec<u8> = (0..width * height)
            .flat_map(|i| [(i % 251) as u8, (i / 7) as u8, 17, 255])
            .collect();
        c.buffers.targets.iter_mut().for_each(|target| {
            target.texture_mut().set_filter(TextureFilter::NEAREST);
        });
        c.input_target_mut().write_pixels(&context, &pattern).unwrap();
        let input_handle = c.input_target().texture().handle();

        let mut screen = RenderTarget::new(1, 1);
        screen.prepare(&context.device);
        let mut encoder = context.create_encoder();
        {
            let screen = ScreenTarget::from_render_target(&screen).unwrap();
            c.render(&context, &mut encoder, screen, 1.0 / 60.0).unwrap();
        }
        context.submit(encoder);

        // The shader pass swapped once; the copy pass did not.
        assert_ne!(c.input_target().texture().handle(), input_handle);
        let snapshot = c.passes()[1].as_copy().unwrap();
        assert_eq!(snapshot.render_target().read_pixels(&context).unwrap(), pattern);
    }

    #[test]
    fn screen_routed_copy_bypasses_its_target() {
        let Ok(context) = pollster::block_on(RenderContext::new_headless())
        else {
            return;
        };
        let mut c = composer(ComposerOptions::default());
        let (width, height) = (24_u32, 12_u32);
        c.set_size(width, height);
        c.add_pass(PixelationPass::new(0.0));
        c.add_pass(CopyPass::default());
        assert_eq!(screen_flags(&c), [false, true]);

        c.buffers.targets.iter_mut().for_each(|target| {
            target.texture_mut().set_filter(TextureFilter::NEAREST);
        });
        let pattern: Vec<u8> = (0..width * height)
            .flat_map(|i| [(i * 5) as u8, (i % 13) as u8, 200, 255])
            .collect();
        c.input_target_mut().write_pixels(&context, &pattern).unwrap();

        let mut screen = RenderTarget::with_options(
            width,
            height,
            RenderTargetOptions {
                depth_buffer: false,
                ..RenderTargetOptions::default()
            },
        );
        screen.prepare(&context.device);
        let mut encoder = context.create_encoder();
        {
            let view = ScreenTarget::from_render_target(&screen).unwrap();
            c.render(&context, &mut encoder, view, 1.0 / 60.0).unwrap();
        }
        context.submit(encoder);

        assert_eq!(screen.read_pixels(&context).unwrap(), pattern);
        let copy = c.passes()[1].as_copy().unwrap();
        assert!(!copy.render_target().is_realized());
    }

    #[test]
    fn resize_between_render_and_submit() {
        let Ok(context) = pollster::block_on(RenderContext::new_headless())
        else {
            return;
        };
        let mut c = composer(ComposerOptions {
            auto_render_to_screen: false,
            ..ComposerOptions::default()
        });
        c.set_size(16, 16);
        c.add_pass(PixelationPass::new(2.0));
        c.add_pass(CopyPass::default());

        let mut screen = RenderTarget::new(1, 1);
        screen.prepare(&context.device);
        let mut encoder = context.create_encoder();
        {
            let view = ScreenTarget::from_render_target(&screen).unwrap();
            c.render(&context, &mut encoder, view, 1.0 / 60.0).unwrap();
        }
        c.set_size(32, 8);
        let _ = c.remove_pass(1).unwrap();
        context.submit(encoder);

        assert!(!c.input_target().is_realized());
        assert_eq!(c.input_target().size(), (32, 8));
    }
}
