//! Per-frame draw submission for fullscreen materials.

use crate::error::PostFxError;
use crate::gpu::render_context::{RenderContext, RendererCaps};
use crate::gpu::shader_composer::ShaderComposer;
use crate::gpu::texture::{PixelType, RenderTarget, Texture};
use crate::renderer::material::{FullscreenMaterial, PipelineKey};

/// The final presentation target of a frame (usually a swapchain view).
#[derive(Clone, Copy)]
pub struct ScreenTarget<'a> {
    /// View to draw into.
    pub view: &'a wgpu::TextureView,
    /// Format of the view.
    pub format: wgpu::TextureFormat,
}

impl<'a> ScreenTarget<'a> {
    /// Wrap an arbitrary view.
    pub fn new(view: &'a wgpu::TextureView, format: wgpu::TextureFormat) -> Self {
        Self { view, format }
    }

    /// Present into an offscreen render target (headless rendering).
    /// Returns `None` until the target has GPU storage.
    pub fn from_render_target(target: &'a RenderTarget) -> Option<Self> {
        target
            .texture()
            .view()
            .map(|view| Self::new(view, target.texture().format()))
    }
}

/// Where a draw writes.
pub enum RenderDestination<'t> {
    /// The frame's [`ScreenTarget`].
    Screen,
    /// An offscreen target; storage is allocated on demand.
    Target(&'t mut RenderTarget),
}

/// Records fullscreen draws for one frame into a command encoder.
pub struct Renderer<'a> {
    context: &'a RenderContext,
    encoder: &'a mut wgpu::CommandEncoder,
    shaders: &'a mut ShaderComposer,
    screen: ScreenTarget<'a>,
}

impl<'a> Renderer<'a> {
    /// Start recording a frame.
    pub fn new(
        context: &'a RenderContext,
        encoder: &'a mut wgpu::CommandEncoder,
        shaders: &'a mut ShaderComposer,
        screen: ScreenTarget<'a>,
    ) -> Self {
        Self {
            context,
            encoder,
            shaders,
            screen,
        }
    }

    /// Capabilities of the device being recorded for.
    pub fn caps(&self) -> RendererCaps {
        self.context.caps()
    }

    /// The wgpu device.
    pub fn device(&self) -> &wgpu::Device {
        &self.context.device
    }

    /// Draw `material` over the whole destination, sampling `source`.
    ///
    /// `source` becomes the material's input buffer. A source without GPU
    /// storage has never been rendered; the draw is skipped.
    ///
    /// # Errors
    ///
    /// Returns [`PostFxError::ShaderCompose`] if the material's shader fails
    /// to compile.
    pub fn render(
        &mut self,
        material: &mut FullscreenMaterial,
        source: &Texture,
        destination: RenderDestination<'_>,
    ) -> Result<(), PostFxError> {
        material.set_input_buffer(source);
        let Some(source_view) = source.view() else {
            log::warn!(
                "'{}' sampled '{}' before anything was rendered into it",
                material.label(),
                source.name()
            );
            return Ok(());
        };

        let (color_view, color_format, depth) = match destination {
            RenderDestination::Screen => {
                (self.screen.view, self.screen.format, None)
            }
            RenderDestination::Target(target) => {
                target.prepare(self.device());
                let target: &RenderTarget = target;
                let Some(view) = target.texture().view() else {
                    return Ok(());
                };
                let depth = target.depth_format().zip(target.depth_view());
                (view, target.texture().format(), depth)
            }
        };

        let key = PipelineKey {
            color_format,
            depth_format: depth.map(|(format, _)| format),
            filterable: source.pixel_type() != PixelType::Float
                || self.caps().float32_filterable,
        };
        let bindings = material.prepare_draw(
            self.context,
            self.shaders,
            key,
            source,
            source_view,
        )?;

        let load = if bindings.blends {
            wgpu::LoadOp::Load
        } else {
            wgpu::LoadOp::Clear(wgpu::Color::TRANSPARENT)
        };
        let depth_stencil_attachment =
            depth.map(|(format, view)| wgpu::RenderPassDepthStencilAttachment {
                view,
                depth_ops: format.has_depth_aspect().then_some(
                    wgpu::Operations {
                        load: wgpu::LoadOp::Load,
                        store: wgpu::StoreOp::Store,
                    },
                ),
                stencil_ops: format.has_stencil_aspect().then_some(
                    wgpu::Operations {
                        load: wgpu::LoadOp::Load,
                        store: wgpu::StoreOp::Store,
                    },
                ),
            });

        let mut pass =
            self.encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some(bindings.label),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: color_view,
                    depth_slice: None,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load,
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment,
                ..Default::default()
            });
        pass.set_pipeline(bindings.pipeline);
        pass.set_bind_group(0, bindings.bind_group, &[]);
        pass.draw(0..3, 0..1);
        Ok(())
    }
}
