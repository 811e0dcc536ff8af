//! Fullscreen materials: a shader bound to one input texture plus a set of
//! uniforms and compile-time defines.
//!
//! Every fullscreen shader follows the same binding contract (group 0):
//!
//! | binding | resource                                   |
//! |---------|--------------------------------------------|
//! | 0       | input texture (`texture_2d<f32>`)          |
//! | 1       | sampler matching the input's filter        |
//! | 2       | uniform struct, members in uniform order   |
//!
//! GPU objects (shader module, pipelines, uniform buffer, bind groups) are
//! created on the first draw and cached. Pipelines are keyed by the
//! destination formats, so one material can draw into the screen and into
//! offscreen targets alike.

mod copy;
mod pixelation;
pub mod uniforms;

use std::borrow::Cow;
use std::collections::BTreeMap;

use rustc_hash::FxHashMap;

pub use copy::OPACITY;
pub use pixelation::{GRANULARITY, RESOLUTION};
pub use uniforms::{UniformValue, Uniforms};

use crate::error::PostFxError;
use crate::gpu::pipeline_helpers;
use crate::gpu::render_context::RenderContext;
use crate::gpu::shader_composer::ShaderComposer;
use crate::gpu::texture::{Texture, TextureFilter, TextureHandle};
use crate::renderer::pipeline_util::overlay_depth_stencil_state;

/// Define enabled on a material when its pipeline's frame buffers store more
/// than 8 bits per channel.
pub const HIGH_PRECISION_DEFINE: &str = "FRAMEBUFFER_PRECISION_HIGH";

/// Identifies one compiled pipeline variant of a material.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) struct PipelineKey {
    pub(crate) color_format: wgpu::TextureFormat,
    pub(crate) depth_format: Option<wgpu::TextureFormat>,
    pub(crate) filterable: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct BindKey {
    texture: TextureHandle,
    generation: u64,
    filter: TextureFilter,
    filterable: bool,
}

/// Pipeline and bind group ready to be recorded into a render pass.
pub(crate) struct MaterialBindings<'m> {
    pub(crate) label: &'m str,
    pub(crate) blends: bool,
    pub(crate) pipeline: &'m wgpu::RenderPipeline,
    pub(crate) bind_group: &'m wgpu::BindGroup,
}

#[derive(Default)]
struct MaterialGpu {
    shader: Option<wgpu::ShaderModule>,
    layouts: FxHashMap<bool, wgpu::BindGroupLayout>,
    pipelines: FxHashMap<PipelineKey, wgpu::RenderPipeline>,
    samplers: FxHashMap<TextureFilter, wgpu::Sampler>,
    uniform_buffer: Option<wgpu::Buffer>,
    bind_groups: FxHashMap<BindKey, wgpu::BindGroup>,
}

/// Bind groups alive at once; ping-pong passes alternate between two.
const MAX_CACHED_BIND_GROUPS: usize = 4;

/// A shader drawn over the whole viewport, reading one input texture.
pub struct FullscreenMaterial {
    label: String,
    source: Cow<'static, str>,
    file_path: String,
    input_buffer: Option<TextureHandle>,
    uniforms: Uniforms,
    defines: BTreeMap<String, String>,
    depth_test: bool,
    depth_write: bool,
    blend: Option<wgpu::BlendState>,
    gpu: MaterialGpu,
}

impl FullscreenMaterial {
    /// Create a material from WGSL source. `file_path` names the source in
    /// diagnostics. The uniform order must match the shader's uniform
    /// struct.
    pub fn new(
        label: impl Into<String>,
        source: impl Into<Cow<'static, str>>,
        file_path: impl Into<String>,
        uniforms: Uniforms,
    ) -> Self {
        Self {
            label: label.into(),
            source: source.into(),
            file_path: file_path.into(),
            input_buffer: None,
            uniforms,
            defines: BTreeMap::new(),
            depth_test: true,
            depth_write: true,
            blend: None,
            gpu: MaterialGpu::default(),
        }
    }

    /// Debug label.
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Source path used in diagnostics.
    pub fn file_path(&self) -> &str {
        &self.file_path
    }

    /// Texture most recently bound as this material's input.
    pub fn input_buffer(&self) -> Option<TextureHandle> {
        self.input_buffer
    }

    /// Bind a texture as this material's input.
    pub fn set_input_buffer(&mut self, texture: &Texture) {
        self.input_buffer = Some(texture.handle());
    }

    /// All uniforms.
    pub fn uniforms(&self) -> &Uniforms {
        &self.uniforms
    }

    /// Mutable uniforms. Values are uploaded on every draw.
    pub fn uniforms_mut(&mut self) -> &mut Uniforms {
        &mut self.uniforms
    }

    /// Current value of one uniform.
    pub fn uniform(&self, name: &str) -> Option<UniformValue> {
        self.uniforms.get(name)
    }

    /// Update or add one uniform.
    pub fn set_uniform(&mut self, name: &str, value: impl Into<UniformValue>) {
        self.uniforms.set(name, value);
    }

    /// All compile-time defines.
    pub fn defines(&self) -> &BTreeMap<String, String> {
        &self.defines
    }

    /// Value of one define, if set.
    pub fn define(&self, name: &str) -> Option<&str> {
        self.defines.get(name).map(String::as_str)
    }

    /// Set a compile-time define. Changing a define after the shader has
    /// been compiled forces a recompile on the next draw.
    pub fn set_define(&mut self, name: &str, value: impl Into<String>) {
        let value = value.into();
        if self.defines.get(name) == Some(&value) {
            return;
        }
        let _ = self.defines.insert(name.to_owned(), value);
        self.invalidate_shader();
    }

    /// Remove a compile-time define.
    pub fn remove_define(&mut self, name: &str) {
        if self.defines.remove(name).is_some() {
            self.invalidate_shader();
        }
    }

    /// Whether the shader is currently compiled.
    pub fn is_compiled(&self) -> bool {
        self.gpu.shader.is_some()
    }

    /// Whether the quad is depth tested against the destination.
    pub fn depth_test(&self) -> bool {
        self.depth_test
    }

    /// Enable or disable depth testing.
    pub fn set_depth_test(&mut self, enabled: bool) {
        if self.depth_test != enabled {
            self.depth_test = enabled;
            self.gpu.pipelines.clear();
        }
    }

    /// Whether the quad writes the destination's depth.
    pub fn depth_write(&self) -> bool {
        self.depth_write
    }

    /// Enable or disable depth writes.
    pub fn set_depth_write(&mut self, enabled: bool) {
        if self.depth_write != enabled {
            self.depth_write = enabled;
            self.gpu.pipelines.clear();
        }
    }

    /// Color blending; `None` overwrites the destination.
    pub fn blend(&self) -> Option<wgpu::BlendState> {
        self.blend
    }

    /// Change color blending.
    pub fn set_blend(&mut self, blend: Option<wgpu::BlendState>) {
        if self.blend != blend {
            self.blend = blend;
            self.gpu.pipelines.clear();
        }
    }

    /// Drop every GPU object. They are rebuilt on the next draw.
    pub fn release(&mut self) {
        self.gpu = MaterialGpu::default();
    }

    fn invalidate_shader(&mut self) {
        if self.gpu.shader.take().is_some() {
            log::debug!("defines of '{}' changed, recompiling", self.label);
            self.gpu.pipelines.clear();
        }
    }

    /// Compile what is missing, upload uniforms and resolve the bind group
    /// for sampling `source`.
    pub(crate) fn prepare_draw(
        &mut self,
        context: &RenderContext,
        shaders: &mut ShaderComposer,
        key: PipelineKey,
        source: &Texture,
        source_view: &wgpu::TextureView,
    ) -> Result<MaterialBindings<'_>, PostFxError> {
        let device = &context.device;

        if self.gpu.shader.is_none() {
            let module = shaders.compose(
                device,
                &self.label,
                &self.source,
                &self.file_path,
                &self.defines,
            )?;
            self.gpu.shader = Some(module);
        }

        let layout: &wgpu::BindGroupLayout = self
            .gpu
            .layouts
            .entry(key.filterable)
            .or_insert_with(|| {
                device.create_bind_group_layout(
                    &wgpu::BindGroupLayoutDescriptor {
                        label: Some("Fullscreen Material Bind Group Layout"),
                        entries: &[
                            pipeline_helpers::texture_2d(0, key.filterable),
                            pipeline_helpers::sampler(1, key.filterable),
                            pipeline_helpers::uniform_buffer(2),
                        ],
                    },
                )
            });

        if !self.gpu.pipelines.contains_key(&key) {
            if let Some(shader) = &self.gpu.shader {
                let depth_stencil = key.depth_format.map(|format| {
                    overlay_depth_stencil_state(
                        format,
                        self.depth_test,
                        self.depth_write,
                    )
                });
                let pipeline = pipeline_helpers::create_screen_space_pipeline(
                    device,
                    &self.label,
                    shader,
                    key.color_format,
                    self.blend,
                    depth_stencil,
                    &[layout],
                );
                let _ = self.gpu.pipelines.insert(key, pipeline);
            }
        }

        let bytes = self.uniforms.to_bytes();
        let stale_buffer = self
            .gpu
            .uniform_buffer
            .as_ref()
            .is_none_or(|buffer| buffer.size() != bytes.len() as u64);
        if stale_buffer {
            self.gpu.uniform_buffer =
                Some(device.create_buffer(&wgpu::BufferDescriptor {
                    label: Some(&format!("{} Uniforms", self.label)),
                    size: bytes.len() as u64,
                    usage: wgpu::BufferUsages::UNIFORM
                        | wgpu::BufferUsages::COPY_DST,
                    mapped_at_creation: false,
                }));
            self.gpu.bind_groups.clear();
        }
        let Some(uniform_buffer) = &self.gpu.uniform_buffer else {
            return Err(PostFxError::ShaderCompose {
                file_path: self.file_path.clone(),
                message: String::from("uniform buffer missing"),
            });
        };
        context.queue.write_buffer(uniform_buffer, 0, &bytes);

        // Float32 sources fall back to nearest sampling without
        // FLOAT32_FILTERABLE.
        let filter = if key.filterable {
            source.filter()
        } else {
            if source.filter().is_linear() {
                log::debug!(
                    "'{}' cannot be filtered on this device, sampling nearest",
                    source.name()
                );
            }
            TextureFilter::NEAREST
        };
        let bind_key = BindKey {
            texture: source.handle(),
            generation: source.generation(),
            filter,
            filterable: key.filterable,
        };
        if !self.gpu.bind_groups.contains_key(&bind_key) {
            if self.gpu.bind_groups.len() >= MAX_CACHED_BIND_GROUPS {
                self.gpu.bind_groups.clear();
            }
            let sampler: &wgpu::Sampler =
                self.gpu.samplers.entry(filter).or_insert_with(|| {
                pipeline_helpers::texture_sampler(
                    device,
                    "Fullscreen Material Sampler",
                    filter,
                )
            });
            let bind_group =
                device.create_bind_group(&wgpu::BindGroupDescriptor {
                    label: Some(&format!("{} Bind Group", self.label)),
                    layout,
                    entries: &[
                        wgpu::BindGroupEntry {
                            binding: 0,
                            resource: wgpu::BindingResource::TextureView(
                                source_view,
                            ),
                        },
                        wgpu::BindGroupEntry {
                            binding: 1,
                            resource: wgpu::BindingResource::Sampler(sampler),
                        },
                        wgpu::BindGroupEntry {
                            binding: 2,
                            resource: uniform_buffer.as_entire_binding(),
                        },
                    ],
                });
            let _ = self.gpu.bind_groups.insert(bind_key, bind_group);
        }

        match (
            self.gpu.pipelines.get(&key),
            self.gpu.bind_groups.get(&bind_key),
        ) {
            (Some(pipeline), Some(bind_group)) => Ok(MaterialBindings {
                label: &self.label,
                blends: self.blend.is_some(),
                pipeline,
                bind_group,
            }),
            _ => Err(PostFxError::ShaderCompose {
                file_path: self.file_path.clone(),
                message: String::from("pipeline was not created"),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gpu::texture::RenderTarget;

    fn material() -> FullscreenMaterial {
        FullscreenMaterial::new(
            "Test",
            "",
            "test.wgsl",
            Uniforms::new().with("value", 1.0_f32),
        )
    }

    #[test]
    fn defines_start_empty() {
        let m = material();
        assert!(m.defines().is_empty());
        assert_eq!(m.define(HIGH_PRECISION_DEFINE), None);
        assert!(!m.is_compiled());
    }

    #[test]
    fn set_and_remove_define() {
        let mut m = material();
        m.set_define(HIGH_PRECISION_DEFINE, "1");
        assert_eq!(m.define(HIGH_PRECISION_DEFINE), Some("1"));
        m.remove_define(HIGH_PRECISION_DEFINE);
        assert_eq!(m.define(HIGH_PRECISION_DEFINE), None);
    }

    #[test]
    fn input_buffer_records_handle() {
        let mut m = material();
        let target = RenderTarget::new(4, 4);
        assert_eq!(m.input_buffer(), None);
        m.set_input_buffer(target.texture());
        assert_eq!(m.input_buffer(), Some(target.texture().handle()));
    }

    #[test]
    fn uniform_updates_in_place() {
        let mut m = material();
        m.set_uniform("value", 2.5_f32);
        assert_eq!(m.uniform("value"), Some(UniformValue::Float(2.5)));
        assert_eq!(m.uniforms().len(), 1);
    }
}
