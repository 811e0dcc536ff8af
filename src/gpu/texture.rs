//! Render targets and the textures backing them.
//!
//! CPU-side state (size, pixel type, filtering, attachments) is always
//! available; GPU storage is allocated lazily by [`RenderTarget::prepare`]
//! and dropped whenever the size or pixel type changes. A target can
//! therefore be built, resized and configured before any device exists.

use std::sync::atomic::{AtomicU64, Ordering};

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::error::PostFxError;
use crate::gpu::render_context::RenderContext;

/// Per-channel storage type of a render target.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Default,
    Serialize,
    Deserialize,
    JsonSchema,
)]
#[serde(rename_all = "snake_case")]
pub enum PixelType {
    /// 8-bit normalized channels (`Rgba8Unorm`).
    #[default]
    UnsignedByte,
    /// 16-bit float channels (`Rgba16Float`).
    HalfFloat,
    /// 32-bit float channels (`Rgba32Float`).
    Float,
}

impl PixelType {
    /// The wgpu color format used for targets of this type.
    #[must_use]
    pub fn format(self) -> wgpu::TextureFormat {
        match self {
            Self::UnsignedByte => wgpu::TextureFormat::Rgba8Unorm,
            Self::HalfFloat => wgpu::TextureFormat::Rgba16Float,
            Self::Float => wgpu::TextureFormat::Rgba32Float,
        }
    }

    /// Anything wider than 8 bits per channel.
    #[must_use]
    pub fn is_high_precision(self) -> bool {
        self != Self::UnsignedByte
    }

    /// Size of one RGBA texel in bytes.
    #[must_use]
    pub fn bytes_per_pixel(self) -> u32 {
        match self {
            Self::UnsignedByte => 4,
            Self::HalfFloat => 8,
            Self::Float => 16,
        }
    }

    /// Encode `f32` channels into texel bytes of this type. 8-bit channels
    /// are clamped to [0, 1] and rounded.
    #[must_use]
    pub fn encode(self, channels: &[f32]) -> Vec<u8> {
        match self {
            Self::UnsignedByte => channels
                .iter()
                .map(|&c| (c.clamp(0.0, 1.0) * 255.0).round() as u8)
                .collect(),
            Self::HalfFloat => channels
                .iter()
                .flat_map(|&c| half::f16::from_f32(c).to_le_bytes())
                .collect(),
            Self::Float => bytemuck::cast_slice(channels).to_vec(),
        }
    }

    /// Decode texel bytes of this type into `f32` channels. 8-bit channels
    /// are normalized to [0, 1].
    #[must_use]
    pub fn decode(self, bytes: &[u8]) -> Vec<f32> {
        match self {
            Self::UnsignedByte => {
                bytes.iter().map(|&b| f32::from(b) / 255.0).collect()
            }
            Self::HalfFloat => bytes
                .chunks_exact(2)
                .map(|c| half::f16::from_le_bytes([c[0], c[1]]).to_f32())
                .collect(),
            Self::Float => bytemuck::pod_collect_to_vec::<u8, f32>(bytes),
        }
    }
}

/// Sampling filter for one direction of minification/magnification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum FilterMode {
    /// Nearest texel.
    Nearest,
    /// Bilinear interpolation.
    #[default]
    Linear,
}

impl FilterMode {
    pub(crate) fn to_wgpu(self) -> wgpu::FilterMode {
        match self {
            Self::Nearest => wgpu::FilterMode::Nearest,
            Self::Linear => wgpu::FilterMode::Linear,
        }
    }
}

/// How downstream consumers sample a texture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TextureFilter {
    /// Minification filter.
    pub min: FilterMode,
    /// Magnification filter.
    pub mag: FilterMode,
}

impl TextureFilter {
    /// Linear in both directions.
    pub const LINEAR: Self = Self {
        min: FilterMode::Linear,
        mag: FilterMode::Linear,
    };
    /// Nearest in both directions.
    pub const NEAREST: Self = Self {
        min: FilterMode::Nearest,
        mag: FilterMode::Nearest,
    };

    /// Whether either direction interpolates.
    #[must_use]
    pub fn is_linear(self) -> bool {
        self.min == FilterMode::Linear || self.mag == FilterMode::Linear
    }
}

impl Default for TextureFilter {
    fn default() -> Self {
        Self::LINEAR
    }
}

static NEXT_TEXTURE_ID: AtomicU64 = AtomicU64::new(1);

/// Opaque, process-unique identity of a [`Texture`].
///
/// The handle survives resizes; the GPU storage behind it does not, so
/// views must be re-queried after [`RenderTarget::set_size`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TextureHandle(u64);

impl TextureHandle {
    fn next() -> Self {
        Self(NEXT_TEXTURE_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Raw numeric id.
    #[must_use]
    pub fn id(self) -> u64 {
        self.0
    }
}

#[derive(Debug)]
struct GpuTexture {
    texture: wgpu::Texture,
    view: wgpu::TextureView,
}

impl GpuTexture {
    fn new(
        device: &wgpu::Device,
        label: &str,
        width: u32,
        height: u32,
        format: wgpu::TextureFormat,
        usage: wgpu::TextureUsages,
    ) -> Self {
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size: wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format,
            usage,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        Self { texture, view }
    }
}

/// Color texture owned by a [`RenderTarget`].
#[derive(Debug)]
pub struct Texture {
    handle: TextureHandle,
    name: String,
    pixel_type: PixelType,
    filter: TextureFilter,
    width: u32,
    height: u32,
    generation: u64,
    gpu: Option<GpuTexture>,
}

impl Texture {
    fn new(
        width: u32,
        height: u32,
        pixel_type: PixelType,
        filter: TextureFilter,
    ) -> Self {
        Self {
            handle: TextureHandle::next(),
            name: String::from("RenderTarget"),
            pixel_type,
            filter,
            width,
            height,
            generation: 0,
            gpu: None,
        }
    }

    /// Stable identity of this texture.
    pub fn handle(&self) -> TextureHandle {
        self.handle
    }

    /// Debug label used for GPU allocations.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Set the debug label. Takes effect on the next allocation.
    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    /// Per-channel storage type.
    pub fn pixel_type(&self) -> PixelType {
        self.pixel_type
    }

    /// The wgpu color format.
    pub fn format(&self) -> wgpu::TextureFormat {
        self.pixel_type.format()
    }

    /// Sampling filter used by consumers of this texture.
    pub fn filter(&self) -> TextureFilter {
        self.filter
    }

    /// Change the sampling filter. Storage is kept.
    pub fn set_filter(&mut self, filter: TextureFilter) {
        self.filter = filter;
    }

    /// Width in texels.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Height in texels.
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Number of GPU allocations made for this texture so far. Changes
    /// whenever the storage behind [`Self::view`] is replaced.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Whether GPU storage currently exists.
    pub fn is_realized(&self) -> bool {
        self.gpu.is_some()
    }

    /// View of the current GPU storage, if allocated.
    pub fn view(&self) -> Option<&wgpu::TextureView> {
        self.gpu.as_ref().map(|gpu| &gpu.view)
    }

    /// The current GPU texture, if allocated.
    pub fn raw(&self) -> Option<&wgpu::Texture> {
        self.gpu.as_ref().map(|gpu| &gpu.texture)
    }

    fn set_pixel_type(&mut self, pixel_type: PixelType) {
        if self.pixel_type != pixel_type {
            self.pixel_type = pixel_type;
            self.release();
        }
    }

    fn resize(&mut self, width: u32, height: u32) {
        if self.width != width || self.height != height {
            self.width = width;
            self.height = height;
            self.release();
        }
    }

    fn prepare(&mut self, device: &wgpu::Device) {
        if self.gpu.is_some() {
            return;
        }
        log::debug!(
            "allocating '{}' {}x{} {:?}",
            self.name,
            self.width,
            self.height,
            self.pixel_type
        );
        self.gpu = Some(GpuTexture::new(
            device,
            &self.name,
            self.width,
            self.height,
            self.format(),
            wgpu::TextureUsages::RENDER_ATTACHMENT
                | wgpu::TextureUsages::TEXTURE_BINDING
                | wgpu::TextureUsages::COPY_SRC
                | wgpu::TextureUsages::COPY_DST,
        ));
        self.generation += 1;
    }

    /// Drops the handle only; wgpu keeps the storage alive for command
    /// buffers that still reference it.
    fn release(&mut self) {
        self.gpu = None;
    }
}

/// Creation parameters for a [`RenderTarget`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderTargetOptions {
    /// Color storage type.
    pub pixel_type: PixelType,
    /// Sampling filter for the color texture.
    pub filter: TextureFilter,
    /// Allocate a depth attachment.
    pub depth_buffer: bool,
    /// Allocate a stencil attachment.
    pub stencil_buffer: bool,
}

impl Default for RenderTargetOptions {
    fn default() -> Self {
        Self {
            pixel_type: PixelType::UnsignedByte,
            filter: TextureFilter::LINEAR,
            depth_buffer: true,
            stencil_buffer: false,
        }
    }
}

/// An offscreen color texture plus optional depth/stencil attachment.
#[derive(Debug)]
pub struct RenderTarget {
    texture: Texture,
    depth_buffer: bool,
    stencil_buffer: bool,
    depth: Option<GpuTexture>,
}

impl RenderTarget {
    /// Create a target with default options (8-bit, linear, depth, no
    /// stencil). Zero dimensions are clamped to 1.
    #[must_use]
    pub fn new(width: u32, height: u32) -> Self {
        Self::with_options(width, height, RenderTargetOptions::default())
    }

    /// Create a target with explicit options. Zero dimensions are clamped
    /// to 1.
    #[must_use]
    pub fn with_options(
        width: u32,
        height: u32,
        options: RenderTargetOptions,
    ) -> Self {
        Self {
            texture: Texture::new(
                width.max(1),
                height.max(1),
                options.pixel_type,
                options.filter,
            ),
            depth_buffer: options.depth_buffer,
            stencil_buffer: options.stencil_buffer,
            depth: None,
        }
    }

    /// Width in texels.
    pub fn width(&self) -> u32 {
        self.texture.width
    }

    /// Height in texels.
    pub fn height(&self) -> u32 {
        self.texture.height
    }

    /// `(width, height)` in texels.
    pub fn size(&self) -> (u32, u32) {
        (self.texture.width, self.texture.height)
    }

    /// The color texture.
    pub fn texture(&self) -> &Texture {
        &self.texture
    }

    /// Mutable access to the color texture (name, filter).
    pub fn texture_mut(&mut self) -> &mut Texture {
        &mut self.texture
    }

    /// Whether a depth attachment is allocated alongside the color texture.
    pub fn has_depth(&self) -> bool {
        self.depth_buffer
    }

    /// Whether a stencil attachment is allocated alongside the color
    /// texture.
    pub fn has_stencil(&self) -> bool {
        self.stencil_buffer
    }

    /// Format of the depth/stencil attachment, if any.
    pub fn depth_format(&self) -> Option<wgpu::TextureFormat> {
        match (self.depth_buffer, self.stencil_buffer) {
            (true, true) => Some(wgpu::TextureFormat::Depth24PlusStencil8),
            (true, false) => Some(wgpu::TextureFormat::Depth32Float),
            (false, true) => Some(wgpu::TextureFormat::Stencil8),
            (false, false) => None,
        }
    }

    /// View of the depth/stencil attachment, if allocated.
    pub fn depth_view(&self) -> Option<&wgpu::TextureView> {
        self.depth.as_ref().map(|gpu| &gpu.view)
    }

    /// Resize the target. Zero dimensions are clamped to 1; unchanged
    /// sizes keep the existing storage.
    pub fn set_size(&mut self, width: u32, height: u32) {
        let (width, height) = (width.max(1), height.max(1));
        if self.size() == (width, height) {
            return;
        }
        self.texture.resize(width, height);
        self.depth = None;
    }

    /// Change the color storage type.
    pub fn set_pixel_type(&mut self, pixel_type: PixelType) {
        self.texture.set_pixel_type(pixel_type);
    }

    /// Whether GPU storage currently exists.
    pub fn is_realized(&self) -> bool {
        self.texture.is_realized()
    }

    /// Allocate GPU storage if it does not exist yet.
    pub fn prepare(&mut self, device: &wgpu::Device) {
        self.texture.prepare(device);
        if self.depth.is_none() {
            if let Some(format) = self.depth_format() {
                self.depth = Some(GpuTexture::new(
                    device,
                    &format!("{} Depth", self.texture.name),
                    self.texture.width,
                    self.texture.height,
                    format,
                    wgpu::TextureUsages::RENDER_ATTACHMENT,
                ));
            }
        }
    }

    /// Release all GPU storage now. The target stays usable and is
    /// re-allocated by the next [`Self::prepare`].
    pub fn dispose(&mut self) {
        self.texture.release();
        self.depth = None;
    }

    /// Number of bytes a full-target upload or readback carries.
    pub fn byte_len(&self) -> usize {
        self.texture.width as usize
            * self.texture.height as usize
            * self.texture.pixel_type.bytes_per_pixel() as usize
    }

    /// Upload tightly packed RGBA texels, allocating storage if needed.
    ///
    /// # Errors
    ///
    /// Returns [`PostFxError::InvalidPixelData`] if `data` does not cover
    /// exactly `width * height` texels of the target's pixel type.
    pub fn write_pixels(
        &mut self,
        context: &RenderContext,
        data: &[u8],
    ) -> Result<(), PostFxError> {
        let expected = self.byte_len();
        if data.len() != expected {
            return Err(PostFxError::InvalidPixelData {
                expected,
                actual: data.len(),
            });
        }
        self.prepare(&context.device);
        let Some(texture) = self.texture.raw() else {
            return Ok(());
        };
        let bytes_per_row =
            self.texture.width * self.texture.pixel_type.bytes_per_pixel();
        context.queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            data,
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(bytes_per_row),
                rows_per_image: Some(self.texture.height),
            },
            self.extent(),
        );
        Ok(())
    }

    /// Read the color texture back as tightly packed RGBA texels.
    ///
    /// Blocks until the GPU has finished all submitted work.
    ///
    /// # Errors
    ///
    /// Returns [`PostFxError::Readback`] if the target has no GPU storage
    /// or the buffer mapping fails.
    pub fn read_pixels(
        &self,
        context: &RenderContext,
    ) -> Result<Vec<u8>, PostFxError> {
        let Some(texture) = self.texture.raw() else {
            return Err(PostFxError::Readback(format!(
                "'{}' has no GPU storage",
                self.texture.name
            )));
        };

        let unpadded =
            self.texture.width * self.texture.pixel_type.bytes_per_pixel();
        let padded = unpadded.div_ceil(wgpu::COPY_BYTES_PER_ROW_ALIGNMENT)
            * wgpu::COPY_BYTES_PER_ROW_ALIGNMENT;
        let staging = context.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Readback Staging Buffer"),
            size: u64::from(padded) * u64::from(self.texture.height),
            usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
            mapped_at_creation: false,
        });

        let mut encoder = context.create_encoder();
        encoder.copy_texture_to_buffer(
            wgpu::TexelCopyTextureInfo {
                texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            wgpu::TexelCopyBufferInfo {
                buffer: &staging,
                layout: wgpu::TexelCopyBufferLayout {
                    offset: 0,
                    bytes_per_row: Some(padded),
                    rows_per_image: Some(self.texture.height),
                },
            },
            self.extent(),
        );
        context.submit(encoder);

        let slice = staging.slice(..);
        let (sender, receiver) = std::sync::mpsc::channel();
        slice.map_async(wgpu::MapMode::Read, move |result| {
            let _ = sender.send(result);
        });
        let _ = context
            .device
            .poll(wgpu::PollType::Wait)
            .map_err(|e| PostFxError::Readback(e.to_string()))?;
        receiver
            .recv()
            .map_err(|e| PostFxError::Readback(e.to_string()))?
            .map_err(|e| PostFxError::Readback(e.to_string()))?;

        let mut pixels = Vec::with_capacity(self.byte_len());
        {
            let mapped = slice.get_mapped_range();
            for row in mapped.chunks(padded as usize) {
                pixels.extend_from_slice(&row[..unpadded as usize]);
            }
        }
        staging.unmap();
        Ok(pixels)
    }

    /// Read the color texture back and decode every channel to `f32`
    /// (8-bit channels are normalized to [0, 1]).
    ///
    /// # Errors
    ///
    /// See [`Self::read_pixels`].
    pub fn read_pixels_f32(
        &self,
        context: &RenderContext,
    ) -> Result<Vec<f32>, PostFxError> {
        let bytes = self.read_pixels(context)?;
        Ok(self.texture.pixel_type.decode(&bytes))
    }

    fn extent(&self) -> wgpu::Extent3d {
        wgpu::Extent3d {
            width: self.texture.width,
            height: self.texture.height,
            depth_or_array_layers: 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    #[test]
    fn zero_dimensions_clamp_to_one() {
        let target = RenderTarget::new(0, 0);
        assert_eq!(target.size(), (1, 1));

        let mut target = RenderTarget::new(16, 16);
        target.set_size(0, 32);
        assert_eq!(target.size(), (1, 32));
    }

    #[test]
    fn handle_survives_resize() {
        let mut target = RenderTarget::new(4, 4);
        let handle = target.texture().handle();
        target.set_size(800, 600);
        assert_eq!(target.texture().handle(), handle);
        assert_eq!(target.texture().width(), 800);
        assert_eq!(target.texture().height(), 600);
    }

    #[test]
    fn handles_are_unique() {
        let a = RenderTarget::new(1, 1);
        let b = RenderTarget::new(1, 1);
        assert_ne!(a.texture().handle(), b.texture().handle());
    }

    #[test]
    fn pixel_type_formats() {
        assert_eq!(
            PixelType::UnsignedByte.format(),
            wgpu::TextureFormat::Rgba8Unorm
        );
        assert_eq!(
            PixelType::HalfFloat.format(),
            wgpu::TextureFormat::Rgba16Float
        );
        assert!(!PixelType::UnsignedByte.is_high_precision());
        assert!(PixelType::Float.is_high_precision());
    }

    #[test]
    fn depth_format_follows_attachments() {
        let opts = |depth_buffer, stencil_buffer| RenderTargetOptions {
            depth_buffer,
            stencil_buffer,
            ..Default::default()
        };
        assert_eq!(
            RenderTarget::with_options(1, 1, opts(false, false)).depth_format(),
            None
        );
        assert_eq!(
            RenderTarget::with_options(1, 1, opts(true, true)).depth_format(),
            Some(wgpu::TextureFormat::Depth24PlusStencil8)
        );
        assert_eq!(
            RenderTarget::with_options(1, 1, opts(false, true)).depth_format(),
            Some(wgpu::TextureFormat::Stencil8)
        );
    }

    #[test]
    fn byte_len_tracks_pixel_type() {
        let mut target = RenderTarget::new(2, 3);
        assert_eq!(target.byte_len(), 24);
        target.set_pixel_type(PixelType::Float);
        assert_eq!(target.byte_len(), 96);
    }

    #[test]
    fn decodes_half_floats() {
        let one = half::f16::from_f32(1.0).to_le_bytes();
        let half_value = half::f16::from_f32(0.5).to_le_bytes();
        let bytes = [one[0], one[1], half_value[0], half_value[1]];
        assert_eq!(PixelType::HalfFloat.decode(&bytes), [1.0, 0.5]);
    }

    #[test]
    fn encodes_normalized_bytes() {
        assert_eq!(
            PixelType::UnsignedByte.encode(&[0.0, 1.0, 2.0, -1.0]),
            [0, 255, 255, 0]
        );
        assert_eq!(PixelType::Float.encode(&[1.0]), 1.0_f32.to_le_bytes());
        assert_eq!(
            PixelType::HalfFloat.decode(&PixelType::HalfFloat.encode(&[0.25])),
            [0.25]
        );
    }

    #[test]
    fn same_size_keeps_gpu_storage() {
        let Ok(context) = pollster::block_on(RenderContext::new_headless())
        else {
            return;
        };
        let mut target = RenderTarget::new(32, 16);
        target.prepare(&context.device);
        let generation = target.texture().generation();
        assert!(target.is_realized());

        target.set_size(32, 16);
        assert!(target.is_realized());
        assert!(target.depth_view().is_some());
        assert_eq!(target.texture().generation(), generation);

        target.set_size(16, 16);
        assert!(!target.is_realized());
        assert!(target.depth_view().is_none());
        target.prepare(&context.device);
        assert_eq!(target.texture().generation(), generation + 1);
    }

    proptest! {
        #[test]
        fn set_size_reports_requested_size(w in 1u32..4096, h in 1u32..4096) {
            let mut target = RenderTarget::new(1, 1);
            target.set_size(w, h);
            prop_assert_eq!(target.size(), (w, h));
        }

        #[test]
        fn set_size_is_idempotent(w in 1u32..4096, h in 1u32..4096) {
            let mut once = RenderTarget::new(1, 1);
            once.set_size(w, h);
            let generation = once.texture().generation();
            once.set_size(w, h);
            prop_assert_eq!(once.size(), (w, h));
            prop_assert_eq!(once.texture().generation(), generation);
        }
    }
}
