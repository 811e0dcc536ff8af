use std::fmt;

/// Errors that can occur during GPU context initialization.
#[derive(Debug)]
pub enum RenderContextError {
    /// No compatible GPU adapter found.
    AdapterRequest(wgpu::RequestAdapterError),
    /// GPU device request failed (limits or features not met).
    DeviceRequest(wgpu::RequestDeviceError),
}

impl fmt::Display for RenderContextError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AdapterRequest(e) => {
                write!(f, "no compatible GPU adapter found: {e}")
            }
            Self::DeviceRequest(e) => write!(f, "device request failed: {e}"),
        }
    }
}

impl std::error::Error for RenderContextError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::AdapterRequest(e) => Some(e),
            Self::DeviceRequest(e) => Some(e),
        }
    }
}

/// Device capabilities consulted by passes during `initialize` and by the
/// composer when sizing its buffers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RendererCaps {
    /// Largest width or height a 2D render target may have.
    pub max_texture_dimension: u32,
    /// Whether `Rgba32Float` textures may be sampled with linear filtering.
    pub float32_filterable: bool,
}

impl Default for RendererCaps {
    fn default() -> Self {
        Self {
            max_texture_dimension: wgpu::Limits::default()
                .max_texture_dimension_2d,
            float32_filterable: false,
        }
    }
}

impl RendererCaps {
    /// Query the capabilities of an open device.
    #[must_use]
    pub fn from_device(device: &wgpu::Device) -> Self {
        Self {
            max_texture_dimension: device.limits().max_texture_dimension_2d,
            float32_filterable: device
                .features()
                .contains(wgpu::Features::FLOAT32_FILTERABLE),
        }
    }
}

/// Owns the core wgpu resources: device and queue.
///
/// Presentation surfaces stay with the host; frames are handed to the
/// composer as a [`ScreenTarget`](crate::gpu::renderer::ScreenTarget).
pub struct RenderContext {
    /// The wgpu logical device.
    pub device: wgpu::Device,
    /// The wgpu command queue.
    pub queue: wgpu::Queue,
    caps: RendererCaps,
}

impl RenderContext {
    /// Create a render context without any presentation surface.
    ///
    /// `FLOAT32_FILTERABLE` is requested whenever the adapter offers it.
    ///
    /// # Errors
    ///
    /// Returns `RenderContextError` if the adapter or device request fails.
    pub async fn new_headless() -> Result<Self, RenderContextError> {
        let instance = wgpu::Instance::default();
        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                ..Default::default()
            })
            .await
            .map_err(RenderContextError::AdapterRequest)?;

        let info = adapter.get_info();
        log::info!("using adapter '{}' ({:?})", info.name, info.backend);

        let required_features =
            adapter.features() & wgpu::Features::FLOAT32_FILTERABLE;
        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: Some("PostFx Device"),
                required_features,
                required_limits: wgpu::Limits::default(),
                ..Default::default()
            })
            .await
            .map_err(RenderContextError::DeviceRequest)?;

        Ok(Self::from_device(device, queue))
    }

    /// Create a render context from an externally-owned device and queue.
    #[must_use]
    pub fn from_device(device: wgpu::Device, queue: wgpu::Queue) -> Self {
        let caps = RendererCaps::from_device(&device);
        log::debug!(
            "renderer caps: max texture {}, float32 filterable {}",
            caps.max_texture_dimension,
            caps.float32_filterable
        );
        Self { device, queue, caps }
    }

    /// Capabilities of the underlying device.
    pub fn caps(&self) -> RendererCaps {
        self.caps
    }

    /// Create a new command encoder for recording GPU commands.
    pub fn create_encoder(&self) -> wgpu::CommandEncoder {
        self.device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("PostFx Encoder"),
            })
    }

    /// Finish the encoder and submit its command buffer to the GPU queue.
    pub fn submit(&self, encoder: wgpu::CommandEncoder) {
        let _ = self.queue.submit(std::iter::once(encoder.finish()));
    }
}
