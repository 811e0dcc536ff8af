use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Settings for a [`CopyPass`](crate::renderer::postprocess::CopyPass).
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, JsonSchema)]
#[schemars(title = "Copy", inline)]
#[serde(default)]
pub struct CopyOptions {
    /// Resize the snapshot target along with the viewport.
    #[schemars(title = "Auto Resize")]
    pub auto_resize: bool,
    /// Opacity applied while copying.
    #[schemars(title = "Opacity", range(min = 0.0, max = 1.0), extend("step" = 0.01))]
    pub opacity: f32,
}

impl Default for CopyOptions {
    fn default() -> Self {
        Self {
            auto_resize: true,
            opacity: 1.0,
        }
    }
}

/// Settings for a
/// [`PixelationPass`](crate::renderer::postprocess::PixelationPass).
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, JsonSchema)]
#[schemars(title = "Pixelation", inline)]
#[serde(default)]
pub struct PixelationOptions {
    /// Run the pixelation pass at all.
    #[schemars(title = "Enabled")]
    pub enabled: bool,
    /// Block size in pixels, rounded up to an even number.
    #[schemars(title = "Granularity", range(min = 0.0, max = 100.0), extend("step" = 2.0))]
    pub granularity: f32,
}

impl Default for PixelationOptions {
    fn default() -> Self {
        Self {
            enabled: true,
            granularity: 30.0,
        }
    }
}
