use super::{FullscreenMaterial, Uniforms};

/// Name of the copy material's opacity uniform.
pub const OPACITY: &str = "opacity";

impl FullscreenMaterial {
    /// Material that copies its input, scaled by `opacity` (default 1.0).
    /// Never touches the destination's depth.
    #[must_use]
    pub fn copy() -> Self {
        let mut material = Self::new(
            "Copy",
            include_str!("../../../assets/shaders/screen/copy.wgsl"),
            "copy.wgsl",
            Uniforms::new().with(OPACITY, 1.0_f32),
        );
        material.set_depth_test(false);
        material.set_depth_write(false);
        material
    }
}
