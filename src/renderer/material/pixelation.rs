use glam::Vec2;

use super::{FullscreenMaterial, Uniforms};

/// Name of the pixelation block-size uniform.
pub const GRANULARITY: &str = "granularity";
/// Name of the pixelation resolution uniform.
pub const RESOLUTION: &str = "resolution";

impl FullscreenMaterial {
    /// Material that snaps every fragment to the center of a
    /// `granularity`-sized block. `resolution` is the size of the
    /// destination in pixels.
    ///
    /// Depth testing and writing are disabled: the quad is an overlay.
    #[must_use]
    pub fn pixelation() -> Self {
        let mut material = Self::new(
            "Pixelation",
            include_str!("../../../assets/shaders/screen/pixelation.wgsl"),
            "pixelation.wgsl",
            Uniforms::new()
                .with(GRANULARITY, 1.0_f32)
                .with(RESOLUTION, Vec2::ONE),
        );
        material.set_depth_test(false);
        material.set_depth_write(false);
        material
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::renderer::material::UniformValue;

    #[test]
    fn pixelation_is_an_overlay() {
        let m = FullscreenMaterial::pixelation();
        assert!(!m.depth_test());
        assert!(!m.depth_write());
    }

    #[test]
    fn pixelation_uniform_defaults() {
        let m = FullscreenMaterial::pixelation();
        assert_eq!(m.uniform(GRANULARITY), Some(UniformValue::Float(1.0)));
        assert_eq!(m.uniform(RESOLUTION), Some(UniformValue::Vec2(Vec2::ONE)));
        assert_eq!(m.uniforms().offset_of(RESOLUTION), Some(8));
    }
}
