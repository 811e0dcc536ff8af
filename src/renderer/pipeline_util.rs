/// Depth/stencil state for a fullscreen draw into a target that carries a
/// depth or stencil attachment.
///
/// With depth testing disabled the quad always passes; depth writes are only
/// honored when the attachment actually has a depth aspect.
pub fn overlay_depth_stencil_state(
    format: wgpu::TextureFormat,
    depth_test: bool,
    depth_write: bool,
) -> wgpu::DepthStencilState {
    let has_depth = format.has_depth_aspect();
    wgpu::DepthStencilState {
        format,
        depth_write_enabled: has_depth && depth_write,
        depth_compare: if has_depth && depth_test {
            wgpu::CompareFunction::LessEqual
        } else {
            wgpu::CompareFunction::Always
        },
        stencil: wgpu::StencilState::default(),
        bias: wgpu::DepthBiasState::default(),
    }
}
