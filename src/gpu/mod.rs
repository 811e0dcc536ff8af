//! GPU resource management utilities.
//!
//! Provides headless wgpu device initialization, lazily allocated render
//! targets, shader composition and the per-frame fullscreen renderer.

/// Shared wgpu boilerplate helpers for screen-space pipelines.
pub mod pipeline_helpers;
/// wgpu device and queue initialization.
pub mod render_context;
/// Records fullscreen draws into a command encoder.
pub mod renderer;
/// WGSL shader composition with `#import` and `#ifdef` support via naga-oil.
pub mod shader_composer;
/// Render targets and the textures backing them.
pub mod texture;
