// -- Lint policy ---------------------------------------------------------
// This is the single source of truth for crate-wide lints.

// Broad lint groups
#![deny(clippy::all)]
#![deny(clippy::pedantic)]
#![deny(clippy::nursery)]
// Documentation
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![deny(rustdoc::private_intra_doc_links)]
#![deny(rustdoc::bare_urls)]
// No panicking in library code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]
#![deny(clippy::todo)]
#![deny(clippy::unimplemented)]
// No debug/print artifacts
#![deny(clippy::dbg_macro)]
#![deny(clippy::print_stdout)]
#![deny(clippy::print_stderr)]
// Import hygiene
#![deny(clippy::wildcard_imports)]
// Complexity limits
#![deny(clippy::cognitive_complexity)]
#![deny(clippy::too_many_lines)]
#![deny(clippy::excessive_nesting)]
// Function signature hygiene
#![deny(clippy::too_many_arguments)]
#![deny(clippy::fn_params_excessive_bools)]
// Clone / pass-by-value hygiene
#![deny(clippy::needless_pass_by_value)]
#![deny(clippy::implicit_clone)]
// String hygiene
#![deny(clippy::inefficient_to_string)]
#![deny(clippy::redundant_closure_for_method_calls)]
#![deny(clippy::manual_string_new)]
#![deny(clippy::str_to_string)]
// Cargo lints (warn, not deny since cargo lints can be noisy)
#![warn(clippy::cargo)]
// Unused / redundant code
#![deny(unused_results)]
#![deny(unused_qualifications)]
// Cast hygiene
#![deny(trivial_casts)]
#![deny(trivial_numeric_casts)]

//! Post-processing pass composition on wgpu.
//!
//! Postfx runs a rendered frame through an ordered chain of fullscreen
//! passes. Each pass draws one [`renderer::material::FullscreenMaterial`]
//! (a WGSL shader with one input texture, a uniform struct and compile-time
//! defines) over the whole viewport.
//!
//! # Key entry points
//!
//! - [`renderer::composer::Composer`] - owns the ping-pong buffers and runs
//!   the pass list
//! - [`renderer::postprocess::Pass`] - the contract every pass implements
//! - [`renderer::postprocess::CopyPass`] - snapshots the current frame into
//!   a target it owns
//! - [`renderer::postprocess::PixelationPass`] - blocky low-resolution look
//! - [`options::Options`] - TOML-backed configuration
//!
//! # Architecture
//!
//! CPU-side state (sizes, pixel types, uniforms, defines) never needs a
//! device. GPU storage, shader modules and pipelines are created on the
//! first draw and rebuilt when the state they depend on changes, so a chain
//! can be assembled and configured before a [`gpu::render_context::RenderContext`]
//! exists.

pub mod error;
pub mod gpu;
pub mod options;
pub mod renderer;

pub use error::PostFxError;
pub use gpu::render_context::{RenderContext, RendererCaps};
pub use gpu::texture::{PixelType, RenderTarget, TextureHandle};
pub use options::{ComposerOptions, Options};
pub use renderer::composer::Composer;
pub use renderer::material::FullscreenMaterial;
pub use renderer::postprocess::{
    AnyPass, CopyPass, Pass, PixelationPass, ShaderPass,
};
