//! Post-processing: fullscreen materials, the passes built on them and the
//! composer that chains passes over ping-pong buffers.

pub mod composer;
pub mod material;
pub(crate) mod pipeline_util;
pub mod postprocess;
