//! Crate-level error types.

use std::fmt;

use crate::gpu::render_context::RenderContextError;

/// Errors produced by the postfx crate.
#[derive(Debug)]
pub enum PostFxError {
    /// GPU context initialization failure.
    Gpu(RenderContextError),
    /// A built-in shader module could not be registered with the composer.
    ShaderModule {
        /// Path of the module that failed to register.
        file_path: String,
        /// Composer diagnostic.
        message: String,
    },
    /// A fullscreen shader failed to compose with its current defines.
    ShaderCompose {
        /// Path of the shader that failed to compose.
        file_path: String,
        /// Composer diagnostic.
        message: String,
    },
    /// Pixel data handed to a render target does not match its size and
    /// pixel type.
    InvalidPixelData {
        /// Byte count implied by the target's size and pixel type.
        expected: usize,
        /// Byte count actually supplied.
        actual: usize,
    },
    /// Reading a render target back to the CPU failed.
    Readback(String),
    /// Generic I/O failure.
    Io(std::io::Error),
    /// TOML options parsing/serialization failure.
    OptionsParse(String),
}

impl fmt::Display for PostFxError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Gpu(e) => write!(f, "GPU error: {e}"),
            Self::ShaderModule { file_path, message } => {
                write!(f, "failed to register shader module '{file_path}': {message}")
            }
            Self::ShaderCompose { file_path, message } => {
                write!(f, "failed to compose shader '{file_path}': {message}")
            }
            Self::InvalidPixelData { expected, actual } => {
                write!(f, "pixel data has {actual} bytes, expected {expected}")
            }
            Self::Readback(msg) => write!(f, "readback error: {msg}"),
            Self::Io(e) => write!(f, "I/O error: {e}"),
            Self::OptionsParse(msg) => {
                write!(f, "options parse error: {msg}")
            }
        }
    }
}

impl std::error::Error for PostFxError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Gpu(e) => Some(e),
            Self::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<RenderContextError> for PostFxError {
    fn from(e: RenderContextError) -> Self {
        Self::Gpu(e)
    }
}

impl From<std::io::Error> for PostFxError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}
