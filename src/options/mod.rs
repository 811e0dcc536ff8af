//! Composer and pass settings with TOML preset support.
//!
//! Options serialize to/from TOML so a chain can be described in a preset
//! file and loaded at startup. Every section uses `#[serde(default)]`, so a
//! preset only needs the values it changes.

mod composer;
mod passes;

use std::path::Path;

pub use composer::ComposerOptions;
pub use passes::{CopyOptions, PixelationOptions};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::error::PostFxError;

/// Top-level options container.
#[derive(
    Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Default, JsonSchema,
)]
#[serde(default)]
pub struct Options {
    /// Buffer allocation and pass wiring.
    pub composer: ComposerOptions,
    /// Snapshot pass settings.
    pub copy: CopyOptions,
    /// Pixelation pass settings.
    pub pixelation: PixelationOptions,
}

impl Options {
    /// Generate JSON Schema describing every option.
    #[must_use]
    pub fn json_schema() -> schemars::Schema {
        schemars::schema_for!(Options)
    }

    /// Load options from a TOML file. Missing fields use defaults.
    ///
    /// # Errors
    ///
    /// Returns [`PostFxError::Io`] if the file cannot be read and
    /// [`PostFxError::OptionsParse`] if it is not valid options TOML.
    pub fn load(path: &Path) -> Result<Self, PostFxError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Parse options from TOML text.
    ///
    /// # Errors
    ///
    /// Returns [`PostFxError::OptionsParse`] on malformed input.
    pub fn from_toml(content: &str) -> Result<Self, PostFxError> {
        toml::from_str(content)
            .map_err(|e| PostFxError::OptionsParse(e.to_string()))
    }

    /// Save options to a TOML file (pretty-printed), creating parent
    /// directories as needed.
    ///
    /// # Errors
    ///
    /// Returns [`PostFxError::Io`] on write failure.
    pub fn save(&self, path: &Path) -> Result<(), PostFxError> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| PostFxError::OptionsParse(e.to_string()))?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, content)?;
        Ok(())
    }

    /// List available preset names (TOML file stems) in a directory.
    #[must_use]
    pub fn list_presets(dir: &Path) -> Vec<String> {
        let mut names = Vec::new();
        if let Ok(entries) = std::fs::read_dir(dir) {
            for entry in entries.flatten() {
                let path = entry.path();
                if path.extension().is_some_and(|ext| ext == "toml") {
                    if let Some(stem) =
                        path.file_stem().and_then(|s| s.to_str())
                    {
                        names.push(stem.to_owned());
                    }
                }
            }
        }
        names.sort();
        names
    }
}
