use std::borrow::Cow;
use std::collections::{BTreeMap, HashMap};

use naga_oil::compose::{
    ComposableModuleDescriptor, Composer, NagaModuleDescriptor, ShaderDefValue,
    ShaderLanguage, ShaderType,
};

use crate::error::PostFxError;

/// Wraps `naga_oil::compose::Composer` to provide shader composition with
/// `#import` and `#ifdef` support.
///
/// Pre-loads the shared WGSL modules at construction time. Consuming shaders
/// use `#import postfx::module_name::{...}` to pull in shared code. Material
/// defines become naga-oil shader defs, so `#ifdef NAME` / `#if NAME == 1`
/// branches are resolved at composition time.
pub struct ShaderComposer {
    composer: Composer,
}

struct ModuleDef {
    source: &'static str,
    file_path: &'static str,
}

impl ShaderComposer {
    /// Create a composer with the shared modules registered.
    ///
    /// # Errors
    ///
    /// Returns [`PostFxError::ShaderModule`] if a shared module fails to
    /// parse.
    pub fn new() -> Result<Self, PostFxError> {
        let mut composer = Composer::default();

        let modules: &[ModuleDef] = &[ModuleDef {
            source: include_str!("../../assets/shaders/modules/fullscreen.wgsl"),
            file_path: "modules/fullscreen.wgsl",
        }];

        for m in modules {
            let _ = composer
                .add_composable_module(ComposableModuleDescriptor {
                    source: m.source,
                    file_path: m.file_path,
                    language: ShaderLanguage::Wgsl,
                    ..Default::default()
                })
                .map_err(|e| PostFxError::ShaderModule {
                    file_path: m.file_path.to_owned(),
                    message: e.to_string(),
                })?;
        }

        Ok(Self { composer })
    }

    /// Compose a shader source string into a `wgpu::ShaderModule` ready for
    /// pipeline creation.
    ///
    /// # Errors
    ///
    /// Returns [`PostFxError::ShaderCompose`] if composition fails.
    pub fn compose(
        &mut self,
        device: &wgpu::Device,
        label: &str,
        source: &str,
        file_path: &str,
        defines: &BTreeMap<String, String>,
    ) -> Result<wgpu::ShaderModule, PostFxError> {
        let naga_module = self.compose_naga(source, file_path, defines)?;
        log::debug!("composed shader '{file_path}' with {} define(s)", defines.len());
        Ok(device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some(label),
            source: wgpu::ShaderSource::Naga(Cow::Owned(naga_module)),
        }))
    }

    /// Compose a shader source into a `naga::Module` without creating a wgpu
    /// shader module. Useful for testing shader composition without a GPU
    /// device.
    ///
    /// # Errors
    ///
    /// Returns [`PostFxError::ShaderCompose`] if composition fails.
    pub fn compose_naga(
        &mut self,
        source: &str,
        file_path: &str,
        defines: &BTreeMap<String, String>,
    ) -> Result<naga::Module, PostFxError> {
        self.composer
            .make_naga_module(NagaModuleDescriptor {
                source,
                file_path,
                shader_type: ShaderType::Wgsl,
                shader_defs: shader_defs(defines),
                ..Default::default()
            })
            .map_err(|e| PostFxError::ShaderCompose {
                file_path: file_path.to_owned(),
                message: e.to_string(),
            })
    }
}

/// Translate string defines into typed naga-oil shader defs.
///
/// `true`/`false` become booleans and integers become `Int`. Any other value
/// only marks the define as present.
fn shader_defs(
    defines: &BTreeMap<String, String>,
) -> HashMap<String, ShaderDefValue> {
    defines
        .iter()
        .map(|(name, value)| {
            let def = match value.as_str() {
                "true" => ShaderDefValue::Bool(true),
                "false" => ShaderDefValue::Bool(false),
                other => other.parse::<i32>().map_or_else(
                    |_| {
                        log::warn!(
                            "define {name}={other} is not a bool or integer; \
                             treating it as set"
                        );
                        ShaderDefValue::Bool(true)
                    },
                    ShaderDefValue::Int,
                ),
            };
            (name.clone(), def)
        })
        .collect()
}
