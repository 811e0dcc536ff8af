//! Named shader parameters packed with WGSL uniform address-space layout.

use glam::{Mat4, Vec2, Vec3, Vec4};

/// A single uniform value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum UniformValue {
    /// `f32`
    Float(f32),
    /// `i32`
    Int(i32),
    /// `u32`
    UInt(u32),
    /// `vec2<f32>`
    Vec2(Vec2),
    /// `vec3<f32>`
    Vec3(Vec3),
    /// `vec4<f32>`
    Vec4(Vec4),
    /// `mat4x4<f32>`
    Mat4(Mat4),
}

impl UniformValue {
    fn align(self) -> usize {
        match self {
            Self::Float(_) | Self::Int(_) | Self::UInt(_) => 4,
            Self::Vec2(_) => 8,
            Self::Vec3(_) | Self::Vec4(_) | Self::Mat4(_) => 16,
        }
    }

    fn size(self) -> usize {
        match self {
            Self::Float(_) | Self::Int(_) | Self::UInt(_) => 4,
            Self::Vec2(_) => 8,
            Self::Vec3(_) => 12,
            Self::Vec4(_) => 16,
            Self::Mat4(_) => 64,
        }
    }

    fn write(self, out: &mut [u8]) {
        match self {
            Self::Float(v) => out.copy_from_slice(bytemuck::bytes_of(&v)),
            Self::Int(v) => out.copy_from_slice(bytemuck::bytes_of(&v)),
            Self::UInt(v) => out.copy_from_slice(bytemuck::bytes_of(&v)),
            Self::Vec2(v) => {
                out.copy_from_slice(bytemuck::cast_slice(&v.to_array()));
            }
            Self::Vec3(v) => {
                out.copy_from_slice(bytemuck::cast_slice(&v.to_array()));
            }
            Self::Vec4(v) => {
                out.copy_from_slice(bytemuck::cast_slice(&v.to_array()));
            }
            Self::Mat4(v) => {
                out.copy_from_slice(bytemuck::cast_slice(&v.to_cols_array()));
            }
        }
    }

    /// The value as `f32`, if it is one.
    #[must_use]
    pub fn as_float(self) -> Option<f32> {
        match self {
            Self::Float(v) => Some(v),
            _ => None,
        }
    }

    /// The value as `Vec2`, if it is one.
    #[must_use]
    pub fn as_vec2(self) -> Option<Vec2> {
        match self {
            Self::Vec2(v) => Some(v),
            _ => None,
        }
    }
}

impl From<f32> for UniformValue {
    fn from(v: f32) -> Self {
        Self::Float(v)
    }
}

impl From<i32> for UniformValue {
    fn from(v: i32) -> Self {
        Self::Int(v)
    }
}

impl From<u32> for UniformValue {
    fn from(v: u32) -> Self {
        Self::UInt(v)
    }
}

impl From<Vec2> for UniformValue {
    fn from(v: Vec2) -> Self {
        Self::Vec2(v)
    }
}

impl From<Vec3> for UniformValue {
    fn from(v: Vec3) -> Self {
        Self::Vec3(v)
    }
}

impl From<Vec4> for UniformValue {
    fn from(v: Vec4) -> Self {
        Self::Vec4(v)
    }
}

impl From<Mat4> for UniformValue {
    fn from(v: Mat4) -> Self {
        Self::Mat4(v)
    }
}

fn round_up(value: usize, align: usize) -> usize {
    value.div_ceil(align) * align
}

/// Ordered uniform set. Declaration order is member order in the shader's
/// uniform struct; padding between members follows WGSL alignment rules.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Uniforms {
    entries: Vec<(String, UniformValue)>,
}

impl Uniforms {
    /// Empty set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder form of [`Self::set`].
    #[must_use]
    pub fn with(
        mut self,
        name: &str,
        value: impl Into<UniformValue>,
    ) -> Self {
        self.set(name, value);
        self
    }

    /// Update an existing uniform in place or append a new one.
    pub fn set(&mut self, name: &str, value: impl Into<UniformValue>) {
        let value = value.into();
        match self.entries.iter_mut().find(|(n, _)| n == name) {
            Some((_, slot)) => *slot = value,
            None => self.entries.push((name.to_owned(), value)),
        }
    }

    /// Current value of a uniform.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<UniformValue> {
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| *v)
    }

    /// Number of uniforms.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no uniforms are declared.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate `(name, value)` pairs in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, UniformValue)> {
        self.entries.iter().map(|(n, v)| (n.as_str(), *v))
    }

    /// Byte offset of a uniform within the packed buffer.
    #[must_use]
    pub fn offset_of(&self, name: &str) -> Option<usize> {
        let mut offset = 0;
        for (n, v) in &self.entries {
            offset = round_up(offset, v.align());
            if n == name {
                return Some(offset);
            }
            offset += v.size();
        }
        None
    }

    /// Size of the packed buffer: rounded up to 16 bytes, never empty.
    #[must_use]
    pub fn byte_size(&self) -> usize {
        let end = self.entries.iter().fold(0, |offset, (_, v)| {
            round_up(offset, v.align()) + v.size()
        });
        round_up(end, 16).max(16)
    }

    /// Pack all values into a uniform-buffer image.
    #[must_use]
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = vec![0u8; self.byte_size()];
        let mut offset = 0;
        for (_, v) in &self.entries {
            offset = round_up(offset, v.align());
            v.write(&mut bytes[offset..offset + v.size()]);
            offset += v.size();
        }
        bytes
    }
}
