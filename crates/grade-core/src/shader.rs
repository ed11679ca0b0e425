//! GPU shader descriptors produced by a compiled processor.
//!
//! A [`GpuShaderDesc`] carries the shader function text plus every resource
//! that text declares: lookup tables to upload as textures and uniforms
//! backing dynamic properties. The renderer side only ever reads it.

use serde::{Deserialize, Serialize};

use crate::params::{DynamicProperty, DynamicPropertyKind};

/// GLSL dialect for generated shader code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum GlslVersion {
    /// GLSL 3.30 (OpenGL 3.3 core).
    Glsl330,
    /// GLSL 4.00 (OpenGL 4.0 core).
    #[default]
    Glsl400,
    /// GLSL 4.10 (OpenGL 4.1 core, macOS ceiling).
    Glsl410,
}

impl GlslVersion {
    /// Returns the version directive for this dialect.
    pub fn version_directive(&self) -> &'static str {
        match self {
            Self::Glsl330 => "#version 330 core",
            Self::Glsl400 => "#version 400 core",
            Self::Glsl410 => "#version 410 core",
        }
    }
}

/// Texture interpolation mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Interpolation {
    /// Nearest neighbor.
    Nearest,
    /// Linear (or trilinear for 3D).
    #[default]
    Linear,
}

/// Channel layout of a 1D/2D lookup texture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextureChannels {
    /// One channel, same curve on R, G and B.
    Red,
    /// Three channels.
    Rgb,
}

impl TextureChannels {
    /// Number of floats per texel.
    pub fn count(&self) -> usize {
        match self {
            Self::Red => 1,
            Self::Rgb => 3,
        }
    }
}

/// A 1D lookup table, possibly wrapped onto several rows.
#[derive(Debug, Clone, PartialEq)]
pub struct LutTexture {
    /// Texture name used in the shader text.
    pub texture_name: String,
    /// Sampler uniform name.
    pub sampler_name: String,
    /// Texels per row.
    pub width: u32,
    /// Rows; 1 means a true 1D texture.
    pub height: u32,
    /// Channel layout.
    pub channels: TextureChannels,
    /// Sampling mode.
    pub interpolation: Interpolation,
    /// Row-major texel data, `width * height * channels` floats.
    pub values: Vec<f32>,
}

impl LutTexture {
    /// True if this table fits in one row.
    pub fn is_1d(&self) -> bool {
        self.height == 1
    }
}

/// A 3D lookup table.
#[derive(Debug, Clone, PartialEq)]
pub struct Lut3dTexture {
    /// Texture name used in the shader text.
    pub texture_name: String,
    /// Sampler uniform name.
    pub sampler_name: String,
    /// Samples per axis.
    pub edge_len: u32,
    /// Sampling mode.
    pub interpolation: Interpolation,
    /// RGB texel data, red varying fastest.
    pub values: Vec<f32>,
}

/// Value pushed into a uniform.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum UniformValue {
    /// `float`.
    Float(f32),
    /// `vec3`.
    Vec3([f32; 3]),
}

/// Which part of a dynamic property feeds a uniform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UniformField {
    /// Exposure in stops.
    Exposure,
    /// Gamma exponent.
    Gamma,
    /// Primary contrast.
    PrimaryContrast,
    /// Primary lift.
    PrimaryLift,
    /// Primary offset.
    PrimaryOffset,
    /// Primary pivot.
    PrimaryPivot,
    /// Primary saturation.
    PrimarySaturation,
    /// Primary lower clamp.
    PrimaryClampBlack,
    /// Primary upper clamp.
    PrimaryClampWhite,
}

impl UniformField {
    /// Property kind this field belongs to.
    pub fn kind(&self) -> DynamicPropertyKind {
        match self {
            Self::Exposure => DynamicPropertyKind::Exposure,
            Self::Gamma => DynamicPropertyKind::Gamma,
            _ => DynamicPropertyKind::GradingPrimary,
        }
    }

    /// Extract this field's value, or `None` if the property is of another kind.
    pub fn value_of(&self, property: &DynamicProperty) -> Option<UniformValue> {
        use UniformValue::{Float, Vec3};
        match (self, property) {
            (Self::Exposure, DynamicProperty::Exposure(v)) => Some(Float(*v)),
            (Self::Gamma, DynamicProperty::Gamma(v)) => Some(Float(*v)),
            (field, DynamicProperty::GradingPrimary(gp)) => match field {
                Self::PrimaryContrast => Some(Vec3(gp.contrast)),
                Self::PrimaryLift => Some(Vec3(gp.lift)),
                Self::PrimaryOffset => Some(Vec3(gp.offset)),
                Self::PrimaryPivot => Some(Float(gp.pivot)),
                Self::PrimarySaturation => Some(Float(gp.saturation)),
                Self::PrimaryClampBlack => Some(Float(gp.clamp_black)),
                Self::PrimaryClampWhite => Some(Float(gp.clamp_white)),
                Self::Exposure | Self::Gamma => None,
            },
            _ => None,
        }
    }
}

/// A uniform declared by the shader text.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct UniformDesc {
    /// Uniform name.
    pub name: String,
    /// Source of its value.
    pub field: UniformField,
}

/// Shader text plus the resources it declares.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct GpuShaderDesc {
    /// Dialect of [`text`](Self::text).
    pub language: GlslVersion,
    /// Name of the entry function, `vec4 name(vec4)`.
    pub function_name: String,
    /// Declarations and function body, without a version directive.
    pub text: String,
    /// 1D/2D lookup tables.
    pub textures: Vec<LutTexture>,
    /// 3D lookup tables.
    pub textures_3d: Vec<Lut3dTexture>,
    /// Uniforms backing dynamic properties.
    pub uniforms: Vec<UniformDesc>,
}

impl GpuShaderDesc {
    /// Number of lookup textures of every dimension.
    pub fn texture_count(&self) -> usize {
        self.textures.len() + self.textures_3d.len()
    }

    /// Uniforms fed by the given property kind.
    pub fn uniforms_for(&self, kind: DynamicPropertyKind) -> impl Iterator<Item = &UniformDesc> {
        self.uniforms.iter().filter(move |u| u.field.kind() == kind)
    }

    /// True if any uniform is fed by the given property kind.
    pub fn has_dynamic(&self, kind: DynamicPropertyKind) -> bool {
        self.uniforms_for(kind).next().is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::primary::GradingPrimary;

    #[test]
    fn field_values() {
        let gp = GradingPrimary { saturation: 0.5, ..Default::default() };
        let prop = DynamicProperty::GradingPrimary(gp);
        assert_eq!(UniformField::PrimarySaturation.value_of(&prop), Some(UniformValue::Float(0.5)));
        assert_eq!(UniformField::Exposure.value_of(&prop), None);
        assert_eq!(
            UniformField::Exposure.value_of(&DynamicProperty::Exposure(1.0)),
            Some(UniformValue::Float(1.0))
        );
        assert_eq!(UniformField::Gamma.value_of(&DynamicProperty::Exposure(1.0)), None);
    }

    #[test]
    fn uniforms_by_kind() {
        let desc = GpuShaderDesc {
            uniforms: vec![
                UniformDesc { name: "ocio_exposure".into(), field: UniformField::Exposure },
                UniformDesc { name: "ocio_primary_pivot".into(), field: UniformField::PrimaryPivot },
            ],
            ..Default::default()
        };
        assert!(desc.has_dynamic(DynamicPropertyKind::Exposure));
        assert!(!desc.has_dynamic(DynamicPropertyKind::Gamma));
        assert_eq!(desc.uniforms_for(DynamicPropertyKind::GradingPrimary).count(), 1);
    }
}
