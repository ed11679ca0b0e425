//! GLSL generation for compiled op lists.
//!
//! The generated text declares its own uniforms, samplers and helpers and
//! defines `vec4 <function_name>(vec4 inPixel)`. It has no version directive
//! and no `main`; the host splices it into a fragment shader template.

use std::fmt::{self, Write};

use grade_core::{
    GpuShaderDesc, Interpolation, Lut3dTexture, LutTexture, UniformDesc, UniformField, math,
};

use crate::engine::EngineOptions;
use crate::lut::{Lut1d, Lut3d};
use crate::op::{Op, SRGB_ENC_BREAK, SRGB_LIN_BREAK};

/// Accumulates declarations, helpers and body for one shader.
struct ShaderBuilder<'a> {
    options: &'a EngineOptions,
    declarations: String,
    helpers: String,
    body: String,
    textures: Vec<LutTexture>,
    textures_3d: Vec<Lut3dTexture>,
    uniforms: Vec<UniformDesc>,
    texture_index: usize,
}

/// Generate shader text and resources for an op list.
pub(crate) fn generate(ops: &[Op], options: &EngineOptions) -> Result<GpuShaderDesc, fmt::Error> {
    let mut builder = ShaderBuilder {
        options,
        declarations: String::new(),
        helpers: String::new(),
        body: String::new(),
        textures: Vec::new(),
        textures_3d: Vec::new(),
        uniforms: Vec::new(),
        texture_index: 0,
    };
    for (i, op) in ops.iter().enumerate() {
        writeln!(builder.body, "  // Op {}: {}", i, op_label(op))?;
        builder.emit(op)?;
    }
    builder.finish()
}

fn op_label(op: &Op) -> &'static str {
    match op {
        Op::Matrix(_) => "matrix",
        Op::SrgbTransfer { .. } => "srgb transfer",
        Op::Exponent(_) => "exponent",
        Op::Log2Allocation { .. } => "log2 allocation",
        Op::Clamp { .. } => "clamp",
        Op::Cdl { .. } => "cdl",
        Op::Lut1d(_) => "lut1d",
        Op::Lut3d(_) => "lut3d",
        Op::GradingPrimary { .. } => "grading primary",
        Op::Exposure { .. } => "exposure",
        Op::Gamma { .. } => "gamma",
    }
}

/// GLSL float literal.
fn f(v: f32) -> String {
    if v == f32::MAX {
        "3.40282347e+38".to_string()
    } else if v == f32::MIN {
        "-3.40282347e+38".to_string()
    } else {
        format!("{:.8e}", v)
    }
}

fn v3(v: [f32; 3]) -> String {
    format!("vec3({}, {}, {})", f(v[0]), f(v[1]), f(v[2]))
}

impl ShaderBuilder<'_> {
    fn finish(self) -> Result<GpuShaderDesc, fmt::Error> {
        let name = &self.options.function_name;
        let mut text = String::new();
        writeln!(text, "// Declaration of all variables")?;
        text.push_str(&self.declarations);
        writeln!(text)?;
        if !self.helpers.is_empty() {
            writeln!(text, "// Declaration of all helper methods")?;
            text.push_str(&self.helpers);
            writeln!(text)?;
        }
        writeln!(text, "vec4 {}(vec4 inPixel)", name)?;
        writeln!(text, "{{")?;
        writeln!(text, "  vec4 outColor = inPixel;")?;
        text.push_str(&self.body);
        writeln!(text, "  return outColor;")?;
        writeln!(text, "}}")?;

        Ok(GpuShaderDesc {
            language: self.options.language,
            function_name: name.clone(),
            text,
            textures: self.textures,
            textures_3d: self.textures_3d,
            uniforms: self.uniforms,
        })
    }

    /// Declare a dynamic uniform once and return its name.
    fn uniform(&mut self, suffix: &str, glsl_type: &str, field: UniformField) -> Result<String, fmt::Error> {
        let name = format!("{}{}", self.options.resource_prefix, suffix);
        if !self.uniforms.iter().any(|u| u.name == name) {
            writeln!(self.declarations, "uniform {} {};", glsl_type, name)?;
            self.uniforms.push(UniformDesc { name: name.clone(), field });
        }
        Ok(name)
    }

    fn next_texture_name(&mut self, kind: &str) -> String {
        let name = format!("{}{}_{}", self.options.resource_prefix, kind, self.texture_index);
        self.texture_index += 1;
        name
    }

    fn emit(&mut self, op: &Op) -> fmt::Result {
        let b = &mut self.body;
        match op {
            Op::Matrix(m) => {
                let c = m.to_cols_array();
                writeln!(
                    b,
                    "  outColor.rgb = mat3({}, {}, {}, {}, {}, {}, {}, {}, {}) * outColor.rgb;",
                    f(c[0]), f(c[1]), f(c[2]), f(c[3]), f(c[4]), f(c[5]), f(c[6]), f(c[7]), f(c[8])
                )?;
            }
            Op::SrgbTransfer { forward: true } => {
                writeln!(b, "  {{")?;
                writeln!(b, "    vec3 lo = outColor.rgb * 12.92;")?;
                writeln!(b, "    vec3 hi = 1.055 * pow(max(outColor.rgb, vec3(0.0)), vec3(1.0 / 2.4)) - 0.055;")?;
                writeln!(b, "    outColor.rgb = mix(hi, lo, lessThanEqual(outColor.rgb, vec3({})));", f(SRGB_LIN_BREAK))?;
                writeln!(b, "  }}")?;
            }
            Op::SrgbTransfer { forward: false } => {
                writeln!(b, "  {{")?;
                writeln!(b, "    vec3 lo = outColor.rgb / 12.92;")?;
                writeln!(b, "    vec3 hi = pow(max((outColor.rgb + 0.055) / 1.055, vec3(0.0)), vec3(2.4));")?;
                writeln!(b, "    outColor.rgb = mix(hi, lo, lessThanEqual(outColor.rgb, vec3({})));", f(SRGB_ENC_BREAK))?;
                writeln!(b, "  }}")?;
            }
            Op::Exponent(e) => {
                writeln!(b, "  outColor.rgb = pow(max(outColor.rgb, vec3(0.0)), vec3({}));", f(*e))?;
            }
            Op::Log2Allocation { min_ev, max_ev, mid_grey, forward: true } => {
                writeln!(b, "  {{")?;
                writeln!(b, "    vec3 v = max(outColor.rgb, vec3({}));", f(math::LOG_EPSILON))?;
                writeln!(b, "    v = clamp(log2(v / {}), {}, {});", f(*mid_grey), f(*min_ev), f(*max_ev))?;
                writeln!(b, "    outColor.rgb = (v - {}) / {};", f(*min_ev), f(max_ev - min_ev))?;
                writeln!(b, "  }}")?;
            }
            Op::Log2Allocation { min_ev, max_ev, mid_grey, forward: false } => {
                writeln!(
                    b,
                    "  outColor.rgb = {} * exp2(outColor.rgb * {} + {});",
                    f(*mid_grey), f(max_ev - min_ev), f(*min_ev)
                )?;
            }
            Op::Clamp { lo, hi } => {
                writeln!(b, "  outColor.rgb = clamp(outColor.rgb, {}, {});", f(*lo), f(*hi))?;
            }
            Op::Cdl { slope, offset, power, saturation, forward: true } => {
                writeln!(b, "  {{")?;
                writeln!(b, "    vec3 v = max(outColor.rgb * {} + {}, vec3(0.0));", v3(*slope), v3(*offset))?;
                writeln!(b, "    v = pow(v, {});", v3(*power))?;
                writeln!(b, "    float luma = dot(v, {});", v3(math::LUMA_REC709))?;
                writeln!(b, "    outColor.rgb = luma + {} * (v - luma);", f(*saturation))?;
                writeln!(b, "  }}")?;
            }
            Op::Cdl { slope, offset, power, saturation, forward: false } => {
                let inv_power = [1.0 / power[0], 1.0 / power[1], 1.0 / power[2]];
                writeln!(b, "  {{")?;
                writeln!(b, "    float luma = dot(outColor.rgb, {});", v3(math::LUMA_REC709))?;
                writeln!(b, "    vec3 v = luma + {} * (outColor.rgb - luma);", f(1.0 / saturation))?;
                writeln!(b, "    v = pow(max(v, vec3(0.0)), {});", v3(inv_power))?;
                writeln!(b, "    outColor.rgb = (v - {}) / {};", v3(*offset), v3(*slope))?;
                writeln!(b, "  }}")?;
            }
            Op::Lut1d(lut) => self.emit_lut1d(lut)?,
            Op::Lut3d(lut) => self.emit_lut3d(lut)?,
            Op::GradingPrimary { primary, dynamic } => {
                let (contrast, lift, offset, pivot, saturation, black, white) = if *dynamic {
                    (
                        self.uniform("primary_contrast", "vec3", UniformField::PrimaryContrast)?,
                        self.uniform("primary_lift", "vec3", UniformField::PrimaryLift)?,
                        self.uniform("primary_offset", "vec3", UniformField::PrimaryOffset)?,
                        self.uniform("primary_pivot", "float", UniformField::PrimaryPivot)?,
                        self.uniform("primary_saturation", "float", UniformField::PrimarySaturation)?,
                        self.uniform("primary_clampBlack", "float", UniformField::PrimaryClampBlack)?,
                        self.uniform("primary_clampWhite", "float", UniformField::PrimaryClampWhite)?,
                    )
                } else {
                    (
                        v3(primary.contrast),
                        v3(primary.lift),
                        v3(primary.offset),
                        f(primary.pivot),
                        f(primary.saturation),
                        f(primary.clamp_black),
                        f(primary.clamp_white),
                    )
                };
                let b = &mut self.body;
                writeln!(b, "  {{")?;
                match primary.space {
                    grade_core::GradingSpace::Linear => {
                        writeln!(b, "    vec3 v = outColor.rgb + {};", offset)?;
                        writeln!(b, "    float pv = {} * exp2({});", f(math::MID_GREY), pivot)?;
                        writeln!(b, "    vec3 p = mix(vec3(pv), vec3(-pv), lessThan(v, vec3(0.0)));")?;
                        writeln!(b, "    v = pow(abs(v / p), {}) * p;", contrast)?;
                    }
                    grade_core::GradingSpace::Log => {
                        writeln!(b, "    vec3 v = outColor.rgb + {};", offset)?;
                        writeln!(b, "    v = (v - {p}) * {} + {p};", contrast, p = pivot)?;
                    }
                    grade_core::GradingSpace::Video => {
                        writeln!(b, "    vec3 v = outColor.rgb + {} + {};", lift, offset)?;
                        writeln!(b, "    v = v * {};", contrast)?;
                    }
                }
                writeln!(b, "    float luma = dot(v, {});", v3(math::LUMA_REC709))?;
                writeln!(b, "    v = luma + {} * (v - luma);", saturation)?;
                writeln!(b, "    outColor.rgb = clamp(v, {}, {});", black, white)?;
                writeln!(b, "  }}")?;
            }
            Op::Exposure { ev, dynamic } => {
                let ev = if *dynamic { self.uniform("exposure", "float", UniformField::Exposure)? } else { f(*ev) };
                writeln!(self.body, "  outColor.rgb = outColor.rgb * exp2({});", ev)?;
            }
            Op::Gamma { value, pivot, dynamic } => {
                let g = if *dynamic { self.uniform("gamma", "float", UniformField::Gamma)? } else { f(*value) };
                writeln!(
                    self.body,
                    "  outColor.rgb = sign(outColor.rgb) * pow(abs(outColor.rgb / {p}), vec3({})) * {p};",
                    g,
                    p = f(*pivot)
                )?;
            }
        }
        Ok(())
    }

    fn emit_lut1d(&mut self, lut: &Lut1d) -> fmt::Result {
        let name = self.next_texture_name("lut1d");
        let sampler = format!("{}Sampler", name);
        let (width, height, values) = lut.packed(self.options.max_texture_width as usize);
        let size = lut.size() as f32;
        let rgb = lut.channels() == grade_core::TextureChannels::Rgb;

        if height == 1 {
            writeln!(self.declarations, "uniform sampler1D {};", sampler)?;
            let b = &mut self.body;
            writeln!(b, "  {{")?;
            writeln!(b, "    vec3 coord = (clamp(outColor.rgb, 0.0, 1.0) * {} + 0.5) / {};", f(size - 1.0), f(size))?;
            for (i, c) in ['r', 'g', 'b'].into_iter().enumerate() {
                let src = if rgb { ['r', 'g', 'b'][i] } else { 'r' };
                writeln!(b, "    outColor.{c} = texture({}, coord.{c}).{};", sampler, src)?;
            }
            writeln!(b, "  }}")?;
        } else {
            writeln!(self.declarations, "uniform sampler2D {};", sampler)?;
            let h = &mut self.helpers;
            writeln!(h, "vec2 {}_computePos(float f)", name)?;
            writeln!(h, "{{")?;
            writeln!(h, "  float dep = clamp(f, 0.0, 1.0) * {};", f(size - 1.0))?;
            writeln!(h, "  vec2 retVal;")?;
            writeln!(h, "  retVal.y = min(floor(dep / {}), {});", f(width as f32 - 1.0), f(height as f32 - 1.0))?;
            writeln!(h, "  retVal.x = dep - retVal.y * {};", f(width as f32 - 1.0))?;
            writeln!(h, "  retVal.x = (retVal.x + 0.5) / {};", f(width as f32))?;
            writeln!(h, "  retVal.y = (retVal.y + 0.5) / {};", f(height as f32))?;
            writeln!(h, "  return retVal;")?;
            writeln!(h, "}}")?;
            let b = &mut self.body;
            for (i, c) in ['r', 'g', 'b'].into_iter().enumerate() {
                let src = if rgb { ['r', 'g', 'b'][i] } else { 'r' };
                writeln!(b, "  outColor.{c} = texture({}, {}_computePos(outColor.{c})).{};", sampler, name, src)?;
            }
        }

        self.textures.push(LutTexture {
            texture_name: name,
            sampler_name: sampler,
            width: width as u32,
            height: height as u32,
            channels: lut.channels(),
            interpolation: Interpolation::Linear,
            values,
        });
        Ok(())
    }

    fn emit_lut3d(&mut self, lut: &Lut3d) -> fmt::Result {
        let name = self.next_texture_name("lut3d");
        let sampler = format!("{}Sampler", name);
        let size = lut.size() as f32;
        writeln!(self.declarations, "uniform sampler3D {};", sampler)?;
        writeln!(
            self.body,
            "  outColor.rgb = texture({}, (clamp(outColor.rgb, 0.0, 1.0) * {} + 0.5) / {}).rgb;",
            sampler,
            f(size - 1.0),
            f(size)
        )?;
        self.textures_3d.push(Lut3dTexture {
            texture_name: name,
            sampler_name: sampler,
            edge_len: lut.size() as u32,
            interpolation: lut.interpolation(),
            values: lut.flat_values(),
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use grade_core::{GradingPrimary, GradingSpace, TextureChannels};
    use std::sync::Arc;

    fn options() -> EngineOptions {
        EngineOptions::default()
    }

    #[test]
    fn empty_ops_pass_through() {
        let desc = generate(&[], &options()).unwrap();
        assert!(desc.text.contains("vec4 OCIOMain(vec4 inPixel)"));
        assert!(desc.text.contains("return outColor;"));
        assert!(desc.uniforms.is_empty());
        assert_eq!(desc.texture_count(), 0);
    }

    #[test]
    fn dynamic_ops_declare_uniforms() {
        let ops = vec![
            Op::GradingPrimary { primary: GradingPrimary::identity(GradingSpace::Linear), dynamic: true },
            Op::Exposure { ev: 0.0, dynamic: true },
            Op::Gamma { value: 1.0, pivot: 0.18, dynamic: true },
        ];
        let desc = generate(&ops, &options()).unwrap();
        assert_eq!(desc.uniforms.len(), 9);
        assert!(desc.text.contains("uniform float ocio_exposure;"));
        assert!(desc.text.contains("uniform vec3 ocio_primary_contrast;"));
        assert!(desc.text.contains("exp2(ocio_exposure)"));
    }

    #[test]
    fn static_ops_inline_values() {
        let ops = vec![Op::Exposure { ev: 1.0, dynamic: false }];
        let desc = generate(&ops, &options()).unwrap();
        assert!(desc.uniforms.is_empty());
        assert!(desc.text.contains("exp2(1.00000000e0)"));
    }

    #[test]
    fn short_lut_is_1d_red() {
        let lut = Lut1d::from_fn("curve", 256, |x| x);
        let desc = generate(&[Op::Lut1d(Arc::new(lut))], &options()).unwrap();
        let tex = &desc.textures[0];
        assert!(tex.is_1d());
        assert_eq!(tex.channels, TextureChannels::Red);
        assert_eq!(tex.sampler_name, "ocio_lut1d_0Sampler");
        assert!(desc.text.contains("uniform sampler1D ocio_lut1d_0Sampler;"));
    }

    #[test]
    fn long_lut_wraps_to_2d() {
        let lut = Lut1d::from_fn("curve", 4096, |x| x);
        let opts = EngineOptions { max_texture_width: 1024, ..options() };
        let desc = generate(&[Op::Lut1d(Arc::new(lut))], &opts).unwrap();
        let tex = &desc.textures[0];
        assert_eq!(tex.width, 1024);
        assert_eq!(tex.height, 5);
        assert_eq!(tex.values.len(), 1024 * 5);
        assert!(desc.text.contains("uniform sampler2D"));
        assert!(desc.text.contains("_computePos"));
    }

    #[test]
    fn texture_indices_are_shared() {
        let l1 = Arc::new(Lut1d::from_fn("a", 16, |x| x));
        let l3 = Arc::new(Lut3d::from_fn("b", 5, |c| c));
        let desc = generate(&[Op::Lut3d(l3), Op::Lut1d(l1)], &options()).unwrap();
        assert_eq!(desc.textures_3d[0].texture_name, "ocio_lut3d_0");
        assert_eq!(desc.textures[0].texture_name, "ocio_lut1d_1");
    }
}
