//! Processor operations.
//!
//! An [`Op`] is the unit the engine compiles node lists into. Every op has a
//! CPU evaluation here and a GLSL emission in [`crate::glsl`]; the two must
//! agree.

use std::sync::Arc;

use glam::{Mat3, Vec3};
use grade_core::{DynamicProperty, GradingPrimary, math};

use crate::lut::{Lut1d, Lut3d};

/// sRGB linear segment threshold on the linear side.
pub(crate) const SRGB_LIN_BREAK: f32 = 0.003_130_8;
/// sRGB linear segment threshold on the encoded side.
pub(crate) const SRGB_ENC_BREAK: f32 = 0.040_45;

/// One processing step.
#[derive(Debug, Clone)]
pub enum Op {
    /// 3x3 matrix multiply.
    Matrix(Mat3),
    /// sRGB piecewise curve; forward encodes linear values.
    SrgbTransfer {
        /// Direction.
        forward: bool,
    },
    /// `max(x, 0)^value`.
    Exponent(f32),
    /// Normalized log2 allocation around mid grey.
    Log2Allocation {
        /// Lowest stop, maps to 0.
        min_ev: f32,
        /// Highest stop, maps to 1.
        max_ev: f32,
        /// Linear value at 0 EV.
        mid_grey: f32,
        /// Forward maps linear to log.
        forward: bool,
    },
    /// Clip to a range.
    Clamp {
        /// Lower bound.
        lo: f32,
        /// Upper bound.
        hi: f32,
    },
    /// ASC CDL with saturation.
    Cdl {
        /// Slope.
        slope: [f32; 3],
        /// Offset.
        offset: [f32; 3],
        /// Power.
        power: [f32; 3],
        /// Saturation.
        saturation: f32,
        /// Direction.
        forward: bool,
    },
    /// 1D lookup table.
    Lut1d(Arc<Lut1d>),
    /// 3D lookup table.
    Lut3d(Arc<Lut3d>),
    /// Primary grading.
    GradingPrimary {
        /// Current values.
        primary: GradingPrimary,
        /// Values follow dynamic property updates.
        dynamic: bool,
    },
    /// Exposure in stops.
    Exposure {
        /// Current value.
        ev: f32,
        /// Value follows dynamic property updates.
        dynamic: bool,
    },
    /// Mirrored power around a pivot.
    Gamma {
        /// Current exponent.
        value: f32,
        /// Pivot.
        pivot: f32,
        /// Exponent follows dynamic property updates.
        dynamic: bool,
    },
}

impl Op {
    /// Row-major 3x3 matrix op.
    pub fn matrix(rows: [[f32; 3]; 3]) -> Self {
        Op::Matrix(Mat3::from_cols_array_2d(&rows).transpose())
    }

    /// True if this op leaves every value unchanged and can be dropped.
    ///
    /// Dynamic ops are never identities: their value may change later.
    pub fn is_identity(&self) -> bool {
        match self {
            Op::Matrix(m) => *m == Mat3::IDENTITY,
            Op::Exponent(v) => *v == 1.0,
            Op::GradingPrimary { primary, dynamic: false } => primary.is_identity(),
            Op::Exposure { ev, dynamic: false } => *ev == 0.0,
            Op::Cdl { slope, offset, power, saturation, .. } => {
                *slope == [1.0; 3] && *offset == [0.0; 3] && *power == [1.0; 3] && *saturation == 1.0
            }
            _ => false,
        }
    }

    /// True if this op follows dynamic property updates.
    pub fn is_dynamic(&self) -> bool {
        matches!(
            self,
            Op::GradingPrimary { dynamic: true, .. }
                | Op::Exposure { dynamic: true, .. }
                | Op::Gamma { dynamic: true, .. }
        )
    }

    /// Update a dynamic value. Returns true if the property applied.
    pub fn set_dynamic(&mut self, property: &DynamicProperty) -> bool {
        match (self, property) {
            (Op::GradingPrimary { primary, dynamic: true }, DynamicProperty::GradingPrimary(gp)) => {
                // The style is structural; only values follow.
                let space = primary.space;
                *primary = GradingPrimary { space, ..*gp };
                true
            }
            (Op::Exposure { ev, dynamic: true }, DynamicProperty::Exposure(v)) => {
                *ev = *v;
                true
            }
            (Op::Gamma { value, dynamic: true, .. }, DynamicProperty::Gamma(v)) => {
                *value = *v;
                true
            }
            _ => false,
        }
    }

    /// Canonical description for fingerprints. Dynamic values are masked.
    pub fn describe(&self) -> String {
        match self {
            Op::Matrix(m) => format!("matrix{:?}", m.to_cols_array()),
            Op::SrgbTransfer { forward } => format!("srgb({})", forward),
            Op::Exponent(v) => format!("exponent({:?})", v),
            Op::Log2Allocation { min_ev, max_ev, mid_grey, forward } => {
                format!("log2alloc({:?},{:?},{:?},{})", min_ev, max_ev, mid_grey, forward)
            }
            Op::Clamp { lo, hi } => format!("clamp({:?},{:?})", lo, hi),
            Op::Cdl { slope, offset, power, saturation, forward } => {
                format!("cdl({:?},{:?},{:?},{:?},{})", slope, offset, power, saturation, forward)
            }
            Op::Lut1d(lut) => format!("lut1d({:?},{},{:?})", lut.name(), lut.size(), lut.channels()),
            Op::Lut3d(lut) => format!("lut3d({:?},{},{:?})", lut.name(), lut.size(), lut.interpolation()),
            Op::GradingPrimary { primary, dynamic: true } => format!("primary({},dyn)", primary.space),
            Op::GradingPrimary { primary, dynamic: false } => format!("primary({:?})", primary),
            Op::Exposure { dynamic: true, .. } => "exposure(dyn)".to_string(),
            Op::Exposure { ev, dynamic: false } => format!("exposure({:?})", ev),
            Op::Gamma { pivot, dynamic: true, .. } => format!("gamma(dyn,{:?})", pivot),
            Op::Gamma { value, pivot, dynamic: false } => format!("gamma({:?},{:?})", value, pivot),
        }
    }

    /// Apply to one RGB triple.
    pub fn apply(&self, rgb: [f32; 3]) -> [f32; 3] {
        match self {
            Op::Matrix(m) => (*m * Vec3::from(rgb)).to_array(),
            Op::SrgbTransfer { forward: true } => math::per_channel(rgb, |v, _| srgb_encode(v)),
            Op::SrgbTransfer { forward: false } => math::per_channel(rgb, |v, _| srgb_decode(v)),
            Op::Exponent(e) => math::per_channel(rgb, |v, _| v.max(0.0).powf(*e)),
            Op::Log2Allocation { min_ev, max_ev, mid_grey, forward: true } => {
                math::per_channel(rgb, |v, _| {
                    let v = if v <= 0.0 { math::LOG_EPSILON } else { v };
                    let stops = (v / mid_grey).log2().clamp(*min_ev, *max_ev);
                    (stops - min_ev) / (max_ev - min_ev)
                })
            }
            Op::Log2Allocation { min_ev, max_ev, mid_grey, forward: false } => {
                math::per_channel(rgb, |v, _| mid_grey * (v * (max_ev - min_ev) + min_ev).exp2())
            }
            Op::Clamp { lo, hi } => math::per_channel(rgb, |v, _| math::clamp(v, *lo, *hi)),
            Op::Cdl { slope, offset, power, saturation, forward: true } => {
                let out = math::per_channel(rgb, |v, c| (v * slope[c] + offset[c]).max(0.0).powf(power[c]));
                math::saturate(out, *saturation)
            }
            Op::Cdl { slope, offset, power, saturation, forward: false } => {
                let out = math::saturate(rgb, 1.0 / saturation);
                math::per_channel(out, |v, c| (v.max(0.0).powf(1.0 / power[c]) - offset[c]) / slope[c])
            }
            Op::Lut1d(lut) => lut.apply(rgb),
            Op::Lut3d(lut) => lut.apply(rgb),
            Op::GradingPrimary { primary, .. } => primary.apply(rgb),
            Op::Exposure { ev, .. } => math::per_channel(rgb, |v, _| math::exposure(v, *ev)),
            Op::Gamma { value, pivot, .. } => {
                math::per_channel(rgb, |v, _| math::mirrored_gamma(v, *value, *pivot))
            }
        }
    }
}

/// Linear to sRGB-encoded.
#[inline]
pub fn srgb_encode(v: f32) -> f32 {
    if v <= SRGB_LIN_BREAK { v * 12.92 } else { 1.055 * v.powf(1.0 / 2.4) - 0.055 }
}

/// sRGB-encoded to linear.
#[inline]
pub fn srgb_decode(v: f32) -> f32 {
    if v <= SRGB_ENC_BREAK { v / 12.92 } else { ((v + 0.055) / 1.055).powf(2.4) }
}
