//! Primary grading operation (offset / contrast / lift / saturation / clamp).
//!
//! Three styles are supported, selected by [`GradingSpace`]:
//! - Linear: for scene-linear footage
//! - Log: for log-encoded footage
//! - Video: for display-referred footage

use serde::{Deserialize, Serialize};

use crate::math;
use crate::params::GradingSpace;

/// Parameters of one primary grading operation.
///
/// Channel values are effective per-channel values; scalar knobs are
/// broadcast before they reach this struct.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GradingPrimary {
    /// Style of the math (structural).
    pub space: GradingSpace,
    /// Contrast per channel.
    pub contrast: [f32; 3],
    /// Lift per channel (video style only).
    pub lift: [f32; 3],
    /// Offset per channel.
    pub offset: [f32; 3],
    /// Contrast pivot.
    pub pivot: f32,
    /// Saturation (1.0 = no change).
    pub saturation: f32,
    /// Lower clamp.
    pub clamp_black: f32,
    /// Upper clamp.
    pub clamp_white: f32,
}

/// Clamp bound meaning "no lower clamp".
pub const NO_CLAMP_BLACK: f32 = f32::MIN;
/// Clamp bound meaning "no upper clamp".
pub const NO_CLAMP_WHITE: f32 = f32::MAX;

impl GradingPrimary {
    /// Identity grading for the given style.
    pub fn identity(space: GradingSpace) -> Self {
        Self {
            space,
            contrast: [1.0; 3],
            lift: [0.0; 3],
            offset: [0.0; 3],
            pivot: math::MID_GREY,
            saturation: 1.0,
            clamp_black: NO_CLAMP_BLACK,
            clamp_white: NO_CLAMP_WHITE,
        }
    }

    /// Check if this operation leaves every finite value unchanged.
    pub fn is_identity(&self) -> bool {
        self.saturation == 1.0
            && self.contrast == [1.0; 3]
            && self.lift == [0.0; 3]
            && self.offset == [0.0; 3]
            && self.clamp_black == NO_CLAMP_BLACK
            && self.clamp_white == NO_CLAMP_WHITE
    }

    /// Apply forward grading.
    #[inline]
    pub fn apply(&self, rgb: [f32; 3]) -> [f32; 3] {
        let out = match self.space {
            GradingSpace::Linear => self.apply_linear(rgb),
            GradingSpace::Log => self.apply_log(rgb),
            GradingSpace::Video => self.apply_video(rgb),
        };
        let out = math::saturate(out, self.saturation);
        math::per_channel(out, |v, _| math::clamp(v, self.clamp_black, self.clamp_white))
    }

    // ========================================================================
    // Styles
    // ========================================================================

    /// out = in + offset
    /// out = |out / p|^contrast * p, p = copysign(0.18 * 2^pivot, out)
    fn apply_linear(&self, rgb: [f32; 3]) -> [f32; 3] {
        math::per_channel(rgb, |v, c| {
            let v = math::offset(v, self.offset[c]);
            math::contrast_linear(v, self.contrast[c], self.pivot)
        })
    }

    /// out = in + offset
    /// out = (out - pivot) * contrast + pivot
    fn apply_log(&self, rgb: [f32; 3]) -> [f32; 3] {
        math::per_channel(rgb, |v, c| {
            let v = math::offset(v, self.offset[c]);
            math::contrast_affine(v, self.contrast[c], self.pivot)
        })
    }

    /// out = in + (lift + offset)
    /// out = out * contrast (slope around black)
    fn apply_video(&self, rgb: [f32; 3]) -> [f32; 3] {
        math::per_channel(rgb, |v, c| {
            let v = math::offset(v, self.lift[c] + self.offset[c]);
            math::contrast_affine(v, self.contrast[c], 0.0)
        })
    }
}

impl Default for GradingPrimary {
    fn default() -> Self {
        Self::identity(GradingSpace::default())
    }
}
