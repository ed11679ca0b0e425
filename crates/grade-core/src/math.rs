//! Per-stage grading math.
//!
//! These are the exact formulas the CPU path evaluates and the GPU path
//! mirrors in GLSL. None of them panic or return NaN for finite input:
//! logarithmic stages substitute [`LOG_EPSILON`] for non-positive values.

/// Rec.709 luma weights used by the saturation stage.
pub const LUMA_REC709: [f32; 3] = [0.2126, 0.7152, 0.0722];

/// Scene-linear mid grey.
pub const MID_GREY: f32 = 0.18;

/// Value substituted for non-positive input before a logarithm.
pub const LOG_EPSILON: f32 = f64::EPSILON as f32;

/// Weighted luma of an RGB triple.
#[inline]
pub fn luma(rgb: [f32; 3]) -> f32 {
    rgb[0] * LUMA_REC709[0] + rgb[1] * LUMA_REC709[1] + rgb[2] * LUMA_REC709[2]
}

/// `luma + s * (in - luma)` per channel.
#[inline]
pub fn saturate(rgb: [f32; 3], saturation: f32) -> [f32; 3] {
    let l = luma(rgb);
    [
        l + saturation * (rgb[0] - l),
        l + saturation * (rgb[1] - l),
        l + saturation * (rgb[2] - l),
    ]
}

/// Actual pivot of the linear contrast stage for a pivot expressed in stops
/// around mid grey.
#[inline]
pub fn linear_pivot(pivot: f32) -> f32 {
    MID_GREY * pivot.exp2()
}

/// Sign-preserving contrast around `0.18 * 2^pivot`.
///
/// `p = copysign(0.18 * 2^pivot, x)`, `out = |x / p|^contrast * p`.
#[inline]
pub fn contrast_linear(x: f32, contrast: f32, pivot: f32) -> f32 {
    let p = linear_pivot(pivot).copysign(x);
    (x / p).abs().powf(contrast) * p
}

/// Affine contrast around a pivot, used by the log and video styles.
#[inline]
pub fn contrast_affine(x: f32, contrast: f32, pivot: f32) -> f32 {
    (x - pivot) * contrast + pivot
}

/// `x * 2^ev`.
#[inline]
pub fn exposure(x: f32, ev: f32) -> f32 {
    x * ev.exp2()
}

/// `x + o`.
#[inline]
pub fn offset(x: f32, o: f32) -> f32 {
    x + o
}

/// Clip to `[lo, hi]`. NaN passes through unchanged.
#[inline]
pub fn clamp(x: f32, lo: f32, hi: f32) -> f32 {
    x.max(lo).min(hi)
}

/// Power mirrored around zero: `sign(x) * |x / pivot|^gamma * pivot`.
///
/// Keeps negative values alive instead of producing NaN.
#[inline]
pub fn mirrored_gamma(x: f32, gamma: f32, pivot: f32) -> f32 {
    (x / pivot).abs().powf(gamma) * pivot * x.signum()
}

/// Base-2 logarithm with non-positive input replaced by [`LOG_EPSILON`].
#[inline]
pub fn safe_log2(x: f32) -> f32 {
    if x <= 0.0 { LOG_EPSILON.log2() } else { x.log2() }
}

/// Apply a function to each channel.
#[inline]
pub fn per_channel(rgb: [f32; 3], f: impl Fn(f32, usize) -> f32) -> [f32; 3] {
    [f(rgb[0], 0), f(rgb[1], 1), f(rgb[2], 2)]
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    const EPSILON: f32 = 1e-4;

    #[test]
    fn saturation_doubles_chroma() {
        let out = saturate([0.5, 0.1, 0.1], 2.0);
        assert!((out[0] - 0.81496).abs() < EPSILON, "got {}", out[0]);
        assert!((out[1] - 0.01496).abs() < EPSILON, "got {}", out[1]);
        assert!((out[2] - 0.01496).abs() < EPSILON, "got {}", out[2]);
    }

    #[test]
    fn saturation_half() {
        let out = saturate([0.5, 0.1, 0.1], 0.5);
        assert!((out[0] - 0.34252).abs() < EPSILON, "got {}", out[0]);
        assert!((out[1] - 0.14252).abs() < EPSILON, "got {}", out[1]);
    }

    #[test]
    fn contrast_is_sign_preserving() {
        let pos = contrast_linear(0.5, 1.5, 0.0);
        let neg = contrast_linear(-0.5, 1.5, 0.0);
        assert_relative_eq!(pos, -neg, epsilon = 1e-6);
        assert_relative_eq!(contrast_linear(MID_GREY, 2.0, 0.0), MID_GREY, epsilon = 1e-6);
        assert_eq!(contrast_linear(0.0, 2.0, 0.0), 0.0);
    }

    #[test]
    fn exposure_doubles_per_stop() {
        assert_relative_eq!(exposure(0.25, 1.0), 0.5);
        assert_relative_eq!(exposure(0.25, -2.0), 0.0625);
    }

    #[test]
    fn log_of_non_positive_is_finite() {
        assert!(safe_log2(0.0).is_finite());
        assert!(safe_log2(-3.0).is_finite());
        assert_relative_eq!(safe_log2(0.0), -52.0, epsilon = 1e-3);
        assert_relative_eq!(safe_log2(4.0), 2.0);
    }

    #[test]
    fn mirrored_gamma_identity() {
        for x in [-2.0_f32, -0.1, 0.0, 0.18, 3.0] {
            assert_relative_eq!(mirrored_gamma(x, 1.0, MID_GREY), x, epsilon = 1e-6);
        }
        assert!(mirrored_gamma(-0.5, 2.2, MID_GREY) < 0.0);
    }
}
