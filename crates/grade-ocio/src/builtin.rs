//! Built-in catalog.
//!
//! A small studio catalog that works without external files: a linear
//! Rec.709 reference, common encodings, a filmic display rendering and a
//! few creative looks.
//!
//! # Example
//!
//! ```
//! use grade_ocio::builtin;
//!
//! let config = builtin::studio();
//! for cs in config.colorspaces() {
//!     println!("{}", cs.name());
//! }
//! ```

use std::sync::Arc;

use grade_core::math::{self, MID_GREY};

use crate::colorspace::{ColorSpace, Encoding};
use crate::config::Config;
use crate::display::{Display, View};
use crate::look::Look;
use crate::lut::{Lut1d, Lut3d};
use crate::op::Op;
use crate::role::names;

/// Lowest stop of the log encoding relative to mid grey.
pub const LOG2_MIN_EV: f32 = -10.0;
/// Highest stop of the log encoding relative to mid grey.
pub const LOG2_MAX_EV: f32 = 6.5;
/// Entries of the filmic display curve.
pub const FILMIC_CURVE_SIZE: usize = 4096;
/// Edge length of baked 3D looks.
pub const LOOK_LUT_EDGE: usize = 33;

/// Gamut inset applied before the filmic curve.
const FILMIC_INSET: [[f32; 3]; 3] = [
    [0.842_479_05, 0.078_433_6, 0.079_223_75],
    [0.042_328_24, 0.878_468_63, 0.079_166_13],
    [0.042_375_65, 0.078_433_6, 0.879_143],
];

/// Creates the built-in studio catalog.
///
/// Color spaces:
/// - `Linear Rec.709` (reference, `scene_linear`)
/// - `sRGB Encoded`, `Gamma 2.2 Encoded`
/// - `Log2 Encoding` (`compositing_log`)
/// - `sRGB Display`, `Rec.1886 Display`, `Filmic sRGB` (display-referred)
/// - `Raw` (data)
///
/// Displays `sRGB` (Standard, Filmic, Raw) and `Rec.1886` (Standard, Raw);
/// looks `Punchy` (forward only), `Warm` and `Tint` (forward only).
pub fn studio() -> Config {
    Config::new("grade-studio")
        .with_description("Built-in studio catalog")
        .with_colorspace(linear_rec709())
        .with_colorspace(srgb_encoded())
        .with_colorspace(gamma22_encoded())
        .with_colorspace(log2_encoding())
        .with_colorspace(srgb_display())
        .with_colorspace(rec1886_display())
        .with_colorspace(filmic_srgb())
        .with_colorspace(raw())
        .with_role(names::REFERENCE, "Linear Rec.709")
        .with_role(names::SCENE_LINEAR, "Linear Rec.709")
        .with_role(names::DEFAULT, "Linear Rec.709")
        .with_role(names::COMPOSITING_LOG, "Log2 Encoding")
        .with_role(names::COLOR_PICKING, "sRGB Encoded")
        .with_role(names::DATA, "Raw")
        .with_display(
            Display::new("sRGB")
                .with_view(View::new("Standard", "sRGB Display"))
                .with_view(View::new("Filmic", "Filmic sRGB"))
                .with_view(View::new("Raw", "Raw")),
        )
        .with_display(
            Display::new("Rec.1886")
                .with_view(View::new("Standard", "Rec.1886 Display"))
                .with_view(View::new("Raw", "Raw")),
        )
        .with_look(punchy())
        .with_look(warm())
        .with_look(tint())
}

// ============================================================================
// Color spaces
// ============================================================================

fn linear_rec709() -> ColorSpace {
    ColorSpace::builder("Linear Rec.709")
        .alias("lin_rec709")
        .family("Linear")
        .description("Scene-linear Rec.709 primaries, reference space")
        .encoding(Encoding::SceneLinear)
        .build()
}

fn srgb_encoded() -> ColorSpace {
    ColorSpace::builder("sRGB Encoded")
        .alias("srgb_tx")
        .family("Utility")
        .description("Rec.709 primaries with the sRGB piecewise transfer")
        .encoding(Encoding::Sdr)
        .to_reference(vec![Op::SrgbTransfer { forward: false }])
        .from_reference(vec![Op::SrgbTransfer { forward: true }])
        .build()
}

fn gamma22_encoded() -> ColorSpace {
    ColorSpace::builder("Gamma 2.2 Encoded")
        .family("Utility")
        .description("Rec.709 primaries with a pure 2.2 power")
        .encoding(Encoding::Sdr)
        .to_reference(vec![Op::Exponent(2.2)])
        .from_reference(vec![Op::Exponent(1.0 / 2.2)])
        .build()
}

fn log2_allocation(forward: bool) -> Op {
    Op::Log2Allocation { min_ev: LOG2_MIN_EV, max_ev: LOG2_MAX_EV, mid_grey: MID_GREY, forward }
}

fn log2_encoding() -> ColorSpace {
    ColorSpace::builder("Log2 Encoding")
        .family("Log")
        .description("Normalized log2 around mid grey, -10 to +6.5 stops")
        .encoding(Encoding::Log)
        .to_reference(vec![log2_allocation(false)])
        .from_reference(vec![log2_allocation(true)])
        .build()
}

fn srgb_display() -> ColorSpace {
    ColorSpace::builder("sRGB Display")
        .family("Display")
        .description("sRGB display, values clipped to the unit range")
        .encoding(Encoding::Sdr)
        .to_reference(vec![Op::SrgbTransfer { forward: false }])
        .from_reference(vec![Op::Clamp { lo: 0.0, hi: 1.0 }, Op::SrgbTransfer { forward: true }])
        .build()
}

fn rec1886_display() -> ColorSpace {
    ColorSpace::builder("Rec.1886 Display")
        .family("Display")
        .description("Rec.1886 display, 2.4 power")
        .encoding(Encoding::Sdr)
        .to_reference(vec![Op::Exponent(2.4)])
        .from_reference(vec![Op::Clamp { lo: 0.0, hi: 1.0 }, Op::Exponent(1.0 / 2.4)])
        .build()
}

/// S-curve from normalized log2 to display-encoded values.
///
/// Logistic curve centred on mid grey, rescaled so 0 maps to 0 and 1 to 1.
pub fn filmic_curve(x: f32) -> f32 {
    const STEEPNESS: f32 = 9.0;
    let centre = -LOG2_MIN_EV / (LOG2_MAX_EV - LOG2_MIN_EV);
    let s = |t: f32| 1.0 / (1.0 + (-STEEPNESS * (t - centre)).exp());
    (s(x) - s(0.0)) / (s(1.0) - s(0.0))
}

fn filmic_srgb() -> ColorSpace {
    let curve = Lut1d::from_fn("filmic_base_contrast", FILMIC_CURVE_SIZE, filmic_curve);
    ColorSpace::builder("Filmic sRGB")
        .family("Display")
        .description("Gamut inset, log2 encoding and a base contrast curve for sRGB displays")
        .encoding(Encoding::Sdr)
        .from_reference(vec![Op::matrix(FILMIC_INSET), log2_allocation(true), Op::Lut1d(Arc::new(curve))])
        .build()
}

fn raw() -> ColorSpace {
    ColorSpace::builder("Raw")
        .family("Utility")
        .description("Non-color data, never converted")
        .encoding(Encoding::Data)
        .build()
}

// ============================================================================
// Looks
// ============================================================================

fn punchy() -> Look {
    let lut = Lut3d::from_fn("punchy", LOOK_LUT_EDGE, |rgb| {
        let contrasted = math::per_channel(rgb, |v, _| v.powf(1.3));
        math::saturate(contrasted, 1.2)
    });
    Look::new("Punchy")
        .process_space("Log2 Encoding")
        .description("Extra contrast and saturation, baked on the log encoding")
        .transform(vec![Op::Lut3d(Arc::new(lut))])
}

fn warm() -> Look {
    let cdl = |forward| Op::Cdl {
        slope: [1.08, 1.0, 0.92],
        offset: [0.0; 3],
        power: [1.0; 3],
        saturation: 1.0,
        forward,
    };
    Look::new("Warm")
        .process_space(names::SCENE_LINEAR)
        .description("Warmer white balance")
        .transform(vec![cdl(true)])
        .inverse_transform(vec![cdl(false)])
}

fn tint() -> Look {
    let lut = Lut1d::from_fn_rgb("tint", 256, |x| [x.powf(0.95), x, x.powf(1.05)]);
    Look::new("Tint")
        .process_space("sRGB Encoded")
        .description("Per-channel curves lifting red and sinking blue")
        .transform(vec![Op::Lut1d(Arc::new(lut))])
}

#[cfg(test)]
mod tests {
    use super::*;
    use grade_core::ColorCatalog;

    #[test]
    fn studio_catalog() {
        let config = studio();
        assert_eq!(config.colorspaces().len(), 8);
        assert_eq!(config.colorspace("scene_linear").map(ColorSpace::name), Some("Linear Rec.709"));
        assert!(config.colorspace("data").is_some_and(ColorSpace::is_data));
        assert_eq!(config.displays(), vec!["sRGB".to_string(), "Rec.1886".to_string()]);
        assert_eq!(config.views_for_display("sRGB"), vec!["Standard", "Filmic", "Raw"]);
        assert_eq!(config.looks().len(), 3);
        assert!(config.look("punchy").is_some());
    }

    #[test]
    fn every_view_targets_a_known_space() {
        let config = studio();
        for display in config.display_list() {
            for view in display.views() {
                assert!(config.colorspace_exists(view.colorspace()), "{}", view.colorspace());
            }
        }
    }

    #[test]
    fn filmic_curve_endpoints() {
        assert!(filmic_curve(0.0).abs() < 1e-6);
        assert!((filmic_curve(1.0) - 1.0).abs() < 1e-6);
        let mid = -LOG2_MIN_EV / (LOG2_MAX_EV - LOG2_MIN_EV);
        assert!(filmic_curve(mid) > 0.4 && filmic_curve(mid) < 0.6);
        assert!(filmic_curve(0.3) < filmic_curve(0.31));
    }

    #[test]
    fn filmic_inset_keeps_neutrals() {
        for row in FILMIC_INSET {
            assert!((row.iter().sum::<f32>() - 1.0).abs() < 1e-3, "{:?}", row);
        }
        assert_eq!(FILMIC_INSET[2][2], 0.879_143);
    }
}
