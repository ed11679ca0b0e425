//! Transform nodes: the ordered building blocks of a grading pipeline.

use std::fmt::{self, Write};

use crate::params::DynamicPropertyKind;
use crate::primary::GradingPrimary;

/// One look with its direction.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LookSpec {
    /// Look name.
    pub name: String,
    /// True for forward application, false for inverse.
    pub forward: bool,
}

impl LookSpec {
    /// Forward look.
    pub fn forward(name: impl Into<String>) -> Self {
        Self { name: name.into(), forward: true }
    }

    /// Inverse look.
    pub fn inverse(name: impl Into<String>) -> Self {
        Self { name: name.into(), forward: false }
    }
}

impl fmt::Display for LookSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.forward { '+' } else { '-' };
        write!(f, "{}{}", sign, self.name)
    }
}

/// Parse a look string like `"+Punchy, -Warm:Grain"`.
///
/// Entries are separated by commas or colons. A `-` prefix selects the
/// inverse direction, `+` or no prefix the forward one. Empty entries are
/// skipped.
pub fn parse_looks(looks: &str) -> Vec<LookSpec> {
    looks
        .split([',', ':'])
        .filter_map(|s| {
            let s = s.trim();
            if s.is_empty() {
                return None;
            }
            let (name, forward) = if let Some(name) = s.strip_prefix('-') {
                (name.trim(), false)
            } else if let Some(name) = s.strip_prefix('+') {
                (name.trim(), true)
            } else {
                (s, true)
            };
            (!name.is_empty()).then(|| LookSpec { name: name.to_string(), forward })
        })
        .collect()
}

/// One stage of the pipeline.
#[derive(Debug, Clone, PartialEq)]
pub enum TransformNode {
    /// Convert between two color spaces.
    ColorspaceConversion {
        /// Source color space or role.
        src: String,
        /// Destination color space or role.
        dst: String,
    },
    /// Primary grading block.
    GradingPrimary {
        /// Initial values.
        primary: GradingPrimary,
        /// Values may change after compilation.
        dynamic: bool,
    },
    /// Exposure in stops.
    Exposure {
        /// Initial value.
        value: f32,
        /// Value may change after compilation.
        dynamic: bool,
    },
    /// Mirrored power around a pivot.
    Gamma {
        /// Initial exponent.
        value: f32,
        /// Pivot of the power curve.
        pivot: f32,
        /// Exponent may change after compilation.
        dynamic: bool,
    },
    /// Apply looks between two color spaces.
    LookApplication {
        /// Color space the input is in.
        src: String,
        /// Color space the output should be in.
        dst: String,
        /// Looks in application order.
        looks: Vec<LookSpec>,
    },
    /// Render to a display through one of its views.
    DisplayRender {
        /// Color space the input is in.
        src: String,
        /// Display name.
        display: String,
        /// View name.
        view: String,
    },
}

impl TransformNode {
    /// Dynamic property this node exposes, if any.
    pub fn dynamic_kind(&self) -> Option<DynamicPropertyKind> {
        match self {
            Self::GradingPrimary { dynamic: true, .. } => Some(DynamicPropertyKind::GradingPrimary),
            Self::Exposure { dynamic: true, .. } => Some(DynamicPropertyKind::Exposure),
            Self::Gamma { dynamic: true, .. } => Some(DynamicPropertyKind::Gamma),
            _ => None,
        }
    }

    /// Canonical structural description.
    ///
    /// Values of dynamic nodes are masked, so two nodes that differ only in
    /// a dynamic value produce the same signature.
    pub fn signature(&self) -> String {
        let mut s = String::new();
        match self {
            Self::ColorspaceConversion { src, dst } => {
                let _ = write!(s, "cs({:?}->{:?})", src, dst);
            }
            Self::GradingPrimary { primary, dynamic: true } => {
                let _ = write!(s, "primary({},dyn)", primary.space);
            }
            Self::GradingPrimary { primary, dynamic: false } => {
                let _ = write!(s, "primary({:?})", primary);
            }
            Self::Exposure { dynamic: true, .. } => s.push_str("exposure(dyn)"),
            Self::Exposure { value, dynamic: false } => {
                let _ = write!(s, "exposure({:?})", value);
            }
            Self::Gamma { pivot, dynamic: true, .. } => {
                let _ = write!(s, "gamma(dyn,{:?})", pivot);
            }
            Self::Gamma { value, pivot, dynamic: false } => {
                let _ = write!(s, "gamma({:?},{:?})", value, pivot);
            }
            Self::LookApplication { src, dst, looks } => {
                let _ = write!(s, "look({:?}->{:?}", src, dst);
                for look in looks {
                    let _ = write!(s, ",{:?}", look.to_string());
                }
                s.push(')');
            }
            Self::DisplayRender { src, display, view } => {
                let _ = write!(s, "display({:?},{:?},{:?})", src, display, view);
            }
        }
        s
    }
}

impl fmt::Display for TransformNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ColorspaceConversion { src, dst } => write!(f, "ColorSpace: {} -> {}", src, dst),
            Self::GradingPrimary { primary, .. } => write!(
                f,
                "GradingPrimary [{}]: contrast={:?} lift={:?} offset={:?} pivot={} saturation={}",
                primary.space, primary.contrast, primary.lift, primary.offset, primary.pivot, primary.saturation
            ),
            Self::Exposure { value, .. } => write!(f, "Exposure: {}", value),
            Self::Gamma { value, pivot, .. } => write!(f, "Gamma: {} (pivot {})", value, pivot),
            Self::LookApplication { src, dst, looks } => {
                let names: Vec<String> = looks.iter().map(ToString::to_string).collect();
                write!(f, "Look: {} [{}] -> {}", src, names.join(", "), dst)
            }
            Self::DisplayRender { src, display, view } => {
                write!(f, "DisplayView: {} -> {} / {}", src, display, view)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::GradingSpace;

    #[test]
    fn parse_mixed_delimiters() {
        let looks = parse_looks("+Punchy, -Warm:Grain");
        assert_eq!(
            looks,
            vec![LookSpec::forward("Punchy"), LookSpec::inverse("Warm"), LookSpec::forward("Grain")]
        );
    }

    #[test]
    fn parse_skips_empty() {
        assert!(parse_looks("").is_empty());
        assert!(parse_looks(" , : -").is_empty());
        assert_eq!(parse_looks(" - Warm ").len(), 1);
    }

    #[test]
    fn signature_masks_dynamic_values() {
        let a = TransformNode::Exposure { value: 0.0, dynamic: true };
        let b = TransformNode::Exposure { value: 3.0, dynamic: true };
        assert_eq!(a.signature(), b.signature());

        let mut gp = GradingPrimary::identity(GradingSpace::Linear);
        let a = TransformNode::GradingPrimary { primary: gp, dynamic: true };
        gp.saturation = 2.0;
        let b = TransformNode::GradingPrimary { primary: gp, dynamic: true };
        assert_eq!(a.signature(), b.signature());

        gp.space = GradingSpace::Log;
        let c = TransformNode::GradingPrimary { primary: gp, dynamic: true };
        assert_ne!(a.signature(), c.signature());
    }

    #[test]
    fn signature_keeps_static_values() {
        let a = TransformNode::Exposure { value: 0.0, dynamic: false };
        let b = TransformNode::Exposure { value: 3.0, dynamic: false };
        assert_ne!(a.signature(), b.signature());
    }

    #[test]
    fn signature_separates_names() {
        let a = TransformNode::ColorspaceConversion { src: "a,b".into(), dst: "c".into() };
        let b = TransformNode::ColorspaceConversion { src: "a".into(), dst: "b,c".into() };
        assert_ne!(a.signature(), b.signature());
    }
}
