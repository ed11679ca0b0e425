//! Interactive grading parameters.
//!
//! [`GradingParameters`] is the value object a UI mutates. Setters for
//! fields that map to GPU-dynamic properties notify subscribers
//! synchronously, before the setter returns, so a renderer can push the
//! new uniform value without recompiling anything.
//!
//! # Example
//!
//! ```
//! use grade_core::{DynamicProperty, GradingParameters};
//! use std::cell::Cell;
//! use std::rc::Rc;
//!
//! let seen = Rc::new(Cell::new(0.0));
//! let mut params = GradingParameters::new();
//! let sink = seen.clone();
//! params.subscribe(move |prop| {
//!     if let DynamicProperty::Exposure(ev) = prop {
//!         sink.set(*ev);
//!     }
//! });
//!
//! params.set_exposure(1.5);
//! assert_eq!(seen.get(), 1.5);
//! ```

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::math;
use crate::primary::GradingPrimary;

// ============================================================================
// Value types
// ============================================================================

/// Space the primary grading math operates in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GradingSpace {
    /// Scene-linear values.
    #[default]
    Linear,
    /// Log-encoded values.
    Log,
    /// Display-referred values.
    Video,
}

impl GradingSpace {
    /// Lowercase name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Linear => "linear",
            Self::Log => "log",
            Self::Video => "video",
        }
    }
}

impl fmt::Display for GradingSpace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for GradingSpace {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "linear" | "lin" => Ok(Self::Linear),
            "log" => Ok(Self::Log),
            "video" => Ok(Self::Video),
            _ => Err(CoreError::UnknownGradingSpace { name: s.to_string() }),
        }
    }
}

/// A knob that is either one value for all channels or one per channel.
///
/// Equality compares effective per-channel values, so `Master(1.0)`
/// equals `Rgb([1.0; 3])`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Channels {
    /// Same value on R, G and B.
    Master(f32),
    /// Per-channel values.
    Rgb([f32; 3]),
}

impl Channels {
    /// Effective per-channel values.
    #[inline]
    pub fn rgb(&self) -> [f32; 3] {
        match *self {
            Self::Master(v) => [v; 3],
            Self::Rgb(rgb) => rgb,
        }
    }
}

impl PartialEq for Channels {
    fn eq(&self, other: &Self) -> bool {
        self.rgb() == other.rgb()
    }
}

impl From<f32> for Channels {
    fn from(v: f32) -> Self {
        Self::Master(v)
    }
}

impl From<[f32; 3]> for Channels {
    fn from(rgb: [f32; 3]) -> Self {
        Self::Rgb(rgb)
    }
}

// ============================================================================
// Dynamic properties
// ============================================================================

/// Kind of a GPU-dynamic property.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DynamicPropertyKind {
    /// Exposure in stops.
    Exposure,
    /// Display gamma.
    Gamma,
    /// Full primary grading block.
    GradingPrimary,
}

/// A dynamic property together with its new value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DynamicProperty {
    /// Exposure in stops.
    Exposure(f32),
    /// Gamma around mid grey.
    Gamma(f32),
    /// Recomputed primary grading.
    GradingPrimary(GradingPrimary),
}

impl DynamicProperty {
    /// Kind of this property.
    pub fn kind(&self) -> DynamicPropertyKind {
        match self {
            Self::Exposure(_) => DynamicPropertyKind::Exposure,
            Self::Gamma(_) => DynamicPropertyKind::Gamma,
            Self::GradingPrimary(_) => DynamicPropertyKind::GradingPrimary,
        }
    }
}

/// Handle returned by [`GradingParameters::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

// ============================================================================
// Parameters
// ============================================================================

/// Plain snapshot of every grading field.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GradingValues {
    /// Exposure in stops.
    pub exposure: f32,
    /// Gamma, applied with a fixed pivot of 0.18.
    pub gamma: f32,
    /// Contrast.
    pub contrast: Channels,
    /// Lift.
    pub lift: Channels,
    /// Offset.
    pub offset: Channels,
    /// Contrast pivot.
    pub pivot: f32,
    /// Saturation.
    pub saturation: f32,
    /// Space the primary grading operates in.
    pub grading_space: GradingSpace,
}

impl Default for GradingValues {
    fn default() -> Self {
        Self {
            exposure: 0.0,
            gamma: 1.0,
            contrast: Channels::Master(1.0),
            lift: Channels::Master(0.0),
            offset: Channels::Master(0.0),
            pivot: math::MID_GREY,
            saturation: 1.0,
            grading_space: GradingSpace::Linear,
        }
    }
}

type Subscriber = Box<dyn FnMut(&DynamicProperty)>;

/// Grading knobs with synchronous change notification.
pub struct GradingParameters {
    values: GradingValues,
    subscribers: Vec<(SubscriptionId, Subscriber)>,
    next_id: u64,
}

impl GradingParameters {
    /// Parameters at their passthrough defaults.
    pub fn new() -> Self {
        Self::from_values(GradingValues::default())
    }

    /// Parameters initialized from a snapshot.
    pub fn from_values(values: GradingValues) -> Self {
        Self { values, subscribers: Vec::new(), next_id: 0 }
    }

    /// Register a callback invoked on every dynamic property change.
    pub fn subscribe(&mut self, callback: impl FnMut(&DynamicProperty) + 'static) -> SubscriptionId {
        let id = SubscriptionId(self.next_id);
        self.next_id += 1;
        self.subscribers.push((id, Box::new(callback)));
        id
    }

    /// Remove a callback. Returns `false` if it was not registered.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.subscribers.len();
        self.subscribers.retain(|(sid, _)| *sid != id);
        self.subscribers.len() != before
    }

    /// Number of registered callbacks.
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }

    fn notify(&mut self, property: DynamicProperty) {
        for (_, callback) in &mut self.subscribers {
            callback(&property);
        }
    }

    fn notify_primary(&mut self) {
        let primary = self.grading_primary();
        self.notify(DynamicProperty::GradingPrimary(primary));
    }

    // ------------------------------------------------------------------------
    // Getters
    // ------------------------------------------------------------------------

    /// Exposure in stops.
    pub fn exposure(&self) -> f32 {
        self.values.exposure
    }

    /// Gamma.
    pub fn gamma(&self) -> f32 {
        self.values.gamma
    }

    /// Contrast.
    pub fn contrast(&self) -> Channels {
        self.values.contrast
    }

    /// Lift.
    pub fn lift(&self) -> Channels {
        self.values.lift
    }

    /// Offset.
    pub fn offset(&self) -> Channels {
        self.values.offset
    }

    /// Contrast pivot.
    pub fn pivot(&self) -> f32 {
        self.values.pivot
    }

    /// Saturation.
    pub fn saturation(&self) -> f32 {
        self.values.saturation
    }

    /// Grading space.
    pub fn grading_space(&self) -> GradingSpace {
        self.values.grading_space
    }

    /// Copy of all values.
    pub fn snapshot(&self) -> GradingValues {
        self.values
    }

    // ------------------------------------------------------------------------
    // Setters
    // ------------------------------------------------------------------------

    /// Set exposure; notifies [`DynamicProperty::Exposure`].
    pub fn set_exposure(&mut self, ev: f32) {
        self.values.exposure = ev;
        self.notify(DynamicProperty::Exposure(ev));
    }

    /// Set gamma; notifies [`DynamicProperty::Gamma`].
    pub fn set_gamma(&mut self, gamma: f32) {
        self.values.gamma = gamma;
        self.notify(DynamicProperty::Gamma(gamma));
    }

    /// Set contrast; notifies [`DynamicProperty::GradingPrimary`].
    pub fn set_contrast(&mut self, contrast: impl Into<Channels>) {
        self.values.contrast = contrast.into();
        self.notify_primary();
    }

    /// Set lift; notifies [`DynamicProperty::GradingPrimary`].
    pub fn set_lift(&mut self, lift: impl Into<Channels>) {
        self.values.lift = lift.into();
        self.notify_primary();
    }

    /// Set offset; notifies [`DynamicProperty::GradingPrimary`].
    pub fn set_offset(&mut self, offset: impl Into<Channels>) {
        self.values.offset = offset.into();
        self.notify_primary();
    }

    /// Set pivot; notifies [`DynamicProperty::GradingPrimary`].
    pub fn set_pivot(&mut self, pivot: f32) {
        self.values.pivot = pivot;
        self.notify_primary();
    }

    /// Set saturation; notifies [`DynamicProperty::GradingPrimary`].
    pub fn set_saturation(&mut self, saturation: f32) {
        self.values.saturation = saturation;
        self.notify_primary();
    }

    /// Set the grading space. Structural: changes the compiled pipeline
    /// shape, so nothing is notified.
    pub fn set_grading_space(&mut self, space: GradingSpace) {
        self.values.grading_space = space;
    }

    /// Replace every field and notify all dynamic properties.
    pub fn restore(&mut self, values: GradingValues) {
        self.values = values;
        for property in self.dynamic_properties() {
            self.notify(property);
        }
    }

    /// Restore passthrough defaults.
    pub fn reset(&mut self) {
        self.restore(GradingValues::default());
    }

    // ------------------------------------------------------------------------
    // Derived state
    // ------------------------------------------------------------------------

    /// True if every field equals its default.
    pub fn is_default(&self) -> bool {
        self.values == GradingValues::default()
    }

    /// True if saturation is the only field away from its default.
    pub fn is_modified_saturation_only(&self) -> bool {
        let defaults = GradingValues::default();
        let others = GradingValues { saturation: defaults.saturation, ..self.values };
        others == defaults && self.values.saturation != defaults.saturation
    }

    /// Primary grading value for the current fields.
    pub fn grading_primary(&self) -> GradingPrimary {
        let v = &self.values;
        let mut primary = GradingPrimary {
            space: v.grading_space,
            contrast: v.contrast.rgb(),
            lift: v.lift.rgb(),
            offset: v.offset.rgb(),
            pivot: v.pivot,
            saturation: v.saturation,
            ..GradingPrimary::identity(v.grading_space)
        };
        // Saturation alone on the primary op is unstable unless a lower clamp
        // is set: https://github.com/AcademySoftwareFoundation/OpenColorIO/issues/1642
        if self.is_modified_saturation_only() {
            primary.clamp_black = -150.0;
        }
        primary
    }

    /// Current value of every dynamic property.
    pub fn dynamic_properties(&self) -> [DynamicProperty; 3] {
        [
            DynamicProperty::Exposure(self.values.exposure),
            DynamicProperty::Gamma(self.values.gamma),
            DynamicProperty::GradingPrimary(self.grading_primary()),
        ]
    }

    /// Current value for one dynamic property kind.
    pub fn dynamic_property(&self, kind: DynamicPropertyKind) -> DynamicProperty {
        match kind {
            DynamicPropertyKind::Exposure => DynamicProperty::Exposure(self.values.exposure),
            DynamicPropertyKind::Gamma => DynamicProperty::Gamma(self.values.gamma),
            DynamicPropertyKind::GradingPrimary => {
                DynamicProperty::GradingPrimary(self.grading_primary())
            }
        }
    }
}

impl Default for GradingParameters {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for GradingParameters {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GradingParameters")
            .field("values", &self.values)
            .field("subscribers", &self.subscribers.len())
            .finish()
    }
}
