//! Color space roles.
//!
//! Roles name a color space by purpose (`scene_linear`, `data`, ...) so
//! pipelines can be described without knowing catalog-specific names.

use std::collections::BTreeMap;

/// Role names used by the built-in catalog and the transform graph.
pub mod names {
    /// Scene-referred linear reference.
    pub const REFERENCE: &str = "reference";
    /// Default input color space.
    pub const DEFAULT: &str = "default";
    /// Non-color data.
    pub const DATA: &str = "data";
    /// Scene-referred linear working space.
    pub const SCENE_LINEAR: &str = "scene_linear";
    /// Log working space.
    pub const COMPOSITING_LOG: &str = "compositing_log";
    /// Color picker display space.
    pub const COLOR_PICKING: &str = "color_picking";
}

/// Role to color space mapping, ordered by role name.
#[derive(Debug, Clone, Default)]
pub struct Roles {
    mapping: BTreeMap<String, String>,
}

impl Roles {
    /// Creates an empty roles mapping.
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Defines (or redefines) a role.
    #[inline]
    pub fn define(&mut self, role: impl Into<String>, colorspace: impl Into<String>) {
        self.mapping.insert(role.into(), colorspace.into());
    }

    /// Color space name for a role.
    #[inline]
    pub fn get(&self, role: &str) -> Option<&str> {
        self.mapping.get(role).map(String::as_str)
    }

    /// All roles.
    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.mapping.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Number of defined roles.
    #[inline]
    pub fn len(&self) -> usize {
        self.mapping.len()
    }

    /// Checks if no roles are defined.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.mapping.is_empty()
    }
}
