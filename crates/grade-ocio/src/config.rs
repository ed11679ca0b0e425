//! Color catalog: color spaces, roles, displays and looks.

use grade_core::ColorCatalog;

use crate::colorspace::ColorSpace;
use crate::display::Display;
use crate::error::{OcioError, OcioResult};
use crate::look::Look;
use crate::role::Roles;

/// An in-memory color catalog.
///
/// Lookups of color spaces and looks are case-insensitive; roles are
/// resolved before names.
#[derive(Debug, Clone, Default)]
pub struct Config {
    name: String,
    description: String,
    colorspaces: Vec<ColorSpace>,
    roles: Roles,
    displays: Vec<Display>,
    looks: Vec<Look>,
}

impl Config {
    /// Creates an empty catalog.
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), ..Default::default() }
    }

    /// Sets the description.
    pub fn with_description(mut self, desc: impl Into<String>) -> Self {
        self.description = desc.into();
        self
    }

    /// Catalog name.
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Description.
    #[inline]
    pub fn description(&self) -> &str {
        &self.description
    }

    // ------------------------------------------------------------------------
    // Unchecked builder methods; later entries replace earlier ones by name.
    // ------------------------------------------------------------------------

    /// Adds or replaces a color space.
    pub fn with_colorspace(mut self, cs: ColorSpace) -> Self {
        self.colorspaces.retain(|existing| existing.name() != cs.name());
        self.colorspaces.push(cs);
        self
    }

    /// Defines a role without checking its target.
    pub fn with_role(mut self, role: impl Into<String>, colorspace: impl Into<String>) -> Self {
        self.roles.define(role, colorspace);
        self
    }

    /// Adds or replaces a display without checking its views.
    pub fn with_display(mut self, display: Display) -> Self {
        self.displays.retain(|existing| existing.name() != display.name());
        self.displays.push(display);
        self
    }

    /// Adds or replaces a look.
    pub fn with_look(mut self, look: Look) -> Self {
        self.looks.retain(|existing| existing.name() != look.name());
        self.looks.push(look);
        self
    }

    // ------------------------------------------------------------------------
    // Checked insertion
    // ------------------------------------------------------------------------

    /// Adds a color space. Names and aliases must be unique.
    pub fn add_colorspace(&mut self, cs: ColorSpace) -> OcioResult<()> {
        let clash = std::iter::once(cs.name())
            .chain(cs.aliases().iter().map(String::as_str))
            .find(|n| self.colorspaces.iter().any(|existing| existing.matches_name(n)));
        if let Some(name) = clash {
            return Err(OcioError::DuplicateColorSpace { name: name.to_string() });
        }
        self.colorspaces.push(cs);
        Ok(())
    }

    /// Defines a role. The target must already exist.
    pub fn set_role(&mut self, role: impl Into<String>, colorspace: impl Into<String>) -> OcioResult<()> {
        let role = role.into();
        let colorspace = colorspace.into();
        if !self.colorspaces.iter().any(|cs| cs.matches_name(&colorspace)) {
            return Err(OcioError::RoleTargetMissing { role, colorspace });
        }
        self.roles.define(role, colorspace);
        Ok(())
    }

    /// Adds a display, replacing one with the same name. Every view must
    /// target a known color space.
    pub fn add_display(&mut self, display: Display) -> OcioResult<()> {
        for view in display.views() {
            if self.colorspace(view.colorspace()).is_none() {
                return Err(OcioError::ViewTargetMissing {
                    display: display.name().to_string(),
                    view: view.name().to_string(),
                    colorspace: view.colorspace().to_string(),
                });
            }
        }
        if let Some(existing) = self.displays.iter_mut().find(|d| d.name() == display.name()) {
            *existing = display;
        } else {
            self.displays.push(display);
        }
        Ok(())
    }

    /// Adds a look.
    pub fn add_look(&mut self, look: Look) -> OcioResult<()> {
        if self.look(look.name()).is_some() {
            return Err(OcioError::DuplicateLook { name: look.name().to_string() });
        }
        self.looks.push(look);
        Ok(())
    }

    /// Looks up a color space by role, name or alias.
    pub fn colorspace(&self, name: &str) -> Option<&ColorSpace> {
        if let Some(cs_name) = self.roles.get(name) {
            return self.colorspaces.iter().find(|cs| cs.matches_name(cs_name));
        }
        self.colorspaces.iter().find(|cs| cs.matches_name(name))
    }

    /// All color spaces.
    #[inline]
    pub fn colorspaces(&self) -> &[ColorSpace] {
        &self.colorspaces
    }

    /// Returns the roles mapping.
    #[inline]
    pub fn roles(&self) -> &Roles {
        &self.roles
    }

    /// Looks up a display by exact name.
    pub fn display(&self, name: &str) -> Option<&Display> {
        self.displays.iter().find(|d| d.name() == name)
    }

    /// All displays.
    #[inline]
    pub fn display_list(&self) -> &[Display] {
        &self.displays
    }

    /// Looks up a look by name.
    pub fn look(&self, name: &str) -> Option<&Look> {
        self.looks.iter().find(|l| l.name().eq_ignore_ascii_case(name))
    }

    /// All looks.
    #[inline]
    pub fn looks(&self) -> &[Look] {
        &self.looks
    }
}

impl ColorCatalog for Config {
    fn colorspace_exists(&self, name: &str) -> bool {
        self.colorspace(name).is_some()
    }

    fn displays(&self) -> Vec<String> {
        self.displays.iter().map(|d| d.name().to_string()).collect()
    }

    fn views_for_display(&self, display: &str) -> Vec<String> {
        self.display(display)
            .map(|d| d.views().iter().map(|v| v.name().to_string()).collect())
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::display::View;
    use crate::role::names;

    fn small() -> Config {
        let mut config = Config::new("test");
        config.add_colorspace(ColorSpace::new("Linear")).unwrap();
        config.add_colorspace(ColorSpace::builder("Encoded").alias("enc").build()).unwrap();
        config.set_role(names::SCENE_LINEAR, "Linear").unwrap();
        config
    }

    #[test]
    fn roles_resolve_first() {
        let config = small();
        assert_eq!(config.colorspace("scene_linear").map(ColorSpace::name), Some("Linear"));
        assert!(config.colorspace_exists("ENC"));
        assert!(!config.colorspace_exists("missing"));
    }

    #[test]
    fn duplicates_rejected() {
        let mut config = small();
        let err = config.add_colorspace(ColorSpace::builder("Other").alias("linear").build());
        assert_eq!(err, Err(OcioError::DuplicateColorSpace { name: "linear".into() }));
        assert!(config.set_role("data", "Nope").is_err());
    }

    #[test]
    fn display_views_validated() {
        let mut config = small();
        let bad = Display::new("Monitor").with_view(View::new("Std", "Nope"));
        assert!(config.add_display(bad).is_err());

        let good = Display::new("Monitor").with_view(View::new("Std", "Encoded"));
        config.add_display(good).unwrap();
        assert_eq!(config.views_for_display("Monitor"), vec!["Std".to_string()]);
        assert!(config.views_for_display("Nope").is_empty());
        assert!(config.view_exists("Monitor", "Std"));
    }
}
