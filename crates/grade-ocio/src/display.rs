//! Displays and their views.
//!
//! A display is an output device; each view names the display color space
//! an image is rendered into for that device.

/// A view within a display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct View {
    name: String,
    colorspace: String,
    description: String,
}

impl View {
    /// Creates a view rendering into `colorspace`.
    pub fn new(name: impl Into<String>, colorspace: impl Into<String>) -> Self {
        Self { name: name.into(), colorspace: colorspace.into(), description: String::new() }
    }

    /// Sets description.
    pub fn with_description(mut self, desc: impl Into<String>) -> Self {
        self.description = desc.into();
        self
    }

    /// View name.
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Target color space name.
    #[inline]
    pub fn colorspace(&self) -> &str {
        &self.colorspace
    }

    /// Description.
    #[inline]
    pub fn description(&self) -> &str {
        &self.description
    }
}

/// A display device with its views.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Display {
    name: String,
    views: Vec<View>,
}

impl Display {
    /// Creates a display without views.
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), views: Vec::new() }
    }

    /// Adds a view, builder style.
    pub fn with_view(mut self, view: View) -> Self {
        self.add_view(view);
        self
    }

    /// Adds a view, replacing one with the same name.
    pub fn add_view(&mut self, view: View) {
        if let Some(existing) = self.views.iter_mut().find(|v| v.name == view.name) {
            *existing = view;
        } else {
            self.views.push(view);
        }
    }

    /// Display name.
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Views in declaration order.
    #[inline]
    pub fn views(&self) -> &[View] {
        &self.views
    }

    /// Looks up a view by exact name.
    pub fn view(&self, name: &str) -> Option<&View> {
        self.views.iter().find(|v| v.name == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_view_replaces_by_name() {
        let mut display = Display::new("sRGB").with_view(View::new("Standard", "sRGB Display"));
        display.add_view(View::new("Raw", "Raw"));
        display.add_view(View::new("Standard", "Other"));
        assert_eq!(display.views().len(), 2);
        assert_eq!(display.view("Standard").map(View::colorspace), Some("Other"));
        assert!(display.view("standard").is_none());
    }
}
