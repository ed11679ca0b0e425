//! Color space definitions.
//!
//! A color space is described by its transforms to and from the catalog's
//! reference space. A missing transform means the space shares the
//! reference encoding in that direction.

use crate::op::Op;

/// Broad encoding category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Encoding {
    /// Scene-referred linear.
    #[default]
    SceneLinear,
    /// Logarithmic.
    Log,
    /// Display-referred, non-linear.
    Sdr,
    /// Non-color data.
    Data,
}

/// A named color space.
#[derive(Debug, Clone)]
pub struct ColorSpace {
    name: String,
    aliases: Vec<String>,
    description: String,
    family: String,
    encoding: Encoding,
    to_reference: Option<Vec<Op>>,
    from_reference: Option<Vec<Op>>,
}

impl ColorSpace {
    /// Creates a reference-like color space with no transforms.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            aliases: Vec::new(),
            description: String::new(),
            family: String::new(),
            encoding: Encoding::default(),
            to_reference: None,
            from_reference: None,
        }
    }

    /// Starts a builder.
    pub fn builder(name: impl Into<String>) -> ColorSpaceBuilder {
        ColorSpaceBuilder { inner: Self::new(name) }
    }

    /// Name.
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Alternative names.
    #[inline]
    pub fn aliases(&self) -> &[String] {
        &self.aliases
    }

    /// Description.
    #[inline]
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Family, used for UI grouping.
    #[inline]
    pub fn family(&self) -> &str {
        &self.family
    }

    /// Encoding category.
    #[inline]
    pub fn encoding(&self) -> Encoding {
        self.encoding
    }

    /// True for non-color data; conversions to or from it are skipped.
    #[inline]
    pub fn is_data(&self) -> bool {
        self.encoding == Encoding::Data
    }

    /// Ops taking this space to the reference.
    #[inline]
    pub fn to_reference(&self) -> Option<&[Op]> {
        self.to_reference.as_deref()
    }

    /// Ops taking the reference to this space.
    #[inline]
    pub fn from_reference(&self) -> Option<&[Op]> {
        self.from_reference.as_deref()
    }

    /// Case-insensitive match against the name and aliases.
    pub fn matches_name(&self, name: &str) -> bool {
        self.name.eq_ignore_ascii_case(name) || self.aliases.iter().any(|a| a.eq_ignore_ascii_case(name))
    }
}

/// Builder for [`ColorSpace`].
#[derive(Debug, Clone)]
pub struct ColorSpaceBuilder {
    inner: ColorSpace,
}

impl ColorSpaceBuilder {
    /// Adds an alias.
    pub fn alias(mut self, alias: impl Into<String>) -> Self {
        self.inner.aliases.push(alias.into());
        self
    }

    /// Sets the description.
    pub fn description(mut self, desc: impl Into<String>) -> Self {
        self.inner.description = desc.into();
        self
    }

    /// Sets the family.
    pub fn family(mut self, family: impl Into<String>) -> Self {
        self.inner.family = family.into();
        self
    }

    /// Sets the encoding.
    pub fn encoding(mut self, encoding: Encoding) -> Self {
        self.inner.encoding = encoding;
        self
    }

    /// Sets the ops to reference space.
    pub fn to_reference(mut self, ops: Vec<Op>) -> Self {
        self.inner.to_reference = Some(ops);
        self
    }

    /// Sets the ops from reference space.
    pub fn from_reference(mut self, ops: Vec<Op>) -> Self {
        self.inner.from_reference = Some(ops);
        self
    }

    /// Builds the color space.
    pub fn build(self) -> ColorSpace {
        self.inner
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_and_lookup() {
        let cs = ColorSpace::builder("sRGB Encoded")
            .alias("srgb_tx")
            .family("Display")
            .encoding(Encoding::Sdr)
            .to_reference(vec![Op::SrgbTransfer { forward: false }])
            .build();
        assert!(cs.matches_name("SRGB ENCODED"));
        assert!(cs.matches_name("srgb_tx"));
        assert!(!cs.is_data());
        assert_eq!(cs.to_reference().map(<[Op]>::len), Some(1));
        assert!(cs.from_reference().is_none());
    }
}
