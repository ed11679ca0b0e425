//! Creative looks.
//!
//! A look is a named grade applied in its own process space. Looks without
//! an inverse transform cannot be applied in the inverse direction.

use crate::op::Op;

/// A named creative look.
#[derive(Debug, Clone)]
pub struct Look {
    name: String,
    process_space: Option<String>,
    description: String,
    transform: Vec<Op>,
    inverse_transform: Option<Vec<Op>>,
}

impl Look {
    /// Creates an identity look.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            process_space: None,
            description: String::new(),
            transform: Vec::new(),
            inverse_transform: None,
        }
    }

    /// Sets the process space.
    pub fn process_space(mut self, space: impl Into<String>) -> Self {
        self.process_space = Some(space.into());
        self
    }

    /// Sets the description.
    pub fn description(mut self, desc: impl Into<String>) -> Self {
        self.description = desc.into();
        self
    }

    /// Sets the forward ops.
    pub fn transform(mut self, ops: Vec<Op>) -> Self {
        self.transform = ops;
        self
    }

    /// Sets the inverse ops.
    pub fn inverse_transform(mut self, ops: Vec<Op>) -> Self {
        self.inverse_transform = Some(ops);
        self
    }

    /// Look name.
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Process space name; `None` means the scene-linear role.
    #[inline]
    pub fn get_process_space(&self) -> Option<&str> {
        self.process_space.as_deref()
    }

    /// Description.
    #[inline]
    pub fn get_description(&self) -> &str {
        &self.description
    }

    /// Ops for the requested direction, `None` if it is not available.
    pub fn ops(&self, forward: bool) -> Option<&[Op]> {
        if forward { Some(&self.transform) } else { self.inverse_transform.as_deref() }
    }
}
