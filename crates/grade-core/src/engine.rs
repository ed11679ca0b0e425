//! Interfaces between the grading pipeline and a color engine.
//!
//! The pipeline never evaluates color math itself. It describes what it
//! wants as a list of [`TransformNode`]s and hands them to a
//! [`ColorEngine`], which returns a [`CompiledProcessor`] usable on the CPU
//! and, through its [`GpuShaderDesc`], on the GPU.

use std::fmt;

use crate::error::EngineResult;
use crate::node::TransformNode;
use crate::params::DynamicProperty;
use crate::shader::GpuShaderDesc;

/// Read-only lookups into a color catalog.
pub trait ColorCatalog: Send + Sync {
    /// True if `name` is a color space or a role resolving to one.
    fn colorspace_exists(&self, name: &str) -> bool;

    /// Display names in catalog order.
    fn displays(&self) -> Vec<String>;

    /// View names for a display; empty if the display is unknown.
    fn views_for_display(&self, display: &str) -> Vec<String>;

    /// True if `display` exists.
    fn display_exists(&self, display: &str) -> bool {
        self.displays().iter().any(|d| d == display)
    }

    /// True if `view` exists for `display`.
    fn view_exists(&self, display: &str, view: &str) -> bool {
        self.views_for_display(display).iter().any(|v| v == view)
    }
}

/// Compiles node lists into processors.
pub trait ColorEngine: ColorCatalog {
    /// Compile an ordered node list.
    fn compile(&self, nodes: &[TransformNode]) -> EngineResult<Box<dyn CompiledProcessor>>;
}

/// A compiled, ready-to-apply pipeline.
pub trait CompiledProcessor: Send + Sync + fmt::Debug {
    /// Stable identifier of the compiled shape.
    ///
    /// Equal for two compilations that differ only in dynamic values.
    fn fingerprint(&self) -> &str;

    /// Apply to RGB pixels in place.
    fn apply_rgb(&self, pixels: &mut [[f32; 3]]);

    /// Apply to RGBA pixels in place; alpha is untouched.
    fn apply_rgba(&self, pixels: &mut [[f32; 4]]) {
        for px in pixels.iter_mut() {
            let mut rgb = [[px[0], px[1], px[2]]];
            self.apply_rgb(&mut rgb);
            px[..3].copy_from_slice(&rgb[0]);
        }
    }

    /// Update the value of a dynamic property for subsequent CPU applies.
    ///
    /// Properties this processor does not expose are ignored.
    fn set_dynamic(&mut self, property: &DynamicProperty);

    /// Shader description for the GPU path.
    fn shader(&self) -> &GpuShaderDesc;
}

/// Something that accepts dynamic property updates.
pub trait DynamicTarget {
    /// Push a new value.
    fn set_dynamic(&mut self, property: &DynamicProperty);
}

impl DynamicTarget for Box<dyn CompiledProcessor> {
    fn set_dynamic(&mut self, property: &DynamicProperty) {
        CompiledProcessor::set_dynamic(self.as_mut(), property);
    }
}
