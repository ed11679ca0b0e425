//! Compiled processors.

use grade_core::{CompiledProcessor, DynamicProperty, GpuShaderDesc};

use crate::op::Op;

/// An op list together with its shader and fingerprint.
#[derive(Debug, Clone)]
pub struct Processor {
    ops: Vec<Op>,
    fingerprint: String,
    shader: GpuShaderDesc,
}

impl Processor {
    pub(crate) fn new(ops: Vec<Op>, fingerprint: String, shader: GpuShaderDesc) -> Self {
        Self { ops, fingerprint, shader }
    }

    /// Ops in application order.
    #[inline]
    pub fn ops(&self) -> &[Op] {
        &self.ops
    }

    /// Number of ops.
    #[inline]
    pub fn num_ops(&self) -> usize {
        self.ops.len()
    }

    /// True if no op remains after compilation.
    #[inline]
    pub fn is_noop(&self) -> bool {
        self.ops.is_empty()
    }

    /// Apply to one RGB triple.
    #[inline]
    pub fn apply_pixel(&self, rgb: [f32; 3]) -> [f32; 3] {
        self.ops.iter().fold(rgb, |acc, op| op.apply(acc))
    }
}

impl CompiledProcessor for Processor {
    fn fingerprint(&self) -> &str {
        &self.fingerprint
    }

    fn apply_rgb(&self, pixels: &mut [[f32; 3]]) {
        if self.ops.is_empty() {
            return;
        }
        for px in pixels.iter_mut() {
            *px = self.apply_pixel(*px);
        }
    }

    fn apply_rgba(&self, pixels: &mut [[f32; 4]]) {
        if self.ops.is_empty() {
            return;
        }
        for px in pixels.iter_mut() {
            let [r, g, b] = self.apply_pixel([px[0], px[1], px[2]]);
            px[0] = r;
            px[1] = g;
            px[2] = b;
        }
    }

    fn set_dynamic(&mut self, property: &DynamicProperty) {
        for op in &mut self.ops {
            op.set_dynamic(property);
        }
    }

    fn shader(&self) -> &GpuShaderDesc {
        &self.shader
    }
}
