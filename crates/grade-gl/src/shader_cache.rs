//! Program cache keyed by processor fingerprint.
//!
//! The vertex shader is compiled once. Each rebuild compiles a fragment
//! shader around the processor's shader text and links it into a fresh
//! program; the previous program is released only after the new one links,
//! so a failed rebuild leaves the last good program active.
//!
//! Uniforms backing dynamic properties are resolved once per program into
//! [`DynamicPropertyBinding`]s. Pushing a new value never recompiles.

use std::fmt;
use std::rc::Rc;

use tracing::{debug, error};

use grade_core::{
    CompiledProcessor, DynamicProperty, DynamicTarget, GlslVersion, UniformDesc, UniformField,
    UniformValue,
};

use crate::backend::{GraphicsBackend, ProgramId, ShaderId, ShaderStage, UniformLocation};
use crate::error::GpuResult;
use crate::resource::{OwnedProgram, OwnedShader};
use crate::shaders::{self, POSITION_ATTRIB, TEX_COORD_ATTRIB};

/// Outcome of [`ShaderCache::ensure_program`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgramStatus {
    /// Fingerprint matched; nothing was compiled.
    Unchanged,
    /// A new program was linked and is now active.
    Rebuilt,
}

/// A uniform location feeding one field of a dynamic property.
#[derive(Debug, Clone, PartialEq)]
pub struct DynamicPropertyBinding {
    /// Uniform name.
    pub name: String,
    /// Field the uniform reads.
    pub field: UniformField,
    /// Location in the current program.
    pub location: UniformLocation,
}

/// Program with the fragment shader it was linked from.
struct LinkedProgram<B: GraphicsBackend> {
    program: OwnedProgram<B>,
    _fragment: OwnedShader<B>,
}

/// Owns the GPU program for the active processor.
pub struct ShaderCache<B: GraphicsBackend> {
    backend: Rc<B>,
    language: GlslVersion,
    program: Option<LinkedProgram<B>>,
    passthrough: Option<LinkedProgram<B>>,
    vertex: Option<OwnedShader<B>>,
    fingerprint: Option<String>,
    uniforms: Vec<UniformDesc>,
    bindings: Option<Vec<DynamicPropertyBinding>>,
    rebuilds: usize,
}

impl<B: GraphicsBackend> ShaderCache<B> {
    /// Empty cache. `language` selects the dialect of the vertex and
    /// passthrough stages; processor stages use the processor's own.
    pub fn new(backend: Rc<B>, language: GlslVersion) -> Self {
        Self {
            backend,
            language,
            program: None,
            passthrough: None,
            vertex: None,
            fingerprint: None,
            uniforms: Vec::new(),
            bindings: None,
            rebuilds: 0,
        }
    }

    /// Processor program, if one has linked.
    pub fn program(&self) -> Option<ProgramId> {
        self.program.as_ref().map(|p| p.program.id())
    }

    /// Fingerprint of the processor behind [`program`](Self::program).
    pub fn fingerprint(&self) -> Option<&str> {
        self.fingerprint.as_deref()
    }

    /// Successful rebuilds so far.
    pub fn rebuilds(&self) -> usize {
        self.rebuilds
    }

    /// Make sure the program matches `processor`.
    ///
    /// Does nothing when a program exists, `force` is false and the
    /// fingerprints match. On failure the error is logged and returned and
    /// the previous program, fingerprint and bindings stay in place.
    pub fn ensure_program(&mut self, processor: &dyn CompiledProcessor, force: bool) -> GpuResult<ProgramStatus> {
        let fingerprint = processor.fingerprint();
        if !force && self.program.is_some() && self.fingerprint.as_deref() == Some(fingerprint) {
            return Ok(ProgramStatus::Unchanged);
        }

        let desc = processor.shader();
        let linked = self.link(&shaders::processor_fragment(desc)).inspect_err(|e| {
            error!(fingerprint, error = %e, "shader rebuild failed, keeping previous program");
        })?;

        self.program = Some(linked);
        self.uniforms = desc.uniforms.clone();
        self.bindings = None;
        self.fingerprint = Some(fingerprint.to_string());
        self.rebuilds += 1;
        debug!(fingerprint, uniforms = self.uniforms.len(), "shader program rebuilt");
        Ok(ProgramStatus::Rebuilt)
    }

    /// Program that shows the source image unchanged, linked on first use.
    pub fn ensure_passthrough(&mut self) -> GpuResult<ProgramId> {
        if let Some(p) = &self.passthrough {
            return Ok(p.program.id());
        }
        let linked = self.link(&shaders::passthrough_fragment(self.language))?;
        let id = linked.program.id();
        self.passthrough = Some(linked);
        Ok(id)
    }

    fn ensure_vertex(&mut self) -> GpuResult<ShaderId> {
        if let Some(v) = &self.vertex {
            return Ok(v.id());
        }
        let id = self.backend.create_shader(ShaderStage::Vertex, &shaders::vertex_source(self.language))?;
        self.vertex = Some(OwnedShader::new(self.backend.clone(), id));
        Ok(id)
    }

    fn link(&mut self, fragment_source: &str) -> GpuResult<LinkedProgram<B>> {
        let vertex = self.ensure_vertex()?;
        let backend = &self.backend;
        let fragment = OwnedShader::new(backend.clone(), backend.create_shader(ShaderStage::Fragment, fragment_source)?);
        let program = OwnedProgram::new(backend.clone(), backend.create_program()?);

        backend.attach_shader(program.id(), vertex);
        backend.attach_shader(program.id(), fragment.id());
        backend.bind_attrib_location(program.id(), POSITION_ATTRIB, "in_position");
        backend.bind_attrib_location(program.id(), TEX_COORD_ATTRIB, "in_texCoord");

        if let Err(e) = backend.link_program(program.id()) {
            backend.detach_shader(program.id(), vertex);
            backend.detach_shader(program.id(), fragment.id());
            return Err(e);
        }
        Ok(LinkedProgram { program, _fragment: fragment })
    }

    /// Uniform bindings of the current program, resolved on first call.
    pub fn bindings(&mut self) -> &[DynamicPropertyBinding] {
        let Some(linked) = &self.program else {
            return &[];
        };
        let program = linked.program.id();
        let backend = &self.backend;
        let uniforms = &self.uniforms;
        self.bindings.get_or_insert_with(|| {
            uniforms
                .iter()
                .filter_map(|u| match backend.uniform_location(program, &u.name) {
                    Some(location) => Some(DynamicPropertyBinding { name: u.name.clone(), field: u.field, location }),
                    None => {
                        debug!(uniform = %u.name, "dynamic uniform not active in program");
                        None
                    }
                })
                .collect()
        })
    }

    /// Push a new dynamic value into the current program.
    ///
    /// Makes the program current; never compiles and never touches textures.
    pub fn update_dynamic_property(&mut self, property: &DynamicProperty) {
        let Some(program) = self.program() else {
            return;
        };
        let backend = self.backend.clone();
        backend.use_program(Some(program));
        for binding in self.bindings() {
            match binding.field.value_of(property) {
                Some(UniformValue::Float(v)) => backend.set_uniform_f32(binding.location, v),
                Some(UniformValue::Vec3(v)) => backend.set_uniform_vec3(binding.location, v),
                None => {}
            }
        }
    }

    /// Drop every program and shader.
    pub fn clear(&mut self) {
        self.program = None;
        self.passthrough = None;
        self.vertex = None;
        self.fingerprint = None;
        self.uniforms.clear();
        self.bindings = None;
    }
}

impl<B: GraphicsBackend> DynamicTarget for ShaderCache<B> {
    fn set_dynamic(&mut self, property: &DynamicProperty) {
        self.update_dynamic_property(property);
    }
}

impl<B: GraphicsBackend> fmt::Debug for ShaderCache<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ShaderCache")
            .field("backend", &self.backend.name())
            .field("program", &self.program())
            .field("fingerprint", &self.fingerprint)
            .field("rebuilds", &self.rebuilds)
            .finish_non_exhaustive()
    }
}
