//! Headless backend.
//!
//! Records every call instead of talking to a driver, so the shader cache,
//! texture allocator and renderer can be exercised without a GL context.
//! Linking scans the attached sources for `uniform` declarations, so
//! uniform lookups behave like a real driver for declared names.
//!
//! Failures can be injected to test fallback paths.

use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap, HashSet};

use super::{
    FilterMode, GraphicsBackend, ProgramId, QuadId, ShaderId, ShaderStage, TextureFormat,
    TextureId, TextureTarget, TextureUpload, UniformLocation,
};
use crate::error::{GpuError, GpuResult};

/// Call counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HeadlessStats {
    /// Successful shader compiles of any stage.
    pub shader_compiles: usize,
    /// Successful fragment shader compiles.
    pub fragment_compiles: usize,
    /// Successful program links.
    pub program_links: usize,
    /// Textures created.
    pub textures_created: usize,
    /// Textures deleted.
    pub textures_deleted: usize,
    /// Texture image respecifications.
    pub texture_updates: usize,
    /// Uniform writes.
    pub uniform_sets: usize,
    /// Draw calls.
    pub draws: usize,
}

/// A live texture as the backend saw it.
#[derive(Debug, Clone, PartialEq)]
pub struct TextureRecord {
    /// Dimensionality.
    pub target: TextureTarget,
    /// Unit active at upload.
    pub unit: u32,
    /// Width.
    pub width: u32,
    /// Height.
    pub height: u32,
    /// Depth.
    pub depth: u32,
    /// Storage format.
    pub format: TextureFormat,
    /// Filter.
    pub filter: FilterMode,
    /// Uploaded floats.
    pub len: usize,
}

/// Last value written to a uniform.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum UniformRecord {
    /// `float`.
    F32(f32),
    /// `vec3`.
    Vec3([f32; 3]),
    /// `int` or sampler.
    I32(i32),
    /// `mat4`.
    Mat4([f32; 16]),
}

#[derive(Debug, Default)]
struct ProgramRecord {
    attached: Vec<u32>,
    attribs: Vec<(u32, String)>,
    linked: bool,
    uniforms: Vec<String>,
    values: HashMap<u32, UniformRecord>,
}

#[derive(Debug, Default)]
struct State {
    next_id: u32,
    stats: HeadlessStats,
    shaders: HashMap<u32, (ShaderStage, String)>,
    programs: HashMap<u32, ProgramRecord>,
    textures: HashMap<u32, TextureRecord>,
    quads: HashSet<u32>,
    current: Option<u32>,
    bound: BTreeMap<u32, u32>,
    clear_color: [f32; 4],
    viewport: (i32, i32, u32, u32),
    fail_fragment: bool,
    fail_link: bool,
    texture_budget: Option<usize>,
}

impl State {
    fn alloc_id(&mut self) -> u32 {
        self.next_id += 1;
        self.next_id
    }

    fn set_uniform(&mut self, location: UniformLocation, value: UniformRecord) {
        let Some(program) = self.current.and_then(|id| self.programs.get_mut(&id)) else {
            return;
        };
        program.values.insert(location.0, value);
        self.stats.uniform_sets += 1;
    }
}

/// Names declared with `uniform` in GLSL source, one declaration per line.
fn declared_uniforms(source: &str) -> impl Iterator<Item = &str> {
    source.lines().filter_map(|line| {
        let decl = line.trim().strip_prefix("uniform ")?.split(';').next()?;
        let name = decl.split_whitespace().last()?;
        name.split('[').next()
    })
}

/// Backend that records calls.
#[derive(Debug, Default)]
pub struct HeadlessBackend {
    state: RefCell<State>,
}

impl HeadlessBackend {
    /// Creates a backend with no objects.
    pub fn new() -> Self {
        Self::default()
    }

    // ------------------------------------------------------------------------
    // Failure injection
    // ------------------------------------------------------------------------

    /// Make every fragment shader compile fail while set.
    pub fn fail_fragment_compiles(&self, fail: bool) {
        self.state.borrow_mut().fail_fragment = fail;
    }

    /// Make every program link fail while set.
    pub fn fail_links(&self, fail: bool) {
        self.state.borrow_mut().fail_link = fail;
    }

    /// Allow only `budget` more texture creations; `None` removes the limit.
    pub fn set_texture_budget(&self, budget: Option<usize>) {
        self.state.borrow_mut().texture_budget = budget;
    }

    // ------------------------------------------------------------------------
    // Inspection
    // ------------------------------------------------------------------------

    /// Call counters.
    pub fn stats(&self) -> HeadlessStats {
        self.state.borrow().stats
    }

    /// Zero the call counters.
    pub fn reset_stats(&self) {
        self.state.borrow_mut().stats = HeadlessStats::default();
    }

    /// Shaders not yet deleted.
    pub fn live_shaders(&self) -> usize {
        self.state.borrow().shaders.len()
    }

    /// Programs not yet deleted.
    pub fn live_programs(&self) -> usize {
        self.state.borrow().programs.len()
    }

    /// Textures not yet deleted.
    pub fn live_textures(&self) -> usize {
        self.state.borrow().textures.len()
    }

    /// Quads not yet deleted.
    pub fn live_quads(&self) -> usize {
        self.state.borrow().quads.len()
    }

    /// Record of a live texture.
    pub fn texture(&self, texture: TextureId) -> Option<TextureRecord> {
        self.state.borrow().textures.get(&texture.0).cloned()
    }

    /// Current program.
    pub fn current_program(&self) -> Option<ProgramId> {
        self.state.borrow().current.map(ProgramId)
    }

    /// Texture bound to a unit.
    pub fn bound_texture(&self, unit: u32) -> Option<TextureId> {
        self.state.borrow().bound.get(&unit).copied().map(TextureId)
    }

    /// Last value written to a uniform of a program.
    pub fn uniform(&self, program: ProgramId, name: &str) -> Option<UniformRecord> {
        let state = self.state.borrow();
        let record = state.programs.get(&program.0)?;
        let location = record.uniforms.iter().position(|u| u == name)?;
        record.values.get(&(location as u32)).copied()
    }

    /// Source of the shader of `stage` attached to a program.
    pub fn attached_source(&self, program: ProgramId, stage: ShaderStage) -> Option<String> {
        let state = self.state.borrow();
        let record = state.programs.get(&program.0)?;
        record.attached.iter().find_map(|id| match state.shaders.get(id) {
            Some((s, source)) if *s == stage => Some(source.clone()),
            _ => None,
        })
    }

    /// Attribute bindings of a program.
    pub fn attrib_bindings(&self, program: ProgramId) -> Vec<(u32, String)> {
        self.state
            .borrow()
            .programs
            .get(&program.0)
            .map(|p| p.attribs.clone())
            .unwrap_or_default()
    }

    /// Last clear color.
    pub fn clear_color(&self) -> [f32; 4] {
        self.state.borrow().clear_color
    }

    /// Last viewport.
    pub fn last_viewport(&self) -> (i32, i32, u32, u32) {
        self.state.borrow().viewport
    }
}

impl GraphicsBackend for HeadlessBackend {
    fn name(&self) -> &'static str {
        "headless"
    }

    fn create_shader(&self, stage: ShaderStage, source: &str) -> GpuResult<ShaderId> {
        let mut state = self.state.borrow_mut();
        if stage == ShaderStage::Fragment && state.fail_fragment {
            return Err(GpuError::ShaderCompile { stage, log: "injected compile failure".into() });
        }
        if !source.trim_start().starts_with("#version") {
            return Err(GpuError::ShaderCompile { stage, log: "missing #version directive".into() });
        }
        let id = state.alloc_id();
        state.shaders.insert(id, (stage, source.to_string()));
        state.stats.shader_compiles += 1;
        if stage == ShaderStage::Fragment {
            state.stats.fragment_compiles += 1;
        }
        Ok(ShaderId(id))
    }

    fn delete_shader(&self, shader: ShaderId) {
        self.state.borrow_mut().shaders.remove(&shader.0);
    }

    fn create_program(&self) -> GpuResult<ProgramId> {
        let mut state = self.state.borrow_mut();
        let id = state.alloc_id();
        state.programs.insert(id, ProgramRecord::default());
        Ok(ProgramId(id))
    }

    fn attach_shader(&self, program: ProgramId, shader: ShaderId) {
        if let Some(p) = self.state.borrow_mut().programs.get_mut(&program.0) {
            p.attached.push(shader.0);
        }
    }

    fn detach_shader(&self, program: ProgramId, shader: ShaderId) {
        if let Some(p) = self.state.borrow_mut().programs.get_mut(&program.0) {
            p.attached.retain(|s| *s != shader.0);
        }
    }

    fn bind_attrib_location(&self, program: ProgramId, index: u32, name: &str) {
        if let Some(p) = self.state.borrow_mut().programs.get_mut(&program.0) {
            p.attribs.retain(|(i, _)| *i != index);
            p.attribs.push((index, name.to_string()));
        }
    }

    fn link_program(&self, program: ProgramId) -> GpuResult<()> {
        let mut guard = self.state.borrow_mut();
        let state = &mut *guard;
        let record = state
            .programs
            .get_mut(&program.0)
            .ok_or_else(|| GpuError::ProgramLink { log: format!("unknown program {}", program.0) })?;

        record.linked = false;
        record.uniforms.clear();
        record.values.clear();
        if state.fail_link {
            return Err(GpuError::ProgramLink { log: "injected link failure".into() });
        }

        let sources: Vec<&(ShaderStage, String)> =
            record.attached.iter().filter_map(|id| state.shaders.get(id)).collect();
        for stage in [ShaderStage::Vertex, ShaderStage::Fragment] {
            if !sources.iter().any(|(s, _)| *s == stage) {
                return Err(GpuError::ProgramLink { log: format!("no {} shader attached", stage) });
            }
        }

        for (_, source) in &sources {
            for name in declared_uniforms(source) {
                if !record.uniforms.iter().any(|u| u == name) {
                    record.uniforms.push(name.to_string());
                }
            }
        }
        record.linked = true;
        state.stats.program_links += 1;
        Ok(())
    }

    fn delete_program(&self, program: ProgramId) {
        let mut state = self.state.borrow_mut();
        state.programs.remove(&program.0);
        if state.current == Some(program.0) {
            state.current = None;
        }
    }

    fn use_program(&self, program: Option<ProgramId>) {
        self.state.borrow_mut().current = program.map(|p| p.0);
    }

    fn uniform_location(&self, program: ProgramId, name: &str) -> Option<UniformLocation> {
        let state = self.state.borrow();
        let record = state.programs.get(&program.0).filter(|p| p.linked)?;
        record.uniforms.iter().position(|u| u == name).map(|i| UniformLocation(i as u32))
    }

    fn set_uniform_f32(&self, location: UniformLocation, value: f32) {
        self.state.borrow_mut().set_uniform(location, UniformRecord::F32(value));
    }

    fn set_uniform_vec3(&self, location: UniformLocation, value: [f32; 3]) {
        self.state.borrow_mut().set_uniform(location, UniformRecord::Vec3(value));
    }

    fn set_uniform_i32(&self, location: UniformLocation, value: i32) {
        self.state.borrow_mut().set_uniform(location, UniformRecord::I32(value));
    }

    fn set_uniform_mat4(&self, location: UniformLocation, value: &[f32; 16]) {
        self.state.borrow_mut().set_uniform(location, UniformRecord::Mat4(*value));
    }

    fn create_texture(&self, upload: &TextureUpload<'_>) -> GpuResult<TextureId> {
        let mut state = self.state.borrow_mut();
        if let Some(budget) = state.texture_budget.as_mut() {
            if *budget == 0 {
                return Err(GpuError::Backend { reason: "out of texture memory".into() });
            }
            *budget -= 1;
        }
        let record = texture_record(upload)?;
        let id = state.alloc_id();
        state.textures.insert(id, record);
        state.bound.insert(upload.unit, id);
        state.stats.textures_created += 1;
        Ok(TextureId(id))
    }

    fn update_texture(&self, texture: TextureId, upload: &TextureUpload<'_>) -> GpuResult<()> {
        let mut state = self.state.borrow_mut();
        let record = texture_record(upload)?;
        let slot = state
            .textures
            .get_mut(&texture.0)
            .ok_or_else(|| GpuError::Backend { reason: format!("unknown texture {}", texture.0) })?;
        *slot = record;
        state.bound.insert(upload.unit, texture.0);
        state.stats.texture_updates += 1;
        Ok(())
    }

    fn bind_texture(&self, unit: u32, _target: TextureTarget, texture: TextureId) {
        self.state.borrow_mut().bound.insert(unit, texture.0);
    }

    fn delete_texture(&self, texture: TextureId) {
        let mut state = self.state.borrow_mut();
        if state.textures.remove(&texture.0).is_some() {
            state.stats.textures_deleted += 1;
        }
        state.bound.retain(|_, t| *t != texture.0);
    }

    fn create_quad(&self, positions: &[f32], tex_coords: &[f32], indices: &[u32]) -> GpuResult<QuadId> {
        if positions.len() / 3 != tex_coords.len() / 2 || indices.is_empty() {
            return Err(GpuError::Backend { reason: "mismatched quad buffers".into() });
        }
        let mut state = self.state.borrow_mut();
        let id = state.alloc_id();
        state.quads.insert(id);
        Ok(QuadId(id))
    }

    fn draw_quad(&self, quad: QuadId, _index_count: u32) {
        let mut state = self.state.borrow_mut();
        if state.quads.contains(&quad.0) {
            state.stats.draws += 1;
        }
    }

    fn delete_quad(&self, quad: QuadId) {
        self.state.borrow_mut().quads.remove(&quad.0);
    }

    fn clear(&self, color: [f32; 4]) {
        self.state.borrow_mut().clear_color = color;
    }

    fn viewport(&self, x: i32, y: i32, width: u32, height: u32) {
        self.state.borrow_mut().viewport = (x, y, width, height);
    }
}

fn texture_record(upload: &TextureUpload<'_>) -> GpuResult<TextureRecord> {
    if upload.width == 0 || upload.height == 0 || upload.depth == 0 {
        return Err(GpuError::Backend { reason: "zero-sized texture".into() });
    }
    if upload.data.len() != upload.expected_len() {
        return Err(GpuError::Backend {
            reason: format!("expected {} floats, got {}", upload.expected_len(), upload.data.len()),
        });
    }
    Ok(TextureRecord {
        target: upload.target,
        unit: upload.unit,
        width: upload.width,
        height: upload.height,
        depth: upload.depth,
        format: upload.format,
        filter: upload.filter,
        len: upload.data.len(),
    })
}
