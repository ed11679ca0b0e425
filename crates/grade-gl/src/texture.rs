//! Lookup texture allocation.
//!
//! A processor declares its lookup tables in its [`GpuShaderDesc`]. The
//! allocator turns them into textures on consecutive units starting at
//! [`FIRST_LUT_UNIT`] (unit 0 holds the source image), 3D tables first.
//!
//! Allocation is staged: [`TextureAllocator::prepare`] builds a complete
//! [`TextureSet`] and [`TextureAllocator::commit`] swaps it in. If any
//! table fails, the partial set is dropped and the committed set stays.

use std::rc::Rc;

use tracing::{debug, warn};

use grade_core::{CompiledProcessor, GpuShaderDesc, TextureChannels};

use crate::backend::{
    FilterMode, GraphicsBackend, ProgramId, TextureFormat, TextureTarget, TextureUpload,
};
use crate::error::{GpuError, GpuResult};
use crate::resource::OwnedTexture;

/// First unit handed to lookup textures.
pub const FIRST_LUT_UNIT: u32 = 1;

/// A lookup texture bound to a unit.
#[derive(Debug)]
pub struct AllocatedTexture<B: GraphicsBackend> {
    texture: OwnedTexture<B>,
    name: String,
    sampler_name: String,
    target: TextureTarget,
    unit: u32,
    format: TextureFormat,
}

impl<B: GraphicsBackend> AllocatedTexture<B> {
    /// Backend handle.
    pub fn id(&self) -> crate::backend::TextureId {
        self.texture.id()
    }

    /// Texture name from the shader description.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Sampler uniform fed with [`unit`](Self::unit).
    pub fn sampler_name(&self) -> &str {
        &self.sampler_name
    }

    /// Dimensionality.
    pub fn target(&self) -> TextureTarget {
        self.target
    }

    /// Texture unit.
    pub fn unit(&self) -> u32 {
        self.unit
    }

    /// Storage format.
    pub fn format(&self) -> TextureFormat {
        self.format
    }
}

/// Textures for one processor, replaced as a whole.
#[derive(Debug)]
pub struct TextureSet<B: GraphicsBackend> {
    textures: Vec<AllocatedTexture<B>>,
}

impl<B: GraphicsBackend> TextureSet<B> {
    fn empty() -> Self {
        Self { textures: Vec::new() }
    }

    /// Number of textures.
    pub fn len(&self) -> usize {
        self.textures.len()
    }

    /// True if the set holds no textures.
    pub fn is_empty(&self) -> bool {
        self.textures.is_empty()
    }

    /// Textures in unit order.
    pub fn iter(&self) -> impl Iterator<Item = &AllocatedTexture<B>> {
        self.textures.iter()
    }

    /// Texture by name.
    pub fn get(&self, name: &str) -> Option<&AllocatedTexture<B>> {
        self.textures.iter().find(|t| t.name == name)
    }
}

/// Owns the lookup textures of the active processor.
#[derive(Debug)]
pub struct TextureAllocator<B: GraphicsBackend> {
    backend: Rc<B>,
    current: TextureSet<B>,
}

impl<B: GraphicsBackend> TextureAllocator<B> {
    /// Allocator with no textures.
    pub fn new(backend: Rc<B>) -> Self {
        Self { backend, current: TextureSet::empty() }
    }

    /// Committed textures.
    pub fn textures(&self) -> &TextureSet<B> {
        &self.current
    }

    /// Allocate every table in `desc` without touching the committed set.
    pub fn prepare(&self, desc: &GpuShaderDesc) -> GpuResult<TextureSet<B>> {
        let mut set = TextureSet::empty();
        let mut unit = FIRST_LUT_UNIT;

        for lut in &desc.textures_3d {
            let upload = TextureUpload {
                target: TextureTarget::Texture3D,
                unit,
                width: lut.edge_len,
                height: lut.edge_len,
                depth: lut.edge_len,
                format: TextureFormat::Rgb32F,
                filter: FilterMode::from(lut.interpolation),
                data: &lut.values,
            };
            set.textures.push(self.allocate(&lut.texture_name, &lut.sampler_name, &upload)?);
            unit += 1;
        }

        for lut in &desc.textures {
            let format = match lut.channels {
                TextureChannels::Red => TextureFormat::R32F,
                TextureChannels::Rgb => TextureFormat::Rgb32F,
            };
            let target = if lut.is_1d() { TextureTarget::Texture1D } else { TextureTarget::Texture2D };
            let upload = TextureUpload {
                target,
                unit,
                width: lut.width,
                height: lut.height,
                depth: 1,
                format,
                filter: FilterMode::from(lut.interpolation),
                data: &lut.values,
            };
            set.textures.push(self.allocate(&lut.texture_name, &lut.sampler_name, &upload)?);
            unit += 1;
        }

        Ok(set)
    }

    fn allocate(&self, name: &str, sampler: &str, upload: &TextureUpload<'_>) -> GpuResult<AllocatedTexture<B>> {
        let id = self.backend.create_texture(upload).map_err(|e| {
            warn!(texture = name, unit = upload.unit, error = %e, "lookup texture allocation failed");
            GpuError::TextureAllocation { name: name.to_string(), reason: e.to_string() }
        })?;
        Ok(AllocatedTexture {
            texture: OwnedTexture::new(self.backend.clone(), id),
            name: name.to_string(),
            sampler_name: sampler.to_string(),
            target: upload.target,
            unit: upload.unit,
            format: upload.format,
        })
    }

    /// Replace the committed set; the previous textures are deleted.
    pub fn commit(&mut self, set: TextureSet<B>) {
        debug!(released = self.current.len(), allocated = set.len(), "lookup textures replaced");
        self.current = set;
    }

    /// Allocate and commit the tables of `processor`. Returns the count.
    pub fn ensure_textures(&mut self, processor: &dyn CompiledProcessor) -> GpuResult<usize> {
        let set = self.prepare(processor.shader())?;
        let count = set.len();
        self.commit(set);
        Ok(count)
    }

    /// Bind every texture to its unit and point its sampler at it.
    ///
    /// `program` must be current.
    pub fn bind_all(&self, program: ProgramId) {
        for tex in self.current.iter() {
            self.backend.bind_texture(tex.unit, tex.target, tex.id());
            match self.backend.uniform_location(program, &tex.sampler_name) {
                Some(location) => self.backend.set_uniform_i32(location, tex.unit as i32),
                None => debug!(sampler = %tex.sampler_name, "sampler not active in program"),
            }
        }
    }

    /// Delete every committed texture.
    pub fn clear(&mut self) {
        self.current = TextureSet::empty();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{HeadlessBackend, ShaderStage, UniformRecord};
    use grade_core::{Interpolation, Lut3dTexture, LutTexture};

    fn lut1d(name: &str, width: u32, height: u32, channels: TextureChannels) -> LutTexture {
        LutTexture {
            texture_name: name.into(),
            sampler_name: format!("{}Sampler", name),
            width,
            height,
            channels,
            interpolation: Interpolation::Linear,
            values: vec![0.5; (width * height) as usize * channels.count()],
        }
    }

    fn desc() -> GpuShaderDesc {
        GpuShaderDesc {
            textures: vec![
                lut1d("lut1d_0", 256, 1, TextureChannels::Rgb),
                lut1d("lut1d_1", 1024, 4, TextureChannels::Red),
            ],
            textures_3d: vec![Lut3dTexture {
                texture_name: "lut3d_2".into(),
                sampler_name: "lut3d_2Sampler".into(),
                edge_len: 4,
                interpolation: Interpolation::Nearest,
                values: vec![0.0; 4 * 4 * 4 * 3],
            }],
            ..Default::default()
        }
    }

    #[test]
    fn units_and_formats() {
        let backend = Rc::new(HeadlessBackend::new());
        let alloc = TextureAllocator::new(backend.clone());
        let set = alloc.prepare(&desc()).unwrap();

        let summary: Vec<_> = set.iter().map(|t| (t.name(), t.target(), t.unit(), t.format())).collect();
        assert_eq!(
            summary,
            vec![
                ("lut3d_2", TextureTarget::Texture3D, 1, TextureFormat::Rgb32F),
                ("lut1d_0", TextureTarget::Texture1D, 2, TextureFormat::Rgb32F),
                ("lut1d_1", TextureTarget::Texture2D, 3, TextureFormat::R32F),
            ]
        );
        let record = backend.texture(set.get("lut3d_2").unwrap().id()).unwrap();
        assert_eq!(record.filter, FilterMode::Nearest);
        assert_eq!((record.width, record.height, record.depth), (4, 4, 4));
    }

    #[test]
    fn commit_releases_previous_set() {
        let backend = Rc::new(HeadlessBackend::new());
        let mut alloc = TextureAllocator::new(backend.clone());
        let first = alloc.prepare(&desc()).unwrap();
        alloc.commit(first);
        assert_eq!(backend.live_textures(), 3);

        let second = alloc.prepare(&desc()).unwrap();
        assert_eq!(backend.live_textures(), 6);
        alloc.commit(second);
        assert_eq!(backend.live_textures(), 3);
        assert_eq!(backend.stats().textures_deleted, 3);

        alloc.clear();
        assert_eq!(backend.live_textures(), 0);
    }

    #[test]
    fn failure_keeps_committed_set() {
        let backend = Rc::new(HeadlessBackend::new());
        let mut alloc = TextureAllocator::new(backend.clone());
        let set = alloc.prepare(&desc()).unwrap();
        alloc.commit(set);
        let before: Vec<_> = alloc.textures().iter().map(|t| t.id()).collect();

        backend.set_texture_budget(Some(2));
        let err = alloc.prepare(&desc()).unwrap_err();
        assert!(matches!(err, GpuError::TextureAllocation { ref name, .. } if name == "lut1d_1"));
        assert_eq!(backend.live_textures(), 3);

        let after: Vec<_> = alloc.textures().iter().map(|t| t.id()).collect();
        assert_eq!(before, after);
    }

    #[test]
    fn bind_all_sets_samplers() {
        let backend = Rc::new(HeadlessBackend::new());
        let mut alloc = TextureAllocator::new(backend.clone());
        let set = alloc.prepare(&desc()).unwrap();
        alloc.commit(set);

        let vert = backend
            .create_shader(ShaderStage::Vertex, "#version 400 core\nvoid main() {}\n")
            .unwrap();
        let frag = backend
            .create_shader(
                ShaderStage::Fragment,
                "#version 400 core\nuniform sampler3D lut3d_2Sampler;\nuniform sampler2D lut1d_1Sampler;\nvoid main() {}\n",
            )
            .unwrap();
        let program = backend.create_program().unwrap();
        backend.attach_shader(program, vert);
        backend.attach_shader(program, frag);
        backend.link_program(program).unwrap();
        backend.use_program(Some(program));

        alloc.bind_all(program);
        assert_eq!(backend.uniform(program, "lut3d_2Sampler"), Some(UniformRecord::I32(1)));
        assert_eq!(backend.uniform(program, "lut1d_1Sampler"), Some(UniformRecord::I32(3)));
        let lut = alloc.textures().get("lut1d_0").unwrap();
        assert_eq!(backend.bound_texture(2), Some(lut.id()));
    }

    #[test]
    fn ensure_textures_follows_processor() {
        use grade_graph::TransformGraph;
        use grade_ocio::{Engine, builtin};
        use std::sync::Arc;

        let compile = |looks: Option<&str>| {
            let mut graph = TransformGraph::builder(Arc::new(Engine::new(builtin::studio())))
                .input_encoding("scene_linear")
                .display("sRGB")
                .view("Filmic")
                .build();
            graph.set_target_looks(looks.map(str::to_string));
            graph.compile().unwrap()
        };

        let backend = Rc::new(HeadlessBackend::new());
        let mut alloc = TextureAllocator::new(backend.clone());
        assert_eq!(alloc.ensure_textures(&*compile(Some("+Punchy, Tint"))).unwrap(), 3);
        assert_eq!(backend.live_textures(), 3);

        assert_eq!(alloc.ensure_textures(&*compile(None)).unwrap(), 1);
        assert_eq!(backend.live_textures(), 1);
        assert_eq!(alloc.textures().iter().next().map(|t| t.unit()), Some(FIRST_LUT_UNIT));
    }
}
