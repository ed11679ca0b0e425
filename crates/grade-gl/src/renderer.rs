//! Per-frame orchestration.
//!
//! [`GpuRenderer`] owns a [`TransformGraph`], the source image texture, the
//! quad, a [`ShaderCache`] and a [`TextureAllocator`]. Loading an image
//! uploads it and refreshes the program; program and lookup textures are
//! replaced together and only when the processor fingerprint changes.
//! Parameter edits only raise a redraw flag; the next [`draw`] pushes the
//! current values as uniforms.
//!
//! [`draw`]: GpuRenderer::draw

use std::cell::Cell;
use std::fmt;
use std::rc::Rc;

use glam::{Mat4, Vec3};
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use grade_core::{GlslVersion, GradingParameters};
use grade_graph::{GraphShape, OpGraph, TransformGraph};

use crate::backend::{FilterMode, GraphicsBackend, TextureFormat, TextureTarget, TextureUpload};
use crate::error::{GpuError, GpuResult};
use crate::resource::{OwnedQuad, OwnedTexture};
use crate::shader_cache::ShaderCache;
use crate::shaders::{IMAGE_SAMPLER, MVP_UNIFORM};
use crate::texture::TextureAllocator;

/// Unit the source image is bound to.
pub const SOURCE_UNIT: u32 = 0;

const QUAD_POSITIONS: [f32; 12] = [
    -0.5, 0.5, 0.0, //
    0.5, 0.5, 0.0, //
    0.5, -0.5, 0.0, //
    -0.5, -0.5, 0.0,
];
const QUAD_TEX_COORDS: [f32; 8] = [0.0, 1.0, 1.0, 1.0, 1.0, 0.0, 0.0, 0.0];
const QUAD_INDICES: [u32; 6] = [0, 1, 2, 0, 2, 3];

// ============================================================================
// Options
// ============================================================================

/// Renderer settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RendererOptions {
    /// Color the frame is cleared to before drawing.
    pub clear_color: [f32; 4],
    /// Initial viewport size in pixels.
    pub viewport: [u32; 2],
    /// Dialect of the fixed vertex and passthrough stages.
    pub language: GlslVersion,
}

impl Default for RendererOptions {
    fn default() -> Self {
        Self {
            clear_color: [0.0, 0.0, 0.0, 1.0],
            viewport: [1280, 720],
            language: GlslVersion::Glsl400,
        }
    }
}

impl RendererOptions {
    /// Sets the clear color.
    pub fn with_clear_color(mut self, color: [f32; 4]) -> Self {
        self.clear_color = color;
        self
    }

    /// Sets the initial viewport.
    pub fn with_viewport(mut self, width: u32, height: u32) -> Self {
        self.viewport = [width, height];
        self
    }

    /// Sets the GLSL dialect of the fixed stages.
    pub fn with_language(mut self, language: GlslVersion) -> Self {
        self.language = language;
        self
    }
}

// ============================================================================
// Image
// ============================================================================

/// Borrowed 32-bit float image, RGB or RGBA interleaved, rows bottom-up.
#[derive(Debug, Clone, Copy)]
pub struct ImageRef<'a> {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// Floats per pixel, 3 or 4.
    pub channels: usize,
    /// `width * height * channels` floats.
    pub data: &'a [f32],
}

impl<'a> ImageRef<'a> {
    /// Wrap pixel data.
    pub fn new(width: u32, height: u32, channels: usize, data: &'a [f32]) -> Self {
        Self { width, height, channels, data }
    }

    fn format(&self) -> GpuResult<TextureFormat> {
        let invalid = |reason: String| GpuError::InvalidImage { reason };
        if self.width == 0 || self.height == 0 {
            return Err(invalid(format!("empty image {}x{}", self.width, self.height)));
        }
        let format = match self.channels {
            3 | 4 => TextureFormat::for_channels(self.channels),
            _ => None,
        }
        .ok_or_else(|| invalid(format!("{} channels, expected 3 or 4", self.channels)))?;
        let expected = self.width as usize * self.height as usize * self.channels;
        if self.data.len() != expected {
            return Err(invalid(format!(
                "{}x{}x{} needs {} floats, got {}",
                self.width,
                self.height,
                self.channels,
                expected,
                self.data.len()
            )));
        }
        Ok(format)
    }
}

// ============================================================================
// Renderer
// ============================================================================

/// Draws an image through a grading graph.
///
/// # Example
///
/// ```
/// use std::rc::Rc;
/// use std::sync::Arc;
/// use grade_gl::{GpuRenderer, HeadlessBackend, ImageRef, RendererOptions};
/// use grade_graph::TransformGraph;
/// use grade_ocio::{Engine, builtin};
///
/// let graph = TransformGraph::builder(Arc::new(Engine::new(builtin::studio())))
///     .input_encoding("sRGB Encoded")
///     .display("sRGB")
///     .view("Filmic")
///     .build();
/// let backend = Rc::new(HeadlessBackend::new());
/// let mut renderer = GpuRenderer::new(backend.clone(), graph, RendererOptions::default());
///
/// let pixels = vec![0.5_f32; 4 * 4 * 3];
/// renderer.load(&ImageRef::new(4, 4, 3, &pixels)).unwrap();
/// renderer.draw();
/// assert_eq!(backend.stats().draws, 1);
///
/// renderer.grading_mut().set_exposure(1.0);
/// assert!(renderer.needs_redraw());
/// ```
pub struct GpuRenderer<B: GraphicsBackend> {
    backend: Rc<B>,
    graph: TransformGraph,
    options: RendererOptions,
    shaders: ShaderCache<B>,
    textures: TextureAllocator<B>,
    source: Option<OwnedTexture<B>>,
    quad: Option<OwnedQuad<B>>,
    image_size: Option<(u32, u32)>,
    model_view: Mat4,
    projection: Mat4,
    shape: Option<GraphShape>,
    redraw: Rc<Cell<bool>>,
}

impl<B: GraphicsBackend> GpuRenderer<B> {
    /// Renderer over `graph`. Nothing is created on the backend until the
    /// first [`load`](Self::load).
    pub fn new(backend: Rc<B>, mut graph: TransformGraph, options: RendererOptions) -> Self {
        let redraw = Rc::new(Cell::new(false));
        let flag = redraw.clone();
        graph.grading_mut().subscribe(move |_| flag.set(true));

        let shaders = ShaderCache::new(backend.clone(), options.language);
        let textures = TextureAllocator::new(backend.clone());
        let projection = projection(options.viewport);
        Self {
            backend,
            graph,
            options,
            shaders,
            textures,
            source: None,
            quad: None,
            image_size: None,
            model_view: Mat4::IDENTITY,
            projection,
            shape: None,
            redraw,
        }
    }

    /// The graph.
    pub fn graph(&self) -> &TransformGraph {
        &self.graph
    }

    /// Mutable graph. Structural edits are picked up on the next draw.
    pub fn graph_mut(&mut self) -> &mut TransformGraph {
        self.redraw.set(true);
        &mut self.graph
    }

    /// Grading parameters of the graph.
    pub fn grading_mut(&mut self) -> &mut GradingParameters {
        self.graph.grading_mut()
    }

    /// Settings.
    pub fn options(&self) -> &RendererOptions {
        &self.options
    }

    /// Program cache.
    pub fn shader_cache(&self) -> &ShaderCache<B> {
        &self.shaders
    }

    /// Lookup texture allocator.
    pub fn textures(&self) -> &TextureAllocator<B> {
        &self.textures
    }

    /// True if something changed since the last draw.
    pub fn needs_redraw(&self) -> bool {
        self.redraw.get()
    }

    /// Upload `image` and refresh the program.
    ///
    /// Only an invalid image or a failed upload is an error. Graph, shader
    /// and texture failures are logged and leave the previous program in
    /// place; the next load retries.
    pub fn load(&mut self, image: &ImageRef<'_>) -> GpuResult<()> {
        let format = image.format()?;
        let upload = TextureUpload {
            target: TextureTarget::Texture2D,
            unit: SOURCE_UNIT,
            width: image.width,
            height: image.height,
            depth: 1,
            format,
            filter: FilterMode::Linear,
            data: image.data,
        };
        match &self.source {
            Some(texture) => self.backend.update_texture(texture.id(), &upload)?,
            None => {
                let id = self.backend.create_texture(&upload)?;
                self.source = Some(OwnedTexture::new(self.backend.clone(), id));
            }
        }
        if self.quad.is_none() {
            let id = self.backend.create_quad(&QUAD_POSITIONS, &QUAD_TEX_COORDS, &QUAD_INDICES)?;
            self.quad = Some(OwnedQuad::new(self.backend.clone(), id));
        }

        if self.image_size != Some((image.width, image.height)) {
            self.image_size = Some((image.width, image.height));
            self.update_model_view();
        }
        debug!(width = image.width, height = image.height, channels = image.channels, "image loaded");

        self.refresh(false);
        self.redraw.set(true);
        Ok(())
    }

    /// Compile the graph and rebuild program and textures if the
    /// fingerprint changed or `force` is set. Returns true on rebuild.
    ///
    /// The graph shape is recorded only once the GPU state matches it, so
    /// [`draw`](Self::draw) retries a failed rebuild.
    pub fn refresh(&mut self, force: bool) -> bool {
        let shape = self.graph.shape();
        let processor = match self.graph.compile() {
            Ok(p) => p,
            Err(e) => {
                error!(error = %e, "graph compile failed, keeping previous program");
                return false;
            }
        };

        let unchanged = self.shaders.program().is_some() && self.shaders.fingerprint() == Some(processor.fingerprint());
        if unchanged && !force {
            debug!("processor unchanged");
            self.shape = Some(shape);
            return false;
        }

        let staged = match self.textures.prepare(processor.shader()) {
            Ok(set) => set,
            Err(e) => {
                error!(error = %e, "lookup texture allocation failed, keeping previous program");
                return false;
            }
        };
        if self.shaders.ensure_program(&*processor, true).is_err() {
            return false;
        }
        self.textures.commit(staged);
        self.shape = Some(shape);

        for property in self.graph.grading().dynamic_properties() {
            self.shaders.update_dynamic_property(&property);
        }
        self.redraw.set(true);
        true
    }

    /// Resize the viewport.
    pub fn set_viewport(&mut self, width: u32, height: u32) {
        self.options.viewport = [width, height];
        self.projection = projection(self.options.viewport);
        self.update_model_view();
        self.redraw.set(true);
    }

    /// Model-view-projection matrix for the current image and viewport.
    pub fn mvp(&self) -> Mat4 {
        self.projection * self.model_view
    }

    fn update_model_view(&mut self) {
        let Some((w, h)) = self.image_size else {
            self.model_view = Mat4::IDENTITY;
            return;
        };
        let [vw, vh] = self.options.viewport;
        let (w, h) = (w as f32, h as f32);
        let fit = (vw.max(1) as f32 / w).min(vh.max(1) as f32 / h);
        self.model_view = Mat4::from_scale(Vec3::new(w * fit, h * fit, 1.0));
    }

    /// Draw a frame.
    ///
    /// Recompiles first if the graph's shape changed since the last
    /// refresh. Falls back to the passthrough program when no processor
    /// program has linked.
    pub fn draw(&mut self) {
        if self.source.is_some() && self.shape.as_ref() != Some(&self.graph.shape()) {
            self.refresh(false);
        }

        let backend = self.backend.clone();
        let [vw, vh] = self.options.viewport;
        backend.viewport(0, 0, vw, vh);
        backend.clear(self.options.clear_color);

        let (Some(source), Some(quad)) = (self.source.as_ref(), self.quad.as_ref()) else {
            self.redraw.set(false);
            return;
        };

        let program = match self.shaders.program() {
            Some(program) => {
                backend.use_program(Some(program));
                self.textures.bind_all(program);
                self.graph.update_dynamic(&mut self.shaders);
                program
            }
            None => match self.shaders.ensure_passthrough() {
                Ok(program) => {
                    backend.use_program(Some(program));
                    program
                }
                Err(e) => {
                    error!(error = %e, "passthrough program unavailable");
                    return;
                }
            },
        };

        if let Some(location) = backend.uniform_location(program, MVP_UNIFORM) {
            backend.set_uniform_mat4(location, &self.mvp().to_cols_array());
        }
        if let Some(location) = backend.uniform_location(program, IMAGE_SAMPLER) {
            backend.set_uniform_i32(location, SOURCE_UNIT as i32);
        }
        backend.bind_texture(SOURCE_UNIT, TextureTarget::Texture2D, source.id());
        backend.draw_quad(quad.id(), QUAD_INDICES.len() as u32);
        self.redraw.set(false);
    }
}

fn projection([width, height]: [u32; 2]) -> Mat4 {
    let (hw, hh) = (width.max(1) as f32 / 2.0, height.max(1) as f32 / 2.0);
    Mat4::orthographic_rh_gl(-hw, hw, -hh, hh, -1.0, 1.0)
}

impl<B: GraphicsBackend> fmt::Debug for GpuRenderer<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GpuRenderer")
            .field("graph", &self.graph)
            .field("shaders", &self.shaders)
            .field("textures", &self.textures.textures().len())
            .field("image_size", &self.image_size)
            .field("redraw", &self.redraw.get())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{HeadlessBackend, UniformRecord};
    use approx::assert_relative_eq;
    use glam::Vec4;
    use grade_core::GradingSpace;
    use grade_ocio::{Engine, builtin};
    use std::sync::Arc;

    fn renderer(view: &str) -> (Rc<HeadlessBackend>, GpuRenderer<HeadlessBackend>) {
        let graph = TransformGraph::builder(Arc::new(Engine::new(builtin::studio())))
            .input_encoding("scene_linear")
            .display("sRGB")
            .view(view)
            .build();
        let backend = Rc::new(HeadlessBackend::new());
        let options = RendererOptions::default().with_viewport(400, 400);
        (backend.clone(), GpuRenderer::new(backend, graph, options))
    }

    fn image(width: u32, height: u32) -> Vec<f32> {
        vec![0.25; (width * height * 4) as usize]
    }

    #[test]
    fn source_texture_is_created_once() {
        let (backend, mut r) = renderer("Standard");
        let px = image(8, 4);
        r.load(&ImageRef::new(8, 4, 4, &px)).unwrap();
        let created = backend.stats().textures_created;
        assert_eq!(backend.live_quads(), 1);

        let px = image(16, 16);
        r.load(&ImageRef::new(16, 16, 4, &px)).unwrap();
        assert_eq!(backend.stats().textures_created, created);
        assert_eq!(backend.stats().texture_updates, 1);
        assert_eq!(backend.live_quads(), 1);
    }

    #[test]
    fn invalid_images_are_rejected() {
        let (backend, mut r) = renderer("Standard");
        let px = vec![0.0_f32; 10];
        assert!(matches!(r.load(&ImageRef::new(2, 2, 4, &px)), Err(GpuError::InvalidImage { .. })));
        assert!(matches!(r.load(&ImageRef::new(5, 1, 2, &px)), Err(GpuError::InvalidImage { .. })));
        assert!(matches!(r.load(&ImageRef::new(0, 4, 3, &[])), Err(GpuError::InvalidImage { .. })));
        assert_eq!(backend.live_textures(), 0);
    }

    #[test]
    fn draw_binds_source_and_quad() {
        let (backend, mut r) = renderer("Filmic");
        let px = image(4, 4);
        r.load(&ImageRef::new(4, 4, 4, &px)).unwrap();
        assert!(r.needs_redraw());
        r.draw();

        let program = r.shader_cache().program().unwrap();
        assert_eq!(backend.current_program(), Some(program));
        assert_eq!(backend.uniform(program, "imageTex"), Some(UniformRecord::I32(0)));
        assert!(matches!(backend.uniform(program, "mvpMat"), Some(UniformRecord::Mat4(_))));
        assert_eq!(backend.stats().draws, 1);
        assert!(!r.needs_redraw());
        assert_eq!(backend.clear_color(), [0.0, 0.0, 0.0, 1.0]);
        assert_eq!(backend.last_viewport(), (0, 0, 400, 400));

        let lut = r.textures().textures().iter().next().unwrap();
        assert_eq!(lut.unit(), 1);
        assert_eq!(backend.bound_texture(1), Some(lut.id()));
    }

    #[test]
    fn slider_moves_only_touch_uniforms() {
        let (backend, mut r) = renderer("Standard");
        r.grading_mut().set_exposure(0.5);
        let px = image(4, 4);
        r.load(&ImageRef::new(4, 4, 4, &px)).unwrap();
        r.draw();
        let program = r.shader_cache().program().unwrap();

        backend.reset_stats();
        r.grading_mut().set_exposure(2.0);
        assert!(r.needs_redraw());
        r.draw();
        let stats = backend.stats();
        assert_eq!(stats.shader_compiles, 0);
        assert_eq!(stats.textures_created, 0);
        assert_eq!(backend.uniform(program, "ocio_exposure"), Some(UniformRecord::F32(2.0)));
    }

    #[test]
    fn structural_edits_rebuild_on_draw() {
        let (backend, mut r) = renderer("Standard");
        let px = image(4, 4);
        r.load(&ImageRef::new(4, 4, 4, &px)).unwrap();
        r.draw();
        let before = r.shader_cache().fingerprint().map(str::to_string);

        r.grading_mut().set_saturation(1.4);
        r.draw();
        let after_grade = r.shader_cache().fingerprint().map(str::to_string);
        assert_ne!(before, after_grade);

        backend.reset_stats();
        r.grading_mut().set_grading_space(GradingSpace::Log);
        r.draw();
        assert_eq!(backend.stats().fragment_compiles, 1);
        assert_ne!(r.shader_cache().fingerprint().map(str::to_string), after_grade);
    }

    #[test]
    fn failed_rebuild_is_retried_on_draw() {
        let (backend, mut r) = renderer("Standard");
        let px = image(4, 4);
        r.load(&ImageRef::new(4, 4, 4, &px)).unwrap();
        let program = r.shader_cache().program();

        backend.fail_fragment_compiles(true);
        r.grading_mut().set_exposure(1.0);
        r.draw();
        assert_eq!(r.shader_cache().program(), program);

        backend.fail_fragment_compiles(false);
        r.draw();
        let rebuilt = r.shader_cache().program().unwrap();
        assert_ne!(Some(rebuilt), program);
        assert_eq!(backend.uniform(rebuilt, "ocio_exposure"), Some(UniformRecord::F32(1.0)));
    }

    #[test]
    fn invalid_graph_draws_passthrough() {
        let (backend, mut r) = renderer("Nope");
        let px = image(4, 4);
        r.load(&ImageRef::new(4, 4, 4, &px)).unwrap();
        assert!(r.shader_cache().program().is_none());

        r.draw();
        let program = backend.current_program().unwrap();
        let frag = backend.attached_source(program, crate::backend::ShaderStage::Fragment).unwrap();
        assert!(!frag.contains("OCIOMain"));
        assert_eq!(backend.stats().draws, 1);
    }

    #[test]
    fn refresh_reports_rebuilds() {
        let (_, mut r) = renderer("Standard");
        let px = image(4, 4);
        r.load(&ImageRef::new(4, 4, 4, &px)).unwrap();
        assert!(!r.refresh(false));
        assert!(r.refresh(true));
        assert_eq!(r.shader_cache().rebuilds(), 2);
    }

    #[test]
    fn image_fits_viewport() {
        let (_, mut r) = renderer("Raw");
        let px = image(200, 100);
        r.load(&ImageRef::new(200, 100, 4, &px)).unwrap();
        let corner = r.mvp() * Vec4::new(0.5, 0.5, 0.0, 1.0);
        assert_relative_eq!(corner.x, 1.0, epsilon = 1e-6);
        assert_relative_eq!(corner.y, 0.5, epsilon = 1e-6);

        r.set_viewport(100, 400);
        let corner = r.mvp() * Vec4::new(0.5, 0.5, 0.0, 1.0);
        assert_relative_eq!(corner.x, 1.0, epsilon = 1e-6);
        assert_relative_eq!(corner.y, 0.125, epsilon = 1e-6);
    }

    #[test]
    fn options_from_partial_json() {
        let opts: RendererOptions = serde_json::from_str(r#"{"viewport":[640,480]}"#).unwrap();
        assert_eq!(opts.viewport, [640, 480]);
        assert_eq!(opts.clear_color, [0.0, 0.0, 0.0, 1.0]);
        assert_eq!(opts.language, GlslVersion::Glsl400);
        assert!(serde_json::to_string(&RendererOptions::default()).unwrap().contains("Glsl400"));
    }
}
