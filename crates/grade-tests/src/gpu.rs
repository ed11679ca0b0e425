//! GPU path on the headless backend.

use std::cell::RefCell;
use std::rc::Rc;

use grade_core::{DynamicProperty, GradingSpace};
use grade_gl::backend::{TextureFormat, TextureTarget, UniformRecord};
use grade_gl::{GpuRenderer, HeadlessBackend, ImageRef, ProgramStatus, RendererOptions, ShaderCache};
use grade_graph::TransformGraph;
use grade_ocio::EngineOptions;

use crate::{init_logging, scene_linear_graph, studio_engine_with};

const SIZE: u32 = 8;

fn pixels() -> Vec<f32> {
    (0..SIZE * SIZE * 4).map(|i| (i % 17) as f32 / 16.0).collect()
}

fn renderer(graph: TransformGraph) -> (Rc<HeadlessBackend>, GpuRenderer<HeadlessBackend>) {
    init_logging();
    let backend = Rc::new(HeadlessBackend::new());
    let mut r = GpuRenderer::new(backend.clone(), graph, RendererOptions::default());
    let px = pixels();
    r.load(&ImageRef::new(SIZE, SIZE, 4, &px)).unwrap();
    (backend, r)
}

#[test]
fn unchanged_processor_compiles_nothing() {
    let (backend, mut r) = renderer(scene_linear_graph("sRGB", "Filmic").build());
    let fingerprint = r.shader_cache().fingerprint().map(str::to_string);

    backend.reset_stats();
    let px = pixels();
    r.load(&ImageRef::new(SIZE, SIZE, 4, &px)).unwrap();
    r.draw();
    r.draw();

    let stats = backend.stats();
    assert_eq!(stats.shader_compiles, 0);
    assert_eq!(stats.program_links, 0);
    assert_eq!(stats.textures_created, 0);
    assert_eq!(stats.draws, 2);
    assert_eq!(r.shader_cache().fingerprint().map(str::to_string), fingerprint);
}

#[test]
fn shader_cache_reuses_matching_program() {
    let backend = Rc::new(HeadlessBackend::new());
    let mut cache = ShaderCache::new(backend.clone(), Default::default());
    let graph = scene_linear_graph("Rec.1886", "Standard").build();
    let processor = graph.compile().unwrap();

    assert_eq!(cache.ensure_program(&*processor, false).unwrap(), ProgramStatus::Rebuilt);
    backend.reset_stats();
    assert_eq!(cache.ensure_program(&*processor, false).unwrap(), ProgramStatus::Unchanged);
    assert_eq!(backend.stats().shader_compiles, 0);
}

#[test]
fn textures_are_replaced_as_a_set() {
    let (backend, mut r) = renderer(scene_linear_graph("sRGB", "Filmic").looks("+Punchy, Tint").build());
    let luts = r.textures().textures();
    assert_eq!(luts.len(), 3);
    let layout: Vec<_> = luts.iter().map(|t| (t.unit(), t.target())).collect();
    assert_eq!(
        layout,
        vec![(1, TextureTarget::Texture3D), (2, TextureTarget::Texture1D), (3, TextureTarget::Texture1D)]
    );
    // Source image plus lookup tables.
    assert_eq!(backend.live_textures(), 4);

    r.graph_mut().set_target_looks(None);
    r.draw();
    assert_eq!(r.textures().textures().len(), 1);
    assert_eq!(backend.live_textures(), 2);

    r.graph_mut().set_target_view("Standard");
    r.draw();
    assert!(r.textures().textures().is_empty());
    assert_eq!(backend.live_textures(), 1);
}

#[test]
fn texture_failure_keeps_previous_state() {
    let (backend, mut r) = renderer(scene_linear_graph("sRGB", "Standard").build());
    let program = r.shader_cache().program();
    let fingerprint = r.shader_cache().fingerprint().map(str::to_string);

    backend.set_texture_budget(Some(0));
    r.graph_mut().set_target_view("Filmic");
    assert!(!r.refresh(false));
    assert_eq!(r.shader_cache().program(), program);
    assert_eq!(r.shader_cache().fingerprint().map(str::to_string), fingerprint);
    assert!(r.textures().textures().is_empty());

    r.draw();
    assert_eq!(backend.current_program(), program);

    backend.set_texture_budget(None);
    assert!(r.refresh(false));
    assert_eq!(r.textures().textures().len(), 1);
}

#[test]
fn compile_failure_keeps_previous_program() {
    let (backend, mut r) = renderer(scene_linear_graph("sRGB", "Standard").build());
    let program = r.shader_cache().program();

    backend.fail_fragment_compiles(true);
    r.grading_mut().set_exposure(1.0);
    r.draw();
    assert_eq!(r.shader_cache().program(), program);
    assert_eq!(backend.stats().draws, 1);

    backend.fail_fragment_compiles(false);
    let px = pixels();
    r.load(&ImageRef::new(SIZE, SIZE, 4, &px)).unwrap();
    let rebuilt = r.shader_cache().program().unwrap();
    assert_ne!(Some(rebuilt), program);
    assert_eq!(backend.uniform(rebuilt, "ocio_exposure"), Some(UniformRecord::F32(1.0)));
}

#[test]
fn notifications_arrive_before_setter_returns() {
    let (_, mut r) = renderer(scene_linear_graph("sRGB", "Standard").build());
    r.draw();
    assert!(!r.needs_redraw());

    let seen = Rc::new(RefCell::new(Vec::new()));
    let sink = seen.clone();
    let id = r.grading_mut().subscribe(move |p| sink.borrow_mut().push(*p));

    r.grading_mut().set_saturation(1.5);
    assert!(r.needs_redraw());
    match seen.borrow().last() {
        Some(DynamicProperty::GradingPrimary(gp)) => {
            assert_eq!(gp.saturation, 1.5);
            assert_eq!(gp.clamp_black, -150.0);
        }
        other => panic!("unexpected notification {:?}", other),
    }

    r.grading_mut().set_grading_space(GradingSpace::Video);
    assert_eq!(seen.borrow().len(), 1);

    assert!(r.grading_mut().unsubscribe(id));
    r.grading_mut().set_gamma(1.2);
    assert_eq!(seen.borrow().len(), 1);
}

#[test]
fn long_luts_wrap_onto_rows() {
    let engine = studio_engine_with(EngineOptions::default().with_max_texture_width(1024));
    let graph = TransformGraph::builder(engine)
        .input_encoding("scene_linear")
        .display("sRGB")
        .view("Filmic")
        .build();
    let (backend, r) = renderer(graph);

    let lut = r.textures().textures().iter().next().unwrap();
    assert_eq!(lut.target(), TextureTarget::Texture2D);
    assert_eq!(lut.format(), TextureFormat::R32F);
    let record = backend.texture(lut.id()).unwrap();
    // Rows overlap by one texel: ceil(4095 / 1023) rows.
    assert_eq!((record.width, record.height), (1024, 5));
    assert_eq!(record.len, 5120);
}

#[test]
fn dynamic_uniforms_track_parameters() {
    let mut graph = scene_linear_graph("sRGB", "Standard").build();
    graph.grading_mut().set_contrast([1.2, 1.0, 0.8]);
    let (backend, mut r) = renderer(graph);
    let program = r.shader_cache().program().unwrap();
    assert_eq!(
        backend.uniform(program, "ocio_primary_contrast"),
        Some(UniformRecord::Vec3([1.2, 1.0, 0.8]))
    );

    r.grading_mut().set_gamma(0.8);
    r.grading_mut().set_pivot(0.25);
    r.draw();
    assert_eq!(r.shader_cache().program(), Some(program));
    assert_eq!(backend.uniform(program, "ocio_gamma"), Some(UniformRecord::F32(0.8)));
    assert_eq!(backend.uniform(program, "ocio_primary_pivot"), Some(UniformRecord::F32(0.25)));
}
