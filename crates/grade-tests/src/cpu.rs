//! CPU path: reference values, look parsing and determinism.

use approx::assert_relative_eq;

use grade_core::{ColorEngine, CompiledProcessor, DynamicProperty, GradingParameters};
use grade_graph::{CpuEvaluator, OpGraph, TransformGraph};

use crate::{hash_pixels, init_logging, rgb_cube, scene_linear_graph, studio_engine};

const EPSILON: f32 = 1e-4;

fn apply(graph: TransformGraph, input: [f32; 3]) -> [f32; 3] {
    let mut eval = CpuEvaluator::new(graph);
    let mut px = [input];
    eval.apply_rgb(&mut px).unwrap();
    px[0]
}

#[test]
fn default_grading_is_identity() {
    init_logging();
    let graph = scene_linear_graph("sRGB", "Raw").build();
    assert_eq!(graph.nodes().unwrap().len(), 2);

    let mut eval = CpuEvaluator::new(graph);
    let mut cube = rgb_cube(5);
    let expected = cube.clone();
    eval.apply_rgb(&mut cube).unwrap();
    assert_eq!(cube, expected);
}

#[test]
fn saturation_reference_values() {
    init_logging();
    for (saturation, expected) in [
        (2.0, [0.81496, 0.01496, 0.01496]),
        (0.5, [0.34252, 0.14252, 0.14252]),
    ] {
        let mut graph = scene_linear_graph("sRGB", "Raw").build();
        graph.grading_mut().set_saturation(saturation);
        assert!(graph.grading().is_modified_saturation_only());

        let out = apply(graph, [0.5, 0.1, 0.1]);
        for c in 0..3 {
            assert!((out[c] - expected[c]).abs() < EPSILON, "sat {}: got {:?}", saturation, out);
        }
    }
}

#[test]
fn exposure_and_offset_compose() {
    let mut graph = scene_linear_graph("sRGB", "Raw").build();
    graph.grading_mut().set_exposure(1.0);
    graph.grading_mut().set_offset([0.1, 0.0, -0.1]);
    let out = apply(graph, [0.2, 0.2, 0.2]);
    // Offset is applied by the primary block ahead of exposure.
    assert_relative_eq!(out[0], 0.6, epsilon = 1e-5);
    assert_relative_eq!(out[1], 0.4, epsilon = 1e-5);
    assert_relative_eq!(out[2], 0.2, epsilon = 1e-5);
}

#[test]
fn inverse_look_cancels_forward() {
    let graph = scene_linear_graph("sRGB", "Raw").looks("+Warm, -Warm").build();
    assert!(graph.nodes().unwrap().iter().any(|n| n.to_string().contains("Warm")));

    let out = apply(graph, [0.4, 0.3, 0.2]);
    assert_relative_eq!(out[0], 0.4, epsilon = 1e-5);
    assert_relative_eq!(out[1], 0.3, epsilon = 1e-5);
    assert_relative_eq!(out[2], 0.2, epsilon = 1e-5);
}

#[test]
fn warm_look_tilts_white() {
    let graph = scene_linear_graph("sRGB", "Raw").looks("Warm").build();
    let out = apply(graph, [0.5, 0.5, 0.5]);
    assert!(out[0] > out[1] && out[1] > out[2], "{:?}", out);
}

#[test]
fn log_workspace_survives_non_positive_input() {
    let graph = scene_linear_graph("sRGB", "Raw").workspace("compositing_log").build();
    let mut eval = CpuEvaluator::new(graph);
    let mut px = [[0.0_f32, -1.0, 0.18]];
    eval.apply_rgb(&mut px).unwrap();

    assert!(px[0].iter().all(|v| v.is_finite()));
    assert_relative_eq!(px[0][0], 0.0, epsilon = 1e-6);
    assert_relative_eq!(px[0][1], 0.0, epsilon = 1e-6);
    assert_relative_eq!(px[0][2], 10.0 / 16.5, epsilon = 1e-5);
}

#[test]
fn fingerprint_is_stable_across_engines() {
    let build = || {
        let mut graph = scene_linear_graph("sRGB", "Filmic").looks("+Punchy").build();
        graph.grading_mut().set_contrast(1.2);
        graph
    };
    let a = build().compile().unwrap();
    let mut b_graph = build();
    b_graph.grading_mut().set_contrast(0.7);
    b_graph.grading_mut().set_exposure(-2.0);
    let b = b_graph.compile().unwrap();
    assert_eq!(a.fingerprint(), b.fingerprint());

    let mut c_graph = build();
    c_graph.set_target_view("Standard");
    assert_ne!(a.fingerprint(), c_graph.compile().unwrap().fingerprint());
}

#[test]
fn output_hash_is_stable_across_engines() {
    let run = || {
        let mut graph = scene_linear_graph("sRGB", "Filmic").looks("Tint").build();
        graph.grading_mut().set_saturation(1.3);
        graph.grading_mut().set_pivot(0.5);
        let mut eval = CpuEvaluator::new(graph);
        let mut cube = rgb_cube(8);
        eval.apply_rgb(&mut cube).unwrap();
        hash_pixels(&cube)
    };
    assert_eq!(run(), run());
}

#[test]
fn dynamic_values_follow_setters() {
    let engine = studio_engine();
    let mut params = GradingParameters::new();
    params.set_exposure(0.5);
    let graph = TransformGraph::builder(engine.clone())
        .input_encoding("scene_linear")
        .display("sRGB")
        .view("Raw")
        .grading(params)
        .build();

    let mut processor: Box<dyn CompiledProcessor> = engine.compile(&graph.nodes().unwrap()).unwrap();
    processor.set_dynamic(&DynamicProperty::Exposure(2.0));
    let mut px = [[0.25_f32, 0.25, 0.25]];
    processor.apply_rgb(&mut px);
    assert_relative_eq!(px[0][0], 1.0, epsilon = 1e-5);

    graph.update_dynamic(&mut processor);
    processor.apply_rgb(&mut px);
    assert_relative_eq!(px[0][0], 1.0 * 2f32.sqrt(), epsilon = 1e-5);
}

#[test]
fn rgba_alpha_is_untouched() {
    let mut graph = scene_linear_graph("sRGB", "Standard").build();
    graph.grading_mut().set_saturation(0.0);
    let mut eval = CpuEvaluator::new(graph);
    let mut data = vec![0.5_f32, 0.2, 0.1, 0.25, 0.9, 0.9, 0.9, 1.0];
    eval.apply_interleaved(&mut data, 4).unwrap();
    assert_eq!(data[3], 0.25);
    assert_eq!(data[7], 1.0);
    assert_relative_eq!(data[0], data[1], epsilon = 1e-5);
}
