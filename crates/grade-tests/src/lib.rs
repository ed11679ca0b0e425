//! Integration tests for the grading workspace.
//!
//! End-to-end scenarios across `grade-core`, `grade-ocio`, `grade-graph`
//! and `grade-gl`: CPU evaluation against reference values, and the GPU
//! path on the headless backend.
//!
//! # Running
//!
//! ```bash
//! cargo test --package grade-tests
//! RUST_LOG=debug cargo test --package grade-tests -- --nocapture
//! ```

use std::sync::Arc;

use sha2::{Digest, Sha256};

use grade_graph::{TransformGraph, TransformGraphBuilder};
use grade_ocio::{Engine, EngineOptions, builtin};

#[cfg(test)]
mod cpu;
#[cfg(test)]
mod gpu;

/// Decimal places kept when hashing float output.
const HASH_PRECISION: i32 = 5;

/// Engine over the built-in studio catalog.
pub fn studio_engine() -> Arc<Engine> {
    Arc::new(Engine::new(builtin::studio()))
}

/// Engine over the studio catalog with custom options.
pub fn studio_engine_with(options: EngineOptions) -> Arc<Engine> {
    Arc::new(Engine::new(builtin::studio()).with_options(options))
}

/// Graph builder reading scene-linear input.
pub fn scene_linear_graph(display: &str, view: &str) -> TransformGraphBuilder {
    TransformGraph::builder(studio_engine())
        .input_encoding("scene_linear")
        .display(display)
        .view(view)
}

/// RGB cube with `size` samples per axis, red varying slowest.
pub fn rgb_cube(size: usize) -> Vec<[f32; 3]> {
    let step = 1.0 / (size - 1) as f32;
    let mut cube = Vec::with_capacity(size * size * size);
    for r in 0..size {
        for g in 0..size {
            for b in 0..size {
                cube.push([r as f32 * step, g as f32 * step, b as f32 * step]);
            }
        }
    }
    cube
}

/// SHA-256 of pixel data quantized to [`HASH_PRECISION`] decimals.
pub fn hash_pixels(pixels: &[[f32; 3]]) -> String {
    let factor = 10f64.powi(HASH_PRECISION);
    let mut hasher = Sha256::new();
    for v in pixels.iter().flatten() {
        let q = (*v as f64 * factor).round() as i64;
        hasher.update(q.to_le_bytes());
    }
    format!("{:x}", hasher.finalize())
}

/// Install a test log subscriber once; honors `RUST_LOG`.
#[cfg(test)]
pub(crate) fn init_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
