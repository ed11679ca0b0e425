//! CPU evaluation of a transform graph.
//!
//! [`CpuEvaluator`] keeps the last compiled processor and recompiles only
//! when the graph's shape changes. Current grading values are pushed into
//! the processor before every apply, so slider moves never recompile.

use tracing::debug;

use grade_core::CompiledProcessor;

use crate::error::{GraphError, GraphResult};
use crate::graph::{GraphShape, OpGraph, TransformGraph};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// Pixels per parallel work item.
#[cfg(feature = "parallel")]
const PARALLEL_CHUNK: usize = 4096;

/// Applies a [`TransformGraph`] to in-memory pixel buffers.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use grade_graph::{CpuEvaluator, TransformGraph};
/// use grade_ocio::{Engine, builtin};
///
/// let graph = TransformGraph::builder(Arc::new(Engine::new(builtin::studio())))
///     .input_encoding("scene_linear")
///     .display("sRGB")
///     .view("Raw")
///     .build();
/// let mut eval = CpuEvaluator::new(graph);
///
/// eval.graph_mut().grading_mut().set_exposure(1.0);
/// let mut pixels = [[0.25_f32, 0.5, 1.0]];
/// eval.apply_rgb(&mut pixels).unwrap();
/// assert!((pixels[0][2] - 2.0).abs() < 1e-5);
/// ```
#[derive(Debug)]
pub struct CpuEvaluator {
    graph: TransformGraph,
    cached: Option<(GraphShape, Box<dyn CompiledProcessor>)>,
    compilations: usize,
}

impl CpuEvaluator {
    /// Evaluator over `graph`. Nothing is compiled until the first apply.
    pub fn new(graph: TransformGraph) -> Self {
        Self { graph, cached: None, compilations: 0 }
    }

    /// The graph.
    pub fn graph(&self) -> &TransformGraph {
        &self.graph
    }

    /// Mutable graph. Structural edits are picked up on the next apply.
    pub fn graph_mut(&mut self) -> &mut TransformGraph {
        &mut self.graph
    }

    /// Consumes the evaluator, returning the graph.
    pub fn into_graph(self) -> TransformGraph {
        self.graph
    }

    /// Fingerprint of the cached processor, if any.
    pub fn fingerprint(&self) -> Option<&str> {
        self.cached.as_ref().map(|(_, p)| p.fingerprint())
    }

    /// Number of times the graph has been compiled.
    pub fn compilations(&self) -> usize {
        self.compilations
    }

    /// Processor for the current graph state, with dynamic values applied.
    pub fn processor(&mut self) -> GraphResult<&dyn CompiledProcessor> {
        Ok(&**self.current()?)
    }

    fn current(&mut self) -> GraphResult<&mut Box<dyn CompiledProcessor>> {
        let shape = self.graph.shape();
        let entry = match self.cached.take() {
            Some(entry) if entry.0 == shape => entry,
            _ => {
                let processor = self.graph.processor()?;
                self.compilations += 1;
                debug!(fingerprint = %processor.fingerprint(), "cpu processor rebuilt");
                (shape, processor)
            }
        };
        let (_, processor) = self.cached.insert(entry);
        self.graph.update_dynamic(processor);
        Ok(processor)
    }

    /// Apply to RGB pixels in place.
    pub fn apply_rgb(&mut self, pixels: &mut [[f32; 3]]) -> GraphResult<()> {
        let processor = &**self.current()?;
        run_rgb(processor, pixels);
        Ok(())
    }

    /// Apply to RGBA pixels in place; alpha is untouched.
    pub fn apply_rgba(&mut self, pixels: &mut [[f32; 4]]) -> GraphResult<()> {
        let processor = &**self.current()?;
        run_rgba(processor, pixels);
        Ok(())
    }

    /// Apply to an interleaved buffer of 3 or 4 channels per pixel.
    pub fn apply_interleaved(&mut self, data: &mut [f32], channels: usize) -> GraphResult<()> {
        if !matches!(channels, 3 | 4) || data.len() % channels != 0 {
            return Err(GraphError::InvalidBuffer {
                reason: format!("{} floats cannot hold pixels of {} channels", data.len(), channels),
            });
        }
        let processor = &**self.current()?;
        let cast_err = |e: bytemuck::PodCastError| GraphError::InvalidBuffer { reason: e.to_string() };
        if channels == 3 {
            run_rgb(processor, bytemuck::try_cast_slice_mut(data).map_err(cast_err)?);
        } else {
            run_rgba(processor, bytemuck::try_cast_slice_mut(data).map_err(cast_err)?);
        }
        Ok(())
    }
}

#[cfg(feature = "parallel")]
fn run_rgb(processor: &dyn CompiledProcessor, pixels: &mut [[f32; 3]]) {
    pixels.par_chunks_mut(PARALLEL_CHUNK).for_each(|chunk| processor.apply_rgb(chunk));
}

#[cfg(not(feature = "parallel"))]
fn run_rgb(processor: &dyn CompiledProcessor, pixels: &mut [[f32; 3]]) {
    processor.apply_rgb(pixels);
}

#[cfg(feature = "parallel")]
fn run_rgba(processor: &dyn CompiledProcessor, pixels: &mut [[f32; 4]]) {
    pixels.par_chunks_mut(PARALLEL_CHUNK).for_each(|chunk| processor.apply_rgba(chunk));
}

#[cfg(not(feature = "parallel"))]
fn run_rgba(processor: &dyn CompiledProcessor, pixels: &mut [[f32; 4]]) {
    processor.apply_rgba(pixels);
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use grade_core::GradingSpace;
    use grade_ocio::{Engine, builtin};
    use std::sync::Arc;

    const EPSILON: f32 = 1e-4;

    fn evaluator(view: &str) -> CpuEvaluator {
        let graph = TransformGraph::builder(Arc::new(Engine::new(builtin::studio())))
            .input_encoding("scene_linear")
            .display("sRGB")
            .view(view)
            .build();
        CpuEvaluator::new(graph)
    }

    #[test]
    fn default_grading_is_identity() {
        let mut eval = evaluator("Raw");
        let mut px = [[0.18_f32, -0.5, 7.0]];
        eval.apply_rgb(&mut px).unwrap();
        assert_eq!(px[0], [0.18, -0.5, 7.0]);
    }

    #[test]
    fn saturation_matches_reference_values() {
        let mut eval = evaluator("Raw");
        eval.graph_mut().grading_mut().set_saturation(2.0);
        let mut px = [[0.5_f32, 0.1, 0.1]];
        eval.apply_rgb(&mut px).unwrap();
        assert!((px[0][0] - 0.81496).abs() < EPSILON, "got {}", px[0][0]);
        assert!((px[0][1] - 0.01496).abs() < EPSILON, "got {}", px[0][1]);
        assert!((px[0][2] - 0.01496).abs() < EPSILON, "got {}", px[0][2]);
    }

    #[test]
    fn slider_moves_do_not_recompile() {
        let mut eval = evaluator("Standard");
        let mut px = [[0.18_f32; 3]];
        eval.graph_mut().grading_mut().set_exposure(0.5);
        eval.apply_rgb(&mut px).unwrap();
        let fp = eval.fingerprint().map(str::to_string);

        for ev in [1.0, -1.0, 2.5] {
            eval.graph_mut().grading_mut().set_exposure(ev);
            eval.apply_rgb(&mut px).unwrap();
        }
        assert_eq!(eval.compilations(), 1);
        assert_eq!(eval.fingerprint().map(str::to_string), fp);

        eval.graph_mut().grading_mut().set_grading_space(GradingSpace::Video);
        eval.apply_rgb(&mut px).unwrap();
        assert_eq!(eval.compilations(), 2);
    }

    #[test]
    fn exposure_follows_latest_value() {
        let mut eval = evaluator("Raw");
        eval.graph_mut().grading_mut().set_exposure(1.0);
        let mut px = [[0.25_f32, 0.5, 1.0, 0.3]];
        eval.apply_rgba(&mut px).unwrap();
        assert_relative_eq!(px[0][0], 0.5, epsilon = 1e-5);

        eval.graph_mut().grading_mut().set_exposure(-1.0);
        eval.apply_rgba(&mut px).unwrap();
        assert_relative_eq!(px[0][0], 0.25, epsilon = 1e-5);
        assert_eq!(px[0][3], 0.3);
    }

    #[test]
    fn interleaved_buffers() {
        let mut eval = evaluator("Raw");
        eval.graph_mut().grading_mut().set_exposure(1.0);

        let mut rgb = vec![0.25_f32, 0.5, 1.0, 0.1, 0.2, 0.3];
        eval.apply_interleaved(&mut rgb, 3).unwrap();
        assert_relative_eq!(rgb[3], 0.2, epsilon = 1e-5);

        let mut rgba = vec![0.25_f32, 0.5, 1.0, 0.9];
        eval.apply_interleaved(&mut rgba, 4).unwrap();
        assert_relative_eq!(rgba[2], 2.0, epsilon = 1e-5);
        assert_eq!(rgba[3], 0.9);

        assert!(matches!(eval.apply_interleaved(&mut rgba, 2), Err(GraphError::InvalidBuffer { .. })));
        let mut odd = vec![0.0_f32; 5];
        assert!(eval.apply_interleaved(&mut odd, 3).is_err());
    }

    #[test]
    fn compile_errors_surface() {
        let mut eval = evaluator("Nope");
        let mut px = [[0.0_f32; 3]];
        assert!(matches!(eval.apply_rgb(&mut px), Err(GraphError::UnknownView { .. })));
        assert!(eval.fingerprint().is_none());
    }

    #[test]
    fn open_domain_values_survive() {
        let mut eval = evaluator("Raw");
        let g = eval.graph_mut().grading_mut();
        g.set_contrast(1.4);
        g.set_gamma(1.3);
        let mut px = [[-0.5_f32, 0.0, 40.0]];
        eval.apply_rgb(&mut px).unwrap();
        assert!(px[0].iter().all(|v| v.is_finite()), "{:?}", px[0]);
        assert!(px[0][0] < 0.0);
    }
}
