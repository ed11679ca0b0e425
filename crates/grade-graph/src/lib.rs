//! Grading transform graph and CPU evaluation.
//!
//! [`TransformGraph`] describes the pipeline
//! `input -> workspace -> grading -> looks -> display` against a
//! [`grade_core::ColorEngine`], validates it and compiles it into a
//! processor. [`CpuEvaluator`] applies it to pixel buffers, recompiling
//! only when the graph's shape changes.
//!
//! # Quick Start
//!
//! ```
//! use std::sync::Arc;
//! use grade_graph::{CpuEvaluator, OpGraph, TransformGraph};
//! use grade_ocio::{Engine, builtin};
//!
//! let engine = Arc::new(Engine::new(builtin::studio()));
//! let mut graph = TransformGraph::builder(engine)
//!     .input_encoding("sRGB Encoded")
//!     .display("sRGB")
//!     .view("Standard")
//!     .build();
//! graph.validate().unwrap();
//!
//! graph.grading_mut().set_saturation(1.5);
//! let processor = graph.compile().unwrap();
//! println!("{}", processor.fingerprint());
//!
//! let mut eval = CpuEvaluator::new(graph);
//! let mut pixels = vec![[0.5_f32, 0.4, 0.3]; 16];
//! eval.apply_rgb(&mut pixels).unwrap();
//! ```
//!
//! # Features
//!
//! - `parallel` (default): split pixel loops across threads with rayon

#![warn(missing_docs)]
#![warn(clippy::all)]

mod error;
mod graph;
mod evaluator;

// Re-exports
pub use error::{GraphError, GraphResult};
pub use graph::{DEFAULT_WORKSPACE, GraphShape, OpGraph, TransformGraph, TransformGraphBuilder};
pub use evaluator::CpuEvaluator;

#[cfg(test)]
mod tests {
    use super::*;
    use grade_ocio::{Engine, builtin};
    use std::sync::Arc;

    #[test]
    fn quick_start_example() {
        let engine = Arc::new(Engine::new(builtin::studio()));
        let mut graph = TransformGraph::builder(engine)
            .input_encoding("sRGB Encoded")
            .display("sRGB")
            .view("Standard")
            .build();
        assert!(graph.validate().is_ok());

        graph.grading_mut().set_saturation(1.5);
        let processor = graph.compile().unwrap();
        assert_eq!(processor.fingerprint().len(), 64);

        let mut eval = CpuEvaluator::new(graph);
        let mut pixels = vec![[0.5_f32, 0.4, 0.3]; 16];
        eval.apply_rgb(&mut pixels).unwrap();
        assert!(pixels[0][0] > pixels[0][2]);
    }
}
