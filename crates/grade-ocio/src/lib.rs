//! Reference color engine for grading pipelines.
//!
//! This crate implements the engine interface from `grade-core`:
//! - An in-memory catalog of color spaces, roles, displays and looks
//! - A compiler from transform nodes to processing ops
//! - CPU evaluation of the compiled ops
//! - GLSL generation with 1D/2D/3D LUT textures and dynamic uniforms
//! - A built-in studio catalog
//!
//! # Quick Start
//!
//! ```
//! use grade_core::{CompiledProcessor, TransformNode};
//! use grade_ocio::{Engine, builtin};
//!
//! let engine = Engine::new(builtin::studio());
//!
//! let processor = engine
//!     .build(&[TransformNode::DisplayRender {
//!         src: "scene_linear".into(),
//!         display: "sRGB".into(),
//!         view: "Standard".into(),
//!     }])
//!     .unwrap();
//!
//! let mut pixels = [[0.18_f32, 0.18, 0.18]];
//! processor.apply_rgb(&mut pixels);
//! assert!(pixels[0][0] > 0.45);
//!
//! // Shader text for the GPU path
//! assert!(processor.shader().text.contains("OCIOMain"));
//! ```
//!
//! # Roles
//!
//! ```
//! use grade_ocio::builtin;
//!
//! let config = builtin::studio();
//! let linear = config.colorspace("scene_linear").unwrap();
//! assert_eq!(linear.name(), "Linear Rec.709");
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

mod error;
mod config;
mod colorspace;
mod display;
mod look;
mod role;
mod lut;
mod op;
mod glsl;
mod processor;
mod engine;

pub mod builtin;

// Re-exports
pub use error::{OcioError, OcioResult};
pub use config::Config;
pub use colorspace::{ColorSpace, ColorSpaceBuilder, Encoding};
pub use display::{Display, View};
pub use look::Look;
pub use role::{Roles, names as role_names};
pub use lut::{Lut1d, Lut3d};
pub use op::{Op, srgb_decode, srgb_encode};
pub use processor::Processor;
pub use engine::{Engine, EngineOptions};
