//! GPU rendering for grading transform graphs.
//!
//! Compiled processors carry GLSL plus the lookup tables and uniforms that
//! text needs. This crate turns them into GL objects and keeps those
//! objects only as long as the processor fingerprint stays the same:
//!
//! - [`ShaderCache`]: the linked program, rebuilt on fingerprint change,
//!   with dynamic property uniforms updated in place
//! - [`TextureAllocator`]: 1D/2D/3D lookup textures on units 1..N
//! - [`GpuRenderer`]: source image upload, refresh and per-frame draw
//!
//! Everything runs against a [`GraphicsBackend`]. [`HeadlessBackend`]
//! records calls and needs no context; `GlowBackend` (feature `glow`)
//! drives OpenGL.
//!
//! # Quick Start
//!
//! ```
//! use std::rc::Rc;
//! use std::sync::Arc;
//! use grade_gl::{GpuRenderer, HeadlessBackend, ImageRef, RendererOptions};
//! use grade_graph::TransformGraph;
//! use grade_ocio::{Engine, builtin};
//!
//! let graph = TransformGraph::builder(Arc::new(Engine::new(builtin::studio())))
//!     .input_encoding("sRGB Encoded")
//!     .display("sRGB")
//!     .view("Standard")
//!     .looks("+Punchy")
//!     .build();
//!
//! let backend = Rc::new(HeadlessBackend::new());
//! let mut renderer = GpuRenderer::new(backend.clone(), graph, RendererOptions::default());
//!
//! let pixels = vec![0.5_f32; 64 * 64 * 4];
//! renderer.load(&ImageRef::new(64, 64, 4, &pixels)).unwrap();
//! renderer.grading_mut().set_saturation(1.2);
//! renderer.draw();
//!
//! let cache = renderer.shader_cache();
//! println!("program {:?}, {} lookup textures", cache.program(), renderer.textures().textures().len());
//! ```
//!
//! # Features
//!
//! - `glow`: OpenGL backend over a caller-created `glow::Context`

#![warn(missing_docs)]
#![warn(clippy::all)]

mod error;
mod resource;
mod shader_cache;
mod shaders;
mod texture;
mod renderer;

pub mod backend;

// Re-exports
pub use error::{GpuError, GpuResult};
pub use backend::{GraphicsBackend, HeadlessBackend};
pub use resource::{OwnedProgram, OwnedQuad, OwnedShader, OwnedTexture};
pub use shader_cache::{DynamicPropertyBinding, ProgramStatus, ShaderCache};
pub use shaders::{IMAGE_SAMPLER, MVP_UNIFORM, passthrough_fragment, processor_fragment, vertex_source};
pub use texture::{AllocatedTexture, FIRST_LUT_UNIT, TextureAllocator, TextureSet};
pub use renderer::{GpuRenderer, ImageRef, RendererOptions, SOURCE_UNIT};

#[cfg(feature = "glow")]
pub use backend::GlowBackend;
