//! Graphics backends.
//!
//! [`GraphicsBackend`] is a thin pass-through over the GL calls the shader
//! cache, texture allocator and renderer need. Handles are plain integers
//! wrapped in newtypes; ownership lives in [`crate::resource`].
//!
//! # Architecture
//!
//! ```text
//! GpuRenderer<B: GraphicsBackend>
//!     +-- HeadlessBackend (records calls, no context needed)
//!     +-- GlowBackend     (OpenGL through glow, feature "glow")
//! ```
//!
//! Methods take `&self`: a GL context is used from one thread and its calls
//! mutate driver state, not the Rust value.

use std::fmt;

use grade_core::Interpolation;

use crate::error::GpuResult;

mod headless;

#[cfg(feature = "glow")]
mod glow_backend;

pub use headless::{HeadlessBackend, HeadlessStats, TextureRecord, UniformRecord};

#[cfg(feature = "glow")]
pub use glow_backend::GlowBackend;

// ============================================================================
// Handles
// ============================================================================

macro_rules! handle {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub struct $name(pub u32);
    };
}

handle!(
    /// Shader object.
    ShaderId
);
handle!(
    /// Program object.
    ProgramId
);
handle!(
    /// Texture object.
    TextureId
);
handle!(
    /// Uniform location within a program.
    UniformLocation
);
handle!(
    /// Vertex array with its position, texture coordinate and index buffers.
    QuadId
);

// ============================================================================
// Enums
// ============================================================================

/// Shader stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShaderStage {
    /// Vertex shader.
    Vertex,
    /// Fragment shader.
    Fragment,
}

impl fmt::Display for ShaderStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Vertex => "vertex",
            Self::Fragment => "fragment",
        })
    }
}

/// Texture dimensionality.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextureTarget {
    /// `GL_TEXTURE_1D`.
    Texture1D,
    /// `GL_TEXTURE_2D`.
    Texture2D,
    /// `GL_TEXTURE_3D`.
    Texture3D,
}

/// Texel storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextureFormat {
    /// `GL_R32F` / `GL_RED`.
    R32F,
    /// `GL_RGB32F` / `GL_RGB`.
    Rgb32F,
    /// `GL_RGBA32F` / `GL_RGBA`.
    Rgba32F,
}

impl TextureFormat {
    /// Floats per texel.
    pub fn components(&self) -> usize {
        match self {
            Self::R32F => 1,
            Self::Rgb32F => 3,
            Self::Rgba32F => 4,
        }
    }

    /// Format for an image with `channels` floats per pixel.
    pub fn for_channels(channels: usize) -> Option<Self> {
        match channels {
            1 => Some(Self::R32F),
            3 => Some(Self::Rgb32F),
            4 => Some(Self::Rgba32F),
            _ => None,
        }
    }
}

/// Minification and magnification filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FilterMode {
    /// `GL_NEAREST`.
    Nearest,
    /// `GL_LINEAR`.
    Linear,
}

impl From<Interpolation> for FilterMode {
    fn from(interpolation: Interpolation) -> Self {
        match interpolation {
            Interpolation::Nearest => Self::Nearest,
            Interpolation::Linear => Self::Linear,
        }
    }
}

/// Everything needed to specify a texture image.
#[derive(Debug, Clone, Copy)]
pub struct TextureUpload<'a> {
    /// Dimensionality.
    pub target: TextureTarget,
    /// Texture unit made active while uploading.
    pub unit: u32,
    /// Width in texels.
    pub width: u32,
    /// Height in texels; 1 for 1D.
    pub height: u32,
    /// Depth in texels; 1 for 1D and 2D.
    pub depth: u32,
    /// Texel storage.
    pub format: TextureFormat,
    /// Filtering.
    pub filter: FilterMode,
    /// `width * height * depth * components` floats.
    pub data: &'a [f32],
}

impl TextureUpload<'_> {
    /// Floats the declared size requires.
    pub fn expected_len(&self) -> usize {
        self.width as usize * self.height as usize * self.depth as usize * self.format.components()
    }
}

// ============================================================================
// Backend trait
// ============================================================================

/// GL-style graphics operations.
pub trait GraphicsBackend {
    /// Backend name.
    fn name(&self) -> &'static str;

    /// Compile a shader. The shader is deleted again if compilation fails.
    fn create_shader(&self, stage: ShaderStage, source: &str) -> GpuResult<ShaderId>;

    /// Delete a shader.
    fn delete_shader(&self, shader: ShaderId);

    /// Create an empty program.
    fn create_program(&self) -> GpuResult<ProgramId>;

    /// Attach a shader to a program.
    fn attach_shader(&self, program: ProgramId, shader: ShaderId);

    /// Detach a shader from a program.
    fn detach_shader(&self, program: ProgramId, shader: ShaderId);

    /// Bind a vertex attribute index to a name. Takes effect on next link.
    fn bind_attrib_location(&self, program: ProgramId, index: u32, name: &str);

    /// Link a program.
    fn link_program(&self, program: ProgramId) -> GpuResult<()>;

    /// Delete a program.
    fn delete_program(&self, program: ProgramId);

    /// Make a program current, or none.
    fn use_program(&self, program: Option<ProgramId>);

    /// Location of an active uniform.
    fn uniform_location(&self, program: ProgramId, name: &str) -> Option<UniformLocation>;

    /// Set a `float` uniform of the current program.
    fn set_uniform_f32(&self, location: UniformLocation, value: f32);

    /// Set a `vec3` uniform of the current program.
    fn set_uniform_vec3(&self, location: UniformLocation, value: [f32; 3]);

    /// Set an `int` (or sampler) uniform of the current program.
    fn set_uniform_i32(&self, location: UniformLocation, value: i32);

    /// Set a `mat4` uniform of the current program, column-major.
    fn set_uniform_mat4(&self, location: UniformLocation, value: &[f32; 16]);

    /// Create a texture and specify its image.
    fn create_texture(&self, upload: &TextureUpload<'_>) -> GpuResult<TextureId>;

    /// Respecify the image of an existing texture.
    fn update_texture(&self, texture: TextureId, upload: &TextureUpload<'_>) -> GpuResult<()>;

    /// Bind a texture to a unit.
    fn bind_texture(&self, unit: u32, target: TextureTarget, texture: TextureId);

    /// Delete a texture.
    fn delete_texture(&self, texture: TextureId);

    /// Create an indexed quad. Attribute 0 takes `positions` (vec3), attribute
    /// 1 takes `tex_coords` (vec2).
    fn create_quad(&self, positions: &[f32], tex_coords: &[f32], indices: &[u32]) -> GpuResult<QuadId>;

    /// Draw `index_count` indices of a quad as triangles.
    fn draw_quad(&self, quad: QuadId, index_count: u32);

    /// Delete a quad and its buffers.
    fn delete_quad(&self, quad: QuadId);

    /// Clear the color buffer.
    fn clear(&self, color: [f32; 4]);

    /// Set the viewport.
    fn viewport(&self, x: i32, y: i32, width: u32, height: u32);
}
