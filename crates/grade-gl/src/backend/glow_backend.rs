//! OpenGL backend through `glow`.
//!
//! The caller owns context creation and must keep the context current on
//! this thread for the backend's lifetime.

#![allow(unsafe_code)]

use std::cell::RefCell;
use std::collections::HashMap;
use std::num::NonZeroU32;

use glow::HasContext;
use tracing::warn;

use super::{
    FilterMode, GraphicsBackend, ProgramId, QuadId, ShaderId, ShaderStage, TextureFormat,
    TextureId, TextureTarget, TextureUpload, UniformLocation,
};
use crate::error::{GpuError, GpuResult};

fn native<T>(id: u32, wrap: fn(NonZeroU32) -> T) -> Option<T> {
    NonZeroU32::new(id).map(wrap)
}

fn gl_target(target: TextureTarget) -> u32 {
    match target {
        TextureTarget::Texture1D => glow::TEXTURE_1D,
        TextureTarget::Texture2D => glow::TEXTURE_2D,
        TextureTarget::Texture3D => glow::TEXTURE_3D,
    }
}

/// (internal format, pixel format)
fn gl_format(format: TextureFormat) -> (i32, u32) {
    match format {
        TextureFormat::R32F => (glow::R32F as i32, glow::RED),
        TextureFormat::Rgb32F => (glow::RGB32F as i32, glow::RGB),
        TextureFormat::Rgba32F => (glow::RGBA32F as i32, glow::RGBA),
    }
}

fn gl_filter(filter: FilterMode) -> i32 {
    match filter {
        FilterMode::Nearest => glow::NEAREST as i32,
        FilterMode::Linear => glow::LINEAR as i32,
    }
}

/// Vertex array plus its position, texture coordinate and index buffers.
struct QuadBuffers {
    vao: glow::NativeVertexArray,
    buffers: [glow::NativeBuffer; 3],
}

/// Backend over a `glow` context.
pub struct GlowBackend {
    gl: glow::Context,
    quads: RefCell<HashMap<u32, QuadBuffers>>,
}

impl GlowBackend {
    /// Wrap a context.
    pub fn new(gl: glow::Context) -> Self {
        Self { gl, quads: RefCell::new(HashMap::new()) }
    }

    /// The wrapped context.
    pub fn context(&self) -> &glow::Context {
        &self.gl
    }

    fn upload(&self, texture: glow::NativeTexture, upload: &TextureUpload<'_>) -> GpuResult<()> {
        if upload.data.len() != upload.expected_len() {
            return Err(GpuError::Backend {
                reason: format!("expected {} floats, got {}", upload.expected_len(), upload.data.len()),
            });
        }
        let gl = &self.gl;
        let target = gl_target(upload.target);
        let (internal, format) = gl_format(upload.format);
        let pixels = glow::PixelUnpackData::Slice(Some(bytemuck::cast_slice(upload.data)));
        unsafe {
            gl.active_texture(glow::TEXTURE0 + upload.unit);
            gl.bind_texture(target, Some(texture));
            gl.pixel_store_i32(glow::UNPACK_ALIGNMENT, 1);
            match upload.target {
                TextureTarget::Texture1D => gl.tex_image_1d(
                    target, 0, internal, upload.width as i32, 0, format, glow::FLOAT, pixels,
                ),
                TextureTarget::Texture2D => gl.tex_image_2d(
                    target, 0, internal, upload.width as i32, upload.height as i32, 0, format,
                    glow::FLOAT, pixels,
                ),
                TextureTarget::Texture3D => gl.tex_image_3d(
                    target, 0, internal, upload.width as i32, upload.height as i32,
                    upload.depth as i32, 0, format, glow::FLOAT, pixels,
                ),
            }
            let filter = gl_filter(upload.filter);
            gl.tex_parameter_i32(target, glow::TEXTURE_MIN_FILTER, filter);
            gl.tex_parameter_i32(target, glow::TEXTURE_MAG_FILTER, filter);
            for wrap in [glow::TEXTURE_WRAP_S, glow::TEXTURE_WRAP_T, glow::TEXTURE_WRAP_R] {
                gl.tex_parameter_i32(target, wrap, glow::CLAMP_TO_EDGE as i32);
            }
            let error = gl.get_error();
            if error != glow::NO_ERROR {
                return Err(GpuError::Backend { reason: format!("glTexImage error 0x{:04x}", error) });
            }
        }
        Ok(())
    }
}

impl GraphicsBackend for GlowBackend {
    fn name(&self) -> &'static str {
        "glow"
    }

    fn create_shader(&self, stage: ShaderStage, source: &str) -> GpuResult<ShaderId> {
        let kind = match stage {
            ShaderStage::Vertex => glow::VERTEX_SHADER,
            ShaderStage::Fragment => glow::FRAGMENT_SHADER,
        };
        unsafe {
            let shader = self.gl.create_shader(kind).map_err(|reason| GpuError::Backend { reason })?;
            self.gl.shader_source(shader, source);
            self.gl.compile_shader(shader);
            if !self.gl.get_shader_compile_status(shader) {
                let log = self.gl.get_shader_info_log(shader);
                self.gl.delete_shader(shader);
                return Err(GpuError::ShaderCompile { stage, log });
            }
            Ok(ShaderId(shader.0.get()))
        }
    }

    fn delete_shader(&self, shader: ShaderId) {
        if let Some(s) = native(shader.0, glow::NativeShader) {
            unsafe { self.gl.delete_shader(s) }
        }
    }

    fn create_program(&self) -> GpuResult<ProgramId> {
        let program = unsafe { self.gl.create_program() }.map_err(|reason| GpuError::Backend { reason })?;
        Ok(ProgramId(program.0.get()))
    }

    fn attach_shader(&self, program: ProgramId, shader: ShaderId) {
        if let (Some(p), Some(s)) = (native(program.0, glow::NativeProgram), native(shader.0, glow::NativeShader)) {
            unsafe { self.gl.attach_shader(p, s) }
        }
    }

    fn detach_shader(&self, program: ProgramId, shader: ShaderId) {
        if let (Some(p), Some(s)) = (native(program.0, glow::NativeProgram), native(shader.0, glow::NativeShader)) {
            unsafe { self.gl.detach_shader(p, s) }
        }
    }

    fn bind_attrib_location(&self, program: ProgramId, index: u32, name: &str) {
        if let Some(p) = native(program.0, glow::NativeProgram) {
            unsafe { self.gl.bind_attrib_location(p, index, name) }
        }
    }

    fn link_program(&self, program: ProgramId) -> GpuResult<()> {
        let p = native(program.0, glow::NativeProgram)
            .ok_or_else(|| GpuError::ProgramLink { log: "null program".into() })?;
        unsafe {
            self.gl.link_program(p);
            if !self.gl.get_program_link_status(p) {
                return Err(GpuError::ProgramLink { log: self.gl.get_program_info_log(p) });
            }
        }
        Ok(())
    }

    fn delete_program(&self, program: ProgramId) {
        if let Some(p) = native(program.0, glow::NativeProgram) {
            unsafe { self.gl.delete_program(p) }
        }
    }

    fn use_program(&self, program: Option<ProgramId>) {
        let p = program.and_then(|p| native(p.0, glow::NativeProgram));
        unsafe { self.gl.use_program(p) }
    }

    fn uniform_location(&self, program: ProgramId, name: &str) -> Option<UniformLocation> {
        let p = native(program.0, glow::NativeProgram)?;
        unsafe { self.gl.get_uniform_location(p, name) }.map(|loc| UniformLocation(loc.0))
    }

    fn set_uniform_f32(&self, location: UniformLocation, value: f32) {
        let loc = glow::NativeUniformLocation(location.0);
        unsafe { self.gl.uniform_1_f32(Some(&loc), value) }
    }

    fn set_uniform_vec3(&self, location: UniformLocation, value: [f32; 3]) {
        let loc = glow::NativeUniformLocation(location.0);
        unsafe { self.gl.uniform_3_f32(Some(&loc), value[0], value[1], value[2]) }
    }

    fn set_uniform_i32(&self, location: UniformLocation, value: i32) {
        let loc = glow::NativeUniformLocation(location.0);
        unsafe { self.gl.uniform_1_i32(Some(&loc), value) }
    }

    fn set_uniform_mat4(&self, location: UniformLocation, value: &[f32; 16]) {
        let loc = glow::NativeUniformLocation(location.0);
        unsafe { self.gl.uniform_matrix_4_f32_slice(Some(&loc), false, value) }
    }

    fn create_texture(&self, upload: &TextureUpload<'_>) -> GpuResult<TextureId> {
        let texture = unsafe { self.gl.create_texture() }.map_err(|reason| GpuError::Backend { reason })?;
        if let Err(e) = self.upload(texture, upload) {
            unsafe { self.gl.delete_texture(texture) };
            return Err(e);
        }
        Ok(TextureId(texture.0.get()))
    }

    fn update_texture(&self, texture: TextureId, upload: &TextureUpload<'_>) -> GpuResult<()> {
        let t = native(texture.0, glow::NativeTexture)
            .ok_or_else(|| GpuError::Backend { reason: "null texture".into() })?;
        self.upload(t, upload)
    }

    fn bind_texture(&self, unit: u32, target: TextureTarget, texture: TextureId) {
        let t = native(texture.0, glow::NativeTexture);
        unsafe {
            self.gl.active_texture(glow::TEXTURE0 + unit);
            self.gl.bind_texture(gl_target(target), t);
        }
    }

    fn delete_texture(&self, texture: TextureId) {
        if let Some(t) = native(texture.0, glow::NativeTexture) {
            unsafe { self.gl.delete_texture(t) }
        }
    }

    fn create_quad(&self, positions: &[f32], tex_coords: &[f32], indices: &[u32]) -> GpuResult<QuadId> {
        let gl = &self.gl;
        let backend_err = |reason: String| GpuError::Backend { reason };
        unsafe {
            let vao = gl.create_vertex_array().map_err(backend_err)?;
            let mut buffers = Vec::with_capacity(3);
            for _ in 0..3 {
                match gl.create_buffer() {
                    Ok(buffer) => buffers.push(buffer),
                    Err(reason) => {
                        for buffer in buffers {
                            gl.delete_buffer(buffer);
                        }
                        gl.delete_vertex_array(vao);
                        return Err(backend_err(reason));
                    }
                }
            }

            gl.bind_vertex_array(Some(vao));
            for (index, (data, size)) in [(positions, 3), (tex_coords, 2)].into_iter().enumerate() {
                gl.bind_buffer(glow::ARRAY_BUFFER, Some(buffers[index]));
                gl.buffer_data_u8_slice(glow::ARRAY_BUFFER, bytemuck::cast_slice(data), glow::STATIC_DRAW);
                gl.vertex_attrib_pointer_f32(index as u32, size, glow::FLOAT, false, 0, 0);
                gl.enable_vertex_attrib_array(index as u32);
            }
            gl.bind_buffer(glow::ELEMENT_ARRAY_BUFFER, Some(buffers[2]));
            gl.buffer_data_u8_slice(glow::ELEMENT_ARRAY_BUFFER, bytemuck::cast_slice(indices), glow::STATIC_DRAW);

            gl.bind_vertex_array(None);
            gl.bind_buffer(glow::ARRAY_BUFFER, None);

            let buffers: [glow::NativeBuffer; 3] = [buffers[0], buffers[1], buffers[2]];
            let id = vao.0.get();
            self.quads.borrow_mut().insert(id, QuadBuffers { vao, buffers });
            Ok(QuadId(id))
        }
    }

    fn draw_quad(&self, quad: QuadId, index_count: u32) {
        let quads = self.quads.borrow();
        let Some(q) = quads.get(&quad.0) else {
            warn!(quad = quad.0, "draw of unknown quad");
            return;
        };
        unsafe {
            self.gl.bind_vertex_array(Some(q.vao));
            self.gl.draw_elements(glow::TRIANGLES, index_count as i32, glow::UNSIGNED_INT, 0);
            self.gl.bind_vertex_array(None);
        }
    }

    fn delete_quad(&self, quad: QuadId) {
        if let Some(q) = self.quads.borrow_mut().remove(&quad.0) {
            unsafe {
                for buffer in q.buffers {
                    self.gl.delete_buffer(buffer);
                }
                self.gl.delete_vertex_array(q.vao);
            }
        }
    }

    fn clear(&self, color: [f32; 4]) {
        unsafe {
            self.gl.clear_color(color[0], color[1], color[2], color[3]);
            self.gl.clear(glow::COLOR_BUFFER_BIT);
        }
    }

    fn viewport(&self, x: i32, y: i32, width: u32, height: u32) {
        unsafe { self.gl.viewport(x, y, width as i32, height as i32) }
    }
}
