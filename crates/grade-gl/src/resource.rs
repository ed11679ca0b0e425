//! Owning handles for backend objects.
//!
//! Each handle keeps its backend alive and deletes the object on drop, so a
//! replaced program or texture set is released exactly once.

use std::fmt;
use std::rc::Rc;

use crate::backend::{GraphicsBackend, ProgramId, QuadId, ShaderId, TextureId};

macro_rules! owned {
    ($(#[$meta:meta])* $name:ident, $id:ty, $delete:ident) => {
        $(#[$meta])*
        pub struct $name<B: GraphicsBackend> {
            backend: Rc<B>,
            id: $id,
        }

        impl<B: GraphicsBackend> $name<B> {
            /// Take ownership of `id`.
            pub fn new(backend: Rc<B>, id: $id) -> Self {
                Self { backend, id }
            }

            /// Raw handle.
            pub fn id(&self) -> $id {
                self.id
            }
        }

        impl<B: GraphicsBackend> Drop for $name<B> {
            fn drop(&mut self) {
                self.backend.$delete(self.id);
            }
        }

        impl<B: GraphicsBackend> fmt::Debug for $name<B> {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.debug_tuple(stringify!($name)).field(&self.id.0).finish()
            }
        }
    };
}

owned!(
    /// Compiled shader.
    OwnedShader, ShaderId, delete_shader
);
owned!(
    /// Program object.
    OwnedProgram, ProgramId, delete_program
);
owned!(
    /// Texture object.
    OwnedTexture, TextureId, delete_texture
);
owned!(
    /// Quad geometry.
    OwnedQuad, QuadId, delete_quad
);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{
        FilterMode, HeadlessBackend, TextureFormat, TextureTarget, TextureUpload,
    };

    #[test]
    fn drop_deletes() {
        let backend = Rc::new(HeadlessBackend::new());
        let upload = TextureUpload {
            target: TextureTarget::Texture2D,
            unit: 0,
            width: 1,
            height: 1,
            depth: 1,
            format: TextureFormat::Rgba32F,
            filter: FilterMode::Linear,
            data: &[0.0; 4],
        };
        let id = backend.create_texture(&upload).unwrap();
        let owned = OwnedTexture::new(backend.clone(), id);
        assert_eq!(backend.live_textures(), 1);
        drop(owned);
        assert_eq!(backend.live_textures(), 0);
        assert_eq!(backend.stats().textures_deleted, 1);
    }
}
