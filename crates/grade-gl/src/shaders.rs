//! GLSL wrapper templates.
//!
//! The vertex stage is fixed. Fragment stages sample the source image on
//! unit 0 and either pass it through or hand it to the processor's entry
//! function, whose text is spliced in verbatim.

use grade_core::{GlslVersion, GpuShaderDesc};

/// Vertex attribute index of `in_position`.
pub const POSITION_ATTRIB: u32 = 0;
/// Vertex attribute index of `in_texCoord`.
pub const TEX_COORD_ATTRIB: u32 = 1;

/// Model-view-projection uniform.
pub const MVP_UNIFORM: &str = "mvpMat";
/// Source image sampler uniform.
pub const IMAGE_SAMPLER: &str = "imageTex";

/// Fixed vertex stage.
pub fn vertex_source(language: GlslVersion) -> String {
    format!(
        r#"{version}

uniform mat4 {mvp};

in vec3 in_position;
in vec2 in_texCoord;

out vec2 vert_texCoord;

void main() {{
    vert_texCoord = in_texCoord;
    gl_Position = {mvp} * vec4(in_position, 1.0);
}}
"#,
        version = language.version_directive(),
        mvp = MVP_UNIFORM,
    )
}

/// Fragment stage that shows the source image unchanged.
pub fn passthrough_fragment(language: GlslVersion) -> String {
    format!(
        r#"{version}

uniform sampler2D {image};

in vec2 vert_texCoord;

out vec4 frag_color;

void main() {{
    frag_color = texture({image}, vert_texCoord);
}}
"#,
        version = language.version_directive(),
        image = IMAGE_SAMPLER,
    )
}

/// Fragment stage running a processor's shader function.
pub fn processor_fragment(desc: &GpuShaderDesc) -> String {
    format!(
        r#"{version}

uniform sampler2D {image};

in vec2 vert_texCoord;

out vec4 frag_color;

{body}
void main() {{
    vec4 inColor = texture({image}, vert_texCoord);
    vec4 outColor = {function}(inColor);
    frag_color = outColor;
}}
"#,
        version = desc.language.version_directive(),
        image = IMAGE_SAMPLER,
        body = desc.text,
        function = desc.function_name,
    )
}
