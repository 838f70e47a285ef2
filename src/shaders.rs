//! GLSL ES shader sources and compilation helpers.
//!
//! All shaders target GLSL ES 1.00 (OpenGL ES 2.0), the lowest common
//! denominator on the devices that host a sticker surface.

use glow::HasContext;

use crate::error::ShaderError;

/// Vertex shader for tinted, textured skeleton geometry.
///
/// # Attributes and uniforms
///
/// | Name          | Type   | Description                            |
/// |---------------|--------|----------------------------------------|
/// | `a_Position`  | `vec2` | World-space vertex position            |
/// | `a_Color`     | `vec4` | Per-vertex tint (slot × attachment)    |
/// | `a_TexCoords` | `vec2` | Atlas UV                               |
/// | `u_MVPMatrix` | `mat4` | Model-view-projection, column-major    |
pub const STICKER_VERTEX_SRC: &str = r"
attribute vec2 a_Position;
attribute vec4 a_Color;
attribute vec2 a_TexCoords;

uniform mat4 u_MVPMatrix;

varying vec4 v_Color;
varying vec2 v_TexCoords;

void main() {
    v_Color = a_Color;
    v_TexCoords = a_TexCoords;
    gl_Position = u_MVPMatrix * vec4(a_Position, 0.0, 1.0);
}
";

/// Fragment shader: samples the atlas page and multiplies by the tint.
pub const STICKER_FRAGMENT_SRC: &str = r"
precision mediump float;

varying vec4 v_Color;
varying vec2 v_TexCoords;

uniform sampler2D u_Texture;

void main() {
    gl_FragColor = texture2D(u_Texture, v_TexCoords) * v_Color;
}
";

/// Compile a shader program from vertex and fragment source strings.
///
/// The compiled shader objects are detached and deleted after successful
/// linking, so only the program handle needs to be cleaned up by the caller.
/// Compiler and linker diagnostics are logged before being returned.
///
/// # Safety
///
/// Requires a valid, current OpenGL context.
///
/// # Errors
///
/// Returns [`ShaderError`] if shader compilation or program linking fails.
pub unsafe fn compile_program(
    gl: &glow::Context,
    vertex_src: &str,
    fragment_src: &str,
) -> Result<glow::Program, ShaderError> {
    let vs = unsafe { compile_shader(gl, glow::VERTEX_SHADER, vertex_src) }?;
    let fs = match unsafe { compile_shader(gl, glow::FRAGMENT_SHADER, fragment_src) } {
        Ok(fs) => fs,
        Err(err) => {
            unsafe { gl.delete_shader(vs) };
            return Err(err);
        }
    };
    log::debug!("Compiling shader code: successful");

    unsafe {
        let program = match gl.create_program() {
            Ok(program) => program,
            Err(err) => {
                check_gl_error(gl, "glCreateProgram");
                gl.delete_shader(vs);
                gl.delete_shader(fs);
                return Err(ShaderError::Create(err));
            }
        };

        gl.attach_shader(program, vs);
        gl.attach_shader(program, fs);
        gl.link_program(program);

        if !gl.get_program_link_status(program) {
            let info = gl.get_program_info_log(program);
            log::error!("Could not link program:\n{info}");
            gl.delete_program(program);
            gl.delete_shader(vs);
            gl.delete_shader(fs);
            return Err(ShaderError::Link(info));
        }

        // Shaders can be detached and deleted after successful linking.
        gl.detach_shader(program, vs);
        gl.detach_shader(program, fs);
        gl.delete_shader(vs);
        gl.delete_shader(fs);

        log::debug!("Linking program: successful");
        Ok(program)
    }
}

/// Compile a single shader stage (vertex or fragment) from source.
///
/// # Safety
///
/// Requires a valid, current OpenGL context.
unsafe fn compile_shader(
    gl: &glow::Context,
    shader_type: u32,
    source: &str,
) -> Result<glow::Shader, ShaderError> {
    let stage = stage_name(shader_type);

    unsafe {
        let shader = gl.create_shader(shader_type).map_err(|err| {
            check_gl_error(gl, "glCreateShader");
            ShaderError::Create(err)
        })?;
        gl.shader_source(shader, source);
        gl.compile_shader(shader);

        if !gl.get_shader_compile_status(shader) {
            let info = gl.get_shader_info_log(shader);
            log::error!("Could not compile {stage} shader:\n{info}");
            gl.delete_shader(shader);
            return Err(ShaderError::Compile { stage, log: info });
        }

        Ok(shader)
    }
}

/// Poll `glGetError` and log any pending error against `operation`.
///
/// Returns `true` if an error was pending.
///
/// # Safety
///
/// Requires a valid, current OpenGL context.
pub unsafe fn check_gl_error(gl: &glow::Context, operation: &str) -> bool {
    let error = unsafe { gl.get_error() };
    if error == glow::NO_ERROR {
        return false;
    }
    log::error!("GLES error after {operation}: 0x{error:08x}");
    true
}

fn stage_name(shader_type: u32) -> &'static str {
    if shader_type == glow::VERTEX_SHADER {
        "vertex"
    } else {
        "fragment"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stage_names() {
        assert_eq!(stage_name(glow::VERTEX_SHADER), "vertex");
        assert_eq!(stage_name(glow::FRAGMENT_SHADER), "fragment");
    }

    #[test]
    fn sources_declare_the_bound_names() {
        for name in ["a_Position", "a_Color", "a_TexCoords", "u_MVPMatrix"] {
            assert!(STICKER_VERTEX_SRC.contains(name), "{name} missing");
        }
        assert!(STICKER_FRAGMENT_SRC.contains("u_Texture"));
        // GLES2 fragment shaders have no default float precision.
        assert!(STICKER_FRAGMENT_SRC.contains("precision mediump float"));
    }
}
