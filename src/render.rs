//! The GL side of a sticker: program, texture, vertex buffers, blend state
//! and the model-view-projection transform.

use std::path::Path;
use std::sync::Arc;

use glam::{Mat4, Vec3};
use glow::HasContext;

use crate::error::StickerError;
use crate::geometry::BatchSink;
use crate::shaders::{self, check_gl_error};
use crate::texture;
use crate::types::{
    BlendFunc, BlendMode, FrameGeometry, COLOR_COMPONENTS, POSITION_COMPONENTS,
    TEXCOORD_COMPONENTS,
};

/// Near clip plane of the projection.
const NEAR: f32 = 2.0;
/// Far clip plane of the projection.
const FAR: f32 = 5.0;
/// Distance of the camera from the sticker plane, between [`NEAR`] and [`FAR`].
const EYE_DISTANCE: f32 = 3.0;

/// Attribute sizes are tiny, so the cast can never wrap.
#[expect(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
const fn gl_int(value: usize) -> i32 {
    value as i32
}

/// Byte stride of a tightly packed float attribute with `components` floats.
const fn float_stride(components: usize) -> i32 {
    gl_int(components * std::mem::size_of::<f32>())
}

/// Orthographic projection spanning `±half_extent` vertically and
/// `±half_extent * width / height` horizontally.
///
/// Returns `None` when either dimension is zero.
#[must_use]
pub fn orthographic_projection(width: u32, height: u32, half_extent: f32) -> Option<Mat4> {
    if width == 0 || height == 0 {
        return None;
    }
    // Precision loss is acceptable: viewport dimensions are small relative to
    // the f32 mantissa.
    #[expect(clippy::cast_precision_loss)]
    let ratio = width as f32 / height as f32;
    Some(Mat4::orthographic_rh_gl(
        -ratio * half_extent,
        ratio * half_extent,
        -half_extent,
        half_extent,
        NEAR,
        FAR,
    ))
}

/// Camera on the +Z axis looking at the origin, +Y up.
#[must_use]
pub fn view_matrix() -> Mat4 {
    Mat4::look_at_rh(Vec3::new(0.0, 0.0, EYE_DISTANCE), Vec3::ZERO, Vec3::Y)
}

/// Rotation about Z (in degrees) followed by a translation.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct Transform {
    /// Rotation in degrees, counter-clockwise.
    pub angle: f32,
    /// World-space translation.
    pub translation: Vec3,
}

impl Transform {
    /// `translate(t) * rotate_z(angle)`.
    #[must_use]
    pub fn model_matrix(&self) -> Mat4 {
        Mat4::from_translation(self.translation) * Mat4::from_rotation_z(self.angle.to_radians())
    }
}

/// `projection * view * model`.
#[must_use]
pub fn model_view_projection(projection: Mat4, view: Mat4, transform: &Transform) -> Mat4 {
    projection * view * transform.model_matrix()
}

/// Attribute locations and uniforms of the sticker program.
struct ProgramLocations {
    position: u32,
    color: u32,
    tex_coords: u32,
    mvp: Option<glow::UniformLocation>,
    texture: Option<glow::UniformLocation>,
}

/// GL buffers holding one uploaded batch.
#[derive(Copy, Clone)]
struct BatchBuffers {
    position: glow::Buffer,
    color: glow::Buffer,
    tex_coords: glow::Buffer,
}

/// Draws sticker geometry into the current framebuffer.
///
/// Owns one shader program, one atlas texture and the three vertex buffers
/// of the most recent batch. Buffers are recreated wholesale on every
/// [`upload_buffers`](Self::upload_buffers), never partially updated.
pub struct StickerRenderer {
    gl: Arc<glow::Context>,
    program: glow::Program,
    locations: ProgramLocations,
    texture: Option<glow::Texture>,
    buffers: Option<BatchBuffers>,
    view: Mat4,
    projection: Mat4,
    transform: Transform,
    half_extent: f32,
    destroyed: bool,
}

impl StickerRenderer {
    /// Compile the program and load the atlas texture.
    ///
    /// A texture that fails to load is logged and left unset; see
    /// [`has_texture`](Self::has_texture).
    ///
    /// # Safety
    ///
    /// The `gl` context must be current and valid.
    ///
    /// # Errors
    ///
    /// Returns an error if the program cannot be built or a required
    /// attribute is missing from it.
    pub unsafe fn new(
        gl: Arc<glow::Context>,
        texture_path: &Path,
        half_extent: f32,
    ) -> Result<Self, StickerError> {
        let program = unsafe {
            shaders::compile_program(&gl, shaders::STICKER_VERTEX_SRC, shaders::STICKER_FRAGMENT_SRC)?
        };

        let attrib = |name: &str| unsafe { gl.get_attrib_location(program, name) };
        let (Some(position), Some(color), Some(tex_coords)) =
            (attrib("a_Position"), attrib("a_Color"), attrib("a_TexCoords"))
        else {
            unsafe { gl.delete_program(program) };
            return Err(shaders_missing_attribute());
        };

        let locations = unsafe {
            ProgramLocations {
                position,
                color,
                tex_coords,
                mvp: gl.get_uniform_location(program, "u_MVPMatrix"),
                texture: gl.get_uniform_location(program, "u_Texture"),
            }
        };

        let texture = unsafe { texture::load_texture(&gl, texture_path) }.ok();
        log::debug!("Init OpenGL: successful");

        Ok(Self {
            gl,
            program,
            locations,
            texture,
            buffers: None,
            view: view_matrix(),
            projection: Mat4::IDENTITY,
            transform: Transform::default(),
            half_extent,
            destroyed: false,
        })
    }

    /// Whether the atlas texture loaded. Drawing is skipped without it.
    pub fn has_texture(&self) -> bool {
        self.texture.is_some()
    }

    /// Set the sticker's rotation (degrees) and translation.
    pub fn set_angle_and_translation(&mut self, angle: f32, translation: Vec3) {
        self.transform = Transform { angle, translation };
    }

    /// The current model transform.
    pub fn transform(&self) -> Transform {
        self.transform
    }

    /// The MVP for the current projection and transform, recomputed on
    /// every call.
    pub fn mvp(&self) -> Mat4 {
        model_view_projection(self.projection, self.view, &self.transform)
    }

    /// Update the viewport and the projection for a new surface size.
    ///
    /// A zero width or height is ignored and the previous projection kept.
    ///
    /// # Safety
    ///
    /// Requires the context passed to [`new`](Self::new) to be current.
    pub unsafe fn resize(&mut self, width: u32, height: u32) {
        let Some(projection) = orthographic_projection(width, height, self.half_extent) else {
            log::warn!("Ignoring resize to {width}x{height}");
            return;
        };
        self.projection = projection;

        let w = i32::try_from(width).unwrap_or(i32::MAX);
        let h = i32::try_from(height).unwrap_or(i32::MAX);
        unsafe { self.gl.viewport(0, 0, w, h) };
    }

    /// Clear the color buffer.
    ///
    /// # Safety
    ///
    /// Requires the context passed to [`new`](Self::new) to be current.
    pub unsafe fn clear(&self, color: [f32; 4]) {
        unsafe {
            self.gl.clear_color(color[0], color[1], color[2], color[3]);
            self.gl.clear(glow::COLOR_BUFFER_BIT);
        }
    }

    /// Enable blending and apply `func`.
    ///
    /// # Safety
    ///
    /// Requires the context passed to [`new`](Self::new) to be current.
    pub unsafe fn apply_blend(&self, func: BlendFunc) {
        unsafe {
            self.gl.enable(glow::BLEND);
            self.gl
                .blend_func_separate(func.src_rgb, func.dst_rgb, func.src_alpha, func.dst_alpha);
        }
    }

    /// Replace the vertex buffers with fresh ones holding `geometry`.
    ///
    /// # Safety
    ///
    /// Requires the context passed to [`new`](Self::new) to be current.
    ///
    /// # Errors
    ///
    /// Returns an error if GL cannot create a buffer.
    pub unsafe fn upload_buffers(&mut self, geometry: &FrameGeometry) -> Result<(), StickerError> {
        unsafe { self.delete_buffers() };

        let gl = &self.gl;
        let upload = |data: &[f32], label: &str| -> Result<glow::Buffer, StickerError> {
            unsafe {
                let buffer = gl.create_buffer().map_err(StickerError::Buffer)?;
                gl.bind_buffer(glow::ARRAY_BUFFER, Some(buffer));
                gl.buffer_data_u8_slice(
                    glow::ARRAY_BUFFER,
                    bytemuck::cast_slice(data),
                    glow::STATIC_DRAW,
                );
                check_gl_error(gl, label);
                Ok(buffer)
            }
        };

        let position = upload(&geometry.positions, "glBufferData - vertex data")?;
        let color = match upload(&geometry.colors, "glBufferData - color data") {
            Ok(buffer) => buffer,
            Err(err) => {
                unsafe { gl.delete_buffer(position) };
                return Err(err);
            }
        };
        let tex_coords = match upload(&geometry.tex_coords, "glBufferData - texture coordinates") {
            Ok(buffer) => buffer,
            Err(err) => {
                unsafe {
                    gl.delete_buffer(position);
                    gl.delete_buffer(color);
                }
                return Err(err);
            }
        };

        unsafe { gl.bind_buffer(glow::ARRAY_BUFFER, None) };
        self.buffers = Some(BatchBuffers {
            position,
            color,
            tex_coords,
        });
        Ok(())
    }

    /// Bind the uploaded buffers, texture and MVP, and draw `vertex_count`
    /// vertices as a triangle list.
    ///
    /// Attribute arrays enabled here are disabled again before returning.
    ///
    /// # Safety
    ///
    /// Requires the context passed to [`new`](Self::new) to be current.
    pub unsafe fn bind_and_draw(&self, vertex_count: usize) {
        let (Some(buffers), Some(texture)) = (self.buffers, self.texture) else {
            return;
        };
        let Ok(count) = i32::try_from(vertex_count) else {
            log::error!("Vertex count {vertex_count} exceeds i32::MAX");
            return;
        };

        let gl = &self.gl;
        let loc = &self.locations;
        let mvp = self.mvp().to_cols_array();

        unsafe {
            gl.use_program(Some(self.program));
            check_gl_error(gl, "glUseProgram");

            for (buffer, index, components) in [
                (buffers.position, loc.position, POSITION_COMPONENTS),
                (buffers.color, loc.color, COLOR_COMPONENTS),
                (buffers.tex_coords, loc.tex_coords, TEXCOORD_COMPONENTS),
            ] {
                gl.bind_buffer(glow::ARRAY_BUFFER, Some(buffer));
                gl.enable_vertex_attrib_array(index);
                gl.vertex_attrib_pointer_f32(
                    index,
                    gl_int(components),
                    glow::FLOAT,
                    false,
                    float_stride(components),
                    0,
                );
            }
            check_gl_error(gl, "glVertexAttribPointer");

            gl.active_texture(glow::TEXTURE0);
            gl.bind_texture(glow::TEXTURE_2D, Some(texture));
            gl.uniform_1_i32(loc.texture.as_ref(), 0);

            gl.uniform_matrix_4_f32_slice(loc.mvp.as_ref(), false, &mvp);
            check_gl_error(gl, "glUniformMatrix4fv");

            gl.draw_arrays(glow::TRIANGLES, 0, count);
            check_gl_error(gl, "glDrawArrays");

            gl.disable_vertex_attrib_array(loc.position);
            gl.disable_vertex_attrib_array(loc.color);
            gl.disable_vertex_attrib_array(loc.tex_coords);
            gl.bind_buffer(glow::ARRAY_BUFFER, None);
            gl.bind_texture(glow::TEXTURE_2D, None);
        }
    }

    unsafe fn delete_buffers(&mut self) {
        if let Some(buffers) = self.buffers.take() {
            unsafe {
                self.gl.delete_buffer(buffers.position);
                self.gl.delete_buffer(buffers.color);
                self.gl.delete_buffer(buffers.tex_coords);
            }
        }
    }

    /// Delete every GL object this renderer owns. Later calls are no-ops.
    ///
    /// # Safety
    ///
    /// Must be called with the same GL context that was used to create the
    /// renderer, while it is current.
    pub unsafe fn destroy(&mut self) {
        if self.destroyed {
            return;
        }
        self.destroyed = true;
        unsafe {
            self.delete_buffers();
            if let Some(texture) = self.texture.take() {
                self.gl.delete_texture(texture);
            }
            self.gl.delete_program(self.program);
        }
    }

    /// Forget every GL object without deleting it, for when the owning
    /// context is gone and its names are already invalid.
    pub fn abandon(&mut self) {
        self.buffers = None;
        self.texture = None;
        self.destroyed = true;
    }
}

fn shaders_missing_attribute() -> StickerError {
    let err = crate::error::ShaderError::Link(
        "program is missing a_Position, a_Color or a_TexCoords".to_string(),
    );
    log::error!("{err}");
    StickerError::Shader(err)
}

/// Adapts a [`StickerRenderer`] to the extractor's [`BatchSink`]: each flush
/// uploads the batch and draws it immediately.
pub struct GlBatchSink<'a> {
    renderer: &'a mut StickerRenderer,
}

impl<'a> GlBatchSink<'a> {
    /// Wrap a renderer whose context is current.
    ///
    /// # Safety
    ///
    /// The renderer's context must stay current for the sink's lifetime.
    pub unsafe fn new(renderer: &'a mut StickerRenderer) -> Self {
        Self { renderer }
    }
}

impl BatchSink for GlBatchSink<'_> {
    fn set_blend_mode(&mut self, mode: BlendMode) {
        // SAFETY: guaranteed by `GlBatchSink::new`.
        unsafe { self.renderer.apply_blend(mode.blend_func()) };
    }

    fn flush(&mut self, geometry: &FrameGeometry) {
        // SAFETY: guaranteed by `GlBatchSink::new`.
        unsafe {
            if let Err(err) = self.renderer.upload_buffers(geometry) {
                log::error!("Skipping batch: {err}");
                return;
            }
            self.renderer.bind_and_draw(geometry.vertex_count());
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use glam::Vec4;

    fn assert_close(actual: f32, expected: f32) {
        assert!(
            (actual - expected).abs() < 1e-4,
            "expected {expected}, got {actual}"
        );
    }

    /// Horizontal and vertical half-extents recovered from an ortho matrix.
    fn half_extents(m: Mat4) -> (f32, f32) {
        (1.0 / m.x_axis.x, 1.0 / m.y_axis.y)
    }

    #[test]
    fn ortho_scales_with_aspect_ratio() {
        let (hx, hy) = half_extents(orthographic_projection(1920, 1080, 1000.0).unwrap());
        assert_close(hx, 1000.0 * 1920.0 / 1080.0);
        assert_close(hy, 1000.0);

        let (hx, hy) = half_extents(orthographic_projection(500, 1000, 1000.0).unwrap());
        assert_close(hx, 500.0);
        assert_close(hy, 1000.0);
    }

    #[test]
    fn ortho_rejects_zero_dimensions() {
        assert!(orthographic_projection(800, 0, 1000.0).is_none());
        assert!(orthographic_projection(0, 100, 1000.0).is_none());
        assert!(orthographic_projection(0, 0, 1000.0).is_none());
    }

    #[test]
    fn mvp_maps_world_extent_to_clip_edges() {
        let projection = orthographic_projection(1000, 1000, 1000.0).unwrap();
        let mvp = model_view_projection(projection, view_matrix(), &Transform::default());

        let top_right = mvp * Vec4::new(1000.0, 1000.0, 0.0, 1.0);
        assert_close(top_right.x, 1.0);
        assert_close(top_right.y, 1.0);
        // The sticker plane sits between the clip planes.
        assert!(top_right.z.abs() < 1.0);
    }

    #[test]
    fn model_rotates_then_translates() {
        let transform = Transform {
            angle: 90.0,
            translation: Vec3::new(10.0, 0.0, 0.0),
        };
        let p = transform.model_matrix() * Vec4::new(1.0, 0.0, 0.0, 1.0);
        assert_close(p.x, 10.0);
        assert_close(p.y, 1.0);
    }

    #[test]
    fn float_strides() {
        assert_eq!(float_stride(POSITION_COMPONENTS), 8);
        assert_eq!(float_stride(COLOR_COMPONENTS), 16);
        assert_eq!(float_stride(TEXCOORD_COMPONENTS), 8);
    }
}
