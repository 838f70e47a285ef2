//! Texture loading: image files and solid colors.

use std::path::Path;

use glow::{HasContext, PixelUnpackData};

use crate::error::TextureError;
use crate::shaders::check_gl_error;

/// GL internal format for RGBA textures. GLES2 requires the unsized
/// `RGBA` here rather than `RGBA8`.
#[expect(clippy::cast_possible_wrap)]
const RGBA_INTERNAL_FORMAT: i32 = glow::RGBA as i32;

/// RGBA8 pixels decoded on the CPU, ready for upload.
#[derive(Clone, Debug)]
pub struct DecodedImage {
    /// Tightly packed RGBA8 rows.
    pub pixels: Vec<u8>,
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

/// Decode any supported image format to RGBA8.
///
/// # Errors
///
/// Returns [`TextureError::Decode`] if the bytes are not a supported image.
pub fn decode_rgba8(data: &[u8]) -> Result<DecodedImage, TextureError> {
    let img = image::load_from_memory(data)?.to_rgba8();
    let (width, height) = img.dimensions();
    Ok(DecodedImage {
        pixels: img.into_raw(),
        width,
        height,
    })
}

/// Load an image file into a new `TEXTURE_2D`.
///
/// The texture uses `REPEAT` wrapping and `LINEAR` filtering. On failure the
/// generated texture name is released and the error is logged.
///
/// # Safety
///
/// Requires a valid, current OpenGL context.
///
/// # Errors
///
/// Returns [`TextureError`] if the file cannot be read or decoded, or if GL
/// refuses to create a texture name.
pub unsafe fn load_texture(gl: &glow::Context, path: &Path) -> Result<glow::Texture, TextureError> {
    let decoded = std::fs::read(path)
        .map_err(|source| TextureError::Io {
            path: path.to_path_buf(),
            source,
        })
        .and_then(|bytes| decode_rgba8(&bytes));

    let decoded = match decoded {
        Ok(decoded) => decoded,
        Err(err) => {
            log::error!("Load texture {} failed: {err}", path.display());
            return Err(err);
        }
    };

    let texture = unsafe { upload_rgba(gl, &decoded.pixels, decoded.width, decoded.height) }?;
    log::debug!(
        "Load texture successful: {} ({}x{})",
        path.display(),
        decoded.width,
        decoded.height
    );
    Ok(texture)
}

/// Create a 1×1 texture filled with a single RGBA color.
///
/// # Safety
///
/// Requires a valid, current OpenGL context.
///
/// # Errors
///
/// Returns [`TextureError::Create`] if GL refuses to create a texture name.
pub unsafe fn load_solid_color(
    gl: &glow::Context,
    rgba: [u8; 4],
) -> Result<glow::Texture, TextureError> {
    unsafe { upload_rgba(gl, &rgba, 1, 1) }
}

/// Generate a texture name, configure sampling, and upload RGBA8 pixels.
unsafe fn upload_rgba(
    gl: &glow::Context,
    pixels: &[u8],
    width: u32,
    height: u32,
) -> Result<glow::Texture, TextureError> {
    let (Ok(w), Ok(h)) = (i32::try_from(width), i32::try_from(height)) else {
        log::error!("Texture {width}x{height} exceeds GL size limits");
        return Err(TextureError::TooLarge { width, height });
    };

    let texture = unsafe { gl.create_texture() }.map_err(|err| {
        log::error!("Load texture error: {err}");
        TextureError::Create(err)
    })?;
    unsafe { check_gl_error(gl, "glGenTextures") };

    unsafe {
        gl.bind_texture(glow::TEXTURE_2D, Some(texture));
        set_default_tex_params(gl);
        gl.tex_image_2d(
            glow::TEXTURE_2D,
            0,
            RGBA_INTERNAL_FORMAT,
            w,
            h,
            0,
            glow::RGBA,
            glow::UNSIGNED_BYTE,
            PixelUnpackData::Slice(Some(pixels)),
        );
        check_gl_error(gl, "glTexImage2D");
        gl.bind_texture(glow::TEXTURE_2D, None);
    }

    Ok(texture)
}

/// Set the sampling parameters shared by every sticker texture.
unsafe fn set_default_tex_params(gl: &glow::Context) {
    // GL constant values are small enough that the cast is always safe.
    #[expect(clippy::cast_possible_wrap)]
    unsafe {
        gl.tex_parameter_i32(glow::TEXTURE_2D, glow::TEXTURE_WRAP_S, glow::REPEAT as i32);
        gl.tex_parameter_i32(glow::TEXTURE_2D, glow::TEXTURE_WRAP_T, glow::REPEAT as i32);
        gl.tex_parameter_i32(
            glow::TEXTURE_2D,
            glow::TEXTURE_MIN_FILTER,
            glow::LINEAR as i32,
        );
        gl.tex_parameter_i32(
            glow::TEXTURE_2D,
            glow::TEXTURE_MAG_FILTER,
            glow::LINEAR as i32,
        );
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn encode_png(img: &image::RgbaImage) -> Vec<u8> {
        let mut bytes = Vec::new();
        img.write_to(&mut Cursor::new(&mut bytes), image::ImageFormat::Png)
            .unwrap();
        bytes
    }

    #[test]
    fn decode_png_to_rgba8() {
        let mut img = image::RgbaImage::new(3, 2);
        img.put_pixel(2, 1, image::Rgba([10, 20, 30, 40]));

        let decoded = decode_rgba8(&encode_png(&img)).unwrap();
        assert_eq!((decoded.width, decoded.height), (3, 2));
        assert_eq!(decoded.pixels.len(), 3 * 2 * 4);
        assert_eq!(&decoded.pixels[20..24], &[10, 20, 30, 40]);
    }

    #[test]
    fn decode_rejects_garbage() {
        let err = decode_rgba8(b"definitely not an image").unwrap_err();
        assert!(matches!(err, TextureError::Decode(_)));
    }
}
