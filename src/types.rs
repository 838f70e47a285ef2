//! Plain data types shared between the extractor and the GL renderer.

use serde::Deserialize;

/// Number of floats per vertex position (`x`, `y`).
pub const POSITION_COMPONENTS: usize = 2;
/// Number of floats per vertex color (`r`, `g`, `b`, `a`).
pub const COLOR_COMPONENTS: usize = 4;
/// Number of floats per texture coordinate (`u`, `v`).
pub const TEXCOORD_COMPONENTS: usize = 2;

/// An RGBA color with `f32` channels in `[0, 1]`.
#[derive(Copy, Clone, Debug, PartialEq, Deserialize)]
pub struct Color {
    /// Red channel.
    pub r: f32,
    /// Green channel.
    pub g: f32,
    /// Blue channel.
    pub b: f32,
    /// Alpha channel.
    pub a: f32,
}

impl Color {
    /// Opaque white, the neutral element for tinting.
    pub const WHITE: Self = Self::new(1.0, 1.0, 1.0, 1.0);

    /// Fully transparent black.
    pub const TRANSPARENT: Self = Self::new(0.0, 0.0, 0.0, 0.0);

    /// Create a color from its four channels.
    #[must_use]
    pub const fn new(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }

    /// Channel-wise product of two colors.
    #[must_use]
    pub fn modulate(self, other: Self) -> Self {
        Self {
            r: self.r * other.r,
            g: self.g * other.g,
            b: self.b * other.b,
            a: self.a * other.a,
        }
    }

    /// The channels as an array, in RGBA order.
    #[must_use]
    pub fn to_array(self) -> [f32; 4] {
        [self.r, self.g, self.b, self.a]
    }
}

impl Default for Color {
    fn default() -> Self {
        Self::WHITE
    }
}

/// How a slot's pixels are combined with what is already in the framebuffer.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Default)]
pub enum BlendMode {
    /// Regular alpha blending.
    #[default]
    Normal,
    /// Adds source color onto the destination.
    Additive,
    /// Multiplies source and destination colors.
    Multiply,
    /// Inverse multiply; lightens the destination.
    Screen,
}

/// Arguments for `glBlendFuncSeparate`.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct BlendFunc {
    /// Source RGB factor.
    pub src_rgb: u32,
    /// Destination RGB factor.
    pub dst_rgb: u32,
    /// Source alpha factor.
    pub src_alpha: u32,
    /// Destination alpha factor.
    pub dst_alpha: u32,
}

impl BlendFunc {
    /// Plain `glBlendFunc(SRC_ALPHA, ONE_MINUS_SRC_ALPHA)`, used before any
    /// slot has selected a mode.
    pub const DEFAULT_ALPHA: Self = Self {
        src_rgb: glow::SRC_ALPHA,
        dst_rgb: glow::ONE_MINUS_SRC_ALPHA,
        src_alpha: glow::SRC_ALPHA,
        dst_alpha: glow::ONE_MINUS_SRC_ALPHA,
    };
}

impl BlendMode {
    /// The GL blend factors for this mode.
    #[must_use]
    pub fn blend_func(self) -> BlendFunc {
        let (src_rgb, dst_rgb) = match self {
            BlendMode::Normal => (glow::SRC_ALPHA, glow::ONE_MINUS_SRC_ALPHA),
            BlendMode::Additive => (glow::SRC_ALPHA, glow::ONE),
            BlendMode::Multiply => (glow::DST_COLOR, glow::ZERO),
            BlendMode::Screen => (glow::ONE, glow::ONE_MINUS_SRC_COLOR),
        };
        BlendFunc {
            src_rgb,
            dst_rgb,
            src_alpha: glow::ONE,
            dst_alpha: glow::ONE_MINUS_SRC_ALPHA,
        }
    }
}

/// Per-frame vertex streams, in draw order.
///
/// All three streams describe the same vertices: vertex `i` lives at
/// `positions[2i..2i+2]`, `colors[4i..4i+4]` and `tex_coords[2i..2i+2]`.
/// Drawn with `glDrawArrays(GL_TRIANGLES, ...)`.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FrameGeometry {
    /// World-space `x, y` pairs.
    pub positions: Vec<f32>,
    /// Tint `r, g, b, a` per vertex.
    pub colors: Vec<f32>,
    /// Atlas `u, v` pairs.
    pub tex_coords: Vec<f32>,
}

impl FrameGeometry {
    /// Number of vertices currently buffered.
    #[must_use]
    pub fn vertex_count(&self) -> usize {
        self.positions.len() / POSITION_COMPONENTS
    }

    /// Whether no vertices are buffered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    /// Drop all buffered vertices, keeping the allocations.
    pub fn clear(&mut self) {
        self.positions.clear();
        self.colors.clear();
        self.tex_coords.clear();
    }

    /// Append one vertex.
    pub fn push_vertex(&mut self, position: [f32; 2], uv: [f32; 2], color: Color) {
        self.positions.extend_from_slice(&position);
        self.tex_coords.extend_from_slice(&uv);
        self.colors.extend_from_slice(&color.to_array());
    }
}
