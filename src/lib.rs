//! An animated skeletal sticker renderer for OpenGL ES 2.0, using [glow].
//!
//! This crate draws one skinned 2D skeleton (exported from Spine) onto a
//! GLES2 surface. The skeletal-animation runtime does all of the animation
//! work: bone hierarchy, timelines, mesh deformation. This crate advances its
//! clock, walks the draw order, and turns each visible attachment into
//! tinted, textured triangles.
//!
//! # Pipeline
//!
//! Each [`Sticker::draw`] call:
//!
//! 1. measures the time since the previous frame (zero on the first frame),
//! 2. advances the animation and recomputes world transforms,
//! 3. walks the draw order, emitting six vertices per region attachment and
//!    one per triangle index for mesh attachments,
//! 4. draws each contiguous run of same-blend-mode slots as one batch, since
//!    blend state is global to the GL context.
//!
//! # Runtimes
//!
//! The animation runtime sits behind [`SkeletonBackend`] and
//! [`SkeletonRuntime`]. The `spine` feature provides `SpineBackend`, built on
//! the Spine C runtime.
//!
//! # Safety
//!
//! Creating and using a [`Sticker`] requires a valid, current OpenGL
//! context. All rendering methods are `unsafe` because they issue raw GL
//! calls.
//!
//! [glow]: https://docs.rs/glow

mod animation;
mod config;
mod error;
mod geometry;
mod host;
mod render;
mod shaders;
mod skeleton;
#[cfg(feature = "spine")]
mod spine;
mod sticker;
mod texture;
mod types;

pub use animation::{AdapterState, AnimationAdapter, FrameClock};
pub use config::{StickerAssets, StickerConfig, DEFAULT_MIX, WORLD_HALF_EXTENT};
pub use error::{AnimationError, ConfigError, ShaderError, StickerError, TextureError};
pub use geometry::{BatchSink, FrameStats, GeometryExtractor, MAX_WORLD_VERTICES};
pub use host::StickerSurface;
pub use render::{
    model_view_projection, orthographic_projection, view_matrix, GlBatchSink, StickerRenderer,
    Transform,
};
pub use shaders::{check_gl_error, compile_program};
pub use skeleton::{
    AttachmentRef, LoadStage, MeshSource, RegionSource, SkeletonBackend, SkeletonRuntime, SlotDraw,
};
#[cfg(feature = "spine")]
pub use spine::{SpineBackend, SpineRuntime};
pub use sticker::{ContextId, Sticker};
pub use texture::{decode_rgba8, load_solid_color, load_texture, DecodedImage};
pub use types::{BlendFunc, BlendMode, Color, FrameGeometry};
