//! Error types for every fallible stage of sticker setup.
//!
//! None of these are fatal to the host: each failure is logged where it
//! happens and leaves the sticker in a state where drawing is skipped.

use std::path::PathBuf;

use thiserror::Error;

use crate::skeleton::LoadStage;

/// Shader compilation or program linking failure.
#[derive(Error, Debug)]
pub enum ShaderError {
    /// A GL object could not be created (usually a lost context).
    #[error("Failed to create GL object: {0}")]
    Create(String),
    /// One stage failed to compile.
    #[error("Could not compile {stage} shader: {log}")]
    Compile {
        /// `"vertex"` or `"fragment"`.
        stage: &'static str,
        /// Compiler diagnostic.
        log: String,
    },
    /// The program failed to link.
    #[error("Could not link program: {0}")]
    Link(String),
}

/// Texture decode or upload failure.
#[derive(Error, Debug)]
pub enum TextureError {
    /// The image file could not be read.
    #[error("Failed to read image {path}: {source}")]
    Io {
        /// The offending path.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },
    /// The image bytes could not be decoded.
    #[error("Failed to decode image: {0}")]
    Decode(#[from] image::ImageError),
    /// GL refused to create a texture name.
    #[error("Failed to create texture: {0}")]
    Create(String),
    /// The decoded image does not fit GL's `i32` size parameters.
    #[error("Image dimensions {width}x{height} are too large")]
    TooLarge {
        /// Decoded width.
        width: u32,
        /// Decoded height.
        height: u32,
    },
}

/// Skeleton loading or animation state failure.
#[derive(Error, Debug)]
pub enum AnimationError {
    /// One step of the load sequence failed; everything created before it
    /// has already been released.
    #[error("Failed to load {stage}: {reason}")]
    Load {
        /// The step that failed.
        stage: LoadStage,
        /// Runtime-provided description.
        reason: String,
    },
    /// The adapter was asked to initialize after being disposed.
    #[error("Animation adapter already disposed")]
    Disposed,
}

/// Configuration loading failure.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("Failed to read config {path}: {source}")]
    Io {
        /// The offending path.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },
    /// The JSON did not match [`StickerConfig`](crate::StickerConfig).
    #[error("Invalid sticker config: {0}")]
    Parse(#[from] serde_json::Error),
    /// A value parsed but is out of range.
    #[error("Invalid sticker config: {0}")]
    Invalid(String),
}

/// Umbrella error returned by [`Sticker::new`](crate::Sticker::new).
#[derive(Error, Debug)]
pub enum StickerError {
    /// Program creation failed.
    #[error(transparent)]
    Shader(#[from] ShaderError),
    /// Texture creation failed.
    #[error(transparent)]
    Texture(#[from] TextureError),
    /// Buffer creation failed.
    #[error("Failed to create buffer: {0}")]
    Buffer(String),
}
