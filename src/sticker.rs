//! The sticker: one skeleton, one atlas texture, one GL program, drawn once
//! per frame.

use std::sync::Arc;
use std::time::Instant;

use glam::Vec3;

use crate::animation::{AnimationAdapter, FrameClock};
use crate::config::StickerConfig;
use crate::error::StickerError;
use crate::geometry::{FrameStats, GeometryExtractor};
use crate::render::{GlBatchSink, StickerRenderer};
use crate::skeleton::SkeletonBackend;
use crate::types::BlendFunc;

/// Identity of a GL context, as reported by the host (for example the
/// `EGLContext` pointer value).
///
/// GL object names are only meaningful inside the context that created
/// them, so teardown compares the creating context with the current one.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct ContextId(pub usize);

/// An animated skeleton rendered through GLES2.
///
/// # Example
///
/// ```no_run
/// # use sticker_renderer_glow::{ContextId, Sticker, StickerConfig, SkeletonBackend};
/// # use std::sync::Arc;
/// # fn example<B: SkeletonBackend>(gl: Arc<glow::Context>, config: StickerConfig, backend: B) {
/// let context = ContextId(0x1234);
/// let mut sticker = unsafe { Sticker::new(gl, config, backend, context) }.unwrap();
///
/// // On every surface change:
/// unsafe { sticker.resize(1080, 1920) };
///
/// // Each frame:
/// unsafe { sticker.draw(std::time::Instant::now()) };
///
/// // On teardown, with whatever context is current now:
/// unsafe { sticker.destroy(context) };
/// # }
/// ```
pub struct Sticker<B: SkeletonBackend> {
    renderer: StickerRenderer,
    animation: AnimationAdapter<B>,
    extractor: GeometryExtractor,
    clock: FrameClock,
    clear_color: [f32; 4],
    context: ContextId,
    destroyed: bool,
}

impl<B: SkeletonBackend> Sticker<B> {
    /// Build the GL program and texture, then load the skeleton.
    ///
    /// A skeleton that fails to load is logged and leaves the sticker in a
    /// state where [`draw`](Self::draw) does nothing; see
    /// [`is_renderable`](Self::is_renderable).
    ///
    /// # Safety
    ///
    /// The `gl` context must be current, and `context` must identify it.
    ///
    /// # Errors
    ///
    /// Returns an error if the shader program cannot be built.
    pub unsafe fn new(
        gl: Arc<glow::Context>,
        config: StickerConfig,
        backend: B,
        context: ContextId,
    ) -> Result<Self, StickerError> {
        let StickerConfig {
            assets,
            default_mix,
            world_half_extent,
            clear_color,
        } = config;

        let renderer =
            unsafe { StickerRenderer::new(gl, &assets.texture_path, world_half_extent) }?;

        let mut animation = AnimationAdapter::new(backend, assets, default_mix);
        if let Err(err) = animation.initialize() {
            log::debug!("Sticker created without a skeleton: {err}");
        }

        Ok(Self {
            renderer,
            animation,
            extractor: GeometryExtractor::new(),
            clock: FrameClock::new(),
            clear_color: clear_color.to_array(),
            context,
            destroyed: false,
        })
    }

    /// Whether both the skeleton and the texture are loaded.
    pub fn is_renderable(&self) -> bool {
        !self.destroyed && self.animation.is_ready() && self.renderer.has_texture()
    }

    /// The context this sticker's GL objects belong to.
    pub fn context(&self) -> ContextId {
        self.context
    }

    /// Set the sticker's rotation (degrees) and translation.
    pub fn set_angle_and_translation(&mut self, angle: f32, translation: Vec3) {
        self.renderer.set_angle_and_translation(angle, translation);
    }

    /// Restart elapsed-time measurement; the next draw advances by zero.
    pub fn reset_clock(&mut self) {
        self.clock.reset();
    }

    /// Adapt the projection and viewport to a new surface size.
    ///
    /// # Safety
    ///
    /// Requires this sticker's context to be current.
    pub unsafe fn resize(&mut self, width: u32, height: u32) {
        if self.destroyed {
            return;
        }
        unsafe { self.renderer.resize(width, height) };
    }

    /// Advance the animation to `now` and draw one frame.
    ///
    /// Returns `None` without touching GL if the sticker is not renderable.
    ///
    /// # Safety
    ///
    /// Requires this sticker's context to be current.
    pub unsafe fn draw(&mut self, now: Instant) -> Option<FrameStats> {
        let delta = self.clock.tick(now);
        if !self.is_renderable() {
            log::debug!("Skipping draw: sticker is not renderable");
            return None;
        }

        self.animation.advance(delta);
        let runtime = self.animation.runtime()?;

        unsafe {
            self.renderer.clear(self.clear_color);
            self.renderer.apply_blend(BlendFunc::DEFAULT_ALPHA);
        }

        let mut sink = unsafe { GlBatchSink::new(&mut self.renderer) };
        let stats = self.extractor.rebuild(runtime, &mut sink);
        log::trace!(
            "Drew {} vertices in {} batches ({} meshes dropped)",
            stats.vertices,
            stats.flushes,
            stats.dropped_meshes
        );
        Some(stats)
    }

    /// Release the skeleton and, if `current` is still the context that
    /// created them, the GL objects. Later calls are no-ops.
    ///
    /// # Safety
    ///
    /// `current` must identify the context that is current on this thread
    /// (or one that is known to be gone).
    pub unsafe fn destroy(&mut self, current: ContextId) {
        if self.destroyed {
            return;
        }
        self.destroyed = true;
        self.animation.dispose();

        if current == self.context {
            unsafe { self.renderer.destroy() };
            log::debug!("Sticker destroyed");
        } else {
            log::warn!(
                "Context changed ({:?} -> {current:?}); skipping GL teardown",
                self.context
            );
            self.renderer.abandon();
        }
    }
}
