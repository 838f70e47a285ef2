//! Host-facing surface callbacks.
//!
//! A [`StickerSurface`] mirrors the lifecycle a platform GL view drives on
//! its render thread: created, changed, draw frame, destroyed. The host owns
//! the surface value and passes it into each callback, so there is no
//! process-wide sticker instance.

use std::sync::Arc;
use std::time::Instant;

use crate::config::StickerConfig;
use crate::geometry::FrameStats;
use crate::skeleton::SkeletonBackend;
use crate::sticker::{ContextId, Sticker};

/// Owns at most one [`Sticker`] and forwards surface callbacks to it.
///
/// Every callback is a no-op until
/// [`on_surface_created`](Self::on_surface_created) has produced a sticker.
pub struct StickerSurface<B: SkeletonBackend + Clone> {
    config: StickerConfig,
    backend: B,
    sticker: Option<Sticker<B>>,
}

impl<B: SkeletonBackend + Clone> StickerSurface<B> {
    /// A surface that will build stickers from `config` using `backend`.
    pub fn new(config: StickerConfig, backend: B) -> Self {
        Self {
            config,
            backend,
            sticker: None,
        }
    }

    /// The live sticker, if any.
    pub fn sticker(&self) -> Option<&Sticker<B>> {
        self.sticker.as_ref()
    }

    /// Mutable access to the live sticker, e.g. to move it.
    pub fn sticker_mut(&mut self) -> Option<&mut Sticker<B>> {
        self.sticker.as_mut()
    }

    /// A (new) GL context is ready. Any previous sticker belonged to a dead
    /// context and is dropped without GL teardown.
    ///
    /// # Safety
    ///
    /// `gl` must be current on this thread and `context` must identify it.
    pub unsafe fn on_surface_created(&mut self, gl: Arc<glow::Context>, context: ContextId) {
        if let Some(mut old) = self.sticker.take() {
            unsafe { old.destroy(context) };
        }

        match unsafe { Sticker::new(gl, self.config.clone(), self.backend.clone(), context) } {
            Ok(sticker) => self.sticker = Some(sticker),
            Err(err) => log::error!("Sticker init failed: {err}"),
        }
    }

    /// The surface was resized.
    ///
    /// # Safety
    ///
    /// The sticker's context must be current.
    pub unsafe fn on_surface_changed(&mut self, width: u32, height: u32) {
        if let Some(sticker) = &mut self.sticker {
            unsafe { sticker.resize(width, height) };
        }
    }

    /// Draw one frame at the current monotonic time.
    ///
    /// # Safety
    ///
    /// The sticker's context must be current.
    pub unsafe fn on_draw_frame(&mut self) -> Option<FrameStats> {
        let sticker = self.sticker.as_mut()?;
        unsafe { sticker.draw(Instant::now()) }
    }

    /// Tear down the sticker. GL objects are only deleted if `current` is
    /// the context the sticker was created in.
    ///
    /// # Safety
    ///
    /// `current` must identify the context current on this thread, if any.
    pub unsafe fn destroy(&mut self, current: ContextId) {
        if let Some(mut sticker) = self.sticker.take() {
            unsafe { sticker.destroy(current) };
        }
    }
}
