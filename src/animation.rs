//! Owns the skeleton runtime and drives its animation clock.

use std::time::{Duration, Instant};

use crate::config::StickerAssets;
use crate::error::AnimationError;
use crate::skeleton::{SkeletonBackend, SkeletonRuntime};

/// Lifecycle of an [`AnimationAdapter`].
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum AdapterState {
    /// Nothing loaded yet, or the last load failed.
    Uninitialized,
    /// The backend returned a runtime; the default animation is not applied yet.
    AssetsLoaded,
    /// Posed and ready to advance and draw.
    Ready,
    /// Released for good.
    Disposed,
}

/// Wraps a [`SkeletonBackend`] and the runtime it loads.
pub struct AnimationAdapter<B: SkeletonBackend> {
    backend: B,
    assets: StickerAssets,
    default_mix: f32,
    state: AdapterState,
    runtime: Option<B::Runtime>,
}

impl<B: SkeletonBackend> AnimationAdapter<B> {
    /// Create an adapter; nothing is loaded until [`initialize`](Self::initialize).
    pub fn new(backend: B, assets: StickerAssets, default_mix: f32) -> Self {
        Self {
            backend,
            assets,
            default_mix,
            state: AdapterState::Uninitialized,
            runtime: None,
        }
    }

    /// Current lifecycle state.
    pub fn state(&self) -> AdapterState {
        self.state
    }

    /// Whether [`advance`](Self::advance) and drawing will do anything.
    pub fn is_ready(&self) -> bool {
        self.state == AdapterState::Ready
    }

    /// The loaded runtime, if ready.
    pub fn runtime(&self) -> Option<&B::Runtime> {
        self.runtime.as_ref().filter(|_| self.is_ready())
    }

    /// Load the skeleton and pose it with the default animation at time zero.
    ///
    /// On failure everything the backend created has been released and the
    /// adapter stays [`Uninitialized`](AdapterState::Uninitialized), so the
    /// call may be retried. Calling this while already ready is a no-op.
    ///
    /// # Errors
    ///
    /// Returns [`AnimationError::Disposed`] after [`dispose`](Self::dispose),
    /// or the backend's load error.
    pub fn initialize(&mut self) -> Result<(), AnimationError> {
        match self.state {
            AdapterState::Ready => return Ok(()),
            AdapterState::Disposed => return Err(AnimationError::Disposed),
            AdapterState::Uninitialized | AdapterState::AssetsLoaded => {}
        }

        let mut runtime = match self.backend.load(&self.assets, self.default_mix) {
            Ok(runtime) => runtime,
            Err(err) => {
                log::error!("Init skeleton failed: {err}");
                self.state = AdapterState::Uninitialized;
                return Err(err);
            }
        };
        self.state = AdapterState::AssetsLoaded;

        // Pose the setup frame so the first draw has valid world vertices.
        runtime.advance(0.0);
        self.runtime = Some(runtime);
        self.state = AdapterState::Ready;
        log::debug!(
            "Init skeleton: successful (animation `{}`)",
            self.assets.default_animation
        );
        Ok(())
    }

    /// Step the animation by `delta` and recompute world transforms.
    pub fn advance(&mut self, delta: Duration) {
        if self.state != AdapterState::Ready {
            log::warn!("advance called while {:?}", self.state);
            return;
        }
        let Some(runtime) = self.runtime.as_mut() else {
            return;
        };
        let seconds = delta.as_secs_f32();
        log::trace!("Animation update - delta time = {seconds}");
        runtime.advance(seconds);
    }

    /// Release the runtime. Safe to call more than once.
    pub fn dispose(&mut self) {
        if self.state == AdapterState::Disposed {
            return;
        }
        if self.runtime.take().is_some() {
            log::debug!("Dispose skeleton runtime");
        }
        self.state = AdapterState::Disposed;
    }
}

/// Measures the time between draw calls on the monotonic clock.
///
/// The first tick after creation or [`reset`](Self::reset) reports zero, so a
/// long gap between setup and the first frame never jumps the animation.
#[derive(Clone, Debug, Default)]
pub struct FrameClock {
    last: Option<Instant>,
}

impl FrameClock {
    /// A clock that has not ticked yet.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `now` and return the time since the previous tick.
    pub fn tick(&mut self, now: Instant) -> Duration {
        let elapsed = self
            .last
            .map_or(Duration::ZERO, |last| now.saturating_duration_since(last));
        self.last = Some(now);
        elapsed
    }

    /// Forget the previous tick.
    pub fn reset(&mut self) {
        self.last = None;
    }
}
