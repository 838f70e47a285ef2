//! The boundary between this crate and the skeletal-animation runtime.
//!
//! Bone solving, timeline evaluation and mesh skinning all live in the
//! runtime. This module only describes what the renderer needs from it:
//! a way to load a skeleton, step it, and walk its draw order.

use std::fmt;

use crate::config::StickerAssets;
use crate::error::AnimationError;
use crate::types::{BlendMode, Color};

/// One step of the skeleton load sequence, in the order they run.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum LoadStage {
    /// Parse the texture atlas file.
    Atlas,
    /// Parse the skeleton JSON against the atlas.
    SkeletonData,
    /// Instantiate a skeleton from its data.
    Skeleton,
    /// Create the cross-fade table for animation transitions.
    AnimationStateData,
    /// Create the animation state and queue the default animation.
    AnimationState,
}

impl fmt::Display for LoadStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            LoadStage::Atlas => "atlas",
            LoadStage::SkeletonData => "skeleton data",
            LoadStage::Skeleton => "skeleton",
            LoadStage::AnimationStateData => "animation state data",
            LoadStage::AnimationState => "animation state",
        })
    }
}

/// A quad attachment backed by a single atlas region.
pub trait RegionSource {
    /// Attachment tint.
    fn color(&self) -> Color;

    /// UVs of the four corners, as `u, v` pairs.
    fn uvs(&self) -> [f32; 8];

    /// Write the four world-space corners as `x, y` pairs.
    fn compute_world_vertices(&self, out: &mut [f32; 8]);
}

/// A deformable triangle mesh attachment.
pub trait MeshSource {
    /// Attachment tint.
    fn color(&self) -> Color;

    /// Number of floats the world-space vertices occupy (two per vertex).
    fn world_vertices_len(&self) -> usize;

    /// Triangle list as vertex indices.
    fn triangles(&self) -> &[u16];

    /// UVs as `u, v` pairs, parallel to the world vertices.
    fn uvs(&self) -> &[f32];

    /// Write all deformed world vertices into `out[..world_vertices_len()]`.
    fn compute_world_vertices(&self, out: &mut [f32]);
}

/// What a slot currently shows.
pub enum AttachmentRef<'a> {
    /// A textured quad.
    Region(&'a dyn RegionSource),
    /// A textured mesh.
    Mesh(&'a dyn MeshSource),
    /// Bounding boxes, paths, points, clipping: nothing to draw.
    Other,
}

/// A slot as seen while walking the draw order.
pub struct SlotDraw<'a> {
    /// Blend mode declared by the slot's setup data.
    pub blend_mode: BlendMode,
    /// Current slot tint.
    pub color: Color,
    /// The visible attachment, if any.
    pub attachment: Option<AttachmentRef<'a>>,
}

/// A loaded, posable skeleton plus its animation state.
///
/// Dropping a runtime releases everything it owns.
pub trait SkeletonRuntime {
    /// Step the animation state by `delta_seconds`, apply it to the skeleton
    /// and recompute world transforms.
    fn advance(&mut self, delta_seconds: f32);

    /// Skeleton-wide tint.
    fn skeleton_color(&self) -> Color;

    /// Visit every slot in draw order.
    fn for_each_slot(&self, visit: &mut dyn FnMut(&SlotDraw<'_>));
}

/// Loads skeletons for a particular runtime.
pub trait SkeletonBackend {
    /// The runtime produced by a successful load.
    type Runtime: SkeletonRuntime;

    /// Run the load sequence described by [`LoadStage`].
    ///
    /// `default_mix` is the cross-fade duration, in seconds, between any two
    /// animations. The default animation is queued on track 0, looping.
    ///
    /// # Errors
    ///
    /// Returns [`AnimationError::Load`] naming the first stage that failed.
    /// Anything created before that stage must already be released.
    fn load(&self, assets: &StickerAssets, default_mix: f32)
        -> Result<Self::Runtime, AnimationError>;
}

#[cfg(test)]
pub(crate) mod fake {
    //! In-memory runtime used by the extractor and adapter tests.

    use super::*;

    pub struct FakeRegion {
        pub color: Color,
        pub corners: [f32; 8],
        pub uvs: [f32; 8],
    }

    impl RegionSource for FakeRegion {
        fn color(&self) -> Color {
            self.color
        }

        fn uvs(&self) -> [f32; 8] {
            self.uvs
        }

        fn compute_world_vertices(&self, out: &mut [f32; 8]) {
            *out = self.corners;
        }
    }

    pub struct FakeMesh {
        pub color: Color,
        pub vertices: Vec<f32>,
        pub triangles: Vec<u16>,
        pub uvs: Vec<f32>,
    }

    impl MeshSource for FakeMesh {
        fn color(&self) -> Color {
            self.color
        }

        fn world_vertices_len(&self) -> usize {
            self.vertices.len()
        }

        fn triangles(&self) -> &[u16] {
            &self.triangles
        }

        fn uvs(&self) -> &[f32] {
            &self.uvs
        }

        fn compute_world_vertices(&self, out: &mut [f32]) {
            out[..self.vertices.len()].copy_from_slice(&self.vertices);
        }
    }

    pub enum FakeAttachment {
        Region(FakeRegion),
        Mesh(FakeMesh),
        Other,
    }

    pub struct FakeSlot {
        pub blend_mode: BlendMode,
        pub color: Color,
        pub attachment: Option<FakeAttachment>,
    }

    impl FakeSlot {
        pub fn region(blend_mode: BlendMode, region: FakeRegion) -> Self {
            Self {
                blend_mode,
                color: Color::WHITE,
                attachment: Some(FakeAttachment::Region(region)),
            }
        }

        pub fn mesh(blend_mode: BlendMode, mesh: FakeMesh) -> Self {
            Self {
                blend_mode,
                color: Color::WHITE,
                attachment: Some(FakeAttachment::Mesh(mesh)),
            }
        }
    }

    /// A unit quad at `offset` with distinct UVs per corner.
    pub fn quad(offset: f32) -> FakeRegion {
        FakeRegion {
            color: Color::WHITE,
            corners: [
                offset,
                offset,
                offset + 1.0,
                offset,
                offset + 1.0,
                offset + 1.0,
                offset,
                offset + 1.0,
            ],
            uvs: [0.0, 1.0, 1.0, 1.0, 1.0, 0.0, 0.0, 0.0],
        }
    }

    #[derive(Default)]
    pub struct FakeRuntime {
        pub color: Color,
        pub slots: Vec<FakeSlot>,
        pub advances: Vec<f32>,
    }

    impl SkeletonRuntime for FakeRuntime {
        fn advance(&mut self, delta_seconds: f32) {
            self.advances.push(delta_seconds);
        }

        fn skeleton_color(&self) -> Color {
            self.color
        }

        fn for_each_slot(&self, visit: &mut dyn FnMut(&SlotDraw<'_>)) {
            for slot in &self.slots {
                let attachment = slot.attachment.as_ref().map(|a| match a {
                    FakeAttachment::Region(r) => AttachmentRef::Region(r),
                    FakeAttachment::Mesh(m) => AttachmentRef::Mesh(m),
                    FakeAttachment::Other => AttachmentRef::Other,
                });
                visit(&SlotDraw {
                    blend_mode: slot.blend_mode,
                    color: slot.color,
                    attachment,
                });
            }
        }
    }

    /// Backend that fails at a chosen stage, or succeeds with an empty
    /// runtime.
    #[derive(Default)]
    pub struct FakeBackend {
        pub fail_at: Option<LoadStage>,
    }

    impl SkeletonBackend for FakeBackend {
        type Runtime = FakeRuntime;

        fn load(
            &self,
            _assets: &StickerAssets,
            _default_mix: f32,
        ) -> Result<FakeRuntime, AnimationError> {
            match self.fail_at {
                Some(stage) => Err(AnimationError::Load {
                    stage,
                    reason: "injected".to_string(),
                }),
                None => Ok(FakeRuntime {
                    color: Color::WHITE,
                    ..FakeRuntime::default()
                }),
            }
        }
    }
}
