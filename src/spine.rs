//! [`SkeletonBackend`] over the Spine C runtime, via [rusty_spine].
//!
//! Enabled by the `spine` feature.
//!
//! [rusty_spine]: https://docs.rs/rusty_spine

use std::sync::Arc;

use rusty_spine::{
    AnimationState, AnimationStateData, Atlas, MeshAttachment, RegionAttachment, Skeleton,
    SkeletonJson, Slot,
};

use crate::config::StickerAssets;
use crate::error::AnimationError;
use crate::skeleton::{
    AttachmentRef, LoadStage, MeshSource, RegionSource, SkeletonBackend, SkeletonRuntime, SlotDraw,
};
use crate::types::{BlendMode, Color};

/// Loads `.atlas` + skeleton JSON exports with the Spine runtime.
#[derive(Copy, Clone, Debug, Default)]
pub struct SpineBackend;

/// A Spine skeleton and its animation state.
///
/// The skeleton keeps its skeleton data and atlas alive; dropping the
/// runtime releases all of them.
pub struct SpineRuntime {
    skeleton: Skeleton,
    animation_state: AnimationState,
}

fn load_error(stage: LoadStage, err: impl std::fmt::Display) -> AnimationError {
    let err = AnimationError::Load {
        stage,
        reason: err.to_string(),
    };
    log::error!("{err}");
    err
}

impl SkeletonBackend for SpineBackend {
    type Runtime = SpineRuntime;

    fn load(&self, assets: &StickerAssets, default_mix: f32) -> Result<SpineRuntime, AnimationError> {
        let atlas = Atlas::new_from_file(&assets.atlas_path)
            .map_err(|err| load_error(LoadStage::Atlas, err))?;
        log::debug!("Read atlas file: successful");

        let json = SkeletonJson::new(Arc::new(atlas));
        let skeleton_data = json
            .read_skeleton_data_file(&assets.skeleton_path)
            .map_err(|err| load_error(LoadStage::SkeletonData, err))?;
        let skeleton_data = Arc::new(skeleton_data);
        log::debug!("Read skeleton data from json file: successful");

        let mut skeleton = Skeleton::new(skeleton_data.clone());
        log::debug!("Create skeleton: successful");

        let mut state_data = AnimationStateData::new(skeleton_data);
        state_data.set_default_mix(default_mix);
        log::debug!("Create animation state data: successful");

        let mut animation_state = AnimationState::new(Arc::new(state_data));
        animation_state
            .set_animation_by_name(0, &assets.default_animation, true)
            .map_err(|err| load_error(LoadStage::AnimationState, err))?;
        log::debug!("Create animation state: successful");

        skeleton.update_world_transform();
        Ok(SpineRuntime {
            skeleton,
            animation_state,
        })
    }
}

impl SkeletonRuntime for SpineRuntime {
    fn advance(&mut self, delta_seconds: f32) {
        self.animation_state.update(delta_seconds);
        self.animation_state.apply(&mut self.skeleton);
        self.skeleton.update_world_transform();
    }

    fn skeleton_color(&self) -> Color {
        color(self.skeleton.color())
    }

    fn for_each_slot(&self, visit: &mut dyn FnMut(&SlotDraw<'_>)) {
        for slot in self.skeleton.draw_order() {
            let blend_mode = blend_mode(slot.data().blend_mode());
            let slot_color = color(slot.color());

            // Bones left out of the active skin keep a stale world transform.
            let attachment = slot.attachment().filter(|_| slot.bone().active());
            let Some(attachment) = attachment else {
                visit(&SlotDraw {
                    blend_mode,
                    color: slot_color,
                    attachment: None,
                });
                continue;
            };

            if let Some(region) = attachment.as_region() {
                let source = SpineRegion {
                    region,
                    slot: &slot,
                };
                visit(&SlotDraw {
                    blend_mode,
                    color: slot_color,
                    attachment: Some(AttachmentRef::Region(&source)),
                });
            } else if let Some(mesh) = attachment.as_mesh() {
                let source = SpineMesh::new(mesh, &slot);
                visit(&SlotDraw {
                    blend_mode,
                    color: slot_color,
                    attachment: Some(AttachmentRef::Mesh(&source)),
                });
            } else {
                visit(&SlotDraw {
                    blend_mode,
                    color: slot_color,
                    attachment: Some(AttachmentRef::Other),
                });
            }
        }
    }
}

struct SpineRegion<'a> {
    region: RegionAttachment,
    slot: &'a Slot,
}

impl RegionSource for SpineRegion<'_> {
    fn color(&self) -> Color {
        color(self.region.color())
    }

    fn uvs(&self) -> [f32; 8] {
        self.region.uvs()
    }

    fn compute_world_vertices(&self, out: &mut [f32; 8]) {
        // SAFETY: `out` holds exactly the four x/y pairs written at stride 2.
        unsafe { self.region.compute_world_vertices(self.slot, out, 0, 2) };
    }
}

struct SpineMesh<'a> {
    mesh: MeshAttachment,
    slot: &'a Slot,
    world_vertices_len: usize,
    triangles: &'a [u16],
    uvs: &'a [f32],
}

impl<'a> SpineMesh<'a> {
    fn new(mesh: MeshAttachment, slot: &'a Slot) -> Self {
        let world_vertices_len = usize::try_from(mesh.world_vertices_length()).unwrap_or(0);
        let triangle_count = usize::try_from(mesh.triangles_count()).unwrap_or(0);
        // SAFETY: the runtime sizes `triangles` by `triangles_count` and `uvs`
        // by `world_vertices_length`; both stay alive while the slot's
        // attachment does, which outlives this visit.
        let (triangles, uvs) = unsafe {
            (
                slice_or_empty(mesh.triangles(), triangle_count),
                slice_or_empty(mesh.uvs(), world_vertices_len),
            )
        };
        Self {
            mesh,
            slot,
            world_vertices_len,
            triangles,
            uvs,
        }
    }
}

unsafe fn slice_or_empty<'a, T>(ptr: *const T, len: usize) -> &'a [T] {
    if ptr.is_null() || len == 0 {
        &[]
    } else {
        unsafe { std::slice::from_raw_parts(ptr, len) }
    }
}

impl MeshSource for SpineMesh<'_> {
    fn color(&self) -> Color {
        color(self.mesh.color())
    }

    fn world_vertices_len(&self) -> usize {
        self.world_vertices_len
    }

    fn triangles(&self) -> &[u16] {
        self.triangles
    }

    fn uvs(&self) -> &[f32] {
        self.uvs
    }

    fn compute_world_vertices(&self, out: &mut [f32]) {
        let Ok(count) = i32::try_from(self.world_vertices_len) else {
            return;
        };
        // SAFETY: the extractor hands us at least `world_vertices_len` floats.
        unsafe {
            self.mesh
                .compute_world_vertices(self.slot, 0, count, out, 0, 2);
        }
    }
}

fn color(c: rusty_spine::Color) -> Color {
    Color::new(c.r, c.g, c.b, c.a)
}

fn blend_mode(mode: rusty_spine::BlendMode) -> BlendMode {
    match mode {
        rusty_spine::BlendMode::Normal => BlendMode::Normal,
        rusty_spine::BlendMode::Additive => BlendMode::Additive,
        rusty_spine::BlendMode::Multiply => BlendMode::Multiply,
        rusty_spine::BlendMode::Screen => BlendMode::Screen,
    }
}
