//! Walks a skeleton's draw order and turns its attachments into triangle
//! lists, batched by blend mode.

use crate::skeleton::{AttachmentRef, MeshSource, RegionSource, SkeletonRuntime, SlotDraw};
use crate::types::{BlendMode, Color, FrameGeometry};

/// Size, in floats, of the world-vertex scratch buffer. Meshes whose world
/// vertices need more than this are skipped.
pub const MAX_WORLD_VERTICES: usize = 6000;

/// Quad corner order producing two triangles, `[0 1 2]` and `[3 0 2]`.
const REGION_TRIANGLE_ORDER: [usize; 6] = [0, 1, 2, 3, 0, 2];

/// Receives batches from [`GeometryExtractor::rebuild`].
///
/// Blend state is global to the GL context, so every batch must be drawn
/// before the blend function changes.
pub trait BatchSink {
    /// Switch the blend function for the batches that follow.
    fn set_blend_mode(&mut self, mode: BlendMode);

    /// Draw one non-empty batch under the current blend mode.
    fn flush(&mut self, geometry: &FrameGeometry);
}

/// Summary of one [`GeometryExtractor::rebuild`] pass.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct FrameStats {
    /// Batches handed to [`BatchSink::flush`].
    pub flushes: usize,
    /// Vertices emitted across all batches.
    pub vertices: usize,
    /// Mesh attachments skipped for exceeding [`MAX_WORLD_VERTICES`].
    pub dropped_meshes: usize,
}

/// Reusable per-frame buffers for turning a posed skeleton into geometry.
pub struct GeometryExtractor {
    world_vertices: Box<[f32]>,
    batch: FrameGeometry,
    blend_mode: Option<BlendMode>,
}

impl Default for GeometryExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl GeometryExtractor {
    /// Create an extractor with an empty batch.
    #[must_use]
    pub fn new() -> Self {
        Self {
            world_vertices: vec![0.0; MAX_WORLD_VERTICES].into_boxed_slice(),
            batch: FrameGeometry::default(),
            blend_mode: None,
        }
    }

    /// Rebuild this frame's geometry from the runtime's current pose.
    ///
    /// Each contiguous run of same-blend-mode slots becomes one flush. The
    /// first renderable slot selects the blend mode without flushing; every
    /// later change flushes what was gathered under the old mode first.
    pub fn rebuild(
        &mut self,
        runtime: &dyn SkeletonRuntime,
        sink: &mut dyn BatchSink,
    ) -> FrameStats {
        self.batch.clear();
        self.blend_mode = None;

        let skeleton_color = runtime.skeleton_color();
        let mut stats = FrameStats::default();

        runtime.for_each_slot(&mut |slot: &SlotDraw<'_>| {
            self.visit_slot(slot, skeleton_color, sink, &mut stats);
        });

        self.flush(sink, &mut stats);
        stats
    }

    fn visit_slot(
        &mut self,
        slot: &SlotDraw<'_>,
        skeleton_color: Color,
        sink: &mut dyn BatchSink,
        stats: &mut FrameStats,
    ) {
        let Some(attachment) = &slot.attachment else {
            return;
        };
        if matches!(attachment, AttachmentRef::Other) {
            return;
        }

        if self.blend_mode != Some(slot.blend_mode) {
            if self.blend_mode.is_some() {
                self.flush(sink, stats);
            }
            sink.set_blend_mode(slot.blend_mode);
            self.blend_mode = Some(slot.blend_mode);
        }

        let tint = skeleton_color.modulate(slot.color);
        match attachment {
            AttachmentRef::Region(region) => self.push_region(*region, tint),
            AttachmentRef::Mesh(mesh) => {
                if !self.push_mesh(*mesh, tint) {
                    stats.dropped_meshes += 1;
                }
            }
            AttachmentRef::Other => {}
        }
    }

    fn flush(&mut self, sink: &mut dyn BatchSink, stats: &mut FrameStats) {
        if self.batch.is_empty() {
            return;
        }
        sink.flush(&self.batch);
        stats.flushes += 1;
        stats.vertices += self.batch.vertex_count();
        self.batch.clear();
    }

    fn push_region(&mut self, region: &dyn RegionSource, tint: Color) {
        let mut corners = [0.0; 8];
        region.compute_world_vertices(&mut corners);
        let uvs = region.uvs();
        let color = tint.modulate(region.color());

        for corner in REGION_TRIANGLE_ORDER {
            let i = corner * 2;
            self.batch.push_vertex(
                [corners[i], corners[i + 1]],
                [uvs[i], uvs[i + 1]],
                color,
            );
        }
    }

    /// Returns `false` if the mesh was dropped.
    fn push_mesh(&mut self, mesh: &dyn MeshSource, tint: Color) -> bool {
        let len = mesh.world_vertices_len();
        if len > MAX_WORLD_VERTICES {
            log::debug!("Skipping mesh with {len} world vertices (limit {MAX_WORLD_VERTICES})");
            return false;
        }

        let world = &mut self.world_vertices[..len];
        mesh.compute_world_vertices(world);
        let uvs = mesh.uvs();
        let triangles = mesh.triangles();

        // Validate up front so a bad index never leaves half a mesh behind.
        if triangles
            .iter()
            .any(|&index| usize::from(index) * 2 + 1 >= len.min(uvs.len()))
        {
            log::warn!("Skipping mesh with out-of-range triangle index");
            return false;
        }

        let color = tint.modulate(mesh.color());
        for &index in triangles {
            let j = usize::from(index) * 2;
            self.batch
                .push_vertex([world[j], world[j + 1]], [uvs[j], uvs[j + 1]], color);
        }
        true
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::skeleton::fake::*;

    #[derive(Default)]
    struct RecordingSink {
        modes: Vec<BlendMode>,
        batches: Vec<(BlendMode, FrameGeometry)>,
    }

    impl BatchSink for RecordingSink {
        fn set_blend_mode(&mut self, mode: BlendMode) {
            self.modes.push(mode);
        }

        fn flush(&mut self, geometry: &FrameGeometry) {
            let mode = *self.modes.last().unwrap();
            self.batches.push((mode, geometry.clone()));
        }
    }

    fn runtime(slots: Vec<FakeSlot>) -> FakeRuntime {
        FakeRuntime {
            color: Color::WHITE,
            slots,
            ..FakeRuntime::default()
        }
    }

    fn rebuild(runtime: &FakeRuntime) -> (RecordingSink, FrameStats) {
        let mut sink = RecordingSink::default();
        let stats = GeometryExtractor::new().rebuild(runtime, &mut sink);
        (sink, stats)
    }

    #[test]
    fn region_emits_two_triangles_in_fixed_order() {
        let corners = [0.0, 0.0, 10.0, 0.0, 10.0, 20.0, 0.0, 20.0];
        let uvs = [0.1, 0.9, 0.9, 0.9, 0.9, 0.1, 0.1, 0.1];
        let rt = runtime(vec![FakeSlot::region(
            BlendMode::Normal,
            FakeRegion {
                color: Color::WHITE,
                corners,
                uvs,
            },
        )]);

        let (sink, stats) = rebuild(&rt);
        assert_eq!(stats.flushes, 1);
        let geometry = &sink.batches[0].1;
        assert_eq!(geometry.vertex_count(), 6);

        let mut expected_positions = Vec::new();
        let mut expected_uvs = Vec::new();
        for corner in [0, 1, 2, 3, 0, 2] {
            expected_positions.extend_from_slice(&corners[corner * 2..corner * 2 + 2]);
            expected_uvs.extend_from_slice(&uvs[corner * 2..corner * 2 + 2]);
        }
        assert_eq!(geometry.positions, expected_positions);
        assert_eq!(geometry.tex_coords, expected_uvs);
    }

    #[test]
    fn mesh_emits_one_vertex_per_triangle_index() {
        let vertices = vec![0.0, 0.0, 5.0, 0.0, 5.0, 5.0, 0.0, 5.0];
        let uvs = vec![0.0, 0.0, 1.0, 0.0, 1.0, 1.0, 0.0, 1.0];
        let triangles = vec![0, 1, 2, 2, 3, 0];
        let rt = runtime(vec![FakeSlot::mesh(
            BlendMode::Normal,
            FakeMesh {
                color: Color::WHITE,
                vertices: vertices.clone(),
                triangles: triangles.clone(),
                uvs: uvs.clone(),
            },
        )]);

        let (sink, _) = rebuild(&rt);
        let geometry = &sink.batches[0].1;
        assert_eq!(geometry.positions.len(), 2 * triangles.len());
        for (k, &index) in triangles.iter().enumerate() {
            let j = usize::from(index) * 2;
            assert_eq!(geometry.positions[k * 2..k * 2 + 2], vertices[j..j + 2]);
            assert_eq!(geometry.tex_coords[k * 2..k * 2 + 2], uvs[j..j + 2]);
        }
    }

    #[test]
    fn tint_is_product_of_skeleton_slot_and_attachment() {
        let mut region = quad(0.0);
        region.color = Color::new(0.5, 1.0, 1.0, 0.5);
        let mut slot = FakeSlot::region(BlendMode::Normal, region);
        slot.color = Color::new(1.0, 0.5, 1.0, 1.0);

        let mut rt = runtime(vec![slot]);
        rt.color = Color::new(1.0, 1.0, 0.25, 1.0);

        let (sink, _) = rebuild(&rt);
        let colors = &sink.batches[0].1.colors;
        assert_eq!(colors.len(), 6 * 4);
        for vertex in colors.chunks(4) {
            assert_eq!(vertex, [0.5, 0.5, 0.25, 0.5]);
        }
    }

    #[test]
    fn one_flush_per_blend_run() {
        let rt = runtime(vec![
            FakeSlot::region(BlendMode::Normal, quad(0.0)),
            FakeSlot::region(BlendMode::Normal, quad(1.0)),
            FakeSlot::region(BlendMode::Additive, quad(2.0)),
            FakeSlot::region(BlendMode::Multiply, quad(3.0)),
            FakeSlot::region(BlendMode::Multiply, quad(4.0)),
            FakeSlot::region(BlendMode::Normal, quad(5.0)),
        ]);

        let (sink, stats) = rebuild(&rt);
        // Three transitions, four runs.
        assert_eq!(stats.flushes, 4);
        assert_eq!(stats.vertices, 36);
        assert_eq!(
            sink.modes,
            [
                BlendMode::Normal,
                BlendMode::Additive,
                BlendMode::Multiply,
                BlendMode::Normal
            ]
        );
        let counts: Vec<_> = sink
            .batches
            .iter()
            .map(|(mode, g)| (*mode, g.vertex_count()))
            .collect();
        assert_eq!(
            counts,
            [
                (BlendMode::Normal, 12),
                (BlendMode::Additive, 6),
                (BlendMode::Multiply, 12),
                (BlendMode::Normal, 6)
            ]
        );
    }

    #[test]
    fn empty_slots_do_not_change_blend_mode() {
        let rt = runtime(vec![
            FakeSlot::region(BlendMode::Normal, quad(0.0)),
            FakeSlot {
                blend_mode: BlendMode::Screen,
                color: Color::WHITE,
                attachment: None,
            },
            FakeSlot {
                blend_mode: BlendMode::Additive,
                color: Color::WHITE,
                attachment: Some(FakeAttachment::Other),
            },
            FakeSlot::region(BlendMode::Normal, quad(1.0)),
        ]);

        let (sink, stats) = rebuild(&rt);
        assert_eq!(stats.flushes, 1);
        assert_eq!(sink.modes, [BlendMode::Normal]);
    }

    #[test]
    fn oversized_mesh_is_dropped_entirely() {
        let oversized = FakeMesh {
            color: Color::WHITE,
            vertices: vec![1.0; MAX_WORLD_VERTICES + 2],
            triangles: vec![0, 1, 2],
            uvs: vec![0.5; MAX_WORLD_VERTICES + 2],
        };
        let rt = runtime(vec![
            FakeSlot::region(BlendMode::Normal, quad(0.0)),
            FakeSlot::mesh(BlendMode::Normal, oversized),
        ]);

        let (sink, stats) = rebuild(&rt);
        assert_eq!(stats.dropped_meshes, 1);
        assert_eq!(stats.vertices, 6);
        assert_eq!(sink.batches[0].1.vertex_count(), 6);
    }

    #[test]
    fn mesh_with_out_of_range_index_is_dropped_entirely() {
        let broken = FakeMesh {
            color: Color::WHITE,
            vertices: vec![0.0, 0.0, 5.0, 0.0, 5.0, 5.0],
            triangles: vec![0, 1, 2, 0, 2, 3],
            uvs: vec![0.0, 0.0, 1.0, 0.0, 1.0, 1.0],
        };
        let rt = runtime(vec![
            FakeSlot::region(BlendMode::Normal, quad(0.0)),
            FakeSlot::mesh(BlendMode::Normal, broken),
            FakeSlot::region(BlendMode::Normal, quad(1.0)),
        ]);

        let (sink, stats) = rebuild(&rt);
        assert_eq!(stats.dropped_meshes, 1);
        assert_eq!(stats.flushes, 1);
        assert_eq!(stats.vertices, 12);

        let positions = &sink.batches[0].1.positions;
        assert_eq!(positions.len(), 24);
        // Only the two quads made it in; the mesh's 5.0 coordinates did not.
        assert!(positions.iter().all(|&p| p <= 2.0));
    }

    #[test]
    fn mesh_at_budget_is_kept() {
        let mesh = FakeMesh {
            color: Color::WHITE,
            vertices: vec![2.0; MAX_WORLD_VERTICES],
            triangles: vec![0, 1, 2],
            uvs: vec![0.5; MAX_WORLD_VERTICES],
        };
        let (_, stats) = rebuild(&runtime(vec![FakeSlot::mesh(BlendMode::Normal, mesh)]));
        assert_eq!(stats.dropped_meshes, 0);
        assert_eq!(stats.vertices, 3);
    }

    #[test]
    fn empty_draw_order_never_flushes() {
        let (sink, stats) = rebuild(&runtime(Vec::new()));
        assert_eq!(stats, FrameStats::default());
        assert!(sink.modes.is_empty());
        assert!(sink.batches.is_empty());
    }

    #[test]
    fn rebuild_starts_from_scratch_each_frame() {
        let rt = runtime(vec![FakeSlot::region(BlendMode::Additive, quad(0.0))]);
        let mut extractor = GeometryExtractor::new();

        for _ in 0..2 {
            let mut sink = RecordingSink::default();
            let stats = extractor.rebuild(&rt, &mut sink);
            assert_eq!(stats.vertices, 6);
            assert_eq!(sink.modes, [BlendMode::Additive]);
        }
    }
}
