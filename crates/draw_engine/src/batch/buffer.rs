//! The deferred-call buffer and its drain/merge step
//!
//! [`DeferredBatch`] owns every transient arena of one accumulation cycle:
//! the deferred-call array, the decoded-vertex arena, and the index
//! translator. The drain cursor marks how far lazy decoding has caught up;
//! driving it is idempotent, so an eager-decoded call is simply one the
//! cursor has already passed.

use log::{error, warn};

use super::deferred::DeferredDrawCall;
use super::index_translator::IndexTranslator;
use super::topology::PrimitiveTopology;
use crate::config::DrawConfig;
use crate::state::VertexBounds;
use crate::vertex::{DecodedVertex, DecoderCache, TexCoordFormat};

/// Fixed-capacity accumulator for one batch of deferred draw calls
#[derive(Debug)]
pub struct DeferredBatch<'mem> {
    calls: Vec<DeferredDrawCall<'mem>>,
    max_calls: usize,
    drain_cursor: usize,
    decoded: Vec<DecodedVertex>,
    vertex_budget: usize,
    translator: IndexTranslator,
    submitted_vertices: u32,
}

impl<'mem> DeferredBatch<'mem> {
    /// Allocate all arenas up front from the configured capacities
    pub fn new(config: &DrawConfig) -> Self {
        Self {
            calls: Vec::with_capacity(config.max_deferred_calls),
            max_calls: config.max_deferred_calls,
            drain_cursor: 0,
            decoded: Vec::with_capacity(config.vertex_budget),
            vertex_budget: config.vertex_budget,
            translator: IndexTranslator::with_capacity(config.index_budget),
            submitted_vertices: 0,
        }
    }

    /// Number of buffered calls
    pub fn len(&self) -> usize {
        self.calls.len()
    }

    /// Whether the batch holds no calls
    pub fn is_empty(&self) -> bool {
        self.calls.is_empty()
    }

    /// Whether the call array is at capacity
    pub fn is_full(&self) -> bool {
        self.calls.len() >= self.max_calls
    }

    /// Whether accepting `vertex_count` more vertices would overflow the
    /// decode arena
    pub const fn would_exceed_budget(&self, vertex_count: u32) -> bool {
        self.submitted_vertices as usize + vertex_count as usize > self.vertex_budget
    }

    /// Total vertices described by buffered calls
    pub const fn submitted_vertices(&self) -> u32 {
        self.submitted_vertices
    }

    /// Decoded canonical vertices, in merged order
    pub fn decoded(&self) -> &[DecodedVertex] {
        &self.decoded
    }

    /// The index translator for this batch
    pub const fn translator(&self) -> &IndexTranslator {
        &self.translator
    }

    /// How far the drain cursor has progressed, in calls
    pub const fn drain_cursor(&self) -> usize {
        self.drain_cursor
    }

    /// Buffer one call
    ///
    /// The caller checks the flush triggers first; pushing past capacity is
    /// an engine bug, not input-dependent behavior.
    pub fn push(&mut self, call: DeferredDrawCall<'mem>) {
        debug_assert!(!self.is_full(), "deferred-call array overflow");
        debug_assert!(
            !self.would_exceed_budget(call.vertex_count),
            "vertex budget overflow"
        );
        self.submitted_vertices += call.vertex_count;
        self.calls.push(call);
    }

    /// Catch lazy decoding up to the newest call
    ///
    /// Idempotent: with no submissions since the last drain this does
    /// nothing. Afterwards the merged output topology is always deducible;
    /// if every run was dropped by the capacity guard, a deterministic
    /// zero-vertex point primitive stands in and the anomaly is logged.
    pub fn drain_pending(&mut self, cache: &mut DecoderCache, bounds: &mut VertexBounds) {
        while self.drain_cursor < self.calls.len() {
            self.decode_step(cache, bounds);
        }

        if !self.calls.is_empty() && self.translator.topology().is_none() {
            error!("drained {} calls without deducing a topology", self.calls.len());
            self.translator.add_prim(PrimitiveTopology::Points, 0);
        }
    }

    /// Decode the call at the drain cursor (merging forward where
    /// possible) and advance the cursor past everything consumed
    pub fn decode_step(&mut self, cache: &mut DecoderCache, bounds: &mut VertexBounds) {
        let i = self.drain_cursor;
        let dc = self.calls[i];

        self.translator.set_base(self.decoded.len() as u32);

        if dc.indices.is_none() {
            // Unindexed: decode the call's own range and append it as a
            // fresh primitive segment.
            let decoder = cache.decoder_for(dc.key);
            let start = self.decoded.len();
            decoder.decode_range(dc.verts, dc.index_lower_bound, dc.index_upper_bound, &mut self.decoded);
            self.fold_bounds(dc.format, start, bounds);
            self.translator.add_prim(dc.topology, dc.vertex_count);
            self.drain_cursor = i + 1;
            return;
        }

        // Indexed draws commonly arrive as long runs of small calls over
        // one static vertex source. Scan forward over calls sharing the
        // identical source, widening the merged bounds, so the whole run
        // costs a single decode.
        let mut lower = dc.index_lower_bound;
        let mut upper = dc.index_upper_bound;
        let mut last = i;
        for (j, other) in self.calls.iter().enumerate().skip(i + 1) {
            if other.indices.is_none() || !other.shares_vertex_source(&dc) {
                break;
            }
            lower = lower.min(other.index_lower_bound);
            upper = upper.max(other.index_upper_bound);
            last = j;
        }

        let span = usize::from(upper - lower) + 1;
        if self.decoded.len() + span > self.vertex_budget {
            // Malformed index data can request absurd spans; drop the run
            // and keep the frame going.
            warn!(
                "merged run of {} calls spans {} vertices over bounds [{}, {}], exceeding the budget of {}; dropping run",
                last - i + 1,
                span,
                lower,
                upper,
                self.vertex_budget
            );
            self.drain_cursor = last + 1;
            return;
        }

        for j in i..=last {
            let member = self.calls[j];
            if let Some(raw) = member.indices {
                self.translator.translate_prim(
                    member.topology,
                    member.vertex_count,
                    raw,
                    member.index_width,
                    lower,
                );
            }
        }

        let decoder = cache.decoder_for(dc.key);
        let start = self.decoded.len();
        decoder.decode_range(dc.verts, lower, upper, &mut self.decoded);
        self.fold_bounds(dc.format, start, bounds);
        self.translator.advance(span as u32);
        self.drain_cursor = last + 1;
    }

    fn fold_bounds(&self, format: crate::vertex::VertexFormat, start: usize, bounds: &mut VertexBounds) {
        if format.texcoord() == TexCoordFormat::None {
            return;
        }
        for vertex in &self.decoded[start..] {
            bounds.include(vertex.uv[0], vertex.uv[1]);
        }
    }

    /// Reset every cursor and arena to the post-flush state
    pub fn reset(&mut self) {
        self.calls.clear();
        self.drain_cursor = 0;
        self.decoded.clear();
        self.translator.reset();
        self.submitted_vertices = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::batch::deferred::index_bounds;
    use crate::state::UvGenMode;
    use crate::vertex::{
        ColorFormat, DecoderKey, IndexWidth, NormalFormat, PositionFormat, VertexFormat,
    };

    fn small_config() -> DrawConfig {
        DrawConfig {
            max_deferred_calls: 16,
            vertex_budget: 64,
            index_budget: 256,
            ..DrawConfig::default()
        }
    }

    fn position_format() -> VertexFormat {
        VertexFormat::new(
            PositionFormat::F32,
            NormalFormat::None,
            TexCoordFormat::None,
            ColorFormat::None,
        )
    }

    fn vertex_bytes(count: usize) -> Vec<u8> {
        let mut bytes = Vec::new();
        for i in 0..count {
            for value in [i as f32, 0.0, 0.0] {
                bytes.extend_from_slice(&value.to_le_bytes());
            }
        }
        bytes
    }

    fn indexed_call<'a>(
        verts: &'a [u8],
        indices: &'a [u8],
        count: u32,
    ) -> DeferredDrawCall<'a> {
        let format = position_format().with_indices(IndexWidth::U8);
        let (lower, upper) = index_bounds(indices, IndexWidth::U8, count);
        DeferredDrawCall {
            verts,
            indices: Some(indices),
            format,
            key: DecoderKey::new(format, UvGenMode::SourceCoords),
            index_width: IndexWidth::U8,
            topology: PrimitiveTopology::Triangles,
            vertex_count: count,
            index_lower_bound: lower,
            index_upper_bound: upper,
        }
    }

    fn unindexed_call(verts: &[u8], count: u32) -> DeferredDrawCall<'_> {
        let format = position_format();
        DeferredDrawCall {
            verts,
            indices: None,
            format,
            key: DecoderKey::new(format, UvGenMode::SourceCoords),
            index_width: IndexWidth::None,
            topology: PrimitiveTopology::Triangles,
            vertex_count: count,
            index_lower_bound: 0,
            index_upper_bound: count as u16 - 1,
        }
    }

    #[test]
    fn test_merge_shared_source_single_decode() {
        let verts = vertex_bytes(8);
        let first = [0u8, 1, 2];
        let second = [2u8, 3, 4];

        let mut batch = DeferredBatch::new(&small_config());
        let mut cache = DecoderCache::new();
        let mut bounds = VertexBounds::default();

        batch.push(indexed_call(&verts, &first, 3));
        batch.push(indexed_call(&verts, &second, 3));
        batch.drain_pending(&mut cache, &mut bounds);

        // One decode over [0, 4]: five vertices, six translated indices.
        assert_eq!(batch.decoded().len(), 5);
        assert_eq!(batch.translator().indices(), &[0, 1, 2, 2, 3, 4]);
        assert_eq!(batch.translator().max_index(), 4);
        assert_eq!(batch.drain_cursor(), 2);
    }

    #[test]
    fn test_merge_stops_at_different_source() {
        let verts_a = vertex_bytes(4);
        let verts_b = vertex_bytes(4);
        let inds = [0u8, 1, 2];

        let mut batch = DeferredBatch::new(&small_config());
        let mut cache = DecoderCache::new();
        let mut bounds = VertexBounds::default();

        batch.push(indexed_call(&verts_a, &inds, 3));
        batch.push(indexed_call(&verts_b, &inds, 3));
        batch.drain_pending(&mut cache, &mut bounds);

        // Two separate decodes of three vertices each.
        assert_eq!(batch.decoded().len(), 6);
        assert_eq!(batch.translator().indices(), &[0, 1, 2, 3, 4, 5]);
    }

    #[test]
    fn test_drain_idempotent() {
        let verts = vertex_bytes(4);
        let inds = [0u8, 1, 2];

        let mut batch = DeferredBatch::new(&small_config());
        let mut cache = DecoderCache::new();
        let mut bounds = VertexBounds::default();

        batch.push(indexed_call(&verts, &inds, 3));
        batch.drain_pending(&mut cache, &mut bounds);
        let decoded_after_first = batch.decoded().len();
        let indices_after_first = batch.translator().index_count();

        batch.drain_pending(&mut cache, &mut bounds);
        assert_eq!(batch.decoded().len(), decoded_after_first);
        assert_eq!(batch.translator().index_count(), indices_after_first);
    }

    #[test]
    fn test_unindexed_appends_fresh_segment() {
        let verts = vertex_bytes(6);
        let mut batch = DeferredBatch::new(&small_config());
        let mut cache = DecoderCache::new();
        let mut bounds = VertexBounds::default();

        batch.push(unindexed_call(&verts, 3));
        batch.push(unindexed_call(&verts, 3));
        batch.drain_pending(&mut cache, &mut bounds);

        // Unindexed calls never merge, even over one source.
        assert_eq!(batch.decoded().len(), 6);
        assert!(batch.translator().is_pure());
        assert_eq!(batch.translator().pure_count(), 6);
    }

    #[test]
    fn test_oversized_merge_run_dropped() {
        let config = DrawConfig {
            vertex_budget: 4,
            ..small_config()
        };
        let verts = vertex_bytes(8);
        // Bounds [0, 7] span eight vertices, over the budget of four.
        let inds = [0u8, 3, 7];

        let mut batch = DeferredBatch::new(&config);
        let mut cache = DecoderCache::new();
        let mut bounds = VertexBounds::default();

        batch.push(indexed_call(&verts, &inds, 3));
        batch.drain_pending(&mut cache, &mut bounds);

        // Run abandoned: nothing decoded, nothing translated, cursor
        // advanced, fallback topology deduced.
        assert_eq!(batch.decoded().len(), 0);
        assert_eq!(batch.translator().index_count(), 0);
        assert_eq!(batch.drain_cursor(), 1);
        assert_eq!(batch.translator().topology(), Some(PrimitiveTopology::Points));
    }

    #[test]
    fn test_degenerate_call_contributes_bounds_only() {
        let verts = vertex_bytes(8);
        let degenerate = [7u8, 0]; // two indices: widens bounds to [0, 7]
        let good = [1u8, 2, 3];

        let mut batch = DeferredBatch::new(&small_config());
        let mut cache = DecoderCache::new();
        let mut bounds = VertexBounds::default();

        let mut call = indexed_call(&verts, &degenerate, 2);
        call.topology = PrimitiveTopology::Triangles;
        batch.push(call);
        batch.push(indexed_call(&verts, &good, 3));
        batch.drain_pending(&mut cache, &mut bounds);

        // The merged decode covers [0, 7] because the degenerate call's
        // bounds count, but only the complete call emits indices.
        assert_eq!(batch.decoded().len(), 8);
        assert_eq!(batch.translator().indices(), &[1, 2, 3]);
    }

    #[test]
    fn test_drain_folds_uv_bounds() {
        let format = VertexFormat::new(
            PositionFormat::F32,
            NormalFormat::None,
            TexCoordFormat::F32,
            ColorFormat::None,
        );
        // uv f32x2 + position f32x3 per vertex
        let mut verts = Vec::new();
        for (u, v) in [(0.25f32, 0.5f32), (0.75, 0.125), (0.5, 0.5)] {
            verts.extend_from_slice(&u.to_le_bytes());
            verts.extend_from_slice(&v.to_le_bytes());
            for value in [0.0f32, 0.0, 0.0] {
                verts.extend_from_slice(&value.to_le_bytes());
            }
        }

        let mut batch = DeferredBatch::new(&small_config());
        let mut cache = DecoderCache::new();
        let mut bounds = VertexBounds::default();

        batch.push(DeferredDrawCall {
            verts: &verts,
            indices: None,
            format,
            key: DecoderKey::new(format, UvGenMode::SourceCoords),
            index_width: IndexWidth::None,
            topology: PrimitiveTopology::Triangles,
            vertex_count: 3,
            index_lower_bound: 0,
            index_upper_bound: 2,
        });
        batch.drain_pending(&mut cache, &mut bounds);

        assert!(!bounds.is_empty());
        assert!((bounds.min_u - 0.25).abs() < f32::EPSILON);
        assert!((bounds.max_u - 0.75).abs() < f32::EPSILON);
        assert!((bounds.min_v - 0.125).abs() < f32::EPSILON);
        assert!((bounds.max_v - 0.5).abs() < f32::EPSILON);
    }

    #[test]
    fn test_reset_clears_everything() {
        let verts = vertex_bytes(4);
        let mut batch = DeferredBatch::new(&small_config());
        let mut cache = DecoderCache::new();
        let mut bounds = VertexBounds::default();

        batch.push(unindexed_call(&verts, 3));
        batch.drain_pending(&mut cache, &mut bounds);
        batch.reset();

        assert!(batch.is_empty());
        assert_eq!(batch.drain_cursor(), 0);
        assert_eq!(batch.decoded().len(), 0);
        assert_eq!(batch.submitted_vertices(), 0);
        assert_eq!(batch.translator().index_count(), 0);
    }
}
