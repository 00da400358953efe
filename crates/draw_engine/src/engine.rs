//! # Draw Engine
//!
//! The submission front end and flush coordinator. [`DrawEngine::submit`]
//! buffers one primitive at a time, applying the flush triggers (topology
//! incompatibility, call capacity, vertex budget, render-target aliasing);
//! [`DrawEngine::flush`] drains the batch through the merger and dispatches
//! the result to the renderer collaborators.
//!
//! The engine is single-threaded and synchronous. Submit and flush both
//! take `&mut self`, so reentrant submission during a flush cannot be
//! expressed; callers serialize all use against one instance.

use std::rc::Rc;

use log::trace;

use crate::batch::deferred::index_bounds;
use crate::batch::{DeferredBatch, DeferredDrawCall, PrimitiveTopology};
use crate::config::{ConfigError, DrawConfig};
use crate::dispatch::{
    ClearCommand, ClearMask, CommandSink, DrawObserver, TransformInput, TransformResult,
    TransformStage, TransformedVertex,
};
use crate::state::{RenderState, TransformMode};
use crate::stats::DrawStats;
use crate::vertex::{
    DecodedVertex, DecoderCache, DecoderKey, IndexWidth, VertexDecoder, VertexFormat,
};

/// Errors surfaced at engine construction
///
/// Steady-state anomalies never become errors; they degrade the frame and
/// leave a log record instead.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// The supplied configuration violates a capacity invariant
    #[error("invalid draw engine configuration: {0}")]
    Config(#[from] ConfigError),
}

/// The collaborators a submit or flush may dispatch into
///
/// Bundled so the two entry points keep one signature as collaborators
/// grow. The command sink is mandatory; the transform stage only matters
/// in [`TransformMode::Software`], and the observer is optional telemetry.
pub struct Collaborators<'a> {
    sink: &'a mut dyn CommandSink,
    transform: Option<&'a mut dyn TransformStage>,
    observer: Option<&'a mut dyn DrawObserver>,
}

impl<'a> Collaborators<'a> {
    /// Collaborators with only a command sink
    pub fn new(sink: &'a mut dyn CommandSink) -> Self {
        Self {
            sink,
            transform: None,
            observer: None,
        }
    }

    /// Attach the software transform stage
    #[must_use]
    pub fn with_transform(mut self, transform: &'a mut dyn TransformStage) -> Self {
        self.transform = Some(transform);
        self
    }

    /// Attach a draw-cycle observer
    #[must_use]
    pub fn with_observer(mut self, observer: &'a mut dyn DrawObserver) -> Self {
        self.observer = Some(observer);
        self
    }
}

/// Deferred primitive-submission and draw-call batching engine
///
/// Sits between an immediate-mode front end and a renderer that wants few,
/// large draws. Buffers submissions as [`DeferredDrawCall`]s, decodes
/// lazily at flush time, and merges runs of indexed calls that share one
/// vertex source into a single decode plus index translation.
///
/// The `'mem` lifetime ties buffered vertex/index borrows to the memory
/// they live in: everything submitted must stay valid until the flush that
/// consumes it.
#[derive(Debug)]
pub struct DrawEngine<'mem> {
    config: DrawConfig,
    batch: DeferredBatch<'mem>,
    decoders: DecoderCache,
    transformed: Vec<TransformedVertex>,
    prev_topology: Option<PrimitiveTopology>,
    current_decoder: Option<(DecoderKey, Rc<VertexDecoder>)>,
    stats: DrawStats,
}

impl<'mem> DrawEngine<'mem> {
    /// Build an engine, allocating every arena up front
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Config`] when the configuration fails
    /// validation.
    pub fn new(config: DrawConfig) -> Result<Self, EngineError> {
        config.validate()?;
        let batch = DeferredBatch::new(&config);
        // The transform stage may expand sprites into triangle pairs, so
        // its arena gets headroom over the decode budget.
        let transformed = Vec::with_capacity(config.vertex_budget * 3);
        Ok(Self {
            config,
            batch,
            decoders: DecoderCache::new(),
            transformed,
            prev_topology: None,
            current_decoder: None,
            stats: DrawStats::default(),
        })
    }

    /// Submit one primitive for deferred drawing
    ///
    /// Returns the number of source bytes the call consumes
    /// (`vertex_count` packed vertices at the format's stride), which the
    /// front end uses to advance its command stream.
    ///
    /// Flushes accumulated work first when the resolved topology cannot
    /// join the current batch, the call array is full, or the vertex
    /// budget would overflow. A rectangle that textures from the current
    /// render target flushes immediately after buffering and marks texture
    /// state dirty, so the draw cannot read a target mid-write.
    pub fn submit(
        &mut self,
        state: &mut RenderState,
        out: &mut Collaborators<'_>,
        verts: &'mem [u8],
        indices: Option<&'mem [u8]>,
        topology: PrimitiveTopology,
        vertex_count: u32,
        format: VertexFormat,
    ) -> usize {
        if vertex_count == 0 {
            trace!("ignoring zero-vertex submission");
            return 0;
        }

        let topology = topology.resolve(self.prev_topology);

        if !topology.compatible_with(self.prev_topology)
            || self.batch.is_full()
            || self.batch.would_exceed_budget(vertex_count)
        {
            self.flush(state, out);
        }
        self.prev_topology = Some(topology);

        let key = DecoderKey::new(format, state.uv_gen_mode);
        let decoder = self.decoder_for(key);
        let bytes_consumed = vertex_count as usize * decoder.source_stride();

        // A single call bigger than the whole arena can never be accepted;
        // drop it rather than wedge the batch.
        if self.batch.would_exceed_budget(vertex_count) {
            log::warn!(
                "draw call with {vertex_count} vertices exceeds the vertex budget of {}; dropping call",
                self.config.vertex_budget
            );
            return bytes_consumed;
        }

        let index_width = if indices.is_some() {
            format.index_width()
        } else {
            IndexWidth::None
        };
        let indices = if index_width == IndexWidth::None {
            None
        } else {
            indices
        };
        let (index_lower_bound, index_upper_bound) = match indices {
            Some(raw) => index_bounds(raw, index_width, vertex_count),
            None => (0, (vertex_count - 1) as u16),
        };

        self.batch.push(DeferredDrawCall {
            verts,
            indices,
            format,
            key,
            index_width,
            topology,
            vertex_count,
            index_lower_bound,
            index_upper_bound,
        });

        // Skinned formats can decode eagerly so weight application sees
        // each call in submission order; those calls skip merge batching.
        if self.config.software_skinning && format.has_weights() {
            self.batch
                .decode_step(&mut self.decoders, &mut state.vertex_bounds);
        }

        if topology == PrimitiveTopology::Rectangles
            && state.texture_aliases_render_target()
            && !self.config.disable_slow_framebuffer_effects
        {
            state.texture_state_dirty = true;
            self.flush(state, out);
        }

        bytes_consumed
    }

    /// Flush everything accumulated: drain, merge, dispatch, reset
    ///
    /// A no-op when nothing is buffered. Otherwise the batch is drained
    /// through the merger and dispatched according to
    /// [`RenderState::transform_mode`], all transient state resets, and the
    /// observer (if any) is notified.
    ///
    /// # Panics
    ///
    /// Panics when the state selects [`TransformMode::Software`] but no
    /// transform stage was attached — an integration error, not input.
    pub fn flush(&mut self, state: &mut RenderState, out: &mut Collaborators<'_>) {
        if self.batch.is_empty() {
            return;
        }
        self.stats.flushes += 1;

        self.batch
            .drain_pending(&mut self.decoders, &mut state.vertex_bounds);
        self.batch.translator().report_dropped();

        match state.transform_mode {
            TransformMode::Hardware => self.dispatch_hardware(&mut *out.sink),
            TransformMode::Software => self.dispatch_software(state, out),
        }

        self.stats.draw_calls += self.batch.len() as u64;
        self.stats.vertices_submitted += u64::from(self.batch.submitted_vertices());
        self.stats.vertices_decoded += self.batch.decoded().len() as u64;

        self.batch.reset();
        self.prev_topology = None;
        self.transformed.clear();
        state.vertex_bounds.reset();

        if let Some(observer) = out.observer.as_mut() {
            observer.on_draw_complete();
        }
    }

    fn dispatch_hardware(&self, sink: &mut dyn CommandSink) {
        let translator = self.batch.translator();
        let topology = translator
            .topology()
            .unwrap_or(PrimitiveTopology::Points);

        if translator.is_pure() {
            // Every run was trivially ascending; skip the index buffer.
            let vertex_count = translator.pure_count();
            if vertex_count == 0 {
                trace!("flush produced no drawable primitives");
                return;
            }
            trace!("flush {topology:?}: {vertex_count} verts in one go");
            sink.bind_vertex_data(
                bytemuck::cast_slice(self.batch.decoded()),
                DecodedVertex::STRIDE as u32,
            );
            sink.draw(topology, vertex_count);
        } else {
            let index_count = translator.index_count();
            if index_count == 0 {
                trace!("flush produced no drawable primitives");
                return;
            }
            let vertex_count = u32::from(translator.max_index()) + 1;
            trace!("flush {topology:?}: {vertex_count} verts, {index_count} indices in one go");
            sink.bind_vertex_data(
                bytemuck::cast_slice(self.batch.decoded()),
                DecodedVertex::STRIDE as u32,
            );
            sink.bind_index_data(translator.indices());
            sink.draw_indexed(topology, index_count, vertex_count);
        }
    }

    fn dispatch_software(&mut self, state: &RenderState, out: &mut Collaborators<'_>) {
        let Some(stage) = out.transform.as_mut() else {
            panic!("software transform stage required for TransformMode::Software flush");
        };

        let translator = self.batch.translator();
        let topology = translator
            .topology()
            .unwrap_or(PrimitiveTopology::Points);

        self.transformed.clear();
        let result = stage.transform(
            TransformInput {
                topology,
                vertices: self.batch.decoded(),
                indices: translator.indices(),
                max_index: translator.max_index(),
                state,
            },
            &mut self.transformed,
        );

        match result {
            TransformResult::DrawPrimitives { count, indexed } => {
                if count == 0 {
                    trace!("transform stage produced no drawable primitives");
                    return;
                }
                trace!("flush {topology:?} software: {count} in one go, indexed={indexed}");
                out.sink.bind_vertex_data(
                    bytemuck::cast_slice(&self.transformed),
                    TransformedVertex::STRIDE as u32,
                );
                if indexed {
                    out.sink.bind_index_data(translator.indices());
                    out.sink
                        .draw_indexed(topology, count, u32::from(translator.max_index()) + 1);
                } else {
                    out.sink.draw(topology, count);
                }
            }
            TransformResult::Clear { color, depth } => {
                let mut mask = ClearMask::empty();
                if state.clear_color_mask {
                    mask |= ClearMask::COLOR;
                }
                if state.clear_alpha_mask {
                    // The alpha channel doubles as stencil storage.
                    mask |= ClearMask::ALPHA | ClearMask::STENCIL;
                }
                if state.clear_depth_mask {
                    mask |= ClearMask::DEPTH;
                }
                if mask.is_empty() {
                    trace!("clear-mode batch with all channels masked off");
                    return;
                }
                out.sink.clear(ClearCommand {
                    mask,
                    color: unpack_rgba(color),
                    depth,
                    stencil: (color >> 24) as u8,
                    width: state.render_width,
                    height: state.render_height,
                });
            }
        }
    }

    /// Drop every cached decoder and forget the current format
    ///
    /// Call on the external resized/context-lost signal.
    ///
    /// # Panics
    ///
    /// Panics when a batch is mid-accumulation — clearing decoders out
    /// from under buffered calls is an integration error; flush first.
    pub fn context_invalidated(&mut self) {
        assert!(
            self.batch.is_empty(),
            "decoder cache cleared mid-batch: flush before invalidating the context"
        );
        self.decoders.clear();
        self.current_decoder = None;
    }

    /// Aggregate statistics since construction (or the last reset)
    pub const fn stats(&self) -> &DrawStats {
        &self.stats
    }

    /// Reset the aggregate statistics
    pub fn reset_stats(&mut self) {
        self.stats.reset();
    }

    /// Number of draw calls currently buffered
    pub fn pending_calls(&self) -> usize {
        self.batch.len()
    }

    /// Number of decoders currently cached
    pub fn cached_decoders(&self) -> usize {
        self.decoders.len()
    }

    fn decoder_for(&mut self, key: DecoderKey) -> Rc<VertexDecoder> {
        if let Some((current, decoder)) = &self.current_decoder {
            if *current == key {
                return Rc::clone(decoder);
            }
        }
        let decoder = self.decoders.decoder_for(key);
        self.current_decoder = Some((key, Rc::clone(&decoder)));
        decoder
    }
}

fn unpack_rgba(packed: u32) -> [f32; 4] {
    [
        (packed & 0xFF) as f32 / 255.0,
        (packed >> 8 & 0xFF) as f32 / 255.0,
        (packed >> 16 & 0xFF) as f32 / 255.0,
        (packed >> 24 & 0xFF) as f32 / 255.0,
    ]
}
