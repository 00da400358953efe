//! Index translation into merged 0-based vertex space
//!
//! Every drained call contributes one index run to a shared fixed-capacity
//! buffer. Unindexed calls generate their indices from a running base;
//! indexed calls have their raw indices rebased by the merged run's shared
//! lower bound. Strips and fans expand to list form here, so the output is
//! always a flat list of whole primitives — which is also what makes the
//! degenerate-call policy free: a call too short for its topology simply
//! emits nothing.

use log::warn;

use super::deferred::read_index;
use super::topology::PrimitiveTopology;
use crate::vertex::IndexWidth;

/// Accumulator for translated merged-space indices
///
/// Also the place where the merged output topology is deduced and where
/// "purity" is tracked: a batch whose every run was a trivially ascending
/// list can skip the index buffer entirely and draw non-indexed.
#[derive(Debug)]
pub struct IndexTranslator {
    indices: Vec<u16>,
    capacity: usize,
    /// Next merged-space vertex index; tracks the decode arena's cursor
    base: u32,
    topology: Option<PrimitiveTopology>,
    max_index: u16,
    pure: bool,
    pure_count: u32,
    dropped: u32,
}

impl IndexTranslator {
    /// Create a translator with a fixed index capacity
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            indices: Vec::with_capacity(capacity),
            capacity,
            base: 0,
            topology: None,
            max_index: 0,
            pure: true,
            pure_count: 0,
            dropped: 0,
        }
    }

    /// Reset to the post-flush state, keeping the allocation
    pub fn reset(&mut self) {
        self.indices.clear();
        self.base = 0;
        self.topology = None;
        self.max_index = 0;
        self.pure = true;
        self.pure_count = 0;
        self.dropped = 0;
    }

    /// Pin the merged-space base to the decode arena's write cursor
    pub fn set_base(&mut self, base: u32) {
        self.base = base;
    }

    /// Advance the base past a merged run's decoded span
    pub fn advance(&mut self, span: u32) {
        self.base += span;
    }

    /// Generate indices for an unindexed call
    ///
    /// List topologies emit trivially ascending runs and keep the batch
    /// pure — but only when the vertex count divides evenly into whole
    /// primitives, since a leftover vertex would desynchronize a
    /// non-indexed draw from the decode arena.
    pub fn add_prim(&mut self, topology: PrimitiveTopology, vertex_count: u32) {
        let base = self.base;
        let emitted = self.emit(topology, vertex_count, |i| Some(base + i));

        let ascending = matches!(
            topology,
            PrimitiveTopology::Points
                | PrimitiveTopology::Lines
                | PrimitiveTopology::Triangles
                | PrimitiveTopology::Rectangles
        );
        if ascending && emitted == vertex_count {
            self.pure_count += vertex_count;
        } else {
            self.pure = false;
        }

        self.topology = Some(topology.merge_class().list_topology());
        self.base += vertex_count;
    }

    /// Translate one indexed call's raw indices into merged space
    ///
    /// Each output index is `raw - lower_bound` offset by the merged-space
    /// base. The caller advances the base once per merged run, after the
    /// run's single decode.
    pub fn translate_prim(
        &mut self,
        topology: PrimitiveTopology,
        vertex_count: u32,
        raw: &[u8],
        width: IndexWidth,
        lower_bound: u16,
    ) {
        let base = self.base;
        self.emit(topology, vertex_count, |i| {
            read_index(raw, width, i as usize)
                .map(|value| base + u32::from(value.saturating_sub(lower_bound)))
        });
        self.pure = false;
        self.topology = Some(topology.merge_class().list_topology());
    }

    /// Emit whole primitives for `topology`, fetching source indices
    /// through `fetch`; returns the number of indices attempted
    fn emit<F: Fn(u32) -> Option<u32>>(
        &mut self,
        topology: PrimitiveTopology,
        count: u32,
        fetch: F,
    ) -> u32 {
        let mut attempted = 0u32;
        let mut push = |translator: &mut Self, value: Option<u32>| -> bool {
            let Some(value) = value else {
                return false;
            };
            attempted += 1;
            translator.push_index(value);
            true
        };

        match topology {
            PrimitiveTopology::Points => {
                for i in 0..count {
                    if !push(self, fetch(i)) {
                        break;
                    }
                }
            }
            PrimitiveTopology::Lines | PrimitiveTopology::Rectangles => {
                for pair in 0..count / 2 {
                    if !(push(self, fetch(pair * 2)) && push(self, fetch(pair * 2 + 1))) {
                        break;
                    }
                }
            }
            PrimitiveTopology::LineStrip => {
                for i in 0..count.saturating_sub(1) {
                    if !(push(self, fetch(i)) && push(self, fetch(i + 1))) {
                        break;
                    }
                }
            }
            PrimitiveTopology::Triangles => {
                for tri in 0..count / 3 {
                    if !(push(self, fetch(tri * 3))
                        && push(self, fetch(tri * 3 + 1))
                        && push(self, fetch(tri * 3 + 2)))
                    {
                        break;
                    }
                }
            }
            PrimitiveTopology::TriangleStrip => {
                // Alternate winding so every emitted triangle faces the
                // same way as the strip it came from.
                for tri in 0..count.saturating_sub(2) {
                    let (a, b) = if tri % 2 == 0 {
                        (tri, tri + 1)
                    } else {
                        (tri + 1, tri)
                    };
                    if !(push(self, fetch(a))
                        && push(self, fetch(b))
                        && push(self, fetch(tri + 2)))
                    {
                        break;
                    }
                }
            }
            PrimitiveTopology::TriangleFan => {
                for tri in 0..count.saturating_sub(2) {
                    if !(push(self, fetch(0))
                        && push(self, fetch(tri + 1))
                        && push(self, fetch(tri + 2)))
                    {
                        break;
                    }
                }
            }
            // Resolved at submit time; nothing to emit.
            PrimitiveTopology::KeepPrevious => {}
        }

        attempted
    }

    fn push_index(&mut self, value: u32) {
        if self.indices.len() < self.capacity {
            let value = value as u16;
            self.max_index = self.max_index.max(value);
            self.indices.push(value);
        } else {
            self.dropped += 1;
        }
    }

    /// Translated indices emitted so far
    pub fn indices(&self) -> &[u16] {
        &self.indices
    }

    /// Number of translated indices emitted so far
    pub fn index_count(&self) -> u32 {
        self.indices.len() as u32
    }

    /// Merged output topology, `None` until a run contributes
    pub const fn topology(&self) -> Option<PrimitiveTopology> {
        self.topology
    }

    /// Largest merged-space index emitted
    pub const fn max_index(&self) -> u16 {
        self.max_index
    }

    /// Whether every contributing run was trivially ascending
    pub const fn is_pure(&self) -> bool {
        self.pure
    }

    /// Vertex count drawable non-indexed when the batch is pure
    pub const fn pure_count(&self) -> u32 {
        self.pure_count
    }

    /// Indices discarded because the buffer filled; logged at flush
    pub const fn dropped(&self) -> u32 {
        self.dropped
    }

    /// Log a capacity anomaly if any indices were dropped this batch
    pub fn report_dropped(&self) {
        if self.dropped > 0 {
            warn!(
                "index buffer full: dropped {} of {} indices this batch",
                self.dropped,
                self.dropped as usize + self.indices.len()
            );
        }
    }
}
