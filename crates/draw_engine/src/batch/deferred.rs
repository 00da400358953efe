//! Deferred draw calls and raw index access
//!
//! A [`DeferredDrawCall`] is the buffered description of one primitive
//! submission: borrowed, still-uninterpreted vertex and index bytes plus
//! the metadata needed to decode and merge them later. Index bounds are
//! computed eagerly at submit time so the merge scan never rereads index
//! data to size a run.

use log::warn;

use super::topology::PrimitiveTopology;
use crate::vertex::{DecoderKey, IndexWidth, VertexFormat};

/// One buffered primitive submission awaiting decode
///
/// Borrows the caller's vertex and index bytes for the lifetime of the
/// batch; the flush that consumes the call releases the borrow.
#[derive(Debug, Clone, Copy)]
pub struct DeferredDrawCall<'mem> {
    /// Raw vertex bytes, laid out per `format`
    pub verts: &'mem [u8],
    /// Raw index bytes, absent for unindexed draws
    pub indices: Option<&'mem [u8]>,
    /// Vertex-layout tag the call was submitted with
    pub format: VertexFormat,
    /// Decoder identity resolved at submit time (layout plus mode bits)
    pub key: DecoderKey,
    /// Element width of `indices`
    pub index_width: IndexWidth,
    /// Topology after sentinel resolution
    pub topology: PrimitiveTopology,
    /// Number of vertices the call draws
    pub vertex_count: u32,
    /// Smallest index referenced, 0 for unindexed calls
    pub index_lower_bound: u16,
    /// Largest index referenced, `vertex_count - 1` for unindexed calls
    pub index_upper_bound: u16,
}

impl DeferredDrawCall<'_> {
    /// Whether this call references the identical vertex source as `other`
    ///
    /// Identity, not content: the merge optimization exists precisely to
    /// avoid reading vertex data before the merged bounds are known.
    pub fn shares_vertex_source(&self, other: &Self) -> bool {
        std::ptr::eq(self.verts, other.verts)
    }
}

/// Read index element `i` from raw index bytes
///
/// Returns `None` past the end of the data.
pub(crate) fn read_index(raw: &[u8], width: IndexWidth, i: usize) -> Option<u16> {
    match width {
        IndexWidth::None => None,
        IndexWidth::U8 => raw.get(i).copied().map(u16::from),
        IndexWidth::U16 => {
            let bytes = raw.get(i * 2..i * 2 + 2)?;
            Some(u16::from_le_bytes([bytes[0], bytes[1]]))
        }
    }
}

/// Scan `count` index elements for their inclusive `[lower, upper]` bounds
///
/// Runs eagerly at submit time. Truncated index data degrades to the
/// bounds of whatever was readable.
pub(crate) fn index_bounds(raw: &[u8], width: IndexWidth, count: u32) -> (u16, u16) {
    let mut lower = u16::MAX;
    let mut upper = 0u16;
    let mut scanned = 0u32;

    for i in 0..count as usize {
        let Some(value) = read_index(raw, width, i) else {
            break;
        };
        lower = lower.min(value);
        upper = upper.max(value);
        scanned += 1;
    }

    if scanned < count {
        warn!("index data truncated: scanned {scanned} of {count} elements");
    }
    if scanned == 0 {
        return (0, 0);
    }
    (lower, upper)
}
