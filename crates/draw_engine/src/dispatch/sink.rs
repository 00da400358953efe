//! The renderer-facing command sink

use bitflags::bitflags;

use crate::batch::PrimitiveTopology;

bitflags! {
    /// Channels touched by a clear dispatch
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct ClearMask: u32 {
        /// Color channels
        const COLOR = 1 << 0;
        /// Alpha channel
        const ALPHA = 1 << 1;
        /// Depth channel
        const DEPTH = 1 << 2;
        /// Stencil channel (stored in the alpha byte on this hardware)
        const STENCIL = 1 << 3;
    }
}

/// A per-channel clear of the full render-target extent
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClearCommand {
    /// Which channels to write
    pub mask: ClearMask,
    /// Clear color as RGBA in [0, 1]
    pub color: [f32; 4],
    /// Clear depth
    pub depth: f32,
    /// Clear stencil value (the alpha byte of the packed clear color)
    pub stencil: u8,
    /// Render-target width in pixels
    pub width: u32,
    /// Render-target height in pixels
    pub height: u32,
}

/// Renderer-side consumer of flushed batches
///
/// The engine binds a vertex range, optionally an index range, then issues
/// exactly one draw per flush. Bound ranges are only guaranteed valid until
/// the dispatching call returns; a sink that defers execution must copy.
pub trait CommandSink {
    /// Bind the vertex data for the draw that follows
    fn bind_vertex_data(&mut self, data: &[u8], stride: u32);

    /// Bind translated 16-bit indices for the draw that follows
    fn bind_index_data(&mut self, indices: &[u16]);

    /// Issue an indexed draw over the bound ranges
    ///
    /// `vertex_count` is the size of the bound vertex range;
    /// `index_count` the number of bound indices consumed.
    fn draw_indexed(&mut self, topology: PrimitiveTopology, index_count: u32, vertex_count: u32);

    /// Issue a non-indexed draw over the bound vertex range
    fn draw(&mut self, topology: PrimitiveTopology, vertex_count: u32);

    /// Clear channels of the full render target
    fn clear(&mut self, clear: ClearCommand);
}
