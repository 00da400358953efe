//! The software transform/clip collaborator
//!
//! In software-pipeline mode the renderer cannot transform geometry
//! itself, so the flush routes decoded vertices and merged indices through
//! this stage first. The stage either produces screen-space vertices ready
//! to draw, or recognizes the batch as a clear-mode rectangle and asks for
//! a clear instead.

use bytemuck::{Pod, Zeroable};

use crate::batch::PrimitiveTopology;
use crate::state::RenderState;
use crate::vertex::DecodedVertex;

/// One screen-space vertex produced by the transform stage
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct TransformedVertex {
    /// Screen position plus fog coefficient in `w`
    pub position: [f32; 4],
    /// Perspective-correct texture coordinates
    pub uv: [f32; 3],
    /// Primary color, RGBA bytes
    pub color0: [u8; 4],
    /// Secondary (specular) color, RGBA bytes
    pub color1: [u8; 4],
}

impl TransformedVertex {
    /// Byte stride of one transformed vertex
    pub const STRIDE: usize = std::mem::size_of::<Self>();
}

/// Everything the transform stage sees for one flush
#[derive(Debug)]
pub struct TransformInput<'a> {
    /// Merged output topology of the batch
    pub topology: PrimitiveTopology,
    /// Decoded canonical vertices, in merged order
    pub vertices: &'a [DecodedVertex],
    /// Translated merged-space indices
    pub indices: &'a [u16],
    /// Largest index in `indices`
    pub max_index: u16,
    /// Render state current at flush time
    pub state: &'a RenderState,
}

/// Outcome of the transform stage
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TransformResult {
    /// Draw the transformed vertices written to the output arena
    DrawPrimitives {
        /// Number of vertices (non-indexed) or indices (indexed) to draw
        count: u32,
        /// Whether to draw through the translated index buffer
        indexed: bool,
    },
    /// The batch was a clear-mode write; clear instead of drawing
    Clear {
        /// Packed RGBA8888 clear color, alpha in the top byte
        color: u32,
        /// Clear depth
        depth: f32,
    },
}

/// Software transform/clip collaborator
pub trait TransformStage {
    /// Transform one flushed batch
    ///
    /// Writes screen-space vertices into `output` (cleared by the engine
    /// beforehand) and reports how to dispatch them.
    fn transform(
        &mut self,
        input: TransformInput<'_>,
        output: &mut Vec<TransformedVertex>,
    ) -> TransformResult;
}
