//! # Draw Engine
//!
//! A deferred draw-call batching engine that sits between an immediate-mode
//! geometry front end and a renderer that performs best when handed few,
//! large, batched draw commands.
//!
//! ## Features
//!
//! - **Deferred Submission**: Primitives are buffered one at a time and only
//!   decoded when a flush is actually required
//! - **Lazy Vertex Decoding**: Only the vertex ranges referenced by buffered
//!   calls are ever decoded into canonical records
//! - **Draw-Call Merging**: Runs of indexed draws sharing one vertex source
//!   collapse into a single decode plus index-translation pass
//! - **Decoder Caching**: One decoder per distinct vertex-format tag,
//!   invalidated as a whole on context loss
//!
//! ## Architecture
//!
//! - [`DrawEngine`]: submission front end and flush coordinator
//! - [`batch`]: deferred-call buffering, index translation, merge logic
//! - [`vertex`]: vertex-format tags, decoders, and the decoder cache
//! - [`dispatch`]: collaborator traits for the command sink, the software
//!   transform stage, and draw-cycle observers
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use draw_engine::prelude::*;
//!
//! # struct NullSink;
//! # impl CommandSink for NullSink {
//! #     fn bind_vertex_data(&mut self, _data: &[u8], _stride: u32) {}
//! #     fn bind_index_data(&mut self, _indices: &[u16]) {}
//! #     fn draw_indexed(&mut self, _t: PrimitiveTopology, _i: u32, _v: u32) {}
//! #     fn draw(&mut self, _t: PrimitiveTopology, _v: u32) {}
//! #     fn clear(&mut self, _clear: ClearCommand) {}
//! # }
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let vertices: Vec<u8> = load_vertex_bytes();
//!     let mut engine = DrawEngine::new(DrawConfig::default())?;
//!     let mut state = RenderState::default();
//!     let mut sink = NullSink;
//!
//!     let mut out = Collaborators::new(&mut sink);
//!     let format = VertexFormat::new(
//!         PositionFormat::F32,
//!         NormalFormat::None,
//!         TexCoordFormat::None,
//!         ColorFormat::None,
//!     );
//!     engine.submit(&mut state, &mut out, &vertices, None,
//!         PrimitiveTopology::Triangles, 3, format);
//!     engine.flush(&mut state, &mut out);
//!     Ok(())
//! }
//! # fn load_vertex_bytes() -> Vec<u8> { Vec::new() }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions, clippy::similar_names, clippy::too_many_arguments)]

pub mod foundation;

pub mod batch;
pub mod config;
pub mod dispatch;
pub mod state;
pub mod stats;
pub mod vertex;

mod engine;

pub use engine::{Collaborators, DrawEngine, EngineError};

/// Common imports for engine users
pub mod prelude {
    pub use crate::{
        batch::PrimitiveTopology,
        config::{Config, ConfigError, DrawConfig},
        dispatch::{
            ClearCommand, ClearMask, CommandSink, DrawObserver, TransformInput, TransformResult,
            TransformStage, TransformedVertex,
        },
        state::{RenderState, TransformMode, UvGenMode, VertexBounds},
        stats::DrawStats,
        vertex::{
            ColorFormat, DecodedVertex, DecoderKey, IndexWidth, NormalFormat, PositionFormat,
            TexCoordFormat, VertexFormat, WeightFormat,
        },
        Collaborators, DrawEngine, EngineError,
    };
}
