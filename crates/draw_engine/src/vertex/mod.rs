//! # Vertex Formats and Decoding
//!
//! Submitted vertex data arrives as raw, uninterpreted bytes tagged with a
//! [`VertexFormat`] describing their packed layout. This module turns those
//! tags into [`VertexDecoder`]s that expand the packed attributes into
//! canonical [`DecodedVertex`] records, and memoizes one decoder per
//! distinct tag in a [`DecoderCache`].

pub mod cache;
pub mod decoder;
pub mod format;

pub use cache::DecoderCache;
pub use decoder::{DecodedVertex, VertexDecoder};
pub use format::{
    ColorFormat, DecoderKey, IndexWidth, NormalFormat, PositionFormat, TexCoordFormat,
    VertexFormat, WeightFormat,
};
