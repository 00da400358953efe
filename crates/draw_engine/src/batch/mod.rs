//! # Deferred Draw-Call Batching
//!
//! The buffering half of the engine: submitted primitives become
//! [`DeferredDrawCall`]s in a fixed-capacity [`DeferredBatch`], where they
//! wait undecoded until a flush trigger fires. At drain time the batch
//! catches up lazily, merging adjacent indexed calls that share a vertex
//! source into a single decode pass while the [`IndexTranslator`] rewrites
//! their indices into one merged 0-based vertex space.

pub mod buffer;
pub mod deferred;
pub mod index_translator;
pub mod topology;

pub use buffer::DeferredBatch;
pub use deferred::DeferredDrawCall;
pub use index_translator::IndexTranslator;
pub use topology::{MergeClass, PrimitiveTopology};
