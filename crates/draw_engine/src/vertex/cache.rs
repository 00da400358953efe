//! Memoized vertex decoders, one per distinct format key

use std::collections::HashMap;
use std::rc::Rc;

use log::debug;

use super::decoder::VertexDecoder;
use super::format::DecoderKey;

/// Cache of lazily created vertex decoders
///
/// Keyed by the full [`DecoderKey`] — layout bits plus mode bits — so two
/// byte-identical layouts under different texture-coordinate modes never
/// share a decoder. Decoders are immutable once created; the only mutation
/// beyond lazy insertion is [`DecoderCache::clear`], which the engine
/// invokes on context invalidation and which must never run mid-batch.
#[derive(Debug, Default)]
pub struct DecoderCache {
    decoders: HashMap<DecoderKey, Rc<VertexDecoder>>,
}

impl DecoderCache {
    /// Create an empty cache
    pub fn new() -> Self {
        Self::default()
    }

    /// Fetch the decoder for `key`, building and memoizing it on first use
    pub fn decoder_for(&mut self, key: DecoderKey) -> Rc<VertexDecoder> {
        Rc::clone(self.decoders.entry(key).or_insert_with(|| {
            debug!("building vertex decoder for key {:#010x}", key.bits());
            Rc::new(VertexDecoder::new(key))
        }))
    }

    /// Number of cached decoders
    pub fn len(&self) -> usize {
        self.decoders.len()
    }

    /// Whether the cache holds no decoders
    pub fn is_empty(&self) -> bool {
        self.decoders.is_empty()
    }

    /// Release every cached decoder
    pub fn clear(&mut self) {
        debug!("clearing {} cached vertex decoders", self.decoders.len());
        self.decoders.clear();
    }
}
