//! Aggregate draw statistics
//!
//! Counters exposed to telemetry collaborators. Anomalies inside the engine
//! never propagate as errors; these counters plus the log stream are the
//! only externally visible record of a degraded flush.

/// Statistics accumulated across flushes
///
/// Counters are cumulative for the lifetime of the engine (or until
/// [`DrawStats::reset`]); per-batch state is reset by each flush instead.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DrawStats {
    /// Number of completed flush cycles
    pub flushes: u64,

    /// Number of deferred draw calls consumed by flushes
    pub draw_calls: u64,

    /// Total vertices described by submitted draw calls
    pub vertices_submitted: u64,

    /// Total vertices actually decoded into canonical records
    ///
    /// Merging keeps this below `vertices_submitted` whenever indexed calls
    /// share a vertex source.
    pub vertices_decoded: u64,
}

impl DrawStats {
    /// Average number of draw calls merged into one flush
    pub fn avg_calls_per_flush(&self) -> f64 {
        if self.flushes == 0 {
            0.0
        } else {
            self.draw_calls as f64 / self.flushes as f64
        }
    }

    /// Fraction of submitted vertices that never needed decoding
    pub fn decode_savings(&self) -> f64 {
        if self.vertices_submitted == 0 {
            0.0
        } else {
            1.0 - self.vertices_decoded as f64 / self.vertices_submitted as f64
        }
    }

    /// Reset all counters to zero
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}
