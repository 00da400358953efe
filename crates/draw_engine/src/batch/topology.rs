//! Primitive topologies and batch compatibility
//!
//! Two draw calls can accumulate into the same batch only when their
//! topologies reduce to the same merged index-space class; anything else
//! forces a flush between them.

/// Primitive topology of one submitted draw call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrimitiveTopology {
    /// Independent points
    Points,
    /// Independent line segments, two vertices each
    Lines,
    /// Connected line strip
    LineStrip,
    /// Independent triangles, three vertices each
    Triangles,
    /// Triangle strip
    TriangleStrip,
    /// Triangle fan
    TriangleFan,
    /// Axis-aligned sprites described by two corner vertices each
    Rectangles,
    /// Sentinel: repeat the topology of the previous submission
    ///
    /// Resolved at submit time; never stored in a deferred call.
    KeepPrevious,
}

/// Index-space class a topology merges into
///
/// Strips and fans are expanded to their list forms during index
/// generation, so each class corresponds to exactly one output topology.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeClass {
    /// Point list
    Points,
    /// Line list
    Lines,
    /// Triangle list
    Triangles,
    /// Rectangle (sprite) list
    Rectangles,
}

impl MergeClass {
    /// The list topology this class emits
    pub const fn list_topology(self) -> PrimitiveTopology {
        match self {
            Self::Points => PrimitiveTopology::Points,
            Self::Lines => PrimitiveTopology::Lines,
            Self::Triangles => PrimitiveTopology::Triangles,
            Self::Rectangles => PrimitiveTopology::Rectangles,
        }
    }
}

impl PrimitiveTopology {
    /// Resolve the [`PrimitiveTopology::KeepPrevious`] sentinel
    ///
    /// Falls back to `Points` when nothing has been submitted yet.
    #[must_use]
    pub fn resolve(self, previous: Option<Self>) -> Self {
        if self == Self::KeepPrevious {
            previous.unwrap_or(Self::Points)
        } else {
            self
        }
    }

    /// The merged index-space class of this topology
    pub const fn merge_class(self) -> MergeClass {
        match self {
            Self::Points | Self::KeepPrevious => MergeClass::Points,
            Self::Lines | Self::LineStrip => MergeClass::Lines,
            Self::Triangles | Self::TriangleStrip | Self::TriangleFan => MergeClass::Triangles,
            Self::Rectangles => MergeClass::Rectangles,
        }
    }

    /// Whether a call with this topology can join a batch accumulating
    /// under `previous`
    pub fn compatible_with(self, previous: Option<Self>) -> bool {
        previous.map_or(true, |prev| prev.merge_class() == self.merge_class())
    }

    /// Minimum vertex count that produces at least one primitive
    pub const fn min_vertices(self) -> u32 {
        match self {
            Self::Points | Self::KeepPrevious => 1,
            Self::Lines | Self::LineStrip | Self::Rectangles => 2,
            Self::Triangles | Self::TriangleStrip | Self::TriangleFan => 3,
        }
    }

    /// Whether `vertex_count` is too small to emit a single primitive
    ///
    /// Degenerate calls are still buffered for bounds tracking; they simply
    /// emit nothing at translation time.
    pub const fn is_degenerate(self, vertex_count: u32) -> bool {
        vertex_count < self.min_vertices()
    }
}
