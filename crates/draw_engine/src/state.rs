//! # Render-State Context
//!
//! The explicit per-frame state object passed by reference into submit and
//! flush. Nothing in the engine reads process-wide state; everything the
//! batching and dispatch decisions depend on lives here, owned by the
//! caller.

/// How flushed geometry reaches the renderer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TransformMode {
    /// The renderer performs its own geometry transform; decoded vertices
    /// and merged indices are handed to it directly
    #[default]
    Hardware,

    /// Geometry runs through the software transform/clip collaborator
    /// before dispatch
    Software,
}

/// Texture-coordinate generation mode
///
/// Folded into the decoder cache key: two byte-identical vertex layouts
/// under different generation modes must not share a decoder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum UvGenMode {
    /// Coordinates come straight from the vertex data
    #[default]
    SourceCoords = 0,

    /// Coordinates run through the texture matrix
    TextureMatrix = 1,

    /// Environment-mapped coordinates
    EnvironmentMap = 2,
}

impl UvGenMode {
    /// Mode bits as placed in the top byte of a decoder cache key
    pub const fn key_bits(self) -> u32 {
        (self as u32) << 24
    }
}

/// Texture-coordinate bounding box accumulated over decoded vertices
///
/// Downstream texture logic may examine this after a flush; the flush
/// resets it to the empty sentinel.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VertexBounds {
    /// Smallest u seen
    pub min_u: f32,
    /// Smallest v seen
    pub min_v: f32,
    /// Largest u seen
    pub max_u: f32,
    /// Largest v seen
    pub max_v: f32,
}

impl VertexBounds {
    /// An empty bounding box: min sentinels above any real coordinate,
    /// max sentinels below
    pub const EMPTY: Self = Self {
        min_u: f32::INFINITY,
        min_v: f32::INFINITY,
        max_u: f32::NEG_INFINITY,
        max_v: f32::NEG_INFINITY,
    };

    /// Fold one texture coordinate into the box
    pub fn include(&mut self, u: f32, v: f32) {
        self.min_u = self.min_u.min(u);
        self.min_v = self.min_v.min(v);
        self.max_u = self.max_u.max(u);
        self.max_v = self.max_v.max(v);
    }

    /// Whether any coordinate has been folded in since the last reset
    pub fn is_empty(&self) -> bool {
        self.max_u < self.min_u
    }

    /// Reset to the empty sentinel
    pub fn reset(&mut self) {
        *self = Self::EMPTY;
    }
}

impl Default for VertexBounds {
    fn default() -> Self {
        Self::EMPTY
    }
}

/// Render state the engine consults while batching and dispatching
///
/// Owned and mutated by the caller between submissions; the engine itself
/// only writes [`RenderState::texture_state_dirty`] (the render-target
/// aliasing rule) and [`RenderState::vertex_bounds`].
#[derive(Debug, Clone, Default)]
pub struct RenderState {
    /// Dispatch mode for flushed batches
    pub transform_mode: TransformMode,

    /// Current texture-coordinate generation mode
    pub uv_gen_mode: UvGenMode,

    /// Address of the currently bound texture
    pub texture_address: u32,

    /// Address of the current render target
    pub framebuffer_address: u32,

    /// Render-target width in pixels
    pub render_width: u32,

    /// Render-target height in pixels
    pub render_height: u32,

    /// Clear-mode writes touch the color channels
    pub clear_color_mask: bool,

    /// Clear-mode writes touch the alpha channel (stencil on this hardware)
    pub clear_alpha_mask: bool,

    /// Clear-mode writes touch the depth channel
    pub clear_depth_mask: bool,

    /// Set by the engine when a rectangle draw textures from the current
    /// render target; the texture layer must revalidate its binding
    pub texture_state_dirty: bool,

    /// Texture-coordinate bounds of everything decoded this batch
    pub vertex_bounds: VertexBounds,
}

impl RenderState {
    /// Address comparison mask for the render-target aliasing rule
    ///
    /// The top address bits are cache-control flags on this hardware and
    /// must not defeat the alias check.
    pub const ADDRESS_MASK: u32 = 0x3FFF_FFFF;

    /// Whether the bound texture aliases the current render target
    pub const fn texture_aliases_render_target(&self) -> bool {
        (self.texture_address & Self::ADDRESS_MASK)
            == (self.framebuffer_address & Self::ADDRESS_MASK)
    }
}
