//! Vertex-format tags and the decoder cache key
//!
//! A [`VertexFormat`] is a `u32` bit field describing how one packed vertex
//! is laid out in source memory: which attributes are present, their
//! component types, how many skinning weights ride along, and whether the
//! coordinates are pre-transformed ("through" mode). The encoding mirrors
//! the command stream the front end consumes, so tags can be stored and
//! compared as plain integers.
//!
//! Attribute order in source memory is fixed: weights, texture coordinates,
//! color, normal, position. Each attribute is aligned to its component
//! size, and the whole vertex is padded to the largest component alignment.

use crate::state::UvGenMode;

const TC_SHIFT: u32 = 0;
const TC_MASK: u32 = 0x3;
const COL_SHIFT: u32 = 2;
const COL_MASK: u32 = 0x7;
const NRM_SHIFT: u32 = 5;
const NRM_MASK: u32 = 0x3;
const POS_SHIFT: u32 = 7;
const POS_MASK: u32 = 0x3;
const WT_SHIFT: u32 = 9;
const WT_MASK: u32 = 0x3;
const IDX_SHIFT: u32 = 11;
const IDX_MASK: u32 = 0x3;
const WTCOUNT_SHIFT: u32 = 14;
const WTCOUNT_MASK: u32 = 0x7;
const THROUGH_BIT: u32 = 1 << 23;

/// Layout portion of the tag; the top byte is reserved for mode bits.
const LAYOUT_MASK: u32 = 0x00FF_FFFF;

/// Position component type
///
/// Positions are always present. The reserved `0` encoding reads as `F32`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PositionFormat {
    /// Signed 8-bit fixed point, scaled by 1/128 outside through mode
    S8,
    /// Signed 16-bit fixed point, scaled by 1/32768 outside through mode
    S16,
    /// 32-bit float
    F32,
}

impl PositionFormat {
    fn from_bits(bits: u32) -> Self {
        match bits {
            1 => Self::S8,
            2 => Self::S16,
            _ => Self::F32,
        }
    }

    const fn bits(self) -> u32 {
        match self {
            Self::S8 => 1,
            Self::S16 => 2,
            Self::F32 => 3,
        }
    }

    /// Size of one component in bytes (also its alignment)
    pub const fn component_size(self) -> usize {
        match self {
            Self::S8 => 1,
            Self::S16 => 2,
            Self::F32 => 4,
        }
    }
}

/// Normal component type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NormalFormat {
    /// No normals in the source data
    None,
    /// Signed 8-bit fixed point, scaled by 1/128
    S8,
    /// Signed 16-bit fixed point, scaled by 1/32768
    S16,
    /// 32-bit float
    F32,
}

impl NormalFormat {
    fn from_bits(bits: u32) -> Self {
        match bits {
            1 => Self::S8,
            2 => Self::S16,
            3 => Self::F32,
            _ => Self::None,
        }
    }

    const fn bits(self) -> u32 {
        match self {
            Self::None => 0,
            Self::S8 => 1,
            Self::S16 => 2,
            Self::F32 => 3,
        }
    }

    /// Size of one component in bytes, zero when absent
    pub const fn component_size(self) -> usize {
        match self {
            Self::None => 0,
            Self::S8 => 1,
            Self::S16 => 2,
            Self::F32 => 4,
        }
    }
}

/// Texture-coordinate component type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TexCoordFormat {
    /// No texture coordinates in the source data
    None,
    /// Unsigned 8-bit, scaled by 1/128 outside through mode
    U8,
    /// Unsigned 16-bit, scaled by 1/32768 outside through mode
    U16,
    /// 32-bit float
    F32,
}

impl TexCoordFormat {
    fn from_bits(bits: u32) -> Self {
        match bits {
            1 => Self::U8,
            2 => Self::U16,
            3 => Self::F32,
            _ => Self::None,
        }
    }

    const fn bits(self) -> u32 {
        match self {
            Self::None => 0,
            Self::U8 => 1,
            Self::U16 => 2,
            Self::F32 => 3,
        }
    }

    /// Size of one component in bytes, zero when absent
    pub const fn component_size(self) -> usize {
        match self {
            Self::None => 0,
            Self::U8 => 1,
            Self::U16 => 2,
            Self::F32 => 4,
        }
    }
}

/// Packed color format
///
/// All formats expand to RGBA8888 during decode. Reserved encodings read
/// as `None`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColorFormat {
    /// No color in the source data
    None,
    /// 16-bit 5:6:5 RGB
    Rgb565,
    /// 16-bit 5:5:5:1 RGBA
    Rgba5551,
    /// 16-bit 4:4:4:4 RGBA
    Rgba4444,
    /// 32-bit 8:8:8:8 RGBA
    Rgba8888,
}

impl ColorFormat {
    fn from_bits(bits: u32) -> Self {
        match bits {
            4 => Self::Rgb565,
            5 => Self::Rgba5551,
            6 => Self::Rgba4444,
            7 => Self::Rgba8888,
            _ => Self::None,
        }
    }

    const fn bits(self) -> u32 {
        match self {
            Self::None => 0,
            Self::Rgb565 => 4,
            Self::Rgba5551 => 5,
            Self::Rgba4444 => 6,
            Self::Rgba8888 => 7,
        }
    }

    /// Size of the packed color in bytes (also its alignment), zero when
    /// absent
    pub const fn size(self) -> usize {
        match self {
            Self::None => 0,
            Self::Rgb565 | Self::Rgba5551 | Self::Rgba4444 => 2,
            Self::Rgba8888 => 4,
        }
    }
}

/// Skinning-weight component type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WeightFormat {
    /// No weights in the source data
    None,
    /// Unsigned 8-bit, scaled by 1/128
    U8,
    /// Unsigned 16-bit, scaled by 1/32768
    U16,
    /// 32-bit float
    F32,
}

impl WeightFormat {
    fn from_bits(bits: u32) -> Self {
        match bits {
            1 => Self::U8,
            2 => Self::U16,
            3 => Self::F32,
            _ => Self::None,
        }
    }

    const fn bits(self) -> u32 {
        match self {
            Self::None => 0,
            Self::U8 => 1,
            Self::U16 => 2,
            Self::F32 => 3,
        }
    }

    /// Size of one weight in bytes, zero when absent
    pub const fn component_size(self) -> usize {
        match self {
            Self::None => 0,
            Self::U8 => 1,
            Self::U16 => 2,
            Self::F32 => 4,
        }
    }
}

/// Width of the index elements accompanying a draw call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexWidth {
    /// Unindexed draw
    None,
    /// 8-bit indices
    U8,
    /// 16-bit little-endian indices
    U16,
}

impl IndexWidth {
    fn from_bits(bits: u32) -> Self {
        match bits {
            1 => Self::U8,
            2 => Self::U16,
            _ => Self::None,
        }
    }

    const fn bits(self) -> u32 {
        match self {
            Self::None => 0,
            Self::U8 => 1,
            Self::U16 => 2,
        }
    }

    /// Size of one index element in bytes, zero when unindexed
    pub const fn element_size(self) -> usize {
        match self {
            Self::None => 0,
            Self::U8 => 1,
            Self::U16 => 2,
        }
    }
}

/// Vertex-layout tag for one draw call
///
/// Wraps the raw `u32` the front end supplies. Accessors pull the
/// individual attribute formats back out; [`VertexFormat::source_stride`]
/// computes the packed per-vertex byte size the way the source hardware
/// lays vertices out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VertexFormat(u32);

impl VertexFormat {
    /// Build a tag from the four always-addressable attributes
    pub const fn new(
        position: PositionFormat,
        normal: NormalFormat,
        texcoord: TexCoordFormat,
        color: ColorFormat,
    ) -> Self {
        Self(
            position.bits() << POS_SHIFT
                | normal.bits() << NRM_SHIFT
                | texcoord.bits() << TC_SHIFT
                | color.bits() << COL_SHIFT,
        )
    }

    /// Wrap a raw tag from the command stream
    pub const fn from_raw(raw: u32) -> Self {
        Self(raw)
    }

    /// The raw tag value
    pub const fn raw(self) -> u32 {
        self.0
    }

    /// Add skinning weights; `count` is clamped to 1..=8
    pub const fn with_weights(self, format: WeightFormat, count: u32) -> Self {
        let count = if count == 0 {
            1
        } else if count > 8 {
            8
        } else {
            count
        };
        Self(
            (self.0 & !(WT_MASK << WT_SHIFT | WTCOUNT_MASK << WTCOUNT_SHIFT))
                | format.bits() << WT_SHIFT
                | (count - 1) << WTCOUNT_SHIFT,
        )
    }

    /// Mark the draw as indexed with the given element width
    pub const fn with_indices(self, width: IndexWidth) -> Self {
        Self((self.0 & !(IDX_MASK << IDX_SHIFT)) | width.bits() << IDX_SHIFT)
    }

    /// Mark coordinates as pre-transformed screen space
    pub const fn with_through_mode(self) -> Self {
        Self(self.0 | THROUGH_BIT)
    }

    /// Position component type
    pub fn position(self) -> PositionFormat {
        PositionFormat::from_bits(self.0 >> POS_SHIFT & POS_MASK)
    }

    /// Normal component type
    pub fn normal(self) -> NormalFormat {
        NormalFormat::from_bits(self.0 >> NRM_SHIFT & NRM_MASK)
    }

    /// Texture-coordinate component type
    pub fn texcoord(self) -> TexCoordFormat {
        TexCoordFormat::from_bits(self.0 >> TC_SHIFT & TC_MASK)
    }

    /// Packed color format
    pub fn color(self) -> ColorFormat {
        ColorFormat::from_bits(self.0 >> COL_SHIFT & COL_MASK)
    }

    /// Skinning-weight component type
    pub fn weight(self) -> WeightFormat {
        WeightFormat::from_bits(self.0 >> WT_SHIFT & WT_MASK)
    }

    /// Number of skinning weights per vertex (0 when unweighted)
    pub fn weight_count(self) -> usize {
        if self.weight() == WeightFormat::None {
            0
        } else {
            (self.0 >> WTCOUNT_SHIFT & WTCOUNT_MASK) as usize + 1
        }
    }

    /// Index element width for draws using this format
    pub fn index_width(self) -> IndexWidth {
        IndexWidth::from_bits(self.0 >> IDX_SHIFT & IDX_MASK)
    }

    /// Whether coordinates are pre-transformed screen space
    pub const fn is_through_mode(self) -> bool {
        self.0 & THROUGH_BIT != 0
    }

    /// Whether the format carries per-vertex skinning weights
    pub fn has_weights(self) -> bool {
        self.weight() != WeightFormat::None
    }

    /// Layout bits with the index field masked out
    ///
    /// Index width does not influence how a vertex itself decodes, so it is
    /// excluded from decoder identity.
    pub const fn layout_bits(self) -> u32 {
        self.0 & LAYOUT_MASK & !(IDX_MASK << IDX_SHIFT)
    }

    /// Packed byte size of one source vertex
    ///
    /// Attributes appear in weights/texcoord/color/normal/position order,
    /// each aligned to its component size, the total padded to the largest
    /// alignment present.
    pub fn source_stride(self) -> usize {
        let mut size = 0usize;
        let mut max_align = 1usize;

        let wsize = self.weight().component_size();
        if wsize > 0 {
            size = align_to(size, wsize) + wsize * self.weight_count();
            max_align = max_align.max(wsize);
        }

        let tsize = self.texcoord().component_size();
        if tsize > 0 {
            size = align_to(size, tsize) + tsize * 2;
            max_align = max_align.max(tsize);
        }

        let csize = self.color().size();
        if csize > 0 {
            size = align_to(size, csize) + csize;
            max_align = max_align.max(csize);
        }

        let nsize = self.normal().component_size();
        if nsize > 0 {
            size = align_to(size, nsize) + nsize * 3;
            max_align = max_align.max(nsize);
        }

        let psize = self.position().component_size();
        size = align_to(size, psize) + psize * 3;
        max_align = max_align.max(psize);

        align_to(size, max_align)
    }

    /// Byte offsets of each attribute within one source vertex
    ///
    /// Offsets are `None` for absent attributes.
    pub(crate) fn attribute_offsets(self) -> AttributeOffsets {
        let mut cursor = 0usize;

        let wsize = self.weight().component_size();
        let weights = (wsize > 0).then(|| {
            cursor = align_to(cursor, wsize);
            let off = cursor;
            cursor += wsize * self.weight_count();
            off
        });

        let tsize = self.texcoord().component_size();
        let texcoord = (tsize > 0).then(|| {
            cursor = align_to(cursor, tsize);
            let off = cursor;
            cursor += tsize * 2;
            off
        });

        let csize = self.color().size();
        let color = (csize > 0).then(|| {
            cursor = align_to(cursor, csize);
            let off = cursor;
            cursor += csize;
            off
        });

        let nsize = self.normal().component_size();
        let normal = (nsize > 0).then(|| {
            cursor = align_to(cursor, nsize);
            let off = cursor;
            cursor += nsize * 3;
            off
        });

        let psize = self.position().component_size();
        cursor = align_to(cursor, psize);
        let position = cursor;

        AttributeOffsets {
            weights,
            texcoord,
            color,
            normal,
            position,
        }
    }
}

/// Byte offsets of each attribute within one packed vertex
#[derive(Debug, Clone, Copy)]
pub(crate) struct AttributeOffsets {
    pub weights: Option<usize>,
    pub texcoord: Option<usize>,
    pub color: Option<usize>,
    pub normal: Option<usize>,
    pub position: usize,
}

const fn align_to(value: usize, align: usize) -> usize {
    (value + align - 1) / align * align
}

/// Decoder cache key: layout bits plus texture-coordinate mode bits
///
/// Two byte-identical layouts under different generation modes produce
/// distinct keys and therefore distinct decoders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DecoderKey(u32);

impl DecoderKey {
    /// Compose a key from a format tag and the current generation mode
    pub const fn new(format: VertexFormat, mode: UvGenMode) -> Self {
        Self(format.layout_bits() | mode.key_bits())
    }

    /// The layout portion of the key, as a format tag
    pub const fn format(self) -> VertexFormat {
        VertexFormat::from_raw(self.0 & LAYOUT_MASK)
    }

    /// The composed key bits
    pub const fn bits(self) -> u32 {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip_through_bits() {
        let format = VertexFormat::new(
            PositionFormat::S16,
            NormalFormat::S8,
            TexCoordFormat::U16,
            ColorFormat::Rgba4444,
        )
        .with_weights(WeightFormat::U8, 4)
        .with_indices(IndexWidth::U16)
        .with_through_mode();

        let reparsed = VertexFormat::from_raw(format.raw());
        assert_eq!(reparsed.position(), PositionFormat::S16);
        assert_eq!(reparsed.normal(), NormalFormat::S8);
        assert_eq!(reparsed.texcoord(), TexCoordFormat::U16);
        assert_eq!(reparsed.color(), ColorFormat::Rgba4444);
        assert_eq!(reparsed.weight(), WeightFormat::U8);
        assert_eq!(reparsed.weight_count(), 4);
        assert_eq!(reparsed.index_width(), IndexWidth::U16);
        assert!(reparsed.is_through_mode());
    }

    #[test]
    fn test_stride_simple_float_format() {
        // pos f32x3 only
        let format = VertexFormat::new(
            PositionFormat::F32,
            NormalFormat::None,
            TexCoordFormat::None,
            ColorFormat::None,
        );
        assert_eq!(format.source_stride(), 12);
    }

    #[test]
    fn test_stride_full_float_format() {
        // uv f32x2 + color 8888 + normal f32x3 + pos f32x3
        let format = VertexFormat::new(
            PositionFormat::F32,
            NormalFormat::F32,
            TexCoordFormat::F32,
            ColorFormat::Rgba8888,
        );
        assert_eq!(format.source_stride(), 8 + 4 + 12 + 12);
    }

    #[test]
    fn test_stride_alignment_padding() {
        // uv u8x2 (2 bytes) then pos s16x3 aligned to 2 -> offset 2, total 8
        let format = VertexFormat::new(
            PositionFormat::S16,
            NormalFormat::None,
            TexCoordFormat::U8,
            ColorFormat::None,
        );
        assert_eq!(format.source_stride(), 8);

        let offsets = format.attribute_offsets();
        assert_eq!(offsets.texcoord, Some(0));
        assert_eq!(offsets.position, 2);
    }

    #[test]
    fn test_stride_weighted_format() {
        // 3 u8 weights, then s8 normals at 3, pos s8x3 at 6, padded to 9
        let format = VertexFormat::new(
            PositionFormat::S8,
            NormalFormat::S8,
            TexCoordFormat::None,
            ColorFormat::None,
        )
        .with_weights(WeightFormat::U8, 3);
        assert_eq!(format.source_stride(), 9);
    }

    #[test]
    fn test_degenerate_weight_count_clamped() {
        let format = VertexFormat::new(
            PositionFormat::F32,
            NormalFormat::None,
            TexCoordFormat::None,
            ColorFormat::None,
        )
        .with_weights(WeightFormat::F32, 12);
        assert_eq!(format.weight_count(), 8);
    }

    #[test]
    fn test_decoder_key_mode_bits_distinguish() {
        let format = VertexFormat::new(
            PositionFormat::F32,
            NormalFormat::None,
            TexCoordFormat::F32,
            ColorFormat::None,
        );
        let a = DecoderKey::new(format, UvGenMode::SourceCoords);
        let b = DecoderKey::new(format, UvGenMode::EnvironmentMap);
        assert_ne!(a, b);
        assert_eq!(a.format(), b.format());
    }

    #[test]
    fn test_decoder_key_ignores_index_width() {
        let base = VertexFormat::new(
            PositionFormat::F32,
            NormalFormat::None,
            TexCoordFormat::None,
            ColorFormat::None,
        );
        let indexed = base.with_indices(IndexWidth::U16);
        assert_eq!(
            DecoderKey::new(base, UvGenMode::SourceCoords),
            DecoderKey::new(indexed, UvGenMode::SourceCoords)
        );
    }
}
