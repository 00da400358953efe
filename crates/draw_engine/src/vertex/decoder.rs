//! Canonical vertex records and the format decoder
//!
//! A [`VertexDecoder`] is a pure function of (format key, source bytes,
//! index range): it expands packed source vertices into fixed-stride
//! [`DecodedVertex`] records. Decoders are immutable once built and safe to
//! share through the cache.

use bytemuck::{Pod, Zeroable};
use log::warn;

use super::format::{
    AttributeOffsets, ColorFormat, DecoderKey, NormalFormat, PositionFormat, TexCoordFormat,
    VertexFormat, WeightFormat,
};

/// Canonical decoded vertex record
///
/// Every source format expands to this layout. Color is packed RGBA8888
/// with red in the low byte (`0xAABB_GGRR`); absent attributes decode to
/// zero. Weights are always expanded to float so the skinning path never
/// needs to re-inspect the source format.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct DecodedVertex {
    /// Object-space (or through-mode screen-space) position
    pub position: [f32; 3],
    /// Vertex normal, zero when the format carries none
    pub normal: [f32; 3],
    /// Texture coordinates, zero when the format carries none
    pub uv: [f32; 2],
    /// RGBA8888 color, red in the low byte, zero when absent
    pub color: u32,
    /// Skinning weights, expanded to float, zero-padded to eight
    pub weights: [f32; 8],
}

impl DecodedVertex {
    /// Byte stride of one canonical record
    pub const STRIDE: usize = std::mem::size_of::<Self>();
}

/// Decoder for one distinct vertex-format key
///
/// Built lazily by the cache, immutable afterwards. Decoding is
/// deterministic and side-effect free apart from log records on truncated
/// input.
#[derive(Debug)]
pub struct VertexDecoder {
    key: DecoderKey,
    format: VertexFormat,
    stride: usize,
    offsets: AttributeOffsets,
}

impl VertexDecoder {
    /// Build the decoder for a cache key
    pub fn new(key: DecoderKey) -> Self {
        let format = key.format();
        Self {
            key,
            format,
            stride: format.source_stride(),
            offsets: format.attribute_offsets(),
        }
    }

    /// The key this decoder was built for
    pub const fn key(&self) -> DecoderKey {
        self.key
    }

    /// Packed byte size of one source vertex
    pub const fn source_stride(&self) -> usize {
        self.stride
    }

    /// Byte stride of one decoded record
    pub const fn output_stride(&self) -> usize {
        DecodedVertex::STRIDE
    }

    /// Decode the inclusive vertex range `[lower, upper]` from `src`,
    /// appending canonical records to `out`
    ///
    /// Returns the number of vertices written. Source data too short for
    /// the requested range is truncated, not an error; the shortfall is
    /// logged and the frame continues degraded.
    pub fn decode_range(
        &self,
        src: &[u8],
        lower: u16,
        upper: u16,
        out: &mut Vec<DecodedVertex>,
    ) -> usize {
        let mut written = 0usize;
        for i in lower as usize..=upper as usize {
            let base = i * self.stride;
            let Some(bytes) = src.get(base..base + self.stride) else {
                warn!(
                    "vertex source truncated: wanted [{lower}, {upper}] at stride {}, got {} bytes",
                    self.stride,
                    src.len()
                );
                break;
            };
            debug_assert!(out.len() < out.capacity(), "decode arena overflow");
            out.push(self.decode_one(bytes));
            written += 1;
        }
        written
    }

    fn decode_one(&self, bytes: &[u8]) -> DecodedVertex {
        let through = self.format.is_through_mode();
        let mut vertex = DecodedVertex::zeroed();

        if let Some(off) = self.offsets.weights {
            let wf = self.format.weight();
            let size = wf.component_size();
            for (slot, weight) in vertex
                .weights
                .iter_mut()
                .take(self.format.weight_count())
                .enumerate()
            {
                *weight = read_scaled_unsigned(wf, &bytes[off + slot * size..]);
            }
        }

        if let Some(off) = self.offsets.texcoord {
            let tf = self.format.texcoord();
            let size = tf.component_size();
            vertex.uv = [
                read_texcoord(tf, &bytes[off..], through),
                read_texcoord(tf, &bytes[off + size..], through),
            ];
        }

        if let Some(off) = self.offsets.color {
            vertex.color = read_color(self.format.color(), &bytes[off..]);
        }

        if let Some(off) = self.offsets.normal {
            let nf = self.format.normal();
            let size = nf.component_size();
            vertex.normal = [
                read_normal(nf, &bytes[off..]),
                read_normal(nf, &bytes[off + size..]),
                read_normal(nf, &bytes[off + size * 2..]),
            ];
        }

        let pf = self.format.position();
        let off = self.offsets.position;
        let size = pf.component_size();
        vertex.position = [
            read_position(pf, &bytes[off..], through),
            read_position(pf, &bytes[off + size..], through),
            read_position(pf, &bytes[off + size * 2..], through),
        ];

        vertex
    }
}

fn read_s8(bytes: &[u8]) -> f32 {
    f32::from(bytes[0] as i8)
}

fn read_s16(bytes: &[u8]) -> f32 {
    f32::from(i16::from_le_bytes([bytes[0], bytes[1]]))
}

fn read_u16(bytes: &[u8]) -> f32 {
    f32::from(u16::from_le_bytes([bytes[0], bytes[1]]))
}

fn read_f32(bytes: &[u8]) -> f32 {
    f32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]])
}

fn read_position(format: PositionFormat, bytes: &[u8], through: bool) -> f32 {
    match format {
        // Through-mode coordinates are already screen space and pass
        // unscaled.
        PositionFormat::S8 if through => read_s8(bytes),
        PositionFormat::S16 if through => read_s16(bytes),
        PositionFormat::S8 => read_s8(bytes) * (1.0 / 128.0),
        PositionFormat::S16 => read_s16(bytes) * (1.0 / 32768.0),
        PositionFormat::F32 => read_f32(bytes),
    }
}

fn read_normal(format: NormalFormat, bytes: &[u8]) -> f32 {
    match format {
        NormalFormat::None => 0.0,
        NormalFormat::S8 => read_s8(bytes) * (1.0 / 128.0),
        NormalFormat::S16 => read_s16(bytes) * (1.0 / 32768.0),
        NormalFormat::F32 => read_f32(bytes),
    }
}

fn read_texcoord(format: TexCoordFormat, bytes: &[u8], through: bool) -> f32 {
    match format {
        TexCoordFormat::None => 0.0,
        // Through-mode texture coordinates address texels directly.
        TexCoordFormat::U8 if through => f32::from(bytes[0]),
        TexCoordFormat::U16 if through => read_u16(bytes),
        TexCoordFormat::U8 => f32::from(bytes[0]) * (1.0 / 128.0),
        TexCoordFormat::U16 => read_u16(bytes) * (1.0 / 32768.0),
        TexCoordFormat::F32 => read_f32(bytes),
    }
}

fn read_scaled_unsigned(format: WeightFormat, bytes: &[u8]) -> f32 {
    match format {
        WeightFormat::None => 0.0,
        WeightFormat::U8 => f32::from(bytes[0]) * (1.0 / 128.0),
        WeightFormat::U16 => read_u16(bytes) * (1.0 / 32768.0),
        WeightFormat::F32 => read_f32(bytes),
    }
}

fn read_color(format: ColorFormat, bytes: &[u8]) -> u32 {
    match format {
        ColorFormat::None => 0,
        ColorFormat::Rgb565 => {
            let v = u16::from_le_bytes([bytes[0], bytes[1]]);
            let r = u32::from(v & 0x1F);
            let g = u32::from(v >> 5 & 0x3F);
            let b = u32::from(v >> 11 & 0x1F);
            pack_rgba(r << 3 | r >> 2, g << 2 | g >> 4, b << 3 | b >> 2, 0xFF)
        }
        ColorFormat::Rgba5551 => {
            let v = u16::from_le_bytes([bytes[0], bytes[1]]);
            let r = u32::from(v & 0x1F);
            let g = u32::from(v >> 5 & 0x1F);
            let b = u32::from(v >> 10 & 0x1F);
            let a = if v & 0x8000 != 0 { 0xFF } else { 0 };
            pack_rgba(r << 3 | r >> 2, g << 3 | g >> 2, b << 3 | b >> 2, a)
        }
        ColorFormat::Rgba4444 => {
            let v = u16::from_le_bytes([bytes[0], bytes[1]]);
            let r = u32::from(v & 0xF);
            let g = u32::from(v >> 4 & 0xF);
            let b = u32::from(v >> 8 & 0xF);
            let a = u32::from(v >> 12 & 0xF);
            pack_rgba(r * 17, g * 17, b * 17, a * 17)
        }
        ColorFormat::Rgba8888 => u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]),
    }
}

const fn pack_rgba(r: u32, g: u32, b: u32, a: u32) -> u32 {
    a << 24 | b << 16 | g << 8 | r
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::UvGenMode;
    use approx::assert_relative_eq;

    fn decoder_for(format: VertexFormat) -> VertexDecoder {
        VertexDecoder::new(DecoderKey::new(format, UvGenMode::SourceCoords))
    }

    #[test]
    fn test_decode_f32_positions() {
        let format = VertexFormat::new(
            PositionFormat::F32,
            NormalFormat::None,
            TexCoordFormat::None,
            ColorFormat::None,
        );
        let decoder = decoder_for(format);
        assert_eq!(decoder.source_stride(), 12);

        let mut src = Vec::new();
        for value in [1.0f32, 2.0, 3.0, -4.0, 5.5, 0.25] {
            src.extend_from_slice(&value.to_le_bytes());
        }

        let mut out = Vec::with_capacity(2);
        let written = decoder.decode_range(&src, 0, 1, &mut out);
        assert_eq!(written, 2);
        assert_eq!(out[0].position, [1.0, 2.0, 3.0]);
        assert_eq!(out[1].position, [-4.0, 5.5, 0.25]);
    }

    #[test]
    fn test_decode_s16_positions_scaled() {
        let format = VertexFormat::new(
            PositionFormat::S16,
            NormalFormat::None,
            TexCoordFormat::None,
            ColorFormat::None,
        );
        let decoder = decoder_for(format);

        // One vertex: (16384, -32768, 0) -> (0.5, -1.0, 0.0)
        let mut src = Vec::new();
        for value in [16384i16, -32768, 0] {
            src.extend_from_slice(&value.to_le_bytes());
        }

        let mut out = Vec::with_capacity(1);
        decoder.decode_range(&src, 0, 0, &mut out);
        assert_relative_eq!(out[0].position[0], 0.5);
        assert_relative_eq!(out[0].position[1], -1.0);
        assert_relative_eq!(out[0].position[2], 0.0);
    }

    #[test]
    fn test_through_mode_skips_position_scaling() {
        let format = VertexFormat::new(
            PositionFormat::S16,
            NormalFormat::None,
            TexCoordFormat::None,
            ColorFormat::None,
        )
        .with_through_mode();
        let decoder = decoder_for(format);

        let mut src = Vec::new();
        for value in [480i16, 272, 0] {
            src.extend_from_slice(&value.to_le_bytes());
        }

        let mut out = Vec::with_capacity(1);
        decoder.decode_range(&src, 0, 0, &mut out);
        assert_relative_eq!(out[0].position[0], 480.0);
        assert_relative_eq!(out[0].position[1], 272.0);
    }

    #[test]
    fn test_decode_middle_range_only() {
        let format = VertexFormat::new(
            PositionFormat::F32,
            NormalFormat::None,
            TexCoordFormat::None,
            ColorFormat::None,
        );
        let decoder = decoder_for(format);

        let mut src = Vec::new();
        for i in 0..4 {
            for value in [i as f32, 0.0, 0.0] {
                src.extend_from_slice(&value.to_le_bytes());
            }
        }

        let mut out = Vec::with_capacity(2);
        let written = decoder.decode_range(&src, 1, 2, &mut out);
        assert_eq!(written, 2);
        assert_eq!(out[0].position[0], 1.0);
        assert_eq!(out[1].position[0], 2.0);
    }

    #[test]
    fn test_truncated_source_degrades() {
        let format = VertexFormat::new(
            PositionFormat::F32,
            NormalFormat::None,
            TexCoordFormat::None,
            ColorFormat::None,
        );
        let decoder = decoder_for(format);

        let src = vec![0u8; 12]; // one vertex, range asks for two
        let mut out = Vec::with_capacity(2);
        let written = decoder.decode_range(&src, 0, 1, &mut out);
        assert_eq!(written, 1);
    }

    #[test]
    fn test_color_expansion_4444() {
        let format = VertexFormat::new(
            PositionFormat::F32,
            NormalFormat::None,
            TexCoordFormat::None,
            ColorFormat::Rgba4444,
        );
        let decoder = decoder_for(format);

        // color 0xF10F: r=0xF g=0x0 b=0x1 a=0xF
        let mut src = Vec::new();
        src.extend_from_slice(&0xF10Fu16.to_le_bytes());
        src.extend_from_slice(&[0u8; 2]); // pad to f32 alignment
        for value in [0.0f32, 0.0, 0.0] {
            src.extend_from_slice(&value.to_le_bytes());
        }
        assert_eq!(src.len(), decoder.source_stride());

        let mut out = Vec::with_capacity(1);
        decoder.decode_range(&src, 0, 0, &mut out);
        assert_eq!(out[0].color, 0xFF11_00FF);
    }

    #[test]
    fn test_color_expansion_565_opaque() {
        let format = VertexFormat::new(
            PositionFormat::F32,
            NormalFormat::None,
            TexCoordFormat::None,
            ColorFormat::Rgb565,
        );
        let decoder = decoder_for(format);

        // Pure red: r=31 g=0 b=0
        let mut src = Vec::new();
        src.extend_from_slice(&0x001Fu16.to_le_bytes());
        src.extend_from_slice(&[0u8; 2]);
        for value in [0.0f32, 0.0, 0.0] {
            src.extend_from_slice(&value.to_le_bytes());
        }

        let mut out = Vec::with_capacity(1);
        decoder.decode_range(&src, 0, 0, &mut out);
        assert_eq!(out[0].color, 0xFF00_00FF);
    }

    #[test]
    fn test_weights_expand_to_float() {
        let format = VertexFormat::new(
            PositionFormat::F32,
            NormalFormat::None,
            TexCoordFormat::None,
            ColorFormat::None,
        )
        .with_weights(WeightFormat::U8, 2);
        let decoder = decoder_for(format);

        // weights [128, 64] -> [1.0, 0.5]; aligned pad to 4 before position
        let mut src = vec![128u8, 64, 0, 0];
        for value in [0.0f32, 0.0, 0.0] {
            src.extend_from_slice(&value.to_le_bytes());
        }
        assert_eq!(src.len(), decoder.source_stride());

        let mut out = Vec::with_capacity(1);
        decoder.decode_range(&src, 0, 0, &mut out);
        assert_relative_eq!(out[0].weights[0], 1.0);
        assert_relative_eq!(out[0].weights[1], 0.5);
        assert_relative_eq!(out[0].weights[2], 0.0);
    }

    #[test]
    fn test_uv_decode_scaled_and_through() {
        let scaled = decoder_for(VertexFormat::new(
            PositionFormat::F32,
            NormalFormat::None,
            TexCoordFormat::U16,
            ColorFormat::None,
        ));
        let through = decoder_for(
            VertexFormat::new(
                PositionFormat::F32,
                NormalFormat::None,
                TexCoordFormat::U16,
                ColorFormat::None,
            )
            .with_through_mode(),
        );

        let mut src = Vec::new();
        src.extend_from_slice(&16384u16.to_le_bytes());
        src.extend_from_slice(&8192u16.to_le_bytes());
        for value in [0.0f32, 0.0, 0.0] {
            src.extend_from_slice(&value.to_le_bytes());
        }

        let mut out = Vec::with_capacity(1);
        scaled.decode_range(&src, 0, 0, &mut out);
        assert_relative_eq!(out[0].uv[0], 0.5);
        assert_relative_eq!(out[0].uv[1], 0.25);

        let mut out = Vec::with_capacity(1);
        through.decode_range(&src, 0, 0, &mut out);
        assert_relative_eq!(out[0].uv[0], 16384.0);
        assert_relative_eq!(out[0].uv[1], 8192.0);
    }

    #[test]
    fn test_decoded_vertex_is_pod() {
        let vertices = [DecodedVertex::zeroed(); 2];
        let bytes: &[u8] = bytemuck::cast_slice(&vertices);
        assert_eq!(bytes.len(), 2 * DecodedVertex::STRIDE);
    }
}
