//! Hand-written PNG encoder for block grids
//!
//! The encoder turns a grid of block ids plus a palette into an 8-bit RGBA,
//! non-interlaced PNG. It sizes its single output allocation up front from
//! the worst-case zlib expansion and never grows it afterwards:
//!
//! ```text
//! raw        = (width·scale · 4 + 1) · height·scale      filter byte per row
//! zlib bound = 6 + 5 · ⌈raw / 16384⌉ + raw
//! png        = signature + IHDR + tEXt + IDAT(zlib bound) + IEND
//! ```
//!
//! The filtered scanlines are staged behind the PNG region of the same
//! allocation and compressed forward into the IDAT chunk.

use crate::codec::bytes::ByteWriter;
use crate::codec::checksum::{adler32, Crc32};
use crate::codec::color::Rgba;
use crate::error::{ScarletError, ScarletResult};
use flate2::{Compress, Compression, FlushCompress, Status};
use tracing::debug;

/// PNG file signature
pub const SIGNATURE: [u8; 8] = [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];

/// Worst-case zlib overhead: 5 bytes per 16 KiB block plus 6 per stream
const ZLIB_BLOCK_SIZE: u64 = 16_384;
const ZLIB_BLOCK_OVERHEAD: u64 = 5;
const ZLIB_STREAM_OVERHEAD: u64 = 6;

/// Above this zlib bound, trade ratio for latency
pub const FAST_COMPRESSION_THRESHOLD: u64 = 10_000_000;

const TEXT_KEYWORD: &[u8] = b"Software";
const TEXT_SEPARATOR: &[u8] = &[0];
const TEXT_VALUE: &[u8] = b"Scarlet";

const BYTES_PER_PIXEL: u64 = 4;
const BIT_DEPTH: u8 = 8;
const COLOR_TYPE_RGBA: u8 = 6;
const FILTER_NONE: u8 = 0;

// length + type + crc
const CHUNK_OVERHEAD: u64 = 12;
const IHDR_DATA: u64 = 13;
const TEXT_DATA: u64 = TEXT_KEYWORD.len() as u64 + 1 + TEXT_VALUE.len() as u64;

/// Largest image dimension PNG allows
const MAX_DIMENSION: u64 = i32::MAX as u64;

/// Byte budget computed before anything is written.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SizePlan {
    /// Output image width in pixels (`width · scale`)
    pub width: u32,
    /// Output image height in pixels (`height · scale`)
    pub height: u32,
    /// Bytes in one filtered scanline, filter byte included
    pub row_len: usize,
    /// Filtered scanline stream size
    pub raw_len: usize,
    /// Worst-case zlib stream size for `raw_len`
    pub zlib_bound: usize,
    /// PNG size if the zlib stream hits its bound
    pub png_len: usize,
}

impl SizePlan {
    /// Compute the plan for a `width × height` grid rendered at `scale`
    pub fn new(width: u32, height: u32, scale: u32) -> ScarletResult<Self> {
        if width == 0 || height == 0 {
            return Err(ScarletError::InvalidImage(format!(
                "grid must not be empty ({}x{})",
                width, height
            )));
        }
        if scale == 0 {
            return Err(ScarletError::InvalidImage("scale must be at least 1".into()));
        }

        let out_width = u64::from(width) * u64::from(scale);
        let out_height = u64::from(height) * u64::from(scale);
        if out_width > MAX_DIMENSION || out_height > MAX_DIMENSION {
            return Err(ScarletError::InvalidImage(format!(
                "{}x{} at scale {} exceeds the PNG dimension limit",
                width, height, scale
            )));
        }

        let overflow = || {
            ScarletError::InvalidImage(format!(
                "{}x{} at scale {} is too large to encode",
                width, height, scale
            ))
        };

        let row_len = out_width
            .checked_mul(BYTES_PER_PIXEL)
            .and_then(|n| n.checked_add(1))
            .ok_or_else(overflow)?;
        let raw_len = row_len.checked_mul(out_height).ok_or_else(overflow)?;
        let blocks = raw_len.div_ceil(ZLIB_BLOCK_SIZE);
        let zlib_bound = raw_len
            .checked_add(ZLIB_STREAM_OVERHEAD + ZLIB_BLOCK_OVERHEAD * blocks)
            .ok_or_else(overflow)?;
        let png_len = SIGNATURE.len() as u64
            + (CHUNK_OVERHEAD + IHDR_DATA)
            + (CHUNK_OVERHEAD + TEXT_DATA)
            + (CHUNK_OVERHEAD + zlib_bound)
            + CHUNK_OVERHEAD;

        // IDAT length is a 31-bit field
        if zlib_bound > MAX_DIMENSION {
            return Err(overflow());
        }

        let to_usize = |n: u64| usize::try_from(n).map_err(|_| overflow());
        Ok(Self {
            width: out_width as u32,
            height: out_height as u32,
            row_len: to_usize(row_len)?,
            raw_len: to_usize(raw_len)?,
            zlib_bound: to_usize(zlib_bound)?,
            png_len: to_usize(png_len)?,
        })
    }

    /// Size of the single allocation: PNG region followed by staging
    pub fn allocation(&self) -> usize {
        self.png_len + self.raw_len
    }

    fn compression(&self) -> Compression {
        if self.zlib_bound as u64 >= FAST_COMPRESSION_THRESHOLD {
            Compression::fast()
        } else {
            Compression::default()
        }
    }
}

/// An encoded PNG and the buffer that holds it.
///
/// The buffer is sized for the worst case, so it is usually longer than the
/// image; only the first [`EncodedImage::len`] bytes are the PNG. The handle
/// owns the buffer until [`EncodedImage::release`] hands it on.
#[derive(Debug)]
#[must_use = "an encoded image owns its buffer; call `release` to take the bytes"]
pub struct EncodedImage {
    buf: Vec<u8>,
    len: usize,
}

impl EncodedImage {
    /// The PNG bytes
    pub fn as_bytes(&self) -> &[u8] {
        &self.buf[..self.len]
    }

    /// Logical PNG length
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Bytes allocated for encoding
    pub fn allocated(&self) -> usize {
        self.buf.len()
    }

    /// Give up the buffer, trimmed to the PNG bytes
    pub fn release(self) -> Vec<u8> {
        let mut buf = self.buf;
        buf.truncate(self.len);
        buf.shrink_to_fit();
        buf
    }
}

impl AsRef<[u8]> for EncodedImage {
    fn as_ref(&self) -> &[u8] {
        self.as_bytes()
    }
}

/// Encode a `width × height` grid of block ids as a PNG at `scale`.
///
/// Each block becomes a `scale × scale` square of its palette color. Ids past
/// the end of `palette`, and ids whose color is the unset sentinel, take
/// `palette[0]`.
pub fn encode(
    width: u32,
    height: u32,
    scale: u32,
    blocks: &[u16],
    palette: &[Rgba],
) -> ScarletResult<EncodedImage> {
    if blocks.len() as u64 != u64::from(width) * u64::from(height) {
        return Err(ScarletError::InvalidImage(format!(
            "{} blocks given for a {}x{} grid",
            blocks.len(),
            width,
            height
        )));
    }

    let plan = SizePlan::new(width, height, scale)?;
    let mut buf = vec![0u8; plan.allocation()];
    let (png, raw) = buf.split_at_mut(plan.png_len);

    let staged = write_scanlines(raw, &plan, width as usize, scale as usize, blocks, palette);
    if staged != plan.raw_len {
        return Err(ScarletError::FormatInvariant(format!(
            "staged {} scanline bytes, planned {}",
            staged, plan.raw_len
        )));
    }

    let mut w = ByteWriter::new(png);
    w.put_slice(&SIGNATURE)?;
    write_ihdr(&mut w, &plan)?;
    write_chunk(&mut w, b"tEXt", &[TEXT_KEYWORD, TEXT_SEPARATOR, TEXT_VALUE])?;
    write_idat(&mut w, &plan, raw)?;
    write_chunk(&mut w, b"IEND", &[])?;

    let len = w.position();
    if len > plan.png_len {
        return Err(ScarletError::FormatInvariant(format!(
            "wrote {} bytes, planned at most {}",
            len, plan.png_len
        )));
    }

    debug!(
        width = plan.width,
        height = plan.height,
        len,
        allocated = plan.allocation(),
        "Encoded PNG"
    );

    Ok(EncodedImage { buf, len })
}

/// Fill `raw` with filtered scanlines, returning the number of bytes written
fn write_scanlines(
    raw: &mut [u8],
    plan: &SizePlan,
    width: usize,
    scale: usize,
    blocks: &[u16],
    palette: &[Rgba],
) -> usize {
    let colors = resolve_palette(palette);
    let background = colors.first().copied().unwrap_or(Rgba::UNSET.to_bytes());
    let pixel_span = scale * BYTES_PER_PIXEL as usize;
    let mut offset = 0;

    for row in blocks.chunks_exact(width) {
        let row_start = offset;
        let line = &mut raw[row_start..row_start + plan.row_len];
        line[0] = FILTER_NONE;

        for (x, &block) in row.iter().enumerate() {
            let color = colors.get(usize::from(block)).copied().unwrap_or(background);
            let px = 1 + x * pixel_span;
            line[px..px + 4].copy_from_slice(&color);

            // Widen the pixel by doubling what is already written
            let mut filled = 4;
            while filled < pixel_span {
                let n = filled.min(pixel_span - filled);
                line.copy_within(px..px + n, px + filled);
                filled += n;
            }
        }

        offset += plan.row_len;
        for _ in 1..scale {
            raw.copy_within(row_start..row_start + plan.row_len, offset);
            offset += plan.row_len;
        }
    }

    offset
}

/// Palette as ready-to-copy bytes with the sentinel already substituted
fn resolve_palette(palette: &[Rgba]) -> Vec<[u8; 4]> {
    let background = palette.first().copied().unwrap_or(Rgba::UNSET);
    palette
        .iter()
        .map(|color| {
            if color.is_unset() {
                background.to_bytes()
            } else {
                color.to_bytes()
            }
        })
        .collect()
}

fn write_ihdr(w: &mut ByteWriter<'_>, plan: &SizePlan) -> ScarletResult<()> {
    let mut data = [0u8; IHDR_DATA as usize];
    data[0..4].copy_from_slice(&plan.width.to_be_bytes());
    data[4..8].copy_from_slice(&plan.height.to_be_bytes());
    data[8] = BIT_DEPTH;
    data[9] = COLOR_TYPE_RGBA;
    // compression, filter method and interlace are all 0
    write_chunk(w, b"IHDR", &[&data[..]])
}

/// Write a complete chunk whose data is the concatenation of `parts`
fn write_chunk(w: &mut ByteWriter<'_>, kind: &[u8; 4], parts: &[&[u8]]) -> ScarletResult<()> {
    let len: usize = parts.iter().map(|p| p.len()).sum();
    w.put_u32_be(len as u32)?;

    let start = w.position();
    w.put_slice(kind)?;
    for part in parts {
        w.put_slice(part)?;
    }
    let crc = chunk_crc(w, start)?;
    w.put_u32_be(crc)
}

/// Compress `raw` straight into the IDAT chunk body
fn write_idat(w: &mut ByteWriter<'_>, plan: &SizePlan, raw: &[u8]) -> ScarletResult<()> {
    let length_at = w.position();
    w.put_u32_be(0)?;
    let start = w.position();
    w.put_slice(b"IDAT")?;

    let written = {
        let target = w.tail();
        let budget = plan.zlib_bound.min(target.len());
        deflate(raw, &mut target[..budget], plan.compression())?
    };
    w.advance(written)?;

    let crc = chunk_crc(w, start)?;
    w.put_u32_be(crc)?;

    // back-fill the length now that the compressed size is known
    let end = w.position();
    let chunk = w.written_mut(length_at, end);
    chunk[..4].copy_from_slice(&(written as u32).to_be_bytes());
    Ok(())
}

fn chunk_crc(w: &mut ByteWriter<'_>, start: usize) -> ScarletResult<u32> {
    let end = w.position();
    Ok(Crc32::png().checksum(w.written_mut(start, end)))
}

/// zlib-compress `input` into `output`, returning the compressed length
fn deflate(input: &[u8], output: &mut [u8], level: Compression) -> ScarletResult<usize> {
    let mut z = Compress::new(level, true);
    let status = z
        .compress(input, output, FlushCompress::Finish)
        .map_err(|e| ScarletError::FormatInvariant(format!("deflate failed: {}", e)))?;

    match status {
        Status::StreamEnd => {
            let written = z.total_out() as usize;
            let trailer = output
                .get(written.saturating_sub(4)..written)
                .ok_or_else(|| ScarletError::FormatInvariant("zlib stream too short".to_string()))?;
            // The stream must close with the checksum of exactly the staged bytes
            if trailer != adler32(input).to_be_bytes() {
                return Err(ScarletError::FormatInvariant(
                    "zlib trailer does not match the staged scanlines".to_string(),
                ));
            }
            Ok(written)
        }
        Status::Ok | Status::BufError => Err(ScarletError::FormatInvariant(format!(
            "zlib stream exceeded its {} byte bound",
            output.len()
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn palette() -> Vec<Rgba> {
        vec![
            Rgba::opaque(0, 0, 0),
            Rgba::opaque(255, 0, 0),
            Rgba::opaque(0, 255, 0),
            Rgba::opaque(0, 0, 255),
        ]
    }

    #[rustfmt::skip]
    fn grid() -> Vec<u16> {
        vec![
            0, 0, 0, 0, 0,
            0, 1, 0, 1, 0,
            0, 1, 0, 1, 0,
            0, 0, 0, 0, 0,
            2, 0, 0, 0, 2,
            0, 3, 3, 3, 0,
        ]
    }

    /// Decode with the reference `png` crate
    fn decode(bytes: &[u8]) -> (png::OutputInfo, Vec<u8>) {
        let decoder = png::Decoder::new(std::io::Cursor::new(bytes.to_vec()));
        let mut reader = decoder.read_info().unwrap();
        let mut out = vec![0u8; reader.output_buffer_size()];
        let info = reader.next_frame(&mut out).unwrap();
        out.truncate(info.buffer_size());
        (info, out)
    }

    fn pixel(data: &[u8], width: u32, x: u32, y: u32) -> Rgba {
        let i = ((y * width + x) * 4) as usize;
        Rgba::from_bytes([data[i], data[i + 1], data[i + 2], data[i + 3]])
    }

    /// Walk chunks as (type, data)
    fn chunks(bytes: &[u8]) -> Vec<([u8; 4], Vec<u8>)> {
        let mut out = Vec::new();
        let mut i = SIGNATURE.len();
        while i < bytes.len() {
            let len = u32::from_be_bytes(bytes[i..i + 4].try_into().unwrap()) as usize;
            let kind: [u8; 4] = bytes[i + 4..i + 8].try_into().unwrap();
            let data = bytes[i + 8..i + 8 + len].to_vec();
            let crc = u32::from_be_bytes(bytes[i + 8 + len..i + 12 + len].try_into().unwrap());
            assert_eq!(crc, Crc32::png().checksum(&bytes[i + 4..i + 8 + len]));
            out.push((kind, data));
            i += 12 + len;
        }
        out
    }

    #[test]
    fn plan_matches_formula() {
        let plan = SizePlan::new(5, 6, 1).unwrap();
        assert_eq!(plan.row_len, 21);
        assert_eq!(plan.raw_len, 5 * 6 * 4 + 6);
        assert_eq!(plan.zlib_bound, 6 + 5 + plan.raw_len);
        assert_eq!(plan.png_len, 8 + 25 + 28 + 12 + plan.zlib_bound + 12);

        let plan = SizePlan::new(5, 6, 2).unwrap();
        assert_eq!((plan.width, plan.height), (10, 12));
        assert_eq!(plan.raw_len, 10 * 12 * 4 + 12);
    }

    #[test]
    fn plan_counts_partial_zlib_blocks() {
        // 128 rows of 32 px = 128 * 129 = 16512 raw bytes, two 16 KiB blocks
        let plan = SizePlan::new(32, 128, 1).unwrap();
        assert_eq!(plan.raw_len, 16_512);
        assert_eq!(plan.zlib_bound, 6 + 10 + 16_512);
    }

    #[test]
    fn plan_rejects_degenerate_requests() {
        assert!(matches!(SizePlan::new(0, 4, 1), Err(ScarletError::InvalidImage(_))));
        assert!(matches!(SizePlan::new(4, 4, 0), Err(ScarletError::InvalidImage(_))));
        assert!(SizePlan::new(u32::MAX, 1, 2).is_err());
    }

    #[test]
    fn encodes_readable_rgba_png() {
        let image = encode(5, 6, 1, &grid(), &palette()).unwrap();
        assert!(image.len() <= image.allocated());

        let (info, data) = decode(image.as_bytes());
        assert_eq!((info.width, info.height), (5, 6));
        assert_eq!(info.bit_depth, png::BitDepth::Eight);
        assert_eq!(info.color_type, png::ColorType::Rgba);

        let palette = palette();
        for (i, &block) in grid().iter().enumerate() {
            let (x, y) = ((i % 5) as u32, (i / 5) as u32);
            assert_eq!(pixel(&data, 5, x, y), palette[block as usize], "at ({x}, {y})");
        }
    }

    #[test]
    fn chunk_layout_is_fixed() {
        let image = encode(5, 6, 1, &grid(), &palette()).unwrap();
        let bytes = image.as_bytes();
        assert_eq!(&bytes[..8], &SIGNATURE);

        let chunks = chunks(bytes);
        let kinds: Vec<&[u8]> = chunks.iter().map(|(k, _)| &k[..]).collect();
        assert_eq!(kinds, vec![&b"IHDR"[..], &b"tEXt"[..], &b"IDAT"[..], &b"IEND"[..]]);

        let ihdr = &chunks[0].1;
        assert_eq!(&ihdr[0..4], &5u32.to_be_bytes());
        assert_eq!(&ihdr[4..8], &6u32.to_be_bytes());
        assert_eq!(&ihdr[8..13], &[8, 6, 0, 0, 0]);

        assert_eq!(chunks[1].1, b"Software\0Scarlet");
        assert!(chunks[3].1.is_empty());
        assert_eq!(&bytes[bytes.len() - 4..], &0xAE42_6082u32.to_be_bytes());
    }

    #[test]
    fn idat_is_a_zlib_stream_over_unfiltered_rows() {
        use std::io::Read;

        let image = encode(5, 6, 1, &grid(), &palette()).unwrap();
        let idat = chunks(image.as_bytes()).remove(2).1;

        let mut raw = Vec::new();
        flate2::read::ZlibDecoder::new(&idat[..])
            .read_to_end(&mut raw)
            .unwrap();
        assert_eq!(raw.len(), 5 * 6 * 4 + 6);
        assert!(raw.chunks(21).all(|row| row[0] == 0));

        let trailer = u32::from_be_bytes(idat[idat.len() - 4..].try_into().unwrap());
        assert_eq!(trailer, adler32(&raw));
    }

    #[test]
    fn scale_replicates_each_block() {
        let one = encode(5, 6, 1, &grid(), &palette()).unwrap();
        let two = encode(5, 6, 2, &grid(), &palette()).unwrap();
        let (_, small) = decode(one.as_bytes());
        let (info, big) = decode(two.as_bytes());
        assert_eq!((info.width, info.height), (10, 12));

        for y in 0..12 {
            for x in 0..10 {
                assert_eq!(pixel(&big, 10, x, y), pixel(&small, 5, x / 2, y / 2));
            }
        }
    }

    #[test]
    fn large_scale_uses_whole_rows() {
        let image = encode(3, 1, 7, &[1, 2, 3], &palette()).unwrap();
        let (info, data) = decode(image.as_bytes());
        assert_eq!((info.width, info.height), (21, 7));
        assert_eq!(pixel(&data, 21, 20, 6), Rgba::opaque(0, 0, 255));
        assert_eq!(pixel(&data, 21, 7, 3), Rgba::opaque(0, 255, 0));
    }

    #[test]
    fn unknown_and_unset_ids_fall_back_to_background() {
        let background = Rgba::opaque(12, 34, 56);
        let palette = vec![background, Rgba::UNSET, Rgba::opaque(1, 2, 3)];
        let image = encode(4, 1, 1, &[1, 2, 3, 999], &palette).unwrap();
        let (_, data) = decode(image.as_bytes());

        assert_eq!(pixel(&data, 4, 0, 0), background);
        assert_eq!(pixel(&data, 4, 1, 0), Rgba::opaque(1, 2, 3));
        assert_eq!(pixel(&data, 4, 2, 0), background);
        assert_eq!(pixel(&data, 4, 3, 0), background);
    }

    #[test]
    fn transparent_black_is_not_the_sentinel() {
        let palette = vec![Rgba::opaque(9, 9, 9), Rgba::new(0, 0, 0, 255)];
        let image = encode(1, 1, 1, &[1], &palette).unwrap();
        let (_, data) = decode(image.as_bytes());
        assert_eq!(pixel(&data, 1, 0, 0), Rgba::new(0, 0, 0, 255));
    }

    #[test]
    fn mismatched_grid_is_rejected() {
        let err = encode(5, 6, 1, &[0; 29], &palette()).unwrap_err();
        assert!(matches!(err, ScarletError::InvalidImage(_)));
    }

    #[test]
    fn release_trims_to_the_png() {
        let image = encode(5, 6, 3, &grid(), &palette()).unwrap();
        let len = image.len();
        let expected = image.as_bytes().to_vec();
        assert!(image.allocated() > len);

        let bytes = image.release();
        assert_eq!(bytes.len(), len);
        assert_eq!(bytes, expected);
    }
}
