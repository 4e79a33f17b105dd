//! Flat binary encoding of a [`WorldSnapshot`] for the cache
//!
//! Layout (all integers little-endian):
//!
//! | Offset | Size | Field |
//! |--------|------|-------|
//! | 0 | 4 | width |
//! | 4 | 4 | height |
//! | 8 | 4 | block count |
//! | 12 | 4 | palette count |
//! | 16 | 4 | scale |
//! | 20 | 4 | metadata length |
//! | 24 | 2 × blocks | block ids |
//! | … | 4 × palette | colors, R G B A |
//! | … | metadata length | metadata bytes |
//!
//! There is no version tag. Changing this layout invalidates every cached
//! snapshot; clear the cache when deploying such a change.

use crate::codec::bytes::{ByteReader, ByteWriter};
use crate::codec::color::Rgba;
use crate::error::{ScarletError, ScarletResult};
use crate::world::WorldSnapshot;

/// Size of the fixed header in bytes
pub const HEADER_SIZE: usize = 24;

/// Exact encoded size of `snapshot`
pub fn encoded_len(snapshot: &WorldSnapshot) -> usize {
    HEADER_SIZE
        + snapshot.blocks.len() * 2
        + snapshot.palette.len() * Rgba::SIZE
        + snapshot.metadata.len()
}

fn count(len: usize, what: &str) -> ScarletResult<u32> {
    u32::try_from(len).map_err(|_| {
        ScarletError::Internal(format!("{} count {} does not fit the header", what, len))
    })
}

/// Serialize a snapshot into a freshly allocated, exactly sized buffer
pub fn encode(snapshot: &WorldSnapshot) -> ScarletResult<Vec<u8>> {
    let mut out = vec![0u8; encoded_len(snapshot)];
    let mut w = ByteWriter::new(&mut out);

    w.put_u32_le(snapshot.width)?;
    w.put_u32_le(snapshot.height)?;
    w.put_u32_le(count(snapshot.blocks.len(), "block")?)?;
    w.put_u32_le(count(snapshot.palette.len(), "palette")?)?;
    w.put_u32_le(snapshot.scale)?;
    w.put_u32_le(count(snapshot.metadata.len(), "metadata")?)?;

    for &block in &snapshot.blocks {
        w.put_u16_le(block)?;
    }
    for color in &snapshot.palette {
        w.put_slice(&color.to_bytes())?;
    }
    w.put_slice(&snapshot.metadata)?;

    debug_assert_eq!(w.remaining(), 0);
    Ok(out)
}

/// Parse a buffer produced by [`encode`]
pub fn decode(bytes: &[u8]) -> ScarletResult<WorldSnapshot> {
    let mut r = ByteReader::new(bytes);

    let width = r.u32_le()?;
    let height = r.u32_le()?;
    let block_count = r.u32_le()? as usize;
    let palette_count = r.u32_le()? as usize;
    let scale = r.u32_le()?;
    let metadata_len = r.u32_le()? as usize;

    if block_count as u64 != u64::from(width) * u64::from(height) {
        return Err(ScarletError::SnapshotDecode(format!(
            "{} blocks recorded for a {}x{} grid",
            block_count, width, height
        )));
    }

    // Check the whole body up front so a corrupt count can't drive a huge
    // allocation.
    let body = (block_count as u64) * 2
        + (palette_count as u64) * Rgba::SIZE as u64
        + metadata_len as u64;
    if body != r.remaining() as u64 {
        return Err(ScarletError::SnapshotDecode(format!(
            "header describes {} body bytes but {} follow",
            body,
            r.remaining()
        )));
    }

    let blocks = r
        .take(block_count * 2)?
        .chunks_exact(2)
        .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
        .collect();

    let palette = r
        .take(palette_count * Rgba::SIZE)?
        .chunks_exact(Rgba::SIZE)
        .map(|c| Rgba::from_bytes([c[0], c[1], c[2], c[3]]))
        .collect();

    let metadata = r.take(metadata_len)?.to_vec();

    Ok(WorldSnapshot {
        width,
        height,
        scale,
        blocks,
        palette,
        metadata,
    })
}
