//! Decoded world data

use crate::codec::color::Rgba;

/// A decoded world: its block grid, color table and opaque metadata.
///
/// `blocks` is row-major with `width * height` entries. Each block id indexes
/// `palette`; ids past the end of the palette render as `palette[0]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorldSnapshot {
    pub width: u32,
    pub height: u32,
    /// Render scale recorded alongside the grid
    pub scale: u32,
    pub blocks: Vec<u16>,
    pub palette: Vec<Rgba>,
    /// Passed through verbatim; usually a JSON document describing the world
    pub metadata: Vec<u8>,
}

impl WorldSnapshot {
    pub fn new(width: u32, height: u32, blocks: Vec<u16>, palette: Vec<Rgba>) -> Self {
        Self {
            width,
            height,
            scale: 1,
            blocks,
            palette,
            metadata: Vec::new(),
        }
    }

    pub fn with_metadata(mut self, metadata: Vec<u8>) -> Self {
        self.metadata = metadata;
        self
    }

    /// Number of cells the grid dimensions call for
    pub fn expected_blocks(&self) -> u64 {
        u64::from(self.width) * u64::from(self.height)
    }

    /// Whether `blocks` matches the declared dimensions
    pub fn is_consistent(&self) -> bool {
        self.blocks.len() as u64 == self.expected_blocks()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn consistency_tracks_dimensions() {
        let snapshot = WorldSnapshot::new(2, 3, vec![0; 6], vec![]);
        assert!(snapshot.is_consistent());
        assert_eq!(snapshot.scale, 1);

        let short = WorldSnapshot::new(2, 3, vec![0; 5], vec![]);
        assert!(!short.is_consistent());
    }
}
