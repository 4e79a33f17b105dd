//! World provider abstraction
//!
//! A provider turns a world id into decoded world data. Real providers talk
//! to remote game back-ends; the service only relies on this trait.

use super::palette::Palette;
use super::snapshot::WorldSnapshot;
use crate::codec::color::Rgba;
use crate::error::ScarletResult;
use async_trait::async_trait;

/// World data as returned by a provider, before it is cached
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProvidedWorld {
    pub width: u32,
    pub height: u32,
    pub blocks: Vec<u16>,
    pub palette: Palette,
    /// Background color as `0xAARRGGBB`; zero means "keep palette[0]"
    pub background: u32,
    pub metadata: Vec<u8>,
}

impl ProvidedWorld {
    /// Apply the background override and produce the cacheable snapshot
    pub fn into_snapshot(self) -> WorldSnapshot {
        let mut palette = self.palette;
        if self.background != 0 {
            palette.set_background(Rgba::from_argb(self.background));
        }
        WorldSnapshot::new(self.width, self.height, self.blocks, palette.into_colors())
            .with_metadata(self.metadata)
    }
}

/// Source of world data
#[async_trait]
pub trait WorldProvider: Send + Sync {
    /// Short name used in logs
    fn name(&self) -> &str;

    /// Fetch and decode a world
    async fn fetch(&self, world_id: &str) -> ScarletResult<ProvidedWorld>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn world(background: u32) -> ProvidedWorld {
        ProvidedWorld {
            width: 2,
            height: 1,
            blocks: vec![0, 1],
            palette: Palette::new(vec![Rgba::opaque(0, 0, 0), Rgba::opaque(9, 9, 9)]),
            background,
            metadata: b"{}".to_vec(),
        }
    }

    #[test]
    fn background_replaces_first_color() {
        let snapshot = world(0x80FF_0000).into_snapshot();
        assert_eq!(snapshot.palette[0], Rgba::new(255, 0, 0, 255));
        assert_eq!(snapshot.palette[1], Rgba::opaque(9, 9, 9));
        assert_eq!(snapshot.metadata, b"{}");
    }

    #[test]
    fn zero_background_keeps_palette() {
        let snapshot = world(0).into_snapshot();
        assert_eq!(snapshot.palette[0], Rgba::opaque(0, 0, 0));
        assert!(snapshot.is_consistent());
    }
}
