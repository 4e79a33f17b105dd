//! Provider backed by world files in a local directory
//!
//! Each world lives in `<worlds_dir>/<world_id>.json`:
//!
//! ```json
//! { "width": 3, "height": 2, "blocks": [0, 1, 2, 2, 1, 0],
//!   "background": 4278190080, "name": "Lobby", "owner": "ada", "plays": 12 }
//! ```

use super::palette::Palette;
use super::provider::{ProvidedWorld, WorldProvider};
use crate::config::schema::ProviderConfig;
use crate::error::{ScarletError, ScarletResult};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::io;
use std::path::{Path, PathBuf};
use tracing::debug;

#[derive(Debug, Deserialize)]
struct WorldFile {
    width: u32,
    height: u32,
    blocks: Vec<u16>,
    #[serde(default)]
    background: u32,
    #[serde(default)]
    name: String,
    #[serde(default)]
    owner: Option<String>,
    #[serde(default)]
    plays: u64,
}

/// Metadata document handed out for a world
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct WorldMetadata {
    pub name: String,
    pub owner: Option<String>,
    pub plays: u64,
    pub width: u32,
    pub height: u32,
}

/// Reads worlds from JSON files
#[derive(Debug, Clone)]
pub struct DirectoryProvider {
    worlds_dir: PathBuf,
    palette: Palette,
}

impl DirectoryProvider {
    pub fn new(worlds_dir: impl Into<PathBuf>, palette: Palette) -> Self {
        Self {
            worlds_dir: worlds_dir.into(),
            palette,
        }
    }

    /// Build from the `[provider]` config section, loading the palette file
    /// when one is configured
    pub async fn from_config(config: &ProviderConfig) -> ScarletResult<Self> {
        let palette = match &config.colors_path {
            Some(path) => Palette::load(path).await?,
            None => Palette::default(),
        };
        Ok(Self::new(config.worlds_dir.clone(), palette))
    }

    pub fn worlds_dir(&self) -> &Path {
        &self.worlds_dir
    }

    fn world_path(&self, world_id: &str) -> ScarletResult<PathBuf> {
        let valid = !world_id.is_empty()
            && world_id
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
        if !valid {
            return Err(ScarletError::WorldNotFound(world_id.to_string()));
        }
        Ok(self.worlds_dir.join(format!("{}.json", world_id)))
    }
}

#[async_trait]
impl WorldProvider for DirectoryProvider {
    fn name(&self) -> &str {
        "directory"
    }

    async fn fetch(&self, world_id: &str) -> ScarletResult<ProvidedWorld> {
        let path = self.world_path(world_id)?;
        debug!(world = %world_id, path = %path.display(), "Reading world file");

        let content = match tokio::fs::read(&path).await {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(ScarletError::WorldNotFound(world_id.to_string()));
            }
            Err(e) => return Err(ScarletError::provider(world_id, e.to_string())),
        };

        let file: WorldFile = serde_json::from_slice(&content)
            .map_err(|e| ScarletError::provider(world_id, format!("malformed world file: {}", e)))?;

        let expected = u64::from(file.width) * u64::from(file.height);
        if file.blocks.len() as u64 != expected {
            return Err(ScarletError::provider(
                world_id,
                format!(
                    "{}x{} world has {} blocks, expected {}",
                    file.width,
                    file.height,
                    file.blocks.len(),
                    expected
                ),
            ));
        }

        let metadata = serde_json::to_vec(&WorldMetadata {
            name: file.name,
            owner: file.owner,
            plays: file.plays,
            width: file.width,
            height: file.height,
        })?;

        Ok(ProvidedWorld {
            width: file.width,
            height: file.height,
            blocks: file.blocks,
            palette: self.palette.clone(),
            background: file.background,
            metadata,
        })
    }
}
