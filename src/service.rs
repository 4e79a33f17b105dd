//! World rendering service
//!
//! Wires provider fetches, the snapshot format and the PNG encoder through
//! the cache. Two layers are cached per world: the encoded snapshot, shared
//! by every scale, and each rendered image or metadata document on top.

use crate::cache::CacheStore;
use crate::codec::{png, snapshot};
use crate::config::schema::RenderConfig;
use crate::config::Config;
use crate::error::{ScarletError, ScarletResult};
use crate::world::{DirectoryProvider, WorldProvider, WorldSnapshot};
use futures_util::future::try_join_all;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Serves minimaps and metadata for worlds
pub struct WorldService {
    cache: CacheStore,
    provider: Arc<dyn WorldProvider>,
    namespace: String,
    ttl: Duration,
    fetch_timeout: Duration,
    render: RenderConfig,
}

impl WorldService {
    pub fn new(cache: CacheStore, provider: Arc<dyn WorldProvider>, config: &Config) -> Self {
        Self {
            cache,
            provider,
            namespace: config.provider.namespace.clone(),
            ttl: config.cache.ttl(),
            fetch_timeout: config.provider.fetch_timeout(),
            render: config.render.clone(),
        }
    }

    /// Open the configured cache and directory provider
    pub async fn from_config(config: &Config) -> ScarletResult<Self> {
        let cache = CacheStore::with_options(&config.cache.dir, config.cache.options()).await?;
        let provider = DirectoryProvider::from_config(&config.provider).await?;
        Ok(Self::new(cache, Arc::new(provider), config))
    }

    pub fn cache(&self) -> &CacheStore {
        &self.cache
    }

    pub fn snapshot_key(&self, world_id: &str) -> String {
        format!("{}.[{}]", self.namespace, world_id)
    }

    pub fn minimap_key(&self, world_id: &str, scale: u32) -> String {
        format!("{}.[{}].minimap.[{}]", self.namespace, world_id, scale)
    }

    pub fn metadata_key(&self, world_id: &str) -> String {
        format!("{}.[{}].metadata", self.namespace, world_id)
    }

    /// PNG of the world at `scale`, clamped into the configured range
    pub async fn minimap(&self, world_id: &str, scale: u32) -> ScarletResult<Vec<u8>> {
        let scale = self.render.clamp_scale(scale);
        let key = self.minimap_key(world_id, scale);
        self.cache
            .get_or_compute(&key, self.ttl, || self.render_minimap(world_id, scale))
            .await
    }

    /// The provider's metadata document for the world
    pub async fn metadata(&self, world_id: &str) -> ScarletResult<Vec<u8>> {
        let key = self.metadata_key(world_id);
        self.cache
            .get_or_compute(&key, self.ttl, || self.load_metadata(world_id))
            .await
    }

    /// Expire everything cached for the world; old bytes stay servable
    /// until fresh ones are computed
    pub async fn update(&self, world_id: &str) -> ScarletResult<()> {
        let mut keys = vec![self.snapshot_key(world_id), self.metadata_key(world_id)];
        keys.extend(self.render.scales().map(|s| self.minimap_key(world_id, s)));

        try_join_all(keys.iter().map(|key| self.cache.invalidate(key))).await?;
        info!(world = %world_id, keys = keys.len(), "Invalidated cached world");
        Ok(())
    }

    /// Cached snapshot, fetched from the provider when missing or expired.
    ///
    /// A snapshot entry that no longer decodes is invalidated so the next
    /// request refetches it.
    pub async fn snapshot(&self, world_id: &str) -> ScarletResult<WorldSnapshot> {
        let key = self.snapshot_key(world_id);
        let bytes = self
            .cache
            .get_or_compute(&key, self.ttl, || self.fetch_snapshot(world_id))
            .await?;

        match snapshot::decode(&bytes) {
            Ok(snapshot) => Ok(snapshot),
            Err(e) => {
                warn!(key = %key, error = %e, "Cached snapshot is corrupt, invalidating");
                if let Err(inv) = self.cache.invalidate(&key).await {
                    warn!(key = %key, error = %inv, "Unable to invalidate corrupt snapshot");
                }
                Err(e)
            }
        }
    }

    async fn fetch_snapshot(&self, world_id: &str) -> ScarletResult<Vec<u8>> {
        debug!(world = %world_id, provider = self.provider.name(), "Fetching world");
        let world = tokio::time::timeout(self.fetch_timeout, self.provider.fetch(world_id))
            .await
            .map_err(|_| ScarletError::FetchTimeout {
                world: world_id.to_string(),
                secs: self.fetch_timeout.as_secs(),
            })??;

        let snapshot = world.into_snapshot();
        if !snapshot.is_consistent() {
            return Err(ScarletError::provider(
                world_id,
                format!(
                    "{}x{} world has {} blocks, expected {}",
                    snapshot.width,
                    snapshot.height,
                    snapshot.blocks.len(),
                    snapshot.expected_blocks()
                ),
            ));
        }
        snapshot::encode(&snapshot)
    }

    async fn load_metadata(&self, world_id: &str) -> ScarletResult<Vec<u8>> {
        Ok(self.snapshot(world_id).await?.metadata)
    }

    async fn render_minimap(&self, world_id: &str, scale: u32) -> ScarletResult<Vec<u8>> {
        let snapshot = self.snapshot(world_id).await?;

        tokio::task::spawn_blocking(move || {
            png::encode(
                snapshot.width,
                snapshot.height,
                scale,
                &snapshot.blocks,
                &snapshot.palette,
            )
            .map(png::EncodedImage::release)
        })
        .await
        .map_err(|e| ScarletError::Internal(format!("encoder task failed: {}", e)))?
    }
}
