//! Pre-encoded tile source
//!
//! Relays a multivec tileset from a tile service. Tiles arrive already
//! aggregated per bin, so no base-level decomposition is needed; the flat
//! channel-major payload is only reshaped into columns.

use crate::core::io::fetch_json;
use crate::core::{Column, FetchError, Result, SharedLoad, TileId, TilesetInfo};
use crate::formats::multivec::{tile_key, tile_url, tileset_info_url, TilesResponse, TilesetInfoResponse};
use crate::source::TileSource;

/// Tile source backed by a multivec tile service
pub struct PreEncodedSource {
    client: reqwest::Client,
    server: String,
    tileset_uid: String,
    info: SharedLoad<TilesetInfo, FetchError>,
}

impl PreEncodedSource {
    pub fn new(client: reqwest::Client, server: String, tileset_uid: String) -> Self {
        Self {
            client,
            server,
            tileset_uid,
            info: SharedLoad::new(),
        }
    }

    pub fn tileset_uid(&self) -> &str {
        &self.tileset_uid
    }

    async fn load_info(&self) -> std::result::Result<TilesetInfo, FetchError> {
        let url = tileset_info_url(&self.server, &self.tileset_uid);
        let mut response: TilesetInfoResponse = fetch_json(&self.client, &url).await?;
        let info = response
            .remove(&self.tileset_uid)
            .ok_or_else(|| FetchError::Decode {
                resource: url.clone(),
                message: format!("tileset '{}' missing from response", self.tileset_uid),
            })?
            .complete();
        log::info!(
            "Tileset {} has max zoom {} over {} bp",
            self.tileset_uid,
            info.max_zoom,
            info.max_width
        );
        Ok(info)
    }

    /// Columns of one tile as served
    pub async fn fetch_encoded_tile(&self, tile: TileId) -> Result<Vec<Column>> {
        let url = tile_url(&self.server, &self.tileset_uid, tile);
        let response: TilesResponse = fetch_json(&self.client, &url).await?;
        let key = tile_key(&self.tileset_uid, tile);
        let dense = response.get(&key).ok_or_else(|| FetchError::Decode {
            resource: url.clone(),
            message: format!("tile '{}' missing from response", key),
        })?;
        dense.columns()
    }
}

impl TileSource for PreEncodedSource {
    async fn tileset_info(&self) -> Result<TilesetInfo> {
        Ok(self.info.get_or_load(|| self.load_info()).await?)
    }

    fn cached_tileset_info(&self) -> Option<TilesetInfo> {
        self.info.peek()
    }

    async fn tile(&self, tile: TileId) -> Result<Vec<Column>> {
        self.fetch_encoded_tile(tile).await
    }
}
