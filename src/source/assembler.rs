//! Tile batch orchestration
//!
//! Parses tile ids, resolves every valid tile concurrently on the tokio
//! runtime and gathers the results keyed by id. Bad ids are skipped with a
//! warning and failed tiles are reported next to the successful ones, so one
//! bad request never sinks its siblings.

use crate::core::{Column, Result, SeqTileError, TileId, TilesetInfo};
use crate::source::TileSource;
use serde::Serialize;
use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinSet;

/// One resolved tile as handed to the renderer
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EncodedTile {
    pub dense: Vec<Column>,
    pub zoom_level: u32,
    pub tile_pos: Vec<u64>,
    pub tile_position_id: String,
}

/// Tileset metadata or the reason it is unavailable
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum MetadataResponse {
    Info(TilesetInfo),
    Error { error: String },
}

/// Outcome of a tile batch
#[derive(Debug, Default)]
pub struct TileBatch {
    /// Resolved tiles by requested id
    pub tiles: BTreeMap<String, EncodedTile>,
    /// Tiles that failed, in request order
    pub failures: Vec<(String, SeqTileError)>,
}

/// Signals that a pending batch has been superseded
#[derive(Debug, Clone)]
pub struct CancelToken {
    tx: Arc<watch::Sender<bool>>,
}

impl CancelToken {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(false);
        Self { tx: Arc::new(tx) }
    }

    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }

    pub fn is_cancelled(&self) -> bool {
        *self.tx.borrow()
    }

    /// Completes once [`cancel`](Self::cancel) has been called
    pub async fn cancelled(&self) {
        let mut rx = self.tx.subscribe();
        let _ = rx.wait_for(|cancelled| *cancelled).await;
    }
}

impl Default for CancelToken {
    fn default() -> Self {
        Self::new()
    }
}

/// Resolves tile requests against a [`TileSource`]
pub struct TileAssembler<S> {
    source: Arc<S>,
}

impl<S> Clone for TileAssembler<S> {
    fn clone(&self) -> Self {
        Self {
            source: Arc::clone(&self.source),
        }
    }
}

impl<S: TileSource> TileAssembler<S> {
    pub fn new(source: S) -> Self {
        Self {
            source: Arc::new(source),
        }
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// Tileset metadata, with failures reported as `{ "error": ... }`
    pub async fn tileset_info_response(&self) -> MetadataResponse {
        match self.source.tileset_info().await {
            Ok(info) => MetadataResponse::Info(info),
            Err(e) => {
                log::warn!("Could not fetch tileset info: {}", e);
                MetadataResponse::Error { error: e.to_string() }
            }
        }
    }

    /// Metadata if it has already been resolved
    pub fn cached_tileset_info(&self) -> Option<TilesetInfo> {
        self.source.cached_tileset_info()
    }

    /// Resolve a single tile
    pub async fn resolve_tile(&self, zoom: u32, index: u64) -> Result<EncodedTile> {
        let tile = TileId::new(zoom, index);
        encode_tile(self.source.as_ref(), tile.to_string(), tile).await
    }

    /// Resolve a batch of `"<zoom>.<index>"` ids
    ///
    /// Returns once every valid request has settled.
    pub async fn resolve_tiles<I, T>(&self, ids: I) -> TileBatch
    where
        I: IntoIterator<Item = T>,
        T: AsRef<str>,
    {
        let requests = parse_tile_ids(ids);
        let mut set = self.spawn_all(&requests);
        let mut settled = Settled::new(requests.len());
        while let Some(joined) = set.join_next().await {
            settled.record(joined);
        }
        settled.into_batch(requests)
    }

    /// Like [`resolve_tiles`](Self::resolve_tiles), but gives up as soon as
    /// `token` is cancelled, aborting every in-flight tile and its sub-fetches
    pub async fn resolve_tiles_cancellable<I, T>(&self, ids: I, token: &CancelToken) -> Result<TileBatch>
    where
        I: IntoIterator<Item = T>,
        T: AsRef<str>,
    {
        if token.is_cancelled() {
            return Err(SeqTileError::Cancelled);
        }

        let requests = parse_tile_ids(ids);
        let mut set = self.spawn_all(&requests);
        let mut settled = Settled::new(requests.len());
        loop {
            tokio::select! {
                biased;
                _ = token.cancelled() => {
                    set.abort_all();
                    log::debug!("tile batch of {} cancelled", requests.len());
                    return Err(SeqTileError::Cancelled);
                }
                joined = set.join_next() => match joined {
                    Some(joined) => settled.record(joined),
                    None => break,
                },
            }
        }
        Ok(settled.into_batch(requests))
    }

    fn spawn_all(&self, requests: &[(String, TileId)]) -> JoinSet<(usize, Result<EncodedTile>)> {
        let mut set = JoinSet::new();
        for (pos, (id, tile)) in requests.iter().enumerate() {
            let source = Arc::clone(&self.source);
            let id = id.clone();
            let tile = *tile;
            set.spawn(async move { (pos, encode_tile(source.as_ref(), id, tile).await) });
        }
        set
    }
}

async fn encode_tile<S: TileSource>(source: &S, id: String, tile: TileId) -> Result<EncodedTile> {
    let dense = source.tile(tile).await?;
    Ok(EncodedTile {
        dense,
        zoom_level: tile.zoom,
        tile_pos: vec![tile.index],
        tile_position_id: id,
    })
}

/// Parse ids, dropping invalid and repeated ones
fn parse_tile_ids<I, T>(ids: I) -> Vec<(String, TileId)>
where
    I: IntoIterator<Item = T>,
    T: AsRef<str>,
{
    let mut seen = HashSet::new();
    let mut requests = Vec::new();
    for id in ids {
        let id = id.as_ref();
        match id.parse::<TileId>() {
            Ok(tile) => {
                if seen.insert(id.to_string()) {
                    requests.push((id.to_string(), tile));
                }
            }
            Err(e) => log::warn!("{}", e),
        }
    }
    requests
}

/// Results collected by request position
struct Settled {
    results: Vec<Option<Result<EncodedTile>>>,
    join_error: Option<String>,
}

impl Settled {
    fn new(len: usize) -> Self {
        Self {
            results: (0..len).map(|_| None).collect(),
            join_error: None,
        }
    }

    fn record(&mut self, joined: std::result::Result<(usize, Result<EncodedTile>), tokio::task::JoinError>) {
        match joined {
            Ok((pos, result)) => self.results[pos] = Some(result),
            Err(e) => self.join_error = Some(e.to_string()),
        }
    }

    fn into_batch(self, requests: Vec<(String, TileId)>) -> TileBatch {
        let mut batch = TileBatch::default();
        let join_error = self.join_error.unwrap_or_else(|| "task did not finish".to_string());

        for ((id, _), result) in requests.into_iter().zip(self.results) {
            match result {
                Some(Ok(tile)) => {
                    batch.tiles.insert(id, tile);
                }
                Some(Err(e)) => {
                    log::warn!("Tile {} failed: {}", id, e);
                    batch.failures.push((id, e));
                }
                None => {
                    log::warn!("Tile {} failed: {}", id, join_error);
                    batch.failures.push((id, SeqTileError::TaskFailed(join_error.clone())));
                }
            }
        }
        batch
    }
}
