//! Tile sources
//!
//! A [`TileSource`] reports tileset metadata and produces the encoded
//! columns of one tile. Two variants exist: [`RawSequenceSource`] tiles a
//! random-access sequence file on the fly, [`PreEncodedSource`] relays a
//! multivec tile service. [`DataFetcher`] picks one from a [`DataConfig`], and
//! [`TileAssembler`] turns tile id batches into encoded tiles.

pub mod assembler;
pub mod config;
pub mod preencoded;
pub mod raw;

use crate::core::{Column, IoStrategy, Resource, Result, TileId, TilesetInfo};
use crate::formats::fasta::LazyFasta;
use std::future::Future;

pub use assembler::{CancelToken, EncodedTile, MetadataResponse, TileAssembler, TileBatch};
pub use config::{DataConfig, TrackConfig, TrackOptions};
pub use preencoded::PreEncodedSource;
pub use raw::RawSequenceSource;

/// Chromosome-local access to raw bases
pub trait SequenceReader: Send + Sync + 'static {
    /// Bases `[start, end)` of `chrom` (0-based, end clamped to its length)
    fn fetch_sequence(&self, chrom: &str, start: u64, end: u64) -> impl Future<Output = Result<Vec<u8>>> + Send;
}

/// Anything that can serve tiles
pub trait TileSource: Send + Sync + 'static {
    /// Tileset metadata, resolving it on first use
    fn tileset_info(&self) -> impl Future<Output = Result<TilesetInfo>> + Send;

    /// Metadata if already resolved
    fn cached_tileset_info(&self) -> Option<TilesetInfo>;

    /// Encoded columns of one tile
    fn tile(&self, tile: TileId) -> impl Future<Output = Result<Vec<Column>>> + Send;
}

/// Tile source selected by dataset configuration
pub enum DataFetcher {
    Raw(RawSequenceSource<LazyFasta>),
    PreEncoded(PreEncodedSource),
}

impl DataFetcher {
    /// Build the source a dataset configuration describes
    ///
    /// `strategy` only applies to local FASTA files.
    pub fn from_config(
        client: reqwest::Client,
        data: &DataConfig,
        options: &TrackOptions,
        strategy: IoStrategy,
    ) -> Self {
        match data {
            DataConfig::Raw {
                chrom_sizes_url,
                fasta_url,
                fai_url,
            } => {
                let fasta = LazyFasta::new(
                    client.clone(),
                    Resource::parse(fasta_url),
                    fai_url.as_deref().map(Resource::parse),
                    strategy,
                );
                DataFetcher::Raw(
                    RawSequenceSource::new(client, Resource::parse(chrom_sizes_url), fasta)
                        .with_fixed_zoom(options.fixed_zoom_for_single_resolution),
                )
            }
            DataConfig::PreEncoded { server, tileset_uid } => {
                DataFetcher::PreEncoded(PreEncodedSource::new(client, server.clone(), tileset_uid.clone()))
            }
        }
    }
}

impl TileSource for DataFetcher {
    async fn tileset_info(&self) -> Result<TilesetInfo> {
        match self {
            DataFetcher::Raw(source) => source.tileset_info().await,
            DataFetcher::PreEncoded(source) => source.tileset_info().await,
        }
    }

    fn cached_tileset_info(&self) -> Option<TilesetInfo> {
        match self {
            DataFetcher::Raw(source) => source.cached_tileset_info(),
            DataFetcher::PreEncoded(source) => source.cached_tileset_info(),
        }
    }

    async fn tile(&self, tile: TileId) -> Result<Vec<Column>> {
        match self {
            DataFetcher::Raw(source) => source.tile(tile).await,
            DataFetcher::PreEncoded(source) => source.tile(tile).await,
        }
    }
}
