//! Raw sequence tile source
//!
//! Tiles a random-access sequence on the fly. The chromosome sizes table
//! defines the absolute coordinate space and tileset metadata; each tile
//! window is split at chromosome boundaries, the pieces are fetched
//! concurrently, reassembled in chromosome order and one-hot encoded.

use crate::core::io::Resource;
use crate::core::{
    encode_bases, ChromSizesError, Column, Datatype, GenomeIndex, Result, SeqTileError, SharedLoad,
    TileCoordinateMapper, TileId, TilesetInfo, DEFAULT_TILE_SIZE,
};
use crate::formats::chromsizes::load_genome_index;
use crate::source::{SequenceReader, TileSource};
use std::sync::Arc;
use tokio::task::JoinSet;

/// Tile source over a chromosome sizes table and a [`SequenceReader`]
pub struct RawSequenceSource<R> {
    reader: Arc<R>,
    client: reqwest::Client,
    chrom_sizes: Option<Resource>,
    genome: SharedLoad<Arc<GenomeIndex>, ChromSizesError>,
    tile_size: u64,
    fixed_zoom: bool,
}

impl<R: SequenceReader> RawSequenceSource<R> {
    /// Source whose chromosome table is fetched on first use
    pub fn new(client: reqwest::Client, chrom_sizes: Resource, reader: R) -> Self {
        Self {
            reader: Arc::new(reader),
            client,
            chrom_sizes: Some(chrom_sizes),
            genome: SharedLoad::new(),
            tile_size: DEFAULT_TILE_SIZE,
            fixed_zoom: false,
        }
    }

    /// Source over an already built coordinate index
    pub fn with_genome(genome: GenomeIndex, reader: R) -> Self {
        Self {
            reader: Arc::new(reader),
            client: reqwest::Client::new(),
            chrom_sizes: None,
            genome: SharedLoad::ready(Arc::new(genome)),
            tile_size: DEFAULT_TILE_SIZE,
            fixed_zoom: false,
        }
    }

    /// Bases per tile at the deepest zoom
    pub fn with_tile_size(mut self, tile_size: u64) -> Self {
        self.tile_size = tile_size.max(1);
        self
    }

    /// Reject tiles above the deepest zoom
    pub fn with_fixed_zoom(mut self, fixed_zoom: bool) -> Self {
        self.fixed_zoom = fixed_zoom;
        self
    }

    pub fn reader(&self) -> &R {
        &self.reader
    }

    /// Coordinate index, loading the chromosome table on first use
    ///
    /// Concurrent first calls share one fetch; a failed fetch is retried on
    /// the next call.
    pub async fn genome(&self) -> std::result::Result<Arc<GenomeIndex>, ChromSizesError> {
        self.genome
            .get_or_load(|| async {
                let resource = self.chrom_sizes.as_ref().ok_or(ChromSizesError::Empty)?;
                load_genome_index(&self.client, resource).await.map(Arc::new)
            })
            .await
    }

    fn info_for(&self, genome: &GenomeIndex) -> TilesetInfo {
        TilesetInfo::from_total_length(
            genome.total_length(),
            self.tile_size,
            Datatype::MultivecSingleresSequence,
        )
    }

    /// Bases of the absolute range `[start, end)`
    ///
    /// The range is split into one sub-fetch per overlapping chromosome. The
    /// sub-fetches run concurrently and are joined in chromosome order, so the
    /// result never depends on completion order. Parts of the range beyond the
    /// genome are dropped.
    pub async fn fetch_bases(&self, start: u64, end: u64) -> Result<Vec<u8>> {
        let genome = self.genome().await?;

        let mut set = JoinSet::new();
        let mut expected = 0u64;
        for (i, clip) in genome.chromosomes_overlapping(start, end).into_iter().enumerate() {
            log::debug!(
                "sub-fetch {} of [{}, {}): {}:{}-{}",
                i,
                start,
                end,
                clip.chrom.name,
                clip.local_start,
                clip.local_end
            );
            expected += clip.len();

            let reader = Arc::clone(&self.reader);
            let chrom = clip.chrom.name.clone();
            let (local_start, local_end) = (clip.local_start, clip.local_end);
            set.spawn(async move {
                let bases = reader.fetch_sequence(&chrom, local_start, local_end).await?;
                Ok::<_, SeqTileError>((i, bases))
            });
        }

        let mut parts = Vec::with_capacity(set.len());
        while let Some(joined) = set.join_next().await {
            let part = joined.map_err(|e| SeqTileError::TaskFailed(e.to_string()))??;
            parts.push(part);
        }
        parts.sort_unstable_by_key(|(i, _)| *i);

        let mut bases = Vec::with_capacity(expected as usize);
        for (_, part) in parts {
            bases.extend_from_slice(&part);
        }
        Ok(bases)
    }
}

impl<R: SequenceReader> TileSource for RawSequenceSource<R> {
    async fn tileset_info(&self) -> Result<TilesetInfo> {
        let genome = self.genome().await?;
        Ok(self.info_for(&genome))
    }

    fn cached_tileset_info(&self) -> Option<TilesetInfo> {
        self.genome.peek().map(|genome| self.info_for(&genome))
    }

    async fn tile(&self, tile: TileId) -> Result<Vec<Column>> {
        let genome = self.genome().await?;
        let info = self.info_for(&genome);

        if self.fixed_zoom && tile.zoom < info.max_zoom {
            return Err(SeqTileError::ZoomTooCoarse {
                zoom: tile.zoom,
                max_zoom: info.max_zoom,
            });
        }

        let window = TileCoordinateMapper::new(&info).tile_window(tile.zoom, tile.index);
        let (start, end) = window.to_base_range(genome.total_length());
        let bases = self.fetch_bases(start, end).await?;
        Ok(encode_bases(&bases))
    }
}
