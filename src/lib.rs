//! seqtile - Tiled nucleotide sequence data layer
//!
//! Serves one-hot encoded nucleotide tiles to a genome browser track, either
//! tiled on the fly from an indexed FASTA file and a chromosome sizes table,
//! or relayed from a multivec tile service. Also collapses multi-sample
//! columns into a display letter and color.
//!
//! # Features
//!
//! - Tile windows split at chromosome boundaries and fetched concurrently
//! - Local (mmap / buffered) and remote (HTTP range) FASTA access
//! - Exact, max and weighted column reduction with a bounded palette
//! - Cancellable tile batches
//!
//! # Example
//!
//! ```ignore
//! use seqtile::{DataConfig, DataFetcher, TileAssembler, TrackOptions, IoStrategy};
//!
//! let data: DataConfig = serde_json::from_str(
//!     r#"{"chromSizesUrl": "hg38.chrom.sizes", "fastaUrl": "hg38.fa"}"#,
//! )?;
//! let options = TrackOptions::default();
//! let fetcher = DataFetcher::from_config(reqwest::Client::new(), &data, &options, IoStrategy::Auto);
//! let assembler = TileAssembler::new(fetcher);
//!
//! let info = assembler.tileset_info_response().await;
//! let batch = assembler.resolve_tiles(["22.1024", "22.1025"]).await;
//! ```

pub mod core;
pub mod formats;
pub mod source;

// Re-export commonly used types
pub use core::{
    AggregationMode, ColorScale, Column, ColumnReducer, GenomeIndex, IoStrategy, PaletteCache,
    ReducedColumn, Resource, SeqTileError, TileId, TilesetInfo,
};
pub use formats::{FaiIndex, IndexedFasta};
pub use source::{
    CancelToken, DataConfig, DataFetcher, EncodedTile, MetadataResponse, RawSequenceSource,
    SequenceReader, TileAssembler, TileBatch, TileSource, TrackConfig, TrackOptions,
};
