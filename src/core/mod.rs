//! Core tiling functionality
//!
//! This module contains the genome coordinate index, tile coordinate math,
//! the one-hot codec, column reduction and the resource access layer.

pub mod dna;
mod error;
mod genome;
pub mod io;
mod reducer;
mod shared;
mod tiling;
pub mod view;

pub use dna::{encode_bases, one_hot, unflatten, Column, Nucleotide, CHANNELS, LETTERS};
pub use error::{
    ChromSizesError, CoordinateError, CoordinateResult, FaiError, FetchError, FetchResult,
    ReduceError, ReduceResult, Result, SeqTileError, TileIdError,
};
pub use genome::{ChromClip, ChromosomeRecord, GenomeIndex};
pub use io::{IoStrategy, RangeReader, Resource};
pub use reducer::{
    AggregationMode, ColorRef, ColorScale, ColumnReducer, FirstIndex, PaletteCache,
    ReducedColumn, Rgb, RoundRobin, TieBreak, TieBreakKind, UniformRandom, DEFAULT_COLOR_SCALE,
};
pub use shared::SharedLoad;
pub use tiling::{Datatype, TileCoordinateMapper, TileId, TileWindow, TilesetInfo, DEFAULT_TILE_SIZE};
pub use view::{display_state, visible_tile_ids, visible_tiles, zoom_level_for_view, DisplayState};
