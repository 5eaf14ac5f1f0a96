//! Error types for seqtile
//!
//! Defines all error types used throughout the library.

use thiserror::Error;

/// Main error type for seqtile operations
#[derive(Debug, Error)]
pub enum SeqTileError {
    /// Chromosome coordinate errors
    #[error("Coordinate error: {0}")]
    Coordinate(#[from] CoordinateError),

    /// Chromosome sizes table errors
    #[error("Error parsing chromsizes: {0}")]
    ChromSizes(#[from] ChromSizesError),

    /// FASTA index errors
    #[error("FASTA index error: {0}")]
    Fai(#[from] FaiError),

    /// Resource fetch errors
    #[error("Fetch error: {0}")]
    Fetch(#[from] FetchError),

    /// Tile identifier errors
    #[error("{0}")]
    TileId(#[from] TileIdError),

    /// Column reduction errors
    #[error("Reduce error: {0}")]
    Reduce(#[from] ReduceError),

    /// Tile requested below the only resolution the source serves
    #[error("Zoom level {zoom} is too coarse for single-resolution data (max zoom {max_zoom})")]
    ZoomTooCoarse { zoom: u32, max_zoom: u32 },

    /// Pre-encoded tile with an unexpected shape
    #[error("Invalid tile shape {shape:?} for {len} values: {message}")]
    InvalidShape {
        shape: Vec<usize>,
        len: usize,
        message: String,
    },

    /// The tile batch was superseded and cancelled
    #[error("Tile request cancelled")]
    Cancelled,

    /// A spawned fetch task panicked or was aborted
    #[error("Fetch task failed: {0}")]
    TaskFailed(String),
}

/// Errors from the coordinate index
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoordinateError {
    /// Chromosome not present in the chromosome table
    #[error("Unknown chromosome: {0}")]
    UnknownChromosome(String),

    /// Invalid coordinate range
    #[error("Invalid coordinate range: start ({start}) > end ({end})")]
    InvalidRange { start: u64, end: u64 },
}

/// Errors while loading or parsing a chromosome sizes table
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChromSizesError {
    /// The table could not be fetched
    #[error("{0}")]
    Fetch(#[from] FetchError),

    /// A row that is not `name<TAB>length`
    #[error("Invalid chromsizes line {line}: {message}")]
    InvalidLine { line: usize, message: String },

    /// Same chromosome listed twice
    #[error("Duplicate chromosome '{name}' at line {line}")]
    DuplicateChromosome { name: String, line: usize },

    /// No chromosomes in the table
    #[error("Chromosome sizes table is empty")]
    Empty,
}

/// Errors while loading or parsing a FASTA index
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FaiError {
    /// The index could not be fetched
    #[error("{0}")]
    Fetch(#[from] FetchError),

    /// Malformed `.fai` row
    #[error("Invalid FASTA index line {line}: {message}")]
    InvalidLine { line: usize, message: String },

    /// Malformed FASTA while building an index
    #[error("Cannot index FASTA: {0}")]
    InvalidFasta(String),
}

/// Errors while fetching a local or remote resource
///
/// Carries messages rather than source errors so one failure can be handed to
/// every caller waiting on the same load.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    /// Transport-level HTTP failure
    #[error("HTTP request for {resource} failed: {message}")]
    Http { resource: String, message: String },

    /// Non-success HTTP status
    #[error("HTTP request for {resource} returned status {status}")]
    Status { resource: String, status: u16 },

    /// Local I/O failure
    #[error("I/O error reading {resource}: {message}")]
    Io { resource: String, message: String },

    /// Payload could not be decoded
    #[error("Could not decode {resource}: {message}")]
    Decode { resource: String, message: String },
}

/// Errors from tile identifier parsing
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TileIdError {
    /// Zoom or index is not a non-negative integer
    #[error("Invalid tile zoom or position: '{0}'")]
    InvalidTileId(String),
}

/// Errors from column reduction
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ReduceError {
    /// Ambiguous column while no aggregation policy is selected
    #[error("Column sums to {sum}, but the aggregation mode only accepts one-hot columns")]
    AggregationMode { sum: f32 },

    /// Unknown aggregation mode name
    #[error("Unknown color aggregation mode: '{0}'")]
    UnknownMode(String),

    /// Unparsable color
    #[error("Invalid color '{0}'")]
    InvalidColor(String),

    /// Color scale with the wrong number of entries
    #[error("Color scale needs {expected} colors, got {found}")]
    ColorScaleLength { expected: usize, found: usize },
}

/// Result type alias for seqtile operations
pub type Result<T> = std::result::Result<T, SeqTileError>;

/// Result type alias for coordinate lookups
pub type CoordinateResult<T> = std::result::Result<T, CoordinateError>;

/// Result type alias for resource fetches
pub type FetchResult<T> = std::result::Result<T, FetchError>;

/// Result type alias for column reduction
pub type ReduceResult<T> = std::result::Result<T, ReduceError>;
