//! File format adapters
//!
//! Chromosome sizes tables, FASTA indexes, indexed FASTA access and multivec
//! tile service payloads.

pub mod chromsizes;
pub mod fai;
pub mod fasta;
pub mod multivec;

pub use chromsizes::{load_genome_index, parse_chrom_sizes, parse_genome_index};
pub use fai::{FaiIndex, FaiRecord};
pub use fasta::{IndexedFasta, LazyFasta};
pub use multivec::{DenseTile, TilesResponse, TilesetInfoResponse};
