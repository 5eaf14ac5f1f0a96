//! Indexed FASTA reader
//!
//! Random access to a FASTA file through its `.fai` index. Both files can be
//! local or remote; base ranges become a single byte-range read.

use crate::core::io::{fetch_text, IoStrategy, RangeReader, Resource};
use crate::core::{CoordinateError, FaiError, Result, SharedLoad};
use crate::formats::fai::FaiIndex;
use crate::source::SequenceReader;
use std::sync::Arc;

/// FASTA file plus its index
#[derive(Debug)]
pub struct IndexedFasta {
    index: FaiIndex,
    reader: RangeReader,
}

impl IndexedFasta {
    /// Open a FASTA, loading its index from `fai` or from `<fasta>.fai`
    pub async fn open(
        client: &reqwest::Client,
        fasta: &Resource,
        fai: Option<&Resource>,
        strategy: IoStrategy,
    ) -> std::result::Result<Self, FaiError> {
        let fai = fai.cloned().unwrap_or_else(|| fasta.with_suffix(".fai"));
        let text = fetch_text(client, &fai).await?;
        let index = FaiIndex::parse(&text)?;
        log::info!("Loaded FASTA index for {} sequences from {}", index.len(), fai);

        let reader = RangeReader::open(client, fasta, strategy).await?;
        Ok(Self::from_parts(index, reader))
    }

    pub fn from_parts(index: FaiIndex, reader: RangeReader) -> Self {
        Self { index, reader }
    }

    pub fn index(&self) -> &FaiIndex {
        &self.index
    }

    /// Bases `[start, end)` of `chrom`, with `end` clamped to its length
    pub async fn read(&self, chrom: &str, start: u64, end: u64) -> Result<Vec<u8>> {
        if start > end {
            return Err(CoordinateError::InvalidRange { start, end }.into());
        }
        let record = self
            .index
            .get(chrom)
            .ok_or_else(|| CoordinateError::UnknownChromosome(chrom.to_string()))?;

        let (first, last) = record.byte_span(start, end);
        let mut bases = self.reader.read_range(first, last).await?;
        bases.retain(|&b| b != b'\n' && b != b'\r');

        let expected = end.min(record.length).saturating_sub(start);
        if bases.len() as u64 != expected {
            log::warn!(
                "{}:{}-{} returned {} bases, expected {}",
                chrom,
                start,
                end,
                bases.len(),
                expected
            );
        }
        Ok(bases)
    }
}

impl SequenceReader for IndexedFasta {
    async fn fetch_sequence(&self, chrom: &str, start: u64, end: u64) -> Result<Vec<u8>> {
        self.read(chrom, start, end).await
    }
}

/// Indexed FASTA opened on first use
///
/// The index is fetched once, shared by concurrent first requests, and
/// fetched again on the next request if loading failed.
pub struct LazyFasta {
    client: reqwest::Client,
    fasta: Resource,
    fai: Option<Resource>,
    strategy: IoStrategy,
    inner: SharedLoad<Arc<IndexedFasta>, FaiError>,
}

impl LazyFasta {
    pub fn new(client: reqwest::Client, fasta: Resource, fai: Option<Resource>, strategy: IoStrategy) -> Self {
        Self {
            client,
            fasta,
            fai,
            strategy,
            inner: SharedLoad::new(),
        }
    }

    /// The opened FASTA, loading it if needed
    pub async fn get(&self) -> std::result::Result<Arc<IndexedFasta>, FaiError> {
        self.inner
            .get_or_load(|| async {
                IndexedFasta::open(&self.client, &self.fasta, self.fai.as_ref(), self.strategy)
                    .await
                    .map(Arc::new)
            })
            .await
    }
}

impl SequenceReader for LazyFasta {
    async fn fetch_sequence(&self, chrom: &str, start: u64, end: u64) -> Result<Vec<u8>> {
        self.get().await?.read(chrom, start, end).await
    }
}
