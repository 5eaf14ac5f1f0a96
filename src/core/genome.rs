//! Absolute genome coordinate index
//!
//! Concatenates the chromosomes of a chrom sizes table into one linear
//! coordinate space and answers lookups in both directions. Uses rust-lapper
//! for O(log n + k) overlap queries.

use crate::core::error::{ChromSizesError, CoordinateError, CoordinateResult};
use rust_lapper::{Interval, Lapper};
use std::collections::HashMap;

/// One chromosome in table order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChromosomeRecord {
    /// Chromosome name
    pub name: String,
    /// Chromosome length in bases (always > 0)
    pub length: u64,
    /// Absolute coordinate of the first base
    pub cumulative_start: u64,
}

impl ChromosomeRecord {
    /// Absolute coordinate one past the last base
    #[inline]
    pub fn cumulative_end(&self) -> u64 {
        self.cumulative_start + self.length
    }
}

/// Portion of an absolute window that falls on one chromosome
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChromClip<'a> {
    pub chrom: &'a ChromosomeRecord,
    /// Clipped start in chromosome-local coordinates (0-based)
    pub local_start: u64,
    /// Clipped end in chromosome-local coordinates (exclusive)
    pub local_end: u64,
}

impl ChromClip<'_> {
    /// Absolute start of the clip
    pub fn abs_start(&self) -> u64 {
        self.chrom.cumulative_start + self.local_start
    }

    /// Absolute end of the clip (exclusive)
    pub fn abs_end(&self) -> u64 {
        self.chrom.cumulative_start + self.local_end
    }

    /// Number of bases covered
    pub fn len(&self) -> u64 {
        self.local_end - self.local_start
    }

    /// Clips are never empty, kept for API completeness
    pub fn is_empty(&self) -> bool {
        self.local_end == self.local_start
    }
}

/// Cumulative-offset table over an ordered list of chromosomes
///
/// Records partition `[0, total_length)` without gaps or overlaps, in the
/// order they appeared in the chromosome sizes table.
pub struct GenomeIndex {
    records: Vec<ChromosomeRecord>,
    by_name: HashMap<String, usize>,
    /// Absolute interval -> record position
    lapper: Lapper<u64, usize>,
    total_length: u64,
}

impl std::fmt::Debug for GenomeIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GenomeIndex")
            .field("records", &self.records)
            .field("total_length", &self.total_length)
            .finish()
    }
}

impl GenomeIndex {
    /// Build the index from `(name, length)` pairs in table order
    ///
    /// # Example
    /// ```
    /// use seqtile::core::GenomeIndex;
    ///
    /// let index = GenomeIndex::new(vec![("chr1".into(), 1000), ("chr2".into(), 500)]).unwrap();
    /// assert_eq!(index.total_length(), 1500);
    /// assert_eq!(index.locate("chr2", 10).unwrap(), 1010);
    /// ```
    pub fn new(entries: Vec<(String, u64)>) -> Result<Self, ChromSizesError> {
        if entries.is_empty() {
            return Err(ChromSizesError::Empty);
        }

        let mut records = Vec::with_capacity(entries.len());
        let mut by_name = HashMap::with_capacity(entries.len());
        let mut intervals = Vec::with_capacity(entries.len());
        let mut total_length = 0u64;

        for (i, (name, length)) in entries.into_iter().enumerate() {
            if length == 0 {
                return Err(ChromSizesError::InvalidLine {
                    line: i + 1,
                    message: format!("chromosome '{}' has zero length", name),
                });
            }
            if by_name.insert(name.clone(), i).is_some() {
                return Err(ChromSizesError::DuplicateChromosome { name, line: i + 1 });
            }

            intervals.push(Interval {
                start: total_length,
                stop: total_length + length,
                val: i,
            });
            records.push(ChromosomeRecord {
                name,
                length,
                cumulative_start: total_length,
            });
            total_length += length;
        }

        Ok(Self {
            records,
            by_name,
            lapper: Lapper::new(intervals),
            total_length,
        })
    }

    /// Sum of all chromosome lengths
    pub fn total_length(&self) -> u64 {
        self.total_length
    }

    /// Chromosomes in table order
    pub fn records(&self) -> &[ChromosomeRecord] {
        &self.records
    }

    /// Number of chromosomes
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// True when the table holds no chromosomes (never, once built)
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Look up a chromosome by exact name
    pub fn get(&self, name: &str) -> Option<&ChromosomeRecord> {
        self.by_name.get(name).map(|&i| &self.records[i])
    }

    /// Map `name:local_offset` to an absolute coordinate
    pub fn locate(&self, name: &str, local_offset: u64) -> CoordinateResult<u64> {
        self.get(name)
            .map(|rec| rec.cumulative_start + local_offset)
            .ok_or_else(|| CoordinateError::UnknownChromosome(name.to_string()))
    }

    /// Map an absolute coordinate back to `(chromosome, local offset)`
    ///
    /// Returns `None` for coordinates at or beyond the total length.
    pub fn chromosome_at(&self, abs: u64) -> Option<(&ChromosomeRecord, u64)> {
        if abs >= self.total_length {
            return None;
        }
        let i = self
            .records
            .partition_point(|rec| rec.cumulative_end() <= abs);
        self.records
            .get(i)
            .map(|rec| (rec, abs - rec.cumulative_start))
    }

    /// Split an absolute window `[start, end)` into per-chromosome clips
    ///
    /// Clips come back in chromosome order, are never empty, and together cover
    /// exactly the part of the window that lies inside `[0, total_length)`.
    pub fn chromosomes_overlapping(&self, start: u64, end: u64) -> Vec<ChromClip<'_>> {
        if start >= end {
            return Vec::new();
        }

        let mut hits: Vec<usize> = self.lapper.find(start, end).map(|iv| iv.val).collect();
        hits.sort_unstable();

        hits.into_iter()
            .filter_map(|i| {
                let chrom = &self.records[i];
                let clip_start = start.max(chrom.cumulative_start);
                let clip_end = end.min(chrom.cumulative_end());
                (clip_start < clip_end).then(|| ChromClip {
                    chrom,
                    local_start: clip_start - chrom.cumulative_start,
                    local_end: clip_end - chrom.cumulative_start,
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_index() -> GenomeIndex {
        GenomeIndex::new(vec![
            ("chr1".to_string(), 1000),
            ("chr2".to_string(), 500),
            ("chrM".to_string(), 16),
        ])
        .unwrap()
    }

    #[test]
    fn test_index_creation() {
        let index = create_test_index();
        assert_eq!(index.len(), 3);
        assert_eq!(index.total_length(), 1516);
        assert_eq!(index.records()[1].cumulative_start, 1000);
        assert_eq!(index.records()[2].cumulative_start, 1500);
    }

    #[test]
    fn test_locate() {
        let index = create_test_index();
        assert_eq!(index.locate("chr1", 0).unwrap(), 0);
        assert_eq!(index.locate("chr2", 0).unwrap(), 1000);
        assert_eq!(index.locate("chrM", 15).unwrap(), 1515);
        assert_eq!(
            index.locate("chr3", 0),
            Err(CoordinateError::UnknownChromosome("chr3".to_string()))
        );
    }

    #[test]
    fn test_chromosome_at() {
        let index = create_test_index();
        let (rec, local) = index.chromosome_at(999).unwrap();
        assert_eq!((rec.name.as_str(), local), ("chr1", 999));
        let (rec, local) = index.chromosome_at(1000).unwrap();
        assert_eq!((rec.name.as_str(), local), ("chr2", 0));
        assert!(index.chromosome_at(1516).is_none());
    }

    #[test]
    fn test_overlap_across_boundary() {
        let index = create_test_index();
        let clips = index.chromosomes_overlapping(900, 1100);
        assert_eq!(clips.len(), 2);
        assert_eq!(clips[0].chrom.name, "chr1");
        assert_eq!((clips[0].local_start, clips[0].local_end), (900, 1000));
        assert_eq!(clips[1].chrom.name, "chr2");
        assert_eq!((clips[1].local_start, clips[1].local_end), (0, 100));
    }

    #[test]
    fn test_overlap_spanning_everything() {
        let index = create_test_index();
        let clips = index.chromosomes_overlapping(0, 4096);
        let names: Vec<&str> = clips.iter().map(|c| c.chrom.name.as_str()).collect();
        assert_eq!(names, vec!["chr1", "chr2", "chrM"]);
        assert_eq!(clips[2].local_end, 16);
    }

    #[test]
    fn test_overlap_outside_genome() {
        let index = create_test_index();
        assert!(index.chromosomes_overlapping(2000, 3000).is_empty());
        assert!(index.chromosomes_overlapping(10, 10).is_empty());
        assert!(index.chromosomes_overlapping(20, 10).is_empty());
    }

    #[test]
    fn test_overlap_exact_chromosome() {
        let index = create_test_index();
        let clips = index.chromosomes_overlapping(1000, 1500);
        assert_eq!(clips.len(), 1);
        assert_eq!(clips[0].chrom.name, "chr2");
        assert_eq!(clips[0].len(), 500);
    }

    #[test]
    fn test_rejects_bad_tables() {
        assert_eq!(GenomeIndex::new(vec![]).unwrap_err(), ChromSizesError::Empty);
        assert!(matches!(
            GenomeIndex::new(vec![("a".into(), 1), ("a".into(), 2)]),
            Err(ChromSizesError::DuplicateChromosome { .. })
        ));
        assert!(matches!(
            GenomeIndex::new(vec![("a".into(), 0)]),
            Err(ChromSizesError::InvalidLine { line: 1, .. })
        ));
    }
}
