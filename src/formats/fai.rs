//! FASTA index (`.fai`)
//!
//! Each row is `name  length  offset  line_bases  line_bytes`, tab separated.
//! With fixed-width lines the byte position of base `p` of a sequence is
//! `offset + (p / line_bases) * line_bytes + p % line_bases`, which lets a
//! reader fetch any base range with one contiguous byte read.

use crate::core::FaiError;
use memchr::memchr;
use std::collections::HashMap;
use std::fmt::Write as _;

/// One indexed sequence
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FaiRecord {
    pub name: String,
    /// Number of bases
    pub length: u64,
    /// Byte offset of the first base
    pub offset: u64,
    /// Bases per full line
    pub line_bases: u64,
    /// Bytes per full line, terminator included
    pub line_bytes: u64,
}

impl FaiRecord {
    /// File offset of base `pos`
    #[inline]
    pub fn byte_offset(&self, pos: u64) -> u64 {
        // Empty sequences are indexed with zero-width lines
        if self.line_bases == 0 {
            return self.offset;
        }
        self.offset + (pos / self.line_bases) * self.line_bytes + pos % self.line_bases
    }

    /// Byte span `[first, last)` holding bases `[start, end)`
    ///
    /// `end` is clamped to the sequence length; an empty base range yields an
    /// empty span.
    pub fn byte_span(&self, start: u64, end: u64) -> (u64, u64) {
        let end = end.min(self.length);
        if start >= end {
            let at = self.byte_offset(start.min(self.length));
            return (at, at);
        }
        (self.byte_offset(start), self.byte_offset(end - 1) + 1)
    }
}

/// Parsed or freshly built FASTA index
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FaiIndex {
    records: Vec<FaiRecord>,
    by_name: HashMap<String, usize>,
}

impl FaiIndex {
    fn from_records(records: Vec<FaiRecord>) -> Self {
        let by_name = records
            .iter()
            .enumerate()
            .map(|(i, rec)| (rec.name.clone(), i))
            .collect();
        Self { records, by_name }
    }

    /// Parse `.fai` text
    pub fn parse(text: &str) -> Result<Self, FaiError> {
        let mut records = Vec::new();
        let mut first_seen: HashMap<String, usize> = HashMap::new();

        for (i, raw) in text.lines().enumerate() {
            let line = raw.trim_end_matches('\r');
            if line.trim().is_empty() {
                continue;
            }
            let line_no = i + 1;
            let invalid = |message: String| FaiError::InvalidLine { line: line_no, message };

            let fields: Vec<&str> = line.split('\t').collect();
            if fields.len() < 5 {
                return Err(invalid(format!("expected 5 fields, found {}", fields.len())));
            }

            let number = |idx: usize, what: &str| {
                fields[idx]
                    .trim()
                    .parse::<u64>()
                    .map_err(|_| invalid(format!("invalid {} '{}'", what, fields[idx])))
            };

            let record = FaiRecord {
                name: fields[0].to_string(),
                length: number(1, "length")?,
                offset: number(2, "offset")?,
                line_bases: number(3, "line bases")?,
                line_bytes: number(4, "line bytes")?,
            };

            if record.line_bases == 0 && record.length > 0 {
                return Err(invalid("line bases must be positive".to_string()));
            }
            if record.line_bytes < record.line_bases {
                return Err(invalid("line bytes smaller than line bases".to_string()));
            }
            if let Some(first) = first_seen.insert(record.name.clone(), line_no) {
                return Err(invalid(format!(
                    "duplicate sequence name '{}' (first on line {})",
                    record.name, first
                )));
            }
            records.push(record);
        }

        Ok(Self::from_records(records))
    }

    /// Index an uncompressed FASTA held in memory
    ///
    /// Every sequence must use one line width, except for its last line which
    /// may be shorter.
    pub fn build(fasta: &[u8]) -> Result<Self, FaiError> {
        let mut records = Vec::new();
        let mut current: Option<Builder> = None;
        let mut pos = 0usize;

        while pos < fasta.len() {
            let (content_end, next) = match memchr(b'\n', &fasta[pos..]) {
                Some(nl) => (pos + nl, pos + nl + 1),
                None => (fasta.len(), fasta.len()),
            };
            let mut content = &fasta[pos..content_end];
            if content.last() == Some(&b'\r') {
                content = &content[..content.len() - 1];
            }
            let total = (next - pos) as u64;

            if content.first() == Some(&b'>') {
                if let Some(builder) = current.take() {
                    records.push(builder.finish());
                }
                let header = String::from_utf8_lossy(&content[1..]);
                let name = header.split_whitespace().next().unwrap_or("").to_string();
                if name.is_empty() {
                    return Err(FaiError::InvalidFasta(format!("empty sequence name at byte {}", pos)));
                }
                current = Some(Builder::new(name, next as u64));
            } else if let Some(builder) = current.as_mut() {
                builder.add_line(content.len() as u64, total)?;
            } else if !content.iter().all(u8::is_ascii_whitespace) {
                return Err(FaiError::InvalidFasta("sequence data before first header".to_string()));
            }

            pos = next;
        }

        if let Some(builder) = current {
            records.push(builder.finish());
        }

        let index = Self::from_records(records);
        if index.by_name.len() != index.records.len() {
            return Err(FaiError::InvalidFasta("duplicate sequence names".to_string()));
        }
        Ok(index)
    }

    /// Look up a sequence by name
    pub fn get(&self, name: &str) -> Option<&FaiRecord> {
        self.by_name.get(name).map(|&i| &self.records[i])
    }

    /// Sequences in file order
    pub fn records(&self) -> &[FaiRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// `(name, length)` pairs, usable as a chromosome sizes table
    pub fn chrom_sizes(&self) -> Vec<(String, u64)> {
        self.records.iter().map(|r| (r.name.clone(), r.length)).collect()
    }

    /// Serialize as `.fai` text
    pub fn to_fai_string(&self) -> String {
        let mut out = String::new();
        for r in &self.records {
            // Writing to a String cannot fail
            let _ = writeln!(
                out,
                "{}\t{}\t{}\t{}\t{}",
                r.name, r.length, r.offset, r.line_bases, r.line_bytes
            );
        }
        out
    }
}

/// Accumulates one sequence while indexing
struct Builder {
    name: String,
    offset: u64,
    length: u64,
    line_bases: u64,
    line_bytes: u64,
    /// A short (final) line was seen; more sequence is an error
    ended: bool,
}

impl Builder {
    fn new(name: String, offset: u64) -> Self {
        Self {
            name,
            offset,
            length: 0,
            line_bases: 0,
            line_bytes: 0,
            ended: false,
        }
    }

    fn add_line(&mut self, bases: u64, bytes: u64) -> Result<(), FaiError> {
        if bases == 0 {
            self.ended = true;
            return Ok(());
        }
        if self.ended {
            return Err(FaiError::InvalidFasta(format!(
                "different line length in sequence '{}'",
                self.name
            )));
        }

        if self.line_bases == 0 {
            self.line_bases = bases;
            self.line_bytes = bytes;
        } else if bases > self.line_bases {
            return Err(FaiError::InvalidFasta(format!(
                "different line length in sequence '{}'",
                self.name
            )));
        }

        if bases < self.line_bases {
            self.ended = true;
        }
        self.length += bases;
        Ok(())
    }

    fn finish(self) -> FaiRecord {
        FaiRecord {
            name: self.name,
            length: self.length,
            offset: self.offset,
            line_bases: self.line_bases,
            line_bytes: self.line_bytes,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FASTA: &[u8] = b">chr1 test\nACGTACGTAC\nGTACGTACGT\nACG\n>chr2\nNNNNNNNNNN\nnn\n";

    #[test]
    fn test_build_index() {
        let index = FaiIndex::build(FASTA).unwrap();
        assert_eq!(index.len(), 2);

        let chr1 = index.get("chr1").unwrap();
        assert_eq!((chr1.length, chr1.offset, chr1.line_bases, chr1.line_bytes), (23, 11, 10, 11));

        let chr2 = index.get("chr2").unwrap();
        assert_eq!((chr2.length, chr2.offset, chr2.line_bases, chr2.line_bytes), (12, 43, 10, 11));
        assert_eq!(&FASTA[chr2.offset as usize..chr2.offset as usize + 3], b"NNN");
    }

    #[test]
    fn test_build_crlf() {
        let index = FaiIndex::build(b">s\r\nACGT\r\nAC\r\n").unwrap();
        let s = index.get("s").unwrap();
        assert_eq!((s.length, s.offset, s.line_bases, s.line_bytes), (6, 4, 4, 6));
    }

    #[test]
    fn test_build_rejects_ragged_lines() {
        assert!(matches!(
            FaiIndex::build(b">s\nACGT\nAC\nACGT\n"),
            Err(FaiError::InvalidFasta(_))
        ));
        assert!(matches!(
            FaiIndex::build(b">s\nAC\nACGT\n"),
            Err(FaiError::InvalidFasta(_))
        ));
        assert!(matches!(FaiIndex::build(b"ACGT\n"), Err(FaiError::InvalidFasta(_))));
    }

    #[test]
    fn test_parse_round_trip() {
        let built = FaiIndex::build(FASTA).unwrap();
        let text = built.to_fai_string();
        assert_eq!(text, "chr1\t23\t11\t10\t11\nchr2\t12\t43\t10\t11\n");
        assert_eq!(FaiIndex::parse(&text).unwrap(), built);
    }

    #[test]
    fn test_parse_rejects_bad_rows() {
        assert!(matches!(
            FaiIndex::parse("chr1\t23\t11\t10\n"),
            Err(FaiError::InvalidLine { line: 1, .. })
        ));
        assert!(matches!(
            FaiIndex::parse("chr1\t23\t11\tten\t11\n"),
            Err(FaiError::InvalidLine { line: 1, .. })
        ));
        assert!(matches!(
            FaiIndex::parse("chr1\t23\t11\t0\t1\n"),
            Err(FaiError::InvalidLine { .. })
        ));
    }

    #[test]
    fn test_parse_rejects_duplicate_names() {
        let err = FaiIndex::parse("chr1\t23\t11\t10\t11\nchr2\t5\t40\t5\t6\nchr1\t12\t43\t10\t11\n")
            .unwrap_err();
        assert!(matches!(err, FaiError::InvalidLine { line: 3, .. }));
        assert!(err.to_string().contains("first on line 1"));
    }

    #[test]
    fn test_byte_offsets() {
        let index = FaiIndex::build(FASTA).unwrap();
        let chr1 = index.get("chr1").unwrap();
        assert_eq!(chr1.byte_offset(0), 11);
        assert_eq!(chr1.byte_offset(9), 20);
        assert_eq!(chr1.byte_offset(10), 22);
        assert_eq!(chr1.byte_span(8, 12), (19, 24));
        // End clamped to the sequence length
        assert_eq!(chr1.byte_span(20, 100), (33, 36));
        assert_eq!(chr1.byte_span(30, 40).0, chr1.byte_span(30, 40).1);
    }
}
