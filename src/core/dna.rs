//! Nucleotide one-hot codec
//!
//! Every base maps to one of six symbol channels, in the fixed order
//! A, T, G, C, N, other. Tiles carry one column of six values per base (or per
//! bin for pre-aggregated data).

/// Number of symbol channels per column
pub const CHANNELS: usize = 6;

/// One tile column: a one-hot vector or a per-symbol count across samples
pub type Column = [f32; CHANNELS];

/// Letters shown for each channel; the last channel has no base letter
pub const LETTERS: [char; CHANNELS] = ['A', 'T', 'G', 'C', 'N', '.'];

/// Symbol channel of a base
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Nucleotide {
    A = 0,
    T = 1,
    G = 2,
    C = 3,
    N = 4,
    Other = 5,
}

impl Nucleotide {
    /// Classify a base byte, case-insensitively
    ///
    /// # Examples
    /// ```
    /// use seqtile::core::dna::Nucleotide;
    /// assert_eq!(Nucleotide::from_base(b'g'), Nucleotide::G);
    /// assert_eq!(Nucleotide::from_base(b'R'), Nucleotide::Other);
    /// ```
    #[inline]
    pub fn from_base(base: u8) -> Self {
        match base {
            b'A' | b'a' => Nucleotide::A,
            b'T' | b't' => Nucleotide::T,
            b'G' | b'g' => Nucleotide::G,
            b'C' | b'c' => Nucleotide::C,
            b'N' | b'n' => Nucleotide::N,
            _ => Nucleotide::Other,
        }
    }

    /// Channel position of this symbol
    #[inline]
    pub fn index(self) -> usize {
        self as usize
    }

    /// Display letter
    #[inline]
    pub fn letter(self) -> char {
        LETTERS[self.index()]
    }
}

/// Letter for a channel position; out-of-range positions show as `.`
#[inline]
pub fn letter_for_index(index: usize) -> char {
    LETTERS.get(index).copied().unwrap_or('.')
}

/// One-hot vector for a single base
#[inline]
pub fn one_hot(base: u8) -> Column {
    let mut column = [0.0; CHANNELS];
    column[Nucleotide::from_base(base).index()] = 1.0;
    column
}

/// Encode a run of bases into one column per base
///
/// # Examples
/// ```
/// use seqtile::core::dna::encode_bases;
///
/// let dense = encode_bases(b"Ax");
/// assert_eq!(dense[0], [1.0, 0.0, 0.0, 0.0, 0.0, 0.0]);
/// assert_eq!(dense[1], [0.0, 0.0, 0.0, 0.0, 0.0, 1.0]);
/// ```
pub fn encode_bases(bases: &[u8]) -> Vec<Column> {
    bases.iter().map(|&b| one_hot(b)).collect()
}

/// Reorder a channel-major flat array into one column per bin
///
/// `data` holds `channels * bins` values where channel `i` of bin `j` sits at
/// `data[bins * i + j]`. Returns `None` when the length does not match.
pub fn unflatten(data: &[f32], channels: usize, bins: usize) -> Option<Vec<Column>> {
    if channels != CHANNELS || data.len() != channels * bins {
        return None;
    }

    let columns = (0..bins)
        .map(|j| {
            let mut column = [0.0; CHANNELS];
            for (i, value) in column.iter_mut().enumerate() {
                *value = data[bins * i + j];
            }
            column
        })
        .collect();
    Some(columns)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_base_standard() {
        assert_eq!(Nucleotide::from_base(b'A'), Nucleotide::A);
        assert_eq!(Nucleotide::from_base(b'T'), Nucleotide::T);
        assert_eq!(Nucleotide::from_base(b'G'), Nucleotide::G);
        assert_eq!(Nucleotide::from_base(b'C'), Nucleotide::C);
        assert_eq!(Nucleotide::from_base(b'N'), Nucleotide::N);
    }

    #[test]
    fn test_from_base_lowercase() {
        assert_eq!(Nucleotide::from_base(b'a'), Nucleotide::A);
        assert_eq!(Nucleotide::from_base(b't'), Nucleotide::T);
        assert_eq!(Nucleotide::from_base(b'g'), Nucleotide::G);
        assert_eq!(Nucleotide::from_base(b'c'), Nucleotide::C);
        assert_eq!(Nucleotide::from_base(b'n'), Nucleotide::N);
    }

    #[test]
    fn test_from_base_other() {
        for b in [b'x', b'R', b'-', b' ', b'\n', 0u8] {
            assert_eq!(Nucleotide::from_base(b), Nucleotide::Other);
        }
    }

    #[test]
    fn test_encode_atgcnx() {
        let dense = encode_bases(b"ATGCNx");
        let expected: Vec<Column> = vec![
            [1.0, 0.0, 0.0, 0.0, 0.0, 0.0],
            [0.0, 1.0, 0.0, 0.0, 0.0, 0.0],
            [0.0, 0.0, 1.0, 0.0, 0.0, 0.0],
            [0.0, 0.0, 0.0, 1.0, 0.0, 0.0],
            [0.0, 0.0, 0.0, 0.0, 1.0, 0.0],
            [0.0, 0.0, 0.0, 0.0, 0.0, 1.0],
        ];
        assert_eq!(dense, expected);
    }

    #[test]
    fn test_encode_empty() {
        assert!(encode_bases(b"").is_empty());
    }

    #[test]
    fn test_letters() {
        assert_eq!(Nucleotide::C.letter(), 'C');
        assert_eq!(Nucleotide::Other.letter(), '.');
        assert_eq!(letter_for_index(0), 'A');
        assert_eq!(letter_for_index(42), '.');
    }

    #[test]
    fn test_unflatten_channel_major() {
        // 6 channels x 2 bins; bin 0 is all A, bin 1 is 2 G + 1 C
        let data = [
            1.0, 0.0, // A
            0.0, 0.0, // T
            0.0, 2.0, // G
            0.0, 1.0, // C
            0.0, 0.0, // N
            0.0, 0.0, // other
        ];
        let columns = unflatten(&data, 6, 2).unwrap();
        assert_eq!(columns[0], [1.0, 0.0, 0.0, 0.0, 0.0, 0.0]);
        assert_eq!(columns[1], [0.0, 0.0, 2.0, 1.0, 0.0, 0.0]);
    }

    #[test]
    fn test_unflatten_rejects_bad_shape() {
        assert!(unflatten(&[0.0; 12], 6, 3).is_none());
        assert!(unflatten(&[0.0; 10], 5, 2).is_none());
    }
}
