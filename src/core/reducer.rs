//! Column reduction to display letter and color
//!
//! A column is either one-hot (a single base) or a per-symbol count across
//! samples. The reducer collapses it to one letter and one color under the
//! configured [`AggregationMode`]:
//!
//! - one-hot columns always map straight to their symbol
//! - `Exact` rejects anything else
//! - `Max` picks the dominant symbol, breaking ties through a [`TieBreak`]
//! - `Weighted` blends the scale colors by symbol frequency and quantizes the
//!   result to steps of 5 per channel so the palette stays small
//!
//! Blended colors are registered in a [`PaletteCache`] so the renderer can
//! resolve every key it is handed.

use crate::core::dna::{letter_for_index, Column, Nucleotide, CHANNELS};
use crate::core::error::{ReduceError, ReduceResult};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{PoisonError, RwLock};

/// Channel quantization step for blended colors
pub const QUANTIZATION_STEP: f64 = 5.0;

/// Default colors for A, T, G, C, N, other
pub const DEFAULT_COLOR_SCALE: [&str; CHANNELS] = [
    "#007FFF", "#e8e500", "#008000", "#FF0038", "#800080", "#DCDCDC",
];

/// How ambiguous columns are collapsed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AggregationMode {
    /// Only one-hot columns are accepted
    #[default]
    #[serde(alias = "none")]
    Exact,
    /// Dominant symbol wins
    Max,
    /// Frequency-weighted color blend
    Weighted,
}

impl AggregationMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            AggregationMode::Exact => "exact",
            AggregationMode::Max => "max",
            AggregationMode::Weighted => "weighted",
        }
    }
}

impl FromStr for AggregationMode {
    type Err = ReduceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "none" | "exact" => Ok(AggregationMode::Exact),
            "max" => Ok(AggregationMode::Max),
            "weighted" => Ok(AggregationMode::Weighted),
            _ => Err(ReduceError::UnknownMode(s.to_string())),
        }
    }
}

/// 8-bit RGB color
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Parse `#rrggbb` or `#rgb` (leading `#` optional)
    ///
    /// # Examples
    /// ```
    /// use seqtile::core::Rgb;
    /// assert_eq!(Rgb::parse("#007FFF").unwrap(), Rgb::new(0, 127, 255));
    /// assert_eq!(Rgb::parse("#fff").unwrap(), Rgb::new(255, 255, 255));
    /// ```
    pub fn parse(s: &str) -> ReduceResult<Self> {
        let invalid = || ReduceError::InvalidColor(s.to_string());
        let hex = s.trim().trim_start_matches('#');
        if !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(invalid());
        }

        match hex.len() {
            6 => {
                let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).map_err(|_| invalid());
                Ok(Self::new(channel(0)?, channel(2)?, channel(4)?))
            }
            3 => {
                let channel = |i: usize| {
                    u8::from_str_radix(&hex[i..i + 1], 16)
                        .map(|v| v * 17)
                        .map_err(|_| invalid())
                };
                Ok(Self::new(channel(0)?, channel(1)?, channel(2)?))
            }
            _ => Err(invalid()),
        }
    }

    /// Packed `0xRRGGBB` value
    pub fn to_hex(&self) -> u32 {
        (u32::from(self.r) << 16) | (u32::from(self.g) << 8) | u32::from(self.b)
    }

    /// Palette key, `#rrggbb` lowercase
    pub fn to_key(&self) -> String {
        format!("#{:06x}", self.to_hex())
    }
}

/// Base colors for the six symbol channels
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColorScale {
    names: Vec<String>,
    rgb: [Rgb; CHANNELS],
}

impl ColorScale {
    /// Build a scale from six color strings
    pub fn new<S: AsRef<str>>(colors: &[S]) -> ReduceResult<Self> {
        if colors.len() != CHANNELS {
            return Err(ReduceError::ColorScaleLength {
                expected: CHANNELS,
                found: colors.len(),
            });
        }

        let mut rgb = [Rgb::new(0, 0, 0); CHANNELS];
        for (slot, color) in rgb.iter_mut().zip(colors) {
            *slot = Rgb::parse(color.as_ref())?;
        }

        Ok(Self {
            names: colors.iter().map(|c| c.as_ref().to_string()).collect(),
            rgb,
        })
    }

    /// Color string of a channel as configured
    pub fn name(&self, index: usize) -> &str {
        &self.names[index]
    }

    /// Parsed color of a channel
    pub fn rgb(&self, index: usize) -> Rgb {
        self.rgb[index]
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }
}

impl Default for ColorScale {
    fn default() -> Self {
        let rgb = [
            Rgb::new(0x00, 0x7f, 0xff),
            Rgb::new(0xe8, 0xe5, 0x00),
            Rgb::new(0x00, 0x80, 0x00),
            Rgb::new(0xff, 0x00, 0x38),
            Rgb::new(0x80, 0x00, 0x80),
            Rgb::new(0xdc, 0xdc, 0xdc),
        ];
        Self {
            names: DEFAULT_COLOR_SCALE.iter().map(|c| c.to_string()).collect(),
            rgb,
        }
    }
}

/// Map from color key to renderable `0xRRGGBB`
///
/// Seeded with the scale colors and grown with every blended color the
/// reducer synthesizes. Entries are never evicted; a new scale requires a
/// full [`rebuild`](PaletteCache::rebuild).
#[derive(Debug, Default)]
pub struct PaletteCache {
    colors: RwLock<HashMap<String, u32>>,
}

impl PaletteCache {
    pub fn new(scale: &ColorScale) -> Self {
        let cache = Self::default();
        cache.rebuild(scale);
        cache
    }

    /// Drop every entry and reseed from `scale`
    pub fn rebuild(&self, scale: &ColorScale) {
        let mut colors = self.colors.write().unwrap_or_else(PoisonError::into_inner);
        colors.clear();
        for i in 0..CHANNELS {
            colors.insert(scale.name(i).to_string(), scale.rgb(i).to_hex());
        }
    }

    /// Renderable value for a key
    pub fn get(&self, key: &str) -> Option<u32> {
        self.colors
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .copied()
    }

    /// Register a color; returns true when the key was new
    pub fn insert(&self, key: &str, value: u32) -> bool {
        {
            let colors = self.colors.read().unwrap_or_else(PoisonError::into_inner);
            if colors.contains_key(key) {
                return false;
            }
        }
        self.colors
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.to_string(), value)
            .is_none()
    }

    pub fn len(&self) -> usize {
        self.colors.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Picks one channel out of several equally dominant ones
///
/// The choice must depend only on `position` and `candidates`, so a tile
/// reduces the same way however its columns are scheduled across threads.
pub trait TieBreak: Send + Sync {
    /// `position` is the column's index in its run; `candidates` is sorted
    /// and holds at least two channel positions
    fn choose(&self, position: u64, candidates: &[usize]) -> usize;
}

/// Uniform random choice, optionally seeded for reproducibility
///
/// Each column draws from its own generator keyed by seed and position.
#[derive(Debug, Clone, Copy)]
pub struct UniformRandom {
    seed: u64,
}

impl UniformRandom {
    /// Unseeded, seeded from the OS
    pub fn new() -> Self {
        Self {
            seed: StdRng::from_os_rng().random(),
        }
    }

    pub fn seeded(seed: u64) -> Self {
        Self { seed }
    }
}

impl Default for UniformRandom {
    fn default() -> Self {
        Self::new()
    }
}

impl TieBreak for UniformRandom {
    fn choose(&self, position: u64, candidates: &[usize]) -> usize {
        // Spread neighbouring positions apart before seeding
        let key = self.seed ^ position.wrapping_mul(0x9e37_79b9_7f4a_7c15);
        let mut rng = StdRng::seed_from_u64(key);
        candidates[rng.random_range(0..candidates.len())]
    }
}

/// Always the lowest channel
#[derive(Debug, Default, Clone, Copy)]
pub struct FirstIndex;

impl TieBreak for FirstIndex {
    fn choose(&self, _position: u64, candidates: &[usize]) -> usize {
        candidates[0]
    }
}

/// Cycles through the candidates by column position
#[derive(Debug, Default, Clone, Copy)]
pub struct RoundRobin;

impl TieBreak for RoundRobin {
    fn choose(&self, position: u64, candidates: &[usize]) -> usize {
        candidates[(position % candidates.len() as u64) as usize]
    }
}

/// Configurable tie-break strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TieBreakKind {
    #[default]
    Random,
    First,
    RoundRobin,
}

impl TieBreakKind {
    /// Instantiate the strategy; `seed` only affects `Random`
    pub fn build(self, seed: Option<u64>) -> Box<dyn TieBreak> {
        match self {
            TieBreakKind::Random => Box::new(seed.map_or_else(UniformRandom::new, UniformRandom::seeded)),
            TieBreakKind::First => Box::new(FirstIndex),
            TieBreakKind::RoundRobin => Box::new(RoundRobin),
        }
    }
}

/// Where a reduced column's color comes from
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum ColorRef {
    /// Entry of the base color scale
    Scale(usize),
    /// Blended color, keyed `#rrggbb`
    Synthesized(String),
}

/// Display letter and color of one column
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReducedColumn {
    pub letter: char,
    pub color: ColorRef,
}

impl ReducedColumn {
    fn from_index(index: usize) -> Self {
        Self {
            letter: letter_for_index(index),
            color: ColorRef::Scale(index),
        }
    }

    /// Palette key of the color under `scale`
    pub fn color_key<'a>(&'a self, scale: &'a ColorScale) -> &'a str {
        match &self.color {
            ColorRef::Scale(i) => scale.name(*i),
            ColorRef::Synthesized(key) => key,
        }
    }
}

/// Collapses columns into letters and colors
pub struct ColumnReducer {
    mode: AggregationMode,
    scale: ColorScale,
    palette: PaletteCache,
    tie_break: Box<dyn TieBreak>,
    /// Position handed to the tie-break by [`reduce`](ColumnReducer::reduce)
    next_position: AtomicU64,
}

impl ColumnReducer {
    pub fn new(mode: AggregationMode, scale: ColorScale, tie_break: Box<dyn TieBreak>) -> Self {
        let palette = PaletteCache::new(&scale);
        Self {
            mode,
            scale,
            palette,
            tie_break,
            next_position: AtomicU64::new(0),
        }
    }

    /// Default scale with uniform random tie-breaking
    pub fn with_mode(mode: AggregationMode) -> Self {
        Self::new(mode, ColorScale::default(), Box::new(UniformRandom::new()))
    }

    pub fn mode(&self) -> AggregationMode {
        self.mode
    }

    pub fn set_mode(&mut self, mode: AggregationMode) {
        self.mode = mode;
    }

    pub fn scale(&self) -> &ColorScale {
        &self.scale
    }

    pub fn palette(&self) -> &PaletteCache {
        &self.palette
    }

    /// Replace the base colors and rebuild the palette from scratch
    pub fn set_color_scale(&mut self, scale: ColorScale) {
        self.palette.rebuild(&scale);
        self.scale = scale;
    }

    /// Renderable color of a reduced column
    pub fn renderable(&self, reduced: &ReducedColumn) -> Option<u32> {
        self.palette.get(reduced.color_key(&self.scale))
    }

    /// Reduce one column
    ///
    /// Successive calls count as successive positions, so a sequence of
    /// single reductions breaks ties the same way as one `reduce_columns`
    /// call over the same columns.
    pub fn reduce(&self, column: &Column) -> ReduceResult<ReducedColumn> {
        let position = self.next_position.fetch_add(1, Ordering::Relaxed);
        self.reduce_at(position, column)
    }

    /// Reduce the column found at `position` of its tile
    pub fn reduce_at(&self, position: u64, column: &Column) -> ReduceResult<ReducedColumn> {
        let sum: f32 = column.iter().sum();

        if let Some(index) = one_hot_index(column, sum) {
            return Ok(ReducedColumn::from_index(index));
        }

        match self.mode {
            AggregationMode::Exact => Err(ReduceError::AggregationMode { sum }),
            AggregationMode::Max => Ok(self.reduce_max(position, column)),
            AggregationMode::Weighted => Ok(self.reduce_weighted(column, sum)),
        }
    }

    /// Reduce every column of a tile
    pub fn reduce_columns(&self, columns: &[Column]) -> ReduceResult<Vec<ReducedColumn>> {
        columns
            .par_iter()
            .enumerate()
            .map(|(position, column)| self.reduce_at(position as u64, column))
            .collect()
    }

    fn reduce_max(&self, position: u64, column: &Column) -> ReducedColumn {
        let max = column.iter().copied().fold(f32::NEG_INFINITY, f32::max);
        let winners: Vec<usize> = column
            .iter()
            .enumerate()
            .filter(|(_, &v)| v == max)
            .map(|(i, _)| i)
            .collect();

        let index = match winners.as_slice() {
            // All NaN
            [] => Nucleotide::Other.index(),
            [single] => *single,
            many => self.tie_break.choose(position, many),
        };
        ReducedColumn::from_index(index)
    }

    fn reduce_weighted(&self, column: &Column, sum: f32) -> ReducedColumn {
        if sum <= 0.0 {
            return ReducedColumn::from_index(Nucleotide::Other.index());
        }

        let (mut r, mut g, mut b) = (0.0f64, 0.0f64, 0.0f64);
        for (i, &value) in column.iter().enumerate() {
            let weight = f64::from(value / sum);
            let rgb = self.scale.rgb(i);
            r += weight * f64::from(rgb.r);
            g += weight * f64::from(rgb.g);
            b += weight * f64::from(rgb.b);
        }

        let blended = Rgb::new(quantize(r), quantize(g), quantize(b));
        let key = blended.to_key();
        if self.palette.insert(&key, blended.to_hex()) {
            log::debug!("palette grew to {} colors with {}", self.palette.len(), key);
        }

        ReducedColumn {
            letter: Nucleotide::A.letter(),
            color: ColorRef::Synthesized(key),
        }
    }
}

/// Channel position of a one-hot column
fn one_hot_index(column: &Column, sum: f32) -> Option<usize> {
    if (sum - 1.0).abs() > f32::EPSILON {
        return None;
    }
    column.iter().position(|&v| v == 1.0)
}

/// Round a channel to the nearest multiple of the quantization step
fn quantize(channel: f64) -> u8 {
    ((channel / QUANTIZATION_STEP).round() * QUANTIZATION_STEP).clamp(0.0, 255.0) as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reducer(mode: AggregationMode) -> ColumnReducer {
        ColumnReducer::new(mode, ColorScale::default(), Box::new(UniformRandom::seeded(7)))
    }

    #[test]
    fn test_one_hot_ignores_mode() {
        let column = [0.0, 0.0, 1.0, 0.0, 0.0, 0.0];
        for mode in [AggregationMode::Exact, AggregationMode::Max, AggregationMode::Weighted] {
            let reduced = reducer(mode).reduce(&column).unwrap();
            assert_eq!(reduced.letter, 'G');
            assert_eq!(reduced.color, ColorRef::Scale(2));
        }
    }

    #[test]
    fn test_other_channel_letter() {
        let reduced = reducer(AggregationMode::Exact)
            .reduce(&[0.0, 0.0, 0.0, 0.0, 0.0, 1.0])
            .unwrap();
        assert_eq!(reduced.letter, '.');
        assert_eq!(reduced.color, ColorRef::Scale(5));
    }

    #[test]
    fn test_exact_rejects_ambiguous() {
        let err = reducer(AggregationMode::Exact)
            .reduce(&[2.0, 1.0, 0.0, 0.0, 0.0, 0.0])
            .unwrap_err();
        assert_eq!(err, ReduceError::AggregationMode { sum: 3.0 });
    }

    #[test]
    fn test_max_single_winner() {
        let reduced = reducer(AggregationMode::Max)
            .reduce(&[1.0, 0.0, 0.0, 3.0, 1.0, 0.0])
            .unwrap();
        assert_eq!(reduced.letter, 'C');
        assert_eq!(reduced.color, ColorRef::Scale(3));
    }

    #[test]
    fn test_max_tie_with_first_index() {
        let reducer = ColumnReducer::new(AggregationMode::Max, ColorScale::default(), Box::new(FirstIndex));
        let reduced = reducer.reduce(&[0.0, 2.0, 0.0, 2.0, 0.0, 0.0]).unwrap();
        assert_eq!(reduced.letter, 'T');
    }

    #[test]
    fn test_max_tie_round_robin() {
        let reducer = ColumnReducer::new(
            AggregationMode::Max,
            ColorScale::default(),
            Box::new(RoundRobin),
        );
        let column = [2.0, 2.0, 0.0, 0.0, 0.0, 0.0];
        let letters: Vec<char> = (0..4).map(|_| reducer.reduce(&column).unwrap().letter).collect();
        assert_eq!(letters, vec!['A', 'T', 'A', 'T']);
    }

    #[test]
    fn test_max_random_tie_stays_in_winners() {
        let reducer = reducer(AggregationMode::Max);
        let column = [2.0, 2.0, 0.0, 0.0, 0.0, 0.0];
        let mut counts = HashMap::new();
        for _ in 0..2000 {
            *counts.entry(reducer.reduce(&column).unwrap().letter).or_insert(0) += 1;
        }
        assert_eq!(counts.len(), 2);
        let a = counts[&'A'];
        assert!((800..1200).contains(&a), "A chosen {a} times out of 2000");
    }

    #[test]
    fn test_seeded_random_is_reproducible() {
        let column = [1.0, 1.0, 1.0, 0.0, 0.0, 0.0];
        let run = || {
            let reducer = reducer(AggregationMode::Max);
            (0..32).map(|_| reducer.reduce(&column).unwrap().letter).collect::<String>()
        };
        assert_eq!(run(), run());
    }

    #[test]
    fn test_tie_break_independent_of_thread_count() {
        let columns = vec![[2.0, 2.0, 2.0, 0.0, 0.0, 0.0]; 20_000];
        let run = |threads: usize, tie_break: Box<dyn TieBreak>| {
            let reducer = ColumnReducer::new(AggregationMode::Max, ColorScale::default(), tie_break);
            let pool = rayon::ThreadPoolBuilder::new().num_threads(threads).build().unwrap();
            pool.install(|| reducer.reduce_columns(&columns).unwrap())
                .iter()
                .map(|r| r.letter)
                .collect::<String>()
        };

        let serial = run(1, Box::new(UniformRandom::seeded(7)));
        assert_eq!(run(4, Box::new(UniformRandom::seeded(7))), serial);
        assert_eq!(run(4, Box::new(UniformRandom::seeded(7))), serial);
        assert_ne!(run(4, Box::new(UniformRandom::seeded(8))), serial);

        let cycled = run(4, Box::new(RoundRobin));
        assert!(cycled
            .chars()
            .zip("ATG".chars().cycle())
            .all(|(got, want)| got == want));
    }

    #[test]
    fn test_sequential_reduce_matches_reduce_columns() {
        let columns = vec![[0.0, 3.0, 0.0, 3.0, 0.0, 0.0]; 64];
        let batch = reducer(AggregationMode::Max).reduce_columns(&columns).unwrap();
        let single = reducer(AggregationMode::Max);
        let one_by_one: Vec<ReducedColumn> = columns.iter().map(|c| single.reduce(c).unwrap()).collect();
        assert_eq!(batch, one_by_one);
    }

    #[test]
    fn test_max_all_nan_column() {
        let column = [f32::NAN; CHANNELS];
        for tie_break in [
            Box::new(UniformRandom::seeded(1)) as Box<dyn TieBreak>,
            Box::new(FirstIndex),
            Box::new(RoundRobin),
        ] {
            let reducer = ColumnReducer::new(AggregationMode::Max, ColorScale::default(), tie_break);
            let reduced = reducer.reduce(&column).unwrap();
            assert_eq!(reduced.letter, '.');
            assert_eq!(reduced.color, ColorRef::Scale(5));
        }
    }

    #[test]
    fn test_weighted_blend_and_palette() {
        let reducer = reducer(AggregationMode::Weighted);
        let before = reducer.palette().len();
        // Half A (#007fff), half C (#ff0038)
        let reduced = reducer.reduce(&[1.0, 0.0, 0.0, 1.0, 0.0, 0.0]).unwrap();
        assert_eq!(reduced.letter, 'A');
        // r = 127.5 -> 130, g = 63.5 -> 65, b = 155.5 -> 155
        assert_eq!(reduced.color, ColorRef::Synthesized("#82419b".to_string()));
        assert_eq!(reducer.palette().len(), before + 1);
        assert_eq!(reducer.renderable(&reduced), Some(0x82419b));

        // Same blend does not grow the palette again
        reducer.reduce(&[2.0, 0.0, 0.0, 2.0, 0.0, 0.0]).unwrap();
        assert_eq!(reducer.palette().len(), before + 1);
    }

    #[test]
    fn test_weighted_zero_column() {
        let reduced = reducer(AggregationMode::Weighted).reduce(&[0.0; CHANNELS]).unwrap();
        assert_eq!(reduced.letter, '.');
        assert_eq!(reduced.color, ColorRef::Scale(5));
    }

    #[test]
    fn test_set_color_scale_rebuilds_palette() {
        let mut reducer = reducer(AggregationMode::Weighted);
        reducer.reduce(&[1.0, 1.0, 0.0, 0.0, 0.0, 0.0]).unwrap();
        assert_eq!(reducer.palette().len(), CHANNELS + 1);

        let scale = ColorScale::new(&["#000", "#111", "#222", "#333", "#444", "#555"]).unwrap();
        reducer.set_color_scale(scale);
        assert_eq!(reducer.palette().len(), CHANNELS);
        assert_eq!(reducer.palette().get("#333"), Some(0x333333));
        assert_eq!(reducer.palette().get("#007FFF"), None);
    }

    #[test]
    fn test_reduce_columns_keeps_order() {
        let reducer = reducer(AggregationMode::Exact);
        let columns = crate::core::dna::encode_bases(b"GATTACA");
        let letters: String = reducer
            .reduce_columns(&columns)
            .unwrap()
            .iter()
            .map(|r| r.letter)
            .collect();
        assert_eq!(letters, "GATTACA");
    }

    #[test]
    fn test_rgb_parse() {
        assert_eq!(Rgb::parse("#DCDCDC").unwrap(), Rgb::new(220, 220, 220));
        assert_eq!(Rgb::parse("e8e500").unwrap(), Rgb::new(232, 229, 0));
        assert!(Rgb::parse("#12345").is_err());
        assert!(Rgb::parse("red").is_err());
        assert_eq!(Rgb::new(0, 127, 255).to_key(), "#007fff");
    }

    #[test]
    fn test_color_scale_length() {
        assert_eq!(
            ColorScale::new(&["#000"]).unwrap_err(),
            ReduceError::ColorScaleLength { expected: 6, found: 1 }
        );
    }

    #[test]
    fn test_mode_parse() {
        assert_eq!("none".parse::<AggregationMode>().unwrap(), AggregationMode::Exact);
        assert_eq!("MAX".parse::<AggregationMode>().unwrap(), AggregationMode::Max);
        assert!("mean".parse::<AggregationMode>().is_err());
    }
}
