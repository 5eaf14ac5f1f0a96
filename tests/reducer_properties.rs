//! Property-based tests for column reduction

use proptest::prelude::*;
use seqtile::core::{
    one_hot, AggregationMode, ColorRef, ColorScale, ColumnReducer, Rgb, UniformRandom, CHANNELS,
    LETTERS,
};

fn reducer(mode: AggregationMode, seed: u64) -> ColumnReducer {
    ColumnReducer::new(mode, ColorScale::default(), Box::new(UniformRandom::seeded(seed)))
}

/// Small integer counts, as produced by summing samples
fn counts_strategy() -> impl Strategy<Value = [f32; CHANNELS]> {
    prop::array::uniform6(0u8..20).prop_map(|c| c.map(f32::from))
}

proptest! {
    /// A one-hot column gives its own letter and scale color in every mode
    #[test]
    fn prop_one_hot_same_in_every_mode(base in any::<u8>(), seed in any::<u64>()) {
        let column = one_hot(base);
        let hot = column.iter().position(|&v| v == 1.0).unwrap();
        for mode in [AggregationMode::Exact, AggregationMode::Max, AggregationMode::Weighted] {
            let reduced = reducer(mode, seed).reduce(&column).unwrap();
            prop_assert_eq!(reduced.letter, LETTERS[hot]);
            prop_assert_eq!(reduced.color, ColorRef::Scale(hot));
        }
    }

    /// Max always picks one of the dominant channels
    #[test]
    fn prop_max_picks_a_winner(column in counts_strategy(), seed in any::<u64>()) {
        let max = column.iter().copied().fold(f32::NEG_INFINITY, f32::max);
        let reduced = reducer(AggregationMode::Max, seed).reduce(&column).unwrap();
        let ColorRef::Scale(index) = reduced.color else {
            panic!("max mode produced a blended color");
        };
        prop_assert_eq!(column[index], max);
        prop_assert_eq!(reduced.letter, LETTERS[index]);
    }

    /// Blended colors are quantized and registered in the palette
    #[test]
    fn prop_weighted_color_registered(column in counts_strategy()) {
        let reducer = reducer(AggregationMode::Weighted, 0);
        let reduced = reducer.reduce(&column).unwrap();
        prop_assert!(reducer.renderable(&reduced).is_some());

        if let ColorRef::Synthesized(key) = &reduced.color {
            prop_assert_eq!(reduced.letter, 'A');
            let rgb = Rgb::parse(key).unwrap();
            for channel in [rgb.r, rgb.g, rgb.b] {
                prop_assert!(channel % 5 == 0 || channel == 255);
            }
        }
    }

    /// A weighted one-hot-like column blends to its scale color
    #[test]
    fn prop_weighted_single_symbol(channel in 0usize..CHANNELS, count in 2u8..50) {
        let mut column = [0.0; CHANNELS];
        column[channel] = f32::from(count);
        let reducer = reducer(AggregationMode::Weighted, 0);
        let reduced = reducer.reduce(&column).unwrap();

        let expected = ColorScale::default().rgb(channel);
        let ColorRef::Synthesized(key) = &reduced.color else {
            panic!("expected a blended color");
        };
        let got = Rgb::parse(key).unwrap();
        for (a, b) in [(got.r, expected.r), (got.g, expected.g), (got.b, expected.b)] {
            prop_assert!(a.abs_diff(b) <= 3, "{} vs {}", a, b);
        }
    }
}

#[test]
fn test_exact_rejects_counts() {
    let reducer = reducer(AggregationMode::Exact, 1);
    assert!(reducer.reduce(&[2.0, 0.0, 0.0, 0.0, 0.0, 0.0]).is_err());
    assert!(reducer.reduce(&[0.5, 0.5, 0.0, 0.0, 0.0, 0.0]).is_err());
}

#[test]
fn test_random_tie_is_roughly_even() {
    let reducer = reducer(AggregationMode::Max, 42);
    let column = [2.0, 2.0, 0.0, 0.0, 0.0, 0.0];
    let mut a = 0;
    for _ in 0..4000 {
        match reducer.reduce(&column).unwrap().letter {
            'A' => a += 1,
            'T' => {}
            other => panic!("unexpected letter {other}"),
        }
    }
    assert!((1600..2400).contains(&a), "A chosen {a} times out of 4000");
}

#[test]
fn test_palette_stays_bounded() {
    let reducer = reducer(AggregationMode::Weighted, 0);
    for a in 0..20u8 {
        for c in 0..20u8 {
            reducer
                .reduce(&[f32::from(a), 0.0, 0.0, f32::from(c), 0.0, 0.0])
                .unwrap();
        }
    }
    // Two-color blends collapse onto a short line of quantized colors
    assert!(reducer.palette().len() < 6 + 400);
    assert!(reducer.palette().len() > 6);
}
