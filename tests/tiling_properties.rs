//! Property-based tests for tile coordinates and viewport helpers

use proptest::prelude::*;
use seqtile::core::{
    visible_tiles, zoom_level_for_view, Datatype, TileCoordinateMapper, TileId, TilesetInfo,
};

proptest! {
    /// The deepest zoom is the first whose extent covers all the data
    #[test]
    fn prop_max_zoom_is_minimal(total in 1u64..50_000_000, tile_size in prop::sample::select(vec![256u64, 1024, 4096])) {
        let info = TilesetInfo::from_total_length(total, tile_size, Datatype::MultivecSingleresSequence);
        prop_assert_eq!(info.max_width, tile_size << info.max_zoom);
        prop_assert!(info.max_width >= total);
        if info.max_zoom > 0 {
            prop_assert!(info.max_width / 2 < total);
        }
    }

    /// Tiles at one zoom are contiguous and span the whole extent
    #[test]
    fn prop_windows_tile_extent(total in 1u64..1_000_000, zoom in 0u32..8) {
        let info = TilesetInfo::from_total_length(total, 1024, Datatype::MultivecSingleresSequence);
        let mapper = TileCoordinateMapper::new(&info);
        let count = 1u64 << zoom;

        let mut cursor = 0.0;
        for index in 0..count {
            let window = mapper.tile_window(zoom, index);
            prop_assert!((window.start - cursor).abs() < 1e-6);
            prop_assert!(window.end > window.start);
            cursor = window.end;
        }
        prop_assert!((cursor - info.max_width as f64).abs() < 1e-6);
    }

    /// Base ranges never leave the data
    #[test]
    fn prop_base_range_clipped(total in 1u64..100_000, zoom in 0u32..12, index in 0u64..4096) {
        let info = TilesetInfo::from_total_length(total, 1024, Datatype::MultivecSingleresSequence);
        let (start, end) = TileCoordinateMapper::new(&info)
            .tile_window(zoom, index)
            .to_base_range(total);
        prop_assert!(start <= end);
        prop_assert!(end <= total);
    }

    /// Tile ids survive formatting
    #[test]
    fn prop_tile_id_display_parse(zoom in 0u32..40, index in 0u64..u64::MAX) {
        let tile = TileId::new(zoom, index);
        prop_assert_eq!(tile.to_string().parse::<TileId>().unwrap(), tile);
    }

    /// Zoom selection stays in range and visible tiles stay inside the data
    #[test]
    fn prop_view_within_bounds(
        total in 1u64..10_000_000,
        start in 0.0f64..10_000_000.0,
        width in 1.0f64..10_000_000.0,
        px in 100.0f64..4000.0,
    ) {
        let info = TilesetInfo::from_total_length(total, 1024, Datatype::MultivecSingleresSequence);
        let zoom = zoom_level_for_view(&info, start, start + width, px);
        prop_assert!(zoom <= info.max_zoom);

        let tile_count = (total as f64 / info.tile_width(zoom)).ceil() as u64;
        for index in visible_tiles(&info, zoom, start, start + width, true) {
            prop_assert!(index < tile_count);
        }
    }
}

#[test]
fn test_three_thousand_bases() {
    let info = TilesetInfo::from_total_length(3000, 1024, Datatype::MultivecSingleresSequence);
    assert_eq!(info.max_zoom, 2);
    assert_eq!(info.max_width, 4096);

    let mapper = TileCoordinateMapper::new(&info);
    assert_eq!(mapper.tile_window(2, 2).to_base_range(3000), (2048, 3000));
    assert_eq!(mapper.tile_window(0, 0).to_base_range(3000), (0, 3000));
}

#[test]
fn test_visible_tiles_for_narrow_view() {
    let info = TilesetInfo::from_total_length(8192, 1024, Datatype::MultivecSingleresSequence);
    let zoom = zoom_level_for_view(&info, 1000.0, 2100.0, 1024.0);
    assert_eq!(zoom, info.max_zoom);
    assert_eq!(visible_tiles(&info, zoom, 1000.0, 2100.0, false), vec![0, 1, 2]);
    assert_eq!(visible_tiles(&info, zoom, 1100.0, 2000.0, true), vec![0, 1, 2]);
}
