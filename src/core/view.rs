//! Viewport helpers
//!
//! Pick the zoom level for a view, list the tiles a view needs, and decide
//! whether the track can draw anything yet.

use crate::core::reducer::AggregationMode;
use crate::core::tiling::{TileId, TilesetInfo};

/// What the track should show for the current view
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DisplayState {
    /// Tileset metadata has not arrived
    Pending,
    /// Too far out to show single bases; carries the notification text
    ZoomIn(String),
    /// Tiles can be drawn
    Ready,
}

/// Zoom level whose tiles best match the view at `track_width_px` pixels
///
/// `ceil(log2(max_width / view_width * track_width_px / tile_size))`, clamped
/// to `[0, max_zoom]`.
pub fn zoom_level_for_view(info: &TilesetInfo, view_start: f64, view_end: f64, track_width_px: f64) -> u32 {
    let view_width = view_end - view_start;
    if view_width <= 0.0 || !view_width.is_finite() {
        return info.max_zoom;
    }

    let ratio = info.max_width as f64 / view_width * track_width_px / info.tile_size.max(1) as f64;
    if ratio <= 1.0 || !ratio.is_finite() {
        return 0;
    }

    (ratio.log2().ceil() as u32).min(info.max_zoom)
}

/// Tile indices at `zoom` covering `[view_start, view_end)`
///
/// Indices are clamped to the tiles that hold data. With
/// `extended_preloading` one extra tile is added on each side.
pub fn visible_tiles(
    info: &TilesetInfo,
    zoom: u32,
    view_start: f64,
    view_end: f64,
    extended_preloading: bool,
) -> Vec<u64> {
    let tile_width = info.tile_width(zoom);
    if tile_width <= 0.0 || view_end <= view_start {
        return Vec::new();
    }

    let min = info.min_pos() as f64;
    let data_width = info.max_pos().saturating_sub(info.min_pos()) as f64;
    let tile_count = (data_width / tile_width).ceil().max(0.0) as u64;

    let first = ((view_start - min) / tile_width).floor().max(0.0) as u64;
    let last = (((view_end - min) / tile_width).ceil().max(0.0) as u64).min(tile_count);

    let (first, last) = if extended_preloading {
        (first.saturating_sub(1), last.saturating_add(1).min(tile_count))
    } else {
        (first, last)
    };

    (first.min(last)..last).collect()
}

/// Tile ids at `zoom` covering the view, ready for a batch request
pub fn visible_tile_ids(
    info: &TilesetInfo,
    zoom: u32,
    view_start: f64,
    view_end: f64,
    extended_preloading: bool,
) -> Vec<String> {
    visible_tiles(info, zoom, view_start, view_end, extended_preloading)
        .into_iter()
        .map(|index| TileId::new(zoom, index).to_string())
        .collect()
}

/// Decide what the track shows at `zoom`
///
/// Without an aggregation policy only single bases can be drawn, so any zoom
/// more than one level above the deepest asks the user to zoom in.
pub fn display_state(
    info: Option<&TilesetInfo>,
    zoom: u32,
    mode: AggregationMode,
    notification_text: &str,
) -> DisplayState {
    let Some(info) = info else {
        return DisplayState::Pending;
    };

    if mode == AggregationMode::Exact && zoom < info.max_zoom.saturating_sub(1) {
        DisplayState::ZoomIn(notification_text.to_string())
    } else {
        DisplayState::Ready
    }
}
