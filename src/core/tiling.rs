//! Tile coordinate space
//!
//! Tiles are addressed by `(zoom, index)`. At zoom `z` the extent
//! `[min_pos, max_width)` is cut into `2^z` tiles of equal width, so the
//! deepest zoom has `tile_size` bases per tile.

use crate::core::error::TileIdError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Bases per tile at the deepest zoom level
pub const DEFAULT_TILE_SIZE: u64 = 1024;

/// Kind of data a tileset serves
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Datatype {
    /// Multi-resolution pyramid from a tile service
    Multivec,
    /// Single raw sequence, tiled on the fly
    MultivecSingleresSequence,
}

impl Datatype {
    pub fn as_str(&self) -> &'static str {
        match self {
            Datatype::Multivec => "multivec",
            Datatype::MultivecSingleresSequence => "multivec_singleres_sequence",
        }
    }
}

/// Tileset metadata reported to the host
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TilesetInfo {
    pub tile_size: u64,
    #[serde(default)]
    pub bins_per_dimension: u64,
    #[serde(default)]
    pub max_zoom: u32,
    #[serde(default)]
    pub max_width: u64,
    pub min_pos: Vec<u64>,
    pub max_pos: Vec<u64>,
    #[serde(default = "default_datatype")]
    pub datatype: Datatype,
    /// Bases per bin for each zoom level, when the tile service reports them
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolutions: Option<Vec<f64>>,
}

fn default_datatype() -> Datatype {
    Datatype::Multivec
}

impl TilesetInfo {
    /// Derive metadata for a sequence of `total_length` bases
    ///
    /// `max_zoom` is the smallest zoom whose tiles of `tile_size` bases cover
    /// the whole sequence, i.e. `ceil(log2(total_length / tile_size))`
    /// clamped at zero.
    ///
    /// # Examples
    /// ```
    /// use seqtile::core::{Datatype, TilesetInfo};
    ///
    /// let info = TilesetInfo::from_total_length(3000, 1024, Datatype::MultivecSingleresSequence);
    /// assert_eq!(info.max_zoom, 2);
    /// assert_eq!(info.max_width, 4096);
    /// ```
    pub fn from_total_length(total_length: u64, tile_size: u64, datatype: Datatype) -> Self {
        let tile_size = tile_size.max(1);
        let mut max_zoom = 0u32;
        let mut max_width = tile_size;
        while max_width < total_length {
            max_zoom += 1;
            max_width = max_width.saturating_mul(2);
        }

        Self {
            tile_size,
            bins_per_dimension: tile_size,
            max_zoom,
            max_width,
            min_pos: vec![0],
            max_pos: vec![total_length],
            datatype,
            resolutions: None,
        }
    }

    /// Fill in fields a tile service may leave out
    ///
    /// Multi-resolution services often report only `resolutions` (bases per
    /// bin, any order); the pyramid depth and width follow from them.
    pub fn complete(mut self) -> Self {
        if self.bins_per_dimension == 0 {
            self.bins_per_dimension = self.tile_size;
        }
        if self.max_width == 0 {
            match self.resolutions.as_deref() {
                Some(resolutions) if !resolutions.is_empty() => {
                    let coarsest = resolutions.iter().copied().fold(0.0, f64::max);
                    self.max_zoom = (resolutions.len() - 1) as u32;
                    self.max_width = (coarsest * self.tile_size as f64).ceil() as u64;
                }
                _ => {
                    let rebuilt = Self::from_total_length(self.max_pos(), self.tile_size, self.datatype);
                    self.max_zoom = rebuilt.max_zoom;
                    self.max_width = rebuilt.max_width;
                }
            }
        }
        self
    }

    /// First coordinate of the extent
    pub fn min_pos(&self) -> u64 {
        self.min_pos.first().copied().unwrap_or(0)
    }

    /// Last coordinate of the data (exclusive)
    pub fn max_pos(&self) -> u64 {
        self.max_pos.first().copied().unwrap_or(self.max_width)
    }

    /// Width in bases of a tile at `zoom`
    pub fn tile_width(&self, zoom: u32) -> f64 {
        self.max_width as f64 / 2f64.powf(f64::from(zoom))
    }
}

/// Parsed `"<zoom>.<index>"` tile identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TileId {
    pub zoom: u32,
    pub index: u64,
}

impl TileId {
    pub fn new(zoom: u32, index: u64) -> Self {
        Self { zoom, index }
    }
}

impl FromStr for TileId {
    type Err = TileIdError;

    /// Parse a dotted tile id
    ///
    /// # Examples
    /// ```
    /// use seqtile::core::TileId;
    ///
    /// assert_eq!("3.17".parse::<TileId>().unwrap(), TileId::new(3, 17));
    /// assert!("abc.2".parse::<TileId>().is_err());
    /// ```
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || TileIdError::InvalidTileId(s.to_string());
        let (zoom, index) = s.split_once('.').ok_or_else(invalid)?;
        let zoom = zoom.parse::<u32>().map_err(|_| invalid())?;
        let index = index.parse::<u64>().map_err(|_| invalid())?;
        Ok(Self { zoom, index })
    }
}

impl fmt::Display for TileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.zoom, self.index)
    }
}

/// Absolute genomic window covered by one tile
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TileWindow {
    pub start: f64,
    pub end: f64,
}

impl TileWindow {
    /// Integer base range covering the window, clipped at `total_length`
    ///
    /// Fractional tile edges (zoom beyond the deepest level) widen outwards.
    pub fn to_base_range(&self, total_length: u64) -> (u64, u64) {
        let start = (self.start.max(0.0).floor() as u64).min(total_length);
        let end = (self.end.max(0.0).ceil() as u64).min(total_length);
        (start, end.max(start))
    }
}

/// Maps tile addresses to absolute windows for one tileset
#[derive(Debug, Clone, Copy)]
pub struct TileCoordinateMapper {
    min_pos: u64,
    max_width: u64,
}

impl TileCoordinateMapper {
    pub fn new(info: &TilesetInfo) -> Self {
        Self {
            min_pos: info.min_pos(),
            max_width: info.max_width,
        }
    }

    /// Window of tile `index` at `zoom`
    ///
    /// Zoom and index are taken as given; windows past the end of the data
    /// are clipped later against the chromosome table.
    pub fn tile_window(&self, zoom: u32, index: u64) -> TileWindow {
        let tile_width = self.max_width as f64 / 2f64.powf(f64::from(zoom));
        let min = self.min_pos as f64;
        TileWindow {
            start: min + index as f64 * tile_width,
            end: min + (index as f64 + 1.0) * tile_width,
        }
    }
}
