//! Track and dataset configuration
//!
//! Both are JSON documents in camelCase, as a genome browser view config
//! would carry them.

use crate::core::{
    AggregationMode, ColorScale, ColumnReducer, ReduceResult, TieBreakKind, DEFAULT_COLOR_SCALE,
};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Default text shown when single bases cannot be drawn yet
pub const DEFAULT_NOTIFICATION_TEXT: &str = "Zoom in to see nucleotides...";

/// Where a track's data comes from
///
/// The variant is chosen by which fields are present.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DataConfig {
    /// Raw FASTA plus chromosome sizes, tiled on the fly
    #[serde(rename_all = "camelCase")]
    Raw {
        chrom_sizes_url: String,
        fasta_url: String,
        /// Defaults to `<fastaUrl>.fai`
        #[serde(default, skip_serializing_if = "Option::is_none")]
        fai_url: Option<String>,
    },
    /// Multivec tileset on a tile service
    #[serde(rename_all = "camelCase")]
    PreEncoded { server: String, tileset_uid: String },
}

/// Rendering-side options that affect tile handling and reduction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TrackOptions {
    pub color_aggregation_mode: AggregationMode,
    pub color_scale: Vec<String>,
    pub notification_text: String,
    pub extended_preloading: bool,
    /// Raw sequence sources only serve their deepest zoom
    pub fixed_zoom_for_single_resolution: bool,
    pub tie_break: TieBreakKind,
    /// Makes random tie-breaking reproducible
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tie_break_seed: Option<u64>,
}

impl Default for TrackOptions {
    fn default() -> Self {
        Self {
            color_aggregation_mode: AggregationMode::Exact,
            color_scale: DEFAULT_COLOR_SCALE.iter().map(|c| c.to_string()).collect(),
            notification_text: DEFAULT_NOTIFICATION_TEXT.to_string(),
            extended_preloading: false,
            fixed_zoom_for_single_resolution: false,
            tie_break: TieBreakKind::Random,
            tie_break_seed: None,
        }
    }
}

impl TrackOptions {
    /// Parsed color scale
    pub fn color_scale(&self) -> ReduceResult<ColorScale> {
        ColorScale::new(&self.color_scale)
    }

    /// Column reducer configured from these options
    pub fn reducer(&self) -> ReduceResult<ColumnReducer> {
        Ok(ColumnReducer::new(
            self.color_aggregation_mode,
            self.color_scale()?,
            self.tie_break.build(self.tie_break_seed),
        ))
    }
}

/// A complete track: data source plus options
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackConfig {
    pub data: DataConfig,
    #[serde(default)]
    pub options: TrackOptions,
}

impl TrackConfig {
    /// Read a track configuration from a JSON file
    pub fn from_json_file(path: &Path) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&text)?)
    }
}
