//! Multivec tile service payloads
//!
//! A tile service answers `tileset_info/?d=<uid>` with `{ uid: info }` and
//! `tiles/?d=<uid>.<z>.<x>` with `{ "<uid>.<z>.<x>": { dense, shape } }`.
//! `dense` is channel-major: `shape = [channels, bins]`.

use crate::core::{unflatten, Column, Result, SeqTileError, TileId, TilesetInfo, CHANNELS};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// `tileset_info` response body
pub type TilesetInfoResponse = HashMap<String, TilesetInfo>;

/// `tiles` response body
pub type TilesResponse = HashMap<String, DenseTile>;

/// One pre-aggregated tile
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DenseTile {
    pub dense: Vec<f32>,
    pub shape: Vec<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_value: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_value: Option<f32>,
}

impl DenseTile {
    /// Reshape into one column per bin
    pub fn columns(&self) -> Result<Vec<Column>> {
        let invalid = |message: &str| SeqTileError::InvalidShape {
            shape: self.shape.clone(),
            len: self.dense.len(),
            message: message.to_string(),
        };

        let &[channels, bins] = self.shape.as_slice() else {
            return Err(invalid("expected [channels, bins]"));
        };
        if channels != CHANNELS {
            return Err(invalid("expected 6 symbol channels"));
        }
        unflatten(&self.dense, channels, bins).ok_or_else(|| invalid("value count does not match shape"))
    }
}

/// `tileset_info` URL for a tileset
pub fn tileset_info_url(server: &str, uid: &str) -> String {
    format!("{}/tileset_info/?d={}", server.trim_end_matches('/'), uid)
}

/// `tiles` URL for a single tile
pub fn tile_url(server: &str, uid: &str, tile: TileId) -> String {
    format!("{}/tiles/?d={}", server.trim_end_matches('/'), tile_key(uid, tile))
}

/// Key a tile service uses for a tile in its response
pub fn tile_key(uid: &str, tile: TileId) -> String {
    format!("{}.{}", uid, tile)
}
