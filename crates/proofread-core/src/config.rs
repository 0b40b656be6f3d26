//! # Editor Configuration
//!
//! Tunables for the edit scheduler. Every field has a default, so a
//! partial document (e.g. a TOML file with one key) is valid.

use crate::primitives::{
    DEFAULT_CONNECTION_THRESHOLD, DEFAULT_NUM_SLICES, MIN_BODY_NEIGHBOR_SIZE,
    NEURITE_SIZE_PER_SLICE,
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorConfig {
    /// Lower bound on cumulative path affinity during staging searches.
    pub connection_threshold: f64,
    /// Number of z-slices in the volume.
    pub num_slices: u32,
    /// Approximate voxels per slice of a typical neurite.
    pub neurite_size_per_slice: u64,
    /// Body mode ignores neighbors smaller than this.
    pub min_body_neighbor_size: u64,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            connection_threshold: DEFAULT_CONNECTION_THRESHOLD,
            num_slices: DEFAULT_NUM_SLICES,
            neurite_size_per_slice: NEURITE_SIZE_PER_SLICE,
            min_body_neighbor_size: MIN_BODY_NEIGHBOR_SIZE,
        }
    }
}

impl EditorConfig {
    /// Approximate voxel count of one neurite spanning the whole volume.
    #[must_use]
    pub fn approx_neurite_size(&self) -> u64 {
        self.neurite_size_per_slice
            .saturating_mul(u64::from(self.num_slices))
    }
}
