// Shared region of interest

use std::sync::{Arc, RwLock};

use crate::vision::frame_source::Region;

/// The capture region shared between the sampler and whoever selects it.
///
/// Starts empty; once a region is selected it can be replaced but never
/// cleared, so sampling never falls back to the no-region state.
#[derive(Clone, Debug)]
pub struct RegionState {
    region: Arc<RwLock<Option<Region>>>,
}

impl RegionState {
    pub fn new() -> Self {
        Self {
            region: Arc::new(RwLock::new(None)),
        }
    }

    pub fn with_region(region: Region) -> Self {
        Self {
            region: Arc::new(RwLock::new(Some(region))),
        }
    }

    pub fn select(&self, region: Region) {
        let mut guard = self.region.write().unwrap_or_else(|p| p.into_inner());
        *guard = Some(region);
    }

    pub fn current(&self) -> Option<Region> {
        *self.region.read().unwrap_or_else(|p| p.into_inner())
    }
}

impl Default for RegionState {
    fn default() -> Self {
        Self::new()
    }
}
