//! Layer configuration.

use rayon::{ThreadPool, ThreadPoolBuilder};
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// How a [`Layer`](super::Layer) runs its scans.
///
/// Deserializes from a partial document; missing fields take their defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayerConfig {
    /// Size of a dedicated scan pool. `None` uses rayon's global pool.
    pub num_threads: Option<usize>,
    /// Layers with fewer members than this scan on the calling thread.
    pub sequential_threshold: usize,
    /// Worker thread name prefix for a dedicated pool.
    pub thread_name_prefix: String,
}

impl Default for LayerConfig {
    fn default() -> Self {
        Self {
            num_threads: None,
            sequential_threshold: 64,
            thread_name_prefix: "gaia-tags-layer".to_owned(),
        }
    }
}

impl LayerConfig {
    pub fn validate(&self) -> Result<()> {
        if self.num_threads == Some(0) {
            return Err(Error::InvalidConfig("num_threads must be at least 1".into()));
        }
        if self.thread_name_prefix.is_empty() {
            return Err(Error::InvalidConfig("thread_name_prefix must not be empty".into()));
        }
        Ok(())
    }

    /// Build the dedicated pool, if one is configured.
    pub(crate) fn build_pool(&self) -> Result<Option<ThreadPool>> {
        self.validate()?;
        let Some(num_threads) = self.num_threads else {
            return Ok(None);
        };
        let prefix = self.thread_name_prefix.clone();
        let pool = ThreadPoolBuilder::new()
            .num_threads(num_threads)
            .thread_name(move |i| format!("{prefix}-{i}"))
            .build()?;
        tracing::debug!(num_threads, "built layer scan pool");
        Ok(Some(pool))
    }
}
