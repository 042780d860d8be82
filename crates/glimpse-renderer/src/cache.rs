//! Artifact cache keyed by request fingerprint.
//!
//! Unbounded and never evicts on its own. `clear()` is the only removal path,
//! used when global rendering settings (the LaTeX preamble) change.

use std::collections::HashMap;
use std::sync::Arc;

use crate::request::Fingerprint;

/// A rendered math fragment (SVG markup), ready to splice into the view.
pub type Artifact = Arc<str>;

#[derive(Debug, Default)]
pub struct RenderCache {
    entries: HashMap<Fingerprint, Artifact>,
    /// Bumped on every clear, so work dispatched before a clear can tell.
    epoch: u64,
}

impl RenderCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, fingerprint: &Fingerprint) -> Option<Artifact> {
        self.entries.get(fingerprint).cloned()
    }

    pub fn set(&mut self, fingerprint: Fingerprint, artifact: Artifact) {
        self.entries.insert(fingerprint, artifact);
    }

    pub fn clear(&mut self) {
        tracing::debug!(
            target: "glimpse::cache",
            dropped = self.entries.len(),
            epoch = self.epoch + 1,
            "render cache cleared"
        );
        self.entries.clear();
        self.epoch += 1;
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
