//! glimpse-renderer
//!
//! Deferred math rendering for the live markdown preview.
//!
//! A render pass turns markdown into a [`RenderedDocument`] synchronously.
//! Inline math is typeset on the spot; display math becomes a placeholder and
//! a [`PendingResolution`] that the [`PreviewSession`] hands to a
//! [`DelegatedRenderer`]. Artifacts are cached by fingerprint, substituted
//! into the live view by placeholder id, and counted by the
//! [`CompletionTracker`] so the viewport can be re-centered once the document
//! has stopped changing height.

pub mod cache;
pub mod client;
pub mod error;
pub mod latex;
pub mod math;
pub mod pipeline;
pub mod placeholder;
pub mod request;
pub mod scroll;
pub mod session;
pub mod substitute;
pub mod tracker;
pub mod view;

pub use cache::{Artifact, RenderCache};
pub use client::{DelegatedClient, DelegatedRenderer, Outcome, Resolution, complete};
pub use error::{DelegateError, TypesetError};
pub use latex::{LatexOptions, LatexRenderer};
pub use pipeline::{Pipeline, RenderPass};
pub use placeholder::{Footprint, FootprintEstimator, PlaceholderNode, PlaceholderState};
pub use request::{DelegateRequest, Fingerprint, PendingResolution, RenderRequest};
pub use scroll::ScrollSynchronizer;
pub use session::{DocumentUpdate, PreviewSession, SessionCommand};
pub use substitute::substitute;
pub use tracker::{CompletionTracker, Ticket};
pub use view::{DocumentView, HostView, RenderedDocument, Segment};

use smol_str::SmolStr;

/// Hands out placeholder ids that stay unique for the life of a session,
/// across render passes.
#[derive(Debug, Default)]
pub struct PlaceholderIds {
    next: u64,
}

impl PlaceholderIds {
    pub fn next_id(&mut self) -> SmolStr {
        let id = smol_str::format_smolstr!("math-{}", self.next);
        self.next += 1;
        id
    }
}

/// The mutable state a preview session owns: the artifact cache, the
/// completion tracker, and the placeholder id source.
#[derive(Debug, Default)]
pub struct RenderContext {
    pub cache: RenderCache,
    pub tracker: CompletionTracker,
    pub ids: PlaceholderIds,
}

impl RenderContext {
    pub fn new() -> Self {
        Self::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_never_repeat() {
        let mut ids = PlaceholderIds::default();
        let a = ids.next_id();
        let b = ids.next_id();
        assert_eq!(a, "math-0");
        assert_eq!(b, "math-1");
    }
}
