//! Keeps the preview centered on the editor's cursor line.

use crate::view::HostView;

#[derive(Debug, Default)]
pub struct ScrollSynchronizer {
    focused: Option<usize>,
}

impl ScrollSynchronizer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Center the view on the nearest anchor at or above `line` and make it
    /// the only highlighted line. Returns the anchor line used, if any.
    ///
    /// With no anchor at or above `line` the view is left as it was.
    pub fn focus_line<V: HostView + ?Sized>(&mut self, view: &mut V, line: usize) -> Option<usize> {
        let Some(anchor) = view.nearest_anchor(line) else {
            tracing::warn!(target: "glimpse::scroll", line, "no element found for cursor line");
            return None;
        };
        view.clear_highlight();
        view.center_on(anchor);
        view.highlight(anchor);
        self.focused = Some(anchor);
        tracing::debug!(target: "glimpse::scroll", line, anchor, "centered preview");
        Some(anchor)
    }

    /// The anchor the last successful focus landed on.
    pub fn focused(&self) -> Option<usize> {
        self.focused
    }
}
