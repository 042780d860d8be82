//! Placeholder nodes standing in for display math until its artifact arrives.

use std::fmt::Write;

use glimpse_common::PreviewConfig;
use smol_str::SmolStr;

use crate::cache::Artifact;
use crate::request::RenderRequest;

pub const PENDING_CLASS: &str = "latex-placeholder";
pub const RESOLVED_BLOCK_CLASS: &str = "latex-rendered-block";
pub const RESOLVED_INLINE_CLASS: &str = "latex-rendered-inline";

/// Provisional size reserved for a placeholder so layout shifts less once
/// the artifact lands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Footprint {
    /// Block math reserves vertical space.
    Height(u32),
    /// Inline math reserves horizontal space.
    Width(u32),
}

/// Cheap size heuristic over the raw source text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FootprintEstimator {
    pub block_height_px: u32,
    pub line_height_px: u32,
    pub inline_base_px: u32,
    pub inline_char_px: u32,
}

impl Default for FootprintEstimator {
    fn default() -> Self {
        Self {
            block_height_px: 50,
            line_height_px: 24,
            inline_base_px: 10,
            inline_char_px: 8,
        }
    }
}

impl From<&PreviewConfig> for FootprintEstimator {
    fn from(config: &PreviewConfig) -> Self {
        Self {
            block_height_px: config.block_height_px,
            line_height_px: config.line_height_px,
            inline_base_px: config.inline_base_px,
            inline_char_px: config.inline_char_px,
        }
    }
}

impl FootprintEstimator {
    pub fn estimate(&self, request: &RenderRequest) -> Footprint {
        let tex = request.expression_text.trim();
        if request.display_mode {
            // One extra line per explicit row break.
            let breaks = tex.matches(r"\\").count() as u32;
            Footprint::Height(
                self.block_height_px
                    .saturating_add(self.line_height_px.saturating_mul(breaks)),
            )
        } else {
            let chars = tex.chars().count() as u32;
            Footprint::Width(
                self.inline_base_px
                    .saturating_add(self.inline_char_px.saturating_mul(chars)),
            )
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlaceholderState {
    Pending,
    Resolved { artifact: Artifact, display_mode: bool },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaceholderNode {
    pub id: SmolStr,
    pub display_mode: bool,
    pub footprint: Footprint,
    pub state: PlaceholderState,
}

impl PlaceholderNode {
    pub fn pending(id: SmolStr, display_mode: bool, footprint: Footprint) -> Self {
        Self {
            id,
            display_mode,
            footprint,
            state: PlaceholderState::Pending,
        }
    }

    /// Swap in the artifact. Resolving twice keeps the latest artifact.
    pub fn resolve(&mut self, artifact: Artifact, display_mode: bool) {
        self.state = PlaceholderState::Resolved {
            artifact,
            display_mode,
        };
    }

    pub fn is_resolved(&self) -> bool {
        matches!(self.state, PlaceholderState::Resolved { .. })
    }

    /// The class that marks the node's state in markup.
    pub fn marker(&self) -> &'static str {
        match &self.state {
            PlaceholderState::Pending => PENDING_CLASS,
            PlaceholderState::Resolved {
                display_mode: true, ..
            } => RESOLVED_BLOCK_CLASS,
            PlaceholderState::Resolved {
                display_mode: false,
                ..
            } => RESOLVED_INLINE_CLASS,
        }
    }

    /// Written as a `span` in both modes so a placeholder is legal inside
    /// the paragraph the parser puts display math in.
    pub fn write_markup(&self, out: &mut String) {
        let _ = write!(out, r#"<span class="{}" id="{}""#, self.marker(), self.id);
        match &self.state {
            PlaceholderState::Pending => {
                match self.footprint {
                    Footprint::Height(px) => {
                        let _ = write!(
                            out,
                            r#" style="display:block; height:{px}px; margin: 10px 0;">"#
                        );
                    }
                    Footprint::Width(px) => {
                        let _ = write!(out, r#" style="display:inline-block; width:{px}px;">"#);
                    }
                }
                out.push_str("</span>");
            }
            PlaceholderState::Resolved {
                artifact,
                display_mode,
            } => {
                if *display_mode {
                    out.push_str(r#" style="display:block;">"#);
                } else {
                    out.push('>');
                }
                out.push_str(artifact);
                out.push_str("</span>");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn display_height_grows_with_row_breaks() {
        let estimator = FootprintEstimator::default();
        assert_eq!(
            estimator.estimate(&RenderRequest::display("a")),
            Footprint::Height(50)
        );
        assert_eq!(
            estimator.estimate(&RenderRequest::display(r"a \\ b \\ c")),
            Footprint::Height(98)
        );
    }

    #[test]
    fn inline_width_tracks_length() {
        let estimator = FootprintEstimator::default();
        assert_eq!(
            estimator.estimate(&RenderRequest::inline("x^2")),
            Footprint::Width(34)
        );
    }

    #[test]
    fn pending_markup_reserves_space() {
        let node = PlaceholderNode::pending("math-3".into(), true, Footprint::Height(50));
        let mut out = String::new();
        node.write_markup(&mut out);
        assert_eq!(
            out,
            r#"<span class="latex-placeholder" id="math-3" style="display:block; height:50px; margin: 10px 0;"></span>"#
        );
    }

    #[test]
    fn resolving_swaps_marker() {
        let mut node = PlaceholderNode::pending("math-0".into(), true, Footprint::Height(50));
        assert_eq!(node.marker(), PENDING_CLASS);
        node.resolve(Arc::from("<svg/>"), true);
        assert!(node.is_resolved());
        assert_eq!(node.marker(), RESOLVED_BLOCK_CLASS);

        let mut out = String::new();
        node.write_markup(&mut out);
        assert!(out.contains(r#"class="latex-rendered-block" id="math-0""#));
        assert!(out.contains("<svg/>"));
        assert!(!out.contains("height:"));

        node.resolve(Arc::from("<svg/>"), false);
        assert_eq!(node.marker(), RESOLVED_INLINE_CLASS);
    }
}
