//! The rendered document and the live view it gets attached to.

use std::collections::{BTreeMap, HashMap};

use smol_str::SmolStr;

use crate::placeholder::PlaceholderNode;

pub const HIGHLIGHT_CLASS: &str = "line-highlighted";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    Markup(String),
    Placeholder(PlaceholderNode),
}

/// Where an anchor's `data-source-line` attribute ends in the markup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct AnchorSite {
    segment: usize,
    offset: usize,
}

/// Output of one render pass: markup interleaved with placeholder nodes,
/// plus the anchor element opened for each source line.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RenderedDocument {
    segments: Vec<Segment>,
    anchors: BTreeMap<usize, AnchorSite>,
}

impl RenderedDocument {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_markup(&mut self, markup: impl Into<String>) {
        let markup = markup.into();
        if markup.is_empty() {
            return;
        }
        match self.segments.last_mut() {
            Some(Segment::Markup(last)) => last.push_str(&markup),
            _ => self.segments.push(Segment::Markup(markup)),
        }
    }

    pub fn push_placeholder(&mut self, node: PlaceholderNode) {
        self.segments.push(Segment::Placeholder(node));
    }

    /// Write the start of `<tag data-source-line="line"`, leaving the tag
    /// open for further attributes. The first element opened for a line
    /// is its anchor.
    pub fn open_anchor(&mut self, tag: &str, line: usize) {
        self.push_markup(format!(r#"<{tag} data-source-line="{line}""#));
        if let Some(Segment::Markup(markup)) = self.segments.last() {
            let site = AnchorSite {
                segment: self.segments.len() - 1,
                offset: markup.len(),
            };
            self.anchors.entry(line).or_insert(site);
        }
    }

    /// The closest anchor line at or before `line`.
    pub fn nearest_anchor(&self, line: usize) -> Option<usize> {
        self.anchors.range(..=line).next_back().map(|(&anchor, _)| anchor)
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn placeholders(&self) -> impl Iterator<Item = &PlaceholderNode> {
        self.segments.iter().filter_map(|segment| match segment {
            Segment::Placeholder(node) => Some(node),
            Segment::Markup(_) => None,
        })
    }

    /// Serialize to HTML, marking the anchor for `highlight` if given.
    pub fn to_markup(&self, highlight: Option<usize>) -> String {
        let site = highlight.and_then(|line| self.anchors.get(&line));
        let mut out = String::new();
        for (i, segment) in self.segments.iter().enumerate() {
            match segment {
                Segment::Markup(markup) => match site {
                    Some(site) if site.segment == i => {
                        let (head, rest) = markup.split_at(site.offset);
                        out.push_str(head);
                        push_highlighted(&mut out, rest);
                    }
                    _ => out.push_str(markup),
                },
                Segment::Placeholder(node) => node.write_markup(&mut out),
            }
        }
        out
    }
}

/// `rest` starts right after an anchor's line attribute, still inside the tag.
fn push_highlighted(out: &mut String, rest: &str) {
    const CLASS_ATTR: &str = r#" class=""#;
    match rest.strip_prefix(CLASS_ATTR) {
        Some(classes) => {
            out.push_str(CLASS_ATTR);
            out.push_str(HIGHLIGHT_CLASS);
            out.push(' ');
            out.push_str(classes);
        }
        None => {
            out.push_str(CLASS_ATTR);
            out.push_str(HIGHLIGHT_CLASS);
            out.push('"');
            out.push_str(rest);
        }
    }
}

/// The rendering surface a session drives.
///
/// The document is handed over wholesale on each pass; afterwards nodes are
/// only ever found again by placeholder id or source line.
pub trait HostView {
    /// Replace the current document. Placeholders from earlier passes are gone.
    fn attach(&mut self, document: RenderedDocument);

    fn placeholder_mut(&mut self, id: &str) -> Option<&mut PlaceholderNode>;

    /// The closest anchored source line at or before `line`.
    fn nearest_anchor(&self, line: usize) -> Option<usize>;

    /// Scroll so the anchor for `line` sits in the middle of the viewport.
    fn center_on(&mut self, line: usize);

    fn clear_highlight(&mut self);

    fn highlight(&mut self, line: usize);

    fn set_title(&mut self, _title: &str) {}
}

/// In-memory view backing the preview server.
///
/// "Centering" records the target line; the browser page reads it from the
/// published snapshot and scrolls there.
#[derive(Debug, Default)]
pub struct DocumentView {
    title: String,
    document: RenderedDocument,
    index: HashMap<SmolStr, usize>,
    centered: Option<usize>,
    highlighted: Option<usize>,
}

impl DocumentView {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn document(&self) -> &RenderedDocument {
        &self.document
    }

    pub fn markup(&self) -> String {
        self.document.to_markup(self.highlighted)
    }

    pub fn centered_line(&self) -> Option<usize> {
        self.centered
    }

    pub fn highlighted_line(&self) -> Option<usize> {
        self.highlighted
    }
}

impl HostView for DocumentView {
    fn attach(&mut self, document: RenderedDocument) {
        self.index = document
            .segments
            .iter()
            .enumerate()
            .filter_map(|(i, segment)| match segment {
                Segment::Placeholder(node) => Some((node.id.clone(), i)),
                Segment::Markup(_) => None,
            })
            .collect();
        self.document = document;
        self.highlighted = None;
    }

    fn placeholder_mut(&mut self, id: &str) -> Option<&mut PlaceholderNode> {
        let at = *self.index.get(id)?;
        match self.document.segments.get_mut(at) {
            Some(Segment::Placeholder(node)) => Some(node),
            _ => None,
        }
    }

    fn nearest_anchor(&self, line: usize) -> Option<usize> {
        self.document.nearest_anchor(line)
    }

    fn center_on(&mut self, line: usize) {
        self.centered = Some(line);
    }

    fn clear_highlight(&mut self) {
        self.highlighted = None;
    }

    fn highlight(&mut self, line: usize) {
        self.highlighted = Some(line);
    }

    fn set_title(&mut self, title: &str) {
        self.title = title.to_owned();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::placeholder::Footprint;

    fn sample() -> RenderedDocument {
        let mut doc = RenderedDocument::new();
        doc.open_anchor("p", 0);
        doc.push_markup(">a</p>\n");
        doc.open_anchor("p", 2);
        doc.push_markup(">");
        doc.push_placeholder(PlaceholderNode::pending(
            "math-0".into(),
            true,
            Footprint::Height(50),
        ));
        doc.push_markup("</p>\n");
        doc.open_anchor("h1", 4);
        doc.push_markup(r#" class="title">T</h1>"#);
        doc
    }

    #[test]
    fn adjacent_markup_is_merged() {
        let doc = sample();
        assert_eq!(doc.segments().len(), 3);
        assert_eq!(doc.placeholders().count(), 1);
    }

    #[test]
    fn highlight_adds_class() {
        let doc = sample();
        let out = doc.to_markup(Some(2));
        assert!(out.contains(r#"<p data-source-line="2" class="line-highlighted">"#));
        assert_eq!(out.matches(HIGHLIGHT_CLASS).count(), 1);
    }

    #[test]
    fn highlight_merges_existing_class() {
        let doc = sample();
        let out = doc.to_markup(Some(4));
        assert!(out.contains(r#"<h1 data-source-line="4" class="line-highlighted title">"#));
    }

    #[test]
    fn highlight_of_unknown_line_is_ignored() {
        let doc = sample();
        assert_eq!(doc.to_markup(Some(3)), doc.to_markup(None));
    }

    #[test]
    fn highlight_ignores_lookalike_text() {
        let mut doc = RenderedDocument::new();
        doc.open_anchor("p", 0);
        doc.push_markup(r#">see <code>data-source-line="2"</code> here</p>"#);
        doc.push_markup("\n");
        doc.open_anchor("p", 2);
        doc.push_markup(">real</p>\n");

        let out = doc.to_markup(Some(2));
        assert!(out.contains(r#"<code>data-source-line="2"</code>"#));
        assert!(out.contains(r#"<p data-source-line="2" class="line-highlighted">real</p>"#));
        assert_eq!(out.matches(HIGHLIGHT_CLASS).count(), 1);
    }

    #[test]
    fn first_element_on_a_line_is_the_anchor() {
        let mut doc = RenderedDocument::new();
        doc.open_anchor("ul", 0);
        doc.push_markup(">\n");
        doc.open_anchor("li", 0);
        doc.push_markup(">x</li>\n</ul>\n");

        let out = doc.to_markup(Some(0));
        assert!(out.starts_with(r#"<ul data-source-line="0" class="line-highlighted">"#));
        assert_eq!(out.matches(HIGHLIGHT_CLASS).count(), 1);
    }

    #[test]
    fn nearest_anchor_is_a_range_lookup() {
        let doc = sample();
        assert_eq!(doc.nearest_anchor(3), Some(2));
        assert_eq!(doc.nearest_anchor(4), Some(4));
        assert_eq!(doc.nearest_anchor(usize::MAX), Some(4));

        let mut late = RenderedDocument::new();
        late.open_anchor("p", 7);
        assert_eq!(late.nearest_anchor(6), None);
    }

    #[test]
    fn view_finds_placeholders_by_id() {
        let mut view = DocumentView::new();
        view.attach(sample());
        assert!(view.placeholder_mut("math-0").is_some());
        assert!(view.placeholder_mut("math-9").is_none());

        // A new pass drops the old ids.
        view.attach(RenderedDocument::new());
        assert!(view.placeholder_mut("math-0").is_none());
    }
}
