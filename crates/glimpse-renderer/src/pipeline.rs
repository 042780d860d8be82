//! One synchronous render pass: markdown in, markup plus pending math out.
//!
//! The HTML writer follows pulldown-cmark's own, with two changes: block
//! elements carry `data-source-line` (0-based) so the scroll synchronizer can
//! find them, and display math is cut out of the markup stream as a
//! placeholder segment whose resolution is handed back to the caller.

use std::collections::HashMap;
use std::fmt::{self, Write};
use std::ops::Range;
use std::time::Duration;

use glimpse_common::perf::TimingGuard;
use pulldown_cmark::{
    Alignment, BlockQuoteKind, CodeBlockKind, CowStr, Event, Event::*, LinkType, Options, Parser,
    Tag, TagEnd,
};
use pulldown_cmark_escape::{FmtWriter, escape_href, escape_html, escape_html_body_text};

use crate::RenderContext;
use crate::math::typeset_inline;
use crate::placeholder::{FootprintEstimator, PlaceholderNode};
use crate::request::{PendingResolution, RenderRequest};
use crate::view::RenderedDocument;

/// Passes slower than this are logged at warn.
const SLOW_PASS: Duration = Duration::from_millis(50);

/// The result of [`Pipeline::render`].
#[derive(Debug)]
pub struct RenderPass {
    pub document: RenderedDocument,
    /// One entry per display-math placeholder, in document order. Each holds
    /// a ticket already counted by the tracker.
    pub pending: Vec<PendingResolution>,
}

#[derive(Debug, Clone)]
pub struct Pipeline {
    options: Options,
    footprints: FootprintEstimator,
}

impl Default for Pipeline {
    fn default() -> Self {
        Self::new(FootprintEstimator::default())
    }
}

impl Pipeline {
    pub fn new(footprints: FootprintEstimator) -> Self {
        Self {
            options: Options::ENABLE_TABLES
                | Options::ENABLE_FOOTNOTES
                | Options::ENABLE_STRIKETHROUGH
                | Options::ENABLE_TASKLISTS
                | Options::ENABLE_MATH,
            footprints,
        }
    }

    /// Render `text`. Never fails: bad math degrades to error markers.
    ///
    /// Takes one tracker ticket per display-math region. The caller is
    /// expected to have reset the tracker for this pass already.
    pub fn render(&self, text: &str, ctx: &mut RenderContext) -> RenderPass {
        let _timing = TimingGuard::new("render pass").warn_after(SLOW_PASS);
        let events = Parser::new_ext(text, self.options).into_offset_iter();
        let mut writer = HtmlWriter::new(events, LineIndex::new(text), ctx, self.footprints);
        if let Err(error) = writer.run() {
            tracing::error!(target: "glimpse::render", %error, "html writer failed");
        }
        let pass = writer.finish();
        tracing::debug!(
            target: "glimpse::render",
            bytes = text.len(),
            pending = pass.pending.len(),
            "rendered document"
        );
        pass
    }
}

/// Byte offset → 0-based source line.
struct LineIndex {
    starts: Vec<usize>,
}

impl LineIndex {
    fn new(text: &str) -> Self {
        let mut starts = vec![0];
        starts.extend(text.match_indices('\n').map(|(at, _)| at + 1));
        Self { starts }
    }

    fn line_of(&self, offset: usize) -> usize {
        self.starts
            .partition_point(|&start| start <= offset)
            .saturating_sub(1)
    }
}

enum TableState {
    Head,
    Body,
}

struct HtmlWriter<'a, 'c, I> {
    iter: I,
    lines: LineIndex,
    ctx: &'c mut RenderContext,
    footprints: FootprintEstimator,

    /// Markup since the last placeholder.
    buf: String,
    document: RenderedDocument,
    pending: Vec<PendingResolution>,

    end_newline: bool,
    in_metadata: bool,
    table_state: TableState,
    table_alignments: Vec<Alignment>,
    table_cell_index: usize,
    numbers: HashMap<CowStr<'a>, usize>,
}

impl<'a, 'c, I> HtmlWriter<'a, 'c, I>
where
    I: Iterator<Item = (Event<'a>, Range<usize>)>,
{
    fn new(
        iter: I,
        lines: LineIndex,
        ctx: &'c mut RenderContext,
        footprints: FootprintEstimator,
    ) -> Self {
        Self {
            iter,
            lines,
            ctx,
            footprints,
            buf: String::new(),
            document: RenderedDocument::new(),
            pending: Vec::new(),
            end_newline: true,
            in_metadata: false,
            table_state: TableState::Head,
            table_alignments: vec![],
            table_cell_index: 0,
            numbers: HashMap::new(),
        }
    }

    fn finish(mut self) -> RenderPass {
        self.flush();
        RenderPass {
            document: self.document,
            pending: self.pending,
        }
    }

    fn flush(&mut self) {
        let markup = std::mem::take(&mut self.buf);
        self.document.push_markup(markup);
    }

    #[inline]
    fn write_newline(&mut self) -> fmt::Result {
        self.end_newline = true;
        self.buf.write_str("\n")
    }

    #[inline]
    fn write(&mut self, s: &str) -> fmt::Result {
        self.buf.write_str(s)?;
        if !s.is_empty() {
            self.end_newline = s.ends_with('\n');
        }
        Ok(())
    }

    fn escape(&mut self, s: &str) -> fmt::Result {
        escape_html(FmtWriter(&mut self.buf), s)
    }

    /// Open a block tag on a fresh line, tagged with its source line.
    fn open_block(&mut self, tag: &str, offset: usize) -> fmt::Result {
        if !self.end_newline {
            self.write_newline()?;
        }
        let line = self.lines.line_of(offset);
        self.flush();
        self.document.open_anchor(tag, line);
        self.end_newline = false;
        Ok(())
    }

    fn run(&mut self) -> fmt::Result {
        while let Some((event, range)) = self.iter.next() {
            match event {
                Start(tag) => self.start_tag(tag, range)?,
                End(tag) => self.end_tag(tag)?,
                Text(text) => {
                    if !self.in_metadata {
                        escape_html_body_text(FmtWriter(&mut self.buf), &text)?;
                        self.end_newline = text.ends_with('\n');
                    }
                }
                Code(text) => {
                    self.write("<code>")?;
                    escape_html_body_text(FmtWriter(&mut self.buf), &text)?;
                    self.write("</code>")?;
                }
                InlineMath(text) => self.inline_math(&text)?,
                DisplayMath(text) => self.defer_display_math(&text),
                Html(html) | InlineHtml(html) => self.write(&html)?,
                SoftBreak => self.write_newline()?,
                HardBreak => self.write("<br />\n")?,
                Rule => {
                    self.open_block("hr", range.start)?;
                    self.write(" />\n")?;
                }
                FootnoteReference(name) => {
                    let len = self.numbers.len() + 1;
                    self.write("<sup class=\"footnote-reference\"><a href=\"#")?;
                    self.escape(&name)?;
                    self.write("\">")?;
                    let number = *self.numbers.entry(name).or_insert(len);
                    write!(self.buf, "{number}")?;
                    self.write("</a></sup>")?;
                }
                TaskListMarker(true) => {
                    self.write("<input disabled=\"\" type=\"checkbox\" checked=\"\"/>\n")?;
                }
                TaskListMarker(false) => {
                    self.write("<input disabled=\"\" type=\"checkbox\"/>\n")?;
                }
            }
        }
        Ok(())
    }

    fn inline_math(&mut self, tex: &str) -> fmt::Result {
        match typeset_inline(tex) {
            Ok(mathml) => {
                self.write(r#"<span class="math math-inline">"#)?;
                self.write(&mathml)?;
                self.write("</span>")
            }
            // Inert marker that still shows the source.
            Err(error) => {
                tracing::debug!(target: "glimpse::render", tex, %error, "inline math failed");
                self.write(r#"<span class="math math-error math-inline" title=""#)?;
                self.escape(&error.to_string())?;
                self.write(r#""><code>"#)?;
                escape_html_body_text(FmtWriter(&mut self.buf), tex)?;
                self.write("</code></span>")
            }
        }
    }

    /// Count the region, cut a placeholder into the document and queue the
    /// request. Nothing is dispatched here.
    fn defer_display_math(&mut self, tex: &str) {
        let ticket = self.ctx.tracker.begin();
        let id = self.ctx.ids.next_id();
        let request = RenderRequest::display(tex);
        let footprint = self.footprints.estimate(&request);

        self.flush();
        self.document
            .push_placeholder(PlaceholderNode::pending(id.clone(), true, footprint));
        self.end_newline = false;

        tracing::trace!(target: "glimpse::render", id = %id, ?footprint, "deferred display math");
        self.pending.push(PendingResolution {
            id,
            request,
            ticket,
        });
    }

    fn start_tag(&mut self, tag: Tag<'a>, range: Range<usize>) -> fmt::Result {
        match tag {
            Tag::HtmlBlock => Ok(()),
            Tag::Paragraph => {
                self.open_block("p", range.start)?;
                self.write(">")
            }
            Tag::Heading {
                level, id, classes, ..
            } => {
                self.open_block(&level.to_string(), range.start)?;
                if let Some(id) = id {
                    self.write(" id=\"")?;
                    self.escape(&id)?;
                    self.write("\"")?;
                }
                let mut classes = classes.iter();
                if let Some(class) = classes.next() {
                    self.write(" class=\"")?;
                    self.escape(class)?;
                    for class in classes {
                        self.write(" ")?;
                        self.escape(class)?;
                    }
                    self.write("\"")?;
                }
                self.write(">")
            }
            Tag::Table(alignments) => {
                self.table_alignments = alignments;
                self.open_block("table", range.start)?;
                self.write(">")
            }
            Tag::TableHead => {
                self.table_state = TableState::Head;
                self.table_cell_index = 0;
                self.write("<thead><tr>")
            }
            Tag::TableRow => {
                self.table_cell_index = 0;
                self.write("<tr>")
            }
            Tag::TableCell => {
                match self.table_state {
                    TableState::Head => self.write("<th")?,
                    TableState::Body => self.write("<td")?,
                }
                match self.table_alignments.get(self.table_cell_index) {
                    Some(&Alignment::Left) => self.write(" style=\"text-align: left\">"),
                    Some(&Alignment::Center) => self.write(" style=\"text-align: center\">"),
                    Some(&Alignment::Right) => self.write(" style=\"text-align: right\">"),
                    _ => self.write(">"),
                }
            }
            Tag::BlockQuote(kind) => {
                self.open_block("blockquote", range.start)?;
                let class = match kind {
                    None => "",
                    Some(BlockQuoteKind::Note) => " class=\"markdown-alert-note\"",
                    Some(BlockQuoteKind::Tip) => " class=\"markdown-alert-tip\"",
                    Some(BlockQuoteKind::Important) => " class=\"markdown-alert-important\"",
                    Some(BlockQuoteKind::Warning) => " class=\"markdown-alert-warning\"",
                    Some(BlockQuoteKind::Caution) => " class=\"markdown-alert-caution\"",
                };
                self.write(class)?;
                self.write(">\n")
            }
            Tag::CodeBlock(info) => {
                self.open_block("pre", range.start)?;
                match info {
                    CodeBlockKind::Fenced(info) => {
                        let lang = info.split(' ').next().unwrap_or_default();
                        if lang.is_empty() {
                            self.write("><code>")
                        } else {
                            self.write("><code class=\"language-")?;
                            self.escape(lang)?;
                            self.write("\">")
                        }
                    }
                    CodeBlockKind::Indented => self.write("><code>"),
                }
            }
            Tag::List(Some(1)) => {
                self.open_block("ol", range.start)?;
                self.write(">\n")
            }
            Tag::List(Some(start)) => {
                self.open_block("ol", range.start)?;
                write!(self.buf, " start=\"{start}\"")?;
                self.write(">\n")
            }
            Tag::List(None) => {
                self.open_block("ul", range.start)?;
                self.write(">\n")
            }
            Tag::Item => {
                self.open_block("li", range.start)?;
                self.write(">")
            }
            Tag::Emphasis => self.write("<em>"),
            Tag::Strong => self.write("<strong>"),
            Tag::Strikethrough => self.write("<del>"),
            Tag::Link {
                link_type: LinkType::Email,
                dest_url,
                title,
                ..
            } => {
                self.write("<a href=\"mailto:")?;
                escape_href(FmtWriter(&mut self.buf), &dest_url)?;
                if !title.is_empty() {
                    self.write("\" title=\"")?;
                    self.escape(&title)?;
                }
                self.write("\">")
            }
            Tag::Link {
                dest_url, title, ..
            } => {
                self.write("<a href=\"")?;
                escape_href(FmtWriter(&mut self.buf), &dest_url)?;
                if !title.is_empty() {
                    self.write("\" title=\"")?;
                    self.escape(&title)?;
                }
                self.write("\">")
            }
            Tag::Image {
                dest_url, title, ..
            } => {
                self.write("<img src=\"")?;
                escape_href(FmtWriter(&mut self.buf), &dest_url)?;
                self.write("\" alt=\"")?;
                self.raw_text()?;
                if !title.is_empty() {
                    self.write("\" title=\"")?;
                    self.escape(&title)?;
                }
                self.write("\" />")
            }
            Tag::FootnoteDefinition(name) => {
                self.open_block("div", range.start)?;
                self.write(" class=\"footnote-definition\" id=\"")?;
                self.escape(&name)?;
                self.write("\"><sup class=\"footnote-definition-label\">")?;
                let len = self.numbers.len() + 1;
                let number = *self.numbers.entry(name).or_insert(len);
                write!(self.buf, "{number}")?;
                self.write("</sup>")
            }
            Tag::MetadataBlock(_) => {
                self.in_metadata = true;
                Ok(())
            }
            // Extensions left disabled in `Pipeline::new`.
            _ => Ok(()),
        }
    }

    fn end_tag(&mut self, tag: TagEnd) -> fmt::Result {
        match tag {
            TagEnd::Paragraph => self.write("</p>\n"),
            TagEnd::Heading(level) => {
                write!(self.buf, "</{level}>")?;
                self.write_newline()
            }
            TagEnd::Table => self.write("</tbody></table>\n"),
            TagEnd::TableHead => {
                self.table_state = TableState::Body;
                self.write("</tr></thead><tbody>\n")
            }
            TagEnd::TableRow => self.write("</tr>\n"),
            TagEnd::TableCell => {
                match self.table_state {
                    TableState::Head => self.write("</th>")?,
                    TableState::Body => self.write("</td>")?,
                }
                self.table_cell_index += 1;
                Ok(())
            }
            TagEnd::BlockQuote(_) => self.write("</blockquote>\n"),
            TagEnd::CodeBlock => self.write("</code></pre>\n"),
            TagEnd::List(true) => self.write("</ol>\n"),
            TagEnd::List(false) => self.write("</ul>\n"),
            TagEnd::Item => self.write("</li>\n"),
            TagEnd::Emphasis => self.write("</em>"),
            TagEnd::Strong => self.write("</strong>"),
            TagEnd::Strikethrough => self.write("</del>"),
            TagEnd::Link => self.write("</a>"),
            TagEnd::FootnoteDefinition => self.write("</div>\n"),
            TagEnd::MetadataBlock(_) => {
                self.in_metadata = false;
                Ok(())
            }
            // Image is consumed by raw_text; the rest are disabled extensions.
            _ => Ok(()),
        }
    }

    /// Write the text of the current element as attribute text, consuming
    /// through its end tag.
    fn raw_text(&mut self) -> fmt::Result {
        let mut nest = 0;
        while let Some((event, _)) = self.iter.next() {
            match event {
                Start(_) => nest += 1,
                End(_) => {
                    if nest == 0 {
                        break;
                    }
                    nest -= 1;
                }
                Html(_) => {}
                InlineHtml(text) | Code(text) | Text(text) => {
                    self.escape(&text)?;
                    self.end_newline = text.ends_with('\n');
                }
                InlineMath(text) => {
                    self.write("$")?;
                    self.escape(&text)?;
                    self.write("$")?;
                }
                DisplayMath(text) => {
                    self.write("$$")?;
                    self.escape(&text)?;
                    self.write("$$")?;
                }
                SoftBreak | HardBreak | Rule => self.write(" ")?,
                FootnoteReference(name) => {
                    let len = self.numbers.len() + 1;
                    let number = *self.numbers.entry(name).or_insert(len);
                    write!(self.buf, "[{number}]")?;
                }
                TaskListMarker(true) => self.write("[x]")?,
                TaskListMarker(false) => self.write("[ ]")?,
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::view::Segment;

    fn render(text: &str) -> (RenderPass, RenderContext) {
        let mut ctx = RenderContext::new();
        ctx.tracker.reset();
        let pass = Pipeline::default().render(text, &mut ctx);
        (pass, ctx)
    }

    #[test]
    fn line_index_maps_offsets() {
        let index = LineIndex::new("ab\ncd\n\nef");
        assert_eq!(index.line_of(0), 0);
        assert_eq!(index.line_of(2), 0);
        assert_eq!(index.line_of(3), 1);
        assert_eq!(index.line_of(6), 2);
        assert_eq!(index.line_of(7), 3);
    }

    #[test]
    fn blocks_carry_source_lines() {
        let (pass, _) = render("# Title\n\nfirst\n\n- a\n- b\n\n> quote\n");
        let markup = pass.document.to_markup(None);
        assert!(markup.contains(r#"<h1 data-source-line="0">Title</h1>"#));
        assert!(markup.contains(r#"<p data-source-line="2">first</p>"#));
        assert!(markup.contains(r#"<ul data-source-line="4">"#));
        assert!(markup.contains(r#"<li data-source-line="5">b</li>"#));
        assert!(markup.contains(r#"<blockquote data-source-line="7">"#));
        for line in [0, 2, 4, 5, 7] {
            assert_eq!(pass.document.nearest_anchor(line), Some(line), "missing anchor {line}");
        }
        assert_eq!(pass.document.nearest_anchor(1), Some(0));
    }

    #[test]
    fn highlight_lands_on_the_anchor_not_on_text() {
        let (pass, _) = render("see `data-source-line=\"2\"` here\n\nreal\n");
        let markup = pass.document.to_markup(Some(2));
        assert!(markup.contains(r#"<code>data-source-line="2"</code>"#));
        assert!(markup.contains(r#"<p data-source-line="2" class="line-highlighted">real</p>"#));
        assert_eq!(markup.matches("line-highlighted").count(), 1);
    }

    #[test]
    fn inline_math_is_synchronous() {
        let (pass, ctx) = render("where $x^2$ holds\n");
        assert!(pass.pending.is_empty());
        assert_eq!(ctx.tracker.active(), 0);
        let markup = pass.document.to_markup(None);
        assert!(markup.contains(r#"<span class="math math-inline"><math"#));
        assert_eq!(pass.document.placeholders().count(), 0);
    }

    #[test]
    fn bad_inline_math_degrades_to_marker() {
        let (pass, _) = render("broken $\\frac{a$ here\n\nnext\n");
        let markup = pass.document.to_markup(None);
        assert!(markup.contains(r#"<span class="math math-error math-inline" title=""#));
        assert!(markup.contains(r"<code>\frac{a</code></span>"));
        assert!(markup.contains(r#"<p data-source-line="2">next</p>"#));
    }

    #[test]
    fn display_math_becomes_placeholders() {
        let (pass, ctx) = render("$$a$$\n\ntext\n\n$$b \\\\ c$$\n");
        assert_eq!(pass.pending.len(), 2);
        assert_eq!(ctx.tracker.active(), 2);

        let ids: Vec<_> = pass.pending.iter().map(|p| p.id.clone()).collect();
        assert_ne!(ids[0], ids[1]);
        assert_eq!(pass.pending[0].request, RenderRequest::display("a"));
        assert_eq!(pass.pending[1].request, RenderRequest::display("b \\\\ c"));

        let nodes: Vec<_> = pass.document.placeholders().collect();
        assert_eq!(nodes.len(), 2);
        assert_eq!(nodes[0].id, ids[0]);
        assert!(!nodes[0].is_resolved());

        let markup = pass.document.to_markup(None);
        assert!(markup.contains(r#"class="latex-placeholder""#));
        assert!(markup.contains("height:50px"));
        assert!(markup.contains("height:74px"));
        assert!(matches!(pass.document.segments()[0], Segment::Markup(_)));
    }

    #[test]
    fn ids_stay_unique_across_passes() {
        let mut ctx = RenderContext::new();
        let pipeline = Pipeline::default();
        ctx.tracker.reset();
        let first = pipeline.render("$$a$$\n", &mut ctx);
        ctx.tracker.reset();
        let second = pipeline.render("$$a$$\n", &mut ctx);
        assert_ne!(first.pending[0].id, second.pending[0].id);
    }

    #[test]
    fn tables_and_tasks() {
        let (pass, _) = render("| a | b |\n|:--|--:|\n| 1 | 2 |\n\n- [x] done\n");
        let markup = pass.document.to_markup(None);
        assert!(markup.contains(r#"<table data-source-line="0">"#));
        assert!(markup.contains(r#"<th style="text-align: left">a</th>"#));
        assert!(markup.contains(r#"<td style="text-align: right">2</td>"#));
        assert!(markup.contains(r#"checked="""#));
    }

    #[test]
    fn image_alt_uses_raw_text() {
        let (pass, _) = render("![an *image*](pic.png \"t\")\n");
        let markup = pass.document.to_markup(None);
        assert!(markup.contains(r#"<img src="pic.png" alt="an image" title="t" />"#));
    }

    #[test]
    fn fenced_code_keeps_language() {
        let (pass, _) = render("text\n\n```rust\nfn main() {}\n```\n");
        let markup = pass.document.to_markup(None);
        assert!(markup.contains(r#"<pre data-source-line="2"><code class="language-rust">"#));
    }
}
