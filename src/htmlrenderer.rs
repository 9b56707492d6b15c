//! Implements a custom [`push_html`] for documentation pages.
//! [`pulldown_cmark::html::push_html`] can't attach classes to the markup it
//! emits, but the site's stylesheet expects tables wrapped in a responsive
//! container with fixed classes:
//!
//! ```html
//! <div class="table-responsive"><table class="table table-bordered table-striped"><thead>…</thead><tbody>…</tbody></table></div>
//! ```
//!
//! Headings also get an `id` so pages can link to sections, and fenced code
//! blocks get a `lang-<info>` class for the syntax highlighter.

use pulldown_cmark::escape::{escape_href, escape_html, StrWrite};
use pulldown_cmark::{Alignment, CodeBlockKind, CowStr, Event, LinkType, Tag};
use regex::Regex;
use std::io;
use std::sync::OnceLock;

enum TableState {
    Head,
    Body,
}

// A heading being rendered: where its `id` attribute goes once the text is
// known, and the text seen so far.
struct HeadingState {
    attribute_at: usize,
    text: String,
}

/// Renders markdown [`Event`]s into HTML. This is largely modeled after
/// [`pulldown_cmark`]'s private [`HtmlWriter`
/// struct](https://github.com/raphlinus/pulldown-cmark/blob/bf0a1a4938dbd2ec41c3add069b3d361d11731f4/src/html.rs#L36-L50).
struct HtmlRenderer {
    table_alignments: Vec<Alignment>,
    table_state: TableState,
    table_cell_index: usize,

    heading: Option<HeadingState>,

    /// How many images we're inside of. Everything within an image renders
    /// as plain text into its `alt` attribute.
    image_depth: usize,
}

impl<'a> HtmlRenderer {
    fn new() -> Self {
        HtmlRenderer {
            table_alignments: Vec::default(),
            table_state: TableState::Head,
            table_cell_index: usize::default(),
            heading: None,
            image_depth: 0,
        }
    }

    fn on_event(&mut self, w: &mut String, event: Event<'a>) -> io::Result<()> {
        if self.image_depth > 0 {
            return self.on_image_event(w, event);
        }
        match event {
            Event::Start(tag) => self.on_start(w, tag),
            Event::End(tag) => self.on_end(w, tag),
            Event::Code(code) => self.on_code(w, code),
            Event::FootnoteReference(name) => {
                w.write_str(r##"<sup class="footnote-reference"><a href="#"##)?;
                escape_html(&mut *w, &name)?;
                w.write_str(r#"">"#)?;
                escape_html(&mut *w, &name)?;
                w.write_str("</a></sup>")
            }
            Event::HardBreak => w.write_str("<br>\n"),
            Event::Html(html) => w.write_str(&html),
            Event::Rule => w.write_str("<hr>\n"),
            Event::SoftBreak => w.write_str("\n"),
            Event::TaskListMarker(checked) => write!(
                w,
                r#"<input disabled="" type="checkbox" {}/>"#,
                match checked {
                    true => r#"checked="" "#,
                    false => "",
                }
            ),
            Event::Text(text) => self.on_text(w, text),
        }
    }

    fn on_image_event(&mut self, w: &mut String, event: Event<'a>) -> io::Result<()> {
        match event {
            Event::Start(Tag::Image(..)) => {
                self.image_depth += 1;
                Ok(())
            }
            Event::End(Tag::Image(_, _, title)) => {
                self.image_depth -= 1;
                if self.image_depth > 0 {
                    return Ok(());
                }
                w.write_str("\"")?;
                if !title.is_empty() {
                    w.write_str(r#" title=""#)?;
                    escape_html(&mut *w, &title)?;
                    w.write_str("\"")?;
                }
                w.write_str(">")
            }
            Event::Text(text) | Event::Code(text) => escape_html(&mut *w, &text),
            _ => Ok(()),
        }
    }

    fn on_start(&mut self, w: &mut String, tag: Tag<'a>) -> io::Result<()> {
        match tag {
            Tag::BlockQuote => w.write_str("<blockquote>\n"),
            Tag::CodeBlock(kind) => match kind {
                CodeBlockKind::Fenced(info) => match info.split(' ').next() {
                    Some(lang) if !lang.is_empty() => {
                        w.write_str(r#"<pre><code class="lang-"#)?;
                        escape_html(&mut *w, lang)?;
                        w.write_str(r#"">"#)
                    }
                    _ => w.write_str("<pre><code>"),
                },
                CodeBlockKind::Indented => w.write_str("<pre><code>"),
            },
            Tag::Emphasis => w.write_str("<em>"),
            Tag::FootnoteDefinition(name) => {
                w.write_str(r#"<div class="footnote-definition" id=""#)?;
                escape_html(&mut *w, &name)?;
                w.write_str(r#"">"#)
            }
            Tag::Heading(level) => {
                write!(w, "<h{}", level)?;
                self.heading = Some(HeadingState {
                    attribute_at: w.len(),
                    text: String::new(),
                });
                w.write_str(">")
            }
            Tag::Image(_link_type, dest, _title) => {
                self.image_depth = 1;
                w.write_str(r#"<img src=""#)?;
                escape_href(&mut *w, &dest)?;
                w.write_str(r#"" alt=""#)
            }
            Tag::Item => w.write_str("<li>"),
            Tag::Link(link_type, dest, title) => {
                w.write_str(r#"<a href=""#)?;
                if let LinkType::Email = link_type {
                    w.write_str("mailto:")?;
                }
                escape_href(&mut *w, &dest)?;
                if !title.is_empty() {
                    w.write_str(r#"" title=""#)?;
                    escape_html(&mut *w, &title)?;
                }
                w.write_str(r#"">"#)
            }
            Tag::List(None) => w.write_str("<ul>\n"),
            Tag::List(Some(1)) => w.write_str("<ol>\n"),
            Tag::List(Some(start)) => write!(w, "<ol start=\"{}\">\n", start),
            Tag::Paragraph => w.write_str("<p>"),
            Tag::Strikethrough => w.write_str("<del>"),
            Tag::Strong => w.write_str("<strong>"),
            Tag::Table(alignments) => {
                self.table_alignments = alignments;
                w.write_str(concat!(
                    r#"<div class="table-responsive">"#,
                    r#"<table class="table table-bordered table-striped">"#,
                ))
            }
            Tag::TableHead => {
                self.table_state = TableState::Head;
                self.table_cell_index = 0;
                w.write_str("<thead><tr>")
            }
            Tag::TableRow => {
                self.table_cell_index = 0;
                w.write_str("<tr>")
            }
            Tag::TableCell => write!(
                w,
                "<{}{}>",
                match self.table_state {
                    TableState::Head => "th",
                    TableState::Body => "td",
                },
                match self.table_alignments.get(self.table_cell_index) {
                    Some(Alignment::Left) => r#" style="text-align:left""#,
                    Some(Alignment::Right) => r#" style="text-align:right""#,
                    Some(Alignment::Center) => r#" style="text-align:center""#,
                    _ => "",
                }
            ),
        }
    }

    fn on_end(&mut self, w: &mut String, tag: Tag) -> io::Result<()> {
        match tag {
            Tag::BlockQuote => w.write_str("</blockquote>\n"),
            Tag::CodeBlock(_) => w.write_str("</code></pre>\n"),
            Tag::Emphasis => w.write_str("</em>"),
            Tag::FootnoteDefinition(_) => w.write_str("</div>\n"),
            Tag::Heading(level) => {
                if let Some(heading) = self.heading.take() {
                    let id = heading_id(&heading.text);
                    w.insert_str(heading.attribute_at, &format!(r#" id="{}""#, id));
                }
                write!(w, "</h{}>\n", level)
            }
            Tag::Image(_, _, _) => Ok(()), // handled by on_image_event
            Tag::Item => w.write_str("</li>\n"),
            Tag::Link(_, _, _) => w.write_str("</a>"),
            Tag::List(Some(_)) => w.write_str("</ol>\n"),
            Tag::List(None) => w.write_str("</ul>\n"),
            Tag::Paragraph => w.write_str("</p>\n"),
            Tag::Strikethrough => w.write_str("</del>"),
            Tag::Strong => w.write_str("</strong>"),
            Tag::Table(_) => w.write_str("</tbody></table></div>\n"),
            Tag::TableHead => {
                self.table_state = TableState::Body;
                w.write_str("</tr></thead><tbody>")
            }
            Tag::TableRow => w.write_str("</tr>"),
            Tag::TableCell => {
                self.table_cell_index += 1;
                w.write_str(match self.table_state {
                    TableState::Head => "</th>",
                    TableState::Body => "</td>",
                })
            }
        }
    }

    fn on_text(&mut self, w: &mut String, s: CowStr) -> io::Result<()> {
        if let Some(heading) = &mut self.heading {
            heading.text.push_str(&s);
        }
        escape_html(&mut *w, &s)
    }

    fn on_code(&mut self, w: &mut String, s: CowStr) -> io::Result<()> {
        if let Some(heading) = &mut self.heading {
            heading.text.push_str(&s);
        }
        w.write_str("<code>")?;
        escape_html(&mut *w, &s)?;
        w.write_str("</code>")
    }
}

/// The `id` for a heading: its text lowercased with every run of non-word
/// characters replaced by `-`.
pub fn heading_id(text: &str) -> String {
    static NON_WORD: OnceLock<Regex> = OnceLock::new();
    let re = NON_WORD.get_or_init(|| {
        Regex::new("[^A-Za-z0-9_]+").expect("heading pattern is valid")
    });
    re.replace_all(&text.to_lowercase(), "-").into_owned()
}

/// Converts [`Event`]s into an HTML string much like
/// `pulldown_cmark::html::push_html` except for the table, heading, and code
/// block markup described in the module documentation.
pub fn push_html<'a, I>(out: &mut String, events: I) -> io::Result<()>
where
    I: Iterator<Item = Event<'a>>,
{
    let mut renderer = HtmlRenderer::new();
    for event in events {
        renderer.on_event(out, event)?;
    }
    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_heading_id() {
        assert_eq!(heading_id("Getting Started"), "getting-started");
        assert_eq!(heading_id("mark() & unmark()"), "mark-unmark-");
        assert_eq!(heading_id("options.accuracy"), "options-accuracy");
    }
}
