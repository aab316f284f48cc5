//! Render author markup to html.
//!
//! Commonmark plus the extensions the platform has always offered: tables,
//! strikethrough, smart punctuation, and single newlines becoming hard
//! breaks. Headings get a stable `id` slug and a trailing `&para;` permalink
//! anchor; fenced code blocks get a `<pre class="highlight">` wrapper with a
//! `language-*` class so client-side highlighters have something to hang on
//! to.
//!
//! The output here is *untrusted*. Authors can embed raw html and this stage
//! passes it straight through. Nothing leaves the pipeline without going
//! through [`sanitize`](crate::content::sanitize) first.

use pulldown_cmark::{html, CodeBlockKind, Event, HeadingLevel, Options, Parser, Tag, TagEnd};
use std::collections::HashSet;

/// Render markup to raw, unsanitized html. Empty input renders to an empty
/// string.
pub fn render(markup: &str) -> String {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_TABLES);
    options.insert(Options::ENABLE_STRIKETHROUGH);
    options.insert(Options::ENABLE_SMART_PUNCTUATION);
    let events = decorate(Parser::new_ext(markup, options));
    let mut out = String::new();
    html::push_html(&mut out, events.into_iter());
    out
}

/// Rewrite the event stream: breaks hardened, headings decorated, code
/// blocks wrapped. Heading contents are buffered so the slug can be computed
/// from the finished text.
fn decorate(parser: Parser<'_>) -> Vec<Event<'_>> {
    let mut events: Vec<Event> = Vec::new();
    let mut used_slugs: HashSet<String> = HashSet::new();
    let mut heading: Option<(HeadingLevel, Vec<Event>)> = None;
    for event in parser {
        match event {
            Event::Start(Tag::Heading { level, .. }) => {
                heading = Some((level, Vec::new()));
            }
            Event::End(TagEnd::Heading(_)) => {
                if let Some((level, inner)) = heading.take() {
                    emit_heading(&mut events, &mut used_slugs, level, inner);
                }
            }
            other if heading.is_some() => {
                let buffered = match other {
                    Event::SoftBreak => Event::HardBreak,
                    event => event,
                };
                if let Some((_, inner)) = heading.as_mut() {
                    inner.push(buffered);
                }
            }
            Event::Start(Tag::CodeBlock(kind)) => {
                let open = match kind {
                    CodeBlockKind::Fenced(info) => match code_language(&info) {
                        Some(lang) => {
                            format!("<pre class=\"highlight\"><code class=\"language-{}\">", lang)
                        }
                        None => String::from("<pre class=\"highlight\"><code>"),
                    },
                    CodeBlockKind::Indented => String::from("<pre class=\"highlight\"><code>"),
                };
                events.push(Event::Html(open.into()));
            }
            Event::End(TagEnd::CodeBlock) => {
                events.push(Event::Html("</code></pre>\n".into()));
            }
            Event::SoftBreak => events.push(Event::HardBreak),
            other => events.push(other),
        }
    }
    events
}

fn emit_heading<'a>(
    events: &mut Vec<Event<'a>>,
    used_slugs: &mut HashSet<String>,
    level: HeadingLevel,
    inner: Vec<Event<'a>>,
) {
    let tag = heading_tag(level);
    match unique_slug(used_slugs, &heading_text(&inner)) {
        Some(slug) => {
            events.push(Event::Html(format!("<{} id=\"{}\">", tag, slug).into()));
            events.extend(inner);
            events.push(Event::Html(
                format!(
                    "<a class=\"toc-link\" href=\"#{}\" title=\"Permanent link\">&para;</a></{}>\n",
                    slug, tag
                )
                .into(),
            ));
        }
        // nothing sluggable in the heading, emit it bare
        None => {
            events.push(Event::Html(format!("<{}>", tag).into()));
            events.extend(inner);
            events.push(Event::Html(format!("</{}>\n", tag).into()));
        }
    }
}

fn heading_tag(level: HeadingLevel) -> &'static str {
    match level {
        HeadingLevel::H1 => "h1",
        HeadingLevel::H2 => "h2",
        HeadingLevel::H3 => "h3",
        HeadingLevel::H4 => "h4",
        HeadingLevel::H5 => "h5",
        HeadingLevel::H6 => "h6",
    }
}

/// The visible text of a heading, for slugging. Inline code counts as text,
/// formatting does not.
fn heading_text(inner: &[Event]) -> String {
    let mut text = String::new();
    for event in inner {
        match event {
            Event::Text(t) | Event::Code(t) => text.push_str(t),
            Event::SoftBreak | Event::HardBreak => text.push(' '),
            _ => {}
        }
    }
    text
}

/// Lowercase, keep letters, digits and underscores, collapse runs of
/// whitespace and dashes into single dashes, drop everything else.
fn slugify(text: &str) -> String {
    let mut slug = String::new();
    let mut pending_dash = false;
    for c in text.trim().chars() {
        if c.is_alphanumeric() || c == '_' {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            for lower in c.to_lowercase() {
                slug.push(lower);
            }
        } else if c.is_whitespace() || c == '-' {
            pending_dash = true;
        }
    }
    slug
}

/// Slug for one heading, deduplicated against the ones already handed out
/// in this document. Repeats get an `_1`, `_2` suffix.
fn unique_slug(used: &mut HashSet<String>, text: &str) -> Option<String> {
    let base = slugify(text);
    if base.is_empty() {
        return None;
    }
    let mut slug = base.clone();
    let mut n = 1;
    while !used.insert(slug.clone()) {
        slug = format!("{}_{}", base, n);
        n += 1;
    }
    Some(slug)
}

/// First token of a fence info string, reduced to characters that can sit in
/// a class name.
fn code_language(info: &str) -> Option<String> {
    let token = info.split_whitespace().next()?;
    let lang: String = token
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '_' | '#' | '.'))
        .collect();
    if lang.is_empty() {
        None
    } else {
        Some(lang)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_renders_empty() {
        assert_eq!(render(""), "");
        assert_eq!(render("   \n  "), "");
    }

    #[test]
    fn paragraphs_render() {
        assert_eq!(render("hi im jerry"), "<p>hi im jerry</p>\n");
    }

    #[test]
    fn headings_get_ids_and_permalinks() {
        assert_eq!(
            render("## Getting Started"),
            "<h2 id=\"getting-started\">Getting Started\
<a class=\"toc-link\" href=\"#getting-started\" title=\"Permanent link\">&para;</a></h2>\n"
        );
    }

    #[test]
    fn duplicate_headings_get_suffixed_slugs() {
        let out = render("## Notes\n\n## Notes\n\n## Notes\n");
        assert!(out.contains("id=\"notes\""));
        assert!(out.contains("id=\"notes_1\""));
        assert!(out.contains("id=\"notes_2\""));
    }

    #[test]
    fn heading_slugs_see_through_formatting() {
        let out = render("## Using `get_job`!");
        assert!(out.contains("<h2 id=\"using-get_job\">"));
        assert!(out.contains("<code>get_job</code>"));
    }

    #[test]
    fn unsluggable_heading_is_bare() {
        assert_eq!(render("## !!!"), "<h2>!!!</h2>\n");
    }

    #[test]
    fn single_newlines_become_breaks() {
        let out = render("line one\nline two");
        assert!(out.contains("<br />"));
    }

    #[test]
    fn fenced_code_gets_the_highlight_wrapper() {
        assert_eq!(
            render("```rust\nlet x = 1;\n```\n"),
            "<pre class=\"highlight\"><code class=\"language-rust\">let x = 1;\n</code></pre>\n"
        );
        assert_eq!(
            render("```\nplain\n```\n"),
            "<pre class=\"highlight\"><code>plain\n</code></pre>\n"
        );
    }

    #[test]
    fn code_block_content_is_escaped_not_parsed() {
        let out = render("```\n<script>alert(1)</script>\n# not a heading\n```\n");
        assert!(out.contains("&lt;script&gt;"));
        assert!(out.contains("# not a heading"));
        assert!(!out.contains("<h1"));
    }

    #[test]
    fn fence_info_is_reduced_to_a_class_token() {
        let out = render("```c++ extra words\nint x;\n```\n");
        assert!(out.contains("class=\"language-c++\""));
        let out = render("```\"><script>\nx\n```\n");
        assert!(out.contains("class=\"language-script\""));
        assert!(!out.contains("<script"));
        let out = render("```<>!\nx\n```\n");
        assert!(out.contains("<pre class=\"highlight\"><code>x"));
    }

    #[test]
    fn tables_render() {
        let out = render("| a | b |\n| --- | --- |\n| 1 | 2 |\n");
        assert!(out.contains("<table>"));
        assert!(out.contains("<th>a</th>"));
        assert!(out.contains("<td>1</td>"));
    }

    #[test]
    fn aligned_tables_carry_text_align_styles() {
        let out = render("| a |\n| :--- |\n| 1 |\n");
        assert!(out.contains("text-align: left"));
    }

    #[test]
    fn strikethrough_renders() {
        let out = render("~~nice marmot~~");
        assert!(out.contains("<del>nice marmot</del>"));
    }

    #[test]
    fn smart_punctuation_is_on() {
        let out = render("\"ZONING IS COMMUNISM\"");
        assert!(out.contains('\u{201c}'));
        assert!(out.contains('\u{201d}'));
    }

    #[test]
    fn raw_html_passes_through() {
        let out = render("before\n\n<div class=\"x\">raw</div>\n\nafter");
        assert!(out.contains("<div class=\"x\">raw</div>"));
    }

    #[test]
    fn rendering_is_stateless() {
        let a = render("## Same Doc\n");
        let b = render("## Other\n");
        let c = render("## Same Doc\n");
        assert_eq!(a, c);
        assert_ne!(a, b);
        // slugs do not leak across calls
        assert!(!c.contains("same-doc_1"));
    }
}
