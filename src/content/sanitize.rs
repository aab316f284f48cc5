//! Reduce arbitrary html to the allowlisted subset.
//!
//! The input is parsed with a real html5 parser, filtered as a tree,
//! re-serialized, then parsed and serialized once more. The parser out front
//! is what makes the guarantees hold: entity-encoded or case-spoofed trickery
//! ("JaVaScRiPt:", "java&#10;script:") is already decoded by the time we look
//! at it, and everything that survives is re-emitted by a serializer that
//! escapes properly. The second round pins the output to what the parser makes
//! of it, so sanitizing twice changes nothing.
//!
//! Disallowed elements unwrap rather than truncate: the tag is discarded, its
//! sanitized children stay. Somebody pasting `<blink>important note</blink>`
//! loses the blink, not the note. Comments, doctypes, and processing
//! instructions are dropped outright, as is anything not in the html
//! namespace.
//!
//! Nothing in here returns an error. Unsalvageable input degrades to an empty
//! string rather than surfacing to the caller.

use crate::content::{policy, SafeHtml};
use html5ever::serialize::{serialize, SerializeOpts, TraversalScope};
use html5ever::tendril::TendrilSink;
use html5ever::{local_name, namespace_url, ns, parse_fragment, Attribute, ParseOpts, QualName};
use markup5ever_rcdom::{Handle, NodeData, RcDom, SerializableHandle};
use std::cell::RefCell;
use url::Url;

/// Elements nested deeper than this are treated as hostile and dropped
/// whole. Legitimate documents come nowhere near it; a parser bomb does.
const MAX_DEPTH: usize = 256;

/// Reduce `html` to the allowlisted subset. Total: any input produces safe
/// output, and anything unsalvageable produces an empty string.
pub fn sanitize(html: &str) -> SafeHtml {
    if html.is_empty() {
        return SafeHtml::from_string(String::new());
    }
    let dom = parse_fragment_dom(html);
    let root = match fragment_root(&dom) {
        Some(root) => root,
        None => return SafeHtml::from_string(String::new()),
    };
    let kept = sanitize_children(&root, 0);
    *root.children.borrow_mut() = kept;
    let out = serialize_children(&root).and_then(|filtered| reparse(&filtered));
    match out {
        Some(out) => SafeHtml::from_string(out),
        None => SafeHtml::from_string(String::new()),
    }
}

/// Parse an html fragment the way it would parse inside a `<div>`.
pub(crate) fn parse_fragment_dom(html: &str) -> RcDom {
    parse_fragment(
        RcDom::default(),
        ParseOpts::default(),
        QualName::new(None, ns!(html), local_name!("div")),
        vec![],
    )
    .one(html)
}

/// The synthetic root element the fragment parser wraps its output in.
pub(crate) fn fragment_root(dom: &RcDom) -> Option<Handle> {
    dom.document.children.borrow().first().cloned()
}

/// Serialize the children of `root` back to an html string.
pub(crate) fn serialize_children(root: &Handle) -> Option<String> {
    let opts = SerializeOpts {
        traversal_scope: TraversalScope::ChildrenOnly(None),
        ..Default::default()
    };
    let serializable: SerializableHandle = root.clone().into();
    let mut buf = Vec::new();
    serialize(&mut buf, &serializable, opts).ok()?;
    String::from_utf8(buf).ok()
}

/// Parse already-filtered markup once more and serialize what the parser
/// makes of it. Unwrapping can leave content where the parser would move it
/// (non-whitespace text directly inside a `<table>` is foster-parented in
/// front of the table, a newline at the head of a `<pre>` is dropped), so
/// that move happens here and the output parses back to itself.
fn reparse(html: &str) -> Option<String> {
    let dom = parse_fragment_dom(html);
    let root = fragment_root(&dom)?;
    serialize_children(&root)
}

/// Walk the children of `node` and build their replacement list: allowed
/// elements are kept (with filtered attributes and recursively sanitized
/// children), disallowed elements are unwrapped into their sanitized
/// children, text survives, everything else disappears.
fn sanitize_children(node: &Handle, depth: usize) -> Vec<Handle> {
    if depth > MAX_DEPTH {
        return Vec::new();
    }
    let snapshot: Vec<Handle> = node.children.borrow().clone();
    let mut kept = Vec::new();
    for child in snapshot {
        match child.data {
            NodeData::Element { ref name, ref attrs, .. } => {
                let tag = name.local.as_ref();
                if name.ns == ns!(html) && policy::tag_allowed(tag) {
                    filter_attributes(tag, attrs);
                    let grandchildren = sanitize_children(&child, depth + 1);
                    *child.children.borrow_mut() = grandchildren;
                    kept.push(child.clone());
                } else {
                    let mut unwrapped = sanitize_children(&child, depth + 1);
                    kept.append(&mut unwrapped);
                }
            }
            NodeData::Text { .. } => kept.push(child.clone()),
            NodeData::Comment { .. }
            | NodeData::Doctype { .. }
            | NodeData::ProcessingInstruction { .. }
            | NodeData::Document => {}
        }
    }
    kept
}

/// Strip an element's attributes down to what the policy allows on `tag`.
/// Url-bearing attributes must carry an allowed scheme or no scheme at all;
/// style attributes keep only allowlisted declarations and vanish if nothing
/// survives.
fn filter_attributes(tag: &str, attrs: &RefCell<Vec<Attribute>>) {
    let mut kept = Vec::new();
    for attr in attrs.borrow().iter() {
        if attr.name.ns != ns!() {
            continue;
        }
        let attr_name = attr.name.local.as_ref();
        if !policy::attribute_allowed(tag, attr_name) {
            continue;
        }
        if policy::url_attribute(attr_name) {
            if url_allowed(attr.value.as_ref()) {
                kept.push(attr.clone());
            }
        } else if attr_name == "style" {
            let filtered = filter_css(attr.value.as_ref());
            if !filtered.is_empty() {
                kept.push(Attribute {
                    name: attr.name.clone(),
                    value: filtered.as_str().into(),
                });
            }
        } else {
            kept.push(attr.clone());
        }
    }
    *attrs.borrow_mut() = kept;
}

/// Decide whether an href/src value may keep its attribute. Relative urls
/// have no scheme to judge and pass. Absolute ones are parsed under the
/// WHATWG rules, which strip embedded tabs/newlines and lowercase the
/// scheme, so the spoofed spellings land on the same scheme string the
/// policy rejects.
fn url_allowed(value: &str) -> bool {
    match Url::parse(value) {
        Ok(url) => policy::scheme_allowed(url.scheme()),
        Err(url::ParseError::RelativeUrlWithoutBase) => true,
        Err(_) => false,
    }
}

/// Filter a `style` attribute value down to allowlisted declarations with
/// inert values. The output is normalized (`prop: value; prop: value`),
/// which is its own fixpoint.
fn filter_css(style: &str) -> String {
    let mut kept: Vec<String> = Vec::new();
    for declaration in style.split(';') {
        let Some((property, value)) = declaration.split_once(':') else {
            continue;
        };
        let property = property.trim().to_ascii_lowercase();
        let value = value.trim();
        if policy::css_property_allowed(&property) && css_value_inert(value) {
            kept.push(format!("{}: {}", property, value));
        }
    }
    kept.join("; ")
}

/// A css value is inert if it can't smuggle anything: no urls, no legacy
/// expression() tricks, no escapes or quotes, just the characters colors and
/// alignment keywords are made of.
fn css_value_inert(value: &str) -> bool {
    if value.is_empty() {
        return false;
    }
    let lowered = value.to_ascii_lowercase();
    if lowered.contains("url(") || lowered.contains("expression(") || lowered.contains("javascript") {
        return false;
    }
    value
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, ' ' | '#' | '%' | '(' | ')' | ',' | '.' | '-'))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn clean(html: &str) -> String {
        sanitize(html).into()
    }

    #[test]
    fn plain_text_and_allowed_markup_pass() {
        assert_eq!(clean("hello world"), "hello world");
        assert_eq!(clean("<p>hi <strong>there</strong></p>"), "<p>hi <strong>there</strong></p>");
        assert_eq!(clean("<blockquote><p>wise words</p></blockquote>"), "<blockquote><p>wise words</p></blockquote>");
        assert_eq!(clean(""), "");
    }

    #[test]
    fn script_is_stripped_text_is_kept() {
        let out = clean("<p>hi<script>alert(1)</script></p>");
        assert!(!out.contains("<script"));
        assert!(out.contains("hi"));
        // unwrap policy: the script's raw text survives as inert text
        assert_eq!(out, "<p>hialert(1)</p>");
    }

    #[test]
    fn javascript_href_is_dropped() {
        assert_eq!(clean(r#"<a href="javascript:alert(1)">x</a>"#), "<a>x</a>");
        // case spoofing
        assert_eq!(clean(r#"<a href="JaVaScRiPt:alert(1)">x</a>"#), "<a>x</a>");
        // entity-encoded newline inside the scheme
        assert_eq!(clean(r#"<a href="java&#10;script:alert(1)">x</a>"#), "<a>x</a>");
        // tab inside the scheme
        assert_eq!(clean("<a href=\"java\tscript:alert(1)\">x</a>"), "<a>x</a>");
    }

    #[test]
    fn good_urls_are_kept() {
        assert_eq!(
            clean(r#"<a href="https://example.com/papers/1">p</a>"#),
            r#"<a href="https://example.com/papers/1">p</a>"#
        );
        assert_eq!(clean(r#"<a href="/papers/12">p</a>"#), r#"<a href="/papers/12">p</a>"#);
        assert_eq!(clean(r##"<a href="#section-2">s</a>"##), r##"<a href="#section-2">s</a>"##);
        assert_eq!(
            clean(r#"<a href="mailto:team@example.com">m</a>"#),
            r#"<a href="mailto:team@example.com">m</a>"#
        );
        assert_eq!(
            clean(r#"<a href="ftp://mirror.example.com/f.tar">f</a>"#),
            r#"<a href="ftp://mirror.example.com/f.tar">f</a>"#
        );
    }

    #[test]
    fn event_handlers_are_dropped() {
        assert_eq!(clean(r#"<p onclick="steal()" class="note">t</p>"#), r#"<p class="note">t</p>"#);
        assert_eq!(
            clean(r#"<img src="https://x.test/y.png" alt="pic" onerror="hack()">"#),
            r#"<img src="https://x.test/y.png" alt="pic">"#
        );
    }

    #[test]
    fn data_urls_are_dropped_from_img() {
        assert_eq!(clean(r#"<img src="data:image/png;base64,AAAA" alt="p">"#), r#"<img alt="p">"#);
        assert_eq!(clean(r#"<img src="uploads/fig.png" alt="p">"#), r#"<img src="uploads/fig.png" alt="p">"#);
    }

    #[test]
    fn unknown_elements_unwrap() {
        assert_eq!(clean("<blink>neat</blink>"), "neat");
        assert_eq!(clean(r#"<form action="/steal"><input name="a">text</form>"#), "text");
        let out = clean(r#"<iframe src="https://evil.test">fallback</iframe>"#);
        assert!(!out.contains("<iframe"));
        assert_eq!(out, "fallback");
    }

    #[test]
    fn foreign_content_unwraps() {
        let out = clean("<svg><script>alert(1)</script></svg>");
        assert!(!out.contains("<svg"));
        assert!(!out.contains("<script"));
        let out = clean("<math><mi>x</mi></math>");
        assert!(!out.contains("<math"));
        assert!(out.contains('x'));
    }

    #[test]
    fn style_attribute_is_filtered() {
        assert_eq!(clean(r#"<p style="color: red; position: fixed">x</p>"#), r#"<p style="color: red">x</p>"#);
        assert_eq!(clean(r#"<p style="position: fixed">x</p>"#), "<p>x</p>");
        assert_eq!(
            clean(r#"<span style="background-color: #ff0; text-align: center">y</span>"#),
            r#"<span style="background-color: #ff0; text-align: center">y</span>"#
        );
    }

    #[test]
    fn style_cannot_smuggle() {
        assert_eq!(clean(r#"<p style="color: url(javascript:1)">x</p>"#), "<p>x</p>");
        assert_eq!(clean(r#"<p style="color: expression(alert(1))">x</p>"#), "<p>x</p>");
        assert_eq!(clean(r#"<p style="color: red&quot;><script>alert(1)</script>">x</p>"#), "<p>x</p>");
    }

    #[test]
    fn comments_and_doctypes_are_dropped() {
        assert_eq!(clean("<p>a<!-- sneaky --></p>"), "<p>a</p>");
        assert_eq!(clean("<!DOCTYPE html><p>b</p>"), "<p>b</p>");
    }

    #[test]
    fn table_attributes_follow_the_per_tag_policy() {
        assert_eq!(
            clean(r#"<table><tbody><tr><td colspan="2">x</td></tr></tbody></table>"#),
            r#"<table><tbody><tr><td colspan="2">x</td></tr></tbody></table>"#
        );
        // scope is allowed on th but not td
        assert_eq!(
            clean(r#"<table><tbody><tr><td scope="row">x</td></tr></tbody></table>"#),
            "<table><tbody><tr><td>x</td></tr></tbody></table>"
        );
        assert_eq!(
            clean(r#"<table><thead><tr><th scope="col">x</th></tr></thead></table>"#),
            r#"<table><thead><tr><th scope="col">x</th></tr></thead></table>"#
        );
    }

    #[test]
    fn parser_repairs_are_stable() {
        assert_eq!(clean("<div><p>deep <em>stack"), "<div><p>deep <em>stack</em></p></div>");
        // loose table parts get repaired or dropped, either way deterministically
        assert_eq!(clean("<table><tr><td>a"), "<table><tbody><tr><td>a</td></tr></tbody></table>");
    }

    #[test]
    fn entities_stay_escaped() {
        assert_eq!(clean("Tom &amp; Jerry"), "Tom &amp; Jerry");
        assert_eq!(clean("&lt;script&gt;"), "&lt;script&gt;");
    }

    #[test]
    fn null_bytes_do_not_panic() {
        let out = clean("a\u{0}b");
        assert!(out.contains('a'));
        assert!(out.contains('b'));
    }

    #[test]
    fn absurd_nesting_does_not_blow_the_stack() {
        let mut bomb = String::new();
        for _ in 0..5000 {
            bomb.push_str("<div>");
        }
        bomb.push_str("boom");
        let out = clean(&bomb);
        assert!(out.starts_with("<div>"));
        // and a second pass agrees with the first
        assert_eq!(clean(&out), out);
    }

    #[test]
    fn unwraps_inside_tables_stay_idempotent() {
        // a script parses as a table child, so its unwrapped text starts out
        // inside the table and the parser fosters it out front on re-read
        let once = clean("<table><script>alert(1)</script></table>");
        assert_eq!(once, "alert(1)<table></table>");
        assert_eq!(clean(&once), once);

        let once = clean("<table><caption>cap</caption><tbody><tr><td>a</td></tr></tbody></table>");
        assert_eq!(once, "cap<table><tbody><tr><td>a</td></tr></tbody></table>");
        assert_eq!(clean(&once), once);
    }

    #[test]
    fn sanitize_is_idempotent() {
        let battery = [
            "hello",
            "<p>hi<script>alert(1)</script></p>",
            r#"<a href="javascript:alert(1)">x</a>"#,
            r#"<a href="https://example.com">link</a> and <b>bold</b>"#,
            "<table><tr><td>a</td></tr></table>",
            "<table><script>alert(1)</script></table>",
            "<table><caption>cap</caption><tbody><tr><td>a</td></tr></tbody></table>",
            "<pre><blink>\nboo</blink></pre>",
            "<div><p>deep <em>stack",
            "Tom &amp; Jerry &lt;3",
            r#"<img src="data:text/html,x" onerror="y">"#,
            r#"<p style="color: red; position: fixed">styled</p>"#,
            "<ul><li>one<li>two</ul>",
            "<blink><marquee>old web</marquee></blink>",
            "<details><summary>spoiler</summary>hidden</details>",
            "<svg><script>alert(1)</script></svg>",
            "<p>a<!-- c --></p>",
        ];
        for input in battery {
            let once: String = sanitize(input).into();
            let twice: String = sanitize(&once).into();
            assert_eq!(once, twice, "sanitize not idempotent for {:?}", input);
        }
    }
}
