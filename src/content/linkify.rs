//! Turn bare urls in already-sanitized html into guarded anchors.
//!
//! Two jobs in one pass over the tree. Text that looks like a url
//! (`http://`, `https://`, `ftp://`, or a `www.` host) becomes an anchor,
//! except inside `<pre>`/`<code>`, where prose about urls stays prose. And
//! every anchor in the document, pre-existing or freshly made, gets
//! `rel="noopener noreferrer"` and `target="_blank"`, overwriting whatever
//! was there.
//!
//! Bare email addresses are left alone.
//!
//! This runs on [`SafeHtml`] only. If anything goes sideways internally the
//! input comes back unchanged, which is still safe output.

use crate::content::sanitize::{fragment_root, parse_fragment_dom, serialize_children};
use crate::content::{policy, SafeHtml};
use html5ever::tendril::StrTendril;
use html5ever::{local_name, namespace_url, ns, Attribute, LocalName, QualName};
use markup5ever_rcdom::{Handle, Node, NodeData};
use std::cell::RefCell;
use url::Url;

const ANCHOR_REL: &str = "noopener noreferrer";
const ANCHOR_TARGET: &str = "_blank";

const URL_PREFIXES: &[&str] = &["http://", "https://", "ftp://", "www."];

/// Link up bare urls and force the guard attributes onto every anchor.
pub fn linkify(html: &SafeHtml) -> SafeHtml {
    if html.as_str().is_empty() {
        return html.clone();
    }
    let dom = parse_fragment_dom(html.as_str());
    let root = match fragment_root(&dom) {
        Some(root) => root,
        None => return html.clone(),
    };
    linkify_children(&root, false);
    match serialize_children(&root) {
        Some(out) => SafeHtml::from_string(out),
        None => html.clone(),
    }
}

fn linkify_children(node: &Handle, skip: bool) {
    let snapshot: Vec<Handle> = node.children.borrow().clone();
    let mut rebuilt: Vec<Handle> = Vec::new();
    let mut changed = false;
    for child in snapshot {
        match child.data {
            NodeData::Element { ref name, ref attrs, .. } => {
                if name.ns == ns!(html) && name.local == local_name!("a") {
                    force_anchor_guards(attrs);
                    // no links inside links
                    linkify_children(&child, true);
                } else {
                    let child_skip = skip || policy::linkify_skip_tag(name.local.as_ref());
                    linkify_children(&child, child_skip);
                }
                rebuilt.push(child.clone());
            }
            NodeData::Text { ref contents } if !skip => {
                let text = contents.borrow().to_string();
                match split_link_segments(&text) {
                    Some(segments) => {
                        changed = true;
                        for segment in segments {
                            match segment {
                                Segment::Text(t) => rebuilt.push(new_text(&t)),
                                Segment::Link { href, display } => {
                                    rebuilt.push(new_anchor(&href, &display))
                                }
                            }
                        }
                    }
                    None => rebuilt.push(child.clone()),
                }
            }
            _ => rebuilt.push(child.clone()),
        }
    }
    if changed {
        *node.children.borrow_mut() = rebuilt;
    }
}

fn force_anchor_guards(attrs: &RefCell<Vec<Attribute>>) {
    set_attribute(attrs, local_name!("rel"), ANCHOR_REL);
    set_attribute(attrs, local_name!("target"), ANCHOR_TARGET);
}

fn set_attribute(attrs: &RefCell<Vec<Attribute>>, local: LocalName, value: &str) {
    let mut attrs = attrs.borrow_mut();
    for attr in attrs.iter_mut() {
        if attr.name.ns == ns!() && attr.name.local == local {
            attr.value = value.into();
            return;
        }
    }
    attrs.push(Attribute {
        name: QualName::new(None, ns!(), local),
        value: value.into(),
    });
}

enum Segment {
    Text(String),
    Link { href: String, display: String },
}

/// Split a text run around the urls it contains. `None` means no url was
/// found and the node can stay as it is.
fn split_link_segments(text: &str) -> Option<Vec<Segment>> {
    let mut segments = Vec::new();
    let mut taken = 0;
    let mut search = 0;
    while let Some((start, end)) = next_url(text, search) {
        let candidate = &text[start..end];
        let href = if candidate.len() >= 4 && candidate[..4].eq_ignore_ascii_case("www.") {
            format!("http://{}", candidate)
        } else {
            candidate.to_string()
        };
        if Url::parse(&href).is_ok() {
            if start > taken {
                segments.push(Segment::Text(text[taken..start].to_string()));
            }
            segments.push(Segment::Link {
                href,
                display: candidate.to_string(),
            });
            taken = end;
            search = end;
        } else {
            search = start + 1;
        }
    }
    if segments.is_empty() {
        return None;
    }
    if taken < text.len() {
        segments.push(Segment::Text(text[taken..].to_string()));
    }
    Some(segments)
}

/// Find the next url-shaped span at or after `from`. The span must start at
/// a word boundary and gets trailing punctuation trimmed off.
fn next_url(text: &str, from: usize) -> Option<(usize, usize)> {
    let lowered = text.to_ascii_lowercase();
    let mut at = from;
    while at < text.len() {
        let start = URL_PREFIXES
            .iter()
            .filter_map(|prefix| lowered[at..].find(prefix).map(|i| at + i))
            .min()?;
        if !starts_at_boundary(text, start) {
            at = start + 1;
            continue;
        }
        let end = trim_trailing(text, start, candidate_end(text, start));
        if end > start {
            return Some((start, end));
        }
        at = start + 1;
    }
    None
}

/// A url may not continue a word. The `@` exclusion is what keeps email
/// addresses like `bob@www.example.com` from being half-linkified.
fn starts_at_boundary(text: &str, start: usize) -> bool {
    match text[..start].chars().next_back() {
        None => true,
        Some(prev) => !(prev.is_alphanumeric() || matches!(prev, '.' | '-' | '_' | '@' | '/' | ':')),
    }
}

fn candidate_end(text: &str, start: usize) -> usize {
    let mut end = start;
    for c in text[start..].chars() {
        if c.is_whitespace() || matches!(c, '<' | '>' | '"') {
            break;
        }
        end += c.len_utf8();
    }
    end
}

/// Strip sentence punctuation off the end of a candidate. A closing paren
/// only comes off while the candidate has more closers than openers, so
/// parenthesized path segments survive but a wrapping paren does not.
fn trim_trailing(text: &str, start: usize, mut end: usize) -> usize {
    loop {
        let candidate = &text[start..end];
        let Some(last) = candidate.chars().next_back() else {
            return end;
        };
        let trim = match last {
            '.' | ',' | ';' | ':' | '!' | '?' | '\'' => true,
            ')' => candidate.matches(')').count() > candidate.matches('(').count(),
            _ => false,
        };
        if !trim {
            return end;
        }
        end -= last.len_utf8();
    }
}

fn new_text(text: &str) -> Handle {
    Node::new(NodeData::Text {
        contents: RefCell::new(StrTendril::from(text)),
    })
}

fn new_anchor(href: &str, display: &str) -> Handle {
    let attrs = vec![
        Attribute {
            name: QualName::new(None, ns!(), local_name!("href")),
            value: href.into(),
        },
        Attribute {
            name: QualName::new(None, ns!(), local_name!("rel")),
            value: ANCHOR_REL.into(),
        },
        Attribute {
            name: QualName::new(None, ns!(), local_name!("target")),
            value: ANCHOR_TARGET.into(),
        },
    ];
    let anchor = Node::new(NodeData::Element {
        name: QualName::new(None, ns!(html), local_name!("a")),
        attrs: RefCell::new(attrs),
        template_contents: RefCell::new(None),
        mathml_annotation_xml_integration_point: false,
    });
    anchor.children.borrow_mut().push(new_text(display));
    anchor
}
