//! The allowlists that define what user-authored content may contain.
//!
//! Everything here is static data, shared read-only by every sanitizer call
//! in the process. The lists are deny-by-default: a tag, attribute, url
//! scheme, or css property not named here does not survive sanitization, and
//! loosening that means editing this file, not threading configuration
//! through call sites.

/// Tags that survive sanitization. Everything else is unwrapped: the tag goes
/// away, its (sanitized) children stay.
pub const ALLOWED_TAGS: &[&str] = &[
    "h1", "h2", "h3", "h4", "h5", "h6",
    "p", "br", "hr",
    "strong", "em", "b", "i", "u", "s", "strike", "del", "ins",
    "blockquote", "q", "cite",
    "pre", "code", "kbd", "samp", "var",
    "ul", "ol", "li",
    "dl", "dt", "dd",
    "table", "thead", "tbody", "tfoot", "tr", "th", "td",
    "a", "img",
    "div", "span",
    "abbr", "acronym",
    "sup", "sub",
    "details", "summary",
];

/// Per-tag attribute allowlist. The `*` row applies to every allowed tag.
pub const ALLOWED_ATTRIBUTES: &[(&str, &[&str])] = &[
    ("*", &["class", "id", "style"]),
    ("a", &["href", "title", "rel", "target"]),
    ("img", &["src", "alt", "title", "width", "height"]),
    ("abbr", &["title"]),
    ("acronym", &["title"]),
    ("td", &["colspan", "rowspan"]),
    ("th", &["colspan", "rowspan", "scope"]),
    ("code", &["class"]),
    ("pre", &["class"]),
];

/// Attributes whose values are urls and therefore get scheme-checked.
pub const URL_ATTRIBUTES: &[&str] = &["href", "src"];

/// The only url schemes an href/src may carry. Relative urls have no scheme
/// and pass on that basis.
pub const ALLOWED_URL_SCHEMES: &[&str] = &["http", "https", "mailto", "ftp"];

/// The only declarations that survive inside a `style` attribute.
pub const ALLOWED_CSS_PROPERTIES: &[&str] = &["color", "background-color", "text-align"];

/// Subtrees the linkifier leaves alone. Literal urls in example code stay
/// literal.
pub const LINKIFY_SKIP_TAGS: &[&str] = &["pre", "code"];

/// True if `tag` (lowercase) may appear in sanitized output.
pub fn tag_allowed(tag: &str) -> bool {
    ALLOWED_TAGS.contains(&tag)
}

/// True if `attribute` (lowercase) may appear on `tag`.
pub fn attribute_allowed(tag: &str, attribute: &str) -> bool {
    ALLOWED_ATTRIBUTES
        .iter()
        .any(|(allowed_tag, attributes)| (*allowed_tag == "*" || *allowed_tag == tag) && attributes.contains(&attribute))
}

/// True if `attribute` holds a url we need to scheme-check.
pub fn url_attribute(attribute: &str) -> bool {
    URL_ATTRIBUTES.contains(&attribute)
}

/// True if a url carrying `scheme` (lowercase, as the url parser hands it
/// back) is allowed in content.
pub fn scheme_allowed(scheme: &str) -> bool {
    ALLOWED_URL_SCHEMES.contains(&scheme)
}

/// True if the css property `property` (lowercase) may survive in a `style`
/// attribute.
pub fn css_property_allowed(property: &str) -> bool {
    ALLOWED_CSS_PROPERTIES.contains(&property)
}

/// True if the linkifier should skip text inside `tag`.
pub fn linkify_skip_tag(tag: &str) -> bool {
    LINKIFY_SKIP_TAGS.contains(&tag)
}
