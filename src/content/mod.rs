//! The content-trust pipeline.
//!
//! Author-submitted markup is untrusted from the moment it arrives until the
//! moment it leaves [`render_and_sanitize`]. Rendering happens first and is
//! deliberately naive about safety; sanitization reduces the result to an
//! allowlisted subset of html; linkification runs last, on clean markup
//! only, and adds its own guarded anchors. The type system enforces the
//! ordering: [`sanitize`] is the only way to mint a [`SafeHtml`], and
//! [`linkify`] accepts nothing else.

use serde_derive::{Deserialize, Serialize};
use std::fmt;
use std::ops::Deref;

mod linkify;
mod policy;
mod render;
mod sanitize;

pub use linkify::*;
pub use policy::*;
pub use render::*;
pub use sanitize::*;

/// Html that has been through the sanitizer and is safe to store and serve
/// as-is. Construction outside this module goes through [`sanitize`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SafeHtml(String);

impl SafeHtml {
    pub(crate) fn from_string(html: String) -> Self {
        Self(html)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Deref for SafeHtml {
    type Target = str;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl fmt::Display for SafeHtml {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<SafeHtml> for String {
    fn from(html: SafeHtml) -> Self {
        html.0
    }
}

/// The full pipeline: render the markup, sanitize the result, link up bare
/// urls. This is the one call sites should reach for.
pub fn render_and_sanitize(markup: &str) -> SafeHtml {
    linkify(&sanitize(&render(markup)))
}
