use serde::Serialize;
use std::fmt;

/// A base-36 short code produced by [`crate::codegen::hash`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct ShortCode(String);

impl ShortCode {
    pub(crate) fn new(code: String) -> Self {
        Self(code)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ShortCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One row of the newest / top lists.
///
/// `url` is `None` when the code is ranked but its mapping could not be
/// resolved. Serialized as a `[code, url]` pair.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(into = "(String, Option<String>)")]
pub struct RankedLink {
    pub code: String,
    pub url: Option<String>,
}

impl From<RankedLink> for (String, Option<String>) {
    fn from(link: RankedLink) -> Self {
        (link.code, link.url)
    }
}

/// Result of looking up a short code for a visit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Redirect(String),
    NotFound,
}
