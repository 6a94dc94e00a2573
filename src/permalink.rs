//! Permalink parsing. Every component goes through [`parse`] to turn a post
//! URL into its [`Shortcode`], so spreadsheet rows and on-disk metadata are
//! always compared in the same canonical form.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use url::Url;

/// Base of the canonical permalink; the shortcode and a trailing slash follow.
pub const PERMALINK_BASE: &str = "https://www.instagram.com/p/";

/// Path segments that precede the shortcode in a post URL.
const POST_KINDS: [&str; 3] = ["p", "reel", "tv"];

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Shortcode(String);

impl Shortcode {
    pub fn new(code: impl Into<String>) -> Result<Self> {
        let code = code.into();
        if code.is_empty() {
            return Err(Error::InvalidPermalink {
                url: code,
                reason: "empty shortcode".to_string(),
            });
        }
        if code.contains('/') || code.chars().any(char::is_whitespace) {
            return Err(Error::InvalidPermalink {
                reason: "shortcode contains a separator or whitespace".to_string(),
                url: code,
            });
        }
        Ok(Self(code))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Canonical permalink, e.g. `https://www.instagram.com/p/AAA/`.
    pub fn permalink(&self) -> String {
        format!("{}{}/", PERMALINK_BASE, self.0)
    }
}

impl fmt::Display for Shortcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for Shortcode {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        Shortcode::new(value)
    }
}

impl From<Shortcode> for String {
    fn from(value: Shortcode) -> Self {
        value.0
    }
}

/// Parse a post URL into its shortcode.
///
/// Surrounding whitespace, trailing slashes, query strings and fragments are
/// ignored. The URL must have at least two non-empty path segments. The
/// shortcode is the segment after `p`, `reel` or `tv`, or the last segment
/// when none of those is present.
pub fn parse(url: &str) -> Result<Shortcode> {
    let trimmed = url.trim();
    if trimmed.is_empty() {
        return Err(invalid(url, "empty URL"));
    }

    let parsed = Url::parse(trimmed).map_err(|e| invalid(url, &e.to_string()))?;
    let segments: Vec<&str> = parsed
        .path_segments()
        .map(|segments| segments.filter(|s| !s.is_empty()).collect())
        .unwrap_or_default();

    if segments.len() < 2 {
        return Err(invalid(url, "expected at least two path segments"));
    }

    let code = segments
        .windows(2)
        .find(|pair| POST_KINDS.contains(&pair[0]))
        .map(|pair| pair[1])
        .unwrap_or(segments[segments.len() - 1]);

    Shortcode::new(code).map_err(|_| invalid(url, "malformed shortcode segment"))
}

fn invalid(url: &str, reason: &str) -> Error {
    Error::InvalidPermalink {
        url: url.to_string(),
        reason: reason.to_string(),
    }
}
