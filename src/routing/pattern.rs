//! Match pattern normalization.
//!
//! # Responsibilities
//! - Turn a loosely typed target string into a host match pattern
//! - Keep explicit schemes exactly as the user wrote them
//! - Pass unrecognised shapes through untouched (the host decides)
//!
//! # Design Decisions
//! - Never fails: empty input is `None`, anything else is `Some`
//! - Every rewrite lands in one of the "return unchanged" branches,
//!   so `normalize` is idempotent

use serde::{Deserialize, Serialize};
use std::fmt;

/// The universal pattern: every scheme, every host, every path.
pub const UNIVERSAL_PATTERN: &str = "*://*/*";

/// A string in the host facility's `scheme://host/path` grammar.
///
/// Only [`normalize`] constructs these.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct MatchPattern(String);

impl MatchPattern {
    fn universal() -> Self {
        Self(UNIVERSAL_PATTERN.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_universal(&self) -> bool {
        self.0 == UNIVERSAL_PATTERN
    }
}

impl fmt::Display for MatchPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for MatchPattern {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

// Deserialization goes back through the normalizer so a pattern read from
// anywhere still honours the constructor invariant.
impl<'de> Deserialize<'de> for MatchPattern {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        normalize(&raw).ok_or_else(|| serde::de::Error::custom("empty match pattern"))
    }
}

/// Canonicalize a user-supplied target into a [`MatchPattern`].
pub fn normalize(input: &str) -> Option<MatchPattern> {
    let v = input.trim();
    if v.is_empty() {
        return None;
    }

    if v == "*/*" || v == UNIVERSAL_PATTERN {
        return Some(MatchPattern::universal());
    }

    if has_http_scheme(v) || v.starts_with("*://") {
        return Some(MatchPattern(v.to_string()));
    }

    if v.starts_with('*') {
        if v.contains("://") {
            return Some(MatchPattern(v.to_string()));
        }
        return Some(MatchPattern(format!("*://{}", v.trim_start_matches('*'))));
    }

    if !v.contains("://") && is_host_like(v) {
        let first_segment = v.split('/').next().unwrap_or_default();
        if !v.starts_with("*.") && first_segment.contains('.') {
            return Some(MatchPattern(format!("*://*.{}", v)));
        }
        return Some(MatchPattern(format!("*://{}", v)));
    }

    Some(MatchPattern(v.to_string()))
}

/// `http://` or `https://`, ASCII case-insensitive.
pub(crate) fn has_http_scheme(v: &str) -> bool {
    let lower = v.get(..8).unwrap_or(v).to_ascii_lowercase();
    lower.starts_with("http://") || lower.starts_with("https://")
}

/// At least one character, a dot, and one more character, all before the first `/`.
fn is_host_like(v: &str) -> bool {
    let segment = v.split('/').next().unwrap_or_default();
    segment
        .char_indices()
        .any(|(i, c)| c == '.' && i > 0 && i + 1 < segment.len())
}
