//! Match pattern evaluation.
//!
//! # Responsibilities
//! - Split a [`MatchPattern`] into scheme, host and path conditions
//! - Reject patterns the grammar cannot express
//! - Decide whether a request URL falls under a compiled pattern
//!
//! # Design Decisions
//! - Scheme and host matching are case-insensitive, path matching is not
//! - `*` scheme covers http and https only
//! - `*.example.com` covers `example.com` itself and every subdomain
//! - A pattern without a path component matches every path
//! - Path globs are evaluated against path + query

use thiserror::Error;
use url::{Position, Url};
use wildmatch::WildMatch;

use crate::routing::pattern::MatchPattern;

/// Why a pattern could not be compiled.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PatternError {
    #[error("missing scheme separator in {0:?}")]
    MissingSeparator(String),

    #[error("unsupported scheme {0:?}")]
    UnsupportedScheme(String),

    #[error("invalid host {0:?}")]
    InvalidHost(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum SchemeMatcher {
    AnyHttp,
    Exact(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum HostMatcher {
    Any,
    /// Domain plus all of its subdomains.
    Suffix(String),
    Exact(String),
}

impl HostMatcher {
    fn matches(&self, host: &str) -> bool {
        let host = host.to_ascii_lowercase();
        match self {
            HostMatcher::Any => true,
            HostMatcher::Suffix(domain) => {
                host == *domain
                    || (host.len() > domain.len()
                        && host.ends_with(domain.as_str())
                        && host.as_bytes()[host.len() - domain.len() - 1] == b'.')
            }
            HostMatcher::Exact(expected) => host == *expected,
        }
    }
}

/// A compiled [`MatchPattern`].
#[derive(Debug)]
pub struct PatternMatcher {
    scheme: SchemeMatcher,
    host: HostMatcher,
    path: Option<WildMatch>,
}

impl PatternMatcher {
    pub fn compile(pattern: &MatchPattern) -> Result<Self, PatternError> {
        let raw = pattern.as_str();
        let (scheme, rest) = raw
            .split_once("://")
            .ok_or_else(|| PatternError::MissingSeparator(raw.to_string()))?;

        let scheme = match scheme.to_ascii_lowercase().as_str() {
            "*" => SchemeMatcher::AnyHttp,
            s @ ("http" | "https") => SchemeMatcher::Exact(s.to_string()),
            other => return Err(PatternError::UnsupportedScheme(other.to_string())),
        };

        let (host, path) = match rest.find('/') {
            Some(idx) => (&rest[..idx], Some(&rest[idx..])),
            None => (rest, None),
        };

        let host = compile_host(host)?;
        let path = path.filter(|p| *p != "/*").map(WildMatch::new);

        Ok(Self { scheme, host, path })
    }

    /// Returns true if `url` falls under this pattern.
    pub fn matches(&self, url: &Url) -> bool {
        let scheme_ok = match &self.scheme {
            SchemeMatcher::AnyHttp => matches!(url.scheme(), "http" | "https"),
            SchemeMatcher::Exact(s) => url.scheme() == s,
        };
        if !scheme_ok {
            return false;
        }

        let host_ok = url
            .host_str()
            .map(|h| self.host.matches(h))
            .unwrap_or(false);
        if !host_ok {
            return false;
        }

        match &self.path {
            Some(glob) => glob.matches(&url[Position::BeforePath..Position::AfterQuery]),
            None => true,
        }
    }
}

fn compile_host(host: &str) -> Result<HostMatcher, PatternError> {
    let host = host.to_ascii_lowercase();
    if host == "*" {
        return Ok(HostMatcher::Any);
    }
    if let Some(domain) = host.strip_prefix("*.") {
        if domain.is_empty() || domain.contains('*') {
            return Err(PatternError::InvalidHost(host));
        }
        return Ok(HostMatcher::Suffix(domain.to_string()));
    }
    if host.is_empty() || host.contains('*') || host.starts_with('.') {
        return Err(PatternError::InvalidHost(host));
    }
    Ok(HostMatcher::Exact(host))
}
