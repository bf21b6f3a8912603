//! Redirect decision for a single request URL.
//!
//! # Responsibilities
//! - Guard on http/https
//! - Force each enabled rule's parameter to its value
//! - Report pass-through with a reason, or the re-serialized target
//!
//! # Design Decisions
//! - Infallible: unparseable URLs pass through
//! - Parameter setting follows URLSearchParams: first occurrence is
//!   compared and replaced, later duplicates are dropped, absent keys
//!   are appended
//! - A target identical to the input is not a redirect (loop guard)

use serde::Serialize;
use url::Url;

use crate::routing::pattern::has_http_scheme;
use crate::rules::RuleBinding;

/// Why a request is allowed through untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PassReason {
    /// Not http or https.
    UnsupportedScheme,
    /// The URL could not be parsed.
    Unparseable,
    /// No enabled rules to apply.
    NoRules,
    /// Every rule is already satisfied.
    AlreadySatisfied,
}

/// The verdict for one request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "decision", rename_all = "snake_case")]
pub enum Decision {
    PassThrough { reason: PassReason },
    Redirect { target: String },
}

impl Decision {
    fn pass(reason: PassReason) -> Self {
        Decision::PassThrough { reason }
    }

    pub fn is_redirect(&self) -> bool {
        matches!(self, Decision::Redirect { .. })
    }

    pub fn target(&self) -> Option<&str> {
        match self {
            Decision::Redirect { target } => Some(target),
            Decision::PassThrough { .. } => None,
        }
    }

    pub fn pass_reason(&self) -> Option<PassReason> {
        match self {
            Decision::PassThrough { reason } => Some(*reason),
            Decision::Redirect { .. } => None,
        }
    }

    /// Short label for metrics and logs.
    pub fn label(&self) -> &'static str {
        match self {
            Decision::Redirect { .. } => "redirect",
            Decision::PassThrough { reason } => match reason {
                PassReason::UnsupportedScheme => "unsupported_scheme",
                PassReason::Unparseable => "unparseable",
                PassReason::NoRules => "no_rules",
                PassReason::AlreadySatisfied => "already_satisfied",
            },
        }
    }
}

/// Decide whether `request_url` must be redirected to satisfy `rules`.
pub fn decide(request_url: &str, rules: &[RuleBinding]) -> Decision {
    if !has_http_scheme(request_url) {
        return Decision::pass(PassReason::UnsupportedScheme);
    }

    let mut url = match Url::parse(request_url) {
        Ok(u) => u,
        Err(e) => {
            tracing::trace!(url = %request_url, error = %e, "Unparseable request URL");
            return Decision::pass(PassReason::Unparseable);
        }
    };
    if !matches!(url.scheme(), "http" | "https") {
        return Decision::pass(PassReason::UnsupportedScheme);
    }

    if rules.iter().all(|r| r.name.is_empty()) {
        return Decision::pass(PassReason::NoRules);
    }

    let mut pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();
    let mut changed = false;
    for rule in rules.iter().filter(|r| !r.name.is_empty()) {
        changed |= set_param(&mut pairs, &rule.name, &rule.value);
    }
    if !changed {
        return Decision::pass(PassReason::AlreadySatisfied);
    }

    url.query_pairs_mut().clear().extend_pairs(&pairs);
    let target = String::from(url);
    if target == request_url {
        return Decision::pass(PassReason::AlreadySatisfied);
    }
    Decision::Redirect { target }
}

/// Returns true if the first value of `name` was not already `value`.
fn set_param(pairs: &mut Vec<(String, String)>, name: &str, value: &str) -> bool {
    let Some(first) = pairs.iter().position(|(k, _)| k == name) else {
        pairs.push((name.to_string(), value.to_string()));
        return true;
    };
    if pairs[first].1 == value {
        return false;
    }

    pairs[first].1 = value.to_string();
    let mut idx = 0;
    pairs.retain(|(k, _)| {
        let keep = idx <= first || k != name;
        idx += 1;
        keep
    });
    true
}
