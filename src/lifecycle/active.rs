//! The configuration snapshot an interceptor is built from.

use crate::routing::MatchPattern;
use crate::rules::{ConfigurationSignature, EnabledRules};

/// Normalized target pattern plus the enabled rule bindings.
///
/// `pattern == None` means no interceptor should be registered.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ActiveConfiguration {
    pub pattern: Option<MatchPattern>,
    pub enabled_rules: EnabledRules,
}

impl ActiveConfiguration {
    pub fn new(pattern: Option<MatchPattern>, enabled_rules: EnabledRules) -> Self {
        Self {
            pattern,
            enabled_rules,
        }
    }

    pub fn signature(&self) -> ConfigurationSignature {
        ConfigurationSignature::of(&self.enabled_rules)
    }
}
