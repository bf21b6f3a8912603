//! Interpreting the persisted keys the reactor cares about.

use serde_json::Value;

use crate::lifecycle::ActiveConfiguration;
use crate::routing::normalize;
use crate::rules::RuleSet;
use crate::store::{StoreValues, RULES_KEY, TARGET_URL_KEY};

/// Raw persisted state: target string and full rule collection.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StoredSnapshot {
    pub raw_target: String,
    pub rules: RuleSet,
    /// Stored rule entries that could not be parsed.
    pub skipped_rules: usize,
}

impl StoredSnapshot {
    /// A non-string target reads as empty; a non-array rule value as no rules.
    pub fn from_values(values: &StoreValues) -> Self {
        let raw_target = values
            .get(TARGET_URL_KEY)
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        let (rules, skipped_rules) = RuleSet::from_value(values.get(RULES_KEY));
        Self {
            raw_target,
            rules,
            skipped_rules,
        }
    }

    /// Normalize the target and strip rules down to enabled bindings.
    pub fn to_active(&self) -> ActiveConfiguration {
        ActiveConfiguration::new(normalize(&self.raw_target), self.rules.enabled_rules())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::RuleBinding;
    use serde_json::json;

    fn values(v: Value) -> StoreValues {
        v.as_object().cloned().unwrap()
    }

    #[test]
    fn test_full_snapshot() {
        let snapshot = StoredSnapshot::from_values(&values(json!({
            "targetUrl": " example.com ",
            "rules": [
                {"id": "1", "paramName": "q", "paramValue": "2", "enabled": true},
                {"id": "2", "paramName": "x", "paramValue": "9", "enabled": false},
            ],
        })));
        let active = snapshot.to_active();
        assert_eq!(active.pattern.unwrap().as_str(), "*://*.example.com");
        assert_eq!(&*active.enabled_rules, &[RuleBinding::new("q", "2")]);
    }

    #[test]
    fn test_wrong_shapes_degrade() {
        let snapshot = StoredSnapshot::from_values(&values(json!({
            "targetUrl": 42,
            "rules": "nope",
        })));
        assert_eq!(snapshot.raw_target, "");
        assert!(snapshot.rules.is_empty());
        assert_eq!(snapshot.to_active(), ActiveConfiguration::default());
    }

    #[test]
    fn test_empty_store() {
        let snapshot = StoredSnapshot::from_values(&StoreValues::new());
        assert!(snapshot.to_active().pattern.is_none());
    }
}
