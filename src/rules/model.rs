//! Rule data model.
//!
//! # Responsibilities
//! - Represent persisted parameter rules and their identity
//! - Validate candidate rules (non-empty parameter name)
//! - Compute whole-collection edits (add, update, toggle, remove)
//! - Derive the enabled `(name, value)` bindings the redirect path needs

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::ops::Deref;
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

/// Errors raised at the rule model boundary.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RuleError {
    #[error("parameter name must not be empty")]
    EmptyParamName,

    #[error("parameter {0:?} already has a rule")]
    DuplicateParamName(String),

    #[error("no rule with id {0}")]
    UnknownRule(RuleId),
}

/// Opaque rule identity, assigned once at creation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RuleId(String);

impl RuleId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RuleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RuleId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// A persisted instruction to force one query parameter to one value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Rule {
    /// Rules written by other tools may lack an id; those are enforced
    /// but cannot be addressed by edits.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<RuleId>,
    #[serde(deserialize_with = "scalar_string")]
    pub param_name: String,
    #[serde(default, deserialize_with = "scalar_string")]
    pub param_value: String,
    /// Missing in storage means disabled.
    #[serde(default)]
    pub enabled: bool,
}

impl Rule {
    /// Create a new enabled rule with a fresh id.
    pub fn new(param_name: &str, param_value: &str) -> Result<Self, RuleError> {
        let param_name = param_name.trim();
        if param_name.is_empty() {
            return Err(RuleError::EmptyParamName);
        }
        Ok(Self {
            id: Some(RuleId::generate()),
            param_name: param_name.to_string(),
            param_value: param_value.trim().to_string(),
            enabled: true,
        })
    }

    fn has_id(&self, id: &RuleId) -> bool {
        self.id.as_ref() == Some(id)
    }
}

/// Strings as-is, numbers and booleans in their JSON spelling, null as "".
fn scalar_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::String(s) => Ok(s),
        Value::Null => Ok(String::new()),
        v @ (Value::Number(_) | Value::Bool(_)) => Ok(v.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "expected a string, number or boolean, got {other}"
        ))),
    }
}

/// One enabled rule reduced to what the redirect computer needs.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct RuleBinding {
    pub name: String,
    pub value: String,
}

impl RuleBinding {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// Immutable, cheaply cloneable snapshot of the enabled bindings, in storage order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnabledRules(Arc<[RuleBinding]>);

impl Default for EnabledRules {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

impl EnabledRules {
    pub fn new(bindings: Vec<RuleBinding>) -> Self {
        Self(bindings.into())
    }

    /// Parameter names bound more than once; the later binding wins.
    pub fn duplicate_names(&self) -> Vec<&str> {
        let mut dups: Vec<&str> = Vec::new();
        for (i, b) in self.0.iter().enumerate() {
            let seen_before = self.0[..i].iter().any(|prev| prev.name == b.name);
            if seen_before && !dups.contains(&b.name.as_str()) {
                dups.push(&b.name);
            }
        }
        dups
    }
}

impl Deref for EnabledRules {
    type Target = [RuleBinding];

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl FromIterator<RuleBinding> for EnabledRules {
    fn from_iter<I: IntoIterator<Item = RuleBinding>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// One element of the stored collection.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Entry {
    /// Read from storage and written back exactly as read. `rule` is
    /// `None` when the entry is not a readable rule.
    Stored { raw: Value, rule: Option<Rule> },
    /// Created or changed through this set.
    Edited(Rule),
}

impl Entry {
    fn rule(&self) -> Option<&Rule> {
        match self {
            Entry::Stored { rule, .. } => rule.as_ref(),
            Entry::Edited(rule) => Some(rule),
        }
    }

    fn to_value(&self) -> Value {
        match self {
            Entry::Stored { raw, .. } => raw.clone(),
            Entry::Edited(rule) => serde_json::to_value(rule).unwrap_or(Value::Null),
        }
    }
}

/// The full ordered rule collection as stored under the `rules` key.
///
/// Entries that are not readable rules are kept and written back in place,
/// so an edit never changes anything but the rule it targets.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RuleSet {
    entries: Vec<Entry>,
}

impl RuleSet {
    pub fn new(rules: Vec<Rule>) -> Self {
        Self {
            entries: rules.into_iter().map(Entry::Edited).collect(),
        }
    }

    /// Parse a stored value leniently.
    ///
    /// Anything that is not an array is an empty set; array entries that
    /// are not valid rules are kept opaque. Returns the set and the number
    /// of unreadable entries.
    pub fn from_value(value: Option<&Value>) -> (Self, usize) {
        let Some(Value::Array(items)) = value else {
            return (Self::default(), 0);
        };

        let mut skipped = 0;
        let entries = items
            .iter()
            .map(|item| {
                let rule = match serde_json::from_value::<Rule>(item.clone()) {
                    Ok(rule) => Some(rule),
                    Err(e) => {
                        tracing::debug!(error = %e, "Keeping unreadable stored rule as-is");
                        skipped += 1;
                        None
                    }
                };
                Entry::Stored {
                    raw: item.clone(),
                    rule,
                }
            })
            .collect();
        (Self { entries }, skipped)
    }

    pub fn to_value(&self) -> Value {
        Value::Array(self.entries.iter().map(Entry::to_value).collect())
    }

    /// Readable rules in storage order.
    pub fn iter(&self) -> impl Iterator<Item = &Rule> {
        self.entries.iter().filter_map(Entry::rule)
    }

    pub fn len(&self) -> usize {
        self.iter().count()
    }

    pub fn is_empty(&self) -> bool {
        self.iter().next().is_none()
    }

    pub fn get(&self, id: &RuleId) -> Option<&Rule> {
        self.iter().find(|r| r.has_id(id))
    }

    /// Enabled rules with a usable name, stripped down to bindings.
    pub fn enabled_rules(&self) -> EnabledRules {
        self.iter()
            .filter(|r| r.enabled && !r.param_name.is_empty())
            .map(|r| RuleBinding::new(r.param_name.clone(), r.param_value.clone()))
            .collect()
    }

    /// Append a new enabled rule. Parameter names must be unique across the set.
    pub fn add(&self, param_name: &str, param_value: &str) -> Result<(Self, RuleId), RuleError> {
        self.add_with(param_name, param_value, true)
    }

    /// Append a new rule with the given enabled state.
    pub fn add_with(
        &self,
        param_name: &str,
        param_value: &str,
        enabled: bool,
    ) -> Result<(Self, RuleId), RuleError> {
        let mut rule = Rule::new(param_name, param_value)?;
        rule.enabled = enabled;
        if self.iter().any(|r| r.param_name == rule.param_name) {
            return Err(RuleError::DuplicateParamName(rule.param_name));
        }
        let id = rule.id.clone().unwrap_or_else(RuleId::generate);
        rule.id = Some(id.clone());

        let mut entries = self.entries.clone();
        entries.push(Entry::Edited(rule));
        Ok((Self { entries }, id))
    }

    pub fn update_value(&self, id: &RuleId, param_value: &str) -> Result<Self, RuleError> {
        self.edit(id, |rule| rule.param_value = param_value.trim().to_string())
    }

    pub fn set_enabled(&self, id: &RuleId, enabled: bool) -> Result<Self, RuleError> {
        self.edit(id, |rule| rule.enabled = enabled)
    }

    pub fn toggle(&self, id: &RuleId) -> Result<Self, RuleError> {
        self.edit(id, |rule| rule.enabled = !rule.enabled)
    }

    pub fn remove(&self, id: &RuleId) -> Result<Self, RuleError> {
        let position = self.position(id)?;
        let mut entries = self.entries.clone();
        entries.remove(position);
        Ok(Self { entries })
    }

    fn position(&self, id: &RuleId) -> Result<usize, RuleError> {
        self.entries
            .iter()
            .position(|e| e.rule().is_some_and(|r| r.has_id(id)))
            .ok_or_else(|| RuleError::UnknownRule(id.clone()))
    }

    fn edit<F>(&self, id: &RuleId, f: F) -> Result<Self, RuleError>
    where
        F: FnOnce(&mut Rule),
    {
        let position = self.position(id)?;
        let mut entries = self.entries.clone();
        let Some(mut rule) = entries[position].rule().cloned() else {
            return Err(RuleError::UnknownRule(id.clone()));
        };
        f(&mut rule);
        entries[position] = Entry::Edited(rule);
        Ok(Self { entries })
    }
}
