//! Whole-collection rule edits against a store.
//!
//! Every operation reads the full `rules` value, computes the new
//! collection with [`RuleSet`] and writes the whole collection back in a
//! single store write. Entries other than the edited one are written back
//! exactly as they were read.

use serde_json::Value;
use thiserror::Error;

use crate::rules::model::{RuleError, RuleId, RuleSet};
use crate::store::{ConfigStore, StoreError, StoreValues, RULES_KEY, TARGET_URL_KEY};

#[derive(Debug, Error)]
pub enum EditError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Rule(#[from] RuleError),
}

/// Edits the persisted rule collection and target of a [`ConfigStore`].
pub struct RuleEditor<'a> {
    store: &'a dyn ConfigStore,
}

impl<'a> RuleEditor<'a> {
    pub fn new(store: &'a dyn ConfigStore) -> Self {
        Self { store }
    }

    pub async fn rules(&self) -> Result<RuleSet, EditError> {
        let values = self.store.get(&[RULES_KEY]).await?;
        let (rules, skipped) = RuleSet::from_value(values.get(RULES_KEY));
        if skipped > 0 {
            tracing::warn!(skipped, "Stored rule collection contains unreadable entries, keeping them as-is");
        }
        Ok(rules)
    }

    pub async fn add(&self, param_name: &str, param_value: &str) -> Result<RuleId, EditError> {
        self.add_with(param_name, param_value, true).await
    }

    /// Add a rule already in the given enabled state.
    pub async fn add_with(
        &self,
        param_name: &str,
        param_value: &str,
        enabled: bool,
    ) -> Result<RuleId, EditError> {
        let (rules, id) = self.rules().await?.add_with(param_name, param_value, enabled)?;
        self.write(&rules).await?;
        tracing::info!(rule = %id, param = %param_name.trim(), enabled, "Rule added");
        Ok(id)
    }

    pub async fn update_value(&self, id: &RuleId, param_value: &str) -> Result<(), EditError> {
        let rules = self.rules().await?.update_value(id, param_value)?;
        self.write(&rules).await
    }

    pub async fn set_enabled(&self, id: &RuleId, enabled: bool) -> Result<(), EditError> {
        let rules = self.rules().await?.set_enabled(id, enabled)?;
        self.write(&rules).await
    }

    /// Flip a rule's enabled flag, returning the new state.
    pub async fn toggle(&self, id: &RuleId) -> Result<bool, EditError> {
        let rules = self.rules().await?.toggle(id)?;
        let enabled = rules.get(id).map(|r| r.enabled).unwrap_or(false);
        self.write(&rules).await?;
        Ok(enabled)
    }

    pub async fn remove(&self, id: &RuleId) -> Result<(), EditError> {
        let rules = self.rules().await?.remove(id)?;
        self.write(&rules).await?;
        tracing::info!(rule = %id, "Rule removed");
        Ok(())
    }

    /// The raw, unnormalized target as stored.
    pub async fn target(&self) -> Result<Option<String>, EditError> {
        let values = self.store.get(&[TARGET_URL_KEY]).await?;
        Ok(values
            .get(TARGET_URL_KEY)
            .and_then(Value::as_str)
            .map(str::to_string))
    }

    pub async fn set_target(&self, raw: &str) -> Result<(), EditError> {
        let mut values = StoreValues::new();
        values.insert(TARGET_URL_KEY.to_string(), Value::String(raw.trim().to_string()));
        self.store.set(values).await?;
        Ok(())
    }

    pub async fn clear_target(&self) -> Result<(), EditError> {
        self.store.remove(&[TARGET_URL_KEY]).await?;
        Ok(())
    }

    async fn write(&self, rules: &RuleSet) -> Result<(), EditError> {
        let mut values = StoreValues::new();
        values.insert(RULES_KEY.to_string(), rules.to_value());
        self.store.set(values).await?;
        Ok(())
    }
}
