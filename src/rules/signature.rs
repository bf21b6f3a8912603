//! Order-independent fingerprint of the enabled rules.
//!
//! Only used to decide whether the interceptor must be re-registered.
//! The fingerprint keeps the sorted pairs rather than a joined string so
//! values containing `=` or `|` cannot collide.
//!
//! Storage order is ignored. With duplicate enabled parameter names the
//! last binding wins in `decide`, so reordering only the duplicates keeps
//! the previously installed winner until some other change re-registers.

use std::fmt;

use crate::rules::model::{EnabledRules, RuleBinding};

#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct ConfigurationSignature(Vec<RuleBinding>);

impl ConfigurationSignature {
    pub fn of(rules: &EnabledRules) -> Self {
        let mut pairs = rules.to_vec();
        pairs.sort();
        Self(pairs)
    }
}

impl fmt::Display for ConfigurationSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, b) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str("|")?;
            }
            write!(f, "{}={}", b.name, b.value)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rules(pairs: &[(&str, &str)]) -> EnabledRules {
        pairs.iter().map(|(n, v)| RuleBinding::new(*n, *v)).collect()
    }

    #[test]
    fn test_order_independent() {
        let a = ConfigurationSignature::of(&rules(&[("a", "1"), ("b", "2")]));
        let b = ConfigurationSignature::of(&rules(&[("b", "2"), ("a", "1")]));
        assert_eq!(a, b);
        assert_eq!(a.to_string(), "a=1|b=2");
    }

    #[test]
    fn test_no_join_collisions() {
        let one = ConfigurationSignature::of(&rules(&[("a", "1|b=2")]));
        let two = ConfigurationSignature::of(&rules(&[("a", "1"), ("b", "2")]));
        assert_ne!(one, two);
    }

    #[test]
    fn test_empty() {
        assert_eq!(ConfigurationSignature::of(&EnabledRules::default()), ConfigurationSignature::default());
    }
}
