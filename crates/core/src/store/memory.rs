use std::sync::RwLock;

use tracing::debug;

use crate::error::{CoreError, Result};
use crate::rule::StoredRule;

use super::RuleStore;

/// In-memory rule store keeping insertion order.
#[derive(Debug, Default)]
pub struct MemoryRuleStore {
    rules: RwLock<Vec<StoredRule>>,
}

impl MemoryRuleStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_rules(rules: Vec<StoredRule>) -> Self {
        Self {
            rules: RwLock::new(rules),
        }
    }

    /// Insert a rule, replacing any rule with the same id in place.
    pub fn upsert(&self, rule: StoredRule) -> Result<()> {
        let mut rules = self
            .rules
            .write()
            .map_err(|e| CoreError::Store(format!("lock poisoned: {e}")))?;
        match rules.iter_mut().find(|r| r.id == rule.id) {
            Some(existing) => {
                debug!(rule_id = %rule.id, "replacing stored rule");
                *existing = rule;
            }
            None => rules.push(rule),
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.rules.read().map(|r| r.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl RuleStore for MemoryRuleStore {
    fn name(&self) -> &str {
        "memory"
    }

    fn enumerate(&self) -> Result<Vec<StoredRule>> {
        self.rules
            .read()
            .map(|rules| rules.clone())
            .map_err(|e| CoreError::Store(format!("lock poisoned: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rule(id: &str, title: &str) -> StoredRule {
        StoredRule::from_yaml_str(id, &format!("title: {title}\n")).unwrap()
    }

    #[test]
    fn upsert_replaces_in_place() {
        let store = MemoryRuleStore::new();
        store.upsert(rule("a", "first")).unwrap();
        store.upsert(rule("b", "second")).unwrap();
        store.upsert(rule("a", "first again")).unwrap();

        let rules = store.enumerate().unwrap();
        assert_eq!(rules.len(), 2);
        assert_eq!(rules[0].id, "a");
        assert_eq!(rules[0].title.as_deref(), Some("first again"));
        assert_eq!(rules[1].id, "b");
    }

    #[test]
    fn empty_store_enumerates_nothing() {
        let store = MemoryRuleStore::new();
        assert!(store.is_empty());
        assert!(store.enumerate().unwrap().is_empty());
    }
}
