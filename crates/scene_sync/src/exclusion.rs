//! Instance exclusion rules and the per-pass skip set
//!
//! Some nested object kinds are redundant on the live side and should not
//! be separately materialized (a sub-renderer that belongs to a specific
//! parent, for example). An [`ExclusionPolicy`] holds at most one rule per
//! type name; during the dependency walk the engine consults it for every
//! child and records the wrapped ids of everything it skipped in a
//! [`SkipSet`], which the call-replay filter consults afterwards.

use std::collections::{hash_set, HashMap, HashSet};

use crate::state::{PropertyMap, Value};

/// Per-type exclusion rule.
///
/// An empty `key` means "always exclude this type". A non-empty key narrows
/// exclusion to instances whose property `key` equals `value`; a child
/// without that property is not excluded.
#[derive(Debug, Clone, PartialEq)]
pub struct ExclusionRule {
    /// Property name to test, or empty for an unconditional rule.
    pub key: String,
    /// Value the property must equal for the rule to apply.
    pub value: Value,
}

/// Long-lived, per-engine map of type name to exclusion rule.
#[derive(Debug, Clone, Default)]
pub struct ExclusionPolicy {
    rules: HashMap<String, ExclusionRule>,
}

impl ExclusionPolicy {
    /// Create a policy with no rules.
    pub fn new() -> Self {
        Self::default()
    }

    /// Install a rule for `type_name`, replacing any existing rule.
    pub fn set_rule(
        &mut self,
        type_name: impl Into<String>,
        key: impl Into<String>,
        value: impl Into<Value>,
    ) {
        self.rules.insert(
            type_name.into(),
            ExclusionRule {
                key: key.into(),
                value: value.into(),
            },
        );
    }

    /// Remove the rule for `type_name`, returning it if one existed.
    pub fn remove_rule(&mut self, type_name: &str) -> Option<ExclusionRule> {
        self.rules.remove(type_name)
    }

    /// Look up the rule for `type_name`.
    pub fn rule(&self, type_name: &str) -> Option<&ExclusionRule> {
        self.rules.get(type_name)
    }

    /// Remove all rules.
    pub fn clear(&mut self) {
        self.rules.clear();
    }

    /// Number of installed rules.
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// True if no rules are installed.
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Decide whether a child of this type with these properties should be
    /// skipped rather than materialized.
    ///
    /// Returns true iff a rule exists for `type_name` and either the rule's
    /// key is empty or the child's property under that key equals the rule's
    /// value. Types without a rule are never excluded. Decisions are
    /// evaluated fresh every pass; properties may change between passes even
    /// for the same id.
    pub fn should_exclude(&self, type_name: &str, properties: &PropertyMap) -> bool {
        match self.rules.get(type_name) {
            Some(rule) if rule.key.is_empty() => true,
            Some(rule) => properties.get(&rule.key) == Some(&rule.value),
            None => false,
        }
    }
}

/// Wrapped ids of the instances excluded during the current pass.
///
/// Rebuilt by the engine at the start of every pass; it never accumulates
/// across passes.
#[derive(Debug, Clone, Default)]
pub struct SkipSet {
    wrapped_ids: HashSet<String>,
}

impl SkipSet {
    /// Create an empty skip set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a wrapped id as skipped. Returns false if it was already
    /// present.
    pub fn insert(&mut self, wrapped_id: String) -> bool {
        self.wrapped_ids.insert(wrapped_id)
    }

    /// True if this wrapped id was skipped during the current pass.
    pub fn contains(&self, wrapped_id: &str) -> bool {
        self.wrapped_ids.contains(wrapped_id)
    }

    /// Forget all recorded ids (start of a new pass).
    pub fn clear(&mut self) {
        self.wrapped_ids.clear();
    }

    /// Number of skipped instances.
    pub fn len(&self) -> usize {
        self.wrapped_ids.len()
    }

    /// True if nothing was skipped.
    pub fn is_empty(&self) -> bool {
        self.wrapped_ids.is_empty()
    }

    /// Iterate over the recorded wrapped ids (unordered).
    pub fn iter(&self) -> hash_set::Iter<'_, String> {
        self.wrapped_ids.iter()
    }
}

impl<'a> IntoIterator for &'a SkipSet {
    type Item = &'a String;
    type IntoIter = hash_set::Iter<'a, String>;

    fn into_iter(self) -> Self::IntoIter {
        self.wrapped_ids.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_rule_never_excludes() {
        let policy = ExclusionPolicy::new();
        let mut props = PropertyMap::new();
        props.insert("anything", true);

        assert!(!policy.should_exclude("Renderer", &props));
        assert!(!policy.should_exclude("Renderer", &PropertyMap::new()));
    }

    #[test]
    fn test_empty_key_excludes_unconditionally() {
        let mut policy = ExclusionPolicy::new();
        policy.set_rule("Renderer", "", true);

        let mut props = PropertyMap::new();
        props.insert("whatever", 7i64);
        assert!(policy.should_exclude("Renderer", &props));
        assert!(policy.should_exclude("Renderer", &PropertyMap::new()));
        // Other types unaffected
        assert!(!policy.should_exclude("Actor", &props));
    }

    #[test]
    fn test_keyed_rule_matches_property_value() {
        let mut policy = ExclusionPolicy::new();
        policy.set_rule("Renderer", "layer", 1i64);

        let mut matching = PropertyMap::new();
        matching.insert("layer", 1i64);
        assert!(policy.should_exclude("Renderer", &matching));

        let mut other = PropertyMap::new();
        other.insert("layer", 0i64);
        assert!(!policy.should_exclude("Renderer", &other));

        // Property absent: not excluded
        assert!(!policy.should_exclude("Renderer", &PropertyMap::new()));
    }

    #[test]
    fn test_set_rule_replaces_existing() {
        let mut policy = ExclusionPolicy::new();
        policy.set_rule("Renderer", "layer", 1i64);
        policy.set_rule("Renderer", "hidden", true);
        assert_eq!(policy.len(), 1);

        let mut props = PropertyMap::new();
        props.insert("layer", 1i64);
        assert!(!policy.should_exclude("Renderer", &props));

        props.insert("hidden", true);
        assert!(policy.should_exclude("Renderer", &props));
    }

    #[test]
    fn test_skip_set_insert_and_clear() {
        let mut skips = SkipSet::new();
        assert!(skips.insert("instance:${a}".to_string()));
        assert!(!skips.insert("instance:${a}".to_string()));
        assert!(skips.contains("instance:${a}"));
        assert!(!skips.contains("instance:${b}"));
        assert_eq!(skips.len(), 1);

        skips.clear();
        assert!(skips.is_empty());
    }
}
