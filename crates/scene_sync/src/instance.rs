//! Live instances and the id side table
//!
//! A live instance is whatever a type's builder materialized on the
//! renderer side: mutable, method-dispatchable by string name, and shared
//! behind `Arc<RwLock<...>>` so handlers and the host can hold references
//! across passes. States are transient and rebuilt every update, so
//! correlation is by id through the [`InstanceTable`], not by identity.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, RwLock};

use crate::state::{PropertyMap, Value};

/// A live, stateful renderer-side object managed by the engine.
pub trait SceneInstance: Send + Sync {
    /// The type name this instance was built for.
    fn type_name(&self) -> &str;

    /// Apply a property diff. Called once per pass for every node that
    /// reaches this instance; must be idempotent for identical input.
    fn set_properties(&mut self, properties: &PropertyMap);

    /// Invoke a named method with positional, already-resolved arguments.
    ///
    /// The engine assumes tolerance: a [`CallArgument::Missing`] stands in
    /// for a reference to an instance that was excluded or never built, and
    /// unknown method names are the instance's concern.
    fn invoke(&mut self, method: &str, args: &[CallArgument]);
}

/// Shared handle to a live instance.
pub type SharedInstance = Arc<RwLock<dyn SceneInstance>>;

/// Wrap a concrete instance in the shared handle form the engine manages.
pub fn share<T: SceneInstance + 'static>(instance: T) -> SharedInstance {
    Arc::new(RwLock::new(instance))
}

/// A call argument after id resolution.
#[derive(Clone)]
pub enum CallArgument {
    /// A literal value, passed through unchanged.
    Value(Value),
    /// A resolved reference to a managed live instance.
    Instance(SharedInstance),
    /// A wrapped-id reference whose instance was excluded or never built.
    Missing,
}

impl CallArgument {
    /// Returns the literal value, if this argument is one.
    pub fn as_value(&self) -> Option<&Value> {
        match self {
            CallArgument::Value(value) => Some(value),
            _ => None,
        }
    }

    /// Returns the instance handle, if this argument resolved to one.
    pub fn as_instance(&self) -> Option<&SharedInstance> {
        match self {
            CallArgument::Instance(instance) => Some(instance),
            _ => None,
        }
    }

    /// True if this argument referenced an instance that is not available.
    pub fn is_missing(&self) -> bool {
        matches!(self, CallArgument::Missing)
    }
}

impl fmt::Debug for CallArgument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CallArgument::Value(value) => f.debug_tuple("Value").field(value).finish(),
            CallArgument::Instance(instance) => {
                let type_name = instance
                    .read()
                    .map(|guard| guard.type_name().to_string())
                    .unwrap_or_else(|_| "<poisoned>".to_string());
                f.debug_tuple("Instance").field(&type_name).finish()
            }
            CallArgument::Missing => f.write_str("Missing"),
        }
    }
}

/// Side table mapping state-node ids to the live instances built for them.
///
/// Owned by the engine for the lifetime of a rendering session; instances
/// persist across passes so a later pass updates rather than rebuilds.
#[derive(Default)]
pub struct InstanceTable {
    instances: HashMap<String, SharedInstance>,
}

impl InstanceTable {
    /// Create an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an instance under a state id, returning any previous entry.
    pub fn insert(&mut self, id: impl Into<String>, instance: SharedInstance) -> Option<SharedInstance> {
        self.instances.insert(id.into(), instance)
    }

    /// Look up the instance for a state id.
    pub fn get(&self, id: &str) -> Option<SharedInstance> {
        self.instances.get(id).map(Arc::clone)
    }

    /// Drop the instance recorded under `id`, returning it if present.
    pub fn remove(&mut self, id: &str) -> Option<SharedInstance> {
        self.instances.remove(id)
    }

    /// True if an instance is recorded for this id.
    pub fn contains(&self, id: &str) -> bool {
        self.instances.contains_key(id)
    }

    /// Number of managed instances.
    pub fn len(&self) -> usize {
        self.instances.len()
    }

    /// True if no instances are managed.
    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }

    /// Drop every managed instance (end of session).
    pub fn clear(&mut self) {
        self.instances.clear();
    }

    /// Iterate over the managed ids (unordered).
    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.instances.keys().map(String::as_str)
    }
}

impl fmt::Debug for InstanceTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InstanceTable")
            .field("len", &self.instances.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Dummy;

    impl SceneInstance for Dummy {
        fn type_name(&self) -> &str {
            "Dummy"
        }
        fn set_properties(&mut self, _properties: &PropertyMap) {}
        fn invoke(&mut self, _method: &str, _args: &[CallArgument]) {}
    }

    #[test]
    fn test_instance_table_insert_get_remove() {
        let mut table = InstanceTable::new();
        assert!(table.is_empty());

        table.insert("a1", share(Dummy));
        assert!(table.contains("a1"));
        assert_eq!(table.len(), 1);
        assert!(table.get("a1").is_some());
        assert!(table.get("a2").is_none());

        assert!(table.remove("a1").is_some());
        assert!(table.is_empty());
    }

    #[test]
    fn test_insert_replaces_and_returns_previous() {
        let mut table = InstanceTable::new();
        table.insert("a1", share(Dummy));
        let previous = table.insert("a1", share(Dummy));
        assert!(previous.is_some());
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_call_argument_accessors() {
        let value = CallArgument::Value(Value::Integer(2));
        assert_eq!(value.as_value(), Some(&Value::Integer(2)));
        assert!(value.as_instance().is_none());
        assert!(!value.is_missing());

        let instance = CallArgument::Instance(share(Dummy));
        assert!(instance.as_instance().is_some());

        assert!(CallArgument::Missing.is_missing());
    }
}
