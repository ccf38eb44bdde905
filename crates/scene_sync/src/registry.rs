//! Type-handler registry
//!
//! Maps a state-node type name to a pair of functions: a builder that
//! materializes a new live instance from initial properties, and an updater
//! that applies a node's state to an existing instance. Handlers are stored
//! behind `Arc` so the engine can clone one out of the map and hand itself
//! mutably to the updater - most types use the generic updater, which
//! simply re-enters the engine's recursive pass on the child node.

use std::collections::HashMap;
use std::sync::Arc;

use crate::engine::SyncEngine;
use crate::error::SyncError;
use crate::instance::SharedInstance;
use crate::state::{PropertyMap, StateNode};

/// Builder function: materialize a new instance from initial properties.
///
/// Returning `None` means "no instance materialized" - the engine skips
/// further work for that node without failing the pass.
pub type BuildFn = Arc<dyn Fn(&PropertyMap) -> Option<SharedInstance> + Send + Sync>;

/// Updater function: apply a node's full state to an existing instance.
///
/// Receives the engine so it can recurse; the common case is
/// [`generic_updater`], which re-runs the engine's property/dependency/call
/// algorithm on the child.
pub type UpdateFn =
    Arc<dyn Fn(&mut SyncEngine, &SharedInstance, &StateNode) -> Result<(), SyncError> + Send + Sync>;

/// The generic updater: delegate straight back into the engine's recursive
/// pass, so dependencies and calls of the child are applied transitively.
pub fn generic_updater() -> UpdateFn {
    Arc::new(|engine, instance, state| engine.apply_state(instance, state))
}

/// A registered build/update pair for one type name.
#[derive(Clone)]
pub struct TypeHandler {
    /// Constructs a new instance from initial properties.
    pub build: BuildFn,
    /// Applies a state diff to an existing instance.
    pub update: UpdateFn,
}

impl TypeHandler {
    /// Create a handler pair from its two functions.
    pub fn new(build: BuildFn, update: UpdateFn) -> Self {
        Self { build, update }
    }
}

impl std::fmt::Debug for TypeHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("TypeHandler")
    }
}

/// Registry of type handlers, keyed by type name.
#[derive(Debug, Clone, Default)]
pub struct TypeHandlerRegistry {
    handlers: HashMap<String, TypeHandler>,
}

impl TypeHandlerRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Install a handler pair for `type_name`, overwriting any prior
    /// registration.
    pub fn register(&mut self, type_name: impl Into<String>, build: BuildFn, update: UpdateFn) {
        self.handlers
            .insert(type_name.into(), TypeHandler::new(build, update));
    }

    /// Install a builder with the [`generic_updater`] - the common case,
    /// where updating a node means re-running the engine's pass on it.
    pub fn register_with_generic_update(
        &mut self,
        type_name: impl Into<String>,
        build: BuildFn,
    ) {
        self.register(type_name, build, generic_updater());
    }

    /// Remove the registration for `type_name` entirely, so that
    /// [`supported_types`](Self::supported_types) no longer lists it.
    pub fn unregister(&mut self, type_name: &str) -> Option<TypeHandler> {
        self.handlers.remove(type_name)
    }

    /// Look up the handler pair for a type.
    pub fn handler(&self, type_name: &str) -> Option<&TypeHandler> {
        self.handlers.get(type_name)
    }

    /// Invoke the registered builder for `type_name`.
    ///
    /// If no builder is registered this logs a diagnostic and returns
    /// `None`; the caller treats that as "no instance materialized" and
    /// moves on without failing the pass.
    pub fn build(&self, type_name: &str, initial_properties: &PropertyMap) -> Option<SharedInstance> {
        match self.handlers.get(type_name) {
            Some(handler) => (handler.build)(initial_properties),
            None => {
                log::warn!("no builder registered for type '{type_name}'");
                None
            }
        }
    }

    /// True if a handler pair is registered for this type.
    pub fn contains(&self, type_name: &str) -> bool {
        self.handlers.contains_key(type_name)
    }

    /// The currently registered type names, sorted for determinism.
    pub fn supported_types(&self) -> Vec<String> {
        let mut types: Vec<String> = self.handlers.keys().cloned().collect();
        types.sort();
        types
    }

    /// Number of registered types.
    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    /// True if no types are registered.
    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    /// Remove all registrations.
    pub fn clear(&mut self) {
        self.handlers.clear();
    }
}
