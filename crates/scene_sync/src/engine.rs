//! Synchronization engine
//!
//! Applies one serialized state tree onto the live instance graph per pass:
//! properties first, then the dependency walk (consulting the exclusion
//! policy and the type-handler registry), then call replay filtered through
//! the skip set. One engine per rendering session; all shared state
//! (instance table, skip set) is scoped to the engine value and mutated
//! only by the pass currently executing. Passes are strictly sequential -
//! the engine is single-threaded and a pass runs to completion without
//! yielding.

use std::sync::Arc;

use crate::codec;
use crate::config::SyncConfig;
use crate::error::SyncError;
use crate::exclusion::{ExclusionPolicy, SkipSet};
use crate::instance::{CallArgument, InstanceTable, SharedInstance};
use crate::registry::{BuildFn, TypeHandlerRegistry, UpdateFn};
use crate::state::{Call, PropertyMap, StateNode, Value};

/// Property key carrying the state id a builder is materializing for.
pub const MANAGED_INSTANCE_ID: &str = "managedInstanceId";

/// Counters for one synchronization pass.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PassReport {
    /// Instances newly materialized by builders.
    pub instances_built: usize,
    /// Instances reused from the table and updated in place.
    pub instances_updated: usize,
    /// Dependency nodes cut by the exclusion policy.
    pub nodes_excluded: usize,
    /// Recorded calls replayed onto instances.
    pub calls_invoked: usize,
    /// Recorded calls dropped because every id-argument was skipped.
    pub calls_dropped: usize,
}

/// Hook invoked once at the end of every pass, after all dependencies and
/// calls were processed. Lets a host batch several synchronized roots and
/// flush native side effects exactly once.
pub type CompletionHook = Box<dyn Fn(&PassReport) + Send + Sync>;

/// The state synchronization engine.
///
/// Construct one per rendering session, register type handlers and
/// exclusion rules up front, then feed it one state tree per update via
/// [`sync`](Self::sync).
pub struct SyncEngine {
    config: SyncConfig,
    registry: TypeHandlerRegistry,
    exclusions: ExclusionPolicy,
    instances: InstanceTable,
    skipped: SkipSet,
    on_complete: Option<CompletionHook>,
    // Pass-scoped recursion depth and counters
    depth: usize,
    stats: PassReport,
}

impl SyncEngine {
    /// Create an engine with default configuration.
    pub fn new() -> Self {
        Self::with_config(SyncConfig::default())
    }

    /// Create an engine with custom configuration.
    ///
    /// An invalid configuration (such as a zero recursion limit, which
    /// would abort every tree with dependencies) is replaced with the
    /// defaults and logged.
    pub fn with_config(config: SyncConfig) -> Self {
        let config = match config.validate() {
            Ok(()) => config,
            Err(reason) => {
                log::warn!("invalid sync configuration ({reason}); using defaults");
                SyncConfig::default()
            }
        };
        Self {
            config,
            registry: TypeHandlerRegistry::new(),
            exclusions: ExclusionPolicy::new(),
            instances: InstanceTable::new(),
            skipped: SkipSet::new(),
            on_complete: None,
            depth: 0,
            stats: PassReport::default(),
        }
    }

    /// Register a builder for a type name, paired with the generic updater.
    ///
    /// This is the host-facing registration for the common case where
    /// updating an instance of the type means re-running the engine's
    /// algorithm on its node. Use [`registry_mut`](Self::registry_mut) to
    /// install a custom updater instead.
    pub fn set_type_mapping(&mut self, type_name: impl Into<String>, build: BuildFn) {
        self.registry.register_with_generic_update(type_name, build);
    }

    /// Register a handler pair with a custom updater.
    pub fn set_type_handler(
        &mut self,
        type_name: impl Into<String>,
        build: BuildFn,
        update: UpdateFn,
    ) {
        self.registry.register(type_name, build, update);
    }

    /// Install an exclusion rule: instances of `type_name` whose property
    /// `key` equals `value` are skipped rather than materialized. An empty
    /// `key` excludes the type unconditionally.
    pub fn exclude_instance(
        &mut self,
        type_name: impl Into<String>,
        key: impl Into<String>,
        value: impl Into<Value>,
    ) {
        self.exclusions.set_rule(type_name, key, value);
    }

    /// Set the hook invoked at the end of every pass.
    pub fn set_completion_hook(&mut self, hook: CompletionHook) {
        self.on_complete = Some(hook);
    }

    /// The engine configuration.
    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    /// The type-handler registry.
    pub fn registry(&self) -> &TypeHandlerRegistry {
        &self.registry
    }

    /// Mutable access to the type-handler registry.
    pub fn registry_mut(&mut self) -> &mut TypeHandlerRegistry {
        &mut self.registry
    }

    /// The exclusion policy.
    pub fn exclusions(&self) -> &ExclusionPolicy {
        &self.exclusions
    }

    /// Mutable access to the exclusion policy.
    pub fn exclusions_mut(&mut self) -> &mut ExclusionPolicy {
        &mut self.exclusions
    }

    /// The side table of managed instances (id to live instance).
    pub fn instances(&self) -> &InstanceTable {
        &self.instances
    }

    /// The wrapped ids excluded during the most recent pass.
    pub fn skip_set(&self) -> &SkipSet {
        &self.skipped
    }

    /// Drop all managed instances (end of session). Registrations and
    /// exclusion rules are long-lived configuration and stay in place.
    pub fn clear_instances(&mut self) {
        self.instances.clear();
        self.skipped.clear();
    }

    /// Run one synchronization pass: apply `state` onto `root` and its
    /// dependency graph.
    ///
    /// The skip set is rebuilt from scratch each pass. The root instance is
    /// recorded in the instance table under `state.id` so recorded calls
    /// may reference it. Exclusion cuts the whole subtree of an excluded
    /// child but marks only the direct child's wrapped id as skipped.
    ///
    /// Missing handlers degrade the affected nodes and log a diagnostic;
    /// the only fatal error is the recursion guard tripping on a cyclic or
    /// degenerate tree, which aborts this pass and leaves the engine
    /// usable.
    pub fn sync(&mut self, root: &SharedInstance, state: &StateNode) -> Result<PassReport, SyncError> {
        log::debug!("sync pass starting at root '{}'", state.id);
        self.skipped.clear();
        self.depth = 0;
        self.stats = PassReport::default();
        self.instances.insert(state.id.clone(), Arc::clone(root));

        self.apply_state(root, state)?;

        let report = self.stats;
        log::debug!(
            "sync pass done at root '{}': {} built, {} updated, {} excluded, {} calls ({} dropped)",
            state.id,
            report.instances_built,
            report.instances_updated,
            report.nodes_excluded,
            report.calls_invoked,
            report.calls_dropped,
        );
        if let Some(hook) = &self.on_complete {
            hook(&report);
        }
        Ok(report)
    }

    /// Apply one node onto one instance: own properties, then dependencies,
    /// then recorded calls.
    ///
    /// This is the re-entrant step that registered updaters call back into;
    /// the generic updater is exactly this function. A node with no
    /// dependencies performs only the property and call steps, a node with
    /// no calls only the property and dependency steps.
    pub fn apply_state(
        &mut self,
        instance: &SharedInstance,
        state: &StateNode,
    ) -> Result<(), SyncError> {
        instance.write().unwrap().set_properties(&state.properties);
        self.sync_dependencies(state)?;
        self.replay_calls(instance, state);
        Ok(())
    }

    fn sync_dependencies(&mut self, state: &StateNode) -> Result<(), SyncError> {
        for child in &state.dependencies {
            if self
                .exclusions
                .should_exclude(&child.type_name, &child.properties)
            {
                log::debug!("excluding '{}' ({})", child.id, child.type_name);
                self.skipped.insert(codec::wrap(&child.id));
                self.stats.nodes_excluded += 1;
                continue;
            }

            let instance = match self.instances.get(&child.id) {
                Some(existing) => {
                    self.stats.instances_updated += 1;
                    Some(existing)
                }
                None => {
                    let mut initial = PropertyMap::new();
                    initial.insert(MANAGED_INSTANCE_ID, child.id.as_str());
                    match self.registry.build(&child.type_name, &initial) {
                        Some(built) => {
                            log::trace!("built '{}' ({})", child.id, child.type_name);
                            self.instances.insert(child.id.clone(), Arc::clone(&built));
                            self.stats.instances_built += 1;
                            Some(built)
                        }
                        None => None,
                    }
                }
            };

            self.dispatch_update(&child.type_name, instance, child)?;
        }
        Ok(())
    }

    /// Invoke the registered updater for a child node.
    ///
    /// An absent instance is a silent no-op (nothing was materialized for
    /// this node); a missing updater logs and continues. The recursion
    /// guard lives here since the generic updater re-enters
    /// [`apply_state`](Self::apply_state).
    fn dispatch_update(
        &mut self,
        type_name: &str,
        instance: Option<SharedInstance>,
        state: &StateNode,
    ) -> Result<(), SyncError> {
        let Some(instance) = instance else {
            return Ok(());
        };
        let Some(handler) = self.registry.handler(type_name).cloned() else {
            log::warn!("no updater registered for type '{type_name}'");
            return Ok(());
        };

        if self.depth >= self.config.max_depth {
            log::error!(
                "dependency recursion limit ({}) hit at node '{}'; aborting pass",
                self.config.max_depth,
                state.id
            );
            return Err(SyncError::DepthLimitExceeded {
                id: state.id.clone(),
                max_depth: self.config.max_depth,
            });
        }

        self.depth += 1;
        let result = (handler.update)(self, &instance, state);
        self.depth -= 1;
        result
    }

    fn replay_calls(&mut self, instance: &SharedInstance, state: &StateNode) {
        for call in &state.calls {
            if !self.keep_call(call) {
                log::trace!("dropping call '{}': all referenced instances skipped", call.method);
                self.stats.calls_dropped += 1;
                continue;
            }
            let args = self.resolve_arguments(&call.args);
            instance.write().unwrap().invoke(&call.method, &args);
            self.stats.calls_invoked += 1;
        }
    }

    /// A call is kept iff at least one of its arguments is not a skipped
    /// instance id - an OR across arguments. Literal arguments always
    /// survive, so calls with zero id-arguments are always kept.
    fn keep_call(&self, call: &Call) -> bool {
        if call.args.is_empty() {
            return true;
        }
        call.args.iter().any(|arg| !self.is_skipped_reference(arg))
    }

    fn is_skipped_reference(&self, arg: &Value) -> bool {
        matches!(arg, Value::String(s) if self.skipped.contains(s))
    }

    /// Replace wrapped-id tokens with live instances; everything else
    /// passes through unchanged. A reference to an instance that was never
    /// built (or was excluded) resolves to [`CallArgument::Missing`], which
    /// the callee must tolerate.
    fn resolve_arguments(&self, args: &[Value]) -> Vec<CallArgument> {
        args.iter()
            .map(|arg| match arg {
                Value::String(s) => match codec::try_unwrap(s) {
                    Some(id) => match self.instances.get(id) {
                        Some(instance) => CallArgument::Instance(instance),
                        None => {
                            log::trace!("argument references unavailable instance '{id}'");
                            CallArgument::Missing
                        }
                    },
                    None => CallArgument::Value(arg.clone()),
                },
                other => CallArgument::Value(other.clone()),
            })
            .collect()
    }
}

impl Default for SyncEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for SyncEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncEngine")
            .field("config", &self.config)
            .field("registered_types", &self.registry.len())
            .field("managed_instances", &self.instances.len())
            .finish()
    }
}
