//! # Scene Sync
//!
//! Synchronizes a serialized, versioned scene-graph description onto a live
//! set of stateful renderer-side object instances.
//!
//! A host delivers one state tree per update: a tree of typed object states
//! with properties, nested dependencies, and recorded method calls. The
//! engine walks it in a single pass - properties first, then dependencies
//! (building or updating live instances through a pluggable type-handler
//! registry, consulting per-type exclusion rules), then call replay with
//! wrapped instance-id arguments resolved against the live graph.
//!
//! ## Architecture
//!
//! ```text
//! Host UI framework (state trees)
//!          ↓
//! SyncEngine (this crate)
//!   ├─ ExclusionPolicy / SkipSet
//!   ├─ TypeHandlerRegistry (build / update per type)
//!   └─ InstanceTable (id → live instance)
//!          ↓
//! Renderer-side instances (external collaborator)
//! ```
//!
//! Rendering itself is out of scope: instances are opaque mutable objects
//! exposing property application and string-named method dispatch.
//!
//! ## Quick Start
//!
//! ```
//! use scene_sync::prelude::*;
//! use std::sync::Arc;
//!
//! struct Cube {
//!     size: f64,
//! }
//!
//! impl SceneInstance for Cube {
//!     fn type_name(&self) -> &str {
//!         "Cube"
//!     }
//!     fn set_properties(&mut self, properties: &PropertyMap) {
//!         if let Some(size) = properties.get("size").and_then(Value::as_f64) {
//!             self.size = size;
//!         }
//!     }
//!     fn invoke(&mut self, _method: &str, _args: &[CallArgument]) {}
//! }
//! # struct Window;
//! # impl SceneInstance for Window {
//! #     fn type_name(&self) -> &str { "RenderWindow" }
//! #     fn set_properties(&mut self, _properties: &PropertyMap) {}
//! #     fn invoke(&mut self, _method: &str, _args: &[CallArgument]) {}
//! # }
//!
//! let mut engine = SyncEngine::new();
//! engine.set_type_mapping(
//!     "Cube",
//!     Arc::new(|_props: &PropertyMap| Some(share(Cube { size: 1.0 }))),
//! );
//!
//! let state = StateNode::from_json_str(
//!     r#"{
//!         "id": "rw1",
//!         "type": "RenderWindow",
//!         "dependencies": [
//!             {"id": "c1", "type": "Cube", "properties": {"size": 2}}
//!         ]
//!     }"#,
//! )?;
//!
//! let window = share(Window);
//! let report = engine.sync(&window, &state)?;
//! assert_eq!(report.instances_built, 1);
//! # Ok::<(), scene_sync::SyncError>(())
//! ```

#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions, clippy::similar_names, clippy::missing_errors_doc)]

pub mod codec;
pub mod config;
pub mod engine;
pub mod error;
pub mod exclusion;
pub mod instance;
pub mod registry;
pub mod state;

pub use config::{Config, ConfigError, SyncConfig};
pub use engine::{CompletionHook, PassReport, SyncEngine, MANAGED_INSTANCE_ID};
pub use error::SyncError;
pub use exclusion::{ExclusionPolicy, ExclusionRule, SkipSet};
pub use instance::{share, CallArgument, InstanceTable, SceneInstance, SharedInstance};
pub use registry::{generic_updater, BuildFn, TypeHandler, TypeHandlerRegistry, UpdateFn};
pub use state::{Call, PropertyMap, StateNode, Value};

/// Common imports for engine users
pub mod prelude {
    pub use crate::{
        codec,
        config::{Config, SyncConfig},
        engine::{PassReport, SyncEngine, MANAGED_INSTANCE_ID},
        error::SyncError,
        exclusion::{ExclusionPolicy, SkipSet},
        instance::{share, CallArgument, SceneInstance, SharedInstance},
        registry::{BuildFn, TypeHandlerRegistry, UpdateFn},
        state::{Call, PropertyMap, StateNode, Value},
    };
}
