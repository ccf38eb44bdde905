//! Viewer demo - drives the sync engine with a mock renderer backend
//!
//! Registers a handful of mock renderer-side types, loads a JSON scene
//! description, and runs two synchronization passes: the initial build and
//! a follow-up property update. Everything the engine does is visible in
//! the log output (`RUST_LOG=debug` for pass details).

use std::sync::Arc;

use scene_sync::prelude::*;

/// Mock renderer-side object: stores applied properties and logs every
/// replayed call instead of touching a real graphics API.
struct MockObject {
    type_name: String,
    id: String,
    properties: PropertyMap,
}

impl MockObject {
    fn new(type_name: &str, id: String) -> Self {
        Self {
            type_name: type_name.to_string(),
            id,
            properties: PropertyMap::new(),
        }
    }
}

impl SceneInstance for MockObject {
    fn type_name(&self) -> &str {
        &self.type_name
    }

    fn set_properties(&mut self, properties: &PropertyMap) {
        for (key, value) in properties {
            log::info!(
                "[{} '{}'] set {} = {:?}",
                self.type_name,
                self.id,
                key,
                value
            );
            self.properties.insert(key.clone(), value.clone());
        }
    }

    fn invoke(&mut self, method: &str, args: &[CallArgument]) {
        let described: Vec<String> = args
            .iter()
            .map(|arg| match arg {
                CallArgument::Value(value) => format!("{value:?}"),
                CallArgument::Instance(_) => "<instance>".to_string(),
                CallArgument::Missing => "<missing>".to_string(),
            })
            .collect();
        log::info!(
            "[{} '{}'] {}({})",
            self.type_name,
            self.id,
            method,
            described.join(", ")
        );
    }
}

/// Builder for a mock type: reads the managed instance id out of the
/// initial properties so log lines can be correlated.
fn mock_builder(type_name: &'static str) -> BuildFn {
    Arc::new(move |props: &PropertyMap| {
        let id = props
            .get(MANAGED_INSTANCE_ID)
            .and_then(Value::as_str)
            .unwrap_or("?")
            .to_string();
        log::info!("building {type_name} '{id}'");
        Some(share(MockObject::new(type_name, id)))
    })
}

const INITIAL_SCENE: &str = r#"
{
    "id": "rw1",
    "type": "RenderWindow",
    "properties": {"numberOfLayers": 1},
    "dependencies": [
        {
            "id": "ren1",
            "type": "Renderer",
            "properties": {"background": [0.1, 0.1, 0.1]},
            "dependencies": [
                {
                    "id": "actor1",
                    "type": "Actor",
                    "properties": {"visibility": true},
                    "dependencies": [
                        {
                            "id": "mapper1",
                            "type": "Mapper",
                            "properties": {"scalarVisibility": false}
                        }
                    ],
                    "calls": [["setMapper", ["instance:${mapper1}"]]]
                },
                {
                    "id": "overlay1",
                    "type": "Renderer",
                    "properties": {"layer": 1}
                }
            ],
            "calls": [["addActor", ["instance:${actor1}"]]]
        }
    ],
    "calls": [["addRenderer", ["instance:${ren1}"]], ["addRenderer", ["instance:${overlay1}"]]]
}
"#;

const UPDATED_SCENE: &str = r#"
{
    "id": "rw1",
    "type": "RenderWindow",
    "properties": {"numberOfLayers": 1},
    "dependencies": [
        {
            "id": "ren1",
            "type": "Renderer",
            "properties": {"background": [1.0, 1.0, 1.0]},
            "dependencies": [
                {
                    "id": "actor1",
                    "type": "Actor",
                    "properties": {"visibility": false}
                }
            ]
        }
    ]
}
"#;

fn run(config: SyncConfig) -> Result<(), SyncError> {
    let mut engine = SyncEngine::with_config(config);
    engine.set_type_mapping("Renderer", mock_builder("Renderer"));
    engine.set_type_mapping("Actor", mock_builder("Actor"));
    engine.set_type_mapping("Mapper", mock_builder("Mapper"));

    // Overlay renderers live on layer 1 and are managed by the host
    // compositor, not materialized separately
    engine.exclude_instance("Renderer", "layer", 1i64);

    engine.set_completion_hook(Box::new(|report: &PassReport| {
        log::info!(
            "pass complete: {} built, {} updated, {} excluded, {} calls invoked, {} dropped",
            report.instances_built,
            report.instances_updated,
            report.nodes_excluded,
            report.calls_invoked,
            report.calls_dropped
        );
    }));

    let window = share(MockObject::new("RenderWindow", "rw1".to_string()));

    log::info!("--- initial pass ---");
    let initial = StateNode::from_json_str(INITIAL_SCENE)?;
    engine.sync(&window, &initial)?;

    log::info!("--- update pass ---");
    let updated = StateNode::from_json_str(UPDATED_SCENE)?;
    engine.sync(&window, &updated)?;

    log::info!(
        "session holds {} live instances for types {:?}",
        engine.instances().len(),
        engine.registry().supported_types()
    );
    Ok(())
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .init();

    log::info!("Starting scene sync viewer demo");

    // Optional first argument: a .toml or .ron file with engine settings
    let config = match std::env::args().nth(1) {
        Some(path) => {
            log::info!("loading sync settings from {path}");
            SyncConfig::load_from_file(&path)?
        }
        None => SyncConfig::default(),
    };

    run(config)?;
    log::info!("Viewer demo finished successfully");
    Ok(())
}
