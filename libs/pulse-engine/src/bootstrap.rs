use std::sync::Arc;

use futures_util::StreamExt;

use pulse_api::{
    EventStream, Message, MessageRepository, MessageStream, Stage, StageContext, StageError,
};

use crate::config::{PulseConfig, StageConfig, StoreConfig};
use crate::error::EngineError;
use crate::registry::{PluginRegistry, StoreRegistry};

/// A configured pipeline: stores opened, stages configured, nothing running.
pub struct Engine {
    stores: Arc<StoreRegistry>,
    stages: Vec<Box<dyn Stage>>,
    config: PulseConfig,
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("stores", &self.stores)
            .field("stages", &self.stages.iter().map(|s| s.name()).collect::<Vec<_>>())
            .finish()
    }
}

impl Engine {
    /// Bootstrap the engine from a parsed configuration.
    ///
    /// Creates stores, then configures every stage. Any configuration problem
    /// fails here, before a single stream is attached.
    pub fn bootstrap(config: PulseConfig, plugins: &PluginRegistry) -> Result<Self, EngineError> {
        config.validate()?;

        // --- 1. Create stores ---
        let stores = Arc::new(StoreRegistry::new());
        for store_cfg in &config.stores {
            let store_ctx = format!("store '{}'", store_cfg.name);
            let repository =
                create_store(store_cfg, plugins).map_err(|e| e.with_context(&store_ctx))?;
            tracing::info!(store = %store_cfg.name, kind = %store_cfg.kind, "created store");
            stores.register(store_cfg.name.clone(), repository);
        }

        // --- 2. Configure stages ---
        let ctx = StageContext {
            repositories: stores.clone(),
        };
        let mut stages = Vec::with_capacity(config.stages.len());
        for stage_cfg in &config.stages {
            let stage_ctx = format!("stage '{}'", stage_cfg.name);
            let stage =
                configure_stage(stage_cfg, plugins, &ctx).map_err(|e| e.with_context(&stage_ctx))?;
            tracing::info!(stage = %stage_cfg.name, plugin = %stage_cfg.plugin, "configured stage");
            stages.push(stage);
        }

        Ok(Engine {
            stores,
            stages,
            config,
        })
    }

    pub fn stores(&self) -> &Arc<StoreRegistry> {
        &self.stores
    }

    pub fn config(&self) -> &PulseConfig {
        &self.config
    }

    /// Attach the stage chain to `input`.
    ///
    /// Messages leaving one stage become the events of the next one.
    pub fn process(&self, input: EventStream) -> MessageStream {
        let mut stages = self.stages.iter();
        // bootstrap guarantees at least one stage
        let Some(first) = stages.next() else {
            return Box::pin(futures_util::stream::once(async {
                Err::<Message, _>(StageError::config("pipeline has no stages"))
            }));
        };

        let mut output = first.process(input);
        for stage in stages {
            output = stage.process(into_events(output));
        }
        output
    }
}

/// Re-type a message stream as the event input of the next stage.
pub fn into_events(messages: MessageStream) -> EventStream {
    Box::pin(messages.map(|item| item.and_then(|m| m.into_event().map_err(StageError::from))))
}

fn create_store(
    cfg: &StoreConfig,
    plugins: &PluginRegistry,
) -> Result<Arc<dyn MessageRepository>, EngineError> {
    let factory = plugins
        .repository(&cfg.kind)
        .ok_or_else(|| EngineError::UnknownStoreKind(cfg.kind.clone()))?;
    Ok(factory.create(cfg.config.as_ref())?)
}

fn configure_stage(
    cfg: &StageConfig,
    plugins: &PluginRegistry,
    ctx: &StageContext,
) -> Result<Box<dyn Stage>, EngineError> {
    let factory = plugins
        .stage(&cfg.plugin)
        .ok_or_else(|| EngineError::UnknownPlugin(cfg.plugin.clone()))?;
    Ok(factory.configure(&cfg.name, cfg.config.as_ref(), ctx)?)
}
