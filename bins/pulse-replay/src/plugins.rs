use pulse_engine::PluginRegistry;
use pulse_stage_message_fetch::MessageFetchFactory;
use pulse_storage_file::FileRepositoryFactory;
use pulse_storage_memory::MemoryRepositoryFactory;

/// Every stage and store kind this binary ships with.
pub fn builtin() -> PluginRegistry {
    let mut registry = PluginRegistry::new();
    registry
        .register_repository(MemoryRepositoryFactory)
        .register_repository(FileRepositoryFactory)
        .register_stage(MessageFetchFactory);
    tracing::debug!(?registry, "registered builtin plugins");
    registry
}
