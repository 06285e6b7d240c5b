use std::collections::HashMap;
use std::sync::Arc;

use pulse_api::{MessageRepository, RepositoryFactory, RepositoryProvider, StageError, StageFactory};

use crate::config::DEFAULT_STORE;

/// Stage and store kinds known to the host. The host lists every one
/// it ships with. Nothing is discovered at runtime.
#[derive(Default)]
pub struct PluginRegistry {
    stages: HashMap<String, Arc<dyn StageFactory>>,
    repositories: HashMap<String, Arc<dyn RepositoryFactory>>,
}

impl std::fmt::Debug for PluginRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PluginRegistry")
            .field("stages", &self.stages.keys().collect::<Vec<_>>())
            .field("repositories", &self.repositories.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl PluginRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_stage(&mut self, factory: impl StageFactory + 'static) -> &mut Self {
        let name = factory.plugin().to_string();
        if self.stages.insert(name.clone(), Arc::new(factory)).is_some() {
            tracing::warn!(plugin = %name, "stage plugin registered twice, keeping the last one");
        }
        self
    }

    pub fn register_repository(&mut self, factory: impl RepositoryFactory + 'static) -> &mut Self {
        let kind = factory.kind().to_string();
        if self.repositories.insert(kind.clone(), Arc::new(factory)).is_some() {
            tracing::warn!(kind = %kind, "store kind registered twice, keeping the last one");
        }
        self
    }

    pub fn stage(&self, plugin: &str) -> Option<Arc<dyn StageFactory>> {
        self.stages.get(plugin).cloned()
    }

    pub fn repository(&self, kind: &str) -> Option<Arc<dyn RepositoryFactory>> {
        self.repositories.get(kind).cloned()
    }
}

/// Registry of all named stores in the engine.
#[derive(Default)]
pub struct StoreRegistry {
    stores: std::sync::RwLock<HashMap<String, Arc<dyn MessageRepository>>>,
}

impl std::fmt::Debug for StoreRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoreRegistry")
            .field("stores", &self.store_names())
            .finish()
    }
}

impl StoreRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, name: impl Into<String>, repository: Arc<dyn MessageRepository>) {
        let mut guard = match self.stores.write() {
            Ok(g) => g,
            Err(poisoned) => {
                tracing::warn!("store registry write lock was poisoned, recovering");
                poisoned.into_inner()
            }
        };
        guard.insert(name.into(), repository);
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn MessageRepository>> {
        let guard = match self.stores.read() {
            Ok(g) => g,
            Err(poisoned) => {
                tracing::warn!("store registry read lock was poisoned, recovering");
                poisoned.into_inner()
            }
        };
        guard.get(name).cloned()
    }

    pub fn store_names(&self) -> Vec<String> {
        let guard = match self.stores.read() {
            Ok(g) => g,
            Err(poisoned) => {
                tracing::warn!("store registry read lock was poisoned, recovering");
                poisoned.into_inner()
            }
        };
        let mut names: Vec<String> = guard.keys().cloned().collect();
        names.sort();
        names
    }
}

impl RepositoryProvider for StoreRegistry {
    fn repository(&self, store: Option<&str>) -> Result<Arc<dyn MessageRepository>, StageError> {
        let name = store.unwrap_or(DEFAULT_STORE);
        self.get(name).ok_or_else(|| {
            StageError::config(format!(
                "store '{name}' not found (known: {:?})",
                self.store_names()
            ))
        })
    }
}

#[cfg(test)]
mod tests {
    use futures_util::stream;

    use pulse_api::{Bounds, ErrorKind, MessageStream};

    use super::*;

    struct EmptyRepository;

    impl MessageRepository for EmptyRepository {
        fn find(&self, _bounds: &Bounds) -> MessageStream {
            Box::pin(stream::empty::<Result<pulse_api::Message, StageError>>())
        }
    }

    #[test]
    fn missing_store_reference_defaults_to_default() {
        let stores = StoreRegistry::new();
        stores.register("default", Arc::new(EmptyRepository));
        stores.register("archive", Arc::new(EmptyRepository));

        assert!(stores.repository(None).is_ok());
        assert!(stores.repository(Some("archive")).is_ok());

        let err = stores.repository(Some("nope")).err().unwrap();
        assert_eq!(err.kind, ErrorKind::Config);
        assert!(err.message.contains("archive"));
    }

    #[test]
    fn no_default_store_is_a_config_error() {
        let stores = StoreRegistry::new();
        stores.register("archive", Arc::new(EmptyRepository));
        let err = stores.repository(None).err().unwrap();
        assert!(err.is_config());
    }
}
