use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use crate::container::LoadedContainer;

/// The process-wide associative store from §4.D: container name to
/// loaded container. The only shared mutable resource in the core (§5);
/// `add` takes the write lock, everything else takes the read lock.
#[derive(Default)]
pub struct ContainerCache {
    containers: RwLock<HashMap<String, Arc<LoadedContainer>>>,
}

impl ContainerCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_cached(&self, name: &str) -> bool {
        self.containers.read().unwrap().contains_key(name)
    }

    pub fn get(&self, name: &str) -> Option<Arc<LoadedContainer>> {
        self.containers.read().unwrap().get(name).cloned()
    }

    pub fn add(&self, container: LoadedContainer) -> Arc<LoadedContainer> {
        let name = container.name().to_string();
        let container = Arc::new(container);
        self.containers.write().unwrap().insert(name, Arc::clone(&container));
        container
    }

    /// The resolver-facing contract named in §4.D/§6: `None` signals
    /// `UnresolvedContainer` to the caller.
    pub fn resolve(&self, name: &str) -> Option<Arc<LoadedContainer>> {
        self.get(name)
    }
}
