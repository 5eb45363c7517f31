//! In-memory registry of active persona instances.
//!
//! The map itself sits behind an `RwLock` and each instance behind its own
//! `Mutex`, so two requests for different instances never contend on the
//! instance lock. Callers copy what they need out of an instance, release
//! it, talk to the model, then re-acquire to apply mutations; no lock is
//! held across a model call.

use std::collections::HashMap;
use std::sync::Arc;

use aurora_common::PersonaInstance;
use tokio::sync::{Mutex, RwLock};

type InstanceHandle = Arc<Mutex<PersonaInstance>>;

/// Registry of activated instances. Cheap to clone; clones share storage.
#[derive(Debug, Clone, Default)]
pub struct InstanceRegistry {
    instances: Arc<RwLock<HashMap<String, InstanceHandle>>>,
}

impl InstanceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert `instance`, replacing any previous entry with the same id.
    pub async fn register(&self, instance: PersonaInstance) {
        let id = instance.instance_id.clone();
        let replaced = self
            .instances
            .write()
            .await
            .insert(id.clone(), Arc::new(Mutex::new(instance)))
            .is_some();
        tracing::info!(instance_id = %id, replaced, "Registered persona instance");
    }

    async fn handle(&self, instance_id: &str) -> Option<InstanceHandle> {
        self.instances.read().await.get(instance_id).cloned()
    }

    pub async fn contains(&self, instance_id: &str) -> bool {
        self.instances.read().await.contains_key(instance_id)
    }

    /// Copy of the instance as it is right now.
    pub async fn snapshot(&self, instance_id: &str) -> Option<PersonaInstance> {
        let handle = self.handle(instance_id).await?;
        let instance = handle.lock().await;
        Some(instance.clone())
    }

    /// Run `f` with exclusive access to one instance. Returns `None` when the
    /// id is not registered, in which case nothing is touched.
    pub async fn update<R>(
        &self,
        instance_id: &str,
        f: impl FnOnce(&mut PersonaInstance) -> R,
    ) -> Option<R> {
        let handle = self.handle(instance_id).await?;
        let mut instance = handle.lock().await;
        Some(f(&mut instance))
    }

    /// Copies of every registered instance, ordered by id.
    pub async fn list(&self) -> Vec<PersonaInstance> {
        let handles: Vec<InstanceHandle> = self.instances.read().await.values().cloned().collect();
        let mut out = Vec::with_capacity(handles.len());
        for handle in handles {
            out.push(handle.lock().await.clone());
        }
        out.sort_by(|a, b| a.instance_id.cmp(&b.instance_id));
        out
    }

    pub async fn len(&self) -> usize {
        self.instances.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.instances.read().await.is_empty()
    }
}
