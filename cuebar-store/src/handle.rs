//! Async access to a store

use crate::{Result, TimelineStore};
use cuebar_core::TimelineSnapshot;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Cloneable async handle around a blocking store.
///
/// Calls run on tokio's blocking pool one at a time: a second request waits
/// until the one in flight has finished.
pub struct StoreHandle<S> {
    store: Arc<Mutex<S>>,
}

impl<S> Clone for StoreHandle<S> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
        }
    }
}

impl<S: TimelineStore + Send + 'static> StoreHandle<S> {
    pub fn new(store: S) -> Self {
        Self {
            store: Arc::new(Mutex::new(store)),
        }
    }

    async fn execute<T, F>(&self, task: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&mut S) -> Result<T> + Send + 'static,
    {
        let mut guard = self.store.clone().lock_owned().await;
        tokio::task::spawn_blocking(move || task(&mut guard)).await?
    }

    pub async fn save(&self, id: &str, snapshot: TimelineSnapshot) -> Result<()> {
        let id = id.to_string();
        self.execute(move |store| store.save(&id, &snapshot)).await
    }

    pub async fn load_by_id(&self, id: &str) -> Result<Option<TimelineSnapshot>> {
        let id = id.to_string();
        self.execute(move |store| store.load_by_id(&id)).await
    }

    pub async fn list(&self) -> Result<Vec<String>> {
        self.execute(|store| store.list()).await
    }
}
