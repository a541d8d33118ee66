//! Process-wide cache of loaded projects.
//!
//! Projects are keyed by id and never evicted. Each id owns an
//! initialization cell, so concurrent first requests for the same id share
//! a single load, and a failed load leaves nothing behind.

use crate::{CoreError, Project};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::OnceCell;

type ProjectCell = Arc<OnceCell<Arc<Project>>>;

/// Cache of loaded projects, keyed by project id
#[derive(Default)]
pub struct ProjectCache {
    entries: Mutex<HashMap<String, ProjectCell>>,
}

impl ProjectCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get a loaded project
    pub fn get(&self, id: &str) -> Option<Arc<Project>> {
        self.entries
            .lock()
            .get(id)
            .and_then(|cell| cell.get().cloned())
    }

    /// Get a loaded project, or run `load` to produce it.
    ///
    /// Only one `load` runs per id at a time; callers racing on the same id
    /// wait for it and receive the same handle.
    pub async fn get_or_try_load<F, Fut>(&self, id: &str, load: F) -> Result<Arc<Project>, CoreError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Project, CoreError>>,
    {
        let cell = self.entries.lock().entry(id.to_string()).or_default().clone();

        let result = cell
            .get_or_try_init(|| async move { load().await.map(Arc::new) })
            .await
            .map(Arc::clone);
        drop(cell);

        if result.is_err() {
            self.remove_unused_cell(id);
        }
        result
    }

    /// Drop the cell for `id` when it is empty and no caller still holds it
    fn remove_unused_cell(&self, id: &str) {
        let mut entries = self.entries.lock();
        let unused = entries
            .get(id)
            .is_some_and(|cell| !cell.initialized() && Arc::strong_count(cell) == 1);
        if unused {
            entries.remove(id);
        }
    }

    /// Number of loaded projects
    pub fn len(&self) -> usize {
        self.entries
            .lock()
            .values()
            .filter(|cell| cell.initialized())
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Ids of all loaded projects
    pub fn ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self
            .entries
            .lock()
            .iter()
            .filter(|(_, cell)| cell.initialized())
            .map(|(id, _)| id.clone())
            .collect();
        ids.sort();
        ids
    }
}
