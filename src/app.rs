use std::sync::Arc;

use crate::config::{Config, StoreBackend};
use crate::error::Result;
use crate::services::{PlanService, TaskListService, TaskService, UserService};
use crate::store::{DocumentStore, MemoryStore, SqliteDocumentStore};

/// Every service wired to one shared store handle.
#[derive(Clone)]
pub struct Planboard {
    store: Arc<dyn DocumentStore>,
    pub users: UserService,
    pub plans: PlanService,
    pub task_lists: TaskListService,
    pub tasks: TaskService,
}

impl Planboard {
    pub async fn from_config(config: &Config) -> Result<Self> {
        let store: Arc<dyn DocumentStore> = match config.store.backend {
            StoreBackend::Memory => Arc::new(MemoryStore::new()),
            StoreBackend::Sqlite => {
                let path = config.resolved_sqlite_path();
                Arc::new(SqliteDocumentStore::new(&path).await?)
            }
        };
        tracing::info!(backend = config.store.backend.as_str(), "Planboard store ready");
        Ok(Self::with_store(store))
    }

    pub fn with_store(store: Arc<dyn DocumentStore>) -> Self {
        Self {
            users: UserService::new(store.clone()),
            plans: PlanService::new(store.clone()),
            task_lists: TaskListService::new(store.clone()),
            tasks: TaskService::new(store.clone()),
            store,
        }
    }

    pub fn store(&self) -> Arc<dyn DocumentStore> {
        self.store.clone()
    }
}
