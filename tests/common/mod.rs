#![allow(dead_code)]

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex as AsyncMutex;

use planboard::error::Result;
use planboard::model::{NewPlan, NewTask, NewTaskList, NewUser, Plan, Priority, Task, TaskList};
use planboard::store::{
    Collection, DeleteResult, Document, DocumentStore, Filter, FindOptions, MemoryStore, Patch,
    UpdateOne, UpdateResult,
};
use planboard::{ObjectRef, Planboard};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreOp {
    InsertOne,
    FindOne,
    Find,
    Count,
    UpdateOne,
    DeleteOne,
    DeleteMany,
    BulkWrite,
}

impl StoreOp {
    pub fn is_write(&self) -> bool {
        matches!(
            self,
            Self::InsertOne | Self::UpdateOne | Self::DeleteOne | Self::DeleteMany | Self::BulkWrite
        )
    }
}

/// Memory store that records every call made through it.
#[derive(Default)]
pub struct SpyStore {
    inner: MemoryStore,
    calls: Arc<AsyncMutex<Vec<(StoreOp, Collection)>>>,
}

impl SpyStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn calls(&self) -> Vec<(StoreOp, Collection)> {
        self.calls.lock().await.clone()
    }

    pub async fn writes(&self) -> Vec<(StoreOp, Collection)> {
        self.calls()
            .await
            .into_iter()
            .filter(|(op, _)| op.is_write())
            .collect()
    }

    pub async fn reset(&self) {
        self.calls.lock().await.clear();
    }

    async fn record(&self, op: StoreOp, collection: Collection) {
        self.calls.lock().await.push((op, collection));
    }
}

#[async_trait]
impl DocumentStore for SpyStore {
    async fn insert_one(&self, collection: Collection, doc: Document) -> Result<ObjectRef> {
        self.record(StoreOp::InsertOne, collection).await;
        self.inner.insert_one(collection, doc).await
    }

    async fn find_one(
        &self,
        collection: Collection,
        filter: &Filter,
        options: &FindOptions,
    ) -> Result<Option<Document>> {
        self.record(StoreOp::FindOne, collection).await;
        self.inner.find_one(collection, filter, options).await
    }

    async fn find(
        &self,
        collection: Collection,
        filter: &Filter,
        options: &FindOptions,
    ) -> Result<Vec<Document>> {
        self.record(StoreOp::Find, collection).await;
        self.inner.find(collection, filter, options).await
    }

    async fn count(&self, collection: Collection, filter: &Filter) -> Result<u64> {
        self.record(StoreOp::Count, collection).await;
        self.inner.count(collection, filter).await
    }

    async fn update_one(
        &self,
        collection: Collection,
        filter: &Filter,
        patch: &Patch,
    ) -> Result<UpdateResult> {
        self.record(StoreOp::UpdateOne, collection).await;
        self.inner.update_one(collection, filter, patch).await
    }

    async fn delete_one(&self, collection: Collection, filter: &Filter) -> Result<DeleteResult> {
        self.record(StoreOp::DeleteOne, collection).await;
        self.inner.delete_one(collection, filter).await
    }

    async fn delete_many(
        &self,
        collection: Collection,
        filter: &Filter,
    ) -> Result<DeleteResult> {
        self.record(StoreOp::DeleteMany, collection).await;
        self.inner.delete_many(collection, filter).await
    }

    async fn bulk_write(
        &self,
        collection: Collection,
        ops: &[UpdateOne],
    ) -> Result<UpdateResult> {
        self.record(StoreOp::BulkWrite, collection).await;
        self.inner.bulk_write(collection, ops).await
    }
}

pub fn spy_board() -> (Arc<SpyStore>, Planboard) {
    let spy = Arc::new(SpyStore::new());
    let board = Planboard::with_store(spy.clone());
    (spy, board)
}

pub fn memory_board() -> Planboard {
    Planboard::with_store(Arc::new(MemoryStore::new()))
}

pub async fn seed_plan(board: &Planboard, title: &str) -> Plan {
    let user = board
        .users
        .create(NewUser {
            username: format!("owner-of-{title}"),
            email: format!("{}@example.com", title.to_lowercase().replace(' ', "-")),
            password_hash: "$2b$12$hash".to_string(),
        })
        .await
        .unwrap();
    board
        .plans
        .create(NewPlan {
            title: title.to_string(),
            description: format!("{title} description"),
            user_id: user.id.to_hex(),
        })
        .await
        .unwrap()
}

pub async fn seed_task_list(board: &Planboard, plan: &Plan, title: &str) -> TaskList {
    board
        .task_lists
        .create(NewTaskList {
            title: title.to_string(),
            description: String::new(),
            plan_id: plan.id.to_hex(),
        })
        .await
        .unwrap()
}

pub async fn seed_task(board: &Planboard, task_list: &TaskList, title: &str) -> Task {
    board
        .tasks
        .create(new_task(task_list, title))
        .await
        .unwrap()
}

pub fn new_task(task_list: &TaskList, title: &str) -> NewTask {
    NewTask {
        title: title.to_string(),
        description: String::new(),
        task_list_id: task_list.id.to_hex(),
        due_date: 1_767_225_600_000,
        priority: Priority::Medium,
        status: Default::default(),
    }
}

pub async fn count(store: &dyn DocumentStore, collection: Collection, filter: Filter) -> u64 {
    store.count(collection, &filter).await.unwrap()
}
