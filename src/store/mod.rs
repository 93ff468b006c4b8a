use async_trait::async_trait;
use serde::Serialize;
use serde_json::{Map, Value};

use crate::error::{PlanboardError, Result};
use crate::ident::ObjectRef;

pub mod memory;
pub mod query;
mod schema;
pub mod sqlite;

pub use memory::MemoryStore;
pub use query::{Filter, FindOptions, Patch, Sort, SortOrder, UpdateOne};
pub use sqlite::SqliteDocumentStore;

/// A stored record: a JSON object whose `_id` is a 24-hex identifier.
pub type Document = Map<String, Value>;

pub const ID_FIELD: &str = "_id";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Collection {
    Users,
    Plans,
    TaskLists,
    Tasks,
}

impl Collection {
    pub const ALL: [Collection; 4] = [
        Collection::Users,
        Collection::Plans,
        Collection::TaskLists,
        Collection::Tasks,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Self::Users => "users",
            Self::Plans => "plans",
            Self::TaskLists => "task_lists",
            Self::Tasks => "tasks",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|collection| collection.name() == name)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct UpdateResult {
    pub matched: u64,
    pub modified: u64,
}

impl UpdateResult {
    pub fn absorb(&mut self, other: UpdateResult) {
        self.matched += other.matched;
        self.modified += other.modified;
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DeleteResult {
    pub deleted: u64,
}

/// Minimal document-store contract: single-document operations are atomic,
/// nothing else is. No transactions and no joins.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Inserts `doc`, assigning a fresh `_id` when it has none.
    async fn insert_one(&self, collection: Collection, doc: Document) -> Result<ObjectRef>;

    async fn find_one(
        &self,
        collection: Collection,
        filter: &Filter,
        options: &FindOptions,
    ) -> Result<Option<Document>>;

    /// Matching documents in insertion order, then sorted, skipped and
    /// limited per `options`.
    async fn find(
        &self,
        collection: Collection,
        filter: &Filter,
        options: &FindOptions,
    ) -> Result<Vec<Document>>;

    async fn count(&self, collection: Collection, filter: &Filter) -> Result<u64>;

    async fn update_one(
        &self,
        collection: Collection,
        filter: &Filter,
        patch: &Patch,
    ) -> Result<UpdateResult>;

    async fn delete_one(&self, collection: Collection, filter: &Filter) -> Result<DeleteResult>;

    async fn delete_many(&self, collection: Collection, filter: &Filter)
        -> Result<DeleteResult>;

    /// Applies every update independently; an instruction matching nothing
    /// contributes zero to the aggregate.
    async fn bulk_write(&self, collection: Collection, ops: &[UpdateOne])
        -> Result<UpdateResult>;
}

/// Returns the document id, inserting a fresh one when absent.
pub(crate) fn ensure_id(doc: &mut Document) -> Result<ObjectRef> {
    match doc.get(ID_FIELD) {
        Some(Value::String(raw)) => ObjectRef::decode(raw),
        Some(other) => Err(PlanboardError::InvalidIdentifier(format!(
            "document _id must be a hex string, got {other}"
        ))),
        None => {
            let id = ObjectRef::new();
            doc.insert(ID_FIELD.to_string(), id.into());
            Ok(id)
        }
    }
}
