use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::error::{PlanboardError, Result};
use crate::ident::ObjectRef;

use super::{
    ensure_id, Collection, DeleteResult, Document, DocumentStore, Filter, FindOptions, Patch,
    UpdateOne, UpdateResult, ID_FIELD,
};

/// In-process store keeping each collection in insertion order.
#[derive(Default)]
pub struct MemoryStore {
    collections: RwLock<HashMap<Collection, Vec<Document>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self, collection: Collection) -> usize {
        self.collections
            .read()
            .await
            .get(&collection)
            .map(Vec::len)
            .unwrap_or(0)
    }

    pub async fn is_empty(&self) -> bool {
        self.collections.read().await.values().all(Vec::is_empty)
    }
}

fn update_matching(docs: &mut [Document], filter: &Filter, patch: &Patch) -> UpdateResult {
    let mut result = UpdateResult::default();
    if let Some(doc) = docs.iter_mut().find(|doc| filter.matches(doc)) {
        result.matched = 1;
        if patch.apply(doc) {
            result.modified = 1;
        }
    }
    result
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn insert_one(&self, collection: Collection, mut doc: Document) -> Result<ObjectRef> {
        let id = ensure_id(&mut doc)?;
        let mut guard = self.collections.write().await;
        let docs = guard.entry(collection).or_default();
        let hex = id.to_hex();
        if docs
            .iter()
            .any(|existing| existing.get(ID_FIELD).and_then(|v| v.as_str()) == Some(hex.as_str()))
        {
            return Err(PlanboardError::Storage(format!(
                "duplicate _id {hex} in {}",
                collection.name()
            )));
        }
        docs.push(doc);
        Ok(id)
    }

    async fn find_one(
        &self,
        collection: Collection,
        filter: &Filter,
        options: &FindOptions,
    ) -> Result<Option<Document>> {
        let options = options.clone().limit(1);
        Ok(self
            .find(collection, filter, &options)
            .await?
            .into_iter()
            .next())
    }

    async fn find(
        &self,
        collection: Collection,
        filter: &Filter,
        options: &FindOptions,
    ) -> Result<Vec<Document>> {
        let guard = self.collections.read().await;
        let matching = guard
            .get(&collection)
            .map(|docs| {
                docs.iter()
                    .filter(|doc| filter.matches(doc))
                    .cloned()
                    .collect::<Vec<_>>()
            })
            .unwrap_or_default();
        Ok(options.apply(matching))
    }

    async fn count(&self, collection: Collection, filter: &Filter) -> Result<u64> {
        let guard = self.collections.read().await;
        Ok(guard
            .get(&collection)
            .map(|docs| docs.iter().filter(|doc| filter.matches(doc)).count() as u64)
            .unwrap_or(0))
    }

    async fn update_one(
        &self,
        collection: Collection,
        filter: &Filter,
        patch: &Patch,
    ) -> Result<UpdateResult> {
        let mut guard = self.collections.write().await;
        Ok(guard
            .get_mut(&collection)
            .map(|docs| update_matching(docs, filter, patch))
            .unwrap_or_default())
    }

    async fn delete_one(&self, collection: Collection, filter: &Filter) -> Result<DeleteResult> {
        let mut guard = self.collections.write().await;
        let Some(docs) = guard.get_mut(&collection) else {
            return Ok(DeleteResult::default());
        };
        match docs.iter().position(|doc| filter.matches(doc)) {
            Some(index) => {
                docs.remove(index);
                Ok(DeleteResult { deleted: 1 })
            }
            None => Ok(DeleteResult::default()),
        }
    }

    async fn delete_many(
        &self,
        collection: Collection,
        filter: &Filter,
    ) -> Result<DeleteResult> {
        let mut guard = self.collections.write().await;
        let Some(docs) = guard.get_mut(&collection) else {
            return Ok(DeleteResult::default());
        };
        let before = docs.len();
        docs.retain(|doc| !filter.matches(doc));
        Ok(DeleteResult {
            deleted: (before - docs.len()) as u64,
        })
    }

    async fn bulk_write(
        &self,
        collection: Collection,
        ops: &[UpdateOne],
    ) -> Result<UpdateResult> {
        let mut guard = self.collections.write().await;
        let mut total = UpdateResult::default();
        if let Some(docs) = guard.get_mut(&collection) {
            for op in ops {
                total.absorb(update_matching(docs, &op.filter, &op.patch));
            }
        }
        Ok(total)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::SortOrder;
    use serde_json::json;

    fn doc(value: serde_json::Value) -> Document {
        value.as_object().cloned().unwrap()
    }

    #[tokio::test]
    async fn insert_find_and_delete() {
        let store = MemoryStore::new();
        assert!(store.is_empty().await);

        let a = store
            .insert_one(Collection::Tasks, doc(json!({"list": "l1", "n": 2})))
            .await
            .unwrap();
        store
            .insert_one(Collection::Tasks, doc(json!({"list": "l1", "n": 5})))
            .await
            .unwrap();
        store
            .insert_one(Collection::Tasks, doc(json!({"list": "l2", "n": 9})))
            .await
            .unwrap();

        let in_l1 = Filter::eq("list", "l1");
        assert_eq!(store.count(Collection::Tasks, &in_l1).await.unwrap(), 2);

        let top = store
            .find_one(
                Collection::Tasks,
                &in_l1,
                &FindOptions::sorted("n", SortOrder::Descending),
            )
            .await
            .unwrap()
            .unwrap();
        assert_eq!(top["n"], json!(5));

        let deleted = store
            .delete_one(Collection::Tasks, &Filter::id(&a))
            .await
            .unwrap();
        assert_eq!(deleted.deleted, 1);
        let deleted = store
            .delete_one(Collection::Tasks, &Filter::id(&a))
            .await
            .unwrap();
        assert_eq!(deleted.deleted, 0);

        let deleted = store.delete_many(Collection::Tasks, &Filter::All).await.unwrap();
        assert_eq!(deleted.deleted, 2);
        assert_eq!(store.len(Collection::Tasks).await, 0);
    }

    #[tokio::test]
    async fn duplicate_ids_are_rejected() {
        let store = MemoryStore::new();
        let id = store
            .insert_one(Collection::Plans, Document::new())
            .await
            .unwrap();
        let mut again = Document::new();
        again.insert(ID_FIELD.to_string(), id.into());
        let err = store.insert_one(Collection::Plans, again).await.unwrap_err();
        assert!(matches!(err, PlanboardError::Storage(_)));
    }

    #[tokio::test]
    async fn bulk_write_counts_matched_and_modified() {
        let store = MemoryStore::new();
        let id = store
            .insert_one(Collection::Tasks, doc(json!({"n": 1})))
            .await
            .unwrap();
        let ops = vec![
            UpdateOne {
                filter: Filter::id(&id),
                patch: Patch::new().set("n", 2),
            },
            UpdateOne {
                filter: Filter::id(&ObjectRef::new()),
                patch: Patch::new().set("n", 3),
            },
        ];
        let result = store.bulk_write(Collection::Tasks, &ops).await.unwrap();
        assert_eq!(result, UpdateResult { matched: 1, modified: 1 });

        let result = store
            .bulk_write(Collection::Tasks, &ops[..1])
            .await
            .unwrap();
        assert_eq!(result, UpdateResult { matched: 1, modified: 0 });
    }
}
