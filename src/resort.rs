//! Drag-and-drop reordering: move tasks between lists and renumber them in
//! one batched write.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::ident::ObjectRef;
use crate::model::task::{SORT_NUMBER, TASK_LIST_ID};
use crate::model::{now_millis, UPDATED_AT};
use crate::store::{Collection, DocumentStore, Filter, Patch, UpdateOne, UpdateResult};

/// One reassignment as sent by the client; ids are still raw strings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResortItem {
    pub id: String,
    pub task_list_id: String,
    pub sort_number: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ResortRequest {
    pub tasks: Vec<ResortItem>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ResortOutcome {
    pub matched: u64,
    pub modified: u64,
}

impl From<UpdateResult> for ResortOutcome {
    fn from(result: UpdateResult) -> Self {
        Self {
            matched: result.matched,
            modified: result.modified,
        }
    }
}

#[derive(Clone)]
pub struct BulkResorter {
    store: Arc<dyn DocumentStore>,
}

impl BulkResorter {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    /// Validates every id up front, then issues a single batch.
    ///
    /// Any malformed id aborts the call before the store is contacted.
    /// Tasks that no longer exist are skipped and only show up as a lower
    /// `matched` count.
    pub async fn bulk_resort(&self, items: &[ResortItem]) -> Result<ResortOutcome> {
        if items.is_empty() {
            return Ok(ResortOutcome::default());
        }

        let mut targets = Vec::with_capacity(items.len());
        for item in items {
            let task_id = ObjectRef::decode(&item.id)?;
            let task_list_id = ObjectRef::decode(&item.task_list_id)?;
            targets.push((task_id, task_list_id, item.sort_number));
        }

        let now = now_millis();
        let ops: Vec<UpdateOne> = targets
            .into_iter()
            .map(|(task_id, task_list_id, sort_number)| UpdateOne {
                filter: Filter::id(&task_id),
                patch: Patch::new()
                    .set(TASK_LIST_ID, task_list_id)
                    .set(SORT_NUMBER, sort_number)
                    .stamp(UPDATED_AT, now),
            })
            .collect();

        let outcome = ResortOutcome::from(self.store.bulk_write(Collection::Tasks, &ops).await?);
        tracing::debug!(
            requested = ops.len(),
            matched = outcome.matched,
            modified = outcome.modified,
            "Bulk resort applied"
        );
        Ok(outcome)
    }
}
