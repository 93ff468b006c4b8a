//! Best-effort cascade deletion for plans and task lists.
//!
//! The parent document is removed first and is the commit point. Child
//! cleanup follows as separate delete-many calls; a failure between steps
//! leaves orphaned task lists or tasks behind and is not rolled back.

use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;

use crate::error::{PlanboardError, Result};
use crate::ident::ObjectRef;
use crate::model::task::TASK_LIST_ID;
use crate::model::task_list::PLAN_ID;
use crate::store::{Collection, DocumentStore, Filter, FindOptions, ID_FIELD};

pub const PLAN_DELETED_MESSAGE: &str =
    "Plan and associated TaskLists and Tasks deleted successfully";
pub const TASK_LIST_DELETED_MESSAGE: &str = "Task list deleted successfully";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Deletion {
    pub message: String,
    pub task_lists_deleted: u64,
    pub tasks_deleted: u64,
}

#[derive(Clone)]
pub struct CascadeDeleter {
    store: Arc<dyn DocumentStore>,
}

impl CascadeDeleter {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    /// Deletes the plan, then the tasks of its task lists, then the task
    /// lists. A missing plan fails with `NotFound` before any child is
    /// touched.
    pub async fn delete_plan(&self, plan_id: &ObjectRef) -> Result<Deletion> {
        let removed = self
            .store
            .delete_one(Collection::Plans, &Filter::id(plan_id))
            .await?;
        if removed.deleted == 0 {
            return Err(PlanboardError::NotFound("Plan not found".to_string()));
        }
        tracing::info!(plan_id = %plan_id, "Plan deleted; cleaning up task lists and tasks");

        let by_plan = Filter::eq(PLAN_ID, plan_id);
        let task_list_ids: Vec<Value> = self
            .store
            .find(Collection::TaskLists, &by_plan, &FindOptions::default())
            .await?
            .into_iter()
            .filter_map(|mut doc| doc.remove(ID_FIELD))
            .collect();

        let mut tasks_deleted = 0;
        if !task_list_ids.is_empty() {
            tasks_deleted = self
                .store
                .delete_many(Collection::Tasks, &Filter::any_of(TASK_LIST_ID, task_list_ids))
                .await?
                .deleted;
        }

        let task_lists_deleted = self
            .store
            .delete_many(Collection::TaskLists, &by_plan)
            .await?
            .deleted;

        tracing::debug!(
            plan_id = %plan_id,
            task_lists_deleted,
            tasks_deleted,
            "Plan cascade finished"
        );
        Ok(Deletion {
            message: PLAN_DELETED_MESSAGE.to_string(),
            task_lists_deleted,
            tasks_deleted,
        })
    }

    /// Deletes the task list, then its tasks. Zero tasks is success.
    pub async fn delete_task_list(&self, task_list_id: &ObjectRef) -> Result<Deletion> {
        let removed = self
            .store
            .delete_one(Collection::TaskLists, &Filter::id(task_list_id))
            .await?;
        if removed.deleted == 0 {
            return Err(PlanboardError::NotFound("Task list not found".to_string()));
        }

        let tasks_deleted = self
            .store
            .delete_many(Collection::Tasks, &Filter::eq(TASK_LIST_ID, task_list_id))
            .await?
            .deleted;

        tracing::info!(task_list_id = %task_list_id, tasks_deleted, "Task list deleted");
        Ok(Deletion {
            message: TASK_LIST_DELETED_MESSAGE.to_string(),
            task_lists_deleted: removed.deleted,
            tasks_deleted,
        })
    }
}
