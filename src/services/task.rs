use std::sync::Arc;

use crate::error::{PlanboardError, Result};
use crate::ident::ObjectRef;
use crate::model::task::{SORT_NUMBER, TASK_LIST_ID};
use crate::model::{
    from_document, from_documents, now_millis, to_document, NewTask, Task, TaskUpdate,
    UPDATED_AT,
};
use crate::resort::{BulkResorter, ResortItem, ResortOutcome};
use crate::store::{Collection, DocumentStore, Filter, FindOptions, Patch, SortOrder};

use super::{decode_opt, ListQuery, Page};

const TITLE: &str = "title";
const DESCRIPTION: &str = "description";
const DUE_DATE: &str = "due_date";
const PRIORITY: &str = "priority";
const STATUS: &str = "status";

#[derive(Clone)]
pub struct TaskService {
    store: Arc<dyn DocumentStore>,
    resorter: BulkResorter,
}

impl TaskService {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self {
            resorter: BulkResorter::new(store.clone()),
            store,
        }
    }

    /// Appends the task to its list: sort number is the current maximum
    /// plus one, or zero for an empty list.
    pub async fn create(&self, new: NewTask) -> Result<Task> {
        let task_list_id = ObjectRef::decode(&new.task_list_id)?;
        self.ensure_task_list_exists(&task_list_id).await?;

        let sort_number = self.next_sort_number(&task_list_id).await?;
        let now = now_millis();
        let task = Task {
            id: ObjectRef::new(),
            title: new.title,
            description: new.description,
            task_list_id,
            due_date: new.due_date,
            sort_number,
            priority: new.priority,
            status: new.status,
            created_at: now,
            updated_at: now,
        };
        self.store
            .insert_one(Collection::Tasks, to_document(&task)?)
            .await?;
        tracing::info!(
            task_id = %task.id,
            task_list_id = %task_list_id,
            sort_number,
            "Task created"
        );
        Ok(task)
    }

    pub async fn next_sort_number(&self, task_list_id: &ObjectRef) -> Result<u32> {
        let last = self
            .store
            .find_one(
                Collection::Tasks,
                &Filter::eq(TASK_LIST_ID, task_list_id),
                &FindOptions::sorted(SORT_NUMBER, SortOrder::Descending),
            )
            .await?;
        Ok(match last {
            Some(doc) => doc
                .get(SORT_NUMBER)
                .and_then(|value| value.as_u64())
                .map(|max| u32::try_from(max).unwrap_or(u32::MAX).saturating_add(1))
                .unwrap_or(0),
            None => 0,
        })
    }

    pub async fn find_all(&self, task_list_id: Option<&str>, query: &ListQuery) -> Result<Page<Task>> {
        query.validate()?;
        let base = match decode_opt(task_list_id)? {
            Some(task_list_id) => Filter::eq(TASK_LIST_ID, task_list_id),
            None => Filter::All,
        };
        let filter = query.search_filter(base, TITLE)?;

        let count = self.store.count(Collection::Tasks, &filter).await?;
        let docs = self
            .store
            .find(Collection::Tasks, &filter, &query.find_options())
            .await?;
        Ok(Page {
            data: from_documents(docs)?,
            count,
        })
    }

    pub async fn find_by_id(&self, task_id: &str) -> Result<Task> {
        let id = ObjectRef::decode(task_id)?;
        self.get(&id).await
    }

    pub async fn update(&self, task_id: &str, update: TaskUpdate) -> Result<Task> {
        let id = ObjectRef::decode(task_id)?;
        let task_list_id = decode_opt(update.task_list_id.as_deref())?;
        if let Some(task_list_id) = &task_list_id {
            self.ensure_task_list_exists(task_list_id).await?;
        }
        let patch = Patch::new()
            .set_opt(TITLE, update.title)
            .set_opt(DESCRIPTION, update.description)
            .set_opt(TASK_LIST_ID, task_list_id)
            .set_opt(DUE_DATE, update.due_date)
            .set_opt(PRIORITY, update.priority.map(|p| p.as_str()))
            .set_opt(STATUS, update.status.map(|s| s.as_str()))
            .stamp(UPDATED_AT, now_millis());

        let result = self
            .store
            .update_one(Collection::Tasks, &Filter::id(&id), &patch)
            .await?;
        if result.modified == 0 {
            return Err(PlanboardError::NotFound(
                "Task not found or no changes".to_string(),
            ));
        }
        self.get(&id).await
    }

    pub async fn delete(&self, task_id: &str) -> Result<String> {
        let id = ObjectRef::decode(task_id)?;
        let removed = self
            .store
            .delete_one(Collection::Tasks, &Filter::id(&id))
            .await?;
        if removed.deleted == 0 {
            return Err(PlanboardError::NotFound("Task not found".to_string()));
        }
        Ok("Task deleted successfully".to_string())
    }

    pub async fn bulk_resort(&self, items: &[ResortItem]) -> Result<ResortOutcome> {
        self.resorter.bulk_resort(items).await
    }

    async fn ensure_task_list_exists(&self, task_list_id: &ObjectRef) -> Result<()> {
        let found = self
            .store
            .count(Collection::TaskLists, &Filter::id(task_list_id))
            .await?;
        if found == 0 {
            return Err(PlanboardError::NotFound("Task list not found".to_string()));
        }
        Ok(())
    }

    async fn get(&self, id: &ObjectRef) -> Result<Task> {
        let doc = self
            .store
            .find_one(Collection::Tasks, &Filter::id(id), &FindOptions::default())
            .await?
            .ok_or_else(|| PlanboardError::NotFound("Task not found".to_string()))?;
        from_document(doc)
    }
}
