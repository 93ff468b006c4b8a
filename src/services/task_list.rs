use std::sync::Arc;

use serde::Serialize;

use crate::aggregation::{ListingShape, TaskAggregator};
use crate::cascade::{CascadeDeleter, Deletion};
use crate::error::{PlanboardError, Result};
use crate::ident::ObjectRef;
use crate::model::task_list::PLAN_ID;
use crate::model::{
    from_document, from_documents, now_millis, to_document, NewTaskList, TaskList,
    TaskListListing, TaskListUpdate, TaskListWithTasks, UPDATED_AT,
};
use crate::store::{Collection, DocumentStore, Filter, FindOptions, Patch};

use super::{decode_opt, ListQuery};

const TITLE: &str = "title";
const DESCRIPTION: &str = "description";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TaskListPage {
    pub data: TaskListListing,
    pub count: u64,
}

#[derive(Clone)]
pub struct TaskListService {
    store: Arc<dyn DocumentStore>,
    aggregator: TaskAggregator,
    cascade: CascadeDeleter,
}

impl TaskListService {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self {
            aggregator: TaskAggregator::new(store.clone()),
            cascade: CascadeDeleter::new(store.clone()),
            store,
        }
    }

    /// The plan must exist when the list is created. Nothing keeps it alive
    /// afterwards; a concurrent plan deletion can still orphan the list.
    pub async fn create(&self, new: NewTaskList) -> Result<TaskList> {
        let plan_id = ObjectRef::decode(&new.plan_id)?;
        self.ensure_plan_exists(&plan_id).await?;

        let now = now_millis();
        let task_list = TaskList {
            id: ObjectRef::new(),
            title: new.title,
            description: new.description,
            plan_id,
            created_at: now,
            updated_at: now,
        };
        self.store
            .insert_one(Collection::TaskLists, to_document(&task_list)?)
            .await?;
        tracing::info!(task_list_id = %task_list.id, plan_id = %plan_id, "Task list created");
        Ok(task_list)
    }

    /// Newest first within the optional plan, with tasks embedded on request.
    pub async fn find_all(
        &self,
        plan_id: Option<&str>,
        query: &ListQuery,
        shape: ListingShape,
    ) -> Result<TaskListPage> {
        query.validate()?;
        let base = match decode_opt(plan_id)? {
            Some(plan_id) => Filter::eq(PLAN_ID, plan_id),
            None => Filter::All,
        };
        let filter = query.search_filter(base, TITLE)?;

        let count = self.store.count(Collection::TaskLists, &filter).await?;
        let docs = self
            .store
            .find(Collection::TaskLists, &filter, &query.find_options())
            .await?;
        let task_lists: Vec<TaskList> = from_documents(docs)?;
        let data = self.aggregator.shape_listing(task_lists, shape).await?;
        Ok(TaskListPage { data, count })
    }

    /// Every task list of the plan with its tasks, unpaginated.
    pub async fn find_all_with_tasks(&self, plan_id: &str) -> Result<Vec<TaskListWithTasks>> {
        let plan_id = ObjectRef::decode(plan_id)?;
        self.aggregator.list_task_lists_with_tasks(&plan_id).await
    }

    pub async fn find_by_id(&self, task_list_id: &str) -> Result<TaskList> {
        let id = ObjectRef::decode(task_list_id)?;
        self.get(&id).await
    }

    pub async fn update(&self, task_list_id: &str, update: TaskListUpdate) -> Result<TaskList> {
        let id = ObjectRef::decode(task_list_id)?;
        let plan_id = decode_opt(update.plan_id.as_deref())?;
        if let Some(plan_id) = &plan_id {
            self.ensure_plan_exists(plan_id).await?;
        }

        let patch = Patch::new()
            .set_opt(TITLE, update.title)
            .set_opt(DESCRIPTION, update.description)
            .set_opt(PLAN_ID, plan_id)
            .stamp(UPDATED_AT, now_millis());
        let result = self
            .store
            .update_one(Collection::TaskLists, &Filter::id(&id), &patch)
            .await?;
        if result.modified == 0 {
            return Err(PlanboardError::NotFound(
                "Task list not found or no changes".to_string(),
            ));
        }
        self.get(&id).await
    }

    /// Removes the list and every task in it.
    pub async fn delete(&self, task_list_id: &str) -> Result<Deletion> {
        let id = ObjectRef::decode(task_list_id)?;
        self.cascade.delete_task_list(&id).await
    }

    async fn get(&self, id: &ObjectRef) -> Result<TaskList> {
        let doc = self
            .store
            .find_one(Collection::TaskLists, &Filter::id(id), &FindOptions::default())
            .await?
            .ok_or_else(|| PlanboardError::NotFound("Task list not found".to_string()))?;
        from_document(doc)
    }

    async fn ensure_plan_exists(&self, plan_id: &ObjectRef) -> Result<()> {
        let found = self.store.count(Collection::Plans, &Filter::id(plan_id)).await?;
        if found == 0 {
            return Err(PlanboardError::NotFound("Plan not found".to_string()));
        }
        Ok(())
    }
}
