//! Read-side fan-out: tasks under a task list, task lists under a plan.
//!
//! Nested listings are assembled with one task query per task list (N+1
//! store calls). The per-list queries run concurrently; output order always
//! follows the task-list order they were given in.

use std::sync::Arc;

use futures::future::try_join_all;

use crate::error::Result;
use crate::ident::ObjectRef;
use crate::model::task::TASK_LIST_ID;
use crate::model::task_list::PLAN_ID;
use crate::model::{from_documents, Task, TaskList, TaskListListing, TaskListWithTasks};
use crate::store::{Collection, DocumentStore, Filter, FindOptions};

/// Whether a task-list listing embeds each list's tasks.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ListingShape {
    #[default]
    Flat,
    WithTasks,
}

impl ListingShape {
    pub fn from_flag(with_tasks: bool) -> Self {
        if with_tasks {
            Self::WithTasks
        } else {
            Self::Flat
        }
    }
}

#[derive(Clone)]
pub struct TaskAggregator {
    store: Arc<dyn DocumentStore>,
}

impl TaskAggregator {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    /// Every task of the list in store order. Not paginated.
    pub async fn list_tasks_for_task_list(&self, task_list_id: &ObjectRef) -> Result<Vec<Task>> {
        let docs = self
            .store
            .find(
                Collection::Tasks,
                &Filter::eq(TASK_LIST_ID, task_list_id),
                &FindOptions::default(),
            )
            .await?;
        from_documents(docs)
    }

    /// Every task list of the plan in store order, optionally with tasks.
    /// An unknown plan yields an empty listing.
    pub async fn list_task_lists_for_plan(
        &self,
        plan_id: &ObjectRef,
        shape: ListingShape,
    ) -> Result<TaskListListing> {
        let task_lists = self.task_lists_for_plan(plan_id).await?;
        tracing::debug!(
            plan_id = %plan_id,
            task_lists = task_lists.len(),
            ?shape,
            "Listing task lists for plan"
        );
        self.shape_listing(task_lists, shape).await
    }

    pub async fn list_task_lists_with_tasks(
        &self,
        plan_id: &ObjectRef,
    ) -> Result<Vec<TaskListWithTasks>> {
        let task_lists = self.task_lists_for_plan(plan_id).await?;
        self.embed_tasks(task_lists).await
    }

    pub async fn shape_listing(
        &self,
        task_lists: Vec<TaskList>,
        shape: ListingShape,
    ) -> Result<TaskListListing> {
        match shape {
            ListingShape::Flat => Ok(TaskListListing::Flat(task_lists)),
            ListingShape::WithTasks => Ok(TaskListListing::WithTasks(
                self.embed_tasks(task_lists).await?,
            )),
        }
    }

    /// Attaches each list's tasks, one store query per list.
    pub async fn embed_tasks(&self, task_lists: Vec<TaskList>) -> Result<Vec<TaskListWithTasks>> {
        let fetches = task_lists
            .iter()
            .map(|task_list| self.list_tasks_for_task_list(&task_list.id));
        let tasks = try_join_all(fetches).await?;

        Ok(task_lists
            .into_iter()
            .zip(tasks)
            .map(|(task_list, tasks)| TaskListWithTasks { task_list, tasks })
            .collect())
    }

    async fn task_lists_for_plan(&self, plan_id: &ObjectRef) -> Result<Vec<TaskList>> {
        let docs = self
            .store
            .find(
                Collection::TaskLists,
                &Filter::eq(PLAN_ID, plan_id),
                &FindOptions::default(),
            )
            .await?;
        from_documents(docs)
    }
}
