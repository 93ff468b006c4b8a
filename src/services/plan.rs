use std::sync::Arc;

use serde::Serialize;

use crate::aggregation::TaskAggregator;
use crate::cascade::{CascadeDeleter, Deletion};
use crate::error::{PlanboardError, Result};
use crate::ident::ObjectRef;
use crate::model::{
    from_document, from_documents, now_millis, to_document, NewPlan, Plan, PlanUpdate, PlanView,
    PlanWithTaskLists, UPDATED_AT,
};
use crate::store::{Collection, DocumentStore, Filter, FindOptions, Patch};

use super::ListQuery;

const TITLE: &str = "title";
const DESCRIPTION: &str = "description";

/// Whether plan reads embed the full task-list/task tree.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PlanShape {
    #[default]
    Flat,
    WithTaskLists,
}

impl PlanShape {
    pub fn from_flag(include_all: bool) -> Self {
        if include_all {
            Self::WithTaskLists
        } else {
            Self::Flat
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum PlanListing {
    Flat(Vec<Plan>),
    WithTaskLists(Vec<PlanWithTaskLists>),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlanPage {
    pub data: PlanListing,
    pub count: u64,
}

#[derive(Clone)]
pub struct PlanService {
    store: Arc<dyn DocumentStore>,
    aggregator: TaskAggregator,
    cascade: CascadeDeleter,
}

impl PlanService {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self {
            aggregator: TaskAggregator::new(store.clone()),
            cascade: CascadeDeleter::new(store.clone()),
            store,
        }
    }

    pub async fn create(&self, new: NewPlan) -> Result<Plan> {
        let user_id = ObjectRef::decode(&new.user_id)?;
        let now = now_millis();
        let plan = Plan {
            id: ObjectRef::new(),
            title: new.title,
            description: new.description,
            user_id,
            created_at: now,
            updated_at: now,
        };
        self.store
            .insert_one(Collection::Plans, to_document(&plan)?)
            .await?;
        tracing::info!(plan_id = %plan.id, user_id = %user_id, "Plan created");
        Ok(plan)
    }

    /// Newest plans first, optionally with every task list and task.
    pub async fn find_all(&self, query: &ListQuery, shape: PlanShape) -> Result<PlanPage> {
        query.validate()?;
        let filter = query.search_filter(Filter::All, TITLE)?;
        let count = self.store.count(Collection::Plans, &filter).await?;
        let docs = self
            .store
            .find(Collection::Plans, &filter, &query.find_options())
            .await?;
        let plans: Vec<Plan> = from_documents(docs)?;

        let data = match shape {
            PlanShape::Flat => PlanListing::Flat(plans),
            PlanShape::WithTaskLists => {
                let mut nested = Vec::with_capacity(plans.len());
                for plan in plans {
                    nested.push(self.with_task_lists(plan).await?);
                }
                PlanListing::WithTaskLists(nested)
            }
        };
        Ok(PlanPage { data, count })
    }

    pub async fn find_by_id(&self, plan_id: &str, shape: PlanShape) -> Result<PlanView> {
        let id = ObjectRef::decode(plan_id)?;
        let plan = self.get(&id).await?;
        match shape {
            PlanShape::Flat => Ok(PlanView::Plan(plan)),
            PlanShape::WithTaskLists => Ok(PlanView::WithTaskLists(
                self.with_task_lists(plan).await?,
            )),
        }
    }

    pub async fn update(&self, plan_id: &str, update: PlanUpdate) -> Result<Plan> {
        let id = ObjectRef::decode(plan_id)?;
        let patch = Patch::new()
            .set_opt(TITLE, update.title)
            .set_opt(DESCRIPTION, update.description)
            .stamp(UPDATED_AT, now_millis());

        let result = self
            .store
            .update_one(Collection::Plans, &Filter::id(&id), &patch)
            .await?;
        if result.modified == 0 {
            return Err(PlanboardError::NotFound(
                "Plan not found or no changes".to_string(),
            ));
        }
        self.get(&id).await
    }

    /// Removes the plan with all of its task lists and tasks.
    pub async fn delete(&self, plan_id: &str) -> Result<Deletion> {
        let id = ObjectRef::decode(plan_id)?;
        self.cascade.delete_plan(&id).await
    }

    async fn get(&self, id: &ObjectRef) -> Result<Plan> {
        let doc = self
            .store
            .find_one(Collection::Plans, &Filter::id(id), &FindOptions::default())
            .await?
            .ok_or_else(|| PlanboardError::NotFound("Plan not found".to_string()))?;
        from_document(doc)
    }

    async fn with_task_lists(&self, plan: Plan) -> Result<PlanWithTaskLists> {
        let task_lists = self
            .aggregator
            .list_task_lists_with_tasks(&plan.id)
            .await?;
        Ok(PlanWithTaskLists { plan, task_lists })
    }
}
