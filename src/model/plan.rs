use serde::{Deserialize, Serialize};

use crate::ident::ObjectRef;

use super::task_list::TaskListWithTasks;

pub const USER_ID: &str = "user_id";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Plan {
    #[serde(rename = "_id")]
    pub id: ObjectRef,
    pub title: String,
    pub description: String,
    /// Owning user.
    pub user_id: ObjectRef,
    pub created_at: i64,
    pub updated_at: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlanWithTaskLists {
    #[serde(flatten)]
    pub plan: Plan,
    pub task_lists: Vec<TaskListWithTasks>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum PlanView {
    Plan(Plan),
    WithTaskLists(PlanWithTaskLists),
}

impl PlanView {
    pub fn plan(&self) -> &Plan {
        match self {
            Self::Plan(plan) => plan,
            Self::WithTaskLists(entry) => &entry.plan,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewPlan {
    pub title: String,
    pub description: String,
    pub user_id: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PlanUpdate {
    pub title: Option<String>,
    pub description: Option<String>,
}
