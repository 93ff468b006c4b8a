use serde::{Deserialize, Serialize};

use crate::ident::ObjectRef;

use super::task::Task;

pub const PLAN_ID: &str = "plan_id";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskList {
    #[serde(rename = "_id")]
    pub id: ObjectRef,
    pub title: String,
    pub description: String,
    pub plan_id: ObjectRef,
    pub created_at: i64,
    pub updated_at: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TaskListWithTasks {
    #[serde(flatten)]
    pub task_list: TaskList,
    pub tasks: Vec<Task>,
}

/// Task lists with or without their tasks. Callers match on the variant
/// instead of probing an optional `tasks` field.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum TaskListListing {
    Flat(Vec<TaskList>),
    WithTasks(Vec<TaskListWithTasks>),
}

impl TaskListListing {
    pub fn len(&self) -> usize {
        match self {
            Self::Flat(lists) => lists.len(),
            Self::WithTasks(lists) => lists.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn task_lists(&self) -> Vec<&TaskList> {
        match self {
            Self::Flat(lists) => lists.iter().collect(),
            Self::WithTasks(lists) => lists.iter().map(|entry| &entry.task_list).collect(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewTaskList {
    pub title: String,
    pub description: String,
    pub plan_id: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TaskListUpdate {
    pub title: Option<String>,
    pub description: Option<String>,
    pub plan_id: Option<String>,
}
