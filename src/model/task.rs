use serde::{Deserialize, Serialize};

use crate::ident::ObjectRef;

pub const TASK_LIST_ID: &str = "task_list_id";
pub const SORT_NUMBER: &str = "sort_number";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Priority {
    Low,
    Medium,
    High,
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "LOW",
            Self::Medium => "MEDIUM",
            Self::High => "HIGH",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TaskStatus {
    #[default]
    Open,
    Close,
}

impl TaskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Open => "OPEN",
            Self::Close => "CLOSE",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    #[serde(rename = "_id")]
    pub id: ObjectRef,
    pub title: String,
    pub description: String,
    pub task_list_id: ObjectRef,
    pub due_date: i64,
    /// Display-order hint within the task list; not unique.
    pub sort_number: u32,
    pub priority: Priority,
    pub status: TaskStatus,
    pub created_at: i64,
    pub updated_at: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewTask {
    pub title: String,
    pub description: String,
    pub task_list_id: String,
    pub due_date: i64,
    pub priority: Priority,
    #[serde(default)]
    pub status: TaskStatus,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TaskUpdate {
    pub title: Option<String>,
    pub description: Option<String>,
    pub task_list_id: Option<String>,
    pub due_date: Option<i64>,
    pub priority: Option<Priority>,
    pub status: Option<TaskStatus>,
}
