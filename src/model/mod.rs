//! Typed records for the four collections and their document mapping.

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::error::{PlanboardError, Result};
use crate::store::Document;

pub mod plan;
pub mod task;
pub mod task_list;
pub mod user;

pub use plan::{NewPlan, Plan, PlanUpdate, PlanView, PlanWithTaskLists};
pub use task::{NewTask, Priority, Task, TaskStatus, TaskUpdate};
pub use task_list::{NewTaskList, TaskList, TaskListListing, TaskListUpdate, TaskListWithTasks};
pub use user::{NewUser, User, UserRecord, UserUpdate};

pub const CREATED_AT: &str = "created_at";
pub const UPDATED_AT: &str = "updated_at";

/// Milliseconds since the Unix epoch.
pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

pub fn to_document<T: Serialize>(record: &T) -> Result<Document> {
    match serde_json::to_value(record)? {
        Value::Object(map) => Ok(map),
        other => Err(PlanboardError::Serialization(format!(
            "expected a JSON object, got {other}"
        ))),
    }
}

pub fn from_document<T: DeserializeOwned>(doc: Document) -> Result<T> {
    Ok(serde_json::from_value(Value::Object(doc))?)
}

pub fn from_documents<T: DeserializeOwned>(docs: Vec<Document>) -> Result<Vec<T>> {
    docs.into_iter().map(from_document).collect()
}
