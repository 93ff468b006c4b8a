use serde::{Deserialize, Serialize};

use crate::error::{PlanboardError, Result};
use crate::ident::ObjectRef;
use crate::store::{Filter, FindOptions, SortOrder};

pub mod plan;
pub mod task;
pub mod task_list;
pub mod user;

pub use plan::{PlanListing, PlanPage, PlanService, PlanShape};
pub use task::TaskService;
pub use task_list::{TaskListPage, TaskListService};
pub use user::UserService;

pub const DEFAULT_LIMIT: usize = 10;
pub const MAX_LIMIT: usize = 100;

fn default_limit() -> usize {
    DEFAULT_LIMIT
}

/// Pagination and search parameters of every listing endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ListQuery {
    #[serde(default = "default_limit")]
    pub limit: usize,
    #[serde(default)]
    pub skip: usize,
    #[serde(default)]
    pub search: Option<String>,
}

impl Default for ListQuery {
    fn default() -> Self {
        Self {
            limit: DEFAULT_LIMIT,
            skip: 0,
            search: None,
        }
    }
}

impl ListQuery {
    pub fn with_search(mut self, search: impl Into<String>) -> Self {
        self.search = Some(search.into());
        self
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    pub fn with_skip(mut self, skip: usize) -> Self {
        self.skip = skip;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.limit == 0 || self.limit > MAX_LIMIT {
            return Err(PlanboardError::InvalidInput(format!(
                "limit must be between 1 and {MAX_LIMIT}, got {}",
                self.limit
            )));
        }
        Ok(())
    }

    /// Narrows `base` by the search term on `field`, if any.
    pub(crate) fn search_filter(&self, base: Filter, field: &str) -> Result<Filter> {
        match self.search.as_deref().map(str::trim) {
            Some(term) if !term.is_empty() => Ok(base.and(Filter::contains(field, term)?)),
            _ => Ok(base),
        }
    }

    /// Newest first, then skip/limit.
    pub(crate) fn find_options(&self) -> FindOptions {
        FindOptions::sorted(crate::model::CREATED_AT, SortOrder::Descending)
            .skip(self.skip)
            .limit(self.limit)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Page<T> {
    pub data: Vec<T>,
    /// Total matching documents before skip/limit.
    pub count: u64,
}

/// Decodes an optional client-supplied reference.
pub(crate) fn decode_opt(raw: Option<&str>) -> Result<Option<ObjectRef>> {
    raw.map(ObjectRef::decode).transpose()
}
