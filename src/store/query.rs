//! Filters, patches and find options shared by every store backend.
//!
//! Backends evaluate queries in process through these types so that the
//! memory and SQLite stores agree on matching, ordering and the
//! matched/modified accounting.

use std::cmp::Ordering;

use regex::{Regex, RegexBuilder};
use serde_json::Value;

use crate::error::{PlanboardError, Result};
use crate::ident::ObjectRef;

use super::{Document, ID_FIELD};

#[derive(Debug, Clone)]
pub enum Filter {
    All,
    Eq(String, Value),
    In(String, Vec<Value>),
    /// Case-insensitive literal substring match on a string field.
    Contains(String, Regex),
    And(Vec<Filter>),
}

impl Filter {
    pub fn id(id: &ObjectRef) -> Self {
        Self::Eq(ID_FIELD.to_string(), id.into())
    }

    pub fn eq(field: &str, value: impl Into<Value>) -> Self {
        Self::Eq(field.to_string(), value.into())
    }

    pub fn any_of<I, V>(field: &str, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        Self::In(field.to_string(), values.into_iter().map(Into::into).collect())
    }

    pub fn contains(field: &str, needle: &str) -> Result<Self> {
        let regex = RegexBuilder::new(&regex::escape(needle))
            .case_insensitive(true)
            .build()
            .map_err(|e| PlanboardError::InvalidInput(format!("invalid search term: {e}")))?;
        Ok(Self::Contains(field.to_string(), regex))
    }

    /// Exact match ignoring ASCII case, e.g. for email lookups.
    pub fn eq_ignore_case(field: &str, value: &str) -> Result<Self> {
        let pattern = format!("^{}$", regex::escape(value));
        let regex = RegexBuilder::new(&pattern)
            .case_insensitive(true)
            .build()
            .map_err(|e| PlanboardError::InvalidInput(format!("invalid filter value: {e}")))?;
        Ok(Self::Contains(field.to_string(), regex))
    }

    /// Conjunction; an absent or `All` side is dropped.
    pub fn and(self, other: Filter) -> Self {
        match (self, other) {
            (Self::All, other) => other,
            (this, Self::All) => this,
            (Self::And(mut parts), other) => {
                parts.push(other);
                Self::And(parts)
            }
            (this, other) => Self::And(vec![this, other]),
        }
    }

    pub fn matches(&self, doc: &Document) -> bool {
        match self {
            Self::All => true,
            Self::Eq(field, expected) => doc.get(field) == Some(expected),
            Self::In(field, candidates) => doc
                .get(field)
                .map(|value| candidates.iter().any(|candidate| candidate == value))
                .unwrap_or(false),
            Self::Contains(field, regex) => doc
                .get(field)
                .and_then(Value::as_str)
                .map(|text| regex.is_match(text))
                .unwrap_or(false),
            Self::And(parts) => parts.iter().all(|part| part.matches(doc)),
        }
    }

    /// The `_id` this filter pins, when it is a plain id lookup.
    pub fn target_id(&self) -> Option<&str> {
        match self {
            Self::Eq(field, Value::String(id)) if field == ID_FIELD => Some(id.as_str()),
            _ => None,
        }
    }
}

/// `$set`-style patch.
///
/// Stamp fields (typically `updated_at`) are only written when at least one
/// set field changes the document, so a no-op patch reports `modified = 0`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Patch {
    set: Vec<(String, Value)>,
    stamp: Vec<(String, Value)>,
}

impl Patch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(mut self, field: &str, value: impl Into<Value>) -> Self {
        self.set.push((field.to_string(), value.into()));
        self
    }

    pub fn set_opt(self, field: &str, value: Option<impl Into<Value>>) -> Self {
        match value {
            Some(value) => self.set(field, value),
            None => self,
        }
    }

    pub fn stamp(mut self, field: &str, value: impl Into<Value>) -> Self {
        self.stamp.push((field.to_string(), value.into()));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.set.is_empty()
    }

    /// Applies the patch in place and reports whether the document changed.
    pub fn apply(&self, doc: &mut Document) -> bool {
        let mut changed = false;
        for (field, value) in &self.set {
            if field == ID_FIELD {
                continue;
            }
            if doc.get(field) != Some(value) {
                doc.insert(field.clone(), value.clone());
                changed = true;
            }
        }
        if changed {
            for (field, value) in &self.stamp {
                doc.insert(field.clone(), value.clone());
            }
        }
        changed
    }
}

/// One entry of a `bulk_write` batch.
#[derive(Debug, Clone)]
pub struct UpdateOne {
    pub filter: Filter,
    pub patch: Patch,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Ascending,
    Descending,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sort {
    pub field: String,
    pub order: SortOrder,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FindOptions {
    pub sort: Option<Sort>,
    pub skip: usize,
    pub limit: Option<usize>,
}

impl FindOptions {
    pub fn sorted(field: &str, order: SortOrder) -> Self {
        Self {
            sort: Some(Sort {
                field: field.to_string(),
                order,
            }),
            ..Self::default()
        }
    }

    pub fn skip(mut self, skip: usize) -> Self {
        self.skip = skip;
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Sorts (stable, so ties keep insertion order), then skips and limits.
    pub fn apply(&self, mut docs: Vec<Document>) -> Vec<Document> {
        if let Some(sort) = &self.sort {
            docs.sort_by(|a, b| {
                let ordering = compare_values(a.get(&sort.field), b.get(&sort.field));
                match sort.order {
                    SortOrder::Ascending => ordering,
                    SortOrder::Descending => ordering.reverse(),
                }
            });
        }
        let iter = docs.into_iter().skip(self.skip);
        match self.limit {
            Some(limit) => iter.take(limit).collect(),
            None => iter.collect(),
        }
    }
}

/// Missing values sort first; numbers before strings before everything else.
fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    fn rank(value: Option<&Value>) -> u8 {
        match value {
            None | Some(Value::Null) => 0,
            Some(Value::Bool(_)) => 1,
            Some(Value::Number(_)) => 2,
            Some(Value::String(_)) => 3,
            Some(_) => 4,
        }
    }

    match (a, b) {
        (Some(Value::Number(x)), Some(Value::Number(y))) => match (x.as_i64(), y.as_i64()) {
            (Some(x), Some(y)) => x.cmp(&y),
            _ => x
                .as_f64()
                .partial_cmp(&y.as_f64())
                .unwrap_or(Ordering::Equal),
        },
        (Some(Value::String(x)), Some(Value::String(y))) => x.cmp(y),
        (Some(Value::Bool(x)), Some(Value::Bool(y))) => x.cmp(y),
        _ => rank(a).cmp(&rank(b)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(value: Value) -> Document {
        match value {
            Value::Object(map) => map,
            _ => unreachable!("test documents are objects"),
        }
    }

    #[test]
    fn filters_match_fields() {
        let task = doc(json!({"title": "Write Report", "task_list_id": "a", "sort_number": 3}));

        assert!(Filter::All.matches(&task));
        assert!(Filter::eq("task_list_id", "a").matches(&task));
        assert!(!Filter::eq("task_list_id", "b").matches(&task));
        assert!(Filter::any_of("task_list_id", ["b", "a"]).matches(&task));
        assert!(!Filter::any_of("task_list_id", Vec::<String>::new()).matches(&task));
        assert!(Filter::contains("title", "report").unwrap().matches(&task));
        assert!(!Filter::contains("title", "rep.rt").unwrap().matches(&task));
        assert!(Filter::eq_ignore_case("title", "write REPORT")
            .unwrap()
            .matches(&task));
        assert!(!Filter::eq_ignore_case("title", "write")
            .unwrap()
            .matches(&task));

        let both = Filter::eq("task_list_id", "a").and(Filter::eq("sort_number", 3));
        assert!(both.matches(&task));
        let either_missing = Filter::eq("task_list_id", "a").and(Filter::eq("missing", 1));
        assert!(!either_missing.matches(&task));
    }

    #[test]
    fn and_with_all_collapses() {
        let filter = Filter::All.and(Filter::eq("x", 1));
        assert!(matches!(filter, Filter::Eq(_, _)));
    }

    #[test]
    fn patch_stamps_only_on_change() {
        let mut task = doc(json!({"_id": "x", "sort_number": 5, "updated_at": 1}));
        let patch = Patch::new().set("sort_number", 5).stamp("updated_at", 99);
        assert!(!patch.apply(&mut task));
        assert_eq!(task["updated_at"], json!(1));

        let patch = Patch::new().set("sort_number", 6).stamp("updated_at", 99);
        assert!(patch.apply(&mut task));
        assert_eq!(task["sort_number"], json!(6));
        assert_eq!(task["updated_at"], json!(99));
    }

    #[test]
    fn patch_never_rewrites_id() {
        let mut task = doc(json!({"_id": "x"}));
        let patch = Patch::new().set(ID_FIELD, "y");
        assert!(!patch.apply(&mut task));
        assert_eq!(task[ID_FIELD], json!("x"));
    }

    #[test]
    fn find_options_sort_is_stable_and_paginates() {
        let docs = vec![
            doc(json!({"n": "first", "created_at": 1})),
            doc(json!({"n": "second", "created_at": 2})),
            doc(json!({"n": "third", "created_at": 2})),
            doc(json!({"n": "fourth"})),
        ];

        let sorted = FindOptions::sorted("created_at", SortOrder::Descending).apply(docs.clone());
        let names: Vec<_> = sorted.iter().map(|d| d["n"].as_str().unwrap()).collect();
        assert_eq!(names, vec!["second", "third", "first", "fourth"]);

        let page = FindOptions::sorted("created_at", SortOrder::Ascending)
            .skip(1)
            .limit(2)
            .apply(docs);
        let names: Vec<_> = page.iter().map(|d| d["n"].as_str().unwrap()).collect();
        assert_eq!(names, vec!["first", "second"]);
    }
}
