// bookstore-core/src/filter.rs
//! Typed query filters
//!
//! A [`Filter`] is built with constructors instead of hand-written JSON, then
//! rendered to the MongoDB query document with [`Filter::to_json`]. The same
//! value can be evaluated in memory with [`Filter::matches`], which the
//! in-process store uses.
//!
//! ```
//! use bookstore_core::filter::Filter;
//! use serde_json::json;
//!
//! let filter = Filter::and(vec![
//!     Filter::eq("in_stock", true),
//!     Filter::gt("published_year", 2010),
//! ]);
//! assert_eq!(
//!     filter.to_json(),
//!     json!({"$and": [{"in_stock": true}, {"published_year": {"$gt": 2010}}]})
//! );
//! ```

use serde_json::{Map, Value};
use std::cmp::Ordering;

use crate::error::{BookstoreError, Result};
use crate::value_utils::{compare_values, get_nested_value, values_equal};

/// Comparison operators supported in a field condition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparison {
    Eq,
    Ne,
    Gt,
    Gte,
    Lt,
    Lte,
}

impl Comparison {
    pub fn operator(&self) -> &'static str {
        match self {
            Comparison::Eq => "$eq",
            Comparison::Ne => "$ne",
            Comparison::Gt => "$gt",
            Comparison::Gte => "$gte",
            Comparison::Lt => "$lt",
            Comparison::Lte => "$lte",
        }
    }

    fn accepts(&self, ord: Ordering) -> bool {
        match self {
            Comparison::Eq => ord == Ordering::Equal,
            Comparison::Ne => ord != Ordering::Equal,
            Comparison::Gt => ord == Ordering::Greater,
            Comparison::Gte => ord != Ordering::Less,
            Comparison::Lt => ord == Ordering::Less,
            Comparison::Lte => ord != Ordering::Greater,
        }
    }
}

/// A single `field <op> value` condition
#[derive(Debug, Clone, PartialEq)]
pub struct Condition {
    pub op: Comparison,
    pub value: Value,
}

impl Condition {
    pub fn new(op: Comparison, value: impl Into<Value>) -> Self {
        Condition {
            op,
            value: value.into(),
        }
    }

    pub fn eq(value: impl Into<Value>) -> Self {
        Condition::new(Comparison::Eq, value)
    }

    /// Equality renders as the bare value, everything else as `{"$op": value}`
    fn to_json(&self) -> Value {
        match self.op {
            Comparison::Eq => self.value.clone(),
            op => {
                let mut obj = Map::new();
                obj.insert(op.operator().to_string(), self.value.clone());
                Value::Object(obj)
            }
        }
    }

    fn matches(&self, doc_value: Option<&Value>) -> bool {
        match self.op {
            Comparison::Eq => self.equals_field(doc_value),
            // $ne also matches documents where the field is absent
            Comparison::Ne => !self.equals_field(doc_value),
            op => match doc_value {
                None => false,
                Some(Value::Array(items)) => items.iter().any(|item| self.ordered(op, item)),
                Some(v) => self.ordered(op, v),
            },
        }
    }

    /// A null value also equals a missing field
    fn equals_field(&self, doc_value: Option<&Value>) -> bool {
        match doc_value {
            Some(v) => self.equals(v),
            None => self.value.is_null(),
        }
    }

    fn equals(&self, v: &Value) -> bool {
        if values_equal(v, &self.value) {
            return true;
        }
        // Array fields match when any element equals the value
        match v {
            Value::Array(items) => items.iter().any(|item| values_equal(item, &self.value)),
            _ => false,
        }
    }

    fn ordered(&self, op: Comparison, v: &Value) -> bool {
        compare_values(v, &self.value)
            .map(|ord| op.accepts(ord))
            .unwrap_or(false)
    }
}

/// Query predicate over book documents
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Filter {
    /// `{}`: every document
    #[default]
    All,
    /// One field condition: `{field: value}` or `{field: {"$gt": value}}`
    Field { field: String, condition: Condition },
    /// Implicit conjunction rendered as a single object
    Fields(Vec<(String, Condition)>),
    /// Explicit `{"$and": [...]}`
    And(Vec<Filter>),
}

impl Filter {
    pub fn all() -> Self {
        Filter::All
    }

    pub fn cmp(field: impl Into<String>, op: Comparison, value: impl Into<Value>) -> Self {
        Filter::Field {
            field: field.into(),
            condition: Condition::new(op, value),
        }
    }

    pub fn eq(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Filter::cmp(field, Comparison::Eq, value)
    }

    pub fn gt(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Filter::cmp(field, Comparison::Gt, value)
    }

    pub fn gte(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Filter::cmp(field, Comparison::Gte, value)
    }

    pub fn lt(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Filter::cmp(field, Comparison::Lt, value)
    }

    pub fn lte(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Filter::cmp(field, Comparison::Lte, value)
    }

    pub fn and(clauses: Vec<Filter>) -> Self {
        Filter::And(clauses)
    }

    pub fn fields<F: Into<String>>(conditions: Vec<(F, Condition)>) -> Self {
        Filter::Fields(
            conditions
                .into_iter()
                .map(|(field, condition)| (field.into(), condition))
                .collect(),
        )
    }

    /// Render the MongoDB query document
    pub fn to_json(&self) -> Value {
        match self {
            Filter::All => Value::Object(Map::new()),
            Filter::Field { field, condition } => {
                let mut obj = Map::new();
                obj.insert(field.clone(), condition.to_json());
                Value::Object(obj)
            }
            Filter::Fields(conditions) => {
                let mut obj = Map::new();
                for (field, condition) in conditions {
                    obj.insert(field.clone(), condition.to_json());
                }
                Value::Object(obj)
            }
            Filter::And(clauses) => {
                let mut obj = Map::new();
                obj.insert(
                    "$and".to_string(),
                    Value::Array(clauses.iter().map(Filter::to_json).collect()),
                );
                Value::Object(obj)
            }
        }
    }

    /// Evaluate the filter against one document
    pub fn matches(&self, doc: &Value) -> bool {
        match self {
            Filter::All => true,
            Filter::Field { field, condition } => condition.matches(get_nested_value(doc, field)),
            Filter::Fields(conditions) => conditions
                .iter()
                .all(|(field, condition)| condition.matches(get_nested_value(doc, field))),
            Filter::And(clauses) => clauses.iter().all(|clause| clause.matches(doc)),
        }
    }

    /// Reject filters the database would refuse
    pub fn validate(&self) -> Result<()> {
        match self {
            Filter::All => Ok(()),
            Filter::Field { field, .. } => validate_field_name(field),
            Filter::Fields(conditions) => {
                if conditions.is_empty() {
                    return Err(BookstoreError::InvalidQuery(
                        "Field filter must name at least one field".to_string(),
                    ));
                }
                conditions
                    .iter()
                    .try_for_each(|(field, _)| validate_field_name(field))
            }
            Filter::And(clauses) => {
                if clauses.is_empty() {
                    return Err(BookstoreError::InvalidQuery(
                        "$and requires a nonempty array".to_string(),
                    ));
                }
                clauses.iter().try_for_each(Filter::validate)
            }
        }
    }

    /// Top-level fields pinned by equality, in declaration order
    pub fn equality_fields(&self) -> Vec<(&str, &Value)> {
        match self {
            Filter::All => Vec::new(),
            Filter::Field { field, condition } if condition.op == Comparison::Eq => {
                vec![(field.as_str(), &condition.value)]
            }
            Filter::Field { .. } => Vec::new(),
            Filter::Fields(conditions) => conditions
                .iter()
                .filter(|(_, c)| c.op == Comparison::Eq)
                .map(|(f, c)| (f.as_str(), &c.value))
                .collect(),
            Filter::And(clauses) => clauses.iter().flat_map(Filter::equality_fields).collect(),
        }
    }
}

pub(crate) fn validate_field_name(field: &str) -> Result<()> {
    if field.is_empty() {
        return Err(BookstoreError::InvalidQuery(
            "Field name cannot be empty".to_string(),
        ));
    }
    if field.starts_with('$') {
        return Err(BookstoreError::InvalidQuery(format!(
            "Unknown top level operator: {}",
            field
        )));
    }
    Ok(())
}
