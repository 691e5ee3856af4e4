// bookstore-core/src/update.rs
// $set update documents

use serde_json::{Map, Value};

use crate::error::{BookstoreError, Result};
use crate::filter::validate_field_name;
use crate::value_utils::{get_nested_value, set_nested_value, values_equal};

/// A `{"$set": {...}}` modification
#[derive(Debug, Clone, PartialEq)]
pub struct Update {
    set: Vec<(String, Value)>,
}

impl Update {
    pub fn set(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Update {
            set: vec![(field.into(), value.into())],
        }
    }

    pub fn and_set(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.set.push((field.into(), value.into()));
        self
    }

    pub fn to_json(&self) -> Value {
        let fields: Map<String, Value> = self.set.iter().cloned().collect();
        let mut obj = Map::new();
        obj.insert("$set".to_string(), Value::Object(fields));
        Value::Object(obj)
    }

    pub fn validate(&self) -> Result<()> {
        if self.set.is_empty() {
            return Err(BookstoreError::InvalidQuery(
                "'$set' is empty. You must specify a field like so: {$set: {<field>: ...}}"
                    .to_string(),
            ));
        }
        self.set
            .iter()
            .try_for_each(|(field, _)| validate_field_name(field))
    }

    /// Apply in place; returns whether any field actually changed
    ///
    /// A path that runs through a non-object field fails the whole update
    /// and leaves `doc` as it was.
    pub fn apply(&self, doc: &mut Value) -> Result<bool> {
        let mut updated = doc.clone();
        let mut modified = false;
        for (field, value) in &self.set {
            let unchanged =
                get_nested_value(&updated, field).is_some_and(|old| values_equal(old, value));
            if unchanged {
                continue;
            }
            if !set_nested_value(&mut updated, field, value.clone()) {
                return Err(BookstoreError::InvalidQuery(format!(
                    "Cannot create field '{}': a parent along the path is not a document",
                    field
                )));
            }
            modified = true;
        }
        if modified {
            *doc = updated;
        }
        Ok(modified)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_set_renders() {
        let update = Update::set("price", 15.99).and_set("in_stock", false);
        assert_eq!(
            update.to_json(),
            json!({"$set": {"price": 15.99, "in_stock": false}})
        );
    }

    #[test]
    fn test_apply_reports_modification() {
        let mut doc = json!({"title": "The Great Gatsby", "price": 10.99});
        assert!(Update::set("price", 15.99).apply(&mut doc).unwrap());
        assert_eq!(doc["price"], 15.99);

        // Same value again is a match without modification
        assert!(!Update::set("price", 15.99).apply(&mut doc).unwrap());
    }

    #[test]
    fn test_apply_through_scalar_is_rejected() {
        let mut doc = json!({"title": "Dune", "price": 10});
        let update = Update::set("title", "Dune Messiah").and_set("price.amount", 5);

        assert!(matches!(
            update.apply(&mut doc),
            Err(BookstoreError::InvalidQuery(_))
        ));
        assert_eq!(doc, json!({"title": "Dune", "price": 10}));
    }

    #[test]
    fn test_validate() {
        assert!(Update::set("price", 1).validate().is_ok());
        assert!(Update::set("$inc", 1).validate().is_err());
        assert!(Update { set: vec![] }.validate().is_err());
    }
}
