// bookstore-core/src/index.rs
// Index specifications and listings

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{BookstoreError, Result};
use crate::filter::validate_field_name;
use crate::find_options::SortDirection;

/// Keys for `createIndex`, single-field or compound
#[derive(Debug, Clone, PartialEq)]
pub struct IndexSpec {
    keys: Vec<(String, SortDirection)>,
    name: Option<String>,
}

impl IndexSpec {
    pub fn on(field: impl Into<String>, direction: SortDirection) -> Self {
        IndexSpec {
            keys: vec![(field.into(), direction)],
            name: None,
        }
    }

    pub fn ascending(field: impl Into<String>) -> Self {
        IndexSpec::on(field, SortDirection::Ascending)
    }

    /// Append a key, making this a compound index
    pub fn then(mut self, field: impl Into<String>, direction: SortDirection) -> Self {
        self.keys.push((field.into(), direction));
        self
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn keys(&self) -> &[(String, SortDirection)] {
        &self.keys
    }

    /// Explicit name, or the server default `field_dir[_field_dir...]`
    pub fn name(&self) -> String {
        match &self.name {
            Some(name) => name.clone(),
            None => self
                .keys
                .iter()
                .map(|(field, dir)| format!("{}_{}", field, dir.as_i32()))
                .collect::<Vec<_>>()
                .join("_"),
        }
    }

    pub fn keys_json(&self) -> Value {
        let obj: Map<String, Value> = self
            .keys
            .iter()
            .map(|(field, dir)| (field.clone(), Value::from(dir.as_i32())))
            .collect();
        Value::Object(obj)
    }

    pub fn validate(&self) -> Result<()> {
        if self.keys.is_empty() {
            return Err(BookstoreError::InvalidQuery(
                "Index keys cannot be empty".to_string(),
            ));
        }
        self.keys
            .iter()
            .try_for_each(|(field, _)| validate_field_name(field))
    }

    pub(crate) fn to_descriptor(&self) -> IndexDescriptor {
        IndexDescriptor {
            name: self.name(),
            keys: self.keys_json(),
            unique: false,
        }
    }
}

/// One entry of `getIndexes`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexDescriptor {
    pub name: String,
    pub keys: Value,
    #[serde(default)]
    pub unique: bool,
}

impl IndexDescriptor {
    /// Key field names in index order
    pub fn fields(&self) -> Vec<&str> {
        self.keys
            .as_object()
            .map(|obj| obj.keys().map(String::as_str).collect())
            .unwrap_or_default()
    }

    pub fn to_json(&self) -> Value {
        let mut obj = Map::new();
        obj.insert("v".to_string(), Value::from(2));
        obj.insert("key".to_string(), self.keys.clone());
        obj.insert("name".to_string(), Value::String(self.name.clone()));
        if self.unique {
            obj.insert("unique".to_string(), Value::Bool(true));
        }
        Value::Object(obj)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_default_names() {
        assert_eq!(IndexSpec::ascending("title").name(), "title_1");
        assert_eq!(
            IndexSpec::ascending("author")
                .then("published_year", SortDirection::Ascending)
                .name(),
            "author_1_published_year_1"
        );
        assert_eq!(
            IndexSpec::on("price", SortDirection::Descending).name(),
            "price_-1"
        );
        assert_eq!(IndexSpec::ascending("title").named("by_title").name(), "by_title");
    }

    #[test]
    fn test_keys_json_preserves_order() {
        let spec = IndexSpec::ascending("author").then("published_year", SortDirection::Ascending);
        assert_eq!(spec.keys_json(), json!({"author": 1, "published_year": 1}));
        assert_eq!(spec.to_descriptor().fields(), vec!["author", "published_year"]);
    }

    #[test]
    fn test_validate() {
        assert!(IndexSpec::ascending("title").validate().is_ok());
        assert!(IndexSpec::ascending("$title").validate().is_err());
    }

    #[test]
    fn test_descriptor_json() {
        let descriptor = IndexSpec::ascending("title").to_descriptor();
        assert_eq!(
            descriptor.to_json(),
            json!({"v": 2, "key": {"title": 1}, "name": "title_1"})
        );
    }
}
