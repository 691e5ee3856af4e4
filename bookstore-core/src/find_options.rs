// bookstore-core/src/find_options.rs
// Find query modifiers: projection, sort, skip, limit

use serde_json::{Map, Value};

use crate::filter::Filter;
use crate::value_utils::{compare_for_sort, get_nested_value};

/// Which fields a query returns
#[derive(Debug, Clone, PartialEq)]
pub struct Projection {
    /// field → true (include) or false (exclude), in declaration order
    fields: Vec<(String, bool)>,
}

impl Projection {
    /// Include mode: only the listed fields (plus `_id` unless excluded)
    pub fn include<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Projection {
            fields: fields.into_iter().map(|f| (f.into(), true)).collect(),
        }
    }

    /// Exclude mode: everything except the listed fields
    pub fn exclude<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Projection {
            fields: fields.into_iter().map(|f| (f.into(), false)).collect(),
        }
    }

    /// `_id: 0`, the one exclusion allowed in include mode
    pub fn exclude_id(mut self) -> Self {
        self.fields.retain(|(f, _)| f != "_id");
        self.fields.push(("_id".to_string(), false));
        self
    }

    pub fn to_json(&self) -> Value {
        let obj: Map<String, Value> = self
            .fields
            .iter()
            .map(|(field, include)| (field.clone(), Value::from(i32::from(*include))))
            .collect();
        Value::Object(obj)
    }

    fn includes(&self, field: &str) -> Option<bool> {
        self.fields
            .iter()
            .find(|(f, _)| f == field)
            .map(|(_, include)| *include)
    }

    fn include_mode(&self) -> bool {
        self.fields.iter().any(|(_, include)| *include)
    }

    /// Apply to one document, keeping the document's own field order
    pub fn apply(&self, doc: &Value) -> Value {
        let Value::Object(obj) = doc else {
            return doc.clone();
        };
        if self.fields.is_empty() {
            return doc.clone();
        }

        let mut result = Map::new();
        if self.include_mode() {
            for (key, value) in obj {
                let keep = match self.includes(key) {
                    Some(include) => include,
                    None => key == "_id",
                };
                if keep {
                    result.insert(key.clone(), value.clone());
                }
            }
            // Dotted inclusions are not top-level keys of the source
            for (field, include) in &self.fields {
                if *include && field.contains('.') {
                    if let Some(value) = get_nested_value(doc, field) {
                        result.insert(field.clone(), value.clone());
                    }
                }
            }
        } else {
            for (key, value) in obj {
                if self.includes(key) != Some(false) {
                    result.insert(key.clone(), value.clone());
                }
            }
        }
        Value::Object(result)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Ascending,
    Descending,
}

impl SortDirection {
    pub fn as_i32(&self) -> i32 {
        match self {
            SortDirection::Ascending => 1,
            SortDirection::Descending => -1,
        }
    }
}

/// Sort specification: [(field, direction)] applied left to right
#[derive(Debug, Clone, PartialEq)]
pub struct Sort {
    keys: Vec<(String, SortDirection)>,
}

impl Sort {
    pub fn by(field: impl Into<String>, direction: SortDirection) -> Self {
        Sort {
            keys: vec![(field.into(), direction)],
        }
    }

    pub fn ascending(field: impl Into<String>) -> Self {
        Sort::by(field, SortDirection::Ascending)
    }

    pub fn descending(field: impl Into<String>) -> Self {
        Sort::by(field, SortDirection::Descending)
    }

    /// Tie-breaker on a further field
    pub fn then(mut self, field: impl Into<String>, direction: SortDirection) -> Self {
        self.keys.push((field.into(), direction));
        self
    }

    pub fn keys(&self) -> &[(String, SortDirection)] {
        &self.keys
    }

    pub fn to_json(&self) -> Value {
        let obj: Map<String, Value> = self
            .keys
            .iter()
            .map(|(field, dir)| (field.clone(), Value::from(dir.as_i32())))
            .collect();
        Value::Object(obj)
    }

    /// Stable sort: documents tied on every key keep their input order
    pub fn apply(&self, docs: &mut [Value]) {
        if self.keys.is_empty() {
            return;
        }

        docs.sort_by(|a, b| {
            for (field, direction) in &self.keys {
                let cmp = compare_for_sort(get_nested_value(a, field), get_nested_value(b, field));
                if cmp != std::cmp::Ordering::Equal {
                    return match direction {
                        SortDirection::Ascending => cmp,
                        SortDirection::Descending => cmp.reverse(),
                    };
                }
            }
            std::cmp::Ordering::Equal
        });
    }
}

/// Apply skip then limit
pub fn apply_limit_skip(docs: Vec<Value>, skip: Option<u64>, limit: Option<u64>) -> Vec<Value> {
    let skip = skip.unwrap_or(0) as usize;
    if skip >= docs.len() {
        return Vec::new();
    }

    let iter = docs.into_iter().skip(skip);
    match limit {
        Some(limit) => iter.take(limit as usize).collect(),
        None => iter.collect(),
    }
}

/// A complete find: filter plus the composable query modifiers
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FindRequest {
    pub filter: Filter,
    pub projection: Option<Projection>,
    pub sort: Option<Sort>,
    pub skip: Option<u64>,
    pub limit: Option<u64>,
}

impl FindRequest {
    pub fn new(filter: Filter) -> Self {
        FindRequest {
            filter,
            ..Default::default()
        }
    }

    pub fn project(mut self, projection: Projection) -> Self {
        self.projection = Some(projection);
        self
    }

    pub fn sort(mut self, sort: Sort) -> Self {
        self.sort = Some(sort);
        self
    }

    pub fn skip(mut self, skip: u64) -> Self {
        self.skip = Some(skip);
        self
    }

    pub fn limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }

    /// 1-based page of `page_size` documents
    pub fn page(self, page_number: u64, page_size: u64) -> Self {
        let skip = page_number.saturating_sub(1) * page_size;
        let request = self.limit(page_size);
        if skip > 0 {
            request.skip(skip)
        } else {
            request
        }
    }

    /// The find command shape, for display
    pub fn to_json(&self) -> Value {
        let mut obj = Map::new();
        obj.insert("filter".to_string(), self.filter.to_json());
        if let Some(projection) = &self.projection {
            obj.insert("projection".to_string(), projection.to_json());
        }
        if let Some(sort) = &self.sort {
            obj.insert("sort".to_string(), sort.to_json());
        }
        if let Some(skip) = self.skip {
            obj.insert("skip".to_string(), Value::from(skip));
        }
        if let Some(limit) = self.limit {
            obj.insert("limit".to_string(), Value::from(limit));
        }
        Value::Object(obj)
    }

    /// Evaluate in memory: filter → sort → skip → limit → projection
    pub fn execute<'a, I>(&self, docs: I) -> Vec<Value>
    where
        I: IntoIterator<Item = &'a Value>,
    {
        let mut matched: Vec<Value> = docs
            .into_iter()
            .filter(|doc| self.filter.matches(doc))
            .cloned()
            .collect();

        if let Some(sort) = &self.sort {
            sort.apply(&mut matched);
        }

        let page = apply_limit_skip(matched, self.skip, self.limit);

        match &self.projection {
            Some(projection) => page.iter().map(|doc| projection.apply(doc)).collect(),
            None => page,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_projection_include_mode() {
        let doc = json!({"_id": 1, "title": "Dune", "author": "Frank Herbert", "price": 9.99});
        let result = Projection::include(["title", "price"]).apply(&doc);

        assert_eq!(result, json!({"_id": 1, "title": "Dune", "price": 9.99}));
    }

    #[test]
    fn test_projection_exclude_id() {
        let doc = json!({"_id": 1, "title": "Dune", "author": "Frank Herbert"});
        let projection = Projection::include(["title", "author"]).exclude_id();

        assert_eq!(
            projection.to_json(),
            json!({"title": 1, "author": 1, "_id": 0})
        );
        assert_eq!(
            projection.apply(&doc),
            json!({"title": "Dune", "author": "Frank Herbert"})
        );
    }

    #[test]
    fn test_projection_exclude_mode() {
        let doc = json!({"_id": 1, "title": "Dune", "pages": 412});
        let result = Projection::exclude(["pages"]).apply(&doc);

        assert_eq!(result, json!({"_id": 1, "title": "Dune"}));
    }

    #[test]
    fn test_projection_keeps_document_order() {
        let doc = json!({"_id": 1, "title": "Dune", "author": "Frank Herbert", "price": 9.99});
        let result = Projection::include(["price", "title"]).exclude_id().apply(&doc);

        let keys: Vec<&String> = result.as_object().unwrap().keys().collect();
        assert_eq!(keys, vec!["title", "price"]);
    }

    #[test]
    fn test_sort_ascending_and_descending() {
        let mut docs = vec![json!({"price": 12.5}), json!({"price": 7.99}), json!({"price": 10})];

        Sort::ascending("price").apply(&mut docs);
        assert_eq!(docs[0]["price"], 7.99);
        assert_eq!(docs[2]["price"], 12.5);

        Sort::descending("price").apply(&mut docs);
        assert_eq!(docs[0]["price"], 12.5);
        assert_eq!(docs[2]["price"], 7.99);
    }

    #[test]
    fn test_sort_is_stable_for_ties() {
        let mut docs = vec![
            json!({"title": "A", "price": 10}),
            json!({"title": "B", "price": 5}),
            json!({"title": "C", "price": 10}),
        ];

        Sort::descending("price").apply(&mut docs);
        assert_eq!(docs[0]["title"], "A");
        assert_eq!(docs[1]["title"], "C");
        assert_eq!(docs[2]["title"], "B");
    }

    #[test]
    fn test_sort_multi_field() {
        let mut docs = vec![
            json!({"author": "Orwell", "published_year": 1949}),
            json!({"author": "Austen", "published_year": 1813}),
            json!({"author": "Orwell", "published_year": 1945}),
        ];

        Sort::ascending("author")
            .then("published_year", SortDirection::Descending)
            .apply(&mut docs);

        assert_eq!(docs[0]["author"], "Austen");
        assert_eq!(docs[1]["published_year"], 1949);
        assert_eq!(docs[2]["published_year"], 1945);
    }

    #[test]
    fn test_sort_missing_field_first() {
        let mut docs = vec![json!({"title": "A", "pages": 300}), json!({"title": "B"})];
        Sort::ascending("pages").apply(&mut docs);
        assert_eq!(docs[0]["title"], "B");
    }

    #[test]
    fn test_limit_skip() {
        let docs: Vec<Value> = (1..=5).map(|n| json!({ "n": n })).collect();

        let result = apply_limit_skip(docs.clone(), Some(1), Some(2));
        assert_eq!(result, vec![json!({"n": 2}), json!({"n": 3})]);

        assert_eq!(apply_limit_skip(docs.clone(), None, Some(3)).len(), 3);
        assert_eq!(apply_limit_skip(docs.clone(), Some(2), None).len(), 3);
        assert!(apply_limit_skip(docs, Some(10), None).is_empty());
    }

    #[test]
    fn test_page() {
        let first = FindRequest::new(Filter::All).page(1, 5);
        assert_eq!(first.skip, None);
        assert_eq!(first.limit, Some(5));

        let second = FindRequest::new(Filter::All).page(2, 5);
        assert_eq!(second.skip, Some(5));
        assert_eq!(second.limit, Some(5));
    }

    #[test]
    fn test_execute_sorts_before_projecting() {
        let docs = vec![
            json!({"title": "Cheap", "price": 5, "pages": 100}),
            json!({"title": "Dear", "price": 50, "pages": 900}),
        ];

        let request = FindRequest::new(Filter::All)
            .project(Projection::include(["title"]).exclude_id())
            .sort(Sort::descending("pages"))
            .limit(1);

        assert_eq!(request.execute(&docs), vec![json!({"title": "Dear"})]);
    }

    #[test]
    fn test_request_to_json() {
        let request = FindRequest::new(Filter::All)
            .project(Projection::include(["title", "price"]).exclude_id())
            .sort(Sort::ascending("price"))
            .skip(5)
            .limit(5);

        assert_eq!(
            request.to_json(),
            json!({
                "filter": {},
                "projection": {"title": 1, "price": 1, "_id": 0},
                "sort": {"price": 1},
                "skip": 5,
                "limit": 5
            })
        );
    }
}
