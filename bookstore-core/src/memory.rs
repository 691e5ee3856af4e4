// bookstore-core/src/memory.rs
// In-process DocumentStore for tests and offline demos

use std::time::Instant;

use parking_lot::RwLock;
use serde_json::Value;
use tracing::trace;

use crate::aggregation::Pipeline;
use crate::book::Book;
use crate::error::{BookstoreError, Result};
use crate::explain::{ExecutionStats, ExplainVerbosity};
use crate::filter::Filter;
use crate::find_options::FindRequest;
use crate::index::{IndexDescriptor, IndexSpec};
use crate::store::{DeleteOutcome, DocumentStore, UpdateOutcome};
use crate::update::Update;
use crate::value_utils::{get_nested_value, values_equal};

const DEFAULT_COLLECTION: &str = "books";

/// A single collection held in memory
///
/// Indexes are recorded as metadata only; `explain` uses them to report
/// which index a real server would pick, not to speed anything up.
pub struct MemoryStore {
    name: String,
    exists: bool,
    documents: RwLock<Vec<Value>>,
    indexes: RwLock<Vec<IndexDescriptor>>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        MemoryStore {
            name: DEFAULT_COLLECTION.to_string(),
            exists: true,
            documents: RwLock::new(Vec::new()),
            indexes: RwLock::new(vec![IndexDescriptor {
                name: "_id_".to_string(),
                keys: serde_json::json!({"_id": 1}),
                unique: false,
            }]),
        }
    }

    pub fn with_documents(docs: Vec<Value>) -> Result<Self> {
        let store = Self::new();
        store.insert_many(docs)?;
        Ok(store)
    }

    /// A store whose collection does not exist; every operation fails
    pub fn missing_collection(name: impl Into<String>) -> Self {
        MemoryStore {
            name: name.into(),
            exists: false,
            ..Self::new()
        }
    }

    /// Insert one document, assigning a uuid `_id` when it has none
    pub fn insert_one(&self, mut doc: Value) -> Result<Value> {
        self.check_exists()?;
        let Value::Object(obj) = &mut doc else {
            return Err(BookstoreError::Serialization(
                "Document must be an object".to_string(),
            ));
        };

        let id = obj
            .entry("_id")
            .or_insert_with(|| Value::String(uuid::Uuid::new_v4().to_string()))
            .clone();

        // Keep _id as the leading field, as the server does
        if obj.keys().next().map(String::as_str) != Some("_id") {
            let rest: Vec<(String, Value)> = std::mem::take(obj).into_iter().collect();
            obj.insert("_id".to_string(), id.clone());
            obj.extend(rest.into_iter().filter(|(k, _)| k != "_id"));
        }

        self.documents.write().push(doc);
        Ok(id)
    }

    pub fn insert_many(&self, docs: Vec<Value>) -> Result<Vec<Value>> {
        docs.into_iter().map(|doc| self.insert_one(doc)).collect()
    }

    pub fn insert_book(&self, book: &Book) -> Result<Value> {
        self.insert_one(book.to_document())
    }

    /// Snapshot of every stored document in insertion order
    pub fn documents(&self) -> Vec<Value> {
        self.documents.read().clone()
    }

    fn check_exists(&self) -> Result<()> {
        if self.exists {
            Ok(())
        } else {
            Err(BookstoreError::CollectionNotFound(self.name.clone()))
        }
    }

    /// Index whose leading keys are all pinned by equality in `filter`,
    /// preferring the one that covers the most fields
    fn choose_index(&self, filter: &Filter) -> Option<(IndexDescriptor, usize)> {
        let equality = filter.equality_fields();
        let pinned = |field: &str| equality.iter().any(|(f, _)| *f == field);

        let indexes = self.indexes.read();
        // Reversed so that ties go to the index created first
        indexes
            .iter()
            .rev()
            .map(|index| {
                let covered = index
                    .fields()
                    .into_iter()
                    .take_while(|field| pinned(*field))
                    .count();
                (index.clone(), covered)
            })
            .filter(|(_, covered)| *covered > 0)
            .max_by_key(|(_, covered)| *covered)
    }
}

impl DocumentStore for MemoryStore {
    fn collection_name(&self) -> &str {
        &self.name
    }

    fn find(&self, request: &FindRequest) -> Result<Vec<Value>> {
        self.check_exists()?;
        request.filter.validate()?;
        let docs = self.documents.read();
        let result = request.execute(docs.iter());
        trace!(matched = result.len(), "memory find");
        Ok(result)
    }

    fn update_one(&self, filter: &Filter, update: &Update) -> Result<UpdateOutcome> {
        self.check_exists()?;
        filter.validate()?;
        update.validate()?;

        let mut docs = self.documents.write();
        match docs.iter_mut().find(|doc| filter.matches(doc)) {
            Some(doc) => Ok(UpdateOutcome {
                matched_count: 1,
                modified_count: u64::from(update.apply(doc)?),
            }),
            None => Ok(UpdateOutcome::default()),
        }
    }

    fn delete_one(&self, filter: &Filter) -> Result<DeleteOutcome> {
        self.check_exists()?;
        filter.validate()?;

        let mut docs = self.documents.write();
        match docs.iter().position(|doc| filter.matches(doc)) {
            Some(pos) => {
                docs.remove(pos);
                Ok(DeleteOutcome { deleted_count: 1 })
            }
            None => Ok(DeleteOutcome::default()),
        }
    }

    fn count_documents(&self, filter: &Filter) -> Result<u64> {
        self.check_exists()?;
        filter.validate()?;
        let docs = self.documents.read();
        Ok(docs.iter().filter(|doc| filter.matches(doc)).count() as u64)
    }

    fn aggregate(&self, pipeline: &Pipeline) -> Result<Vec<Value>> {
        self.check_exists()?;
        let docs = self.documents();
        pipeline.execute(docs)
    }

    fn create_index(&self, spec: &IndexSpec) -> Result<String> {
        self.check_exists()?;
        spec.validate()?;

        let descriptor = spec.to_descriptor();
        let mut indexes = self.indexes.write();
        if let Some(existing) = indexes.iter().find(|i| i.keys == descriptor.keys) {
            return Ok(existing.name.clone());
        }
        if indexes.iter().any(|i| i.name == descriptor.name) {
            return Err(BookstoreError::Database(format!(
                "An existing index has the same name as the requested index: {}",
                descriptor.name
            )));
        }
        let name = descriptor.name.clone();
        indexes.push(descriptor);
        Ok(name)
    }

    fn list_indexes(&self) -> Result<Vec<IndexDescriptor>> {
        self.check_exists()?;
        Ok(self.indexes.read().clone())
    }

    fn explain(&self, filter: &Filter, verbosity: ExplainVerbosity) -> Result<ExecutionStats> {
        self.check_exists()?;
        filter.validate()?;

        let started = Instant::now();
        let chosen = self.choose_index(filter);
        let docs = self.documents.read();

        let examined = match &chosen {
            Some((index, covered)) => {
                let equality = filter.equality_fields();
                let prefix: Vec<&str> = index.fields().into_iter().take(*covered).collect();
                docs.iter()
                    .filter(|doc| {
                        prefix.iter().all(|field| {
                            equality.iter().any(|(f, v)| {
                                f == field
                                    && get_nested_value(doc, field)
                                        .is_some_and(|dv| values_equal(dv, v))
                            })
                        })
                    })
                    .count()
            }
            None => docs.len(),
        };

        // queryPlanner verbosity plans without executing
        let (examined, returned) = match verbosity {
            ExplainVerbosity::QueryPlanner => (0, 0),
            _ => (
                examined as u64,
                docs.iter().filter(|doc| filter.matches(doc)).count() as u64,
            ),
        };

        Ok(ExecutionStats {
            execution_time_millis: started.elapsed().as_millis() as u64,
            total_docs_examined: examined,
            total_docs_returned: returned,
            index_name: chosen.map(|(index, _)| index.name),
        })
    }
}
