// bookstore-core/src/store.rs
//! Document store seam
//!
//! The runner only ever talks to a [`DocumentStore`]. Production code plugs in
//! [`MongoStore`](crate::mongo::MongoStore); tests and demos use
//! [`MemoryStore`](crate::memory::MemoryStore).

use serde_json::Value;

use crate::aggregation::Pipeline;
use crate::error::Result;
use crate::explain::{ExecutionStats, ExplainVerbosity};
use crate::filter::Filter;
use crate::find_options::FindRequest;
use crate::index::{IndexDescriptor, IndexSpec};
use crate::update::Update;

/// Result of `update_one`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct UpdateOutcome {
    pub matched_count: u64,
    pub modified_count: u64,
}

/// Result of `delete_one`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DeleteOutcome {
    pub deleted_count: u64,
}

/// One collection of book documents behind a database client
///
/// Every method is a single blocking round trip. Zero matches are a valid
/// outcome, never an error.
pub trait DocumentStore {
    /// Name of the collection this store targets
    fn collection_name(&self) -> &str;

    fn find(&self, request: &FindRequest) -> Result<Vec<Value>>;

    /// Modify at most one matching document
    ///
    /// When several documents match (titles are not unique), exactly one is
    /// updated and which one is left to the database.
    fn update_one(&self, filter: &Filter, update: &Update) -> Result<UpdateOutcome>;

    /// Remove at most one matching document
    ///
    /// Like `update_one`, the choice among several matches is undefined.
    fn delete_one(&self, filter: &Filter) -> Result<DeleteOutcome>;

    fn count_documents(&self, filter: &Filter) -> Result<u64>;

    fn aggregate(&self, pipeline: &Pipeline) -> Result<Vec<Value>>;

    /// Returns the name of the created (or already existing) index
    fn create_index(&self, spec: &IndexSpec) -> Result<String>;

    fn list_indexes(&self) -> Result<Vec<IndexDescriptor>>;

    fn explain(&self, filter: &Filter, verbosity: ExplainVerbosity) -> Result<ExecutionStats>;
}
