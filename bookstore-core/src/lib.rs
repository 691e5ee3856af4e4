// bookstore-core/src/lib.rs
// Bookstore query catalog over a document store

pub mod aggregation;
pub mod book;
pub mod catalog;
pub mod config;
pub mod error;
pub mod explain;
pub mod filter;
pub mod find_options;
pub mod index;
pub mod memory;
pub mod mongo;
pub mod runner;
pub mod store;
pub mod update;
pub mod value_utils;

// Public exports
pub use aggregation::{Accumulator, Expression, Group, Pipeline, Stage};
pub use book::Book;
pub use catalog::{bookstore_catalog, bookstore_catalog_with, CatalogEntry, Operation, Section};
pub use config::{ConfigOverrides, RunnerConfig};
pub use error::{BookstoreError, Result};
pub use explain::{ExecutionStats, ExplainVerbosity};
pub use filter::{Comparison, Condition, Filter};
pub use find_options::{FindRequest, Projection, Sort, SortDirection};
pub use index::{IndexDescriptor, IndexSpec};
pub use memory::MemoryStore;
pub use mongo::MongoStore;
pub use runner::{Outcome, QueryRunner, RunSummary};
pub use store::{DeleteOutcome, DocumentStore, UpdateOutcome};
pub use update::Update;
