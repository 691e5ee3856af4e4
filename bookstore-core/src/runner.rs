// bookstore-core/src/runner.rs
// Sequential execution of catalog entries

use std::io::Write;

use serde_json::{json, Value};
use tracing::{debug, error, info};

use crate::catalog::{CatalogEntry, Operation, Section};
use crate::error::Result;
use crate::explain::ExecutionStats;
use crate::find_options::FindRequest;
use crate::index::IndexDescriptor;
use crate::store::{DeleteOutcome, DocumentStore, UpdateOutcome};

/// What a single operation produced
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Documents(Vec<Value>),
    Updated(UpdateOutcome),
    Deleted(DeleteOutcome),
    Count(u64),
    IndexCreated(String),
    Indexes(Vec<IndexDescriptor>),
    Explained(ExecutionStats),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RunSummary {
    pub entries_run: usize,
    pub documents_printed: usize,
}

/// Runs operations against one store, which it owns for its lifetime
pub struct QueryRunner<S: DocumentStore> {
    store: S,
}

impl<S: DocumentStore> QueryRunner<S> {
    pub fn new(store: S) -> Self {
        QueryRunner { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn into_store(self) -> S {
        self.store
    }

    pub fn execute(&self, operation: &Operation) -> Result<Outcome> {
        let store = &self.store;
        Ok(match operation {
            Operation::Find(request) => Outcome::Documents(store.find(request)?),
            Operation::UpdateOne { filter, update } => {
                Outcome::Updated(store.update_one(filter, update)?)
            }
            Operation::DeleteOne(filter) => Outcome::Deleted(store.delete_one(filter)?),
            Operation::Count(filter) => Outcome::Count(store.count_documents(filter)?),
            Operation::Aggregate(pipeline) => Outcome::Documents(store.aggregate(pipeline)?),
            Operation::CreateIndex(spec) => Outcome::IndexCreated(store.create_index(spec)?),
            Operation::ListIndexes => Outcome::Indexes(store.list_indexes()?),
            Operation::Explain { filter, verbosity } => {
                Outcome::Explained(store.explain(filter, *verbosity)?)
            }
        })
    }

    /// Convenience wrapper for a plain find
    pub fn find(&self, request: &FindRequest) -> Result<Vec<Value>> {
        self.store.find(request)
    }

    /// Execute `entries` in order, printing each outcome to `out`
    ///
    /// Stops at the first failing entry; nothing after it is executed or
    /// printed.
    pub fn run<W: Write>(&self, entries: &[CatalogEntry], out: &mut W) -> Result<RunSummary> {
        info!(
            collection = %self.store.collection_name(),
            entries = entries.len(),
            "running catalog"
        );

        let mut summary = RunSummary::default();
        let mut section: Option<Section> = None;

        for entry in entries {
            if section != Some(entry.section) {
                writeln!(out, "{}\n", entry.section.banner())?;
                section = Some(entry.section);
            }

            debug!(label = %entry.label, "executing");
            writeln!(out, "{}:", entry.label)?;

            let outcome = self.execute(&entry.operation).map_err(|e| {
                error!(label = %entry.label, error = %e, "query failed");
                e
            })?;

            summary.documents_printed += render(&outcome, out)?;
            summary.entries_run += 1;
            writeln!(out)?;
        }

        writeln!(out, "=== QUERIES COMPLETED ===")?;
        info!(
            entries_run = summary.entries_run,
            documents = summary.documents_printed,
            "catalog completed"
        );
        Ok(summary)
    }
}

/// Print an outcome, returning the number of documents written
fn render<W: Write>(outcome: &Outcome, out: &mut W) -> Result<usize> {
    match outcome {
        Outcome::Documents(docs) => {
            for doc in docs {
                writeln!(out, "{}", serde_json::to_string_pretty(doc)?)?;
            }
            Ok(docs.len())
        }
        Outcome::Updated(result) => {
            let shown = json!({
                "matchedCount": result.matched_count,
                "modifiedCount": result.modified_count,
            });
            writeln!(out, "Update result: {}", shown)?;
            Ok(0)
        }
        Outcome::Deleted(result) => {
            writeln!(out, "Delete result: {}", json!({ "deletedCount": result.deleted_count }))?;
            Ok(0)
        }
        Outcome::Count(n) => {
            writeln!(out, "{}", n)?;
            Ok(0)
        }
        Outcome::IndexCreated(name) => {
            writeln!(out, "Index: {}", name)?;
            Ok(0)
        }
        Outcome::Indexes(indexes) => {
            for index in indexes {
                writeln!(out, "{}", serde_json::to_string_pretty(&index.to_json())?)?;
            }
            Ok(indexes.len())
        }
        Outcome::Explained(stats) => {
            writeln!(out, "Execution time: {} ms", stats.execution_time_millis)?;
            writeln!(out, "Documents examined: {}", stats.total_docs_examined)?;
            writeln!(out, "Documents returned: {}", stats.total_docs_returned)?;
            writeln!(
                out,
                "Index used: {}",
                stats.index_name.as_deref().unwrap_or("None")
            )?;
            Ok(0)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::Filter;
    use crate::memory::MemoryStore;
    use crate::update::Update;

    fn runner() -> QueryRunner<MemoryStore> {
        let store = MemoryStore::with_documents(vec![
            json!({"title": "The Great Gatsby", "price": 10.99}),
            json!({"title": "Brave New World", "price": 11.5}),
        ])
        .unwrap();
        QueryRunner::new(store)
    }

    #[test]
    fn test_execute_update_and_count() {
        let runner = runner();
        let outcome = runner
            .execute(&Operation::UpdateOne {
                filter: Filter::eq("title", "The Great Gatsby"),
                update: Update::set("price", 15.99),
            })
            .unwrap();
        assert_eq!(
            outcome,
            Outcome::Updated(UpdateOutcome {
                matched_count: 1,
                modified_count: 1
            })
        );
        assert_eq!(
            runner.execute(&Operation::Count(Filter::All)).unwrap(),
            Outcome::Count(2)
        );
    }

    #[test]
    fn test_banner_printed_once_per_section() {
        let runner = runner();
        let entries = vec![
            CatalogEntry::new(Section::BasicCrud, "first", Operation::Count(Filter::All)),
            CatalogEntry::new(Section::BasicCrud, "second", Operation::Count(Filter::All)),
            CatalogEntry::new(Section::Indexing, "third", Operation::ListIndexes),
        ];

        let mut out = Vec::new();
        let summary = runner.run(&entries, &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();

        assert_eq!(text.matches(&Section::BasicCrud.banner()).count(), 1);
        assert_eq!(text.matches(&Section::Indexing.banner()).count(), 1);
        assert!(text.ends_with("=== QUERIES COMPLETED ===\n"));
        assert_eq!(summary.entries_run, 3);
        assert_eq!(summary.documents_printed, 1);
    }

    #[test]
    fn test_explain_reports_missing_index_as_none() {
        let mut out = Vec::new();
        render(
            &Outcome::Explained(ExecutionStats {
                execution_time_millis: 0,
                total_docs_examined: 2,
                total_docs_returned: 1,
                index_name: None,
            }),
            &mut out,
        )
        .unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("Documents examined: 2"));
        assert!(text.contains("Index used: None"));
    }
}
