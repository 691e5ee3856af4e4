// bookstore-core/src/explain.rs
// explain() execution statistics

use serde_json::{Map, Value};

use crate::error::{BookstoreError, Result};
use crate::value_utils::get_nested_value;

/// How much work `explain` performs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExplainVerbosity {
    QueryPlanner,
    #[default]
    ExecutionStats,
    AllPlansExecution,
}

impl ExplainVerbosity {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExplainVerbosity::QueryPlanner => "queryPlanner",
            ExplainVerbosity::ExecutionStats => "executionStats",
            ExplainVerbosity::AllPlansExecution => "allPlansExecution",
        }
    }
}

/// The parts of an explain report the runner prints
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionStats {
    pub execution_time_millis: u64,
    pub total_docs_examined: u64,
    pub total_docs_returned: u64,
    /// Index chosen by the planner, `None` for a collection scan
    pub index_name: Option<String>,
}

impl ExecutionStats {
    /// Extract statistics from a raw explain document
    ///
    /// The winning plan's index is looked up anywhere under
    /// `executionStages`, since an IXSCAN is normally nested in a FETCH.
    pub fn from_explain(explain: &Value) -> Result<Self> {
        let stats = explain.get("executionStats").ok_or_else(|| {
            BookstoreError::Database("explain output has no executionStats section".to_string())
        })?;

        let counter = |path: &str| get_nested_value(stats, path).and_then(as_count);

        Ok(ExecutionStats {
            execution_time_millis: counter("executionTimeMillis").unwrap_or(0),
            total_docs_examined: counter("totalDocsExamined").unwrap_or(0),
            total_docs_returned: counter("nReturned")
                .or_else(|| counter("totalDocsReturned"))
                .unwrap_or(0),
            index_name: stats.get("executionStages").and_then(find_index_name),
        })
    }

    pub fn to_json(&self) -> Value {
        let mut obj = Map::new();
        obj.insert(
            "executionTimeMillis".to_string(),
            Value::from(self.execution_time_millis),
        );
        obj.insert(
            "totalDocsExamined".to_string(),
            Value::from(self.total_docs_examined),
        );
        obj.insert("nReturned".to_string(), Value::from(self.total_docs_returned));
        obj.insert(
            "indexName".to_string(),
            self.index_name
                .as_ref()
                .map(|n| Value::String(n.clone()))
                .unwrap_or(Value::Null),
        );
        Value::Object(obj)
    }
}

/// Counters arrive as int32, int64 or (relaxed JSON) double
fn as_count(value: &Value) -> Option<u64> {
    value
        .as_u64()
        .or_else(|| value.as_f64().filter(|f| *f >= 0.0).map(|f| f as u64))
}

fn find_index_name(stage: &Value) -> Option<String> {
    if let Some(name) = stage.get("indexName").and_then(Value::as_str) {
        return Some(name.to_string());
    }
    if let Some(input) = stage.get("inputStage") {
        if let Some(name) = find_index_name(input) {
            return Some(name);
        }
    }
    stage
        .get("inputStages")
        .and_then(Value::as_array)
        .and_then(|stages| stages.iter().find_map(find_index_name))
}
