// bookstore-core/src/aggregation.rs
//! Aggregation pipeline builder
//!
//! Pipelines are assembled from typed stages and rendered to the MongoDB
//! stage array with [`Pipeline::to_json`]. [`Pipeline::execute`] runs the
//! same stages over an in-memory document sequence.
//!
//! ```
//! use bookstore_core::aggregation::{Accumulator, Expression, Group, Pipeline};
//! use bookstore_core::find_options::Sort;
//! use serde_json::json;
//!
//! let pipeline = Pipeline::new()
//!     .group(
//!         Group::by(Expression::field("genre"))
//!             .accumulate("averagePrice", Accumulator::Avg(Expression::field("price")))
//!             .accumulate("bookCount", Accumulator::count()),
//!     )
//!     .sort(Sort::descending("averagePrice"));
//!
//! let docs = vec![
//!     json!({"genre": "Fantasy", "price": 20}),
//!     json!({"genre": "Fantasy", "price": 10}),
//!     json!({"genre": "Fiction", "price": 30}),
//! ];
//! let result = pipeline.execute(docs).unwrap();
//! assert_eq!(result[0], json!({"_id": "Fiction", "averagePrice": 30, "bookCount": 1}));
//! assert_eq!(result[1], json!({"_id": "Fantasy", "averagePrice": 15, "bookCount": 2}));
//! ```

use serde_json::{Map, Value};
use std::collections::HashMap;

use crate::error::{BookstoreError, Result};
use crate::filter::Filter;
use crate::find_options::{apply_limit_skip, Sort};
use crate::value_utils::{
    canonical_json_string, compare_values, get_nested_value, number_value,
};

// ============================================================================
// EXPRESSIONS
// ============================================================================

/// Computed value over a single document
#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    /// `"$path"`
    Field(String),
    Literal(Value),
    Divide(Box<Expression>, Box<Expression>),
    Multiply(Vec<Expression>),
    Floor(Box<Expression>),
    /// Sub-document built from named expressions
    Object(Vec<(String, Expression)>),
}

impl Expression {
    pub fn field(path: impl Into<String>) -> Self {
        Expression::Field(path.into())
    }

    pub fn literal(value: impl Into<Value>) -> Self {
        Expression::Literal(value.into())
    }

    pub fn divide(dividend: Expression, divisor: Expression) -> Self {
        Expression::Divide(Box::new(dividend), Box::new(divisor))
    }

    pub fn multiply(factors: Vec<Expression>) -> Self {
        Expression::Multiply(factors)
    }

    pub fn floor(inner: Expression) -> Self {
        Expression::Floor(Box::new(inner))
    }

    pub fn object<S: Into<String>>(fields: Vec<(S, Expression)>) -> Self {
        Expression::Object(fields.into_iter().map(|(k, e)| (k.into(), e)).collect())
    }

    /// `floor(field / 10) * 10`: the decade a year falls in
    pub fn decade(field: impl Into<String>) -> Self {
        Expression::multiply(vec![
            Expression::floor(Expression::divide(
                Expression::field(field),
                Expression::literal(10),
            )),
            Expression::literal(10),
        ])
    }

    pub fn to_json(&self) -> Value {
        match self {
            Expression::Field(path) => Value::String(format!("${}", path)),
            Expression::Literal(value) => match value {
                // A bare "$..." string would be read back as a field path
                Value::String(s) if s.starts_with('$') => operator("$literal", value.clone()),
                _ => value.clone(),
            },
            Expression::Divide(a, b) => {
                operator("$divide", Value::Array(vec![a.to_json(), b.to_json()]))
            }
            Expression::Multiply(factors) => operator(
                "$multiply",
                Value::Array(factors.iter().map(Expression::to_json).collect()),
            ),
            Expression::Floor(inner) => operator("$floor", inner.to_json()),
            Expression::Object(fields) => Value::Object(
                fields
                    .iter()
                    .map(|(k, e)| (k.clone(), e.to_json()))
                    .collect(),
            ),
        }
    }

    /// Evaluate against one document; missing fields evaluate to null
    pub fn evaluate(&self, doc: &Value) -> Result<Value> {
        match self {
            Expression::Field(path) => Ok(get_nested_value(doc, path).cloned().unwrap_or(Value::Null)),
            Expression::Literal(value) => Ok(value.clone()),
            Expression::Divide(a, b) => {
                let (Some(x), Some(y)) = (
                    numeric_operand("$divide", a.evaluate(doc)?)?,
                    numeric_operand("$divide", b.evaluate(doc)?)?,
                ) else {
                    return Ok(Value::Null);
                };
                if y == 0.0 {
                    return Err(BookstoreError::Aggregation(
                        "can't $divide by zero".to_string(),
                    ));
                }
                Ok(number_value(x / y))
            }
            Expression::Multiply(factors) => {
                let mut product = 1.0;
                for factor in factors {
                    match numeric_operand("$multiply", factor.evaluate(doc)?)? {
                        Some(n) => product *= n,
                        None => return Ok(Value::Null),
                    }
                }
                Ok(number_value(product))
            }
            Expression::Floor(inner) => Ok(numeric_operand("$floor", inner.evaluate(doc)?)?
                .map(|n| number_value(n.floor()))
                .unwrap_or(Value::Null)),
            Expression::Object(fields) => {
                let mut obj = Map::new();
                for (key, expr) in fields {
                    obj.insert(key.clone(), expr.evaluate(doc)?);
                }
                Ok(Value::Object(obj))
            }
        }
    }
}

fn operator(name: &str, args: Value) -> Value {
    let mut obj = Map::new();
    obj.insert(name.to_string(), args);
    Value::Object(obj)
}

/// Null propagates; any other non-number is an error
fn numeric_operand(op_name: &str, value: Value) -> Result<Option<f64>> {
    match value {
        Value::Null => Ok(None),
        Value::Number(n) => Ok(n.as_f64()),
        other => Err(BookstoreError::Aggregation(format!(
            "{} only supports numeric types, not {}",
            op_name,
            type_name(&other)
        ))),
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

// ============================================================================
// ACCUMULATORS
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub enum Accumulator {
    Sum(Expression),
    Avg(Expression),
    Min(Expression),
    Max(Expression),
    Push(Expression),
}

impl Accumulator {
    /// `{"$sum": 1}`
    pub fn count() -> Self {
        Accumulator::Sum(Expression::literal(1))
    }

    fn name(&self) -> &'static str {
        match self {
            Accumulator::Sum(_) => "$sum",
            Accumulator::Avg(_) => "$avg",
            Accumulator::Min(_) => "$min",
            Accumulator::Max(_) => "$max",
            Accumulator::Push(_) => "$push",
        }
    }

    fn expression(&self) -> &Expression {
        match self {
            Accumulator::Sum(e)
            | Accumulator::Avg(e)
            | Accumulator::Min(e)
            | Accumulator::Max(e)
            | Accumulator::Push(e) => e,
        }
    }

    pub fn to_json(&self) -> Value {
        operator(self.name(), self.expression().to_json())
    }

    fn compute(&self, docs: &[&Value]) -> Result<Value> {
        let values = docs
            .iter()
            .map(|doc| self.expression().evaluate(doc))
            .collect::<Result<Vec<Value>>>()?;

        match self {
            Accumulator::Sum(_) => Ok(sum(&values)),
            Accumulator::Avg(_) => {
                let numbers: Vec<f64> = values.iter().filter_map(Value::as_f64).collect();
                if numbers.is_empty() {
                    Ok(Value::Null)
                } else {
                    Ok(number_value(numbers.iter().sum::<f64>() / numbers.len() as f64))
                }
            }
            Accumulator::Min(_) => Ok(extremum(values, std::cmp::Ordering::Less)),
            Accumulator::Max(_) => Ok(extremum(values, std::cmp::Ordering::Greater)),
            Accumulator::Push(_) => Ok(Value::Array(values)),
        }
    }
}

/// Integer sum while every addend is an integer, float otherwise
fn sum(values: &[Value]) -> Value {
    let mut int_total: i64 = 0;
    let mut float_total = 0.0;
    let mut all_ints = true;

    for value in values {
        if let Some(i) = value.as_i64() {
            int_total = int_total.saturating_add(i);
            float_total += i as f64;
        } else if let Some(f) = value.as_f64() {
            all_ints = false;
            float_total += f;
        }
    }

    if all_ints {
        Value::from(int_total)
    } else {
        Value::from(float_total)
    }
}

/// Smallest/largest numeric value; null when there is none
fn extremum(values: Vec<Value>, wanted: std::cmp::Ordering) -> Value {
    let mut best: Option<Value> = None;
    for value in values.into_iter().filter(Value::is_number) {
        best = match best {
            None => Some(value),
            Some(current) => {
                if compare_values(&value, &current) == Some(wanted) {
                    Some(value)
                } else {
                    Some(current)
                }
            }
        };
    }
    best.unwrap_or(Value::Null)
}

// ============================================================================
// STAGES
// ============================================================================

/// `$group`: one output document per distinct key value
#[derive(Debug, Clone, PartialEq)]
pub struct Group {
    key: Expression,
    accumulators: Vec<(String, Accumulator)>,
}

impl Group {
    pub fn by(key: Expression) -> Self {
        Group {
            key,
            accumulators: Vec::new(),
        }
    }

    /// `_id: null`: the whole input is one group
    pub fn all() -> Self {
        Group::by(Expression::Literal(Value::Null))
    }

    pub fn accumulate(mut self, name: impl Into<String>, accumulator: Accumulator) -> Self {
        self.accumulators.push((name.into(), accumulator));
        self
    }

    pub fn to_json(&self) -> Value {
        let mut obj = Map::new();
        obj.insert("_id".to_string(), self.key.to_json());
        for (name, accumulator) in &self.accumulators {
            obj.insert(name.clone(), accumulator.to_json());
        }
        Value::Object(obj)
    }

    fn execute(&self, docs: Vec<Value>) -> Result<Vec<Value>> {
        // Groups are emitted in first-seen key order
        let mut keys: Vec<Value> = Vec::new();
        let mut members: Vec<Vec<&Value>> = Vec::new();
        let mut index: HashMap<String, usize> = HashMap::new();

        for doc in &docs {
            let key = self.key.evaluate(doc)?;
            let slot = *index
                .entry(canonical_json_string(&key))
                .or_insert_with(|| {
                    keys.push(key);
                    members.push(Vec::new());
                    keys.len() - 1
                });
            members[slot].push(doc);
        }

        let mut results = Vec::with_capacity(keys.len());
        for (key, group_docs) in keys.into_iter().zip(members) {
            let mut out = Map::new();
            out.insert("_id".to_string(), key);
            for (name, accumulator) in &self.accumulators {
                out.insert(name.clone(), accumulator.compute(&group_docs)?);
            }
            results.push(Value::Object(out));
        }
        Ok(results)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Stage {
    Match(Filter),
    AddFields(Vec<(String, Expression)>),
    Group(Group),
    Sort(Sort),
    Limit(u64),
    Skip(u64),
}

impl Stage {
    pub fn to_json(&self) -> Value {
        match self {
            Stage::Match(filter) => operator("$match", filter.to_json()),
            Stage::AddFields(fields) => operator(
                "$addFields",
                Value::Object(
                    fields
                        .iter()
                        .map(|(name, expr)| (name.clone(), expr.to_json()))
                        .collect(),
                ),
            ),
            Stage::Group(group) => operator("$group", group.to_json()),
            Stage::Sort(sort) => operator("$sort", sort.to_json()),
            Stage::Limit(n) => operator("$limit", Value::from(*n)),
            Stage::Skip(n) => operator("$skip", Value::from(*n)),
        }
    }

    fn validate(&self) -> Result<()> {
        match self {
            Stage::Match(filter) => filter.validate(),
            Stage::Limit(0) => Err(BookstoreError::Aggregation(
                "the limit must be positive".to_string(),
            )),
            Stage::Group(group) => group
                .accumulators
                .iter()
                .try_for_each(|(name, _)| validate_output_name(name)),
            Stage::AddFields(fields) => fields
                .iter()
                .try_for_each(|(name, _)| validate_output_name(name)),
            _ => Ok(()),
        }
    }

    fn execute(&self, docs: Vec<Value>) -> Result<Vec<Value>> {
        match self {
            Stage::Match(filter) => Ok(docs.into_iter().filter(|d| filter.matches(d)).collect()),
            Stage::AddFields(fields) => docs
                .into_iter()
                .map(|mut doc| {
                    let computed = fields
                        .iter()
                        .map(|(name, expr)| Ok((name.clone(), expr.evaluate(&doc)?)))
                        .collect::<Result<Vec<_>>>()?;
                    if let Value::Object(obj) = &mut doc {
                        obj.extend(computed);
                    }
                    Ok(doc)
                })
                .collect(),
            Stage::Group(group) => group.execute(docs),
            Stage::Sort(sort) => {
                let mut docs = docs;
                sort.apply(&mut docs);
                Ok(docs)
            }
            Stage::Limit(n) => Ok(apply_limit_skip(docs, None, Some(*n))),
            Stage::Skip(n) => Ok(apply_limit_skip(docs, Some(*n), None)),
        }
    }
}

fn validate_output_name(name: &str) -> Result<()> {
    if name.is_empty() || name.starts_with('$') {
        return Err(BookstoreError::Aggregation(format!(
            "Invalid output field name: '{}'",
            name
        )));
    }
    Ok(())
}

/// Ordered stage sequence
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Pipeline {
    stages: Vec<Stage>,
}

impl Pipeline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stage(mut self, stage: Stage) -> Self {
        self.stages.push(stage);
        self
    }

    pub fn match_(self, filter: Filter) -> Self {
        self.stage(Stage::Match(filter))
    }

    pub fn add_field(self, name: impl Into<String>, expr: Expression) -> Self {
        self.stage(Stage::AddFields(vec![(name.into(), expr)]))
    }

    pub fn group(self, group: Group) -> Self {
        self.stage(Stage::Group(group))
    }

    pub fn sort(self, sort: Sort) -> Self {
        self.stage(Stage::Sort(sort))
    }

    pub fn limit(self, n: u64) -> Self {
        self.stage(Stage::Limit(n))
    }

    pub fn skip(self, n: u64) -> Self {
        self.stage(Stage::Skip(n))
    }

    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    pub fn to_json(&self) -> Vec<Value> {
        self.stages.iter().map(Stage::to_json).collect()
    }

    pub fn validate(&self) -> Result<()> {
        self.stages.iter().try_for_each(Stage::validate)
    }

    /// Run every stage in order over `docs`
    pub fn execute(&self, mut docs: Vec<Value>) -> Result<Vec<Value>> {
        self.validate()?;
        for stage in &self.stages {
            docs = stage.execute(docs)?;
        }
        Ok(docs)
    }
}
