//! Value helpers shared by the in-memory evaluators
//!
//! Dot-notation field access, Mongo-style comparison and number
//! normalisation for documents held as `serde_json::Value`.

use serde_json::Value;
use std::cmp::Ordering;

/// Get a field by dot-notation path ("title", "stats.views", "tags.0")
///
/// ```
/// use serde_json::json;
/// use bookstore_core::value_utils::get_nested_value;
///
/// let doc = json!({"title": "Dune", "stats": {"views": 3}});
/// assert_eq!(get_nested_value(&doc, "stats.views"), Some(&json!(3)));
/// ```
pub fn get_nested_value<'a>(doc: &'a Value, path: &str) -> Option<&'a Value> {
    if !path.contains('.') {
        return doc.get(path);
    }

    let mut value = doc;
    for part in path.split('.') {
        match value {
            Value::Object(map) => value = map.get(part)?,
            Value::Array(arr) => value = arr.get(part.parse::<usize>().ok()?)?,
            _ => return None,
        }
    }
    Some(value)
}

/// Set a field by dot-notation path, creating intermediate objects
///
/// Returns false, leaving `doc` untouched, when the path runs through a
/// non-object value.
pub fn set_nested_value(doc: &mut Value, path: &str, value: Value) -> bool {
    let parts: Vec<&str> = path.split('.').collect();
    let mut current = doc;

    for (i, part) in parts.iter().enumerate() {
        let Value::Object(map) = current else {
            return false;
        };
        if i == parts.len() - 1 {
            map.insert(part.to_string(), value);
            return true;
        }
        let next = map.get(*part);
        if next.is_some_and(|v| !v.is_object()) {
            return false;
        }
        current = map
            .entry(part.to_string())
            .or_insert_with(|| Value::Object(serde_json::Map::new()));
    }
    false
}

/// Compare two values of the same type bracket
///
/// Numbers compare numerically regardless of integer/float representation,
/// strings lexicographically (case-sensitive), booleans false < true.
/// Anything else is incomparable and yields `None`.
///
/// ```
/// use serde_json::json;
/// use std::cmp::Ordering;
/// use bookstore_core::value_utils::compare_values;
///
/// assert_eq!(compare_values(&json!(1954), &json!(1954.0)), Some(Ordering::Equal));
/// assert_eq!(compare_values(&json!("a"), &json!(1)), None);
/// ```
pub fn compare_values(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::Number(n1), Value::Number(n2)) => n1.as_f64()?.partial_cmp(&n2.as_f64()?),
        (Value::String(s1), Value::String(s2)) => Some(s1.cmp(s2)),
        (Value::Bool(b1), Value::Bool(b2)) => Some(b1.cmp(b2)),
        _ => None,
    }
}

/// Equality with numeric normalisation; other types compare structurally
pub fn values_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(_), Value::Number(_)) => compare_values(a, b) == Some(Ordering::Equal),
        _ => a == b,
    }
}

/// Total order used for sorting: missing < null < numbers < strings <
/// objects < arrays < booleans, then by value within a bracket
pub fn compare_for_sort(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (a, b) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (Some(av), Some(bv)) => compare_values(av, bv)
            .unwrap_or_else(|| type_priority(av).cmp(&type_priority(bv))),
    }
}

fn type_priority(val: &Value) -> u8 {
    match val {
        Value::Null => 0,
        Value::Number(_) => 1,
        Value::String(_) => 2,
        Value::Object(_) => 3,
        Value::Array(_) => 4,
        Value::Bool(_) => 5,
    }
}

/// Render an f64 result as an integer when it is integral and fits
pub fn number_value(n: f64) -> Value {
    if n.is_finite() && n.fract() == 0.0 && n.abs() < (1u64 << 53) as f64 {
        Value::from(n as i64)
    } else {
        Value::from(n)
    }
}

/// Key-order independent string form, used to bucket group keys
pub fn canonical_json_string(value: &Value) -> String {
    match value {
        Value::Object(map) => {
            let mut pairs: Vec<_> = map.iter().collect();
            pairs.sort_by(|a, b| a.0.cmp(b.0));

            let inner = pairs
                .iter()
                .map(|(k, v)| format!("{:?}:{}", k, canonical_json_string(v)))
                .collect::<Vec<_>>()
                .join(",");
            format!("{{{}}}", inner)
        }
        Value::Array(arr) => {
            let inner = arr
                .iter()
                .map(canonical_json_string)
                .collect::<Vec<_>>()
                .join(",");
            format!("[{}]", inner)
        }
        // 1954 and 1954.0 land in the same bucket
        Value::Number(n) => match n.as_f64() {
            Some(f) => number_value(f).to_string(),
            None => n.to_string(),
        },
        _ => value.to_string(),
    }
}
