// bookstore-core/src/book.rs
// The one entity stored in the collection

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{BookstoreError, Result};

/// Field names used by the query catalog
pub mod fields {
    pub const ID: &str = "_id";
    pub const TITLE: &str = "title";
    pub const AUTHOR: &str = "author";
    pub const GENRE: &str = "genre";
    pub const PUBLISHED_YEAR: &str = "published_year";
    pub const PRICE: &str = "price";
    pub const PAGES: &str = "pages";
    pub const IN_STOCK: &str = "in_stock";
}

/// A book document as seeded by the external loader
///
/// `title` is used as a lookup key but carries no uniqueness constraint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Book {
    pub title: String,
    pub author: String,
    pub genre: String,
    pub published_year: i64,
    pub price: f64,
    pub pages: i64,
    pub in_stock: bool,
}

impl Book {
    pub fn to_document(&self) -> Value {
        // A struct of plain scalars always serializes
        serde_json::to_value(self).unwrap_or(Value::Null)
    }

    /// Decode a stored document, ignoring `_id` and any extra fields
    pub fn from_document(doc: &Value) -> Result<Self> {
        Book::deserialize(doc).map_err(|e| {
            BookstoreError::Serialization(format!("Document is not a book: {}", e))
        })
    }
}
