// Integration tests for the query catalog against a seeded in-memory store
use bookstore_core::{
    bookstore_catalog, Book, BookstoreError, CatalogEntry, DocumentStore, Filter, FindRequest,
    MemoryStore, Operation, Outcome, Projection, QueryRunner, Section, Update,
};
use serde_json::{json, Value};

fn book(
    title: &str,
    author: &str,
    genre: &str,
    published_year: i64,
    price: f64,
    pages: i64,
    in_stock: bool,
) -> Book {
    Book {
        title: title.to_string(),
        author: author.to_string(),
        genre: genre.to_string(),
        published_year,
        price,
        pages,
        in_stock,
    }
}

fn seeded_store() -> MemoryStore {
    let books = vec![
        book("To Kill a Mockingbird", "Harper Lee", "Fiction", 1960, 12.99, 336, true),
        book("1984", "George Orwell", "Dystopian", 1949, 10.99, 328, true),
        book("The Great Gatsby", "F. Scott Fitzgerald", "Fiction", 1925, 10.99, 180, true),
        book("Brave New World", "Aldous Huxley", "Dystopian", 1932, 11.5, 311, false),
        book("The Hobbit", "J.R.R. Tolkien", "Fantasy", 1937, 14.99, 310, true),
        book("The Catcher in the Rye", "J.D. Salinger", "Fiction", 1951, 8.99, 224, true),
        book("Pride and Prejudice", "Jane Austen", "Romance", 1813, 7.99, 432, true),
        book("The Lord of the Rings", "J.R.R. Tolkien", "Fantasy", 1954, 19.99, 1178, true),
        book("Animal Farm", "George Orwell", "Political Satire", 1945, 8.5, 112, false),
        book("The Alchemist", "Paulo Coelho", "Fiction", 1988, 10.99, 197, true),
        book("Moby Dick", "Herman Melville", "Adventure", 1851, 12.5, 635, false),
        book("Wuthering Heights", "Emily Brontë", "Gothic Fiction", 1847, 9.99, 416, true),
    ];

    let store = MemoryStore::new();
    for b in &books {
        store.insert_book(b).unwrap();
    }
    store
}

fn entry(catalog: &[CatalogEntry], label_prefix: &str) -> Operation {
    catalog
        .iter()
        .find(|e| e.label.starts_with(label_prefix))
        .unwrap_or_else(|| panic!("no entry labelled {}", label_prefix))
        .operation
        .clone()
}

fn documents(outcome: Outcome) -> Vec<Value> {
    match outcome {
        Outcome::Documents(docs) => docs,
        other => panic!("expected documents, got {:?}", other),
    }
}

#[test]
fn test_full_catalog_completes() {
    let runner = QueryRunner::new(seeded_store());
    let catalog = bookstore_catalog();

    let mut out = Vec::new();
    let summary = runner.run(&catalog, &mut out).unwrap();
    let text = String::from_utf8(out).unwrap();

    for section in [
        Section::BasicCrud,
        Section::AdvancedQueries,
        Section::Aggregation,
        Section::Indexing,
        Section::Additional,
    ] {
        assert_eq!(text.matches(&section.banner()).count(), 1, "{:?}", section);
    }
    assert!(text.trim_end().ends_with("=== QUERIES COMPLETED ==="));
    assert_eq!(summary.entries_run, catalog.len());
    assert!(summary.documents_printed > 0);

    assert!(text.contains("Remaining books count:\n11\n"));
    assert!(text.contains("Index used: title_1"));

    let store = runner.into_store();
    assert_eq!(store.count_documents(&Filter::All).unwrap(), 11);
    let names: Vec<String> = store
        .list_indexes()
        .unwrap()
        .into_iter()
        .map(|i| i.name)
        .collect();
    assert_eq!(names, vec!["_id_", "title_1", "author_1_published_year_1"]);
}

#[test]
fn test_missing_collection_stops_at_first_entry() {
    let runner = QueryRunner::new(MemoryStore::missing_collection("books"));

    let mut out = Vec::new();
    let err = runner.run(&bookstore_catalog(), &mut out).unwrap_err();
    let text = String::from_utf8(out).unwrap();

    assert!(matches!(err, BookstoreError::CollectionNotFound(_)));
    assert!(!err.is_connection_error());
    assert!(text.contains("1. Find all books in Fantasy genre"));
    assert!(!text.contains("2. Find books published after 2000"));
    assert!(!text.contains("QUERIES COMPLETED"));
}

#[test]
fn test_exact_match_is_case_sensitive() {
    let runner = QueryRunner::new(seeded_store());

    let fantasy = runner.find(&FindRequest::new(Filter::eq("genre", "Fantasy"))).unwrap();
    assert_eq!(fantasy.len(), 2);
    assert!(fantasy.iter().all(|d| d["genre"] == "Fantasy"));

    let lower = runner.find(&FindRequest::new(Filter::eq("genre", "fantasy"))).unwrap();
    assert!(lower.is_empty());
}

#[test]
fn test_update_then_find_returns_new_price() {
    let runner = QueryRunner::new(seeded_store());
    let catalog = bookstore_catalog();

    let before = runner
        .find(&FindRequest::new(Filter::eq("title", "The Great Gatsby")))
        .unwrap();
    assert_eq!(before[0]["price"], json!(10.99));

    runner.execute(&entry(&catalog, "4. Update the price")).unwrap();
    let after = documents(runner.execute(&entry(&catalog, "Updated book")).unwrap());
    assert_eq!(after.len(), 1);
    assert_eq!(after[0]["price"], json!(15.99));
}

#[test]
fn test_update_missing_title_changes_nothing() {
    let store = seeded_store();
    let before = store.documents();
    let outcome = store
        .update_one(&Filter::eq("title", "Nonexistent"), &Update::set("price", 1.0))
        .unwrap();
    assert_eq!(outcome.matched_count, 0);
    assert_eq!(store.documents(), before);
}

#[test]
fn test_delete_then_count_drops_by_one() {
    let runner = QueryRunner::new(seeded_store());
    let catalog = bookstore_catalog();

    let before = runner.store().count_documents(&Filter::All).unwrap();
    runner.execute(&entry(&catalog, "5. Delete")).unwrap();
    let after = runner.execute(&entry(&catalog, "Remaining books count")).unwrap();

    assert_eq!(after, Outcome::Count(before - 1));
    let gone = runner
        .find(&FindRequest::new(Filter::eq("title", "Brave New World")))
        .unwrap();
    assert!(gone.is_empty());
}

#[test]
fn test_in_stock_after_2010_is_empty_for_classics() {
    let runner = QueryRunner::new(seeded_store());
    let docs = documents(
        runner
            .execute(&entry(&bookstore_catalog(), "1. Books in stock"))
            .unwrap(),
    );
    assert!(docs.is_empty());
}

#[test]
fn test_projection_drops_id_and_other_fields() {
    let runner = QueryRunner::new(seeded_store());
    let docs = documents(
        runner
            .execute(&entry(&bookstore_catalog(), "2. Books with projection"))
            .unwrap(),
    );
    assert_eq!(docs.len(), 12);
    assert_eq!(
        docs[0],
        json!({"title": "To Kill a Mockingbird", "author": "Harper Lee", "price": 12.99})
    );
}

#[test]
fn test_pagination_second_page_of_six() {
    let store = MemoryStore::new();
    for i in 0..6 {
        store.insert_one(json!({"title": format!("Book {}", i)})).unwrap();
    }

    let request = FindRequest::new(Filter::All)
        .project(Projection::include(["title"]).exclude_id())
        .page(2, 5);
    let page = store.find(&request).unwrap();
    assert_eq!(page, vec![json!({"title": "Book 5"})]);
}

#[test]
fn test_genre_counts_sum_to_total() {
    let runner = QueryRunner::new(seeded_store());
    let groups = documents(
        runner
            .execute(&entry(&bookstore_catalog(), "1. Average price by genre"))
            .unwrap(),
    );

    let total: i64 = groups.iter().map(|g| g["bookCount"].as_i64().unwrap()).sum();
    assert_eq!(total, 12);

    let averages: Vec<f64> = groups.iter().map(|g| g["averagePrice"].as_f64().unwrap()).collect();
    assert!(averages.windows(2).all(|w| w[0] >= w[1]));
    assert_eq!(groups[0]["_id"], json!("Fantasy"));
}

#[test]
fn test_author_with_most_books() {
    let runner = QueryRunner::new(seeded_store());
    let top = documents(
        runner
            .execute(&entry(&bookstore_catalog(), "2. Author with the most books"))
            .unwrap(),
    );

    assert_eq!(top.len(), 1);
    assert_eq!(top[0]["bookCount"], json!(2));
    assert_eq!(top[0]["books"].as_array().unwrap().len(), 2);
}

#[test]
fn test_decade_grouping() {
    let runner = QueryRunner::new(seeded_store());
    let decades = documents(
        runner
            .execute(&entry(&bookstore_catalog(), "3. Books grouped by publication decade"))
            .unwrap(),
    );

    let keys: Vec<i64> = decades.iter().map(|d| d["_id"].as_i64().unwrap()).collect();
    assert!(keys.windows(2).all(|w| w[0] < w[1]));

    let fifties = decades.iter().find(|d| d["_id"] == json!(1950)).unwrap();
    assert_eq!(fifties["count"], json!(2));
    assert!(fifties["books"]
        .as_array()
        .unwrap()
        .contains(&json!({"title": "The Lord of the Rings", "year": 1954})));
}

#[test]
fn test_pages_over_400_sorted_descending() {
    let runner = QueryRunner::new(seeded_store());
    let docs = documents(
        runner
            .execute(&entry(&bookstore_catalog(), "3. Books with more than 400 pages"))
            .unwrap(),
    );

    let pages: Vec<i64> = docs.iter().map(|d| d["pages"].as_i64().unwrap()).collect();
    assert_eq!(pages, vec![1178, 635, 432, 416]);
}

#[test]
fn test_price_range() {
    let runner = QueryRunner::new(seeded_store());
    let docs = documents(
        runner
            .execute(&entry(&bookstore_catalog(), "4. Price range analysis"))
            .unwrap(),
    );

    assert_eq!(docs.len(), 1);
    assert_eq!(docs[0]["_id"], Value::Null);
    assert_eq!(docs[0]["minPrice"], json!(7.99));
    assert_eq!(docs[0]["maxPrice"], json!(19.99));
    assert_eq!(docs[0]["totalBooks"], json!(12));
}

#[test]
fn test_stock_status_counts() {
    let runner = QueryRunner::new(seeded_store());
    let docs = documents(
        runner
            .execute(&entry(&bookstore_catalog(), "2. Books count by stock status"))
            .unwrap(),
    );

    assert_eq!(docs.len(), 2);
    let in_stock = docs.iter().find(|d| d["_id"] == json!(true)).unwrap();
    let out_of_stock = docs.iter().find(|d| d["_id"] == json!(false)).unwrap();
    assert_eq!(in_stock["count"], json!(9));
    assert_eq!(out_of_stock["count"], json!(3));
}
