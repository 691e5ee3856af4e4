// bookstore-core/src/catalog.rs
//! The fixed, ordered list of bookstore queries
//!
//! Entries are plain data. Nothing here talks to a database; the
//! [`QueryRunner`](crate::runner::QueryRunner) executes them in order.

use serde_json::{json, Value};

use crate::aggregation::{Accumulator, Expression, Group, Pipeline};
use crate::book::fields;
use crate::explain::ExplainVerbosity;
use crate::filter::{Condition, Filter};
use crate::find_options::{FindRequest, Projection, Sort, SortDirection};
use crate::index::IndexSpec;
use crate::update::Update;

pub const DEFAULT_PAGE_SIZE: u64 = 5;

/// Section headings, in the order they are run
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Section {
    BasicCrud,
    AdvancedQueries,
    Aggregation,
    Indexing,
    Additional,
}

impl Section {
    pub fn title(&self) -> &'static str {
        match self {
            Section::BasicCrud => "TASK 2: BASIC CRUD OPERATIONS",
            Section::AdvancedQueries => "TASK 3: ADVANCED QUERIES",
            Section::Aggregation => "TASK 4: AGGREGATION PIPELINE",
            Section::Indexing => "TASK 5: INDEXING",
            Section::Additional => "ADDITIONAL USEFUL QUERIES",
        }
    }

    pub fn banner(&self) -> String {
        format!("=== {} ===", self.title())
    }
}

/// A single database call
#[derive(Debug, Clone, PartialEq)]
pub enum Operation {
    Find(FindRequest),
    UpdateOne { filter: Filter, update: Update },
    DeleteOne(Filter),
    Count(Filter),
    Aggregate(Pipeline),
    CreateIndex(IndexSpec),
    ListIndexes,
    Explain {
        filter: Filter,
        verbosity: ExplainVerbosity,
    },
}

impl Operation {
    /// The command as it would be sent, for display
    pub fn describe(&self) -> Value {
        match self {
            Operation::Find(request) => json!({ "find": request.to_json() }),
            Operation::UpdateOne { filter, update } => json!({
                "updateOne": { "filter": filter.to_json(), "update": update.to_json() }
            }),
            Operation::DeleteOne(filter) => json!({ "deleteOne": { "filter": filter.to_json() } }),
            Operation::Count(filter) => json!({ "countDocuments": filter.to_json() }),
            Operation::Aggregate(pipeline) => json!({ "aggregate": pipeline.to_json() }),
            Operation::CreateIndex(spec) => json!({
                "createIndex": spec.keys_json(),
                "name": spec.name(),
            }),
            Operation::ListIndexes => json!({ "getIndexes": {} }),
            Operation::Explain { filter, verbosity } => json!({
                "explain": { "find": { "filter": filter.to_json() } },
                "verbosity": verbosity.as_str(),
            }),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CatalogEntry {
    pub section: Section,
    pub label: String,
    pub operation: Operation,
}

impl CatalogEntry {
    pub fn new(section: Section, label: impl Into<String>, operation: Operation) -> Self {
        CatalogEntry {
            section,
            label: label.into(),
            operation,
        }
    }
}

pub fn bookstore_catalog() -> Vec<CatalogEntry> {
    bookstore_catalog_with(DEFAULT_PAGE_SIZE)
}

/// The full catalog with `page_size` documents per pagination page
pub fn bookstore_catalog_with(page_size: u64) -> Vec<CatalogEntry> {
    let mut entries = Vec::new();
    entries.extend(basic_crud());
    entries.extend(advanced_queries(page_size));
    entries.extend(aggregations());
    entries.extend(indexing());
    entries.extend(additional());
    entries
}

fn find(filter: Filter) -> FindRequest {
    FindRequest::new(filter)
}

fn title_author_price() -> Projection {
    Projection::include([fields::TITLE, fields::AUTHOR, fields::PRICE]).exclude_id()
}

fn basic_crud() -> Vec<CatalogEntry> {
    use Section::BasicCrud as S;
    let gatsby = || Filter::eq(fields::TITLE, "The Great Gatsby");

    vec![
        CatalogEntry::new(
            S,
            "1. Find all books in Fantasy genre",
            Operation::Find(find(Filter::eq(fields::GENRE, "Fantasy"))),
        ),
        CatalogEntry::new(
            S,
            "2. Find books published after 2000",
            Operation::Find(find(Filter::gt(fields::PUBLISHED_YEAR, 2000))),
        ),
        CatalogEntry::new(
            S,
            "3. Find books by J.R.R. Tolkien",
            Operation::Find(find(Filter::eq(fields::AUTHOR, "J.R.R. Tolkien"))),
        ),
        CatalogEntry::new(
            S,
            "4. Update the price of 'The Great Gatsby' to $15.99",
            Operation::UpdateOne {
                filter: gatsby(),
                update: Update::set(fields::PRICE, 15.99),
            },
        ),
        CatalogEntry::new(S, "Updated book", Operation::Find(find(gatsby()))),
        CatalogEntry::new(
            S,
            "5. Delete 'Brave New World'",
            Operation::DeleteOne(Filter::eq(fields::TITLE, "Brave New World")),
        ),
        CatalogEntry::new(S, "Remaining books count", Operation::Count(Filter::All)),
    ]
}

fn advanced_queries(page_size: u64) -> Vec<CatalogEntry> {
    use Section::AdvancedQueries as S;
    let by_price = || find(Filter::All).project(Projection::include([fields::TITLE, fields::PRICE]).exclude_id());

    vec![
        CatalogEntry::new(
            S,
            "1. Books in stock and published after 2010",
            Operation::Find(find(Filter::and(vec![
                Filter::eq(fields::IN_STOCK, true),
                Filter::gt(fields::PUBLISHED_YEAR, 2010),
            ]))),
        ),
        CatalogEntry::new(
            S,
            "2. Books with projection (title, author, price only)",
            Operation::Find(find(Filter::All).project(title_author_price())),
        ),
        CatalogEntry::new(
            S,
            "3. Books sorted by price (ascending)",
            Operation::Find(by_price().sort(Sort::ascending(fields::PRICE))),
        ),
        CatalogEntry::new(
            S,
            "4. Books sorted by price (descending)",
            Operation::Find(by_price().sort(Sort::descending(fields::PRICE))),
        ),
        CatalogEntry::new(
            S,
            format!("5. Pagination - Page 1 (first {} books)", page_size),
            Operation::Find(find(Filter::All).project(title_author_price()).page(1, page_size)),
        ),
        CatalogEntry::new(
            S,
            format!("6. Pagination - Page 2 (next {} books)", page_size),
            Operation::Find(find(Filter::All).project(title_author_price()).page(2, page_size)),
        ),
    ]
}

fn aggregations() -> Vec<CatalogEntry> {
    use Section::Aggregation as S;

    let average_by_genre = Pipeline::new()
        .group(
            Group::by(Expression::field(fields::GENRE))
                .accumulate("averagePrice", Accumulator::Avg(Expression::field(fields::PRICE)))
                .accumulate("bookCount", Accumulator::count()),
        )
        .sort(Sort::descending("averagePrice"));

    let most_books = Pipeline::new()
        .group(
            Group::by(Expression::field(fields::AUTHOR))
                .accumulate("bookCount", Accumulator::count())
                .accumulate("books", Accumulator::Push(Expression::field(fields::TITLE))),
        )
        .sort(Sort::descending("bookCount"))
        .limit(1);

    let by_decade = Pipeline::new()
        .add_field("decade", Expression::decade(fields::PUBLISHED_YEAR))
        .group(
            Group::by(Expression::field("decade"))
                .accumulate("count", Accumulator::count())
                .accumulate(
                    "books",
                    Accumulator::Push(Expression::object(vec![
                        ("title", Expression::field(fields::TITLE)),
                        ("year", Expression::field(fields::PUBLISHED_YEAR)),
                    ])),
                ),
        )
        .sort(Sort::ascending(fields::ID));

    vec![
        CatalogEntry::new(S, "1. Average price by genre", Operation::Aggregate(average_by_genre)),
        CatalogEntry::new(S, "2. Author with the most books", Operation::Aggregate(most_books)),
        CatalogEntry::new(
            S,
            "3. Books grouped by publication decade",
            Operation::Aggregate(by_decade),
        ),
    ]
}

fn indexing() -> Vec<CatalogEntry> {
    use Section::Indexing as S;
    let explain = |filter| Operation::Explain {
        filter,
        verbosity: ExplainVerbosity::ExecutionStats,
    };

    vec![
        CatalogEntry::new(
            S,
            "1. Creating index on 'title' field",
            Operation::CreateIndex(IndexSpec::ascending(fields::TITLE)),
        ),
        CatalogEntry::new(
            S,
            "2. Creating compound index on 'author' and 'published_year'",
            Operation::CreateIndex(
                IndexSpec::ascending(fields::AUTHOR)
                    .then(fields::PUBLISHED_YEAR, SortDirection::Ascending),
            ),
        ),
        CatalogEntry::new(S, "3. All indexes on the books collection", Operation::ListIndexes),
        CatalogEntry::new(
            S,
            "4. Query without index (finding by genre)",
            explain(Filter::eq(fields::GENRE, "Fiction")),
        ),
        CatalogEntry::new(
            S,
            "Query with index (finding by title)",
            explain(Filter::eq(fields::TITLE, "The Great Gatsby")),
        ),
        CatalogEntry::new(
            S,
            "Compound index query (author and year)",
            explain(Filter::fields(vec![
                (fields::AUTHOR, Condition::eq("J.R.R. Tolkien")),
                (fields::PUBLISHED_YEAR, Condition::eq(1954)),
            ])),
        ),
    ]
}

fn additional() -> Vec<CatalogEntry> {
    use Section::Additional as S;

    let price_range = Pipeline::new().group(
        Group::all()
            .accumulate("minPrice", Accumulator::Min(Expression::field(fields::PRICE)))
            .accumulate("maxPrice", Accumulator::Max(Expression::field(fields::PRICE)))
            .accumulate("avgPrice", Accumulator::Avg(Expression::field(fields::PRICE)))
            .accumulate("totalBooks", Accumulator::count()),
    );

    vec![
        CatalogEntry::new(
            S,
            "1. Top 3 most expensive books",
            Operation::Find(
                find(Filter::All)
                    .project(title_author_price())
                    .sort(Sort::descending(fields::PRICE))
                    .limit(3),
            ),
        ),
        CatalogEntry::new(
            S,
            "2. Books count by stock status",
            Operation::Aggregate(Pipeline::new().group(
                Group::by(Expression::field(fields::IN_STOCK))
                    .accumulate("count", Accumulator::count()),
            )),
        ),
        CatalogEntry::new(
            S,
            "3. Books with more than 400 pages",
            Operation::Find(
                find(Filter::gt(fields::PAGES, 400))
                    .project(Projection::include([fields::TITLE, fields::PAGES]).exclude_id())
                    .sort(Sort::descending(fields::PAGES)),
            ),
        ),
        CatalogEntry::new(S, "4. Price range analysis", Operation::Aggregate(price_range)),
    ]
}
