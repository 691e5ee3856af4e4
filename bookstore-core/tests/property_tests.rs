// Property tests for filtering, sorting and pagination over the memory store
use bookstore_core::{DocumentStore, Filter, FindRequest, MemoryStore, Projection, Sort};
use proptest::prelude::*;
use serde_json::{json, Value};

fn store_with_years(years: &[i64]) -> MemoryStore {
    let docs = years
        .iter()
        .enumerate()
        .map(|(i, year)| json!({"title": format!("Book {}", i), "published_year": year}))
        .collect();
    MemoryStore::with_documents(docs).unwrap()
}

fn years_of(docs: &[Value]) -> Vec<i64> {
    docs.iter()
        .map(|d| d["published_year"].as_i64().unwrap())
        .collect()
}

proptest! {
    #[test]
    fn prop_gt_excludes_bound(
        years in prop::collection::vec(1800i64..2030, 0..40),
        bound in 1800i64..2030,
    ) {
        let store = store_with_years(&years);
        let found = store
            .find(&FindRequest::new(Filter::gt("published_year", bound)))
            .unwrap();

        let expected = years.iter().filter(|y| **y > bound).count();
        prop_assert_eq!(found.len(), expected);
        prop_assert!(years_of(&found).iter().all(|y| *y > bound));
    }

    #[test]
    fn prop_gt_is_monotonic_in_bound(
        years in prop::collection::vec(1800i64..2030, 0..40),
        low in 1800i64..2030,
        delta in 0i64..50,
    ) {
        let store = store_with_years(&years);
        let count = |bound: i64| store.count_documents(&Filter::gt("published_year", bound)).unwrap();
        prop_assert!(count(low + delta) <= count(low));
    }

    #[test]
    fn prop_exact_match_returns_matching_subset(
        genres in prop::collection::vec(prop::sample::select(vec!["Fantasy", "fantasy", "Fiction", "Dystopian"]), 0..30),
    ) {
        let docs = genres.iter().map(|g| json!({"genre": g})).collect();
        let store = MemoryStore::with_documents(docs).unwrap();

        let found = store.find(&FindRequest::new(Filter::eq("genre", "Fantasy"))).unwrap();
        let expected = genres.iter().filter(|g| **g == "Fantasy").count();
        prop_assert_eq!(found.len(), expected);
        prop_assert!(found.iter().all(|d| d["genre"] == "Fantasy"));
    }

    #[test]
    fn prop_ascending_reversed_equals_descending(
        years in prop::collection::hash_set(1800i64..2030, 0..40),
    ) {
        let years: Vec<i64> = years.into_iter().collect();
        let store = store_with_years(&years);

        let mut ascending = years_of(
            &store.find(&FindRequest::new(Filter::All).sort(Sort::ascending("published_year"))).unwrap(),
        );
        let descending = years_of(
            &store.find(&FindRequest::new(Filter::All).sort(Sort::descending("published_year"))).unwrap(),
        );

        ascending.reverse();
        prop_assert_eq!(ascending, descending);
    }

    #[test]
    fn prop_skip_limit_is_tail_of_prefix(
        years in prop::collection::vec(1990i64..1996, 0..30),
        skip in 0u64..35,
        limit in 1u64..10,
    ) {
        // Few distinct years, so most sort keys are tied
        let store = store_with_years(&years);
        let base = || {
            FindRequest::new(Filter::All)
                .project(Projection::include(["title", "published_year"]))
                .sort(Sort::ascending("published_year"))
        };

        let page = store.find(&base().skip(skip).limit(limit)).unwrap();
        let prefix = store.find(&base().limit(skip + limit)).unwrap();

        let tail_start = (skip as usize).min(prefix.len());
        prop_assert_eq!(&page, &prefix[tail_start..].to_vec());

        let page_years = years_of(&page);
        prop_assert!(page_years.windows(2).all(|w| w[0] <= w[1]));
    }
}
