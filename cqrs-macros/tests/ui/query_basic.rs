use cqrs_application::query::Query;
use cqrs_macros::query;

#[query(output = Vec<String>, cacheable)]
#[derive(Clone)]
struct ListProducts {
    page: i64,
}

fn main() {
    assert_eq!(ListProducts::NAME, "ListProducts");

    let q = ListProducts { page: 2 };
    assert_eq!(
        q.clone().cache_key().as_deref(),
        Some("ListProducts { page: 2 }")
    );

    let out: <ListProducts as Query>::Output = vec!["a".to_string()];
    assert_eq!(out.len(), 1);
}
