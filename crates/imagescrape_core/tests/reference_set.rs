use imagescrape_core::{ImageReference, Query, ReferenceSet};
use pretty_assertions::assert_eq;

fn reference(url: &str, query: &Query) -> ImageReference {
    ImageReference::new(url, query.clone())
}

#[test]
fn merge_returns_only_new_references() {
    let cats = Query::new("cats").unwrap();
    let mut set = ReferenceSet::new();

    let first = set.merge(vec![
        reference("https://img.example/a.jpg", &cats),
        reference("https://img.example/b.jpg", &cats),
    ]);
    assert_eq!(first.len(), 2);

    let second = set.merge(vec![
        reference("https://img.example/b.jpg", &cats),
        reference("https://img.example/c.jpg", &cats),
    ]);
    assert_eq!(second, vec![reference("https://img.example/c.jpg", &cats)]);
    assert_eq!(set.len(), 3);
}

#[test]
fn duplicates_inside_one_batch_are_collapsed() {
    let cats = Query::new("cats").unwrap();
    let mut set = ReferenceSet::new();

    let added = set.merge(vec![
        reference("https://img.example/a.jpg", &cats),
        reference("https://img.example/a.jpg", &cats),
    ]);
    assert_eq!(added.len(), 1);
    assert_eq!(set.len(), 1);
}

#[test]
fn first_discovering_query_keeps_the_url() {
    let cats = Query::new("cats").unwrap();
    let kittens = Query::new("kittens").unwrap();
    let mut set = ReferenceSet::new();

    set.merge(vec![reference("https://img.example/a.jpg", &cats)]);
    set.merge(vec![reference("https://img.example/a.jpg", &kittens)]);

    assert_eq!(set.get("https://img.example/a.jpg").unwrap().query, cats);
    assert_eq!(set.count_for(&cats), 1);
    assert_eq!(set.count_for(&kittens), 0);
}

#[test]
fn urls_are_pairwise_distinct_and_sorted() {
    let q = Query::new("q").unwrap();
    let set: ReferenceSet = ["https://z/1.png", "https://a/1.png", "https://z/1.png"]
        .into_iter()
        .map(|url| reference(url, &q))
        .collect();

    let urls: Vec<_> = set.urls().collect();
    assert_eq!(urls, vec!["https://a/1.png", "https://z/1.png"]);
}
