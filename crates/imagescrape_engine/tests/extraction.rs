mod support;

use imagescrape_engine::{
    BrowserSession, LinkExtractor, NoopProgressSink, Query, ReferenceSet, ScrapeError,
    ScrollDiscoveryEngine,
};
use support::{fast_discovery, urls, SimulatedSession, Surface};

fn dogs_session() -> SimulatedSession {
    SimulatedSession::new().with_surface(
        "dogs",
        Surface::new(vec![urls("dogs", 0, 5), urls("dogs", 5, 5)]),
    )
}

#[tokio::test]
async fn extraction_reads_only_resolved_sources() {
    let mut session = dogs_session();
    session
        .navigate("https://search.example/search?q=dogs")
        .await
        .unwrap();
    let query = Query::new("dogs").unwrap();

    // Before scrolling only the first stage is rendered.
    let fresh = LinkExtractor
        .extract(&session, &query, &ReferenceSet::new())
        .await
        .unwrap();
    assert_eq!(fresh.len(), 5);
    assert!(fresh.iter().all(|r| r.url.starts_with("https://img.example/dogs/")));
    assert!(fresh.iter().all(|r| r.query == query));
}

#[tokio::test]
async fn second_extraction_without_scrolling_finds_nothing_new() {
    let mut session = dogs_session();
    session
        .navigate("https://search.example/search?q=dogs")
        .await
        .unwrap();
    let query = Query::new("dogs").unwrap();
    ScrollDiscoveryEngine::new(fast_discovery(2, 50))
        .run(&mut session, &query, &NoopProgressSink)
        .await
        .unwrap();

    let mut set = ReferenceSet::new();
    let first = LinkExtractor.extract(&session, &query, &set).await.unwrap();
    assert_eq!(first.len(), 10);
    set.merge(first);

    let second = LinkExtractor.extract(&session, &query, &set).await.unwrap();
    assert!(second.is_empty());
    assert_eq!(set.len(), 10);
}

#[tokio::test]
async fn unreadable_page_is_an_extraction_failure() {
    let mut session = dogs_session().with_broken_reads();
    session
        .navigate("https://search.example/search?q=dogs")
        .await
        .unwrap();
    let query = Query::new("dogs").unwrap();

    let err = LinkExtractor
        .extract(&session, &query, &ReferenceSet::new())
        .await
        .unwrap_err();
    assert!(matches!(err, ScrapeError::ExtractionFailure(_)));
}

#[tokio::test]
async fn torn_down_session_is_reported_as_unavailable() {
    let mut session = dogs_session().dying_after(1);
    session
        .navigate("https://search.example/search?q=dogs")
        .await
        .unwrap();
    session.scroll_to(1_000).await.unwrap();
    let query = Query::new("dogs").unwrap();

    let err = LinkExtractor
        .extract(&session, &query, &ReferenceSet::new())
        .await
        .unwrap_err();
    assert!(matches!(err, ScrapeError::SessionUnavailable(_)));
}
