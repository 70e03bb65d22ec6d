//! Collection run behavior: caching, progress streams, partial failure.

mod common;

use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::time::Duration;

use serde_json::json;

use common::{MockAdapter, date_range, kr_symbol};
use stockscope_core::{Collector, FlightGuard, ProgressEvent, ProgressSink};
use stockscope_market_data::{CacheKey, FetchError};
use stockscope_store::CacheStore;

async fn drain(mut rx: tokio::sync::mpsc::Receiver<ProgressEvent>) -> Vec<ProgressEvent> {
    let mut events = Vec::new();
    while let Some(event) = rx.recv().await {
        events.push(event);
    }
    events
}

fn assert_single_trailing_terminal(events: &[ProgressEvent]) {
    let terminals = events.iter().filter(|e| e.is_terminal()).count();
    assert_eq!(terminals, 1, "expected exactly one terminal event");
    assert!(events.last().unwrap().is_terminal(), "terminal must be last");
}

#[tokio::test(start_paused = true)]
async fn price_collect_on_cache_miss_saves_all_bars() {
    let adapter = Arc::new(MockAdapter::new().with_bars(30));
    let collector = Collector::new(
        adapter.clone(),
        CacheStore::open_in_memory().unwrap(),
        FlightGuard::new(),
    );
    let (start, end) = date_range();

    let (sink, rx) = ProgressSink::channel(64);
    collector.run_prices(&kr_symbol(), start, end, false, &sink).await;
    drop(sink);

    let events = drain(rx).await;
    assert_single_trailing_terminal(&events);
    assert_eq!(
        events.last().unwrap(),
        &ProgressEvent::Result {
            data: json!({"saved": 30})
        }
    );
    // Fetch progress reached completion before saving.
    assert!(events.contains(&ProgressEvent::step("fetch", 1, 1)));
    assert_eq!(adapter.price_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn second_identical_run_is_served_from_cache() {
    let adapter = Arc::new(MockAdapter::new().with_bars(10));
    let collector = Collector::new(
        adapter.clone(),
        CacheStore::open_in_memory().unwrap(),
        FlightGuard::new(),
    );
    let (start, end) = date_range();

    for _ in 0..2 {
        let (sink, rx) = ProgressSink::channel(64);
        collector.run_prices(&kr_symbol(), start, end, false, &sink).await;
        drop(sink);
        drain(rx).await;
    }

    assert_eq!(adapter.price_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn force_refresh_refetches_and_overwrites() {
    let adapter = Arc::new(MockAdapter::new().with_bars(10));
    let store = CacheStore::open_in_memory().unwrap();
    let collector = Collector::new(adapter.clone(), store.clone(), FlightGuard::new());
    let (start, end) = date_range();

    for force in [false, true] {
        let (sink, rx) = ProgressSink::channel(64);
        collector.run_prices(&kr_symbol(), start, end, force, &sink).await;
        drop(sink);
        drain(rx).await;
    }

    assert_eq!(adapter.price_calls.load(Ordering::SeqCst), 2);
    let key = CacheKey::prices("mock", &kr_symbol(), start, end);
    assert!(store.get(&key).await.unwrap().is_some());
}

#[tokio::test(start_paused = true)]
async fn one_failing_article_out_of_five_saves_four() {
    let adapter = Arc::new(
        MockAdapter::new()
            .with_articles(5)
            .failing_body("https://news.example/2"),
    );
    let store = CacheStore::open_in_memory().unwrap();
    let collector = Collector::new(adapter.clone(), store.clone(), FlightGuard::new());

    let (sink, rx) = ProgressSink::channel(64);
    collector.run_news(&kr_symbol(), 7, 50, false, &sink).await;
    drop(sink);

    let events = drain(rx).await;
    assert_single_trailing_terminal(&events);
    assert_eq!(
        events.last().unwrap(),
        &ProgressEvent::Result {
            data: json!({"saved": 4, "failed": 1})
        }
    );

    // The failing item burned its retries: 4 clean + 3 attempts.
    assert_eq!(adapter.body_calls.load(Ordering::SeqCst), 7);

    let key = CacheKey::news("mock", &kr_symbol(), 7);
    let record = store.get(&key).await.unwrap().unwrap();
    assert_eq!(record.len(), 4);
}

#[tokio::test(start_paused = true)]
async fn scraping_progress_is_monotonic() {
    let adapter = Arc::new(MockAdapter::new().with_articles(5));
    let collector = Collector::new(
        adapter,
        CacheStore::open_in_memory().unwrap(),
        FlightGuard::new(),
    );

    let (sink, rx) = ProgressSink::channel(64);
    collector.run_news(&kr_symbol(), 7, 50, false, &sink).await;
    drop(sink);

    let events = drain(rx).await;
    let currents: Vec<usize> = events
        .iter()
        .filter_map(|e| match e {
            ProgressEvent::Progress {
                step,
                current: Some(c),
                ..
            } if step == "scraping" => Some(*c),
            _ => None,
        })
        .collect();
    assert_eq!(currents, vec![1, 2, 3, 4, 5]);
    assert_single_trailing_terminal(&events);
}

#[tokio::test(start_paused = true)]
async fn permanent_listing_failure_aborts_the_run() {
    let adapter = Arc::new(MockAdapter::new().with_articles(5).listing_fails(|| {
        FetchError::SymbolNotFound {
            symbol: "005930".to_string(),
            provider: "mock".to_string(),
        }
    }));
    let store = CacheStore::open_in_memory().unwrap();
    let collector = Collector::new(adapter.clone(), store.clone(), FlightGuard::new());

    let (sink, rx) = ProgressSink::channel(64);
    collector.run_news(&kr_symbol(), 7, 50, false, &sink).await;
    drop(sink);

    let events = drain(rx).await;
    assert!(matches!(
        events.last().unwrap(),
        ProgressEvent::Error { .. }
    ));
    // Permanent failure is not retried and no items were attempted.
    assert_eq!(adapter.list_calls.load(Ordering::SeqCst), 1);
    assert_eq!(adapter.body_calls.load(Ordering::SeqCst), 0);

    let key = CacheKey::news("mock", &kr_symbol(), 7);
    assert!(store.get(&key).await.unwrap().is_none());
}

#[tokio::test(start_paused = true)]
async fn store_write_failure_ends_the_run_with_an_error() {
    let adapter = Arc::new(MockAdapter::new().with_bars(10));
    let store = CacheStore::open_in_memory().unwrap();
    let collector = Collector::new(adapter.clone(), store.clone(), FlightGuard::new());
    let (start, end) = date_range();

    // Closing the store makes every write fail while the fetch itself
    // still succeeds.
    store.close().await.unwrap();

    let (sink, rx) = ProgressSink::channel(64);
    collector.run_prices(&kr_symbol(), start, end, true, &sink).await;
    drop(sink);

    let events = drain(rx).await;
    assert_single_trailing_terminal(&events);
    match events.last().unwrap() {
        ProgressEvent::Error { message } => {
            assert!(message.contains("Cache write failed"), "got: {}", message);
        }
        other => panic!("expected error terminal, got {:?}", other),
    }
    assert!(
        !events
            .iter()
            .any(|e| matches!(e, ProgressEvent::Result { .. }))
    );
    assert_eq!(adapter.price_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn concurrent_identical_collects_fetch_once() {
    let adapter = Arc::new(
        MockAdapter::new()
            .with_bars(10)
            .slow_prices(Duration::from_millis(50)),
    );
    let collector = Collector::new(
        adapter.clone(),
        CacheStore::open_in_memory().unwrap(),
        FlightGuard::new(),
    );
    let (start, end) = date_range();

    let (sink_a, rx_a) = ProgressSink::channel(64);
    let (sink_b, rx_b) = ProgressSink::channel(64);
    let symbol = kr_symbol();
    tokio::join!(
        collector.run_prices(&symbol, start, end, false, &sink_a),
        collector.run_prices(&symbol, start, end, false, &sink_b),
    );
    drop(sink_a);
    drop(sink_b);

    // The second run waited on the single-flight lock and was served
    // from the first run's cache write.
    let late = drain(rx_b).await;
    assert_eq!(
        late.last().unwrap(),
        &ProgressEvent::Result {
            data: json!({"saved": 10, "from_cache": true})
        }
    );
    assert_eq!(adapter.price_calls.load(Ordering::SeqCst), 1);
    drain(rx_a).await;
}

#[tokio::test(start_paused = true)]
async fn cancelled_consumer_stops_the_run_early() {
    let adapter = Arc::new(MockAdapter::new().with_articles(5));
    let collector = Collector::new(
        adapter.clone(),
        CacheStore::open_in_memory().unwrap(),
        FlightGuard::new(),
    );

    let (sink, rx) = ProgressSink::channel(64);
    drop(rx);
    collector.run_news(&kr_symbol(), 7, 50, false, &sink).await;

    assert_eq!(adapter.list_calls.load(Ordering::SeqCst), 0);
}
