use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;

use super::*;
use crate::dispatch::BroadcastRefreshPublisher;
use crate::dispatch::ChangeDispatcher;
use crate::dispatch::InMemoryPropertySourceStore;
use crate::dispatch::PropertySourceStore;
use crate::dispatch::RefreshEvent;
use crate::kv::KeyValue;
use crate::test_utils::not_found;
use crate::test_utils::read_timeout;
use crate::test_utils::KvCall;
use crate::test_utils::ScriptedKvQuery;
use crate::ConfigFormat;
use crate::KvError;

struct Fixture {
    kv: Arc<ScriptedKvQuery>,
    store: Arc<InMemoryPropertySourceStore>,
    events: broadcast::Receiver<RefreshEvent>,
    initialized: Arc<AtomicBool>,
    watcher: PathWatcher,
}

fn fixture(
    path: &str,
    strategy: WatchStrategy,
) -> Fixture {
    let kv = Arc::new(ScriptedKvQuery::new());
    let store = Arc::new(InMemoryPropertySourceStore::new());
    let publisher = Arc::new(BroadcastRefreshPublisher::new(16));
    let events = publisher.subscribe();
    let dispatcher = Arc::new(ChangeDispatcher::new(store.clone(), publisher));
    let initialized = Arc::new(AtomicBool::new(false));
    let watcher = PathWatcher::new(
        path.to_string(),
        kv.clone(),
        strategy,
        dispatcher,
        Duration::from_millis(50),
        initialized.clone(),
    );
    Fixture {
        kv,
        store,
        events,
        initialized,
        watcher,
    }
}

fn indexes(calls: &[KvCall]) -> Vec<Option<u64>> {
    calls.iter().map(|c| c.index).collect()
}

#[tokio::test(start_paused = true)]
async fn test_first_poll_initializes_without_dispatch() {
    let mut f = fixture("config/application", WatchStrategy::for_format(ConfigFormat::Yaml).unwrap());
    f.kv.respond("config/application", Ok(vec![KeyValue::new("config/application", "a: 1", 5)]));
    let token = CancellationToken::new();

    let outcome = f.watcher.poll_once(&token).await;

    assert_eq!(outcome, Some(PollOutcome::Init));
    assert!(f.initialized.load(Ordering::Acquire));
    assert!(f.store.property_sources().is_empty());
    assert!(f.events.try_recv().is_err());
    assert_eq!(
        f.kv.calls(),
        vec![KvCall {
            key: "config/application".to_string(),
            recurse: false,
            index: None,
        }]
    );
}

#[tokio::test(start_paused = true)]
async fn test_native_reordered_content_is_no_change_then_change_dispatches() {
    let mut f = fixture("config/orders/", WatchStrategy::Native);
    f.kv.respond(
        "config/orders/",
        Ok(vec![
            KeyValue::new("config/orders/a", "1", 3),
            KeyValue::new("config/orders/b", "2", 4),
        ]),
    )
    .respond(
        "config/orders/",
        Ok(vec![
            KeyValue::new("config/orders/b", "2", 4),
            KeyValue::new("config/orders/a", "1", 3),
        ]),
    )
    .respond(
        "config/orders/",
        Ok(vec![
            KeyValue::new("config/orders/b", "2", 4),
            KeyValue::new("config/orders/a", "9", 7),
        ]),
    );
    let token = CancellationToken::new();

    assert_eq!(f.watcher.poll_once(&token).await, Some(PollOutcome::Init));
    assert_eq!(f.watcher.poll_once(&token).await, Some(PollOutcome::NoChange));
    assert!(f.events.try_recv().is_err());
    assert_eq!(f.watcher.poll_once(&token).await, Some(PollOutcome::Changed));

    let event = f.events.try_recv().unwrap();
    assert_eq!(event.changes.keys().collect::<Vec<_>>(), vec!["a"]);
    assert_eq!(event.changes.previous_value("a"), Some(Some(&json!("1"))));
    let source = f.store.get("consul-orders").unwrap();
    assert_eq!(source.values["a"], json!("9"));
    assert_eq!(source.values["b"], json!("2"));

    let calls = f.kv.calls();
    assert!(calls.iter().all(|c| c.recurse));
    assert_eq!(indexes(&calls), vec![None, Some(4), Some(4)]);
}

#[tokio::test(start_paused = true)]
async fn test_equal_content_with_newer_index_advances_cursor() {
    let mut f = fixture("config/application", WatchStrategy::for_format(ConfigFormat::Yaml).unwrap());
    f.kv.respond("config/application", Ok(vec![KeyValue::new("config/application", "a: 1", 5)]))
        .respond("config/application", Ok(vec![KeyValue::new("config/application", "a: 1", 9)]))
        .respond("config/application", Ok(vec![KeyValue::new("config/application", "a: 1", 9)]));
    let token = CancellationToken::new();

    assert_eq!(f.watcher.poll_once(&token).await, Some(PollOutcome::Init));
    assert_eq!(f.watcher.poll_once(&token).await, Some(PollOutcome::NoChange));
    assert_eq!(f.watcher.poll_once(&token).await, Some(PollOutcome::NoChange));

    assert_eq!(indexes(&f.kv.calls()), vec![None, Some(5), Some(9)]);
    assert!(f.events.try_recv().is_err());
    assert!(f.store.property_sources().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_timeout_repolls_once_with_same_cursor() {
    let mut f = fixture("config/application", WatchStrategy::for_format(ConfigFormat::Yaml).unwrap());
    f.kv.respond("config/application", Ok(vec![KeyValue::new("config/application", "a: 1", 5)]))
        .respond("config/application", Err(read_timeout("config/application")))
        .respond("config/application", Ok(vec![KeyValue::new("config/application", "a: 1", 5)]));
    let token = CancellationToken::new();

    assert_eq!(f.watcher.poll_once(&token).await, Some(PollOutcome::Init));
    assert_eq!(f.watcher.poll_once(&token).await, Some(PollOutcome::Timeout));
    assert_eq!(f.watcher.poll_once(&token).await, Some(PollOutcome::NoChange));

    assert_eq!(indexes(&f.kv.calls()), vec![None, Some(5), Some(5)]);
}

#[tokio::test(start_paused = true)]
async fn test_not_found_abandons_path() {
    let f = fixture("config/orders", WatchStrategy::for_format(ConfigFormat::Json).unwrap());
    f.kv.respond("config/orders", Err(not_found("config/orders")));

    let exit = f.watcher.run(CancellationToken::new()).await;

    assert_eq!(exit, PathExit::Abandoned);
    assert_eq!(f.kv.calls().len(), 1);
    assert!(!f.initialized.load(Ordering::Acquire));
}

#[tokio::test(start_paused = true)]
async fn test_document_without_matching_entry_is_not_found() {
    let mut f = fixture("config/orders", WatchStrategy::for_format(ConfigFormat::Json).unwrap());
    f.kv.respond("config/orders", Ok(vec![KeyValue::new("config/orders,test", "{}", 2)]));

    let outcome = f.watcher.poll_once(&CancellationToken::new()).await;

    assert_eq!(outcome, Some(PollOutcome::NotFound));
}

#[tokio::test(start_paused = true)]
async fn test_unclassified_error_abandons_path_after_init() {
    let f = fixture("config/orders", WatchStrategy::for_format(ConfigFormat::Json).unwrap());
    f.kv.respond("config/orders", Ok(vec![KeyValue::new("config/orders", r#"{"a":"1"}"#, 2)]))
        .respond(
            "config/orders",
            Err(KvError::Status {
                key: "config/orders".to_string(),
                status: 500,
                body: "boom".to_string(),
            }),
        );

    let exit = f.watcher.run(CancellationToken::new()).await;

    assert_eq!(exit, PathExit::Abandoned);
    assert_eq!(indexes(&f.kv.calls()), vec![None, Some(2)]);
    assert!(f.store.property_sources().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_cancelled_before_delay_elapses_never_polls() {
    let mut f = fixture("config/orders", WatchStrategy::Native);
    let token = CancellationToken::new();
    token.cancel();

    assert_eq!(f.watcher.poll_once(&token).await, None);
    assert!(f.kv.calls().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_cancelled_in_flight_poll_discards_late_result() {
    let mut f = fixture("config/application", WatchStrategy::for_format(ConfigFormat::Yaml).unwrap());
    f.kv.respond_after(
        "config/application",
        Duration::from_secs(10),
        Ok(vec![KeyValue::new("config/application", "a: 1", 5)]),
    );
    let token = CancellationToken::new();
    let initialized = f.initialized.clone();
    let kv = f.kv.clone();
    let task = tokio::spawn(f.watcher.run(token.clone()));

    tokio::time::sleep(Duration::from_secs(1)).await;
    assert_eq!(kv.calls().len(), 1);
    token.cancel();

    assert_eq!(task.await.unwrap(), PathExit::Cancelled);
    tokio::time::sleep(Duration::from_secs(20)).await;
    assert!(!initialized.load(Ordering::Acquire));
    assert_eq!(kv.calls().len(), 1);
    assert!(f.events.try_recv().is_err());
}
