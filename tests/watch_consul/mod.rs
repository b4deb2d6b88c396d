use std::sync::Arc;
use std::time::Duration;

use consul_watch::dispatch::BroadcastRefreshPublisher;
use consul_watch::dispatch::InMemoryPropertySourceStore;
use consul_watch::kv::ConsulKvClient;
use consul_watch::kv::KeyValue;
use consul_watch::watch::WatchFactory;
use consul_watch::ConfigFormat;
use serde_json::json;
use tokio::time::timeout;

use crate::common::settings_for;
use crate::common::wait_until;
use crate::common::Answer;
use crate::common::FakeConsul;
use crate::common::WAIT_FOR_EVENT_IN_SEC;
use crate::enable_logger;

#[tokio::test]
async fn test_yaml_change_is_published_and_missing_path_abandoned() {
    enable_logger();
    let consul = FakeConsul::start().await;
    consul.answer("config/application", Answer::NotFound);
    consul.answer(
        "config/orders",
        Answer::entries(&[KeyValue::new("config/orders", "a: 1\n", 3)]),
    );
    consul.answer(
        "config/orders",
        Answer::entries(&[KeyValue::new("config/orders", "a: 2\nb: 3\n", 8)]),
    );

    let settings = settings_for(consul.port(), ConfigFormat::Yaml);
    let kv = Arc::new(ConsulKvClient::new(&settings.consul, &settings.blocking_queries).unwrap());
    let store = Arc::new(InMemoryPropertySourceStore::new());
    let publisher = Arc::new(BroadcastRefreshPublisher::new(8));
    let mut events = publisher.subscribe();
    let group = WatchFactory::create_watcher(&settings, kv, store.clone(), publisher).unwrap();

    group.start().unwrap();
    let event = timeout(Duration::from_secs(WAIT_FOR_EVENT_IN_SEC), events.recv())
        .await
        .expect("no refresh event")
        .unwrap();

    assert_eq!(event.changes.keys().collect::<Vec<_>>(), vec!["a", "b"]);
    assert_eq!(event.changes.previous_value("a"), Some(Some(&json!(1))));
    assert_eq!(store.get_property("a"), Some(json!(2)));
    assert_eq!(store.get_property("b"), Some(json!(3)));
    assert!(group.is_watching());
    assert!(wait_until(|| group.abandoned_paths() == vec!["config/application".to_string()]).await);

    let requests = consul.requests();
    assert!(requests.contains(&"/v1/kv/config/orders".to_string()));
    assert!(requests.contains(&"/v1/kv/config/orders?index=3&wait=600s".to_string()));
    assert!(wait_until(|| consul.requests().contains(&"/v1/kv/config/orders?index=8&wait=600s".to_string())).await);

    group.stop();
    assert!(!group.is_watching());
}

#[tokio::test]
async fn test_native_prefix_is_watched_recursively() {
    enable_logger();
    let consul = FakeConsul::start().await;
    consul.answer(
        "config/orders/",
        Answer::entries(&[
            KeyValue::new("config/orders/server.port", "8080", 4),
            KeyValue::new("config/orders/feature.enabled", "false", 6),
        ]),
    );
    consul.answer(
        "config/orders/",
        Answer::entries(&[
            KeyValue::new("config/orders/feature.enabled", "true", 9),
            KeyValue::new("config/orders/server.port", "8080", 4),
        ]),
    );

    let settings = settings_for(consul.port(), ConfigFormat::Native);
    let kv = Arc::new(ConsulKvClient::new(&settings.consul, &settings.blocking_queries).unwrap());
    let store = Arc::new(InMemoryPropertySourceStore::new());
    let publisher = Arc::new(BroadcastRefreshPublisher::new(8));
    let mut events = publisher.subscribe();
    let group = WatchFactory::create_watcher(&settings, kv, store.clone(), publisher).unwrap();

    group.start().unwrap();
    let event = timeout(Duration::from_secs(WAIT_FOR_EVENT_IN_SEC), events.recv())
        .await
        .expect("no refresh event")
        .unwrap();

    assert_eq!(event.changes.keys().collect::<Vec<_>>(), vec!["feature.enabled"]);
    assert_eq!(store.get_property("feature.enabled"), Some(json!("true")));
    assert_eq!(store.get_property("server.port"), Some(json!("8080")));

    let requests = consul.requests();
    assert!(requests.contains(&"/v1/kv/config/orders/?recurse=true".to_string()));
    assert!(requests.contains(&"/v1/kv/config/orders/?recurse=true&index=6&wait=600s".to_string()));

    group.stop();
}
