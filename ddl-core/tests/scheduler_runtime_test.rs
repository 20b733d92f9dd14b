mod common;

use std::sync::Arc;
use std::time::Duration;

use common::{config_for, document, program, RecordingSink};
use ddl_core::{spawn_scheduler, Engine, SchedulerConfig, TagFilter};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn fast_config() -> SchedulerConfig {
    SchedulerConfig {
        catalog_tick: Duration::from_millis(20),
        catalog_refresh_interval: Duration::from_secs(3600),
        notify_tick: Duration::from_millis(20),
        notification_interval: Duration::from_millis(20),
        notify_error_backoff: Duration::from_millis(50),
    }
}

#[tokio::test]
async fn scheduler_fetches_then_notifies_subscribers() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/schools.json"))
        .respond_with(ResponseTemplate::new(200).set_body_string(document(&[(
            "2025",
            vec![program("Tongji", None, &["CS"])],
        )])))
        .expect(1)
        .mount(&server)
        .await;

    let sink = Arc::new(RecordingSink::default());
    let engine = Engine::in_memory(
        config_for(&format!("{}/schools.json", server.uri())),
        reqwest::Client::new(),
        sink.clone(),
    );
    engine.subscriptions().subscribe("alice", TagFilter::new()).await;

    let handle = spawn_scheduler(engine.clone(), fast_config());

    let delivered = tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            if !sink.sent_to("alice").is_empty() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await;
    assert!(delivered.is_ok(), "timed out waiting for a notification");

    handle.stop().await.expect("stop scheduler");

    let messages = sink.sent_to("alice");
    assert_eq!(messages.len(), 1, "a new program is announced exactly once");
    assert!(messages[0].contains("Tongji"));
    // Refresh interval is an hour, so the mock is hit once; verified on drop.
}

#[tokio::test]
async fn fetch_failures_do_not_stop_the_loops() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let engine = Engine::in_memory(
        config_for(&server.uri()),
        reqwest::Client::new(),
        Arc::new(RecordingSink::default()),
    );
    let config = SchedulerConfig {
        catalog_refresh_interval: Duration::from_millis(10),
        ..fast_config()
    };
    let handle = spawn_scheduler(engine.clone(), config);

    tokio::time::sleep(Duration::from_millis(200)).await;
    let requests = server.received_requests().await.unwrap_or_default();
    assert!(requests.len() >= 2, "catalog loop keeps retrying after errors");
    assert!(engine.catalog().await.is_empty());

    handle.stop().await.expect("stop scheduler");
}

#[tokio::test]
async fn stop_is_prompt_with_long_ticks() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let engine = Engine::in_memory(
        config_for(&server.uri()),
        reqwest::Client::new(),
        Arc::new(RecordingSink::default()),
    );
    let config = SchedulerConfig {
        catalog_tick: Duration::from_secs(3600),
        catalog_refresh_interval: Duration::from_secs(3600),
        notify_tick: Duration::from_secs(3600),
        notification_interval: Duration::from_secs(3600),
        notify_error_backoff: Duration::from_secs(3600),
    };
    let handle = spawn_scheduler(engine, config);
    tokio::time::sleep(Duration::from_millis(50)).await;

    tokio::time::timeout(Duration::from_secs(5), handle.stop())
        .await
        .expect("stop should not wait for the next tick")
        .expect("loops exit cleanly");
}
