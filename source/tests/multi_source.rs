use eventbridge_common::Event;
use eventbridge_replay::InMemoryReplayStore;
use eventbridge_source::{MessageSource, MockStreamingClient, MultiSource, Source};
use std::sync::Arc;
use std::time::Duration;

fn event(channel: &str, id: i64) -> Event {
    Event::new(channel, id, serde_json::json!({ "n": id }))
}

fn source(name: &str, events: Vec<Event>) -> MessageSource {
    MessageSource::new(
        name,
        Box::new(MockStreamingClient::new(events)),
        Arc::new(InMemoryReplayStore::new()),
        Vec::new(),
        eventbridge_common::ReplayFallback::NewEvents,
        Duration::from_secs(5),
    )
}

#[tokio::test]
async fn fans_in_from_every_child_before_any_repeats() {
    let a = source("a", vec![event("/topic/a", 1), event("/topic/a", 2)]);
    let b = source("b", vec![event("/topic/b", 1)]);

    let mut multi = MultiSource::new(vec![Box::new(a), Box::new(b)]);
    multi.open().await.unwrap();

    let mut seen = Vec::new();
    for _ in 0..3 {
        let pair = multi.get_message().await.unwrap();
        seen.push(pair.source_name);
    }
    seen.sort();
    assert_eq!(seen, vec!["a", "a", "b"]);

    multi.close().await.unwrap();
}

#[tokio::test]
async fn closes_every_child_on_shutdown() {
    let a = source("a", vec![event("/topic/a", 1)]);
    let b = source("b", vec![event("/topic/b", 1)]);

    let mut multi = MultiSource::new(vec![Box::new(a), Box::new(b)]);
    multi.open().await.unwrap();
    multi.get_message().await.unwrap();
    assert!(!multi.closed());
    multi.close().await.unwrap();
    assert!(multi.closed());
}

#[tokio::test]
async fn has_pending_messages_clears_once_the_buffered_message_is_pulled() {
    let a = source("a", vec![event("/topic/a", 1)]);
    let mut multi = MultiSource::new(vec![Box::new(a)]);
    multi.open().await.unwrap();

    for _ in 0..100 {
        if multi.has_pending_messages() {
            break;
        }
        tokio::task::yield_now().await;
    }
    assert!(multi.has_pending_messages());

    multi.get_message().await.unwrap();
    assert!(!multi.has_pending_messages());

    multi.close().await.unwrap();
}

#[tokio::test]
async fn open_failure_on_one_child_rolls_back_the_rest() {
    let ok = source("ok", vec![event("/topic/ok", 1)]);
    let bad = MessageSource::new(
        "bad",
        Box::new(MockStreamingClient::failing_to_open("boom")),
        Arc::new(InMemoryReplayStore::new()),
        Vec::new(),
        eventbridge_common::ReplayFallback::NewEvents,
        Duration::from_secs(5),
    );

    let mut multi = MultiSource::new(vec![Box::new(ok), Box::new(bad)]);
    let result = multi.open().await;
    assert!(result.is_err());
}

#[tokio::test]
async fn exhausted_sources_report_closed() {
    let a = source("a", vec![event("/topic/a", 1)]);
    let mut multi = MultiSource::new(vec![Box::new(a)]);
    multi.open().await.unwrap();

    multi.get_message().await.unwrap();
    let err = multi.get_message().await;
    assert!(err.is_err());
    assert!(multi.closed());
}
