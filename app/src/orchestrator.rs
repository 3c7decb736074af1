use eventbridge_common::{Error, Result, SourceMessagePair};
use eventbridge_replay::ReplayMarkerStore;
use eventbridge_router::Router;
use eventbridge_sink::MultiSink;
use eventbridge_source::Source;
use futures::stream::{FuturesUnordered, StreamExt};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// `Idle -> Configured -> Running -> Draining -> Stopped` (§4.7). The enum
/// tags the phase for introspection; the live components themselves sit in
/// `Option` fields on [`Orchestrator`] rather than inside the enum, since
/// `run` needs `&mut` access to all of them concurrently.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Configured,
    Running,
    Draining,
    Stopped,
}

pub struct Orchestrator {
    phase: Phase,
    ignore_sink_errors: bool,
    source: Option<Box<dyn Source>>,
    sink: Option<Arc<MultiSink>>,
    router: Option<Arc<Router>>,
    replay_store: Option<Arc<dyn ReplayMarkerStore>>,
}

impl Orchestrator {
    pub fn new(ignore_sink_errors: bool) -> Self {
        Self {
            phase: Phase::Idle,
            ignore_sink_errors,
            source: None,
            sink: None,
            router: None,
            replay_store: None,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// `Idle -> Configured`: binds the already-built source, sink, router
    /// and replay store. Building those is the factories' job, not this
    /// one's.
    pub fn configure(
        &mut self,
        source: Box<dyn Source>,
        sink: MultiSink,
        router: Router,
        replay_store: Arc<dyn ReplayMarkerStore>,
    ) -> Result<()> {
        if self.phase != Phase::Idle {
            return Err(Error::Config(
                "orchestrator can only be configured from Idle".into(),
            ));
        }

        self.source = Some(source);
        self.sink = Some(Arc::new(sink));
        self.router = Some(Arc::new(router));
        self.replay_store = Some(replay_store);
        self.phase = Phase::Configured;
        Ok(())
    }

    /// `Configured -> Running -> (Draining) -> Stopped`. `cancellation`
    /// firing or a non-ignored sink error both drive the pump into drain;
    /// the former returns `Ok(())`, the latter propagates the error after
    /// every in-flight task has settled and every component has been
    /// closed.
    pub async fn run(&mut self, cancellation: CancellationToken) -> Result<()> {
        if self.phase != Phase::Configured {
            return Err(Error::Config(
                "orchestrator can only run from Configured".into(),
            ));
        }

        let source = self.source.as_mut().expect("configured");
        let sink = self.sink.clone().expect("configured");

        source.open().await?;
        sink.open_all().await?;
        self.phase = Phase::Running;

        let router = self.router.clone().expect("configured");
        let replay_store = self.replay_store.clone().expect("configured");
        let ignore_sink_errors = self.ignore_sink_errors;

        let mut in_flight: FuturesUnordered<JoinHandle<Result<()>>> = FuturesUnordered::new();
        let mut fatal: Option<Error> = None;

        'pump: loop {
            if self.source.as_ref().expect("configured").closed() {
                break;
            }

            tokio::select! {
                biased;

                _ = cancellation.cancelled() => {
                    tracing::info!("shutdown signal observed, draining");
                    break 'pump;
                }

                Some(finished) = in_flight.next(), if !in_flight.is_empty() => {
                    if let Err(err) = reap(finished) {
                        tracing::error!(error = %err, "fatal sink error, draining");
                        fatal = Some(err);
                        break 'pump;
                    }
                }

                result = self.source.as_mut().expect("configured").get_message() => {
                    match result {
                        Ok(pair) => {
                            let handle = tokio::spawn(forward(
                                pair,
                                sink.clone(),
                                router.clone(),
                                replay_store.clone(),
                                ignore_sink_errors,
                            ));
                            in_flight.push(handle);
                        }
                        Err(err) if err.is_cancelled() => break 'pump,
                        Err(err) => {
                            fatal = Some(err);
                            break 'pump;
                        }
                    }
                }
            }
        }

        self.phase = Phase::Draining;

        if let Err(err) = self.source.as_mut().expect("configured").close().await {
            tracing::error!(error = %err, "error closing source during drain");
        }

        while let Some(finished) = in_flight.next().await {
            if let Err(err) = reap(finished) {
                tracing::error!(error = %err, "in-flight forward failed during drain");
            }
        }

        if let Err(err) = sink.close().await {
            tracing::error!(error = %err, "error closing sink during drain");
        }

        self.phase = Phase::Stopped;

        match fatal {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

fn reap(finished: std::result::Result<Result<()>, tokio::task::JoinError>) -> Result<()> {
    match finished {
        Ok(result) => result,
        Err(join_err) => Err(Error::MessageSink(format!(
            "forwarding task panicked: {join_err}"
        ))),
    }
}

/// Per-message forward (§4.7): route, publish, and on success commit the
/// replay marker. A sink error is swallowed (marker left uncommitted) iff
/// `ignore_sink_errors`; otherwise it propagates to shut the pump down.
async fn forward(
    pair: SourceMessagePair,
    sink: Arc<MultiSink>,
    router: Arc<Router>,
    replay_store: Arc<dyn ReplayMarkerStore>,
    ignore_sink_errors: bool,
) -> Result<()> {
    let SourceMessagePair { source_name, event } = pair;

    let Some(route) = router.find_route(&source_name, &event) else {
        tracing::warn!(source = %source_name, channel = %event.channel, "no matching route, dropping event");
        return Ok(());
    };

    let result = sink
        .consume_message(
            &event,
            &route.broker_name,
            &route.exchange_name,
            &route.routing_key,
            route.properties.as_ref(),
        )
        .await;

    match result {
        Ok(()) => {
            tracing::info!(
                replay_id = event.replay_id,
                channel = %event.channel,
                source = %source_name,
                broker = %route.broker_name,
                "forwarded event"
            );
            replay_store
                .set(&source_name, &event.channel, event.replay_id)
                .await?;
            Ok(())
        }
        Err(err) if ignore_sink_errors => {
            tracing::error!(
                error = %err,
                source = %source_name,
                channel = %event.channel,
                "sink error ignored, replay marker not committed"
            );
            Ok(())
        }
        Err(err) => Err(err),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use eventbridge_common::{Event, ReplayFallback, Route};
    use eventbridge_replay::InMemoryReplayStore;
    use eventbridge_router::{RoutingCondition, RoutingRule};
    use eventbridge_sink::BrokerSink;
    use eventbridge_source::{MessageSource, MockStreamingClient};
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::time::Duration;

    struct FakeSink {
        should_fail: bool,
        published: std::sync::Mutex<Vec<String>>,
    }

    #[async_trait::async_trait]
    impl BrokerSink for FakeSink {
        async fn open(&self) -> Result<()> {
            Ok(())
        }

        async fn consume_message(
            &self,
            _event: &Event,
            exchange: &str,
            _routing_key: &str,
            _properties: Option<&HashMap<String, String>>,
        ) -> Result<()> {
            if self.should_fail {
                return Err(Error::MessageSink("boom".into()));
            }
            self.published.lock().unwrap().push(exchange.to_string());
            Ok(())
        }

        async fn close(&self) -> Result<()> {
            Ok(())
        }
    }

    fn route() -> Route {
        Route {
            broker_name: "b1".into(),
            exchange_name: "e1".into(),
            routing_key: "k.a".into(),
            properties: None,
        }
    }

    fn router_matching_everything() -> Router {
        Router::new(
            vec![RoutingRule::new(
                RoutingCondition::compile("source == 'orgA'").unwrap(),
                route(),
            )],
            None,
        )
    }

    fn sink_with(fake: Arc<FakeSink>) -> MultiSink {
        let mut sinks: HashMap<String, Arc<dyn BrokerSink>> = HashMap::new();
        sinks.insert("b1".into(), fake);
        MultiSink::new(sinks)
    }

    #[tokio::test]
    async fn s3_marker_commits_on_sink_success() {
        let replay_store: Arc<dyn ReplayMarkerStore> = Arc::new(InMemoryReplayStore::new());
        let sink = Arc::new(sink_with(Arc::new(FakeSink {
            should_fail: false,
            published: std::sync::Mutex::new(Vec::new()),
        })));
        let router = Arc::new(router_matching_everything());

        let pair = SourceMessagePair {
            source_name: "orgA".into(),
            event: Event::new("/topic/x", 42, serde_json::json!({})),
        };

        forward(pair, sink, router, replay_store.clone(), false)
            .await
            .unwrap();

        assert_eq!(
            replay_store.get("orgA", "/topic/x").await.unwrap(),
            Some(42)
        );
    }

    #[tokio::test]
    async fn s4_marker_not_committed_when_sink_error_ignored() {
        let replay_store: Arc<dyn ReplayMarkerStore> = Arc::new(InMemoryReplayStore::new());
        let sink = Arc::new(sink_with(Arc::new(FakeSink {
            should_fail: true,
            published: std::sync::Mutex::new(Vec::new()),
        })));
        let router = Arc::new(router_matching_everything());

        let pair = SourceMessagePair {
            source_name: "orgA".into(),
            event: Event::new("/topic/x", 42, serde_json::json!({})),
        };

        forward(pair, sink, router, replay_store.clone(), true)
            .await
            .unwrap();

        assert_eq!(replay_store.get("orgA", "/topic/x").await.unwrap(), None);
    }

    #[tokio::test]
    async fn unignored_sink_error_propagates() {
        let replay_store: Arc<dyn ReplayMarkerStore> = Arc::new(InMemoryReplayStore::new());
        let sink = Arc::new(sink_with(Arc::new(FakeSink {
            should_fail: true,
            published: std::sync::Mutex::new(Vec::new()),
        })));
        let router = Arc::new(router_matching_everything());

        let pair = SourceMessagePair {
            source_name: "orgA".into(),
            event: Event::new("/topic/x", 1, serde_json::json!({})),
        };

        let err = forward(pair, sink, router, replay_store, false)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::MessageSink(_)));
    }

    #[tokio::test]
    async fn s1_unmatched_event_is_dropped_not_erred() {
        let replay_store: Arc<dyn ReplayMarkerStore> = Arc::new(InMemoryReplayStore::new());
        let sink = Arc::new(sink_with(Arc::new(FakeSink {
            should_fail: false,
            published: std::sync::Mutex::new(Vec::new()),
        })));
        let router = Arc::new(router_matching_everything());

        let pair = SourceMessagePair {
            source_name: "orgB".into(),
            event: Event::new("/topic/x", 1, serde_json::json!({})),
        };

        forward(pair, sink, router, replay_store.clone(), false)
            .await
            .unwrap();
        assert_eq!(replay_store.get("orgB", "/topic/x").await.unwrap(), None);
    }

    #[tokio::test]
    async fn s5_drains_on_cancellation_without_error() {
        let event_source = MessageSource::new(
            "orgA",
            Box::new(MockStreamingClient::new(vec![Event::new(
                "/topic/x",
                1,
                serde_json::json!({}),
            )])),
            Arc::new(InMemoryReplayStore::new()),
            Vec::new(),
            ReplayFallback::NewEvents,
            Duration::from_secs(5),
        );

        let fake_sink = Arc::new(FakeSink {
            should_fail: false,
            published: std::sync::Mutex::new(Vec::new()),
        });

        let mut orchestrator = Orchestrator::new(false);
        orchestrator
            .configure(
                Box::new(event_source),
                sink_with(fake_sink),
                router_matching_everything(),
                Arc::new(InMemoryReplayStore::new()),
            )
            .unwrap();

        let cancellation = CancellationToken::new();
        let cancelled_flag = Arc::new(AtomicBool::new(false));
        {
            let cancellation = cancellation.clone();
            let cancelled_flag = cancelled_flag.clone();
            tokio::spawn(async move {
                tokio::time::sleep(Duration::from_millis(20)).await;
                cancelled_flag.store(true, Ordering::SeqCst);
                cancellation.cancel();
            });
        }

        let result = orchestrator.run(cancellation).await;
        assert!(result.is_ok());
        assert_eq!(orchestrator.phase(), Phase::Stopped);
    }
}
