use crate::broker_sink::BrokerSink;
use eventbridge_common::{Error, Event, Result};
use std::collections::HashMap;
use std::sync::Arc;

/// Name-indexed collection of [`BrokerSink`]s; dispatches publishes by
/// `broker_name` (§4.4).
pub struct MultiSink {
    sinks: HashMap<String, Arc<dyn BrokerSink>>,
}

impl MultiSink {
    pub fn new(sinks: HashMap<String, Arc<dyn BrokerSink>>) -> Self {
        Self { sinks }
    }

    /// Opens every registered broker sink. Not part of the original
    /// contract's `consume_message`/`close` pair, but the orchestrator needs
    /// a single call to bring every broker up during `Configured ->
    /// Running`.
    pub async fn open_all(&self) -> Result<()> {
        for (name, sink) in &self.sinks {
            sink.open().await.map_err(|err| {
                Error::MessageSink(format!("opening broker '{name}' failed: {err}"))
            })?;
        }
        Ok(())
    }

    pub async fn consume_message(
        &self,
        event: &Event,
        broker_name: &str,
        exchange: &str,
        routing_key: &str,
        properties: Option<&HashMap<String, String>>,
    ) -> Result<()> {
        let sink = self
            .sinks
            .get(broker_name)
            .ok_or_else(|| Error::MessageSink(format!("unknown broker '{broker_name}'")))?;

        sink.consume_message(event, exchange, routing_key, properties)
            .await
    }

    /// Closes every child, best-effort: every sink is asked to close even
    /// if an earlier one failed, and the first failure (if any) is
    /// returned after all have been attempted.
    pub async fn close(&self) -> Result<()> {
        let mut first_err = None;

        for (name, sink) in &self.sinks {
            if let Err(err) = sink.close().await {
                tracing::error!(broker = %name, error = %err, "error closing broker sink");
                first_err.get_or_insert(err);
            }
        }

        match first_err {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex as StdMutex;

    #[derive(Default)]
    struct FakeSink {
        published: StdMutex<Vec<(String, String)>>,
        opens: AtomicUsize,
        fail: bool,
    }

    #[async_trait]
    impl BrokerSink for FakeSink {
        async fn open(&self) -> Result<()> {
            self.opens.fetch_add(1, Ordering::Relaxed);
            Ok(())
        }

        async fn consume_message(
            &self,
            _event: &Event,
            exchange: &str,
            routing_key: &str,
            _properties: Option<&HashMap<String, String>>,
        ) -> Result<()> {
            if self.fail {
                return Err(Error::MessageSink("boom".into()));
            }
            self.published
                .lock()
                .unwrap()
                .push((exchange.to_string(), routing_key.to_string()));
            Ok(())
        }

        async fn close(&self) -> Result<()> {
            Ok(())
        }
    }

    fn event() -> Event {
        Event::new("/topic/x", 1, serde_json::json!({}))
    }

    #[tokio::test]
    async fn dispatches_by_broker_name() {
        let mut sinks: HashMap<String, Arc<dyn BrokerSink>> = HashMap::new();
        sinks.insert("b1".into(), Arc::new(FakeSink::default()));
        sinks.insert("b2".into(), Arc::new(FakeSink::default()));

        let multi = MultiSink::new(sinks);
        multi
            .consume_message(&event(), "b1", "e1", "k.a", None)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn unknown_broker_name_fails() {
        let multi = MultiSink::new(HashMap::new());
        let err = multi
            .consume_message(&event(), "missing", "e1", "k.a", None)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::MessageSink(_)));
    }

    #[tokio::test]
    async fn open_all_opens_every_sink() {
        let sink = Arc::new(FakeSink::default());
        let mut sinks: HashMap<String, Arc<dyn BrokerSink>> = HashMap::new();
        sinks.insert("b1".into(), sink.clone());

        let multi = MultiSink::new(sinks);
        multi.open_all().await.unwrap();
        assert_eq!(sink.opens.load(Ordering::Relaxed), 1);
    }
}
