use crate::client::StreamingClient;
use async_trait::async_trait;
use eventbridge_common::{Error, ReplayFallback, ReplayId, Resource, Result, SourceMessagePair};
use eventbridge_replay::ReplayMarkerStore;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

/// The pull interface shared by [`MessageSource`] and
/// [`crate::multi_source::MultiSource`] (§4.2, §4.3).
#[async_trait]
pub trait Source: Send {
    async fn open(&mut self) -> Result<()>;
    async fn close(&mut self) -> Result<()>;
    fn closed(&self) -> bool;
    fn has_pending_messages(&self) -> bool;
    async fn get_message(&mut self) -> Result<SourceMessagePair>;
}

/// Binds a [`StreamingClient`] to a replay store, exposing the pull
/// interface for a single upstream source (§4.2).
pub struct MessageSource {
    name: String,
    client: Box<dyn StreamingClient>,
    replay_store: Arc<dyn ReplayMarkerStore>,
    resources: Vec<Resource>,
    replay_fallback: ReplayFallback,
    connection_timeout: Duration,
}

impl MessageSource {
    pub fn new(
        name: impl Into<String>,
        client: Box<dyn StreamingClient>,
        replay_store: Arc<dyn ReplayMarkerStore>,
        resources: Vec<Resource>,
        replay_fallback: ReplayFallback,
        connection_timeout: Duration,
    ) -> Self {
        Self {
            name: name.into(),
            client,
            replay_store,
            resources,
            replay_fallback,
            connection_timeout,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

#[async_trait]
impl Source for MessageSource {
    async fn open(&mut self) -> Result<()> {
        let mut replay_positions = HashMap::with_capacity(self.resources.len());

        for resource in &self.resources {
            let channel = resource.channel();
            let marker = self.replay_store.get(&self.name, &channel).await?;
            replay_positions.insert(channel, marker);
        }

        tracing::debug!(
            source = %self.name,
            resources = self.resources.len(),
            fallback = %self.replay_fallback,
            "opening message source"
        );

        tokio::time::timeout(
            self.connection_timeout,
            self.client.open(&self.resources, &replay_positions),
        )
        .await
        .map_err(|_| Error::SourceConnectionTimeout(self.connection_timeout))??;

        Ok(())
    }

    async fn close(&mut self) -> Result<()> {
        self.client.close().await
    }

    fn closed(&self) -> bool {
        self.client.closed()
    }

    fn has_pending_messages(&self) -> bool {
        self.client.has_pending_messages()
    }

    async fn get_message(&mut self) -> Result<SourceMessagePair> {
        let event = self.client.next_event().await?;
        Ok(SourceMessagePair {
            source_name: self.name.clone(),
            event,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockStreamingClient;
    use eventbridge_common::{Resource, ResourceRef};
    use eventbridge_replay::InMemoryReplayStore;

    fn source(resources: Vec<Resource>) -> MessageSource {
        MessageSource::new(
            "sfdc",
            Box::new(MockStreamingClient::empty()),
            Arc::new(InMemoryReplayStore::new()),
            resources,
            ReplayFallback::NewEvents,
            Duration::from_millis(50),
        )
    }

    #[tokio::test]
    async fn seeds_replay_positions_from_the_store_before_opening() {
        let store = Arc::new(InMemoryReplayStore::new());
        store.set("sfdc", "/topic/Accounts", 42).await.unwrap();

        let mut src = MessageSource::new(
            "sfdc",
            Box::new(MockStreamingClient::empty()),
            store,
            vec![Resource::Referenced(ResourceRef::Name(
                "/topic/Accounts".into(),
            ))],
            ReplayFallback::NewEvents,
            Duration::from_millis(50),
        );

        src.open().await.unwrap();
    }

    #[tokio::test]
    async fn connect_timeout_surfaces_as_source_connection_timeout() {
        struct NeverOpens;

        #[async_trait::async_trait]
        impl crate::client::StreamingClient for NeverOpens {
            async fn open(
                &mut self,
                _resources: &[Resource],
                _replay_positions: &std::collections::HashMap<String, Option<eventbridge_common::ReplayId>>,
            ) -> Result<()> {
                tokio::time::sleep(Duration::from_secs(60)).await;
                Ok(())
            }
            async fn close(&mut self) -> Result<()> {
                Ok(())
            }
            fn closed(&self) -> bool {
                true
            }
            fn has_pending_messages(&self) -> bool {
                false
            }
            async fn next_event(&mut self) -> Result<eventbridge_common::Event> {
                Err(Error::Cancelled)
            }
        }

        let mut src = MessageSource::new(
            "sfdc",
            Box::new(NeverOpens),
            Arc::new(InMemoryReplayStore::new()),
            Vec::new(),
            ReplayFallback::NewEvents,
            Duration::from_millis(20),
        );

        let err = src.open().await.unwrap_err();
        assert!(matches!(err, Error::SourceConnectionTimeout(_)));
    }

    #[tokio::test]
    async fn empty_source_opens_cleanly() {
        let mut src = source(Vec::new());
        src.open().await.unwrap();
        assert!(!src.closed());
    }
}
