use crate::store::ReplayMarkerStore;
use async_trait::async_trait;
use eventbridge_common::{ReplayId, Result};
use std::collections::HashMap;
use std::sync::Mutex;

/// In-process replay marker store used when `source.replay` is absent from
/// configuration, and by the crate's own tests. Markers do not survive a
/// process restart.
#[derive(Debug, Default)]
pub struct InMemoryReplayStore {
    markers: Mutex<HashMap<(String, String), ReplayId>>,
}

impl InMemoryReplayStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn key(source: &str, channel: &str) -> (String, String) {
        (source.to_owned(), channel.to_owned())
    }
}

#[async_trait]
impl ReplayMarkerStore for InMemoryReplayStore {
    async fn get(&self, source: &str, channel: &str) -> Result<Option<ReplayId>> {
        let markers = self.markers.lock().expect("replay marker lock poisoned");
        Ok(markers.get(&Self::key(source, channel)).copied())
    }

    async fn set(&self, source: &str, channel: &str, replay_id: ReplayId) -> Result<()> {
        let mut markers = self.markers.lock().expect("replay marker lock poisoned");
        let key = Self::key(source, channel);
        match markers.get(&key) {
            Some(existing) if *existing >= replay_id => {
                tracing::debug!(
                    source,
                    channel,
                    existing,
                    attempted = replay_id,
                    "ignoring non-increasing replay marker write"
                );
            }
            _ => {
                markers.insert(key, replay_id);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn returns_none_when_unset() {
        let store = InMemoryReplayStore::new();
        assert_eq!(store.get("orgA", "/topic/x").await.unwrap(), None);
    }

    #[tokio::test]
    async fn commits_and_reads_back() {
        let store = InMemoryReplayStore::new();
        store.set("orgA", "/topic/x", 42).await.unwrap();
        assert_eq!(store.get("orgA", "/topic/x").await.unwrap(), Some(42));
    }

    #[tokio::test]
    async fn ignores_non_increasing_writes() {
        let store = InMemoryReplayStore::new();
        store.set("orgA", "/topic/x", 42).await.unwrap();
        store.set("orgA", "/topic/x", 10).await.unwrap();
        assert_eq!(store.get("orgA", "/topic/x").await.unwrap(), Some(42));
        store.set("orgA", "/topic/x", 42).await.unwrap();
        assert_eq!(store.get("orgA", "/topic/x").await.unwrap(), Some(42));
    }

    #[tokio::test]
    async fn keys_are_scoped_per_source_and_channel() {
        let store = InMemoryReplayStore::new();
        store.set("orgA", "/topic/x", 5).await.unwrap();
        store.set("orgB", "/topic/x", 9).await.unwrap();
        store.set("orgA", "/topic/y", 1).await.unwrap();
        assert_eq!(store.get("orgA", "/topic/x").await.unwrap(), Some(5));
        assert_eq!(store.get("orgB", "/topic/x").await.unwrap(), Some(9));
        assert_eq!(store.get("orgA", "/topic/y").await.unwrap(), Some(1));
    }
}
