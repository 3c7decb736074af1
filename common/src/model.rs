use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Monotonically increasing integer within a channel, as handed out by the
/// upstream streaming platform.
pub type ReplayId = i64;

/// An envelope produced by a source: a channel name plus an opaque,
/// recursively structured payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub channel: String,
    pub replay_id: ReplayId,
    pub payload: serde_json::Value,
}

impl Event {
    pub fn new(channel: impl Into<String>, replay_id: ReplayId, payload: serde_json::Value) -> Self {
        Self {
            channel: channel.into(),
            replay_id,
            payload,
        }
    }

    /// Builds the `data.event.replayId` / `data.payload` view the routing
    /// condition language and the AMQP publish body both operate on.
    pub fn as_json(&self) -> serde_json::Value {
        serde_json::json!({
            "channel": self.channel,
            "data": {
                "event": { "replayId": self.replay_id },
                "payload": self.payload,
            }
        })
    }
}

/// Pairs a source name with the event it produced. Tracked in the
/// orchestrator's in-flight set while a forward is outstanding.
#[derive(Debug, Clone)]
pub struct SourceMessagePair {
    pub source_name: String,
    pub event: Event,
}

/// Behavior when no replay marker is present for a channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReplayFallback {
    NewEvents,
    AllEvents,
}

impl fmt::Display for ReplayFallback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NewEvents => write!(f, "NEW_EVENTS"),
            Self::AllEvents => write!(f, "ALL_EVENTS"),
        }
    }
}

/// The 3-4 tuple describing where and how to publish a forwarded message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Route {
    pub broker_name: String,
    pub exchange_name: String,
    pub routing_key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub properties: Option<HashMap<String, String>>,
}
