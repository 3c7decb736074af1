use async_trait::async_trait;
use eventbridge_common::{Event, Result};
use std::collections::HashMap;

/// Per-broker publisher (§4.4). Owns one connection and one publishing
/// channel; `&self` rather than `&mut self` because sinks are shared across
/// concurrent forwarding tasks (§5) — implementations serialize access to
/// the channel internally rather than pushing that onto callers.
#[async_trait]
pub trait BrokerSink: Send + Sync {
    /// Connects, opens a confirm-mode publishing channel, and declares every
    /// configured exchange. Idempotent: calling `open` again after a
    /// successful open is a no-op.
    async fn open(&self) -> Result<()>;

    /// Publishes `event` (serialized as JSON) on `exchange` with
    /// `routing_key`. `properties`, if present, is attached as broker
    /// message properties. Resolves only after the broker has confirmed
    /// acceptance at the publishing-channel level; fails with
    /// [`eventbridge_common::Error::MessageSink`] on publish or connection
    /// failure.
    async fn consume_message(
        &self,
        event: &Event,
        exchange: &str,
        routing_key: &str,
        properties: Option<&HashMap<String, String>>,
    ) -> Result<()>;

    /// Closes the channel and connection. Idempotent.
    async fn close(&self) -> Result<()>;
}
