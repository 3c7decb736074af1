use async_trait::async_trait;
use eventbridge_common::{ReplayId, Result};

/// Durable mapping of `(source, channel) -> last committed replay id`.
///
/// Implementations are shared across every [`MessageSource`] and must be
/// safe under concurrent `get`/`set` (§5: "The ReplayMarkerStore is shared
/// across sources"). `set` is expected to be monotonic: a write with a
/// `replay_id` not strictly greater than the currently stored value MAY be
/// silently ignored rather than rejected, which is how this crate's
/// implementations satisfy the per-channel monotonicity invariant (P3)
/// without requiring callers to serialize writes per channel.
#[async_trait]
pub trait ReplayMarkerStore: Send + Sync {
    /// Returns the last persisted replay id for `(source, channel)`, or
    /// `None` if no marker has been committed yet.
    async fn get(&self, source: &str, channel: &str) -> Result<Option<ReplayId>>;

    /// Durably records `replay_id` for `(source, channel)`.
    async fn set(&self, source: &str, channel: &str, replay_id: ReplayId) -> Result<()>;
}
