use async_trait::async_trait;
use eventbridge_common::{Event, ReplayId, Resource, Result};
use std::collections::HashMap;

/// Per-source subscription runtime. Narrow interface behind which the
/// concrete wire protocol of the upstream streaming platform lives (§9:
/// "duck-typed factories" / treat the client as a library behind a narrow
/// interface — out of scope for this crate's core contract).
#[async_trait]
pub trait StreamingClient: Send {
    /// Establishes the upstream session, ensures every declared resource
    /// exists (create-if-absent), and subscribes to all resource channels
    /// starting from the given per-channel replay positions (`None` means
    /// "no marker on record", handled by the caller's `replay_fallback`).
    async fn open(
        &mut self,
        resources: &[Resource],
        replay_positions: &HashMap<String, Option<ReplayId>>,
    ) -> Result<()>;

    /// Unsubscribes and tears down the session. Idempotent.
    async fn close(&mut self) -> Result<()>;

    /// True iff the client is not currently open.
    fn closed(&self) -> bool;

    /// True iff at least one buffered event is immediately available
    /// without suspending.
    fn has_pending_messages(&self) -> bool;

    /// Blocks cooperatively until an event is available or the client is
    /// closed. On closure while blocked, fails with [`eventbridge_common::Error::Cancelled`].
    async fn next_event(&mut self) -> Result<Event>;
}
