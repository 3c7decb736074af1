use crate::client::StreamingClient;
use async_trait::async_trait;
use eventbridge_common::{Error, Event, ReplayId, Resource, Result};
use std::collections::{HashMap, VecDeque};

/// A scripted [`StreamingClient`] for tests: `open` records the replay
/// positions it was handed so assertions can inspect them, `next_event`
/// drains a fixed queue, and a closed flag can be flipped mid-test to
/// exercise shutdown paths without a real upstream.
pub struct MockStreamingClient {
    events: VecDeque<Result<Event>>,
    opened_with: Option<HashMap<String, Option<ReplayId>>>,
    closed: bool,
    fail_open: Option<String>,
}

impl MockStreamingClient {
    pub fn new(events: Vec<Event>) -> Self {
        Self {
            events: events.into_iter().map(Ok).collect(),
            opened_with: None,
            closed: true,
            fail_open: None,
        }
    }

    pub fn empty() -> Self {
        Self::new(Vec::new())
    }

    pub fn failing_to_open(reason: impl Into<String>) -> Self {
        Self {
            events: VecDeque::new(),
            opened_with: None,
            closed: true,
            fail_open: Some(reason.into()),
        }
    }

    pub fn push_error(&mut self, err: Error) {
        self.events.push_back(Err(err));
    }

    pub fn replay_positions(&self) -> Option<&HashMap<String, Option<ReplayId>>> {
        self.opened_with.as_ref()
    }
}

#[async_trait]
impl StreamingClient for MockStreamingClient {
    async fn open(
        &mut self,
        _resources: &[Resource],
        replay_positions: &HashMap<String, Option<ReplayId>>,
    ) -> Result<()> {
        if let Some(reason) = &self.fail_open {
            return Err(Error::Source(reason.clone()));
        }

        self.opened_with = Some(replay_positions.clone());
        self.closed = false;
        Ok(())
    }

    async fn close(&mut self) -> Result<()> {
        self.closed = true;
        Ok(())
    }

    fn closed(&self) -> bool {
        self.closed
    }

    fn has_pending_messages(&self) -> bool {
        !self.events.is_empty()
    }

    async fn next_event(&mut self) -> Result<Event> {
        if self.closed {
            return Err(Error::Cancelled);
        }

        self.events.pop_front().unwrap_or(Err(Error::Cancelled))
    }
}
