pub mod client;
pub mod cometd;
pub mod message_source;
pub mod multi_source;

#[cfg(any(test, feature = "test-util"))]
pub mod mock;

pub use client::StreamingClient;
pub use cometd::CometdStreamingClient;
pub use message_source::{MessageSource, Source};
pub use multi_source::MultiSource;

#[cfg(any(test, feature = "test-util"))]
pub use mock::MockStreamingClient;
