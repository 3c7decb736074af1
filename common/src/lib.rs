pub mod broker;
pub mod error;
pub mod model;
pub mod resource;

pub use broker::{BrokerSpec, ExchangeSpec, ExchangeType};
pub use error::{Error, Result};
pub use model::{Event, ReplayFallback, ReplayId, Route, SourceMessagePair};
pub use resource::{
    DeclaredResource, NotifyForOperations, OrgCredentials, PushTopicSpec, Resource, ResourceRef,
    SourceDescriptor, StreamingChannelSpec,
};
