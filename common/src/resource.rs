/// One of `{PushTopic, StreamingChannel}`: a subscription target on the
/// upstream platform. A resource is either *referenced* (identified by id
/// or name only, assumed to already exist upstream) or *declared* (fully
/// specified and created/ensured on source open) — §3.
#[derive(Debug, Clone, PartialEq)]
pub enum Resource {
    Referenced(ResourceRef),
    Declared(DeclaredResource),
}

impl Resource {
    /// The channel path this resource ultimately subscribes on, used to key
    /// replay markers and to seed the upstream subscription.
    pub fn channel(&self) -> String {
        match self {
            Resource::Referenced(ResourceRef::Id(id)) => id.clone(),
            Resource::Referenced(ResourceRef::Name(name)) => name.clone(),
            Resource::Declared(DeclaredResource::PushTopic(spec)) => {
                format!("/topic/{}", spec.name)
            }
            Resource::Declared(DeclaredResource::StreamingChannel(spec)) => spec.name.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ResourceRef {
    Id(String),
    Name(String),
}

#[derive(Debug, Clone, PartialEq)]
pub enum DeclaredResource {
    PushTopic(PushTopicSpec),
    StreamingChannel(StreamingChannelSpec),
}

/// Fields validated against
/// <https://developer.salesforce.com/docs/atlas.en-us.api_streaming.meta/api_streaming/pushtopic.htm>
/// (`ApiVersion` 20.0-42.0, `Query` 1..1300 chars, `NotifyForOperations` only
/// for `ApiVersion <= 28.0`, `NotifyForOperation{Create,...}` only for
/// `ApiVersion >= 29.0` — enforced by `eventbridge-config`, not here).
#[derive(Debug, Clone, PartialEq)]
pub struct PushTopicSpec {
    pub name: String,
    pub api_version: f64,
    pub query: String,
    pub is_active: bool,
    pub notify_for_fields: Option<String>,
    pub description: Option<String>,
    pub notify_for_operations: NotifyForOperations,
}

#[derive(Debug, Clone, PartialEq)]
pub enum NotifyForOperations {
    /// `NotifyForOperations`, only valid for `ApiVersion <= 28.0`.
    Legacy(String),
    /// `NotifyForOperation{Create,Update,Delete,Undelete}`, only valid for
    /// `ApiVersion >= 29.0`.
    PerOperation {
        create: bool,
        update: bool,
        delete: bool,
        undelete: bool,
    },
    Unspecified,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StreamingChannelSpec {
    pub name: String,
    pub description: Option<String>,
}

/// Credentials identifying a Salesforce-style connected app + user.
#[derive(Debug, Clone, PartialEq)]
pub struct OrgCredentials {
    pub consumer_key: String,
    pub consumer_secret: String,
    pub username: String,
    pub password: String,
}

/// `{ name, credentials, resource_specs[], replay_fallback }` — §3.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceDescriptor {
    pub name: String,
    pub credentials: OrgCredentials,
    pub resources: Vec<Resource>,
    pub replay_fallback: crate::ReplayFallback,
}
