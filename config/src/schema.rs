use serde::Deserialize;
use std::collections::HashMap;

/// Raw, as-parsed configuration document (§6). Every schema here rejects
/// unknown fields, mirroring the original's `StrictSchema` base class, and
/// carries the same field names and defaults as the Salesforce/AMQP wire
/// shapes it mirrors. [`crate::convert`] turns a validated document into
/// [`eventbridge_common`] domain types; nothing in this module talks to a
/// real source or sink.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AppConfigSchema {
    pub source: MessageSourceSchema,
    pub sink: MessageSinkSchema,
    pub router: MessageRouterSchema,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MessageSourceSchema {
    pub orgs: HashMap<String, SalesforceOrgSchema>,
    #[serde(default)]
    pub replay: Option<ReplaySchema>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SalesforceOrgSchema {
    pub consumer_key: String,
    pub consumer_secret: String,
    pub username: String,
    pub password: String,
    pub resources: Vec<StreamingResourceSchema>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StreamingResourceType {
    PushTopic,
    StreamingChannel,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StreamingResourceSchema {
    #[serde(rename = "type")]
    pub resource_type: StreamingResourceType,
    pub spec: serde_yaml::Value,
    /// Upstream durable-subscription hint. Carried for schema parity with
    /// the original; this bridge always subscribes through the replay
    /// extension and has no separate durable-subscription mode, so the
    /// value is accepted but not consulted.
    #[serde(default)]
    pub durable: bool,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct PushTopicSchema {
    #[serde(rename = "Id")]
    pub id: Option<String>,
    #[serde(rename = "Name")]
    pub name: Option<String>,
    #[serde(rename = "ApiVersion")]
    pub api_version: Option<f64>,
    #[serde(rename = "IsActive")]
    pub is_active: Option<bool>,
    #[serde(rename = "NotifyForFields")]
    pub notify_for_fields: Option<String>,
    #[serde(rename = "Description")]
    pub description: Option<String>,
    #[serde(rename = "NotifyForOperationCreate")]
    pub notify_for_operation_create: Option<bool>,
    #[serde(rename = "NotifyForOperationUpdate")]
    pub notify_for_operation_update: Option<bool>,
    #[serde(rename = "NotifyForOperationDelete")]
    pub notify_for_operation_delete: Option<bool>,
    #[serde(rename = "NotifyForOperationUndelete")]
    pub notify_for_operation_undelete: Option<bool>,
    #[serde(rename = "NotifyForOperations")]
    pub notify_for_operations: Option<String>,
    #[serde(rename = "Query")]
    pub query: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct StreamingChannelSchema {
    #[serde(rename = "Id")]
    pub id: Option<String>,
    #[serde(rename = "Name")]
    pub name: Option<String>,
    #[serde(rename = "Description")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ReplaySchema {
    pub address: String,
    #[serde(default)]
    pub key_prefix: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MessageSinkSchema {
    pub brokers: HashMap<String, AmqpBrokerSchema>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AmqpBrokerSchema {
    pub host: String,
    #[serde(default)]
    pub port: Option<u16>,
    #[serde(default = "default_login")]
    pub login: String,
    #[serde(default = "default_password")]
    pub password: String,
    #[serde(default = "default_virtualhost")]
    pub virtualhost: String,
    #[serde(default)]
    pub ssl: bool,
    #[serde(default = "default_true")]
    pub verify_ssl: bool,
    #[serde(default = "default_login_method")]
    pub login_method: String,
    #[serde(default)]
    pub insist: bool,
    pub exchanges: Vec<AmqpExchangeSchema>,
}

fn default_login() -> String {
    "guest".into()
}

fn default_password() -> String {
    "guest".into()
}

fn default_virtualhost() -> String {
    "/".into()
}

fn default_login_method() -> String {
    "AMQPLAIN".into()
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AmqpExchangeSchema {
    pub exchange_name: String,
    pub type_name: eventbridge_common::ExchangeType,
    #[serde(default)]
    pub passive: bool,
    #[serde(default)]
    pub durable: bool,
    #[serde(default)]
    pub auto_delete: bool,
    #[serde(default)]
    pub no_wait: bool,
    #[serde(default)]
    pub arguments: Option<HashMap<String, serde_json::Value>>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RouteSchema {
    pub broker_name: String,
    pub exchange_name: String,
    pub routing_key: String,
    #[serde(default)]
    pub properties: Option<HashMap<String, String>>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RoutingRuleSchema {
    pub condition: String,
    pub route: RouteSchema,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MessageRouterSchema {
    #[serde(default)]
    pub default_route: Option<RouteSchema>,
    #[serde(default)]
    pub rules: Vec<RoutingRuleSchema>,
}
