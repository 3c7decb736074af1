use crate::schema::{
    AmqpBrokerSchema, AppConfigSchema, PushTopicSchema, RouteSchema, SalesforceOrgSchema,
    StreamingChannelSchema, StreamingResourceSchema, StreamingResourceType,
};
use crate::validate::{
    is_single_identifier_push_topic, is_single_identifier_streaming_channel, validate_broker,
    validate_push_topic, validate_route, validate_streaming_channel,
};
use eventbridge_common::{
    BrokerSpec, DeclaredResource, Error, ExchangeSpec, NotifyForOperations, OrgCredentials,
    PushTopicSpec, ReplayFallback, Resource, ResourceRef, Result, Route, SourceDescriptor,
    StreamingChannelSpec,
};
use std::collections::HashMap;

/// The fully validated, converted form of an [`AppConfigSchema`] document —
/// everything the orchestrator's factories need, expressed entirely in
/// [`eventbridge_common`] domain types. Condition strings are left
/// uncompiled (`RuleSpec::condition`); compiling them into an `Expr` is
/// `eventbridge-router`'s job, kept out of this crate's dependency graph.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub sources: Vec<SourceDescriptor>,
    pub replay: Option<ReplayConfig>,
    pub brokers: HashMap<String, BrokerSpec>,
    pub default_route: Option<Route>,
    pub rules: Vec<RuleSpec>,
}

#[derive(Debug, Clone)]
pub struct ReplayConfig {
    pub address: String,
    pub key_prefix: Option<String>,
}

#[derive(Debug, Clone)]
pub struct RuleSpec {
    pub condition: String,
    pub route: Route,
}

pub fn convert(schema: AppConfigSchema) -> Result<AppConfig> {
    if schema.source.orgs.is_empty() {
        return Err(Error::Config("source.orgs must not be empty".into()));
    }
    if schema.sink.brokers.is_empty() {
        return Err(Error::Config("sink.brokers must not be empty".into()));
    }

    let replay = schema.source.replay.map(|r| ReplayConfig {
        address: r.address,
        key_prefix: r.key_prefix,
    });
    // A durable store can lose markers it never wrote to (a channel added
    // after the store already existed); replaying everything is the safe
    // default. A purely in-memory run is always starting fresh, so there is
    // nothing to fall back past the tip of the stream.
    let replay_fallback = if replay.is_some() {
        ReplayFallback::AllEvents
    } else {
        ReplayFallback::NewEvents
    };

    let mut sources = Vec::with_capacity(schema.source.orgs.len());
    for (name, org) in schema.source.orgs {
        sources.push(convert_org(name, org, replay_fallback)?);
    }

    let mut brokers = HashMap::with_capacity(schema.sink.brokers.len());
    for (name, broker) in schema.sink.brokers {
        brokers.insert(name, convert_broker(broker)?);
    }

    let default_route = schema
        .router
        .default_route
        .map(convert_route)
        .transpose()?;
    let rules = schema
        .router
        .rules
        .into_iter()
        .map(|rule| {
            Ok(RuleSpec {
                condition: rule.condition,
                route: convert_route(rule.route)?,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(AppConfig {
        sources,
        replay,
        brokers,
        default_route,
        rules,
    })
}

fn convert_org(
    name: String,
    org: SalesforceOrgSchema,
    replay_fallback: ReplayFallback,
) -> Result<SourceDescriptor> {
    if org.resources.is_empty() {
        return Err(Error::Config(format!(
            "source org '{name}' must declare at least one resource"
        )));
    }

    let resources = org
        .resources
        .into_iter()
        .map(convert_resource)
        .collect::<Result<Vec<_>>>()?;

    Ok(SourceDescriptor {
        name,
        credentials: OrgCredentials {
            consumer_key: org.consumer_key,
            consumer_secret: org.consumer_secret,
            username: org.username,
            password: org.password,
        },
        resources,
        replay_fallback,
    })
}

fn convert_resource(schema: StreamingResourceSchema) -> Result<Resource> {
    match schema.resource_type {
        StreamingResourceType::PushTopic => {
            let spec: PushTopicSchema = serde_yaml::from_value(schema.spec)
                .map_err(|err| Error::Config(format!("invalid PushTopic resource: {err}")))?;
            validate_push_topic(&spec)?;
            Ok(convert_push_topic(spec))
        }
        StreamingResourceType::StreamingChannel => {
            let spec: StreamingChannelSchema = serde_yaml::from_value(schema.spec)
                .map_err(|err| Error::Config(format!("invalid StreamingChannel resource: {err}")))?;
            validate_streaming_channel(&spec)?;
            Ok(convert_streaming_channel(spec))
        }
    }
}

fn convert_push_topic(spec: PushTopicSchema) -> Resource {
    if is_single_identifier_push_topic(&spec) {
        return Resource::Referenced(match spec.id {
            Some(id) => ResourceRef::Id(id),
            None => ResourceRef::Name(spec.name.expect("single-identifier push topic")),
        });
    }

    let notify_for_operations = if spec.notify_for_operations.is_some() {
        NotifyForOperations::Legacy(spec.notify_for_operations.unwrap())
    } else if spec.notify_for_operation_create.is_some()
        || spec.notify_for_operation_update.is_some()
        || spec.notify_for_operation_delete.is_some()
        || spec.notify_for_operation_undelete.is_some()
    {
        NotifyForOperations::PerOperation {
            create: spec.notify_for_operation_create.unwrap_or(true),
            update: spec.notify_for_operation_update.unwrap_or(true),
            delete: spec.notify_for_operation_delete.unwrap_or(true),
            undelete: spec.notify_for_operation_undelete.unwrap_or(true),
        }
    } else {
        NotifyForOperations::Unspecified
    };

    Resource::Declared(DeclaredResource::PushTopic(PushTopicSpec {
        name: spec.name.expect("validated full push topic definition"),
        api_version: spec.api_version.expect("validated full push topic definition"),
        query: spec.query.expect("validated full push topic definition"),
        is_active: spec.is_active.unwrap_or(true),
        notify_for_fields: spec.notify_for_fields,
        description: spec.description,
        notify_for_operations,
    }))
}

fn convert_streaming_channel(spec: StreamingChannelSchema) -> Resource {
    if is_single_identifier_streaming_channel(&spec) {
        return Resource::Referenced(match spec.id {
            Some(id) => ResourceRef::Id(id),
            None => ResourceRef::Name(spec.name.expect("single-identifier streaming channel")),
        });
    }

    Resource::Declared(DeclaredResource::StreamingChannel(StreamingChannelSpec {
        name: spec.name.expect("validated full streaming channel definition"),
        description: spec.description,
    }))
}

fn convert_broker(schema: AmqpBrokerSchema) -> Result<BrokerSpec> {
    validate_broker(&schema)?;

    let port = schema.port.unwrap_or(if schema.ssl { 5671 } else { 5672 });

    let exchanges = schema
        .exchanges
        .into_iter()
        .map(|e| ExchangeSpec {
            exchange_name: e.exchange_name,
            exchange_type: e.type_name,
            passive: e.passive,
            durable: e.durable,
            auto_delete: e.auto_delete,
            no_wait: e.no_wait,
            arguments: e.arguments,
        })
        .collect();

    Ok(BrokerSpec {
        host: schema.host,
        port,
        login: schema.login,
        password: schema.password,
        virtualhost: schema.virtualhost,
        ssl: schema.ssl,
        verify_ssl: schema.verify_ssl,
        login_method: schema.login_method,
        insist: schema.insist,
        exchanges,
    })
}

fn convert_route(schema: RouteSchema) -> Result<Route> {
    validate_route(&schema)?;
    Ok(Route {
        broker_name: schema.broker_name,
        exchange_name: schema.exchange_name,
        routing_key: schema.routing_key,
        properties: schema.properties,
    })
}
