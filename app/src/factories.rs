use eventbridge_common::{Error, Result, SourceDescriptor};
use eventbridge_config::AppConfig;
use eventbridge_replay::{InMemoryReplayStore, RedisReplayStore, ReplayMarkerStore};
use eventbridge_router::{Router, RoutingCondition, RoutingRule};
use eventbridge_sink::{AmqpBrokerSink, BrokerSink, MultiSink};
use eventbridge_source::{CometdStreamingClient, MessageSource, MultiSource, Source};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

/// Builds the shared replay marker store: Redis-backed if `source.replay` is
/// configured, otherwise an in-process store scoped to this run.
pub async fn create_replay_store(
    config: &AppConfig,
    ignore_network_errors: bool,
) -> Result<Arc<dyn ReplayMarkerStore>> {
    match &config.replay {
        Some(replay) => {
            let store = RedisReplayStore::connect(
                &replay.address,
                replay.key_prefix.clone(),
                ignore_network_errors,
            )
            .await?;
            Ok(Arc::new(store))
        }
        None => Ok(Arc::new(InMemoryReplayStore::new())),
    }
}

/// Builds one [`MessageSource`] per configured org, wrapping more than one
/// in a [`MultiSource`] fan-in, mirroring `create_message_source` grouping
/// single-org and multi-org configurations identically at the call site.
pub fn create_source(
    sources: Vec<SourceDescriptor>,
    replay_store: Arc<dyn ReplayMarkerStore>,
    login_url: &str,
    api_version: &str,
    connection_timeout: Duration,
) -> Result<Box<dyn Source>> {
    if sources.is_empty() {
        return Err(Error::Config("at least one source org is required".into()));
    }

    let mut children: Vec<Box<dyn Source>> = Vec::with_capacity(sources.len());
    for descriptor in sources {
        let client = CometdStreamingClient::new(
            login_url.to_string(),
            api_version.to_string(),
            descriptor.credentials,
            descriptor.replay_fallback,
        );

        children.push(Box::new(MessageSource::new(
            descriptor.name,
            Box::new(client),
            replay_store.clone(),
            descriptor.resources,
            descriptor.replay_fallback,
            connection_timeout,
        )));
    }

    if children.len() == 1 {
        return Ok(children.into_iter().next().unwrap());
    }

    Ok(Box::new(MultiSource::new(children)))
}

/// Builds one [`AmqpBrokerSink`] per configured broker, grouped into a
/// [`MultiSink`].
pub fn create_sink(config: &AppConfig) -> MultiSink {
    let mut sinks: HashMap<String, Arc<dyn BrokerSink>> = HashMap::with_capacity(config.brokers.len());
    for (name, spec) in &config.brokers {
        sinks.insert(
            name.clone(),
            Arc::new(AmqpBrokerSink::new(name.clone(), spec.clone())),
        );
    }
    MultiSink::new(sinks)
}

/// Builds the router, compiling every rule's condition string once at
/// configure time (§5: conditions never suspend, compiling happens up
/// front).
pub fn create_router(config: &AppConfig) -> Result<Router> {
    let mut rules = Vec::with_capacity(config.rules.len());
    for rule in &config.rules {
        let condition = RoutingCondition::compile(rule.condition.clone())?;
        rules.push(RoutingRule::new(condition, rule.route.clone()));
    }
    Ok(Router::new(rules, config.default_route.clone()))
}
