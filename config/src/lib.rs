pub mod convert;
pub mod schema;
pub mod validate;

pub use convert::{AppConfig, ReplayConfig, RuleSpec};
pub use schema::AppConfigSchema;

use eventbridge_common::{Error, Result};
use std::path::Path;

/// Parses and validates a configuration document from a YAML string,
/// producing domain objects ready for the application's factories.
pub fn load_str(yaml: &str) -> Result<AppConfig> {
    let schema: AppConfigSchema =
        serde_yaml::from_str(yaml).map_err(|err| Error::Config(format!("malformed configuration: {err}")))?;
    convert::convert(schema)
}

/// Reads, parses and validates a configuration document from disk.
pub fn load_file(path: impl AsRef<Path>) -> Result<AppConfig> {
    let path = path.as_ref();
    let contents = std::fs::read_to_string(path).map_err(|err| {
        Error::Config(format!("failed to read configuration '{}': {err}", path.display()))
    })?;
    load_str(&contents)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_document() -> &'static str {
        r#"
source:
  orgs:
    orgA:
      consumer_key: key
      consumer_secret: secret
      username: user@example.com
      password: pw
      resources:
        - type: push_topic
          spec:
            Name: Accounts
        - type: push_topic
          spec:
            Name: Opportunities
            ApiVersion: 42.0
            Query: "SELECT Id FROM Opportunity"
sink:
  brokers:
    b1:
      host: broker.internal
      exchanges:
        - exchange_name: e1
          type_name: topic
router:
  default_route:
    broker_name: b1
    exchange_name: e1
    routing_key: k.default
  rules:
    - condition: "source == 'orgA'"
      route:
        broker_name: b1
        exchange_name: e1
        routing_key: k.a
"#
    }

    #[test]
    fn loads_a_complete_document() {
        let config = load_str(valid_document()).unwrap();
        assert_eq!(config.sources.len(), 1);
        assert_eq!(config.brokers.len(), 1);
        assert_eq!(config.rules.len(), 1);
        assert!(config.default_route.is_some());
    }

    #[test]
    fn rejects_unknown_top_level_fields() {
        let doc = format!("{}\nbogus: true\n", valid_document());
        assert!(load_str(&doc).is_err());
    }

    #[test]
    fn rejects_a_push_topic_missing_required_fields() {
        let doc = r#"
source:
  orgs:
    orgA:
      consumer_key: key
      consumer_secret: secret
      username: user@example.com
      password: pw
      resources:
        - type: push_topic
          spec:
            Query: "SELECT Id FROM Account"
sink:
  brokers:
    b1:
      host: broker.internal
      exchanges:
        - exchange_name: e1
          type_name: topic
router:
  default_route: null
  rules: []
"#;
        let err = load_str(doc).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn rejects_an_empty_broker_list() {
        let doc = r#"
source:
  orgs:
    orgA:
      consumer_key: key
      consumer_secret: secret
      username: user@example.com
      password: pw
      resources:
        - type: push_topic
          spec:
            Name: Accounts
sink:
  brokers: {}
router:
  default_route: null
  rules: []
"#;
        assert!(load_str(doc).is_err());
    }

    #[test]
    fn defaults_amqp_connection_parameters() {
        let config = load_str(valid_document()).unwrap();
        let broker = &config.brokers["b1"];
        assert_eq!(broker.port, 5672);
        assert_eq!(broker.login, "guest");
        assert_eq!(broker.virtualhost, "/");
    }
}
