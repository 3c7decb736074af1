use crate::schema::{AmqpBrokerSchema, PushTopicSchema, RouteSchema, StreamingChannelSchema};
use eventbridge_common::{Error, Result};

const NOTIFY_FOR_FIELDS_VALUES: &[&str] = &["All", "Referenced", "Select", "Where"];
const NOTIFY_FOR_OPERATIONS_VALUES: &[&str] = &["All", "Create", "Extended", "Update"];

/// Mirrors `PushTopicSchema.check_required_fields` / `check_api_version`: a
/// resource is either a single identifier (`Id` or `Name` alone) or a full
/// definition with at least `Name`, `ApiVersion` and `Query`; `ApiVersion`
/// gates which notification fields are legal.
pub fn validate_push_topic(spec: &PushTopicSchema) -> Result<()> {
    if is_single_identifier_push_topic(spec) {
        return Ok(());
    }

    if spec.name.is_none() || spec.api_version.is_none() || spec.query.is_none() {
        return Err(Error::Config(
            "PushTopic resource must be a single identifier ('Id' or 'Name') or a full \
             definition with at least 'Name', 'ApiVersion' and 'Query'"
                .into(),
        ));
    }

    if let Some(name) = &spec.name {
        if name.is_empty() || name.chars().count() > 25 {
            return Err(Error::Config(
                "PushTopic 'Name' must be 1-25 characters".into(),
            ));
        }
    }

    if let Some(query) = &spec.query {
        if query.is_empty() || query.chars().count() > 1300 {
            return Err(Error::Config(
                "PushTopic 'Query' must be 1-1300 characters".into(),
            ));
        }
    }

    if let Some(description) = &spec.description {
        if description.chars().count() > 400 {
            return Err(Error::Config(
                "PushTopic 'Description' must be at most 400 characters".into(),
            ));
        }
    }

    if let Some(api_version) = spec.api_version {
        if !(20.0..=42.0).contains(&api_version) {
            return Err(Error::Config(
                "PushTopic 'ApiVersion' must be between 20.0 and 42.0".into(),
            ));
        }
    }

    if let Some(value) = &spec.notify_for_fields {
        if !NOTIFY_FOR_FIELDS_VALUES.contains(&value.as_str()) {
            return Err(Error::Config(format!(
                "PushTopic 'NotifyForFields' must be one of {NOTIFY_FOR_FIELDS_VALUES:?}"
            )));
        }
    }

    if let Some(value) = &spec.notify_for_operations {
        if !NOTIFY_FOR_OPERATIONS_VALUES.contains(&value.as_str()) {
            return Err(Error::Config(format!(
                "PushTopic 'NotifyForOperations' must be one of {NOTIFY_FOR_OPERATIONS_VALUES:?}"
            )));
        }
    }

    validate_api_version_gate(spec)
}

fn validate_api_version_gate(spec: &PushTopicSchema) -> Result<()> {
    let Some(api_version) = spec.api_version else {
        return Ok(());
    };

    if api_version >= 29.0 && spec.notify_for_operations.is_some() {
        return Err(Error::Config(
            "'NotifyForOperations' can only be specified for API version 28.0 and earlier".into(),
        ));
    }

    let has_per_operation_field = spec.notify_for_operation_create.is_some()
        || spec.notify_for_operation_update.is_some()
        || spec.notify_for_operation_delete.is_some()
        || spec.notify_for_operation_undelete.is_some();

    if api_version <= 28.0 && has_per_operation_field {
        return Err(Error::Config(
            "'NotifyForOperationCreate', 'NotifyForOperationUpdate', \
             'NotifyForOperationDelete' and 'NotifyForOperationUndelete' can only be \
             specified for API version 29.0 and later"
                .into(),
        ));
    }

    Ok(())
}

pub(crate) fn is_single_identifier_push_topic(spec: &PushTopicSchema) -> bool {
    let only_id = spec.id.is_some() && spec.name.is_none();
    let only_name = spec.name.is_some() && spec.id.is_none();
    (only_id || only_name)
        && spec.api_version.is_none()
        && spec.is_active.is_none()
        && spec.notify_for_fields.is_none()
        && spec.description.is_none()
        && spec.notify_for_operation_create.is_none()
        && spec.notify_for_operation_update.is_none()
        && spec.notify_for_operation_delete.is_none()
        && spec.notify_for_operation_undelete.is_none()
        && spec.notify_for_operations.is_none()
        && spec.query.is_none()
}

/// Mirrors `StreamingChannelSchema.check_required_fields`: a single
/// identifier, or a full definition (`Name` required, `Description`
/// optional); never neither.
pub fn validate_streaming_channel(spec: &StreamingChannelSchema) -> Result<()> {
    if is_single_identifier_streaming_channel(spec) {
        return Ok(());
    }

    if spec.name.is_none() && spec.id.is_none() && spec.description.is_none() {
        return Err(Error::Config(
            "StreamingChannel resource must specify at least an identifier or a 'Name'".into(),
        ));
    }

    if spec.name.is_none() {
        return Err(Error::Config(
            "StreamingChannel resource definition requires 'Name'".into(),
        ));
    }

    if let Some(name) = &spec.name {
        if name.is_empty() || name.chars().count() > 80 {
            return Err(Error::Config(
                "StreamingChannel 'Name' must be 1-80 characters".into(),
            ));
        }
    }

    if let Some(description) = &spec.description {
        if description.chars().count() > 255 {
            return Err(Error::Config(
                "StreamingChannel 'Description' must be at most 255 characters".into(),
            ));
        }
    }

    Ok(())
}

pub(crate) fn is_single_identifier_streaming_channel(spec: &StreamingChannelSchema) -> bool {
    let only_id = spec.id.is_some() && spec.name.is_none();
    let only_name = spec.name.is_some() && spec.id.is_none();
    (only_id || only_name) && spec.description.is_none()
}

/// `RouteSchema`: `broker_name`/`routing_key` non-empty (§3 "`routing_key`
/// non-empty").
pub fn validate_route(spec: &RouteSchema) -> Result<()> {
    if spec.broker_name.is_empty() {
        return Err(Error::Config("route 'broker_name' must not be empty".into()));
    }
    if spec.routing_key.is_empty() {
        return Err(Error::Config("route 'routing_key' must not be empty".into()));
    }
    Ok(())
}

/// `AmqpBrokerSchema`: `host` non-empty, at least one exchange declared.
pub fn validate_broker(spec: &AmqpBrokerSchema) -> Result<()> {
    if spec.host.is_empty() {
        return Err(Error::Config("broker 'host' must not be empty".into()));
    }
    if spec.exchanges.is_empty() {
        return Err(Error::Config(format!(
            "broker '{}' must declare at least one exchange",
            spec.host
        )));
    }
    for exchange in &spec.exchanges {
        if exchange.exchange_name.is_empty() {
            return Err(Error::Config(
                "exchange 'exchange_name' must not be empty".into(),
            ));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_a_bare_identifier() {
        let spec = PushTopicSchema {
            name: Some("Accounts".into()),
            ..Default::default()
        };
        validate_push_topic(&spec).unwrap();
    }

    #[test]
    fn rejects_a_partial_definition() {
        let spec = PushTopicSchema {
            name: Some("Accounts".into()),
            query: Some("SELECT Id FROM Account".into()),
            ..Default::default()
        };
        assert!(validate_push_topic(&spec).is_err());
    }

    #[test]
    fn accepts_a_full_definition() {
        let spec = PushTopicSchema {
            name: Some("Accounts".into()),
            api_version: Some(42.0),
            query: Some("SELECT Id FROM Account".into()),
            ..Default::default()
        };
        validate_push_topic(&spec).unwrap();
    }

    #[test]
    fn rejects_legacy_field_on_new_api_version() {
        let spec = PushTopicSchema {
            name: Some("Accounts".into()),
            api_version: Some(42.0),
            query: Some("SELECT Id FROM Account".into()),
            notify_for_operations: Some("All".into()),
            ..Default::default()
        };
        assert!(validate_push_topic(&spec).is_err());
    }

    #[test]
    fn rejects_per_operation_field_on_old_api_version() {
        let spec = PushTopicSchema {
            name: Some("Accounts".into()),
            api_version: Some(20.0),
            query: Some("SELECT Id FROM Account".into()),
            notify_for_operation_create: Some(true),
            ..Default::default()
        };
        assert!(validate_push_topic(&spec).is_err());
    }

    #[test]
    fn rejects_empty_spec() {
        assert!(validate_push_topic(&PushTopicSchema::default()).is_err());
        assert!(validate_streaming_channel(&StreamingChannelSchema::default()).is_err());
    }
}
