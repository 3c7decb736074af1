use crate::broker_sink::BrokerSink;
use async_trait::async_trait;
use eventbridge_common::{BrokerSpec, Error, Event, ExchangeType, Result};
use lapin::options::{BasicPublishOptions, ConfirmSelectOptions, ExchangeDeclareOptions};
use lapin::publisher_confirm::Confirmation;
use lapin::types::{AMQPValue, FieldTable, LongString};
use lapin::{BasicProperties, Channel, Connection, ConnectionProperties, ExchangeKind};
use std::collections::HashMap;
use tokio::sync::Mutex;

/// `lapin`-backed [`BrokerSink`] against an AMQP 0-9-1 broker. One confirm
/// mode channel per sink; publishes are serialized behind a mutex (§5:
/// "the underlying broker publishing channel MUST be serialized").
pub struct AmqpBrokerSink {
    name: String,
    spec: BrokerSpec,
    state: Mutex<Option<State>>,
}

struct State {
    connection: Connection,
    channel: Channel,
}

impl AmqpBrokerSink {
    pub fn new(name: impl Into<String>, spec: BrokerSpec) -> Self {
        Self {
            name: name.into(),
            spec,
            state: Mutex::new(None),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

#[async_trait]
impl BrokerSink for AmqpBrokerSink {
    async fn open(&self) -> Result<()> {
        let mut guard = self.state.lock().await;
        if guard.is_some() {
            return Ok(());
        }

        let uri = self.spec.amqp_uri();
        let connection = Connection::connect(&uri, ConnectionProperties::default())
            .await
            .map_err(|err| Error::MessageSink(format!("connect to '{}' failed: {err}", self.name)))?;

        let channel = connection
            .create_channel()
            .await
            .map_err(|err| Error::MessageSink(format!("open channel on '{}' failed: {err}", self.name)))?;

        channel
            .confirm_select(ConfirmSelectOptions::default())
            .await
            .map_err(|err| {
                Error::MessageSink(format!("confirm_select on '{}' failed: {err}", self.name))
            })?;

        for exchange in &self.spec.exchanges {
            let kind = match exchange.exchange_type {
                ExchangeType::Fanout => ExchangeKind::Fanout,
                ExchangeType::Direct => ExchangeKind::Direct,
                ExchangeType::Topic => ExchangeKind::Topic,
                ExchangeType::Headers => ExchangeKind::Headers,
            };

            let options = ExchangeDeclareOptions {
                passive: exchange.passive,
                durable: exchange.durable,
                auto_delete: exchange.auto_delete,
                internal: false,
                nowait: exchange.no_wait,
            };

            let arguments = json_map_to_field_table(exchange.arguments.as_ref());

            channel
                .exchange_declare(&exchange.exchange_name, kind, options, arguments)
                .await
                .map_err(|err| {
                    Error::MessageSink(format!(
                        "exchange_declare '{}' on '{}' failed: {err}",
                        exchange.exchange_name, self.name
                    ))
                })?;
        }

        *guard = Some(State {
            connection,
            channel,
        });

        tracing::info!(broker = %self.name, exchanges = self.spec.exchanges.len(), "broker sink opened");
        Ok(())
    }

    async fn consume_message(
        &self,
        event: &Event,
        exchange: &str,
        routing_key: &str,
        properties: Option<&HashMap<String, String>>,
    ) -> Result<()> {
        let guard = self.state.lock().await;
        let state = guard
            .as_ref()
            .ok_or_else(|| Error::MessageSink(format!("broker sink '{}' is not open", self.name)))?;

        let body = serde_json::to_vec(&event.as_json())
            .map_err(|err| Error::MessageSink(format!("failed to serialize event: {err}")))?;

        let mut basic_properties = BasicProperties::default();
        if let Some(properties) = properties {
            basic_properties = basic_properties.with_headers(string_map_to_field_table(properties));
        }

        let confirm = state
            .channel
            .basic_publish(
                exchange,
                routing_key,
                BasicPublishOptions {
                    mandatory: false,
                    immediate: false,
                },
                &body,
                basic_properties,
            )
            .await
            .map_err(|err| {
                Error::MessageSink(format!(
                    "publish to '{}'/{exchange} failed: {err}",
                    self.name
                ))
            })?
            .await
            .map_err(|err| {
                Error::MessageSink(format!(
                    "publisher confirmation on '{}'/{exchange} failed: {err}",
                    self.name
                ))
            })?;

        match confirm {
            Confirmation::Ack(_) | Confirmation::NotRequested => Ok(()),
            Confirmation::Nack(_) => Err(Error::MessageSink(format!(
                "broker '{}' nacked publish to {exchange}",
                self.name
            ))),
        }
    }

    async fn close(&self) -> Result<()> {
        let mut guard = self.state.lock().await;
        let Some(state) = guard.take() else {
            return Ok(());
        };

        state
            .channel
            .close(0, "closing")
            .await
            .map_err(|err| Error::MessageSink(format!("closing channel on '{}' failed: {err}", self.name)))?;
        state
            .connection
            .close(0, "closing")
            .await
            .map_err(|err| {
                Error::MessageSink(format!("closing connection on '{}' failed: {err}", self.name))
            })?;

        Ok(())
    }
}

fn string_map_to_field_table(map: &HashMap<String, String>) -> FieldTable {
    let mut table = FieldTable::default();
    for (key, value) in map {
        table.insert(key.as_str().into(), AMQPValue::LongString(LongString::from(value.as_str())));
    }
    table
}

fn json_map_to_field_table(map: Option<&HashMap<String, serde_json::Value>>) -> FieldTable {
    let mut table = FieldTable::default();
    let Some(map) = map else {
        return table;
    };

    for (key, value) in map {
        let amqp_value = match value {
            serde_json::Value::String(s) => AMQPValue::LongString(LongString::from(s.as_str())),
            serde_json::Value::Bool(b) => AMQPValue::Boolean(*b),
            serde_json::Value::Number(n) if n.is_i64() => {
                AMQPValue::LongLongInt(n.as_i64().unwrap())
            }
            serde_json::Value::Number(n) => AMQPValue::LongString(LongString::from(n.to_string())),
            other => AMQPValue::LongString(LongString::from(other.to_string())),
        };
        table.insert(key.as_str().into(), amqp_value);
    }

    table
}
