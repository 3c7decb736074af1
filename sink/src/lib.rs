pub mod amqp;
pub mod broker_sink;
pub mod multi_sink;

pub use amqp::AmqpBrokerSink;
pub use broker_sink::BrokerSink;
pub use multi_sink::MultiSink;
