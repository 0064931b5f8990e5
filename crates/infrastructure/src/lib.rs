pub mod broker_factory;
pub mod channel_pool;
pub mod envelope;
pub mod in_memory_broker;
pub mod omdb_client;
pub mod rabbitmq_broker;

pub use broker_factory::BrokerFactory;
pub use envelope::{decode_envelope, default_origin, encode_envelope, TaskEnvelope, TaskHeaders};
pub use in_memory_broker::InMemoryBroker;
pub use omdb_client::OmdbClient;
pub use rabbitmq_broker::RabbitMqBroker;
