pub mod memory;
pub mod redis_store;
pub mod store;

pub use memory::InMemoryReplayStore;
pub use redis_store::RedisReplayStore;
pub use store::ReplayMarkerStore;
