//! Cache
//!
//! Cache opcional en Redis para las distancias del proveedor de mapas.

pub mod cache_config;
pub mod redis_client;

pub use cache_config::CacheConfig;
pub use redis_client::RedisClient;
