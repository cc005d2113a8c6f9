//! Cache
//!
//! Este módulo contiene los sistemas de cache: Redis en producción y un
//! cache en memoria para pruebas y modo demo. Ambos implementan
//! `CacheOperations`, de modo que los servicios dependen del trait.

pub mod cache_config;
pub mod memory_cache;
pub mod redis_client;

pub use cache_config::{CacheConfig, CacheExt, CacheOperations};
pub use memory_cache::MemoryCache;
pub use redis_client::RedisClient;
