//! Configuración de cache
//!
//! Este módulo contiene la configuración del cache de distancias.

use serde::{Deserialize, Serialize};

/// Configuración del cache
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    pub redis_url: String,
    pub default_ttl: u64,
    pub key_prefix: String,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            redis_url: "redis://localhost:6379".to_string(),
            default_ttl: 86_400, // 1 día
            key_prefix: "freight_logistics".to_string(),
        }
    }
}
