//! Configuración de variables de entorno
//!
//! Este módulo maneja la configuración del entorno: servidor, almacenamiento,
//! colaboradores externos y tarifas del planificador.

use anyhow::{Context, Result};
use rust_decimal::Decimal;
use std::env;
use std::str::FromStr;

/// Backend de persistencia
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageBackend {
    Postgres,
    Memory,
}

impl FromStr for StorageBackend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "postgres" | "postgresql" => Ok(StorageBackend::Postgres),
            "memory" => Ok(StorageBackend::Memory),
            other => Err(anyhow::anyhow!("STORAGE_BACKEND desconocido: {}", other)),
        }
    }
}

/// Configuración del entorno
#[derive(Debug, Clone)]
pub struct EnvironmentConfig {
    pub environment: String,
    pub port: u16,
    pub host: String,
    pub cors_origins: Vec<String>,
    pub storage_backend: StorageBackend,
    pub redis_url: Option<String>,
    pub distance_cache_ttl: u64,
    pub google_maps_api_key: Option<String>,
    pub google_maps_base_url: String,
    pub request_registry_url: String,
    pub billing_url: String,
    pub http_timeout_secs: u64,
    pub planning_rate_per_km: Decimal,
    pub settlement_rate_per_km: Decimal,
    pub deposit_stop_hours: f64,
    pub outbox_poll_secs: u64,
    pub outbox_max_attempts: i32,
    pub log_level: String,
}

impl Default for EnvironmentConfig {
    /// Valores de desarrollo, sin leer el entorno
    fn default() -> Self {
        Self {
            environment: "development".to_string(),
            port: 8082,
            host: "0.0.0.0".to_string(),
            cors_origins: vec!["*".to_string()],
            storage_backend: StorageBackend::Memory,
            redis_url: None,
            distance_cache_ttl: 86_400,
            google_maps_api_key: None,
            google_maps_base_url: "https://maps.googleapis.com".to_string(),
            request_registry_url: "http://localhost:8081".to_string(),
            billing_url: "http://localhost:8083".to_string(),
            http_timeout_secs: 10,
            planning_rate_per_km: Decimal::from(150),
            settlement_rate_per_km: Decimal::from(10_000),
            deposit_stop_hours: 4.0,
            outbox_poll_secs: 15,
            outbox_max_attempts: 8,
            log_level: "debug".to_string(),
        }
    }
}

impl EnvironmentConfig {
    /// Leer la configuración desde variables de entorno
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();

        Ok(Self {
            environment: env::var("ENVIRONMENT").unwrap_or(defaults.environment),
            port: parse_var("PORT", defaults.port)?,
            host: env::var("HOST").unwrap_or(defaults.host),
            cors_origins: env::var("CORS_ORIGINS")
                .map(|origins| {
                    origins
                        .split(',')
                        .map(|s| s.trim().to_string())
                        .filter(|s| !s.is_empty())
                        .collect()
                })
                .unwrap_or(defaults.cors_origins),
            storage_backend: parse_var("STORAGE_BACKEND", StorageBackend::Postgres)?,
            redis_url: non_empty_var("REDIS_URL"),
            distance_cache_ttl: parse_var("DISTANCE_CACHE_TTL", defaults.distance_cache_ttl)?,
            google_maps_api_key: non_empty_var("GOOGLE_MAPS_API_KEY"),
            google_maps_base_url: env::var("GOOGLE_MAPS_BASE_URL")
                .unwrap_or(defaults.google_maps_base_url),
            request_registry_url: env::var("REQUEST_REGISTRY_URL")
                .unwrap_or(defaults.request_registry_url),
            billing_url: env::var("BILLING_URL").unwrap_or(defaults.billing_url),
            http_timeout_secs: parse_var("HTTP_TIMEOUT_SECS", defaults.http_timeout_secs)?,
            planning_rate_per_km: parse_var("PLANNING_RATE_PER_KM", defaults.planning_rate_per_km)?,
            settlement_rate_per_km: parse_var(
                "SETTLEMENT_RATE_PER_KM",
                defaults.settlement_rate_per_km,
            )?,
            deposit_stop_hours: parse_var("DEPOSIT_STOP_HOURS", defaults.deposit_stop_hours)?,
            outbox_poll_secs: parse_var("OUTBOX_POLL_SECS", defaults.outbox_poll_secs)?,
            outbox_max_attempts: parse_var("OUTBOX_MAX_ATTEMPTS", defaults.outbox_max_attempts)?,
            log_level: env::var("LOG_LEVEL").unwrap_or(defaults.log_level),
        })
    }

    /// Obtener la dirección del servidor
    pub fn server_url(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Nivel de log para tracing-subscriber
    pub fn tracing_level(&self) -> tracing::Level {
        tracing::Level::from_str(&self.log_level).unwrap_or(tracing::Level::DEBUG)
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn parse_var<T>(name: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match non_empty_var(name) {
        Some(raw) => raw
            .parse::<T>()
            .map_err(|e| anyhow::anyhow!("{}", e))
            .with_context(|| format!("{} tiene un valor inválido: {}", name, raw)),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_storage_backend_parsing() {
        assert_eq!("postgres".parse::<StorageBackend>().unwrap(), StorageBackend::Postgres);
        assert_eq!(" Memory ".parse::<StorageBackend>().unwrap(), StorageBackend::Memory);
        assert!("sqlite".parse::<StorageBackend>().is_err());
    }

    #[test]
    fn test_default_rates() {
        let config = EnvironmentConfig::default();
        assert_eq!(config.planning_rate_per_km, Decimal::from(150));
        assert_eq!(config.settlement_rate_per_km, Decimal::from(10_000));
        assert_eq!(config.outbox_max_attempts, 8);
        assert_eq!(config.tracing_level(), tracing::Level::DEBUG);
    }
}
