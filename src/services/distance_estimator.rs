//! Estimador de distancias
//!
//! Consulta al proveedor de mapas y, si falla, resuelve con una tabla fija
//! de pares de ciudades o con un valor por defecto. Nunca devuelve error: el
//! modo degradado se registra en logs y métricas.

use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::cache::RedisClient;
use crate::clients::maps_client::normalize_place;
use crate::clients::MappingProvider;
use crate::metrics::MAPPING_FALLBACKS;
use crate::models::Coordinates;
use crate::utils::money::round2;

/// Distancia usada cuando el par no figura en la tabla
pub const DEFAULT_DISTANCE_KM: f64 = 700.0;

/// Velocidad promedio de un camión de carga
pub const AVERAGE_SPEED_KMH: f64 = 80.0;

const FALLBACK_TABLE: &[(&str, &str, f64)] = &[
    ("buenos aires", "mendoza", 1050.0),
    ("buenos aires", "cordoba", 700.0),
    ("buenos aires", "bariloche", 1650.0),
    ("buenos aires", "salta", 1590.0),
    ("buenos aires", "rosario", 300.0),
    ("cordoba", "mendoza", 550.0),
    ("rosario", "cordoba", 400.0),
    ("neuquen", "bariloche", 430.0),
];

/// Origen de una distancia estimada
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DistanceSource {
    Mapping,
    Cache,
    FallbackTable,
    Default,
}

impl DistanceSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            DistanceSource::Mapping => "mapping",
            DistanceSource::Cache => "cache",
            DistanceSource::FallbackTable => "fallback_table",
            DistanceSource::Default => "default",
        }
    }

    pub fn is_degraded(&self) -> bool {
        matches!(self, DistanceSource::FallbackTable | DistanceSource::Default)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DistanceEstimate {
    pub km: f64,
    pub source: DistanceSource,
}

#[derive(Clone)]
pub struct DistanceEstimator {
    mapping: Arc<dyn MappingProvider>,
    cache: Option<RedisClient>,
}

impl DistanceEstimator {
    pub fn new(mapping: Arc<dyn MappingProvider>, cache: Option<RedisClient>) -> Self {
        Self { mapping, cache }
    }

    /// Distancia en km entre dos direcciones
    pub async fn distance(&self, origin: &str, destination: &str) -> f64 {
        self.estimate(origin, destination).await.km
    }

    /// Distancia en km junto con su origen
    pub async fn estimate(&self, origin: &str, destination: &str) -> DistanceEstimate {
        let (from, to) = (normalize_place(origin), normalize_place(destination));

        if let Some(km) = self.cached(&from, &to).await {
            return DistanceEstimate {
                km,
                source: DistanceSource::Cache,
            };
        }

        match self.mapping.distance_km(origin, destination).await {
            Ok(km) => {
                self.store(&from, &to, km).await;
                DistanceEstimate {
                    km,
                    source: DistanceSource::Mapping,
                }
            }
            Err(e) => {
                warn!(
                    "🔄 Proveedor {} sin respuesta para {} → {}: {}. Usando distancias estimadas",
                    self.mapping.name(),
                    origin,
                    destination,
                    e
                );
                let estimate = fallback_distance(origin, destination);
                MAPPING_FALLBACKS.with_label_values(&[estimate.source.as_str()]).inc();
                if estimate.source == DistanceSource::Default {
                    warn!(
                        "⚠️ No hay distancia estimada para: {} → {}. Usando {}km por defecto",
                        origin, destination, DEFAULT_DISTANCE_KM
                    );
                } else {
                    info!("✅ Distancia estimada: {} km", estimate.km);
                }
                estimate
            }
        }
    }

    /// Coordenadas de una dirección; los errores del proveedor cuentan como "sin resultado"
    pub async fn geocode(&self, address: &str) -> Option<Coordinates> {
        match self.mapping.geocode(address).await {
            Ok(Some(coords)) if coords.is_valid() => Some(coords),
            Ok(_) => {
                warn!("⚠️ Sin coordenadas para: {}", address);
                None
            }
            Err(e) => {
                warn!("⚠️ Error de geocoding para {}: {}", address, e);
                None
            }
        }
    }

    async fn cached(&self, from: &str, to: &str) -> Option<f64> {
        let cache = self.cache.as_ref()?;
        let key = cache.distance_key(from, to);
        match cache.get::<f64>(&key).await {
            Ok(hit) => hit,
            Err(e) => {
                debug!("Cache de distancias ilegible para {}: {}", key, e);
                None
            }
        }
    }

    async fn store(&self, from: &str, to: &str, km: f64) {
        if let Some(cache) = &self.cache {
            let key = cache.distance_key(from, to);
            if let Err(e) = cache.set(&key, &km, cache.default_ttl()).await {
                warn!("⚠️ No se pudo cachear la distancia {}: {}", key, e);
            }
        }
    }
}

/// Tiempo estimado en horas a velocidad promedio, redondeado a 2 decimales
pub fn estimated_hours(distance_km: f64) -> f64 {
    round2(distance_km / AVERAGE_SPEED_KMH)
}

/// Distancia de la tabla fija (en ambos sentidos) o el valor por defecto
pub fn fallback_distance(origin: &str, destination: &str) -> DistanceEstimate {
    let (from, to) = (normalize_place(origin), normalize_place(destination));

    FALLBACK_TABLE
        .iter()
        .find(|(a, b, _)| (*a == from && *b == to) || (*a == to && *b == from))
        .map(|(_, _, km)| DistanceEstimate {
            km: *km,
            source: DistanceSource::FallbackTable,
        })
        .unwrap_or(DistanceEstimate {
            km: DEFAULT_DISTANCE_KM,
            source: DistanceSource::Default,
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clients::{ClientError, ClientResult, OfflineMapping};
    use async_trait::async_trait;

    struct FixedMapping(f64);

    #[async_trait]
    impl MappingProvider for FixedMapping {
        async fn distance_km(&self, _origin: &str, _destination: &str) -> ClientResult<f64> {
            Ok(self.0)
        }

        async fn geocode(&self, _address: &str) -> ClientResult<Option<Coordinates>> {
            Err(ClientError::Unavailable("down".to_string()))
        }

        fn name(&self) -> &'static str {
            "fixed"
        }
    }

    #[test]
    fn test_estimated_hours() {
        assert_eq!(estimated_hours(1050.0), 13.13);
        assert_eq!(estimated_hours(80.0), 1.0);
        assert_eq!(estimated_hours(0.0), 0.0);
    }

    #[test]
    fn test_fallback_table_is_symmetric_and_normalized() {
        assert_eq!(fallback_distance("Buenos Aires, Argentina", "Mendoza").km, 1050.0);
        assert_eq!(fallback_distance("MENDOZA", "buenos aires").km, 1050.0);
        assert_eq!(fallback_distance("Córdoba", "Rosario").km, 400.0);
        assert_eq!(fallback_distance("Neuquén", "Bariloche").source, DistanceSource::FallbackTable);
    }

    #[test]
    fn test_unknown_pair_uses_default() {
        let estimate = fallback_distance("Ushuaia", "La Quiaca");
        assert_eq!(estimate.km, DEFAULT_DISTANCE_KM);
        assert_eq!(estimate.source, DistanceSource::Default);
    }

    #[tokio::test]
    async fn test_mapping_answer_wins() {
        let estimator = DistanceEstimator::new(Arc::new(FixedMapping(987.65)), None);
        let estimate = estimator.estimate("Buenos Aires", "Mendoza").await;
        assert_eq!(estimate.km, 987.65);
        assert_eq!(estimate.source, DistanceSource::Mapping);
    }

    #[tokio::test]
    async fn test_mapping_failure_falls_back() {
        let estimator = DistanceEstimator::new(Arc::new(OfflineMapping), None);
        assert_eq!(estimator.distance("buenos aires", "MENDOZA, Argentina").await, 1050.0);
        assert_eq!(estimator.distance("Tandil", "Azul").await, 700.0);
    }

    #[tokio::test]
    async fn test_geocode_errors_become_none() {
        let estimator = DistanceEstimator::new(Arc::new(FixedMapping(1.0)), None);
        assert!(estimator.geocode("Mendoza").await.is_none());
    }
}
