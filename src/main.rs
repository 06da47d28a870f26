use anyhow::Result;
use dotenvy::dotenv;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tracing::{error, info, warn};

use freight_logistics::build_router;
use freight_logistics::cache::{CacheConfig, RedisClient};
use freight_logistics::clients::{
    build_http_client, GoogleMapsClient, HttpBillingClient, HttpRequestRegistry, MappingProvider, OfflineMapping,
};
use freight_logistics::config::{DatabaseConfig, EnvironmentConfig, StorageBackend};
use freight_logistics::database::DatabaseConnection;
use freight_logistics::repositories::InMemoryStore;
use freight_logistics::services::spawn_dispatcher;
use freight_logistics::state::{AppState, Collaborators, Repositories};

#[tokio::main]
async fn main() -> Result<()> {
    // Cargar variables de entorno
    dotenv().ok();
    let config = EnvironmentConfig::from_env()?;

    // Configurar logging
    tracing_subscriber::fmt()
        .with_max_level(config.tracing_level())
        .init();

    info!("🚛 Freight Logistics - Planificación de rutas y tramos");
    info!("=====================================================");
    info!("🌍 Entorno: {}", config.environment);

    // Persistencia
    let repos = match config.storage_backend {
        StorageBackend::Postgres => {
            let db_connection = match DatabaseConnection::new(&DatabaseConfig::from_env()?).await {
                Ok(conn) => conn,
                Err(e) => {
                    error!("❌ Error conectando a la base de datos: {}", e);
                    return Err(anyhow::anyhow!("Error de base de datos: {}", e));
                }
            };
            Repositories::postgres(db_connection.pool().clone())
        }
        StorageBackend::Memory => {
            warn!("⚠️ STORAGE_BACKEND=memory: los datos se pierden al reiniciar");
            Repositories::in_memory(Arc::new(InMemoryStore::seeded()))
        }
    };

    // Cache de distancias (opcional)
    let distance_cache = match &config.redis_url {
        Some(redis_url) => {
            let cache_config = CacheConfig {
                redis_url: redis_url.clone(),
                default_ttl: config.distance_cache_ttl,
                ..CacheConfig::default()
            };
            match RedisClient::new(cache_config).await {
                Ok(client) => {
                    info!("✅ Redis conectado exitosamente");
                    Some(client)
                }
                Err(e) => {
                    warn!("⚠️ Redis no disponible, sin cache de distancias: {}", e);
                    None
                }
            }
        }
        None => None,
    };

    // Colaboradores
    let http_client = build_http_client(config.http_timeout_secs)?;
    let mapping: Arc<dyn MappingProvider> = match &config.google_maps_api_key {
        Some(api_key) => Arc::new(GoogleMapsClient::new(
            http_client.clone(),
            config.google_maps_base_url.clone(),
            api_key.clone(),
        )),
        None => {
            warn!("⚠️ Sin GOOGLE_MAPS_API_KEY: distancias desde la tabla de respaldo");
            Arc::new(OfflineMapping)
        }
    };
    let collaborators = Collaborators {
        mapping,
        registry: Arc::new(HttpRequestRegistry::new(
            http_client.clone(),
            config.request_registry_url.clone(),
        )),
        billing: Arc::new(HttpBillingClient::new(http_client, config.billing_url.clone())),
        distance_cache,
    };

    let app_state = AppState::new(config.clone(), repos, collaborators);

    // Despachador del outbox
    let dispatcher = spawn_dispatcher(app_state.saga.clone(), Duration::from_secs(config.outbox_poll_secs));

    let app = build_router(app_state);
    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;

    info!("🌐 Servidor iniciando en {}", config.server_url());
    info!("🔍 Endpoints disponibles:");
    info!("   GET  /health - Health check");
    info!("   GET  /metrics - Métricas Prometheus");
    info!("🗺️ Rutas:");
    info!("   POST /api/routes/candidates - Calcular rutas tentativas");
    info!("   POST /api/routes/:id/assign - Asignar ruta a la solicitud");
    info!("   GET  /api/routes - Listar rutas");
    info!("   GET  /api/routes/:id - Obtener ruta");
    info!("   GET  /api/routes/request/:request_id - Rutas de una solicitud");
    info!("🚚 Tramos:");
    info!("   GET  /api/legs?requestId=&vehicleId=&driverId= - Listar tramos");
    info!("   GET  /api/legs/:id - Obtener tramo");
    info!("   POST /api/legs/:id/assign - Asignar vehículo y transportista");
    info!("   PATCH /api/legs/:id/start - Iniciar tramo");
    info!("   PATCH /api/legs/:id/finish - Finalizar tramo");
    info!("🏭 Flota:");
    info!("   GET  /api/vehicles - Listar vehículos");
    info!("   GET  /api/vehicles/available - Vehículos disponibles por capacidad");
    info!("   GET  /api/drivers - Listar transportistas");
    info!("   GET  /api/deposits - Listar depósitos");
    info!("📬 Saga:");
    info!("   GET  /api/saga/request/:request_id - Mensajes del outbox");
    info!("   POST /api/saga/dispatch - Ejecutar una pasada");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    if let Err(e) = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
    {
        error!("❌ Error del servidor: {}", e);
    }

    dispatcher.abort();
    info!("👋 Servidor terminado");
    Ok(())
}

/// Señal de apagado graceful
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("❌ No se pudo escuchar Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!("❌ No se pudo instalar el handler de SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("🛑 Señal Ctrl+C recibida, apagando servidor...");
        },
        _ = terminate => {
            info!("🛑 Señal de terminación recibida, apagando servidor...");
        },
    }
}
