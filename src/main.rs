use anyhow::Result;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::signal;
use tokio::sync::watch;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use ambulance_dispatch::cache::{CacheConfig, CacheOperations, RedisClient};
use ambulance_dispatch::clients::HttpTravelTimeModel;
use ambulance_dispatch::config::{DatabaseConfig, EnvironmentConfig};
use ambulance_dispatch::database::DatabaseConnection;
use ambulance_dispatch::repositories::{
    InMemoryResourceDirectory, OutboxStore, PgResourceDirectory, ResourceDirectory,
};
use ambulance_dispatch::services::auth_service::{AuthServiceConfig, HttpTokenVerifier, TokenVerifier};
use ambulance_dispatch::services::event_notifier::{EventNotifier, LogEventNotifier, RedisEventNotifier};
use ambulance_dispatch::services::outbox_relay::{OutboxRelay, RelayConfig};
use ambulance_dispatch::services::travel_time_predictor::{PredictorConfig, TravelTimePredictor};
use ambulance_dispatch::utils::clock::{Clock, SystemClock};
use ambulance_dispatch::{create_api_router, AppState};

#[tokio::main]
async fn main() -> Result<()> {
    // Cargar variables de entorno
    dotenvy::dotenv().ok();

    // Configurar logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    info!("🚑 Servicio de Despacho de Ambulancias");
    info!("======================================");

    let config = EnvironmentConfig::from_env();
    let in_memory = std::env::args().any(|arg| arg == "--in-memory");
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);

    // Almacén de recursos
    let (directory, outbox): (Arc<dyn ResourceDirectory>, Arc<dyn OutboxStore>) =
        match (&config.database_url, in_memory) {
            (Some(url), false) => {
                let connection = DatabaseConnection::connect(&DatabaseConfig::new(url.clone()))
                    .await
                    .map_err(|e| {
                        error!("❌ Error conectando a la base de datos: {}", e);
                        e
                    })?;
                let store = Arc::new(PgResourceDirectory::new(connection.pool().clone()));
                (
                    store.clone() as Arc<dyn ResourceDirectory>,
                    store as Arc<dyn OutboxStore>,
                )
            }
            _ => {
                warn!("⚠️ Sin DATABASE_URL (o --in-memory): usando almacén en memoria");
                let store = Arc::new(InMemoryResourceDirectory::new());
                (
                    store.clone() as Arc<dyn ResourceDirectory>,
                    store as Arc<dyn OutboxStore>,
                )
            }
        };

    // Redis es opcional: cache del predictor y del verificador, canal de eventos
    let redis = match &config.redis_url {
        Some(url) => {
            let cache_config = CacheConfig {
                redis_url: url.clone(),
                ..CacheConfig::default()
            };
            match RedisClient::new(cache_config).await {
                Ok(client) => Some(client),
                Err(e) => {
                    warn!("⚠️ Redis no disponible, continuando sin cache: {}", e);
                    None
                }
            }
        }
        None => None,
    };
    let cache: Option<Arc<dyn CacheOperations>> = redis
        .clone()
        .map(|client| Arc::new(client) as Arc<dyn CacheOperations>);

    let notifier: Arc<dyn EventNotifier> = match &redis {
        Some(client) => Arc::new(RedisEventNotifier::new(client.clone(), config.event_channel.clone())),
        None => Arc::new(LogEventNotifier),
    };

    // Predictor de tiempos de viaje
    let model = Arc::new(HttpTravelTimeModel::new(config.ml_service_url.clone(), config.ml_timeout)?);
    let predictor = Arc::new(TravelTimePredictor::new(
        model,
        cache.clone(),
        clock.clone(),
        PredictorConfig {
            timeout: config.ml_timeout,
            cache_ttl_secs: config.ml_cache_ttl_secs,
            utc_offset_hours: config.local_utc_offset_hours,
        },
    ));
    info!("🤖 Modelo de tiempos de viaje: {}", config.ml_service_url);

    // Verificación de tokens
    let verifier: Option<Arc<dyn TokenVerifier>> = match &config.auth_service_url {
        Some(url) => {
            let verifier = HttpTokenVerifier::new(
                AuthServiceConfig {
                    base_url: url.clone(),
                    verify_endpoint: config.auth_verify_endpoint.clone(),
                    timeout: config.auth_timeout,
                    cache_ttl_secs: config.auth_cache_ttl_secs,
                },
                cache.clone(),
            )?;
            info!("🔐 Autenticación habilitada contra {}", url);
            Some(Arc::new(verifier) as Arc<dyn TokenVerifier>)
        }
        None => {
            warn!("⚠️ AUTH_SERVICE_URL no configurado: rutas sin autenticación");
            None
        }
    };

    // Relay del outbox
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let relay = OutboxRelay::new(
        outbox,
        notifier.clone(),
        Some(predictor.clone()),
        clock.clone(),
        RelayConfig {
            poll_interval: config.outbox_poll_interval,
            batch_size: config.outbox_batch_size,
            max_attempts: config.outbox_max_attempts,
            // en memoria el outbox viaja en cada copia transaccional
            delivered_retention: if in_memory || config.database_url.is_none() {
                std::time::Duration::ZERO
            } else {
                config.outbox_retention
            },
            ..RelayConfig::default()
        },
    );
    let relay_handle = tokio::spawn(relay.run(shutdown_rx));
    info!("📮 Relay de eventos iniciado (notificador: {})", notifier.name());

    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;
    let state = AppState::new(config, directory, predictor, clock, verifier, redis);
    let app = create_api_router(state);

    info!("🌐 Servidor iniciando en http://{}", addr);
    info!("🔍 Endpoints disponibles:");
    info!("   GET    /api/v1/health - Health check");
    info!("   GET    /api/v1/health/services - Estado de dependencias");
    info!("   GET    /api/v1/health/model - Evaluación del modelo ML");
    info!("   GET    /api/v1/vehicles - Listar ambulancias");
    info!("   GET    /api/v1/vehicles/nearest - Ambulancias por distancia");
    info!("   POST   /api/v1/vehicles/:id/location - Actualizar posición");
    info!("   PATCH  /api/v1/vehicles/:id/status - Cambiar estado");
    info!("   GET    /api/v1/crew - Listar personal");
    info!("   PATCH  /api/v1/crew/:id/status - Cambiar estado del personal");
    info!("   POST   /api/v1/dispatches - Crear despacho");
    info!("   GET    /api/v1/dispatches/:id - Detalle del despacho");
    info!("   POST   /api/v1/dispatches/:id/assign - Asignar despacho pendiente");
    info!("   GET    /api/v1/dispatches/:id/suggestion - Ambulancia sugerida por el modelo");
    info!("   PATCH  /api/v1/dispatches/:id/status - Avanzar estado");
    info!("   POST   /api/v1/dispatches/:id/tracking - Muestra GPS");
    info!("   GET    /api/v1/dispatches/statistics - Estadísticas");
    info!("   GET    /api/v1/availability - Disponibilidad");
    info!("   GET    /metrics - Métricas Prometheus");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    if let Err(e) = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
    {
        error!("❌ Error del servidor: {}", e);
    }

    // Detener el relay después del servidor
    let _ = shutdown_tx.send(true);
    if let Err(e) = relay_handle.await {
        error!("❌ El relay terminó con error: {}", e);
    }

    info!("👋 Servidor terminado");
    Ok(())
}

/// Señal de apagado graceful
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("❌ No se pudo instalar el handler de Ctrl+C: {}", e);
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
