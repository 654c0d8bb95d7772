use actix_cors::Cors;
use actix_web::{middleware, web, App, HttpServer};
use backhaul_finder::config::{LogFormat, Settings};
use backhaul_finder::core::Matcher;
use backhaul_finder::routes::{self, AppState};
use backhaul_finder::services::{CorridorCache, CorridorService, Geocoder, InMemoryLoadRepository, RouteClient};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

fn startup_error(what: &str, e: impl std::fmt::Display) -> std::io::Error {
    error!("Failed to initialize {}: {}", what, e);
    std::io::Error::new(std::io::ErrorKind::Other, format!("{} error: {}", what, e))
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // Load .env file if present
    dotenv::dotenv().ok();

    // Load configuration before logging so its [logging] section applies
    let settings = Settings::load().map_err(|e| {
        eprintln!("Configuration error: {}", e);
        std::io::Error::new(std::io::ErrorKind::Other, format!("configuration error: {}", e))
    })?;

    // Initialize logging, LOG_LEVEL / LOG_FORMAT win over the config file
    let log_level = std::env::var("LOG_LEVEL").unwrap_or_else(|_| settings.logging.level.clone());
    let log_format = std::env::var("LOG_FORMAT")
        .map(|format| LogFormat::parse(&format))
        .unwrap_or_else(|_| settings.logging.log_format());

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_new(&log_level).unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .with_level(true);

    match log_format {
        LogFormat::Json => subscriber.json().init(),
        LogFormat::Pretty => subscriber.pretty().init(),
        LogFormat::Compact => subscriber.compact().init(),
    }

    info!("Starting backhaul finder service...");
    info!("Configuration loaded successfully");

    let geocoder = Arc::new(
        Geocoder::new(settings.geocoder.to_client_config()).map_err(|e| startup_error("geocoder", e))?,
    );

    let routes_client = RouteClient::new(settings.routing.to_client_config())
        .map_err(|e| startup_error("route client", e))?;
    if !routes_client.is_configured() {
        info!("No routing key configured, corridors will use straight-line routes");
    }

    let corridor_ttl = Duration::from_secs(settings.corridor.cache_ttl_secs);
    let corridors = Arc::new(CorridorService::new(
        Arc::new(routes_client),
        Arc::new(CorridorCache::new(corridor_ttl)),
        settings.corridor.clip_to_land,
    ));

    info!(
        "Corridor service initialized (width: {} mi, clip to land: {}, TTL: {:?})",
        settings.corridor.width_miles, settings.corridor.clip_to_land, corridor_ttl
    );

    let loads = match &settings.loads.seed_file {
        Some(path) => InMemoryLoadRepository::from_json_file(path).map_err(|e| startup_error("load repository", e))?,
        None => InMemoryLoadRepository::new(),
    };

    info!("Load repository initialized with {} loads", loads.len());

    // Build application state
    let app_state = AppState {
        geocoder,
        corridors,
        loads: Arc::new(loads),
        matcher: Matcher::new(),
        settings: Arc::new(settings.clone()),
    };

    // Configure HTTP server
    let host = settings.server.host.clone();
    let port = settings.server.port;
    let workers = settings.server.workers.unwrap_or(4);

    info!("Starting HTTP server on {}:{}", host, port);

    HttpServer::new(move || {
        let cors = Cors::permissive();

        App::new()
            .app_data(web::Data::new(app_state.clone()))
            .app_data(web::JsonConfig::default().limit(8 * 1024 * 1024).error_handler(routes::handle_json_payload_error))
            .app_data(web::QueryConfig::default().error_handler(routes::handle_query_payload_error))
            .wrap(cors)
            .wrap(middleware::Logger::default())
            .wrap(middleware::Compress::default())
            .configure(routes::configure_routes)
    })
    .workers(workers)
    .bind((host, port))?
    .run()
    .await
}
