use actix_cors::Cors;
use actix_web::{web, App, HttpServer};
use crypto_core::jwt;
use post_service::cache::PostCache;
use post_service::config::StorageBackend;
use post_service::db::MIGRATOR;
use post_service::{handlers, AppState, Config};
use sqlx::postgres::PgPoolOptions;
use std::io;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info,actix_web=info,sqlx=warn".into());

    let json = std::env::var("LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }
}

fn init_jwt() -> io::Result<()> {
    let private_key = std::env::var("JWT_PRIVATE_KEY_PEM").ok();
    let public_key = std::env::var("JWT_PUBLIC_KEY_PEM").ok();

    let result = match (private_key, public_key) {
        (Some(private_key), Some(public_key)) => {
            jwt::initialize_jwt_keys(&private_key, &public_key)
        }
        (None, Some(public_key)) => {
            tracing::warn!("JWT_PRIVATE_KEY_PEM not set; register and login will fail");
            jwt::initialize_jwt_validation_only(&public_key)
        }
        _ => {
            return Err(io::Error::new(
                io::ErrorKind::Other,
                "JWT_PUBLIC_KEY_PEM must be set",
            ))
        }
    };

    result.map_err(|err| {
        io::Error::new(
            io::ErrorKind::Other,
            format!("Failed to initialize JWT keys: {err}"),
        )
    })
}

async fn build_state(config: &Config) -> io::Result<AppState> {
    let state = match config.storage.backend {
        StorageBackend::Memory => {
            tracing::warn!("Using in-memory storage; data is lost on restart");
            AppState::in_memory(&config.media.upload_dir)
        }
        StorageBackend::Postgres => {
            let pool = PgPoolOptions::new()
                .max_connections(config.database.max_connections)
                .min_connections(config.database.min_connections)
                .acquire_timeout(Duration::from_secs(10))
                .connect(&config.database.url)
                .await
                .map_err(|e| {
                    io::Error::new(
                        io::ErrorKind::Other,
                        format!("Failed to connect to database: {e}"),
                    )
                })?;
            tracing::info!("Connected to PostgreSQL");

            MIGRATOR.run(&pool).await.map_err(|e| {
                io::Error::new(io::ErrorKind::Other, format!("Migrations failed: {e}"))
            })?;
            tracing::info!("Database migrations applied");

            AppState::postgres(pool, &config.media.upload_dir)
        }
    };

    let state = match &config.cache {
        Some(cache_cfg) => match PostCache::connect(&cache_cfg.url, cache_cfg.post_ttl_secs).await {
            Ok(cache) => {
                tracing::info!("Post cache enabled (ttl {}s)", cache_cfg.post_ttl_secs);
                state.with_cache(cache)
            }
            Err(e) => {
                tracing::warn!("Redis unavailable, continuing without post cache: {}", e);
                state
            }
        },
        None => state,
    };

    tokio::fs::create_dir_all(&config.media.upload_dir).await?;
    Ok(state)
}

async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        match signal(SignalKind::terminate()) {
            Ok(mut terminate) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {},
                    _ = terminate.recv() => {},
                }
            }
            Err(err) => {
                tracing::warn!("Failed to install SIGTERM handler: {}", err);
                let _ = tokio::signal::ctrl_c().await;
            }
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}

/// Post Service
///
/// REST backend for posts, likes, saves, comments, the follower feed and
/// notifications.
///
/// # Routes
///
/// - `/api/users/*` - Register, login, profiles
/// - `/api/posts/*` - Posts, images, likes, saves, comments, feed
/// - `/api/followers/*` - Follow toggles and follow lists
/// - `/api/notifications/*` - Notification inbox
/// - `/api/health*`, `/metrics` - Probes and Prometheus metrics
#[actix_web::main]
async fn main() -> io::Result<()> {
    // Container healthcheck via CLI subcommand: `post-service healthcheck`
    {
        let mut args = std::env::args();
        let _bin = args.next();
        if let Some(cmd) = args.next() {
            if cmd == "healthcheck" {
                let port = std::env::var("POST_SERVICE_PORT").unwrap_or_else(|_| "8080".into());
                let url = format!("http://127.0.0.1:{}/api/health", port);
                match reqwest::Client::new().get(&url).send().await {
                    Ok(resp) if resp.status().is_success() => return Ok(()),
                    Ok(resp) => {
                        eprintln!("healthcheck HTTP status: {}", resp.status());
                        return Err(io::Error::new(io::ErrorKind::Other, "healthcheck failed"));
                    }
                    Err(e) => {
                        eprintln!("healthcheck HTTP error: {}", e);
                        return Err(io::Error::new(io::ErrorKind::Other, "healthcheck error"));
                    }
                }
            }
        }
    }

    let _ = dotenvy::dotenv();
    init_tracing();

    let config = match Config::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            tracing::error!("Configuration loading failed: {}", e);
            eprintln!("ERROR: Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };

    tracing::info!("Starting post-service v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!("Environment: {}", config.app.env);

    init_jwt()?;

    let state = web::Data::new(build_state(&config).await?);
    let bind_address = config.bind_address();
    let allowed_origins = config.cors.allowed_origins.clone();

    tracing::info!("Starting HTTP server at {}", bind_address);

    let server = HttpServer::new(move || {
        let mut cors = Cors::default();
        for origin in allowed_origins.split(',') {
            let origin = origin.trim();
            if origin == "*" {
                cors = cors.allow_any_origin();
            } else if !origin.is_empty() {
                cors = cors.allowed_origin(origin);
            }
        }
        cors = cors.allow_any_method().allow_any_header().max_age(3600);

        App::new()
            .app_data(state.clone())
            .wrap(cors)
            .wrap(tracing_actix_web::TracingLogger::default())
            .configure(handlers::configure)
    })
    .bind(&bind_address)?
    .shutdown_timeout(30)
    .run();

    let handle = server.handle();
    tokio::spawn(async move {
        shutdown_signal().await;
        tracing::info!("Shutdown signal received, stopping HTTP server");
        handle.stop(true).await;
    });

    server.await?;
    tracing::info!("post-service stopped");
    Ok(())
}
