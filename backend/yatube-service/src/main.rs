use actix_web::{web, App, HttpServer};
use std::io;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use yatube_service::cache::{MemoryPageCache, PageCache, RedisPageCache};
use yatube_service::config::StorageBackend;
use yatube_service::db::{
    create_pool, run_migrations, BlogRepository, DbConfig, InMemoryBlogRepository,
    PgBlogRepository,
};
use yatube_service::middleware::SessionAuth;
use yatube_service::services::GroupService;
use yatube_service::{handlers, templates, AppState, Config};

fn io_error(context: &str, err: impl std::fmt::Display) -> io::Error {
    io::Error::new(io::ErrorKind::Other, format!("{}: {}", context, err))
}

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

/// `yatube-service healthcheck`: probe the local HTTP server
async fn healthcheck() -> io::Result<()> {
    let port = std::env::var("YATUBE_PORT").unwrap_or_else(|_| "8000".to_string());
    let url = format!("http://127.0.0.1:{}/health", port);
    match reqwest::Client::new().get(&url).send().await {
        Ok(resp) if resp.status().is_success() => Ok(()),
        Ok(resp) => {
            eprintln!("healthcheck HTTP status: {}", resp.status());
            Err(io::Error::new(io::ErrorKind::Other, "healthcheck failed"))
        }
        Err(e) => {
            eprintln!("healthcheck HTTP error: {}", e);
            Err(io::Error::new(io::ErrorKind::Other, "healthcheck error"))
        }
    }
}

async fn open_repository(config: &Config) -> io::Result<Arc<dyn BlogRepository>> {
    match config.database.backend {
        StorageBackend::Memory => {
            tracing::warn!("Using in-memory storage; data is lost on restart");
            Ok(Arc::new(InMemoryBlogRepository::new()))
        }
        StorageBackend::Postgres => {
            let db_cfg = DbConfig::new(
                config.database.url.clone(),
                config.database.max_connections,
            );
            db_cfg.log_config();

            let pool = create_pool(db_cfg)
                .await
                .map_err(|e| io_error("Failed to create database pool", e))?;
            run_migrations(&pool)
                .await
                .map_err(|e| io_error("Failed to run migrations", e))?;

            Ok(Arc::new(PgBlogRepository::new(pool)))
        }
    }
}

async fn open_page_cache(config: &Config) -> io::Result<Arc<dyn PageCache>> {
    let ttl = config.cache.index_ttl_secs;
    match &config.cache.redis_url {
        Some(url) => {
            let cache = RedisPageCache::connect(url, ttl)
                .await
                .map_err(|e| io_error("Failed to initialize Redis connection", e))?;
            tracing::info!(ttl_secs = ttl, "Page cache: redis");
            Ok(Arc::new(cache))
        }
        None => {
            tracing::info!(ttl_secs = ttl, "Page cache: in-process");
            Ok(Arc::new(MemoryPageCache::with_ttl_secs(ttl)))
        }
    }
}

/// `yatube-service create-group <title> <slug> [description]`
async fn create_group(repo: Arc<dyn BlogRepository>, args: &[String]) -> io::Result<()> {
    let (title, slug) = match args {
        [title, slug, ..] => (title, slug),
        _ => {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "usage: yatube-service create-group <title> <slug> [description]",
            ))
        }
    };
    let description = args.get(2).map(String::as_str).unwrap_or("");

    let group = GroupService::new(repo)
        .create(title, slug, description)
        .await
        .map_err(|e| io_error("Failed to create group", e))?;
    println!("created group {} (/group/{}/)", group.id, group.slug);
    Ok(())
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
            Err(e) => {
                tracing::warn!("Failed to install SIGTERM handler: {}", e);
                let _ = tokio::signal::ctrl_c().await;
            }
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}

/// Yatube Service
///
/// # Routes
///
/// - `/`, `/group/{slug}/`, `/profile/{username}/`, `/follow/` - listings
/// - `/posts/{id}/` and its `edit/`, `delete/`, `comment/` actions
/// - `/create/` - new post
/// - `/auth/*` - signup, login, logout
/// - `/media/*`, `/health`, `/health/ready`, `/metrics`
///
/// # Subcommands
///
/// - `healthcheck` - exit 0 if the local server answers `/health`
/// - `create-group <title> <slug> [description]`
#[actix_web::main]
async fn main() -> io::Result<()> {
    let args: Vec<String> = std::env::args().skip(1).collect();
    if args.first().map(String::as_str) == Some("healthcheck") {
        return healthcheck().await;
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

    tracing::info!("Starting yatube-service v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!("Environment: {}", config.app.env);

    let repo = open_repository(&config).await?;

    if args.first().map(String::as_str) == Some("create-group") {
        return create_group(repo, &args[1..]).await;
    }

    // surface template syntax errors before accepting traffic
    let mut probe = tera::Context::new();
    probe.insert("user", &Option::<()>::None);
    probe.insert("path", "/");
    templates::render("core/404.html", &probe).map_err(|e| io_error("Template error", e))?;

    let page_cache = open_page_cache(&config).await?;

    tokio::fs::create_dir_all(&config.media.root)
        .await
        .map_err(|e| io_error("Failed to create media root", e))?;

    let state = AppState::new(repo, page_cache, &config)
        .map_err(|e| io_error("Failed to build application state", e))?;
    let session_keys = state.session_keys.clone();
    let state = web::Data::new(state);

    let bind_address = format!("{}:{}", config.app.host, config.app.port);
    tracing::info!("Starting HTTP server at {}", bind_address);

    let server = HttpServer::new(move || {
        App::new()
            .app_data(state.clone())
            .wrap(SessionAuth::new(session_keys.clone()))
            .wrap(tracing_actix_web::TracingLogger::default())
            .configure(handlers::configure)
    })
    .bind(&bind_address)?
    .shutdown_timeout(30)
    .run();

    let server_handle = server.handle();
    let server_task = tokio::spawn(server);

    let shutdown = shutdown_signal();
    tokio::pin!(shutdown);

    tokio::select! {
        result = server_task => {
            match result {
                Ok(Ok(())) => tracing::info!("HTTP server stopped"),
                Ok(Err(e)) => {
                    tracing::error!("HTTP server error: {}", e);
                    return Err(e);
                }
                Err(e) => {
                    tracing::error!("HTTP server task failed: {}", e);
                    return Err(io_error("HTTP server task failed", e));
                }
            }
        }
        _ = &mut shutdown => {
            tracing::info!("Shutdown signal received");
            server_handle.stop(true).await;
        }
    }

    tracing::info!("yatube-service shut down");
    Ok(())
}
