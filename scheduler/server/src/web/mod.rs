use axum::Router;
use axum::http::Method;
use axum::routing::get;
use migration::MigratorTrait;
use mockable::DefaultClock;
use sea_orm::{Database, DatabaseConnection};
use std::path::Path;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::{ServeDir, ServeFile};
use tower_http::trace::TraceLayer;

use crate::config::Config;
use crate::task::api::v1::create_api_router;
use crate::task::{DatabaseTaskStore, TaskService, TaskState};

#[tracing::instrument(skip(config))]
pub async fn start_web_server(config: Config) -> anyhow::Result<()> {
    let server_address = format!("0.0.0.0:{}", &config.port);
    let listener = tokio::net::TcpListener::bind(&server_address).await?;
    tracing::info!("Web server running on http://{}", server_address);

    let db = Database::connect(&config.db_url).await?;
    migration::Migrator::up(&db, None).await?;
    tracing::info!("Database migrations applied successfully");

    let app = create_app(&config, db);
    axum::serve(listener, app).await?;
    Ok(())
}

/// Builds the full application router on top of an open, migrated database.
pub fn create_app(config: &Config, db: DatabaseConnection) -> Router {
    let store = Arc::new(DatabaseTaskStore::new(db));
    let task_state = Arc::new(TaskState {
        service: TaskService::new(store, Arc::new(DefaultClock)),
        list_limit: config.list_limit,
    });

    Router::new()
        .route("/health", get(health_check_handler))
        .merge(create_api_router(task_state))
        .merge(create_static_router(&config.web_dir))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(
                    CorsLayer::new()
                        .allow_origin(Any)
                        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
                        .allow_headers(Any),
                ),
        )
}

/// Serves the front end out of `web_dir`.
pub fn create_static_router(web_dir: &Path) -> Router {
    let index = web_dir.join("index.html");
    Router::new()
        .route_service("/", ServeFile::new(&index))
        .route_service("/index.html", ServeFile::new(&index))
        .route_service("/login.html", ServeFile::new(web_dir.join("login.html")))
        .route_service("/favicon.ico", ServeFile::new(web_dir.join("favicon.ico")))
        .nest_service("/js", ServeDir::new(web_dir.join("js")))
        .nest_service("/css", ServeDir::new(web_dir.join("css")))
}

#[tracing::instrument]
pub async fn health_check_handler() -> &'static str {
    "OK"
}
