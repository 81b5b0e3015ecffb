use axum::Router;
use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use chrono::{DateTime, Local, TimeZone, Utc};
use migration::MigratorTrait;
use mockable::Clock;
use scheduler_server::task::{DatabaseTaskStore, TaskService};
use sea_orm::{ConnectOptions, Database, DatabaseConnection};
use serde::Serialize;
use std::sync::Arc;
use tower::ServiceExt;

/// Opens a fresh in-memory database with all migrations applied.
pub async fn setup_db() -> anyhow::Result<DatabaseConnection> {
    // Allow multiple calls to init for tests.
    let _ = tracing_subscriber::fmt().try_init();
    let mut options = ConnectOptions::new("sqlite::memory:");
    // Every pooled connection would otherwise see its own empty database.
    options
        .max_connections(1)
        .min_connections(1)
        .sqlx_logging(false);
    let db = Database::connect(options).await?;
    migration::Migrator::up(&db, None).await?;
    Ok(db)
}

/// Clock pinned to a single local instant.
pub struct FixedClock(DateTime<Local>);

impl FixedClock {
    pub fn at(year: i32, month: u32, day: u32, hour: u32, minute: u32) -> Self {
        let now = Local
            .with_ymd_and_hms(year, month, day, hour, minute, 0)
            .single()
            .expect("unambiguous local time");
        Self(now)
    }
}

impl Clock for FixedClock {
    fn local(&self) -> DateTime<Local> {
        self.0
    }

    fn utc(&self) -> DateTime<Utc> {
        self.0.with_timezone(&Utc)
    }
}

/// Task service over `db` whose "now" is 2024-03-15 10:30 local time.
pub fn service_at_fixed_time(db: DatabaseConnection) -> TaskService {
    TaskService::new(
        Arc::new(DatabaseTaskStore::new(db)),
        Arc::new(FixedClock::at(2024, 3, 15, 10, 30)),
    )
}

/// JSON response snapshot for testing endpoints.
#[derive(Debug, Serialize)]
pub struct JsonResponseSnapshot {
    pub test_context: String,
    pub status: u16,
    pub body: serde_json::Value,
}

impl JsonResponseSnapshot {
    pub fn new(test_context: &str, status: StatusCode, body: &str) -> Self {
        Self {
            test_context: test_context.to_string(),
            status: status.as_u16(),
            body: serde_json::from_str(body).expect("response body is JSON"),
        }
    }
}

/// Sends a request through `app` and returns the status, content type and body.
pub async fn send(
    app: &Router,
    method: Method,
    uri: &str,
    json_body: Option<serde_json::Value>,
) -> (StatusCode, String, String) {
    let request = Request::builder().method(method).uri(uri);
    let request = match json_body {
        Some(json) => request
            .header("content-type", "application/json")
            .body(Body::from(json.to_string())),
        None => request.body(Body::empty()),
    }
    .unwrap();

    let response = app.clone().oneshot(request).await.unwrap();

    let status = response.status();
    let content_type = response
        .headers()
        .get("content-type")
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default()
        .to_string();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body_text = String::from_utf8(body.to_vec()).unwrap();
    (status, content_type, body_text)
}
