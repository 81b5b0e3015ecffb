use crate::nextdate::{self, NextDateError};
use crate::task::{Task, TaskDraft, TaskServiceError, TaskState};
use axum::{
    Router,
    extract::{Query, State, rejection::JsonRejection},
    http::{StatusCode, header},
    response::{IntoResponse, Json, Response},
    routing::{get, post},
};
use chrono::NaiveTime;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::{OpenApi, ToSchema};

/// JSON body for every API error.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    /// Human-readable description of the failure
    pub error: String,
}

impl ErrorResponse {
    pub fn new(error: String) -> Self {
        Self { error }
    }
}

/// JSON representation of a Task for API responses.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct TaskJson {
    /// Task ID, rendered as a string
    id: String,
    /// Next occurrence as YYYYMMDD
    date: String,
    title: String,
    comment: String,
    /// Repeat rule, `y` or `d N`, empty for one-off tasks
    repeat: String,
}

impl From<Task> for TaskJson {
    fn from(task: Task) -> Self {
        Self {
            id: task.id().to_string(),
            date: task.date().to_string(),
            title: task.title().to_string(),
            comment: task.comment().to_string(),
            repeat: task.repeat().to_string(),
        }
    }
}

/// API response for listing tasks.
#[derive(Debug, Serialize, ToSchema)]
pub struct TasksResponse {
    tasks: Vec<TaskJson>,
}

/// API response for a created task.
#[derive(Debug, Serialize, ToSchema)]
pub struct CreatedResponse {
    id: i64,
}

/// Empty `{}` body returned by mutations.
#[derive(Debug, Serialize, ToSchema)]
pub struct EmptyResponse {}

/// Task ID as sent by clients: either a JSON number or a numeric string.
#[derive(Debug, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TaskIdJson {
    Number(i64),
    Text(String),
}

/// Request body for creating a task.
#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(default)]
pub struct CreateTaskRequest {
    /// YYYYMMDD, defaults to today when empty
    date: String,
    title: String,
    comment: String,
    repeat: String,
}

/// Request body for updating a task.
#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(default)]
pub struct UpdateTaskRequest {
    #[schema(value_type = Option<String>)]
    id: Option<TaskIdJson>,
    date: String,
    title: String,
    comment: String,
    repeat: String,
}

#[derive(Debug, Deserialize)]
pub struct IdQuery {
    #[serde(default)]
    id: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct NextDateQuery {
    /// Reference date, YYYYMMDD
    now: String,
    /// Start date, YYYYMMDD
    date: String,
    /// Repeat rule
    repeat: String,
}

/// Error type for API handlers.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// The request itself is malformed.
    #[error("{0}")]
    BadRequest(String),
    /// Represents a task service error.
    #[error(transparent)]
    Service(#[from] TaskServiceError),
}

impl From<NextDateError> for ApiError {
    fn from(err: NextDateError) -> Self {
        ApiError::BadRequest(err.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status_code, message) = match &self {
            ApiError::BadRequest(message) => (StatusCode::BAD_REQUEST, message.clone()),
            ApiError::Service(err) if err.is_validation() => {
                tracing::warn!("Rejected task: {}", err);
                (StatusCode::BAD_REQUEST, err.to_string())
            }
            ApiError::Service(err @ TaskServiceError::TaskNotFound(_)) => {
                (StatusCode::NOT_FOUND, err.to_string())
            }
            ApiError::Service(err) => {
                tracing::error!("Task storage failure: {}", err);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Failed to access task storage".to_string(),
                )
            }
        };
        (status_code, Json(ErrorResponse::new(message))).into_response()
    }
}

fn parse_id(raw: Option<&str>) -> Result<i64, ApiError> {
    let raw = raw
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .ok_or_else(|| ApiError::BadRequest("Task ID is not specified".to_string()))?;
    raw.parse::<i64>()
        .map_err(|_| ApiError::BadRequest(format!("Invalid task ID '{}'", raw)))
}

fn parse_body<T>(body: Result<Json<T>, JsonRejection>) -> Result<T, ApiError> {
    body.map(|Json(value)| value).map_err(|rejection| {
        ApiError::BadRequest(format!("Invalid JSON body: {}", rejection.body_text()))
    })
}

/// Handler for GET /api/nextdate - Computes the next occurrence of a rule.
#[tracing::instrument]
#[utoipa::path(
    get,
    path = "/api/nextdate",
    params(
        ("now" = String, Query, description = "Reference date, YYYYMMDD"),
        ("date" = String, Query, description = "Start date, YYYYMMDD"),
        ("repeat" = String, Query, description = "Repeat rule, `y` or `d N`")
    ),
    responses(
        (status = 200, description = "Next occurrence as YYYYMMDD", body = String, content_type = "text/plain"),
        (status = 400, description = "Malformed date or rule", body = ErrorResponse)
    ),
    tag = "Tasks"
)]
pub async fn next_date_handler(Query(query): Query<NextDateQuery>) -> Result<Response, ApiError> {
    let now = nextdate::parse_date(&query.now)
        .map_err(|err| ApiError::BadRequest(format!("Invalid reference date: {}", err)))?
        .and_time(NaiveTime::MIN);
    let next = nextdate::next_date(now, &query.date, &query.repeat)?;
    Ok(([(header::CONTENT_TYPE, "text/plain; charset=utf-8")], next).into_response())
}

/// Handler for GET /api/tasks - Returns the nearest tasks in date order.
#[tracing::instrument(skip(state))]
#[utoipa::path(
    get,
    path = "/api/tasks",
    responses(
        (status = 200, description = "Successfully retrieved tasks", body = TasksResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    tag = "Tasks"
)]
pub async fn get_tasks_handler(
    State(state): State<Arc<TaskState>>,
) -> Result<Json<TasksResponse>, ApiError> {
    let tasks = state.service.get_tasks(state.list_limit).await?;
    Ok(Json(TasksResponse {
        tasks: tasks.into_iter().map(TaskJson::from).collect(),
    }))
}

/// Handler for GET /api/task - Returns a single task.
#[tracing::instrument(skip(state))]
#[utoipa::path(
    get,
    path = "/api/task",
    params(("id" = String, Query, description = "Task ID")),
    responses(
        (status = 200, description = "The task", body = TaskJson),
        (status = 400, description = "Missing or invalid ID", body = ErrorResponse),
        (status = 404, description = "Task not found", body = ErrorResponse)
    ),
    tag = "Tasks"
)]
pub async fn get_task_handler(
    State(state): State<Arc<TaskState>>,
    Query(query): Query<IdQuery>,
) -> Result<Json<TaskJson>, ApiError> {
    let id = parse_id(query.id.as_deref())?;
    let task = state.service.get_task_by_id(id).await?;
    Ok(Json(TaskJson::from(task)))
}

/// Handler for POST /api/task - Creates a task.
#[tracing::instrument(skip(state, body))]
#[utoipa::path(
    post,
    path = "/api/task",
    request_body = CreateTaskRequest,
    responses(
        (status = 200, description = "Task created", body = CreatedResponse),
        (status = 400, description = "Validation failed", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    tag = "Tasks"
)]
pub async fn create_task_handler(
    State(state): State<Arc<TaskState>>,
    body: Result<Json<CreateTaskRequest>, JsonRejection>,
) -> Result<Json<CreatedResponse>, ApiError> {
    let request = parse_body(body)?;
    let id = state
        .service
        .create_task(TaskDraft {
            date: request.date,
            title: request.title,
            comment: request.comment,
            repeat: request.repeat,
        })
        .await?;
    Ok(Json(CreatedResponse { id }))
}

/// Handler for PUT /api/task - Replaces the fields of a task.
#[tracing::instrument(skip(state, body))]
#[utoipa::path(
    put,
    path = "/api/task",
    request_body = UpdateTaskRequest,
    responses(
        (status = 200, description = "Task updated", body = EmptyResponse),
        (status = 400, description = "Validation failed", body = ErrorResponse),
        (status = 404, description = "Task not found", body = ErrorResponse)
    ),
    tag = "Tasks"
)]
pub async fn update_task_handler(
    State(state): State<Arc<TaskState>>,
    body: Result<Json<UpdateTaskRequest>, JsonRejection>,
) -> Result<Json<EmptyResponse>, ApiError> {
    let request = parse_body(body)?;
    let id = match request.id {
        Some(TaskIdJson::Number(id)) => id,
        Some(TaskIdJson::Text(text)) => parse_id(Some(&text))?,
        None => parse_id(None)?,
    };
    state
        .service
        .update_task(
            id,
            TaskDraft {
                date: request.date,
                title: request.title,
                comment: request.comment,
                repeat: request.repeat,
            },
        )
        .await?;
    Ok(Json(EmptyResponse {}))
}

/// Handler for DELETE /api/task - Deletes a task.
#[tracing::instrument(skip(state))]
#[utoipa::path(
    delete,
    path = "/api/task",
    params(("id" = String, Query, description = "Task ID")),
    responses(
        (status = 200, description = "Task deleted", body = EmptyResponse),
        (status = 400, description = "Missing or invalid ID", body = ErrorResponse),
        (status = 404, description = "Task not found", body = ErrorResponse)
    ),
    tag = "Tasks"
)]
pub async fn delete_task_handler(
    State(state): State<Arc<TaskState>>,
    Query(query): Query<IdQuery>,
) -> Result<Json<EmptyResponse>, ApiError> {
    let id = parse_id(query.id.as_deref())?;
    state.service.delete_task(id).await?;
    Ok(Json(EmptyResponse {}))
}

/// Handler for POST /api/task/done - Completes a task.
#[tracing::instrument(skip(state))]
#[utoipa::path(
    post,
    path = "/api/task/done",
    params(("id" = String, Query, description = "Task ID")),
    responses(
        (status = 200, description = "Task deleted or moved to its next date", body = EmptyResponse),
        (status = 400, description = "Missing or invalid ID", body = ErrorResponse),
        (status = 404, description = "Task not found", body = ErrorResponse)
    ),
    tag = "Tasks"
)]
pub async fn task_done_handler(
    State(state): State<Arc<TaskState>>,
    Query(query): Query<IdQuery>,
) -> Result<Json<EmptyResponse>, ApiError> {
    let id = parse_id(query.id.as_deref())?;
    state.service.mark_done(id).await?;
    Ok(Json(EmptyResponse {}))
}

#[derive(OpenApi)]
#[openapi(
    paths(
        next_date_handler,
        get_tasks_handler,
        get_task_handler,
        create_task_handler,
        update_task_handler,
        delete_task_handler,
        task_done_handler
    ),
    components(schemas(
        ErrorResponse,
        TaskJson,
        TasksResponse,
        CreatedResponse,
        EmptyResponse,
        CreateTaskRequest,
        UpdateTaskRequest
    )),
    tags((name = "Tasks", description = "Task scheduler API"))
)]
pub struct ApiDoc;

/// Handler for GET /api/openapi.json - Returns the OpenAPI document.
pub async fn openapi_handler() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}

/// Creates and returns the tasks API router.
pub fn create_api_router(state: Arc<TaskState>) -> Router {
    Router::new()
        .route("/api/nextdate", get(next_date_handler))
        .route("/api/tasks", get(get_tasks_handler))
        .route(
            "/api/task",
            get(get_task_handler)
                .post(create_task_handler)
                .put(update_task_handler)
                .delete(delete_task_handler),
        )
        .route("/api/task/done", post(task_done_handler))
        .route("/api/openapi.json", get(openapi_handler))
        .with_state(state)
}
