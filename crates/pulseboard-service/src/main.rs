use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use axum::error_handling::HandleErrorLayer;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use clap::Parser;
use pulseboard_api::{
    ActivityListRequest, ActivitySearchRequest, AddActivityRequest, AddTaskRequest, DashboardApi,
    GlobalSearchRequest, IndexContentRequest, MigrateResult, RemoveContentRequest, RemoveResult,
    RemoveTaskRequest, SeedResult, SetActivityStatusRequest, TaskSearchRequest,
    UpdateContentRequest, UpdateTaskRequest, WeekTasksRequest, API_CONTRACT_VERSION,
};
use pulseboard_core::{DashboardError, TaskId};
use serde::{Deserialize, Serialize};
use tower::timeout::TimeoutLayer;
use tower::ServiceBuilder;
use tracing_subscriber::EnvFilter;

const SERVICE_CONTRACT_VERSION: &str = "service.v1";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone)]
struct ServiceState {
    api: DashboardApi,
}

#[derive(Debug, Clone, Serialize)]
struct ServiceEnvelope<T>
where
    T: Serialize,
{
    service_contract_version: &'static str,
    api_contract_version: &'static str,
    data: T,
}

#[derive(Debug, Clone, Serialize)]
struct ServiceError {
    service_contract_version: &'static str,
    kind: &'static str,
    error: String,
    #[serde(skip)]
    status: StatusCode,
}

#[derive(Debug, Clone, Deserialize)]
struct MigrateRequest {
    dry_run: bool,
}

#[derive(Debug, Clone, Serialize)]
struct HealthResponse {
    status: &'static str,
}

#[derive(Debug, Parser)]
#[command(name = "pulseboard-service")]
#[command(about = "Local HTTP service for the Pulseboard dashboard stores")]
struct Args {
    #[arg(long, default_value = "./pulseboard.sqlite3")]
    db: PathBuf,
    #[arg(long, default_value = "127.0.0.1:4020")]
    bind: SocketAddr,
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let status = self.status;
        (status, Json(self)).into_response()
    }
}

impl ServiceError {
    fn from_dashboard(err: &DashboardError) -> Self {
        let (kind, status) = match err {
            DashboardError::InvalidArgument(_) => ("invalid_argument", StatusCode::BAD_REQUEST),
            DashboardError::NotFound(_) => ("not_found", StatusCode::NOT_FOUND),
            DashboardError::Unavailable(_) => ("unavailable", StatusCode::SERVICE_UNAVAILABLE),
            DashboardError::Storage(_) => ("storage", StatusCode::INTERNAL_SERVER_ERROR),
        };
        Self {
            service_contract_version: SERVICE_CONTRACT_VERSION,
            kind,
            error: err.to_string(),
            status,
        }
    }
}

fn envelope<T>(data: T) -> ServiceEnvelope<T>
where
    T: Serialize,
{
    ServiceEnvelope {
        service_contract_version: SERVICE_CONTRACT_VERSION,
        api_contract_version: API_CONTRACT_VERSION,
        data,
    }
}

async fn handle_middleware_error(err: tower::BoxError) -> ServiceError {
    if err.is::<tower::timeout::error::Elapsed>() {
        ServiceError {
            service_contract_version: SERVICE_CONTRACT_VERSION,
            kind: "unavailable",
            error: "request timed out".to_string(),
            status: StatusCode::SERVICE_UNAVAILABLE,
        }
    } else {
        ServiceError {
            service_contract_version: SERVICE_CONTRACT_VERSION,
            kind: "storage",
            error: format!("internal middleware error: {err}"),
            status: StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

fn app(state: ServiceState) -> Router {
    Router::new()
        .route("/v1/health", get(health))
        .route("/v1/db/schema-version", post(db_schema_version))
        .route("/v1/db/migrate", post(db_migrate))
        .route("/v1/db/seed", post(db_seed))
        .route("/v1/db/reset", post(db_reset))
        .route("/v1/activities", post(activity_add))
        .route("/v1/activities/list", post(activity_list))
        .route("/v1/activities/search", post(activity_search))
        .route("/v1/activities/status", post(activity_set_status))
        .route("/v1/activities/action-types", get(action_types))
        .route("/v1/tasks", post(task_add))
        .route("/v1/tasks/week", post(task_week))
        .route("/v1/tasks/update", post(task_update))
        .route("/v1/tasks/remove", post(task_remove))
        .route("/v1/tasks/search", post(task_search))
        .route("/v1/tasks/task-types", get(task_types))
        .route("/v1/tasks/:task_id", get(task_show))
        .route("/v1/content", post(content_index))
        .route("/v1/content/update", post(content_update))
        .route("/v1/content/remove", post(content_remove))
        .route("/v1/content/content-types", get(content_types))
        .route("/v1/search", post(global_search))
        .layer(
            ServiceBuilder::new()
                .layer(HandleErrorLayer::new(handle_middleware_error))
                .layer(TimeoutLayer::new(REQUEST_TIMEOUT)),
        )
        .with_state(state)
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();
    let state = ServiceState { api: DashboardApi::new(args.db) };
    let listener = tokio::net::TcpListener::bind(args.bind).await?;
    tracing::info!(bind = %args.bind, "service listening");
    axum::serve(listener, app(state)).await?;
    Ok(())
}

async fn health() -> Json<ServiceEnvelope<HealthResponse>> {
    Json(envelope(HealthResponse { status: "ok" }))
}

async fn db_schema_version(
    State(state): State<ServiceState>,
) -> Result<Json<ServiceEnvelope<pulseboard_store_sqlite::SchemaStatus>>, ServiceError> {
    let status =
        state.api.schema_status().map_err(|err| ServiceError::from_dashboard(&err))?;
    Ok(Json(envelope(status)))
}

async fn db_migrate(
    State(state): State<ServiceState>,
    Json(request): Json<MigrateRequest>,
) -> Result<Json<ServiceEnvelope<MigrateResult>>, ServiceError> {
    let result =
        state.api.migrate(request.dry_run).map_err(|err| ServiceError::from_dashboard(&err))?;
    Ok(Json(envelope(result)))
}

async fn db_seed(
    State(state): State<ServiceState>,
) -> Result<Json<ServiceEnvelope<SeedResult>>, ServiceError> {
    let result = state.api.seed().map_err(|err| ServiceError::from_dashboard(&err))?;
    Ok(Json(envelope(result)))
}

async fn db_reset(
    State(state): State<ServiceState>,
) -> Result<Json<ServiceEnvelope<pulseboard_store_sqlite::ClearCounts>>, ServiceError> {
    let counts = state.api.reset().map_err(|err| ServiceError::from_dashboard(&err))?;
    Ok(Json(envelope(counts)))
}

async fn activity_add(
    State(state): State<ServiceState>,
    Json(request): Json<AddActivityRequest>,
) -> Result<Json<ServiceEnvelope<pulseboard_core::Activity>>, ServiceError> {
    let activity =
        state.api.activity_add(request).map_err(|err| ServiceError::from_dashboard(&err))?;
    Ok(Json(envelope(activity)))
}

async fn activity_list(
    State(state): State<ServiceState>,
    Json(request): Json<ActivityListRequest>,
) -> Result<Json<ServiceEnvelope<pulseboard_core::ActivityPage>>, ServiceError> {
    let page =
        state.api.activity_list(&request).map_err(|err| ServiceError::from_dashboard(&err))?;
    Ok(Json(envelope(page)))
}

async fn activity_search(
    State(state): State<ServiceState>,
    Json(request): Json<ActivitySearchRequest>,
) -> Result<Json<ServiceEnvelope<Vec<pulseboard_core::Activity>>>, ServiceError> {
    let activities =
        state.api.activity_search(&request).map_err(|err| ServiceError::from_dashboard(&err))?;
    Ok(Json(envelope(activities)))
}

async fn activity_set_status(
    State(state): State<ServiceState>,
    Json(request): Json<SetActivityStatusRequest>,
) -> Result<Json<ServiceEnvelope<pulseboard_core::Activity>>, ServiceError> {
    let activity = state
        .api
        .activity_set_status(&request)
        .map_err(|err| ServiceError::from_dashboard(&err))?;
    Ok(Json(envelope(activity)))
}

async fn action_types(
    State(state): State<ServiceState>,
) -> Result<Json<ServiceEnvelope<Vec<String>>>, ServiceError> {
    let types = state.api.action_types().map_err(|err| ServiceError::from_dashboard(&err))?;
    Ok(Json(envelope(types)))
}

async fn task_add(
    State(state): State<ServiceState>,
    Json(request): Json<AddTaskRequest>,
) -> Result<Json<ServiceEnvelope<pulseboard_core::ScheduledTask>>, ServiceError> {
    let task = state.api.task_add(request).map_err(|err| ServiceError::from_dashboard(&err))?;
    Ok(Json(envelope(task)))
}

async fn task_week(
    State(state): State<ServiceState>,
    Json(request): Json<WeekTasksRequest>,
) -> Result<Json<ServiceEnvelope<Vec<pulseboard_core::ScheduledTask>>>, ServiceError> {
    let tasks = state.api.week_tasks(&request).map_err(|err| ServiceError::from_dashboard(&err))?;
    Ok(Json(envelope(tasks)))
}

async fn task_update(
    State(state): State<ServiceState>,
    Json(request): Json<UpdateTaskRequest>,
) -> Result<Json<ServiceEnvelope<pulseboard_core::ScheduledTask>>, ServiceError> {
    let task = state.api.task_update(&request).map_err(|err| ServiceError::from_dashboard(&err))?;
    Ok(Json(envelope(task)))
}

async fn task_remove(
    State(state): State<ServiceState>,
    Json(request): Json<RemoveTaskRequest>,
) -> Result<Json<ServiceEnvelope<RemoveResult>>, ServiceError> {
    let result =
        state.api.task_remove(&request.id).map_err(|err| ServiceError::from_dashboard(&err))?;
    Ok(Json(envelope(result)))
}

async fn task_search(
    State(state): State<ServiceState>,
    Json(request): Json<TaskSearchRequest>,
) -> Result<Json<ServiceEnvelope<Vec<pulseboard_core::ScheduledTask>>>, ServiceError> {
    let tasks = state.api.task_search(&request).map_err(|err| ServiceError::from_dashboard(&err))?;
    Ok(Json(envelope(tasks)))
}

async fn task_types(
    State(state): State<ServiceState>,
) -> Result<Json<ServiceEnvelope<Vec<String>>>, ServiceError> {
    let types = state.api.task_types().map_err(|err| ServiceError::from_dashboard(&err))?;
    Ok(Json(envelope(types)))
}

async fn task_show(
    State(state): State<ServiceState>,
    Path(task_id): Path<String>,
) -> Result<Json<ServiceEnvelope<Option<pulseboard_core::ScheduledTask>>>, ServiceError> {
    let id = TaskId::parse(&task_id).map_err(|err| ServiceError::from_dashboard(&err))?;
    let task = state.api.task_get(&id).map_err(|err| ServiceError::from_dashboard(&err))?;
    Ok(Json(envelope(task)))
}

async fn content_index(
    State(state): State<ServiceState>,
    Json(request): Json<IndexContentRequest>,
) -> Result<Json<ServiceEnvelope<pulseboard_core::IndexedContent>>, ServiceError> {
    let content =
        state.api.content_index(request).map_err(|err| ServiceError::from_dashboard(&err))?;
    Ok(Json(envelope(content)))
}

async fn content_update(
    State(state): State<ServiceState>,
    Json(request): Json<UpdateContentRequest>,
) -> Result<Json<ServiceEnvelope<Option<pulseboard_core::IndexedContent>>>, ServiceError> {
    let content =
        state.api.content_update(&request).map_err(|err| ServiceError::from_dashboard(&err))?;
    Ok(Json(envelope(content)))
}

async fn content_remove(
    State(state): State<ServiceState>,
    Json(request): Json<RemoveContentRequest>,
) -> Result<Json<ServiceEnvelope<RemoveResult>>, ServiceError> {
    let result =
        state.api.content_remove(&request.id).map_err(|err| ServiceError::from_dashboard(&err))?;
    Ok(Json(envelope(result)))
}

async fn content_types(
    State(state): State<ServiceState>,
) -> Result<Json<ServiceEnvelope<Vec<String>>>, ServiceError> {
    let types = state.api.content_types().map_err(|err| ServiceError::from_dashboard(&err))?;
    Ok(Json(envelope(types)))
}

async fn global_search(
    State(state): State<ServiceState>,
    Json(request): Json<GlobalSearchRequest>,
) -> Result<Json<ServiceEnvelope<pulseboard_api::GlobalSearchResults>>, ServiceError> {
    let results =
        state.api.global_search(&request).map_err(|err| ServiceError::from_dashboard(&err))?;
    Ok(Json(envelope(results)))
}
