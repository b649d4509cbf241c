use std::{
    net::{IpAddr, SocketAddr},
    sync::Arc,
};

use anyhow::Context;
use axum::{
    Json, Router,
    extract::State,
    http::{self, HeaderName, HeaderValue, Method, StatusCode},
    response::IntoResponse,
    routing::{get, post, put},
};
use entity::employees::Role;
use platform_api::{ApiError, ApiJson, ApiPath, ApiResult};
use platform_db::DbPool;
use products_hr::{CreateEmployee, Employee, EmployeeApi, HrError, PermissionPatch};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tower::ServiceBuilder;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};
use tracing::info;

use crate::config::AppConfig;

#[derive(Clone)]
pub struct AppState {
    pub pool: DbPool,
    pub employees: Arc<dyn EmployeeApi>,
    pub config: Arc<AppConfig>,
}

#[derive(Clone, Debug)]
pub struct ServeConfig {
    addr: SocketAddr,
}

impl ServeConfig {
    pub fn new(host: IpAddr, port: u16) -> Self {
        Self {
            addr: SocketAddr::from((host, port)),
        }
    }
}

pub async fn serve(config: ServeConfig, state: AppState) -> anyhow::Result<()> {
    let router = build_router(state);
    let listener = tokio::net::TcpListener::bind(config.addr)
        .await
        .with_context(|| format!("failed to bind {}", config.addr))?;

    info!(%config.addr, "employee service listening");
    axum::serve(listener, router.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server error")?;
    Ok(())
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let allowed = origins
        .iter()
        .filter_map(|origin| origin.parse::<HeaderValue>().ok())
        .collect::<Vec<_>>();
    let allow_origin = if allowed.is_empty() {
        AllowOrigin::any()
    } else {
        AllowOrigin::list(allowed)
    };
    CorsLayer::new()
        .allow_headers([http::header::CONTENT_TYPE])
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_origin(allow_origin)
}

fn employee_routes() -> Router<AppState> {
    Router::new()
        .route("/employee", post(create_employee))
        .route("/employee/permissions", put(update_employee_permissions))
        .route("/employee/role", put(update_employee_role))
        .route(
            "/employee/{account_id}",
            get(get_employee).delete(delete_employee),
        )
        .route(
            "/employee/{account_id}/permission/{permission}",
            get(check_permission),
        )
        .route(
            "/organization/{organization_id}/employees",
            get(get_employees_by_organization),
        )
}

pub fn build_router(state: AppState) -> Router {
    let request_id = MakeRequestUuid;
    let header_name = HeaderName::from_static("x-request-id");
    let prefix = state.config.http_prefix.clone();
    let routes = Router::new().route("/health", get(health_handler));
    let routes = if prefix.is_empty() {
        routes.merge(employee_routes())
    } else {
        routes.nest(&prefix, employee_routes())
    };
    routes
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::new(header_name.clone(), request_id))
                .layer(PropagateRequestIdLayer::new(header_name))
                .layer(TraceLayer::new_for_http())
                .layer(cors_layer(&state.config.cors_allowed_origins)),
        )
        .with_state(state)
}

fn api_error(err: HrError) -> ApiError {
    if err.is_unique_violation() {
        return ApiError::Conflict("employee already exists for this account".into());
    }
    let message = err.to_string();
    match err {
        HrError::EmployeeNotFound { .. } => ApiError::NotFound(message),
        HrError::InsufficientPermissions { .. } => ApiError::Forbidden(message),
        HrError::Store(db) => ApiError::internal(db),
    }
}

#[derive(Serialize)]
struct CreatedResponse {
    employee_id: i32,
}

#[derive(Serialize)]
struct EmployeesResponse {
    employees: Vec<Employee>,
}

#[derive(Deserialize)]
struct UpdatePermissionsBody {
    account_id: i64,
    #[serde(flatten)]
    patch: PermissionPatch,
}

#[derive(Deserialize)]
struct UpdateRoleBody {
    account_id: i64,
    role: Role,
}

#[derive(Serialize)]
struct PermissionResponse {
    granted: bool,
}

async fn create_employee(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<CreateEmployee>,
) -> ApiResult<(StatusCode, Json<CreatedResponse>)> {
    let employee_id = state
        .employees
        .create_employee(body)
        .await
        .map_err(api_error)?;
    Ok((StatusCode::CREATED, Json(CreatedResponse { employee_id })))
}

async fn get_employee(
    State(state): State<AppState>,
    ApiPath(account_id): ApiPath<i64>,
) -> ApiResult<Json<Employee>> {
    let employee = state
        .employees
        .get_employee(account_id)
        .await
        .map_err(api_error)?;
    Ok(Json(employee))
}

async fn get_employees_by_organization(
    State(state): State<AppState>,
    ApiPath(organization_id): ApiPath<i64>,
) -> ApiResult<Json<EmployeesResponse>> {
    let employees = state
        .employees
        .get_employees_by_organization(organization_id)
        .await
        .map_err(api_error)?;
    Ok(Json(EmployeesResponse { employees }))
}

async fn update_employee_permissions(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<UpdatePermissionsBody>,
) -> ApiResult<Json<Value>> {
    state
        .employees
        .update_employee_permissions(body.account_id, body.patch)
        .await
        .map_err(api_error)?;
    Ok(Json(json!({})))
}

async fn update_employee_role(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<UpdateRoleBody>,
) -> ApiResult<Json<Value>> {
    state
        .employees
        .update_employee_role(body.account_id, body.role)
        .await
        .map_err(api_error)?;
    Ok(Json(json!({})))
}

async fn delete_employee(
    State(state): State<AppState>,
    ApiPath(account_id): ApiPath<i64>,
) -> ApiResult<Json<Value>> {
    state
        .employees
        .delete_employee(account_id)
        .await
        .map_err(api_error)?;
    Ok(Json(json!({})))
}

async fn check_permission(
    State(state): State<AppState>,
    ApiPath((account_id, permission)): ApiPath<(i64, String)>,
) -> ApiResult<Json<PermissionResponse>> {
    let granted = state
        .employees
        .has_permission(account_id, &permission)
        .await
        .map_err(api_error)?;
    Ok(Json(PermissionResponse { granted }))
}

async fn health_handler(State(state): State<AppState>) -> impl IntoResponse {
    let db_ok = platform_db::ping(&state.pool).await.is_ok();
    Json(HealthResponse {
        ok: db_ok,
        db_ok,
        version: env!("CARGO_PKG_VERSION"),
    })
}

#[derive(Serialize)]
struct HealthResponse {
    ok: bool,
    db_ok: bool,
    version: &'static str,
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install CTRL+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};

        signal(SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    ctrl_c.await;

    #[cfg(unix)]
    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    };
}
