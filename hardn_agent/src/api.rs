//! HTTP surface: routes, pretty JSON responses, CORS and JSON error bodies.

use std::collections::HashMap;
use std::net::SocketAddr;

use axum::{
    body::Bytes,
    extract::{ConnectInfo, Query, Request, State},
    http::{header, HeaderMap, HeaderValue, Method, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use chrono::{SecondsFormat, Utc};
use serde::Serialize;
use tracing::{debug, error};

use crate::control::{ActionOutcome, Caller, RawActionRequest};
use crate::error::ControlError;
use crate::host::{HardnStatus, HostStatus};
use crate::logs::LogsReport;
use crate::services::ServiceRecord;
use crate::state::AppState;
use crate::sysctl::SysctlSnapshot;
use crate::types::{MetricsReport, Sample};

pub const ENDPOINTS: &[&str] = &[
    "GET /api/status",
    "GET /api/hardn",
    "GET /api/services",
    "GET /api/sysctl",
    "GET /api/metrics",
    "GET /api/metrics/history",
    "GET /api/logs",
    "GET /api/health",
    "POST /api/service",
];

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(index).fallback(method_not_allowed))
        .route("/api/health", get(health).fallback(method_not_allowed))
        .route("/api/status", get(status).fallback(method_not_allowed))
        .route("/api/hardn", get(hardn).fallback(method_not_allowed))
        .route("/api/services", get(services).fallback(method_not_allowed))
        .route("/api/sysctl", get(sysctl).fallback(method_not_allowed))
        .route("/api/metrics", get(metrics).fallback(method_not_allowed))
        .route(
            "/api/metrics/history",
            get(metrics_history).fallback(method_not_allowed),
        )
        .route("/api/logs", get(logs).fallback(method_not_allowed))
        .route("/api/service", post(service_action).fallback(method_not_allowed))
        .fallback(not_found)
        .layer(middleware::from_fn(log_request))
        .layer(middleware::map_response(allow_any_origin))
        .with_state(state)
}

// ---------- Response plumbing ----------

/// Pretty-printed JSON body with `Content-Type: application/json`.
pub struct PrettyJson<T>(pub StatusCode, pub T);

impl<T: Serialize> IntoResponse for PrettyJson<T> {
    fn into_response(self) -> Response {
        let ct = [(header::CONTENT_TYPE, HeaderValue::from_static("application/json"))];
        match serde_json::to_vec_pretty(&self.1) {
            Ok(body) => (self.0, ct, body).into_response(),
            Err(e) => {
                error!("response serialization failed: {e}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ct,
                    r#"{"error": "response serialization failed"}"#,
                )
                    .into_response()
            }
        }
    }
}

fn ok<T: Serialize>(body: T) -> PrettyJson<T> {
    PrettyJson(StatusCode::OK, body)
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
}

#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    Unauthorized,
    NotFound,
    MethodNotAllowed,
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (code, error) = match self {
            ApiError::BadRequest(m) => (StatusCode::BAD_REQUEST, m),
            ApiError::Unauthorized => (StatusCode::UNAUTHORIZED, "Unauthorized".into()),
            ApiError::NotFound => (StatusCode::NOT_FOUND, "Endpoint not found".into()),
            ApiError::MethodNotAllowed => {
                (StatusCode::METHOD_NOT_ALLOWED, "Method not allowed".into())
            }
            ApiError::Internal(m) => {
                error!("internal error: {m}");
                (StatusCode::INTERNAL_SERVER_ERROR, m)
            }
        };
        PrettyJson(code, ErrorBody { error }).into_response()
    }
}

impl From<ControlError> for ApiError {
    fn from(e: ControlError) -> Self {
        match e {
            ControlError::Unauthorized => ApiError::Unauthorized,
            ControlError::Invalid(v) => ApiError::BadRequest(v.to_string()),
        }
    }
}

async fn allow_any_origin(mut res: Response) -> Response {
    res.headers_mut().insert(
        header::ACCESS_CONTROL_ALLOW_ORIGIN,
        HeaderValue::from_static("*"),
    );
    res
}

async fn log_request(req: Request, next: Next) -> Response {
    let method = req.method().clone();
    let path = req.uri().path().to_string();
    let res = next.run(req).await;
    debug!(%method, %path, status = res.status().as_u16(), "request");
    res
}

async fn not_found() -> ApiError {
    ApiError::NotFound
}

async fn method_not_allowed(method: Method) -> ApiError {
    debug!(%method, "method not allowed");
    ApiError::MethodNotAllowed
}

// ---------- Handlers ----------

#[derive(Serialize)]
struct Index {
    status: &'static str,
    message: &'static str,
    version: &'static str,
    endpoints: &'static [&'static str],
}

async fn index() -> PrettyJson<Index> {
    ok(Index {
        status: "ok",
        message: "HARDN agent API",
        version: env!("CARGO_PKG_VERSION"),
        endpoints: ENDPOINTS,
    })
}

#[derive(Serialize)]
struct Health {
    status: &'static str,
    health: &'static str,
    timestamp: String,
}

async fn health() -> PrettyJson<Health> {
    ok(Health {
        status: "ok",
        health: "healthy",
        timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true),
    })
}

async fn status(State(state): State<AppState>) -> PrettyJson<HostStatus> {
    ok(state.host.status().await)
}

async fn hardn(State(state): State<AppState>) -> PrettyJson<HardnStatus> {
    ok(state.host.hardn_status().await)
}

#[derive(Serialize)]
struct Services {
    services: Vec<ServiceRecord>,
}

async fn services(State(state): State<AppState>) -> PrettyJson<Services> {
    ok(Services {
        services: state.services.poll().await,
    })
}

#[derive(Serialize)]
struct Sysctl {
    sysctl: SysctlSnapshot,
}

async fn sysctl(State(state): State<AppState>) -> PrettyJson<Sysctl> {
    ok(Sysctl {
        sysctl: state.sysctl.read_all().await,
    })
}

async fn metrics(State(state): State<AppState>) -> Result<PrettyJson<MetricsReport>, ApiError> {
    state
        .sampler
        .current_report()
        .await
        .map(ok)
        .map_err(|e| ApiError::Internal(format!("Error collecting metrics: {e}")))
}

#[derive(Serialize)]
struct History {
    capacity: usize,
    samples: Vec<Sample>,
}

async fn metrics_history(
    State(state): State<AppState>,
    Query(q): Query<HashMap<String, String>>,
) -> Result<PrettyJson<History>, ApiError> {
    let history = state.sampler.history();
    let samples = match q.get("limit") {
        Some(raw) => {
            let k = raw
                .parse::<usize>()
                .map_err(|_| ApiError::BadRequest(format!("Invalid limit: {raw}")))?;
            history.snapshot(k)
        }
        None => history.snapshot_all(),
    };
    Ok(ok(History {
        capacity: history.capacity(),
        samples,
    }))
}

async fn logs(State(state): State<AppState>) -> PrettyJson<LogsReport> {
    ok(state.logs.tail().await)
}

/// Authorization runs before the body is looked at, so a rejected caller learns nothing
/// about validation.
async fn service_action(
    State(state): State<AppState>,
    peer: Option<ConnectInfo<SocketAddr>>,
    headers: HeaderMap,
    Query(q): Query<HashMap<String, String>>,
    body: Bytes,
) -> Result<PrettyJson<ActionOutcome>, ApiError> {
    let caller = Caller {
        token: bearer_token(&headers).or_else(|| q.get("token").cloned()),
        origin: peer.map(|ConnectInfo(addr)| addr.to_string()),
    };
    state.executor.authorize(&caller)?;

    let raw = RawActionRequest::from_json(&body).map_err(ControlError::from)?;
    let req = state
        .executor
        .validate_raw(&raw)
        .map_err(ControlError::from)?;
    Ok(ok(state.executor.execute(&req).await))
}

fn bearer_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(|t| t.trim().to_string())
}
