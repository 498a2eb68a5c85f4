//! JSON HTTP API over the runtime services.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET`  | `/health` | Health check (returns version) |
//! | `GET`  | `/api/mcp/tools` | All registered tools |
//! | `GET`  | `/api/mcp/tools/available` | Enabled tools only |
//! | `GET`  | `/api/mcp/tools/{id}` | One tool |
//! | `POST` | `/api/mcp/tools` | Register a tool |
//! | `PATCH`| `/api/mcp/tools/{id}` | Update a tool |
//! | `POST` | `/api/mcp/tools/{id}/execute` | Execute a tool with `{"params": {...}}` |
//! | `GET`  | `/api/mcp/providers` | All context providers |
//! | `POST` | `/api/mcp/providers` | Register a provider |
//! | `POST` | `/api/mcp/providers/{id}/extract` | Extract one provider |
//! | `POST` | `/api/mcp/providers/extract` | Extract every enabled provider |
//! | `GET`  | `/api/mcp/requests` | Request ledger |
//! | `GET`  | `/api/mcp/context?providerId=` | Cache listing |
//! | `GET`  | `/api/mcp/context/search?q=` | Substring search over cached values |
//! | `GET`  | `/api/mcp/context/key/{key}` | Fresh cache entry by key |
//! | `GET`  | `/api/github/integrations` | PR integration records |
//! | `POST` | `/api/github/webhook` | Webhook delivery (`X-GitHub-Event` header) |
//!
//! # Error Contract
//!
//! ```json
//! { "error": { "code": "bad_request", "message": "invalid query: must not be empty" } }
//! ```
//!
//! Error codes: `bad_request` (400), `not_found` (404), `conflict` (409),
//! `too_many_requests` (429), `internal` (500).
//!
//! A tool that runs and fails is not an HTTP error: `execute` answers 200
//! with `success: false`.
//!
//! # Middleware
//!
//! `POST`, `PUT`, and `PATCH` must carry a JSON content type. Every response
//! gets `X-Content-Type-Options`, `X-Frame-Options`, and `Referrer-Policy`.
//! CORS permits all origins, methods, and headers.
//!
//! Routes under `/api` share a per-client quota from `[server.rate_limit]`
//! (100 requests per 15 minutes by default). Over quota, the answer is 429
//! with a `Retry-After` header. `/health` is never limited.

use axum::{
    extract::{ConnectInfo, Path, Query, Request, State},
    http::{header, HeaderMap, HeaderName, HeaderValue, Method, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::set_header::SetResponseHeaderLayer;
use tower_http::trace::TraceLayer;

use mcp_runtime_core::models::{
    CacheItem, ContextProvider, ExtractionResult, Integration, NewProvider, NewTool,
    Request as LedgerEntry, Tool, ToolUpdate,
};

use crate::config::{Config, RateLimitConfig, ServerConfig};
use crate::dispatcher::ToolOutcome;
use crate::error::McpError;
use crate::rate_limit::ApiRateLimiter;
use crate::runtime::Runtime;

pub const EVENT_HEADER: &str = "x-github-event";

/// Shared application state passed to all route handlers.
#[derive(Clone)]
struct AppState {
    runtime: Arc<Runtime>,
}

/// Build a runtime from `config` and serve it on `[server].bind`.
pub async fn run_server(config: &Config) -> anyhow::Result<()> {
    let runtime = Arc::new(Runtime::from_config(config).await?);
    serve(runtime, &config.server).await
}

/// Serve an already-assembled runtime until the process is terminated.
pub async fn serve(runtime: Arc<Runtime>, server: &ServerConfig) -> anyhow::Result<()> {
    let app = build_router(runtime, &server.rate_limit)?;
    let listener = tokio::net::TcpListener::bind(&server.bind).await?;
    tracing::info!(addr = %listener.local_addr()?, "MCP runtime listening");
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;
    Ok(())
}

pub fn build_router(runtime: Arc<Runtime>, rate_limit: &RateLimitConfig) -> anyhow::Result<Router> {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let mut api: Router<AppState> = Router::new()
        .route("/api/mcp/tools", get(handle_list_tools).post(handle_create_tool))
        .route("/api/mcp/tools/available", get(handle_available_tools))
        .route(
            "/api/mcp/tools/{id}",
            get(handle_get_tool).patch(handle_update_tool),
        )
        .route("/api/mcp/tools/{id}/execute", post(handle_execute_tool))
        .route(
            "/api/mcp/providers",
            get(handle_list_providers).post(handle_create_provider),
        )
        .route("/api/mcp/providers/extract", post(handle_extract_all))
        .route("/api/mcp/providers/{id}/extract", post(handle_extract_provider))
        .route("/api/mcp/requests", get(handle_list_requests))
        .route("/api/mcp/context", get(handle_list_context))
        .route("/api/mcp/context/search", get(handle_search_context))
        .route("/api/mcp/context/key/{*key}", get(handle_context_by_key))
        .route("/api/github/integrations", get(handle_list_integrations))
        .route("/api/github/webhook", post(handle_webhook));
    if rate_limit.enabled {
        let limiter = Arc::new(ApiRateLimiter::new(rate_limit)?);
        api = api.layer(middleware::from_fn_with_state(limiter, enforce_rate_limit));
    }

    let router = Router::new()
        .route("/health", get(handle_health))
        .merge(api)
        .layer(middleware::from_fn(require_json_body))
        .layer(SetResponseHeaderLayer::if_not_present(
            header::X_CONTENT_TYPE_OPTIONS,
            HeaderValue::from_static("nosniff"),
        ))
        .layer(SetResponseHeaderLayer::if_not_present(
            header::X_FRAME_OPTIONS,
            HeaderValue::from_static("DENY"),
        ))
        .layer(SetResponseHeaderLayer::if_not_present(
            HeaderName::from_static("referrer-policy"),
            HeaderValue::from_static("strict-origin-when-cross-origin"),
        ))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(AppState { runtime });
    Ok(router)
}

async fn enforce_rate_limit(
    State(limiter): State<Arc<ApiRateLimiter>>,
    req: Request,
    next: Next,
) -> Response {
    // Routers served without connect info share one bucket.
    let client = req
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|info| info.0.ip())
        .unwrap_or(IpAddr::V4(Ipv4Addr::UNSPECIFIED));

    match limiter.check(client) {
        Ok(()) => next.run(req).await,
        Err(retry_after) => {
            tracing::warn!(%client, limit = limiter.max_requests(), "rate limit exceeded");
            let mut resp = app_error(
                StatusCode::TOO_MANY_REQUESTS,
                "too_many_requests",
                "Too many requests, please try again later",
            )
            .into_response();
            if let Ok(value) = HeaderValue::from_str(&retry_after.to_string()) {
                resp.headers_mut().insert(header::RETRY_AFTER, value);
            }
            resp
        }
    }
}

async fn require_json_body(req: Request, next: Next) -> Response {
    if matches!(*req.method(), Method::POST | Method::PUT | Method::PATCH) {
        let is_json = req
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|v| v.contains("application/json"));
        if !is_json {
            return bad_request("Content-Type must be application/json").into_response();
        }
    }
    next.run(req).await
}

// ============ Error response ============

#[derive(Serialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    code: String,
    message: String,
}

struct AppError {
    status: StatusCode,
    code: String,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: ErrorDetail {
                code: self.code,
                message: self.message,
            },
        };
        (self.status, Json(body)).into_response()
    }
}

fn app_error(status: StatusCode, code: &str, message: impl Into<String>) -> AppError {
    AppError {
        status,
        code: code.to_string(),
        message: message.into(),
    }
}

fn bad_request(message: impl Into<String>) -> AppError {
    app_error(StatusCode::BAD_REQUEST, "bad_request", message)
}

fn not_found(message: impl Into<String>) -> AppError {
    app_error(StatusCode::NOT_FOUND, "not_found", message)
}

impl From<McpError> for AppError {
    fn from(err: McpError) -> Self {
        let msg = err.to_string();
        if err.is_validation() {
            return bad_request(msg);
        }
        if err.is_not_found() {
            return not_found(msg);
        }
        match err {
            McpError::ToolDisabled(_) | McpError::ProviderDisabled(_) | McpError::NoExtractor(_) => {
                bad_request(msg)
            }
            // Store messages carry the entity problem in plain text.
            McpError::Store(_) if msg.contains("already registered") => {
                app_error(StatusCode::CONFLICT, "conflict", msg)
            }
            McpError::Store(_) if msg.contains("not found") => not_found(msg),
            _ => app_error(StatusCode::INTERNAL_SERVER_ERROR, "internal", msg),
        }
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        McpError::Store(err).into()
    }
}

type ApiResult<T> = Result<Json<T>, AppError>;

// ============ GET /health ============

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
}

async fn handle_health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

// ============ Tools ============

async fn handle_list_tools(State(state): State<AppState>) -> ApiResult<Vec<Tool>> {
    Ok(Json(state.runtime.store.list_tools().await?))
}

async fn handle_available_tools(State(state): State<AppState>) -> ApiResult<Vec<Tool>> {
    Ok(Json(state.runtime.dispatcher.available_tools().await?))
}

async fn handle_get_tool(State(state): State<AppState>, Path(id): Path<i64>) -> ApiResult<Tool> {
    state
        .runtime
        .store
        .get_tool(id)
        .await?
        .map(Json)
        .ok_or_else(|| McpError::ToolNotFound(id).into())
}

async fn handle_create_tool(
    State(state): State<AppState>,
    Json(tool): Json<NewTool>,
) -> ApiResult<Tool> {
    if tool.name.trim().is_empty() {
        return Err(bad_request("tool name must not be empty"));
    }
    if !tool.schema.is_object() {
        return Err(bad_request("tool schema must be an object"));
    }
    let created = state.runtime.store.create_tool(tool).await?;
    tracing::info!(tool_id = created.id, tool = %created.name, "tool registered");
    Ok(Json(created))
}

async fn handle_update_tool(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(update): Json<ToolUpdate>,
) -> ApiResult<Tool> {
    if update.name.as_deref().is_some_and(|n| n.trim().is_empty()) {
        return Err(bad_request("tool name must not be empty"));
    }
    Ok(Json(state.runtime.store.update_tool(id, update).await?))
}

#[derive(Deserialize)]
struct ExecuteBody {
    #[serde(default)]
    params: Option<Value>,
}

async fn handle_execute_tool(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(body): Json<ExecuteBody>,
) -> ApiResult<ToolOutcome> {
    Ok(Json(state.runtime.dispatcher.execute(id, body.params).await?))
}

// ============ Providers ============

async fn handle_list_providers(State(state): State<AppState>) -> ApiResult<Vec<ContextProvider>> {
    Ok(Json(state.runtime.store.list_providers().await?))
}

async fn handle_create_provider(
    State(state): State<AppState>,
    Json(provider): Json<NewProvider>,
) -> ApiResult<ContextProvider> {
    if provider.name.trim().is_empty() {
        return Err(bad_request("provider name must not be empty"));
    }
    if provider.provider_type.trim().is_empty() {
        return Err(bad_request("provider type must not be empty"));
    }
    Ok(Json(state.runtime.store.create_provider(provider).await?))
}

async fn handle_extract_provider(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<Vec<ExtractionResult>> {
    Ok(Json(state.runtime.extractor.extract_context(id).await?))
}

async fn handle_extract_all(State(state): State<AppState>) -> ApiResult<Vec<ExtractionResult>> {
    Ok(Json(state.runtime.extractor.extract_all_contexts().await?))
}

// ============ Ledger and cache ============

async fn handle_list_requests(State(state): State<AppState>) -> ApiResult<Vec<LedgerEntry>> {
    Ok(Json(state.runtime.store.list_requests().await?))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ContextQuery {
    provider_id: Option<i64>,
}

async fn handle_list_context(
    State(state): State<AppState>,
    Query(query): Query<ContextQuery>,
) -> ApiResult<Vec<CacheItem>> {
    Ok(Json(state.runtime.store.list_cache(query.provider_id).await?))
}

#[derive(Deserialize)]
struct SearchQuery {
    q: Option<String>,
}

async fn handle_search_context(
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
) -> ApiResult<Vec<ExtractionResult>> {
    let q = query.q.unwrap_or_default();
    Ok(Json(state.runtime.extractor.search_context(&q).await?))
}

async fn handle_context_by_key(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> ApiResult<CacheItem> {
    state
        .runtime
        .extractor
        .get_cached_context(&key)
        .await?
        .map(Json)
        .ok_or_else(|| not_found(format!("no fresh context for key: {}", key)))
}

// ============ GitHub ============

async fn handle_list_integrations(State(state): State<AppState>) -> ApiResult<Vec<Integration>> {
    Ok(Json(state.runtime.store.list_integrations().await?))
}

async fn handle_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<Value>,
) -> ApiResult<Value> {
    let event = headers
        .get(EVENT_HEADER)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| bad_request("missing X-GitHub-Event header"))?
        .to_string();

    state.runtime.bot.handle_webhook(&event, payload).await?;
    Ok(Json(json!({ "message": "Webhook processed" })))
}
