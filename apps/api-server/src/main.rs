//! api-server — HTTP API over the Orders service.
//!
//! Exposes the two read operations of `OrderService`:
//! - `GET /orders` lists every stored order.
//! - `GET /orders/:id` returns one order, or 404 when the id is unknown.
//!
//! Storage is in-memory or SQLite (file) when the `sqlite` feature is enabled.
//!
//! Run:
//! ```bash
//! # pretty logs (default); PORT optional
//! SEED_DEMO_ORDERS=1 cargo run -p api-server
//!
//! # ephemeral in-memory store, JSON logs
//! STORAGE_PROVIDER=memory LOG_FORMAT=json SEED_DEMO_ORDERS=1 cargo run -p api-server
//! ```
//!
//! Configuration: See `config.rs` for all environment variables.

mod config;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::http::HeaderValue;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use domain::adapters::memory_repo::InMemoryOrderRepo;
use domain::service::OrderService;
use domain::{CoreError, NewOrder, Order, OrderId, OrderRepository, OrderStatus};
use serde::Serialize;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

// Local repo abstraction supporting memory or sqlite (feature-gated).
enum RepoKind {
    Memory(InMemoryOrderRepo),
    #[cfg(feature = "sqlite")]
    Sqlite(sqlite_adapter::SqliteOrderRepo),
}

#[derive(Clone)]
struct AnyRepo {
    kind: Arc<RepoKind>,
}

impl AnyRepo {
    fn memory() -> Self {
        Self {
            kind: Arc::new(RepoKind::Memory(InMemoryOrderRepo::new())),
        }
    }

    #[cfg(feature = "sqlite")]
    fn sqlite(db_path: Option<&std::path::Path>) -> Result<Self, CoreError> {
        let repo = match db_path {
            Some(path) => sqlite_adapter::SqliteOrderRepo::open_creating_dirs(path)?,
            None => sqlite_adapter::SqliteOrderRepo::from_env()?,
        };
        Ok(Self {
            kind: Arc::new(RepoKind::Sqlite(repo)),
        })
    }

    fn create(&self, input: NewOrder) -> Result<Order, CoreError> {
        match &*self.kind {
            RepoKind::Memory(r) => r.create(input),
            #[cfg(feature = "sqlite")]
            RepoKind::Sqlite(r) => r.create(input),
        }
    }

    fn count(&self) -> Result<u64, CoreError> {
        match &*self.kind {
            RepoKind::Memory(r) => r.count(),
            #[cfg(feature = "sqlite")]
            RepoKind::Sqlite(r) => r.count(),
        }
    }
}

impl OrderRepository for AnyRepo {
    fn find_all(&self) -> Result<Vec<Order>, CoreError> {
        match &*self.kind {
            RepoKind::Memory(r) => r.find_all(),
            #[cfg(feature = "sqlite")]
            RepoKind::Sqlite(r) => r.find_all(),
        }
    }

    fn find_by_id(&self, id: OrderId) -> Result<Option<Order>, CoreError> {
        match &*self.kind {
            RepoKind::Memory(r) => r.find_by_id(id),
            #[cfg(feature = "sqlite")]
            RepoKind::Sqlite(r) => r.find_by_id(id),
        }
    }
}

#[derive(Clone)]
struct AppState {
    orders: Arc<OrderService<AnyRepo>>,
}

impl AppState {
    fn new(repo: AnyRepo) -> Self {
        Self {
            orders: Arc::new(OrderService::new(repo)),
        }
    }
}

#[tokio::main]
async fn main() {
    // Load and validate config first (fail fast on misconfiguration)
    let cfg = match config::Config::from_env() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            std::process::exit(1);
        }
    };

    init_tracing(&cfg);
    cfg.warn_if_insecure();

    let repo = build_repo(&cfg);
    if cfg.seed_demo_orders {
        match seed_demo_orders(&repo) {
            Ok(0) => info!("store not empty; demo seed skipped"),
            Ok(n) => info!(count = n, "seeded demo orders"),
            Err(e) => error!(err = %e, "demo seed failed"),
        }
    }
    let state = AppState::new(repo);

    // Request ID header name
    let x_request_id = axum::http::HeaderName::from_static("x-request-id");

    let mut app = routes(state)
        .layer(PropagateRequestIdLayer::new(x_request_id.clone()))
        .layer(
            TraceLayer::new_for_http().make_span_with(|request: &axum::http::Request<_>| {
                let request_id = request
                    .headers()
                    .get("x-request-id")
                    .and_then(|v| v.to_str().ok())
                    .unwrap_or("-");
                tracing::info_span!(
                    "http_request",
                    method = %request.method(),
                    uri = %request.uri(),
                    request_id = %request_id,
                )
            }),
        )
        .layer(SetRequestIdLayer::new(x_request_id, MakeRequestUuid));

    // CORS - already validated in Config::from_env()
    let cors = if cfg.cors_allow_origin == HeaderValue::from_static("*") {
        CorsLayer::permissive()
    } else {
        CorsLayer::new()
            .allow_origin(AllowOrigin::list([cfg.cors_allow_origin.clone()]))
            .allow_methods([axum::http::Method::GET, axum::http::Method::OPTIONS])
            .allow_headers([axum::http::header::CONTENT_TYPE])
    };
    app = app.layer(cors);

    let addr: SocketAddr = ([0, 0, 0, 0], cfg.port).into();
    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(l) => l,
        Err(e) => {
            error!(%addr, err = %e, "failed to bind");
            std::process::exit(1);
        }
    };
    info!(%addr, "api-server listening");
    if let Err(e) = axum::serve(listener, app).await {
        error!(err = %e, "server error");
        std::process::exit(1);
    }
}

fn routes(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/orders", get(list_orders))
        .route("/orders/:id", get(get_order))
        .with_state(state)
}

fn init_tracing(cfg: &config::Config) {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let registry = tracing_subscriber::registry().with(env_filter);
    match cfg.log_format {
        config::LogFormat::Json => {
            registry
                .with(
                    fmt::layer()
                        .json()
                        .with_target(true)
                        .with_timer(fmt::time::SystemTime)
                        .with_writer(std::io::stdout),
                )
                .init();
        }
        config::LogFormat::Pretty => {
            registry
                .with(
                    fmt::layer()
                        .pretty()
                        .with_target(true)
                        .with_writer(std::io::stdout),
                )
                .init();
        }
    }
}

// Construct a repository instance based on config and feature flags.
fn build_repo(cfg: &config::Config) -> AnyRepo {
    match cfg.storage_provider {
        #[cfg(feature = "sqlite")]
        config::StorageProvider::Sqlite => match AnyRepo::sqlite(cfg.db_path.as_deref()) {
            Ok(r) => r,
            Err(e) => {
                error!(err = %e, "failed to open sqlite store; falling back to memory");
                AnyRepo::memory()
            }
        },
        #[cfg(not(feature = "sqlite"))]
        config::StorageProvider::Sqlite => {
            warn!(db_path = ?cfg.db_path, "built without `sqlite` feature; using memory store");
            AnyRepo::memory()
        }
        config::StorageProvider::Memory => AnyRepo::memory(),
    }
}

const DEMO_ORDERS: [(&str, OrderStatus); 3] = [
    ("2019-06-20T19:53:07Z", OrderStatus::Paid),
    ("2019-07-21T03:42:10Z", OrderStatus::WaitingPayment),
    ("2019-07-22T15:21:22Z", OrderStatus::WaitingPayment),
];

/// Insert the demo orders into an empty store. Returns how many were created.
fn seed_demo_orders(repo: &AnyRepo) -> Result<usize, CoreError> {
    if repo.count()? > 0 {
        return Ok(0);
    }
    for (moment, status) in DEMO_ORDERS {
        let moment = http_common::rfc3339_to_system_time(moment)
            .map_err(|e| CoreError::Repository(format!("bad demo timestamp {moment}: {e}")))?;
        repo.create(NewOrder { moment, status })?;
    }
    Ok(DEMO_ORDERS.len())
}

#[derive(Serialize)]
struct OrderOut {
    id: i64,
    moment: String,
    status: &'static str,
}

#[derive(Serialize)]
struct ListOut {
    orders: Vec<OrderOut>,
    total: usize,
}

fn order_to_out(order: Order) -> OrderOut {
    OrderOut {
        id: order.id.get(),
        moment: http_common::system_time_to_rfc3339(order.moment),
        status: order.status.as_str(),
    }
}

async fn health() -> impl IntoResponse {
    Json(serde_json::json!({"status": "ok"}))
}

async fn list_orders(State(state): State<AppState>) -> impl IntoResponse {
    match state.orders.find_all() {
        Ok(orders) => {
            let orders: Vec<OrderOut> = orders.into_iter().map(order_to_out).collect();
            info!(count = orders.len(), "list orders ok");
            (
                StatusCode::OK,
                Json(ListOut {
                    total: orders.len(),
                    orders,
                }),
            )
                .into_response()
        }
        Err(e) => {
            error!(err = ?e, "list orders error");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(http_common::json_err("internal")),
            )
                .into_response()
        }
    }
}

async fn get_order(State(state): State<AppState>, Path(raw): Path<String>) -> impl IntoResponse {
    let id = match OrderId::parse(&raw) {
        Ok(id) => id,
        Err(_) => {
            warn!(raw = %raw, "bad order id in path");
            return (
                StatusCode::BAD_REQUEST,
                Json(http_common::json_err("invalid_id")),
            )
                .into_response();
        }
    };
    match state.orders.find_by_id(id) {
        Ok(order) => (StatusCode::OK, Json(order_to_out(order))).into_response(),
        Err(CoreError::NotFound) => {
            warn!(id = %id, "order 404");
            (
                StatusCode::NOT_FOUND,
                Json(http_common::json_err("not_found")),
            )
                .into_response()
        }
        Err(e) => {
            error!(id = %id, err = ?e, "get order error");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(http_common::json_err("internal")),
            )
                .into_response()
        }
    }
}
