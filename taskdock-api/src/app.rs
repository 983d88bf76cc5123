/// Application state and router builder
///
/// # Example
///
/// ```no_run
/// use taskdock_api::{app::{build_router, AppState}, config::Config};
/// use taskdock_shared::store::connect::open_stores;
///
/// # async fn example() -> anyhow::Result<()> {
/// let config = Config::from_env()?;
/// let stores = open_stores(
///     &config.storage.primary,
///     config.storage.secondary.as_ref(),
///     config.storage.dual_write,
///     config.startup_policy(),
/// )
/// .await?;
/// let app = build_router(AppState::new(stores, config));
/// # Ok(())
/// # }
/// ```

use crate::{config::Config, middleware::security::SecurityHeadersLayer, routes};
use axum::{
    extract::{Request, State},
    http::{header, HeaderValue, Method},
    middleware::{from_fn_with_state, Next},
    response::Response,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use taskdock_shared::{
    auth::middleware::{jwt_auth_middleware, AuthError, InvalidTokenPolicy},
    services::{AuthService, TaskService},
    store::DualWrite,
};
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

/// Shared application state
///
/// Cloned for each request handler via Axum's `State` extractor; every field
/// is cheap to clone.
#[derive(Clone)]
pub struct AppState {
    pub auth: AuthService,
    pub tasks: TaskService,

    /// Primary and optional mirror store
    pub stores: DualWrite,

    pub config: Arc<Config>,
}

impl AppState {
    /// Wires the services to already opened stores
    pub fn new(stores: DualWrite, config: Config) -> Self {
        Self {
            auth: AuthService::new(stores.clone(), config.jwt.token_settings()),
            tasks: TaskService::new(stores.clone()),
            stores,
            config: Arc::new(config),
        }
    }
}

/// Builds the complete Axum router with all routes and middleware
///
/// ```text
/// /
/// ├── GET  /                 # banner (public)
/// ├── GET  /health           # store health (public)
/// ├── POST /register         # public
/// ├── POST /login            # public
/// ├── GET  /protected        # bearer token, invalid token -> 403
/// └── /tasks                 # bearer token, invalid token -> 401
///     ├── GET, POST  /
///     └── GET, PUT, PATCH, DELETE /:id
/// ```
///
/// Layers, outermost last: request tracing, CORS, security headers.
pub fn build_router(state: AppState) -> Router {
    let public_routes = Router::new()
        .route("/", get(routes::health::root))
        .route("/health", get(routes::health::health_check))
        .route("/register", post(routes::auth::register))
        .route("/login", post(routes::auth::login));

    let protected_routes = Router::new()
        .route("/protected", get(routes::protected::protected))
        .route_layer(from_fn_with_state(state.clone(), protected_auth_layer));

    let task_routes = Router::new()
        .route(
            "/tasks",
            get(routes::tasks::list_tasks).post(routes::tasks::create_task),
        )
        .route(
            "/tasks/:id",
            get(routes::tasks::get_task)
                .put(routes::tasks::replace_task)
                .patch(routes::tasks::patch_task)
                .delete(routes::tasks::delete_task),
        )
        .route_layer(from_fn_with_state(state.clone(), jwt_auth_layer));

    // Configure CORS based on environment
    let cors = if state.config.api.cors_origins.iter().any(|origin| origin == "*") {
        CorsLayer::permissive()
    } else {
        let origins: Vec<HeaderValue> = state
            .config
            .api
            .cors_origins
            .iter()
            .filter_map(|origin| origin.parse().ok())
            .collect();

        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods([
                Method::GET,
                Method::POST,
                Method::PUT,
                Method::PATCH,
                Method::DELETE,
                Method::OPTIONS,
            ])
            .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
            .allow_credentials(true)
            .max_age(std::time::Duration::from_secs(3600))
    };

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .merge(task_routes)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(cors)
        .layer(SecurityHeadersLayer::new(state.config.api.production))
        .with_state(state)
}

/// Bearer auth for `/tasks`: invalid tokens are 401
async fn jwt_auth_layer(
    State(state): State<AppState>,
    req: Request,
    next: Next,
) -> Result<Response, AuthError> {
    jwt_auth_middleware(state.auth, InvalidTokenPolicy::Unauthorized, req, next).await
}

/// Bearer auth for `/protected`: invalid tokens are 403
async fn protected_auth_layer(
    State(state): State<AppState>,
    req: Request,
    next: Next,
) -> Result<Response, AuthError> {
    jwt_auth_middleware(state.auth, InvalidTokenPolicy::Forbidden, req, next).await
}
