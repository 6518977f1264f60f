use std::sync::Arc;

use axum::http::{HeaderMap, HeaderValue, Method};
use axum::middleware::from_fn_with_state;
use axum::routing::{delete, get, post, put, MethodRouter};
use axum::{Extension, Router};
use sqlx::SqlitePool;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::audit::{init_audit_bus, start_audit_listener, AuditSink, BusAuditSink, RequestContext};
use crate::authz::{enforce_requirement, ops, AccessPolicy, PermissionTable, Requirement};
use crate::errors::AppError;
use crate::jwt::JwtConfig;
use crate::routes::{audit, auth, health, organizations, tasks, users};
use crate::services::ServiceContext;

#[derive(Clone)]
pub struct AppState {
    pub pool: SqlitePool,
    pub jwt: Arc<JwtConfig>,
    pub policy: Arc<AccessPolicy>,
    pub audit: Arc<dyn AuditSink>,
}

impl AppState {
    pub fn new(pool: SqlitePool, jwt: JwtConfig, audit: Arc<dyn AuditSink>) -> Self {
        Self {
            pool,
            jwt: Arc::new(jwt),
            policy: Arc::new(AccessPolicy::new(PermissionTable::standard())),
            audit,
        }
    }

    pub fn services(&self, headers: &HeaderMap) -> ServiceContext<'_> {
        ServiceContext::new(
            &self.pool,
            &self.policy,
            self.audit.as_ref(),
            RequestContext::from_headers(headers),
        )
    }
}

/// Builds the router with configuration from the environment and the
/// bus-backed audit sink. Must be called inside a tokio runtime.
pub async fn create_app(pool: SqlitePool) -> Result<Router, AppError> {
    let jwt_config = JwtConfig::from_env()?;

    let (bus, rx) = init_audit_bus();
    tokio::spawn(start_audit_listener(rx, pool.clone()));

    Ok(create_app_with(pool, jwt_config, Arc::new(BusAuditSink::new(bus))))
}

pub fn create_app_with(pool: SqlitePool, jwt: JwtConfig, audit_sink: Arc<dyn AuditSink>) -> Router {
    let state = AppState::new(pool, jwt, audit_sink);

    let auth_routes = Router::new()
        .route("/register", post(auth::register))
        .route("/login", post(auth::login))
        .route("/me", get(auth::me))
        .route("/logout", post(auth::logout));

    let task_routes = Router::new()
        .route("/", guarded(get(tasks::list_tasks), ops::TASK_READ, &state))
        .route("/", guarded(post(tasks::create_task), ops::TASK_CREATE, &state))
        .route("/stats", guarded(get(tasks::task_stats), ops::TASK_READ, &state))
        .route("/:id", guarded(get(tasks::get_task), ops::TASK_READ, &state))
        .route("/:id", guarded(put(tasks::update_task), ops::TASK_UPDATE, &state))
        .route("/:id", guarded(delete(tasks::delete_task), ops::TASK_DELETE, &state))
        .route("/:id/reorder", guarded(put(tasks::reorder_task), ops::TASK_UPDATE, &state));

    let user_routes = Router::new()
        .route("/", guarded(get(users::list_users), ops::USER_READ, &state))
        .route("/", guarded(post(users::create_user), ops::USER_CREATE, &state))
        .route("/:id", guarded(get(users::get_user), ops::USER_READ, &state))
        .route("/:id", guarded(put(users::update_user), ops::USER_UPDATE, &state))
        .route("/:id", guarded(delete(users::delete_user), ops::USER_DELETE, &state));

    let organization_routes = Router::new()
        .route("/", guarded(get(organizations::list_organizations), ops::ORG_READ, &state))
        .route("/", guarded(post(organizations::create_organization), ops::ORG_CREATE, &state))
        .route("/:id", guarded(get(organizations::get_organization), ops::ORG_READ, &state))
        .route("/:id", guarded(put(organizations::update_organization), ops::ORG_UPDATE, &state))
        .route("/:id", guarded(delete(organizations::delete_organization), ops::ORG_DELETE, &state));

    let api = Router::new()
        .route("/health", get(health::health))
        .route("/audit-log", guarded(get(audit::list_audit_log), ops::AUDIT_LIST, &state))
        .nest("/auth", auth_routes)
        .nest("/tasks", task_routes)
        .nest("/users", user_routes)
        .nest("/organizations", organization_routes);

    Router::new()
        .nest("/api", api)
        .with_state(state)
        .layer(cors_layer())
        .layer(TraceLayer::new_for_http())
}

/// Attaches `requirement` to a route and enforces it before the handler.
fn guarded(route: MethodRouter<AppState>, requirement: Requirement, state: &AppState) -> MethodRouter<AppState> {
    route
        .layer::<_, std::convert::Infallible>(from_fn_with_state(state.clone(), enforce_requirement))
        .layer(Extension(requirement))
}

fn cors_layer() -> CorsLayer {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::OPTIONS])
        .allow_headers(Any);

    match std::env::var("CORS_ORIGIN").ok().and_then(|origin| origin.parse::<HeaderValue>().ok()) {
        Some(origin) => cors.allow_origin(AllowOrigin::exact(origin)),
        None => cors.allow_origin(Any),
    }
}
