use std::sync::Arc;

use axum::http::Method;
use axum::routing::{delete, get, post, put};
use axum::Router;
use sqlx::SqlitePool;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::authz::{DefaultPolicyEvaluator, PolicyEvaluator};
use crate::errors::AppError;
use crate::events::{self, EventBus};
use crate::jwt::JwtConfig;
use crate::routes::{admin, documents, health, me, registrations};
use crate::services::PermissionService;
use crate::store::SqliteActorStore;

#[derive(Clone)]
pub struct AppState {
    pub pool: SqlitePool,
    pub jwt: Arc<JwtConfig>,
    pub actors: Arc<SqliteActorStore>,
    pub permissions: PermissionService,
    pub evaluator: Arc<dyn PolicyEvaluator>,
    pub event_bus: EventBus,
}

impl AppState {
    pub fn new(pool: SqlitePool, jwt: JwtConfig, event_bus: EventBus) -> Self {
        let actors = Arc::new(SqliteActorStore::new(pool.clone()));
        Self {
            permissions: PermissionService::new(actors.clone()),
            actors,
            pool,
            jwt: Arc::new(jwt),
            evaluator: Arc::new(DefaultPolicyEvaluator::new()),
            event_bus,
        }
    }
}

/// Builds the router with JWT settings taken from the environment.
pub async fn create_app(pool: SqlitePool) -> Result<Router, AppError> {
    let jwt_config = JwtConfig::from_env()?;
    Ok(build_app(pool, jwt_config))
}

/// Builds the router and starts the audit listener on the current runtime.
pub fn build_app(pool: SqlitePool, jwt: JwtConfig) -> Router {
    let (event_bus, rx) = events::init_event_bus();
    tokio::spawn(events::start_audit_listener(rx, pool.clone()));

    let state = AppState::new(pool, jwt, event_bus);

    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::OPTIONS])
        .allow_origin(Any)
        .allow_headers(Any);

    let document_routes = Router::new()
        .route("/", get(documents::list_documents))
        .route("/", post(documents::create_document))
        .route("/:id", get(documents::get_document))
        .route("/:id", put(documents::update_document))
        .route("/:id", delete(documents::delete_document));

    let registration_routes = Router::new()
        .route("/", get(registrations::list_registrations))
        .route("/", post(registrations::create_registration))
        .route("/:id", get(registrations::get_registration))
        .route("/:id", put(registrations::update_registration))
        .route("/:id", delete(registrations::delete_registration))
        .route("/:id/approve", post(registrations::approve_registration))
        .route("/:id/reject", post(registrations::reject_registration));

    let admin_routes = Router::new()
        .route("/actors/:id", get(admin::get_actor))
        .route("/actors/:id/permissions", post(admin::grant_permission))
        .route("/actors/:id/permissions/:permission", delete(admin::revoke_permission))
        .route("/actors/:id/role", put(admin::set_role))
        .route("/audit-logs", get(admin::list_audit_logs));

    Router::new()
        .route("/api/health", get(health::health))
        .route("/me", get(me::me))
        .nest("/documents", document_routes)
        .nest("/registrations", registration_routes)
        .nest("/admin", admin_routes)
        .with_state(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}
