// HTTP routes: dashboard API (JWT), agent ingestion (static token), public probes.

mod auth;
mod http;
mod metrics;
mod preferences;
mod system;

use axum::extract::FromRef;
use axum::middleware::from_fn_with_state;
use axum::routing::{get, post};
use axum::Router;
use sqlx::SqlitePool;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

use crate::auth::{AuthGate, StaticTokens, require_static_token, require_user};
use crate::config::AppConfig;
use crate::history_store::HistoryStore;
use crate::preferences_repo::PreferencesRepo;
use crate::sampler::Sampler;
use crate::user_repo::UserRepo;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) history: Arc<HistoryStore>,
    pub(crate) sampler: Arc<dyn Sampler>,
    pub(crate) users: UserRepo,
    pub(crate) prefs: PreferencesRepo,
    pub(crate) auth: Arc<AuthGate>,
    pub(crate) config: AppConfig,
}

impl FromRef<AppState> for Arc<HistoryStore> {
    fn from_ref(state: &AppState) -> Self {
        state.history.clone()
    }
}

pub fn app(
    history: Arc<HistoryStore>,
    sampler: Arc<dyn Sampler>,
    pool: SqlitePool,
    config: AppConfig,
) -> Router {
    let auth = Arc::new(AuthGate::from_config(&config.auth));
    let agent_tokens = Arc::new(StaticTokens::new(config.auth.agent_tokens.clone()));
    let state = AppState {
        history,
        sampler,
        users: UserRepo::new(pool.clone(), config.auth.bcrypt_cost),
        prefs: PreferencesRepo::new(pool),
        auth: auth.clone(),
        config,
    };

    let dashboard = Router::new()
        .route("/metrics/current", get(metrics::current_handler)) // GET /metrics/current
        .route("/metrics/history", get(metrics::history_handler)) // GET /metrics/history?hours=N
        .route("/processes", get(system::processes_handler)) // GET /processes
        .route("/services", get(system::services_handler)) // GET /services
        .route("/apps", get(system::apps_handler)) // GET /apps
        .route("/vps/info", get(system::vps_info_handler)) // GET /vps/info
        .route(
            "/preferences",
            get(preferences::get_handler).put(preferences::put_handler),
        ) // GET, PUT /preferences
        .route_layer(from_fn_with_state(auth, require_user));

    let ingest = Router::new()
        .route("/metrics/push", post(metrics::push_handler)) // POST /metrics/push
        .route_layer(from_fn_with_state(agent_tokens, require_static_token));

    Router::new()
        .route("/", get(http::root_handler)) // GET /
        .route("/health", get(http::health_handler)) // GET /health
        .route("/version", get(http::version_handler)) // GET /version
        .route("/auth/register", post(auth::register_handler)) // POST /auth/register
        .route("/auth/login", post(auth::login_handler)) // POST /auth/login
        .merge(dashboard)
        .merge(ingest)
        .layer(CorsLayer::new().allow_origin(Any).allow_headers(Any).allow_methods(Any))
        .with_state(state)
}

/// Agent pull endpoint: serves the agent's own history to a backend or dashboard holding `token`.
pub fn pull_app(history: Arc<HistoryStore>, token: String) -> Router {
    let tokens = Arc::new(StaticTokens::new([token]));
    let protected = Router::new()
        .route("/metrics/current", get(metrics::current_handler))
        .route("/metrics/history", get(metrics::history_handler))
        .route_layer(from_fn_with_state(tokens, require_static_token));

    Router::new()
        .route("/health", get(http::health_handler))
        .route("/version", get(http::version_handler))
        .merge(protected)
        .with_state(history)
}
