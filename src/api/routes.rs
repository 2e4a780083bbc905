use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::config::DebugConfig;
use crate::secrets::SecretManager;

use super::handlers::{
    env_secrets_handler, health_handler, refresh_secrets_handler, reveal_secret_handler,
    root_handler,
};

/// Shared state for every handler
#[derive(Debug, Clone)]
pub struct ApiState {
    pub manager: SecretManager,
    pub debug: DebugConfig,
}

impl ApiState {
    pub fn new(manager: SecretManager, debug: DebugConfig) -> Self {
        Self { manager, debug }
    }
}

pub fn build_router(state: ApiState) -> Router {
    let mut router = Router::new()
        .route("/", get(root_handler))
        .route("/health", get(health_handler));

    if state.debug.enable_routes {
        router = router
            .route("/debug/env-secrets", get(env_secrets_handler))
            .route("/debug/refresh-secrets", post(refresh_secrets_handler))
            .route("/debug/secrets/{name}/reveal", get(reveal_secret_handler));
    }

    router
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
