//! Shared fixtures for the integration tests.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use axum::{body::Body, http::Request, Router};
use serde_json::Value;
use tower::ServiceExt;

use vigil::api::{build_router, ApiState};
use vigil::config::DebugConfig;
use vigil::secrets::{InMemorySecretStore, LifecycleSettings, SecretManager};

pub const APP_SECRET: &str = "employee-api-secrets";
pub const DB_SECRET: &str = "employee-api-db-credentials";

/// Store holding both default secrets, without rotation metadata.
pub fn seeded_store() -> Arc<InMemorySecretStore> {
    seed(InMemorySecretStore::new())
}

/// Same as [`seeded_store`], with every value fetch delayed by `latency`.
pub fn slow_store(latency: Duration) -> Arc<InMemorySecretStore> {
    seed(InMemorySecretStore::new().with_latency(latency))
}

fn seed(store: InMemorySecretStore) -> Arc<InMemorySecretStore> {
    store.put_secret(APP_SECRET, [("API_KEY", "app-key-1"), ("DB_HOST", "db.internal")]);
    store.put_secret(DB_SECRET, [("username", "employee_svc"), ("password", "pw-1")]);
    Arc::new(store)
}

pub fn manager(store: &Arc<InMemorySecretStore>) -> SecretManager {
    SecretManager::new(store.clone(), LifecycleSettings::default())
}

pub fn router(manager: &SecretManager, debug: DebugConfig) -> Router {
    build_router(ApiState::new(manager.clone(), debug))
}

pub fn reveal_enabled() -> DebugConfig {
    DebugConfig { enable_routes: true, allow_reveal: true }
}

/// Send one request through the router and decode the JSON body.
pub async fn send_json(router: Router, request: Request<Body>) -> (u16, Value) {
    let response = router.oneshot(request).await.expect("router call");
    let status = response.status().as_u16();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.expect("read body");
    let body = serde_json::from_slice(&bytes).expect("json body");
    (status, body)
}

pub fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).expect("request")
}

pub fn post(uri: &str) -> Request<Body> {
    Request::builder().method("POST").uri(uri).body(Body::empty()).expect("request")
}
