use axum::routing::get;
use axum::{Json, Router};
use serde_json::{json, Value};

/// Health/version surface standing in for the thrift handler's health/version
/// RPCs. Grounded on `skynet-gateway::http::health`.
pub fn router() -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/version", get(version))
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

async fn version() -> Json<Value> {
    Json(json!({
        "service": persist_core::SERVICE_IDENTITY,
        "version": env!("CARGO_PKG_VERSION"),
    }))
}
