use axum::{extract::State, Json};
use serde_json::{json, Value};

use super::AppState;

pub async fn health(State(s): State<AppState>) -> Json<Value> {
    let status = if s.health.is_degraded() { "degraded" } else { "healthy" };
    Json(json!({
        "status": status,
        "service": "storefront",
        "storage": if s.health.is_durable() { "postgres" } else { "memory" },
        "durable": s.health.is_durable(),
    }))
}
