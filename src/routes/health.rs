//! Liveness and readiness probes

use serde_json::json;
use std::sync::Arc;

use crate::routes::{error_response, json_ok, RouteResponse};
use crate::server::AppState;

/// Liveness: the process is up and serving
pub fn health_check(state: &Arc<AppState>) -> RouteResponse {
    json_ok(
        "ok",
        json!({
            "status": "ok",
            "node_id": state.args.node_id.to_string(),
            "uptime_seconds": state.started_at.elapsed().as_secs(),
            "store": if state.mongo.is_some() { "mongodb" } else { "memory" },
        }),
    )
}

/// Readiness: the backing store answers. With the in-memory store this is
/// always true.
pub async fn readiness_check(state: &Arc<AppState>) -> RouteResponse {
    if let Some(mongo) = &state.mongo {
        if let Err(err) = mongo.ping().await {
            return error_response(&err);
        }
    }
    json_ok("ready", json!({ "status": "ready" }))
}
