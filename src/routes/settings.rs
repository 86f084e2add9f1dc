//! Settings and owners-registry endpoints

use hyper::body::Incoming;
use hyper::{Method, Request};
use std::sync::Arc;

use crate::auth::perms;
use crate::routes::{
    json_ok, not_found, read_json_body, require_identity, respond, RouteResponse,
};
use crate::server::AppState;
use crate::services::settings::UpdateSettingsInput;
use crate::types::Result;

pub async fn handle(
    state: Arc<AppState>,
    req: Request<Incoming>,
    tail: &[String],
) -> RouteResponse {
    match (req.method().clone(), tail) {
        (Method::GET, []) => respond(get(state, req).await),
        (Method::PUT, []) => respond(update(state, req).await),
        (Method::POST, [a, b]) if a == "owners" && b == "sync" => {
            respond(sync_owners(state, req).await)
        }
        _ => not_found(req.uri().path()),
    }
}

async fn get(state: Arc<AppState>, req: Request<Incoming>) -> Result<RouteResponse> {
    let identity = require_identity(&state, &req).await?;
    identity.require(perms::SETTINGS_READ)?;

    let settings = state.settings.get_or_init().await?;
    Ok(json_ok("Settings", settings))
}

async fn update(state: Arc<AppState>, req: Request<Incoming>) -> Result<RouteResponse> {
    let identity = require_identity(&state, &req).await?;
    identity.require(perms::SETTINGS_UPDATE)?;

    let input: UpdateSettingsInput = read_json_body(req).await?;
    let settings = state.settings.update(input).await?;
    Ok(json_ok("Settings updated", settings))
}

/// Push current registry details back out to plot snapshots
async fn sync_owners(state: Arc<AppState>, req: Request<Incoming>) -> Result<RouteResponse> {
    let identity = require_identity(&state, &req).await?;
    identity.require(perms::SETTINGS_UPDATE)?;

    let outcome = state.owner_sync.sync_plots(identity.user_id).await?;
    Ok(json_ok("Owner snapshots synced", outcome))
}
