//! Colony endpoints

use hyper::body::Incoming;
use hyper::{Method, Request};
use std::sync::Arc;

use crate::auth::perms;
use crate::routes::{
    json_created, json_ok, not_found, parse_id, read_json_body, require_identity, respond,
    RouteResponse,
};
use crate::server::AppState;
use crate::services::colonies::{CreateColonyInput, UpdateColonyInput};
use crate::types::Result;

pub async fn handle(
    state: Arc<AppState>,
    req: Request<Incoming>,
    tail: &[String],
) -> RouteResponse {
    match (req.method().clone(), tail) {
        (Method::GET, []) => respond(list(state, req).await),
        (Method::POST, []) => respond(create(state, req).await),
        (Method::GET, [id]) => respond(get(state, req, id).await),
        (Method::PUT, [id]) => respond(update(state, req, id).await),
        (Method::DELETE, [id]) => respond(delete(state, req, id).await),
        (Method::POST, [id, action]) if action == "recount" => {
            respond(recount(state, req, id).await)
        }
        _ => not_found(req.uri().path()),
    }
}

async fn list(state: Arc<AppState>, req: Request<Incoming>) -> Result<RouteResponse> {
    let identity = require_identity(&state, &req).await?;
    identity.require(perms::COLONY_READ)?;

    let colonies = state.colonies.list().await?;
    Ok(json_ok("Colonies", colonies))
}

async fn create(state: Arc<AppState>, req: Request<Incoming>) -> Result<RouteResponse> {
    let identity = require_identity(&state, &req).await?;
    identity.require(perms::COLONY_CREATE)?;

    let input: CreateColonyInput = read_json_body(req).await?;
    let colony = state.colonies.create(input, identity.user_id).await?;
    Ok(json_created("Colony created", colony))
}

async fn get(state: Arc<AppState>, req: Request<Incoming>, id: &str) -> Result<RouteResponse> {
    let identity = require_identity(&state, &req).await?;
    identity.require(perms::COLONY_READ)?;

    let colony = state.colonies.get(parse_id(id)?).await?;
    Ok(json_ok("Colony", colony))
}

async fn update(state: Arc<AppState>, req: Request<Incoming>, id: &str) -> Result<RouteResponse> {
    let identity = require_identity(&state, &req).await?;
    identity.require(perms::COLONY_UPDATE)?;

    let id = parse_id(id)?;
    let input: UpdateColonyInput = read_json_body(req).await?;
    let colony = state.colonies.update(id, input).await?;
    Ok(json_ok("Colony updated", colony))
}

async fn delete(state: Arc<AppState>, req: Request<Incoming>, id: &str) -> Result<RouteResponse> {
    let identity = require_identity(&state, &req).await?;
    identity.require(perms::COLONY_DELETE)?;

    state.colonies.delete(parse_id(id)?).await?;
    Ok(json_ok("Colony deleted", serde_json::Value::Null))
}

/// Force a recount of the cached plot counts
async fn recount(state: Arc<AppState>, req: Request<Incoming>, id: &str) -> Result<RouteResponse> {
    let identity = require_identity(&state, &req).await?;
    identity.require(perms::COLONY_UPDATE)?;

    let counts = state.colonies.recount(parse_id(id)?).await?;
    Ok(json_ok("Colony recounted", counts))
}
