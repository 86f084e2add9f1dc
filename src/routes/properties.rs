//! Property endpoints

use hyper::body::Incoming;
use hyper::{Method, Request};
use std::sync::Arc;

use crate::routes::{
    json_created, json_ok, not_found, parse_id, query_param, read_json_body, require_identity,
    respond, RouteResponse,
};
use crate::auth::perms;
use crate::server::AppState;
use crate::services::properties::{CreatePropertyInput, UpdatePropertyInput};
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
        _ => not_found(req.uri().path()),
    }
}

async fn list(state: Arc<AppState>, req: Request<Incoming>) -> Result<RouteResponse> {
    let identity = require_identity(&state, &req).await?;
    identity.require(perms::PROPERTY_READ)?;

    let colony = match query_param(&req, "colony") {
        Some(raw) => Some(parse_id(&raw)?),
        None => None,
    };
    let properties = state.properties.list(colony).await?;
    Ok(json_ok("Properties", properties))
}

async fn create(state: Arc<AppState>, req: Request<Incoming>) -> Result<RouteResponse> {
    let identity = require_identity(&state, &req).await?;
    identity.require(perms::PROPERTY_CREATE)?;

    let input: CreatePropertyInput = read_json_body(req).await?;
    let property = state.properties.create(input, identity.user_id).await?;
    Ok(json_created("Property created", property))
}

async fn get(state: Arc<AppState>, req: Request<Incoming>, id: &str) -> Result<RouteResponse> {
    let identity = require_identity(&state, &req).await?;
    identity.require(perms::PROPERTY_READ)?;

    let property = state.properties.get(parse_id(id)?).await?;
    Ok(json_ok("Property", property))
}

async fn update(state: Arc<AppState>, req: Request<Incoming>, id: &str) -> Result<RouteResponse> {
    let identity = require_identity(&state, &req).await?;
    identity.require(perms::PROPERTY_UPDATE)?;

    let id = parse_id(id)?;
    let input: UpdatePropertyInput = read_json_body(req).await?;
    let property = state.properties.update(id, input).await?;
    Ok(json_ok("Property updated", property))
}

async fn delete(state: Arc<AppState>, req: Request<Incoming>, id: &str) -> Result<RouteResponse> {
    let identity = require_identity(&state, &req).await?;
    identity.require(perms::PROPERTY_DELETE)?;

    state.properties.delete(parse_id(id)?).await?;
    Ok(json_ok("Property deleted", serde_json::Value::Null))
}
