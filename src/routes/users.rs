//! User and role endpoints

use hyper::body::Incoming;
use hyper::{Method, Request};
use std::sync::Arc;

use crate::auth::perms;
use crate::db::schemas::RoleDoc;
use crate::routes::{
    json_created, json_ok, not_found, parse_id, read_json_body, require_identity, respond,
    RouteResponse,
};
use crate::server::AppState;
use crate::services::users::{CreateUserInput, UpdateUserInput};
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
        _ => not_found(req.uri().path()),
    }
}

pub async fn handle_roles(
    state: Arc<AppState>,
    req: Request<Incoming>,
    tail: &[String],
) -> RouteResponse {
    match (req.method().clone(), tail) {
        (Method::GET, []) => respond(list_roles(state, req).await),
        (Method::POST, []) => respond(create_role(state, req).await),
        _ => not_found(req.uri().path()),
    }
}

async fn list(state: Arc<AppState>, req: Request<Incoming>) -> Result<RouteResponse> {
    let identity = require_identity(&state, &req).await?;
    identity.require(perms::USER_READ)?;

    let users = state.users.list().await?;
    let mut views = Vec::with_capacity(users.len());
    for user in &users {
        views.push(state.users.view(user).await?);
    }
    Ok(json_ok("Users", views))
}

async fn create(state: Arc<AppState>, req: Request<Incoming>) -> Result<RouteResponse> {
    let identity = require_identity(&state, &req).await?;
    identity.require(perms::USER_CREATE)?;

    let input: CreateUserInput = read_json_body(req).await?;
    let user = state.users.create(input, identity.user_id).await?;
    let view = state.users.view(&user).await?;
    Ok(json_created("User created", view))
}

async fn get(state: Arc<AppState>, req: Request<Incoming>, id: &str) -> Result<RouteResponse> {
    let identity = require_identity(&state, &req).await?;
    identity.require(perms::USER_READ)?;

    let user = state.users.get(parse_id(id)?).await?;
    let view = state.users.view(&user).await?;
    Ok(json_ok("User", view))
}

async fn update(state: Arc<AppState>, req: Request<Incoming>, id: &str) -> Result<RouteResponse> {
    let identity = require_identity(&state, &req).await?;
    identity.require(perms::USER_UPDATE)?;

    let id = parse_id(id)?;
    let input: UpdateUserInput = read_json_body(req).await?;
    let user = state.users.update(id, input).await?;
    let view = state.users.view(&user).await?;
    Ok(json_ok("User updated", view))
}

async fn list_roles(state: Arc<AppState>, req: Request<Incoming>) -> Result<RouteResponse> {
    let identity = require_identity(&state, &req).await?;
    identity.require(perms::USER_READ)?;

    let roles = state.store.list_roles().await?;
    Ok(json_ok("Roles", roles))
}

async fn create_role(state: Arc<AppState>, req: Request<Incoming>) -> Result<RouteResponse> {
    let identity = require_identity(&state, &req).await?;
    identity.require(perms::USER_CREATE)?;

    let role: RoleDoc = read_json_body(req).await?;
    let id = state
        .store
        .insert_role(RoleDoc::new(role.name, role.permissions))
        .await?;
    let created = state.store.find_role(id).await?;
    Ok(json_created("Role created", created))
}
