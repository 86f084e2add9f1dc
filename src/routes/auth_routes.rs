//! Login and current-user endpoints

use hyper::body::Incoming;
use hyper::{Method, Request};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use tracing::info;

use crate::routes::{
    json_ok, not_found, read_json_body, require_identity, respond, RouteResponse,
};
use crate::server::AppState;
use crate::services::users::UserView;
use crate::types::{LedgerError, Result};

#[derive(Debug, Deserialize)]
struct LoginRequest {
    email: String,
    password: String,
}

pub async fn handle(
    state: Arc<AppState>,
    req: Request<Incoming>,
    tail: &[String],
) -> RouteResponse {
    match (req.method().clone(), tail) {
        (Method::POST, [action]) if action == "login" => respond(login(state, req).await),
        (Method::GET, [action]) if action == "me" => respond(me(state, req).await),
        _ => not_found(req.uri().path()),
    }
}

async fn login(state: Arc<AppState>, req: Request<Incoming>) -> Result<RouteResponse> {
    let body: LoginRequest = read_json_body(req).await?;
    let (user, role) = state.users.authenticate(&body.email, &body.password).await?;

    let user_id = user
        ._id
        .ok_or_else(|| LedgerError::Internal("User has no id".into()))?;
    let token = state
        .jwt
        .generate_token(&user_id.to_hex(), &user.email, &role.name)?;

    info!(user = %user_id, role = %role.name, "User logged in");

    Ok(json_ok(
        "Logged in",
        json!({
            "token": token,
            "user": UserView::from_doc(&user, Some(role.name)),
        }),
    ))
}

async fn me(state: Arc<AppState>, req: Request<Incoming>) -> Result<RouteResponse> {
    let identity = require_identity(&state, &req).await?;
    let user = state.users.get(identity.user_id).await?;

    Ok(json_ok(
        "Current user",
        json!({
            "user": UserView::from_doc(&user, Some(identity.role_name.clone())),
            "permissions": identity.permissions,
        }),
    ))
}
