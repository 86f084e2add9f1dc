//! Booking endpoints

use hyper::body::Incoming;
use hyper::{Method, Request};
use serde::Deserialize;
use std::sync::Arc;

use crate::auth::perms;
use crate::db::schemas::BookingStatus;
use crate::routes::{
    json_created, json_ok, json_page, not_found, pagination, parse_id, query_param,
    read_json_body, require_identity, respond, RouteResponse,
};
use crate::server::AppState;
use crate::services::bookings::{CreateBookingInput, UpdateBookingInput};
use crate::store::BookingFilter;
use crate::types::{LedgerError, Result};

#[derive(Debug, Default, Deserialize)]
struct CancelRequest {
    #[serde(default)]
    reason: Option<String>,
}

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
        (Method::POST, [id, action]) if action == "cancel" => {
            respond(cancel(state, req, id).await)
        }
        _ => not_found(req.uri().path()),
    }
}

fn filter_from_query(req: &Request<Incoming>) -> Result<BookingFilter> {
    let mut filter = BookingFilter::default();
    if let Some(raw) = query_param(req, "plot") {
        filter.plot = Some(parse_id(&raw)?);
    }
    if let Some(raw) = query_param(req, "agent") {
        filter.agent = Some(parse_id(&raw)?);
    }
    if let Some(raw) = query_param(req, "status") {
        let status: BookingStatus = serde_json::from_value(serde_json::Value::String(raw.clone()))
            .map_err(|_| LedgerError::BadRequest(format!("Unknown booking status: {}", raw)))?;
        filter.status = Some(status);
    }
    Ok(filter)
}

async fn list(state: Arc<AppState>, req: Request<Incoming>) -> Result<RouteResponse> {
    let identity = require_identity(&state, &req).await?;
    identity.require(perms::BOOKING_READ)?;

    let filter = filter_from_query(&req)?;
    let (skip, limit) = pagination(&state, &req)?;
    let page = state.bookings.list(&filter, skip, limit).await?;
    Ok(json_page("Bookings", &page.items, page.total, skip, limit))
}

async fn create(state: Arc<AppState>, req: Request<Incoming>) -> Result<RouteResponse> {
    let identity = require_identity(&state, &req).await?;
    identity.require(perms::BOOKING_CREATE)?;

    let input: CreateBookingInput = read_json_body(req).await?;
    let booking = state.bookings.create(input, identity.user_id).await?;
    Ok(json_created("Booking created", booking))
}

async fn get(state: Arc<AppState>, req: Request<Incoming>, id: &str) -> Result<RouteResponse> {
    let identity = require_identity(&state, &req).await?;
    identity.require(perms::BOOKING_READ)?;

    let booking = state.bookings.get(parse_id(id)?).await?;
    Ok(json_ok("Booking", booking))
}

async fn update(state: Arc<AppState>, req: Request<Incoming>, id: &str) -> Result<RouteResponse> {
    let identity = require_identity(&state, &req).await?;
    identity.require(perms::BOOKING_UPDATE)?;

    let id = parse_id(id)?;
    let input: UpdateBookingInput = read_json_body(req).await?;
    let booking = state.bookings.update(id, input).await?;
    Ok(json_ok("Booking updated", booking))
}

async fn cancel(state: Arc<AppState>, req: Request<Incoming>, id: &str) -> Result<RouteResponse> {
    let identity = require_identity(&state, &req).await?;
    identity.require(perms::BOOKING_CANCEL)?;

    let id = parse_id(id)?;
    let body: CancelRequest = read_json_body(req).await.unwrap_or_default();
    let booking = state.bookings.cancel(id, body.reason).await?;
    Ok(json_ok("Booking cancelled", booking))
}
