//! Plot endpoints

use hyper::body::Incoming;
use hyper::{Method, Request};
use std::sync::Arc;

use crate::auth::perms;
use crate::db::schemas::PlotStatus;
use crate::routes::{
    json_created, json_ok, json_page, not_found, pagination, parse_id, query_param,
    read_json_body, require_identity, respond, RouteResponse,
};
use crate::server::AppState;
use crate::services::plots::{CreatePlotInput, UpdatePlotInput};
use crate::store::PlotFilter;
use crate::types::{LedgerError, Result};

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

fn filter_from_query(req: &Request<Incoming>) -> Result<PlotFilter> {
    let mut filter = PlotFilter::default();
    if let Some(raw) = query_param(req, "colony") {
        filter.colony = Some(parse_id(&raw)?);
    }
    if let Some(raw) = query_param(req, "property") {
        filter.property_id = Some(parse_id(&raw)?);
    }
    if let Some(raw) = query_param(req, "status") {
        let status: PlotStatus = serde_json::from_value(serde_json::Value::String(raw.clone()))
            .map_err(|_| LedgerError::BadRequest(format!("Unknown plot status: {}", raw)))?;
        filter.status = Some(status);
    }
    if let Some(number) = query_param(req, "plot_number") {
        filter.plot_number = Some(number);
    }
    Ok(filter)
}

async fn list(state: Arc<AppState>, req: Request<Incoming>) -> Result<RouteResponse> {
    let identity = require_identity(&state, &req).await?;
    identity.require(perms::PLOT_READ)?;

    let filter = filter_from_query(&req)?;
    let (skip, limit) = pagination(&state, &req)?;
    let page = state.plots.list(&filter, skip, limit).await?;
    Ok(json_page("Plots", &page.items, page.total, skip, limit))
}

async fn create(state: Arc<AppState>, req: Request<Incoming>) -> Result<RouteResponse> {
    let identity = require_identity(&state, &req).await?;
    identity.require(perms::PLOT_CREATE)?;

    let input: CreatePlotInput = read_json_body(req).await?;
    let plot = state.plots.create(input, &identity).await?;
    Ok(json_created("Plot created", plot))
}

async fn get(state: Arc<AppState>, req: Request<Incoming>, id: &str) -> Result<RouteResponse> {
    let identity = require_identity(&state, &req).await?;
    identity.require(perms::PLOT_READ)?;

    let plot = state.plots.get(parse_id(id)?).await?;
    Ok(json_ok("Plot", plot))
}

async fn update(state: Arc<AppState>, req: Request<Incoming>, id: &str) -> Result<RouteResponse> {
    let identity = require_identity(&state, &req).await?;
    identity.require(perms::PLOT_UPDATE)?;

    let id = parse_id(id)?;
    let input: UpdatePlotInput = read_json_body(req).await?;
    let plot = state.plots.update(id, input, &identity).await?;
    Ok(json_ok("Plot updated", plot))
}

async fn delete(state: Arc<AppState>, req: Request<Incoming>, id: &str) -> Result<RouteResponse> {
    let identity = require_identity(&state, &req).await?;
    identity.require(perms::PLOT_DELETE)?;

    state.plots.delete(parse_id(id)?).await?;
    Ok(json_ok("Plot deleted", serde_json::Value::Null))
}
