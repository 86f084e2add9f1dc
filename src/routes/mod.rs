//! HTTP route handlers
//!
//! Every endpoint responds with the same envelope:
//! `{ "success": bool, "message": string, "data": ..., "timestamp": rfc3339 }`.
//! Errors map through [`LedgerError::status_code`].

pub mod auth_routes;
pub mod bookings;
pub mod colonies;
pub mod health;
pub mod plots;
pub mod properties;
pub mod settings;
pub mod users;

use bson::oid::ObjectId;
use bytes::Bytes;
use http_body_util::{BodyExt, Full, Limited};
use hyper::body::Incoming;
use hyper::{Request, Response, StatusCode};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::json;
use std::sync::Arc;
use tracing::warn;

use crate::auth::{extract_token_from_header, Identity};
use crate::server::AppState;
use crate::types::{LedgerError, Result};

pub type RouteResponse = Response<Full<Bytes>>;

/// Largest request body accepted, in bytes
const MAX_BODY_BYTES: usize = 2 * 1024 * 1024;

fn build_json(status: StatusCode, body: serde_json::Value) -> RouteResponse {
    let bytes = serde_json::to_vec(&body).unwrap_or_else(|_| b"{}".to_vec());
    Response::builder()
        .status(status)
        .header("Content-Type", "application/json")
        .header("Access-Control-Allow-Origin", "*")
        .body(Full::new(Bytes::from(bytes)))
        .unwrap_or_default()
}

/// Success envelope
pub fn json_ok<T: Serialize>(message: &str, data: T) -> RouteResponse {
    build_json(
        StatusCode::OK,
        json!({
            "success": true,
            "message": message,
            "data": data,
            "timestamp": chrono::Utc::now().to_rfc3339(),
        }),
    )
}

/// Success envelope with 201 Created
pub fn json_created<T: Serialize>(message: &str, data: T) -> RouteResponse {
    build_json(
        StatusCode::CREATED,
        json!({
            "success": true,
            "message": message,
            "data": data,
            "timestamp": chrono::Utc::now().to_rfc3339(),
        }),
    )
}

/// Error envelope derived from a `LedgerError`
pub fn error_response(err: &LedgerError) -> RouteResponse {
    let status = err.status_code();
    if status.is_server_error() {
        warn!(error = %err, "Request failed");
    }
    build_json(
        status,
        json!({
            "success": false,
            "message": err.to_string(),
            "error": err.code(),
            "timestamp": chrono::Utc::now().to_rfc3339(),
        }),
    )
}

/// Collapse a handler result into a response
pub fn respond(result: Result<RouteResponse>) -> RouteResponse {
    result.unwrap_or_else(|err| error_response(&err))
}

/// CORS preflight response
pub fn cors_preflight() -> RouteResponse {
    Response::builder()
        .status(StatusCode::NO_CONTENT)
        .header("Access-Control-Allow-Origin", "*")
        .header("Access-Control-Allow-Methods", "GET, POST, PUT, DELETE, OPTIONS")
        .header("Access-Control-Allow-Headers", "Content-Type, Authorization")
        .header("Access-Control-Max-Age", "86400")
        .body(Full::new(Bytes::new()))
        .unwrap_or_default()
}

pub fn not_found(path: &str) -> RouteResponse {
    error_response(&LedgerError::NotFound(format!("No route for {}", path)))
}

/// Read and deserialize a JSON request body. The size cap is enforced while
/// reading, so an oversized body is dropped without ever being buffered whole.
pub async fn read_json_body<T, B>(req: Request<B>) -> Result<T>
where
    T: DeserializeOwned,
    B: hyper::body::Body + Send,
    B::Data: Send,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    // Fast reject when the client declares the size up front
    if let Some(declared) = req
        .headers()
        .get(hyper::header::CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<usize>().ok())
    {
        if declared > MAX_BODY_BYTES {
            return Err(LedgerError::BadRequest("Request body too large".into()));
        }
    }

    let body = Limited::new(req.into_body(), MAX_BODY_BYTES)
        .collect()
        .await
        .map_err(|_| LedgerError::BadRequest("Request body too large or unreadable".into()))?
        .to_bytes();

    serde_json::from_slice(&body)
        .map_err(|e| LedgerError::BadRequest(format!("Invalid JSON body: {}", e)))
}

/// Resolve the caller's identity from the Authorization header
pub async fn require_identity(
    state: &Arc<AppState>,
    req: &Request<Incoming>,
) -> Result<Identity> {
    let auth_header = req
        .headers()
        .get("authorization")
        .and_then(|h| h.to_str().ok());
    let token = extract_token_from_header(auth_header)
        .ok_or_else(|| LedgerError::Unauthorized("Missing authorization token".into()))?;

    let validation = state.jwt.verify_token(token);
    let claims = validation
        .claims
        .ok_or_else(|| {
            LedgerError::Unauthorized(
                validation.error.unwrap_or_else(|| "Invalid token".to_string()),
            )
        })?;

    Identity::resolve(state.store.as_ref(), &claims).await
}

/// Parse an ObjectId path segment
pub fn parse_id(segment: &str) -> Result<ObjectId> {
    ObjectId::parse_str(segment)
        .map_err(|_| LedgerError::BadRequest(format!("Invalid id: {}", segment)))
}

/// Extract a query parameter from a request URI
pub fn query_param(req: &Request<Incoming>, name: &str) -> Option<String> {
    let query = req.uri().query()?;
    for param in query.split('&') {
        if let Some((key, value)) = param.split_once('=') {
            if key == name {
                return Some(value.to_string());
            }
        }
    }
    None
}

/// Page/limit query parameters resolved against configured bounds.
/// Pages are 1-based; returns (skip, limit).
pub fn pagination(state: &AppState, req: &Request<Incoming>) -> Result<(u64, i64)> {
    let page: u64 = match query_param(req, "page") {
        Some(raw) => raw
            .parse()
            .map_err(|_| LedgerError::BadRequest("page must be a positive integer".into()))?,
        None => 1,
    };
    if page == 0 {
        return Err(LedgerError::BadRequest("page starts at 1".into()));
    }

    let requested: Option<u32> = match query_param(req, "limit") {
        Some(raw) => Some(raw.parse().map_err(|_| {
            LedgerError::BadRequest("limit must be a positive integer".into())
        })?),
        None => None,
    };
    let limit = state.args.clamp_page_size(requested) as i64;

    Ok(((page - 1) * limit as u64, limit))
}

/// Listing envelope with pagination metadata
pub fn json_page<T: Serialize>(
    message: &str,
    items: &[T],
    total: u64,
    skip: u64,
    limit: i64,
) -> RouteResponse {
    let page = if limit > 0 { skip / limit as u64 + 1 } else { 1 };
    build_json(
        StatusCode::OK,
        json!({
            "success": true,
            "message": message,
            "data": items,
            "pagination": {
                "page": page,
                "limit": limit,
                "total": total,
            },
            "timestamp": chrono::Utc::now().to_rfc3339(),
        }),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn body_within_limit_parses() {
        let req = Request::builder()
            .body(Full::new(Bytes::from_static(b"{\"ok\":true}")))
            .unwrap();
        let value: serde_json::Value = read_json_body(req).await.unwrap();
        assert_eq!(value["ok"], true);
    }

    #[tokio::test]
    async fn oversized_body_is_rejected_while_reading() {
        let payload = vec![b'x'; MAX_BODY_BYTES + 1];
        let req = Request::builder()
            .body(Full::new(Bytes::from(payload)))
            .unwrap();
        let err = read_json_body::<serde_json::Value, _>(req)
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::BadRequest(_)));
    }

    #[tokio::test]
    async fn oversized_declared_length_is_rejected_up_front() {
        let req = Request::builder()
            .header("content-length", (MAX_BODY_BYTES + 1).to_string())
            .body(Full::new(Bytes::new()))
            .unwrap();
        let err = read_json_body::<serde_json::Value, _>(req)
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::BadRequest(_)));
    }
}
