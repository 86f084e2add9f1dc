//! HTTP server
//!
//! hyper http1 with TokioIo, one task per connection. Routing is a flat match
//! on method and path segments; all handlers produce the common response
//! envelope.

use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Method, Request};
use hyper_util::rt::TokioIo;
use std::convert::Infallible;
use std::sync::Arc;
use std::time::Instant;
use tokio::net::TcpListener;
use tracing::{error, info, warn};

use crate::auth::JwtValidator;
use crate::config::Args;
use crate::db::MongoClient;
use crate::routes;
use crate::routes::RouteResponse;
use crate::services::{
    BookingService, ColonyService, OwnerSyncService, PlotService, PropertyService,
    SettingsService, UserService,
};
use crate::store::Store;
use crate::types::LedgerError;

/// Shared application state
pub struct AppState {
    pub args: Args,
    pub store: Arc<dyn Store>,
    pub mongo: Option<MongoClient>,
    pub jwt: JwtValidator,
    pub started_at: Instant,
    pub colonies: ColonyService,
    pub properties: PropertyService,
    pub plots: PlotService,
    pub bookings: BookingService,
    pub users: UserService,
    pub settings: SettingsService,
    pub owner_sync: OwnerSyncService,
}

impl AppState {
    pub fn new(
        args: Args,
        store: Arc<dyn Store>,
        mongo: Option<MongoClient>,
    ) -> Result<Self, LedgerError> {
        let secret = args
            .jwt_secret()
            .ok_or_else(|| LedgerError::Config("JWT_SECRET is required".into()))?;
        let jwt = JwtValidator::new(secret, args.jwt_expiry_seconds)?;

        Ok(Self {
            args,
            jwt,
            mongo,
            colonies: ColonyService::new(store.clone()),
            properties: PropertyService::new(store.clone()),
            plots: PlotService::new(store.clone()),
            bookings: BookingService::new(store.clone()),
            users: UserService::new(store.clone()),
            settings: SettingsService::new(store.clone()),
            owner_sync: OwnerSyncService::new(store.clone()),
            store,
            started_at: Instant::now(),
        })
    }
}

/// Start the HTTP server
pub async fn run(state: Arc<AppState>) -> Result<(), LedgerError> {
    let listener = TcpListener::bind(state.args.listen).await?;

    info!(
        "plotledger listening on {} as node {}",
        state.args.listen, state.args.node_id
    );
    if state.args.dev_mode {
        warn!("Development mode enabled - in-memory store, default JWT secret");
    }

    loop {
        match listener.accept().await {
            Ok((stream, addr)) => {
                let state = Arc::clone(&state);
                tokio::spawn(async move {
                    let io = TokioIo::new(stream);

                    let service = service_fn(move |req| {
                        let state = Arc::clone(&state);
                        async move { Ok::<_, Infallible>(handle_request(state, req).await) }
                    });

                    if let Err(err) = http1::Builder::new().serve_connection(io, service).await {
                        error!("Error serving connection from {}: {:?}", addr, err);
                    }
                });
            }
            Err(e) => {
                error!("Error accepting connection: {:?}", e);
            }
        }
    }
}

/// Route incoming HTTP requests
async fn handle_request(state: Arc<AppState>, req: Request<Incoming>) -> RouteResponse {
    let method = req.method().clone();
    let path = req.uri().path().to_string();

    info!("{} {}", method, path);

    if method == Method::OPTIONS {
        return routes::cors_preflight();
    }

    // Probes live outside the versioned API
    match (method.clone(), path.as_str()) {
        (Method::GET, "/health") | (Method::GET, "/healthz") => {
            return routes::health::health_check(&state)
        }
        (Method::GET, "/ready") | (Method::GET, "/readyz") => {
            return routes::health::readiness_check(&state).await
        }
        _ => {}
    }

    let segments: Vec<String> = path
        .trim_matches('/')
        .split('/')
        .filter(|s| !s.is_empty())
        .map(|s| s.to_string())
        .collect();

    match segments.as_slice() {
        [api, v1, resource, tail @ ..] if api == "api" && v1 == "v1" => {
            let tail = tail.to_vec();
            match resource.as_str() {
                "auth" => routes::auth_routes::handle(state, req, &tail).await,
                "colonies" => routes::colonies::handle(state, req, &tail).await,
                "properties" => routes::properties::handle(state, req, &tail).await,
                "plots" => routes::plots::handle(state, req, &tail).await,
                "bookings" => routes::bookings::handle(state, req, &tail).await,
                "users" => routes::users::handle(state, req, &tail).await,
                "roles" => routes::users::handle_roles(state, req, &tail).await,
                "settings" => routes::settings::handle(state, req, &tail).await,
                _ => routes::not_found(&path),
            }
        }
        _ => routes::not_found(&path),
    }
}
