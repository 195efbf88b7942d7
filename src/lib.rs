//! Cart API Library
//!
//! Per-user shopping carts over a relational store: add products, fetch a
//! cart, update quantities and remove lines.
#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![allow(elided_lifetimes_in_paths)]
#![warn(clippy::all, clippy::perf, clippy::dbg_macro)]

// Core modules
pub mod auth;
pub mod config;
pub mod db;
pub mod entities;
pub mod errors;
pub mod handlers;
pub mod middleware_helpers;
pub mod migrator;
pub mod openapi;
pub mod repositories;
pub mod services;
pub mod tracing;

use axum::{extract::State, response::Json, routing::get, Router};
use sea_orm::DatabaseConnection;
use serde::Serialize;
use std::sync::Arc;
use utoipa::ToSchema;

use crate::auth::{AuthConfig, Authorizer, GateRouterExt, JwtAuthorizer};
use crate::repositories::DbProductCatalog;

/// Permission scope for the cart routes. Empty: any authenticated caller.
pub const CART_SCOPE: &str = "";

// App state definition
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<DatabaseConnection>,
    pub config: config::AppConfig,
    pub services: handlers::AppServices,
    pub authorizer: Arc<dyn Authorizer>,
}

impl AppState {
    /// Wire the database-backed catalog and the JWT authorizer from config
    pub fn new(db: Arc<DatabaseConnection>, config: config::AppConfig) -> Self {
        let catalog = Arc::new(DbProductCatalog::new(db.clone()));
        let authorizer = Arc::new(JwtAuthorizer::new(AuthConfig::from(&config)));
        Self::with_parts(db, config, catalog, authorizer)
    }

    /// Assemble state from explicit collaborators
    pub fn with_parts(
        db: Arc<DatabaseConnection>,
        config: config::AppConfig,
        catalog: Arc<dyn repositories::ProductCatalog>,
        authorizer: Arc<dyn Authorizer>,
    ) -> Self {
        Self {
            services: handlers::AppServices::new(db.clone(), catalog),
            db,
            config,
            authorizer,
        }
    }
}

/// Version and environment summary served at `/api/v1/status`
#[derive(Debug, Serialize, ToSchema)]
pub struct ApiStatus {
    pub status: &'static str,
    pub service: &'static str,
    pub version: &'static str,
    pub environment: String,
    pub timestamp: String,
}

/// API v1 routes; the cart routes sit behind the authorization gate
pub fn api_v1_routes(authorizer: Arc<dyn Authorizer>) -> Router<Arc<AppState>> {
    Router::new().route("/status", get(api_status)).nest(
        "/cart",
        handlers::commerce::carts_routes().with_gate(authorizer, CART_SCOPE, true),
    )
}

/// Full application router: health, API v1, API docs, request ids and HTTP tracing.
///
/// CORS is environment specific and left to the binary.
pub fn app_router(state: Arc<AppState>) -> Router {
    Router::new()
        .nest("/health", handlers::health::health_routes())
        .nest("/api/v1", api_v1_routes(state.authorizer.clone()))
        .merge(openapi::swagger_ui())
        .layer(crate::tracing::configure_http_tracing())
        // Outermost, so the trace span and error bodies see the id
        .layer(axum::middleware::from_fn(
            middleware_helpers::request_id_middleware,
        ))
        .with_state(state)
}

#[utoipa::path(
    get,
    path = "/api/v1/status",
    summary = "Service status",
    responses((status = 200, description = "Service is up", body = ApiStatus)),
    tag = "Health"
)]
pub async fn api_status(State(state): State<Arc<AppState>>) -> Json<ApiStatus> {
    Json(ApiStatus {
        status: "ok",
        service: "cart-api",
        version: env!("CARGO_PKG_VERSION"),
        environment: state.config.environment.clone(),
        timestamp: chrono::Utc::now().to_rfc3339(),
    })
}
