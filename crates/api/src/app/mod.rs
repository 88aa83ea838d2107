//! HTTP application wiring (Axum router + service wiring).
//!
//! - `services.rs`: store backend, change feed and `VoucherService` wiring
//! - `routes/`: HTTP routes + handlers (one file per area)
//! - `dto.rs`: request/response DTOs and JSON mapping helpers
//! - `errors.rs`: consistent error responses

use std::sync::Arc;

use axum::{routing::get, Extension, Router};
use tower::ServiceBuilder;

use voucherdesk_auth::Hs256TokenValidator;
use voucherdesk_infra::{AnyVoucherStore, AppConfig};

use crate::middleware;

pub mod dto;
pub mod errors;
pub mod routes;
pub mod services;

/// Build the full HTTP router from process configuration (used by `main.rs`).
pub async fn build_app(config: &AppConfig) -> anyhow::Result<Router> {
    let store = AnyVoucherStore::connect(&config.store).await?;
    Ok(build_router(&config.jwt_secret, store, config.change_feed_capacity))
}

/// Build the router over an already-opened store.
pub fn build_router(jwt_secret: &str, store: AnyVoucherStore, change_feed_capacity: usize) -> Router {
    let tokens = Arc::new(Hs256TokenValidator::new(jwt_secret.as_bytes()));
    let auth_state = middleware::AuthState { tokens };

    let services = Arc::new(services::AppServices::new(store, change_feed_capacity));

    // Protected routes: require a valid session.
    let protected = routes::router()
        .layer(Extension(services))
        .layer(axum::middleware::from_fn_with_state(
            auth_state,
            middleware::auth_middleware,
        ));

    Router::new()
        .route("/health", get(routes::system::health))
        .merge(protected)
        .layer(ServiceBuilder::new().layer(axum::middleware::from_fn(middleware::log_requests)))
}
