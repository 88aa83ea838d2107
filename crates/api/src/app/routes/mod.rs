use axum::{routing::get, Router};

pub mod reports;
pub mod system;
pub mod vouchers;

/// Router for all authenticated (owner-scoped) endpoints.
pub fn router() -> Router {
    Router::new()
        .route("/whoami", get(system::whoami))
        .route("/stream", get(system::stream))
        .route("/dashboard", get(reports::dashboard))
        .route("/exports", get(reports::exports))
        .nest("/vouchers", vouchers::router())
}
