use std::sync::Arc;

use axum::{
    extract::Extension,
    response::{IntoResponse, Response},
    Json,
};

use crate::app::errors;
use crate::app::routes::vouchers::owner;
use crate::app::services::AppServices;
use crate::context::SessionContext;

/// GET /dashboard
pub async fn dashboard(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(session): Extension<SessionContext>,
) -> Response {
    let owner = match owner(&session) {
        Ok(o) => o,
        Err(r) => return r,
    };
    match services.vouchers().dashboard(&owner).await {
        Ok(stats) => Json(stats).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

/// GET /exports: submitted vouchers available for export.
pub async fn exports(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(session): Extension<SessionContext>,
) -> Response {
    let owner = match owner(&session) {
        Ok(o) => o,
        Err(r) => return r,
    };
    match services.vouchers().exportable(&owner).await {
        Ok(summaries) => Json(summaries).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}
