use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Query},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};

use voucherdesk_core::{OwnerId, VoucherId};
use voucherdesk_vouchers::{Expense, VoucherFields};

use crate::app::services::AppServices;
use crate::app::{dto, errors};
use crate::context::SessionContext;

pub fn router() -> Router {
    Router::new()
        .route("/", post(create_draft).get(list_vouchers))
        .route("/submit", post(submit_new))
        .route("/:id", get(get_voucher).put(update_draft).delete(delete_voucher))
        .route("/:id/submit", post(submit_existing))
        .route("/:id/statement", get(statement))
}

/// Owner from the session; every handler starts here.
pub(crate) fn owner(session: &SessionContext) -> Result<OwnerId, Response> {
    session.owner().map_err(errors::auth_error_to_response)
}

pub(crate) fn voucher_id(raw: &str) -> Result<VoucherId, Response> {
    VoucherId::parse(raw).map_err(errors::domain_error_to_response)
}

fn resolve(body: &dto::SaveVoucherRequest) -> Result<(VoucherFields, Vec<Expense>), Response> {
    let expenses = body.expenses().map_err(errors::domain_error_to_response)?;
    Ok((body.fields(), expenses))
}

fn saved(status: StatusCode, id: VoucherId) -> Response {
    (status, Json(dto::SavedResponse { id })).into_response()
}

/// GET /vouchers?status=Draft|Submitted
pub async fn list_vouchers(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(session): Extension<SessionContext>,
    Query(query): Query<dto::ListQuery>,
) -> Response {
    let owner = match owner(&session) {
        Ok(o) => o,
        Err(r) => return r,
    };
    let status = match dto::parse_status(query.status.as_deref()) {
        Ok(s) => s,
        Err(e) => return errors::domain_error_to_response(e),
    };

    match services.vouchers().list(&owner, status).await {
        Ok(summaries) => Json(summaries).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

/// POST /vouchers: save a new draft.
pub async fn create_draft(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(session): Extension<SessionContext>,
    Json(body): Json<dto::SaveVoucherRequest>,
) -> Response {
    let owner = match owner(&session) {
        Ok(o) => o,
        Err(r) => return r,
    };
    let (fields, expenses) = match resolve(&body) {
        Ok(v) => v,
        Err(r) => return r,
    };

    match services.vouchers().save_draft(&owner, None, fields, expenses).await {
        Ok(id) => saved(StatusCode::CREATED, id),
        Err(e) => errors::service_error_to_response(e),
    }
}

/// POST /vouchers/submit: create and submit in one step.
pub async fn submit_new(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(session): Extension<SessionContext>,
    Json(body): Json<dto::SaveVoucherRequest>,
) -> Response {
    let owner = match owner(&session) {
        Ok(o) => o,
        Err(r) => return r,
    };
    let (fields, expenses) = match resolve(&body) {
        Ok(v) => v,
        Err(r) => return r,
    };

    match services.vouchers().submit(&owner, None, fields, expenses).await {
        Ok(id) => saved(StatusCode::CREATED, id),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn get_voucher(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(session): Extension<SessionContext>,
    Path(id): Path<String>,
) -> Response {
    let (owner, id) = match owner(&session).and_then(|o| Ok((o, voucher_id(&id)?))) {
        Ok(v) => v,
        Err(r) => return r,
    };

    match services.vouchers().get(&owner, &id).await {
        Ok(voucher) => Json(dto::VoucherResponse::from(&voucher)).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

/// PUT /vouchers/:id: save an existing draft (fields and full expense set).
pub async fn update_draft(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(session): Extension<SessionContext>,
    Path(id): Path<String>,
    Json(body): Json<dto::SaveVoucherRequest>,
) -> Response {
    let (owner, id) = match owner(&session).and_then(|o| Ok((o, voucher_id(&id)?))) {
        Ok(v) => v,
        Err(r) => return r,
    };
    let (fields, expenses) = match resolve(&body) {
        Ok(v) => v,
        Err(r) => return r,
    };

    match services.vouchers().save_draft(&owner, Some(&id), fields, expenses).await {
        Ok(id) => saved(StatusCode::OK, id),
        Err(e) => errors::service_error_to_response(e),
    }
}

/// POST /vouchers/:id/submit
pub async fn submit_existing(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(session): Extension<SessionContext>,
    Path(id): Path<String>,
    Json(body): Json<dto::SaveVoucherRequest>,
) -> Response {
    let (owner, id) = match owner(&session).and_then(|o| Ok((o, voucher_id(&id)?))) {
        Ok(v) => v,
        Err(r) => return r,
    };
    let (fields, expenses) = match resolve(&body) {
        Ok(v) => v,
        Err(r) => return r,
    };

    match services.vouchers().submit(&owner, Some(&id), fields, expenses).await {
        Ok(id) => saved(StatusCode::OK, id),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn delete_voucher(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(session): Extension<SessionContext>,
    Path(id): Path<String>,
) -> Response {
    let (owner, id) = match owner(&session).and_then(|o| Ok((o, voucher_id(&id)?))) {
        Ok(v) => v,
        Err(r) => return r,
    };

    match services.vouchers().remove(&owner, &id).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

/// GET /vouchers/:id/statement: export view; submitted vouchers only.
pub async fn statement(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(session): Extension<SessionContext>,
    Path(id): Path<String>,
) -> Response {
    let (owner, id) = match owner(&session).and_then(|o| Ok((o, voucher_id(&id)?))) {
        Ok(v) => v,
        Err(r) => return r,
    };

    match services.vouchers().statement(&owner, &id).await {
        Ok(statement) => {
            let text = statement.to_text();
            Json(serde_json::json!({ "statement": statement, "text": text })).into_response()
        }
        Err(e) => errors::service_error_to_response(e),
    }
}
