use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::json;

use voucherdesk_auth::AuthError;
use voucherdesk_core::DomainError;
use voucherdesk_infra::ServiceError;

pub fn service_error_to_response(err: ServiceError) -> axum::response::Response {
    match err {
        ServiceError::Validation(errors) => (
            StatusCode::BAD_REQUEST,
            axum::Json(json!({
                "error": "validation_error",
                "message": errors.to_string(),
                "fields": errors.fields(),
            })),
        )
            .into_response(),
        ServiceError::Domain(e) => domain_error_to_response(e),
        ServiceError::VoucherLocked => json_error(
            StatusCode::CONFLICT,
            "voucher_locked",
            "voucher is submitted and can no longer be edited",
        ),
        ServiceError::NotFound => json_error(StatusCode::NOT_FOUND, "not_found", "voucher not found"),
        ServiceError::NotSubmitted => json_error(
            StatusCode::CONFLICT,
            "not_submitted",
            "only submitted vouchers can be exported",
        ),
        ServiceError::StoreUnavailable(msg) => {
            tracing::error!(error = %msg, "store unavailable");
            json_error(StatusCode::SERVICE_UNAVAILABLE, "store_unavailable", msg)
        }
    }
}

pub fn domain_error_to_response(err: DomainError) -> axum::response::Response {
    match err {
        DomainError::Validation(errors) => service_error_to_response(ServiceError::Validation(errors)),
        DomainError::VoucherLocked => service_error_to_response(ServiceError::VoucherLocked),
        DomainError::InvalidId(msg) => json_error(StatusCode::BAD_REQUEST, "invalid_id", msg),
        DomainError::InvalidStatus(msg) => json_error(
            StatusCode::BAD_REQUEST,
            "invalid_status",
            format!("status must be Draft or Submitted (got '{msg}')"),
        ),
        other => json_error(StatusCode::BAD_REQUEST, "invalid_expense", other.to_string()),
    }
}

pub fn auth_error_to_response(err: AuthError) -> axum::response::Response {
    json_error(StatusCode::UNAUTHORIZED, "unauthorized", err.to_string())
}

pub fn json_error(
    status: StatusCode,
    code: &'static str,
    message: impl Into<String>,
) -> axum::response::Response {
    (
        status,
        axum::Json(json!({
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}
