use std::{convert::Infallible, sync::Arc, time::Duration};

use axum::{
    extract::Extension,
    http::StatusCode,
    response::{
        sse::{Event as SseEvent, KeepAlive, Sse},
        IntoResponse, Response,
    },
    Json,
};
use tokio_stream::{
    wrappers::{errors::BroadcastStreamRecvError, BroadcastStream},
    StreamExt,
};

use crate::app::errors;
use crate::app::services::AppServices;
use crate::context::SessionContext;

pub async fn health() -> StatusCode {
    StatusCode::OK
}

pub async fn whoami(Extension(session): Extension<SessionContext>) -> Response {
    let owner = match session.owner() {
        Ok(o) => o,
        Err(e) => return errors::auth_error_to_response(e),
    };
    Json(serde_json::json!({
        "owner_id": owner.as_str(),
        "email": session.email(),
        "expires_at": session.expires_at(),
    }))
    .into_response()
}

/// GET /stream
///
/// Server-Sent Events of the caller's voucher changes (`voucher` events).
/// A `resync` event means notifications were dropped and the client should re-list.
pub async fn stream(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(session): Extension<SessionContext>,
) -> Response {
    let owner = match session.owner() {
        Ok(o) => o,
        Err(e) => return errors::auth_error_to_response(e),
    };

    let rx = services.feed().subscribe();
    let stream = BroadcastStream::new(rx).filter_map(move |msg| match msg {
        Ok(change) if change.owner_id == owner => {
            let data = serde_json::to_string(&change).unwrap_or_else(|_| "{}".to_string());
            Some(Ok::<_, Infallible>(SseEvent::default().event("voucher").data(data)))
        }
        Ok(_) => None,
        Err(BroadcastStreamRecvError::Lagged(missed)) => {
            Some(Ok(SseEvent::default().event("resync").data(missed.to_string())))
        }
    });

    Sse::new(stream)
        .keep_alive(KeepAlive::new().interval(Duration::from_secs(15)))
        .into_response()
}
