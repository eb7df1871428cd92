//! Admission middleware.
//! Rejects callers that have used up their window before any handler runs.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::{header, HeaderValue, Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::security::{client_key, AdmissionGate};

/// Middleware function for per-caller admission.
pub async fn admission_middleware(
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    State(gate): State<Arc<AdmissionGate>>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let key = client_key(&addr);

    if gate.try_admit(&key) {
        return next.run(request).await;
    }

    tracing::warn!(client = %key, path = %request.uri().path(), "Admission limit exceeded");
    let retry_after = gate.retry_after(&key).unwrap_or_else(|| gate.window());
    let mut response = (StatusCode::TOO_MANY_REQUESTS, "Too many requests").into_response();
    // Round up so clients never retry before the window opens.
    let secs = retry_after.as_secs() + u64::from(retry_after.subsec_nanos() > 0);
    response
        .headers_mut()
        .insert(header::RETRY_AFTER, HeaderValue::from(secs));
    response
}
