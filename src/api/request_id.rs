use std::time::Instant;

use axum::extract::Request;
use axum::http::HeaderValue;
use axum::middleware::Next;
use axum::response::Response;
use tracing::info;
use uuid::Uuid;

pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Tags every response with a request id (inbound value or a fresh UUID) and logs
/// one `request_complete` line per request.
pub async fn request_id_middleware(request: Request, next: Next) -> Response {
    let started = Instant::now();
    let request_id = inbound_request_id(&request).unwrap_or_else(|| {
        let generated = Uuid::new_v4().to_string();
        HeaderValue::from_str(&generated).unwrap_or(HeaderValue::from_static("unknown"))
    });
    let method = request.method().clone();
    let path = request.uri().path().to_string();

    let mut response = next.run(request).await;
    response
        .headers_mut()
        .insert(REQUEST_ID_HEADER, request_id.clone());

    let duration_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
    info!(
        event = "request_complete",
        request_id = request_id.to_str().unwrap_or_default(),
        method = method.as_str(),
        path = path.as_str(),
        status = response.status().as_u16(),
        duration_ms,
        "request complete"
    );

    response
}

fn inbound_request_id(request: &Request) -> Option<HeaderValue> {
    let value = request.headers().get(REQUEST_ID_HEADER)?;
    let text = value.to_str().ok()?.trim();
    if text.is_empty() {
        return None;
    }
    HeaderValue::from_str(text).ok()
}
