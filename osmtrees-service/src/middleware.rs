//! Request timing middleware.

use std::time::Instant;

use axum::{
    extract::Request,
    http::{HeaderName, HeaderValue},
    middleware::Next,
    response::Response,
};

/// Response header carrying the handling time in seconds.
pub static PROCESS_TIME_HEADER: HeaderName = HeaderName::from_static("x-process-time");

/// Time each request, log it and report the elapsed seconds in
/// `X-Process-Time`.
pub async fn process_time(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let start = Instant::now();

    let mut response = next.run(request).await;

    let elapsed = start.elapsed().as_secs_f64();
    if let Ok(value) = HeaderValue::from_str(&format!("{:.6}", elapsed)) {
        response
            .headers_mut()
            .insert(PROCESS_TIME_HEADER.clone(), value);
    }

    tracing::info!(
        method = %method,
        path = %path,
        status = response.status().as_u16(),
        elapsed_secs = elapsed,
        "Handled request"
    );

    response
}
