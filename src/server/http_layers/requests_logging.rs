//! Request logging middleware

use super::super::metrics::record_http_request;
use super::super::state::ServerState;
use axum::extract::State;
use axum::{
    body::Body,
    http::{Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::time::Instant;
use tracing::{debug, error, info};

#[derive(PartialEq, PartialOrd, Clone, Debug, clap::ValueEnum)]
pub enum RequestsLoggingLevel {
    None,
    Path,
    Headers,
    Body,
}

impl Default for RequestsLoggingLevel {
    fn default() -> Self {
        Self::Path
    }
}

impl std::fmt::Display for RequestsLoggingLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self)
    }
}

const MAX_LOGGABLE_BODY_LENGTH: usize = 1024;

pub async fn log_requests(
    State(state): State<ServerState>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let level = state.config.requests_logging_level.clone();

    let start = Instant::now();
    let method = request.method().to_string();
    let uri = request.uri().to_string();
    let path = request.uri().path().to_string();

    if level > RequestsLoggingLevel::None {
        info!(">>> {} {}", method, uri);
    }
    if level >= RequestsLoggingLevel::Headers {
        for (name, value) in request.headers() {
            debug!("    {}: {:?}", name, value);
        }
    }

    let request = if level >= RequestsLoggingLevel::Body {
        let (parts, body) = request.into_parts();
        match axum::body::to_bytes(body, usize::MAX).await {
            Ok(bytes) => {
                if bytes.is_empty() {
                    debug!("    body: <empty>");
                } else if bytes.len() <= MAX_LOGGABLE_BODY_LENGTH {
                    debug!("    body: {}", String::from_utf8_lossy(&bytes));
                } else {
                    debug!("    body: <{} bytes>", bytes.len());
                }
                Request::from_parts(parts, Body::from(bytes))
            }
            Err(err) => {
                error!("Failed to buffer request body for logging: {}", err);
                return StatusCode::BAD_REQUEST.into_response();
            }
        }
    } else {
        request
    };

    let response = next.run(request).await;

    let elapsed = start.elapsed();
    if level > RequestsLoggingLevel::None {
        info!(
            "<<< {} {} {} ({}ms)",
            response.status().as_u16(),
            method,
            uri,
            elapsed.as_millis()
        );
    }
    record_http_request(&method, &path, response.status(), elapsed);

    response
}
