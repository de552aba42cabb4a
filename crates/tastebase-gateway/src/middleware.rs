//! Request middleware.

use axum::{
    body::Body,
    extract::{Request, State},
    http::{HeaderMap, StatusCode, header},
    middleware::Next,
    response::{IntoResponse, Response},
};
use serde_json::Value;

use crate::server::AppState;

/// JSON body parsed by [`parse_json_body`], riding along in request
/// extensions for the forwarder.
#[derive(Debug, Clone)]
pub struct ParsedJson(pub Value);

/// Buffer the request body and, for JSON content types, parse it.
///
/// Once this runs, the raw byte stream the client sent is consumed; the
/// buffered bytes are restored as the request body and the parsed value
/// is stashed in the extensions. A body that fails to parse is forwarded
/// as-is — rejecting malformed JSON is the backend's call, not the
/// gateway's. Bodies over the configured limit are refused here.
pub async fn parse_json_body(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let (mut parts, body) = request.into_parts();

    let bytes = match axum::body::to_bytes(body, state.config.body_limit_bytes).await {
        Ok(bytes) => bytes,
        Err(e) => {
            tracing::debug!(error = %e, "refusing request body");
            return StatusCode::PAYLOAD_TOO_LARGE.into_response();
        }
    };

    if !bytes.is_empty() && is_json_content_type(&parts.headers) {
        match serde_json::from_slice::<Value>(&bytes) {
            Ok(value) => {
                parts.extensions.insert(ParsedJson(value));
            }
            Err(e) => {
                tracing::debug!(error = %e, "request body is not valid JSON, forwarding raw bytes");
            }
        }
    }

    let request = Request::from_parts(parts, Body::from(bytes));
    next.run(request).await
}

fn is_json_content_type(headers: &HeaderMap) -> bool {
    headers
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .map(|ct| ct.split(';').next().unwrap_or(ct).trim())
        .is_some_and(|ct| ct == "application/json" || ct.ends_with("+json"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers_with_content_type(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(header::CONTENT_TYPE, HeaderValue::from_str(value).unwrap());
        headers
    }

    #[test]
    fn json_content_types_are_detected() {
        assert!(is_json_content_type(&headers_with_content_type(
            "application/json"
        )));
        assert!(is_json_content_type(&headers_with_content_type(
            "application/json; charset=utf-8"
        )));
        assert!(is_json_content_type(&headers_with_content_type(
            "application/merge-patch+json"
        )));
        assert!(!is_json_content_type(&headers_with_content_type(
            "text/plain"
        )));
        assert!(!is_json_content_type(&HeaderMap::new()));
    }
}
