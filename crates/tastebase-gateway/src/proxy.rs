//! Request forwarder for the `/api` prefix.

use axum::{
    body::Body,
    extract::State,
    http::{HeaderMap, HeaderValue, Request, Uri, header},
    response::Response,
};
use metrics::counter;
use serde_json::Value;
use tracing::{debug, instrument, warn};

use crate::error::GatewayError;
use crate::middleware::ParsedJson;
use crate::server::AppState;

/// Forward an inbound `/api/...` request to the backend target.
///
/// The `/api` prefix is stripped, hop-by-hop headers are filtered, and
/// the backend's status, headers and body come back verbatim. When the
/// body middleware has already consumed and parsed the request body, the
/// parsed value is re-serialized for the outbound request; otherwise the
/// buffered bytes go through unmodified. Transport failures map to a 502
/// with a structured body and never escape as a process fault.
#[instrument(skip_all, fields(http.method = %request.method(), http.target = %request.uri()))]
pub async fn forward(
    State(state): State<AppState>,
    request: Request<Body>,
) -> Result<Response, GatewayError> {
    let method = request.method().clone();
    let target = target_url(&state.config.backend_target, request.uri());
    let mut headers = filter_headers(request.headers());

    let parsed = request.extensions().get::<ParsedJson>().cloned();
    let raw_body = axum::body::to_bytes(request.into_body(), state.config.body_limit_bytes)
        .await
        .map_err(|e| GatewayError::Internal(format!("failed to read request body: {e}")))?;

    let body = match rebuild_body(parsed.as_ref().map(|p| &p.0)) {
        Some(encoded) => {
            headers.insert(
                header::CONTENT_TYPE,
                HeaderValue::from_static("application/json"),
            );
            headers.insert(header::CONTENT_LENGTH, HeaderValue::from(encoded.len()));
            encoded
        }
        None => raw_body.to_vec(),
    };

    debug!(target = %target, "forwarding request");

    let backend_request = state
        .client
        .request(method, &target)
        .headers(headers)
        .body(body)
        .build()
        .map_err(|e| GatewayError::Internal(format!("failed to build backend request: {e}")))?;

    let backend_response = state.client.execute(backend_request).await.map_err(|e| {
        counter!("gateway_backend_failures_total").increment(1);
        if e.is_timeout() {
            GatewayError::Proxy(format!(
                "backend timed out after {} seconds",
                state.config.timeout_secs
            ))
        } else if e.is_connect() {
            GatewayError::Proxy(format!("failed to connect to backend: {e}"))
        } else {
            GatewayError::Proxy(format!("backend request failed: {e}"))
        }
    })?;

    let status = backend_response.status();
    debug!(status = %status, "backend responded");
    counter!("gateway_forwarded_total").increment(1);

    let mut builder = Response::builder().status(status);
    for (name, value) in backend_response.headers() {
        if !is_hop_by_hop_header(name.as_str()) {
            builder = builder.header(name, value);
        }
    }

    let response_body = backend_response
        .bytes()
        .await
        .map_err(|e| GatewayError::Proxy(format!("failed to read backend response: {e}")))?;

    builder
        .body(Body::from(response_body))
        .map_err(|e| GatewayError::Internal(format!("failed to build response: {e}")))
}

/// Rewrite `/api/recipes?limit=2` into `<backend>/recipes?limit=2`.
fn target_url(base: &str, uri: &Uri) -> String {
    let path = uri.path().strip_prefix("/api").unwrap_or(uri.path());
    let path = if path.is_empty() { "/" } else { path };
    let base = base.trim_end_matches('/');
    match uri.query() {
        Some(query) => format!("{base}{path}?{query}"),
        None => format!("{base}{path}"),
    }
}

/// Choose the outbound body encoding.
///
/// The raw stream is gone once upstream middleware parsed it, so a
/// non-empty parsed body is re-serialized to canonical JSON. An empty
/// object, or no parsed body at all, means the buffered bytes are the
/// ones to send. Re-serialization failure is logged and forwarding falls
/// back to the raw bytes; transport error handling remains the backstop.
fn rebuild_body(parsed: Option<&Value>) -> Option<Vec<u8>> {
    let value = parsed?;
    if value.as_object().is_some_and(|map| map.is_empty()) {
        return None;
    }
    match serde_json::to_vec(value) {
        Ok(encoded) => Some(encoded),
        Err(e) => {
            warn!(error = %e, "failed to re-serialize parsed request body, forwarding raw bytes");
            None
        }
    }
}

/// Copy request headers, dropping the ones that must not cross the hop.
fn filter_headers(incoming: &HeaderMap) -> HeaderMap {
    let mut headers = HeaderMap::new();
    for (name, value) in incoming {
        if is_hop_by_hop_header(name.as_str()) {
            debug!(header = %name, "skipping hop-by-hop header");
            continue;
        }
        headers.insert(name.clone(), value.clone());
    }
    headers
}

/// Hop-by-hop headers as defined in RFC 2616 Section 13.5.1, plus `host`
/// (the backend sees its own host, not the gateway's).
fn is_hop_by_hop_header(name: &str) -> bool {
    matches!(
        name.to_lowercase().as_str(),
        "connection"
            | "keep-alive"
            | "proxy-authenticate"
            | "proxy-authorization"
            | "te"
            | "trailers"
            | "transfer-encoding"
            | "upgrade"
            | "host"
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_is_hop_by_hop_header() {
        assert!(is_hop_by_hop_header("Connection"));
        assert!(is_hop_by_hop_header("Transfer-Encoding"));
        assert!(is_hop_by_hop_header("host"));
        assert!(!is_hop_by_hop_header("Content-Type"));
        assert!(!is_hop_by_hop_header("Authorization"));
    }

    #[test]
    fn target_url_strips_prefix_and_keeps_query() {
        let base = "http://localhost:3001";
        let uri: Uri = "/api/recipes?limit=2".parse().unwrap();
        assert_eq!(target_url(base, &uri), "http://localhost:3001/recipes?limit=2");

        let uri: Uri = "/api".parse().unwrap();
        assert_eq!(target_url(base, &uri), "http://localhost:3001/");

        let uri: Uri = "/api/".parse().unwrap();
        assert_eq!(target_url(base, &uri), "http://localhost:3001/");
    }

    #[test]
    fn target_url_tolerates_trailing_slash_on_base() {
        let uri: Uri = "/api/users/5".parse().unwrap();
        assert_eq!(
            target_url("http://localhost:3001/", &uri),
            "http://localhost:3001/users/5"
        );
    }

    #[test]
    fn rebuild_body_reserializes_parsed_objects() {
        let parsed = json!({"email": "a@b.com", "pass": "x"});

        let encoded = rebuild_body(Some(&parsed)).expect("re-serialized");
        let round_tripped: Value = serde_json::from_slice(&encoded).unwrap();
        assert_eq!(round_tripped, parsed);
    }

    #[test]
    fn rebuild_body_skips_empty_or_absent_bodies() {
        assert!(rebuild_body(Some(&json!({}))).is_none());
        assert!(rebuild_body(None).is_none());
    }

    #[test]
    fn filter_headers_keeps_end_to_end_headers() {
        let mut incoming = HeaderMap::new();
        incoming.insert("authorization", HeaderValue::from_static("Bearer token"));
        incoming.insert("connection", HeaderValue::from_static("keep-alive"));
        incoming.insert("host", HeaderValue::from_static("gateway.local"));

        let filtered = filter_headers(&incoming);
        assert_eq!(
            filtered.get("authorization").unwrap(),
            "Bearer token"
        );
        assert!(filtered.get("connection").is_none());
        assert!(filtered.get("host").is_none());
    }
}
