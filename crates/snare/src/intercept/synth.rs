//! Response synthesis.
//!
//! Renders a stored response definition (status, header text, body) onto the
//! outbound transport. The same path serves rule mocks, relayed upstream
//! responses and the 404/500 fallbacks, so every response the caller sees
//! went through one renderer.

use bytes::Bytes;
use http_body_util::Full;
use hyper::header::{HeaderName, HeaderValue};
use hyper::{Response, StatusCode};
use tracing::warn;

use crate::headers::parse_headers;
use crate::model::MockResponse;

/// Render a status/header-text/body triple as an HTTP response.
///
/// Header pairs the transport rejects (invalid name or value bytes) are
/// skipped with a warning and the remaining headers still apply. No default
/// headers are injected beyond what the definition specifies; content length
/// is handled by the transport.
pub fn render(status_code: u16, header_text: &str, body: &str) -> Response<Full<Bytes>> {
    let mut response = Response::new(Full::new(Bytes::from(body.as_bytes().to_vec())));
    *response.status_mut() =
        StatusCode::from_u16(status_code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

    for (name, value) in parse_headers(header_text) {
        match (
            HeaderName::try_from(name.as_str()),
            HeaderValue::from_str(&value),
        ) {
            (Ok(header_name), Ok(header_value)) => {
                response.headers_mut().append(header_name, header_value);
            }
            _ => {
                warn!(header = %name, "skipping header rejected by the transport");
            }
        }
    }

    response
}

/// Render a rule's canned response.
pub fn render_mock(definition: &MockResponse) -> Response<Full<Bytes>> {
    render(definition.status_code, &definition.headers, &definition.body)
}
