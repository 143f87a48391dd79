//! Per-request orchestration.
//!
//! Each accepted request flows record -> match -> (mock | forward | 404) ->
//! respond. Anything that errors inside that pipeline is caught at the
//! single outer boundary and turned into a plain 500, so the client always
//! receives a well-formed response.

use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::body::Incoming;
use hyper::header::HOST;
use hyper::{Request, Response, StatusCode};
use std::convert::Infallible;
use std::sync::Arc;
use tracing::{debug, error};

use super::forwarder::Forwarder;
use super::synth::{render, render_mock};
use super::target::ProxyTarget;
use crate::conditions::NetworkConditions;
use crate::matcher::RuleMatcher;
use crate::model::{HttpRequestRecord, HttpResponseRecord, InboundRequest};
use crate::recorder::ExchangeRecorder;

/// Shared state for the interception pipeline, one instance per listening
/// endpoint.
pub struct Interceptor {
    pub matcher: RuleMatcher,
    pub recorder: ExchangeRecorder,
    pub forwarder: Forwarder,
    pub target: Arc<ProxyTarget>,
    pub conditions: Option<NetworkConditions>,
}

impl Interceptor {
    pub fn new(
        matcher: RuleMatcher,
        recorder: ExchangeRecorder,
        forwarder: Forwarder,
        target: Arc<ProxyTarget>,
        conditions: Option<NetworkConditions>,
    ) -> Self {
        Self {
            matcher,
            recorder,
            forwarder,
            target,
            conditions,
        }
    }
}

/// Entry point wired into `service_fn`. Infallible: every internal error
/// becomes a 500 here and the connection is still answered.
pub async fn handle_request(
    req: Request<Incoming>,
    interceptor: Arc<Interceptor>,
) -> Result<Response<Full<Bytes>>, Infallible> {
    let method = req.method().to_string();
    let uri = req.uri().to_string();

    match intercept(req, &interceptor).await {
        Ok(response) => Ok(response),
        Err(e) => {
            error!(method = %method, uri = %uri, error = %e, "request handling failed");
            let mut response =
                Response::new(Full::new(Bytes::from_static(b"internal server error")));
            *response.status_mut() = StatusCode::INTERNAL_SERVER_ERROR;
            Ok(response)
        }
    }
}

async fn intercept(
    req: Request<Incoming>,
    interceptor: &Interceptor,
) -> anyhow::Result<Response<Full<Bytes>>> {
    // Snapshot once; the target may change concurrently but a single request
    // must observe a single value.
    let target = interceptor.target.get();

    let inbound = buffer_request(req).await?;
    let inbound_id = interceptor
        .recorder
        .record_request(HttpRequestRecord::observed(
            &inbound.method,
            &inbound.url,
            inbound.header_text(),
            inbound.body.clone(),
        ))
        .await?;

    let response = if let Some(rule) = interceptor.matcher.find_match(&inbound).await? {
        debug!(rule = %rule.name, method = %inbound.method, url = %inbound.url, "serving mock");
        interceptor
            .recorder
            .record_response(
                Some(inbound_id),
                rule.response.status_code,
                &rule.response.headers,
                &rule.response.body,
            )
            .await?;
        render_mock(&rule.response)
    } else if !target.is_empty() {
        let record = interceptor
            .forwarder
            .forward(&inbound, inbound_id, &target)
            .await?;
        render_record(&record)
    } else {
        debug!(method = %inbound.method, url = %inbound.url, "no rule matched, no proxy target");
        let body = format!(
            "No matching rule found for {} {}",
            inbound.method, inbound.url
        );
        let record = interceptor
            .recorder
            .record_response(Some(inbound_id), 404, "Content-Type: text/plain", &body)
            .await?;
        render_record(&record)
    };

    if let Some(ref conditions) = interceptor.conditions {
        conditions.apply().await;
    }

    Ok(response)
}

fn render_record(record: &HttpResponseRecord) -> Response<Full<Bytes>> {
    render(record.status_code, &record.headers, &record.body)
}

/// Buffer the whole request up front: the recorder needs the body either
/// way, and buffering keeps the matcher free of streaming concerns.
async fn buffer_request(req: Request<Incoming>) -> anyhow::Result<InboundRequest> {
    let method = req.method().to_string();
    let uri = req.uri().clone();

    let host = uri
        .authority()
        .map(|a| a.to_string())
        .or_else(|| {
            req.headers()
                .get(HOST)
                .and_then(|v| v.to_str().ok())
                .map(String::from)
        })
        .unwrap_or_else(|| "localhost".to_string());

    let path = uri.path().to_string();
    let query = uri.query().unwrap_or("").to_string();
    let url = if uri.scheme().is_some() {
        uri.to_string()
    } else {
        let path_and_query = uri
            .path_and_query()
            .map(|pq| pq.as_str().to_string())
            .unwrap_or_else(|| "/".to_string());
        format!("http://{host}{path_and_query}")
    };

    let headers: Vec<(String, String)> = req
        .headers()
        .iter()
        .map(|(name, value)| {
            (
                name.as_str().to_string(),
                value.to_str().unwrap_or("").to_string(),
            )
        })
        .collect();

    let body_bytes = req.into_body().collect().await?.to_bytes();
    let body = String::from_utf8_lossy(&body_bytes).to_string();

    Ok(InboundRequest {
        method,
        url,
        path,
        query,
        headers,
        body,
    })
}
