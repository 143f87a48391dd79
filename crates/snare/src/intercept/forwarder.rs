//! Upstream forwarding.
//!
//! Builds an equivalent outbound request against the configured target
//! domain, relays the real response, and records both sides of the round
//! trip. Rules are re-checked first, so a matching rule pre-empts the
//! network call even when a target is configured.

use reqwest::Client;
use std::time::Duration;
use tracing::{debug, warn};

use crate::headers::format_header_map;
use crate::matcher::RuleMatcher;
use crate::model::{HttpRequestRecord, HttpResponseRecord, InboundRequest};
use crate::recorder::ExchangeRecorder;
use crate::store::StoreError;

#[derive(Clone)]
pub struct Forwarder {
    matcher: RuleMatcher,
    recorder: ExchangeRecorder,
    client: Client,
}

impl Forwarder {
    pub fn new(matcher: RuleMatcher, recorder: ExchangeRecorder) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(10))
            // Stale pooled connections surface as spurious upstream errors
            .pool_max_idle_per_host(0)
            .build()?;
        Ok(Self {
            matcher,
            recorder,
            client,
        })
    }

    /// Forward the request to `target` and return the recorded response.
    ///
    /// A matching rule short-circuits forwarding entirely: its mock is
    /// recorded against the inbound request id and returned with no network
    /// call. Network failures are converted into a recorded 502, never an
    /// error to the caller.
    pub async fn forward(
        &self,
        request: &InboundRequest,
        inbound_id: u64,
        target: &str,
    ) -> Result<HttpResponseRecord, StoreError> {
        if let Some(rule) = self.matcher.find_match(request).await? {
            debug!(rule = %rule.name, "rule pre-empts forwarding");
            return self
                .recorder
                .record_response(
                    Some(inbound_id),
                    rule.response.status_code,
                    &rule.response.headers,
                    &rule.response.body,
                )
                .await;
        }

        let upstream_url = upstream_url(target, &request.path, &request.query);
        debug!(method = %request.method, url = %upstream_url, "forwarding to upstream");

        // The outbound record exists even if the network call fails.
        let outbound_id = self
            .recorder
            .record_request(HttpRequestRecord::proxied(
                &request.method,
                &upstream_url,
                request.header_text(),
                request.body.clone(),
                target,
            ))
            .await?;

        let method = reqwest::Method::from_bytes(request.method.as_bytes())
            .unwrap_or(reqwest::Method::GET);
        let mut outbound = self.client.request(method, upstream_url.as_str());

        // Host and Content-Length are transport-managed, recomputed by the
        // client rather than forwarded verbatim.
        for (name, value) in &request.headers {
            let lower = name.to_lowercase();
            if lower != "host" && lower != "content-length" {
                outbound = outbound.header(name.as_str(), value.as_str());
            }
        }

        if !request.body.is_empty() {
            outbound = outbound.body(request.body.clone());
        }

        match outbound.send().await {
            Ok(upstream) => {
                let status = upstream.status().as_u16();
                let headers = format_header_map(upstream.headers());
                // A body cut off mid-stream is a network failure like any
                // other, even though the status line already arrived.
                match upstream.text().await {
                    Ok(body) => {
                        self.recorder
                            .record_response(Some(outbound_id), status, &headers, &body)
                            .await
                    }
                    Err(e) => {
                        warn!(url = %upstream_url, error = %e, "failed to read upstream response body");
                        self.record_upstream_failure(outbound_id, &e).await
                    }
                }
            }
            Err(e) => {
                warn!(url = %upstream_url, error = %e, "upstream call failed");
                self.record_upstream_failure(outbound_id, &e).await
            }
        }
    }

    /// Persist and return the synthesized 502 that stands in for the real
    /// upstream response when the round trip fails.
    async fn record_upstream_failure(
        &self,
        outbound_id: u64,
        error: &reqwest::Error,
    ) -> Result<HttpResponseRecord, StoreError> {
        let body = format!(r#"{{"error": "upstream request failed: {error}"}}"#);
        self.recorder
            .record_response(
                Some(outbound_id),
                502,
                "Content-Type: application/json",
                &body,
            )
            .await
    }
}

/// Combine the scheme implied by the target's prefix, the bare host, and the
/// original path and query. Bare domains default to `http://`.
fn upstream_url(target: &str, path: &str, query: &str) -> String {
    let (scheme, host) = if let Some(host) = target.strip_prefix("https://") {
        ("https", host)
    } else if let Some(host) = target.strip_prefix("http://") {
        ("http", host)
    } else {
        ("http", target)
    };
    let host = host.trim_end_matches('/');
    if query.is_empty() {
        format!("{scheme}://{host}{path}")
    } else {
        format!("{scheme}://{host}{path}?{query}")
    }
}
