//! Domain records: observed requests and responses, rules, and the
//! recording status surface.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::headers::format_pairs;

/// An observed HTTP request, either inbound from a client or outbound to an
/// upstream target. Immutable once persisted.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct HttpRequestRecord {
    /// Assigned by the store at insert; 0 until persisted.
    #[serde(default)]
    pub id: u64,
    /// Absolute URL of the request.
    pub url: String,
    pub method: String,
    /// Newline-joined `Name: Value` lines (see the `headers` codec).
    #[serde(default)]
    pub headers: String,
    #[serde(default)]
    pub body: String,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub is_proxied: bool,
    /// Target domain for proxied requests; empty otherwise.
    #[serde(default)]
    pub target_domain: String,
}

impl HttpRequestRecord {
    /// Record of a request observed on the listening endpoint.
    pub fn observed(method: &str, url: &str, headers: String, body: String) -> Self {
        Self {
            id: 0,
            url: url.to_string(),
            method: method.to_string(),
            headers,
            body,
            timestamp: Utc::now(),
            is_proxied: false,
            target_domain: String::new(),
        }
    }

    /// Record of a request forwarded to an upstream target.
    pub fn proxied(method: &str, url: &str, headers: String, body: String, target: &str) -> Self {
        Self {
            id: 0,
            url: url.to_string(),
            method: method.to_string(),
            headers,
            body,
            timestamp: Utc::now(),
            is_proxied: true,
            target_domain: target.to_string(),
        }
    }
}

/// An observed or synthesized HTTP response, optionally linked 1:1 to a
/// request record. Never mutated after insert.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct HttpResponseRecord {
    #[serde(default)]
    pub id: u64,
    #[serde(default)]
    pub request_id: Option<u64>,
    pub status_code: u16,
    #[serde(default)]
    pub headers: String,
    #[serde(default)]
    pub body: String,
    pub timestamp: DateTime<Utc>,
}

/// The canned response a rule returns when it matches.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct MockResponse {
    pub status_code: u16,
    /// Newline-joined `Name: Value` lines, same form as the records.
    #[serde(default)]
    pub headers: String,
    #[serde(default)]
    pub body: String,
}

impl MockResponse {
    pub fn new(status_code: u16) -> Self {
        Self {
            status_code,
            headers: String::new(),
            body: String::new(),
        }
    }

    pub fn with_body(mut self, body: &str) -> Self {
        self.body = body.to_string();
        self
    }

    pub fn with_headers(mut self, headers: &str) -> Self {
        self.headers = headers.to_string();
        self
    }
}

/// A user-defined matching predicate plus its canned response.
///
/// Every pattern field is optional; an empty pattern is vacuously true. The
/// rule owns exactly one response definition, so deleting a rule deletes its
/// response with it.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Rule {
    /// Assigned by the store at create; 0 until persisted.
    #[serde(default)]
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// Exact method match, case-insensitive; empty matches any method.
    #[serde(default)]
    pub method: String,
    /// Literal substring of the absolute URL, or a regex over the path when
    /// the pattern starts with `^` or ends with `$`.
    #[serde(default)]
    pub path_pattern: String,
    /// Literal `&`-separated required fragments, or a regex over the raw
    /// query string.
    #[serde(default)]
    pub query_pattern: String,
    /// `;`-separated `Name:Value` clauses; value is a required substring.
    #[serde(default)]
    pub header_pattern: String,
    /// Declared for configuration compatibility but never evaluated: request
    /// bodies do not participate in matching.
    #[serde(default)]
    pub body_pattern: String,
    /// Lower value wins.
    #[serde(default)]
    pub priority: i32,
    #[serde(default = "default_active")]
    pub is_active: bool,
    pub response: MockResponse,
}

fn default_active() -> bool {
    true
}

impl Rule {
    pub fn new(name: &str, response: MockResponse) -> Self {
        Self {
            id: 0,
            name: name.to_string(),
            description: String::new(),
            method: String::new(),
            path_pattern: String::new(),
            query_pattern: String::new(),
            header_pattern: String::new(),
            body_pattern: String::new(),
            priority: 0,
            is_active: true,
            response,
        }
    }

    pub fn with_method(mut self, method: &str) -> Self {
        self.method = method.to_string();
        self
    }

    pub fn with_path_pattern(mut self, pattern: &str) -> Self {
        self.path_pattern = pattern.to_string();
        self
    }

    pub fn with_query_pattern(mut self, pattern: &str) -> Self {
        self.query_pattern = pattern.to_string();
        self
    }

    pub fn with_header_pattern(mut self, pattern: &str) -> Self {
        self.header_pattern = pattern.to_string();
        self
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    pub fn disabled(mut self) -> Self {
        self.is_active = false;
        self
    }
}

/// A fully buffered inbound request, the unit the matcher and forwarder
/// operate on.
#[derive(Debug, Clone)]
pub struct InboundRequest {
    pub method: String,
    /// Absolute URL reconstructed from the request line and Host header.
    pub url: String,
    pub path: String,
    /// Raw query string without the leading `?`; empty when absent.
    pub query: String,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl InboundRequest {
    /// Headers in the canonical persisted text form.
    pub fn header_text(&self) -> String {
        format_pairs(self.headers.iter().map(|(n, v)| (n.as_str(), v.as_str())))
    }
}

/// Fixed-shape snapshot of the recording surface.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RecordingStatus {
    pub is_recording: bool,
    pub scenario_id: Option<u64>,
    pub scenario_name: Option<String>,
    pub step_count: usize,
    pub started_at: Option<DateTime<Utc>>,
    pub duration_seconds: i64,
}
