//! Snare: an HTTP interception proxy with rule-based mocking and exchange
//! recording.
//!
//! For each inbound request, snare either answers from a locally configured
//! rule's canned response, forwards the request to a configured upstream
//! target and relays the real response, or returns a 404 — and persists
//! every observed request/response pair for later inspection and replay.

pub mod conditions;
pub mod config;
pub mod headers;
pub mod intercept;
pub mod matcher;
pub mod model;
pub mod recorder;
pub mod session;
pub mod store;

pub use conditions::NetworkConditions;
pub use config::Config;
pub use intercept::{serve, Forwarder, Interceptor, ProxyTarget};
pub use matcher::RuleMatcher;
pub use model::{
    HttpRequestRecord, HttpResponseRecord, InboundRequest, MockResponse, RecordingStatus, Rule,
};
pub use recorder::ExchangeRecorder;
pub use session::{RecordingSession, SessionError, SessionRegistry};
pub use store::{ExchangeStore, MemoryExchangeStore, MemoryRuleStore, RuleStore, StoreError};
