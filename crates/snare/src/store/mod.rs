//! Storage traits for rules and observed exchanges.
//!
//! The interception core only depends on these narrow contracts; the
//! in-memory engines in [`memory`] are the shipped implementation.

mod memory;

pub use memory::{MemoryExchangeStore, MemoryRuleStore};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::model::{HttpRequestRecord, HttpResponseRecord, Rule};

#[derive(Debug, Error)]
pub enum StoreError {
    /// A record violated an insert-time invariant.
    #[error("invalid record: {0}")]
    Invalid(String),
    /// A second response was inserted for a request that already has one.
    #[error("conflict: request {0} already has a response")]
    Conflict(u64),
    #[error("not found: {0}")]
    NotFound(u64),
    /// Fault in the storage engine itself.
    #[error("storage backend error: {0}")]
    Backend(String),
}

/// Rule storage. Readers take a fresh snapshot per call so CRUD changes take
/// effect on the next request, with no cache to invalidate.
#[async_trait]
pub trait RuleStore: Send + Sync {
    /// Active rules ordered by priority ascending; rules with equal priority
    /// keep their creation order (stable).
    async fn list_active(&self) -> Result<Vec<Rule>, StoreError>;

    async fn get(&self, id: u64) -> Result<Rule, StoreError>;

    /// Persist a rule and return its assigned id.
    async fn create(&self, rule: Rule) -> Result<u64, StoreError>;

    async fn update(&self, rule: Rule) -> Result<(), StoreError>;

    /// Deleting a rule deletes its embedded response with it.
    async fn delete(&self, id: u64) -> Result<(), StoreError>;
}

/// Exchange storage for observed request/response pairs.
#[async_trait]
pub trait ExchangeStore: Send + Sync {
    /// Persist a request record and return its assigned id. Method and URL
    /// must be non-empty.
    async fn insert_request(&self, record: HttpRequestRecord) -> Result<u64, StoreError>;

    /// Persist a response record and return its assigned id. At most one
    /// response may be linked to any given request.
    async fn insert_response(&self, record: HttpResponseRecord) -> Result<u64, StoreError>;

    async fn request(&self, id: u64) -> Result<HttpRequestRecord, StoreError>;

    async fn response_for_request(
        &self,
        request_id: u64,
    ) -> Result<Option<HttpResponseRecord>, StoreError>;

    /// Requests observed in the given time window, ordered by timestamp.
    /// Consumed by export and metrics layers.
    async fn requests_between(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<HttpRequestRecord>, StoreError>;
}
