//! In-memory storage engines.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use super::{ExchangeStore, RuleStore, StoreError};
use crate::model::{HttpRequestRecord, HttpResponseRecord, Rule};

/// Rule store backed by a `RwLock<Vec<_>>`. The vec keeps creation order, so
/// the stable priority sort in `list_active` resolves ties deterministically.
pub struct MemoryRuleStore {
    rules: RwLock<Vec<Rule>>,
    next_id: AtomicU64,
}

impl MemoryRuleStore {
    pub fn new() -> Self {
        Self {
            rules: RwLock::new(Vec::new()),
            next_id: AtomicU64::new(1),
        }
    }
}

impl Default for MemoryRuleStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RuleStore for MemoryRuleStore {
    async fn list_active(&self) -> Result<Vec<Rule>, StoreError> {
        let rules = self.rules.read();
        let mut active: Vec<Rule> = rules.iter().filter(|r| r.is_active).cloned().collect();
        // sort_by_key is stable, so equal priorities keep creation order
        active.sort_by_key(|r| r.priority);
        Ok(active)
    }

    async fn get(&self, id: u64) -> Result<Rule, StoreError> {
        let rules = self.rules.read();
        rules
            .iter()
            .find(|r| r.id == id)
            .cloned()
            .ok_or(StoreError::NotFound(id))
    }

    async fn create(&self, mut rule: Rule) -> Result<u64, StoreError> {
        if rule.name.trim().is_empty() {
            return Err(StoreError::Invalid("rule name must not be empty".into()));
        }
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        rule.id = id;
        self.rules.write().push(rule);
        Ok(id)
    }

    async fn update(&self, rule: Rule) -> Result<(), StoreError> {
        let mut rules = self.rules.write();
        let slot = rules
            .iter_mut()
            .find(|r| r.id == rule.id)
            .ok_or(StoreError::NotFound(rule.id))?;
        *slot = rule;
        Ok(())
    }

    async fn delete(&self, id: u64) -> Result<(), StoreError> {
        let mut rules = self.rules.write();
        let before = rules.len();
        rules.retain(|r| r.id != id);
        if rules.len() == before {
            return Err(StoreError::NotFound(id));
        }
        Ok(())
    }
}

/// Exchange store backed by `RwLock<HashMap<_, _>>` maps with atomic id
/// assignment. Enforces the insert-time invariants: non-empty method/URL on
/// requests, at most one response per request.
pub struct MemoryExchangeStore {
    requests: RwLock<HashMap<u64, HttpRequestRecord>>,
    responses: RwLock<HashMap<u64, HttpResponseRecord>>,
    /// request id -> response id, backing the 1:1 invariant and lookups.
    linked: RwLock<HashMap<u64, u64>>,
    next_id: AtomicU64,
}

impl MemoryExchangeStore {
    pub fn new() -> Self {
        Self {
            requests: RwLock::new(HashMap::new()),
            responses: RwLock::new(HashMap::new()),
            linked: RwLock::new(HashMap::new()),
            next_id: AtomicU64::new(1),
        }
    }
}

impl Default for MemoryExchangeStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ExchangeStore for MemoryExchangeStore {
    async fn insert_request(&self, mut record: HttpRequestRecord) -> Result<u64, StoreError> {
        if record.method.trim().is_empty() {
            return Err(StoreError::Invalid("request method must not be empty".into()));
        }
        if record.url.trim().is_empty() {
            return Err(StoreError::Invalid("request url must not be empty".into()));
        }
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        record.id = id;
        self.requests.write().insert(id, record);
        Ok(id)
    }

    async fn insert_response(&self, mut record: HttpResponseRecord) -> Result<u64, StoreError> {
        if let Some(request_id) = record.request_id {
            if !self.requests.read().contains_key(&request_id) {
                return Err(StoreError::NotFound(request_id));
            }
            let mut linked = self.linked.write();
            if linked.contains_key(&request_id) {
                return Err(StoreError::Conflict(request_id));
            }
            let id = self.next_id.fetch_add(1, Ordering::SeqCst);
            record.id = id;
            linked.insert(request_id, id);
            self.responses.write().insert(id, record);
            Ok(id)
        } else {
            let id = self.next_id.fetch_add(1, Ordering::SeqCst);
            record.id = id;
            self.responses.write().insert(id, record);
            Ok(id)
        }
    }

    async fn request(&self, id: u64) -> Result<HttpRequestRecord, StoreError> {
        self.requests
            .read()
            .get(&id)
            .cloned()
            .ok_or(StoreError::NotFound(id))
    }

    async fn response_for_request(
        &self,
        request_id: u64,
    ) -> Result<Option<HttpResponseRecord>, StoreError> {
        let linked = self.linked.read();
        let Some(response_id) = linked.get(&request_id) else {
            return Ok(None);
        };
        Ok(self.responses.read().get(response_id).cloned())
    }

    async fn requests_between(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<HttpRequestRecord>, StoreError> {
        let requests = self.requests.read();
        let mut matched: Vec<HttpRequestRecord> = requests
            .values()
            .filter(|r| r.timestamp >= from && r.timestamp <= to)
            .cloned()
            .collect();
        matched.sort_by(|a, b| a.timestamp.cmp(&b.timestamp).then(a.id.cmp(&b.id)));
        Ok(matched)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::MockResponse;
    use chrono::Duration;

    fn request_record(method: &str, url: &str) -> HttpRequestRecord {
        HttpRequestRecord::observed(method, url, String::new(), String::new())
    }

    fn response_record(request_id: Option<u64>, status: u16) -> HttpResponseRecord {
        HttpResponseRecord {
            id: 0,
            request_id,
            status_code: status,
            headers: String::new(),
            body: String::new(),
            timestamp: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_request_insert_assigns_ids() {
        let store = MemoryExchangeStore::new();
        let a = store
            .insert_request(request_record("GET", "http://localhost/a"))
            .await
            .unwrap();
        let b = store
            .insert_request(request_record("GET", "http://localhost/b"))
            .await
            .unwrap();
        assert_ne!(a, b);
        assert_eq!(store.request(a).await.unwrap().url, "http://localhost/a");
    }

    #[tokio::test]
    async fn test_request_invariants_enforced() {
        let store = MemoryExchangeStore::new();
        let err = store
            .insert_request(request_record("", "http://localhost/a"))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Invalid(_)));

        let err = store.insert_request(request_record("GET", " ")).await.unwrap_err();
        assert!(matches!(err, StoreError::Invalid(_)));
    }

    #[tokio::test]
    async fn test_one_response_per_request() {
        let store = MemoryExchangeStore::new();
        let request_id = store
            .insert_request(request_record("GET", "http://localhost/a"))
            .await
            .unwrap();

        store
            .insert_response(response_record(Some(request_id), 200))
            .await
            .unwrap();
        let err = store
            .insert_response(response_record(Some(request_id), 201))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Conflict(id) if id == request_id));

        let linked = store.response_for_request(request_id).await.unwrap().unwrap();
        assert_eq!(linked.status_code, 200);
    }

    #[tokio::test]
    async fn test_unlinked_response_allowed() {
        let store = MemoryExchangeStore::new();
        let id = store.insert_response(response_record(None, 404)).await.unwrap();
        assert!(id > 0);
    }

    #[tokio::test]
    async fn test_response_for_unknown_request() {
        let store = MemoryExchangeStore::new();
        let err = store
            .insert_response(response_record(Some(42), 200))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound(42)));
        assert!(store.response_for_request(42).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_requests_between_window() {
        let store = MemoryExchangeStore::new();
        store
            .insert_request(request_record("GET", "http://localhost/a"))
            .await
            .unwrap();
        store
            .insert_request(request_record("POST", "http://localhost/b"))
            .await
            .unwrap();

        let now = Utc::now();
        let all = store
            .requests_between(now - Duration::minutes(1), now + Duration::minutes(1))
            .await
            .unwrap();
        assert_eq!(all.len(), 2);
        assert!(all[0].id < all[1].id);

        let none = store
            .requests_between(now + Duration::minutes(1), now + Duration::minutes(2))
            .await
            .unwrap();
        assert!(none.is_empty());
    }

    #[tokio::test]
    async fn test_rule_store_list_active_ordering() {
        let store = MemoryRuleStore::new();
        store
            .create(Rule::new("low", MockResponse::new(200)).with_priority(10))
            .await
            .unwrap();
        store
            .create(Rule::new("high", MockResponse::new(200)).with_priority(1))
            .await
            .unwrap();
        store
            .create(Rule::new("first-of-ties", MockResponse::new(200)).with_priority(10))
            .await
            .unwrap();
        store
            .create(Rule::new("inactive", MockResponse::new(200)).disabled())
            .await
            .unwrap();

        let active = store.list_active().await.unwrap();
        let names: Vec<&str> = active.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["high", "low", "first-of-ties"]);
    }

    #[tokio::test]
    async fn test_rule_store_crud() {
        let store = MemoryRuleStore::new();
        let id = store
            .create(Rule::new("a", MockResponse::new(200)))
            .await
            .unwrap();

        let mut rule = store.get(id).await.unwrap();
        rule.priority = 5;
        store.update(rule).await.unwrap();
        assert_eq!(store.get(id).await.unwrap().priority, 5);

        store.delete(id).await.unwrap();
        assert!(matches!(store.get(id).await, Err(StoreError::NotFound(_))));
        assert!(matches!(store.delete(id).await, Err(StoreError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_rule_store_rejects_unnamed() {
        let store = MemoryRuleStore::new();
        let err = store
            .create(Rule::new("", MockResponse::new(200)))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Invalid(_)));
    }
}
