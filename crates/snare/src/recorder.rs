//! Exchange recording.
//!
//! Every observed request is persisted before any disposition logic runs,
//! and every response is persisted as soon as the exchange completes. When a
//! recording session is active the completed pair is also offered to it;
//! offer failures are logged and never fail the HTTP exchange.

use chrono::Utc;
use std::sync::Arc;
use tracing::warn;

use crate::model::{HttpRequestRecord, HttpResponseRecord};
use crate::session::RecordingSession;
use crate::store::{ExchangeStore, StoreError};

#[derive(Clone)]
pub struct ExchangeRecorder {
    exchanges: Arc<dyn ExchangeStore>,
    session: Arc<dyn RecordingSession>,
}

impl ExchangeRecorder {
    pub fn new(exchanges: Arc<dyn ExchangeStore>, session: Arc<dyn RecordingSession>) -> Self {
        Self { exchanges, session }
    }

    /// Persist a request record and return its id. Failures propagate so the
    /// interceptor can still answer the client with a 500.
    pub async fn record_request(&self, record: HttpRequestRecord) -> Result<u64, StoreError> {
        self.exchanges.insert_request(record).await
    }

    /// Persist a response, then offer the completed pair to the active
    /// recording session.
    pub async fn record_response(
        &self,
        request_id: Option<u64>,
        status_code: u16,
        headers: &str,
        body: &str,
    ) -> Result<HttpResponseRecord, StoreError> {
        let mut record = HttpResponseRecord {
            id: 0,
            request_id,
            status_code,
            headers: headers.to_string(),
            body: body.to_string(),
            timestamp: Utc::now(),
        };
        record.id = self.exchanges.insert_response(record.clone()).await?;

        if self.session.is_active() {
            if let Err(e) = self.session.append(request_id, record.id) {
                warn!(
                    request_id = ?request_id,
                    response_id = record.id,
                    error = %e,
                    "failed to append exchange to recording session"
                );
            }
        }

        Ok(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::HttpRequestRecord;
    use crate::session::SessionRegistry;
    use crate::store::MemoryExchangeStore;

    fn recorder_with_session() -> (ExchangeRecorder, Arc<MemoryExchangeStore>, Arc<SessionRegistry>)
    {
        let exchanges = Arc::new(MemoryExchangeStore::new());
        let sessions = Arc::new(SessionRegistry::new());
        let recorder = ExchangeRecorder::new(exchanges.clone(), sessions.clone());
        (recorder, exchanges, sessions)
    }

    #[tokio::test]
    async fn test_pair_recorded_and_linked() {
        let (recorder, exchanges, _) = recorder_with_session();

        let request_id = recorder
            .record_request(HttpRequestRecord::observed(
                "GET",
                "http://localhost/a",
                String::new(),
                String::new(),
            ))
            .await
            .unwrap();

        let response = recorder
            .record_response(Some(request_id), 200, "Content-Type: text/plain", "ok")
            .await
            .unwrap();
        assert!(response.id > 0);

        let linked = exchanges
            .response_for_request(request_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(linked.id, response.id);
        assert_eq!(linked.body, "ok");
    }

    #[tokio::test]
    async fn test_active_session_receives_pairs() {
        let (recorder, _, sessions) = recorder_with_session();
        let scenario = sessions.create_scenario("s");
        sessions.start(scenario).unwrap();

        let request_id = recorder
            .record_request(HttpRequestRecord::observed(
                "GET",
                "http://localhost/a",
                String::new(),
                String::new(),
            ))
            .await
            .unwrap();
        let response = recorder
            .record_response(Some(request_id), 200, "", "")
            .await
            .unwrap();

        let steps = sessions.steps(scenario).unwrap();
        assert_eq!(steps.len(), 1);
        assert_eq!(steps[0].request_id, Some(request_id));
        assert_eq!(steps[0].response_id, response.id);
    }

    #[tokio::test]
    async fn test_session_failure_does_not_fail_exchange() {
        let (recorder, _, sessions) = recorder_with_session();
        let scenario = sessions.create_scenario("doomed");
        sessions.start(scenario).unwrap();
        sessions.delete_scenario(scenario).unwrap();

        let request_id = recorder
            .record_request(HttpRequestRecord::observed(
                "GET",
                "http://localhost/a",
                String::new(),
                String::new(),
            ))
            .await
            .unwrap();

        // The append fails inside, but the response is still recorded.
        let response = recorder
            .record_response(Some(request_id), 200, "", "")
            .await
            .unwrap();
        assert!(response.id > 0);
    }
}
