//! Recording sessions.
//!
//! A session associates observed exchanges with a named test scenario. The
//! interception core only consults the narrow [`RecordingSession`] contract;
//! the [`SessionRegistry`] is the in-memory collaborator behind it.

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use thiserror::Error;
use tracing::info;

use crate::model::RecordingStatus;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("no recording session is active")]
    NotRecording,
    #[error("scenario {0} no longer exists")]
    ScenarioNotFound(u64),
}

/// The signal the Exchange Recorder honors before storing an exchange.
/// Append failures are never fatal to the interception path.
pub trait RecordingSession: Send + Sync {
    fn is_active(&self) -> bool;
    fn current_scenario(&self) -> Option<u64>;
    fn append(&self, request_id: Option<u64>, response_id: u64) -> Result<(), SessionError>;
}

/// One recorded exchange inside a scenario, in arrival order of completed
/// exchanges (which may interleave across connections).
#[derive(Debug, Clone)]
pub struct ScenarioStep {
    pub request_id: Option<u64>,
    pub response_id: u64,
    pub recorded_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
struct Scenario {
    name: String,
    steps: Vec<ScenarioStep>,
}

#[derive(Default)]
struct RegistryState {
    scenarios: HashMap<u64, Scenario>,
    active: Option<u64>,
    started_at: Option<DateTime<Utc>>,
}

/// In-memory scenario registry with start/stop recording semantics.
pub struct SessionRegistry {
    state: RwLock<RegistryState>,
    next_id: AtomicU64,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self {
            state: RwLock::new(RegistryState::default()),
            next_id: AtomicU64::new(1),
        }
    }

    pub fn create_scenario(&self, name: &str) -> u64 {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        self.state.write().scenarios.insert(
            id,
            Scenario {
                name: name.to_string(),
                steps: Vec::new(),
            },
        );
        id
    }

    pub fn start(&self, scenario_id: u64) -> Result<(), SessionError> {
        let mut state = self.state.write();
        if !state.scenarios.contains_key(&scenario_id) {
            return Err(SessionError::ScenarioNotFound(scenario_id));
        }
        state.active = Some(scenario_id);
        state.started_at = Some(Utc::now());
        info!(scenario_id, "recording started");
        Ok(())
    }

    pub fn stop(&self) {
        let mut state = self.state.write();
        if let Some(id) = state.active.take() {
            info!(scenario_id = id, "recording stopped");
        }
        state.started_at = None;
    }

    /// Deleting the active scenario leaves the session flagged as recording
    /// until the next append fails; that failure is logged and ignored by
    /// the recorder, matching the non-fatal contract.
    pub fn delete_scenario(&self, scenario_id: u64) -> Result<(), SessionError> {
        let mut state = self.state.write();
        state
            .scenarios
            .remove(&scenario_id)
            .ok_or(SessionError::ScenarioNotFound(scenario_id))?;
        Ok(())
    }

    pub fn steps(&self, scenario_id: u64) -> Result<Vec<ScenarioStep>, SessionError> {
        let state = self.state.read();
        state
            .scenarios
            .get(&scenario_id)
            .map(|s| s.steps.clone())
            .ok_or(SessionError::ScenarioNotFound(scenario_id))
    }

    pub fn status(&self) -> RecordingStatus {
        let state = self.state.read();
        let scenario = state.active.and_then(|id| state.scenarios.get(&id).map(|s| (id, s)));
        RecordingStatus {
            is_recording: state.active.is_some(),
            scenario_id: scenario.map(|(id, _)| id),
            scenario_name: scenario.map(|(_, s)| s.name.clone()),
            step_count: scenario.map(|(_, s)| s.steps.len()).unwrap_or(0),
            started_at: state.started_at,
            duration_seconds: state
                .started_at
                .map(|t| (Utc::now() - t).num_seconds())
                .unwrap_or(0),
        }
    }
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl RecordingSession for SessionRegistry {
    fn is_active(&self) -> bool {
        self.state.read().active.is_some()
    }

    fn current_scenario(&self) -> Option<u64> {
        self.state.read().active
    }

    fn append(&self, request_id: Option<u64>, response_id: u64) -> Result<(), SessionError> {
        let mut state = self.state.write();
        let scenario_id = state.active.ok_or(SessionError::NotRecording)?;
        let scenario = state
            .scenarios
            .get_mut(&scenario_id)
            .ok_or(SessionError::ScenarioNotFound(scenario_id))?;
        scenario.steps.push(ScenarioStep {
            request_id,
            response_id,
            recorded_at: Utc::now(),
        });
        Ok(())
    }
}
