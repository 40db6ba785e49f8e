//! Test helpers shared by unit and integration tests.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Semaphore;

use crate::model::{AgentInfo, OrchestrationStatus, TaskListing};
use crate::source::{SourceError, StatusSource};
use crate::store::Section;

/// A source whose answers are set by the test. Failures are reported as
/// backend errors carrying the given message.
pub struct ScriptedSource {
    sections: Vec<Section>,
    orchestration: Mutex<Result<Option<OrchestrationStatus>, String>>,
    agents: Mutex<Result<Vec<AgentInfo>, String>>,
    tasks: Mutex<Result<TaskListing, String>>,
    context_tasks: Mutex<HashMap<String, TaskListing>>,
    cancel_result: Mutex<Result<(), String>>,
    calls: Mutex<HashMap<Section, usize>>,
    cancelled: Mutex<Vec<(Option<String>, String)>>,
    task_gate: Mutex<Option<TaskGate>>,
}

struct TaskGate {
    /// `None` gates every fetch, `Some` only fetches for that context.
    context_id: Option<String>,
    permits: Arc<Semaphore>,
}

impl ScriptedSource {
    pub fn new(sections: &[Section]) -> Self {
        Self {
            sections: sections.to_vec(),
            orchestration: Mutex::new(Ok(None)),
            agents: Mutex::new(Ok(Vec::new())),
            tasks: Mutex::new(Ok(TaskListing::default())),
            context_tasks: Mutex::new(HashMap::new()),
            cancel_result: Mutex::new(Ok(())),
            calls: Mutex::new(HashMap::new()),
            cancelled: Mutex::new(Vec::new()),
            task_gate: Mutex::new(None),
        }
    }

    pub fn all_sections() -> Self {
        Self::new(&[Section::Orchestration, Section::Agents, Section::Tasks])
    }

    pub fn set_orchestration(&self, status: Option<OrchestrationStatus>) {
        *self.orchestration.lock() = Ok(status);
    }

    pub fn set_agents(&self, agents: Vec<AgentInfo>) {
        *self.agents.lock() = Ok(agents);
    }

    pub fn set_tasks(&self, listing: TaskListing) {
        *self.tasks.lock() = Ok(listing);
    }

    /// Answer task fetches for one context with `listing`, ahead of
    /// whatever `set_tasks` configured.
    pub fn set_tasks_for(&self, context_id: &str, listing: TaskListing) {
        self.context_tasks
            .lock()
            .insert(context_id.to_string(), listing);
    }

    pub fn fail_orchestration(&self, message: &str) {
        *self.orchestration.lock() = Err(message.to_string());
    }

    pub fn fail_agents(&self, message: &str) {
        *self.agents.lock() = Err(message.to_string());
    }

    pub fn fail_tasks(&self, message: &str) {
        *self.tasks.lock() = Err(message.to_string());
    }

    pub fn fail_cancel(&self, message: &str) {
        *self.cancel_result.lock() = Err(message.to_string());
    }

    /// Make subsequent task fetches wait until the returned semaphore gets a
    /// permit per fetch.
    pub fn gate_tasks(&self) -> Arc<Semaphore> {
        self.install_gate(None)
    }

    /// Like [`ScriptedSource::gate_tasks`], but only fetches made for
    /// `context_id` wait.
    pub fn gate_tasks_for(&self, context_id: &str) -> Arc<Semaphore> {
        self.install_gate(Some(context_id.to_string()))
    }

    fn install_gate(&self, context_id: Option<String>) -> Arc<Semaphore> {
        let permits = Arc::new(Semaphore::new(0));
        *self.task_gate.lock() = Some(TaskGate {
            context_id,
            permits: Arc::clone(&permits),
        });
        permits
    }

    pub fn calls(&self, section: Section) -> usize {
        self.calls.lock().get(&section).copied().unwrap_or(0)
    }

    /// `(context_id, task_id)` of every cancel request received.
    pub fn cancelled(&self) -> Vec<(Option<String>, String)> {
        self.cancelled.lock().clone()
    }

    fn record(&self, section: Section) {
        *self.calls.lock().entry(section).or_insert(0) += 1;
    }
}

#[async_trait]
impl StatusSource for ScriptedSource {
    fn name(&self) -> &str {
        "scripted"
    }

    fn sections(&self) -> &[Section] {
        &self.sections
    }

    async fn orchestration(
        &self,
        _context_id: Option<&str>,
    ) -> Result<Option<OrchestrationStatus>, SourceError> {
        self.record(Section::Orchestration);
        self.orchestration.lock().clone().map_err(SourceError::Backend)
    }

    async fn agents(&self, _context_id: Option<&str>) -> Result<Vec<AgentInfo>, SourceError> {
        self.record(Section::Agents);
        self.agents.lock().clone().map_err(SourceError::Backend)
    }

    async fn tasks(&self, context_id: Option<&str>) -> Result<TaskListing, SourceError> {
        self.record(Section::Tasks);
        let gate = self.task_gate.lock().as_ref().and_then(|gate| {
            let applies = gate.context_id.is_none() || gate.context_id.as_deref() == context_id;
            applies.then(|| Arc::clone(&gate.permits))
        });
        if let Some(gate) = gate {
            if let Ok(permit) = gate.acquire().await {
                permit.forget();
            }
        }
        if let Some(listing) = context_id.and_then(|ctx| self.context_tasks.lock().get(ctx).cloned()) {
            return Ok(listing);
        }
        self.tasks.lock().clone().map_err(SourceError::Backend)
    }

    async fn cancel_task(&self, context_id: Option<&str>, task_id: &str) -> Result<(), SourceError> {
        self.cancelled
            .lock()
            .push((context_id.map(String::from), task_id.to_string()));
        self.cancel_result.lock().clone().map_err(SourceError::Backend)
    }
}
