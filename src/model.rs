//! Snapshot types read by the panels.
//!
//! Every status-like enum decodes totally: a string the panel does not
//! recognise becomes `Unknown` instead of failing the whole snapshot, so one
//! odd value from the backend only changes how that one item is drawn.

use serde::{Deserialize, Serialize};

/// Define a lowercase string enum with an `Unknown` catch-all.
macro_rules! lenient_enum {
    (
        $(#[$meta:meta])*
        $name:ident { $($variant:ident => $label:literal),+ $(,)? }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum $name {
            $($variant,)+
            Unknown,
        }

        impl $name {
            /// Parse a wire label; anything unrecognised maps to `Unknown`.
            pub fn parse(label: &str) -> Self {
                match label.trim().to_ascii_lowercase().as_str() {
                    $($label => $name::$variant,)+
                    _ => $name::Unknown,
                }
            }

            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $label,)+
                    $name::Unknown => "unknown",
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl Serialize for $name {
            fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
            where
                S: serde::Serializer,
            {
                serializer.serialize_str(self.as_str())
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
            where
                D: serde::Deserializer<'de>,
            {
                let label = Option::<String>::deserialize(deserializer)?;
                Ok(label.as_deref().map($name::parse).unwrap_or($name::Unknown))
            }
        }
    };
}

lenient_enum! {
    /// Stage of the orchestration run as a whole.
    OrchestrationState {
        Idle => "idle",
        Planning => "planning",
        Executing => "executing",
        Verifying => "verifying",
        Completed => "completed",
    }
}

lenient_enum! {
    /// State of one planned subtask inside an orchestration run.
    SubtaskState {
        Pending => "pending",
        Planning => "planning",
        Executing => "executing",
        Verifying => "verifying",
        Completed => "completed",
        Failed => "failed",
    }
}

lenient_enum! {
    /// Specialisation of a swarm agent.
    AgentProfile {
        Planner => "planner",
        Executor => "executor",
        Knowledge => "knowledge",
        Verifier => "verifier",
        Default => "default",
    }
}

lenient_enum! {
    /// Liveness of a swarm agent.
    AgentState {
        Ready => "ready",
        Working => "working",
        Idle => "idle",
    }
}

lenient_enum! {
    /// Lifecycle state of a persisted background task.
    TaskState {
        Pending => "pending",
        Running => "running",
        Completed => "completed",
        Failed => "failed",
        Cancelled => "cancelled",
        Paused => "paused",
    }
}

impl Default for OrchestrationState {
    fn default() -> Self {
        OrchestrationState::Idle
    }
}

impl Default for SubtaskState {
    fn default() -> Self {
        SubtaskState::Pending
    }
}

impl Default for AgentProfile {
    fn default() -> Self {
        AgentProfile::Default
    }
}

impl Default for AgentState {
    fn default() -> Self {
        AgentState::Ready
    }
}

impl Default for TaskState {
    fn default() -> Self {
        TaskState::Pending
    }
}

impl TaskState {
    /// Pending, running and paused tasks count as active and can be cancelled.
    pub fn is_active(&self) -> bool {
        matches!(self, TaskState::Pending | TaskState::Running | TaskState::Paused)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            TaskState::Completed | TaskState::Failed | TaskState::Cancelled
        )
    }
}

/// Subtask counters of an orchestration run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct OrchestrationProgress {
    #[serde(default)]
    pub completed: u32,
    #[serde(default)]
    pub total: u32,
    #[serde(default)]
    pub failed: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub percentage: Option<f64>,
}

impl OrchestrationProgress {
    pub fn new(completed: u32, total: u32) -> Self {
        Self {
            completed,
            total,
            failed: 0,
            percentage: None,
        }
    }

    /// Whole-number completion, derived from the counters. Zero when there is
    /// nothing to do yet.
    pub fn percent(&self) -> u32 {
        if self.total == 0 {
            return 0;
        }
        let ratio = f64::from(self.completed) / f64::from(self.total) * 100.0;
        clamp_percent(Some(ratio))
    }
}

/// Snapshot of the orchestrator's overall state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct OrchestrationStatus {
    #[serde(default)]
    pub status: OrchestrationState,
    #[serde(default)]
    pub main_goal: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub progress: Option<OrchestrationProgress>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub subtasks: Vec<SubtaskSummary>,
}

/// Short view of one planned subtask.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct SubtaskSummary {
    pub id: String,
    #[serde(default)]
    pub status: SubtaskState,
    #[serde(default)]
    pub description: String,
}

impl OrchestrationStatus {
    pub fn new(status: OrchestrationState, main_goal: impl Into<String>) -> Self {
        Self {
            status,
            main_goal: main_goal.into(),
            progress: None,
            subtasks: Vec::new(),
        }
    }

    pub fn with_progress(mut self, completed: u32, total: u32) -> Self {
        self.progress = Some(OrchestrationProgress::new(completed, total));
        self
    }

    pub fn is_idle(&self) -> bool {
        self.status == OrchestrationState::Idle
    }

    pub fn percent(&self) -> u32 {
        self.progress.as_ref().map(|p| p.percent()).unwrap_or(0)
    }
}

/// One agent in the swarm. Names are unique within a snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentInfo {
    pub name: String,
    #[serde(default)]
    pub profile: AgentProfile,
    #[serde(default)]
    pub status: AgentState,
}

impl AgentInfo {
    pub fn new(name: impl Into<String>, profile: AgentProfile, status: AgentState) -> Self {
        Self {
            name: name.into(),
            profile,
            status,
        }
    }
}

/// A background task as persisted by the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct BackgroundTask {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub state: TaskState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub progress: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl BackgroundTask {
    pub fn new(id: impl Into<String>, name: impl Into<String>, state: TaskState) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            state,
            ..Self::default()
        }
    }

    pub fn percent(&self) -> u32 {
        clamp_percent(self.progress)
    }
}

/// One poll's worth of background tasks.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TaskListing {
    pub tasks: Vec<BackgroundTask>,
    pub active_count: usize,
}

impl TaskListing {
    /// Build a listing, counting active tasks locally.
    pub fn from_tasks(tasks: Vec<BackgroundTask>) -> Self {
        let active_count = count_active(&tasks);
        Self {
            tasks,
            active_count,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }
}

/// Number of tasks in an active state.
pub fn count_active(tasks: &[BackgroundTask]) -> usize {
    tasks.iter().filter(|t| t.state.is_active()).count()
}

/// Round a raw percentage to a whole number in `[0, 100]`. Missing or NaN is 0.
pub fn clamp_percent(value: Option<f64>) -> u32 {
    match value {
        Some(v) if v.is_finite() => v.round().clamp(0.0, 100.0) as u32,
        _ => 0,
    }
}
