//! Pure renderers: snapshot in, markup out.
//!
//! Renderers never touch the document. Anything interactive comes back as an
//! [`ActionBinding`] next to the markup, keyed by the element's `data-action`
//! attribute, and the panel's binder resolves activations against it.

use chrono::{DateTime, NaiveDateTime, Utc};

use crate::escape;
use crate::model::{
    AgentInfo, AgentProfile, AgentState, OrchestrationStatus, OrchestrationState, SubtaskState,
    TaskListing, TaskState,
};

/// Default number of task rows shown.
pub const DEFAULT_MAX_TASKS: usize = 10;
/// Default number of agent rows shown.
pub const DEFAULT_MAX_AGENTS: usize = 20;

pub const LOADING_HTML: &str = r#"<div class="panel-loading">Loading…</div>"#;
pub const NO_ORCHESTRATION_HTML: &str =
    r#"<div class="orchestration-idle"><span class="status-icon">💤</span> No active orchestration</div>"#;
pub const NO_AGENTS_HTML: &str = r#"<div class="empty-state no-agents">No active agents</div>"#;
pub const NO_TASKS_HTML: &str = r#"<div class="empty-state no-tasks">No background tasks</div>"#;

/// Something a rendered element can ask the panel to do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PanelAction {
    Toggle,
    CancelTask { task_id: String },
}

impl PanelAction {
    /// Key carried in the element's `data-action` attribute.
    pub fn key(&self) -> String {
        match self {
            PanelAction::Toggle => "toggle".to_string(),
            PanelAction::CancelTask { task_id } => format!("cancel:{}", task_id),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionBinding {
    pub key: String,
    pub action: PanelAction,
}

impl From<PanelAction> for ActionBinding {
    fn from(action: PanelAction) -> Self {
        Self {
            key: action.key(),
            action,
        }
    }
}

/// Markup for one slot plus the actions its elements expose.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Fragment {
    pub html: String,
    pub bindings: Vec<ActionBinding>,
}

impl Fragment {
    pub fn markup(html: impl Into<String>) -> Self {
        Self {
            html: html.into(),
            bindings: Vec::new(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct RenderOptions {
    pub max_tasks: usize,
    pub max_agents: usize,
    /// Clock used for relative ages.
    pub now: DateTime<Utc>,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            max_tasks: DEFAULT_MAX_TASKS,
            max_agents: DEFAULT_MAX_AGENTS,
            now: Utc::now(),
        }
    }
}

// ---------------------------------------------------------------------------
// Lookup tables
// ---------------------------------------------------------------------------

/// Ordered orchestration phases shown in the phase strip.
pub const PHASES: [(OrchestrationState, &str); 4] = [
    (OrchestrationState::Planning, "Planning"),
    (OrchestrationState::Executing, "Executing"),
    (OrchestrationState::Verifying, "Verifying"),
    (OrchestrationState::Completed, "Completed"),
];

/// Zero-based phase index. Anything outside the phase order maps to 0.
pub fn phase_index(state: OrchestrationState) -> usize {
    match state {
        OrchestrationState::Planning => 0,
        OrchestrationState::Executing => 1,
        OrchestrationState::Verifying => 2,
        OrchestrationState::Completed => 3,
        OrchestrationState::Idle | OrchestrationState::Unknown => 0,
    }
}

pub fn orchestration_icon(state: OrchestrationState) -> &'static str {
    match state {
        OrchestrationState::Idle => "💤",
        OrchestrationState::Planning => "🧠",
        OrchestrationState::Executing => "⚡",
        OrchestrationState::Verifying => "🔍",
        OrchestrationState::Completed => "✅",
        OrchestrationState::Unknown => "🔄",
    }
}

pub fn orchestration_label(state: OrchestrationState) -> &'static str {
    match state {
        OrchestrationState::Idle => "Idle",
        OrchestrationState::Planning => "Planning",
        OrchestrationState::Executing => "Executing",
        OrchestrationState::Verifying => "Verifying",
        OrchestrationState::Completed => "Completed",
        OrchestrationState::Unknown => "Working",
    }
}

pub fn agent_icon(profile: AgentProfile) -> &'static str {
    match profile {
        AgentProfile::Planner => "📋",
        AgentProfile::Executor => "⚙️",
        AgentProfile::Knowledge => "📚",
        AgentProfile::Verifier => "🔍",
        AgentProfile::Default | AgentProfile::Unknown => "🤖",
    }
}

pub fn agent_status_class(status: AgentState) -> &'static str {
    match status {
        AgentState::Ready => "status-ready",
        AgentState::Working => "status-working",
        AgentState::Idle => "status-idle",
        AgentState::Unknown => "status-unknown",
    }
}

pub fn task_icon(state: TaskState) -> &'static str {
    match state {
        TaskState::Pending => "⏳",
        TaskState::Running => "🔄",
        TaskState::Completed => "✅",
        TaskState::Failed => "❌",
        TaskState::Cancelled => "🚫",
        TaskState::Paused => "⏸️",
        TaskState::Unknown => "📋",
    }
}

pub fn task_class(state: TaskState) -> &'static str {
    match state {
        TaskState::Pending => "task-pending",
        TaskState::Running => "task-running",
        TaskState::Completed => "task-completed",
        TaskState::Failed => "task-failed",
        TaskState::Cancelled => "task-cancelled",
        TaskState::Paused => "task-paused",
        TaskState::Unknown => "task-unknown",
    }
}

fn subtask_icon(state: SubtaskState) -> &'static str {
    match state {
        SubtaskState::Completed => "✅",
        SubtaskState::Failed => "❌",
        SubtaskState::Pending => "⏳",
        SubtaskState::Planning | SubtaskState::Executing | SubtaskState::Verifying => "🔄",
        SubtaskState::Unknown => "•",
    }
}

// ---------------------------------------------------------------------------
// Orchestration
// ---------------------------------------------------------------------------

/// Status card for the current orchestration run.
pub fn orchestration(status: Option<&OrchestrationStatus>, opts: &RenderOptions) -> Fragment {
    let status = match status {
        Some(s) if !s.is_idle() => s,
        _ => return Fragment::markup(NO_ORCHESTRATION_HTML),
    };

    let percent = status.percent();
    let mut html = format!(
        r#"<div class="orchestration-status status-{}">"#,
        status.status
    );
    html.push_str(&format!(
        r#"<span class="status-icon">{}</span><span class="status-label">{}</span>"#,
        orchestration_icon(status.status),
        orchestration_label(status.status)
    ));
    if !status.main_goal.is_empty() {
        html.push_str(&format!(
            r#"<div class="main-goal">{}</div>"#,
            escape::text(&status.main_goal)
        ));
    }
    html.push_str(&progress_bar(percent));

    let (completed, total, failed) = status
        .progress
        .as_ref()
        .map(|p| (p.completed, p.total, p.failed))
        .unwrap_or((0, 0, 0));
    html.push_str(&format!(
        r#"<span class="progress-text">{}/{} ({}%)</span>"#,
        completed, total, percent
    ));
    if failed > 0 {
        html.push_str(&format!(r#"<span class="progress-failed">{} failed</span>"#, failed));
    }

    if !status.subtasks.is_empty() {
        html.push_str(r#"<ul class="subtasks">"#);
        for subtask in status.subtasks.iter().take(opts.max_tasks) {
            html.push_str(&format!(
                r#"<li class="subtask subtask-{}" data-subtask="{}"><span class="subtask-icon">{}</span>{}</li>"#,
                subtask.status,
                escape::attr(&subtask.id),
                subtask_icon(subtask.status),
                escape::text(&subtask.description)
            ));
        }
        html.push_str("</ul>");
    }

    html.push_str("</div>");
    Fragment::markup(html)
}

/// Phase strip. With no active run no phase is marked.
pub fn phases(status: Option<&OrchestrationStatus>) -> String {
    let current = status.filter(|s| !s.is_idle()).map(|s| phase_index(s.status));

    let mut html = String::from(r#"<div class="phase-strip">"#);
    for (i, (state, label)) in PHASES.iter().enumerate() {
        let class = match current {
            Some(c) if i < c => " completed",
            Some(c) if i == c => " active",
            _ => "",
        };
        html.push_str(&format!(
            r#"<div class="phase{}" data-phase="{}">{}</div>"#,
            class, state, label
        ));
    }
    html.push_str("</div>");
    html
}

// ---------------------------------------------------------------------------
// Agents
// ---------------------------------------------------------------------------

pub fn agents(agents: &[AgentInfo], opts: &RenderOptions) -> String {
    if agents.is_empty() {
        return NO_AGENTS_HTML.to_string();
    }

    let mut html = String::from(r#"<div class="agent-list">"#);
    for agent in agents.iter().take(opts.max_agents) {
        html.push_str(&format!(
            r#"<div class="agent-item profile-{} {}" data-agent="{}"><span class="agent-icon">{}</span><span class="agent-name">{}</span><span class="agent-status">{}</span></div>"#,
            agent.profile,
            agent_status_class(agent.status),
            escape::attr(&agent.name),
            agent_icon(agent.profile),
            escape::text(&agent.name),
            agent.status
        ));
    }
    html.push_str("</div>");
    html
}

pub fn agent_count(count: usize) -> String {
    count.to_string()
}

// ---------------------------------------------------------------------------
// Tasks
// ---------------------------------------------------------------------------

pub fn tasks(listing: &TaskListing, opts: &RenderOptions) -> Fragment {
    if listing.is_empty() {
        return Fragment::markup(NO_TASKS_HTML);
    }

    let mut fragment = Fragment::markup(r#"<div class="task-list">"#);
    for task in listing.tasks.iter().take(opts.max_tasks) {
        let html = &mut fragment.html;
        html.push_str(&format!(
            r#"<div class="task-item {}" data-task-id="{}">"#,
            task_class(task.state),
            escape::attr(&task.id)
        ));
        html.push_str(&format!(
            r#"<div class="task-header"><span class="task-icon">{}</span><span class="task-name">{}</span><span class="task-state">{}</span></div>"#,
            task_icon(task.state),
            escape::text(&task.name),
            task.state
        ));
        if !task.description.is_empty() {
            html.push_str(&format!(
                r#"<div class="task-description">{}</div>"#,
                escape::text(&task.description)
            ));
        }
        let percent = task.percent();
        html.push_str(&progress_bar(percent));
        html.push_str(&format!(r#"<span class="task-progress">{}%</span>"#, percent));
        if let Some(age) = task
            .updated_at
            .as_deref()
            .and_then(|ts| format_age(ts, opts.now))
        {
            html.push_str(&format!(r#"<span class="task-updated">{}</span>"#, age));
        }
        if task.state == TaskState::Failed {
            if let Some(error) = task.error.as_deref().filter(|e| !e.is_empty()) {
                html.push_str(&format!(
                    r#"<div class="task-error">{}</div>"#,
                    escape::text(error)
                ));
            }
        }
        if task.state.is_active() {
            let binding = ActionBinding::from(PanelAction::CancelTask {
                task_id: task.id.clone(),
            });
            html.push_str(&format!(
                r#"<button class="task-cancel" data-action="{}">Cancel</button>"#,
                escape::attr(&binding.key)
            ));
            fragment.bindings.push(binding);
        }
        fragment.html.push_str("</div>");
    }
    fragment.html.push_str("</div>");
    fragment
}

/// Active-count badge in the task monitor header.
pub fn task_badge(active_count: usize) -> String {
    let class = if active_count == 0 { "empty" } else { "active" };
    format!(r#"<span class="task-badge {}">{}</span>"#, class, active_count)
}

fn progress_bar(percent: u32) -> String {
    format!(
        r#"<div class="progress-bar"><div class="progress-fill" style="width: {}%"></div></div>"#,
        percent
    )
}

/// Human-readable age of a backend timestamp. Accepts RFC 3339 and the
/// naive ISO form the backend writes (taken as UTC).
pub fn format_age(timestamp: &str, now: DateTime<Utc>) -> Option<String> {
    let then = parse_timestamp(timestamp)?;
    let secs = (now - then).num_seconds().max(0);
    let age = if secs < 5 {
        "just now".to_string()
    } else if secs < 60 {
        format!("{}s ago", secs)
    } else if secs < 3600 {
        format!("{}m ago", secs / 60)
    } else if secs < 86400 {
        format!("{}h ago", secs / 3600)
    } else {
        format!("{}d ago", secs / 86400)
    };
    Some(age)
}

fn parse_timestamp(timestamp: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(timestamp) {
        return Some(dt.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(timestamp, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|naive| naive.and_utc())
}
