//! Built-in panel templates and their mount ids.

use crate::document::Slot;
use crate::store::Section;

/// Template for the agent swarm panel.
pub const SWARM_TEMPLATE: &str = r#"<section class="agent-swarm {{state_class}}">
  <header class="agent-swarm-header">
    <span class="agent-swarm-title">Agent Swarm</span>
    <span class="agent-count">{{agent_count}}</span>
    <button class="agent-swarm-toggle" data-action="toggle">{{toggle_icon}}</button>
  </header>
  <div class="agent-swarm-body">
    <div class="orchestration">{{orchestration}}</div>
    <div class="phases">{{phases}}</div>
    <div class="agents">{{agents}}</div>
    <div class="task-queue">
      <span class="task-queue-title">Task Queue</span>
      {{task_badge}}
      {{tasks}}
    </div>
  </div>
</section>"#;

/// Template for the background task monitor panel.
pub const TASK_MONITOR_TEMPLATE: &str = r#"<section class="task-monitor {{state_class}}">
  <header class="task-monitor-header">
    <span class="task-monitor-title">Background Tasks</span>
    {{task_badge}}
    <button class="task-monitor-toggle" data-action="toggle">{{toggle_icon}}</button>
  </header>
  <div class="task-monitor-body">{{tasks}}</div>
</section>"#;

/// Which of the two built-in panels a [`crate::StatusPanel`] presents.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PanelKind {
    Swarm,
    TaskMonitor,
}

impl PanelKind {
    /// Fixed id of the template element this panel clones.
    pub fn template_id(&self) -> &'static str {
        match self {
            PanelKind::Swarm => "agent-swarm-template",
            PanelKind::TaskMonitor => "task-monitor-template",
        }
    }

    /// Container id used when the caller does not pass one.
    pub fn default_container_id(&self) -> &'static str {
        match self {
            PanelKind::Swarm => "agent-swarm-container",
            PanelKind::TaskMonitor => "task-monitor-container",
        }
    }

    pub fn default_template(&self) -> &'static str {
        match self {
            PanelKind::Swarm => SWARM_TEMPLATE,
            PanelKind::TaskMonitor => TASK_MONITOR_TEMPLATE,
        }
    }

    /// Slots this panel's template exposes.
    pub fn slots(&self) -> &'static [Slot] {
        match self {
            PanelKind::Swarm => &[
                Slot::Orchestration,
                Slot::Phases,
                Slot::Agents,
                Slot::AgentCount,
                Slot::Tasks,
                Slot::TaskBadge,
            ],
            PanelKind::TaskMonitor => &[Slot::Tasks, Slot::TaskBadge],
        }
    }

    /// Sections this panel refreshes.
    pub fn sections(&self) -> &'static [Section] {
        match self {
            PanelKind::Swarm => &[Section::Orchestration, Section::Agents, Section::Tasks],
            PanelKind::TaskMonitor => &[Section::Tasks],
        }
    }
}

impl std::fmt::Display for PanelKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PanelKind::Swarm => write!(f, "swarm"),
            PanelKind::TaskMonitor => write!(f, "task-monitor"),
        }
    }
}
