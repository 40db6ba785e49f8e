//! Integration tests for the panel lifecycle over both kinds of source.
//!
//! Covers init/refresh/destroy against scripted and in-memory sources,
//! per-section failure isolation, truncation, escaping, the empty states and
//! the action binder.

use serial_test::serial;
use std::sync::Arc;
use std::time::Duration;

use swarmwatch::render::{LOADING_HTML, NO_AGENTS_HTML, NO_TASKS_HTML};
use swarmwatch::testing::ScriptedSource;
use swarmwatch::{
    AgentInfo, AgentProfile, AgentState, BackgroundTask, Document, ErrorDisplay, MemorySource,
    OrchestrationState, OrchestrationStatus, PanelKind, PanelSettings, Section, Slot, StatusPanel,
    StatusStore, StoreSnapshot, TaskListing, TaskState,
};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

const SWARM: &str = "agent-swarm-container";
const TASKS: &str = "task-monitor-container";

fn panel_over(kind: PanelKind, source: Arc<dyn swarmwatch::StatusSource>) -> (Document, StatusPanel) {
    let doc = Document::with_default_panels();
    let panel = StatusPanel::new(kind, doc.clone(), source, PanelSettings::default());
    (doc, panel)
}

fn make_task(id: &str, state: TaskState) -> BackgroundTask {
    BackgroundTask::new(id, format!("Task {}", id), state)
}

fn count(haystack: &str, needle: &str) -> usize {
    haystack.matches(needle).count()
}

// ---------------------------------------------------------------------------
// Section isolation
// ---------------------------------------------------------------------------

#[tokio::test]
async fn failing_tasks_fetch_leaves_other_sections_rendered() {
    let source = Arc::new(ScriptedSource::all_sections());
    source.set_orchestration(Some(
        OrchestrationStatus::new(OrchestrationState::Executing, "Migrate the schema")
            .with_progress(3, 4),
    ));
    source.set_agents(vec![
        AgentInfo::new("planner-1", AgentProfile::Planner, AgentState::Working),
        AgentInfo::new("exec-1", AgentProfile::Executor, AgentState::Ready),
    ]);
    source.fail_tasks("HTTP 500");

    let (doc, panel) = panel_over(PanelKind::Swarm, source.clone());
    panel.init(None, Some("ctx")).await;

    let card = doc.slot_html(SWARM, Slot::Orchestration).unwrap();
    assert!(card.contains("3/4 (75%)"));
    assert!(card.contains("Migrate the schema"));

    let agents = doc.slot_html(SWARM, Slot::Agents).unwrap();
    assert!(agents.contains("planner-1"));
    assert!(agents.contains("exec-1"));
    assert_eq!(doc.slot_html(SWARM, Slot::AgentCount).as_deref(), Some("2"));

    assert_eq!(doc.slot_html(SWARM, Slot::Tasks).as_deref(), Some(LOADING_HTML));
    assert_eq!(source.calls(Section::Tasks), 1);
    panel.destroy();
}

#[tokio::test]
async fn failing_agents_fetch_with_empty_policy() {
    let source = Arc::new(ScriptedSource::all_sections());
    source.set_agents(vec![AgentInfo::new("a", AgentProfile::Default, AgentState::Idle)]);
    let doc = Document::with_default_panels();
    let settings = PanelSettings {
        on_error: ErrorDisplay::Empty,
        ..PanelSettings::default()
    };
    let panel = StatusPanel::new(PanelKind::Swarm, doc.clone(), source.clone(), settings);
    panel.init(None, None).await;
    assert!(doc.slot_html(SWARM, Slot::Agents).unwrap().contains(r#"data-agent="a""#));

    source.fail_agents("timeout");
    source.set_tasks(TaskListing::from_tasks(vec![make_task("t", TaskState::Running)]));
    panel.refresh().await;

    assert_eq!(doc.slot_html(SWARM, Slot::Agents).as_deref(), Some(NO_AGENTS_HTML));
    assert_eq!(doc.slot_html(SWARM, Slot::AgentCount).as_deref(), Some("0"));
    assert!(doc.slot_html(SWARM, Slot::Tasks).unwrap().contains(r#"data-task-id="t""#));
    panel.destroy();
}

#[tokio::test]
async fn source_without_a_section_is_not_asked_for_it() {
    let source = Arc::new(ScriptedSource::new(&[Section::Tasks]));
    let (doc, panel) = panel_over(PanelKind::Swarm, source.clone());
    panel.init(None, None).await;

    assert_eq!(source.calls(Section::Orchestration), 0);
    assert_eq!(source.calls(Section::Agents), 0);
    assert_eq!(source.calls(Section::Tasks), 1);
    assert_eq!(doc.slot_html(SWARM, Slot::Agents).as_deref(), Some(LOADING_HTML));
    panel.destroy();
}

// ---------------------------------------------------------------------------
// Task list rendering
// ---------------------------------------------------------------------------

#[tokio::test]
async fn fifteen_tasks_render_first_ten() {
    let tasks: Vec<_> = (0..15)
        .map(|i| make_task(&format!("task-{:02}", i), TaskState::Running))
        .collect();
    let source = Arc::new(ScriptedSource::all_sections());
    source.set_tasks(TaskListing::from_tasks(tasks));

    let (doc, panel) = panel_over(PanelKind::TaskMonitor, source);
    panel.init(None, Some("ctx")).await;

    let html = doc.slot_html(TASKS, Slot::Tasks).unwrap();
    assert_eq!(count(&html, r#"class="task-item "#), 10);
    assert!(html.contains(r#"data-task-id="task-00""#));
    assert!(html.contains(r#"data-task-id="task-09""#));
    assert!(!html.contains(r#"data-task-id="task-10""#));
    assert_eq!(
        doc.slot_html(TASKS, Slot::TaskBadge).as_deref(),
        Some(r#"<span class="task-badge active">15</span>"#)
    );
    assert_eq!(panel.bound_actions().len(), 10);
    panel.destroy();
}

#[tokio::test]
async fn max_tasks_setting_controls_truncation() {
    let tasks: Vec<_> = (0..6)
        .map(|i| make_task(&i.to_string(), TaskState::Pending))
        .collect();
    let source = Arc::new(ScriptedSource::all_sections());
    source.set_tasks(TaskListing::from_tasks(tasks));
    let doc = Document::with_default_panels();
    let settings = PanelSettings {
        max_tasks: 3,
        ..PanelSettings::default()
    };
    let panel = StatusPanel::new(PanelKind::TaskMonitor, doc.clone(), source, settings);
    panel.init(None, None).await;

    let html = doc.slot_html(TASKS, Slot::Tasks).unwrap();
    assert_eq!(count(&html, r#"class="task-item "#), 3);
    panel.destroy();
}

#[tokio::test]
async fn empty_task_list_shows_placeholder_and_zero_badge() {
    let source = Arc::new(ScriptedSource::all_sections());
    let (doc, panel) = panel_over(PanelKind::TaskMonitor, source);
    panel.init(None, Some("ctx")).await;

    assert_eq!(doc.slot_html(TASKS, Slot::Tasks).as_deref(), Some(NO_TASKS_HTML));
    let html = doc.inner_html(TASKS).unwrap();
    assert!(html.contains(r#"<span class="task-badge empty">0</span>"#));
    assert!(panel.bound_actions().is_empty());
    panel.destroy();
}

#[tokio::test]
async fn markup_in_names_is_escaped() {
    let mut task = make_task("x\"y", TaskState::Failed);
    task.name = "<script>alert(\"pwned\")</script>".to_string();
    task.error = Some("a < b && c > d".to_string());
    let source = Arc::new(ScriptedSource::all_sections());
    source.set_tasks(TaskListing::from_tasks(vec![task]));
    source.set_agents(vec![AgentInfo::new(
        "<img src=x>",
        AgentProfile::Verifier,
        AgentState::Working,
    )]);

    let (doc, panel) = panel_over(PanelKind::Swarm, source);
    panel.init(None, None).await;

    let html = doc.inner_html(SWARM).unwrap();
    assert!(!html.contains("<script>"));
    assert!(html.contains("&lt;img src=x&gt;"));
    assert!(html.contains("&lt;script&gt;"));
    assert!(html.contains("a &lt; b &amp;&amp; c &gt; d"));
    assert!(html.contains(r#"data-task-id="x&quot;y""#));
    panel.destroy();
}

#[tokio::test]
async fn placeholder_text_in_data_is_not_expanded() {
    let source = Arc::new(ScriptedSource::all_sections());
    source.set_orchestration(Some(OrchestrationStatus::new(
        OrchestrationState::Executing,
        "{{tasks}}",
    )));
    source.set_agents(vec![AgentInfo::new(
        "{{tasks}}",
        AgentProfile::Executor,
        AgentState::Working,
    )]);
    source.set_tasks(TaskListing::from_tasks(vec![make_task("t1", TaskState::Running)]));

    let (doc, panel) = panel_over(PanelKind::Swarm, source);
    panel.init(None, None).await;

    let html = doc.inner_html(SWARM).unwrap();
    assert_eq!(count(&html, r#"data-task-id="t1""#), 1);
    assert!(doc.slot_html(SWARM, Slot::Agents).unwrap().contains("{{tasks}}"));
    assert!(doc.slot_html(SWARM, Slot::Orchestration).unwrap().contains("{{tasks}}"));
    panel.destroy();
}

#[tokio::test]
async fn unknown_enum_values_render_with_default_visuals() {
    let snapshot: StoreSnapshot = serde_json::from_str(
        r#"{
            "orchestration": {"status": "replanning", "main_goal": "g", "progress": {"completed": 1, "total": 0}},
            "agents": [{"name": "w", "profile": "wizard", "status": "dreaming"}],
            "tasks": [{"id": "t", "name": "n", "state": "exploding", "progress": 250.0}]
        }"#,
    )
    .unwrap();
    let store = StatusStore::from_snapshot(snapshot);
    let (doc, panel) = panel_over(PanelKind::Swarm, Arc::new(MemorySource::new(store)));
    panel.init(None, None).await;

    let card = doc.slot_html(SWARM, Slot::Orchestration).unwrap();
    assert!(card.contains("1/0 (0%)"));
    let phases = doc.slot_html(SWARM, Slot::Phases).unwrap();
    assert!(phases.contains(r#"<div class="phase active" data-phase="planning">"#));
    let agents = doc.slot_html(SWARM, Slot::Agents).unwrap();
    assert!(agents.contains("status-unknown"));
    let tasks = doc.slot_html(SWARM, Slot::Tasks).unwrap();
    assert!(tasks.contains("task-unknown"));
    assert!(tasks.contains("100%"));
    panel.destroy();
}

// ---------------------------------------------------------------------------
// In-memory store
// ---------------------------------------------------------------------------

#[tokio::test]
async fn store_updates_reach_every_mounted_panel() {
    let store = StatusStore::new();
    let source: Arc<dyn swarmwatch::StatusSource> = Arc::new(MemorySource::new(store.clone()));
    let doc = Document::with_default_panels();
    let swarm = StatusPanel::new(PanelKind::Swarm, doc.clone(), source.clone(), PanelSettings::default());
    let monitor = StatusPanel::new(PanelKind::TaskMonitor, doc.clone(), source, PanelSettings::default());
    swarm.init(None, None).await;
    monitor.init(None, None).await;
    assert_eq!(store.listener_count(), 2);

    store.update_tasks(vec![
        make_task("a", TaskState::Running),
        make_task("b", TaskState::Completed),
    ]);
    for container in [SWARM, TASKS] {
        let html = doc.slot_html(container, Slot::Tasks).unwrap();
        assert!(html.contains(r#"data-task-id="a""#), "{} missed the update", container);
        assert_eq!(
            doc.slot_html(container, Slot::TaskBadge).as_deref(),
            Some(r#"<span class="task-badge active">1</span>"#)
        );
    }

    monitor.destroy();
    assert_eq!(store.listener_count(), 1);
    swarm.destroy();
    assert_eq!(store.listener_count(), 0);
}

#[tokio::test]
async fn caller_mutation_after_setter_does_not_leak() {
    let store = StatusStore::new();
    let (doc, panel) = panel_over(PanelKind::Swarm, Arc::new(MemorySource::new(store.clone())));
    panel.init(None, None).await;

    let mut agents = vec![AgentInfo::new("original", AgentProfile::Planner, AgentState::Ready)];
    store.update_agents(agents.clone());
    agents[0].name = "mutated".to_string();
    panel.refresh().await;

    let html = doc.slot_html(SWARM, Slot::Agents).unwrap();
    assert!(html.contains("original"));
    assert!(!html.contains("mutated"));
    panel.destroy();
}

#[tokio::test]
async fn cancel_button_cancels_through_memory_source() {
    let store = StatusStore::new();
    store.update_tasks(vec![
        make_task("run", TaskState::Running),
        make_task("done", TaskState::Completed),
    ]);
    let (doc, panel) = panel_over(PanelKind::TaskMonitor, Arc::new(MemorySource::new(store.clone())));
    panel.init(None, None).await;

    let html = doc.slot_html(TASKS, Slot::Tasks).unwrap();
    assert!(html.contains(r#"data-action="cancel:run""#));
    assert!(!html.contains(r#"data-action="cancel:done""#));

    assert!(panel.trigger("cancel:run").await);
    let snapshot = store.snapshot();
    assert_eq!(snapshot.tasks[0].state, TaskState::Cancelled);
    assert!(snapshot.tasks[0].completed_at.is_some());

    let html = doc.slot_html(TASKS, Slot::Tasks).unwrap();
    assert!(html.contains("task-cancelled"));
    assert!(!html.contains("data-action=\"cancel:"));
    assert_eq!(
        doc.slot_html(TASKS, Slot::TaskBadge).as_deref(),
        Some(r#"<span class="task-badge empty">0</span>"#)
    );
    assert!(!panel.trigger("cancel:run").await);
    panel.destroy();
}

#[tokio::test]
#[serial]
async fn global_store_feeds_panels() {
    let store = StatusStore::global();
    store.update_agents(Vec::new());
    let (doc, panel) = panel_over(PanelKind::Swarm, Arc::new(MemorySource::new(StatusStore::global())));
    panel.init(None, None).await;

    store.add_agent(AgentInfo::new("shared", AgentProfile::Knowledge, AgentState::Working));
    assert!(doc.slot_html(SWARM, Slot::Agents).unwrap().contains("shared"));
    panel.destroy();

    assert!(store.remove_agent("shared"));
    assert!(StatusStore::global().snapshot().agents.is_empty());
}

// ---------------------------------------------------------------------------
// Lifecycle
// ---------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn timer_refreshes_until_stopped() {
    let source = Arc::new(ScriptedSource::all_sections());
    let doc = Document::with_default_panels();
    let settings = PanelSettings {
        refresh_interval_ms: 1000,
        ..PanelSettings::default()
    };
    let panel = StatusPanel::new(PanelKind::TaskMonitor, doc, source.clone(), settings);
    panel.init(None, None).await;
    assert_eq!(source.calls(Section::Tasks), 1);

    tokio::time::sleep(Duration::from_millis(2500)).await;
    assert_eq!(source.calls(Section::Tasks), 3);

    panel.stop_auto_refresh();
    tokio::time::sleep(Duration::from_secs(10)).await;
    assert_eq!(source.calls(Section::Tasks), 3);

    panel.start_auto_refresh(Duration::from_millis(1000));
    tokio::time::sleep(Duration::from_millis(1500)).await;
    assert_eq!(source.calls(Section::Tasks), 4);
    panel.destroy();
}

#[tokio::test(start_paused = true)]
async fn destroy_stops_the_timer() {
    let source = Arc::new(ScriptedSource::all_sections());
    let (doc, panel) = panel_over(PanelKind::TaskMonitor, source.clone());
    panel.init(None, None).await;
    panel.destroy();
    assert!(!panel.has_active_timer());

    tokio::time::sleep(Duration::from_secs(60)).await;
    assert_eq!(source.calls(Section::Tasks), 1);
    assert!(!doc.is_mounted(TASKS));
}

#[tokio::test]
async fn late_completion_after_destroy_is_dropped() {
    let source = Arc::new(ScriptedSource::all_sections());
    let (doc, panel) = panel_over(PanelKind::TaskMonitor, source.clone());
    panel.init(None, None).await;

    let gate = source.gate_tasks();
    source.set_tasks(TaskListing::from_tasks(vec![make_task("late", TaskState::Running)]));
    let pending = tokio::spawn({
        let panel = panel.clone();
        async move { panel.refresh().await }
    });
    while source.calls(Section::Tasks) < 2 {
        tokio::task::yield_now().await;
    }

    panel.destroy();
    gate.add_permits(1);
    pending.await.unwrap();

    assert!(!doc.is_mounted(TASKS));
    assert!(!doc.inner_html(TASKS).unwrap().contains("late"));
    assert!(!panel.is_mounted());
}

#[tokio::test]
async fn destroyed_panel_can_be_reinitialised() {
    let source = Arc::new(ScriptedSource::all_sections());
    source.set_tasks(TaskListing::from_tasks(vec![make_task("again", TaskState::Paused)]));
    let (doc, panel) = panel_over(PanelKind::TaskMonitor, source);
    panel.init(None, Some("one")).await;
    panel.destroy();
    panel.init(None, Some("two")).await;

    assert!(panel.is_mounted());
    assert_eq!(panel.context_id().as_deref(), Some("two"));
    assert!(doc.slot_html(TASKS, Slot::Tasks).unwrap().contains("task-paused"));
    panel.destroy();
}

#[tokio::test]
async fn refresh_from_previous_mount_does_not_leak_into_the_next() {
    let source = Arc::new(ScriptedSource::all_sections());
    source.set_tasks_for(
        "one",
        TaskListing::from_tasks(vec![make_task("from-one", TaskState::Running)]),
    );
    source.set_tasks_for(
        "two",
        TaskListing::from_tasks(vec![make_task("from-two", TaskState::Running)]),
    );
    let gate = source.gate_tasks_for("one");
    let (doc, panel) = panel_over(PanelKind::TaskMonitor, source.clone());

    let first = tokio::spawn({
        let panel = panel.clone();
        async move { panel.init(None, Some("one")).await }
    });
    while source.calls(Section::Tasks) < 1 {
        tokio::task::yield_now().await;
    }

    panel.destroy();
    panel.init(None, Some("two")).await;
    gate.add_permits(1);
    first.await.unwrap();

    let html = doc.slot_html(TASKS, Slot::Tasks).unwrap();
    assert!(html.contains("from-two"));
    assert!(!html.contains("from-one"));
    assert_eq!(panel.bound_actions(), vec!["cancel:from-two".to_string()]);
    assert_eq!(panel.context_id().as_deref(), Some("two"));
    panel.destroy();
}

#[tokio::test]
async fn toggle_key_is_ignored_while_unmounted() {
    let source = Arc::new(ScriptedSource::all_sections());
    let (doc, panel) = panel_over(PanelKind::TaskMonitor, source);

    assert!(!panel.trigger("toggle").await);
    assert!(!panel.is_collapsed());

    panel.init(None, None).await;
    assert!(panel.trigger("toggle").await);
    assert!(doc.inner_html(TASKS).unwrap().contains("collapsed"));
    panel.destroy();

    assert!(!panel.trigger("toggle").await);
    assert!(!panel.is_collapsed());
}

#[tokio::test]
async fn removed_container_makes_panel_inert() {
    let source = Arc::new(ScriptedSource::all_sections());
    let (doc, panel) = panel_over(PanelKind::TaskMonitor, source.clone());
    doc.remove_container(TASKS);
    panel.init(None, None).await;

    assert!(!panel.is_mounted());
    assert!(!panel.has_active_timer());
    assert_eq!(source.calls(Section::Tasks), 0);
    panel.toggle();
    panel.destroy();
}
