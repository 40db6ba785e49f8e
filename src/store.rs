//! Observable in-memory status store.
//!
//! The store is the only mutation path for the in-memory data source. Each
//! setter swaps in a fresh immutable [`StoreSnapshot`] and then notifies
//! subscribers synchronously, outside the store lock. Readers hold an
//! `Arc<StoreSnapshot>`, so nothing a caller does to its own copies after a
//! setter returns can reach a later render.

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::{Arc, OnceLock, Weak};

use anyhow::{Context, Result};

use crate::model::{AgentInfo, BackgroundTask, OrchestrationStatus, TaskListing};

/// Part of a panel fed by one sub-refresher.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Section {
    Orchestration,
    Agents,
    Tasks,
}

impl std::fmt::Display for Section {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Section::Orchestration => write!(f, "orchestration"),
            Section::Agents => write!(f, "agents"),
            Section::Tasks => write!(f, "tasks"),
        }
    }
}

/// Everything the in-memory variant knows at one instant. Field names are the
/// stable keys of the shared state.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct StoreSnapshot {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub orchestration: Option<OrchestrationStatus>,
    #[serde(default)]
    pub agents: Vec<AgentInfo>,
    #[serde(default)]
    pub tasks: Vec<BackgroundTask>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context_id: Option<String>,
}

impl StoreSnapshot {
    /// Load a snapshot from a JSON file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read snapshot: {}", path.display()))?;
        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse snapshot: {}", path.display()))
    }

    pub fn task_listing(&self) -> TaskListing {
        TaskListing::from_tasks(self.tasks.clone())
    }
}

/// Change notification delivered to subscribers.
#[derive(Debug, Clone)]
pub struct StoreEvent {
    pub section: Option<Section>,
    pub snapshot: Arc<StoreSnapshot>,
}

pub type Listener = Arc<dyn Fn(&StoreEvent) + Send + Sync>;

#[derive(Default)]
struct StoreInner {
    snapshot: Arc<StoreSnapshot>,
    listeners: BTreeMap<u64, Listener>,
    next_listener: u64,
}

/// Shared handle to a status store. Cloning shares the same store.
#[derive(Clone, Default)]
pub struct StatusStore {
    inner: Arc<Mutex<StoreInner>>,
}

impl std::fmt::Debug for StatusStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.inner.lock();
        f.debug_struct("StatusStore")
            .field("snapshot", &inner.snapshot)
            .field("listeners", &inner.listeners.len())
            .finish()
    }
}

static GLOBAL_STORE: OnceLock<StatusStore> = OnceLock::new();

impl StatusStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_snapshot(snapshot: StoreSnapshot) -> Self {
        let store = Self::new();
        store.inner.lock().snapshot = Arc::new(snapshot);
        store
    }

    /// The process-wide store, for hosts that share one status bus between
    /// independent modules instead of injecting a store.
    pub fn global() -> StatusStore {
        GLOBAL_STORE.get_or_init(StatusStore::new).clone()
    }

    pub fn snapshot(&self) -> Arc<StoreSnapshot> {
        Arc::clone(&self.inner.lock().snapshot)
    }

    /// Register a change listener. Dropping the returned guard unsubscribes.
    pub fn subscribe(&self, listener: Listener) -> Subscription {
        let mut inner = self.inner.lock();
        inner.next_listener += 1;
        let id = inner.next_listener;
        inner.listeners.insert(id, listener);
        Subscription {
            store: Arc::downgrade(&self.inner),
            id,
        }
    }

    pub fn listener_count(&self) -> usize {
        self.inner.lock().listeners.len()
    }

    pub fn update_orchestration(&self, status: Option<OrchestrationStatus>) {
        self.update(Some(Section::Orchestration), |s| s.orchestration = status);
    }

    pub fn update_agents(&self, agents: Vec<AgentInfo>) {
        self.update(Some(Section::Agents), |s| s.agents = agents);
    }

    pub fn update_tasks(&self, tasks: Vec<BackgroundTask>) {
        self.update(Some(Section::Tasks), |s| s.tasks = tasks);
    }

    /// Add an agent, replacing any existing agent with the same name in place.
    pub fn add_agent(&self, agent: AgentInfo) {
        self.update(Some(Section::Agents), |s| {
            match s.agents.iter_mut().find(|a| a.name == agent.name) {
                Some(existing) => *existing = agent,
                None => s.agents.push(agent),
            }
        });
    }

    /// Remove an agent by name. Returns whether one was removed.
    pub fn remove_agent(&self, name: &str) -> bool {
        let mut removed = false;
        self.update(Some(Section::Agents), |s| {
            let before = s.agents.len();
            s.agents.retain(|a| a.name != name);
            removed = s.agents.len() != before;
        });
        removed
    }

    pub fn set_context_id(&self, context_id: Option<String>) {
        self.update(None, |s| s.context_id = context_id);
    }

    /// Apply `f` to a copy of one task. Returns `false` if no task has the id.
    pub fn update_task(&self, task_id: &str, f: impl FnOnce(&mut BackgroundTask)) -> bool {
        let mut found = false;
        self.update(Some(Section::Tasks), |s| {
            if let Some(task) = s.tasks.iter_mut().find(|t| t.id == task_id) {
                f(task);
                found = true;
            }
        });
        found
    }

    fn update(&self, section: Option<Section>, f: impl FnOnce(&mut StoreSnapshot)) {
        let (snapshot, listeners) = {
            let mut inner = self.inner.lock();
            let mut next = StoreSnapshot::clone(&inner.snapshot);
            f(&mut next);
            inner.snapshot = Arc::new(next);
            let listeners: Vec<Listener> = inner.listeners.values().cloned().collect();
            (Arc::clone(&inner.snapshot), listeners)
        };

        let event = StoreEvent { section, snapshot };
        for listener in listeners {
            listener(&event);
        }
    }
}

/// Live registration on a [`StatusStore`].
pub struct Subscription {
    store: Weak<Mutex<StoreInner>>,
    id: u64,
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription").field("id", &self.id).finish()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(store) = self.store.upgrade() {
            store.lock().listeners.remove(&self.id);
        }
    }
}
