//! Status panel lifecycle: mount, poll, render, tear down.
//!
//! A [`StatusPanel`] owns one mount point in a [`Document`]. `init` clones the
//! panel template into a container and starts a repeating timer; every tick
//! spawns a refresh that fetches each section independently and writes the
//! rendered fragment into that section's slots. Sections never share a slot,
//! so a late or failed section cannot disturb its siblings.
//!
//! Ticks are not cancelled by `stop_auto_refresh` or `destroy`. Each refresh
//! is pinned to the mount it started on; if that mount has been destroyed or
//! replaced by the time a fetch lands, the output is dropped.

use futures_util::future::join3;
use log::{debug, warn};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

use crate::config::{ErrorDisplay, PanelSettings};
use crate::document::{Document, MountPoint, Slot};
use crate::model::{AgentInfo, OrchestrationStatus, TaskListing};
use crate::render::{self, ActionBinding, PanelAction, RenderOptions};
use crate::source::{SourceError, StatusSource};
use crate::store::{Section, StoreEvent, Subscription};
use crate::templates::PanelKind;

/// Shortest refresh period accepted by [`StatusPanel::start_auto_refresh`].
pub const MIN_REFRESH_INTERVAL: Duration = Duration::from_millis(250);

#[derive(Default)]
struct PanelState {
    mount: Option<MountPoint>,
    collapsed: bool,
    timer: Option<JoinHandle<()>>,
    context_id: Option<String>,
    subscription: Option<Subscription>,
    bindings: HashMap<Section, Vec<ActionBinding>>,
}

struct PanelInner {
    kind: PanelKind,
    document: Document,
    source: Arc<dyn StatusSource>,
    settings: PanelSettings,
    state: Mutex<PanelState>,
}

/// A polling status panel. Cloning shares the same panel.
#[derive(Clone)]
pub struct StatusPanel {
    inner: Arc<PanelInner>,
}

impl std::fmt::Debug for StatusPanel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StatusPanel")
            .field("kind", &self.inner.kind)
            .field("source", &self.inner.source.name())
            .field("mounted", &self.is_mounted())
            .finish()
    }
}

impl StatusPanel {
    pub fn new(
        kind: PanelKind,
        document: Document,
        source: Arc<dyn StatusSource>,
        settings: PanelSettings,
    ) -> Self {
        Self {
            inner: Arc::new(PanelInner {
                kind,
                document,
                source,
                settings,
                state: Mutex::new(PanelState::default()),
            }),
        }
    }

    pub fn kind(&self) -> PanelKind {
        self.inner.kind
    }

    /// Mount the panel and start polling.
    ///
    /// `container_id` defaults to the panel kind's container. If the template
    /// or the container is missing from the document the panel logs a warning
    /// and stays inert. Calling `init` on a mounted panel remounts it.
    /// Must be called from within a Tokio runtime.
    pub async fn init(&self, container_id: Option<&str>, context_id: Option<&str>) {
        let kind = self.inner.kind;
        let container_id = container_id.unwrap_or(kind.default_container_id());

        let Some(template) = self.inner.document.template(kind.template_id()) else {
            warn!(
                "{} panel: template '{}' not found, panel disabled",
                kind,
                kind.template_id()
            );
            return;
        };
        if !self.inner.document.has_container(container_id) {
            warn!(
                "{} panel: container '{}' not found, panel disabled",
                kind, container_id
            );
            return;
        }

        self.destroy();

        let Some(mount) = self.inner.document.mount(container_id, template) else {
            warn!("{} panel: failed to mount into '{}'", kind, container_id);
            return;
        };
        for slot in kind.slots() {
            let placeholder = match slot {
                Slot::AgentCount | Slot::TaskBadge => String::new(),
                _ => render::LOADING_HTML.to_string(),
            };
            mount.set_slot(*slot, placeholder);
        }

        let weak = Arc::downgrade(&self.inner);
        let subscription = self.inner.source.subscribe(Arc::new(move |event: &StoreEvent| {
            if let Some(inner) = weak.upgrade() {
                inner.on_store_event(event);
            }
        }));

        {
            let mut state = self.inner.state.lock();
            state.mount = Some(mount);
            state.collapsed = false;
            state.context_id = context_id.map(String::from);
            state.subscription = subscription;
        }
        debug!("{} panel mounted into '{}'", kind, container_id);

        self.start_auto_refresh(self.inner.settings.refresh_interval());
        self.refresh().await;
    }

    /// Flip between collapsed and expanded. Fetching is unaffected.
    pub fn toggle(&self) {
        let mut state = self.inner.state.lock();
        state.collapsed = !state.collapsed;
        if let Some(mount) = state.mount.as_ref() {
            mount.set_collapsed(state.collapsed);
        }
    }

    /// Fetch and render every section once. Section failures are logged and
    /// handled per section; this never fails.
    pub async fn refresh(&self) {
        self.inner.refresh().await;
    }

    /// Install the refresh timer, replacing any existing one. Periods below
    /// [`MIN_REFRESH_INTERVAL`] are raised to it.
    pub fn start_auto_refresh(&self, interval: Duration) {
        if tokio::runtime::Handle::try_current().is_err() {
            warn!("{} panel: no Tokio runtime, auto-refresh not started", self.inner.kind);
            return;
        }
        let interval = interval.max(MIN_REFRESH_INTERVAL);
        let weak = Arc::downgrade(&self.inner);
        let handle = tokio::spawn(run_timer(weak, interval));

        let previous = self.inner.state.lock().timer.replace(handle);
        if let Some(previous) = previous {
            previous.abort();
        }
        debug!("{} panel: auto-refresh every {:?}", self.inner.kind, interval);
    }

    /// Stop the refresh timer. In-flight refreshes are left to finish.
    pub fn stop_auto_refresh(&self) {
        let timer = self.inner.state.lock().timer.take();
        if let Some(timer) = timer {
            timer.abort();
        }
    }

    /// Stop polling and unmount. Safe to call at any time, any number of times.
    pub fn destroy(&self) {
        let (timer, mount, subscription) = {
            let mut state = self.inner.state.lock();
            state.bindings.clear();
            state.collapsed = false;
            (
                state.timer.take(),
                state.mount.take(),
                state.subscription.take(),
            )
        };
        if let Some(timer) = timer {
            timer.abort();
        }
        drop(subscription);
        if let Some(mount) = mount {
            mount.detach();
            debug!("{} panel unmounted from '{}'", self.inner.kind, mount.container_id());
        }
    }

    /// Resolve an activated element's `data-action` key against the bindings
    /// of the last render and run the bound action. Returns whether the key
    /// was bound.
    pub async fn trigger(&self, key: &str) -> bool {
        let action = {
            let state = self.inner.state.lock();
            if state.mount.is_none() {
                None
            } else if key == PanelAction::Toggle.key() {
                Some(PanelAction::Toggle)
            } else {
                state
                    .bindings
                    .values()
                    .flatten()
                    .find(|binding| binding.key == key)
                    .map(|binding| binding.action.clone())
            }
        };

        match action {
            Some(action) => {
                self.dispatch(action).await;
                true
            }
            None => {
                debug!("{} panel: no binding for '{}'", self.inner.kind, key);
                false
            }
        }
    }

    /// Run an action. A successful cancel refreshes right away instead of
    /// waiting for the next tick.
    pub async fn dispatch(&self, action: PanelAction) {
        match action {
            PanelAction::Toggle => self.toggle(),
            PanelAction::CancelTask { task_id } => {
                let context_id = self.context_id();
                match self
                    .inner
                    .source
                    .cancel_task(context_id.as_deref(), &task_id)
                    .await
                {
                    Ok(()) => {
                        debug!("{} panel: cancelled task {}", self.inner.kind, task_id);
                        self.refresh().await;
                    }
                    Err(e) => warn!(
                        "{} panel: failed to cancel task {}: {}",
                        self.inner.kind, task_id, e
                    ),
                }
            }
        }
    }

    pub fn is_mounted(&self) -> bool {
        self.inner
            .state
            .lock()
            .mount
            .as_ref()
            .is_some_and(MountPoint::is_attached)
    }

    pub fn is_collapsed(&self) -> bool {
        self.inner.state.lock().collapsed
    }

    pub fn has_active_timer(&self) -> bool {
        self.inner
            .state
            .lock()
            .timer
            .as_ref()
            .is_some_and(|timer| !timer.is_finished())
    }

    pub fn context_id(&self) -> Option<String> {
        self.inner.state.lock().context_id.clone()
    }

    pub fn set_context_id(&self, context_id: Option<&str>) {
        self.inner.state.lock().context_id = context_id.map(String::from);
    }

    /// Action keys bound by the last render, in no particular order.
    pub fn bound_actions(&self) -> Vec<String> {
        self.inner
            .state
            .lock()
            .bindings
            .values()
            .flatten()
            .map(|binding| binding.key.clone())
            .collect()
    }
}

async fn run_timer(panel: Weak<PanelInner>, period: Duration) {
    let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    loop {
        ticker.tick().await;
        let Some(inner) = panel.upgrade() else {
            break;
        };
        tokio::spawn(async move {
            inner.refresh().await;
        });
    }
}

impl PanelInner {
    fn covers(&self, section: Section) -> bool {
        self.kind.sections().contains(&section) && self.source.provides(section)
    }

    fn render_options(&self) -> RenderOptions {
        RenderOptions {
            max_tasks: self.settings.max_tasks,
            max_agents: self.settings.max_agents,
            ..RenderOptions::default()
        }
    }

    /// Id of the current mount, if any.
    fn mount_id(&self) -> Option<u64> {
        self.state.lock().mount.as_ref().map(MountPoint::id)
    }

    /// Fetch every covered section for the current mount. Results are
    /// rendered into that mount only; if the panel has been destroyed or
    /// remounted by the time a fetch lands, the result is dropped.
    async fn refresh(&self) {
        let (mount_id, context_id) = {
            let state = self.state.lock();
            let Some(mount) = state.mount.as_ref() else {
                return;
            };
            (mount.id(), state.context_id.clone())
        };
        let context_id = context_id.as_deref();

        join3(
            self.refresh_orchestration(mount_id, context_id),
            self.refresh_agents(mount_id, context_id),
            self.refresh_tasks(mount_id, context_id),
        )
        .await;
    }

    async fn refresh_orchestration(&self, mount_id: u64, context_id: Option<&str>) {
        if !self.covers(Section::Orchestration) {
            return;
        }
        match self.source.orchestration(context_id).await {
            Ok(status) => self.render_orchestration(mount_id, status.as_ref()),
            Err(e) => self.section_failed(mount_id, Section::Orchestration, &e),
        }
    }

    async fn refresh_agents(&self, mount_id: u64, context_id: Option<&str>) {
        if !self.covers(Section::Agents) {
            return;
        }
        match self.source.agents(context_id).await {
            Ok(agents) => self.render_agents(mount_id, &agents),
            Err(e) => self.section_failed(mount_id, Section::Agents, &e),
        }
    }

    async fn refresh_tasks(&self, mount_id: u64, context_id: Option<&str>) {
        if !self.covers(Section::Tasks) {
            return;
        }
        match self.source.tasks(context_id).await {
            Ok(listing) => self.render_tasks(mount_id, &listing),
            Err(e) => self.section_failed(mount_id, Section::Tasks, &e),
        }
    }

    fn section_failed(&self, mount_id: u64, section: Section, error: &SourceError) {
        warn!(
            "{} panel: {} refresh from {} source failed: {}",
            self.kind,
            section,
            self.source.name(),
            error
        );
        if self.settings.on_error == ErrorDisplay::Empty {
            match section {
                Section::Orchestration => self.render_orchestration(mount_id, None),
                Section::Agents => self.render_agents(mount_id, &[]),
                Section::Tasks => self.render_tasks(mount_id, &TaskListing::default()),
            }
        }
    }

    fn on_store_event(&self, event: &StoreEvent) {
        let Some(section) = event.section else {
            return;
        };
        if !self.kind.sections().contains(&section) {
            return;
        }
        let Some(mount_id) = self.mount_id() else {
            return;
        };
        let snapshot = &event.snapshot;
        match section {
            Section::Orchestration => {
                self.render_orchestration(mount_id, snapshot.orchestration.as_ref())
            }
            Section::Agents => self.render_agents(mount_id, &snapshot.agents),
            Section::Tasks => self.render_tasks(mount_id, &snapshot.task_listing()),
        }
    }

    fn render_orchestration(&self, mount_id: u64, status: Option<&OrchestrationStatus>) {
        let opts = self.render_options();
        let card = render::orchestration(status, &opts);
        self.apply(
            mount_id,
            Section::Orchestration,
            vec![
                (Slot::Orchestration, card.html),
                (Slot::Phases, render::phases(status)),
            ],
            card.bindings,
        );
    }

    fn render_agents(&self, mount_id: u64, agents: &[AgentInfo]) {
        let opts = self.render_options();
        self.apply(
            mount_id,
            Section::Agents,
            vec![
                (Slot::Agents, render::agents(agents, &opts)),
                (Slot::AgentCount, render::agent_count(agents.len())),
            ],
            Vec::new(),
        );
    }

    fn render_tasks(&self, mount_id: u64, listing: &TaskListing) {
        let opts = self.render_options();
        let fragment = render::tasks(listing, &opts);
        self.apply(
            mount_id,
            Section::Tasks,
            vec![
                (Slot::Tasks, fragment.html),
                (Slot::TaskBadge, render::task_badge(listing.active_count)),
            ],
            fragment.bindings,
        );
    }

    /// Write a section's slots and record its bindings, unless the mount the
    /// render was made for is no longer the panel's current mount.
    fn apply(
        &self,
        mount_id: u64,
        section: Section,
        writes: Vec<(Slot, String)>,
        bindings: Vec<ActionBinding>,
    ) {
        let mut state = self.state.lock();
        let mount = match state.mount.as_ref() {
            Some(mount) if mount.id() == mount_id => mount,
            _ => {
                debug!(
                    "{} panel: mount {} is gone, dropping {} render",
                    self.kind, mount_id, section
                );
                return;
            }
        };
        let mut attached = true;
        for (slot, html) in writes {
            attached &= mount.set_slot(slot, html);
        }
        if attached {
            state.bindings.insert(section, bindings);
        }
    }
}

impl Drop for PanelInner {
    fn drop(&mut self) {
        if let Some(timer) = self.state.get_mut().timer.take() {
            timer.abort();
        }
    }
}
