//! In-process model of the host page.
//!
//! A [`Document`] holds markup templates and containers, both addressed by id.
//! Mounting a template into a container produces a [`MountPoint`]; the
//! template's `{{slot}}` placeholders are the regions panels render into.
//! A mount point only ever touches the mount it created, so a stale handle
//! left behind by a destroyed panel can neither overwrite nor re-attach.

use parking_lot::Mutex;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

/// Named region of a mounted template.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Slot {
    Orchestration,
    Phases,
    Agents,
    AgentCount,
    Tasks,
    TaskBadge,
}

impl Slot {
    pub const ALL: [Slot; 6] = [
        Slot::Orchestration,
        Slot::Phases,
        Slot::Agents,
        Slot::AgentCount,
        Slot::Tasks,
        Slot::TaskBadge,
    ];

    /// Placeholder name used inside templates, e.g. `{{tasks}}`.
    pub fn placeholder(&self) -> &'static str {
        match self {
            Slot::Orchestration => "{{orchestration}}",
            Slot::Phases => "{{phases}}",
            Slot::Agents => "{{agents}}",
            Slot::AgentCount => "{{agent_count}}",
            Slot::Tasks => "{{tasks}}",
            Slot::TaskBadge => "{{task_badge}}",
        }
    }

    pub fn from_placeholder(token: &str) -> Option<Slot> {
        Slot::ALL.into_iter().find(|slot| slot.placeholder() == token)
    }
}

/// Placeholder for the panel's collapsed/expanded state class.
pub const STATE_CLASS_PLACEHOLDER: &str = "{{state_class}}";
/// Placeholder for the toggle button glyph.
pub const TOGGLE_ICON_PLACEHOLDER: &str = "{{toggle_icon}}";

pub const EXPANDED_ICON: &str = "▼";
pub const COLLAPSED_ICON: &str = "▶";

#[derive(Debug)]
struct Mounted {
    id: u64,
    template: String,
    slots: BTreeMap<Slot, String>,
    collapsed: bool,
}

impl Mounted {
    /// Fill the template in one left-to-right pass. Inserted slot content is
    /// never scanned again, so `{{..}}` inside rendered data stays literal.
    fn render(&self) -> String {
        let mut html = String::with_capacity(self.template.len());
        let mut rest = self.template.as_str();
        while let Some(start) = rest.find("{{") {
            let Some(len) = rest[start..].find("}}") else {
                break;
            };
            let end = start + len + 2;
            let token = &rest[start..end];
            html.push_str(&rest[..start]);
            html.push_str(self.fill(token).unwrap_or(token));
            rest = &rest[end..];
        }
        html.push_str(rest);
        html
    }

    fn fill(&self, token: &str) -> Option<&str> {
        match token {
            STATE_CLASS_PLACEHOLDER if self.collapsed => Some("collapsed"),
            STATE_CLASS_PLACEHOLDER => Some("expanded"),
            TOGGLE_ICON_PLACEHOLDER if self.collapsed => Some(COLLAPSED_ICON),
            TOGGLE_ICON_PLACEHOLDER => Some(EXPANDED_ICON),
            _ => {
                let slot = Slot::from_placeholder(token)?;
                Some(self.slots.get(&slot).map(String::as_str).unwrap_or(""))
            }
        }
    }
}

#[derive(Debug, Default)]
struct DocumentInner {
    templates: HashMap<String, String>,
    containers: HashMap<String, Option<Mounted>>,
    next_mount: u64,
}

/// Shared handle to the host page. Cloning shares the same page.
#[derive(Debug, Clone, Default)]
pub struct Document {
    inner: Arc<Mutex<DocumentInner>>,
}

impl Document {
    pub fn new() -> Self {
        Self::default()
    }

    /// A page carrying both built-in panel templates and their default
    /// containers.
    pub fn with_default_panels() -> Self {
        let doc = Self::new();
        for kind in [crate::PanelKind::Swarm, crate::PanelKind::TaskMonitor] {
            doc.add_template(kind.template_id(), kind.default_template());
            doc.add_container(kind.default_container_id());
        }
        doc
    }

    pub fn add_template(&self, id: impl Into<String>, markup: impl Into<String>) {
        self.inner.lock().templates.insert(id.into(), markup.into());
    }

    pub fn add_container(&self, id: impl Into<String>) {
        self.inner.lock().containers.entry(id.into()).or_insert(None);
    }

    pub fn remove_container(&self, id: &str) {
        self.inner.lock().containers.remove(id);
    }

    pub fn template(&self, id: &str) -> Option<String> {
        self.inner.lock().templates.get(id).cloned()
    }

    pub fn has_container(&self, id: &str) -> bool {
        self.inner.lock().containers.contains_key(id)
    }

    /// Whether something is currently mounted in the container.
    pub fn is_mounted(&self, container_id: &str) -> bool {
        matches!(self.inner.lock().containers.get(container_id), Some(Some(_)))
    }

    /// Serialized content of a container. `None` if the container does not
    /// exist; an empty string if nothing is mounted.
    pub fn inner_html(&self, container_id: &str) -> Option<String> {
        let inner = self.inner.lock();
        let container = inner.containers.get(container_id)?;
        Some(container.as_ref().map(Mounted::render).unwrap_or_default())
    }

    /// Current content of one slot of the mount in a container.
    pub fn slot_html(&self, container_id: &str, slot: Slot) -> Option<String> {
        let inner = self.inner.lock();
        let mounted = inner.containers.get(container_id)?.as_ref()?;
        mounted.slots.get(&slot).cloned()
    }

    /// Clone `template` into the container, replacing whatever was there.
    /// Returns `None` if the container does not exist.
    pub fn mount(&self, container_id: &str, template: String) -> Option<MountPoint> {
        let mut inner = self.inner.lock();
        inner.next_mount += 1;
        let id = inner.next_mount;
        let container = inner.containers.get_mut(container_id)?;
        *container = Some(Mounted {
            id,
            template,
            slots: BTreeMap::new(),
            collapsed: false,
        });
        Some(MountPoint {
            doc: self.clone(),
            container_id: container_id.to_string(),
            mount_id: id,
        })
    }

    fn with_mount<R>(
        &self,
        container_id: &str,
        mount_id: u64,
        f: impl FnOnce(&mut Mounted) -> R,
    ) -> Option<R> {
        let mut inner = self.inner.lock();
        match inner.containers.get_mut(container_id) {
            Some(Some(mounted)) if mounted.id == mount_id => Some(f(mounted)),
            _ => None,
        }
    }
}

/// Handle on one mounted template instance.
#[derive(Debug, Clone)]
pub struct MountPoint {
    doc: Document,
    container_id: String,
    mount_id: u64,
}

impl MountPoint {
    pub fn container_id(&self) -> &str {
        &self.container_id
    }

    pub fn is_attached(&self) -> bool {
        self.doc
            .with_mount(&self.container_id, self.mount_id, |_| ())
            .is_some()
    }

    /// Replace a slot's content. A detached mount point ignores the write and
    /// returns `false`.
    pub fn set_slot(&self, slot: Slot, html: String) -> bool {
        self.doc
            .with_mount(&self.container_id, self.mount_id, |m| {
                m.slots.insert(slot, html);
            })
            .is_some()
    }

    /// Identity of this mount. A container that has been remounted carries a
    /// different id.
    pub fn id(&self) -> u64 {
        self.mount_id
    }

    pub fn set_collapsed(&self, collapsed: bool) -> bool {
        self.doc
            .with_mount(&self.container_id, self.mount_id, |m| m.collapsed = collapsed)
            .is_some()
    }

    /// Remove this mount from its container. No effect if something else has
    /// since been mounted there.
    pub fn detach(&self) -> bool {
        let mut inner = self.doc.inner.lock();
        let Some(container) = inner.containers.get_mut(&self.container_id) else {
            return false;
        };
        if container.as_ref().map(|m| m.id) == Some(self.mount_id) {
            *container = None;
            true
        } else {
            false
        }
    }
}
