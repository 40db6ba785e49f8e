pub mod config;
pub mod document;
pub mod escape;
pub mod model;
pub mod panel;
pub mod render;
pub mod source;
pub mod store;
pub mod templates;

#[cfg(any(test, feature = "test-support"))]
pub mod testing;

pub use config::{Config, ConfigError, ErrorDisplay, PanelSettings, RemoteSettings};
pub use document::{Document, MountPoint, Slot};
pub use model::{
    AgentInfo, AgentProfile, AgentState, BackgroundTask, OrchestrationProgress,
    OrchestrationState, OrchestrationStatus, SubtaskState, SubtaskSummary, TaskListing, TaskState,
};
pub use panel::{MIN_REFRESH_INTERVAL, StatusPanel};
pub use render::{ActionBinding, Fragment, PanelAction, RenderOptions};
pub use source::{MemorySource, RemoteSource, RemoteSourceConfig, SourceError, StatusSource};
pub use store::{Listener, Section, StatusStore, StoreEvent, StoreSnapshot, Subscription};
pub use templates::PanelKind;
