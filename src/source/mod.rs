//! Data-source adapters
//!
//! A panel reads its snapshots through [`StatusSource`]. Two variants exist:
//! - [`MemorySource`] reads an injected [`crate::StatusStore`] and forwards its
//!   change feed so setters re-render immediately
//! - [`RemoteSource`] polls the backend's task endpoints over HTTP

pub mod memory;
pub mod remote;

use async_trait::async_trait;
use thiserror::Error;

use crate::model::{AgentInfo, OrchestrationStatus, TaskListing};
use crate::store::{Listener, Section, Subscription};

pub use memory::MemorySource;
pub use remote::{RemoteSource, RemoteSourceConfig};

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("backend returned status {0}")]
    Status(reqwest::StatusCode),
    #[error("backend error: {0}")]
    Backend(String),
    #[error("invalid response: {0}")]
    Decode(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("no context id set")]
    MissingContext,
    #[error("{0} is not provided by this source")]
    Unsupported(Section),
}

/// Where a panel gets its snapshots from.
#[async_trait]
pub trait StatusSource: Send + Sync {
    /// Short name used in log lines.
    fn name(&self) -> &str;

    /// Sections this source can fill.
    fn sections(&self) -> &[Section];

    async fn orchestration(
        &self,
        context_id: Option<&str>,
    ) -> Result<Option<OrchestrationStatus>, SourceError> {
        let _ = context_id;
        Err(SourceError::Unsupported(Section::Orchestration))
    }

    async fn agents(&self, context_id: Option<&str>) -> Result<Vec<AgentInfo>, SourceError> {
        let _ = context_id;
        Err(SourceError::Unsupported(Section::Agents))
    }

    async fn tasks(&self, context_id: Option<&str>) -> Result<TaskListing, SourceError> {
        let _ = context_id;
        Err(SourceError::Unsupported(Section::Tasks))
    }

    /// Ask for a task to be cancelled.
    async fn cancel_task(&self, context_id: Option<&str>, task_id: &str) -> Result<(), SourceError>;

    /// Change feed, for sources that are written to in-process.
    fn subscribe(&self, listener: Listener) -> Option<Subscription> {
        let _ = listener;
        None
    }

    fn provides(&self, section: Section) -> bool {
        self.sections().contains(&section)
    }
}
