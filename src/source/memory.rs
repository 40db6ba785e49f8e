use async_trait::async_trait;

use super::{SourceError, StatusSource};
use crate::model::{AgentInfo, OrchestrationStatus, TaskListing, TaskState};
use crate::store::{Listener, Section, StatusStore, Subscription};

const ALL_SECTIONS: [Section; 3] = [Section::Orchestration, Section::Agents, Section::Tasks];

/// Reads snapshots from an in-process [`StatusStore`].
#[derive(Debug, Clone)]
pub struct MemorySource {
    store: StatusStore,
}

impl MemorySource {
    pub fn new(store: StatusStore) -> Self {
        Self { store }
    }
}

#[async_trait]
impl StatusSource for MemorySource {
    fn name(&self) -> &str {
        "memory"
    }

    fn sections(&self) -> &[Section] {
        &ALL_SECTIONS
    }

    async fn orchestration(
        &self,
        _context_id: Option<&str>,
    ) -> Result<Option<OrchestrationStatus>, SourceError> {
        Ok(self.store.snapshot().orchestration.clone())
    }

    async fn agents(&self, _context_id: Option<&str>) -> Result<Vec<AgentInfo>, SourceError> {
        Ok(self.store.snapshot().agents.clone())
    }

    async fn tasks(&self, _context_id: Option<&str>) -> Result<TaskListing, SourceError> {
        Ok(self.store.snapshot().task_listing())
    }

    /// Marks the task cancelled in the store. Terminal tasks are left alone.
    async fn cancel_task(&self, _context_id: Option<&str>, task_id: &str) -> Result<(), SourceError> {
        let now = chrono::Utc::now().to_rfc3339();
        let found = self.store.update_task(task_id, |task| {
            if !task.state.is_terminal() {
                task.state = TaskState::Cancelled;
                task.completed_at = Some(now.clone());
                task.updated_at = Some(now);
            }
        });
        if found {
            Ok(())
        } else {
            Err(SourceError::NotFound(format!("task '{}'", task_id)))
        }
    }

    fn subscribe(&self, listener: Listener) -> Option<Subscription> {
        Some(self.store.subscribe(listener))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::BackgroundTask;

    #[tokio::test]
    async fn test_reads_current_snapshot() {
        let store = StatusStore::new();
        let source = MemorySource::new(store.clone());
        assert!(source.orchestration(None).await.unwrap().is_none());

        store.update_tasks(vec![
            BackgroundTask::new("a", "a", TaskState::Running),
            BackgroundTask::new("b", "b", TaskState::Completed),
        ]);
        let listing = source.tasks(None).await.unwrap();
        assert_eq!(listing.tasks.len(), 2);
        assert_eq!(listing.active_count, 1);
    }

    #[tokio::test]
    async fn test_cancel_marks_task_cancelled() {
        let store = StatusStore::new();
        store.update_tasks(vec![
            BackgroundTask::new("a", "a", TaskState::Running),
            BackgroundTask::new("b", "b", TaskState::Completed),
        ]);
        let source = MemorySource::new(store.clone());

        source.cancel_task(None, "a").await.unwrap();
        source.cancel_task(None, "b").await.unwrap();
        let err = source.cancel_task(None, "zzz").await.unwrap_err();
        assert!(matches!(err, SourceError::NotFound(_)));

        let snap = store.snapshot();
        assert_eq!(snap.tasks[0].state, TaskState::Cancelled);
        assert!(snap.tasks[0].completed_at.is_some());
        assert_eq!(snap.tasks[1].state, TaskState::Completed);
    }

    #[test]
    fn test_provides_every_section() {
        let source = MemorySource::new(StatusStore::new());
        assert!(source.provides(Section::Orchestration));
        assert!(source.provides(Section::Agents));
        assert!(source.provides(Section::Tasks));
        assert!(source.subscribe(std::sync::Arc::new(|_: &crate::StoreEvent| {})).is_some());
    }
}
