//! HTTP client for the backend task endpoints.
//!
//! `POST /task_status` lists the tasks of one context (or returns a single
//! task when `task_id` is set); `POST /task_cancel` cancels one. The backend
//! reports some failures as a 200 with an `error` field, so the body is
//! checked as well as the status code.

use std::time::Duration;

use async_trait::async_trait;
use log::debug;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::{SourceError, StatusSource};
use crate::model::{BackgroundTask, TaskListing, count_active};
use crate::store::Section;

const TASK_SECTIONS: [Section; 1] = [Section::Tasks];

/// Connection settings for [`RemoteSource`].
#[derive(Debug, Clone)]
pub struct RemoteSourceConfig {
    pub base_url: String,
    pub timeout: Duration,
}

impl Default for RemoteSourceConfig {
    fn default() -> Self {
        Self {
            base_url: crate::config::DEFAULT_BASE_URL.to_string(),
            timeout: Duration::from_secs(crate::config::DEFAULT_TIMEOUT_SECS),
        }
    }
}

#[derive(Debug, Serialize)]
struct StatusRequest<'a> {
    context_id: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    task_id: Option<&'a str>,
}

#[derive(Debug, Serialize)]
struct CancelRequest<'a> {
    context_id: &'a str,
    task_id: &'a str,
}

#[derive(Debug, Default, Deserialize)]
struct StatusResponse {
    #[serde(default)]
    tasks: Option<Vec<BackgroundTask>>,
    #[serde(default)]
    active_count: Option<usize>,
    #[serde(default)]
    task: Option<BackgroundTask>,
    #[serde(default)]
    error: Option<String>,
}

/// Polls the backend for background tasks.
#[derive(Debug, Clone)]
pub struct RemoteSource {
    client: Client,
    base_url: String,
}

impl RemoteSource {
    pub fn new(config: RemoteSourceConfig) -> Result<Self, SourceError> {
        let client = Client::builder().timeout(config.timeout).build()?;
        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, endpoint: &str) -> String {
        format!("{}/{}", self.base_url, endpoint)
    }

    async fn post_status(&self, request: &StatusRequest<'_>) -> Result<StatusResponse, SourceError> {
        let response = self
            .client
            .post(self.url("task_status"))
            .json(request)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(SourceError::Status(response.status()));
        }

        let body: StatusResponse = response
            .json()
            .await
            .map_err(|e| SourceError::Decode(e.to_string()))?;
        Ok(body)
    }

    /// Fetch a single task. `Ok(None)` when the backend does not know it.
    pub async fn task(
        &self,
        context_id: Option<&str>,
        task_id: &str,
    ) -> Result<Option<BackgroundTask>, SourceError> {
        let context_id = context_id.ok_or(SourceError::MissingContext)?;
        let body = self
            .post_status(&StatusRequest {
                context_id,
                task_id: Some(task_id),
            })
            .await?;

        match (body.task, body.error) {
            (Some(task), _) => Ok(Some(task)),
            (None, Some(error)) if error.to_lowercase().contains("not found") => Ok(None),
            (None, Some(error)) => Err(SourceError::Backend(error)),
            (None, None) => Err(SourceError::Decode("response has neither task nor error".to_string())),
        }
    }
}

#[async_trait]
impl StatusSource for RemoteSource {
    fn name(&self) -> &str {
        "remote"
    }

    fn sections(&self) -> &[Section] {
        &TASK_SECTIONS
    }

    async fn tasks(&self, context_id: Option<&str>) -> Result<TaskListing, SourceError> {
        let Some(context_id) = context_id else {
            debug!("No context id set, reporting an empty task list");
            return Ok(TaskListing::default());
        };

        let body = self
            .post_status(&StatusRequest {
                context_id,
                task_id: None,
            })
            .await?;
        if let Some(error) = body.error {
            return Err(SourceError::Backend(error));
        }

        let tasks = body.tasks.unwrap_or_default();
        let active_count = body.active_count.unwrap_or_else(|| count_active(&tasks));
        Ok(TaskListing {
            tasks,
            active_count,
        })
    }

    async fn cancel_task(&self, context_id: Option<&str>, task_id: &str) -> Result<(), SourceError> {
        let context_id = context_id.ok_or(SourceError::MissingContext)?;
        let response = self
            .client
            .post(self.url("task_cancel"))
            .json(&CancelRequest {
                context_id,
                task_id,
            })
            .send()
            .await?;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(SourceError::Status(response.status()))
        }
    }
}
