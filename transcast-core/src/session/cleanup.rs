use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use tracing::{debug, warn};

use crate::job::JobId;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CleanupRequest<'a> {
    pub job_id: &'a JobId,
    pub action: &'static str,
}

impl<'a> CleanupRequest<'a> {
    pub fn new(job_id: &'a JobId) -> Self {
        Self {
            job_id,
            action: "cleanup",
        }
    }
}

/// Best-effort notification that remote resources for a job can go.
/// Implementations log failures and never report them to the caller.
#[async_trait]
pub trait CleanupNotifier: Send + Sync {
    async fn notify(&self, job_id: &JobId);
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NoopCleanupNotifier;

#[async_trait]
impl CleanupNotifier for NoopCleanupNotifier {
    async fn notify(&self, job_id: &JobId) {
        debug!(%job_id, "no cleanup endpoint configured");
    }
}

#[derive(Debug, Clone)]
pub struct HttpCleanupNotifier {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpCleanupNotifier {
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            endpoint: endpoint.into(),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl CleanupNotifier for HttpCleanupNotifier {
    async fn notify(&self, job_id: &JobId) {
        let request = CleanupRequest::new(job_id);
        match self.client.post(&self.endpoint).json(&request).send().await {
            Ok(response) if response.status().is_success() => {
                debug!(%job_id, endpoint = %self.endpoint, "remote cleanup requested");
            }
            Ok(response) => {
                warn!(%job_id, endpoint = %self.endpoint, status = %response.status(), "remote cleanup rejected");
            }
            Err(err) => {
                warn!(%job_id, endpoint = %self.endpoint, error = %err, "remote cleanup failed");
            }
        }
    }
}
