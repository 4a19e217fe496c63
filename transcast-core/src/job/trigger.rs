use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::json;
use tokio::time::sleep;
use tracing::info;

use super::error::TriggerError;
use super::models::JobId;

/// What the transcoder needs to start one job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TranscodeRequest {
    pub job_id: JobId,
    pub source: String,
    pub kind: String,
    pub filename: Option<String>,
    pub requested_at: DateTime<Utc>,
}

impl TranscodeRequest {
    /// Repository-dispatch body understood by the transcoding workflow.
    pub fn dispatch_payload(&self, event_type: &str) -> serde_json::Value {
        json!({
            "event_type": event_type,
            "client_payload": {
                "job_id": self.job_id,
                "source": self.source,
                "type": self.kind,
                "filename": self.filename,
                "timestamp": self.requested_at.timestamp_millis(),
            }
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    Accepted,
    Rejected { reason: String },
}

#[async_trait]
pub trait JobTrigger: Send + Sync {
    async fn dispatch(&self, request: &TranscodeRequest) -> Result<DispatchOutcome, TriggerError>;
}

/// Stands in for the workflow trigger: the payload is logged and accepted.
#[derive(Debug, Clone)]
pub struct SimulatedTrigger {
    event_type: String,
    delay: Duration,
}

impl SimulatedTrigger {
    pub fn new(event_type: impl Into<String>, delay: Duration) -> Self {
        Self {
            event_type: event_type.into(),
            delay,
        }
    }
}

#[async_trait]
impl JobTrigger for SimulatedTrigger {
    async fn dispatch(&self, request: &TranscodeRequest) -> Result<DispatchOutcome, TriggerError> {
        let payload = serde_json::to_string(&request.dispatch_payload(&self.event_type))?;
        info!(job_id = %request.job_id, payload = %payload, "simulating transcode dispatch");
        if !self.delay.is_zero() {
            sleep(self.delay).await;
        }
        Ok(DispatchOutcome::Accepted)
    }
}
