use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use tracing::debug;

use super::models::{JobId, StatusDocument};

/// Result of one status lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatusFetch {
    Document(StatusDocument),
    /// The transcoder has not published a status file yet.
    NotFound,
    TransportError(String),
}

#[async_trait]
pub trait StatusSource: Send + Sync {
    async fn fetch_status(&self, job_id: &JobId) -> StatusFetch;
}

/// Reads `<base_url>/<job_id>/status.txt` over HTTP.
#[derive(Debug, Clone)]
pub struct HttpStatusSource {
    client: reqwest::Client,
    base_url: String,
}

impl HttpStatusSource {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.into(),
        })
    }

    pub fn status_url(&self, job_id: &JobId) -> String {
        format!(
            "{}/{}/status.txt",
            self.base_url.trim_end_matches('/'),
            job_id
        )
    }
}

#[async_trait]
impl StatusSource for HttpStatusSource {
    async fn fetch_status(&self, job_id: &JobId) -> StatusFetch {
        let url = self.status_url(job_id);
        let response = match self.client.get(&url).send().await {
            Ok(response) => response,
            Err(err) => return StatusFetch::TransportError(err.to_string()),
        };
        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            debug!(%url, "status document not published yet");
            return StatusFetch::NotFound;
        }
        if !status.is_success() {
            return StatusFetch::TransportError(format!("{url} returned {status}"));
        }
        match response.text().await {
            Ok(body) => StatusFetch::Document(StatusDocument::parse(&body)),
            Err(err) => StatusFetch::TransportError(err.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_url_joins_base_and_job() {
        let source =
            HttpStatusSource::new("https://host.example/output/", Duration::from_secs(1)).unwrap();
        let job = JobId::parse("job_1_abc").unwrap();
        assert_eq!(
            source.status_url(&job),
            "https://host.example/output/job_1_abc/status.txt"
        );
    }

    #[tokio::test]
    async fn unreachable_host_is_a_transport_error() {
        let source =
            HttpStatusSource::new("http://127.0.0.1:1/output", Duration::from_secs(2)).unwrap();
        let job = JobId::parse("job_1_abc").unwrap();
        assert!(matches!(
            source.fetch_status(&job).await,
            StatusFetch::TransportError(_)
        ));
    }
}
