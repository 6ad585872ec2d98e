//! Webhook bridge
//!
//! POSTs the verbatim JSON payload of failing results to a configured
//! URL. Passing results are never posted.

use async_trait::async_trait;
use check_result::CheckResult;
use queue_transport::ResultHandler;
use tracing::{debug, warn};

pub struct WebhookBridge {
    client: reqwest::Client,
    url: String,
}

impl WebhookBridge {
    pub fn new(url: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            url: url.to_string(),
        }
    }

    fn should_post(result: &CheckResult) -> bool {
        result.is_failure()
    }

    async fn post(&self, payload: &[u8]) {
        let response = self
            .client
            .post(&self.url)
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .body(payload.to_vec())
            .send()
            .await;

        match response {
            Ok(response) => {
                let status = response.status();
                if !status.is_success() && !status.is_redirection() {
                    let body = response.text().await.unwrap_or_default();
                    warn!(%status, body, "webhook endpoint rejected the notification");
                } else {
                    debug!(%status, "webhook delivered");
                }
            }
            Err(e) => warn!(error = %e, "failed to execute webhook request"),
        }
    }
}

#[async_trait]
impl ResultHandler for WebhookBridge {
    async fn process(&self, result: &CheckResult, payload: &[u8]) {
        if !Self::should_post(result) {
            return;
        }
        self.post(payload).await;
    }
}
