//! Email bridge

use std::sync::Arc;

use async_trait::async_trait;
use check_result::CheckResult;
use queue_transport::ResultHandler;
use tracing::{debug, warn};

use crate::{render_body, render_subject, NotifyError, NotifyPolicy};

/// Delivers a rendered message to a list of recipients.
///
/// SMTP mechanics live behind this trait so the bridge stays testable
/// and transport-agnostic.
#[async_trait]
pub trait MailSender: Send + Sync {
    async fn send(
        &self,
        recipients: &[String],
        subject: &str,
        body: &str,
    ) -> Result<(), NotifyError>;
}

/// Renders results into emails for a fixed recipient list.
pub struct EmailBridge {
    sender: Arc<dyn MailSender>,
    recipients: Vec<String>,
    policy: NotifyPolicy,
}

impl EmailBridge {
    pub fn new(sender: Arc<dyn MailSender>, recipients: Vec<String>, policy: NotifyPolicy) -> Self {
        Self {
            sender,
            recipients,
            policy,
        }
    }
}

#[async_trait]
impl ResultHandler for EmailBridge {
    async fn process(&self, result: &CheckResult, _payload: &[u8]) {
        if !self.policy.should_send(result) {
            debug!(input = %result.input, "email suppressed by policy");
            return;
        }

        let subject = render_subject(result);
        let body = render_body(result);
        if let Err(e) = self.sender.send(&self.recipients, &subject, &body).await {
            warn!(error = %e, "failed to send notification email");
        }
    }
}
