//! Notification Bridges
//!
//! Consumes results from a queue and renders them into outbound
//! notifications:
//! - email: subject/body rendering through an injected mail sender
//! - webhook: verbatim JSON POST of failing results
//!
//! Delivery mechanics (SMTP, HTTP endpoints) stay external; this
//! crate owns the send/suppress policy and the rendering.

mod email;
mod policy;
mod render;
mod webhook;

use thiserror::Error;

pub use email::{EmailBridge, MailSender};
pub use policy::NotifyPolicy;
pub use render::{render_body, render_subject};
pub use webhook::WebhookBridge;

/// Errors delivering a notification.
#[derive(Debug, Error)]
pub enum NotifyError {
    /// Mail sender rejected or failed the message
    #[error("mail delivery failed: {0}")]
    Mail(String),

    /// Webhook request failed
    #[error("webhook request failed: {0}")]
    Webhook(#[from] reqwest::Error),
}
