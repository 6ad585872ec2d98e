//! Mail delivery via the local sendmail binary

use async_trait::async_trait;
use notify::{MailSender, NotifyError};
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::debug;

/// Pipes rendered messages through the system `sendmail`.
pub struct SendmailSender {
    binary: String,
    from: String,
}

impl SendmailSender {
    pub fn new(from: &str) -> Self {
        Self {
            binary: "/usr/sbin/sendmail".to_string(),
            from: from.to_string(),
        }
    }

    fn message(&self, recipients: &[String], subject: &str, body: &str) -> String {
        format!(
            "From: {}\nTo: {}\nSubject: {}\n\n{}",
            self.from,
            recipients.join(", "),
            subject,
            body
        )
    }
}

#[async_trait]
impl MailSender for SendmailSender {
    async fn send(
        &self,
        recipients: &[String],
        subject: &str,
        body: &str,
    ) -> Result<(), NotifyError> {
        let mut child = Command::new(&self.binary)
            .arg("-t")
            .stdin(std::process::Stdio::piped())
            .spawn()
            .map_err(|e| NotifyError::Mail(format!("spawn {}: {}", self.binary, e)))?;

        let message = self.message(recipients, subject, body);
        if let Some(mut stdin) = child.stdin.take() {
            stdin
                .write_all(message.as_bytes())
                .await
                .map_err(|e| NotifyError::Mail(e.to_string()))?;
        }

        let status = child
            .wait()
            .await
            .map_err(|e| NotifyError::Mail(e.to_string()))?;
        if !status.success() {
            return Err(NotifyError::Mail(format!(
                "sendmail exited with {}",
                status
            )));
        }

        debug!(recipients = recipients.len(), "mail handed to sendmail");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_headers() {
        let sender = SendmailSender::new("watchtower@example.com");
        let message = sender.message(
            &["a@example.com".to_string(), "b@example.com".to_string()],
            "Watchtower [ERR]: x",
            "body text",
        );
        assert!(message.starts_with("From: watchtower@example.com\n"));
        assert!(message.contains("To: a@example.com, b@example.com\n"));
        assert!(message.contains("Subject: Watchtower [ERR]: x\n\nbody text"));
    }
}
