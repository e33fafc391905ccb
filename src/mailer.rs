//! Outgoing e-mail port. Delivery itself belongs to an external provider;
//! the default adapter only records the send in the logs.

use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingEmail {
    pub to: String,
    pub subject: String,
    pub body: String,
}

#[derive(Debug, Error)]
#[error("mail delivery failed: {0}")]
pub struct MailError(pub String);

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, email: OutgoingEmail) -> Result<(), MailError>;
}

#[derive(Debug, Default, Clone)]
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, email: OutgoingEmail) -> Result<(), MailError> {
        tracing::info!(to = %email.to, subject = %email.subject, "Outgoing email");
        tracing::debug!(body = %email.body, "Outgoing email body");
        Ok(())
    }
}

pub fn invitation_email(to: &str, company_name: &str, accept_url: &str) -> OutgoingEmail {
    OutgoingEmail {
        to: to.to_string(),
        subject: "You have been invited to the pricing portal".to_string(),
        body: format!(
            "Hello {company_name},\n\nAn account has been created for you. \
             Set your password here to get started:\n{accept_url}\n"
        ),
    }
}

pub fn approval_email(to: &str, company_name: &str, login_url: &str) -> OutgoingEmail {
    OutgoingEmail {
        to: to.to_string(),
        subject: "Your pricing portal account is active".to_string(),
        body: format!("Hello {company_name},\n\nYour account has been approved. Sign in at {login_url}\n"),
    }
}

/// Recording mailer for tests and local runs.
pub mod mock {
    use super::*;
    use tokio::sync::Mutex;

    #[derive(Default)]
    pub struct RecordingMailer {
        sent: Mutex<Vec<OutgoingEmail>>,
    }

    impl RecordingMailer {
        pub async fn sent(&self) -> Vec<OutgoingEmail> {
            self.sent.lock().await.clone()
        }
    }

    #[async_trait]
    impl Mailer for RecordingMailer {
        async fn send(&self, email: OutgoingEmail) -> Result<(), MailError> {
            self.sent.lock().await.push(email);
            Ok(())
        }
    }
}
