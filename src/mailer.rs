use async_trait::async_trait;
use lettre::{
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
    message::{Mailbox, header::ContentType},
    transport::smtp::authentication::Credentials,
};
use std::sync::{Arc, Mutex, PoisonError};

use crate::config::SmtpConfig;

const EMAIL_SUBJECT: &str = "YaMDb: signup confirmation code";

fn confirmation_body(username: &str, code: &str) -> String {
    format!("{username}! Your confirmation code: {code}")
}

// 1. Mailer Contract
/// Mailer
///
/// Delivery of signup confirmation codes. Implementations must report
/// failure: a code that never reached the user must not look like success.
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send_confirmation_code(
        &self,
        email: &str,
        username: &str,
        code: &str,
    ) -> Result<(), String>;
}

/// MailerState
///
/// The concrete type used to share the mailer across the application state.
pub type MailerState = Arc<dyn Mailer>;

// 2. The Real Implementation (SMTP)
/// SmtpMailer
///
/// Sends through an SMTP relay using STARTTLS, authenticating when
/// credentials are configured.
pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl SmtpMailer {
    pub fn new(config: &SmtpConfig, from: &str) -> Result<Self, String> {
        let from: Mailbox = from
            .parse()
            .map_err(|e| format!("invalid sender address {from}: {e}"))?;

        let mut builder = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.host)
            .map_err(|e| format!("invalid SMTP relay {}: {e}", config.host))?
            .port(config.port);
        if let (Some(username), Some(password)) = (&config.username, &config.password) {
            builder = builder.credentials(Credentials::new(username.clone(), password.clone()));
        }

        Ok(Self {
            transport: builder.build(),
            from,
        })
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send_confirmation_code(
        &self,
        email: &str,
        username: &str,
        code: &str,
    ) -> Result<(), String> {
        let to: Mailbox = email
            .parse()
            .map_err(|e| format!("invalid recipient {email}: {e}"))?;
        let message = Message::builder()
            .from(self.from.clone())
            .to(to)
            .subject(EMAIL_SUBJECT)
            .header(ContentType::TEXT_PLAIN)
            .body(confirmation_body(username, code))
            .map_err(|e| e.to_string())?;

        self.transport
            .send(message)
            .await
            .map_err(|e| e.to_string())?;
        tracing::info!(recipient = %email, "confirmation code sent");
        Ok(())
    }
}

// 3. Console Implementation (Local development)
/// ConsoleMailer
///
/// Writes the message to the log instead of delivering it.
#[derive(Clone, Default)]
pub struct ConsoleMailer;

#[async_trait]
impl Mailer for ConsoleMailer {
    async fn send_confirmation_code(
        &self,
        email: &str,
        username: &str,
        code: &str,
    ) -> Result<(), String> {
        tracing::info!(
            recipient = %email,
            subject = EMAIL_SUBJECT,
            body = %confirmation_body(username, code),
            "console mail"
        );
        Ok(())
    }
}

// 4. The Mock Implementation (For Tests)
/// SentMail
///
/// One captured delivery.
#[derive(Debug, Clone, PartialEq)]
pub struct SentMail {
    pub email: String,
    pub username: String,
    pub code: String,
}

/// MockMailer
///
/// Records every delivery so tests can read back the codes. Clones share the
/// same outbox.
#[derive(Clone, Default)]
pub struct MockMailer {
    /// When true, every delivery fails.
    pub should_fail: bool,
    outbox: Arc<Mutex<Vec<SentMail>>>,
}

impl MockMailer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn new_failing() -> Self {
        Self {
            should_fail: true,
            ..Self::default()
        }
    }

    pub fn sent(&self) -> Vec<SentMail> {
        self.outbox
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// The most recent code delivered to `email`.
    pub fn last_code_for(&self, email: &str) -> Option<String> {
        self.sent()
            .into_iter()
            .rev()
            .find(|mail| mail.email == email)
            .map(|mail| mail.code)
    }
}

#[async_trait]
impl Mailer for MockMailer {
    async fn send_confirmation_code(
        &self,
        email: &str,
        username: &str,
        code: &str,
    ) -> Result<(), String> {
        if self.should_fail {
            return Err("Mock Mail Error: Simulation requested".to_string());
        }
        self.outbox
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(SentMail {
                email: email.to_string(),
                username: username.to_string(),
                code: code.to_string(),
            });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn mock_records_deliveries_across_clones() {
        let mailer = MockMailer::new();
        let shared: MailerState = Arc::new(mailer.clone());

        shared
            .send_confirmation_code("a@x.com", "alice", "FIRST")
            .await
            .unwrap();
        shared
            .send_confirmation_code("a@x.com", "alice", "SECOND")
            .await
            .unwrap();

        assert_eq!(mailer.sent().len(), 2);
        assert_eq!(mailer.last_code_for("a@x.com").as_deref(), Some("SECOND"));
        assert_eq!(mailer.last_code_for("b@x.com"), None);
    }

    #[tokio::test]
    async fn failing_mock_reports_error() {
        let mailer = MockMailer::new_failing();
        assert!(
            mailer
                .send_confirmation_code("a@x.com", "alice", "CODE")
                .await
                .is_err()
        );
        assert!(mailer.sent().is_empty());
    }

    #[test]
    fn smtp_mailer_rejects_bad_sender() {
        let config = SmtpConfig {
            host: "smtp.example.com".to_string(),
            port: 587,
            username: None,
            password: None,
        };
        assert!(SmtpMailer::new(&config, "not an address").is_err());
    }

    #[test]
    fn body_names_user_and_code() {
        assert_eq!(
            confirmation_body("alice", "ABC123"),
            "alice! Your confirmation code: ABC123"
        );
    }
}
