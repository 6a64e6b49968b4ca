use anyhow::Context;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use tracing::{info, warn};

use crate::config::EmailConfig;

/// Sends signup confirmation codes. When SMTP is disabled in the config the
/// code is logged instead, which is what local development runs on.
#[derive(Clone)]
pub struct Mailer {
    transport: Option<AsyncSmtpTransport<Tokio1Executor>>,
    from: Mailbox,
}

impl Mailer {
    pub fn from_config(config: &EmailConfig) -> anyhow::Result<Self> {
        let from: Mailbox = config
            .from
            .parse()
            .with_context(|| format!("invalid from address '{}'", config.from))?;

        if !config.enabled {
            return Ok(Self {
                transport: None,
                from,
            });
        }

        let mut builder = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.smtp_host)
            .with_context(|| format!("invalid SMTP host '{}'", config.smtp_host))?
            .port(config.smtp_port);

        if !config.smtp_username.is_empty() {
            builder = builder.credentials(Credentials::new(
                config.smtp_username.clone(),
                config.smtp_password.clone(),
            ));
        }

        Ok(Self {
            transport: Some(builder.build()),
            from,
        })
    }

    /// Delivery happens in the background; a failed send is logged but never
    /// fails the signup request, the user can simply re-request the code.
    pub fn send_confirmation_code(&self, email: &str, username: &str, code: &str) {
        let Some(transport) = self.transport.clone() else {
            info!("Email disabled, confirmation code for '{}': {}", username, code);
            return;
        };

        let to: Mailbox = match email.parse() {
            Ok(mailbox) => mailbox,
            Err(e) => {
                warn!("Not sending confirmation code, bad address '{}': {}", email, e);
                return;
            }
        };

        let message = Message::builder()
            .from(self.from.clone())
            .to(to)
            .subject("Your confirmation code")
            .body(format!(
                "Hello {username},\n\nYour confirmation code is: {code}\n"
            ));

        let message = match message {
            Ok(message) => message,
            Err(e) => {
                warn!("Failed to build confirmation email: {}", e);
                return;
            }
        };

        let recipient = email.to_string();
        tokio::spawn(async move {
            match transport.send(message).await {
                Ok(_) => info!("Sent confirmation code to {}", recipient),
                Err(e) => warn!("Failed to send confirmation code to {}: {}", recipient, e),
            }
        });
    }
}
