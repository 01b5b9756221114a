use lettre::{
    message::{header::ContentType, Mailbox},
    transport::smtp::authentication::Credentials,
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};

use crate::config::Config;
use crate::error::{AppError, AppResult};

/// SMTP mailer shared through AppState. Built once at startup.
#[derive(Clone)]
pub struct Mailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl Mailer {
    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        let transport = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.smtp_host)?
            .port(config.smtp_port)
            .credentials(Credentials::new(
                config.smtp_username.clone(),
                config.smtp_password.clone(),
            ))
            .build();

        let from: Mailbox = format!("MindTrack <{}>", config.email_from)
            .parse()
            .map_err(|e| anyhow::anyhow!("EMAIL_FROM is not a valid mailbox: {}", e))?;

        Ok(Self { transport, from })
    }

    /// Send the sign-in email. Errors map to a 502 at the handler boundary;
    /// there is no retry.
    pub async fn send_magic_link(&self, to: &str, magic_link: &str) -> AppResult<()> {
        let to_mailbox: Mailbox = to
            .parse()
            .map_err(|_| AppError::Validation("Invalid email address".into()))?;

        let message = Message::builder()
            .from(self.from.clone())
            .to(to_mailbox)
            .subject("Your sign-in link for MindTrack")
            .header(ContentType::TEXT_HTML)
            .body(magic_link_body(magic_link))
            .map_err(|e| AppError::Internal(anyhow::anyhow!("Failed to build email: {}", e)))?;

        self.transport
            .send(message)
            .await
            .map_err(|e| AppError::EmailDelivery(anyhow::anyhow!(e)))?;

        tracing::info!(to = %to, "Magic link email sent");
        Ok(())
    }
}

fn magic_link_body(magic_link: &str) -> String {
    format!(
        r#"<div style="font-family: Arial, sans-serif; max-width: 600px; margin: 0 auto; padding: 20px;">
  <h2>Sign in to MindTrack</h2>
  <p>Click the button below to securely sign in. This link expires in 15 minutes and can only be used once.</p>
  <p style="text-align: center; margin: 30px 0;">
    <a href="{link}" style="background: #667eea; color: white; padding: 14px 28px; text-decoration: none; border-radius: 6px; display: inline-block; font-weight: bold;">Sign in</a>
  </p>
  <p style="color: #999; font-size: 13px;">If the button doesn't work, copy and paste this link into your browser:<br>
    <a href="{link}">{link}</a></p>
  <p style="color: #999; font-size: 12px;">If you didn't request this, you can safely ignore this email.</p>
</div>"#,
        link = magic_link
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_body_embeds_link() {
        let body = magic_link_body("https://app.example.com/verify-magic-link?token=abc123");
        assert!(body.contains("verify-magic-link?token=abc123"));
        assert!(body.contains("expires in 15 minutes"));
    }
}
