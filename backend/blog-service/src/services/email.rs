/// Email service for one-time codes and comment notifications
use crate::config::EmailConfig;
use crate::error::{AppError, Result};
use crate::services::otp::OtpPurpose;
use lettre::message::{header, Mailbox, Message, MultiPart, SinglePart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Tokio1Executor};
use std::sync::Arc;
use tracing::{info, warn};

/// Async email transport wrapper (SMTP or no-op)
#[derive(Clone)]
pub struct EmailService {
    transport: Option<Arc<AsyncSmtpTransport<Tokio1Executor>>>,
    from: Mailbox,
    site_name: String,
}

impl EmailService {
    /// Build email service from configuration
    ///
    /// If SMTP host is empty, operates in no-op mode (logs only).
    pub fn new(config: &EmailConfig, site_name: &str) -> Result<Self> {
        let from = config
            .smtp_from
            .parse::<Mailbox>()
            .map_err(|e| AppError::Internal(format!("Invalid SMTP_FROM address: {}", e)))?;

        let transport = if config.smtp_host.trim().is_empty() {
            warn!("SMTP host not configured; email service will operate in no-op mode");
            None
        } else {
            let builder = if config.use_starttls {
                AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.smtp_host)
            } else {
                AsyncSmtpTransport::<Tokio1Executor>::relay(&config.smtp_host)
            }
            .map_err(|e| AppError::Internal(format!("Failed to configure SMTP transport: {}", e)))?
            .port(config.smtp_port);

            let builder = if let (Some(username), Some(password)) =
                (&config.smtp_username, &config.smtp_password)
            {
                builder.credentials(Credentials::new(username.to_string(), password.to_string()))
            } else {
                builder
            };

            Some(Arc::new(builder.build()))
        };

        Ok(Self {
            transport,
            from,
            site_name: site_name.to_string(),
        })
    }

    /// Check if SMTP transport is enabled
    pub fn is_enabled(&self) -> bool {
        self.transport.is_some()
    }

    /// Send a one-time code
    pub async fn send_otp_email(
        &self,
        recipient: &str,
        code: &str,
        purpose: OtpPurpose,
        ttl_minutes: i64,
    ) -> Result<()> {
        let action = match purpose {
            OtpPurpose::Signup => "confirm your email address",
            OtpPurpose::Signin => "finish signing in",
            OtpPurpose::PasswordReset => "reset your password",
        };
        let subject = format!("{} verification code: {}", self.site_name, code);

        let text_body = format!(
            "Use the code below to {action}:\n\n{code}\n\n\
             This code expires in {ttl_minutes} minutes.\n\
             If you did not request it, you can ignore this email."
        );

        let html_body = format!(
            r#"<!DOCTYPE html>
<html>
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
</head>
<body style="font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, sans-serif; padding: 20px; color: #333;">
    <h2>{site}</h2>
    <p>Use the code below to {action}:</p>
    <p style="font-size: 32px; font-weight: bold; letter-spacing: 8px; color: #000; margin: 30px 0;">{code}</p>
    <p style="color: #666; font-size: 14px;">This code expires in <strong>{ttl_minutes} minutes</strong>.</p>
    <p style="color: #999; font-size: 12px; margin-top: 30px;">
        If you did not request it, you can ignore this email.
    </p>
</body>
</html>"#,
            site = html_escape(&self.site_name),
        );

        self.send_html_email(recipient, &subject, &html_body, &text_body)
            .await
    }

    /// Tell a post author about a new comment
    pub async fn send_comment_notification(
        &self,
        recipient: &str,
        post_title: &str,
        post_url: &str,
        commenter: &str,
        comment: &str,
    ) -> Result<()> {
        let subject = format!("New comment on \"{}\"", post_title);
        let preview: String = comment.chars().take(280).collect();

        let text_body = format!(
            "{commenter} commented on your post \"{post_title}\":\n\n{preview}\n\nRead it here: {post_url}"
        );

        let html_body = format!(
            r#"<!DOCTYPE html>
<html>
<head><meta charset="UTF-8"></head>
<body style="font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, sans-serif; padding: 20px; color: #333;">
    <p><strong>{commenter}</strong> commented on your post <em>{title}</em>:</p>
    <blockquote style="border-left: 3px solid #ddd; margin: 20px 0; padding-left: 12px; color: #555;">{preview}</blockquote>
    <p><a href="{url}" style="color: #007AFF;">Read the conversation</a></p>
</body>
</html>"#,
            commenter = html_escape(commenter),
            title = html_escape(post_title),
            preview = html_escape(&preview),
            url = html_escape(post_url),
        );

        self.send_html_email(recipient, &subject, &html_body, &text_body)
            .await
    }

    /// Send HTML email with plain text fallback
    pub async fn send_html_email(
        &self,
        recipient: &str,
        subject: &str,
        html_body: &str,
        text_body: &str,
    ) -> Result<()> {
        if let Some(transport) = &self.transport {
            let to = recipient
                .parse::<Mailbox>()
                .map_err(|e| AppError::Email(format!("Invalid recipient email address: {}", e)))?;

            let email = Message::builder()
                .from(self.from.clone())
                .to(to)
                .subject(subject)
                .multipart(
                    MultiPart::alternative()
                        .singlepart(
                            SinglePart::builder()
                                .header(header::ContentType::TEXT_PLAIN)
                                .body(text_body.to_string()),
                        )
                        .singlepart(
                            SinglePart::builder()
                                .header(header::ContentType::TEXT_HTML)
                                .body(html_body.to_string()),
                        ),
                )
                .map_err(|e| AppError::Email(format!("Failed to build email message: {}", e)))?;

            transport
                .send(email)
                .await
                .map_err(|e| AppError::Email(format!("Failed to send email: {}", e)))?;
            info!(subject, recipient = %mask_email(recipient), "email sent successfully");
        } else {
            info!(
                subject,
                recipient = %mask_email(recipient),
                "Email service running in no-op mode; skipping actual send"
            );
        }
        Ok(())
    }
}

/// Mask email for logging
pub fn mask_email(email: &str) -> String {
    if let Some(at_pos) = email.find('@') {
        let local = &email[..at_pos];
        let domain = &email[at_pos..];
        match local.chars().next() {
            Some(first) if local.chars().count() > 2 => format!("{}***{}", first, domain),
            _ => format!("**{}", domain),
        }
    } else {
        "***@***".to_string()
    }
}

fn html_escape(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mask_email() {
        assert_eq!(mask_email("alice@example.com"), "a***@example.com");
        assert_eq!(mask_email("al@example.com"), "**@example.com");
        assert_eq!(mask_email("not-an-email"), "***@***");
    }

    #[test]
    fn test_html_escape() {
        assert_eq!(html_escape("<b>\"Tom\" & 'Jerry'</b>"), "&lt;b&gt;&quot;Tom&quot; &amp; &#39;Jerry&#39;&lt;/b&gt;");
    }

    #[tokio::test]
    async fn no_op_mode_without_smtp_host() {
        let service = EmailService::new(&EmailConfig::default(), "Inkwell").unwrap();
        assert!(!service.is_enabled());
        service
            .send_otp_email("alice@example.com", "123456", OtpPurpose::Signup, 10)
            .await
            .unwrap();
    }

    #[test]
    fn invalid_from_address_is_rejected() {
        let config = EmailConfig {
            smtp_from: "not an address".to_string(),
            ..EmailConfig::default()
        };
        assert!(EmailService::new(&config, "Inkwell").is_err());
    }
}
