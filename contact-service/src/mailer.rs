//! Contact notification mail.

use async_trait::async_trait;
use chrono::Utc;
use common::config::MailConfig;
use common::errors::{AppError, AppResult};
use common::utils::escape_html;
use lettre::message::{Mailbox, MultiPart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};

use crate::models::NewContact;

/// Sends notifications about new submissions.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Whether notifications are actually delivered.
    fn is_enabled(&self) -> bool;

    async fn notify_contact(&self, contact: &NewContact) -> AppResult<()>;
}

/// SMTP notifier backed by a pooled lettre transport.
pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
    to: Mailbox,
}

impl SmtpMailer {
    pub fn new(config: &MailConfig) -> AppResult<Self> {
        let (Some(user), Some(pass)) = (&config.user, &config.pass) else {
            return Err(AppError::Config("SMTP_USER and SMTP_PASS are required".into()));
        };

        let from = parse_mailbox("EMAIL_FROM", &config.from)?;
        let to = parse_mailbox("EMAIL_TO", &config.to)?;

        let builder = if config.secure {
            AsyncSmtpTransport::<Tokio1Executor>::relay(&config.host)
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.host)
        }
        .map_err(|e| AppError::Config(format!("SMTP host {}: {}", config.host, e)))?;

        let transport = builder
            .port(config.port)
            .credentials(Credentials::new(user.clone(), pass.clone()))
            .build();

        Ok(Self {
            transport,
            from,
            to,
        })
    }
}

fn parse_mailbox(key: &str, value: &str) -> AppResult<Mailbox> {
    value
        .parse()
        .map_err(|e| AppError::Config(format!("{} {:?}: {}", key, value, e)))
}

#[async_trait]
impl Notifier for SmtpMailer {
    fn is_enabled(&self) -> bool {
        true
    }

    async fn notify_contact(&self, contact: &NewContact) -> AppResult<()> {
        let message = Message::builder()
            .from(self.from.clone())
            .to(self.to.clone())
            .subject(notification_subject(contact))
            .multipart(MultiPart::alternative_plain_html(
                notification_text(contact),
                notification_html(contact),
            ))
            .map_err(|e| AppError::Mail(e.to_string()))?;

        let response = self
            .transport
            .send(message)
            .await
            .map_err(|e| AppError::Mail(e.to_string()))?;
        tracing::info!(code = %response.code(), "Contact notification sent");
        Ok(())
    }
}

/// Notifier used when SMTP is not configured.
#[derive(Debug, Default, Clone, Copy)]
pub struct DisabledNotifier;

#[async_trait]
impl Notifier for DisabledNotifier {
    fn is_enabled(&self) -> bool {
        false
    }

    async fn notify_contact(&self, _contact: &NewContact) -> AppResult<()> {
        Err(AppError::Mail("mail is not configured".into()))
    }
}

fn notification_subject(contact: &NewContact) -> String {
    format!("[HSN Website] {}: {}", contact.inquiry_type, contact.subject)
}

fn notification_text(contact: &NewContact) -> String {
    let mut lines = vec![
        "New Contact Form Submission".to_string(),
        "----------------------------".to_string(),
        format!("Name: {}", contact.name),
        format!("Email: {}", contact.email),
    ];
    if let Some(phone) = &contact.phone {
        lines.push(format!("Phone: {}", phone));
    }
    if let Some(company) = &contact.company {
        lines.push(format!("Company: {}", company));
    }
    lines.push(format!("Inquiry Type: {}", contact.inquiry_type));
    lines.push(format!("Subject: {}", contact.subject));
    lines.push(format!("Message: {}", contact.message));
    lines.push("----------------------------".to_string());
    lines.push(format!("Submitted at: {}", Utc::now().to_rfc2822()));
    lines.join("\n")
}

fn notification_html(contact: &NewContact) -> String {
    let mut rows = vec![("Name", contact.name.as_str()), ("Email", contact.email.as_str())];
    if let Some(phone) = &contact.phone {
        rows.push(("Phone", phone.as_str()));
    }
    if let Some(company) = &contact.company {
        rows.push(("Company", company.as_str()));
    }
    rows.push(("Inquiry Type", contact.inquiry_type.as_str()));
    rows.push(("Subject", contact.subject.as_str()));
    rows.push(("Message", contact.message.as_str()));

    let cell = "padding: 10px; border: 1px solid #ddd;";
    let body: String = rows
        .into_iter()
        .map(|(label, value)| {
            format!(
                "<tr><td style=\"{cell} font-weight: bold;\">{}</td><td style=\"{cell}\">{}</td></tr>",
                label,
                escape_html(value),
            )
        })
        .collect();

    format!(
        "<h2>New Contact Form Submission</h2>\
         <table style=\"border-collapse: collapse; width: 100%; max-width: 600px;\">{}</table>\
         <p style=\"margin-top: 20px; color: #666; font-size: 12px;\">Submitted at: {}</p>",
        body,
        Utc::now().to_rfc2822()
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn contact() -> NewContact {
        NewContact {
            name: "Jane <script>".into(),
            email: "jane@example.com".into(),
            phone: None,
            company: Some("Acme & Sons".into()),
            inquiry_type: "Sales".into(),
            subject: "Pricing".into(),
            message: "Hi".into(),
            ip_address: None,
            user_agent: None,
            email_sent: false,
        }
    }

    fn mail_config() -> MailConfig {
        MailConfig {
            host: "smtp.example.com".into(),
            port: 587,
            secure: false,
            user: Some("user".into()),
            pass: Some("secret".into()),
            from: "noreply@example.com".into(),
            to: "info@example.com".into(),
        }
    }

    #[test]
    fn test_subject() {
        assert_eq!(notification_subject(&contact()), "[HSN Website] Sales: Pricing");
    }

    #[test]
    fn test_text_skips_missing_fields() {
        let text = notification_text(&contact());
        assert!(text.contains("Company: Acme & Sons"));
        assert!(!text.contains("Phone:"));
    }

    #[test]
    fn test_html_escapes_input() {
        let html = notification_html(&contact());
        assert!(html.contains("Jane &lt;script&gt;"));
        assert!(html.contains("Acme &amp; Sons"));
        assert!(!html.contains("<script>"));
    }

    #[test]
    fn test_smtp_mailer_rejects_bad_config() {
        let mut config = mail_config();
        config.pass = None;
        assert!(matches!(SmtpMailer::new(&config), Err(AppError::Config(_))));

        let mut config = mail_config();
        config.to = "not an address".into();
        assert!(matches!(SmtpMailer::new(&config), Err(AppError::Config(_))));
    }

    #[tokio::test]
    async fn test_disabled_notifier() {
        let notifier = DisabledNotifier;
        assert!(!notifier.is_enabled());
        assert!(matches!(
            notifier.notify_contact(&contact()).await,
            Err(AppError::Mail(_))
        ));
    }
}
