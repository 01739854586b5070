use crate::config::EmailConfig;
use crate::model::{Inquiry, InquiryKind};
use lettre::message::header::ContentType;
use lettre::message::{Mailbox, Message};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{SmtpTransport, Transport};
use std::fmt::Write as _;
use std::str::FromStr;

/// Sends an email to the agency for each new inquiry.
///
/// Delivery is best-effort: the inquiry is stored whether or not the email
/// goes out, and `email_sent` records which it was.
#[derive(Clone)]
pub struct Notifier {
    config: Option<EmailConfig>,
}

impl Notifier {
    pub fn new(config: &EmailConfig) -> Self {
        Self {
            config: config.is_enabled().then(|| config.clone()),
        }
    }

    pub const fn is_enabled(&self) -> bool {
        self.config.is_some()
    }

    /// Email the agency about `inquiry`. Returns `Ok(false)` when
    /// notifications are not configured.
    pub async fn notify_inquiry(&self, inquiry: &Inquiry) -> Result<bool, NotifyError> {
        let Some(config) = self.config.clone() else {
            return Ok(false);
        };
        let message = build_message(&config, inquiry)?;

        // lettre's SmtpTransport blocks.
        tokio::task::spawn_blocking(move || send(&config, &message))
            .await
            .map_err(|e| NotifyError::Transport(e.to_string()))??;
        Ok(true)
    }
}

fn build_message(config: &EmailConfig, inquiry: &Inquiry) -> Result<Message, NotifyError> {
    let to = config
        .notify_to
        .as_deref()
        .ok_or_else(|| NotifyError::Address("notify_to is not set".to_string()))?;
    let from = Mailbox::from_str(&config.smtp_from)
        .map_err(|e| NotifyError::Address(format!("from: {e}")))?;
    let to = Mailbox::from_str(to).map_err(|e| NotifyError::Address(format!("to: {e}")))?;

    let (subject, body) = compose(inquiry);
    let mut builder = Message::builder().from(from).to(to).subject(subject);
    // Replies go straight to the customer when their address parses.
    if let Ok(reply_to) = Mailbox::from_str(&inquiry.email) {
        builder = builder.reply_to(reply_to);
    }
    builder
        .header(ContentType::TEXT_PLAIN)
        .body(body)
        .map_err(|e| NotifyError::Build(e.to_string()))
}

fn send(config: &EmailConfig, message: &Message) -> Result<(), NotifyError> {
    let host = config.smtp_host.as_deref().unwrap_or("localhost");
    let builder = if config.smtp_use_tls {
        SmtpTransport::starttls_relay(host).map_err(|e| NotifyError::Transport(e.to_string()))?
    } else {
        SmtpTransport::builder_dangerous(host)
    }
    .port(config.smtp_port);

    let builder = match (&config.smtp_username, &config.smtp_password) {
        (Some(user), Some(pass)) => builder.credentials(Credentials::new(user.clone(), pass.clone())),
        _ => builder,
    };

    builder
        .build()
        .send(message)
        .map_err(|e| NotifyError::Transport(e.to_string()))?;
    Ok(())
}

/// Subject and plain-text body for an inquiry email.
pub fn compose(inquiry: &Inquiry) -> (String, String) {
    let subject = match inquiry.kind {
        InquiryKind::Booking => format!(
            "New booking request: {}",
            inquiry.package_interest.as_deref().unwrap_or("unspecified")
        ),
        InquiryKind::Contact => format!("New message from {}", inquiry.name),
    };

    let mut body = format!(
        "Name: {}\nEmail: {}\nCountry: {}\n",
        inquiry.name, inquiry.email, inquiry.country
    );
    // Writing into a String cannot fail.
    if let Some(package) = &inquiry.package_interest {
        let _ = writeln!(body, "Package: {package}");
    }
    let _ = write!(
        body,
        "Received: {}\n\n{}\n",
        inquiry.timestamp.format("%Y-%m-%d %H:%M UTC"),
        inquiry.message
    );
    (subject, body)
}

#[derive(Debug)]
pub enum NotifyError {
    Address(String),
    Build(String),
    Transport(String),
}

impl std::fmt::Display for NotifyError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Address(msg) => write!(f, "Invalid address: {msg}"),
            Self::Build(msg) => write!(f, "Failed to build email: {msg}"),
            Self::Transport(msg) => write!(f, "Failed to send email: {msg}"),
        }
    }
}

impl std::error::Error for NotifyError {}
