/// Outbound email
///
/// The domain services only see the [`Mailer`] trait. Deployments without
/// mail settings simply run without a mailer.

pub mod http;

use async_trait::async_trait;
use serde::Serialize;

pub use http::{HttpMailer, MailConfig};

/// Error type for mail dispatch
#[derive(Debug, thiserror::Error)]
pub enum MailError {
    /// Request could not be sent or timed out
    #[error("Mail transport error: {0}")]
    Transport(String),

    /// Mail provider answered with a non-success status
    #[error("Mail provider rejected message with status {status}: {body}")]
    Rejected { status: u16, body: String },

    /// Invalid mail settings
    #[error("Mail configuration error: {0}")]
    Config(String),
}

/// A single HTML email
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Mail {
    pub to: String,
    pub subject: String,
    pub html: String,
}

/// Sends emails
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send_mail(&self, mail: Mail) -> Result<(), MailError>;
}

/// Builds the email asking a user to confirm their address
///
/// `link` is the absolute URL that redeems the validation token. Both
/// `name` and `link` are escaped before they reach the markup.
pub fn validation_mail(to: &str, name: &str, link: &str) -> Mail {
    let name = html_escape(name);
    let link = html_escape(link);
    Mail {
        to: to.to_string(),
        subject: "Confirm your email address".to_string(),
        html: format!(
            "<p>Hello {name},</p>\
             <p>Please confirm your email address by opening the link below:</p>\
             <p><a href=\"{link}\">{link}</a></p>\
             <p>Once confirmed you will be able to create tasks.</p>"
        ),
    }
}

fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#x27;")
}
