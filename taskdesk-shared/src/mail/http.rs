/// HTTP mail provider adapter
///
/// Posts each message as JSON to a transactional mail API:
///
/// ```text
/// POST {endpoint}
/// Authorization: Bearer {api_key}
///
/// {"from": "...", "to": "...", "subject": "...", "html": "..."}
/// ```

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use std::time::Duration;

use super::{Mail, MailError, Mailer};

/// Mail provider settings
#[derive(Clone, PartialEq, Eq)]
pub struct MailConfig {
    /// Provider endpoint URL
    pub endpoint: String,

    /// Bearer token for the provider
    pub api_key: String,

    /// Sender address
    pub from: String,
}

impl std::fmt::Debug for MailConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MailConfig")
            .field("endpoint", &self.endpoint)
            .field("api_key", &"***")
            .field("from", &self.from)
            .finish()
    }
}

#[derive(Serialize)]
struct OutgoingMail<'a> {
    from: &'a str,
    to: &'a str,
    subject: &'a str,
    html: &'a str,
}

/// Mailer that talks to an HTTP mail API through `reqwest`
#[derive(Debug, Clone)]
pub struct HttpMailer {
    client: Client,
    config: MailConfig,
}

impl HttpMailer {
    /// Builds the mailer with a bounded request timeout
    ///
    /// # Errors
    ///
    /// Returns an error when the endpoint is not an http(s) URL or the HTTP
    /// client cannot be constructed.
    pub fn new(config: MailConfig, timeout: Duration) -> Result<Self, MailError> {
        if !(config.endpoint.starts_with("http://") || config.endpoint.starts_with("https://")) {
            return Err(MailError::Config(format!(
                "MAIL_ENDPOINT must be an http(s) URL, got {}",
                config.endpoint
            )));
        }

        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| MailError::Config(e.to_string()))?;

        Ok(Self { client, config })
    }
}

#[async_trait]
impl Mailer for HttpMailer {
    async fn send_mail(&self, mail: Mail) -> Result<(), MailError> {
        let payload = OutgoingMail {
            from: &self.config.from,
            to: &mail.to,
            subject: &mail.subject,
            html: &mail.html,
        };

        let response = self
            .client
            .post(&self.config.endpoint)
            .bearer_auth(&self.config.api_key)
            .json(&payload)
            .send()
            .await
            .map_err(|e| MailError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(MailError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        tracing::debug!(to = %mail.to, subject = %mail.subject, "Mail sent");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(endpoint: &str) -> MailConfig {
        MailConfig {
            endpoint: endpoint.to_string(),
            api_key: "key-123".to_string(),
            from: "noreply@example.com".to_string(),
        }
    }

    #[test]
    fn test_rejects_non_http_endpoint() {
        let result = HttpMailer::new(config("smtp://mail.example.com"), Duration::from_secs(5));
        assert!(matches!(result, Err(MailError::Config(_))));
    }

    #[test]
    fn test_debug_hides_api_key() {
        let rendered = format!("{:?}", config("https://mail.example.com/send"));
        assert!(!rendered.contains("key-123"));
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_is_transport_error() {
        let mailer = HttpMailer::new(config("http://127.0.0.1:1/send"), Duration::from_secs(2)).unwrap();
        let result = mailer
            .send_mail(Mail {
                to: "a@example.com".to_string(),
                subject: "hi".to_string(),
                html: "<p>hi</p>".to_string(),
            })
            .await;

        assert!(matches!(result, Err(MailError::Transport(_))));
    }
}
