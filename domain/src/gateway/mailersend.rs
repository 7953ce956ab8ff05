//! MailerSend API client for sending transactional emails.
//!
//! Dispatch is deliberately fire-and-forget: [`MailerSendClient::send_email`]
//! spawns the HTTP call onto the runtime and logs the outcome, so a slow or
//! failing email provider can never block or fail the write path that
//! triggered the notification.

use crate::error::{DomainErrorKind, Error, ExternalErrorKind, InternalErrorKind};
use email_address::EmailAddress;
use log::*;
use serde::{Deserialize, Serialize};
use service::config::Config;

/// MailerSend API client
pub struct MailerSendClient {
    client: reqwest::Client,
    base_url: String,
}

/// Email recipient with name and email address
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailRecipient {
    pub email: String,
    pub name: Option<String>,
}

/// Email sender with name and email address
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailSender {
    pub email: String,
    pub name: Option<String>,
}

/// Per-recipient template variables
#[derive(Debug, Clone, Serialize)]
pub struct Personalization {
    pub email: String,
    pub data: serde_json::Map<String, serde_json::Value>,
}

/// Request payload for sending an email via MailerSend
#[derive(Debug, Serialize)]
pub struct SendEmailRequest {
    pub from: EmailSender,
    pub to: Vec<EmailRecipient>,
    pub subject: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub template_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub personalization: Option<Vec<Personalization>>,
}

/// Response from MailerSend API
#[derive(Debug, Deserialize)]
pub struct SendEmailResponse {
    pub message_id: Option<String>,
}

/// Builder assembling a [`SendEmailRequest`] for a single recipient with
/// template personalization.
#[derive(Debug, Default)]
pub struct SendEmailRequestBuilder {
    from: Option<EmailSender>,
    to: Vec<EmailRecipient>,
    subject: Option<String>,
    template_id: Option<String>,
    personalization_data: serde_json::Map<String, serde_json::Value>,
}

impl SendEmailRequestBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_with_name(mut self, email: &str, name: &str) -> Self {
        self.from = Some(EmailSender {
            email: email.to_string(),
            name: Some(name.to_string()),
        });
        self
    }

    pub fn to_with_name(mut self, email: &str, name: impl Into<String>) -> Self {
        self.to.push(EmailRecipient {
            email: email.to_string(),
            name: Some(name.into()),
        });
        self
    }

    pub fn subject(mut self, subject: &str) -> Self {
        self.subject = Some(subject.to_string());
        self
    }

    pub fn template_id(mut self, template_id: String) -> Self {
        self.template_id = Some(template_id);
        self
    }

    pub fn add_personalization(mut self, key: &str, value: &str) -> Self {
        self.personalization_data
            .insert(key.to_string(), serde_json::Value::String(value.to_string()));
        self
    }

    pub fn build(self) -> Result<SendEmailRequest, Error> {
        let from = self.from.ok_or_else(|| {
            warn!("Email request is missing a sender");
            Error {
                source: None,
                error_kind: DomainErrorKind::Internal(InternalErrorKind::Other(
                    "Email request is missing a sender".to_string(),
                )),
            }
        })?;

        if !is_valid_email(&from.email) {
            warn!("Invalid sender email: {}", from.email);
            return Err(Error {
                source: None,
                error_kind: DomainErrorKind::Internal(InternalErrorKind::Other(
                    "Invalid sender email address".to_string(),
                )),
            });
        }

        let first_recipient = self.to.first().cloned().ok_or_else(|| {
            warn!("Email request has no recipients");
            Error {
                source: None,
                error_kind: DomainErrorKind::Internal(InternalErrorKind::Other(
                    "Email request has no recipients".to_string(),
                )),
            }
        })?;

        for recipient in &self.to {
            if !is_valid_email(&recipient.email) {
                warn!("Invalid recipient email: {}", recipient.email);
                return Err(Error {
                    source: None,
                    error_kind: DomainErrorKind::Internal(InternalErrorKind::Other(format!(
                        "Invalid recipient email address: {}",
                        recipient.email
                    ))),
                });
            }
        }

        let personalization = if self.personalization_data.is_empty() {
            None
        } else {
            Some(vec![Personalization {
                email: first_recipient.email,
                data: self.personalization_data,
            }])
        };

        Ok(SendEmailRequest {
            from,
            to: self.to,
            subject: self.subject.unwrap_or_default(),
            template_id: self.template_id,
            personalization,
        })
    }
}

impl MailerSendClient {
    /// Create a new MailerSend client with authentication
    pub async fn new(config: &Config) -> Result<Self, Error> {
        let client = build_client(config).await?;
        let base_url = config.mailersend_base_url().to_string();

        Ok(Self { client, base_url })
    }

    /// Dispatches the email in a background task. Delivery failures are
    /// logged, never surfaced to the caller.
    pub fn send_email(self, request: SendEmailRequest) {
        tokio::spawn(async move {
            match self.dispatch(request).await {
                Ok(response) => {
                    info!(
                        "Email sent successfully, message_id: {:?}",
                        response.message_id
                    );
                }
                Err(err) => {
                    warn!("Email delivery failed: {err}");
                }
            }
        });
    }

    async fn dispatch(&self, request: SendEmailRequest) -> Result<SendEmailResponse, Error> {
        let url = format!("{}/email", self.base_url);

        info!("Sending email to {} recipients", request.to.len());
        debug!("Email subject: {}", request.subject);

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                warn!("Failed to send email request: {e:?}");
                Error {
                    source: Some(Box::new(e)),
                    error_kind: DomainErrorKind::External(ExternalErrorKind::Network),
                }
            })?;

        let status = response.status();
        if status.is_success() {
            let message_id = response
                .headers()
                .get("x-message-id")
                .and_then(|v| v.to_str().ok())
                .map(|s| s.to_string());

            Ok(SendEmailResponse { message_id })
        } else {
            let error_text = response.text().await.unwrap_or_default();
            warn!("Failed to send email: {} - {}", status, error_text);
            Err(Error {
                source: None,
                error_kind: DomainErrorKind::External(ExternalErrorKind::Provider(error_text)),
            })
        }
    }
}

/// Build HTTP client with MailerSend authentication
async fn build_client(config: &Config) -> Result<reqwest::Client, Error> {
    let headers = build_auth_headers(config).await?;

    Ok(reqwest::Client::builder()
        .use_rustls_tls()
        .default_headers(headers)
        .build()?)
}

/// Build authentication headers for MailerSend API
async fn build_auth_headers(config: &Config) -> Result<reqwest::header::HeaderMap, Error> {
    let api_key = config.mailersend_api_key().ok_or_else(|| {
        warn!("Failed to get MailerSend API key from config");
        Error {
            source: None,
            error_kind: DomainErrorKind::Internal(InternalErrorKind::Config),
        }
    })?;

    let mut headers = reqwest::header::HeaderMap::new();
    let auth_value = format!("Bearer {}", api_key);
    let mut auth_header = reqwest::header::HeaderValue::from_str(&auth_value).map_err(|err| {
        warn!("Failed to create authorization header value: {err:?}");
        Error {
            source: Some(Box::new(err)),
            error_kind: DomainErrorKind::Internal(InternalErrorKind::Other(
                "Failed to create authorization header value".to_string(),
            )),
        }
    })?;
    auth_header.set_sensitive(true);
    headers.insert(reqwest::header::AUTHORIZATION, auth_header);

    headers.insert(
        reqwest::header::CONTENT_TYPE,
        reqwest::header::HeaderValue::from_static("application/json"),
    );

    Ok(headers)
}

/// Validate email address format using email_address crate
pub fn is_valid_email(email: &str) -> bool {
    EmailAddress::is_valid(email)
}
