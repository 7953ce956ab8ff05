//! Cached server-to-server OAuth token for the Zoom API.
//!
//! The cache is an explicit object owned by the Zoom client, not ambient
//! process state. The mutex is held across a refresh, so when several
//! requests hit an expired token at once only one performs the exchange.

use crate::error::{DomainErrorKind, Error, ExternalErrorKind, InternalErrorKind};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use chrono::{DateTime, Duration, Utc};
use log::*;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use service::config::Config;
use tokio::sync::Mutex;

/// A bearer token with its absolute expiry.
#[derive(Debug)]
struct CachedToken {
    access_token: SecretString,
    expires_at: DateTime<Utc>,
}

impl CachedToken {
    /// Expired, or close enough to expiry that a request using it could
    /// race the cutoff.
    fn is_expired(&self, buffer: Duration) -> bool {
        self.expires_at <= Utc::now() + buffer
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: i64,
}

#[derive(Debug)]
pub struct TokenCache {
    http: reqwest::Client,
    oauth_base_url: String,
    client_id: String,
    client_secret: SecretString,
    account_id: String,
    expiry_buffer: Duration,
    state: Mutex<Option<CachedToken>>,
}

impl TokenCache {
    pub fn new(config: &Config) -> Result<Self, Error> {
        let client_id = config.zoom_client_id().ok_or_else(|| missing("client ID"))?;
        let client_secret = config
            .zoom_client_secret()
            .ok_or_else(|| missing("client secret"))?;
        let account_id = config
            .zoom_account_id()
            .ok_or_else(|| missing("account ID"))?;

        Ok(Self {
            http: reqwest::Client::builder().use_rustls_tls().build()?,
            oauth_base_url: config.zoom_oauth_base_url().to_string(),
            client_id,
            client_secret: SecretString::from(client_secret),
            account_id,
            expiry_buffer: Duration::seconds(config.zoom_token_expiry_buffer_secs),
            state: Mutex::new(None),
        })
    }

    /// Returns the cached token while it is comfortably valid, otherwise
    /// performs a client-credentials exchange and caches the result.
    pub async fn get_token(&self) -> Result<SecretString, Error> {
        let mut state = self.state.lock().await;

        if let Some(cached) = state.as_ref() {
            if !cached.is_expired(self.expiry_buffer) {
                return Ok(cached.access_token.clone());
            }
        }

        let fresh = self.exchange().await?;
        let access_token = fresh.access_token.clone();
        *state = Some(fresh);

        Ok(access_token)
    }

    async fn exchange(&self) -> Result<CachedToken, Error> {
        debug!("Exchanging Zoom client credentials for an access token");

        let credentials = BASE64.encode(format!(
            "{}:{}",
            self.client_id,
            self.client_secret.expose_secret()
        ));

        let response = self
            .http
            .post(format!("{}/oauth/token", self.oauth_base_url))
            .header(reqwest::header::AUTHORIZATION, format!("Basic {credentials}"))
            .query(&[
                ("grant_type", "account_credentials"),
                ("account_id", self.account_id.as_str()),
            ])
            .send()
            .await
            .map_err(|e| {
                warn!("Token exchange request failed: {e:?}");
                Error {
                    source: Some(Box::new(e)),
                    error_kind: DomainErrorKind::External(ExternalErrorKind::Network),
                }
            })?;

        if response.status().is_success() {
            let token: TokenResponse = response.json().await.map_err(|e| {
                warn!("Failed to parse token response: {e:?}");
                Error {
                    source: Some(Box::new(e)),
                    error_kind: DomainErrorKind::External(ExternalErrorKind::Other(
                        "Invalid response from the token endpoint".to_string(),
                    )),
                }
            })?;

            info!("Obtained a Zoom access token, expires in {}s", token.expires_in);

            Ok(CachedToken {
                access_token: SecretString::from(token.access_token),
                expires_at: Utc::now() + Duration::seconds(token.expires_in),
            })
        } else {
            let error_text = response.text().await.unwrap_or_default();
            warn!("Zoom token exchange failed: {error_text}");
            Err(Error {
                source: None,
                error_kind: DomainErrorKind::External(ExternalErrorKind::Provider(error_text)),
            })
        }
    }
}

fn missing(what: &str) -> Error {
    warn!("Zoom {what} is not configured");
    Error {
        source: None,
        error_kind: DomainErrorKind::Internal(InternalErrorKind::Config),
    }
}
