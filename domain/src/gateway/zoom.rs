//! Zoom API client for creating the meetings behind confirmed bookings.

use crate::error::{DomainErrorKind, Error, ExternalErrorKind, InternalErrorKind};
use crate::gateway::zoom_token::TokenCache;
use chrono_tz::Tz;
use log::*;
use sea_orm::prelude::DateTimeWithTimeZone;
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};
use service::config::Config;

#[derive(Debug, Serialize)]
struct MeetingSettings {
    host_video: bool,
    participant_video: bool,
    join_before_host: bool,
    mute_upon_entry: bool,
}

/// Request to schedule a meeting. `type: 2` is Zoom's "scheduled meeting".
#[derive(Debug, Serialize)]
struct CreateMeetingRequest<'a> {
    topic: &'a str,
    #[serde(rename = "type")]
    meeting_type: u8,
    start_time: String,
    duration: i64,
    timezone: &'a str,
    settings: MeetingSettings,
}

/// The subset of Zoom's meeting representation the booking engine needs.
#[derive(Debug, Deserialize)]
pub struct Meeting {
    pub id: i64,
    pub join_url: String,
}

/// Zoom API client. Owns the token cache so every call carries a valid
/// bearer token without callers handling token state.
#[derive(Debug)]
pub struct Client {
    http: reqwest::Client,
    base_url: String,
    timezone: Tz,
    tokens: TokenCache,
}

impl Client {
    pub fn new(config: &Config) -> Result<Self, Error> {
        let timezone: Tz = config.meeting_timezone().parse().map_err(|_| {
            warn!(
                "Invalid meeting timezone configured: {}",
                config.meeting_timezone()
            );
            Error {
                source: None,
                error_kind: DomainErrorKind::Internal(InternalErrorKind::Config),
            }
        })?;

        Ok(Self {
            http: reqwest::Client::builder().use_rustls_tls().build()?,
            base_url: config.zoom_api_base_url().to_string(),
            timezone,
            tokens: TokenCache::new(config)?,
        })
    }

    /// Schedules a meeting and returns its id and join URL. Anything but
    /// HTTP 201 is a hard failure.
    pub async fn create_meeting(
        &self,
        topic: &str,
        start_time: DateTimeWithTimeZone,
        duration_minutes: i64,
    ) -> Result<Meeting, Error> {
        let token = self.tokens.get_token().await?;

        let request = CreateMeetingRequest {
            topic,
            meeting_type: 2,
            start_time: start_time.to_rfc3339(),
            duration: duration_minutes,
            timezone: self.timezone.name(),
            settings: MeetingSettings {
                host_video: true,
                participant_video: true,
                join_before_host: false,
                mute_upon_entry: true,
            },
        };

        debug!("Creating meeting: {topic}");

        let response = self
            .http
            .post(format!("{}/users/me/meetings", self.base_url))
            .bearer_auth(token.expose_secret())
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                warn!("Meeting creation request failed: {e:?}");
                Error {
                    source: Some(Box::new(e)),
                    error_kind: DomainErrorKind::External(ExternalErrorKind::Network),
                }
            })?;

        if response.status() == reqwest::StatusCode::CREATED {
            let meeting: Meeting = response.json().await.map_err(|e| {
                warn!("Failed to parse meeting response: {e:?}");
                Error {
                    source: Some(Box::new(e)),
                    error_kind: DomainErrorKind::External(ExternalErrorKind::Other(
                        "Invalid response from the meeting provider".to_string(),
                    )),
                }
            })?;
            info!("Created meeting {} ({topic})", meeting.id);
            Ok(meeting)
        } else {
            let error_text = response.text().await.unwrap_or_default();
            warn!("Meeting creation failed: {error_text}");
            Err(Error {
                source: None,
                error_kind: DomainErrorKind::External(ExternalErrorKind::Provider(error_text)),
            })
        }
    }

    /// Best-effort removal, used to compensate a meeting whose booking
    /// never committed. A 404 means it is already gone, which is fine.
    pub async fn delete_meeting(&self, meeting_id: i64) -> Result<(), Error> {
        let token = self.tokens.get_token().await?;

        let response = self
            .http
            .delete(format!("{}/meetings/{meeting_id}", self.base_url))
            .bearer_auth(token.expose_secret())
            .send()
            .await
            .map_err(|e| {
                warn!("Meeting deletion request failed: {e:?}");
                Error {
                    source: Some(Box::new(e)),
                    error_kind: DomainErrorKind::External(ExternalErrorKind::Network),
                }
            })?;

        let status = response.status();
        if status.is_success() || status == reqwest::StatusCode::NOT_FOUND {
            info!("Deleted meeting {meeting_id}");
            Ok(())
        } else {
            let error_text = response.text().await.unwrap_or_default();
            warn!("Meeting deletion failed: {error_text}");
            Err(Error {
                source: None,
                error_kind: DomainErrorKind::External(ExternalErrorKind::Provider(error_text)),
            })
        }
    }
}
