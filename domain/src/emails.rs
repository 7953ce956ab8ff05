//! Notification dispatch for booking lifecycle events.
//!
//! Each operation picks a configured MailerSend template, fills in the
//! personalization variables, and hands the request to the gateway, which
//! sends it in the background. Errors returned here are configuration
//! problems only; the booking engine logs and swallows them, so neither a
//! missing template nor a provider outage ever fails a booking.

use crate::available_slot::SlotWithOwner;
use crate::bookings;
use crate::error::{DomainErrorKind, Error, InternalErrorKind};
use crate::gateway::mailersend::{MailerSendClient, SendEmailRequestBuilder};
use log::*;
use sea_orm::prelude::DateTimeWithTimeZone;
use service::config::Config;

/// Human-readable rendering of a booking time, e.g. "August 07, 2026 at 10:00 AM".
fn format_booking_time(time: &DateTimeWithTimeZone) -> String {
    time.format("%B %d, %Y at %I:%M %p").to_string()
}

/// "Your request was received" — to the client, right after booking creation.
pub async fn notify_client_on_booking_request(
    config: &Config,
    booking: &bookings::Model,
    slot: &SlotWithOwner,
) -> Result<(), Error> {
    info!(
        "Dispatching booking-request notification to client {} for booking {}",
        booking.client_email, booking.id
    );

    let mailersend_client = MailerSendClient::new(config).await?;
    let template_id = config
        .booking_request_client_template_id()
        .ok_or_else(|| missing_template("booking request (client)"))?;

    let email_request = SendEmailRequestBuilder::new()
        .from_with_name(config.email_from_address(), config.email_from_name())
        .to_with_name(&booking.client_email, booking.client_name.clone())
        .subject("Booking Request Received")
        .template_id(template_id)
        .add_personalization("client_name", &booking.client_name)
        .add_personalization("freelancer_name", &slot.freelancer_name)
        .add_personalization("booking_time", &format_booking_time(&booking.time))
        .build()?;

    mailersend_client.send_email(email_request);
    Ok(())
}

/// "You have a new request" — to the freelancer, right after booking creation.
pub async fn notify_freelancer_on_booking_request(
    config: &Config,
    booking: &bookings::Model,
    slot: &SlotWithOwner,
) -> Result<(), Error> {
    info!(
        "Dispatching booking-request notification to freelancer {} for booking {}",
        slot.freelancer_email, booking.id
    );

    let mailersend_client = MailerSendClient::new(config).await?;
    let template_id = config
        .booking_request_freelancer_template_id()
        .ok_or_else(|| missing_template("booking request (freelancer)"))?;

    let email_request = SendEmailRequestBuilder::new()
        .from_with_name(config.email_from_address(), config.email_from_name())
        .to_with_name(&slot.freelancer_email, slot.freelancer_name.clone())
        .subject("New Booking Request")
        .template_id(template_id)
        .add_personalization("freelancer_name", &slot.freelancer_name)
        .add_personalization("client_name", &booking.client_name)
        .add_personalization("booking_time", &format_booking_time(&booking.time))
        .build()?;

    mailersend_client.send_email(email_request);
    Ok(())
}

/// Confirmation with the meeting link — to the client.
pub async fn notify_client_on_booking_confirmation(
    config: &Config,
    booking: &bookings::Model,
    slot: &SlotWithOwner,
) -> Result<(), Error> {
    info!(
        "Dispatching confirmation notification to client {} for booking {}",
        booking.client_email, booking.id
    );

    let mailersend_client = MailerSendClient::new(config).await?;
    let template_id = config
        .booking_confirmation_template_id()
        .ok_or_else(|| missing_template("booking confirmation"))?;

    let email_request = SendEmailRequestBuilder::new()
        .from_with_name(config.email_from_address(), config.email_from_name())
        .to_with_name(&booking.client_email, booking.client_name.clone())
        .subject("Booking Confirmation")
        .template_id(template_id)
        .add_personalization("client_name", &booking.client_name)
        .add_personalization("freelancer_name", &slot.freelancer_name)
        .add_personalization("booking_time", &format_booking_time(&booking.time))
        .add_personalization(
            "meeting_link",
            booking.meeting_link.as_deref().unwrap_or_default(),
        )
        .build()?;

    mailersend_client.send_email(email_request);
    Ok(())
}

/// Cancellation — to the client, from either pending or confirmed.
pub async fn notify_client_on_booking_cancellation(
    config: &Config,
    booking: &bookings::Model,
    slot: &SlotWithOwner,
) -> Result<(), Error> {
    info!(
        "Dispatching cancellation notification to client {} for booking {}",
        booking.client_email, booking.id
    );

    let mailersend_client = MailerSendClient::new(config).await?;
    let template_id = config
        .booking_cancellation_template_id()
        .ok_or_else(|| missing_template("booking cancellation"))?;

    let email_request = SendEmailRequestBuilder::new()
        .from_with_name(config.email_from_address(), config.email_from_name())
        .to_with_name(&booking.client_email, booking.client_name.clone())
        .subject("Booking Cancellation")
        .template_id(template_id)
        .add_personalization("client_name", &booking.client_name)
        .add_personalization("freelancer_name", &slot.freelancer_name)
        .add_personalization("booking_time", &format_booking_time(&booking.time))
        .build()?;

    mailersend_client.send_email(email_request);
    Ok(())
}

/// Completion — to the client, once a confirmed booking's meeting took place.
pub async fn notify_client_on_booking_completion(
    config: &Config,
    booking: &bookings::Model,
    slot: &SlotWithOwner,
) -> Result<(), Error> {
    info!(
        "Dispatching completion notification to client {} for booking {}",
        booking.client_email, booking.id
    );

    let mailersend_client = MailerSendClient::new(config).await?;
    let template_id = config
        .booking_completion_template_id()
        .ok_or_else(|| missing_template("booking completion"))?;

    let email_request = SendEmailRequestBuilder::new()
        .from_with_name(config.email_from_address(), config.email_from_name())
        .to_with_name(&booking.client_email, booking.client_name.clone())
        .subject("Booking Completed")
        .template_id(template_id)
        .add_personalization("client_name", &booking.client_name)
        .add_personalization("freelancer_name", &slot.freelancer_name)
        .add_personalization("booking_time", &format_booking_time(&booking.time))
        .build()?;

    mailersend_client.send_email(email_request);
    Ok(())
}

fn missing_template(which: &str) -> Error {
    error!("No MailerSend template configured for {which} emails");
    Error {
        source: None,
        error_kind: DomainErrorKind::Internal(InternalErrorKind::Config),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::booking_status::BookingStatus;
    use crate::Id;
    use chrono::Utc;
    use entity::available_slots;
    use serial_test::serial;
    use std::env;

    fn fixtures() -> (bookings::Model, SlotWithOwner) {
        let now = Utc::now();
        let start = now + chrono::Duration::hours(24);
        let slot = available_slots::Model {
            id: Id::new_v4(),
            freelancer_id: Id::new_v4(),
            start_time: start.fixed_offset(),
            end_time: (start + chrono::Duration::hours(2)).fixed_offset(),
            is_booked: false,
            created_at: now.fixed_offset(),
            updated_at: now.fixed_offset(),
        };
        let booking = bookings::Model {
            id: Id::new_v4(),
            freelancer_id: slot.freelancer_id,
            slot_id: slot.id,
            time: slot.start_time,
            client_name: "Arif Hossain".to_owned(),
            client_email: "arif@example.com".to_owned(),
            meeting_link: Some("https://zoom.us/j/9123456".to_owned()),
            status: BookingStatus::Pending,
            created_at: now.fixed_offset(),
            updated_at: now.fixed_offset(),
        };
        let slot_with_owner = SlotWithOwner {
            slot,
            freelancer_name: "Nadia Rahman".to_owned(),
            freelancer_email: "nadia@example.com".to_owned(),
        };
        (booking, slot_with_owner)
    }

    fn configure_mailersend_env(server_url: &str) -> Config {
        env::set_var("MAILERSEND_API_KEY", "test_api_key_123");
        env::set_var("MAILERSEND_BASE_URL", server_url);
        env::set_var("BOOKING_REQUEST_CLIENT_TEMPLATE_ID", "tmpl_request_client");
        env::set_var(
            "BOOKING_REQUEST_FREELANCER_TEMPLATE_ID",
            "tmpl_request_freelancer",
        );
        env::set_var("BOOKING_CONFIRMATION_TEMPLATE_ID", "tmpl_confirmation");
        env::set_var("BOOKING_CANCELLATION_TEMPLATE_ID", "tmpl_cancellation");
        env::set_var("BOOKING_COMPLETION_TEMPLATE_ID", "tmpl_completion");
        Config::default()
    }

    #[tokio::test]
    #[serial]
    async fn booking_request_email_carries_the_client_personalization() {
        let mut server = mockito::Server::new_async().await;
        let config = configure_mailersend_env(&server.url());
        let (booking, slot_with_owner) = fixtures();

        let mock = server
            .mock("POST", "/email")
            .match_header("authorization", "Bearer test_api_key_123")
            .match_body(mockito::Matcher::Json(serde_json::json!({
                "from": {
                    "email": "bookings@freelancebooking.app",
                    "name": "Freelance Booking"
                },
                "to": [{
                    "email": "arif@example.com",
                    "name": "Arif Hossain"
                }],
                "subject": "Booking Request Received",
                "template_id": "tmpl_request_client",
                "personalization": [{
                    "email": "arif@example.com",
                    "data": {
                        "client_name": "Arif Hossain",
                        "freelancer_name": "Nadia Rahman",
                        "booking_time": format_booking_time(&booking.time)
                    }
                }]
            })))
            .with_status(202)
            .with_header("x-message-id", "msg_123")
            .create_async()
            .await;

        let result =
            notify_client_on_booking_request(&config, &booking, &slot_with_owner).await;
        assert!(result.is_ok());

        // Give the spawned task time to execute
        tokio::time::sleep(tokio::time::Duration::from_millis(200)).await;
        mock.assert_async().await;
    }

    #[tokio::test]
    #[serial]
    async fn confirmation_email_includes_the_meeting_link() {
        let mut server = mockito::Server::new_async().await;
        let config = configure_mailersend_env(&server.url());
        let (booking, slot_with_owner) = fixtures();

        let mock = server
            .mock("POST", "/email")
            .match_body(mockito::Matcher::PartialJson(serde_json::json!({
                "template_id": "tmpl_confirmation",
                "personalization": [{
                    "email": "arif@example.com",
                    "data": {
                        "meeting_link": "https://zoom.us/j/9123456"
                    }
                }]
            })))
            .with_status(202)
            .create_async()
            .await;

        let result =
            notify_client_on_booking_confirmation(&config, &booking, &slot_with_owner).await;
        assert!(result.is_ok());

        tokio::time::sleep(tokio::time::Duration::from_millis(200)).await;
        mock.assert_async().await;
    }

    #[tokio::test]
    #[serial]
    async fn completion_email_uses_its_own_template() {
        let mut server = mockito::Server::new_async().await;
        let config = configure_mailersend_env(&server.url());
        let (booking, slot_with_owner) = fixtures();

        let mock = server
            .mock("POST", "/email")
            .match_body(mockito::Matcher::PartialJson(serde_json::json!({
                "subject": "Booking Completed",
                "template_id": "tmpl_completion"
            })))
            .with_status(202)
            .create_async()
            .await;

        let result =
            notify_client_on_booking_completion(&config, &booking, &slot_with_owner).await;
        assert!(result.is_ok());

        tokio::time::sleep(tokio::time::Duration::from_millis(200)).await;
        mock.assert_async().await;
    }

    #[tokio::test]
    #[serial]
    async fn a_missing_template_id_is_a_config_error() {
        let mut server = mockito::Server::new_async().await;
        let _config = configure_mailersend_env(&server.url());
        env::remove_var("BOOKING_CANCELLATION_TEMPLATE_ID");
        let config = Config::default();
        let (booking, slot_with_owner) = fixtures();

        let result =
            notify_client_on_booking_cancellation(&config, &booking, &slot_with_owner).await;

        assert_eq!(result.unwrap_err().code(), "config.error");
    }

    #[tokio::test]
    #[serial]
    async fn a_missing_api_key_is_a_config_error() {
        env::remove_var("MAILERSEND_API_KEY");
        let config = Config::default();
        let (booking, slot_with_owner) = fixtures();

        let result = notify_client_on_booking_request(&config, &booking, &slot_with_owner).await;

        assert_eq!(result.unwrap_err().code(), "config.error");
    }

    #[tokio::test]
    #[serial]
    async fn a_provider_failure_never_reaches_the_caller() {
        let mut server = mockito::Server::new_async().await;
        let config = configure_mailersend_env(&server.url());
        let (booking, slot_with_owner) = fixtures();

        let _mock = server
            .mock("POST", "/email")
            .with_status(422)
            .with_body(r#"{"message": "Invalid request"}"#)
            .create_async()
            .await;

        // The dispatch happens in the background; the caller sees Ok
        let result =
            notify_client_on_booking_request(&config, &booking, &slot_with_owner).await;
        assert!(result.is_ok());

        // Give the spawned task time to execute and log the error
        tokio::time::sleep(tokio::time::Duration::from_millis(200)).await;
    }
}
