//! Booking Lifecycle Engine: booking creation and the status state
//! machine, orchestrating the Slot Manager, the meeting provider and the
//! notifier.
//!
//! Legal transitions: `Pending → Confirmed`, `Pending → Cancelled`,
//! `Confirmed → Cancelled`, `Confirmed → Completed`. Everything else —
//! including re-setting the current status — is rejected before any side
//! effect runs.

use crate::available_slot::{self, SlotPatch, SlotWithOwner};
use crate::emails;
use crate::error::{ConflictKind, DomainErrorKind, Error, ResourceKind, TransitionErrorKind};
use crate::gateway::zoom;
use crate::Id;
use chrono::Duration;
use entity::booking_status::BookingStatus;
use entity::bookings::Model;
use entity_api::booking;
use log::*;
use sea_orm::DatabaseConnection;
use serde::Deserialize;
use service::config::Config;

/// What a client supplies when booking a slot.
#[derive(Clone, Debug, Deserialize)]
pub struct BookingRequest {
    pub client_name: String,
    pub client_email: String,
}

pub async fn create(
    db: &DatabaseConnection,
    config: &Config,
    slot_id: Id,
    request: BookingRequest,
) -> Result<Model, Error> {
    let slot_with_owner = available_slot::find_by_id_with_owner(db, slot_id).await?;

    if slot_with_owner.slot.is_booked {
        return Err(Error {
            source: None,
            error_kind: DomainErrorKind::Conflict(ConflictKind::SlotAlreadyBooked),
        });
    }

    let now = chrono::Utc::now();
    let booking_model = Model {
        id: Id::new_v4(),
        freelancer_id: slot_with_owner.slot.freelancer_id,
        slot_id: slot_with_owner.slot.id,
        // Frozen here; status changes never touch it
        time: slot_with_owner.slot.start_time,
        client_name: request.client_name,
        client_email: request.client_email,
        meeting_link: None,
        status: BookingStatus::Pending,
        created_at: now.fixed_offset(),
        updated_at: now.fixed_offset(),
    };

    let booking = booking::create(db, booking_model)
        .await
        .map_err(|err| Error::from_entity(err, ResourceKind::Booking))?;

    // Both parties hear about the request. Delivery problems are logged
    // and swallowed: the booking row is already committed and stays.
    if let Err(err) =
        emails::notify_client_on_booking_request(config, &booking, &slot_with_owner).await
    {
        warn!(
            "Failed to dispatch booking-request notification to client for booking {}: {err}",
            booking.id
        );
    }
    if let Err(err) =
        emails::notify_freelancer_on_booking_request(config, &booking, &slot_with_owner).await
    {
        warn!(
            "Failed to dispatch booking-request notification to freelancer for booking {}: {err}",
            booking.id
        );
    }

    Ok(booking)
}

pub async fn find_by_id(db: &DatabaseConnection, id: Id) -> Result<Model, Error> {
    booking::find_by_id(db, id)
        .await
        .map_err(|err| Error::from_entity(err, ResourceKind::Booking))
}

pub async fn find_by_freelancer(
    db: &DatabaseConnection,
    freelancer_id: Id,
) -> Result<Vec<Model>, Error> {
    booking::find_by_freelancer(db, freelancer_id)
        .await
        .map_err(|err| Error::from_entity(err, ResourceKind::Booking))
}

pub async fn update_status(
    db: &DatabaseConnection,
    config: &Config,
    meetings: &zoom::Client,
    id: Id,
    freelancer_id: Id,
    new_status: BookingStatus,
) -> Result<Model, Error> {
    let booking = booking::find_by_id(db, id)
        .await
        .map_err(|err| Error::from_entity(err, ResourceKind::Booking))?;

    let slot_with_owner = available_slot::find_by_id_with_owner(db, booking.slot_id).await?;

    if booking.freelancer_id != freelancer_id {
        warn!("Freelancer {freelancer_id} attempted to update booking {id} they do not own");
        return Err(Error {
            source: None,
            error_kind: DomainErrorKind::PermissionDenied(ResourceKind::Booking),
        });
    }

    validate_transition(&booking.status, &new_status)?;

    if booking.status == BookingStatus::Pending && new_status == BookingStatus::Confirmed {
        return confirm(db, config, meetings, &booking, &slot_with_owner).await;
    }

    // Cancellation from either live state, or completion of a confirmed
    // booking: a plain status write, no slot mutation.
    let updated = booking::update_status(db, booking.id, new_status.clone(), None)
        .await
        .map_err(|err| Error::from_entity(err, ResourceKind::Booking))?;

    let notified = if new_status == BookingStatus::Cancelled {
        emails::notify_client_on_booking_cancellation(config, &updated, &slot_with_owner).await
    } else {
        emails::notify_client_on_booking_completion(config, &updated, &slot_with_owner).await
    };
    if let Err(err) = notified {
        warn!(
            "Failed to dispatch {new_status} notification for booking {}: {err}",
            updated.id
        );
    }

    Ok(updated)
}

/// Pending → Confirmed: create the meeting, consume or shift the slot,
/// persist the link, tell the client.
async fn confirm(
    db: &DatabaseConnection,
    config: &Config,
    meetings: &zoom::Client,
    booking: &Model,
    slot_with_owner: &SlotWithOwner,
) -> Result<Model, Error> {
    let slot = &slot_with_owner.slot;

    // Race guard: another booking on the same slot may have been
    // confirmed between this booking's creation and now.
    if slot.is_booked {
        return Err(Error {
            source: None,
            error_kind: DomainErrorKind::Conflict(ConflictKind::SlotAlreadyBooked),
        });
    }

    let topic = format!("Booking {} with {}", booking.id, booking.client_name);
    let meeting = meetings
        .create_meeting(&topic, slot.start_time, config.meeting_duration_minutes)
        .await?;

    let persisted = persist_confirmation(db, config, booking, slot_with_owner, &meeting).await;

    let updated = match persisted {
        Ok(updated) => updated,
        Err(err) => {
            // The meeting exists remotely but nothing will ever reference
            // it; tear it down so the storage failure does not leak an
            // orphaned meeting.
            if let Err(cleanup_err) = meetings.delete_meeting(meeting.id).await {
                warn!(
                    "Failed to delete orphaned meeting {} for booking {}: {cleanup_err}",
                    meeting.id, booking.id
                );
            }
            return Err(err);
        }
    };

    if let Err(err) =
        emails::notify_client_on_booking_confirmation(config, &updated, slot_with_owner).await
    {
        warn!(
            "Failed to dispatch confirmation notification for booking {}: {err}",
            updated.id
        );
    }

    Ok(updated)
}

async fn persist_confirmation(
    db: &DatabaseConnection,
    config: &Config,
    booking: &Model,
    slot_with_owner: &SlotWithOwner,
    meeting: &zoom::Meeting,
) -> Result<Model, Error> {
    let slot = &slot_with_owner.slot;

    // Reuses the slot update path, ownership check included; the booking's
    // freelancer is the slot's owner so it passes.
    available_slot::update(
        db,
        config,
        slot.id,
        slot.freelancer_id,
        slot_patch_after_confirmation(config, slot),
    )
    .await?;

    booking::update_status(
        db,
        booking.id,
        BookingStatus::Confirmed,
        Some(meeting.join_url.clone()),
    )
    .await
    .map_err(|err| Error::from_entity(err, ResourceKind::Booking))
}

/// A confirmed meeting only consumes the first hour (configurable) of a
/// longer block: short slots are flagged booked outright, longer ones keep
/// their tail open for rebooking by shifting the start forward.
fn slot_patch_after_confirmation(config: &Config, slot: &entity::available_slots::Model) -> SlotPatch {
    let consume_threshold = Duration::minutes(config.slot_consume_threshold_minutes);

    if slot.duration() < consume_threshold {
        debug!("Slot {} is fully consumed by its confirmed booking", slot.id);
        SlotPatch {
            is_booked: Some(true),
            ..Default::default()
        }
    } else {
        let shifted = slot.start_time + Duration::minutes(config.slot_shift_minutes);
        debug!("Slot {} keeps its tail open, start shifted to {shifted}", slot.id);
        SlotPatch {
            start_time: Some(shifted),
            ..Default::default()
        }
    }
}

fn validate_transition(
    current: &BookingStatus,
    requested: &BookingStatus,
) -> Result<(), Error> {
    if requested == current {
        return Err(Error {
            source: None,
            error_kind: DomainErrorKind::IllegalTransition(TransitionErrorKind::NoChanges),
        });
    }

    let allowed = !current.is_terminal()
        && match current {
            BookingStatus::Pending => {
                matches!(requested, BookingStatus::Confirmed | BookingStatus::Cancelled)
            }
            BookingStatus::Confirmed => {
                matches!(requested, BookingStatus::Cancelled | BookingStatus::Completed)
            }
            _ => false,
        };

    if allowed {
        Ok(())
    } else {
        Err(Error {
            source: None,
            error_kind: DomainErrorKind::IllegalTransition(TransitionErrorKind::OperationNotAllowed),
        })
    }
}
