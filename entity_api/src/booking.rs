use super::error::{EntityApiErrorKind, Error};
use entity::booking_status::BookingStatus;
use entity::bookings::{ActiveModel, Column, Entity, Model};
use entity::Id;
use log::*;
use sea_orm::{
    entity::prelude::*,
    ActiveValue::{Set, Unchanged},
    DatabaseConnection, TryIntoModel,
};

pub async fn create(db: &DatabaseConnection, booking_model: Model) -> Result<Model, Error> {
    debug!("New Booking Model to be inserted: {booking_model:?}");

    let now = chrono::Utc::now();

    let booking_active_model: ActiveModel = ActiveModel {
        freelancer_id: Set(booking_model.freelancer_id),
        slot_id: Set(booking_model.slot_id),
        time: Set(booking_model.time),
        client_name: Set(booking_model.client_name),
        client_email: Set(booking_model.client_email),
        meeting_link: Set(None),
        status: Set(BookingStatus::Pending),
        created_at: Set(now.into()),
        updated_at: Set(now.into()),
        ..Default::default()
    };

    Ok(booking_active_model.save(db).await?.try_into_model()?)
}

pub async fn find_by_id(db: &DatabaseConnection, id: Id) -> Result<Model, Error> {
    Entity::find_by_id(id).one(db).await?.ok_or_else(|| Error {
        source: None,
        error_kind: EntityApiErrorKind::RecordNotFound,
    })
}

pub async fn find_by_freelancer(
    db: &DatabaseConnection,
    freelancer_id: Id,
) -> Result<Vec<Model>, Error> {
    Ok(Entity::find()
        .filter(Column::FreelancerId.eq(freelancer_id))
        .all(db)
        .await?)
}

/// Persists a status change. Everything except the status, the optional
/// meeting link, and `updated_at` stays untouched; a `None` meeting link
/// leaves the stored link as-is rather than clearing it.
pub async fn update_status(
    db: &DatabaseConnection,
    id: Id,
    status: BookingStatus,
    meeting_link: Option<String>,
) -> Result<Model, Error> {
    let result = Entity::find_by_id(id).one(db).await?;

    match result {
        Some(booking) => {
            debug!("Existing Booking model to be updated: {booking:?}");

            let active_model: ActiveModel = ActiveModel {
                id: Unchanged(booking.id),
                freelancer_id: Unchanged(booking.freelancer_id),
                slot_id: Unchanged(booking.slot_id),
                time: Unchanged(booking.time),
                client_name: Unchanged(booking.client_name),
                client_email: Unchanged(booking.client_email),
                meeting_link: match meeting_link {
                    Some(link) => Set(Some(link)),
                    None => Unchanged(booking.meeting_link),
                },
                status: Set(status),
                created_at: Unchanged(booking.created_at),
                updated_at: Set(chrono::Utc::now().into()),
            };

            Ok(active_model.update(db).await?.try_into_model()?)
        }
        None => {
            error!("Booking with id {id} not found");

            Err(Error {
                source: None,
                error_kind: EntityApiErrorKind::RecordNotFound,
            })
        }
    }
}
