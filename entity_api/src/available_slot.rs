use super::error::{EntityApiErrorKind, Error};
use entity::available_slots::{ActiveModel, Column, Entity, Model};
use entity::{bookings, freelancers, Id};
use log::*;
use sea_orm::{entity::prelude::*, ActiveValue::Set, DatabaseConnection, TransactionTrait, TryIntoModel};

pub async fn create(
    db: &DatabaseConnection,
    slot_model: Model,
    freelancer_id: Id,
) -> Result<Model, Error> {
    debug!("New AvailableSlot Model to be inserted: {slot_model:?}");

    let now = chrono::Utc::now();

    let slot_active_model: ActiveModel = ActiveModel {
        freelancer_id: Set(freelancer_id),
        start_time: Set(slot_model.start_time),
        end_time: Set(slot_model.end_time),
        is_booked: Set(false),
        created_at: Set(now.into()),
        updated_at: Set(now.into()),
        ..Default::default()
    };

    Ok(slot_active_model.save(db).await?.try_into_model()?)
}

pub async fn find_by_id(db: &DatabaseConnection, id: Id) -> Result<Model, Error> {
    Entity::find_by_id(id).one(db).await?.ok_or_else(|| Error {
        source: None,
        error_kind: EntityApiErrorKind::RecordNotFound,
    })
}

/// Ownership-scoped lookup: returns the slot only when it belongs to the
/// given freelancer.
pub async fn find_by_id_and_freelancer(
    db: &DatabaseConnection,
    id: Id,
    freelancer_id: Id,
) -> Result<Option<Model>, Error> {
    Ok(Entity::find_by_id(id)
        .filter(Column::FreelancerId.eq(freelancer_id))
        .one(db)
        .await?)
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

/// Finds a slot of the same freelancer whose half-open interval overlaps
/// `[start_time, end_time)`. `exclude_slot_id` lets an update skip the slot
/// being edited.
pub async fn find_overlapping(
    db: &DatabaseConnection,
    freelancer_id: Id,
    start_time: DateTimeWithTimeZone,
    end_time: DateTimeWithTimeZone,
    exclude_slot_id: Option<Id>,
) -> Result<Option<Model>, Error> {
    let mut query = Entity::find()
        .filter(Column::FreelancerId.eq(freelancer_id))
        .filter(Column::EndTime.gt(start_time))
        .filter(Column::StartTime.lt(end_time));

    if let Some(exclude) = exclude_slot_id {
        query = query.filter(Column::Id.ne(exclude));
    }

    Ok(query.one(db).await?)
}

pub async fn find_by_id_with_freelancer(
    db: &DatabaseConnection,
    id: Id,
) -> Result<(Model, freelancers::Model), Error> {
    if let Some(results) = Entity::find_by_id(id)
        .find_also_related(freelancers::Entity)
        .one(db)
        .await?
    {
        if let Some(freelancer) = results.1 {
            return Ok((results.0, freelancer));
        }
    }
    Err(Error {
        source: None,
        error_kind: EntityApiErrorKind::RecordNotFound,
    })
}

/// Deletes a slot and its dependent booking, if any, in one transaction.
pub async fn delete_by_id(db: &DatabaseConnection, id: Id) -> Result<(), Error> {
    let txn = db.begin().await?;

    bookings::Entity::delete_many()
        .filter(bookings::Column::SlotId.eq(id))
        .exec(&txn)
        .await?;

    Entity::delete_by_id(id).exec(&txn).await?;

    txn.commit().await?;

    Ok(())
}
