//! Slot Manager: CRUD over a freelancer's available slots plus the
//! interval invariants (minimum length, no per-freelancer overlap).

use crate::error::{
    ConflictKind, DomainErrorKind, Error, ResourceKind, ValidationErrorKind,
};
use crate::Id;
use entity::available_slots::{self, Model};
use entity_api::{available_slot, freelancer, mutate, mutate::IntoUpdateMap};
use log::*;
use sea_orm::prelude::DateTimeWithTimeZone;
use sea_orm::{DatabaseConnection, IntoActiveModel};
use serde::{Deserialize, Serialize};
use service::config::Config;

/// A slot joined with its owner's contact details, so downstream logic
/// (booking creation, notifications) avoids a second round trip.
#[derive(Clone, Debug, Serialize)]
pub struct SlotWithOwner {
    #[serde(flatten)]
    pub slot: Model,
    pub freelancer_name: String,
    pub freelancer_email: String,
}

/// Partial update of a slot. An absent field is left untouched, which is
/// distinct from explicitly supplying a value.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct SlotPatch {
    pub start_time: Option<DateTimeWithTimeZone>,
    pub end_time: Option<DateTimeWithTimeZone>,
    pub is_booked: Option<bool>,
}

impl IntoUpdateMap for SlotPatch {
    fn into_update_map(self) -> mutate::UpdateMap {
        let mut update_map = mutate::UpdateMap::new();
        if let Some(start_time) = self.start_time {
            update_map.insert("start_time".to_string(), Some(start_time.into()));
        }
        if let Some(end_time) = self.end_time {
            update_map.insert("end_time".to_string(), Some(end_time.into()));
        }
        if let Some(is_booked) = self.is_booked {
            update_map.insert("is_booked".to_string(), Some(is_booked.into()));
        }
        update_map
    }
}

pub async fn create(
    db: &DatabaseConnection,
    config: &Config,
    slot_model: Model,
    freelancer_id: Id,
) -> Result<Model, Error> {
    validate_interval(config, slot_model.start_time, slot_model.end_time)?;

    ensure_no_overlap(
        db,
        freelancer_id,
        slot_model.start_time,
        slot_model.end_time,
        None,
    )
    .await?;

    available_slot::create(db, slot_model, freelancer_id)
        .await
        .map_err(|err| Error::from_entity(err, ResourceKind::Slot))
}

pub async fn find_by_id(db: &DatabaseConnection, id: Id) -> Result<Model, Error> {
    available_slot::find_by_id(db, id)
        .await
        .map_err(|err| Error::from_entity(err, ResourceKind::Slot))
}

pub async fn find_by_freelancer(
    db: &DatabaseConnection,
    freelancer_id: Id,
) -> Result<Vec<Model>, Error> {
    // Distinguish "unknown freelancer" from "freelancer with no slots"
    freelancer::find_by_id(db, freelancer_id)
        .await
        .map_err(|err| Error::from_entity(err, ResourceKind::Freelancer))?;

    available_slot::find_by_freelancer(db, freelancer_id)
        .await
        .map_err(|err| Error::from_entity(err, ResourceKind::Slot))
}

pub async fn find_by_id_with_owner(db: &DatabaseConnection, id: Id) -> Result<SlotWithOwner, Error> {
    let (slot, owner) = available_slot::find_by_id_with_freelancer(db, id)
        .await
        .map_err(|err| Error::from_entity(err, ResourceKind::Slot))?;

    Ok(SlotWithOwner {
        slot,
        freelancer_name: owner.display_name(),
        freelancer_email: owner.email,
    })
}

pub async fn update(
    db: &DatabaseConnection,
    config: &Config,
    id: Id,
    freelancer_id: Id,
    patch: SlotPatch,
) -> Result<Model, Error> {
    let slot = available_slot::find_by_id(db, id)
        .await
        .map_err(|err| Error::from_entity(err, ResourceKind::Slot))?;

    if slot.freelancer_id != freelancer_id {
        warn!("Freelancer {freelancer_id} attempted to update slot {id} they do not own");
        return Err(Error {
            source: None,
            error_kind: DomainErrorKind::PermissionDenied(ResourceKind::Slot),
        });
    }

    // Only when both bounds move does the interval need revalidation;
    // single-bound patches come from the booking engine's slot shift and
    // keep the stored counterpart bound.
    if let (Some(start_time), Some(end_time)) = (patch.start_time, patch.end_time) {
        validate_interval(config, start_time, end_time)?;
        ensure_no_overlap(db, freelancer_id, start_time, end_time, Some(id)).await?;
    }

    let mut update_map = patch.into_update_map();
    update_map.insert(
        "updated_at".to_string(),
        Some(chrono::Utc::now().fixed_offset().into()),
    );

    mutate::update::<available_slots::ActiveModel, available_slots::Column>(
        db,
        slot.into_active_model(),
        update_map,
    )
    .await
    .map_err(|err| Error::from_entity(err, ResourceKind::Slot))
}

/// Ownership is enforced inside the lookup: a slot that exists but belongs
/// to someone else is indistinguishable from a missing one.
pub async fn delete(db: &DatabaseConnection, id: Id, freelancer_id: Id) -> Result<(), Error> {
    let slot = available_slot::find_by_id_and_freelancer(db, id, freelancer_id)
        .await
        .map_err(|err| Error::from_entity(err, ResourceKind::Slot))?;

    match slot {
        Some(slot) => available_slot::delete_by_id(db, slot.id)
            .await
            .map_err(|err| Error::from_entity(err, ResourceKind::Slot)),
        None => Err(Error {
            source: None,
            error_kind: DomainErrorKind::NotFound(ResourceKind::Slot),
        }),
    }
}

fn validate_interval(
    config: &Config,
    start_time: DateTimeWithTimeZone,
    end_time: DateTimeWithTimeZone,
) -> Result<(), Error> {
    let minimum = chrono::Duration::minutes(config.min_slot_duration_minutes);

    if end_time <= start_time || end_time.signed_duration_since(start_time) < minimum {
        return Err(Error {
            source: None,
            error_kind: DomainErrorKind::Validation(ValidationErrorKind::SlotInterval),
        });
    }
    Ok(())
}

async fn ensure_no_overlap(
    db: &DatabaseConnection,
    freelancer_id: Id,
    start_time: DateTimeWithTimeZone,
    end_time: DateTimeWithTimeZone,
    exclude_slot_id: Option<Id>,
) -> Result<(), Error> {
    let overlapping =
        available_slot::find_overlapping(db, freelancer_id, start_time, end_time, exclude_slot_id)
            .await
            .map_err(|err| Error::from_entity(err, ResourceKind::Slot))?;

    if let Some(existing) = overlapping {
        warn!(
            "Slot [{start_time}, {end_time}) for freelancer {freelancer_id} overlaps slot {}",
            existing.id
        );
        return Err(Error {
            source: None,
            error_kind: DomainErrorKind::Conflict(ConflictKind::SlotOverlap),
        });
    }
    Ok(())
}

#[cfg(test)]
#[cfg(feature = "mock")]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use entity::freelancers;
    use sea_orm::{DatabaseBackend, MockDatabase};
    use serial_test::serial;

    fn test_config() -> Config {
        Config::default()
    }

    fn slot(freelancer_id: Id, length_minutes: i64) -> Model {
        let now = Utc::now();
        let start = now + Duration::hours(24);
        Model {
            id: Id::new_v4(),
            freelancer_id,
            start_time: start.fixed_offset(),
            end_time: (start + Duration::minutes(length_minutes)).fixed_offset(),
            is_booked: false,
            created_at: now.fixed_offset(),
            updated_at: now.fixed_offset(),
        }
    }

    #[tokio::test]
    #[serial]
    async fn create_rejects_an_interval_shorter_than_the_minimum() {
        let db = MockDatabase::new(DatabaseBackend::Postgres).into_connection();
        let freelancer_id = Id::new_v4();
        let too_short = slot(freelancer_id, 30);

        let result = create(&db, &test_config(), too_short, freelancer_id).await;

        assert_eq!(result.unwrap_err().code(), "timeslot.invalid");
    }

    #[tokio::test]
    #[serial]
    async fn create_rejects_an_inverted_interval() {
        let db = MockDatabase::new(DatabaseBackend::Postgres).into_connection();
        let freelancer_id = Id::new_v4();
        let mut inverted = slot(freelancer_id, 120);
        std::mem::swap(&mut inverted.start_time, &mut inverted.end_time);

        let result = create(&db, &test_config(), inverted, freelancer_id).await;

        assert_eq!(result.unwrap_err().code(), "timeslot.invalid");
    }

    #[tokio::test]
    #[serial]
    async fn create_rejects_an_overlapping_interval() {
        let freelancer_id = Id::new_v4();
        let existing = slot(freelancer_id, 90);
        // Second slot starting inside the existing one
        let mut requested = slot(freelancer_id, 60);
        requested.start_time = existing.start_time + Duration::minutes(30);
        requested.end_time = requested.start_time + Duration::minutes(60);

        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results(vec![vec![existing]])
            .into_connection();

        let result = create(&db, &test_config(), requested, freelancer_id).await;

        assert_eq!(result.unwrap_err().code(), "timeslot.conflict");
    }

    #[tokio::test]
    #[serial]
    async fn create_persists_a_conflict_free_slot() -> Result<(), Error> {
        let freelancer_id = Id::new_v4();
        let requested = slot(freelancer_id, 120);

        let db = MockDatabase::new(DatabaseBackend::Postgres)
            // no overlapping slot, then the inserted row
            .append_query_results(vec![Vec::<Model>::new()])
            .append_query_results(vec![vec![requested.clone()]])
            .into_connection();

        let created = create(&db, &test_config(), requested.clone(), freelancer_id).await?;

        assert_eq!(created.id, requested.id);
        assert!(!created.is_booked);

        Ok(())
    }

    #[tokio::test]
    #[serial]
    async fn update_rejects_a_non_owner() {
        let stored = slot(Id::new_v4(), 120);

        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results(vec![vec![stored.clone()]])
            .into_connection();

        let result = update(
            &db,
            &test_config(),
            stored.id,
            Id::new_v4(),
            SlotPatch {
                is_booked: Some(true),
                ..Default::default()
            },
        )
        .await;

        assert_eq!(result.unwrap_err().code(), "slot.permission_denied");
    }

    #[tokio::test]
    #[serial]
    async fn update_revalidates_overlap_when_both_bounds_move() {
        let freelancer_id = Id::new_v4();
        let stored = slot(freelancer_id, 120);
        let neighbor = slot(freelancer_id, 120);

        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results(vec![vec![stored.clone()]])
            .append_query_results(vec![vec![neighbor]])
            .into_connection();

        let result = update(
            &db,
            &test_config(),
            stored.id,
            freelancer_id,
            SlotPatch {
                start_time: Some(stored.start_time),
                end_time: Some(stored.end_time + Duration::hours(1)),
                ..Default::default()
            },
        )
        .await;

        assert_eq!(result.unwrap_err().code(), "timeslot.conflict");
    }

    #[tokio::test]
    #[serial]
    async fn update_applies_a_single_field_patch() -> Result<(), Error> {
        let freelancer_id = Id::new_v4();
        let stored = slot(freelancer_id, 90);
        let flagged = Model {
            is_booked: true,
            ..stored.clone()
        };

        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results(vec![vec![stored.clone()]])
            .append_query_results(vec![vec![flagged.clone()]])
            .into_connection();

        let updated = update(
            &db,
            &test_config(),
            stored.id,
            freelancer_id,
            SlotPatch {
                is_booked: Some(true),
                ..Default::default()
            },
        )
        .await?;

        assert!(updated.is_booked);
        assert_eq!(updated.start_time, stored.start_time);

        Ok(())
    }

    #[tokio::test]
    #[serial]
    async fn delete_reports_not_found_for_a_foreign_slot() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results(vec![Vec::<Model>::new()])
            .into_connection();

        let result = delete(&db, Id::new_v4(), Id::new_v4()).await;

        assert_eq!(result.unwrap_err().code(), "slot.not_found");
    }

    #[tokio::test]
    #[serial]
    async fn find_by_freelancer_requires_the_freelancer_to_exist() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results(vec![Vec::<freelancers::Model>::new()])
            .into_connection();

        let result = find_by_freelancer(&db, Id::new_v4()).await;

        assert_eq!(result.unwrap_err().code(), "freelancer.not_found");
    }
}
