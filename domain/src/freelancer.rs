//! Freelancer account operations. Login/session handling lives above this
//! crate; here is only signup, lookups, and the cascading delete.

use crate::error::{ConflictKind, DomainErrorKind, Error, ResourceKind};
use crate::Id;
use entity::freelancers::Model;
use entity_api::freelancer;
use log::*;
use sea_orm::DatabaseConnection;

pub async fn create(db: &DatabaseConnection, freelancer_model: Model) -> Result<Model, Error> {
    let existing = freelancer::find_by_email(db, &freelancer_model.email)
        .await
        .map_err(|err| Error::from_entity(err, ResourceKind::Freelancer))?;

    if existing.is_some() {
        info!(
            "Signup rejected, email already registered: {}",
            freelancer_model.email
        );
        return Err(Error {
            source: None,
            error_kind: DomainErrorKind::Conflict(ConflictKind::EmailTaken),
        });
    }

    freelancer::create(db, freelancer_model)
        .await
        .map_err(|err| Error::from_entity(err, ResourceKind::Freelancer))
}

pub async fn find_by_id(db: &DatabaseConnection, id: Id) -> Result<Model, Error> {
    freelancer::find_by_id(db, id)
        .await
        .map_err(|err| Error::from_entity(err, ResourceKind::Freelancer))
}

pub async fn find_by_email(db: &DatabaseConnection, email: &str) -> Result<Option<Model>, Error> {
    freelancer::find_by_email(db, email)
        .await
        .map_err(|err| Error::from_entity(err, ResourceKind::Freelancer))
}

/// Deletes the freelancer and, transactionally, every slot and booking
/// they own.
pub async fn delete(db: &DatabaseConnection, id: Id) -> Result<(), Error> {
    freelancer::find_by_id(db, id)
        .await
        .map_err(|err| Error::from_entity(err, ResourceKind::Freelancer))?;

    freelancer::delete_by_id(db, id)
        .await
        .map_err(|err| Error::from_entity(err, ResourceKind::Freelancer))
}
