use super::error::{EntityApiErrorKind, Error};
use entity::freelancers::{ActiveModel, Column, Entity, Model};
use entity::{available_slots, bookings, Id};
use log::*;
use password_auth::generate_hash;
use sea_orm::{entity::prelude::*, ActiveValue::Set, DatabaseConnection, TransactionTrait, TryIntoModel};

pub async fn create(db: &DatabaseConnection, freelancer_model: Model) -> Result<Model, Error> {
    debug!(
        "New Freelancer Model to be inserted: {}",
        freelancer_model.email
    );

    let now = chrono::Utc::now();

    let freelancer_active_model: ActiveModel = ActiveModel {
        first_name: Set(freelancer_model.first_name),
        last_name: Set(freelancer_model.last_name),
        email: Set(freelancer_model.email),
        password: Set(generate_hash(&freelancer_model.password)),
        created_at: Set(now.into()),
        updated_at: Set(now.into()),
        ..Default::default()
    };

    Ok(freelancer_active_model.save(db).await?.try_into_model()?)
}

pub async fn find_by_id(db: &DatabaseConnection, id: Id) -> Result<Model, Error> {
    Entity::find_by_id(id).one(db).await?.ok_or_else(|| Error {
        source: None,
        error_kind: EntityApiErrorKind::RecordNotFound,
    })
}

pub async fn find_by_email(db: &DatabaseConnection, email: &str) -> Result<Option<Model>, Error> {
    Ok(Entity::find()
        .filter(Column::Email.eq(email))
        .one(db)
        .await?)
}

/// Deletes a freelancer together with all of their slots and bookings.
/// The three deletes run inside one transaction so a failure leaves
/// nothing half-removed.
pub async fn delete_by_id(db: &DatabaseConnection, id: Id) -> Result<(), Error> {
    let txn = db.begin().await?;

    bookings::Entity::delete_many()
        .filter(bookings::Column::FreelancerId.eq(id))
        .exec(&txn)
        .await?;

    available_slots::Entity::delete_many()
        .filter(available_slots::Column::FreelancerId.eq(id))
        .exec(&txn)
        .await?;

    Entity::delete_by_id(id).exec(&txn).await?;

    txn.commit().await?;

    Ok(())
}

#[cfg(test)]
// We need to gate seaORM's mock feature behind conditional compilation because
// the feature removes the Clone trait implementation from seaORM's DatabaseConnection.
// see https://github.com/SeaQL/sea-orm/issues/830
#[cfg(feature = "mock")]
mod tests {
    use super::*;
    use sea_orm::{DatabaseBackend, MockDatabase, MockExecResult};

    fn freelancer_model() -> Model {
        let now = chrono::Utc::now();
        Model {
            id: Id::new_v4(),
            first_name: "Nadia".to_owned(),
            last_name: "Rahman".to_owned(),
            email: "nadia@example.com".to_owned(),
            password: "hashed".to_owned(),
            created_at: now.into(),
            updated_at: now.into(),
        }
    }

    #[tokio::test]
    async fn create_returns_a_new_freelancer_model() -> Result<(), Error> {
        let freelancer = freelancer_model();

        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results(vec![vec![freelancer.clone()]])
            .into_connection();

        let created = create(&db, freelancer.clone()).await?;

        assert_eq!(created.email, freelancer.email);

        Ok(())
    }

    #[tokio::test]
    async fn find_by_id_returns_record_not_found_when_absent() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results(vec![Vec::<Model>::new()])
            .into_connection();

        let result = find_by_id(&db, Id::new_v4()).await;

        assert_eq!(
            result.unwrap_err().error_kind,
            EntityApiErrorKind::RecordNotFound
        );
    }

    #[tokio::test]
    async fn find_by_email_returns_none_when_absent() -> Result<(), Error> {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results(vec![Vec::<Model>::new()])
            .into_connection();

        assert!(find_by_email(&db, "nobody@example.com").await?.is_none());

        Ok(())
    }

    #[tokio::test]
    async fn delete_by_id_cascades_to_slots_and_bookings() -> Result<(), Error> {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_exec_results(vec![
                // dependent bookings, dependent slots, then the freelancer itself
                MockExecResult {
                    last_insert_id: 0,
                    rows_affected: 2,
                },
                MockExecResult {
                    last_insert_id: 0,
                    rows_affected: 3,
                },
                MockExecResult {
                    last_insert_id: 0,
                    rows_affected: 1,
                },
            ])
            .into_connection();

        delete_by_id(&db, Id::new_v4()).await?;

        Ok(())
    }
}
