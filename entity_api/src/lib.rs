use chrono::{Days, Utc};
use sea_orm::{ActiveModelTrait, DatabaseConnection, Set};

pub use entity::{available_slots, booking_status, bookings, freelancers, Id};

pub mod available_slot;
pub mod booking;
pub mod error;
pub mod freelancer;
pub mod mutate;

/// Seeds a demo freelancer with a couple of open slots. Development
/// tooling only, driven by the `seed_db` binary.
pub async fn seed_database(db: &DatabaseConnection) {
    let now = Utc::now();
    let tomorrow = now
        .checked_add_days(Days::new(1))
        .expect("tomorrow is representable");

    let demo_freelancer = freelancer::create(
        db,
        freelancers::Model {
            id: Id::new_v4(),
            first_name: "Demo".to_owned(),
            last_name: "Freelancer".to_owned(),
            email: "demo.freelancer@example.com".to_owned(),
            password: "s3cure-Demo!".to_owned(),
            created_at: now.into(),
            updated_at: now.into(),
        },
    )
    .await
    .unwrap();

    for (start_offset_hours, length_hours) in [(10, 2), (14, 3)] {
        let start = tomorrow + chrono::Duration::hours(start_offset_hours);
        let _slot: available_slots::ActiveModel = available_slots::ActiveModel {
            freelancer_id: Set(demo_freelancer.id),
            start_time: Set(start.into()),
            end_time: Set((start + chrono::Duration::hours(length_hours)).into()),
            is_booked: Set(false),
            created_at: Set(now.into()),
            updated_at: Set(now.into()),
            ..Default::default()
        }
        .save(db)
        .await
        .unwrap();
    }
}
