//! SeaORM Entity for the bookings table.
//! A booking is a client's reservation against a single available slot.

use crate::booking_status::BookingStatus;
use crate::Id;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(schema_name = "freelance_booking", table_name = "bookings")]
pub struct Model {
    #[serde(skip_deserializing)]
    #[sea_orm(primary_key)]
    pub id: Id,

    /// Redundant with the slot's owner, kept for permission checks
    pub freelancer_id: Id,

    pub slot_id: Id,

    /// Frozen to the slot's start_time at creation
    pub time: DateTimeWithTimeZone,

    pub client_name: String,

    pub client_email: String,

    /// Set only on the transition into Confirmed
    pub meeting_link: Option<String>,

    pub status: BookingStatus,

    #[serde(skip_deserializing)]
    pub created_at: DateTimeWithTimeZone,

    #[serde(skip_deserializing)]
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::freelancers::Entity",
        from = "Column::FreelancerId",
        to = "super::freelancers::Column::Id",
        on_update = "NoAction",
        on_delete = "Cascade"
    )]
    Freelancers,

    #[sea_orm(
        belongs_to = "super::available_slots::Entity",
        from = "Column::SlotId",
        to = "super::available_slots::Column::Id",
        on_update = "NoAction",
        on_delete = "Cascade"
    )]
    AvailableSlots,
}

impl Related<super::freelancers::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Freelancers.def()
    }
}

impl Related<super::available_slots::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::AvailableSlots.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
