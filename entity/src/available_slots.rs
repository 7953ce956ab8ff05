//! SeaORM Entity for the available_slots table.
//! A slot is a freelancer-defined open time interval clients can book.

use crate::Id;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(schema_name = "freelance_booking", table_name = "available_slots")]
pub struct Model {
    #[serde(skip_deserializing)]
    #[sea_orm(primary_key)]
    pub id: Id,

    pub freelancer_id: Id,

    pub start_time: DateTimeWithTimeZone,

    pub end_time: DateTimeWithTimeZone,

    /// Set when a confirmed booking consumes the whole slot
    pub is_booked: bool,

    #[serde(skip_deserializing)]
    pub created_at: DateTimeWithTimeZone,

    #[serde(skip_deserializing)]
    pub updated_at: DateTimeWithTimeZone,
}

impl Model {
    /// Length of the `[start_time, end_time)` interval.
    pub fn duration(&self) -> chrono::Duration {
        self.end_time.signed_duration_since(self.start_time)
    }
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

    #[sea_orm(has_one = "super::bookings::Entity")]
    Bookings,
}

impl Related<super::freelancers::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Freelancers.def()
    }
}

impl Related<super::bookings::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Bookings.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
