use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Status of a booking through its lifecycle.
#[derive(
    Debug, Clone, Eq, PartialEq, EnumIter, Deserialize, Default, Serialize, DeriveActiveEnum,
)]
#[serde(rename_all = "lowercase")]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "booking_status")]
pub enum BookingStatus {
    /// Client has requested the slot, freelancer has not acted yet
    #[sea_orm(string_value = "pending")]
    #[default]
    Pending,
    /// Freelancer accepted; a meeting link exists
    #[sea_orm(string_value = "confirmed")]
    Confirmed,
    /// Cancelled by the freelancer (from pending or confirmed)
    #[sea_orm(string_value = "cancelled")]
    Cancelled,
    /// Confirmed booking whose meeting took place
    #[sea_orm(string_value = "completed")]
    Completed,
}

impl BookingStatus {
    /// Terminal statuses accept no further transitions.
    pub fn is_terminal(&self) -> bool {
        matches!(self, BookingStatus::Cancelled | BookingStatus::Completed)
    }
}

impl std::fmt::Display for BookingStatus {
    fn fmt(&self, fmt: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BookingStatus::Pending => write!(fmt, "pending"),
            BookingStatus::Confirmed => write!(fmt, "confirmed"),
            BookingStatus::Cancelled => write!(fmt, "cancelled"),
            BookingStatus::Completed => write!(fmt, "completed"),
        }
    }
}
