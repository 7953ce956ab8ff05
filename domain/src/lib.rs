//! Business core of the freelancer booking platform.
//!
//! This crate owns the slot and booking lifecycles and the two external
//! integrations (transactional email, Zoom meetings). Callers above it
//! (HTTP handlers, CLIs) only ever talk to this layer; `entity_api`
//! remains an implementation detail re-exported where its types are part
//! of the domain surface.
pub use entity_api::{
    available_slots, booking_status, bookings, freelancers,
    mutate::{IntoUpdateMap, UpdateMap},
    Id,
};

pub mod available_slot;
pub mod booking;
pub mod emails;
pub mod error;
pub mod freelancer;
pub mod gateway;
