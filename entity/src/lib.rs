use uuid::Uuid;

pub mod available_slots;
pub mod booking_status;
pub mod bookings;
pub mod freelancers;

/// A type alias that represents any Entity's internal id field data type.
/// Aliased so that it's easy to change the underlying type if necessary.
pub type Id = Uuid;
