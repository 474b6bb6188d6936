pub mod booking;
pub mod centre;
pub mod resource;
pub mod slot;
pub mod sport;
pub mod user;

pub use booking::{Booking, BookingType, BookingView};
pub use centre::Centre;
pub use resource::Resource;
pub use slot::{HourRange, SlotAvailability, CLOSING_HOUR, OPENING_HOUR};
pub use sport::Sport;
pub use user::{Identity, Role, User, UserSummary};

/// A stored enum column held a value outside its closed set.
#[derive(Debug, thiserror::Error)]
#[error("unknown variant: {0}")]
pub struct UnknownVariant(pub String);
