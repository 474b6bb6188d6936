pub mod allocator;
pub mod availability;
pub mod clock;
pub mod credentials;
pub mod lifecycle;
pub mod scheduling;
pub mod validation;
