//! Data models for Cinerent

pub mod booking;
pub mod equipment;
pub mod lifecycle;
pub mod user;

// Re-export commonly used types
pub use booking::{Booking, BookingDetails, BookingStatus, DateRange, Rates, ReturnCondition};
pub use equipment::{Equipment, EquipmentStatus};
pub use lifecycle::BookingEvent;
pub use user::{User, UserClaims, UserRole};
