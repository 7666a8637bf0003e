//! Appointment booking: records, persistence and the tools offered to the model.

pub mod executor;
mod models;
pub mod store;

pub use executor::{BookingToolExecutor, ToolEffect, ToolOutcome};
pub use models::{Booking, BookingError, BookingStatus, NewBooking};
pub use store::{BookingStore, JsonFileBookingStore, MemoryBookingStore};
