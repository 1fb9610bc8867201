//! Domain layer types and invariants.

pub mod bookings;
pub mod entities;
pub mod error;
pub mod formats;
pub mod ordering;
pub mod resources;
pub mod slug;
pub mod types;
