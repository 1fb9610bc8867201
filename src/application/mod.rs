pub mod admin;
pub mod auth;
pub mod booking_wizard;
pub mod bookings;
pub mod contacts;
pub mod dashboard;
pub mod editor;
pub mod error;
pub mod payments;
pub mod reorder;
pub mod repos;
pub mod sync;
