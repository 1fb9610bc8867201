#![deny(clippy::all, clippy::pedantic)]

pub mod auth;
pub mod bookings;
pub mod contacts;
pub mod dashboard;
pub mod resources;
