//! LightField back office: ordered resource collections, consultation bookings and
//! the client-side synchronizer that keeps drag-reordered lists consistent with the
//! server.

pub mod application;
pub mod config;
pub mod domain;
pub mod infra;
