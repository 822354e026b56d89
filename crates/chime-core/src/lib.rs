//! Domain types, settings, and shared errors for the chime event scheduler.

pub mod config;
pub mod constants;
pub mod error;
pub mod model;
