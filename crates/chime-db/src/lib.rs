//! Postgres-backed event store for the chime scheduler.

pub mod db;
pub mod error;
pub mod model;
