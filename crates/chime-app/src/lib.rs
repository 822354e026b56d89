//! Chat host adapters and the composition root of the chime scheduler.

pub mod error;
pub mod host;
pub mod realtime;
