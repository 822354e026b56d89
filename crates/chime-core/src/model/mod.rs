//! Scheduling domain model.

pub mod alert;
pub mod event;
pub mod ids;
pub mod tick;

pub use alert::AlertKind;
pub use event::Event;
pub use ids::{ChannelId, EventId, TeamId, UserId};
pub use tick::Tick;
