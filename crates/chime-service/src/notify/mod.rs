//! Delivery of fired events to the chat host.

pub mod host;
pub mod message;
pub mod router;

pub use host::{Attachment, Broadcaster, Messenger, OutgoingPost, RealtimeEvent};
pub use router::{ChatTarget, DeliveryOutcome, DispatchReport, NotificationRouter, RecipientOutcome};
