//! Due-event matching, recurrence expansion, notification fan-out, and the
//! tick loop that drives them.

pub mod error;
pub mod matcher;
pub mod notify;
pub mod recurrence;
pub mod scheduler;
