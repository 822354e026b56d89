pub mod due;

pub use due::{CandidateRow, DueEventRow};
