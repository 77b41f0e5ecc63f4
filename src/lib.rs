//! Participant review console: browse registration pools, approve or reject
//! registrants, and record attendance for onsite pools.

pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod notify;
pub mod pool;
pub mod report;
pub mod session;
pub mod store;
pub mod view;
pub mod workflow;

#[cfg(test)]
mod testing;

pub use error::{NotificationError, ReviewError, StoreError, TransitionError};
pub use models::{Participant, ParticipantId};
pub use pool::Pool;
pub use session::ReviewSession;
pub use workflow::{Command, ReviewEngine};
