use thiserror::Error;

use crate::models::ParticipantId;
use crate::pool::Pool;

/// Failures reading from or writing to the participant tables.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error on {table}: {source}")]
    Database {
        table: &'static str,
        #[source]
        source: sqlx::Error,
    },
    #[error("participant {id} not found in {table}")]
    NotFound {
        table: &'static str,
        id: ParticipantId,
    },
    /// The write would leave the row both approved and rejected.
    #[error("participant {id} in {table} cannot be both approved and rejected")]
    ReviewStateConflict {
        table: &'static str,
        id: ParticipantId,
    },
    #[error("record store unavailable: {0}")]
    Unavailable(String),
}

/// Failures talking to the notification provider.
#[derive(Debug, Error)]
pub enum NotificationError {
    /// No template registered for the pool. Raised before any I/O.
    #[error("no notification template configured for {pool}")]
    MissingTemplate { pool: Pool },
    #[error("no notification provider configured")]
    ProviderNotConfigured,
    #[error("notification transport failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("notification provider rejected the request ({status}): {body}")]
    Rejected { status: u16, body: String },
}

/// Workflow actions refused because of the participant's current state.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransitionError {
    #[error("participant {0} is already approved")]
    AlreadyApproved(ParticipantId),
    #[error("participant {0} is already rejected")]
    AlreadyRejected(ParticipantId),
    #[error("participant {0} must be approved before attendance can be recorded")]
    NotApproved(ParticipantId),
    #[error("{0} does not track attendance")]
    AttendanceNotTracked(Pool),
    #[error("another approval or rejection is still in flight")]
    ActionInFlight,
    #[error("participant {0} is not in the current pool")]
    UnknownParticipant(ParticipantId),
}

/// Everything a workflow action can report back to the person who started it.
#[derive(Debug, Error)]
pub enum ReviewError {
    #[error("configuration error: {0}")]
    Configuration(#[source] NotificationError),
    #[error("email failed, approval not saved: {0}")]
    Delivery(#[source] NotificationError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    InvalidTransition(#[from] TransitionError),
}

impl From<NotificationError> for ReviewError {
    fn from(err: NotificationError) -> Self {
        match err {
            NotificationError::MissingTemplate { .. } | NotificationError::ProviderNotConfigured => {
                ReviewError::Configuration(err)
            }
            other => ReviewError::Delivery(other),
        }
    }
}
