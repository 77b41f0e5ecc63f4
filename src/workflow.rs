//! Review workflow: approve, reject, check-in, check-out.
//!
//! ```text
//! pending  --approve-->   approved   (notification sent, then store updated)
//! pending  --reject-->    rejected   (store updated, no notification)
//! approved --check-in-->  approved   (time in stamped)   onsite pools only
//! approved --check-out--> approved   (time out stamped)  onsite pools only
//! ```
//!
//! `check_transition` is the pure guard. `ReviewEngine` runs the side effects
//! in order against the record store and notification gateway.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, FixedOffset, Offset, Utc};
use tracing::{error, info, warn};

use crate::error::{ReviewError, TransitionError};
use crate::models::{AttendanceStamp, Participant, ParticipantId, ParticipantPatch, ReviewState};
use crate::notify::NotificationGateway;
use crate::store::RecordStore;

pub const DEFAULT_APPROVAL_DWELL: Duration = Duration::from_millis(2000);
pub const PHILIPPINE_OFFSET_HOURS: i32 = 8;

/// A staff action against one participant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Approve { participant_id: ParticipantId },
    Reject { participant_id: ParticipantId },
    CheckIn { participant_id: ParticipantId },
    CheckOut { participant_id: ParticipantId },
}

impl Command {
    pub fn participant_id(&self) -> &ParticipantId {
        match self {
            Command::Approve { participant_id }
            | Command::Reject { participant_id }
            | Command::CheckIn { participant_id }
            | Command::CheckOut { participant_id } => participant_id,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Command::Approve { .. } => "approve",
            Command::Reject { .. } => "reject",
            Command::CheckIn { .. } => "check-in",
            Command::CheckOut { .. } => "check-out",
        }
    }

    /// Approve and reject are serialized per engine; attendance stamps are not.
    pub fn is_review_decision(&self) -> bool {
        matches!(self, Command::Approve { .. } | Command::Reject { .. })
    }
}

/// Whether `command` may run against `participant` in its current state.
pub fn check_transition(participant: &Participant, command: &Command) -> Result<(), TransitionError> {
    let id = participant.id();
    if command.participant_id() != id {
        return Err(TransitionError::UnknownParticipant(
            command.participant_id().clone(),
        ));
    }

    match command {
        Command::Approve { .. } | Command::Reject { .. } => match participant.review_state() {
            ReviewState::Pending => Ok(()),
            ReviewState::Approved => Err(TransitionError::AlreadyApproved(id.clone())),
            ReviewState::Rejected => Err(TransitionError::AlreadyRejected(id.clone())),
        },
        Command::CheckIn { .. } | Command::CheckOut { .. } => {
            if !participant.source.tracks_attendance() {
                return Err(TransitionError::AttendanceNotTracked(participant.source));
            }
            if participant.review_state() != ReviewState::Approved {
                return Err(TransitionError::NotApproved(id.clone()));
            }
            Ok(())
        }
    }
}

/// Result of a successful command.
#[derive(Debug, Clone, PartialEq)]
pub struct Outcome {
    /// Local copy with the patch applied.
    pub participant: Participant,
    pub patch: ParticipantPatch,
    /// Whether the pool should be re-read from the store before display.
    pub refresh_pool: bool,
}

/// Holds the engine's in-flight flag until dropped.
struct InFlight<'a>(&'a AtomicBool);

impl<'a> InFlight<'a> {
    fn acquire(flag: &'a AtomicBool) -> Result<Self, TransitionError> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map(|_| InFlight(flag))
            .map_err(|_| TransitionError::ActionInFlight)
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

pub struct ReviewEngine {
    store: Arc<dyn RecordStore>,
    notifications: NotificationGateway,
    approval_dwell: Duration,
    display_offset: FixedOffset,
    clock: fn() -> DateTime<Utc>,
    approving: AtomicBool,
}

impl ReviewEngine {
    pub fn new(store: Arc<dyn RecordStore>, notifications: NotificationGateway) -> Self {
        Self {
            store,
            notifications,
            approval_dwell: DEFAULT_APPROVAL_DWELL,
            display_offset: FixedOffset::east_opt(PHILIPPINE_OFFSET_HOURS * 3600)
                .unwrap_or_else(|| Utc.fix()),
            clock: Utc::now,
            approving: AtomicBool::new(false),
        }
    }

    /// Minimum time an approval takes, so the in-progress state stays visible.
    pub fn with_approval_dwell(mut self, dwell: Duration) -> Self {
        self.approval_dwell = dwell;
        self
    }

    pub fn with_display_offset(mut self, offset: FixedOffset) -> Self {
        self.display_offset = offset;
        self
    }

    pub fn with_clock(mut self, clock: fn() -> DateTime<Utc>) -> Self {
        self.clock = clock;
        self
    }

    /// True while an approve or reject is outstanding.
    pub fn is_approving(&self) -> bool {
        self.approving.load(Ordering::Acquire)
    }

    pub async fn execute(
        &self,
        participant: &Participant,
        command: &Command,
    ) -> Result<Outcome, ReviewError> {
        match command {
            Command::Approve { .. } => self.approve(participant, command).await,
            Command::Reject { .. } => self.reject(participant, command).await,
            Command::CheckIn { .. } => {
                check_transition(participant, command)?;
                let stamp = AttendanceStamp::new((self.clock)(), self.display_offset);
                self.stamp_attendance(participant, ParticipantPatch::TimeIn(stamp))
                    .await
            }
            Command::CheckOut { .. } => {
                check_transition(participant, command)?;
                let stamp = AttendanceStamp::new((self.clock)(), self.display_offset);
                self.stamp_attendance(participant, ParticipantPatch::TimeOut(stamp))
                    .await
            }
        }
    }

    async fn approve(
        &self,
        participant: &Participant,
        command: &Command,
    ) -> Result<Outcome, ReviewError> {
        let _in_flight = InFlight::acquire(&self.approving)?;
        check_transition(participant, command)?;

        let pool = participant.source;
        let id = participant.id();
        self.notifications
            .template_for(pool)
            .map_err(ReviewError::Configuration)?;

        let profile = participant.profile();
        let (sent, ()) = tokio::join!(
            self.notifications.notify(&profile, pool),
            tokio::time::sleep(self.approval_dwell),
        );
        if let Err(err) = sent {
            warn!(%pool, participant_id = %id, error = %err, "notification failed, approval not saved");
            return Err(err.into());
        }

        let patch = ParticipantPatch::Approve;
        if let Err(err) = self.store.update(pool, id, &patch).await {
            error!(
                %pool,
                participant_id = %id,
                error = %err,
                "notification sent but approval was not saved"
            );
            return Err(err.into());
        }

        info!(%pool, participant_id = %id, "participant approved");
        Ok(self.outcome(participant, patch, true))
    }

    async fn reject(
        &self,
        participant: &Participant,
        command: &Command,
    ) -> Result<Outcome, ReviewError> {
        let _in_flight = InFlight::acquire(&self.approving)?;
        check_transition(participant, command)?;

        let pool = participant.source;
        let patch = ParticipantPatch::Reject;
        self.store
            .update(pool, participant.id(), &patch)
            .await
            .inspect_err(|err| {
                warn!(%pool, participant_id = %participant.id(), error = %err, "reject failed")
            })?;

        info!(%pool, participant_id = %participant.id(), "participant rejected");
        Ok(self.outcome(participant, patch, true))
    }

    async fn stamp_attendance(
        &self,
        participant: &Participant,
        patch: ParticipantPatch,
    ) -> Result<Outcome, ReviewError> {
        let pool = participant.source;
        self.store
            .update(pool, participant.id(), &patch)
            .await
            .inspect_err(|err| {
                warn!(%pool, participant_id = %participant.id(), error = %err, "attendance update failed")
            })?;

        info!(%pool, participant_id = %participant.id(), ?patch, "attendance recorded");
        Ok(self.outcome(participant, patch, false))
    }

    fn outcome(&self, participant: &Participant, patch: ParticipantPatch, refresh_pool: bool) -> Outcome {
        let mut updated = participant.clone();
        updated.apply(&patch);
        Outcome {
            participant: updated,
            patch,
            refresh_pool,
        }
    }
}
