//! Review session: active pool, loaded participants, selection.
//!
//! All state changes go through [`reduce`], a pure function over
//! [`SessionEvent`]s. [`ReviewSession`] is the async driver that talks to
//! the store and engine and feeds their results back in as events.

use std::sync::Arc;

use tracing::{info, warn};

use crate::error::{ReviewError, TransitionError};
use crate::models::{Participant, ParticipantId, ParticipantRecord};
use crate::pool::Pool;
use crate::store::RecordStore;
use crate::view;
use crate::workflow::{Command, ReviewEngine};

#[derive(Debug, Clone, PartialEq)]
pub struct SessionState {
    pub pool: Pool,
    /// Everything last read for `pool`, unfiltered.
    pub participants: Vec<Participant>,
    pub selected: Option<Participant>,
    pub search: String,
    pub loading: bool,
    pub approving: bool,
}

impl SessionState {
    pub fn new(pool: Pool) -> Self {
        Self {
            pool,
            participants: Vec::new(),
            selected: None,
            search: String::new(),
            loading: false,
            approving: false,
        }
    }

    pub fn find(&self, id: &ParticipantId) -> Option<&Participant> {
        self.participants.iter().find(|participant| participant.id() == id)
    }

    /// Participants matching the current search, in store order.
    pub fn visible(&self) -> Vec<&Participant> {
        view::project(&self.participants, &self.search)
    }
}

impl Default for SessionState {
    fn default() -> Self {
        Self::new(Pool::Online17)
    }
}

#[derive(Debug, Clone)]
pub enum SessionEvent {
    PoolSelected(Pool),
    PoolLoaded {
        pool: Pool,
        records: Vec<ParticipantRecord>,
    },
    PoolLoadFailed {
        pool: Pool,
    },
    Selected(ParticipantId),
    SearchChanged(String),
    ActionStarted,
    ActionFinished,
    Mutated(Participant),
}

pub fn reduce(mut state: SessionState, event: SessionEvent) -> SessionState {
    match event {
        SessionEvent::PoolSelected(pool) => SessionState {
            search: state.search,
            loading: true,
            ..SessionState::new(pool)
        },
        SessionEvent::PoolLoaded { pool, records } => {
            if pool != state.pool {
                return state;
            }
            state.participants = records
                .into_iter()
                .map(|record| Participant::stamp(record, pool))
                .collect();
            state.loading = false;
            // The selection follows the fresh rows; one that vanished is dropped.
            state.selected = state
                .selected
                .take()
                .and_then(|selected| state.find(selected.id()).cloned());
            state
        }
        SessionEvent::PoolLoadFailed { pool } => {
            if pool == state.pool {
                state.participants.clear();
                state.loading = false;
            }
            state
        }
        SessionEvent::Selected(id) => {
            if let Some(found) = state.find(&id).cloned() {
                state.selected = Some(found);
            }
            state
        }
        SessionEvent::SearchChanged(term) => {
            state.search = term;
            state
        }
        SessionEvent::ActionStarted => {
            state.approving = true;
            state
        }
        SessionEvent::ActionFinished => {
            state.approving = false;
            state
        }
        SessionEvent::Mutated(updated) => {
            if updated.source != state.pool {
                return state;
            }
            if let Some(row) = state
                .participants
                .iter_mut()
                .find(|row| row.id() == updated.id())
            {
                *row = updated.clone();
            }
            if state
                .selected
                .as_ref()
                .is_some_and(|selected| selected.id() == updated.id())
            {
                state.selected = Some(updated);
            }
            state
        }
    }
}

pub struct ReviewSession {
    state: SessionState,
    store: Arc<dyn RecordStore>,
    engine: ReviewEngine,
}

impl ReviewSession {
    /// Start a session on `pool` and load it.
    pub async fn open(store: Arc<dyn RecordStore>, engine: ReviewEngine, pool: Pool) -> Self {
        let mut session = Self {
            state: SessionState::new(pool),
            store,
            engine,
        };
        session.apply(SessionEvent::PoolSelected(pool));
        session.reload().await;
        session
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    fn apply(&mut self, event: SessionEvent) {
        let state = std::mem::take(&mut self.state);
        self.state = reduce(state, event);
    }

    async fn reload(&mut self) {
        let pool = self.state.pool;
        match self.store.list(pool).await {
            Ok(records) => {
                info!(%pool, count = records.len(), "pool loaded");
                self.apply(SessionEvent::PoolLoaded { pool, records });
            }
            Err(err) => {
                warn!(%pool, error = %err, "failed to load pool");
                self.apply(SessionEvent::PoolLoadFailed { pool });
            }
        }
    }

    pub async fn select_pool(&mut self, pool: Pool) {
        self.apply(SessionEvent::PoolSelected(pool));
        self.reload().await;
    }

    /// Make `id` the active participant. Unknown ids leave the selection alone.
    pub fn select(&mut self, id: &ParticipantId) -> Option<&Participant> {
        self.apply(SessionEvent::Selected(id.clone()));
        self.state
            .selected
            .as_ref()
            .filter(|selected| selected.id() == id)
    }

    pub fn search(&mut self, term: impl Into<String>) {
        self.apply(SessionEvent::SearchChanged(term.into()));
    }

    /// Run `command` and fold the result back into the session.
    ///
    /// Returns the participant as it now stands. Approve and reject re-read the
    /// pool afterwards; attendance stamps are merged locally.
    pub async fn dispatch(&mut self, command: Command) -> Result<Participant, ReviewError> {
        let id = command.participant_id();
        let participant = self
            .state
            .selected
            .as_ref()
            .filter(|selected| selected.id() == id)
            .or_else(|| self.state.find(id))
            .cloned()
            .ok_or_else(|| TransitionError::UnknownParticipant(id.clone()))?;

        let decision = command.is_review_decision();
        if decision {
            self.apply(SessionEvent::ActionStarted);
        }
        let result = self.engine.execute(&participant, &command).await;
        if decision {
            self.apply(SessionEvent::ActionFinished);
        }

        let outcome = result.inspect_err(|err| {
            warn!(action = command.name(), participant_id = %id, error = %err, "action failed")
        })?;

        self.apply(SessionEvent::Mutated(outcome.participant.clone()));
        if outcome.refresh_pool {
            self.reload().await;
        }

        Ok(self
            .state
            .find(outcome.participant.id())
            .cloned()
            .unwrap_or(outcome.participant))
    }
}
