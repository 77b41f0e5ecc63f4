//! Shared test doubles and fixtures.

use std::sync::Mutex;

use async_trait::async_trait;

use crate::error::NotificationError;
use crate::models::{ParticipantId, ParticipantRecord, ProfileSnapshot};
use crate::notify::Notifier;

/// Notifier that records every send and can be told to fail.
#[derive(Default)]
pub struct RecordingNotifier {
    sent: Mutex<Vec<(String, ProfileSnapshot)>>,
    fail_with_status: Mutex<Option<u16>>,
}

impl RecordingNotifier {
    pub fn fail_with(&self, status: Option<u16>) {
        *self.fail_with_status.lock().unwrap() = status;
    }

    pub fn sent(&self) -> Vec<(String, ProfileSnapshot)> {
        self.sent.lock().unwrap().clone()
    }

    pub fn send_count(&self) -> usize {
        self.sent.lock().unwrap().len()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send(
        &self,
        template_id: &str,
        variables: &ProfileSnapshot,
    ) -> Result<(), NotificationError> {
        // Attempts are recorded before the outcome so failed sends are counted too.
        self.sent
            .lock()
            .unwrap()
            .push((template_id.to_string(), variables.clone()));
        tokio::task::yield_now().await;

        match *self.fail_with_status.lock().unwrap() {
            Some(status) => Err(NotificationError::Rejected {
                status,
                body: "provider unavailable".to_string(),
            }),
            None => Ok(()),
        }
    }
}

pub fn registrant(id: &str, first_name: &str, last_name: &str, company: &str) -> ParticipantRecord {
    ParticipantRecord {
        id: ParticipantId::from(id),
        first_name: first_name.to_string(),
        last_name: last_name.to_string(),
        email: format!(
            "{}.{}@example.ph",
            first_name.to_lowercase(),
            last_name.to_lowercase()
        ),
        company: company.to_string(),
        designation: "Engineer".to_string(),
        ..Default::default()
    }
}
