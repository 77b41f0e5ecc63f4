use std::fmt;

use chrono::{DateTime, FixedOffset, Utc};
use serde::Serialize;

use crate::pool::Pool;

/// Store-assigned participant identifier. Opaque to this crate.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct ParticipantId(pub String);

impl From<&str> for ParticipantId {
    fn from(value: &str) -> Self {
        ParticipantId(value.to_string())
    }
}

impl fmt::Display for ParticipantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A check-in or check-out moment: the instant plus the string shown to staff.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AttendanceStamp {
    pub at: DateTime<Utc>,
    pub display: String,
}

impl AttendanceStamp {
    pub fn new(at: DateTime<Utc>, offset: FixedOffset) -> Self {
        let display = at
            .with_timezone(&offset)
            .format("%a, %b %-d, %Y, %I:%M %p")
            .to_string();
        Self { at, display }
    }
}

/// One row as the record store returns it.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct ParticipantRecord {
    pub id: ParticipantId,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub company: String,
    pub designation: String,
    pub street: Option<String>,
    pub barangay: Option<String>,
    pub city: Option<String>,
    pub province_state: Option<String>,
    pub zip: Option<String>,
    pub cellphone: Option<String>,
    pub approved: bool,
    pub rejected: bool,
    pub time_in: Option<AttendanceStamp>,
    pub time_out: Option<AttendanceStamp>,
}

/// A record stamped with the pool it was read from.
///
/// The stamp lets later mutations be routed back to the right table
/// without consulting whichever pool the session currently shows.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Participant {
    pub source: Pool,
    #[serde(flatten)]
    pub record: ParticipantRecord,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReviewState {
    Pending,
    Approved,
    Rejected,
}

impl Participant {
    pub fn stamp(record: ParticipantRecord, source: Pool) -> Self {
        Self { source, record }
    }

    pub fn id(&self) -> &ParticipantId {
        &self.record.id
    }

    pub fn participation_type(&self) -> &'static str {
        self.source.label()
    }

    pub fn full_name(&self) -> String {
        format!("{} {}", self.record.first_name, self.record.last_name)
    }

    pub fn review_state(&self) -> ReviewState {
        match (self.record.approved, self.record.rejected) {
            (true, _) => ReviewState::Approved,
            (false, true) => ReviewState::Rejected,
            (false, false) => ReviewState::Pending,
        }
    }

    /// Address parts joined with commas, blanks skipped.
    pub fn address(&self) -> Option<String> {
        let parts: Vec<&str> = [
            &self.record.street,
            &self.record.barangay,
            &self.record.city,
            &self.record.province_state,
            &self.record.zip,
        ]
        .into_iter()
        .filter_map(|part| part.as_deref())
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .collect();

        if parts.is_empty() {
            None
        } else {
            Some(parts.join(", "))
        }
    }

    pub fn profile(&self) -> ProfileSnapshot {
        ProfileSnapshot {
            email: self.record.email.clone(),
            name: self.full_name(),
            company: self.record.company.clone(),
            designation: self.record.designation.clone(),
            participation_type: self.participation_type().to_string(),
        }
    }

    pub fn apply(&mut self, patch: &ParticipantPatch) {
        match patch {
            ParticipantPatch::Approve => self.record.approved = true,
            ParticipantPatch::Reject => self.record.rejected = true,
            ParticipantPatch::TimeIn(stamp) => self.record.time_in = Some(stamp.clone()),
            ParticipantPatch::TimeOut(stamp) => self.record.time_out = Some(stamp.clone()),
        }
    }
}

/// Partial update sent to the record store. Each variant touches only its own fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParticipantPatch {
    Approve,
    Reject,
    TimeIn(AttendanceStamp),
    TimeOut(AttendanceStamp),
}

/// Template variables for the approval notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProfileSnapshot {
    pub email: String,
    pub name: String,
    pub company: String,
    pub designation: String,
    pub participation_type: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn display_follows_philippine_clock() {
        let at = Utc.with_ymd_and_hms(2026, 10, 18, 6, 30, 0).unwrap();
        let offset = FixedOffset::east_opt(8 * 3600).unwrap();
        let stamp = AttendanceStamp::new(at, offset);
        assert_eq!(stamp.display, "Sun, Oct 18, 2026, 02:30 PM");
        assert_eq!(stamp.at, at);
    }

    #[test]
    fn address_skips_blank_parts() {
        let participant = Participant::stamp(
            ParticipantRecord {
                street: Some("12 Mabini St".to_string()),
                barangay: Some("  ".to_string()),
                city: Some("Makati".to_string()),
                zip: Some("1200".to_string()),
                ..Default::default()
            },
            Pool::Onsite24,
        );
        assert_eq!(participant.address().as_deref(), Some("12 Mabini St, Makati, 1200"));
    }

    #[test]
    fn profile_uses_pool_label_as_participation_type() {
        let participant = Participant::stamp(
            ParticipantRecord {
                first_name: "ALMA".to_string(),
                last_name: "REYES".to_string(),
                email: "alma@acme.ph".to_string(),
                ..Default::default()
            },
            Pool::Online17,
        );
        let profile = participant.profile();
        assert_eq!(profile.name, "ALMA REYES");
        assert_eq!(profile.participation_type, "Online 17");
    }
}
