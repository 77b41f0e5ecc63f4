use std::fmt::Write;

use crate::models::{Participant, ReviewState};
use crate::pool::Pool;
use crate::view;

const BLANK: &str = "—";

fn status_label(participant: &Participant) -> &'static str {
    match participant.review_state() {
        ReviewState::Pending => "pending",
        ReviewState::Approved => "approved",
        ReviewState::Rejected => "rejected",
    }
}

fn or_blank(value: &str) -> &str {
    if value.trim().is_empty() {
        BLANK
    } else {
        value
    }
}

/// Table of the visible rows plus the pool totals.
pub fn build_listing(pool: Pool, collection: &[Participant], visible: &[&Participant]) -> String {
    let mut output = String::new();

    let _ = writeln!(output, "# {} participants", pool.label());
    let _ = writeln!(output, "Total Number of Participants: {}", collection.len());
    if pool.tracks_attendance() {
        let _ = writeln!(
            output,
            "Total Active Participants: {}",
            view::active_count(collection)
        );
    }
    let _ = writeln!(output);

    if visible.is_empty() {
        let _ = writeln!(output, "No participants to show.");
        return output;
    }

    for participant in visible.iter() {
        let _ = writeln!(
            output,
            "- [{}] {} <{}> | {} | {} | {}",
            participant.id(),
            participant.full_name(),
            or_blank(&participant.record.email),
            or_blank(&participant.record.company),
            or_blank(&participant.record.designation),
            status_label(participant)
        );
    }

    output
}

/// Detail card for one participant.
pub fn build_detail(participant: &Participant) -> String {
    let mut output = String::new();
    let record = &participant.record;

    let _ = writeln!(output, "{}", participant.full_name());
    let _ = writeln!(output, "{}", or_blank(&record.email));
    let _ = writeln!(output);
    let _ = writeln!(output, "Participation: {}", participant.participation_type());
    let _ = writeln!(output, "Company: {}", or_blank(&record.company));
    let _ = writeln!(output, "Designation: {}", or_blank(&record.designation));
    let _ = writeln!(
        output,
        "Address: {}",
        participant.address().as_deref().unwrap_or(BLANK)
    );
    let _ = writeln!(
        output,
        "Contact Number: {}",
        record.cellphone.as_deref().map(or_blank).unwrap_or(BLANK)
    );

    if participant.source.tracks_attendance() {
        let _ = writeln!(
            output,
            "Time In: {}",
            record.time_in.as_ref().map(|s| s.display.as_str()).unwrap_or(BLANK)
        );
        let _ = writeln!(
            output,
            "Time Out: {}",
            record.time_out.as_ref().map(|s| s.display.as_str()).unwrap_or(BLANK)
        );
    }

    let _ = writeln!(output, "Status: {}", status_label(participant));
    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::AttendanceStamp;
    use crate::testing::registrant;
    use chrono::Utc;

    #[test]
    fn listing_shows_active_count_for_onsite_pools() {
        let mut checked_in = Participant::stamp(registrant("1", "ALMA", "REYES", "Acme"), Pool::Onsite24);
        checked_in.record.approved = true;
        checked_in.record.time_in = Some(AttendanceStamp {
            at: Utc::now(),
            display: "Sun, Oct 18, 2026, 09:05 AM".to_string(),
        });
        let pending = Participant::stamp(registrant("2", "JOMAR", "BAUTISTA", "Northwind"), Pool::Onsite24);
        let collection = vec![checked_in, pending];
        let visible: Vec<&Participant> = collection.iter().collect();

        let listing = build_listing(Pool::Onsite24, &collection, &visible);
        assert!(listing.contains("Total Number of Participants: 2"));
        assert!(listing.contains("Total Active Participants: 1"));
        assert!(listing.contains("- [1] ALMA REYES <alma.reyes@example.ph> | Acme | Engineer | approved"));
        assert!(listing.contains("| pending"));
    }

    #[test]
    fn listing_omits_active_count_for_online_pools() {
        let collection = vec![Participant::stamp(registrant("1", "ALMA", "REYES", "Acme"), Pool::Online17)];
        let listing = build_listing(Pool::Online17, &collection, &[]);
        assert!(!listing.contains("Total Active Participants"));
        assert!(listing.contains("No participants to show."));
    }

    #[test]
    fn detail_hides_attendance_for_online_pools() {
        let participant = Participant::stamp(registrant("1", "ALMA", "REYES", "Acme"), Pool::Online24);
        let detail = build_detail(&participant);
        assert!(detail.contains("Address: —"));
        assert!(!detail.contains("Time In"));
        assert!(detail.contains("Status: pending"));
    }

    #[test]
    fn detail_shows_attendance_for_onsite_pools() {
        let mut participant = Participant::stamp(registrant("1", "ALMA", "REYES", "Acme"), Pool::Onsite17);
        participant.record.rejected = true;
        let detail = build_detail(&participant);
        assert!(detail.contains("Time In: —"));
        assert!(detail.contains("Time Out: —"));
        assert!(detail.contains("Status: rejected"));
    }
}
