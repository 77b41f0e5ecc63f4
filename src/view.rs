use std::cmp::Ordering;

use crate::models::Participant;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum SortKey {
    #[default]
    Name,
    Email,
    Company,
    Designation,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    #[default]
    Ascending,
    Descending,
}

/// Participants whose name, email or company contains `term`, ignoring case.
/// Relative order is preserved. An empty term matches everyone.
pub fn project<'a>(collection: &'a [Participant], term: &str) -> Vec<&'a Participant> {
    let term = term.trim().to_lowercase();
    collection
        .iter()
        .filter(|participant| {
            term.is_empty()
                || participant.full_name().to_lowercase().contains(&term)
                || participant.record.email.to_lowercase().contains(&term)
                || participant.record.company.to_lowercase().contains(&term)
        })
        .collect()
}

fn sort_value(participant: &Participant, key: SortKey) -> String {
    match key {
        SortKey::Name => participant.full_name(),
        SortKey::Email => participant.record.email.clone(),
        SortKey::Company => participant.record.company.clone(),
        SortKey::Designation => participant.record.designation.clone(),
    }
}

/// Case-insensitive first, then case-sensitive so "acme" and "Acme" still order deterministically.
fn compare_text(a: &str, b: &str) -> Ordering {
    a.to_lowercase()
        .cmp(&b.to_lowercase())
        .then_with(|| a.cmp(b))
}

/// Stable sort of an already-projected list.
pub fn sort(participants: &mut [&Participant], key: SortKey, order: SortOrder) {
    participants.sort_by(|a, b| {
        let ordering = compare_text(&sort_value(a, key), &sort_value(b, key));
        match order {
            SortOrder::Ascending => ordering,
            SortOrder::Descending => ordering.reverse(),
        }
    });
}

/// Participants who have checked in.
pub fn active_count(collection: &[Participant]) -> usize {
    collection
        .iter()
        .filter(|participant| participant.record.time_in.is_some())
        .count()
}
