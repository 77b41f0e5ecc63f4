use std::fmt;

use serde::{Deserialize, Serialize};

/// One of the four registration cohorts a participant signed up through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum)]
pub enum Pool {
    #[serde(rename = "satf_participant_online_17")]
    #[value(name = "online-17")]
    Online17,
    #[serde(rename = "satf_participant_online_24")]
    #[value(name = "online-24")]
    Online24,
    #[serde(rename = "satf_participant_onsite_17")]
    #[value(name = "onsite-17")]
    Onsite17,
    #[serde(rename = "satf_participant_onsite_24")]
    #[value(name = "onsite-24")]
    Onsite24,
}

impl Pool {
    pub const ALL: [Pool; 4] = [Pool::Online17, Pool::Online24, Pool::Onsite17, Pool::Onsite24];

    /// Human label, also used as the participation type in notifications.
    pub fn label(self) -> &'static str {
        match self {
            Pool::Online17 => "Online 17",
            Pool::Online24 => "Online 24",
            Pool::Onsite17 => "Onsite 17",
            Pool::Onsite24 => "Onsite 24",
        }
    }

    /// Backing table in the record store.
    pub fn table(self) -> &'static str {
        match self {
            Pool::Online17 => "satf_participant_online_17",
            Pool::Online24 => "satf_participant_online_24",
            Pool::Onsite17 => "satf_participant_onsite_17",
            Pool::Onsite24 => "satf_participant_onsite_24",
        }
    }

    /// Onsite pools track check-in and check-out; online pools do not.
    pub fn tracks_attendance(self) -> bool {
        matches!(self, Pool::Onsite17 | Pool::Onsite24)
    }

    /// Environment variable holding this pool's notification template id.
    pub fn template_env_key(self) -> &'static str {
        match self {
            Pool::Online17 => "EMAILJS_TEMPLATE_ONLINE_17",
            Pool::Online24 => "EMAILJS_TEMPLATE_ONLINE_24",
            Pool::Onsite17 => "EMAILJS_TEMPLATE_ONSITE_17",
            Pool::Onsite24 => "EMAILJS_TEMPLATE_ONSITE_24",
        }
    }
}

impl fmt::Display for Pool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_onsite_pools_track_attendance() {
        let tracked: Vec<Pool> = Pool::ALL
            .into_iter()
            .filter(|pool| pool.tracks_attendance())
            .collect();
        assert_eq!(tracked, vec![Pool::Onsite17, Pool::Onsite24]);
    }

    #[test]
    fn tables_are_distinct() {
        let mut tables: Vec<&str> = Pool::ALL.iter().map(|pool| pool.table()).collect();
        tables.sort();
        tables.dedup();
        assert_eq!(tables.len(), 4);
    }

    #[test]
    fn serializes_as_table_name() {
        let json = serde_json::to_string(&Pool::Onsite17).unwrap();
        assert_eq!(json, "\"satf_participant_onsite_17\"");
    }
}
