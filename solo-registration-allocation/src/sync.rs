//! Per-entity change patches and the snapshot they are applied to.

use alloc::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{PerformanceWeek, Registration, RepertoireSubmission, WaitlistEntry};

/// Anything stored under an id.
pub trait Keyed {
    fn key(&self) -> Uuid;
}

macro_rules! keyed {
    ($($ty:ty),+) => {
        $(
            impl Keyed for $ty {
                fn key(&self) -> Uuid {
                    self.id
                }
            }
        )+
    };
}

keyed!(Registration, RepertoireSubmission, WaitlistEntry, PerformanceWeek);

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Patch<T> {
    Upsert { record: T },
    Remove { id: Uuid },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "collection", rename_all = "snake_case")]
pub enum Change {
    Registrations(Patch<Registration>),
    RepertoireSubmissions(Patch<RepertoireSubmission>),
    Waitlist(Patch<WaitlistEntry>),
    PerformanceWeeks(Patch<PerformanceWeek>),
    Config { key: String, value: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Collection<T: Keyed> {
    records: BTreeMap<Uuid, T>,
}

impl<T: Keyed> Default for Collection<T> {
    fn default() -> Self {
        Self {
            records: BTreeMap::new(),
        }
    }
}

impl<T: Keyed> FromIterator<T> for Collection<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        Self {
            records: iter.into_iter().map(|record| (record.key(), record)).collect(),
        }
    }
}

impl<T: Keyed> Collection<T> {
    pub fn apply(&mut self, patch: Patch<T>) {
        match patch {
            Patch::Upsert { record } => {
                self.records.insert(record.key(), record);
            }
            Patch::Remove { id } => {
                self.records.remove(&id);
            }
        }
    }

    #[must_use]
    pub fn get(&self, id: &Uuid) -> Option<&T> {
        self.records.get(id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.records.values()
    }
}

/// Everything a view shows, kept fresh by applying [`Change`]s instead
/// of refetching all collections.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    pub config: BTreeMap<String, String>,
    pub registrations: Collection<Registration>,
    pub repertoire_submissions: Collection<RepertoireSubmission>,
    pub waitlist: Collection<WaitlistEntry>,
    pub performance_weeks: Collection<PerformanceWeek>,
}

impl Snapshot {
    pub fn apply(&mut self, change: Change) {
        match change {
            Change::Registrations(patch) => {
                if let Patch::Remove { id } = &patch {
                    // submissions go with their registration
                    let orphans: Vec<Uuid> = self
                        .repertoire_submissions
                        .iter()
                        .filter(|submission| submission.registration_id == *id)
                        .map(|submission| submission.id)
                        .collect();
                    for orphan in orphans {
                        self.repertoire_submissions.apply(Patch::Remove { id: orphan });
                    }
                }
                self.registrations.apply(patch);
            }
            Change::RepertoireSubmissions(patch) => self.repertoire_submissions.apply(patch),
            Change::Waitlist(patch) => self.waitlist.apply(patch),
            Change::PerformanceWeeks(patch) => self.performance_weeks.apply(patch),
            Change::Config { key, value } => {
                self.config.insert(key, value);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;
    use crate::models::{SubmissionStatus, VoicePart};

    fn registration(slot: i32) -> Registration {
        Registration {
            id: Uuid::new_v4(),
            full_name: "Ada Obi".to_owned(),
            voice_part: VoicePart::Soprano,
            slot_id: slot,
            created_at: Utc::now(),
            performance_status: None,
            is_test: false,
        }
    }

    #[test]
    fn upsert_replaces_by_id() {
        let mut snapshot = Snapshot::default();
        let mut ada = registration(7);
        snapshot.apply(Change::Registrations(Patch::Upsert { record: ada.clone() }));
        ada.full_name = "Ada O. Obi".to_owned();
        snapshot.apply(Change::Registrations(Patch::Upsert { record: ada.clone() }));
        assert_eq!(snapshot.registrations.len(), 1);
        assert_eq!(snapshot.registrations.get(&ada.id), Some(&ada));
    }

    #[test]
    fn removing_a_registration_drops_its_submissions() {
        let ada = registration(7);
        let submission = RepertoireSubmission {
            id: Uuid::new_v4(),
            registration_id: ada.id,
            song_title: "Ave Maria".to_owned(),
            artist_composer: "Schubert".to_owned(),
            song_summary: None,
            song_link: None,
            score_link: None,
            status: SubmissionStatus::Pending,
            admin_comments: None,
            created_at: Utc::now(),
        };
        let mut snapshot = Snapshot {
            registrations: [ada.clone()].into_iter().collect(),
            repertoire_submissions: [submission].into_iter().collect(),
            ..Snapshot::default()
        };
        snapshot.apply(Change::Registrations(Patch::Remove { id: ada.id }));
        assert!(snapshot.registrations.is_empty());
        assert!(snapshot.repertoire_submissions.is_empty());
    }

    #[test]
    fn patches_serialize_with_tags() {
        let id = Uuid::nil();
        let json = serde_json::to_value(Change::Waitlist(Patch::Remove { id })).unwrap();
        assert_eq!(json["collection"], "waitlist");
        assert_eq!(json["op"], "remove");
        let config = serde_json::to_value(Change::Config {
            key: "max_slots".to_owned(),
            value: "64".to_owned(),
        })
        .unwrap();
        assert_eq!(config["value"], "64");
    }
}
