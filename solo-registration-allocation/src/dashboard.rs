use serde::{Deserialize, Serialize};

use crate::models::{Registration, VoicePart};

pub const DEFAULT_PER_PAGE: usize = 20;

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct RegistrationQuery {
    #[serde(default)]
    pub search: Option<String>,
    /// `None` (or "All" on the wire) shows every voice part.
    #[serde(default, deserialize_with = "voice_part_filter")]
    pub voice_part: Option<VoicePart>,
    #[serde(default)]
    pub page: Option<usize>,
    #[serde(default)]
    pub per_page: Option<usize>,
}

fn voice_part_filter<'de, D>(deserializer: D) -> Result<Option<VoicePart>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value = Option::<String>::deserialize(deserializer)?;
    match value.as_deref() {
        None | Some("" | "All") => Ok(None),
        Some(other) => other.parse().map(Some).map_err(serde::de::Error::custom),
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub page: usize,
    pub per_page: usize,
    pub total: usize,
    pub total_pages: usize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct VoicePartCounts {
    pub total: usize,
    pub soprano: usize,
    pub alto: usize,
    pub tenor: usize,
    pub bass: usize,
}

impl VoicePartCounts {
    pub fn count<'a>(registrations: impl IntoIterator<Item = &'a Registration>) -> Self {
        registrations
            .into_iter()
            .fold(Self::default(), |mut counts, registration| {
                counts.total += 1;
                match registration.voice_part {
                    VoicePart::Soprano => counts.soprano += 1,
                    VoicePart::Alto => counts.alto += 1,
                    VoicePart::Tenor => counts.tenor += 1,
                    VoicePart::Bass => counts.bass += 1,
                }
                counts
            })
    }
}

impl RegistrationQuery {
    fn matches(&self, registration: &Registration) -> bool {
        let search = self
            .search
            .as_deref()
            .map(str::trim)
            .unwrap_or_default()
            .to_lowercase();
        let matches_search = search.is_empty()
            || registration.full_name.to_lowercase().contains(&search)
            || registration
                .voice_part
                .as_str()
                .to_lowercase()
                .contains(&search);
        let matches_voice = self
            .voice_part
            .map_or(true, |voice_part| registration.voice_part == voice_part);
        matches_search && matches_voice
    }

    /// Filters, sorts by slot and cuts out the requested page. Pages past
    /// the end are clamped to the last page.
    #[must_use]
    pub fn apply<'a>(&self, registrations: &'a [Registration]) -> Page<&'a Registration> {
        let mut filtered: Vec<&Registration> = registrations
            .iter()
            .filter(|registration| self.matches(registration))
            .collect();
        filtered.sort_by_key(|registration| registration.slot_id);

        let per_page = self.per_page.filter(|n| *n > 0).unwrap_or(DEFAULT_PER_PAGE);
        let total = filtered.len();
        let total_pages = total.div_ceil(per_page);
        let page = self.page.unwrap_or(1).clamp(1, total_pages.max(1));
        let items = filtered
            .into_iter()
            .skip((page - 1) * per_page)
            .take(per_page)
            .collect();
        Page {
            items,
            page,
            per_page,
            total,
            total_pages,
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use uuid::Uuid;

    use super::*;
    use crate::models::SlotNumber;

    fn registration(slot: SlotNumber, name: &str, voice_part: VoicePart) -> Registration {
        Registration {
            id: Uuid::new_v4(),
            full_name: name.to_owned(),
            voice_part,
            slot_id: slot,
            created_at: Utc::now(),
            performance_status: None,
            is_test: false,
        }
    }

    fn sample() -> Vec<Registration> {
        vec![
            registration(9, "Ada Obi", VoicePart::Soprano),
            registration(2, "Kwame Asante", VoicePart::Bass),
            registration(5, "Adaeze Nwosu", VoicePart::Alto),
            registration(1, "Tunde Bello", VoicePart::Tenor),
        ]
    }

    #[test]
    fn search_matches_name_or_voice_part() {
        let registrations = sample();
        let query = RegistrationQuery {
            search: Some("ADA".to_owned()),
            ..RegistrationQuery::default()
        };
        let page = query.apply(&registrations);
        assert_eq!(
            page.items.iter().map(|r| r.slot_id).collect::<Vec<_>>(),
            vec![5, 9]
        );

        let query = RegistrationQuery {
            search: Some("bass".to_owned()),
            ..RegistrationQuery::default()
        };
        assert_eq!(query.apply(&registrations).items[0].full_name, "Kwame Asante");
    }

    #[test]
    fn voice_filter_and_pagination() {
        let registrations = sample();
        let query = RegistrationQuery {
            per_page: Some(3),
            page: Some(2),
            ..RegistrationQuery::default()
        };
        let page = query.apply(&registrations);
        assert_eq!(page.total, 4);
        assert_eq!(page.total_pages, 2);
        assert_eq!(page.items.len(), 1);
        assert_eq!(page.items[0].slot_id, 9);

        let query = RegistrationQuery {
            voice_part: Some(VoicePart::Tenor),
            page: Some(7),
            ..RegistrationQuery::default()
        };
        let page = query.apply(&registrations);
        assert_eq!(page.page, 1);
        assert_eq!(page.items.len(), 1);
    }

    #[test]
    fn all_means_no_voice_filter() {
        let query: RegistrationQuery =
            serde_json::from_str(r#"{"voice_part": "All", "search": "a"}"#).unwrap();
        assert_eq!(query.voice_part, None);
        let query: RegistrationQuery = serde_json::from_str(r#"{"voice_part": "Alto"}"#).unwrap();
        assert_eq!(query.voice_part, Some(VoicePart::Alto));
    }

    #[test]
    fn counts_per_voice_part() {
        let counts = VoicePartCounts::count(&sample());
        assert_eq!(
            counts,
            VoicePartCounts {
                total: 4,
                soprano: 1,
                alto: 1,
                tenor: 1,
                bass: 1
            }
        );
    }
}
