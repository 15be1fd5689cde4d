use core::fmt::{self, Display};
use core::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AllocationError;

pub type RegistrationId = Uuid;
pub type SubmissionId = Uuid;
pub type WeekId = Uuid;
pub type WaitlistId = Uuid;
pub type SlotNumber = i32;

/// Key of the only config entry the portal reads.
pub const MAX_SLOTS_KEY: &str = "max_slots";

macro_rules! text_enum {
    ($(#[$meta:meta])* $name:ident { $($variant:ident => $text:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        pub enum $name {
            $(
                #[serde(rename = $text)]
                $variant,
            )+
        }

        impl $name {
            pub const ALL: &'static [Self] = &[$(Self::$variant),+];

            #[must_use]
            pub const fn as_str(self) -> &'static str {
                match self {
                    $(Self::$variant => $text,)+
                }
            }
        }

        impl Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = AllocationError;

            fn from_str(value: &str) -> Result<Self, Self::Err> {
                match value {
                    $($text => Ok(Self::$variant),)+
                    other => Err(AllocationError::UnknownValue {
                        kind: stringify!($name),
                        value: other.to_owned(),
                    }),
                }
            }
        }
    };
}

text_enum!(
    VoicePart {
        Soprano => "Soprano",
        Alto => "Alto",
        Tenor => "Tenor",
        Bass => "Bass",
    }
);

text_enum!(
    /// Live stage progress of a registration. A registration without a
    /// status is treated as pending.
    PerformanceStatus {
        Pending => "pending",
        Completed => "completed",
        Skipped => "skipped",
    }
);

text_enum!(
    SubmissionStatus {
        Pending => "pending",
        Approved => "approved",
        Rejected => "rejected",
    }
);

impl PerformanceStatus {
    #[must_use]
    pub const fn is_done(self) -> bool {
        matches!(self, Self::Completed | Self::Skipped)
    }
}

impl SubmissionStatus {
    /// Pending and approved submissions keep a soloist from submitting again.
    #[must_use]
    pub const fn is_active(self) -> bool {
        matches!(self, Self::Pending | Self::Approved)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Registration {
    pub id: RegistrationId,
    pub full_name: String,
    pub voice_part: VoicePart,
    pub slot_id: SlotNumber,
    pub created_at: DateTime<Utc>,
    pub performance_status: Option<PerformanceStatus>,
    #[serde(default)]
    pub is_test: bool,
}

impl Registration {
    #[must_use]
    pub fn performance_status(&self) -> PerformanceStatus {
        self.performance_status.unwrap_or(PerformanceStatus::Pending)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewRegistration {
    pub full_name: String,
    pub voice_part: VoicePart,
    pub slot_id: SlotNumber,
    #[serde(default)]
    pub is_test: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepertoireSubmission {
    pub id: SubmissionId,
    pub registration_id: RegistrationId,
    pub song_title: String,
    pub artist_composer: String,
    pub song_summary: Option<String>,
    pub song_link: Option<String>,
    pub score_link: Option<String>,
    pub status: SubmissionStatus,
    pub admin_comments: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// One song option offered by a soloist.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SongOption {
    pub song_title: String,
    pub artist_composer: String,
    #[serde(default)]
    pub song_summary: Option<String>,
    #[serde(default)]
    pub song_link: Option<String>,
    #[serde(default)]
    pub score_link: Option<String>,
}

/// A validated option ready to be stored as a pending submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewSubmission {
    pub registration_id: RegistrationId,
    pub option: SongOption,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PerformanceWeek {
    pub id: WeekId,
    pub date: String,
    pub slot_ids: Vec<SlotNumber>,
    #[serde(default)]
    pub is_test: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewPerformanceWeek {
    pub date: String,
    pub slot_ids: Vec<SlotNumber>,
    #[serde(default)]
    pub is_test: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WaitlistEntry {
    pub id: WaitlistId,
    pub full_name: String,
    pub voice_part: VoicePart,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub is_test: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewWaitlistEntry {
    pub full_name: String,
    pub voice_part: VoicePart,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub is_test: bool,
}

#[derive(Clone, PartialEq, Eq)]
pub struct AdminUser {
    pub id: Uuid,
    pub email: String,
    pub password_hash: String,
}

impl fmt::Debug for AdminUser {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AdminUser")
            .field("id", &self.id)
            .field("email", &self.email)
            .finish_non_exhaustive()
    }
}

/// Trims a soloist name and refuses blank ones.
pub fn normalize_name(full_name: &str) -> Result<String, AllocationError> {
    let trimmed = full_name.trim();
    if trimmed.is_empty() {
        return Err(AllocationError::EmptyField("full_name"));
    }
    Ok(trimmed.to_owned())
}

/// Empty optional text fields are stored as absent.
#[must_use]
pub fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|value| value.trim().to_owned())
        .filter(|value| !value.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn voice_part_round_trips_through_text() {
        for part in VoicePart::ALL {
            assert_eq!(part.as_str().parse::<VoicePart>().unwrap(), *part);
        }
        assert!("Baritone".parse::<VoicePart>().is_err());
    }

    #[test]
    fn statuses_serialize_lowercase() {
        assert_eq!(
            serde_json::to_string(&SubmissionStatus::Approved).unwrap(),
            "\"approved\""
        );
        assert_eq!(
            serde_json::to_string(&VoicePart::Tenor).unwrap(),
            "\"Tenor\""
        );
    }

    #[test]
    fn missing_performance_status_means_pending() {
        let registration = Registration {
            id: Uuid::new_v4(),
            full_name: "Ada Obi".to_owned(),
            voice_part: VoicePart::Soprano,
            slot_id: 7,
            created_at: Utc::now(),
            performance_status: None,
            is_test: false,
        };
        assert_eq!(
            registration.performance_status(),
            PerformanceStatus::Pending
        );
    }

    #[test]
    fn names_are_trimmed_and_must_not_be_blank() {
        assert_eq!(normalize_name("  Ada Obi ").unwrap(), "Ada Obi");
        assert!(matches!(
            normalize_name("   "),
            Err(AllocationError::EmptyField("full_name"))
        ));
        assert_eq!(non_blank(Some("  ".to_owned())), None);
    }
}
