use core::fmt::Write as _;

use chrono::{FixedOffset, Offset as _, Utc};
use solo_registration_allocation::models::Registration;
use tracing::warn;

pub const EXPORT_FILE_NAME: &str = "chorale_registrations.csv";
pub const EXPORT_CONTENT_DISPOSITION: &str = "attachment; filename=\"chorale_registrations.csv\"";

const HEADER: &str = "Slot,Full Name,Voice Part,Registration Date,Time";

/// `offset_minutes` east of UTC. Offsets beyond a day fall back to UTC.
#[must_use]
pub fn export_offset(offset_minutes: i32) -> FixedOffset {
    offset_minutes
        .checked_mul(60)
        .and_then(FixedOffset::east_opt)
        .unwrap_or_else(|| {
            warn!("invalid export offset of {offset_minutes} minutes, using UTC");
            Utc.fix()
        })
}

fn quoted(value: &str) -> String {
    format!("\"{}\"", value.replace('"', "\"\""))
}

/// One row per registration, ordered by slot.
#[must_use]
pub fn registrations_csv(registrations: &[Registration], offset: FixedOffset) -> String {
    let mut sorted: Vec<&Registration> = registrations.iter().collect();
    sorted.sort_by_key(|registration| registration.slot_id);
    let mut csv = String::from(HEADER);
    csv.push('\n');
    for registration in sorted {
        let created_at = registration.created_at.with_timezone(&offset);
        // writing into a String can't fail
        let _ = writeln!(
            csv,
            "S-{},{},{},{},{}",
            registration.slot_id,
            quoted(&registration.full_name),
            registration.voice_part,
            created_at.format("%-m/%-d/%Y"),
            created_at.format("%I:%M %p"),
        );
    }
    csv
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone as _;
    use solo_registration_allocation::models::VoicePart;
    use uuid::Uuid;

    use super::*;

    fn registration(slot: i32, name: &str, hour: u32) -> Registration {
        Registration {
            id: Uuid::new_v4(),
            full_name: name.to_owned(),
            voice_part: VoicePart::Tenor,
            slot_id: slot,
            created_at: Utc.with_ymd_and_hms(2026, 3, 4, hour, 5, 0).unwrap(),
            performance_status: None,
            is_test: false,
        }
    }

    #[test]
    fn rows_are_sorted_and_quoted() {
        let csv = registrations_csv(
            &[
                registration(12, "Kofi \"K\" Mensah", 14),
                registration(3, "Ama Owusu", 9),
            ],
            export_offset(0),
        );
        assert_eq!(
            csv,
            "Slot,Full Name,Voice Part,Registration Date,Time\n\
             S-3,\"Ama Owusu\",Tenor,3/4/2026,09:05 AM\n\
             S-12,\"Kofi \"\"K\"\" Mensah\",Tenor,3/4/2026,02:05 PM\n"
        );
    }

    #[test]
    fn applies_the_offset() {
        let csv = registrations_csv(&[registration(1, "Ama", 23)], export_offset(60));
        assert!(csv.ends_with("S-1,\"Ama\",Tenor,3/5/2026,12:05 AM\n"));
    }

    #[test]
    fn empty_export_has_a_header() {
        assert_eq!(
            registrations_csv(&[], export_offset(0)),
            "Slot,Full Name,Voice Part,Registration Date,Time\n"
        );
    }
}
