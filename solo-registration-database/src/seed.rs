use solo_registration_allocation::models::{NewPerformanceWeek, SlotNumber};
use tracing::{error, info};

use crate::gateway::Gateway;

/// Performance dates of the season and the slots performing on each.
pub const ROSTER_SCHEDULE: &[(&str, &[SlotNumber])] = &[
    ("8th March", &[41, 43, 45, 47]),
    ("15th March", &[1, 3, 5, 7]),
    ("22nd March", &[10, 12, 14, 16]),
    ("29th March", &[34, 36, 38, 40]),
    ("12th April", &[58, 60, 62, 64]),
    ("19th April", &[42, 44, 46, 48]),
    ("26th April", &[25, 27, 29, 31]),
    ("3rd May", &[26, 28, 30, 32]),
    ("10th May", &[33, 35, 37, 39]),
    ("17th May", &[57, 59, 61, 63]),
    ("24th May", &[2, 4, 6, 8]),
    ("31st May", &[18, 20, 22, 24]),
    ("7th June", &[49, 51, 53, 55]),
    ("14th June", &[50, 52, 54, 56]),
    ("21st June", &[9, 11, 13, 15]),
    ("28th June", &[17, 19, 21, 23]),
];

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SeedReport {
    pub inserted: usize,
    pub skipped: usize,
    pub failed: usize,
}

/// Inserts the weeks of [`ROSTER_SCHEDULE`] whose date is not stored yet.
/// A failing week is logged and the remaining ones are still seeded.
pub async fn seed_weeks<G: Gateway>(gateway: &G) -> SeedReport {
    let mut report = SeedReport::default();
    for (date, slots) in ROSTER_SCHEDULE {
        match gateway.find_week_by_date(date).await {
            Ok(Some(_)) => {
                info!("skipping {date}, already exists");
                report.skipped += 1;
                continue;
            }
            Ok(None) => {}
            Err(err) => {
                error!("failed to look up {date}: {err}");
                report.failed += 1;
                continue;
            }
        }
        let week = NewPerformanceWeek {
            date: (*date).to_owned(),
            slot_ids: slots.to_vec(),
            is_test: false,
        };
        match gateway.insert_week(week).await {
            Ok(_) => {
                info!("seeded {date}");
                report.inserted += 1;
            }
            Err(err) => {
                error!("failed to seed {date}: {err}");
                report.failed += 1;
            }
        }
    }
    report
}
