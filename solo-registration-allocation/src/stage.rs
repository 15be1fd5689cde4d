//! Live stage queue and weekly roster.

use serde::Serialize;

use crate::models::{PerformanceWeek, Registration, SlotNumber, VoicePart};
use crate::slots::SlotGrid;

/// Number of performers shown after the current one.
pub const UP_NEXT: usize = 4;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StageQueue<'a> {
    pub current: Option<&'a Registration>,
    pub up_next: Vec<&'a Registration>,
    pub done: usize,
    pub remaining: usize,
}

impl<'a> StageQueue<'a> {
    /// Walks the week's slots in their configured order. Slots nobody
    /// booked are skipped.
    pub fn for_week(week: &PerformanceWeek, registrations: &'a [Registration]) -> Self {
        let booked: Vec<&'a Registration> = week
            .slot_ids
            .iter()
            .filter_map(|slot| {
                registrations
                    .iter()
                    .find(|registration| registration.slot_id == *slot)
            })
            .collect();
        let done = booked
            .iter()
            .filter(|registration| registration.performance_status().is_done())
            .count();
        let mut waiting = booked
            .into_iter()
            .filter(|registration| !registration.performance_status().is_done());
        let current = waiting.next();
        let up_next: Vec<_> = waiting.collect();
        let remaining = up_next.len() + usize::from(current.is_some());
        Self {
            current,
            up_next: up_next.into_iter().take(UP_NEXT).collect(),
            done,
            remaining,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RosterOccupant<'a> {
    pub full_name: &'a str,
    pub voice_part: VoicePart,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RosterSlot<'a> {
    pub slot: SlotNumber,
    /// `None` renders as available.
    pub occupant: Option<RosterOccupant<'a>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RosterWeek<'a> {
    pub id: uuid::Uuid,
    pub date: &'a str,
    pub slots: Vec<RosterSlot<'a>>,
}

pub fn roster<'a>(
    weeks: &'a [PerformanceWeek],
    registrations: &'a [Registration],
) -> Vec<RosterWeek<'a>> {
    // weeks may reference slots beyond the current grid size
    let grid = SlotGrid::new(SlotNumber::MAX, registrations);
    weeks
        .iter()
        .map(|week| RosterWeek {
            id: week.id,
            date: &week.date,
            slots: week
                .slot_ids
                .iter()
                .map(|slot| RosterSlot {
                    slot: *slot,
                    occupant: grid.occupant(*slot).map(|registration| RosterOccupant {
                        full_name: &registration.full_name,
                        voice_part: registration.voice_part,
                    }),
                })
                .collect(),
        })
        .collect()
}
