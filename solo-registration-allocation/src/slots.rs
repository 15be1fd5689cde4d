//! Which slots of the booking grid are taken and whether a slot can be
//! reserved.

use alloc::collections::BTreeMap;

use serde::Serialize;
use tracing::debug;

use crate::error::AllocationError;
use crate::models::{normalize_name, NewRegistration, Registration, SlotNumber, VoicePart};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Occupancy {
    pub total: SlotNumber,
    pub reserved: SlotNumber,
    pub available: SlotNumber,
    pub percentage: u8,
}

/// What the public entry path offers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Intake {
    Reserve,
    Waitlist,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SlotCell<'a> {
    pub slot: SlotNumber,
    pub occupant: Option<&'a Registration>,
}

/// The slots `1..=max_slots` and the registrations occupying them.
///
/// Registrations whose slot lies outside the grid (after lowering the
/// maximum) are kept out of the occupancy numbers.
#[derive(Debug, Clone)]
pub struct SlotGrid<'a> {
    max_slots: SlotNumber,
    taken: BTreeMap<SlotNumber, &'a Registration>,
}

impl<'a> SlotGrid<'a> {
    pub fn new(
        max_slots: SlotNumber,
        registrations: impl IntoIterator<Item = &'a Registration>,
    ) -> Self {
        let max_slots = max_slots.max(0);
        let mut taken = BTreeMap::new();
        for registration in registrations {
            if (1..=max_slots).contains(&registration.slot_id) {
                if let Some(previous) = taken.insert(registration.slot_id, registration) {
                    // the store rejects this, so it only shows up with legacy data
                    debug!(
                        slot = registration.slot_id,
                        first = %previous.id,
                        second = %registration.id,
                        "slot is booked twice"
                    );
                    taken.insert(registration.slot_id, previous);
                }
            }
        }
        Self { max_slots, taken }
    }

    #[must_use]
    pub const fn max_slots(&self) -> SlotNumber {
        self.max_slots
    }

    #[must_use]
    pub fn occupant(&self, slot: SlotNumber) -> Option<&'a Registration> {
        self.taken.get(&slot).copied()
    }

    #[must_use]
    pub fn is_available(&self, slot: SlotNumber) -> bool {
        (1..=self.max_slots).contains(&slot) && !self.taken.contains_key(&slot)
    }

    #[must_use]
    pub fn occupancy(&self) -> Occupancy {
        let reserved = SlotNumber::try_from(self.taken.len()).unwrap_or(SlotNumber::MAX);
        let percentage = if self.max_slots > 0 {
            let ratio = f64::from(reserved) * 100.0 / f64::from(self.max_slots);
            #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
            let percentage = ratio.round().clamp(0.0, 100.0) as u8;
            percentage
        } else {
            0
        };
        Occupancy {
            total: self.max_slots,
            reserved,
            available: self.max_slots - reserved,
            percentage,
        }
    }

    #[must_use]
    pub fn intake(&self) -> Intake {
        if self.occupancy().available > 0 {
            Intake::Reserve
        } else {
            Intake::Waitlist
        }
    }

    /// Free slots in ascending order.
    pub fn free_slots(&self) -> impl Iterator<Item = SlotNumber> + '_ {
        (1..=self.max_slots).filter(|slot| !self.taken.contains_key(slot))
    }

    #[must_use]
    pub fn first_free(&self) -> Option<SlotNumber> {
        self.free_slots().next()
    }

    pub fn cells(&self) -> impl Iterator<Item = SlotCell<'a>> + '_ {
        (1..=self.max_slots).map(|slot| SlotCell {
            slot,
            occupant: self.occupant(slot),
        })
    }

    pub fn check_reservation(&self, slot: SlotNumber) -> Result<(), AllocationError> {
        if !(1..=self.max_slots).contains(&slot) {
            return Err(AllocationError::SlotOutOfRange {
                slot,
                max_slots: self.max_slots,
            });
        }
        if self.intake() == Intake::Waitlist {
            return Err(AllocationError::RegistrationFull);
        }
        if self.taken.contains_key(&slot) {
            return Err(AllocationError::SlotTaken(slot));
        }
        Ok(())
    }

    /// Validates a public reservation and produces the record to insert.
    pub fn reserve(
        &self,
        full_name: &str,
        voice_part: VoicePart,
        slot: SlotNumber,
    ) -> Result<NewRegistration, AllocationError> {
        let full_name = normalize_name(full_name)?;
        self.check_reservation(slot)?;
        Ok(NewRegistration {
            full_name,
            voice_part,
            slot_id: slot,
            is_test: false,
        })
    }
}

/// Largest grid the portal renders.
pub const MAX_SLOT_LIMIT: SlotNumber = 1000;

pub fn validate_max_slots(max_slots: SlotNumber) -> Result<SlotNumber, AllocationError> {
    if !(1..=MAX_SLOT_LIMIT).contains(&max_slots) {
        return Err(AllocationError::InvalidMaxSlots(max_slots));
    }
    Ok(max_slots)
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use uuid::Uuid;

    use super::*;

    fn registration(slot: SlotNumber, name: &str) -> Registration {
        Registration {
            id: Uuid::new_v4(),
            full_name: name.to_owned(),
            voice_part: VoicePart::Alto,
            slot_id: slot,
            created_at: Utc::now(),
            performance_status: None,
            is_test: false,
        }
    }

    #[test]
    fn available_plus_reserved_is_total() {
        for max_slots in [1, 2, 7, 50] {
            let registrations: Vec<_> = (1..=max_slots)
                .step_by(2)
                .map(|slot| registration(slot, "x"))
                .collect();
            let grid = SlotGrid::new(max_slots, &registrations);
            let occupancy = grid.occupancy();
            assert_eq!(
                occupancy.available,
                max_slots - SlotNumber::try_from(registrations.len()).unwrap()
            );
            assert_eq!(occupancy.available + occupancy.reserved, occupancy.total);
        }
    }

    #[test]
    fn empty_grid_of_fifty() {
        let grid = SlotGrid::new(50, &[]);
        assert_eq!(
            grid.occupancy(),
            Occupancy {
                total: 50,
                reserved: 0,
                available: 50,
                percentage: 0
            }
        );
        assert_eq!(grid.intake(), Intake::Reserve);
    }

    #[test]
    fn taken_slots_are_never_selectable() {
        let registrations = [registration(7, "Ada Obi")];
        let grid = SlotGrid::new(50, &registrations);
        assert!(!grid.is_available(7));
        assert!(grid.is_available(8));
        assert_eq!(
            grid.check_reservation(7),
            Err(AllocationError::SlotTaken(7))
        );
        assert_eq!(grid.occupant(7).unwrap().full_name, "Ada Obi");
        assert_eq!(grid.occupancy().available, 49);
        assert_eq!(grid.occupancy().percentage, 2);
    }

    #[test]
    fn out_of_range_slots_are_refused() {
        let grid = SlotGrid::new(10, &[]);
        assert!(matches!(
            grid.check_reservation(0),
            Err(AllocationError::SlotOutOfRange { slot: 0, .. })
        ));
        assert!(matches!(
            grid.check_reservation(11),
            Err(AllocationError::SlotOutOfRange { slot: 11, .. })
        ));
    }

    #[test]
    fn full_grid_switches_to_waitlist() {
        let registrations = [registration(1, "a"), registration(2, "b")];
        let grid = SlotGrid::new(2, &registrations);
        assert_eq!(grid.occupancy().available, 0);
        assert_eq!(grid.occupancy().percentage, 100);
        assert_eq!(grid.intake(), Intake::Waitlist);
        assert_eq!(
            grid.check_reservation(1),
            Err(AllocationError::RegistrationFull)
        );
        assert_eq!(grid.first_free(), None);
    }

    #[test]
    fn registrations_beyond_the_grid_do_not_count() {
        let registrations = [registration(3, "a"), registration(12, "b")];
        let grid = SlotGrid::new(10, &registrations);
        assert_eq!(grid.occupancy().reserved, 1);
        assert_eq!(grid.cells().count(), 10);
        assert_eq!(grid.cells().filter(|cell| cell.occupant.is_some()).count(), 1);
    }

    #[test]
    fn reserve_trims_the_name() {
        let grid = SlotGrid::new(5, &[]);
        let new = grid.reserve("  Ada Obi ", VoicePart::Soprano, 3).unwrap();
        assert_eq!(new.full_name, "Ada Obi");
        assert_eq!(new.slot_id, 3);
        assert!(grid.reserve(" ", VoicePart::Soprano, 3).is_err());
    }

    #[test]
    fn max_slots_must_be_within_limits() {
        assert!(validate_max_slots(0).is_err());
        assert_eq!(validate_max_slots(64), Ok(64));
        assert_eq!(validate_max_slots(MAX_SLOT_LIMIT), Ok(MAX_SLOT_LIMIT));
        assert_eq!(
            validate_max_slots(500_000_000),
            Err(AllocationError::InvalidMaxSlots(500_000_000))
        );
    }
}
