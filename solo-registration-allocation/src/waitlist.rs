//! Waitlist intake and promotion into a freed slot.

use crate::error::AllocationError;
use crate::models::{
    non_blank, normalize_name, NewRegistration, NewWaitlistEntry, VoicePart, WaitlistEntry,
};
use crate::slots::SlotGrid;

/// Validates a waitlist request. Joining is open regardless of the grid
/// state, the public view only offers it once the grid is full.
pub fn check_join(
    full_name: &str,
    voice_part: VoicePart,
    email: Option<String>,
    phone: Option<String>,
) -> Result<NewWaitlistEntry, AllocationError> {
    Ok(NewWaitlistEntry {
        full_name: normalize_name(full_name)?,
        voice_part,
        email: non_blank(email),
        phone: non_blank(phone),
        is_test: false,
    })
}

/// Turns `entry` into a registration at the lowest free slot.
pub fn promote(
    entry: &WaitlistEntry,
    grid: &SlotGrid<'_>,
) -> Result<NewRegistration, AllocationError> {
    let slot = grid.first_free().ok_or(AllocationError::NoAvailableSlots)?;
    Ok(NewRegistration {
        full_name: entry.full_name.clone(),
        voice_part: entry.voice_part,
        slot_id: slot,
        is_test: entry.is_test,
    })
}
