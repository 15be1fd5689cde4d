use crate::models::{RegistrationId, SlotNumber, SubmissionId, SubmissionStatus};

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum AllocationError {
    #[error("slot S-{slot} does not exist, the grid has {max_slots} slots")]
    SlotOutOfRange {
        slot: SlotNumber,
        max_slots: SlotNumber,
    },
    #[error("slot S-{0} is already taken")]
    SlotTaken(SlotNumber),
    #[error("all slots are taken, please join the waitlist")]
    RegistrationFull,
    #[error("no available slots")]
    NoAvailableSlots,
    #[error(
        "the maximum slot count must be between 1 and {max}, got {0}",
        max = crate::slots::MAX_SLOT_LIMIT
    )]
    InvalidMaxSlots(SlotNumber),
    #[error("{0} must not be empty")]
    EmptyField(&'static str),
    #[error("unknown {kind} value {value:?}")]
    UnknownValue { kind: &'static str, value: String },
    #[error("registration {0} not found")]
    UnknownRegistration(RegistrationId),
    #[error("submission {0} not found")]
    UnknownSubmission(SubmissionId),
    #[error("at least one song option is required")]
    NoSongOptions,
    #[error("a song is already pending or approved for this soloist")]
    Locked,
    #[error("submission {submission} does not belong to registration {registration}")]
    WrongRegistration {
        submission: SubmissionId,
        registration: RegistrationId,
    },
    #[error("cannot change a submission from {from} to {to}")]
    InvalidTransition {
        from: SubmissionStatus,
        to: SubmissionStatus,
    },
}
