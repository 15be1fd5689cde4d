//! Repertoire submission lifecycle: pending -> approved | rejected.

use itertools::Itertools;

use crate::error::AllocationError;
use crate::models::{
    non_blank, NewSubmission, RegistrationId, RepertoireSubmission, SongOption, SubmissionId,
    SubmissionStatus,
};

/// A soloist is locked while any of their submissions is pending or approved.
pub fn is_locked<'a>(submissions: impl IntoIterator<Item = &'a RepertoireSubmission>) -> bool {
    submissions
        .into_iter()
        .any(|submission| submission.status.is_active())
}

/// Checks that `registration_id` may submit `options` given its existing
/// submissions and returns the pending submissions to insert.
pub fn check_submit(
    registration_id: RegistrationId,
    existing: &[RepertoireSubmission],
    options: Vec<SongOption>,
) -> Result<Vec<NewSubmission>, AllocationError> {
    if options.is_empty() {
        return Err(AllocationError::NoSongOptions);
    }
    if is_locked(
        existing
            .iter()
            .filter(|submission| submission.registration_id == registration_id),
    ) {
        return Err(AllocationError::Locked);
    }
    options
        .into_iter()
        .map(|option| {
            let song_title = option.song_title.trim().to_owned();
            if song_title.is_empty() {
                return Err(AllocationError::EmptyField("song_title"));
            }
            let artist_composer = option.artist_composer.trim().to_owned();
            if artist_composer.is_empty() {
                return Err(AllocationError::EmptyField("artist_composer"));
            }
            Ok(NewSubmission {
                registration_id,
                option: SongOption {
                    song_title,
                    artist_composer,
                    song_summary: non_blank(option.song_summary),
                    song_link: non_blank(option.song_link),
                    score_link: non_blank(option.score_link),
                },
            })
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Approval {
    /// The submission is already the approved one.
    AlreadyApproved,
    /// Approve `approve` and delete `purge`.
    Apply {
        approve: SubmissionId,
        purge: Vec<SubmissionId>,
    },
}

fn find(
    submissions: &[RepertoireSubmission],
    id: SubmissionId,
) -> Result<&RepertoireSubmission, AllocationError> {
    submissions
        .iter()
        .find(|submission| submission.id == id)
        .ok_or(AllocationError::UnknownSubmission(id))
}

/// Plans the approval of `id` for `registration_id`: every sibling of the
/// same registration, whatever its status, is purged.
pub fn plan_approval(
    submissions: &[RepertoireSubmission],
    id: SubmissionId,
    registration_id: RegistrationId,
) -> Result<Approval, AllocationError> {
    let target = find(submissions, id)?;
    if target.registration_id != registration_id {
        return Err(AllocationError::WrongRegistration {
            submission: id,
            registration: registration_id,
        });
    }
    let purge: Vec<SubmissionId> = submissions
        .iter()
        .filter(|submission| submission.registration_id == registration_id && submission.id != id)
        .map(|submission| submission.id)
        .collect();
    if target.status == SubmissionStatus::Approved && purge.is_empty() {
        return Ok(Approval::AlreadyApproved);
    }
    Ok(Approval::Apply { approve: id, purge })
}

/// Rejecting keeps the submission; an approved one can't be rejected.
pub fn check_reject(submission: &RepertoireSubmission) -> Result<(), AllocationError> {
    match submission.status {
        SubmissionStatus::Pending | SubmissionStatus::Rejected => Ok(()),
        SubmissionStatus::Approved => Err(AllocationError::InvalidTransition {
            from: SubmissionStatus::Approved,
            to: SubmissionStatus::Rejected,
        }),
    }
}

/// Reduces a bulk approval selection to one submission per registration,
/// keeping the first in selection order. Unknown ids are kept so that the
/// caller reports them as failures.
pub fn bulk_approval_targets(
    submissions: &[RepertoireSubmission],
    selection: &[SubmissionId],
) -> Vec<(SubmissionId, Option<RegistrationId>)> {
    selection
        .iter()
        .unique()
        .map(|id| {
            let registration = submissions
                .iter()
                .find(|submission| submission.id == *id)
                .map(|submission| submission.registration_id);
            (*id, registration)
        })
        .unique_by(|(id, registration)| registration.map_or(Err(*id), Ok))
        .collect()
}
