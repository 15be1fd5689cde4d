use core::future::Future;
use std::collections::BTreeMap;

use solo_registration_allocation::models::{
    AdminUser, NewPerformanceWeek, NewRegistration, NewSubmission, NewWaitlistEntry,
    PerformanceStatus, PerformanceWeek, Registration, RegistrationId, RepertoireSubmission,
    SubmissionId, VoicePart, WaitlistEntry, WaitlistId, WeekId,
};

use crate::error::DatabaseError;

type Result<T> = core::result::Result<T, DatabaseError>;

/// Read and write access to the portal's collections.
///
/// Updates and deletes of a single record fail with
/// [`DatabaseError::NotFound`] when no row was affected. Operations that
/// touch several rows on behalf of one rule (approve, promote, inserting a
/// batch of song options) are atomic.
pub trait Gateway: Clone + Send + Sync + 'static {
    /// Demo mode: every write fails with [`DatabaseError::ReadOnly`].
    fn is_read_only(&self) -> bool;

    fn load_config(&self) -> impl Future<Output = Result<BTreeMap<String, String>>> + Send;

    fn store_config(&self, key: &str, value: &str) -> impl Future<Output = Result<()>> + Send;

    /// Oldest first.
    fn list_registrations(&self) -> impl Future<Output = Result<Vec<Registration>>> + Send;

    /// Fails with a unique violation on [`crate::error::SLOT_UNIQUE_CONSTRAINT`]
    /// when the slot is taken.
    fn insert_registration(
        &self,
        new: NewRegistration,
    ) -> impl Future<Output = Result<Registration>> + Send;

    fn update_registration(
        &self,
        id: RegistrationId,
        full_name: String,
        voice_part: VoicePart,
    ) -> impl Future<Output = Result<Registration>> + Send;

    /// Submissions of the registration are deleted with it.
    fn delete_registration(
        &self,
        id: RegistrationId,
    ) -> impl Future<Output = Result<Registration>> + Send;

    fn delete_all_registrations(&self) -> impl Future<Output = Result<Vec<RegistrationId>>> + Send;

    fn set_performance_status(
        &self,
        id: RegistrationId,
        status: PerformanceStatus,
    ) -> impl Future<Output = Result<Registration>> + Send;

    fn reset_performance_statuses(&self) -> impl Future<Output = Result<Vec<Registration>>> + Send;

    /// Newest first.
    fn list_submissions(&self) -> impl Future<Output = Result<Vec<RepertoireSubmission>>> + Send;

    fn insert_submissions(
        &self,
        new: Vec<NewSubmission>,
    ) -> impl Future<Output = Result<Vec<RepertoireSubmission>>> + Send;

    /// Only pending and rejected submissions can be rejected.
    fn reject_submission(
        &self,
        id: SubmissionId,
        comments: Option<String>,
    ) -> impl Future<Output = Result<RepertoireSubmission>> + Send;

    fn update_submission_comments(
        &self,
        id: SubmissionId,
        comments: Option<String>,
    ) -> impl Future<Output = Result<RepertoireSubmission>> + Send;

    /// Approves `id` and deletes every other submission of
    /// `registration_id` in one transaction. Returns the deleted ids.
    fn approve_submission(
        &self,
        id: SubmissionId,
        registration_id: RegistrationId,
    ) -> impl Future<Output = Result<(RepertoireSubmission, Vec<SubmissionId>)>> + Send;

    fn delete_submission(
        &self,
        id: SubmissionId,
    ) -> impl Future<Output = Result<RepertoireSubmission>> + Send;

    fn delete_all_submissions(&self) -> impl Future<Output = Result<Vec<SubmissionId>>> + Send;

    /// Oldest first.
    fn list_weeks(&self) -> impl Future<Output = Result<Vec<PerformanceWeek>>> + Send;

    fn find_week_by_date(
        &self,
        date: &str,
    ) -> impl Future<Output = Result<Option<PerformanceWeek>>> + Send;

    fn insert_week(
        &self,
        new: NewPerformanceWeek,
    ) -> impl Future<Output = Result<PerformanceWeek>> + Send;

    fn delete_week(&self, id: WeekId) -> impl Future<Output = Result<PerformanceWeek>> + Send;

    /// Oldest first.
    fn list_waitlist(&self) -> impl Future<Output = Result<Vec<WaitlistEntry>>> + Send;

    fn insert_waitlist_entry(
        &self,
        new: NewWaitlistEntry,
    ) -> impl Future<Output = Result<WaitlistEntry>> + Send;

    fn delete_waitlist_entry(
        &self,
        id: WaitlistId,
    ) -> impl Future<Output = Result<WaitlistEntry>> + Send;

    /// Inserts `registration` and deletes the waitlist entry in one
    /// transaction.
    fn promote_waitlist_entry(
        &self,
        id: WaitlistId,
        registration: NewRegistration,
    ) -> impl Future<Output = Result<Registration>> + Send;

    fn find_admin(&self, email: &str) -> impl Future<Output = Result<Option<AdminUser>>> + Send;

    fn upsert_admin(
        &self,
        email: &str,
        password_hash: &str,
    ) -> impl Future<Output = Result<AdminUser>> + Send;
}
