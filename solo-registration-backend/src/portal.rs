//! Use cases of the portal. Each one checks the rules of
//! `solo_registration_allocation`, performs the writes through the
//! [`Gateway`] and publishes the resulting per-entity changes.

use itertools::Itertools as _;
use serde::Serialize;
use solo_registration_allocation::dashboard::{Page, RegistrationQuery, VoicePartCounts};
use solo_registration_allocation::lifecycle::{self, Approval};
use solo_registration_allocation::models::{
    non_blank, normalize_name, AdminUser, NewPerformanceWeek, PerformanceStatus, PerformanceWeek,
    Registration, RegistrationId, RepertoireSubmission, SlotNumber, SongOption, SubmissionId,
    VoicePart, WaitlistEntry, WaitlistId, WeekId, MAX_SLOTS_KEY,
};
use solo_registration_allocation::slots::{validate_max_slots, SlotGrid};
use solo_registration_allocation::sync::{Change, Snapshot};
use solo_registration_allocation::{waitlist, AllocationError};
use solo_registration_database::seed::{seed_weeks, SeedReport};
use solo_registration_database::{DatabaseError, Gateway};
use tracing::{debug, info, warn};

use crate::auth::{hash_password, verify_password};
use crate::changes::{
    registration_removed, registration_upserted, submission_removed, submission_upserted,
    waitlist_removed, waitlist_upserted, week_removed, week_upserted, ChangeFeed,
};
use crate::error::AppError;

/// Attempts to promote a waitlist entry when its slot gets taken
/// concurrently.
pub const PROMOTE_ATTEMPTS: usize = 3;

/// Registrations together with the grid size they are checked against.
#[derive(Debug, Clone)]
pub struct GridState {
    pub max_slots: SlotNumber,
    pub registrations: Vec<Registration>,
}

impl GridState {
    #[must_use]
    pub fn grid(&self) -> SlotGrid<'_> {
        SlotGrid::new(self.max_slots, &self.registrations)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct StatusEntry {
    pub registration: Registration,
    pub submissions: Vec<RepertoireSubmission>,
    pub locked: bool,
    /// Encoded into the QR code shown to the soloist.
    pub qr_payload: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct Dashboard {
    pub registrations: Page<Registration>,
    pub counts: VoicePartCounts,
    pub max_slots: SlotNumber,
}

fn confirmed(confirm: bool) -> Result<(), AppError> {
    if confirm {
        Ok(())
    } else {
        Err(AppError::ConfirmationRequired)
    }
}

/// Runs every item, then fails with [`AppError::PartialBatch`] if any did.
fn batch_result(completed: usize, attempted: usize) -> Result<usize, AppError> {
    if completed == attempted {
        Ok(completed)
    } else {
        Err(AppError::PartialBatch {
            completed,
            attempted,
        })
    }
}

#[derive(Clone)]
pub struct Portal<G> {
    gateway: G,
    changes: ChangeFeed,
    default_max_slots: SlotNumber,
}

impl<G: Gateway> Portal<G> {
    pub const fn new(gateway: G, changes: ChangeFeed, default_max_slots: SlotNumber) -> Self {
        Self {
            gateway,
            changes,
            default_max_slots,
        }
    }

    pub const fn gateway(&self) -> &G {
        &self.gateway
    }

    pub const fn changes(&self) -> &ChangeFeed {
        &self.changes
    }

    pub fn is_demo(&self) -> bool {
        self.gateway.is_read_only()
    }

    pub async fn max_slots(&self) -> Result<SlotNumber, AppError> {
        let config = self.gateway.load_config().await?;
        Ok(config
            .get(MAX_SLOTS_KEY)
            .and_then(|value| match value.trim().parse() {
                Ok(max_slots) => validate_max_slots(max_slots).ok(),
                Err(err) => {
                    warn!("ignoring stored {MAX_SLOTS_KEY} {value:?}: {err}");
                    None
                }
            })
            .unwrap_or(self.default_max_slots))
    }

    pub async fn update_max_slots(&self, max_slots: SlotNumber) -> Result<SlotNumber, AppError> {
        let max_slots = validate_max_slots(max_slots)?;
        let value = max_slots.to_string();
        self.gateway.store_config(MAX_SLOTS_KEY, &value).await?;
        info!("grid resized to {max_slots} slots");
        self.changes.publish(Change::Config {
            key: MAX_SLOTS_KEY.to_owned(),
            value,
        });
        Ok(max_slots)
    }

    pub async fn grid_state(&self) -> Result<GridState, AppError> {
        Ok(GridState {
            max_slots: self.max_slots().await?,
            registrations: self.gateway.list_registrations().await?,
        })
    }

    pub async fn snapshot(&self) -> Result<Snapshot, AppError> {
        Ok(Snapshot {
            config: self.gateway.load_config().await?,
            registrations: self.gateway.list_registrations().await?.into_iter().collect(),
            repertoire_submissions: self.gateway.list_submissions().await?.into_iter().collect(),
            waitlist: self.gateway.list_waitlist().await?.into_iter().collect(),
            performance_weeks: self.gateway.list_weeks().await?.into_iter().collect(),
        })
    }

    /// Public reservation. A slot taken since the grid was read is reported
    /// as such, the soloist is never moved to another slot.
    pub async fn reserve(
        &self,
        full_name: &str,
        voice_part: VoicePart,
        slot: SlotNumber,
    ) -> Result<Registration, AppError> {
        let state = self.grid_state().await?;
        let new = state.grid().reserve(full_name, voice_part, slot)?;
        let registration = match self.gateway.insert_registration(new).await {
            Ok(registration) => registration,
            Err(err) if err.is_slot_conflict() => {
                return Err(AllocationError::SlotTaken(slot).into());
            }
            Err(err) => return Err(err.into()),
        };
        info!("slot S-{slot} reserved");
        self.changes
            .publish(registration_upserted(registration.clone()));
        Ok(registration)
    }

    pub async fn join_waitlist(
        &self,
        full_name: &str,
        voice_part: VoicePart,
        email: Option<String>,
        phone: Option<String>,
    ) -> Result<WaitlistEntry, AppError> {
        let new = waitlist::check_join(full_name, voice_part, email, phone)?;
        let entry = self.gateway.insert_waitlist_entry(new).await?;
        info!("waitlist entry {} added", entry.id);
        self.changes.publish(waitlist_upserted(entry.clone()));
        Ok(entry)
    }

    pub async fn submit_repertoire(
        &self,
        registration_id: RegistrationId,
        options: Vec<SongOption>,
    ) -> Result<Vec<RepertoireSubmission>, AppError> {
        let registrations = self.gateway.list_registrations().await?;
        if !registrations
            .iter()
            .any(|registration| registration.id == registration_id)
        {
            return Err(AllocationError::UnknownRegistration(registration_id).into());
        }
        let existing = self.gateway.list_submissions().await?;
        let new = lifecycle::check_submit(registration_id, &existing, options)?;
        let inserted = self.gateway.insert_submissions(new).await?;
        info!(
            "{} song options submitted for {registration_id}",
            inserted.len()
        );
        self.changes
            .publish_all(inserted.iter().cloned().map(submission_upserted));
        Ok(inserted)
    }

    pub async fn list_submissions(&self) -> Result<Vec<RepertoireSubmission>, AppError> {
        Ok(self.gateway.list_submissions().await?)
    }

    /// Approves `id` and purges every other submission of the soloist.
    pub async fn approve(
        &self,
        id: SubmissionId,
        registration_id: RegistrationId,
    ) -> Result<RepertoireSubmission, AppError> {
        let submissions = self.gateway.list_submissions().await?;
        match lifecycle::plan_approval(&submissions, id, registration_id)? {
            Approval::AlreadyApproved => {
                debug!("submission {id} is already approved");
                submissions
                    .into_iter()
                    .find(|submission| submission.id == id)
                    .ok_or_else(|| AllocationError::UnknownSubmission(id).into())
            }
            Approval::Apply { approve, .. } => {
                let (approved, purged) = self
                    .gateway
                    .approve_submission(approve, registration_id)
                    .await?;
                info!(
                    "submission {id} approved, {} alternatives purged",
                    purged.len()
                );
                self.changes
                    .publish_all(purged.into_iter().map(submission_removed));
                self.changes.publish(submission_upserted(approved.clone()));
                Ok(approved)
            }
        }
    }

    pub async fn reject(
        &self,
        id: SubmissionId,
        comments: Option<String>,
    ) -> Result<RepertoireSubmission, AppError> {
        let submissions = self.gateway.list_submissions().await?;
        let submission = submissions
            .iter()
            .find(|submission| submission.id == id)
            .ok_or(AllocationError::UnknownSubmission(id))?;
        lifecycle::check_reject(submission)?;
        let rejected = self
            .gateway
            .reject_submission(id, non_blank(comments))
            .await?;
        info!("submission {id} rejected");
        self.changes.publish(submission_upserted(rejected.clone()));
        Ok(rejected)
    }

    pub async fn comment(
        &self,
        id: SubmissionId,
        comments: Option<String>,
    ) -> Result<RepertoireSubmission, AppError> {
        let updated = self
            .gateway
            .update_submission_comments(id, non_blank(comments))
            .await?;
        self.changes.publish(submission_upserted(updated.clone()));
        Ok(updated)
    }

    pub async fn delete_submission(
        &self,
        id: SubmissionId,
        confirm: bool,
    ) -> Result<RepertoireSubmission, AppError> {
        confirmed(confirm)?;
        let deleted = self.gateway.delete_submission(id).await?;
        info!("submission {id} deleted");
        self.changes.publish(submission_removed(id));
        Ok(deleted)
    }

    /// Approves the selection, one submission per soloist.
    pub async fn bulk_approve(&self, ids: &[SubmissionId]) -> Result<usize, AppError> {
        let submissions = self.gateway.list_submissions().await?;
        let targets = lifecycle::bulk_approval_targets(&submissions, ids);
        let attempted = targets.len();
        let mut completed = 0;
        for (id, registration_id) in targets {
            let result = match registration_id {
                Some(registration_id) => self.approve(id, registration_id).await.map(drop),
                None => Err(AllocationError::UnknownSubmission(id).into()),
            };
            match result {
                Ok(()) => completed += 1,
                Err(err) => warn!("bulk approval of {id} failed: {err}"),
            }
        }
        batch_result(completed, attempted)
    }

    pub async fn bulk_delete(
        &self,
        ids: &[SubmissionId],
        confirm: bool,
    ) -> Result<usize, AppError> {
        confirmed(confirm)?;
        let ids: Vec<SubmissionId> = ids.iter().copied().unique().collect();
        let attempted = ids.len();
        let mut completed = 0;
        for id in ids {
            match self.gateway.delete_submission(id).await {
                Ok(_) => {
                    completed += 1;
                    self.changes.publish(submission_removed(id));
                }
                Err(err) => warn!("bulk deletion of {id} failed: {err}"),
            }
        }
        batch_result(completed, attempted)
    }

    /// Deletes every submission.
    pub async fn factory_reset(&self, confirm: bool) -> Result<usize, AppError> {
        confirmed(confirm)?;
        let deleted = self.gateway.delete_all_submissions().await?;
        warn!("factory reset deleted {} submissions", deleted.len());
        let count = deleted.len();
        self.changes
            .publish_all(deleted.into_iter().map(submission_removed));
        Ok(count)
    }

    pub async fn status_lookup(&self, full_name: &str) -> Result<Vec<StatusEntry>, AppError> {
        let wanted = full_name.trim().to_lowercase();
        if wanted.is_empty() {
            return Err(AllocationError::EmptyField("name").into());
        }
        let registrations = self.gateway.list_registrations().await?;
        let submissions = self.gateway.list_submissions().await?;
        Ok(registrations
            .into_iter()
            .filter(|registration| registration.full_name.trim().to_lowercase() == wanted)
            .map(|registration| {
                let own: Vec<RepertoireSubmission> = submissions
                    .iter()
                    .filter(|submission| submission.registration_id == registration.id)
                    .cloned()
                    .collect();
                StatusEntry {
                    locked: lifecycle::is_locked(&own),
                    qr_payload: registration.id.to_string(),
                    submissions: own,
                    registration,
                }
            })
            .collect())
    }

    pub async fn weeks(&self) -> Result<Vec<PerformanceWeek>, AppError> {
        Ok(self.gateway.list_weeks().await?)
    }

    pub async fn add_week(
        &self,
        date: &str,
        slot_ids: Vec<SlotNumber>,
    ) -> Result<PerformanceWeek, AppError> {
        let date = date.trim();
        if date.is_empty() {
            return Err(AllocationError::EmptyField("date").into());
        }
        if slot_ids.is_empty() {
            return Err(AllocationError::EmptyField("slot_ids").into());
        }
        if let Some(slot) = slot_ids.iter().find(|slot| **slot < 1) {
            return Err(AllocationError::SlotOutOfRange {
                slot: *slot,
                max_slots: self.max_slots().await?,
            }
            .into());
        }
        let week = self
            .gateway
            .insert_week(NewPerformanceWeek {
                date: date.to_owned(),
                slot_ids,
                is_test: false,
            })
            .await?;
        info!("performance week {} added", week.date);
        self.changes.publish(week_upserted(week.clone()));
        Ok(week)
    }

    pub async fn delete_week(&self, id: WeekId) -> Result<PerformanceWeek, AppError> {
        let week = self.gateway.delete_week(id).await?;
        info!("performance week {} deleted", week.date);
        self.changes.publish(week_removed(id));
        Ok(week)
    }

    /// The requested week, or the first one when none was asked for.
    pub async fn stage_week(
        &self,
        id: Option<WeekId>,
    ) -> Result<Option<PerformanceWeek>, AppError> {
        let weeks = self.gateway.list_weeks().await?;
        Ok(match id {
            Some(id) => Some(
                weeks
                    .into_iter()
                    .find(|week| week.id == id)
                    .ok_or(DatabaseError::NotFound {
                        table: "performance_weeks",
                        id,
                    })?,
            ),
            None => weeks.into_iter().next(),
        })
    }

    pub async fn set_performance_status(
        &self,
        id: RegistrationId,
        status: PerformanceStatus,
    ) -> Result<Registration, AppError> {
        let registration = self.gateway.set_performance_status(id, status).await?;
        info!("slot S-{} is {status}", registration.slot_id);
        self.changes
            .publish(registration_upserted(registration.clone()));
        Ok(registration)
    }

    pub async fn reset_performance(&self, confirm: bool) -> Result<usize, AppError> {
        confirmed(confirm)?;
        let registrations = self.gateway.reset_performance_statuses().await?;
        info!("performance statuses reset");
        let count = registrations.len();
        self.changes
            .publish_all(registrations.into_iter().map(registration_upserted));
        Ok(count)
    }

    pub async fn dashboard(&self, query: &RegistrationQuery) -> Result<Dashboard, AppError> {
        let state = self.grid_state().await?;
        let page = query.apply(&state.registrations);
        Ok(Dashboard {
            registrations: Page {
                items: page.items.into_iter().cloned().collect(),
                page: page.page,
                per_page: page.per_page,
                total: page.total,
                total_pages: page.total_pages,
            },
            counts: VoicePartCounts::count(&state.registrations),
            max_slots: state.max_slots,
        })
    }

    /// Changes name and voice part, the slot stays.
    pub async fn edit_registration(
        &self,
        id: RegistrationId,
        full_name: &str,
        voice_part: VoicePart,
    ) -> Result<Registration, AppError> {
        let full_name = normalize_name(full_name)?;
        let registration = self
            .gateway
            .update_registration(id, full_name, voice_part)
            .await?;
        self.changes
            .publish(registration_upserted(registration.clone()));
        Ok(registration)
    }

    /// Frees the slot. Submissions of the soloist go with it.
    pub async fn delete_registration(
        &self,
        id: RegistrationId,
        confirm: bool,
    ) -> Result<Registration, AppError> {
        confirmed(confirm)?;
        let registration = self.gateway.delete_registration(id).await?;
        info!("slot S-{} freed", registration.slot_id);
        self.changes.publish(registration_removed(id));
        Ok(registration)
    }

    /// Deletes every registration and, with them, every submission.
    pub async fn reset_registrations(&self) -> Result<usize, AppError> {
        let deleted = self.gateway.delete_all_registrations().await?;
        warn!("deleted {} registrations", deleted.len());
        let count = deleted.len();
        self.changes
            .publish_all(deleted.into_iter().map(registration_removed));
        Ok(count)
    }

    pub async fn waitlist(&self) -> Result<Vec<WaitlistEntry>, AppError> {
        Ok(self.gateway.list_waitlist().await?)
    }

    /// Moves a waitlist entry into the lowest free slot. When that slot is
    /// taken in the meantime the grid is read again and the next free slot
    /// is tried.
    pub async fn promote(&self, id: WaitlistId) -> Result<Registration, AppError> {
        let mut last_conflict = None;
        for attempt in 1..=PROMOTE_ATTEMPTS {
            let state = self.grid_state().await?;
            let entry = self
                .gateway
                .list_waitlist()
                .await?
                .into_iter()
                .find(|entry| entry.id == id)
                .ok_or(DatabaseError::NotFound {
                    table: "waitlist",
                    id,
                })?;
            let new = waitlist::promote(&entry, &state.grid())?;
            let slot = new.slot_id;
            match self.gateway.promote_waitlist_entry(id, new).await {
                Ok(registration) => {
                    info!("waitlist entry {id} promoted to slot S-{slot}");
                    self.changes.publish_all([
                        waitlist_removed(id),
                        registration_upserted(registration.clone()),
                    ]);
                    return Ok(registration);
                }
                Err(err) if err.is_slot_conflict() => {
                    warn!("slot S-{slot} was taken during promotion (attempt {attempt})");
                    last_conflict = Some(err);
                }
                Err(err) => return Err(err.into()),
            }
        }
        Err(last_conflict.map_or(
            AppError::Allocation(AllocationError::NoAvailableSlots),
            AppError::from,
        ))
    }

    pub async fn remove_waitlist_entry(&self, id: WaitlistId) -> Result<WaitlistEntry, AppError> {
        let entry = self.gateway.delete_waitlist_entry(id).await?;
        info!("waitlist entry {id} removed");
        self.changes.publish(waitlist_removed(id));
        Ok(entry)
    }

    pub async fn seed_weeks(&self) -> SeedReport {
        let report = seed_weeks(&self.gateway).await;
        info!(
            "seeded {} weeks, skipped {}, failed {}",
            report.inserted, report.skipped, report.failed
        );
        report
    }

    pub async fn add_admin(&self, email: &str, password: &str) -> Result<AdminUser, AppError> {
        let email = email.trim().to_lowercase();
        if email.is_empty() {
            return Err(AllocationError::EmptyField("email").into());
        }
        let password_hash = hash_password(password)?;
        Ok(self.gateway.upsert_admin(&email, &password_hash).await?)
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<AdminUser, AppError> {
        let email = email.trim().to_lowercase();
        match self.gateway.find_admin(&email).await? {
            Some(admin) if verify_password(&admin.password_hash, password) => {
                info!("admin {} logged in", admin.email);
                Ok(admin)
            }
            _ => Err(AppError::InvalidCredentials),
        }
    }
}
