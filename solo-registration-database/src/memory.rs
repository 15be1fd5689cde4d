use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{Duration, Utc};
use solo_registration_allocation::models::{
    AdminUser, NewPerformanceWeek, NewRegistration, NewSubmission, NewWaitlistEntry,
    PerformanceStatus, PerformanceWeek, Registration, RegistrationId, RepertoireSubmission,
    SubmissionId, SubmissionStatus, VoicePart, WaitlistEntry, WaitlistId, WeekId, MAX_SLOTS_KEY,
};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::error::{DatabaseError, ONE_APPROVED_CONSTRAINT, SLOT_UNIQUE_CONSTRAINT};
use crate::gateway::Gateway;
use crate::seed::ROSTER_SCHEDULE;

#[derive(Default)]
struct Tables {
    config: BTreeMap<String, String>,
    registrations: Vec<Registration>,
    submissions: Vec<RepertoireSubmission>,
    weeks: Vec<PerformanceWeek>,
    waitlist: Vec<WaitlistEntry>,
    admins: Vec<AdminUser>,
}

impl Tables {
    fn insert_registration(&mut self, new: NewRegistration) -> Result<Registration, DatabaseError> {
        if self
            .registrations
            .iter()
            .any(|registration| registration.slot_id == new.slot_id)
        {
            return Err(DatabaseError::UniqueViolation(SLOT_UNIQUE_CONSTRAINT.to_owned()));
        }
        let registration = Registration {
            id: Uuid::new_v4(),
            full_name: new.full_name,
            voice_part: new.voice_part,
            slot_id: new.slot_id,
            created_at: Utc::now(),
            performance_status: None,
            is_test: new.is_test,
        };
        self.registrations.push(registration.clone());
        Ok(registration)
    }

    fn registration_mut(&mut self, id: RegistrationId) -> Result<&mut Registration, DatabaseError> {
        self.registrations
            .iter_mut()
            .find(|registration| registration.id == id)
            .ok_or(DatabaseError::NotFound {
                table: "registrations",
                id,
            })
    }

    fn submission_mut(
        &mut self,
        id: SubmissionId,
    ) -> Result<&mut RepertoireSubmission, DatabaseError> {
        self.submissions
            .iter_mut()
            .find(|submission| submission.id == id)
            .ok_or(DatabaseError::NotFound {
                table: "repertoire_submissions",
                id,
            })
    }
}

fn take<T>(
    rows: &mut Vec<T>,
    table: &'static str,
    id: Uuid,
    key: impl Fn(&T) -> Uuid,
) -> Result<T, DatabaseError> {
    let index = rows
        .iter()
        .position(|row| key(row) == id)
        .ok_or(DatabaseError::NotFound { table, id })?;
    Ok(rows.remove(index))
}

/// [`Gateway`] keeping everything in memory. Used by tests and, read-only
/// with synthetic data, when no database is configured.
#[derive(Clone, Default)]
pub struct MemoryGateway {
    tables: Arc<RwLock<Tables>>,
    read_only: bool,
}

impl MemoryGateway {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Synthetic data for demo mode; writes are refused.
    #[must_use]
    pub fn demo(max_slots: i32) -> Self {
        let now = Utc::now();
        let mut tables = Tables::default();
        tables
            .config
            .insert(MAX_SLOTS_KEY.to_owned(), max_slots.to_string());
        let soloists = [
            ("Ada Obi", VoicePart::Soprano, 1),
            ("Kwame Asante", VoicePart::Bass, 3),
            ("Adaeze Nwosu", VoicePart::Alto, 5),
            ("Tunde Bello", VoicePart::Tenor, 10),
            ("Efua Sarpong", VoicePart::Soprano, 41),
        ];
        for (offset, (name, voice_part, slot)) in (0_i64..).zip(soloists) {
            if slot > max_slots {
                continue;
            }
            tables.registrations.push(Registration {
                id: Uuid::new_v4(),
                full_name: name.to_owned(),
                voice_part,
                slot_id: slot,
                created_at: now + Duration::seconds(offset),
                performance_status: None,
                is_test: true,
            });
        }
        for (offset, (date, slots)) in (0_i64..).zip(ROSTER_SCHEDULE) {
            tables.weeks.push(PerformanceWeek {
                id: Uuid::new_v4(),
                date: (*date).to_owned(),
                slot_ids: slots.to_vec(),
                is_test: true,
                created_at: now + Duration::seconds(offset),
            });
        }
        Self {
            tables: Arc::new(RwLock::new(tables)),
            read_only: true,
        }
    }

    fn writable(&self) -> Result<(), DatabaseError> {
        if self.read_only {
            Err(DatabaseError::ReadOnly)
        } else {
            Ok(())
        }
    }
}

impl Gateway for MemoryGateway {
    fn is_read_only(&self) -> bool {
        self.read_only
    }

    async fn load_config(&self) -> Result<BTreeMap<String, String>, DatabaseError> {
        Ok(self.tables.read().await.config.clone())
    }

    async fn store_config(&self, key: &str, value: &str) -> Result<(), DatabaseError> {
        self.writable()?;
        self.tables
            .write()
            .await
            .config
            .insert(key.to_owned(), value.to_owned());
        Ok(())
    }

    async fn list_registrations(&self) -> Result<Vec<Registration>, DatabaseError> {
        Ok(self.tables.read().await.registrations.clone())
    }

    async fn insert_registration(
        &self,
        new: NewRegistration,
    ) -> Result<Registration, DatabaseError> {
        self.writable()?;
        self.tables.write().await.insert_registration(new)
    }

    async fn update_registration(
        &self,
        id: RegistrationId,
        full_name: String,
        voice_part: VoicePart,
    ) -> Result<Registration, DatabaseError> {
        self.writable()?;
        let mut tables = self.tables.write().await;
        let registration = tables.registration_mut(id)?;
        registration.full_name = full_name;
        registration.voice_part = voice_part;
        Ok(registration.clone())
    }

    async fn delete_registration(&self, id: RegistrationId) -> Result<Registration, DatabaseError> {
        self.writable()?;
        let mut tables = self.tables.write().await;
        let removed = take(&mut tables.registrations, "registrations", id, |r| r.id)?;
        tables
            .submissions
            .retain(|submission| submission.registration_id != id);
        Ok(removed)
    }

    async fn delete_all_registrations(&self) -> Result<Vec<RegistrationId>, DatabaseError> {
        self.writable()?;
        let mut tables = self.tables.write().await;
        tables.submissions.clear();
        Ok(tables
            .registrations
            .drain(..)
            .map(|registration| registration.id)
            .collect())
    }

    async fn set_performance_status(
        &self,
        id: RegistrationId,
        status: PerformanceStatus,
    ) -> Result<Registration, DatabaseError> {
        self.writable()?;
        let mut tables = self.tables.write().await;
        let registration = tables.registration_mut(id)?;
        registration.performance_status = Some(status);
        Ok(registration.clone())
    }

    async fn reset_performance_statuses(&self) -> Result<Vec<Registration>, DatabaseError> {
        self.writable()?;
        let mut tables = self.tables.write().await;
        for registration in &mut tables.registrations {
            registration.performance_status = Some(PerformanceStatus::Pending);
        }
        Ok(tables.registrations.clone())
    }

    async fn list_submissions(&self) -> Result<Vec<RepertoireSubmission>, DatabaseError> {
        let tables = self.tables.read().await;
        Ok(tables.submissions.iter().rev().cloned().collect())
    }

    async fn insert_submissions(
        &self,
        new: Vec<NewSubmission>,
    ) -> Result<Vec<RepertoireSubmission>, DatabaseError> {
        self.writable()?;
        let mut tables = self.tables.write().await;
        if let Some(missing) = new.iter().find(|new| {
            !tables
                .registrations
                .iter()
                .any(|registration| registration.id == new.registration_id)
        }) {
            return Err(DatabaseError::NotFound {
                table: "registrations",
                id: missing.registration_id,
            });
        }
        let now = Utc::now();
        let inserted: Vec<RepertoireSubmission> = new
            .into_iter()
            .map(|new| RepertoireSubmission {
                id: Uuid::new_v4(),
                registration_id: new.registration_id,
                song_title: new.option.song_title,
                artist_composer: new.option.artist_composer,
                song_summary: new.option.song_summary,
                song_link: new.option.song_link,
                score_link: new.option.score_link,
                status: SubmissionStatus::Pending,
                admin_comments: None,
                created_at: now,
            })
            .collect();
        tables.submissions.extend(inserted.iter().cloned());
        Ok(inserted)
    }

    async fn reject_submission(
        &self,
        id: SubmissionId,
        comments: Option<String>,
    ) -> Result<RepertoireSubmission, DatabaseError> {
        self.writable()?;
        let mut tables = self.tables.write().await;
        let submission = tables.submission_mut(id)?;
        if submission.status == SubmissionStatus::Approved {
            return Err(DatabaseError::NotFound {
                table: "repertoire_submissions",
                id,
            });
        }
        submission.status = SubmissionStatus::Rejected;
        if comments.is_some() {
            submission.admin_comments = comments;
        }
        Ok(submission.clone())
    }

    async fn update_submission_comments(
        &self,
        id: SubmissionId,
        comments: Option<String>,
    ) -> Result<RepertoireSubmission, DatabaseError> {
        self.writable()?;
        let mut tables = self.tables.write().await;
        let submission = tables.submission_mut(id)?;
        submission.admin_comments = comments;
        Ok(submission.clone())
    }

    async fn approve_submission(
        &self,
        id: SubmissionId,
        registration_id: RegistrationId,
    ) -> Result<(RepertoireSubmission, Vec<SubmissionId>), DatabaseError> {
        self.writable()?;
        let mut tables = self.tables.write().await;
        if !tables
            .submissions
            .iter()
            .any(|submission| submission.id == id && submission.registration_id == registration_id)
        {
            return Err(DatabaseError::NotFound {
                table: "repertoire_submissions",
                id,
            });
        }
        let mut purged = Vec::new();
        tables.submissions.retain(|submission| {
            let sibling = submission.registration_id == registration_id && submission.id != id;
            if sibling {
                purged.push(submission.id);
            }
            !sibling
        });
        let submission = tables.submission_mut(id)?;
        submission.status = SubmissionStatus::Approved;
        let approved = submission.clone();
        debug_assert!(
            tables
                .submissions
                .iter()
                .filter(|s| s.registration_id == registration_id
                    && s.status == SubmissionStatus::Approved)
                .count()
                == 1,
            "{ONE_APPROVED_CONSTRAINT}"
        );
        Ok((approved, purged))
    }

    async fn delete_submission(
        &self,
        id: SubmissionId,
    ) -> Result<RepertoireSubmission, DatabaseError> {
        self.writable()?;
        let mut tables = self.tables.write().await;
        take(&mut tables.submissions, "repertoire_submissions", id, |s| s.id)
    }

    async fn delete_all_submissions(&self) -> Result<Vec<SubmissionId>, DatabaseError> {
        self.writable()?;
        let mut tables = self.tables.write().await;
        Ok(tables
            .submissions
            .drain(..)
            .map(|submission| submission.id)
            .collect())
    }

    async fn list_weeks(&self) -> Result<Vec<PerformanceWeek>, DatabaseError> {
        Ok(self.tables.read().await.weeks.clone())
    }

    async fn find_week_by_date(
        &self,
        date: &str,
    ) -> Result<Option<PerformanceWeek>, DatabaseError> {
        let tables = self.tables.read().await;
        Ok(tables.weeks.iter().find(|week| week.date == date).cloned())
    }

    async fn insert_week(&self, new: NewPerformanceWeek) -> Result<PerformanceWeek, DatabaseError> {
        self.writable()?;
        let week = PerformanceWeek {
            id: Uuid::new_v4(),
            date: new.date,
            slot_ids: new.slot_ids,
            is_test: new.is_test,
            created_at: Utc::now(),
        };
        self.tables.write().await.weeks.push(week.clone());
        Ok(week)
    }

    async fn delete_week(&self, id: WeekId) -> Result<PerformanceWeek, DatabaseError> {
        self.writable()?;
        let mut tables = self.tables.write().await;
        take(&mut tables.weeks, "performance_weeks", id, |week| week.id)
    }

    async fn list_waitlist(&self) -> Result<Vec<WaitlistEntry>, DatabaseError> {
        Ok(self.tables.read().await.waitlist.clone())
    }

    async fn insert_waitlist_entry(
        &self,
        new: NewWaitlistEntry,
    ) -> Result<WaitlistEntry, DatabaseError> {
        self.writable()?;
        let entry = WaitlistEntry {
            id: Uuid::new_v4(),
            full_name: new.full_name,
            voice_part: new.voice_part,
            email: new.email,
            phone: new.phone,
            created_at: Utc::now(),
            is_test: new.is_test,
        };
        self.tables.write().await.waitlist.push(entry.clone());
        Ok(entry)
    }

    async fn delete_waitlist_entry(&self, id: WaitlistId) -> Result<WaitlistEntry, DatabaseError> {
        self.writable()?;
        let mut tables = self.tables.write().await;
        take(&mut tables.waitlist, "waitlist", id, |entry| entry.id)
    }

    async fn promote_waitlist_entry(
        &self,
        id: WaitlistId,
        registration: NewRegistration,
    ) -> Result<Registration, DatabaseError> {
        self.writable()?;
        let mut tables = self.tables.write().await;
        let index = tables
            .waitlist
            .iter()
            .position(|entry| entry.id == id)
            .ok_or(DatabaseError::NotFound {
                table: "waitlist",
                id,
            })?;
        let registration = tables.insert_registration(registration)?;
        tables.waitlist.remove(index);
        Ok(registration)
    }

    async fn find_admin(&self, email: &str) -> Result<Option<AdminUser>, DatabaseError> {
        let tables = self.tables.read().await;
        Ok(tables.admins.iter().find(|admin| admin.email == email).cloned())
    }

    async fn upsert_admin(
        &self,
        email: &str,
        password_hash: &str,
    ) -> Result<AdminUser, DatabaseError> {
        // accounts are provisioned even in demo mode, otherwise nobody can log in
        let mut tables = self.tables.write().await;
        if let Some(admin) = tables.admins.iter_mut().find(|admin| admin.email == email) {
            password_hash.clone_into(&mut admin.password_hash);
            return Ok(admin.clone());
        }
        let admin = AdminUser {
            id: Uuid::new_v4(),
            email: email.to_owned(),
            password_hash: password_hash.to_owned(),
        };
        tables.admins.push(admin.clone());
        Ok(admin)
    }
}
