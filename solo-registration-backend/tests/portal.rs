use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use solo_registration_allocation::models::{
    AdminUser, NewPerformanceWeek, NewRegistration, NewSubmission, NewWaitlistEntry,
    PerformanceStatus, PerformanceWeek, Registration, RegistrationId, RepertoireSubmission,
    SongOption, SubmissionId, SubmissionStatus, VoicePart, WaitlistEntry, WaitlistId, WeekId,
};
use solo_registration_allocation::slots::Intake;
use solo_registration_allocation::sync::{Change, Patch, Snapshot};
use solo_registration_allocation::AllocationError;
use solo_registration_backend::changes::ChangeFeed;
use solo_registration_backend::error::AppError;
use solo_registration_backend::portal::{Portal, PROMOTE_ATTEMPTS};
use solo_registration_database::{DatabaseError, Gateway, MemoryGateway};

fn portal(max_slots: i32) -> Portal<MemoryGateway> {
    Portal::new(MemoryGateway::new(), ChangeFeed::new(64), max_slots)
}

fn option(title: &str) -> SongOption {
    SongOption {
        song_title: title.to_owned(),
        artist_composer: "Handel".to_owned(),
        song_summary: None,
        song_link: None,
        score_link: None,
    }
}

#[tokio::test]
async fn reserve_then_submit_then_approve() {
    let portal = portal(50);
    let occupancy = portal.grid_state().await.unwrap().grid().occupancy();
    assert_eq!(
        (occupancy.available, occupancy.reserved, occupancy.percentage),
        (50, 0, 0)
    );

    let ada = portal
        .reserve("  Ada Obi ", VoicePart::Soprano, 7)
        .await
        .unwrap();
    assert_eq!(ada.full_name, "Ada Obi");
    let state = portal.grid_state().await.unwrap();
    let grid = state.grid();
    assert_eq!(grid.occupancy().available, 49);
    assert_eq!(grid.occupancy().reserved, 1);
    assert_eq!(grid.occupant(7).map(|r| r.full_name.as_str()), Some("Ada Obi"));

    let submitted = portal
        .submit_repertoire(ada.id, vec![option("Ombra mai fu"), option("Lascia ch'io pianga")])
        .await
        .unwrap();
    assert_eq!(submitted.len(), 2);
    assert!(submitted
        .iter()
        .all(|submission| submission.status == SubmissionStatus::Pending));
    let status = portal.status_lookup("ada obi").await.unwrap();
    assert_eq!(status.len(), 1);
    assert!(status[0].locked);

    let second = submitted
        .iter()
        .find(|submission| submission.song_title == "Lascia ch'io pianga")
        .unwrap();
    let approved = portal.approve(second.id, ada.id).await.unwrap();
    assert_eq!(approved.status, SubmissionStatus::Approved);
    let remaining = portal.list_submissions().await.unwrap();
    assert_eq!(remaining, vec![approved.clone()]);

    let status = portal.status_lookup("Ada Obi").await.unwrap();
    assert!(status[0].locked);
    assert_eq!(status[0].qr_payload, ada.id.to_string());

    let err = portal
        .submit_repertoire(ada.id, vec![option("Where'er you walk")])
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Allocation(AllocationError::Locked)));

    let err = portal.reject(approved.id, None).await.unwrap_err();
    assert!(matches!(
        err,
        AppError::Allocation(AllocationError::InvalidTransition { .. })
    ));
}

#[tokio::test]
async fn full_grid_routes_to_the_waitlist_and_promotes_into_the_lowest_free_slot() {
    let portal = portal(2);
    let first = portal.reserve("One", VoicePart::Alto, 1).await.unwrap();
    portal.reserve("Two", VoicePart::Bass, 2).await.unwrap();

    let state = portal.grid_state().await.unwrap();
    assert_eq!(state.grid().occupancy().available, 0);
    assert_eq!(state.grid().intake(), Intake::Waitlist);
    let err = portal.reserve("Three", VoicePart::Tenor, 2).await.unwrap_err();
    assert!(matches!(
        err,
        AppError::Allocation(AllocationError::RegistrationFull)
    ));

    let entry = portal
        .join_waitlist("Three", VoicePart::Tenor, Some(" ".to_owned()), None)
        .await
        .unwrap();
    assert_eq!(entry.email, None);
    let err = portal.promote(entry.id).await.unwrap_err();
    assert!(matches!(
        err,
        AppError::Allocation(AllocationError::NoAvailableSlots)
    ));
    assert_eq!(portal.waitlist().await.unwrap().len(), 1);

    portal.delete_registration(first.id, true).await.unwrap();
    let promoted = portal.promote(entry.id).await.unwrap();
    assert_eq!(promoted.slot_id, 1);
    assert_eq!(promoted.full_name, "Three");
    assert!(portal.waitlist().await.unwrap().is_empty());
}

#[tokio::test]
async fn reserving_a_taken_slot_does_not_move_the_soloist() {
    let portal = portal(10);
    portal.reserve("Ada Obi", VoicePart::Soprano, 3).await.unwrap();
    let err = portal
        .reserve("Kwame Asante", VoicePart::Bass, 3)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Allocation(AllocationError::SlotTaken(3))));
    assert_eq!(err.status(), http::StatusCode::CONFLICT);
    assert_eq!(portal.grid_state().await.unwrap().registrations.len(), 1);
}

#[tokio::test]
async fn destructive_operations_need_confirmation() {
    let portal = portal(10);
    let ada = portal.reserve("Ada Obi", VoicePart::Soprano, 1).await.unwrap();
    let submitted = portal
        .submit_repertoire(ada.id, vec![option("Ombra mai fu")])
        .await
        .unwrap();

    for err in [
        portal.delete_registration(ada.id, false).await.unwrap_err(),
        portal
            .delete_submission(submitted[0].id, false)
            .await
            .unwrap_err(),
        portal.factory_reset(false).await.unwrap_err(),
        portal.reset_performance(false).await.unwrap_err(),
        portal
            .bulk_delete(&[submitted[0].id], false)
            .await
            .unwrap_err(),
    ] {
        assert!(matches!(err, AppError::ConfirmationRequired));
    }
    assert_eq!(portal.list_submissions().await.unwrap().len(), 1);

    assert_eq!(portal.factory_reset(true).await.unwrap(), 1);
    assert!(portal.list_submissions().await.unwrap().is_empty());
    assert_eq!(portal.grid_state().await.unwrap().registrations.len(), 1);
}

#[tokio::test]
async fn bulk_approve_keeps_one_submission_per_soloist() {
    let portal = portal(10);
    let ada = portal.reserve("Ada Obi", VoicePart::Soprano, 1).await.unwrap();
    let kwame = portal.reserve("Kwame Asante", VoicePart::Bass, 2).await.unwrap();
    let ada_options = portal
        .submit_repertoire(ada.id, vec![option("Ombra mai fu"), option("Lascia ch'io pianga")])
        .await
        .unwrap();
    let kwame_options = portal
        .submit_repertoire(kwame.id, vec![option("Why do the nations")])
        .await
        .unwrap();

    let completed = portal
        .bulk_approve(&[ada_options[0].id, ada_options[1].id, kwame_options[0].id])
        .await
        .unwrap();
    assert_eq!(completed, 2);
    let remaining = portal.list_submissions().await.unwrap();
    assert_eq!(remaining.len(), 2);
    assert!(remaining
        .iter()
        .all(|submission| submission.status == SubmissionStatus::Approved));
    assert!(remaining.iter().any(|submission| submission.id == ada_options[0].id));
}

#[tokio::test]
async fn bulk_delete_reports_partial_failures() {
    let portal = portal(10);
    let ada = portal.reserve("Ada Obi", VoicePart::Soprano, 1).await.unwrap();
    let submitted = portal
        .submit_repertoire(ada.id, vec![option("Ombra mai fu")])
        .await
        .unwrap();
    let err = portal
        .bulk_delete(&[submitted[0].id, uuid::Uuid::new_v4()], true)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        AppError::PartialBatch {
            completed: 1,
            attempted: 2
        }
    ));
    assert!(portal.list_submissions().await.unwrap().is_empty());
}

#[tokio::test]
async fn max_slots_falls_back_to_the_default_and_can_be_changed() {
    let portal = portal(12);
    assert_eq!(portal.max_slots().await.unwrap(), 12);
    portal
        .gateway()
        .store_config("max_slots", "many")
        .await
        .unwrap();
    assert_eq!(portal.max_slots().await.unwrap(), 12);
    assert_eq!(portal.update_max_slots(30).await.unwrap(), 30);
    assert_eq!(portal.max_slots().await.unwrap(), 30);
    let err = portal.update_max_slots(0).await.unwrap_err();
    assert!(matches!(
        err,
        AppError::Allocation(AllocationError::InvalidMaxSlots(0))
    ));
    let err = portal.update_max_slots(500_000_000).await.unwrap_err();
    assert_eq!(err.status(), http::StatusCode::BAD_REQUEST);
    assert_eq!(portal.max_slots().await.unwrap(), 30);

    portal
        .gateway()
        .store_config("max_slots", "500000000")
        .await
        .unwrap();
    assert_eq!(portal.max_slots().await.unwrap(), 12);
}

#[tokio::test]
async fn stage_walks_the_first_week_by_default() {
    let portal = portal(10);
    let week = portal.add_week("Sun, Mar 1", vec![3, 1, 2]).await.unwrap();
    portal.add_week("Sun, Mar 8", vec![4, 5]).await.unwrap();
    let one = portal.reserve("One", VoicePart::Alto, 1).await.unwrap();
    portal.reserve("Three", VoicePart::Tenor, 3).await.unwrap();

    assert_eq!(portal.stage_week(None).await.unwrap(), Some(week.clone()));
    let err = portal
        .stage_week(Some(uuid::Uuid::new_v4()))
        .await
        .unwrap_err();
    assert_eq!(err.status(), http::StatusCode::NOT_FOUND);

    let updated = portal
        .set_performance_status(one.id, PerformanceStatus::Completed)
        .await
        .unwrap();
    assert_eq!(updated.performance_status(), PerformanceStatus::Completed);
    assert_eq!(portal.reset_performance(true).await.unwrap(), 2);
    let registrations = portal.grid_state().await.unwrap().registrations;
    assert!(registrations
        .iter()
        .all(|registration| registration.performance_status() == PerformanceStatus::Pending));

    let err = portal.add_week("  ", vec![1]).await.unwrap_err();
    assert!(matches!(
        err,
        AppError::Allocation(AllocationError::EmptyField("date"))
    ));
}

#[tokio::test]
async fn resetting_performances_twice_matches_resetting_once() {
    let portal = portal(10);
    let one = portal.reserve("One", VoicePart::Alto, 1).await.unwrap();
    let two = portal.reserve("Two", VoicePart::Bass, 2).await.unwrap();
    portal
        .set_performance_status(one.id, PerformanceStatus::Completed)
        .await
        .unwrap();
    portal
        .set_performance_status(two.id, PerformanceStatus::Skipped)
        .await
        .unwrap();

    portal.reset_performance(true).await.unwrap();
    let once = portal.grid_state().await.unwrap().registrations;
    portal.reset_performance(true).await.unwrap();
    let twice = portal.grid_state().await.unwrap().registrations;
    assert_eq!(once, twice);
    assert!(twice
        .iter()
        .all(|registration| registration.performance_status() == PerformanceStatus::Pending));

    let err = portal.reset_performance(false).await.unwrap_err();
    assert_eq!(err.status(), http::StatusCode::PRECONDITION_REQUIRED);
}

#[tokio::test]
async fn changes_keep_a_snapshot_in_sync() {
    let portal = portal(10);
    let mut receiver = portal.changes().subscribe();
    let mut snapshot = portal.snapshot().await.unwrap();

    let ada = portal.reserve("Ada Obi", VoicePart::Soprano, 1).await.unwrap();
    let submitted = portal
        .submit_repertoire(ada.id, vec![option("Ombra mai fu"), option("Lascia ch'io pianga")])
        .await
        .unwrap();
    portal.approve(submitted[1].id, ada.id).await.unwrap();
    portal.update_max_slots(20).await.unwrap();
    let entry = portal
        .join_waitlist("Kwame Asante", VoicePart::Bass, None, None)
        .await
        .unwrap();
    portal.promote(entry.id).await.unwrap();
    portal.delete_registration(ada.id, true).await.unwrap();

    while let Ok(change) = receiver.try_recv() {
        snapshot.apply(change);
    }
    assert_eq!(snapshot, portal.snapshot().await.unwrap());
}

#[tokio::test]
async fn demo_mode_refuses_writes_and_logins() {
    let portal = Portal::new(MemoryGateway::demo(50), ChangeFeed::new(4), 50);
    assert!(portal.is_demo());
    let err = portal
        .reserve("Ada Obi", VoicePart::Soprano, 2)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Database(DatabaseError::ReadOnly)));
    let err = portal.login("admin@example.com", "secret").await.unwrap_err();
    assert!(matches!(err, AppError::InvalidCredentials));
    assert!(!portal.weeks().await.unwrap().is_empty());
}

#[tokio::test]
async fn admin_login_checks_the_password_hash() {
    let portal = portal(10);
    portal
        .add_admin(" Admin@Example.com ", "correct horse")
        .await
        .unwrap();
    let admin = portal
        .login("admin@example.com", "correct horse")
        .await
        .unwrap();
    assert_eq!(admin.email, "admin@example.com");
    assert!(!admin.password_hash.contains("correct horse"));
    assert!(matches!(
        portal.login("admin@example.com", "wrong").await.unwrap_err(),
        AppError::InvalidCredentials
    ));
}

/// Books the slot a promotion is about to use right before the promotion
/// writes, as a concurrent public reservation would.
#[derive(Clone)]
struct RacingGateway {
    inner: MemoryGateway,
    races: Arc<AtomicUsize>,
}

impl RacingGateway {
    fn new(races: usize) -> Self {
        Self {
            inner: MemoryGateway::new(),
            races: Arc::new(AtomicUsize::new(races)),
        }
    }
}

impl Gateway for RacingGateway {
    fn is_read_only(&self) -> bool {
        self.inner.is_read_only()
    }

    async fn load_config(&self) -> Result<BTreeMap<String, String>, DatabaseError> {
        self.inner.load_config().await
    }

    async fn store_config(&self, key: &str, value: &str) -> Result<(), DatabaseError> {
        self.inner.store_config(key, value).await
    }

    async fn list_registrations(&self) -> Result<Vec<Registration>, DatabaseError> {
        self.inner.list_registrations().await
    }

    async fn insert_registration(
        &self,
        new: NewRegistration,
    ) -> Result<Registration, DatabaseError> {
        self.inner.insert_registration(new).await
    }

    async fn update_registration(
        &self,
        id: RegistrationId,
        full_name: String,
        voice_part: VoicePart,
    ) -> Result<Registration, DatabaseError> {
        self.inner.update_registration(id, full_name, voice_part).await
    }

    async fn delete_registration(&self, id: RegistrationId) -> Result<Registration, DatabaseError> {
        self.inner.delete_registration(id).await
    }

    async fn delete_all_registrations(&self) -> Result<Vec<RegistrationId>, DatabaseError> {
        self.inner.delete_all_registrations().await
    }

    async fn set_performance_status(
        &self,
        id: RegistrationId,
        status: PerformanceStatus,
    ) -> Result<Registration, DatabaseError> {
        self.inner.set_performance_status(id, status).await
    }

    async fn reset_performance_statuses(&self) -> Result<Vec<Registration>, DatabaseError> {
        self.inner.reset_performance_statuses().await
    }

    async fn list_submissions(&self) -> Result<Vec<RepertoireSubmission>, DatabaseError> {
        self.inner.list_submissions().await
    }

    async fn insert_submissions(
        &self,
        new: Vec<NewSubmission>,
    ) -> Result<Vec<RepertoireSubmission>, DatabaseError> {
        self.inner.insert_submissions(new).await
    }

    async fn reject_submission(
        &self,
        id: SubmissionId,
        comments: Option<String>,
    ) -> Result<RepertoireSubmission, DatabaseError> {
        self.inner.reject_submission(id, comments).await
    }

    async fn update_submission_comments(
        &self,
        id: SubmissionId,
        comments: Option<String>,
    ) -> Result<RepertoireSubmission, DatabaseError> {
        self.inner.update_submission_comments(id, comments).await
    }

    async fn approve_submission(
        &self,
        id: SubmissionId,
        registration_id: RegistrationId,
    ) -> Result<(RepertoireSubmission, Vec<SubmissionId>), DatabaseError> {
        self.inner.approve_submission(id, registration_id).await
    }

    async fn delete_submission(
        &self,
        id: SubmissionId,
    ) -> Result<RepertoireSubmission, DatabaseError> {
        self.inner.delete_submission(id).await
    }

    async fn delete_all_submissions(&self) -> Result<Vec<SubmissionId>, DatabaseError> {
        self.inner.delete_all_submissions().await
    }

    async fn list_weeks(&self) -> Result<Vec<PerformanceWeek>, DatabaseError> {
        self.inner.list_weeks().await
    }

    async fn find_week_by_date(
        &self,
        date: &str,
    ) -> Result<Option<PerformanceWeek>, DatabaseError> {
        self.inner.find_week_by_date(date).await
    }

    async fn insert_week(&self, new: NewPerformanceWeek) -> Result<PerformanceWeek, DatabaseError> {
        self.inner.insert_week(new).await
    }

    async fn delete_week(&self, id: WeekId) -> Result<PerformanceWeek, DatabaseError> {
        self.inner.delete_week(id).await
    }

    async fn list_waitlist(&self) -> Result<Vec<WaitlistEntry>, DatabaseError> {
        self.inner.list_waitlist().await
    }

    async fn insert_waitlist_entry(
        &self,
        new: NewWaitlistEntry,
    ) -> Result<WaitlistEntry, DatabaseError> {
        self.inner.insert_waitlist_entry(new).await
    }

    async fn delete_waitlist_entry(&self, id: WaitlistId) -> Result<WaitlistEntry, DatabaseError> {
        self.inner.delete_waitlist_entry(id).await
    }

    async fn promote_waitlist_entry(
        &self,
        id: WaitlistId,
        registration: NewRegistration,
    ) -> Result<Registration, DatabaseError> {
        let raced = self
            .races
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |left| left.checked_sub(1))
            .is_ok();
        if raced {
            self.inner
                .insert_registration(NewRegistration {
                    full_name: "Walk-in".to_owned(),
                    voice_part: VoicePart::Alto,
                    slot_id: registration.slot_id,
                    is_test: false,
                })
                .await?;
        }
        self.inner.promote_waitlist_entry(id, registration).await
    }

    async fn find_admin(&self, email: &str) -> Result<Option<AdminUser>, DatabaseError> {
        self.inner.find_admin(email).await
    }

    async fn upsert_admin(
        &self,
        email: &str,
        password_hash: &str,
    ) -> Result<AdminUser, DatabaseError> {
        self.inner.upsert_admin(email, password_hash).await
    }
}

async fn waiting(portal: &Portal<RacingGateway>) -> WaitlistId {
    portal
        .join_waitlist("Kwame Asante", VoicePart::Bass, None, None)
        .await
        .unwrap()
        .id
}

#[tokio::test]
async fn promotion_retries_when_its_slot_is_taken() {
    let portal = Portal::new(RacingGateway::new(1), ChangeFeed::new(16), 5);
    let id = waiting(&portal).await;
    let promoted = portal.promote(id).await.unwrap();
    assert_eq!(promoted.slot_id, 2);
    let slots: Vec<i32> = portal
        .grid_state()
        .await
        .unwrap()
        .registrations
        .iter()
        .map(|registration| registration.slot_id)
        .collect();
    assert_eq!(slots.len(), 2);
    assert!(slots.contains(&1) && slots.contains(&2));
}

#[tokio::test]
async fn promotion_gives_up_after_repeated_conflicts() {
    let portal = Portal::new(
        RacingGateway::new(PROMOTE_ATTEMPTS),
        ChangeFeed::new(16),
        10,
    );
    let id = waiting(&portal).await;
    let err = portal.promote(id).await.unwrap_err();
    assert!(matches!(err, AppError::Database(ref err) if err.is_slot_conflict()));
    assert_eq!(err.status(), http::StatusCode::CONFLICT);
    assert_eq!(portal.waitlist().await.unwrap().len(), 1);
}

#[test]
fn snapshot_drops_submissions_of_removed_registrations() {
    let registration_id = uuid::Uuid::new_v4();
    let mut snapshot = Snapshot::default();
    snapshot.apply(Change::RepertoireSubmissions(Patch::Upsert {
        record: RepertoireSubmission {
            id: uuid::Uuid::new_v4(),
            registration_id,
            song_title: "Ombra mai fu".to_owned(),
            artist_composer: "Handel".to_owned(),
            song_summary: None,
            song_link: None,
            score_link: None,
            status: SubmissionStatus::Pending,
            admin_comments: None,
            created_at: chrono::Utc::now(),
        },
    }));
    snapshot.apply(Change::Registrations(Patch::Remove {
        id: registration_id,
    }));
    assert!(snapshot.repertoire_submissions.is_empty());
}
