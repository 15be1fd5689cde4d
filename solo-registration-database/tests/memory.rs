use solo_registration_allocation::models::{
    NewRegistration, NewSubmission, NewWaitlistEntry, SongOption, SubmissionStatus, VoicePart,
};
use solo_registration_database::error::SLOT_UNIQUE_CONSTRAINT;
use solo_registration_database::seed::{seed_weeks, ROSTER_SCHEDULE};
use solo_registration_database::{DatabaseError, Gateway, MemoryGateway};

fn soloist(name: &str, slot: i32) -> NewRegistration {
    NewRegistration {
        full_name: name.to_owned(),
        voice_part: VoicePart::Alto,
        slot_id: slot,
        is_test: false,
    }
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
async fn second_insert_into_a_slot_is_a_slot_conflict() {
    let gateway = MemoryGateway::new();
    gateway.insert_registration(soloist("A", 7)).await.unwrap();
    let err = gateway
        .insert_registration(soloist("B", 7))
        .await
        .unwrap_err();
    assert!(err.is_slot_conflict());
    assert!(matches!(
        err,
        DatabaseError::UniqueViolation(ref name) if name == SLOT_UNIQUE_CONSTRAINT
    ));
    assert_eq!(gateway.list_registrations().await.unwrap().len(), 1);
}

#[tokio::test]
async fn approving_purges_the_siblings() {
    let gateway = MemoryGateway::new();
    let registration = gateway.insert_registration(soloist("A", 1)).await.unwrap();
    let other = gateway.insert_registration(soloist("B", 2)).await.unwrap();
    let inserted = gateway
        .insert_submissions(vec![
            NewSubmission {
                registration_id: registration.id,
                option: option("Ombra mai fu"),
            },
            NewSubmission {
                registration_id: registration.id,
                option: option("Lascia ch'io pianga"),
            },
            NewSubmission {
                registration_id: other.id,
                option: option("Where'er you walk"),
            },
        ])
        .await
        .unwrap();

    let (approved, purged) = gateway
        .approve_submission(inserted[1].id, registration.id)
        .await
        .unwrap();
    assert_eq!(approved.status, SubmissionStatus::Approved);
    assert_eq!(purged, vec![inserted[0].id]);

    let remaining = gateway.list_submissions().await.unwrap();
    assert_eq!(remaining.len(), 2);
    assert!(remaining.iter().any(|s| s.id == inserted[2].id));
}

#[tokio::test]
async fn approved_submission_cannot_be_rejected() {
    let gateway = MemoryGateway::new();
    let registration = gateway.insert_registration(soloist("A", 1)).await.unwrap();
    let inserted = gateway
        .insert_submissions(vec![NewSubmission {
            registration_id: registration.id,
            option: option("Caro mio ben"),
        }])
        .await
        .unwrap();
    gateway
        .approve_submission(inserted[0].id, registration.id)
        .await
        .unwrap();
    assert!(matches!(
        gateway.reject_submission(inserted[0].id, None).await,
        Err(DatabaseError::NotFound { .. })
    ));
}

#[tokio::test]
async fn deleting_a_registration_deletes_its_submissions() {
    let gateway = MemoryGateway::new();
    let registration = gateway.insert_registration(soloist("A", 1)).await.unwrap();
    gateway
        .insert_submissions(vec![NewSubmission {
            registration_id: registration.id,
            option: option("Caro mio ben"),
        }])
        .await
        .unwrap();
    gateway.delete_registration(registration.id).await.unwrap();
    assert!(gateway.list_submissions().await.unwrap().is_empty());
}

#[tokio::test]
async fn failed_promotion_keeps_the_waitlist_entry() {
    let gateway = MemoryGateway::new();
    gateway.insert_registration(soloist("A", 1)).await.unwrap();
    let entry = gateway
        .insert_waitlist_entry(NewWaitlistEntry {
            full_name: "C".to_owned(),
            voice_part: VoicePart::Bass,
            email: None,
            phone: None,
            is_test: false,
        })
        .await
        .unwrap();

    let err = gateway
        .promote_waitlist_entry(entry.id, soloist("C", 1))
        .await
        .unwrap_err();
    assert!(err.is_slot_conflict());
    assert_eq!(gateway.list_waitlist().await.unwrap().len(), 1);

    let promoted = gateway
        .promote_waitlist_entry(entry.id, soloist("C", 2))
        .await
        .unwrap();
    assert_eq!(promoted.slot_id, 2);
    assert!(gateway.list_waitlist().await.unwrap().is_empty());
}

#[tokio::test]
async fn demo_data_is_read_only() {
    let gateway = MemoryGateway::demo(50);
    assert!(gateway.is_read_only());
    assert!(!gateway.list_registrations().await.unwrap().is_empty());
    assert_eq!(
        gateway.list_weeks().await.unwrap().len(),
        ROSTER_SCHEDULE.len()
    );
    assert!(matches!(
        gateway.insert_registration(soloist("A", 2)).await,
        Err(DatabaseError::ReadOnly)
    ));
    assert!(matches!(
        gateway.store_config("max_slots", "10").await,
        Err(DatabaseError::ReadOnly)
    ));
}

#[tokio::test]
async fn seeding_twice_only_inserts_once() {
    let gateway = MemoryGateway::new();
    let first = seed_weeks(&gateway).await;
    assert_eq!(first.inserted, ROSTER_SCHEDULE.len());
    assert_eq!(first.failed, 0);

    let second = seed_weeks(&gateway).await;
    assert_eq!(second.inserted, 0);
    assert_eq!(second.skipped, ROSTER_SCHEDULE.len());
    assert_eq!(
        gateway.list_weeks().await.unwrap().len(),
        ROSTER_SCHEDULE.len()
    );
}
