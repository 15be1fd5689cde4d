use chrono::{DateTime, Utc};
use diesel::prelude::*;
use solo_registration_allocation::models::{
    AdminUser, NewPerformanceWeek, NewRegistration, NewSubmission, NewWaitlistEntry,
    PerformanceStatus, PerformanceWeek, Registration, RepertoireSubmission, SubmissionStatus,
    VoicePart, WaitlistEntry,
};
use uuid::Uuid;

use crate::error::DatabaseError;
use crate::schema::{
    config, performance_weeks, registrations, repertoire_submissions, users_admin, waitlist,
};

fn parse<T: core::str::FromStr>(column: &'static str, value: String) -> Result<T, DatabaseError> {
    value
        .parse()
        .map_err(|_| DatabaseError::InvalidValue { column, value })
}

#[derive(Queryable, Selectable, Identifiable)]
#[diesel(table_name = registrations)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct RegistrationRow {
    pub id: Uuid,
    pub full_name: String,
    pub voice_part: String,
    pub slot_id: i32,
    pub created_at: DateTime<Utc>,
    pub performance_status: Option<String>,
    pub is_test: bool,
}

impl TryFrom<RegistrationRow> for Registration {
    type Error = DatabaseError;

    fn try_from(row: RegistrationRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.id,
            full_name: row.full_name,
            voice_part: parse("registrations.voice_part", row.voice_part)?,
            slot_id: row.slot_id,
            created_at: row.created_at,
            performance_status: row
                .performance_status
                .map(|status| {
                    parse::<PerformanceStatus>("registrations.performance_status", status)
                })
                .transpose()?,
            is_test: row.is_test,
        })
    }
}

#[derive(Insertable)]
#[diesel(table_name = registrations)]
pub struct NewRegistrationRow<'a> {
    pub full_name: &'a str,
    pub voice_part: &'a str,
    pub slot_id: i32,
    pub is_test: bool,
}

impl<'a> From<&'a NewRegistration> for NewRegistrationRow<'a> {
    fn from(new: &'a NewRegistration) -> Self {
        Self {
            full_name: &new.full_name,
            voice_part: new.voice_part.as_str(),
            slot_id: new.slot_id,
            is_test: new.is_test,
        }
    }
}

#[derive(Queryable, Selectable, Identifiable)]
#[diesel(table_name = repertoire_submissions)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct SubmissionRow {
    pub id: Uuid,
    pub registration_id: Uuid,
    pub song_title: String,
    pub artist_composer: String,
    pub song_summary: Option<String>,
    pub song_link: Option<String>,
    pub score_link: Option<String>,
    pub status: String,
    pub admin_comments: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl TryFrom<SubmissionRow> for RepertoireSubmission {
    type Error = DatabaseError;

    fn try_from(row: SubmissionRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.id,
            registration_id: row.registration_id,
            song_title: row.song_title,
            artist_composer: row.artist_composer,
            song_summary: row.song_summary,
            song_link: row.song_link,
            score_link: row.score_link,
            status: parse::<SubmissionStatus>("repertoire_submissions.status", row.status)?,
            admin_comments: row.admin_comments,
            created_at: row.created_at,
        })
    }
}

#[derive(Insertable)]
#[diesel(table_name = repertoire_submissions)]
pub struct NewSubmissionRow<'a> {
    pub registration_id: Uuid,
    pub song_title: &'a str,
    pub artist_composer: &'a str,
    pub song_summary: Option<&'a str>,
    pub song_link: Option<&'a str>,
    pub score_link: Option<&'a str>,
    pub status: &'a str,
}

impl<'a> From<&'a NewSubmission> for NewSubmissionRow<'a> {
    fn from(new: &'a NewSubmission) -> Self {
        Self {
            registration_id: new.registration_id,
            song_title: &new.option.song_title,
            artist_composer: &new.option.artist_composer,
            song_summary: new.option.song_summary.as_deref(),
            song_link: new.option.song_link.as_deref(),
            score_link: new.option.score_link.as_deref(),
            status: SubmissionStatus::Pending.as_str(),
        }
    }
}

#[derive(Queryable, Selectable, Identifiable)]
#[diesel(table_name = performance_weeks)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct PerformanceWeekRow {
    pub id: Uuid,
    pub date: String,
    pub slot_ids: Vec<Option<i32>>,
    pub is_test: bool,
    pub created_at: DateTime<Utc>,
}

impl From<PerformanceWeekRow> for PerformanceWeek {
    fn from(row: PerformanceWeekRow) -> Self {
        Self {
            id: row.id,
            date: row.date,
            // the column check keeps NULL out, flatten drops it anyway
            slot_ids: row.slot_ids.into_iter().flatten().collect(),
            is_test: row.is_test,
            created_at: row.created_at,
        }
    }
}

#[derive(Insertable)]
#[diesel(table_name = performance_weeks)]
pub struct NewPerformanceWeekRow<'a> {
    pub date: &'a str,
    pub slot_ids: Vec<Option<i32>>,
    pub is_test: bool,
}

impl<'a> From<&'a NewPerformanceWeek> for NewPerformanceWeekRow<'a> {
    fn from(new: &'a NewPerformanceWeek) -> Self {
        Self {
            date: &new.date,
            slot_ids: new.slot_ids.iter().copied().map(Some).collect(),
            is_test: new.is_test,
        }
    }
}

#[derive(Queryable, Selectable, Identifiable)]
#[diesel(table_name = waitlist)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct WaitlistRow {
    pub id: Uuid,
    pub full_name: String,
    pub voice_part: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub created_at: DateTime<Utc>,
    pub is_test: bool,
}

impl TryFrom<WaitlistRow> for WaitlistEntry {
    type Error = DatabaseError;

    fn try_from(row: WaitlistRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.id,
            full_name: row.full_name,
            voice_part: parse::<VoicePart>("waitlist.voice_part", row.voice_part)?,
            email: row.email,
            phone: row.phone,
            created_at: row.created_at,
            is_test: row.is_test,
        })
    }
}

#[derive(Insertable)]
#[diesel(table_name = waitlist)]
pub struct NewWaitlistRow<'a> {
    pub full_name: &'a str,
    pub voice_part: &'a str,
    pub email: Option<&'a str>,
    pub phone: Option<&'a str>,
    pub is_test: bool,
}

impl<'a> From<&'a NewWaitlistEntry> for NewWaitlistRow<'a> {
    fn from(new: &'a NewWaitlistEntry) -> Self {
        Self {
            full_name: &new.full_name,
            voice_part: new.voice_part.as_str(),
            email: new.email.as_deref(),
            phone: new.phone.as_deref(),
            is_test: new.is_test,
        }
    }
}

#[derive(Queryable, Selectable)]
#[diesel(table_name = config)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct ConfigRow {
    pub key: String,
    pub value: String,
}

#[derive(Queryable, Selectable, Identifiable)]
#[diesel(table_name = users_admin)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct AdminRow {
    pub id: Uuid,
    pub email: String,
    pub password_hash: String,
}

impl From<AdminRow> for AdminUser {
    fn from(row: AdminRow) -> Self {
        Self {
            id: row.id,
            email: row.email,
            password_hash: row.password_hash,
        }
    }
}

pub fn convert_all<R, T>(rows: Vec<R>) -> Result<Vec<T>, DatabaseError>
where
    T: TryFrom<R, Error = DatabaseError>,
{
    rows.into_iter().map(T::try_from).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn week_rows_carry_slots_as_nullable_array_elements() {
        let new = NewPerformanceWeek {
            date: "March 1st".to_owned(),
            slot_ids: vec![3, 1, 2],
            is_test: false,
        };
        let row = NewPerformanceWeekRow::from(&new);
        assert_eq!(row.slot_ids, vec![Some(3), Some(1), Some(2)]);

        let week = PerformanceWeek::from(PerformanceWeekRow {
            id: Uuid::new_v4(),
            date: new.date.clone(),
            slot_ids: vec![Some(3), None, Some(2)],
            is_test: false,
            created_at: Utc::now(),
        });
        assert_eq!(week.slot_ids, vec![3, 2]);
        assert_eq!(week.date, "March 1st");
    }
}
