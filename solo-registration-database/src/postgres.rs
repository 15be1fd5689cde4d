use std::collections::BTreeMap;

use diesel::prelude::*;
use diesel::upsert::excluded;
use diesel_async::pooled_connection::deadpool::{self, Object};
use diesel_async::pooled_connection::AsyncDieselConnectionManager;
use diesel_async::scoped_futures::ScopedFutureExt as _;
use diesel_async::{AsyncConnection as _, AsyncPgConnection, RunQueryDsl};
use solo_registration_allocation::models::{
    AdminUser, NewPerformanceWeek, NewRegistration, NewSubmission, NewWaitlistEntry,
    PerformanceStatus, PerformanceWeek, Registration, RegistrationId, RepertoireSubmission,
    SubmissionId, SubmissionStatus, VoicePart, WaitlistEntry, WaitlistId, WeekId,
};
use tracing::debug;

use crate::error::DatabaseError;
use crate::gateway::Gateway;
use crate::models::{
    convert_all, AdminRow, ConfigRow, NewPerformanceWeekRow, NewRegistrationRow,
    NewSubmissionRow, NewWaitlistRow, PerformanceWeekRow, RegistrationRow, SubmissionRow,
    WaitlistRow,
};
use crate::schema::{
    config, performance_weeks, registrations, repertoire_submissions, users_admin, waitlist,
};

pub type Pool = deadpool::Pool<AsyncPgConnection>;

// https://github.com/tokio-rs/axum/tree/main/examples/diesel-async-postgres

pub fn get_database_connection(database_url: &str) -> Result<Pool, DatabaseError> {
    let config = AsyncDieselConnectionManager::<AsyncPgConnection>::new(database_url);
    Ok(Pool::builder(config).build()?)
}

/// [`Gateway`] backed by PostgreSQL.
#[derive(Clone)]
pub struct PgGateway {
    pool: Pool,
}

impl PgGateway {
    #[must_use]
    pub const fn new(pool: Pool) -> Self {
        Self { pool }
    }

    pub fn connect(database_url: &str) -> Result<Self, DatabaseError> {
        Ok(Self::new(get_database_connection(database_url)?))
    }

    async fn connection(&self) -> Result<Object<AsyncPgConnection>, DatabaseError> {
        Ok(self.pool.get().await?)
    }
}

fn not_found(table: &'static str, id: uuid::Uuid) -> DatabaseError {
    DatabaseError::NotFound { table, id }
}

impl Gateway for PgGateway {
    fn is_read_only(&self) -> bool {
        false
    }

    async fn load_config(&self) -> Result<BTreeMap<String, String>, DatabaseError> {
        let mut connection = self.connection().await?;
        let rows = config::table
            .select(ConfigRow::as_select())
            .load(&mut connection)
            .await?;
        Ok(rows.into_iter().map(|row| (row.key, row.value)).collect())
    }

    async fn store_config(&self, key: &str, value: &str) -> Result<(), DatabaseError> {
        let mut connection = self.connection().await?;
        diesel::insert_into(config::table)
            .values((config::key.eq(key), config::value.eq(value)))
            .on_conflict(config::key)
            .do_update()
            .set(config::value.eq(excluded(config::value)))
            .execute(&mut connection)
            .await?;
        Ok(())
    }

    async fn list_registrations(&self) -> Result<Vec<Registration>, DatabaseError> {
        let mut connection = self.connection().await?;
        let rows = registrations::table
            .order(registrations::created_at.asc())
            .select(RegistrationRow::as_select())
            .load(&mut connection)
            .await?;
        convert_all(rows)
    }

    async fn insert_registration(
        &self,
        new: NewRegistration,
    ) -> Result<Registration, DatabaseError> {
        let mut connection = self.connection().await?;
        let row = diesel::insert_into(registrations::table)
            .values(NewRegistrationRow::from(&new))
            .returning(RegistrationRow::as_returning())
            .get_result(&mut connection)
            .await?;
        row.try_into()
    }

    async fn update_registration(
        &self,
        id: RegistrationId,
        full_name: String,
        voice_part: VoicePart,
    ) -> Result<Registration, DatabaseError> {
        let mut connection = self.connection().await?;
        diesel::update(registrations::table.find(id))
            .set((
                registrations::full_name.eq(full_name),
                registrations::voice_part.eq(voice_part.as_str()),
            ))
            .returning(RegistrationRow::as_returning())
            .get_result(&mut connection)
            .await
            .optional()?
            .ok_or_else(|| not_found("registrations", id))?
            .try_into()
    }

    async fn delete_registration(&self, id: RegistrationId) -> Result<Registration, DatabaseError> {
        let mut connection = self.connection().await?;
        diesel::delete(registrations::table.find(id))
            .returning(RegistrationRow::as_returning())
            .get_result(&mut connection)
            .await
            .optional()?
            .ok_or_else(|| not_found("registrations", id))?
            .try_into()
    }

    async fn delete_all_registrations(&self) -> Result<Vec<RegistrationId>, DatabaseError> {
        let mut connection = self.connection().await?;
        Ok(diesel::delete(registrations::table)
            .returning(registrations::id)
            .get_results(&mut connection)
            .await?)
    }

    async fn set_performance_status(
        &self,
        id: RegistrationId,
        status: PerformanceStatus,
    ) -> Result<Registration, DatabaseError> {
        let mut connection = self.connection().await?;
        diesel::update(registrations::table.find(id))
            .set(registrations::performance_status.eq(Some(status.as_str())))
            .returning(RegistrationRow::as_returning())
            .get_result(&mut connection)
            .await
            .optional()?
            .ok_or_else(|| not_found("registrations", id))?
            .try_into()
    }

    async fn reset_performance_statuses(&self) -> Result<Vec<Registration>, DatabaseError> {
        let mut connection = self.connection().await?;
        let rows = diesel::update(registrations::table)
            .set(registrations::performance_status.eq(Some(PerformanceStatus::Pending.as_str())))
            .returning(RegistrationRow::as_returning())
            .get_results(&mut connection)
            .await?;
        convert_all(rows)
    }

    async fn list_submissions(&self) -> Result<Vec<RepertoireSubmission>, DatabaseError> {
        let mut connection = self.connection().await?;
        let rows = repertoire_submissions::table
            .order(repertoire_submissions::created_at.desc())
            .select(SubmissionRow::as_select())
            .load(&mut connection)
            .await?;
        convert_all(rows)
    }

    async fn insert_submissions(
        &self,
        new: Vec<NewSubmission>,
    ) -> Result<Vec<RepertoireSubmission>, DatabaseError> {
        let mut connection = self.connection().await?;
        let rows: Vec<NewSubmissionRow<'_>> = new.iter().map(NewSubmissionRow::from).collect();
        // a single multi-row insert is atomic
        let inserted = diesel::insert_into(repertoire_submissions::table)
            .values(&rows)
            .returning(SubmissionRow::as_returning())
            .get_results(&mut connection)
            .await?;
        convert_all(inserted)
    }

    async fn reject_submission(
        &self,
        id: SubmissionId,
        comments: Option<String>,
    ) -> Result<RepertoireSubmission, DatabaseError> {
        let mut connection = self.connection().await?;
        let target = repertoire_submissions::table
            .find(id)
            .filter(repertoire_submissions::status.ne(SubmissionStatus::Approved.as_str()));
        let status = repertoire_submissions::status.eq(SubmissionStatus::Rejected.as_str());
        let row = if let Some(comments) = comments {
            diesel::update(target)
                .set((status, repertoire_submissions::admin_comments.eq(comments)))
                .returning(SubmissionRow::as_returning())
                .get_result(&mut connection)
                .await
                .optional()?
        } else {
            diesel::update(target)
                .set(status)
                .returning(SubmissionRow::as_returning())
                .get_result(&mut connection)
                .await
                .optional()?
        };
        row.ok_or_else(|| not_found("repertoire_submissions", id))?
            .try_into()
    }

    async fn update_submission_comments(
        &self,
        id: SubmissionId,
        comments: Option<String>,
    ) -> Result<RepertoireSubmission, DatabaseError> {
        let mut connection = self.connection().await?;
        diesel::update(repertoire_submissions::table.find(id))
            .set(repertoire_submissions::admin_comments.eq(comments))
            .returning(SubmissionRow::as_returning())
            .get_result(&mut connection)
            .await
            .optional()?
            .ok_or_else(|| not_found("repertoire_submissions", id))?
            .try_into()
    }

    async fn approve_submission(
        &self,
        id: SubmissionId,
        registration_id: RegistrationId,
    ) -> Result<(RepertoireSubmission, Vec<SubmissionId>), DatabaseError> {
        let mut connection = self.connection().await?;
        let (row, purged) = connection
            .transaction::<_, DatabaseError, _>(|connection| {
                async move {
                    // siblings go first so the one-approved index never sees two
                    let purged: Vec<SubmissionId> = diesel::delete(
                        repertoire_submissions::table
                            .filter(repertoire_submissions::registration_id.eq(registration_id))
                            .filter(repertoire_submissions::id.ne(id)),
                    )
                    .returning(repertoire_submissions::id)
                    .get_results(connection)
                    .await?;
                    let row = diesel::update(
                        repertoire_submissions::table
                            .find(id)
                            .filter(repertoire_submissions::registration_id.eq(registration_id)),
                    )
                    .set(repertoire_submissions::status.eq(SubmissionStatus::Approved.as_str()))
                    .returning(SubmissionRow::as_returning())
                    .get_result(connection)
                    .await
                    .optional()?
                    .ok_or_else(|| not_found("repertoire_submissions", id))?;
                    Ok((row, purged))
                }
                .scope_boxed()
            })
            .await?;
        debug!(%id, %registration_id, purged = purged.len(), "approved submission");
        Ok((row.try_into()?, purged))
    }

    async fn delete_submission(
        &self,
        id: SubmissionId,
    ) -> Result<RepertoireSubmission, DatabaseError> {
        let mut connection = self.connection().await?;
        diesel::delete(repertoire_submissions::table.find(id))
            .returning(SubmissionRow::as_returning())
            .get_result(&mut connection)
            .await
            .optional()?
            .ok_or_else(|| not_found("repertoire_submissions", id))?
            .try_into()
    }

    async fn delete_all_submissions(&self) -> Result<Vec<SubmissionId>, DatabaseError> {
        let mut connection = self.connection().await?;
        Ok(diesel::delete(repertoire_submissions::table)
            .returning(repertoire_submissions::id)
            .get_results(&mut connection)
            .await?)
    }

    async fn list_weeks(&self) -> Result<Vec<PerformanceWeek>, DatabaseError> {
        let mut connection = self.connection().await?;
        let rows = performance_weeks::table
            .order(performance_weeks::created_at.asc())
            .select(PerformanceWeekRow::as_select())
            .load(&mut connection)
            .await?;
        Ok(rows.into_iter().map(PerformanceWeek::from).collect())
    }

    async fn find_week_by_date(
        &self,
        date: &str,
    ) -> Result<Option<PerformanceWeek>, DatabaseError> {
        let mut connection = self.connection().await?;
        let row = performance_weeks::table
            .filter(performance_weeks::date.eq(date))
            .select(PerformanceWeekRow::as_select())
            .first(&mut connection)
            .await
            .optional()?;
        Ok(row.map(PerformanceWeek::from))
    }

    async fn insert_week(&self, new: NewPerformanceWeek) -> Result<PerformanceWeek, DatabaseError> {
        let mut connection = self.connection().await?;
        let row = diesel::insert_into(performance_weeks::table)
            .values(NewPerformanceWeekRow::from(&new))
            .returning(PerformanceWeekRow::as_returning())
            .get_result(&mut connection)
            .await?;
        Ok(row.into())
    }

    async fn delete_week(&self, id: WeekId) -> Result<PerformanceWeek, DatabaseError> {
        let mut connection = self.connection().await?;
        let row = diesel::delete(performance_weeks::table.find(id))
            .returning(PerformanceWeekRow::as_returning())
            .get_result(&mut connection)
            .await
            .optional()?
            .ok_or_else(|| not_found("performance_weeks", id))?;
        Ok(row.into())
    }

    async fn list_waitlist(&self) -> Result<Vec<WaitlistEntry>, DatabaseError> {
        let mut connection = self.connection().await?;
        let rows = waitlist::table
            .order(waitlist::created_at.asc())
            .select(WaitlistRow::as_select())
            .load(&mut connection)
            .await?;
        convert_all(rows)
    }

    async fn insert_waitlist_entry(
        &self,
        new: NewWaitlistEntry,
    ) -> Result<WaitlistEntry, DatabaseError> {
        let mut connection = self.connection().await?;
        let row = diesel::insert_into(waitlist::table)
            .values(NewWaitlistRow::from(&new))
            .returning(WaitlistRow::as_returning())
            .get_result(&mut connection)
            .await?;
        row.try_into()
    }

    async fn delete_waitlist_entry(&self, id: WaitlistId) -> Result<WaitlistEntry, DatabaseError> {
        let mut connection = self.connection().await?;
        diesel::delete(waitlist::table.find(id))
            .returning(WaitlistRow::as_returning())
            .get_result(&mut connection)
            .await
            .optional()?
            .ok_or_else(|| not_found("waitlist", id))?
            .try_into()
    }

    async fn promote_waitlist_entry(
        &self,
        id: WaitlistId,
        registration: NewRegistration,
    ) -> Result<Registration, DatabaseError> {
        let mut connection = self.connection().await?;
        let row = connection
            .transaction::<_, DatabaseError, _>(|connection| {
                async move {
                    let removed = diesel::delete(waitlist::table.find(id))
                        .execute(connection)
                        .await?;
                    if removed == 0 {
                        return Err(not_found("waitlist", id));
                    }
                    let row = diesel::insert_into(registrations::table)
                        .values(NewRegistrationRow::from(&registration))
                        .returning(RegistrationRow::as_returning())
                        .get_result(connection)
                        .await?;
                    Ok(row)
                }
                .scope_boxed()
            })
            .await?;
        row.try_into()
    }

    async fn find_admin(&self, email: &str) -> Result<Option<AdminUser>, DatabaseError> {
        let mut connection = self.connection().await?;
        let row = users_admin::table
            .filter(users_admin::email.eq(email))
            .select(AdminRow::as_select())
            .first(&mut connection)
            .await
            .optional()?;
        Ok(row.map(AdminUser::from))
    }

    async fn upsert_admin(
        &self,
        email: &str,
        password_hash: &str,
    ) -> Result<AdminUser, DatabaseError> {
        let mut connection = self.connection().await?;
        let row = diesel::insert_into(users_admin::table)
            .values((
                users_admin::email.eq(email),
                users_admin::password_hash.eq(password_hash),
            ))
            .on_conflict(users_admin::email)
            .do_update()
            .set(users_admin::password_hash.eq(excluded(users_admin::password_hash)))
            .returning(AdminRow::as_returning())
            .get_result(&mut connection)
            .await?;
        Ok(row.into())
    }
}
