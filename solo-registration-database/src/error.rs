use diesel::result::DatabaseErrorKind;
use diesel_async::pooled_connection::deadpool;
use thiserror::Error;
use uuid::Uuid;

/// Unique constraint on `registrations.slot_id`.
pub const SLOT_UNIQUE_CONSTRAINT: &str = "registrations_slot_id_key";
/// Partial unique index allowing one approved submission per registration.
pub const ONE_APPROVED_CONSTRAINT: &str = "repertoire_submissions_one_approved";

#[allow(clippy::module_name_repetitions)]
#[derive(Error, Debug)]
pub enum DatabaseError {
    #[error("Failed to create database pool {0}")]
    PoolBuild(#[from] deadpool::BuildError),
    #[error("Database pool failed {0}")]
    Pool(#[from] deadpool::PoolError),
    #[error("Database query failed {0}")]
    Database(diesel::result::Error),
    #[error("Unique constraint {0} violated")]
    UniqueViolation(String),
    /// Zero rows affected. A missing record and a refused write look the same.
    #[error("No {table} row with id {id}")]
    NotFound { table: &'static str, id: Uuid },
    #[error("The portal runs in demo mode, writes are disabled")]
    ReadOnly,
    #[error("Stored value {value:?} in {column} is invalid")]
    InvalidValue { column: &'static str, value: String },
}

impl DatabaseError {
    #[must_use]
    pub fn is_slot_conflict(&self) -> bool {
        matches!(self, Self::UniqueViolation(constraint) if constraint == SLOT_UNIQUE_CONSTRAINT)
    }
}

impl From<diesel::result::Error> for DatabaseError {
    fn from(error: diesel::result::Error) -> Self {
        match error {
            diesel::result::Error::DatabaseError(DatabaseErrorKind::UniqueViolation, info) => {
                Self::UniqueViolation(info.constraint_name().unwrap_or_default().to_owned())
            }
            other => Self::Database(other),
        }
    }
}
